//! Prelude module for convenient imports
//!
//! ```rust
//! use chatsync::prelude::*;
//! ```

pub use crate::{
    AuthNotification, ChatBackend, Delivery, Identity, InMemoryBackend, Message, Notice, RestBackend,
    Role, SessionState, StaticCredentials, SyncConfig, SyncDriver, SyncError, SyncEvent, Thread,
};
