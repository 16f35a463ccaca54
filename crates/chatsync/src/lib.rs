//! # chatsync
//!
//! Client-side model of a multi-thread chat, kept in step with a backend.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatsync::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = RestBackend::builder()
//!         .base_url("http://localhost:8000")
//!         .credentials(Arc::new(StaticCredentials::new("user-1", "token")))
//!         .build()?;
//!
//!     let driver = SyncDriver::builder()
//!         .backend(Arc::new(backend))
//!         .build()?;
//!
//!     driver
//!         .handle_session(AuthNotification::SignedIn(Identity::new("user-1")))
//!         .await;
//!
//!     driver.create_thread(None).await?;
//!     driver.send_message("Hello").await?;
//!
//!     for message in driver.messages().await {
//!         println!("{}: {}", message.author, message.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`chatsync-types`**: identities, threads, messages, events and validation
//! - **`chatsync-client`**: the [`ChatBackend`] trait with REST and in-memory implementations
//! - **`chatsync-store`**: session state, thread directory and message log cache
//! - **`chatsync-sync`**: the [`SyncDriver`], its polling feeds and the composer
//!
//! Signed out, the driver keeps working on local-only threads that never reach the backend.

pub mod prelude;

pub use chatsync_types::{
    validate_message_text, validate_sign_up, AuthFailure, AuthNotification, ContentSignature, Delivery,
    Identity, Message, Notice, NoticeLevel, Role, SyncConfig, SyncEvent, Thread, ValidationError,
    DEMO_OWNER_ID,
};

pub use chatsync_client::{
    ChatBackend, ClientError, Credential, CredentialProvider, InMemoryBackend, MessageQuery, NoCredentials,
    RestBackend, RestBackendBuilder, SendMessageRequest, SendMessageResponse, SortOrder, StaticCredentials,
};

pub use chatsync_store::{
    merge, ChatStore, MergeReport, Merged, MessageLogCache, OrderPolicy, RefreshOutcome, RefreshTicket,
    SessionState, SyncOutcome, SyncTicket, ThreadDirectory,
};

pub use chatsync_sync::{polling, Subscription, SyncDriver, SyncDriverBuilder, SyncError};
