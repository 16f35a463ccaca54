//! Keeps the client-side chat store in step with the backend.
//!
//! [`SyncDriver`] owns the store and reacts to session changes. While an identity is
//! signed in it polls the thread list and the selected thread.

pub mod builder;
pub mod composer;
pub mod driver;
pub mod error;
pub mod poll;
pub mod subscription;

pub use builder::SyncDriverBuilder;
pub use driver::SyncDriver;
pub use error::{Result, SyncError};
pub use poll::polling;
pub use subscription::Subscription;
