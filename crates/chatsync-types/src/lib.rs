pub mod config;
pub mod events;
pub mod identity;
pub mod message;
pub mod thread;
pub mod validation;

pub use config::SyncConfig;
pub use events::{Notice, NoticeLevel, SyncEvent};
pub use identity::{AuthFailure, AuthNotification, Identity};
pub use message::{ContentSignature, Delivery, Message, Role};
pub use thread::{Thread, DEMO_OWNER_ID};
pub use validation::{validate_message_text, validate_sign_up, ValidationError};
