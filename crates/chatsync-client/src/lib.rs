pub mod credentials;
pub mod error;
pub mod memory;
pub mod rest;
pub mod traits;
pub mod wire;

pub use credentials::{Credential, CredentialProvider, NoCredentials, StaticCredentials};
pub use error::{ClientError, Result};
pub use memory::InMemoryBackend;
pub use rest::{RestBackend, RestBackendBuilder};
pub use traits::{ChatBackend, MessageQuery, SendMessageRequest, SendMessageResponse, SortOrder};
