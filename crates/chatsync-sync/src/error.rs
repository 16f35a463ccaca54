use chatsync_client::ClientError;
use chatsync_types::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Backend error: {0}")]
    Backend(#[from] ClientError),

    #[error("No thread selected")]
    NoThreadSelected,

    #[error("A message is already being sent in thread {0}")]
    SendInFlight(String),

    #[error("Unknown message: {0}")]
    UnknownMessage(String),

    #[error("Unknown thread: {0}")]
    UnknownThread(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
