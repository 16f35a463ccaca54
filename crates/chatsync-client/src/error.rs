use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl ClientError {
    /// Map a non-success HTTP status into the error taxonomy
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => ClientError::Unauthenticated,
            404 => ClientError::NotFound(body),
            code => ClientError::Status { status: code, body },
        }
    }

    /// Failures worth retrying on the next poll tick
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(_) | ClientError::Unavailable(_) => true,
            ClientError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            ClientError::from_status(StatusCode::UNAUTHORIZED, String::new()),
            ClientError::Unauthenticated
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::FORBIDDEN, String::new()),
            ClientError::Unauthenticated
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::NOT_FOUND, "chat c1".into()),
            ClientError::NotFound(_)
        ));
        match ClientError::from_status(StatusCode::BAD_GATEWAY, "upstream".into()) {
            ClientError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(ClientError::Status { status: 503, body: String::new() }.is_transient());
        assert!(ClientError::Status { status: 429, body: String::new() }.is_transient());
        assert!(!ClientError::Status { status: 400, body: String::new() }.is_transient());
        assert!(!ClientError::Unauthenticated.is_transient());
        assert!(ClientError::Unavailable("down".into()).is_transient());
    }

    #[test]
    fn test_display() {
        let err = ClientError::Status { status: 500, body: "boom".into() };
        let display = err.to_string();
        assert!(display.contains("500"));
        assert!(display.contains("boom"));
    }
}
