use serde::{Deserialize, Serialize};

/// Authenticated user as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            avatar_url: None,
            email: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Name shown in the UI: display name, then email, then uid
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.uid)
    }
}

/// One notification from the identity provider's state stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthNotification {
    SignedIn(Identity),
    SignedOut,
}

impl AuthNotification {
    pub fn into_identity(self) -> Option<Identity> {
        match self {
            AuthNotification::SignedIn(identity) => Some(identity),
            AuthNotification::SignedOut => None,
        }
    }
}

impl From<Option<Identity>> for AuthNotification {
    fn from(identity: Option<Identity>) -> Self {
        match identity {
            Some(identity) => AuthNotification::SignedIn(identity),
            None => AuthNotification::SignedOut,
        }
    }
}

/// Sign-in failures reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// The user closed the sign-in flow
    Cancelled,
    /// Provider credentials are missing or wrong on our side
    Misconfigured,
    InvalidCredentials,
    Other(String),
}

impl AuthFailure {
    /// User-facing text for the failure
    pub fn user_message(&self) -> String {
        match self {
            AuthFailure::Cancelled => "Sign-in cancelled".to_string(),
            AuthFailure::Misconfigured => {
                "Authentication is not configured. Please add provider credentials to the environment.".to_string()
            }
            AuthFailure::InvalidCredentials => "Invalid email or password".to_string(),
            AuthFailure::Other(_) => "Failed to sign in. Please try again.".to_string(),
        }
    }
}
