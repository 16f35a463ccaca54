use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Input rejected locally before any remote call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least 6 characters")]
    WeakPassword,
}

/// Trim composer input; whitespace-only text is rejected
pub fn validate_message_text(text: &str) -> Result<&str, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyMessage)
    } else {
        Ok(trimmed)
    }
}

/// Check a sign-up form before handing it to the identity provider
pub fn validate_sign_up(email: &str, password: &str, confirm: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    let valid_email = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid_email {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::WeakPassword);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_text_is_trimmed() {
        assert_eq!(validate_message_text("  Hello \n"), Ok("Hello"));
    }

    #[test]
    fn test_whitespace_message_rejected() {
        assert_eq!(validate_message_text(" \t\n "), Err(ValidationError::EmptyMessage));
        assert_eq!(validate_message_text(""), Err(ValidationError::EmptyMessage));
    }

    #[test]
    fn test_sign_up_ok() {
        assert!(validate_sign_up("ada@example.com", "secret1", "secret1").is_ok());
    }

    #[test]
    fn test_sign_up_rejections() {
        assert_eq!(
            validate_sign_up("ada@example.com", "secret1", "secret2"),
            Err(ValidationError::PasswordMismatch)
        );
        assert_eq!(
            validate_sign_up("ada@example.com", "abc", "abc"),
            Err(ValidationError::WeakPassword)
        );
        assert!(matches!(
            validate_sign_up("not-an-email", "secret1", "secret1"),
            Err(ValidationError::InvalidEmail(_))
        ));
    }
}
