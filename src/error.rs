//! Error handling module for kioskify
//!
//! Each component owns a narrow error enum (`StoreError`, `WriteError`,
//! `ToggleError`, ...) and handles it where it occurs. `KioskError` covers
//! the front end: resolving the operating identity and the menus.

use thiserror::Error;

use crate::prompt::PromptError;
use crate::validate::ValidationError;

/// Main error type for kioskify
#[derive(Error, Debug)]
pub enum KioskError {
    /// User input failed its format contract
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// System errors (identity lookup, missing devices)
    #[error("System error: {0}")]
    System(String),

    /// Prompt layer errors (terminal closed, input cancelled)
    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),
}

/// Result type alias for kioskify operations
pub type Result<T> = std::result::Result<T, KioskError>;

impl KioskError {
    /// Create a system error
    pub fn system(msg: impl Into<String>) -> Self {
        Self::System(msg.into())
    }

    /// True when the operator backed out of a prompt.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Prompt(PromptError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KioskError::system("no such user: kiosk");
        assert_eq!(err.to_string(), "System error: no such user: kiosk");

        let err: KioskError = ValidationError::MissingScheme("example.com".into()).into();
        assert!(err.to_string().starts_with("Validation error: "));
    }

    #[test]
    fn test_cancel_detection() {
        let err: KioskError = PromptError::Cancelled.into();
        assert!(err.is_cancelled());

        let err: KioskError = PromptError::Failed("terminal closed".into()).into();
        assert!(!err.is_cancelled());
        assert!(!KioskError::system("no tty").is_cancelled());
    }
}
