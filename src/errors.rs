//! # Fetch Errors
//!
//! Queries surface exactly one kind of failure: the fetch function rejected.
//! The rejection reason is carried through unchanged, so whatever the service
//! layer reported is what a component renders.
//!
//! ```rust
//! use dioxus_clinic_queries::errors::FetchError;
//!
//! let error = FetchError::new("network error");
//! assert_eq!(error.to_string(), "network error");
//! ```

use thiserror::Error;

/// A rejected fetch, carrying the reason reported by the service layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct FetchError {
    reason: String,
}

impl FetchError {
    /// Wrap a rejection reason
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The reason exactly as the fetch function reported it
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Convenience type alias for Results with FetchError
pub type FetchResult<T> = Result<T, FetchError>;

impl From<String> for FetchError {
    fn from(reason: String) -> Self {
        FetchError { reason }
    }
}

impl From<&str> for FetchError {
    fn from(reason: &str) -> Self {
        FetchError::new(reason)
    }
}

impl From<FetchError> for String {
    fn from(error: FetchError) -> Self {
        error.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_reason_verbatim() {
        let error = FetchError::new("network error");
        assert_eq!(error.to_string(), "network error");
        assert_eq!(error.reason(), "network error");
    }

    #[test]
    fn test_conversions_preserve_reason() {
        let from_str: FetchError = "timeout".into();
        let from_string: FetchError = String::from("timeout").into();
        assert_eq!(from_str, from_string);

        let back: String = from_str.into();
        assert_eq!(back, "timeout");
    }
}
