//! Caller-facing error taxonomy.
//!
//! Every failure leaving the data-access layer is one of four kinds. Provider
//! error shapes stop at [`DataError::from_backend`]; nothing above this module
//! looks at raw codes or provider messages.

use criticart_core::ValidationError;
use criticart_data::{BackendError, RetryError};
use thiserror::Error;
use tracing::warn;

/// Shown for any provider code without a dedicated message.
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

const UPLOAD_FAILED: &str = "Upload failed. Please try again.";
const AUTH_REQUIRED: &str = "Please sign in to continue.";
const PERMISSION_DENIED_CODE: &str = "42501";
const NOT_FOUND_CODE: &str = "PGRST116";

/// Result type for data-access operations.
pub type DataResult<T> = Result<T, DataError>;

/// How a surface should present an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// Transient, dismissable; the user can simply retry.
    Notification,
    /// Blocking; the user has to act (sign in, fix input).
    Modal,
}

/// Error returned by every data-access operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    /// Input failed a local check; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend rejected a read or write.
    #[error("{message}")]
    RemoteQuery {
        /// Provider code, kept for logs and tests.
        code: Option<String>,
        /// Fixed user-facing message for the code.
        message: &'static str,
    },

    /// An upload kept failing after its retry budget.
    #[error("upload failed after {attempts} attempt(s)")]
    TransientIo { attempts: u32 },

    /// The operation needs a signed-in user.
    #[error("authentication required")]
    AuthRequired,
}

/// Fixed message for a provider code.
pub fn message_for_code(code: Option<&str>) -> &'static str {
    match code {
        Some("23505") => "This record already exists",
        Some("23503") => "This record references data that does not exist",
        Some("23502") => "A required field is missing",
        Some("23514") => "One of the values is not allowed",
        Some("22P02") => "One of the values has an invalid format",
        Some(PERMISSION_DENIED_CODE) => "You do not have permission to perform this action",
        Some(NOT_FOUND_CODE) => "The requested record was not found",
        Some("PGRST100" | "42703" | "42P01") => "The request could not be processed",
        Some("invalid_credentials" | "invalid_grant") => "Invalid email or password",
        Some("user_already_exists" | "email_exists") => {
            "An account with this email already exists"
        }
        _ => GENERIC_MESSAGE,
    }
}

fn is_auth_failure(err: &BackendError) -> bool {
    err.status() == Some(401) || matches!(err.code(), Some("PGRST301" | "PGRST302"))
}

impl DataError {
    /// Normalize a backend failure. The only place provider errors are read.
    pub fn from_backend(err: &BackendError) -> Self {
        warn!(
            status = err.status(),
            code = err.code().unwrap_or("-"),
            error = %err,
            "remote call failed"
        );

        if is_auth_failure(err) {
            return DataError::AuthRequired;
        }
        let code = err.code().map(String::from);
        DataError::RemoteQuery {
            message: message_for_code(code.as_deref()),
            code,
        }
    }

    /// Normalize an upload that ran out of attempts.
    pub fn from_retry(err: &RetryError<BackendError>) -> Self {
        warn!(
            operation = err.operation,
            attempts = err.attempts,
            error = %err.source,
            "upload gave up"
        );
        if is_auth_failure(&err.source) {
            return DataError::AuthRequired;
        }
        DataError::TransientIo {
            attempts: err.attempts,
        }
    }

    /// Denial decided locally, phrased as the backend would phrase it.
    pub fn permission_denied() -> Self {
        DataError::RemoteQuery {
            code: Some(PERMISSION_DENIED_CODE.to_string()),
            message: message_for_code(Some(PERMISSION_DENIED_CODE)),
        }
    }

    /// A write or read that matched no row.
    pub fn not_found() -> Self {
        DataError::RemoteQuery {
            code: Some(NOT_FOUND_CODE.to_string()),
            message: message_for_code(Some(NOT_FOUND_CODE)),
        }
    }

    /// Provider code, when the backend supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            DataError::RemoteQuery { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(NOT_FOUND_CODE)
    }

    /// Text safe to show an end user.
    pub fn user_message(&self) -> String {
        match self {
            DataError::Validation(e) => e.to_string(),
            DataError::RemoteQuery { message, .. } => (*message).to_string(),
            DataError::TransientIo { .. } => UPLOAD_FAILED.to_string(),
            DataError::AuthRequired => AUTH_REQUIRED.to_string(),
        }
    }

    pub fn presentation(&self) -> Presentation {
        match self {
            DataError::Validation(_) | DataError::AuthRequired => Presentation::Modal,
            DataError::RemoteQuery { .. } | DataError::TransientIo { .. } => {
                Presentation::Notification
            }
        }
    }
}

impl From<BackendError> for DataError {
    fn from(err: BackendError) -> Self {
        DataError::from_backend(&err)
    }
}

// Rows that do not match the expected shape.
impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::from_backend(&BackendError::from(err))
    }
}

impl From<RetryError<BackendError>> for DataError {
    fn from(err: RetryError<BackendError>) -> Self {
        DataError::from_retry(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use criticart_data::{FetchError, ProviderError};

    fn provider(status: u16, code: &str, message: &str) -> BackendError {
        ProviderError::new(status, Some(code), message).into()
    }

    #[test]
    fn test_duplicate_key_has_fixed_message() {
        let err = DataError::from(provider(
            409,
            "23505",
            "duplicate key value violates unique constraint \"reviews_pkey\"",
        ));
        assert_eq!(err.code(), Some("23505"));
        assert_eq!(err.user_message(), "This record already exists");
        assert_eq!(err.to_string(), "This record already exists");
        assert_eq!(err.presentation(), Presentation::Notification);
    }

    #[test]
    fn test_code_table() {
        let cases = [
            ("23503", "This record references data that does not exist"),
            ("23502", "A required field is missing"),
            ("23514", "One of the values is not allowed"),
            ("22P02", "One of the values has an invalid format"),
            ("42501", "You do not have permission to perform this action"),
            ("PGRST116", "The requested record was not found"),
            ("42P01", "The request could not be processed"),
            ("XX000", GENERIC_MESSAGE),
        ];
        for (code, message) in cases {
            assert_eq!(DataError::from(provider(400, code, "raw")).user_message(), message);
        }
    }

    #[test]
    fn test_raw_message_never_surfaces() {
        let err = DataError::from(provider(400, "XX000", "relation secret_table is broken"));
        assert!(!err.user_message().contains("secret_table"));
        assert!(!err.to_string().contains("secret_table"));
    }

    #[test]
    fn test_expired_jwt_requires_auth() {
        let err = DataError::from(provider(401, "PGRST301", "JWT expired"));
        assert_eq!(err, DataError::AuthRequired);
        assert_eq!(err.presentation(), Presentation::Modal);

        let err = DataError::from(BackendError::from(ProviderError::new(401, None, "")));
        assert_eq!(err, DataError::AuthRequired);
    }

    #[test]
    fn test_transport_failure_is_generic() {
        let err = DataError::from(BackendError::from(FetchError::Timeout));
        assert_eq!(err.code(), None);
        assert_eq!(err.user_message(), GENERIC_MESSAGE);
    }

    #[test]
    fn test_retry_exhaustion_is_transient() {
        let err = DataError::from(RetryError {
            operation: "upload",
            attempts: 3,
            source: BackendError::from(FetchError::Connection("reset".into())),
        });
        assert_eq!(err, DataError::TransientIo { attempts: 3 });
        assert_eq!(err.presentation(), Presentation::Notification);
    }

    #[test]
    fn test_validation_is_modal() {
        let err = DataError::from(ValidationError::InvalidEmail);
        assert_eq!(err.presentation(), Presentation::Modal);
        assert_eq!(err.user_message(), "Please enter a valid email address");
    }
}
