//! Error types for wavelength operations

use thiserror::Error;

/// Message carried by every `NotFound` raised by the command layer.
pub const MODEL_DOES_NOT_EXIST: &str = "Model does not exist";

/// Fixed message for store failures outside the translated taxonomy.
pub const NOT_AVAILABLE: &str = "Not Available";

/// Store error code for a request the store rejected as malformed.
pub const VALIDATION_EXCEPTION: &str = "ValidationException";

/// Store error code for a failed conditional write.
pub const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailedException";

/// Coarse classification of a [`DalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    ValidationFailure,
    Conflict,
    Unavailable,
    /// Development-time defect, never produced by store translation.
    NotImplemented,
}

impl ErrorKind {
    /// HTTP status used at the serverless response boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::ValidationFailure => 422,
            ErrorKind::Conflict => 409,
            ErrorKind::Unavailable => 503,
            ErrorKind::NotImplemented => 500,
        }
    }
}

/// Errors surfaced by the data-access layer.
///
/// `Display` renders the carried message verbatim so callers can hand it
/// straight to a response body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DalError {
    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    ValidationFailure { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("{message}")]
    Unavailable { message: String },

    #[error("Must override this in a child command class")]
    NotImplemented,
}

impl DalError {
    /// `NotFound` with the standard "Model does not exist" message.
    pub fn not_found() -> Self {
        DalError::NotFound {
            message: MODEL_DOES_NOT_EXIST.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DalError::ValidationFailure {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        DalError::Conflict {
            message: message.into(),
        }
    }

    /// `Unavailable` with the fixed generic message.
    pub fn unavailable() -> Self {
        DalError::Unavailable {
            message: NOT_AVAILABLE.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DalError::NotFound { .. } => ErrorKind::NotFound,
            DalError::ValidationFailure { .. } => ErrorKind::ValidationFailure,
            DalError::Conflict { .. } => ErrorKind::Conflict,
            DalError::Unavailable { .. } => ErrorKind::Unavailable,
            DalError::NotImplemented => ErrorKind::NotImplemented,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DalError::NotFound { .. })
    }
}

/// Conditions reported by the external store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed row does not exist.
    #[error("Does not exist: {message}")]
    DoesNotExist { message: String },

    /// The store answered with a coded client error.
    #[error("{code}: {message}")]
    Client { code: String, message: String },

    /// The store could not be reached or failed without a code.
    #[error("Connection failed: {reason}")]
    Connection { reason: String },
}

impl StoreError {
    pub fn does_not_exist(message: impl Into<String>) -> Self {
        StoreError::DoesNotExist {
            message: message.into(),
        }
    }

    pub fn client(code: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Client {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::client(VALIDATION_EXCEPTION, message)
    }

    pub fn conditional_check_failed(message: impl Into<String>) -> Self {
        Self::client(CONDITIONAL_CHECK_FAILED, message)
    }

    pub fn connection(reason: impl Into<String>) -> Self {
        StoreError::Connection {
            reason: reason.into(),
        }
    }
}

/// Normalize a store outcome into the four-kind taxonomy.
///
/// Anything other than a missing row, a validation rejection or a failed
/// condition collapses into `Unavailable` without leaking store detail.
pub fn translate_store_error(err: StoreError) -> DalError {
    match err {
        StoreError::DoesNotExist { .. } => DalError::not_found(),
        StoreError::Client { code, message } if code == VALIDATION_EXCEPTION => {
            DalError::validation(message)
        }
        StoreError::Client { code, message } if code == CONDITIONAL_CHECK_FAILED => {
            DalError::conflict(message)
        }
        StoreError::Client { .. } | StoreError::Connection { .. } => DalError::unavailable(),
    }
}

impl From<StoreError> for DalError {
    fn from(err: StoreError) -> Self {
        translate_store_error(err)
    }
}

/// Attribute codec errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Boolean not supported for Epoch")]
    BooleanEpoch,

    #[error("Unable to parse string as a datetime")]
    InvalidDatetime,

    #[error("Epoch value {value} is out of range")]
    EpochOutOfRange { value: String },

    #[error("Attribute {attribute} expects a {expected} value")]
    TypeMismatch { attribute: String, expected: String },
}

impl From<CodecError> for DalError {
    fn from(err: CodecError) -> Self {
        DalError::validation(err.to_string())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl From<ConfigError> for DalError {
    fn from(err: ConfigError) -> Self {
        DalError::validation(err.to_string())
    }
}

/// Result type alias for data-access operations.
pub type DalResult<T> = Result<T, DalError>;

// =============================================================================
// TESTS
// =============================================================================
