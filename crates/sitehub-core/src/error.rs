//! Unified application error types for SiteHub.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Callers branch on [`ErrorKind`] and
//! [`ErrorCode`], never on the message text.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested record was not found.
    NotFound,
    /// The permission gate (or a server-side policy) denied the action.
    Authorization,
    /// Client-side validation failed before any network call.
    Validation,
    /// A conflict occurred (duplicate entry, concurrent modification, etc.).
    Conflict,
    /// The hosted backend failed or was unreachable.
    Remote,
    /// Writing to the audit log failed. Never propagated past a mutation.
    Audit,
    /// A cache error occurred.
    Cache,
    /// An object storage error occurred.
    Storage,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An operation did not finish within its deadline.
    Timeout,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Remote => write!(f, "REMOTE"),
            Self::Audit => write!(f, "AUDIT"),
            Self::Cache => write!(f, "CACHE"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Machine-readable cause attached to service errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Reading rows failed.
    FetchError,
    /// Inserting a row failed.
    CreateError,
    /// Updating a row failed.
    UpdateError,
    /// Deleting a row failed.
    DeleteError,
    /// The server could not allocate a sequence number.
    SequenceError,
    /// The record has no client email to notify.
    MissingClientEmail,
    /// The email sender rejected the request.
    EmailError,
    /// Uploading an attachment failed.
    UploadError,
    /// Removing an attachment failed.
    AttachmentDeleteError,
    /// Appending to the audit log failed.
    AuditLogError,
    /// Reading the audit trail failed.
    AuditFetchError,
    /// A suggestion helper failed.
    SuggestionError,
    /// The permission gate denied the action.
    PermissionDenied,
    /// A form submission exceeded its deadline.
    SubmitTimeout,
}

impl ErrorCode {
    /// Return the stable wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchError => "FETCH_ERROR",
            Self::CreateError => "CREATE_ERROR",
            Self::UpdateError => "UPDATE_ERROR",
            Self::DeleteError => "DELETE_ERROR",
            Self::SequenceError => "SEQUENCE_ERROR",
            Self::MissingClientEmail => "MISSING_CLIENT_EMAIL",
            Self::EmailError => "EMAIL_ERROR",
            Self::UploadError => "UPLOAD_ERROR",
            Self::AttachmentDeleteError => "ATTACHMENT_DELETE_ERROR",
            Self::AuditLogError => "AUDIT_LOG_ERROR",
            Self::AuditFetchError => "AUDIT_FETCH_ERROR",
            Self::SuggestionError => "SUGGESTION_ERROR",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::SubmitTimeout => "SUBMIT_TIMEOUT",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unified application error used throughout SiteHub.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message, suitable for a notification.
    pub message: String,
    /// Optional machine-readable cause.
    pub code: Option<ErrorCode>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            source: Some(Box::new(source)),
        }
    }

    /// Attach a machine-readable code.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Whether this error carries the given code.
    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.code == Some(code)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a permission error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message).with_code(ErrorCode::PermissionDenied)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a remote (network/server) error.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Remote, message)
    }

    /// Create an audit logging error.
    pub fn audit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Audit, message).with_code(ErrorCode::AuditLogError)
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cache, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether the error came from the remote backend.
    pub fn is_remote(&self) -> bool {
        self.kind == ErrorKind::Remote
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            code: self.code,
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
