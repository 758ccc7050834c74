//! User-facing error taxonomy for the public operations.
//!
//! Every failure that reaches a caller carries one of the explicit kinds
//! below. Raw collaborator failures travel as [`ApiError::Store`] and are
//! normalized to a generic denial at the top of each public operation, so
//! storage internals never leak into user-visible messages.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The caller supplied no authenticated principal.
    #[error("The function must be called while caller is authenticated.")]
    Unauthenticated,

    /// Malformed input or missing target.
    #[error("{0}")]
    Precondition(String),

    /// A draft field rule was violated; carries the human-readable reason.
    #[error("{0}")]
    Validation(String),

    /// Cover image absent from the object store or URL host mismatch.
    #[error("Image validation failed")]
    ImageValidation,

    /// Image relocation failed after validation already passed.
    #[error("image moving failed")]
    ImageMove,

    /// A vote intent redundant with the current relation state.
    #[error("{0}")]
    AlreadyExists(String),

    /// Generic denial shown to users when an internal error was normalized.
    #[error("There was an error. Please try again or contact support.")]
    Denied,

    /// Unclassified collaborator failure during deletion.
    #[error("deletion encountered an error of unknown cause")]
    Unknown,

    /// Untagged internal failure; must not escape a public operation.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl ApiError {
    /// Short machine-readable code, one per kind.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::Precondition(_) => "failed-precondition",
            ApiError::Validation(_) => "validation-failed",
            ApiError::ImageValidation => "image-validation-failed",
            ApiError::ImageMove => "image-move-failed",
            ApiError::AlreadyExists(_) => "already-exists",
            ApiError::Denied => "permission-denied",
            ApiError::Unknown => "unknown",
            ApiError::Store(_) => "internal",
        }
    }

    /// Replace an untagged internal failure with the generic denial.
    /// Errors that already carry an explicit kind pass through unchanged.
    pub fn normalize_denied(self) -> Self {
        match self {
            ApiError::Store(err) => {
                tracing::warn!(?err, "internal error normalized to generic denial");
                ApiError::Denied
            }
            other => other,
        }
    }

    /// Deletion variant of [`Self::normalize_denied`].
    pub fn normalize_unknown(self) -> Self {
        match self {
            ApiError::Store(err) => {
                tracing::warn!(?err, "internal error during deletion");
                ApiError::Unknown
            }
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Argument check shared by every public operation: ids must be non-empty.
pub fn require_id(value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ApiError::Precondition("args mustn't be empty".into()));
    }
    Ok(())
}
