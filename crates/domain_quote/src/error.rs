//! Quote domain errors

use thiserror::Error;

use core_kernel::{PortError, QuoteId};

use crate::quote::QuoteStatus;

/// Errors that can occur in the quoting domain
#[derive(Debug, Error)]
pub enum QuoteError {
    /// The quote id does not resolve to a stored quote
    #[error("Quote not found: {0}")]
    QuoteNotFound(QuoteId),

    /// The requested lifecycle transition is not allowed from the current status
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: QuoteStatus,
        to: QuoteStatus,
    },

    /// Edits are only accepted while the quote is a draft
    #[error("Only draft quotes can be edited (status is {0})")]
    NotModifiable(QuoteStatus),

    /// Input rejected before reaching storage
    #[error("Validation error: {0}")]
    Validation(String),

    /// Stored rating data references a cover or modifier that does not exist
    #[error("Data integrity violation: {0}")]
    Integrity(String),

    /// A premium does not fit in a `Decimal`
    #[error("Arithmetic overflow: {0}")]
    Arithmetic(String),

    /// Any other storage failure
    #[error("Storage error: {0}")]
    Storage(PortError),
}

impl QuoteError {
    /// Creates a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        QuoteError::Validation(message.into())
    }

    /// Creates an arithmetic overflow error
    pub fn arithmetic(message: impl Into<String>) -> Self {
        QuoteError::Arithmetic(message.into())
    }

    /// Returns true if retrying the operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, QuoteError::Storage(err) if err.is_transient())
    }
}

impl From<PortError> for QuoteError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Integrity { message } => QuoteError::Integrity(message),
            PortError::Validation { message, field: Some(field) } => {
                QuoteError::Validation(format!("{}: {}", field, message))
            }
            PortError::Validation { message, field: None } => QuoteError::Validation(message),
            other => QuoteError::Storage(other),
        }
    }
}
