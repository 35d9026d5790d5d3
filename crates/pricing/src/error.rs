use thiserror::Error;

use botica_core::DomainError;

/// Pricing failures. All of them are caller errors; none are retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("{field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("unknown scale code '{0}'")]
    UnknownScale(String),

    #[error("invalid scale definition '{code}': {reason}")]
    InvalidScale { code: String, reason: String },

    #[error("duplicate scale code '{0}'")]
    DuplicateScale(String),
}

impl PricingError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

impl From<PricingError> for DomainError {
    fn from(value: PricingError) -> Self {
        DomainError::validation(value.to_string())
    }
}
