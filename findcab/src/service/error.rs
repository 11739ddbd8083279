//! Service error taxonomy.

use crate::model::CabId;
use thiserror::Error;

/// Errors a [`crate::service::CabService`] operation can fail with.
///
/// `NotFound` is an expected outcome, not an anomaly; `Backend` covers
/// everything the underlying store can do wrong and is propagated verbatim,
/// never retried here. Retry policy, if any, belongs to the transport layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No record exists for the given id.
    #[error("no cab found for id {0}")]
    NotFound(CabId),

    /// A request parameter is malformed (e.g. a negative radius).
    ///
    /// Boundary layers reject these before a backend sees them; the variant
    /// exists so they have a shared vocabulary for it.
    #[error("bad parameter: {0}")]
    BadParameter(String),

    /// The underlying store is unreachable or returned an unexpected fault.
    #[error("backend failure: {0}")]
    Backend(String),
}

impl ServiceError {
    /// Build a `Backend` error from any displayable cause.
    pub fn backend(cause: impl ToString) -> Self {
        Self::Backend(cause.to_string())
    }

    /// Whether this is the expected missing-record outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_not_found() {
        let err = ServiceError::NotFound(CabId(7));
        assert_eq!(err.to_string(), "no cab found for id 7");
    }

    #[test]
    fn test_display_bad_parameter() {
        let err = ServiceError::BadParameter("radius must be non-negative".to_string());
        assert!(err.to_string().contains("bad parameter"));
        assert!(err.to_string().contains("radius"));
    }

    #[test]
    fn test_display_backend() {
        let err = ServiceError::backend("disk on fire");
        assert!(err.to_string().contains("backend failure"));
        assert!(err.to_string().contains("disk on fire"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(ServiceError::NotFound(CabId(1)).is_not_found());
        assert!(!ServiceError::backend("nope").is_not_found());
    }

    #[test]
    fn test_error_trait() {
        let err = ServiceError::NotFound(CabId(1));
        let _: &dyn std::error::Error = &err;
    }
}
