//! Service trait definition for dependency injection.

use crate::model::{Cab, CabId, ProximityQuery};
use crate::service::ServiceError;

/// Storage abstraction for cab positions.
///
/// Enables different backends (in-memory, SQLite, test doubles) to be used
/// interchangeably; the REST adapter and the CLI only ever hold a
/// `dyn CabService`.
///
/// Each instance is shared across all concurrent callers, so implementations
/// must be internally synchronized. Operations are synchronous and do not
/// block indefinitely; timeouts and retries are the transport layer's
/// concern.
pub trait CabService: Send + Sync {
    /// Get the record for the given id.
    ///
    /// Fails with [`ServiceError::NotFound`] if no record exists. No side
    /// effects.
    fn read(&self, id: CabId) -> Result<Cab, ServiceError>;

    /// Insert or fully replace the record keyed by `cab.id`.
    ///
    /// Idempotent; there is no partial-field update.
    fn upsert(&self, cab: Cab) -> Result<(), ServiceError>;

    /// Remove the record for the given id.
    ///
    /// Idempotent: succeeds even if the id was never present.
    fn delete(&self, id: CabId) -> Result<(), ServiceError>;

    /// Remove every record.
    ///
    /// Backends that maintain an index must re-establish it before
    /// returning, leaving the store immediately queryable, and must
    /// propagate a failed re-initialization rather than swallowing it.
    fn delete_all(&self) -> Result<(), ServiceError>;

    /// Find cabs within `query.radius` of `query.center`.
    ///
    /// The query is sanitized (default unit/limit applied) before
    /// evaluation. Results come back in the backend's natural scan order,
    /// NOT sorted by distance, truncated to at most the sanitized limit.
    /// An empty result is an empty vec, never an error.
    fn query(&self, query: ProximityQuery) -> Result<Vec<Cab>, ServiceError>;

    /// Release backend resources (e.g. a database connection).
    ///
    /// Calling further operations on a closed backend is a contract
    /// violation; backends fail fast with [`ServiceError::Backend`] rather
    /// than silently succeeding. Closing a backend that holds no resources
    /// is a no-op.
    fn close(&self);
}
