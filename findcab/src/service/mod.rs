//! Storage backends for cab positions.
//!
//! Every backend implements the [`CabService`] contract, so callers hold an
//! `Arc<dyn CabService>` and never a concrete store type. Two backends are
//! provided: [`MemoryCabService`] (volatile, linear-scan queries) and
//! [`SqliteCabService`] (persistent, R*Tree-indexed queries).

mod error;
mod memory;
mod sqlite;
mod r#trait;

pub use error::ServiceError;
pub use memory::MemoryCabService;
pub use sqlite::SqliteCabService;
pub use r#trait::CabService;
