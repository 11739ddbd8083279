//! findcab - location tracking for cab fleets.
//!
//! Tracks the positions of cabs identified by a numeric id and answers
//! proximity queries ("which cabs lie within radius R of point P, at most
//! N results") against a swappable storage backend.
//!
//! # High-Level API
//!
//! Callers hold an `Arc<dyn CabService>` and never a concrete backend type:
//!
//! ```
//! use findcab::geo::Location;
//! use findcab::model::{Cab, ProximityQuery};
//! use findcab::service::{CabService, MemoryCabService};
//! use std::sync::Arc;
//!
//! let service: Arc<dyn CabService> = Arc::new(MemoryCabService::new());
//! service.upsert(Cab::new(1, 38.898556, -77.037852)).unwrap();
//!
//! let nearby = service
//!     .query(ProximityQuery::new(Location::new(38.897147, -77.043934), 1000.0))
//!     .unwrap();
//! assert_eq!(nearby.len(), 1);
//! ```
//!
//! The [`http`] module wraps any backend in a REST adapter; the `findcab`
//! binary in the companion CLI crate wires the two together.

pub mod config;
pub mod geo;
pub mod http;
pub mod logging;
pub mod model;
pub mod service;

/// Version of the findcab library and CLI.
///
/// Synchronized across all workspace components; defined in `Cargo.toml`
/// and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
