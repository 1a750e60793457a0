//! Core types and service wiring for the plocky plogging tracker.

/// Address assembly and coordinate-to-location resolution.
pub mod location;
/// In-memory transactional store.
pub mod memory;
/// Domain models and identifiers shared by all crates.
pub mod model;
/// Traits describing the storage and geocoding interfaces.
pub mod ports;
/// High-level services used by the HTTP surface.
pub mod service;

pub use location::*;
pub use memory::*;
pub use model::*;
pub use ports::*;
pub use service::*;
