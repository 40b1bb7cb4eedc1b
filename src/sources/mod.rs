//! Readers for the downloaded census sources
//!
//! - **Files**: `*` pattern expansion in sorted filename order
//! - **Counts**: CSV count tables and count field parsing
//! - **Boundaries**: GeoJSON polygon layer of area boundaries

pub mod boundaries;
pub mod counts;
pub mod files;

pub use boundaries::{load_boundaries, AreaBoundary};
pub use counts::{parse_count, CountTable};
pub use files::resolve_files;
