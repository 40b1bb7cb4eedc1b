//! Synthetic population generation from aggregate census tables
//!
//! Re-exports modules for use by the command line tool and tests.

pub mod attributes;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod pipeline;
pub mod population;
pub mod sampler;
pub mod schema;
pub mod seeds;
pub mod sources;
pub mod spatial;
pub mod store;

pub use error::{Result, SynthError};
pub use pipeline::{StageOutcome, SynthOptions, Synthesizer};
pub use schema::{Nation, Schema};
