//! Error type shared by every synthesis stage.
//!
//! All of these are fatal for the nation or attribute being processed. Nothing
//! is retried and nothing is persisted once one of them has been raised.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while synthesizing a population.
#[derive(Debug, Error)]
pub enum SynthError {
    /// Boundary layer and count table disagree on how many areas a nation has.
    #[error("mismatch in number of output areas for nation {nation}: {boundaries} boundaries, {counts} count rows")]
    AreaCountMismatch {
        nation: char,
        boundaries: usize,
        counts: usize,
    },

    /// An area code resolved to zero or several rows of a source table.
    #[error("expected 1 row matching area code {area_code} in {source_name}, found {found}")]
    AreaNotUnique {
        area_code: String,
        source_name: String,
        found: usize,
    },

    /// Category sub-counts add up to more people than the area was given.
    #[error("category counts for area {area_code} exceed its population: {npeople} people, {ntotal} categorised")]
    CategoryExcess {
        area_code: String,
        npeople: usize,
        ntotal: u64,
    },

    /// A count field was neither an integer, a comma-grouped integer nor the `-` placeholder.
    #[error("malformed count {value:?} in column {column}")]
    MalformedCount { column: String, value: String },

    /// A column named by the schema does not exist in the source table.
    #[error("column {column} not found in {source_name}")]
    MissingColumn { column: String, source_name: String },

    /// A source file, or every file matching a pattern, is absent.
    #[error("source not found: {}", .0.display())]
    MissingSource(PathBuf),

    /// The attribute stage ran before the nation's population table was written.
    #[error("population table does not exist: {}", .0.display())]
    MissingPopulation(PathBuf),

    /// The schema has no entry for the nation or attribute requested.
    #[error("schema has no {what} entry for nation {nation}")]
    MissingSchemaEntry { what: String, nation: char },

    /// A boundary polygon with no area cannot contain any sampled point.
    #[error("boundary of area {area_code} has zero area")]
    DegenerateGeometry { area_code: String },

    /// Rejection sampling used up its batch budget without filling the request.
    #[error("sampling for area {area_code} gave up after {batches} batches with {found} of {requested} points")]
    SamplingExhausted {
        area_code: String,
        batches: usize,
        found: usize,
        requested: usize,
    },

    /// A boundary feature or population row could not be interpreted.
    #[error("invalid {what}: {detail}")]
    Invalid { what: &'static str, detail: String },

    #[error("unknown nation letter {0:?}")]
    UnknownNation(char),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid file pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl SynthError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SynthError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SynthError>;
