//! Whole-run orchestration.
//!
//! Nations are processed one after another, and each stage of a nation is
//! persisted before the next begins. A stage whose output already exists is
//! skipped, so an interrupted run can simply be restarted.

use std::path::PathBuf;

use log::info;

use crate::attributes::synthesize_attribute;
use crate::error::{Result, SynthError};
use crate::schema::{Nation, Schema};
use crate::seeds::{nation_rng, SynthSeeds};
use crate::spatial::{synthesize_nation, SpatialParams};
use crate::store::PopulationStore;

/// Options for a synthesis run.
#[derive(Clone, Debug)]
pub struct SynthOptions {
    /// Root of the downloaded sources.
    pub data_dir: PathBuf,
    /// Where population tables are written.
    pub output_dir: PathBuf,
    /// Restrict the run to these nations. Empty means all.
    pub nations: Vec<Nation>,
    pub spatial: SpatialParams,
    pub seeds: SynthSeeds,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            nations: Vec::new(),
            spatial: SpatialParams::default(),
            seeds: SynthSeeds::default(),
        }
    }
}

/// What a stage did for one nation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageOutcome {
    /// The output was computed and written.
    Written { people: usize },
    /// The output already existed and was left alone.
    Skipped,
}

/// Runs the synthesis stages against a schema and an output store.
pub struct Synthesizer {
    schema: Schema,
    store: PopulationStore,
    options: SynthOptions,
}

impl Synthesizer {
    pub fn new(schema: Schema, options: SynthOptions) -> Self {
        let store = PopulationStore::new(options.output_dir.clone());
        Self {
            schema,
            store,
            options,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn store(&self) -> &PopulationStore {
        &self.store
    }

    /// Nations to process, in schema order.
    pub fn nations(&self) -> Vec<Nation> {
        self.schema
            .nations
            .iter()
            .copied()
            .filter(|n| self.options.nations.is_empty() || self.options.nations.contains(n))
            .collect()
    }

    /// Sample the people of one nation unless its table already exists.
    pub fn people(&self, nation: Nation) -> Result<StageOutcome> {
        if self.store.exists(nation) {
            info!("File {} already exists", self.store.path(nation).display());
            return Ok(StageOutcome::Skipped);
        }

        let mut rng = self.options.seeds.spatial_rng(nation);
        let table = synthesize_nation(
            nation,
            &self.schema,
            &self.options.data_dir,
            &mut rng,
            &self.options.spatial,
        )?;
        self.store.save(nation, &table)?;

        info!(
            "{}: people {}, areas {}",
            nation.name(),
            table.len(),
            table.areas().len()
        );
        Ok(StageOutcome::Written { people: table.len() })
    }

    /// Add one attribute column to a nation's table unless it is already there.
    pub fn attribute(&self, column: &str, nation: Nation) -> Result<StageOutcome> {
        let attribute = self
            .schema
            .attribute(column)
            .ok_or_else(|| SynthError::Invalid {
                what: "attribute",
                detail: format!("schema has no attribute {}", column),
            })?;

        let mut table = self.store.load(nation, &self.schema.attributes)?;
        if table.has_column(column) {
            info!(
                "{} already contains {}",
                self.store.path(nation).display(),
                column
            );
            return Ok(StageOutcome::Skipped);
        }

        let seed = self.options.seeds.attribute(column, attribute.seed);
        let mut rng = nation_rng(seed, nation);
        synthesize_attribute(nation, attribute, &self.options.data_dir, &mut table, &mut rng)?;

        info!("Overwriting {}", self.store.path(nation).display());
        self.store.save(nation, &table)?;
        Ok(StageOutcome::Written { people: table.len() })
    }

    /// Spatial stage for every selected nation.
    pub fn run_people(&self) -> Result<()> {
        for nation in self.nations() {
            self.people(nation)?;
        }
        Ok(())
    }

    /// One attribute for every selected nation.
    pub fn run_attribute(&self, column: &str) -> Result<()> {
        for nation in self.nations() {
            self.attribute(column, nation)?;
        }
        Ok(())
    }

    /// Every stage: people first, then each attribute in schema order.
    pub fn run_all(&self) -> Result<()> {
        self.run_people()?;
        let columns: Vec<String> = self
            .schema
            .attributes
            .iter()
            .map(|a| a.column.clone())
            .collect();
        for column in columns {
            self.run_attribute(&column)?;
        }
        Ok(())
    }
}
