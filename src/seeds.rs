//! Seed management for population synthesis
//!
//! Each synthesis stage gets its own base seed. The generator for one nation is
//! derived from that base and the nation letter, so adding or removing a nation
//! or an attribute never perturbs the random outcome of another.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::schema::Nation;

/// Base seed of the spatial stage.
pub const SPATIAL_SEED: u64 = 5912;
/// Base seed of the highest qualification attribute.
pub const QUALIFICATION_SEED: u64 = 41953;
/// Base seed of the ethnic group attribute.
pub const ETHNIC_GROUP_SEED: u64 = 29481;

/// Base seeds for the synthesis stages.
///
/// Attribute seeds live in the schema next to their categories; the values
/// here override them when set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthSeeds {
    /// Point sampling inside area boundaries
    pub spatial: u64,
    /// Attribute overrides, keyed by attribute column name
    pub attributes: Vec<(String, u64)>,
}

impl SynthSeeds {
    /// Seeds used by the published 2011 census population.
    pub fn census_2011() -> Self {
        Self {
            spatial: SPATIAL_SEED,
            attributes: Vec::new(),
        }
    }

    /// Create a builder for customizing individual seeds
    pub fn builder() -> SynthSeedsBuilder {
        SynthSeedsBuilder::new()
    }

    /// Base seed for an attribute, falling back to the schema's own value.
    pub fn attribute(&self, column: &str, schema_seed: u64) -> u64 {
        self.attributes
            .iter()
            .rev()
            .find(|(name, _)| name == column)
            .map(|&(_, seed)| seed)
            .unwrap_or(schema_seed)
    }

    /// Generator for the spatial stage of one nation.
    pub fn spatial_rng(&self, nation: Nation) -> ChaCha8Rng {
        nation_rng(self.spatial, nation)
    }
}

impl Default for SynthSeeds {
    fn default() -> Self {
        Self::census_2011()
    }
}

/// Builder for overriding individual seeds
pub struct SynthSeedsBuilder {
    seeds: SynthSeeds,
}

impl SynthSeedsBuilder {
    pub fn new() -> Self {
        Self {
            seeds: SynthSeeds::census_2011(),
        }
    }

    /// Override the spatial seed
    pub fn spatial(mut self, seed: u64) -> Self {
        self.seeds.spatial = seed;
        self
    }

    /// Override the seed of one attribute column
    pub fn attribute(mut self, column: impl Into<String>, seed: u64) -> Self {
        self.seeds.attributes.push((column.into(), seed));
        self
    }

    pub fn build(self) -> SynthSeeds {
        self.seeds
    }
}

impl Default for SynthSeedsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive the seed of one nation from a stage's base seed.
///
/// The result is the base plus the letter's code point, and must stay identical
/// across toolchains and platforms.
pub fn derive_seed(base: u64, nation_letter: char) -> u64 {
    base.wrapping_add(nation_letter as u64)
}

/// Fresh generator for one nation of one stage.
pub fn nation_rng(base: u64, nation: Nation) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(derive_seed(base, nation.letter()))
}

impl std::fmt::Display for SynthSeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SynthSeeds {{ spatial: {}", self.spatial)?;
        for (name, seed) in &self.attributes {
            write!(f, ", {}: {}", name, seed)?;
        }
        write!(f, " }}")
    }
}
