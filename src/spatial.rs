//! Spatial disaggregation: one sampled point per reported person.
//!
//! For every area of a nation the reported population is read from the count
//! table and that many points are sampled inside the area's boundary. The
//! boundary layer and the count table must describe exactly the same areas.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::Utc;
use log::{debug, info};
use rand::Rng;

use crate::error::{Result, SynthError};
use crate::population::PopulationTable;
use crate::sampler::{sample_points, SampleFailure, SamplerParams};
use crate::schema::{AreaIndex, FieldSpec, Nation, Schema};
use crate::sources::{load_boundaries, AreaBoundary, CountTable};

/// Options for the spatial stage.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpatialParams {
    pub sampler: SamplerParams,
    /// Stop after this many areas. Development aid.
    pub limit_areas: Option<usize>,
}

/// Load a nation's sources and sample its population.
pub fn synthesize_nation<R: Rng + ?Sized>(
    nation: Nation,
    schema: &Schema,
    data_dir: &Path,
    rng: &mut R,
    params: &SpatialParams,
) -> Result<PopulationTable> {
    let boundary_path = schema.boundaries.resolve(data_dir);
    let boundaries = load_boundaries(&boundary_path, &schema.boundaries.code_field, nation)?;
    info!("{} boundaries {}", nation, boundaries.len());

    let population = schema.population(nation)?;
    let counts = CountTable::load(data_dir, &population.source)?;

    disaggregate(nation, &boundaries, &counts, &population.column, rng, params)
}

/// Sample the population of every boundary from its row in `counts`.
///
/// Count rows are restricted to the nation by their code: the first letter for
/// a named index column, the output-area prefix when the code is the first
/// column (such tables carry nation and council summary rows too).
pub fn disaggregate<R: Rng + ?Sized>(
    nation: Nation,
    boundaries: &[AreaBoundary],
    counts: &CountTable,
    column: &str,
    rng: &mut R,
    params: &SpatialParams,
) -> Result<PopulationTable> {
    let prefix = match counts.index() {
        AreaIndex::Column(_) => nation.letter().to_string(),
        AreaIndex::FirstColumn => nation.area_prefix(),
    };
    let rows = counts.rows_with_prefix(&prefix)?;
    if rows.len() != boundaries.len() {
        return Err(SynthError::AreaCountMismatch {
            nation: nation.letter(),
            boundaries: boundaries.len(),
            counts: rows.len(),
        });
    }

    let mut by_code: HashMap<&str, Vec<_>> = HashMap::with_capacity(rows.len());
    for (code, row) in rows {
        by_code.entry(code).or_default().push(row);
    }
    let field = counts.resolve(&FieldSpec::Single(column.to_string()))?;

    // Distinct boundary codes, each matching one row, with equal cardinality:
    // every count row of the nation is claimed by exactly one boundary.
    let mut seen = HashSet::with_capacity(boundaries.len());
    let mut resolved = Vec::with_capacity(boundaries.len());
    for area in boundaries {
        if !seen.insert(area.code.as_str()) {
            return Err(SynthError::AreaNotUnique {
                area_code: area.code.clone(),
                source_name: "boundary layer".to_string(),
                found: boundaries.iter().filter(|b| b.code == area.code).count(),
            });
        }

        let matches = by_code.get(area.code.as_str()).map_or(&[][..], Vec::as_slice);
        if matches.len() != 1 {
            return Err(SynthError::AreaNotUnique {
                area_code: area.code.clone(),
                source_name: counts.name.clone(),
                found: matches.len(),
            });
        }
        resolved.push((area, matches[0].count(&field)? as usize));
    }

    let mut table = PopulationTable::new();
    let start = Utc::now();

    for (i, (area, count)) in resolved.into_iter().enumerate() {
        if params.limit_areas.is_some_and(|limit| i >= limit) {
            info!("Stopping after {} areas", i);
            break;
        }
        debug!("{} {} {}", i, area.code, count);

        let points = sample_points(&area.boundary, count, rng, &params.sampler).map_err(|failure| match failure {
            SampleFailure::Degenerate => SynthError::DegenerateGeometry {
                area_code: area.code.clone(),
            },
            SampleFailure::Exhausted { batches, found } => SynthError::SamplingExhausted {
                area_code: area.code.clone(),
                batches,
                found,
                requested: count,
            },
        })?;
        table.push_area(&area.code, &points);
    }

    let elapsed = Utc::now() - start;
    info!(
        "Calculation time {:.3} s",
        elapsed.num_milliseconds() as f64 / 1000.0
    );
    info!("Total people {} in {} areas", table.len(), table.areas().len());

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Boundary, Polygon};
    use crate::seeds::{nation_rng, SPATIAL_SEED};

    fn area(code: &str, boundary: impl Into<Boundary>) -> AreaBoundary {
        AreaBoundary {
            code: code.to_string(),
            boundary: boundary.into(),
        }
    }

    fn scotland_counts(rows: &[&[&str]]) -> CountTable {
        CountTable::from_rows("QS101SC.csv", &["", "All people"], AreaIndex::FirstColumn, rows)
    }

    #[test]
    fn test_unit_square_area() {
        let boundaries = vec![area("S001", Polygon::rectangle(0.0, 0.0, 1.0, 1.0))];
        let counts = scotland_counts(&[&["S92000003", "10"], &["S001", "10"]]);
        let mut rng = nation_rng(SPATIAL_SEED, Nation::Scotland);

        let table = disaggregate(Nation::Scotland, &boundaries, &counts, "All people", &mut rng, &SpatialParams::default()).unwrap();

        assert_eq!(table.len(), 10);
        for row in 0..table.len() {
            let p = table.point(row);
            assert_eq!(table.area_code(row), "S001");
            assert!((0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y));
        }
    }

    #[test]
    fn test_count_preservation_and_containment() {
        let boundaries = vec![
            area("S002", Polygon::rectangle(0.0, 0.0, 2.0, 1.0)),
            area("S001", Polygon::rectangle(10.0, 10.0, 11.0, 13.0)),
            area("S003", Polygon::rectangle(-5.0, -5.0, -4.0, -4.0)),
        ];
        let counts = scotland_counts(&[&["S001", "1,234"], &["S002", "7"], &["S003", "-"]]);
        let mut rng = nation_rng(SPATIAL_SEED, Nation::Scotland);

        let table = disaggregate(Nation::Scotland, &boundaries, &counts, "All people", &mut rng, &SpatialParams::default()).unwrap();

        let per_area = table.count_by_area();
        assert_eq!(per_area.get("S001"), Some(&1234));
        assert_eq!(per_area.get("S002"), Some(&7));
        assert_eq!(per_area.get("S003"), None);
        assert_eq!(table.len(), 1241);

        let by_code: HashMap<_, _> = boundaries.iter().map(|a| (a.code.as_str(), &a.boundary)).collect();
        for row in 0..table.len() {
            assert!(by_code[table.area_code(row)].contains(table.point(row)));
        }
    }

    #[test]
    fn test_deterministic_across_runs() {
        let boundaries = vec![area("W001", Polygon::rectangle(0.0, 0.0, 3.0, 3.0))];
        let counts = CountTable::from_rows(
            "KS101",
            &["GeographyCode", "KS101EW0001"],
            AreaIndex::Column("GeographyCode".into()),
            &[&["W001", "25"]],
        );

        let run = || {
            let mut rng = nation_rng(SPATIAL_SEED, Nation::Wales);
            disaggregate(Nation::Wales, &boundaries, &counts, "KS101EW0001", &mut rng, &SpatialParams::default()).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_cardinality_mismatch_is_fatal() {
        let boundaries = vec![area("S001", Polygon::rectangle(0.0, 0.0, 1.0, 1.0))];
        let counts = scotland_counts(&[&["S001", "10"], &["S002", "4"]]);
        let mut rng = nation_rng(SPATIAL_SEED, Nation::Scotland);

        match disaggregate(Nation::Scotland, &boundaries, &counts, "All people", &mut rng, &SpatialParams::default()) {
            Err(SynthError::AreaCountMismatch { nation, boundaries, counts }) => {
                assert_eq!((nation, boundaries, counts), ('S', 1, 2));
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_unresolved_and_duplicate_codes_are_fatal() {
        let boundaries = vec![
            area("S001", Polygon::rectangle(0.0, 0.0, 1.0, 1.0)),
            area("S002", Polygon::rectangle(0.0, 0.0, 1.0, 1.0)),
        ];
        let counts = scotland_counts(&[&["S001", "1"], &["S001", "2"]]);
        let mut rng = nation_rng(SPATIAL_SEED, Nation::Scotland);

        match disaggregate(Nation::Scotland, &boundaries, &counts, "All people", &mut rng, &SpatialParams::default()) {
            Err(SynthError::AreaNotUnique { area_code, found, .. }) => {
                assert_eq!(area_code, "S001");
                assert_eq!(found, 2);
            }
            other => panic!("expected non-unique code, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_boundary_code_is_fatal() {
        let boundaries = vec![
            area("S001", Polygon::rectangle(0.0, 0.0, 1.0, 1.0)),
            area("S001", Polygon::rectangle(0.0, 0.0, 1.0, 1.0)),
        ];
        let counts = scotland_counts(&[&["S001", "10"], &["S002", "4"]]);
        let mut rng = nation_rng(SPATIAL_SEED, Nation::Scotland);

        match disaggregate(Nation::Scotland, &boundaries, &counts, "All people", &mut rng, &SpatialParams::default()) {
            Err(SynthError::AreaNotUnique { area_code, source_name, found }) => {
                assert_eq!(area_code, "S001");
                assert_eq!(source_name, "boundary layer");
                assert_eq!(found, 2);
            }
            other => panic!("expected repeated boundary code, got {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_area_is_fatal() {
        let boundaries = vec![area("S001", Polygon::rectangle(0.0, 0.0, 1.0, 0.0))];
        let counts = scotland_counts(&[&["S001", "3"]]);
        let mut rng = nation_rng(SPATIAL_SEED, Nation::Scotland);

        assert!(matches!(
            disaggregate(Nation::Scotland, &boundaries, &counts, "All people", &mut rng, &SpatialParams::default()),
            Err(SynthError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_limit_areas() {
        let boundaries = vec![
            area("S001", Polygon::rectangle(0.0, 0.0, 1.0, 1.0)),
            area("S002", Polygon::rectangle(0.0, 0.0, 1.0, 1.0)),
        ];
        let counts = scotland_counts(&[&["S001", "3"], &["S002", "4"]]);
        let mut rng = nation_rng(SPATIAL_SEED, Nation::Scotland);
        let params = SpatialParams {
            limit_areas: Some(1),
            ..SpatialParams::default()
        };

        let table = disaggregate(Nation::Scotland, &boundaries, &counts, "All people", &mut rng, &params).unwrap();
        assert_eq!(table.areas(), &["S001".to_string()]);
        assert_eq!(table.len(), 3);
    }
}
