//! Attribute disaggregation: categorical labels for existing people.
//!
//! Each area reports how many of its people fall in each category. Those
//! counts are laid out as contiguous runs over the area's people in category
//! order, the remainder is `other`, and the whole label vector is shuffled so
//! that which person gets which label does not depend on row order.

use std::collections::HashSet;
use std::ops::Range;
use std::path::Path;

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Result, SynthError};
use crate::population::{AttributeColumn, PopulationTable};
use crate::schema::{AttributeSet, Nation};
use crate::sources::CountTable;

/// Half-open index range of each category, by prefix sum over the counts.
pub fn category_ranges(counts: &[u64]) -> Vec<Range<usize>> {
    let mut start = 0usize;
    counts
        .iter()
        .map(|&count| {
            let end = start.saturating_add(usize::try_from(count).unwrap_or(usize::MAX));
            let range = start..end;
            start = end;
            range
        })
        .collect()
}

/// Shuffled labels for `npeople` people, `None` meaning `other`.
///
/// Fails when the categories add up to more people than there are.
pub fn assign_labels<R: Rng + ?Sized>(
    area_code: &str,
    counts: &[u64],
    npeople: usize,
    rng: &mut R,
) -> Result<Vec<Option<usize>>> {
    let ntotal = counts.iter().try_fold(0u64, |acc, &count| acc.checked_add(count));
    match ntotal {
        Some(ntotal) if ntotal <= npeople as u64 => {}
        _ => {
            return Err(SynthError::CategoryExcess {
                area_code: area_code.to_string(),
                npeople,
                ntotal: ntotal.unwrap_or(u64::MAX),
            })
        }
    }

    let mut labels = vec![None; npeople];
    for (category, range) in category_ranges(counts).into_iter().enumerate() {
        labels[range].fill(Some(category));
    }
    labels.shuffle(rng);
    Ok(labels)
}

/// Load an attribute's count table for a nation and label the nation's people.
pub fn synthesize_attribute<R: Rng + ?Sized>(
    nation: Nation,
    attribute: &AttributeSet,
    data_dir: &Path,
    table: &mut PopulationTable,
    rng: &mut R,
) -> Result<()> {
    let source = attribute.source(nation)?;
    let counts = CountTable::load(data_dir, &source.source)?;
    disaggregate_attribute(nation, attribute, &counts, table, rng)
}

/// Add `attribute` as a column of `table` using the sub-counts in `counts`.
///
/// People in areas the count table does not mention are labelled `other`.
/// On error the table is left untouched.
pub fn disaggregate_attribute<R: Rng + ?Sized>(
    nation: Nation,
    attribute: &AttributeSet,
    counts: &CountTable,
    table: &mut PopulationTable,
    rng: &mut R,
) -> Result<()> {
    info!("Adding {} to {}", attribute.column, nation.name());

    let fields = attribute
        .fields(nation)?
        .into_iter()
        .map(|field| counts.resolve(field))
        .collect::<Result<Vec<_>>>()?;

    let mut column = AttributeColumn::new(
        attribute.column.clone(),
        attribute.categories.clone(),
        table.len(),
    );

    {
        let groups = table.rows_by_area();
        let nareas = groups.len();
        let mut seen = HashSet::new();

        for (i, (code, row)) in counts.rows_with_prefix(&nation.area_prefix())?.into_iter().enumerate() {
            if !seen.insert(code) {
                let found = counts
                    .rows_with_prefix(code)?
                    .iter()
                    .filter(|(c, _)| *c == code)
                    .count();
                return Err(SynthError::AreaNotUnique {
                    area_code: code.to_string(),
                    source_name: counts.name.clone(),
                    found,
                });
            }

            let category_counts = fields
                .iter()
                .map(|field| row.count(field))
                .collect::<Result<Vec<_>>>()?;

            let rows = groups.get(code).map_or(&[][..], Vec::as_slice);
            debug!("{} of {} {} {}", i, nareas, code, rows.len());

            let labels = assign_labels(code, &category_counts, rows.len(), rng)?;
            for (&row, label) in rows.iter().zip(labels) {
                column.set(row, label);
            }
        }
    }

    table.set_column(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::schema::{AreaIndex, Schema};
    use crate::seeds::{nation_rng, QUALIFICATION_SEED};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn people(areas: &[(&str, usize)]) -> PopulationTable {
        let mut table = PopulationTable::new();
        for &(code, n) in areas {
            let points: Vec<Point> = (0..n).map(|i| Point::new(i as f64, 0.0)).collect();
            table.push_area(code, &points);
        }
        table
    }

    fn qualification() -> AttributeSet {
        Schema::census_2011()
            .attribute("highest_qualification")
            .unwrap()
            .clone()
    }

    fn scotland_qualifications(rows: &[&[&str]]) -> CountTable {
        let prefix = "All people aged 16 and over: ";
        let headers = [
            String::new(),
            format!("{prefix}No qualifications"),
            format!("{prefix}Highest level of qualification: Level 1 qualifications"),
            format!("{prefix}Highest level of qualification: Level 2 qualifications"),
            format!("{prefix}Highest level of qualification: Level 3 qualifications"),
            format!("{prefix}Highest level of qualification: Level 4 qualifications and above"),
        ];
        let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
        CountTable::from_rows("KS501SC.csv", &headers, AreaIndex::FirstColumn, rows)
    }

    #[test]
    fn test_category_ranges_follow_declaration_order() {
        assert_eq!(category_ranges(&[3, 0, 2]), vec![0..3, 3..3, 3..5]);
        assert!(category_ranges(&[]).is_empty());

        let ranges = category_ranges(&[u64::MAX, 2]);
        assert!(ranges.iter().all(|r| r.start <= r.end));
    }

    #[test]
    fn test_assign_labels_overflowing_counts_are_excess() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        match assign_labels("S001", &[u64::MAX, 2], 5, &mut rng) {
            Err(SynthError::CategoryExcess { area_code, npeople, ntotal }) => {
                assert_eq!((area_code.as_str(), npeople, ntotal), ("S001", 5, u64::MAX));
            }
            other => panic!("expected excess, got {:?}", other),
        }
    }

    #[test]
    fn test_assign_labels_preserves_counts() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let labels = assign_labels("S001", &[3, 0, 0, 0, 2], 10, &mut rng).unwrap();

        assert_eq!(labels.len(), 10);
        assert_eq!(labels.iter().filter(|l| **l == Some(0)).count(), 3);
        assert_eq!(labels.iter().filter(|l| **l == Some(4)).count(), 2);
        assert_eq!(labels.iter().filter(|l| l.is_none()).count(), 5);
    }

    #[test]
    fn test_assign_labels_rejects_excess() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        match assign_labels("S001", &[4, 4], 7, &mut rng) {
            Err(SynthError::CategoryExcess { area_code, npeople, ntotal }) => {
                assert_eq!((area_code.as_str(), npeople, ntotal), ("S001", 7, 8));
            }
            other => panic!("expected excess, got {:?}", other),
        }
    }

    #[test]
    fn test_s001_scenario() {
        let mut table = people(&[("S001", 10)]);
        let counts = scotland_qualifications(&[&["S92000003", "99", "0", "0", "0", "99"], &["S001", "3", "-", "0", "0", "2"]]);
        let mut rng = nation_rng(QUALIFICATION_SEED, Nation::Scotland);

        disaggregate_attribute(Nation::Scotland, &qualification(), &counts, &mut table, &mut rng).unwrap();

        let column = table.column("highest_qualification").unwrap();
        // none, level1..level4, other
        assert_eq!(column.tally(0..10), vec![3, 0, 0, 0, 2, 5]);
    }

    #[test]
    fn test_per_area_counts_and_unlisted_area() {
        let mut table = people(&[("S001", 6), ("S002", 4), ("S003", 2)]);
        let counts = scotland_qualifications(&[
            &["S002", "1", "1", "1", "1", "0"],
            &["S001", "0", "2", "0", "9", "0"],
        ]);
        let mut rng = nation_rng(QUALIFICATION_SEED, Nation::Scotland);

        assert!(matches!(
            disaggregate_attribute(Nation::Scotland, &qualification(), &counts, &mut table, &mut rng),
            Err(SynthError::CategoryExcess { .. })
        ));
        assert!(!table.has_column("highest_qualification"));

        let counts = scotland_qualifications(&[
            &["S002", "1", "1", "1", "1", "0"],
            &["S001", "0", "2", "0", "1", "0"],
        ]);
        disaggregate_attribute(Nation::Scotland, &qualification(), &counts, &mut table, &mut rng).unwrap();

        let column = table.column("highest_qualification").unwrap();
        let groups = table.rows_by_area();
        assert_eq!(column.tally(groups["S001"].iter().copied()), vec![0, 2, 0, 1, 0, 3]);
        assert_eq!(column.tally(groups["S002"].iter().copied()), vec![1, 1, 1, 1, 0, 0]);
        assert_eq!(column.tally(groups["S003"].iter().copied()), vec![0, 0, 0, 0, 0, 2]);
    }

    #[test]
    fn test_labels_are_deterministic() {
        let counts = scotland_qualifications(&[&["S001", "10", "10", "10", "10", "10"]]);
        let run = || {
            let mut table = people(&[("S001", 80)]);
            let mut rng = nation_rng(QUALIFICATION_SEED, Nation::Scotland);
            disaggregate_attribute(Nation::Scotland, &qualification(), &counts, &mut table, &mut rng).unwrap();
            table
        };
        let (a, b) = (run(), run());
        assert_eq!(a, b);

        // Shuffled: not simply in category order
        let column = a.column("highest_qualification").unwrap();
        let in_order: Vec<Option<usize>> = (0..80).map(|i| if i < 50 { Some(i / 10) } else { None }).collect();
        let actual: Vec<Option<usize>> = (0..80).map(|i| column.code(i)).collect();
        assert_ne!(actual, in_order);
    }

    #[test]
    fn test_duplicate_area_rows_are_fatal() {
        let mut table = people(&[("S001", 5)]);
        let counts = scotland_qualifications(&[&["S001", "1", "0", "0", "0", "0"], &["S001", "1", "0", "0", "0", "0"]]);
        let mut rng = nation_rng(QUALIFICATION_SEED, Nation::Scotland);

        match disaggregate_attribute(Nation::Scotland, &qualification(), &counts, &mut table, &mut rng) {
            Err(SynthError::AreaNotUnique { area_code, found, .. }) => {
                assert_eq!(area_code, "S001");
                assert_eq!(found, 2);
            }
            other => panic!("expected duplicate area, got {:?}", other),
        }
    }

    #[test]
    fn test_area_missing_from_population_is_excess() {
        let mut table = people(&[("S001", 5)]);
        let counts = scotland_qualifications(&[&["S001", "1", "0", "0", "0", "0"], &["S009", "1", "0", "0", "0", "0"]]);
        let mut rng = nation_rng(QUALIFICATION_SEED, Nation::Scotland);

        match disaggregate_attribute(Nation::Scotland, &qualification(), &counts, &mut table, &mut rng) {
            Err(SynthError::CategoryExcess { area_code, npeople, .. }) => {
                assert_eq!(area_code, "S009");
                assert_eq!(npeople, 0);
            }
            other => panic!("expected excess, got {:?}", other),
        }
    }
}
