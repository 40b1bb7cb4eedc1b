//! The synthetic population table.
//!
//! One row per person: a coordinate, the area the person lives in and one
//! label per attribute column. Area codes are interned since every area has
//! hundreds of rows.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, SynthError};
use crate::geometry::Point;

/// Label of people not covered by any reported category.
pub const OTHER_LABEL: &str = "other";

/// A categorical column. `None` entries are the implicit `other` label.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeColumn {
    pub name: String,
    categories: Vec<String>,
    codes: Vec<Option<u16>>,
}

impl AttributeColumn {
    /// A column of `len` rows, all labelled `other`.
    pub fn new(name: impl Into<String>, categories: Vec<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            categories,
            codes: vec![None; len],
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Category index of a row, `None` for `other`.
    pub fn code(&self, row: usize) -> Option<usize> {
        self.codes[row].map(usize::from)
    }

    pub fn set(&mut self, row: usize, category: Option<usize>) {
        self.codes[row] = category.map(|c| c as u16);
    }

    pub fn label(&self, row: usize) -> &str {
        match self.codes[row] {
            Some(c) => &self.categories[c as usize],
            None => OTHER_LABEL,
        }
    }

    /// Category index of a label, `Ok(None)` for `other`.
    pub fn category_of(&self, label: &str) -> Result<Option<usize>> {
        if label == OTHER_LABEL {
            return Ok(None);
        }
        self.categories
            .iter()
            .position(|c| c == label)
            .map(Some)
            .ok_or_else(|| SynthError::Invalid {
                what: "attribute label",
                detail: format!("{:?} is not a category of {}", label, self.name),
            })
    }

    /// People per label over the given rows, categories first then `other`.
    pub fn tally<I: IntoIterator<Item = usize>>(&self, rows: I) -> Vec<usize> {
        let mut counts = vec![0; self.categories.len() + 1];
        for row in rows {
            match self.codes[row] {
                Some(c) => counts[c as usize] += 1,
                None => counts[self.categories.len()] += 1,
            }
        }
        counts
    }
}

/// All people of one nation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PopulationTable {
    x: Vec<f64>,
    y: Vec<f64>,
    area_ids: Vec<u32>,
    areas: Vec<String>,
    area_lookup: HashMap<String, u32>,
    attributes: Vec<AttributeColumn>,
}

impl PopulationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    fn intern(&mut self, code: &str) -> u32 {
        if let Some(&id) = self.area_lookup.get(code) {
            return id;
        }
        let id = self.areas.len() as u32;
        self.areas.push(code.to_string());
        self.area_lookup.insert(code.to_string(), id);
        id
    }

    /// Append one person.
    ///
    /// Only valid before any attribute column exists.
    pub fn push(&mut self, point: Point, area_code: &str) {
        debug_assert!(self.attributes.is_empty());
        let id = self.intern(area_code);
        self.x.push(point.x);
        self.y.push(point.y);
        self.area_ids.push(id);
    }

    /// Append the people of one area. An empty area leaves no trace.
    pub fn push_area(&mut self, area_code: &str, points: &[Point]) {
        debug_assert!(self.attributes.is_empty());
        if points.is_empty() {
            return;
        }
        let id = self.intern(area_code);
        self.x.extend(points.iter().map(|p| p.x));
        self.y.extend(points.iter().map(|p| p.y));
        self.area_ids.extend(std::iter::repeat(id).take(points.len()));
    }

    pub fn point(&self, row: usize) -> Point {
        Point::new(self.x[row], self.y[row])
    }

    pub fn area_code(&self, row: usize) -> &str {
        &self.areas[self.area_ids[row] as usize]
    }

    /// Distinct area codes in first-seen order.
    pub fn areas(&self) -> &[String] {
        &self.areas
    }

    pub fn attributes(&self) -> &[AttributeColumn] {
        &self.attributes
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.attributes.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&AttributeColumn> {
        self.attributes.iter().find(|c| c.name == name)
    }

    /// Add an attribute column, replacing any column of the same name.
    pub fn set_column(&mut self, column: AttributeColumn) -> Result<()> {
        if column.len() != self.len() {
            return Err(SynthError::Invalid {
                what: "attribute column",
                detail: format!(
                    "{} has {} rows but the table has {}",
                    column.name,
                    column.len(),
                    self.len()
                ),
            });
        }
        match self.attributes.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.attributes.push(column),
        }
        Ok(())
    }

    /// Row indices of every area, built in a single pass.
    pub fn rows_by_area(&self) -> HashMap<&str, Vec<usize>> {
        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); self.areas.len()];
        for (row, &id) in self.area_ids.iter().enumerate() {
            groups[id as usize].push(row);
        }
        self.areas
            .iter()
            .map(String::as_str)
            .zip(groups)
            .collect()
    }

    /// People per area, ordered by area code.
    pub fn count_by_area(&self) -> BTreeMap<&str, usize> {
        let mut counts = vec![0usize; self.areas.len()];
        for &id in &self.area_ids {
            counts[id as usize] += 1;
        }
        self.areas
            .iter()
            .map(String::as_str)
            .zip(counts)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> PopulationTable {
        let mut table = PopulationTable::new();
        table.push_area("S001", &[Point::new(0.1, 0.2), Point::new(0.3, 0.4)]);
        table.push_area("S002", &[Point::new(5.0, 5.0)]);
        table.push(Point::new(0.5, 0.6), "S001");
        table
    }

    #[test]
    fn test_push_and_lookup() {
        let table = sample_table();
        assert_eq!(table.len(), 4);
        assert_eq!(table.areas(), &["S001".to_string(), "S002".to_string()]);
        assert_eq!(table.area_code(3), "S001");
        assert_eq!(table.point(2), Point::new(5.0, 5.0));
    }

    #[test]
    fn test_grouping_matches_counts() {
        let table = sample_table();
        let groups = table.rows_by_area();
        assert_eq!(groups["S001"], vec![0, 1, 3]);
        assert_eq!(groups["S002"], vec![2]);

        let counts = table.count_by_area();
        assert_eq!(counts.into_iter().collect::<Vec<_>>(), vec![("S001", 3), ("S002", 1)]);
    }

    #[test]
    fn test_attribute_column_labels_and_tally() {
        let mut table = sample_table();
        let mut column = AttributeColumn::new("ethnic_group", vec!["asian".into(), "white".into()], table.len());
        column.set(0, Some(1));
        column.set(2, Some(0));
        table.set_column(column).unwrap();

        let column = table.column("ethnic_group").unwrap();
        assert_eq!(column.label(0), "white");
        assert_eq!(column.label(1), OTHER_LABEL);
        assert_eq!(column.tally(0..4), vec![1, 1, 2]);
        assert_eq!(column.category_of("asian").unwrap(), Some(0));
        assert_eq!(column.category_of("other").unwrap(), None);
        assert!(column.category_of("martian").is_err());
    }

    #[test]
    fn test_set_column_replaces_and_checks_length() {
        let mut table = sample_table();
        table
            .set_column(AttributeColumn::new("q", vec!["none".into()], 4))
            .unwrap();
        let mut replacement = AttributeColumn::new("q", vec!["none".into()], 4);
        replacement.set(3, Some(0));
        table.set_column(replacement).unwrap();

        assert_eq!(table.attributes().len(), 1);
        assert_eq!(table.column("q").unwrap().label(3), "none");
        assert!(table.set_column(AttributeColumn::new("r", vec![], 2)).is_err());
    }
}
