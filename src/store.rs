//! On-disk population tables, one CSV file per nation.
//!
//! Columns are `x`, `y`, `area_code` and then one column per attribute.
//! Tables are written to a temporary file and renamed into place, so a table
//! either exists in full or not at all.

use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use log::info;

use crate::error::{Result, SynthError};
use crate::geometry::Point;
use crate::population::{AttributeColumn, PopulationTable, OTHER_LABEL};
use crate::schema::{AttributeSet, Nation};

const BASE_COLUMNS: [&str; 3] = ["x", "y", "area_code"];

/// Directory holding the population table of each nation.
#[derive(Clone, Debug)]
pub struct PopulationStore {
    dir: PathBuf,
}

impl PopulationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, nation: Nation) -> PathBuf {
        self.dir.join(format!("{}.csv", nation.name()))
    }

    pub fn exists(&self, nation: Nation) -> bool {
        self.path(nation).is_file()
    }

    /// Read a nation's table.
    ///
    /// Columns named after one of `known` take that attribute's categories and
    /// reject any other label. Columns of unknown attributes take their labels
    /// in first-seen order.
    pub fn load(&self, nation: Nation, known: &[AttributeSet]) -> Result<PopulationTable> {
        let path = self.path(nation);
        if !path.is_file() {
            return Err(SynthError::MissingPopulation(path));
        }

        let mut reader = ReaderBuilder::new().from_path(&path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.len() < BASE_COLUMNS.len()
            || headers[..BASE_COLUMNS.len()] != BASE_COLUMNS[..]
        {
            return Err(SynthError::Invalid {
                what: "population table",
                detail: format!("{} has header {:?}", path.display(), headers),
            });
        }

        let attr_names = &headers[BASE_COLUMNS.len()..];
        let mut table = PopulationTable::new();
        let mut labels: Vec<Vec<String>> = vec![Vec::new(); attr_names.len()];

        for record in reader.records() {
            let record = record?;
            let x = parse_coord(record.get(0), &path)?;
            let y = parse_coord(record.get(1), &path)?;
            let code = record.get(2).unwrap_or("");
            table.push(Point::new(x, y), code);
            for (i, column) in labels.iter_mut().enumerate() {
                column.push(record.get(BASE_COLUMNS.len() + i).unwrap_or(OTHER_LABEL).to_string());
            }
        }

        for (name, column_labels) in attr_names.iter().zip(labels) {
            let categories = match known.iter().find(|a| &a.column == name) {
                Some(attr) => attr.categories.clone(),
                None => discover_categories(&column_labels),
            };
            let mut column = AttributeColumn::new(name.clone(), categories, column_labels.len());
            for (row, label) in column_labels.iter().enumerate() {
                let category = column.category_of(label)?;
                column.set(row, category);
            }
            table.set_column(column)?;
        }

        Ok(table)
    }

    /// Write a nation's table, replacing any previous one.
    pub fn save(&self, nation: Nation, table: &PopulationTable) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| SynthError::io(&self.dir, e))?;
        let path = self.path(nation);
        let tmp = path.with_extension("csv.tmp");

        info!("Writing {} people to {}", table.len(), path.display());
        {
            let mut writer = WriterBuilder::new().from_path(&tmp)?;
            let mut header: Vec<&str> = BASE_COLUMNS.to_vec();
            header.extend(table.attributes().iter().map(|c| c.name.as_str()));
            writer.write_record(&header)?;

            for row in 0..table.len() {
                let p = table.point(row);
                let mut record = vec![p.x.to_string(), p.y.to_string(), table.area_code(row).to_string()];
                record.extend(table.attributes().iter().map(|c| c.label(row).to_string()));
                writer.write_record(&record)?;
            }
            writer.flush().map_err(|e| SynthError::io(&tmp, e))?;
        }

        fs::rename(&tmp, &path).map_err(|e| SynthError::io(&path, e))
    }
}

fn parse_coord(raw: Option<&str>, path: &Path) -> Result<f64> {
    let raw = raw.unwrap_or("");
    raw.trim().parse().map_err(|_| SynthError::Invalid {
        what: "coordinate",
        detail: format!("{:?} in {}", raw, path.display()),
    })
}

fn discover_categories(labels: &[String]) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for label in labels {
        if label != OTHER_LABEL && !categories.contains(label) {
            categories.push(label.clone());
        }
    }
    categories
}
