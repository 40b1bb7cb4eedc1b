//! CSV count tables.
//!
//! Census tables carry one row per area with an area code and a number of
//! count columns. Counts come as plain integers, comma-grouped strings such as
//! `"1,234"`, or the `-` placeholder for a suppressed zero.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::error::{Result, SynthError};
use crate::schema::{AreaIndex, CountSource, FieldSpec};

use super::files::resolve_files;

/// Parse one count field.
pub fn parse_count(raw: &str, column: &str) -> Result<u64> {
    let value = raw.trim();
    if value == "-" {
        return Ok(0);
    }
    let digits: String = value.chars().filter(|&c| c != ',').collect();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SynthError::MalformedCount {
            column: column.to_string(),
            value: raw.to_string(),
        });
    }
    digits.parse().map_err(|_| SynthError::MalformedCount {
        column: column.to_string(),
        value: raw.to_string(),
    })
}

/// A count table loaded from one or more CSV files.
#[derive(Clone, Debug)]
pub struct CountTable {
    /// Human-readable origin, used in error messages.
    pub name: String,
    headers: Vec<String>,
    index: AreaIndex,
    rows: Vec<StringRecord>,
}

impl CountTable {
    /// Load every file of a source and concatenate them.
    ///
    /// Files are aligned on column names; a column missing from one file reads
    /// as empty in that file's rows.
    pub fn load(data_dir: &Path, source: &CountSource) -> Result<Self> {
        let dir = source.directory(data_dir);
        let files = resolve_files(&dir, &source.file)?;

        let mut headers: Vec<String> = Vec::new();
        let mut rows = Vec::new();

        for path in &files {
            let mut reader = ReaderBuilder::new()
                .flexible(true)
                .from_path(path)
                .map_err(|e| {
                    if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                        SynthError::MissingSource(path.clone())
                    } else {
                        SynthError::Csv(e)
                    }
                })?;

            let file_headers: Vec<String> = reader
                .headers()?
                .iter()
                .map(|h| h.trim().to_string())
                .collect();
            for h in &file_headers {
                if !headers.contains(h) {
                    headers.push(h.clone());
                }
            }
            let positions: Vec<Option<usize>> = headers
                .iter()
                .map(|h| file_headers.iter().position(|f| f == h))
                .collect();

            for record in reader.records() {
                let record = record?;
                let aligned: StringRecord = positions
                    .iter()
                    .map(|pos| pos.and_then(|i| record.get(i)).unwrap_or(""))
                    .collect();
                rows.push(aligned);
            }
        }

        // Columns first seen in a later file are absent from earlier rows
        let width = headers.len();
        for row in rows.iter_mut() {
            while row.len() < width {
                row.push_field("");
            }
        }

        Ok(Self {
            name: source.file.clone(),
            headers,
            index: source.index.clone(),
            rows,
        })
    }

    /// Build a table from in-memory rows.
    pub fn from_rows(name: &str, headers: &[&str], index: AreaIndex, rows: &[&[&str]]) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            index,
            rows: rows.iter().map(|r| StringRecord::from(r.to_vec())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn index(&self) -> &AreaIndex {
        &self.index
    }

    pub fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| SynthError::MissingColumn {
                column: name.to_string(),
                source_name: self.name.clone(),
            })
    }

    fn code_column(&self) -> Result<usize> {
        match &self.index {
            AreaIndex::Column(name) => self.column(name),
            AreaIndex::FirstColumn => Ok(0),
        }
    }

    /// Rows whose area code starts with `prefix`, as `(code, row)` in file order.
    pub fn rows_with_prefix(&self, prefix: &str) -> Result<Vec<(&str, CountRow<'_>)>> {
        let code_col = self.code_column()?;
        Ok(self
            .rows
            .iter()
            .filter_map(|record| {
                let code = record.get(code_col)?.trim();
                code.starts_with(prefix).then(|| {
                    (
                        code,
                        CountRow { record },
                    )
                })
            })
            .collect())
    }

    /// Resolve the columns of a field spec once for repeated lookups.
    pub fn resolve(&self, spec: &FieldSpec) -> Result<ResolvedField> {
        let columns = spec
            .columns()
            .iter()
            .map(|name| Ok((self.column(name)?, name.clone())))
            .collect::<Result<Vec<_>>>()?;
        Ok(ResolvedField { columns })
    }
}

/// Column positions of a field spec within one table.
#[derive(Clone, Debug)]
pub struct ResolvedField {
    columns: Vec<(usize, String)>,
}

/// One row of a count table.
#[derive(Clone, Copy, Debug)]
pub struct CountRow<'a> {
    record: &'a StringRecord,
}

impl CountRow<'_> {
    /// The count of a field, summed over its columns.
    pub fn count(&self, field: &ResolvedField) -> Result<u64> {
        let mut total = 0u64;
        for (idx, name) in &field.columns {
            let raw = self.record.get(*idx).unwrap_or("");
            total = total
                .checked_add(parse_count(raw, name)?)
                .ok_or_else(|| SynthError::MalformedCount {
                    column: name.clone(),
                    value: raw.to_string(),
                })?;
        }
        Ok(total)
    }
}
