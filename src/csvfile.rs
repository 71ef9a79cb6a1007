use std::path::Path;

use anyhow::{bail, Context, Result};
use tempfile::NamedTempFile;

/// A whole CSV file held in memory: header plus string rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Append a column, padding existing rows with empty cells.
    pub fn add_column(&mut self, name: &str) -> usize {
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            if row.len() < self.headers.len() {
                row.resize(self.headers.len(), String::new());
            }
        }
        self.headers.len() - 1
    }
}

/// Read a CSV file. A zero-byte file reads as an empty table; short rows are
/// padded, rows wider than the header are rejected.
pub fn read_table(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Malformed row {} in {}", i + 2, path.display()))?;
        if record.len() > headers.len() {
            bail!(
                "Malformed row {} in {}: {} cells for {} columns",
                i + 2,
                path.display(),
                record.len(),
                headers.len()
            );
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        if row.len() < headers.len() {
            row.resize(headers.len(), String::new());
        }
        rows.push(row);
    }

    Ok(Table { headers, rows })
}

/// Replace `path` with `table`: write a temp file next to it, then rename over.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;

    {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(tmp.as_file_mut());
        if !table.headers.is_empty() {
            writer.write_record(&table.headers)?;
        }
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    tmp.as_file_mut().sync_all()?;

    tmp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
