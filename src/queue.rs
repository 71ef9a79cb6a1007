use std::path::Path;

use anyhow::{bail, Result};
use chrono::{DateTime, Local};
use tracing::info;

use crate::csvfile::{self, Table};

const URL: &str = "url";
const SCRAPED: &str = "scraped";
const DATE_SCRAPED: &str = "date_scraped";
const YES: &str = "yes";

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct QueueStats {
    pub total: usize,
    pub scraped: usize,
    pub pending: usize,
}

/// Read the queue, adding the tracking columns (and saving) if they are missing.
fn open(path: &Path) -> Result<Table> {
    let mut table = csvfile::read_table(path)?;
    if table.column(URL).is_none() {
        bail!("{} must have a '{}' column", path.display(), URL);
    }

    let mut migrated = false;
    for col in [SCRAPED, DATE_SCRAPED] {
        if table.column(col).is_none() {
            table.add_column(col);
            migrated = true;
        }
    }
    if migrated {
        csvfile::write_table(path, &table)?;
        info!("Added tracking columns to {}", path.display());
    }

    Ok(table)
}

fn is_scraped(table: &Table, row: &[String]) -> bool {
    table
        .column(SCRAPED)
        .is_some_and(|col| row[col].trim() == YES)
}

/// URLs not yet marked as scraped, in file order.
pub fn load_pending(path: &Path) -> Result<Vec<String>> {
    let table = open(path)?;
    let Some(url_col) = table.column(URL) else {
        bail!("{} must have a '{}' column", path.display(), URL);
    };

    Ok(table
        .rows
        .iter()
        .filter(|row| !is_scraped(&table, row))
        .map(|row| row[url_col].trim().to_string())
        .filter(|url| !url.is_empty())
        .collect())
}

/// Mark every row with this URL as scraped at `at`. Returns the number of rows updated.
pub fn mark_scraped(path: &Path, url: &str, at: DateTime<Local>) -> Result<usize> {
    let mut table = open(path)?;
    let (Some(url_col), Some(scraped_col), Some(date_col)) = (
        table.column(URL),
        table.column(SCRAPED),
        table.column(DATE_SCRAPED),
    ) else {
        bail!("{} is missing tracking columns", path.display());
    };

    let stamp = at.format(DATE_FORMAT).to_string();
    let mut updated = 0;
    for row in table.rows.iter_mut().filter(|r| r[url_col].trim() == url) {
        row[scraped_col] = YES.to_string();
        row[date_col] = stamp.clone();
        updated += 1;
    }

    if updated > 0 {
        csvfile::write_table(path, &table)?;
    }
    Ok(updated)
}

pub fn stats(path: &Path) -> Result<QueueStats> {
    let table = open(path)?;
    let total = table.rows.len();
    let scraped = table.rows.iter().filter(|row| is_scraped(&table, row)).count();
    Ok(QueueStats {
        total,
        scraped,
        pending: total - scraped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn write(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("urls.csv");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn first_read_adds_columns_and_keeps_extras() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "url,note\nhttps://a,x\nhttps://b,y\n");

        let pending = load_pending(&path).unwrap();
        assert_eq!(pending, vec!["https://a", "https://b"]);

        let table = csvfile::read_table(&path).unwrap();
        assert_eq!(table.headers, vec!["url", "note", "scraped", "date_scraped"]);
        assert_eq!(table.rows[1], vec!["https://b", "y", "", ""]);
    }

    #[test]
    fn missing_url_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "link\nhttps://a\n");
        assert!(load_pending(&path).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_pending(&dir.path().join("absent.csv")).is_err());
    }

    #[test]
    fn scraped_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "url,scraped,date_scraped\nhttps://a,yes,2025-01-01 10:00:00\nhttps://b,,\nhttps://c,no,\n",
        );
        assert_eq!(load_pending(&path).unwrap(), vec!["https://b", "https://c"]);
    }

    #[test]
    fn mark_sets_flag_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "url\nhttps://a\nhttps://b\n");
        let at = Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();

        assert_eq!(mark_scraped(&path, "https://b", at).unwrap(), 1);

        let table = csvfile::read_table(&path).unwrap();
        assert_eq!(table.rows[0], vec!["https://a", "", ""]);
        assert_eq!(table.rows[1], vec!["https://b", "yes", "2026-03-14 09:26:53"]);
        assert_eq!(load_pending(&path).unwrap(), vec!["https://a"]);
    }

    #[test]
    fn mark_unknown_url_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "url,scraped,date_scraped\nhttps://a,,\n");
        assert_eq!(mark_scraped(&path, "https://z", Local::now()).unwrap(), 0);
        assert_eq!(load_pending(&path).unwrap(), vec!["https://a"]);
    }

    #[test]
    fn stats_counts_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "url,scraped,date_scraped\nhttps://a,yes,\nhttps://b,,\nhttps://c,,\n");
        let s = stats(&path).unwrap();
        assert_eq!((s.total, s.scraped, s.pending), (3, 1, 2));
    }
}
