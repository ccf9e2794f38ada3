//! CSV export of a fetched result page.

use crate::error::Result;
use crate::models::SearchEntry;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Flat CSV record for one entry
#[derive(Debug, Serialize)]
pub struct CsvRow<'a> {
    pub access: &'static str,
    pub title: &'a str,
    pub authors: String,
    pub publication: &'a str,
    pub volume: &'a str,
    pub pages: String,
    pub cover_date: &'a str,
    pub doi: &'a str,
    pub pii: &'a str,
    pub link: &'a str,
}

impl<'a> From<&'a SearchEntry> for CsvRow<'a> {
    fn from(entry: &'a SearchEntry) -> Self {
        Self {
            access: entry.access.label(),
            title: &entry.title,
            authors: entry.authors.joined(),
            publication: &entry.publication_name,
            volume: entry.volume.as_deref().unwrap_or_default(),
            pages: entry.page_range().unwrap_or_default(),
            cover_date: &entry.cover_date,
            doi: &entry.doi,
            pii: &entry.pii,
            link: entry.title_link().unwrap_or_default(),
        }
    }
}

/// Write entries to `path` with a header row. Returns the number of records.
pub fn write_csv(path: &Path, entries: &[SearchEntry]) -> Result<usize> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    for entry in entries {
        wtr.serialize(CsvRow::from(entry))?;
    }

    wtr.flush()?;
    info!(path = %path.display(), count = entries.len(), "Saved CSV");
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample_entry, Authors};
    use tempfile::NamedTempFile;

    #[test]
    fn test_write_csv() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let mut first = sample_entry("1", true);
        first.authors = Authors::from_names(vec!["Ada".into(), "Grace".into()]);
        let second = sample_entry("2", false);

        let written = write_csv(temp.path(), &[first, second])?;
        assert_eq!(written, 2);

        let mut reader = csv::Reader::from_path(temp.path())?;
        let headers = reader.headers()?.clone();
        assert_eq!(&headers[0], "access");
        assert_eq!(&headers[2], "authors");

        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, csv::Error>>()?;
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "Open");
        assert_eq!(&records[0][2], "Ada; Grace");
        assert_eq!(&records[1][0], "Closed");
        assert!(records[1][9].starts_with("https://www.sciencedirect.com/"));
        Ok(())
    }
}
