//! The list of pages an audit visits.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::ConfigError;

pub const DEFAULT_DWELL_MS: u64 = 30_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    /// Free-form label, only used in logs.
    #[serde(default)]
    pub page: String,
    pub url: String,
    /// Time spent on the page after interaction, in milliseconds.
    #[serde(default = "default_dwell")]
    pub duration_ms: u64,
    #[serde(default)]
    pub scroll: bool,
}

fn default_dwell() -> u64 {
    DEFAULT_DWELL_MS
}

pub fn load_pages_csv(path: &Path) -> Result<Vec<PageSpec>, ConfigError> {
    let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_pages_csv(file, path)
}

/// Rows are `page,url,duration,scroll`; the first row is a header.
pub fn parse_pages_csv<R: Read>(reader: R, origin: &Path) -> Result<Vec<PageSpec>, ConfigError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut pages = Vec::new();
    for (index, record) in rdr.records().enumerate() {
        // header is row 1
        let row = index + 2;
        let record = record.map_err(|err| ConfigError::PageRow {
            path: origin.to_path_buf(),
            row,
            reason: err.to_string(),
        })?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let url = record.get(1).unwrap_or_default();
        if url.is_empty() {
            return Err(ConfigError::PageRow {
                path: origin.to_path_buf(),
                row,
                reason: "missing url".to_string(),
            });
        }

        let duration_ms = match record.get(2).filter(|raw| !raw.is_empty()) {
            None => DEFAULT_DWELL_MS,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(row, %raw, "unparseable duration; using default dwell");
                DEFAULT_DWELL_MS
            }),
        };

        pages.push(PageSpec {
            page: record.get(0).unwrap_or_default().to_string(),
            url: url.to_string(),
            duration_ms,
            scroll: record
                .get(3)
                .map(|raw| raw.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        });
    }
    Ok(pages)
}
