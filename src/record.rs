use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::archive::ImageRole;

/// One processed date as it appears in `lecturas.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LecturaRecord {
    pub date: String,
    pub date_display: String,
    pub description: String,
    pub images: Vec<ImageRole>,
}

/// Render the index: records sorted by date, two-space indent, non-ASCII kept as is
pub fn render_index(records: &[LecturaRecord]) -> Result<String> {
    let mut sorted: Vec<&LecturaRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));
    serde_json::to_string_pretty(&sorted).context("Failed to serialize lecturas index")
}

/// Overwrite the index file with `records`
pub fn write_index(path: &Path, records: &[LecturaRecord]) -> Result<()> {
    let json = render_index(records)?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write index to {}", path.display()))
}
