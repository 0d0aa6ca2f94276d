/// CSV and JSON export of a settled view.
use anyhow::Context;
use chrono::{DateTime, Local};
use compact_str::CompactString;
use serde::Serialize;
use spacelens_core::model::size::percent_of;
use spacelens_core::{Entry, ListProjection, ViewSnapshot};
use std::io::Write;
use std::path::Path;

/// One exported listing row.
#[derive(Debug, Serialize)]
pub struct ExportRow {
    pub name: CompactString,
    /// Lossy for paths that are not valid UTF-8.
    pub path: String,
    pub size: u64,
    pub percent: f32,
    pub is_dir: bool,
    pub access_denied: bool,
    pub modified: Option<DateTime<Local>>,
}

impl ExportRow {
    fn new(entry: &Entry, total: u64) -> Self {
        Self {
            name: entry.name.clone(),
            path: entry.path.to_string_lossy().into_owned(),
            size: entry.size,
            percent: percent_of(entry.size, total),
            is_dir: entry.is_dir,
            access_denied: entry.access_denied,
            modified: entry.modified.map(DateTime::<Local>::from),
        }
    }
}

/// Rows for every displayed entry of `list`.
pub fn rows(list: &ListProjection) -> Vec<ExportRow> {
    list.entries
        .iter()
        .map(|entry| ExportRow::new(entry, list.total_size))
        .collect()
}

/// Write the listing rows as CSV with a header line.
pub fn write_csv(out: impl Write, list: &ListProjection) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows(list) {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the listing rows to a CSV file.
pub fn write_csv_file(path: &Path, list: &ListProjection) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_csv(file, list).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!("Wrote {} rows to {}", list.entries.len(), path.display());
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Local>,
    list: &'a ListProjection,
    hierarchy: Option<&'a Entry>,
}

/// Write the listing and the hierarchy as one pretty-printed JSON document.
pub fn write_json(out: impl Write, view: &ViewSnapshot) -> anyhow::Result<()> {
    let report = JsonReport {
        generated_at: Local::now(),
        list: &view.list,
        hierarchy: view.hierarchy.root.as_ref(),
    };
    serde_json::to_writer_pretty(out, &report).context("failed to serialize report")?;
    Ok(())
}
