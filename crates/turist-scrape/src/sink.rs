//! Result Sink and seed-artifact loading.
//!
//! Artifacts are UTF-8 JSON arrays, pretty-printed with a 4-space indent
//! and non-ASCII text left unescaped. Writes go through a temporary file in
//! the destination directory and are renamed into place, so a failed write
//! never leaves a truncated artifact behind.

use crate::error::{ScrapeError, ScrapeResult};
use crate::record::{ExtractionResult, Target, NOT_AVAILABLE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write the Result Collection to `path`, replacing any existing file.
pub fn write_results(results: &[ExtractionResult], path: &Path) -> ScrapeResult<()> {
    write_pretty_atomic(results, path)
}

/// Read a Result Collection back.
pub fn read_results(path: &Path) -> ScrapeResult<Vec<ExtractionResult>> {
    read_json_array(path)
}

/// Serialize `value` with a 4-space indent and atomically replace `path`.
pub fn write_pretty_atomic<T: Serialize + ?Sized>(value: &T, path: &Path) -> ScrapeResult<()> {
    let sink_err = |reason: String| ScrapeError::Sink {
        path: path.to_path_buf(),
        reason,
    };

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| sink_err(format!("serialization failed: {e}")))?;
    buf.push(b'\n');

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)
        .map_err(|e| sink_err(format!("cannot create temp file in {}: {e}", dir.display())))?;
    tmp.write_all(&buf)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| sink_err(format!("write failed: {e}")))?;
    tmp.persist(path)
        .map_err(|e| sink_err(format!("rename failed: {}", e.error)))?;
    Ok(())
}

fn read_json_array<T: DeserializeOwned>(path: &Path) -> ScrapeResult<Vec<T>> {
    let input_err = |reason: String| ScrapeError::Input {
        path: path.to_path_buf(),
        reason,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| input_err(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| input_err(e.to_string()))
}

/// Only the field the deep scrape needs; everything else is ignored.
#[derive(Deserialize)]
struct SeedEntry {
    #[serde(default)]
    details_url: Option<String>,
}

/// Load the deep-scrape targets from a seed artifact.
///
/// Entries with no usable `details_url` are skipped, but every target keeps
/// its 1-based position in the original array.
pub fn load_targets(path: &Path) -> ScrapeResult<Vec<Target>> {
    let entries: Vec<SeedEntry> = read_json_array(path)?;
    let total = entries.len();

    let targets: Vec<Target> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            let url = entry.details_url?;
            let url = url.trim();
            (!url.is_empty() && url != NOT_AVAILABLE).then(|| Target::new(i + 1, total, url))
        })
        .collect();

    if targets.len() < total {
        tracing::debug!(
            skipped = total - targets.len(),
            "seed entries without a details_url"
        );
    }
    Ok(targets)
}
