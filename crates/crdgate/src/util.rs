use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the release manifest text, as carried in the report.
pub fn manifest_digest(manifest: &str) -> String {
    Sha256::digest(manifest.as_bytes())
        .iter()
        .fold(String::with_capacity(64), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
}

/// Writes `report` as pretty JSON, staging it next to `path` and renaming into place.
pub fn write_report<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(report).context("encode check report")?;
    bytes.push(b'\n');

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create report dir: {}", dir.display()))?;
    }

    let staged = path.with_extension("partial");
    std::fs::write(&staged, &bytes)
        .with_context(|| format!("write report: {}", staged.display()))?;
    std::fs::rename(&staged, path)
        .with_context(|| format!("move report into place: {}", path.display()))
}
