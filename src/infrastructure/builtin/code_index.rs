//! Built-in code indexer.
//!
//! Splits every supported source file into fixed-size line chunks and writes
//! the chunk records to `records.json`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::{DirEntry, WalkDir};

use crate::domain::models::INDEX_RECORDS_FILE;

/// Lines per chunk.
pub const CHUNK_LINES: usize = 80;

/// Maximum characters kept in a record preview.
pub const PREVIEW_CHARS: usize = 2000;

const SKIPPED_DIRS: [&str; 6] = [".git", "node_modules", "dist", "build", ".venv", "target"];

/// One indexed chunk of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Path relative to the repository root, `/` separated
    pub path: String,
    /// Zero-based start line and exclusive end line
    pub span_lines: [usize; 2],
    pub lang: String,
    pub preview: String,
    /// SHA-256 of the chunk text, lowercase hex
    pub digest: String,
}

/// Language tag for a supported file extension.
pub fn language_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let lang = match ext.as_str() {
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "tsx" | "jsx" => "tsx",
        "go" => "go",
        "java" => "java",
        "rb" => "ruby",
        "rs" => "rust",
        _ => return None,
    };
    Some(lang)
}

/// Split `source` into chunks of at most `max_lines` lines, skipping chunks
/// that are entirely whitespace.
pub fn chunk_source(source: &str, max_lines: usize) -> Vec<(String, [usize; 2])> {
    let lines: Vec<&str> = source.lines().collect();
    let max_lines = max_lines.max(1);
    lines
        .chunks(max_lines)
        .enumerate()
        .filter_map(|(i, chunk)| {
            let text = chunk.join("\n");
            if text.trim().is_empty() {
                return None;
            }
            let lo = i * max_lines;
            Some((text, [lo, lo + chunk.len()]))
        })
        .collect()
}

fn sha256_hex(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Walk `repo` and produce the chunk records, in path order.
pub fn build_index(repo: &Path) -> Result<Vec<IndexRecord>> {
    let mut records = Vec::new();
    let walker = WalkDir::new(repo)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped(entry));

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", repo.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(lang) = language_for(entry.path()) else {
            continue;
        };
        let bytes = match std::fs::read(entry.path()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        let source = String::from_utf8_lossy(&bytes);
        let path = relative_path(repo, entry.path());

        for (chunk, span) in chunk_source(&source, CHUNK_LINES) {
            records.push(IndexRecord {
                path: path.clone(),
                span_lines: span,
                lang: lang.to_string(),
                preview: chunk.chars().take(PREVIEW_CHARS).collect(),
                digest: sha256_hex(&chunk),
            });
        }
    }

    Ok(records)
}

/// Index `repo` into `out/records.json`. Returns the number of records.
pub fn write_index(repo: &Path, out: &Path) -> Result<usize> {
    if !repo.is_dir() {
        anyhow::bail!("Repository directory not found: {}", repo.display());
    }
    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create index directory {}", out.display()))?;

    let records = build_index(repo)?;
    let path = out.join(INDEX_RECORDS_FILE);
    let json = serde_json::to_string_pretty(&records).context("Failed to serialize records")?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(records = records.len(), out = %out.display(), "index written");
    Ok(records.len())
}

/// Number of records in an existing index, `None` when absent or unreadable.
pub fn count_records(index_dir: &Path) -> Option<usize> {
    let raw = std::fs::read_to_string(index_dir.join(INDEX_RECORDS_FILE)).ok()?;
    let records: Vec<serde_json::Value> = serde_json::from_str(&raw).ok()?;
    Some(records.len())
}
