//! Snapshot store: remembers the last saved table for the next run

use crate::error::{Result, TabdeltaError};
use crate::workspace::TabdeltaWorkspace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

/// File inside the snapshots directory naming the latest snapshot
pub const LATEST_POINTER: &str = "LATEST";

const BODY_EXTENSION: &str = "csv.zst";
const COMPRESSION_LEVEL: i32 = 3;

/// Metadata written next to each stored snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub format_version: String,
    pub id: Uuid,
    pub name: String,
    pub created: DateTime<Utc>,
    /// Uncompressed size
    pub size: u64,
    pub compressed_size: u64,
    /// blake3 of the uncompressed bytes
    pub fingerprint: String,
}

/// A snapshot read back from the store
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    pub record: SnapshotRecord,
    pub bytes: Vec<u8>,
}

/// The two operations a run needs from persistent storage.
///
/// `load_previous` answers `Ok(None)` when nothing was ever saved, which is
/// distinct from the store failing.
pub trait SnapshotStore: Send + Sync {
    fn save_latest(&self, bytes: &[u8], name: &str) -> Result<SnapshotRecord>;
    fn load_previous(&self) -> Result<Option<StoredSnapshot>>;
}

/// Totals for the `status` command
#[derive(Debug, Default, Clone, Serialize)]
pub struct StoreStats {
    pub snapshot_count: usize,
    pub total_body_size: u64,
    pub total_metadata_size: u64,
    pub latest: Option<String>,
}

/// Store backed by `.tabdelta/snapshots/`
#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    dir: PathBuf,
}

impl WorkspaceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_workspace(workspace: &TabdeltaWorkspace) -> Self {
        Self::new(workspace.snapshots_dir.clone())
    }

    /// Paths of the compressed body and the JSON metadata for a name
    pub fn snapshot_paths(&self, name: &str) -> (PathBuf, PathBuf) {
        (
            self.dir.join(format!("{}.{}", name, BODY_EXTENSION)),
            self.dir.join(format!("{}.json", name)),
        )
    }

    fn pointer_path(&self) -> PathBuf {
        self.dir.join(LATEST_POINTER)
    }

    /// Name the latest pointer refers to, if any
    pub fn latest_name(&self) -> Result<Option<String>> {
        let path = self.pointer_path();
        if !path.exists() {
            return Ok(None);
        }
        let name = fs::read_to_string(path)?.trim().to_string();
        Ok(if name.is_empty() { None } else { Some(name) })
    }

    /// Load one snapshot by name, verifying its fingerprint
    pub fn load(&self, name: &str) -> Result<StoredSnapshot> {
        let name = sanitize_name(name)?;
        let (body_path, json_path) = self.snapshot_paths(&name);
        if !json_path.exists() || !body_path.exists() {
            return Err(TabdeltaError::SnapshotNotFound { name });
        }

        let record: SnapshotRecord = serde_json::from_str(&fs::read_to_string(&json_path)?)?;
        let compressed = fs::read(&body_path)?;
        let bytes = zstd::decode_all(compressed.as_slice())?;

        let fingerprint = blake3::hash(&bytes).to_hex().to_string();
        if fingerprint != record.fingerprint {
            return Err(TabdeltaError::store(format!(
                "Snapshot '{}' is corrupt: fingerprint mismatch",
                name
            )));
        }

        Ok(StoredSnapshot { record, bytes })
    }

    /// All stored snapshots, oldest first
    pub fn list(&self) -> Result<Vec<SnapshotRecord>> {
        let mut records = Vec::new();
        if !self.dir.exists() {
            return Ok(records);
        }

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match serde_json::from_str::<SnapshotRecord>(&fs::read_to_string(&path)?) {
                    Ok(record) => records.push(record),
                    Err(e) => log::warn!("Skipping unreadable metadata {}: {}", path.display(), e),
                }
            }
        }

        records.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.name.cmp(&b.name)));
        Ok(records)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let mut stats = StoreStats {
            latest: self.latest_name()?,
            ..StoreStats::default()
        };
        if !self.dir.exists() {
            return Ok(stats);
        }

        for entry in WalkDir::new(&self.dir).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy();
            let size = entry.metadata()?.len();
            if file_name.ends_with(BODY_EXTENSION) {
                stats.snapshot_count += 1;
                stats.total_body_size += size;
            } else if file_name.ends_with(".json") {
                stats.total_metadata_size += size;
            }
        }

        Ok(stats)
    }
}

impl SnapshotStore for WorkspaceStore {
    fn save_latest(&self, bytes: &[u8], name: &str) -> Result<SnapshotRecord> {
        let name = sanitize_name(name)?;
        fs::create_dir_all(&self.dir)?;

        let compressed = zstd::encode_all(bytes, COMPRESSION_LEVEL)?;
        let record = SnapshotRecord {
            format_version: crate::FORMAT_VERSION.to_string(),
            id: Uuid::new_v4(),
            name: name.clone(),
            created: Utc::now(),
            size: bytes.len() as u64,
            compressed_size: compressed.len() as u64,
            fingerprint: blake3::hash(bytes).to_hex().to_string(),
        };

        let (body_path, json_path) = self.snapshot_paths(&name);
        write_replacing(&body_path, &compressed)?;
        write_replacing(&json_path, serde_json::to_string_pretty(&record)?.as_bytes())?;
        write_replacing(&self.pointer_path(), name.as_bytes())?;

        log::info!(
            "Stored snapshot '{}' ({} bytes, {} compressed)",
            name,
            record.size,
            record.compressed_size
        );
        Ok(record)
    }

    fn load_previous(&self) -> Result<Option<StoredSnapshot>> {
        match self.latest_name()? {
            Some(name) => self.load(&name).map(Some),
            None => Ok(None),
        }
    }
}

/// Restrict a snapshot name to `[A-Za-z0-9._-]`, replacing anything else with `_`
pub fn sanitize_name(name: &str) -> Result<String> {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') || cleaned == LATEST_POINTER {
        return Err(TabdeltaError::invalid_input(format!(
            "'{}' cannot be used as a snapshot name",
            name
        )));
    }
    Ok(cleaned)
}

/// Write to a sibling temp file, then rename over the target
fn write_replacing(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| TabdeltaError::store(format!("Invalid path {}", path.display())))?;
    let temp = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));
    fs::write(&temp, bytes)?;
    fs::rename(&temp, path)?;
    Ok(())
}
