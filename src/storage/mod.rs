//! # Storage Module
//!
//! Crash-safe persistence of session records.
//!
//! This module handles:
//! - Atomic write-to-temp-then-rename file replacement
//! - One JSON record file per session, named `<start_time>.json`
//! - Enumerating and loading records by timestamp
//!
//! There is no index file: the set of valid sessions is exactly the set of
//! well-formed record files in the sessions directory.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Result, TrackerError};
use crate::session::Session;

/// Extension used for in-flight writes; never a valid record
const TMP_EXTENSION: &str = "tmp";

/// Write a file atomically using the temp-then-rename pattern.
///
/// The full contents go to a `.tmp` sibling first, flushed and fsynced,
/// then renamed over the target. Rename is the only step the filesystem is
/// assumed to perform atomically: a crash at any point leaves either the
/// old target contents or the new ones, never a partial write. On failure
/// the temp file is removed best-effort and the target is untouched.
///
/// # Arguments
///
/// * `path` - Final destination path
/// * `contents` - Full file contents to write
pub fn atomic_write_file(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension(TMP_EXTENSION);

    let write_result = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        Ok(())
    })();

    let renamed = write_result.and_then(|_| fs::rename(&tmp_path, path));

    if let Err(e) = renamed {
        if let Err(cleanup) = fs::remove_file(&tmp_path) {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                debug!("Failed to remove temp file {:?}: {}", tmp_path, cleanup);
            }
        }
        return Err(e.into());
    }

    Ok(())
}

/// Per-session record store rooted at a sessions directory
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Create a store over the given directory (not created until
    /// [`ensure_dir`] runs).
    ///
    /// [`ensure_dir`]: SessionStore::ensure_dir
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the sessions directory if it does not exist yet
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Path of the record file for a session id
    fn record_path(&self, start_time: u32) -> PathBuf {
        self.dir.join(format!("{start_time}.json"))
    }

    /// Persist one session record atomically.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the temp write or rename fails; the previous
    /// record contents (if any) survive intact.
    pub fn save(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_vec(session)?;
        atomic_write_file(&self.record_path(session.start_time), &json)?;

        info!(
            start_time = session.start_time,
            revolutions = session.revolutions,
            "Saved session record"
        );
        Ok(())
    }

    /// Load exactly one session record.
    ///
    /// # Errors
    ///
    /// * [`TrackerError::SessionNotFound`] - No record file for this id
    /// * [`TrackerError::CorruptRecord`] - File exists but does not parse
    pub fn load(&self, start_time: u32) -> Result<Session> {
        let path = self.record_path(start_time);
        let contents = match fs::read(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TrackerError::SessionNotFound(start_time));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&contents)
            .map_err(|source| TrackerError::CorruptRecord { id: start_time, source })
    }

    /// Enumerate available session ids, sorted ascending.
    ///
    /// Filters the directory to well-formed `<digits>.json` names and parses
    /// the embedded timestamp; record contents are never read, so the sync
    /// handler can answer "how many are left" cheaply. Temp files and
    /// foreign files are ignored. A missing directory reads as empty.
    pub fn list_ids(&self) -> Result<Vec<u32>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids: Vec<u32> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| parse_record_filename(&entry.file_name()))
            .collect();

        ids.sort_unstable();
        Ok(ids)
    }

    /// Load all sessions with `start_time` strictly greater than the
    /// argument, sorted ascending.
    ///
    /// A corrupt individual record is skipped with a warning rather than
    /// failing the whole query; a record deleted between the listing and
    /// the read is likewise skipped.
    pub fn load_since(&self, start_time: u32) -> Result<Vec<Session>> {
        let ids = self.list_ids()?;

        let mut sessions = Vec::new();
        for id in ids.into_iter().filter(|&id| id > start_time) {
            match self.load(id) {
                Ok(session) => sessions.push(session),
                Err(e @ (TrackerError::CorruptRecord { .. } | TrackerError::SessionNotFound(_))) => {
                    warn!("Skipping session record {}: {}", id, e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(sessions)
    }
}

/// Parse `<digits>.json` into the embedded session id
fn parse_record_filename(name: &std::ffi::OsStr) -> Option<u32> {
    let name = name.to_str()?;
    let stem = name.strip_suffix(".json")?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}
