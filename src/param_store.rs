//! Saved configuration snapshot.
//!
//! A flat `key=value` file, one pair per line, rewritten in full at the end of
//! each configuration pass and read back on the next run to pre-fill prompts.
//! Loading never fails: a missing file is an empty snapshot and unparseable
//! lines are skipped, so a damaged file can never block re-provisioning.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::file_ops::write_file_atomic;

/// Snapshot file permission: owner read/write only.
pub const SNAPSHOT_MODE: u32 = 0o600;

/// Errors from persisting a snapshot.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Entry cannot be represented in the key=value format
    #[error("cannot save entry '{key}': {reason}")]
    InvalidEntry { key: String, reason: &'static str },
}

/// Persisted key/value record of the last applied configuration.
///
/// Keys iterate in sorted order so saved files diff cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse snapshot text. Blank lines and `#` comments are ignored, lines
    /// without `=` or with an empty key are skipped. Values are kept verbatim.
    pub fn parse(content: &str) -> Self {
        let mut snapshot = Self::new();
        for (lineno, line) in content.lines().enumerate() {
            snapshot.parse_line(lineno + 1, line);
        }
        snapshot
    }

    /// Like [`Snapshot::parse`], decoding line by line. A line that is not
    /// valid UTF-8 is skipped; the rest of the file still loads.
    pub fn parse_bytes(raw: &[u8]) -> Self {
        let mut snapshot = Self::new();
        for (lineno, line) in raw.split(|b| *b == b'\n').enumerate() {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            match std::str::from_utf8(line) {
                Ok(line) => snapshot.parse_line(lineno + 1, line),
                Err(e) => warn!("Ignoring snapshot line {} (not UTF-8: {})", lineno + 1, e),
            }
        }
        snapshot
    }

    fn parse_line(&mut self, lineno: usize, line: &str) {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            return;
        }
        match line.split_once('=') {
            Some((key, value)) if !key.is_empty() => self.set(key, value),
            _ => warn!("Ignoring malformed snapshot line {}: {:?}", lineno, line),
        }
    }

    /// Serialize as sorted `key=value` lines.
    pub fn render(&self) -> Result<String, StoreError> {
        let mut out = String::new();
        for (key, value) in &self.entries {
            check_entry(key, value)?;
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        Ok(out)
    }
}

impl FromIterator<(String, String)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn check_entry(key: &str, value: &str) -> Result<(), StoreError> {
    let invalid = |reason| StoreError::InvalidEntry {
        key: key.to_string(),
        reason,
    };
    if key.is_empty() {
        return Err(invalid("key is empty"));
    }
    if key.contains('=') {
        return Err(invalid("key contains '='"));
    }
    if key.contains(['\n', '\r']) || key.trim_start().starts_with('#') {
        return Err(invalid("key would not survive a reload"));
    }
    if value.contains(['\n', '\r']) {
        return Err(invalid("value contains a line break"));
    }
    Ok(())
}

/// Owner of the snapshot file.
#[derive(Debug, Clone)]
pub struct ParamStore {
    path: PathBuf,
}

impl ParamStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the previous snapshot. Absent or unreadable => empty.
    pub fn load(&self) -> Snapshot {
        match fs::read(&self.path) {
            Ok(raw) => {
                let snapshot = Snapshot::parse_bytes(&raw);
                info!(
                    "Loaded {} saved setting(s) from {}",
                    snapshot.len(),
                    self.path.display()
                );
                snapshot
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No saved configuration at {}", self.path.display());
                Snapshot::new()
            }
            Err(e) => {
                warn!(
                    "Could not read saved configuration {}: {} (starting from defaults)",
                    self.path.display(),
                    e
                );
                Snapshot::new()
            }
        }
    }

    /// Replace the snapshot file with `snapshot`, mode 0600.
    ///
    /// Every entry is checked before the file is touched.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let content = snapshot.render()?;
        write_file_atomic(&self.path, &content, SNAPSHOT_MODE).map_err(|source| {
            StoreError::Io {
                path: self.path.clone(),
                source,
            }
        })?;

        info!(
            "Saved {} setting(s) to {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(())
    }
}
