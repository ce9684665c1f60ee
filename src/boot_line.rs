//! Kernel command line editor.
//!
//! The boot parameter file is a single line of space-separated tokens, either
//! bare flags (`quiet`) or `name=value` pairs (`video=HDMI-A-1:1920x1080@60D`).
//! A malformed line can leave the board unbootable, so every write goes to a
//! temporary sibling file, is checked for a plausible size and only then
//! renamed over the original. Readers observe either the old or the new line.
//!
//! # Token identity
//!
//! A token's name is everything before the first `=`, or the whole token for
//! a bare flag. `add_param` is a no-op when a token with the same name exists,
//! even if its value differs; callers that need to change a value must
//! `remove_param` first (see [`BootLineEditor::apply`]).

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use crate::file_ops::parent_dir;

/// Smallest plausible boot line, in bytes. Anything at or below this is
/// treated as a truncation bug rather than a real command line.
pub const MIN_BOOT_LINE_BYTES: u64 = 10;

/// Errors from writing the boot parameter file.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Staged content failed the size check, original left untouched
    #[error("refusing to write boot line of {len} bytes (must exceed {min})")]
    SanityCheck { len: u64, min: u64 },
}

/// Name of a boot token: text before the first `=`, or the whole token.
pub fn param_name(token: &str) -> &str {
    token.split_once('=').map_or(token, |(name, _)| name)
}

/// `line` with `token` appended, unless a token of the same name is present.
pub fn line_with_param_added(line: &str, token: &str) -> String {
    let name = param_name(token);
    if line.split_whitespace().any(|t| param_name(t) == name) {
        return line.to_string();
    }
    let base = line.trim_end();
    if base.is_empty() {
        token.to_string()
    } else {
        format!("{} {}", base, token)
    }
}

/// `line` without any token named `name`, other tokens kept in order.
pub fn line_without_param(line: &str, name: &str) -> String {
    line.split_whitespace()
        .filter(|t| param_name(t) != name)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Exclusive editor for one boot parameter file.
#[derive(Debug, Clone)]
pub struct BootLineEditor {
    path: PathBuf,
}

impl BootLineEditor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> WriteError {
        WriteError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Current content with line breaks folded into spaces.
    pub fn read(&self) -> Result<String, WriteError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| self.io_err(e))?;
        Ok(raw.replace(['\r', '\n'], " ").trim_end().to_string())
    }

    /// Write `content` to a temporary sibling and validate it, without
    /// touching the target. Dropping the returned value discards it.
    pub fn stage(&self, content: &str) -> Result<StagedWrite<'_>, WriteError> {
        let mut tmp = NamedTempFile::new_in(parent_dir(&self.path)).map_err(|e| self.io_err(e))?;
        let line = content.trim_end();
        if !line.is_empty() {
            tmp.write_all(line.as_bytes()).map_err(|e| self.io_err(e))?;
            tmp.write_all(b"\n").map_err(|e| self.io_err(e))?;
        }
        tmp.as_file().sync_all().map_err(|e| self.io_err(e))?;

        let len = tmp
            .as_file()
            .metadata()
            .map_err(|e| self.io_err(e))?
            .len();
        if len == 0 || len <= MIN_BOOT_LINE_BYTES {
            // tmp is removed on drop
            return Err(WriteError::SanityCheck {
                len,
                min: MIN_BOOT_LINE_BYTES,
            });
        }

        // Keep the original's mode; a fresh temp file is 0600.
        if let Ok(meta) = fs::metadata(&self.path) {
            fs::set_permissions(tmp.path(), meta.permissions()).map_err(|e| self.io_err(e))?;
        }

        Ok(StagedWrite { editor: self, tmp })
    }

    /// Stage and commit `content` in one step.
    pub fn write(&self, content: &str) -> Result<(), WriteError> {
        self.stage(content)?.commit()
    }

    /// Remove every token named `name`. Absent name is not an error.
    pub fn remove_param(&self, name: &str) -> Result<(), WriteError> {
        let current = self.read()?;
        let updated = line_without_param(&current, name);
        if updated == current {
            debug!("Boot parameter {} not present", name);
            return Ok(());
        }
        info!("Removing boot parameter {}", name);
        self.write(&updated)
    }

    /// Append `token` unless a token of the same name is already present.
    pub fn add_param(&self, token: &str) -> Result<(), WriteError> {
        let current = self.read()?;
        let updated = line_with_param_added(&current, token);
        if updated == current {
            debug!("Boot parameter {} already present", param_name(token));
            return Ok(());
        }
        info!("Adding boot parameter {}", token);
        self.write(&updated)
    }

    /// Remove every managed name, then add the desired tokens.
    ///
    /// Stops at the first failed write; earlier writes stay committed.
    pub fn apply(&self, managed: &[&str], desired: &[String]) -> Result<(), WriteError> {
        for name in managed {
            self.remove_param(name)?;
        }
        for token in desired {
            self.add_param(token)?;
        }
        Ok(())
    }
}

/// Validated content waiting to be renamed over the boot parameter file.
#[derive(Debug)]
pub struct StagedWrite<'a> {
    editor: &'a BootLineEditor,
    tmp: NamedTempFile,
}

impl StagedWrite<'_> {
    /// Path of the temporary file holding the staged line.
    pub fn temp_path(&self) -> &Path {
        self.tmp.path()
    }

    /// Atomically replace the target with the staged content.
    pub fn commit(self) -> Result<(), WriteError> {
        let target = &self.editor.path;
        self.tmp
            .persist(target)
            .map_err(|e| self.editor.io_err(e.error))?;
        debug!("Committed boot line to {}", target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PI_LINE: &str = "console=serial0,115200 root=PARTUUID=abcd rootwait";

    fn editor_with(content: &str) -> (TempDir, BootLineEditor) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cmdline.txt");
        fs::write(&path, content).unwrap();
        (dir, BootLineEditor::new(path))
    }

    #[test]
    fn test_param_name() {
        assert_eq!(param_name("quiet"), "quiet");
        assert_eq!(param_name("video=HDMI-A-1:1920x1080@60D"), "video");
        assert_eq!(param_name("root=PARTUUID=abcd"), "root");
    }

    #[test]
    fn test_read_folds_newlines() {
        let (_dir, editor) = editor_with("console=tty1\nroot=/dev/mmcblk0p2\n rootwait\n");
        assert_eq!(editor.read().unwrap(), "console=tty1 root=/dev/mmcblk0p2  rootwait");
    }

    #[test]
    fn test_add_quiet_twice() {
        let (_dir, editor) = editor_with(&format!("{}\n", PI_LINE));
        editor.add_param("quiet").unwrap();
        let once = editor.read().unwrap();
        assert!(once.ends_with(" quiet"));

        editor.add_param("quiet").unwrap();
        let twice = editor.read().unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.matches(" quiet").count(), 1);
        assert_eq!(fs::read_to_string(editor.path()).unwrap(), format!("{} quiet\n", PI_LINE));
    }

    #[test]
    fn test_add_is_blocked_by_same_name_with_other_value() {
        let (_dir, editor) = editor_with(&format!("{} video=HDMI-A-1:1024x768", PI_LINE));
        editor.add_param("video=HDMI-A-1:1920x1080D").unwrap();
        let line = editor.read().unwrap();
        assert!(line.contains("video=HDMI-A-1:1024x768"));
        assert!(!line.contains("1920x1080"));
    }

    #[test]
    fn test_remove_all_occurrences_preserves_order() {
        let (_dir, editor) =
            editor_with("quiet console=tty1 video=HDMI-A-1:D root=/dev/sda2 video=HDMI-A-2:800x480 rootwait");
        editor.remove_param("video").unwrap();
        assert_eq!(editor.read().unwrap(), "quiet console=tty1 root=/dev/sda2 rootwait");

        // absent name is a no-op
        editor.remove_param("video").unwrap();
        assert_eq!(editor.read().unwrap(), "quiet console=tty1 root=/dev/sda2 rootwait");
    }

    #[test]
    fn test_remove_does_not_match_longer_names() {
        let (_dir, editor) = editor_with(&format!("{} quiet rd.quiet", PI_LINE));
        editor.remove_param("quiet").unwrap();
        assert_eq!(editor.read().unwrap(), format!("{} rd.quiet", PI_LINE));
    }

    #[test]
    fn test_write_empty_fails_and_keeps_original() {
        let (dir, editor) = editor_with(PI_LINE);
        let err = editor.write("").unwrap_err();
        assert!(matches!(err, WriteError::SanityCheck { len: 0, .. }));
        assert_eq!(fs::read_to_string(editor.path()).unwrap(), PI_LINE);

        // no stray temp files left behind
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_too_short_fails() {
        let (_dir, editor) = editor_with(PI_LINE);
        assert!(matches!(
            editor.write("quiet"),
            Err(WriteError::SanityCheck { len: 6, .. })
        ));
        assert_eq!(fs::read_to_string(editor.path()).unwrap(), PI_LINE);
    }

    #[test]
    fn test_staged_write_dropped_before_commit() {
        let (dir, editor) = editor_with(PI_LINE);
        let staged = editor.stage("console=tty1 root=/dev/sda2 rootwait quiet").unwrap();
        let temp = staged.temp_path().to_path_buf();
        assert!(temp.exists());
        assert_eq!(temp.parent(), Some(dir.path()));
        drop(staged);

        assert!(!temp.exists());
        assert_eq!(fs::read_to_string(editor.path()).unwrap(), PI_LINE);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_preserves_mode() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, editor) = editor_with(PI_LINE);
        fs::set_permissions(editor.path(), fs::Permissions::from_mode(0o644)).unwrap();
        editor.add_param("quiet").unwrap();
        let mode = fs::metadata(editor.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn test_apply_replaces_stale_values() {
        let (_dir, editor) = editor_with(&format!("{} video=HDMI-A-1:1024x768 quiet", PI_LINE));
        let desired = vec!["video=HDMI-A-1:1920x1080@60D".to_string(), "quiet".to_string()];
        editor.apply(&["video", "quiet", "splash"], &desired).unwrap();
        assert_eq!(
            editor.read().unwrap(),
            format!("{} video=HDMI-A-1:1920x1080@60D quiet", PI_LINE)
        );

        // second application converges to the same line
        editor.apply(&["video", "quiet", "splash"], &desired).unwrap();
        assert_eq!(
            editor.read().unwrap(),
            format!("{} video=HDMI-A-1:1920x1080@60D quiet", PI_LINE)
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let editor = BootLineEditor::new(dir.path().join("cmdline.txt"));
        assert!(matches!(editor.add_param("quiet"), Err(WriteError::Io { .. })));
    }
}
