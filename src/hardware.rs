//! Hardware discovery from sysfs and procfs.
//!
//! Reads only: DRM connectors with their status and advertised modes,
//! input device names and backlight devices. The results pre-fill prompts;
//! nothing here fails hard. Unreadable entries are skipped with a warning.
//!
//! # Integration
//!
//! Call `HardwareInfo::detect()` before collecting settings. An empty result
//! (containers, image preparation) just means free-form prompts.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use strum::{Display, EnumString};
use tracing::{debug, info, warn};

use crate::config::Paths;

/// Connection state as reported by `/sys/class/drm/<connector>/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectorStatus {
    Connected,
    Disconnected,
    Unknown,
}

/// One DRM output connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connector {
    /// Connector name without the card prefix, e.g. `HDMI-A-1`
    pub name: String,
    pub status: ConnectorStatus,
    /// Advertised modes, preferred first (`1920x1080`, ...)
    pub modes: Vec<String>,
}

impl Connector {
    pub fn is_connected(&self) -> bool {
        self.status == ConnectorStatus::Connected
    }
}

/// A backlight device under `/sys/class/backlight`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backlight {
    pub name: String,
    pub path: PathBuf,
}

/// Aggregated discovery results.
#[derive(Debug, Clone, Default)]
pub struct HardwareInfo {
    pub connectors: Vec<Connector>,
    pub input_devices: Vec<String>,
    pub backlights: Vec<Backlight>,
}

impl HardwareInfo {
    /// Discover everything below the locations in `paths`.
    pub fn detect(paths: &Paths) -> Self {
        let info = Self {
            connectors: detect_connectors(&paths.drm_dir),
            input_devices: detect_input_devices(&paths.input_devices),
            backlights: detect_backlights(&paths.backlight_dir),
        };
        info!("Hardware detection: {}", info);
        info
    }

    /// First connected output, the natural kiosk default.
    pub fn connected_output(&self) -> Option<&Connector> {
        self.connectors.iter().find(|c| c.is_connected())
    }

    pub fn connector(&self, name: &str) -> Option<&Connector> {
        self.connectors.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for HardwareInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let connected = self.connectors.iter().filter(|c| c.is_connected()).count();
        write!(
            f,
            "{} connector(s) ({} connected), {} input device(s), {} backlight(s)",
            self.connectors.len(),
            connected,
            self.input_devices.len(),
            self.backlights.len()
        )
    }
}

/// `card0-HDMI-A-1` -> `HDMI-A-1`. Bare cards (`card0`) are not connectors.
fn connector_name(entry: &str) -> Option<&str> {
    let rest = entry.strip_prefix("card")?;
    let (index, name) = rest.split_once('-')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) || name.is_empty() {
        return None;
    }
    Some(name)
}

/// List DRM connectors, sorted by name.
pub fn detect_connectors(drm_dir: &Path) -> Vec<Connector> {
    let entries = match fs::read_dir(drm_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list {}: {}", drm_dir.display(), e);
            return Vec::new();
        }
    };

    let mut connectors: Vec<Connector> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let file_name = entry.file_name();
            let name = connector_name(&file_name.to_string_lossy())?.to_string();
            let dir = entry.path();

            let status = fs::read_to_string(dir.join("status"))
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(ConnectorStatus::Unknown);

            let mut modes: Vec<String> = Vec::new();
            match fs::read_to_string(dir.join("modes")) {
                Ok(text) => {
                    for mode in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                        if !modes.iter().any(|m| m == mode) {
                            modes.push(mode.to_string());
                        }
                    }
                }
                Err(e) => warn!("Cannot read modes of {}: {}", name, e),
            }

            Some(Connector { name, status, modes })
        })
        .collect();

    connectors.sort_by(|a, b| a.name.cmp(&b.name));
    connectors
}

/// Names from a `/proc/bus/input/devices` listing, in listing order.
pub fn parse_input_devices(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| line.strip_prefix("N: Name="))
        .map(|name| name.trim().trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

pub fn detect_input_devices(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(listing) => parse_input_devices(&listing),
        Err(e) => {
            debug!("Cannot read {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Backlight devices, sorted by name.
pub fn detect_backlights(dir: &Path) -> Vec<Backlight> {
    let Ok(entries) = fs::read_dir(dir) else {
        debug!("No backlight directory at {}", dir.display());
        return Vec::new();
    };

    let mut lights: Vec<Backlight> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| Backlight {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path(),
        })
        .collect();
    lights.sort_by(|a, b| a.name.cmp(&b.name));
    lights
}
