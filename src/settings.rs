//! Typed kiosk settings and their snapshot representation.
//!
//! `KioskSettings` is what the install pass works with; `Snapshot` is what is
//! persisted. Converting a snapshot never fails: absent or unparseable keys
//! fall back to defaults so an old or hand-edited file still pre-fills the
//! prompts.

use std::str::FromStr;

use tracing::warn;

use crate::param_store::Snapshot;
use crate::types::{RebootSchedule, ResolutionMode, Rotation, Toggle};
use crate::validate::TimeOfDay;

/// Snapshot keys.
pub mod keys {
    pub const KIOSK_URL: &str = "kiosk_url";
    pub const OUTPUT_NAME: &str = "output_name";
    pub const RESOLUTION_MODE: &str = "resolution_mode";
    pub const ROTATION: &str = "rotation";
    pub const TOUCH_DEVICE: &str = "touch_device";
    pub const FORCE_HDMI: &str = "force_hdmi";
    pub const SILENT_BOOT: &str = "silent_boot";
    pub const REBOOT_SCHEDULE: &str = "reboot_schedule";
    pub const REBOOT_TIME: &str = "reboot_time";
    pub const TIMEZONE: &str = "timezone";
    pub const ENABLE_SECURITY: &str = "enable_security";
}

pub const DEFAULT_URL: &str = "https://example.com";
pub const DEFAULT_OUTPUT: &str = "HDMI-A-1";
pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_REBOOT_TIME: TimeOfDay = match TimeOfDay::new(3, 0) {
    Some(t) => t,
    None => unreachable!(),
};

/// Kernel parameters that a silent boot adds.
pub const SILENT_BOOT_PARAMS: &[&str] = &[
    "quiet",
    "splash",
    "loglevel=3",
    "logo.nologo",
    "vt.global_cursor_default=0",
];

/// Every boot parameter name kioskify owns. Removed before each apply.
pub const MANAGED_BOOT_PARAMS: &[&str] = &[
    "video",
    "quiet",
    "splash",
    "loglevel",
    "logo.nologo",
    "vt.global_cursor_default",
];

/// Desired kiosk configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KioskSettings {
    pub kiosk_url: String,
    /// DRM connector name, e.g. `HDMI-A-1`
    pub output_name: String,
    pub resolution_mode: ResolutionMode,
    pub rotation: Rotation,
    /// Input device name to map onto the output
    pub touch_device: Option<String>,
    /// Force the output on even without a detected display
    pub force_hdmi: bool,
    pub silent_boot: bool,
    pub reboot_schedule: RebootSchedule,
    pub reboot_time: TimeOfDay,
    pub timezone: String,
    /// Revoke passwordless sudo for the kiosk user
    pub enable_security: bool,
}

impl Default for KioskSettings {
    fn default() -> Self {
        Self {
            kiosk_url: DEFAULT_URL.to_string(),
            output_name: DEFAULT_OUTPUT.to_string(),
            resolution_mode: ResolutionMode::Auto,
            rotation: Rotation::Normal,
            touch_device: None,
            force_hdmi: false,
            silent_boot: true,
            reboot_schedule: RebootSchedule::None,
            reboot_time: DEFAULT_REBOOT_TIME,
            timezone: DEFAULT_TIMEZONE.to_string(),
            enable_security: false,
        }
    }
}

fn parse_or<T: FromStr>(snapshot: &Snapshot, key: &str, default: T) -> T {
    match snapshot.get(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring saved {}={:?} (not a valid value)", key, raw);
            default
        }),
    }
}

fn text_or(snapshot: &Snapshot, key: &str, default: &str) -> String {
    match snapshot.get(key) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

impl KioskSettings {
    /// Settings from a saved snapshot, defaults for anything missing.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let d = Self::default();
        Self {
            kiosk_url: text_or(snapshot, keys::KIOSK_URL, &d.kiosk_url),
            output_name: text_or(snapshot, keys::OUTPUT_NAME, &d.output_name),
            resolution_mode: parse_or(snapshot, keys::RESOLUTION_MODE, d.resolution_mode),
            rotation: parse_or(snapshot, keys::ROTATION, d.rotation),
            touch_device: snapshot
                .get(keys::TOUCH_DEVICE)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            force_hdmi: parse_or(snapshot, keys::FORCE_HDMI, Toggle::from(d.force_hdmi)).as_bool(),
            silent_boot: parse_or(snapshot, keys::SILENT_BOOT, Toggle::from(d.silent_boot)).as_bool(),
            reboot_schedule: parse_or(snapshot, keys::REBOOT_SCHEDULE, d.reboot_schedule),
            reboot_time: parse_or(snapshot, keys::REBOOT_TIME, d.reboot_time),
            timezone: text_or(snapshot, keys::TIMEZONE, &d.timezone),
            enable_security: parse_or(
                snapshot,
                keys::ENABLE_SECURITY,
                Toggle::from(d.enable_security),
            )
            .as_bool(),
        }
    }

    /// Complete snapshot of these settings.
    pub fn to_snapshot(&self) -> Snapshot {
        let mut s = Snapshot::new();
        s.set(keys::KIOSK_URL, self.kiosk_url.clone());
        s.set(keys::OUTPUT_NAME, self.output_name.clone());
        s.set(keys::RESOLUTION_MODE, self.resolution_mode.to_string());
        s.set(keys::ROTATION, self.rotation.to_string());
        s.set(keys::TOUCH_DEVICE, self.touch_device.clone().unwrap_or_default());
        s.set(keys::FORCE_HDMI, Toggle::from(self.force_hdmi).to_string());
        s.set(keys::SILENT_BOOT, Toggle::from(self.silent_boot).to_string());
        s.set(keys::REBOOT_SCHEDULE, self.reboot_schedule.to_string());
        s.set(keys::REBOOT_TIME, self.reboot_time.to_string());
        s.set(keys::TIMEZONE, self.timezone.clone());
        s.set(keys::ENABLE_SECURITY, Toggle::from(self.enable_security).to_string());
        s
    }

    /// Kernel parameters these settings call for.
    ///
    /// `video=` carries the mode, with a `D` suffix to force the connector
    /// on when `force_hdmi` is set.
    pub fn boot_params(&self) -> Vec<String> {
        let mut params = Vec::new();

        let force = if self.force_hdmi { "D" } else { "" };
        match &self.resolution_mode {
            ResolutionMode::Fixed(mode) => {
                params.push(format!("video={}:{}{}", self.output_name, mode, force));
            }
            ResolutionMode::Auto if self.force_hdmi => {
                params.push(format!("video={}:D", self.output_name));
            }
            ResolutionMode::Auto => {}
        }

        if self.silent_boot {
            params.extend(SILENT_BOOT_PARAMS.iter().map(|p| p.to_string()));
        }
        params
    }
}
