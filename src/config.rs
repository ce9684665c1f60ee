//! Filesystem locations and the operating identity.
//!
//! Every component receives its paths from a `Paths` value. The process
//! environment is read only by [`Paths::from_env`] and [`operating_user`],
//! both called from `main`.

use std::path::{Path, PathBuf};

use nix::unistd::User;

use crate::error::KioskError;

/// Prefix for every system path (image preparation, chroot, tests).
pub const ROOT_ENV: &str = "KIOSKIFY_ROOT";
/// Explicit kernel command line file.
pub const CMDLINE_ENV: &str = "KIOSKIFY_CMDLINE";
/// Explicit snapshot file.
pub const CONFIG_ENV: &str = "KIOSKIFY_CONFIG";

/// Where kioskify reads and writes on the target system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Kernel command line (single line)
    pub boot_cmdline: PathBuf,
    /// Saved configuration snapshot
    pub snapshot: PathBuf,
    /// systemd unit directory
    pub unit_dir: PathBuf,
    /// sudoers drop-in directory
    pub sudoers_dir: PathBuf,
    /// greetd configuration file
    pub greetd_config: PathBuf,
    /// DRM connectors (`card0-HDMI-A-1`, ...)
    pub drm_dir: PathBuf,
    /// Backlight devices
    pub backlight_dir: PathBuf,
    /// Input device listing
    pub input_devices: PathBuf,
}

impl Paths {
    /// Standard layout below `root`.
    ///
    /// Raspberry Pi OS Bookworm moved the command line to
    /// `/boot/firmware/cmdline.txt`; older images keep `/boot/cmdline.txt`.
    pub fn under(root: &Path) -> Self {
        let firmware = root.join("boot/firmware/cmdline.txt");
        let boot_cmdline = if firmware.exists() {
            firmware
        } else {
            root.join("boot/cmdline.txt")
        };

        Self {
            boot_cmdline,
            snapshot: root.join("etc/kioskify/kiosk.conf"),
            unit_dir: root.join("etc/systemd/system"),
            sudoers_dir: root.join("etc/sudoers.d"),
            greetd_config: root.join("etc/greetd/config.toml"),
            drm_dir: PathBuf::from("/sys/class/drm"),
            backlight_dir: PathBuf::from("/sys/class/backlight"),
            input_devices: PathBuf::from("/proc/bus/input/devices"),
        }
    }

    /// Layout from `KIOSKIFY_ROOT` (default `/`) plus individual overrides.
    pub fn from_env() -> Self {
        let root = std::env::var_os(ROOT_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/"));
        let mut paths = Self::under(&root);

        if let Some(cmdline) = std::env::var_os(CMDLINE_ENV) {
            paths.boot_cmdline = PathBuf::from(cmdline);
        }
        if let Some(config) = std::env::var_os(CONFIG_ENV) {
            paths.snapshot = PathBuf::from(config);
        }
        paths
    }
}

/// The account the kiosk session runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
}

impl SessionIdentity {
    /// Resolve `name` through the passwd database.
    pub fn lookup(name: &str) -> Result<Self, KioskError> {
        let user = User::from_name(name)
            .map_err(|e| KioskError::system(format!("user lookup for '{}' failed: {}", name, e)))?
            .ok_or_else(|| KioskError::system(format!("no such user: {}", name)))?;
        Ok(Self {
            name: user.name,
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
            home: user.dir,
        })
    }

    /// `XDG_RUNTIME_DIR` of the user's session.
    pub fn runtime_dir(&self) -> String {
        format!("/run/user/{}", self.uid)
    }

    /// labwc configuration directory.
    pub fn labwc_dir(&self) -> PathBuf {
        self.home.join(".config/labwc")
    }
}

/// Operating user: explicit choice, else the user who invoked sudo, else `USER`.
pub fn operating_user(explicit: Option<String>) -> Option<String> {
    explicit
        .or_else(|| std::env::var("SUDO_USER").ok())
        .or_else(|| std::env::var("USER").ok())
        .filter(|name| !name.is_empty() && name != "root")
}
