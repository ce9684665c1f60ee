//! Package resolver
//!
//! Translates kiosk settings into the Debian packages the session needs.
//!
//! - **Deduplication**: output is deduplicated and sorted for deterministic results
//! - **Pure logic**: no I/O; package existence is apt's concern at install time
//!
//! | Setting            | Resolved To |
//! |--------------------|-------------|
//! | always             | compositor, greeter, seat daemon, browser, output tool |
//! | `silent_boot`      | boot splash |
//! | `touch_device`     | libinput tools for device listing |

use crate::settings::KioskSettings;

/// Always installed: Wayland compositor, login manager, browser.
pub const BASE_PACKAGES: &[&str] = &[
    "labwc",
    "greetd",
    "seatd",
    "wlr-randr",
    "chromium-browser",
];

const SPLASH_PACKAGES: &[&str] = &["plymouth", "plymouth-themes"];

const TOUCH_PACKAGES: &[&str] = &["libinput-tools"];

/// Resolve every package the configured kiosk needs.
pub fn resolve_packages(settings: &KioskSettings) -> Vec<String> {
    let mut packages: Vec<&str> = Vec::new();

    packages.extend_from_slice(BASE_PACKAGES);

    if settings.silent_boot {
        packages.extend_from_slice(SPLASH_PACKAGES);
    }

    if settings.touch_device.is_some() {
        packages.extend_from_slice(TOUCH_PACKAGES);
    }

    let mut result: Vec<String> = packages.iter().map(|s| s.to_string()).collect();
    result.sort();
    result.dedup();

    result
}
