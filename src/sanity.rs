//! Pre-flight sanity checks for the runtime environment
//!
//! Verified before any prompt is shown:
//! - Running with root privileges (EUID 0)
//! - Required runtime binaries are present
//!
//! A failed check prints a report and exits before anything is touched.

use tracing::{debug, info, warn};

/// Result of environment verification
#[derive(Debug)]
pub struct SanityCheckResult {
    pub missing_binaries: Vec<String>,
    pub is_root: bool,
}

impl SanityCheckResult {
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty() && self.is_root
    }
}

/// Required runtime binaries
const REQUIRED_BINARIES: &[&str] = &[
    "systemctl",   // unit management
    "apt-get",     // package installation
    "timedatectl", // timezone
];

/// Optional binaries (warn if missing but don't fail)
const OPTIONAL_BINARIES: &[&str] = &[
    "wlr-randr", // installed by the first pass
];

/// Skip the root check (image preparation under a fake root).
pub const SKIP_ROOT_ENV: &str = "KIOSKIFY_SKIP_ROOT_CHECK";

/// Whether `name` resolves to an executable through `path_var`.
fn binary_in(name: &str, path_var: &str) -> bool {
    which::which_in(name, Some(path_var), "/").is_ok()
}

/// Check if a binary is available in PATH
fn binary_exists(name: &str) -> bool {
    which::which(name).is_ok()
}

fn is_running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

pub fn verify_environment() -> SanityCheckResult {
    let missing = REQUIRED_BINARIES
        .iter()
        .filter(|b| !binary_exists(b))
        .map(|b| b.to_string())
        .collect();

    for binary in OPTIONAL_BINARIES {
        if !binary_exists(binary) {
            debug!("Optional binary not found: {}", binary);
        }
    }

    SanityCheckResult {
        missing_binaries: missing,
        is_root: is_running_as_root(),
    }
}

/// Human-readable report for a failed check.
pub fn failure_report(result: &SanityCheckResult) -> String {
    let mut out = String::from("kioskify pre-flight check failed\n");
    if !result.is_root {
        out.push_str("\n  Root privileges required. Run with sudo:\n    sudo kioskify\n");
    }
    if !result.missing_binaries.is_empty() {
        out.push_str("\n  Missing required binaries:\n");
        for binary in &result.missing_binaries {
            out.push_str(&format!("    - {}\n", binary));
        }
        out.push_str("  kioskify targets Debian-based systems with systemd.\n");
    }
    out
}

pub fn should_skip_root_check() -> bool {
    std::env::var(SKIP_ROOT_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Verify the environment; `Err` carries the report to print.
pub fn run_preflight_checks() -> Result<(), String> {
    debug!("Running pre-flight sanity checks...");
    let mut result = verify_environment();

    if should_skip_root_check() {
        warn!("Root check skipped ({}=1)", SKIP_ROOT_ENV);
        result.is_root = true;
    }

    if !result.is_ok() {
        return Err(failure_report(&result));
    }
    info!("Pre-flight checks passed");
    Ok(())
}
