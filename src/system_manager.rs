//! Capability interface over the host service manager.
//!
//! Feature status is always read back from the service manager; nothing in
//! kioskify assumes its own memory of what it enabled is still true.

use tracing::{debug, info};

use crate::command::{run_command_safe, CommandError};
use crate::commands::systemd::{SystemctlAction, SystemctlArgs};

/// What kioskify needs from the service manager.
pub trait SystemManager {
    /// Whether `unit` is enabled. `Err` when the query itself failed.
    fn is_enabled(&self, unit: &str) -> Result<bool, CommandError>;

    /// Re-read unit definitions from disk.
    fn reload(&self) -> Result<(), CommandError>;

    /// Enable `unit` and start it immediately.
    fn enable_now(&self, unit: &str) -> Result<(), CommandError>;

    /// Disable `unit` and stop it immediately.
    fn disable_now(&self, unit: &str) -> Result<(), CommandError>;
}

/// `SystemManager` backed by the `systemctl` binary.
#[derive(Debug, Clone, Default)]
pub struct Systemctl;

impl Systemctl {
    fn run(&self, action: SystemctlAction) -> Result<(), CommandError> {
        run_command_safe(&SystemctlArgs::new(action))?.ensure_success()?;
        Ok(())
    }
}

impl SystemManager for Systemctl {
    fn is_enabled(&self, unit: &str) -> Result<bool, CommandError> {
        // is-enabled exits non-zero for disabled and unknown units alike
        let out = run_command_safe(&SystemctlArgs::new(SystemctlAction::IsEnabled(
            unit.to_string(),
        )))?;
        debug!("{} is-enabled: {}", unit, out.success);
        Ok(out.success)
    }

    fn reload(&self) -> Result<(), CommandError> {
        info!("Reloading systemd unit definitions");
        self.run(SystemctlAction::DaemonReload)
    }

    fn enable_now(&self, unit: &str) -> Result<(), CommandError> {
        info!("Enabling {}", unit);
        self.run(SystemctlAction::EnableNow(unit.to_string()))
    }

    fn disable_now(&self, unit: &str) -> Result<(), CommandError> {
        info!("Disabling {}", unit);
        self.run(SystemctlAction::DisableNow(unit.to_string()))
    }
}
