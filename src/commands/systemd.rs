//! `systemctl` invocations.

use crate::command::HostCommand;

/// Action passed to `systemctl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemctlAction {
    /// `daemon-reload`
    DaemonReload,
    /// `is-enabled --quiet <unit>`
    IsEnabled(String),
    /// `enable --now <unit>`
    EnableNow(String),
    /// `disable --now <unit>`
    DisableNow(String),
}

/// Type-safe arguments for `systemctl`.
#[derive(Debug, Clone)]
pub struct SystemctlArgs {
    pub action: SystemctlAction,
}

impl SystemctlArgs {
    pub fn new(action: SystemctlAction) -> Self {
        Self { action }
    }
}

impl HostCommand for SystemctlArgs {
    fn program(&self) -> &'static str {
        "systemctl"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let args: Vec<&str> = match &self.action {
            SystemctlAction::DaemonReload => vec!["daemon-reload"],
            SystemctlAction::IsEnabled(unit) => vec!["is-enabled", "--quiet", unit.as_str()],
            SystemctlAction::EnableNow(unit) => vec!["enable", "--now", unit.as_str()],
            SystemctlAction::DisableNow(unit) => vec!["disable", "--now", unit.as_str()],
        };
        args.into_iter().map(str::to_string).collect()
    }
}
