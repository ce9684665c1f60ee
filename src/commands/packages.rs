//! `apt-get` invocations.

use crate::command::HostCommand;

/// Type-safe arguments for `apt-get install`.
///
/// Runs non-interactively: `-y`, `--no-install-recommends` and
/// `DEBIAN_FRONTEND=noninteractive` so dpkg never stops on a prompt.
#[derive(Debug, Clone)]
pub struct AptInstallArgs {
    pub packages: Vec<String>,
}

impl HostCommand for AptInstallArgs {
    fn program(&self) -> &'static str {
        "apt-get"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "install".to_string(),
            "-y".to_string(),
            "--no-install-recommends".to_string(),
        ];
        args.extend(self.packages.iter().cloned());
        args
    }

    fn get_env_vars(&self) -> Vec<(String, String)> {
        vec![("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string())]
    }
}

/// Type-safe arguments for `apt-get update`.
#[derive(Debug, Clone, Default)]
pub struct AptUpdateArgs;

impl HostCommand for AptUpdateArgs {
    fn program(&self) -> &'static str {
        "apt-get"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["update".to_string()]
    }

    fn get_env_vars(&self) -> Vec<(String, String)> {
        vec![("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string())]
    }
}
