//! Host settings commands.

use crate::command::HostCommand;

/// Type-safe arguments for `timedatectl set-timezone`.
#[derive(Debug, Clone)]
pub struct SetTimezoneArgs {
    /// IANA zone name, e.g. `Europe/Berlin`.
    pub timezone: String,
}

impl HostCommand for SetTimezoneArgs {
    fn program(&self) -> &'static str {
        "timedatectl"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["set-timezone".to_string(), self.timezone.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_timezone_args() {
        let args = SetTimezoneArgs {
            timezone: "America/New_York".to_string(),
        };
        assert_eq!(args.to_cli_args(), vec!["set-timezone", "America/New_York"]);
        assert_eq!(args.program(), "timedatectl");
    }
}
