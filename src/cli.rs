use clap::{Parser, Subcommand};

/// kioskify - turn a Raspberry Pi into a single-purpose browser kiosk
#[derive(Parser, Debug)]
#[command(name = "kioskify")]
#[command(about = "Configure a Wayland browser kiosk: boot parameters, session, timers")]
#[command(version)]
pub struct Cli {
    /// Debug logging; replaces the progress bar with log lines.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Account the kiosk session runs as (default: the user who invoked sudo).
    #[arg(short, long, global = true, env = "KIOSKIFY_USER")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Collect settings and configure the kiosk
    Install,
    /// Optional features: watchdog, display sleep, scheduled reboot, sudo, brightness
    Extras,
    /// Remove the kiosk session, managed boot parameters and timers
    Uninstall,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_no_args() {
        let cli = Cli::try_parse_from(["kioskify"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_subcommands() {
        let cli = Cli::try_parse_from(["kioskify", "install"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Install));
        let cli = Cli::try_parse_from(["kioskify", "extras"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Extras));
        let cli = Cli::try_parse_from(["kioskify", "uninstall"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Uninstall));
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["kioskify", "install", "--verbose", "--user", "kiosk"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.user.as_deref(), Some("kiosk"));
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["kioskify", "validate"]).is_err());
    }
}
