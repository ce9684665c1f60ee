//! kioskify - main entry point

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use kioskify::cli::{Cli, Commands};
use kioskify::config::{operating_user, Paths, SessionIdentity};
use kioskify::error::KioskError;
use kioskify::extras::run_extras;
use kioskify::features::FeatureToggle;
use kioskify::hardware::HardwareInfo;
use kioskify::orchestrator::{Apt, InstallOutcome, Orchestrator, Timedatectl};
use kioskify::param_store::ParamStore;
use kioskify::process_guard;
use kioskify::progress::{LogProgress, ProgressGauge, ProgressSink};
use kioskify::prompt::{InquirePrompter, Prompter};
use kioskify::sanity;
use kioskify::session::LabwcSession;
use kioskify::settings::KioskSettings;
use kioskify::system_manager::Systemctl;
use kioskify::validate::validate_user_name;

/// Logs go to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);
    info!("kioskify {} starting up", env!("CARGO_PKG_VERSION"));

    // Terminate apt and friends if we are interrupted
    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    debug!("Signal handlers initialized");

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    if let Err(report) = sanity::run_preflight_checks() {
        eprintln!("{}", report);
        return Ok(ExitCode::FAILURE);
    }

    let paths = Paths::from_env();
    debug!("Paths: {:?}", paths);

    let identity = resolve_identity(cli)?;
    info!("Kiosk user: {} (uid {})", identity.name, identity.uid);

    let hardware = HardwareInfo::detect(&paths);
    let manager = Systemctl;
    let session = LabwcSession::new(&paths.greetd_config, identity.clone());

    let gauge;
    let log_progress = LogProgress;
    let progress: &dyn ProgressSink = if cli.verbose {
        &log_progress
    } else {
        gauge = ProgressGauge::new().context("Invalid progress bar template")?;
        &gauge
    };

    let orchestrator = Orchestrator {
        paths: &paths,
        identity: &identity,
        hardware: &hardware,
        packages: &Apt,
        manager: &manager,
        system: &Timedatectl,
        session: &session,
        progress,
    };
    let mut prompter = InquirePrompter;

    match cli.command {
        Some(Commands::Install) => Ok(exit_code(install(&orchestrator, &mut prompter)?)),
        Some(Commands::Extras) => {
            Ok(extras(&orchestrator, &mut prompter).context("Extras menu failed")?)
        }
        Some(Commands::Uninstall) => Ok(uninstall(&orchestrator, &mut prompter)?),
        None => menu(&orchestrator, &mut prompter),
    }
}

/// The account the kiosk runs as: `--user`, else the sudo caller.
fn resolve_identity(cli: &Cli) -> kioskify::Result<SessionIdentity> {
    let user = operating_user(cli.user.clone()).ok_or_else(|| {
        KioskError::system("cannot determine the kiosk user; run via sudo or pass --user NAME")
    })?;
    let user = validate_user_name(&user)?;
    SessionIdentity::lookup(&user)
}

fn exit_code(succeeded: bool) -> ExitCode {
    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// `Ok(false)` when the pass failed and the process should exit with 1.
fn install(orchestrator: &Orchestrator<'_>, prompter: &mut dyn Prompter) -> Result<bool> {
    match orchestrator.install(prompter) {
        Ok(InstallOutcome::Completed { warnings }) => {
            println!("Kiosk configured. Reboot to start the kiosk session.");
            for warning in &warnings {
                println!("  warning: {}", warning);
            }
            Ok(true)
        }
        Ok(InstallOutcome::SavedOnly) => {
            println!(
                "Settings saved to {}; nothing was applied.",
                orchestrator.paths.snapshot.display()
            );
            Ok(true)
        }
        Ok(InstallOutcome::Cancelled) => Ok(true),
        Err(e) => {
            eprintln!("Installation failed: {}", e);
            if let Some(output) = e.diagnostics() {
                eprintln!("\n{}", output);
            }
            Ok(false)
        }
    }
}

fn extras(orchestrator: &Orchestrator<'_>, prompter: &mut dyn Prompter) -> kioskify::Result<ExitCode> {
    let paths = orchestrator.paths;
    let settings = KioskSettings::from_snapshot(&ParamStore::new(&paths.snapshot).load());
    let toggle = FeatureToggle::new(
        orchestrator.manager,
        &paths.unit_dir,
        &paths.sudoers_dir,
        orchestrator.identity.clone(),
    );
    run_extras(prompter, &toggle, orchestrator.hardware, &settings)?;
    Ok(ExitCode::SUCCESS)
}

fn uninstall(
    orchestrator: &Orchestrator<'_>,
    prompter: &mut dyn Prompter,
) -> kioskify::Result<ExitCode> {
    let confirmed = match prompter
        .confirm("Remove the kiosk session, managed boot parameters and timers?", false)
        .map_err(KioskError::from)
    {
        Ok(confirmed) => confirmed,
        Err(e) if e.is_cancelled() => false,
        Err(e) => return Err(e),
    };
    if !confirmed {
        return Ok(ExitCode::SUCCESS);
    }

    let warnings = orchestrator.uninstall();
    println!("Kiosk removed. Saved settings were kept.");
    for warning in &warnings {
        println!("  warning: {}", warning);
    }
    Ok(ExitCode::SUCCESS)
}

fn menu(orchestrator: &Orchestrator<'_>, prompter: &mut dyn Prompter) -> Result<ExitCode> {
    let entries = [
        "Install / reconfigure kiosk".to_string(),
        "Extras".to_string(),
        "Uninstall".to_string(),
        "Exit".to_string(),
    ];

    loop {
        let choice = match prompter.select("kioskify", &entries, 0).map_err(KioskError::from) {
            Ok(choice) => choice,
            Err(e) if e.is_cancelled() => return Ok(ExitCode::SUCCESS),
            Err(e) => return Err(e.into()),
        };

        match choice {
            0 => {
                if !install(orchestrator, prompter)? {
                    return Ok(ExitCode::FAILURE);
                }
            }
            1 => {
                extras(orchestrator, prompter)?;
            }
            2 => {
                uninstall(orchestrator, prompter)?;
            }
            _ => return Ok(ExitCode::SUCCESS),
        }
    }
}
