//! The configuration pass.
//!
//! Runs the stages of [`InstallStage`] in order: load the snapshot, collect
//! settings, persist them, and only then touch the system. Package
//! installation is the one fatal step; everything after it is best effort and
//! ends up as a warning in [`InstallOutcome::Completed`].

use thiserror::Error;
use tracing::{info, warn};

use crate::boot_line::BootLineEditor;
use crate::command::{run_command_safe, CommandError};
use crate::commands::packages::{AptInstallArgs, AptUpdateArgs};
use crate::commands::system::SetTimezoneArgs;
use crate::config::{Paths, SessionIdentity};
use crate::features::{Feature, FeatureParams, FeatureToggle, RebootFrequency};
use crate::hardware::HardwareInfo;
use crate::install_state::{InstallStage, InstallTransitionError, InstallerContext};
use crate::logic::resolver::resolve_packages;
use crate::param_store::{ParamStore, StoreError};
use crate::progress::ProgressSink;
use crate::prompt::{PromptError, Prompter};
use crate::session::SessionWriter;
use crate::settings::{KioskSettings, MANAGED_BOOT_PARAMS};
use crate::system_manager::SystemManager;
use crate::types::RebootSchedule;
use crate::wizard::collect_settings;

/// Errors that abort the configuration pass.
#[derive(Error, Debug)]
pub enum OrchestrationError {
    /// Package installation failed; nothing after it was applied
    #[error("package installation failed: {source}")]
    Packages {
        packages: Vec<String>,
        #[source]
        source: CommandError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Transition(#[from] InstallTransitionError),
}

impl OrchestrationError {
    /// Captured command output to show the operator, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::Packages {
                source: CommandError::Failed { stderr, .. },
                ..
            } if !stderr.is_empty() => Some(stderr.as_str()),
            _ => None,
        }
    }
}

/// How a pass ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Everything ran; best-effort steps that failed are listed
    Completed { warnings: Vec<String> },
    /// Settings were saved but the operator declined to apply them
    SavedOnly,
    /// The operator backed out before anything was saved
    Cancelled,
}

/// Installs distribution packages.
pub trait PackageInstaller {
    fn install(&self, packages: &[String]) -> Result<(), CommandError>;
}

/// `apt-get update` followed by `apt-get install`.
#[derive(Debug, Default)]
pub struct Apt;

impl PackageInstaller for Apt {
    fn install(&self, packages: &[String]) -> Result<(), CommandError> {
        info!("Installing {} package(s): {}", packages.len(), packages.join(" "));
        run_with_diagnostics(&AptUpdateArgs)?;
        run_with_diagnostics(&AptInstallArgs {
            packages: packages.to_vec(),
        })
    }
}

/// Like `ensure_success`, but keeps stdout too; apt reports most failures there.
fn run_with_diagnostics(cmd: &dyn crate::command::HostCommand) -> Result<(), CommandError> {
    let out = run_command_safe(cmd)?;
    if out.success {
        return Ok(());
    }
    Err(CommandError::Failed {
        program: out.program,
        code: out.exit_code.unwrap_or(-1),
        stderr: out.diagnostics(),
    })
}

/// Host-wide settings outside the kiosk session.
pub trait SystemSettings {
    fn set_timezone(&self, timezone: &str) -> Result<(), CommandError>;
}

#[derive(Debug, Default)]
pub struct Timedatectl;

impl SystemSettings for Timedatectl {
    fn set_timezone(&self, timezone: &str) -> Result<(), CommandError> {
        info!("Setting timezone to {}", timezone);
        run_command_safe(&SetTimezoneArgs {
            timezone: timezone.to_string(),
        })?
        .ensure_success()?;
        Ok(())
    }
}

/// Collaborators of one configuration pass.
pub struct Orchestrator<'a> {
    pub paths: &'a Paths,
    pub identity: &'a SessionIdentity,
    pub hardware: &'a HardwareInfo,
    pub packages: &'a dyn PackageInstaller,
    pub manager: &'a dyn SystemManager,
    pub system: &'a dyn SystemSettings,
    pub session: &'a dyn SessionWriter,
    pub progress: &'a dyn ProgressSink,
}

impl Orchestrator<'_> {
    fn toggle(&self) -> FeatureToggle<'_> {
        FeatureToggle::new(
            self.manager,
            &self.paths.unit_dir,
            &self.paths.sudoers_dir,
            self.identity.clone(),
        )
    }

    fn enter(
        &self,
        ctx: &mut InstallerContext,
        stage: InstallStage,
    ) -> Result<(), OrchestrationError> {
        ctx.transition_to(stage)?;
        self.progress.stage(stage);
        Ok(())
    }

    /// Run a full configuration pass.
    pub fn install(
        &self,
        prompter: &mut dyn Prompter,
    ) -> Result<InstallOutcome, OrchestrationError> {
        let mut ctx = InstallerContext::new();
        let result = self.run(&mut ctx, prompter);

        match &result {
            Err(e) => {
                warn!("Configuration failed at '{}': {}", ctx.current_stage(), e);
                // only fails if already terminal
                let _ = ctx.fail();
                self.progress.finish(InstallStage::Failed);
            }
            Ok(_) => self.progress.finish(ctx.current_stage()),
        }
        result
    }

    fn run(
        &self,
        ctx: &mut InstallerContext,
        prompter: &mut dyn Prompter,
    ) -> Result<InstallOutcome, OrchestrationError> {
        self.enter(ctx, InstallStage::LoadingConfig)?;
        let store = ParamStore::new(&self.paths.snapshot);
        let previous = KioskSettings::from_snapshot(&store.load());

        self.enter(ctx, InstallStage::CollectingSettings)?;
        let settings = match collect_settings(prompter, &previous, self.hardware) {
            Ok(settings) => settings,
            Err(PromptError::Cancelled) => {
                info!("Configuration cancelled; nothing changed");
                return Ok(InstallOutcome::Cancelled);
            }
            Err(e) => return Err(e.into()),
        };

        self.enter(ctx, InstallStage::SavingConfig)?;
        store.save(&settings.to_snapshot())?;

        let apply = match prompter.confirm("Apply these settings to the system now?", true) {
            Ok(apply) => apply,
            Err(PromptError::Cancelled) => false,
            Err(e) => return Err(e.into()),
        };
        if !apply {
            info!("Settings saved to {}; not applied", store.path().display());
            return Ok(InstallOutcome::SavedOnly);
        }
        ctx.confirm_apply();

        self.enter(ctx, InstallStage::InstallingPackages)?;
        let packages = resolve_packages(&settings);
        self.packages
            .install(&packages)
            .map_err(|source| OrchestrationError::Packages { packages, source })?;

        let mut warnings = Vec::new();
        let mut record = |step: &str, err: &dyn std::fmt::Display| {
            warn!("{} failed: {}", step, err);
            warnings.push(format!("{}: {}", step, err));
        };

        self.enter(ctx, InstallStage::ApplyingBootParams)?;
        let editor = BootLineEditor::new(&self.paths.boot_cmdline);
        if let Err(e) = editor.apply(MANAGED_BOOT_PARAMS, &settings.boot_params()) {
            record("Boot parameters", &e);
        }

        self.enter(ctx, InstallStage::SchedulingReboot)?;
        let toggle = self.toggle();
        // disable never fails; problems are logged inside
        let _ = toggle.disable(Feature::RebootSchedule);
        let frequency = match settings.reboot_schedule {
            RebootSchedule::None => None,
            RebootSchedule::Daily => Some(RebootFrequency::Daily),
            RebootSchedule::Weekly => Some(RebootFrequency::Weekly),
        };
        if let Some(frequency) = frequency {
            let params = FeatureParams::RebootSchedule {
                frequency,
                time: settings.reboot_time.to_string(),
            };
            if let Err(e) = toggle.enable(&params) {
                record("Reboot schedule", &e);
            }
        }

        self.enter(ctx, InstallStage::ApplyingSystemSettings)?;
        if let Err(e) = self.system.set_timezone(&settings.timezone) {
            record("Timezone", &e);
        }
        if settings.enable_security {
            let _ = toggle.disable(Feature::PrivilegeToggle);
        } else if let Err(e) = toggle.enable(&FeatureParams::PrivilegeToggle) {
            record("Passwordless sudo", &e);
        }

        self.enter(ctx, InstallStage::WritingSession)?;
        if let Err(e) = self.session.write(&settings) {
            record("Session files", &e);
        }

        self.enter(ctx, InstallStage::Completed)?;
        info!("Kiosk configured with {} warning(s)", warnings.len());
        Ok(InstallOutcome::Completed { warnings })
    }

    /// Remove what a pass installed: timer features, managed boot
    /// parameters and session files. The snapshot and the privilege artifact
    /// stay. Returns the steps that did not fully succeed.
    pub fn uninstall(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let toggle = self.toggle();

        for feature in [Feature::Watchdog, Feature::SleepSchedule, Feature::RebootSchedule] {
            let _ = toggle.disable(feature);
        }

        let editor = BootLineEditor::new(&self.paths.boot_cmdline);
        if let Err(e) = editor.apply(MANAGED_BOOT_PARAMS, &[]) {
            warn!("Could not clean boot parameters: {}", e);
            warnings.push(format!("Boot parameters: {}", e));
        }

        if let Err(e) = self.session.remove() {
            warn!("Could not remove session files: {}", e);
            warnings.push(format!("Session files: {}", e));
        }

        info!("Kiosk removed with {} warning(s)", warnings.len());
        warnings
    }
}
