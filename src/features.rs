//! Optional kiosk features and their ENABLED/DISABLED lifecycle.
//!
//! Each timer-based feature owns a fixed set of unit files. A feature is
//! either fully present (every file written, primary timers enabled and
//! started) or fully absent (files deleted, timers disabled and stopped).
//! Status is read back from the service manager every time; an enabled
//! primary timer means the whole feature is present.
//!
//! | Feature            | Artifacts                                                    |
//! |--------------------|--------------------------------------------------------------|
//! | `watchdog`         | `kiosk-watchdog.service`, `kiosk-watchdog.timer`             |
//! | `sleep-schedule`   | `kiosk-screen-{off,on}.service`, `kiosk-screen-{off,on}.timer` |
//! | `reboot-schedule`  | `kiosk-reboot.service`, `kiosk-reboot.timer`                 |
//! | `privilege-toggle` | `/etc/sudoers.d/010_kioskify-<user>` (file presence is state)|

use std::io;
use std::path::{Path, PathBuf};

use strum::{Display, EnumIter, EnumString};
use thiserror::Error;
use tracing::{info, warn};

use crate::command::CommandError;
use crate::config::SessionIdentity;
use crate::file_ops::write_file_atomic;
use crate::system_manager::SystemManager;
use crate::units::{self, CalendarSpec, ServiceParams, TimerParams, TimerTrigger, UnitSpec, Weekday};
use crate::validate::{validate_token, validate_user_name, TimeOfDay};

/// sudoers drop-in permission; sudo ignores group/world-writable files.
pub const PRIVILEGE_MODE: u32 = 0o440;

const WATCHDOG_SERVICE: &str = "kiosk-watchdog.service";
const WATCHDOG_TIMER: &str = "kiosk-watchdog.timer";
const SCREEN_OFF_SERVICE: &str = "kiosk-screen-off.service";
const SCREEN_ON_SERVICE: &str = "kiosk-screen-on.service";
const SCREEN_OFF_TIMER: &str = "kiosk-screen-off.timer";
const SCREEN_ON_TIMER: &str = "kiosk-screen-on.timer";
const REBOOT_SERVICE: &str = "kiosk-reboot.service";
const REBOOT_TIMER: &str = "kiosk-reboot.timer";

/// Liveness check: restart the login session when no browser is running.
const WATCHDOG_COMMAND: &str = "/bin/sh -c 'pgrep -x chromium >/dev/null || pgrep -x chromium-browser >/dev/null || systemctl restart greetd.service'";

/// Togglable kiosk capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Feature {
    Watchdog,
    SleepSchedule,
    RebootSchedule,
    PrivilegeToggle,
}

impl Feature {
    /// Menu label.
    pub const fn description(self) -> &'static str {
        match self {
            Self::Watchdog => "Browser crash watchdog",
            Self::SleepSchedule => "Scheduled display sleep",
            Self::RebootSchedule => "Scheduled reboot",
            Self::PrivilegeToggle => "Passwordless sudo",
        }
    }

    /// Unit files owned by the feature, in install order.
    pub const fn unit_names(self) -> &'static [&'static str] {
        match self {
            Self::Watchdog => &[WATCHDOG_SERVICE, WATCHDOG_TIMER],
            Self::SleepSchedule => &[
                SCREEN_OFF_SERVICE,
                SCREEN_ON_SERVICE,
                SCREEN_OFF_TIMER,
                SCREEN_ON_TIMER,
            ],
            Self::RebootSchedule => &[REBOOT_SERVICE, REBOOT_TIMER],
            Self::PrivilegeToggle => &[],
        }
    }

    /// Timers that are enabled and started; the first is the status signal.
    pub const fn primary_timers(self) -> &'static [&'static str] {
        match self {
            Self::Watchdog => &[WATCHDOG_TIMER],
            Self::SleepSchedule => &[SCREEN_OFF_TIMER, SCREEN_ON_TIMER],
            Self::RebootSchedule => &[REBOOT_TIMER],
            Self::PrivilegeToggle => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FeatureState {
    #[strum(serialize = "enabled")]
    Enabled,
    #[strum(serialize = "disabled")]
    Disabled,
}

/// Reboot cadence. Weekly reboots happen on Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum RebootFrequency {
    Daily,
    Weekly,
}

impl RebootFrequency {
    pub fn calendar(self, time: TimeOfDay) -> CalendarSpec {
        match self {
            Self::Daily => CalendarSpec::Daily(time),
            Self::Weekly => CalendarSpec::Weekly(Weekday::Mon, time),
        }
    }
}

/// Parameters for enabling a feature. Times are raw `HH:MM` input and are
/// validated before anything is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureParams {
    Watchdog,
    SleepSchedule {
        off_time: String,
        on_time: String,
        /// Connector to switch, e.g. `HDMI-A-1`
        output: String,
    },
    RebootSchedule {
        frequency: RebootFrequency,
        time: String,
    },
    PrivilegeToggle,
}

impl FeatureParams {
    pub fn feature(&self) -> Feature {
        match self {
            Self::Watchdog => Feature::Watchdog,
            Self::SleepSchedule { .. } => Feature::SleepSchedule,
            Self::RebootSchedule { .. } => Feature::RebootSchedule,
            Self::PrivilegeToggle => Feature::PrivilegeToggle,
        }
    }
}

/// Errors from enabling or disabling a feature.
#[derive(Error, Debug)]
pub enum ToggleError {
    /// Rejected before any artifact was written
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Command(#[from] CommandError),
}

fn parse_time(label: &str, raw: &str) -> Result<TimeOfDay, ToggleError> {
    raw.trim()
        .parse()
        .map_err(|e| ToggleError::InvalidParameter(format!("{}: {}", label, e)))
}

/// Feature lifecycle manager for one kiosk user.
pub struct FeatureToggle<'a> {
    manager: &'a dyn SystemManager,
    unit_dir: PathBuf,
    sudoers_dir: PathBuf,
    identity: SessionIdentity,
}

impl<'a> FeatureToggle<'a> {
    pub fn new(
        manager: &'a dyn SystemManager,
        unit_dir: impl Into<PathBuf>,
        sudoers_dir: impl Into<PathBuf>,
        identity: SessionIdentity,
    ) -> Self {
        Self {
            manager,
            unit_dir: unit_dir.into(),
            sudoers_dir: sudoers_dir.into(),
            identity,
        }
    }

    pub fn unit_path(&self, name: &str) -> PathBuf {
        self.unit_dir.join(name)
    }

    /// sudoers drop-in granting the kiosk user passwordless sudo.
    pub fn privilege_path(&self) -> PathBuf {
        self.sudoers_dir
            .join(format!("010_kioskify-{}", self.identity.name))
    }

    fn artifact_paths(&self, feature: Feature) -> Vec<PathBuf> {
        match feature {
            Feature::PrivilegeToggle => vec![self.privilege_path()],
            _ => feature
                .unit_names()
                .iter()
                .map(|name| self.unit_path(name))
                .collect(),
        }
    }

    /// Observed state. Query failures count as disabled.
    pub fn status(&self, feature: Feature) -> FeatureState {
        let enabled = match feature {
            Feature::PrivilegeToggle => self.privilege_path().exists(),
            _ => feature.primary_timers().first().is_some_and(|timer| {
                self.manager.is_enabled(timer).unwrap_or_else(|e| {
                    warn!("Could not query {}: {} (treating as disabled)", timer, e);
                    false
                })
            }),
        };
        if enabled {
            FeatureState::Enabled
        } else {
            FeatureState::Disabled
        }
    }

    /// Validate `params` and build every unit the feature needs.
    pub fn plan_units(&self, params: &FeatureParams) -> Result<Vec<UnitSpec>, ToggleError> {
        match params {
            FeatureParams::Watchdog => Ok(vec![
                UnitSpec::service(
                    WATCHDOG_SERVICE,
                    "Kiosk browser watchdog",
                    ServiceParams {
                        exec_start: WATCHDOG_COMMAND.to_string(),
                        ..Default::default()
                    },
                ),
                UnitSpec::timer(
                    WATCHDOG_TIMER,
                    "Run the kiosk browser watchdog every minute",
                    TimerParams {
                        trigger: TimerTrigger::Interval {
                            boot_delay: "2min",
                            every: "1min",
                        },
                        unit: None,
                    },
                ),
            ]),
            FeatureParams::SleepSchedule {
                off_time,
                on_time,
                output,
            } => {
                let off = parse_time("display off time", off_time)?;
                let on = parse_time("display on time", on_time)?;
                if off == on {
                    return Err(ToggleError::InvalidParameter(
                        "display off and on times must differ".to_string(),
                    ));
                }
                let output = validate_token("Output", output)
                    .map_err(|e| ToggleError::InvalidParameter(e.to_string()))?;
                let user = validate_user_name(&self.identity.name)
                    .map_err(|e| ToggleError::InvalidParameter(e.to_string()))?;

                let screen = |state: &str| ServiceParams {
                    exec_start: format!("/usr/bin/wlr-randr --output {} --{}", output, state),
                    user: Some(user.clone()),
                    environment: vec![
                        ("WAYLAND_DISPLAY".to_string(), "wayland-0".to_string()),
                        ("XDG_RUNTIME_DIR".to_string(), self.identity.runtime_dir()),
                    ],
                };

                Ok(vec![
                    UnitSpec::service(SCREEN_OFF_SERVICE, "Turn kiosk display off", screen("off")),
                    UnitSpec::service(SCREEN_ON_SERVICE, "Turn kiosk display on", screen("on")),
                    UnitSpec::timer(
                        SCREEN_OFF_TIMER,
                        format!("Turn kiosk display off at {}", off),
                        TimerParams {
                            trigger: TimerTrigger::Calendar(CalendarSpec::Daily(off)),
                            unit: None,
                        },
                    ),
                    UnitSpec::timer(
                        SCREEN_ON_TIMER,
                        format!("Turn kiosk display on at {}", on),
                        TimerParams {
                            trigger: TimerTrigger::Calendar(CalendarSpec::Daily(on)),
                            unit: None,
                        },
                    ),
                ])
            }
            FeatureParams::RebootSchedule { frequency, time } => {
                let time = parse_time("reboot time", time)?;
                Ok(vec![
                    UnitSpec::service(
                        REBOOT_SERVICE,
                        "Scheduled kiosk reboot",
                        ServiceParams {
                            exec_start: "/usr/bin/systemctl reboot".to_string(),
                            ..Default::default()
                        },
                    ),
                    UnitSpec::timer(
                        REBOOT_TIMER,
                        format!("{} kiosk reboot at {}", frequency, time),
                        TimerParams {
                            trigger: TimerTrigger::Calendar(frequency.calendar(time)),
                            unit: None,
                        },
                    ),
                ])
            }
            FeatureParams::PrivilegeToggle => {
                validate_user_name(&self.identity.name)
                    .map_err(|e| ToggleError::InvalidParameter(e.to_string()))?;
                Ok(Vec::new())
            }
        }
    }

    /// Create every artifact and start the primary timers.
    ///
    /// Parameters are validated first; on a later failure the feature is
    /// torn down again so it is never left half-installed.
    pub fn enable(&self, params: &FeatureParams) -> Result<(), ToggleError> {
        let feature = params.feature();
        let specs = self.plan_units(params)?;
        info!("Enabling {}", feature);

        if feature == Feature::PrivilegeToggle {
            return self.write_privilege_artifact();
        }

        let result = self.install_units(&specs).and_then(|()| {
            self.manager.reload()?;
            for timer in feature.primary_timers() {
                self.manager.enable_now(timer)?;
            }
            Ok(())
        });

        if let Err(e) = result {
            warn!("Enabling {} failed: {}; removing partial artifacts", feature, e);
            // disable is best-effort and always Ok
            let _ = self.disable(feature);
            return Err(e);
        }
        Ok(())
    }

    fn install_units(&self, specs: &[UnitSpec]) -> Result<(), ToggleError> {
        for spec in specs {
            let path = self.unit_path(&spec.name);
            units::install(&path, &units::render(spec))
                .map_err(|source| ToggleError::Io { path, source })?;
        }
        Ok(())
    }

    fn write_privilege_artifact(&self) -> Result<(), ToggleError> {
        let path = self.privilege_path();
        let content = format!(
            "# Managed by kioskify\n{} ALL=(ALL) NOPASSWD: ALL\n",
            self.identity.name
        );

        // sudo skips files whose name contains '.', so the temp sibling is inert
        write_file_atomic(&path, &content, PRIVILEGE_MODE)
            .map_err(|source| ToggleError::Io { path, source })?;
        info!("Granted passwordless sudo to {}", self.identity.name);
        Ok(())
    }

    /// Stop the primary timers and delete every artifact.
    ///
    /// Best effort: individual failures are logged and the remaining steps
    /// still run. Disabling an absent feature is a no-op.
    pub fn disable(&self, feature: Feature) -> Result<(), ToggleError> {
        info!("Disabling {}", feature);

        for timer in feature.primary_timers() {
            let present = self.unit_path(timer).exists()
                || self.manager.is_enabled(timer).unwrap_or(false);
            if !present {
                continue;
            }
            if let Err(e) = self.manager.disable_now(timer) {
                warn!("Could not disable {}: {}", timer, e);
            }
        }

        let paths = self.artifact_paths(feature);
        let existed = paths.iter().any(|p| p.exists());
        if let Err(e) = units::remove(&paths) {
            warn!("Could not remove all {} artifacts: {}", feature, e);
        }

        if existed && feature != Feature::PrivilegeToggle {
            if let Err(e) = self.manager.reload() {
                warn!("systemd reload failed: {}", e);
            }
        }
        Ok(())
    }

    /// Directory holding the unit files.
    pub fn unit_dir(&self) -> &Path {
        &self.unit_dir
    }
}
