//! Install State Machine
//!
//! Authoritative source of truth for the progress of one configuration pass.
//! Transitions are validated so no stage can be skipped or repeated.
//!
//! # Stage Flow
//!
//! ```text
//! NotStarted
//!     ↓
//! LoadingConfig
//!     ↓
//! CollectingSettings
//!     ↓
//! SavingConfig
//!     ↓  (requires apply confirmation)
//! InstallingPackages
//!     ↓
//! ApplyingBootParams
//!     ↓
//! SchedulingReboot
//!     ↓
//! ApplyingSystemSettings
//!     ↓
//! WritingSession
//!     ↓
//! Completed
//!
//! (Any stage can transition to Failed)
//! ```

use std::fmt;
use thiserror::Error;

/// Stages of a configuration pass in sequential order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InstallStage {
    /// Nothing has happened yet
    NotStarted = 0,

    /// Reading the saved snapshot
    LoadingConfig = 1,

    /// Prompting for desired values
    CollectingSettings = 2,

    /// Persisting the snapshot (before any system mutation)
    SavingConfig = 3,

    /// First stage that changes the system; needs explicit confirmation
    InstallingPackages = 4,

    /// Rewriting the kernel command line
    ApplyingBootParams = 5,

    /// Reboot timer reconciliation
    SchedulingReboot = 6,

    /// Timezone and privilege artifact
    ApplyingSystemSettings = 7,

    /// greetd and labwc files
    WritingSession = 8,

    /// Pass finished (terminal state)
    Completed = 9,

    /// Pass aborted (terminal state)
    Failed = 255,
}

impl InstallStage {
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Entering this stage changes the live system.
    #[inline]
    pub const fn requires_confirmation(self) -> bool {
        matches!(self, Self::InstallingPackages)
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::LoadingConfig),
            Self::LoadingConfig => Some(Self::CollectingSettings),
            Self::CollectingSettings => Some(Self::SavingConfig),
            Self::SavingConfig => Some(Self::InstallingPackages),
            Self::InstallingPackages => Some(Self::ApplyingBootParams),
            Self::ApplyingBootParams => Some(Self::SchedulingReboot),
            Self::SchedulingReboot => Some(Self::ApplyingSystemSettings),
            Self::ApplyingSystemSettings => Some(Self::WritingSession),
            Self::WritingSession => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::LoadingConfig => "Loading saved configuration",
            Self::CollectingSettings => "Collecting settings",
            Self::SavingConfig => "Saving configuration",
            Self::InstallingPackages => "Installing packages",
            Self::ApplyingBootParams => "Applying boot parameters",
            Self::SchedulingReboot => "Scheduling reboot",
            Self::ApplyingSystemSettings => "Applying system settings",
            Self::WritingSession => "Writing kiosk session",
            Self::Completed => "Kiosk configured",
            Self::Failed => "Configuration failed",
        }
    }

    /// Approximate progress. Package installation dominates the run time.
    pub const fn progress_percent(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::LoadingConfig => 2,
            Self::CollectingSettings => 5,
            Self::SavingConfig => 10,
            Self::InstallingPackages => 15,
            Self::ApplyingBootParams => 70,
            Self::SchedulingReboot => 78,
            Self::ApplyingSystemSettings => 85,
            Self::WritingSession => 92,
            Self::Completed => 100,
            Self::Failed => 0,
        }
    }

    /// All stages in order (excluding Failed)
    pub const fn all_stages() -> &'static [Self] {
        &[
            Self::NotStarted,
            Self::LoadingConfig,
            Self::CollectingSettings,
            Self::SavingConfig,
            Self::InstallingPackages,
            Self::ApplyingBootParams,
            Self::SchedulingReboot,
            Self::ApplyingSystemSettings,
            Self::WritingSession,
            Self::Completed,
        ]
    }
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during state transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallTransitionError {
    #[error("Cannot skip from {from} to {to} (must transition through intermediate stages)")]
    SkippedStage { from: InstallStage, to: InstallStage },

    #[error("Cannot go backwards from {from} to {to}")]
    BackwardTransition { from: InstallStage, to: InstallStage },

    #[error("Cannot transition from terminal state {from}")]
    FromTerminalState { from: InstallStage },

    #[error("Stage {stage} changes the system and requires confirmation")]
    MissingConfirmation { stage: InstallStage },

    #[error("Already at stage {stage}")]
    AlreadyAtStage { stage: InstallStage },
}

/// Owns the current stage of one pass and validates every transition.
///
/// ```
/// use kioskify::install_state::{InstallerContext, InstallStage};
///
/// let mut ctx = InstallerContext::new();
/// ctx.advance().unwrap();
/// assert_eq!(ctx.current_stage(), InstallStage::LoadingConfig);
/// assert!(ctx.transition_to(InstallStage::InstallingPackages).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct InstallerContext {
    current: InstallStage,
    failed_at: Option<InstallStage>,
    /// (stage, unix timestamp) for every stage entered
    stage_history: Vec<(InstallStage, u64)>,
    apply_confirmed: bool,
}

impl Default for InstallerContext {
    fn default() -> Self {
        Self::new()
    }
}

impl InstallerContext {
    pub fn new() -> Self {
        Self {
            current: InstallStage::NotStarted,
            failed_at: None,
            stage_history: Vec::with_capacity(InstallStage::all_stages().len()),
            apply_confirmed: false,
        }
    }

    #[inline]
    pub fn current_stage(&self) -> InstallStage {
        self.current
    }

    #[inline]
    pub fn failed_at(&self) -> Option<InstallStage> {
        self.failed_at
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current == InstallStage::Completed
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.current == InstallStage::Failed
    }

    #[inline]
    pub fn progress_percent(&self) -> u8 {
        self.current.progress_percent()
    }

    pub fn stage_history(&self) -> &[(InstallStage, u64)] {
        &self.stage_history
    }

    /// The user agreed to apply changes. One-way.
    pub fn confirm_apply(&mut self) {
        self.apply_confirmed = true;
    }

    #[inline]
    pub fn is_apply_confirmed(&self) -> bool {
        self.apply_confirmed
    }

    /// Advance to the next stage in sequence.
    pub fn advance(&mut self) -> Result<InstallStage, InstallTransitionError> {
        let Some(next_stage) = self.current.next() else {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        };
        self.transition_to(next_stage)
    }

    /// Transition to `target`, which must be the immediate next stage.
    pub fn transition_to(
        &mut self,
        target: InstallStage,
    ) -> Result<InstallStage, InstallTransitionError> {
        if self.current.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        }

        if target == self.current {
            return Err(InstallTransitionError::AlreadyAtStage { stage: target });
        }

        // Failed is reachable only through fail()
        if target == InstallStage::Failed {
            return Err(InstallTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }

        if target.order() < self.current.order() {
            return Err(InstallTransitionError::BackwardTransition {
                from: self.current,
                to: target,
            });
        }

        if self.current.next() != Some(target) {
            return Err(InstallTransitionError::SkippedStage {
                from: self.current,
                to: target,
            });
        }

        if target.requires_confirmation() && !self.apply_confirmed {
            return Err(InstallTransitionError::MissingConfirmation { stage: target });
        }

        self.record_stage_transition(target);
        self.current = target;
        Ok(target)
    }

    /// Mark the pass as failed, remembering where.
    pub fn fail(&mut self) -> Result<(), InstallTransitionError> {
        if self.current.is_terminal() {
            return Err(InstallTransitionError::FromTerminalState { from: self.current });
        }

        self.failed_at = Some(self.current);
        self.record_stage_transition(InstallStage::Failed);
        self.current = InstallStage::Failed;
        Ok(())
    }

    fn record_stage_transition(&mut self, stage: InstallStage) {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        self.stage_history.push((stage, timestamp));
    }
}
