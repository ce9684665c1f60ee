//! Install progress reporting.
//!
//! The default is an `indicatif` gauge drawn on stdout while logs go to
//! stderr. With `--verbose` the gauge is replaced by plain log lines so the
//! debug output stays readable.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::info;

use crate::install_state::InstallStage;

/// Receives stage changes from the install sequence.
pub trait ProgressSink {
    fn stage(&self, stage: InstallStage);

    /// The pass ended, successfully or not.
    fn finish(&self, stage: InstallStage);
}

/// Stages before this one run while prompts are on screen.
const FIRST_DRAWN_STAGE: InstallStage = InstallStage::InstallingPackages;

pub struct ProgressGauge {
    bar: ProgressBar,
}

impl ProgressGauge {
    pub fn new() -> Result<Self, indicatif::style::TemplateError> {
        // drawn from the first mutating stage on
        let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::hidden());
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.cyan/blue}] {pos:>3}%  {msg}")?
                .progress_chars("█▓░"),
        );
        Ok(Self { bar })
    }
}

impl ProgressSink for ProgressGauge {
    fn stage(&self, stage: InstallStage) {
        if stage.order() < FIRST_DRAWN_STAGE.order() {
            return;
        }
        if self.bar.is_hidden() {
            self.bar.set_draw_target(ProgressDrawTarget::stdout());
        }
        self.bar.set_position(u64::from(stage.progress_percent()));
        self.bar.set_message(stage.description());
    }

    fn finish(&self, stage: InstallStage) {
        if self.bar.is_hidden() {
            return;
        }
        if stage == InstallStage::Completed {
            self.bar.finish_with_message(stage.description());
        } else {
            self.bar.abandon_with_message(stage.description());
        }
    }
}

/// One log line per stage.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn stage(&self, stage: InstallStage) {
        info!("[{:>3}%] {}", stage.progress_percent(), stage);
    }

    fn finish(&self, stage: InstallStage) {
        info!("{}", stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_stays_hidden_during_prompts() {
        let gauge = ProgressGauge::new().unwrap();
        gauge.stage(InstallStage::CollectingSettings);
        assert!(gauge.bar.is_hidden());
        assert_eq!(gauge.bar.position(), 0);
    }
}
