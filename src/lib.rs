//! kioskify library
//!
//! Boot and unit configuration for a single-purpose Wayland browser kiosk:
//! the saved settings snapshot, the kernel command line editor, systemd unit
//! rendering, optional feature toggles and the configuration pass that ties
//! them together.

pub mod backlight;
pub mod boot_line;
pub mod cli;
pub mod command;
pub mod commands;
pub mod config;
pub mod error;
pub mod extras;
pub mod features;
pub mod file_ops;
pub mod hardware;
pub mod install_state;
pub mod logic;
pub mod orchestrator;
pub mod param_store;
pub mod process_guard;
pub mod progress;
pub mod prompt;
pub mod sanity;
pub mod session;
pub mod settings;
pub mod system_manager;
pub mod types;
pub mod units;
pub mod validate;
pub mod wizard;

// Re-export main types for convenience
pub use boot_line::{BootLineEditor, WriteError};
pub use config::{Paths, SessionIdentity};
pub use error::{KioskError, Result};
pub use features::{Feature, FeatureParams, FeatureState, FeatureToggle, ToggleError};
pub use install_state::{InstallStage, InstallTransitionError, InstallerContext};
pub use orchestrator::{InstallOutcome, OrchestrationError, Orchestrator};
pub use param_store::{ParamStore, Snapshot, StoreError};
pub use process_guard::{ChildRegistry, CommandProcessGroup};
pub use settings::KioskSettings;
pub use system_manager::{SystemManager, Systemctl};
pub use units::{render as render_unit, UnitSpec};
pub use validate::{TimeOfDay, ValidationError};

pub use logic::resolver::resolve_packages;
