//! End-to-end configuration passes with every host interaction faked
//!
//! The boot line, snapshot, unit files and sudoers drop-in are real files in
//! a temporary root; packages, timezone, the session writer and systemd are
//! recorded instead of executed.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fs;
use std::io;
use std::path::PathBuf;

use tempfile::TempDir;

use kioskify::command::CommandError;
use kioskify::config::{Paths, SessionIdentity};
use kioskify::hardware::HardwareInfo;
use kioskify::install_state::InstallStage;
use kioskify::orchestrator::{
    InstallOutcome, OrchestrationError, Orchestrator, PackageInstaller, SystemSettings,
};
use kioskify::param_store::{ParamStore, Snapshot};
use kioskify::progress::ProgressSink;
use kioskify::prompt::{PromptError, Prompter};
use kioskify::resolve_packages;
use kioskify::session::SessionWriter;
use kioskify::settings::KioskSettings;
use kioskify::system_manager::SystemManager;
use kioskify::types::{RebootSchedule, ResolutionMode};

const BASE_CMDLINE: &str =
    "console=serial0,115200 console=tty1 root=PARTUUID=1234abcd-02 rootfstype=ext4 fsck.repair=yes rootwait";

// =============================================================================
// Test doubles
// =============================================================================

/// Answers keyed by prompt message; anything unscripted takes the default.
#[derive(Default)]
struct KeyedPrompter {
    texts: HashMap<&'static str, VecDeque<&'static str>>,
    selects: HashMap<&'static str, usize>,
    confirms: HashMap<&'static str, bool>,
    cancel_at: Option<&'static str>,
    notes: Vec<String>,
}

impl KeyedPrompter {
    fn with_text(mut self, message: &'static str, answers: &[&'static str]) -> Self {
        self.texts.insert(message, answers.iter().copied().collect());
        self
    }

    fn with_select(mut self, message: &'static str, index: usize) -> Self {
        self.selects.insert(message, index);
        self
    }

    fn with_confirm(mut self, message: &'static str, answer: bool) -> Self {
        self.confirms.insert(message, answer);
        self
    }

    fn check_cancel(&self, message: &str) -> Result<(), PromptError> {
        if self.cancel_at == Some(message) {
            return Err(PromptError::Cancelled);
        }
        Ok(())
    }
}

impl Prompter for KeyedPrompter {
    fn text(&mut self, message: &str, default: &str) -> Result<String, PromptError> {
        self.check_cancel(message)?;
        let scripted = self.texts.get_mut(message).and_then(VecDeque::pop_front);
        Ok(scripted.unwrap_or(default).to_string())
    }

    fn select(&mut self, message: &str, _options: &[String], default: usize) -> Result<usize, PromptError> {
        self.check_cancel(message)?;
        Ok(self.selects.get(message).copied().unwrap_or(default))
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError> {
        self.check_cancel(message)?;
        Ok(self.confirms.get(message).copied().unwrap_or(default))
    }

    fn notify(&mut self, message: &str) {
        self.notes.push(message.to_string());
    }
}

#[derive(Default)]
struct FakePackages {
    fail: bool,
    installed: RefCell<Vec<Vec<String>>>,
}

impl PackageInstaller for FakePackages {
    fn install(&self, packages: &[String]) -> Result<(), CommandError> {
        self.installed.borrow_mut().push(packages.to_vec());
        if self.fail {
            return Err(CommandError::Failed {
                program: "apt-get",
                code: 100,
                stderr: "E: Unable to locate package labwc".into(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeSystem {
    timezones: RefCell<Vec<String>>,
}

impl SystemSettings for FakeSystem {
    fn set_timezone(&self, timezone: &str) -> Result<(), CommandError> {
        self.timezones.borrow_mut().push(timezone.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct FakeSession {
    written: RefCell<Vec<KioskSettings>>,
    removed: RefCell<usize>,
}

impl SessionWriter for FakeSession {
    fn write(&self, settings: &KioskSettings) -> io::Result<()> {
        self.written.borrow_mut().push(settings.clone());
        Ok(())
    }

    fn remove(&self) -> io::Result<()> {
        *self.removed.borrow_mut() += 1;
        Ok(())
    }
}

#[derive(Default)]
struct FakeManager {
    enabled: RefCell<BTreeSet<String>>,
}

impl SystemManager for FakeManager {
    fn is_enabled(&self, unit: &str) -> Result<bool, CommandError> {
        Ok(self.enabled.borrow().contains(unit))
    }
    fn reload(&self) -> Result<(), CommandError> {
        Ok(())
    }
    fn enable_now(&self, unit: &str) -> Result<(), CommandError> {
        self.enabled.borrow_mut().insert(unit.to_string());
        Ok(())
    }
    fn disable_now(&self, unit: &str) -> Result<(), CommandError> {
        self.enabled.borrow_mut().remove(unit);
        Ok(())
    }
}

#[derive(Default)]
struct StageLog {
    stages: RefCell<Vec<InstallStage>>,
    finished: RefCell<Option<InstallStage>>,
}

impl ProgressSink for StageLog {
    fn stage(&self, stage: InstallStage) {
        self.stages.borrow_mut().push(stage);
    }
    fn finish(&self, stage: InstallStage) {
        *self.finished.borrow_mut() = Some(stage);
    }
}

/// A temporary target system plus every fake collaborator.
struct Harness {
    root: TempDir,
    paths: Paths,
    identity: SessionIdentity,
    hardware: HardwareInfo,
    packages: FakePackages,
    manager: FakeManager,
    system: FakeSystem,
    session: FakeSession,
    progress: StageLog,
}

impl Harness {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("boot/firmware")).unwrap();
        fs::write(root.path().join("boot/firmware/cmdline.txt"), format!("{}\n", BASE_CMDLINE)).unwrap();

        let mut paths = Paths::under(root.path());
        paths.drm_dir = root.path().join("sys/class/drm");
        paths.backlight_dir = root.path().join("sys/class/backlight");
        paths.input_devices = root.path().join("proc/bus/input/devices");

        Self {
            identity: SessionIdentity {
                name: "kiosk".into(),
                uid: 1000,
                gid: 1000,
                home: root.path().join("home/kiosk"),
            },
            hardware: HardwareInfo::detect(&paths),
            root,
            paths,
            packages: FakePackages::default(),
            manager: FakeManager::default(),
            system: FakeSystem::default(),
            session: FakeSession::default(),
            progress: StageLog::default(),
        }
    }

    fn orchestrator(&self) -> Orchestrator<'_> {
        Orchestrator {
            paths: &self.paths,
            identity: &self.identity,
            hardware: &self.hardware,
            packages: &self.packages,
            manager: &self.manager,
            system: &self.system,
            session: &self.session,
            progress: &self.progress,
        }
    }

    fn cmdline(&self) -> String {
        fs::read_to_string(&self.paths.boot_cmdline).unwrap()
    }

    fn unit(&self, name: &str) -> PathBuf {
        self.paths.unit_dir.join(name)
    }

    fn sudoers_file(&self) -> PathBuf {
        self.paths.sudoers_dir.join("010_kioskify-kiosk")
    }

    fn saved(&self) -> KioskSettings {
        KioskSettings::from_snapshot(&ParamStore::new(&self.paths.snapshot).load())
    }
}

fn full_answers() -> KeyedPrompter {
    KeyedPrompter::default()
        .with_text("Kiosk URL", &["https://dashboard.example.org/wall"])
        .with_text("Resolution (auto or WIDTHxHEIGHT[@REFRESH])", &["1920x1080@60"])
        .with_select("Scheduled reboot", 2)
        .with_text("Reboot time (HH:MM)", &["04:30"])
        .with_text("Timezone", &["Europe/Berlin"])
}

fn token_count(line: &str, name: &str) -> usize {
    line.split_whitespace()
        .filter(|t| t.split('=').next() == Some(name))
        .count()
}

// =============================================================================
// Install
// =============================================================================

#[test]
fn test_complete_pass_applies_everything() {
    let h = Harness::new();
    let mut prompter = full_answers();

    let outcome = h.orchestrator().install(&mut prompter).unwrap();
    assert_eq!(outcome, InstallOutcome::Completed { warnings: vec![] });

    let saved = h.saved();
    assert_eq!(saved.kiosk_url, "https://dashboard.example.org/wall");
    assert_eq!(saved.resolution_mode, ResolutionMode::Fixed("1920x1080@60".into()));
    assert_eq!(saved.reboot_schedule, RebootSchedule::Weekly);

    assert_eq!(*h.packages.installed.borrow(), vec![resolve_packages(&saved)]);

    let line = h.cmdline();
    assert!(line.starts_with(BASE_CMDLINE), "{}", line);
    assert_eq!(token_count(&line, "video"), 1);
    assert!(line.contains("video=HDMI-A-1:1920x1080@60"));
    assert_eq!(token_count(&line, "quiet"), 1);
    assert_eq!(token_count(&line, "console"), 2);

    let timer = fs::read_to_string(h.unit("kiosk-reboot.timer")).unwrap();
    assert!(timer.contains("OnCalendar=Mon *-*-* 04:30:00"));
    assert!(h.manager.enabled.borrow().contains("kiosk-reboot.timer"));

    assert_eq!(*h.system.timezones.borrow(), vec!["Europe/Berlin".to_string()]);
    // security not requested: passwordless sudo stays granted
    assert!(h.sudoers_file().exists());
    assert_eq!(h.session.written.borrow().len(), 1);

    assert_eq!(h.progress.stages.borrow().last(), Some(&InstallStage::Completed));
    assert_eq!(*h.progress.finished.borrow(), Some(InstallStage::Completed));
}

#[test]
fn test_second_pass_with_defaults_changes_nothing() {
    let h = Harness::new();
    h.orchestrator().install(&mut full_answers()).unwrap();
    let first_line = h.cmdline();
    let first_saved = h.saved();

    // every answer pre-filled from the snapshot
    let outcome = h.orchestrator().install(&mut KeyedPrompter::default()).unwrap();
    assert!(matches!(outcome, InstallOutcome::Completed { .. }));
    assert_eq!(h.cmdline(), first_line);
    assert_eq!(h.saved(), first_saved);
    assert!(h.unit("kiosk-reboot.timer").exists());
}

#[test]
fn test_switching_off_reboot_and_silent_boot() {
    let h = Harness::new();
    h.orchestrator().install(&mut full_answers()).unwrap();

    let mut prompter = KeyedPrompter::default()
        .with_text("Resolution (auto or WIDTHxHEIGHT[@REFRESH])", &["auto"])
        .with_confirm("Hide boot messages?", false)
        .with_select("Scheduled reboot", 0)
        .with_confirm("Revoke passwordless sudo for the kiosk user?", true);
    h.orchestrator().install(&mut prompter).unwrap();

    let line = h.cmdline();
    assert_eq!(line.trim_end(), BASE_CMDLINE);
    assert!(!h.unit("kiosk-reboot.timer").exists());
    assert!(!h.unit("kiosk-reboot.service").exists());
    assert!(h.manager.enabled.borrow().is_empty());
    assert!(!h.sudoers_file().exists());
}

#[test]
fn test_saved_schedule_drives_reboot_timer() {
    for (schedule, expected) in [
        ("Weekly", "OnCalendar=Mon *-*-* 03:00:00\n"),
        ("Daily", "OnCalendar=*-*-* 03:00:00\n"),
    ] {
        let h = Harness::new();
        let mut snapshot = Snapshot::new();
        snapshot.set("reboot_schedule", schedule);
        snapshot.set("reboot_time", "03:00");
        ParamStore::new(&h.paths.snapshot).save(&snapshot).unwrap();

        h.orchestrator().install(&mut KeyedPrompter::default()).unwrap();
        let timer = fs::read_to_string(h.unit("kiosk-reboot.timer")).unwrap();
        assert!(timer.contains(expected), "{}: {}", schedule, timer);
    }
}

#[test]
fn test_package_failure_is_fatal() {
    let mut h = Harness::new();
    h.packages.fail = true;

    let err = h.orchestrator().install(&mut full_answers()).unwrap_err();
    match &err {
        OrchestrationError::Packages { packages, .. } => assert!(packages.contains(&"labwc".to_string())),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(err.diagnostics(), Some("E: Unable to locate package labwc"));

    // saved, but nothing after the package step ran
    assert_eq!(h.saved().kiosk_url, "https://dashboard.example.org/wall");
    assert_eq!(h.cmdline(), format!("{}\n", BASE_CMDLINE));
    assert!(!h.unit("kiosk-reboot.timer").exists());
    assert!(h.system.timezones.borrow().is_empty());
    assert!(h.session.written.borrow().is_empty());
    assert_eq!(*h.progress.finished.borrow(), Some(InstallStage::Failed));
}

#[test]
fn test_declining_apply_only_saves() {
    let h = Harness::new();
    let mut prompter = full_answers().with_confirm("Apply these settings to the system now?", false);

    let outcome = h.orchestrator().install(&mut prompter).unwrap();
    assert_eq!(outcome, InstallOutcome::SavedOnly);
    assert!(h.paths.snapshot.exists());
    assert!(h.packages.installed.borrow().is_empty());
    assert_eq!(h.cmdline(), format!("{}\n", BASE_CMDLINE));
    assert!(h.session.written.borrow().is_empty());
}

#[test]
fn test_cancel_in_wizard_saves_nothing() {
    let h = Harness::new();
    let mut prompter = KeyedPrompter {
        cancel_at: Some("Timezone"),
        ..full_answers()
    };

    let outcome = h.orchestrator().install(&mut prompter).unwrap();
    assert_eq!(outcome, InstallOutcome::Cancelled);
    assert!(!h.paths.snapshot.exists());
    assert!(h.packages.installed.borrow().is_empty());
}

#[test]
fn test_invalid_answers_are_reprompted() {
    let h = Harness::new();
    let mut prompter = full_answers()
        .with_text("Kiosk URL", &["dashboard.example.org", "https://", "https://ok.example.org"])
        .with_text("Reboot time (HH:MM)", &["4:30", "04:30"]);

    h.orchestrator().install(&mut prompter).unwrap();
    assert_eq!(prompter.notes.len(), 3, "{:?}", prompter.notes);
    assert_eq!(h.saved().kiosk_url, "https://ok.example.org");
}

#[test]
fn test_missing_cmdline_is_a_warning() {
    let h = Harness::new();
    fs::remove_file(&h.paths.boot_cmdline).unwrap();

    let outcome = h.orchestrator().install(&mut full_answers()).unwrap();
    let InstallOutcome::Completed { warnings } = outcome else {
        panic!("expected a completed pass");
    };
    assert_eq!(warnings.len(), 1, "{:?}", warnings);
    assert!(warnings[0].starts_with("Boot parameters"));
    assert!(!h.paths.boot_cmdline.exists());
    // later steps still ran
    assert!(h.unit("kiosk-reboot.timer").exists());
    assert_eq!(h.session.written.borrow().len(), 1);
}

// =============================================================================
// Uninstall
// =============================================================================

#[test]
fn test_uninstall_reverts_pass() {
    let h = Harness::new();
    h.orchestrator().install(&mut full_answers()).unwrap();

    let warnings = h.orchestrator().uninstall();
    assert!(warnings.is_empty(), "{:?}", warnings);

    assert_eq!(h.cmdline().trim_end(), BASE_CMDLINE);
    assert!(!h.unit("kiosk-reboot.timer").exists());
    assert!(h.manager.enabled.borrow().is_empty());
    assert_eq!(*h.session.removed.borrow(), 1);

    // kept for the next install
    assert!(h.paths.snapshot.exists());
    assert!(h.sudoers_file().exists());
}

#[test]
fn test_uninstall_on_clean_system() {
    let h = Harness::new();
    let warnings = h.orchestrator().uninstall();
    assert!(warnings.is_empty());
    assert_eq!(h.cmdline(), format!("{}\n", BASE_CMDLINE));
    assert!(!h.root.path().join("etc/systemd/system").exists());
}
