//! systemd unit rendering and file lifecycle.
//!
//! Unit text is produced only by [`render`], a pure function over a closed
//! set of unit kinds. Installing writes the text atomically into the unit
//! directory; reloading the service manager is the caller's job.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use strum::{Display, EnumString};
use tracing::{debug, info};

use crate::file_ops::write_file_atomic;
use crate::validate::TimeOfDay;

/// Unit file permission.
pub const UNIT_MODE: u32 = 0o644;

/// Day-of-week in systemd calendar notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

/// Calendar trigger for a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarSpec {
    /// Fixed wall-clock time, every day
    Daily(TimeOfDay),
    /// Fixed wall-clock time on one weekday
    Weekly(Weekday, TimeOfDay),
}

impl CalendarSpec {
    /// `OnCalendar=` expression.
    pub fn expression(&self) -> String {
        match self {
            Self::Daily(t) => format!("*-*-* {}:00", t),
            Self::Weekly(day, t) => format!("{} *-*-* {}:00", day, t),
        }
    }
}

/// What fires a timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerTrigger {
    Calendar(CalendarSpec),
    /// Monotonic: first run after `boot_delay`, then every `every`.
    /// Both are systemd time spans such as `2min`.
    Interval {
        boot_delay: &'static str,
        every: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceParams {
    pub exec_start: String,
    pub user: Option<String>,
    pub environment: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerParams {
    pub trigger: TimerTrigger,
    /// Unit activated by the timer; systemd defaults to the same-named service.
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitKind {
    OneshotService(ServiceParams),
    Timer(TimerParams),
}

/// One unit artifact: file name, description and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpec {
    pub name: String,
    pub description: String,
    pub kind: UnitKind,
}

impl UnitSpec {
    pub fn service(name: impl Into<String>, description: impl Into<String>, params: ServiceParams) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: UnitKind::OneshotService(params),
        }
    }

    pub fn timer(name: impl Into<String>, description: impl Into<String>, params: TimerParams) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: UnitKind::Timer(params),
        }
    }
}

/// Render the unit file text.
pub fn render(spec: &UnitSpec) -> String {
    let mut out = String::with_capacity(256);
    // writeln! into a String cannot fail
    let _ = writeln!(out, "[Unit]");
    let _ = writeln!(out, "Description={}", spec.description);
    out.push('\n');

    match &spec.kind {
        UnitKind::OneshotService(svc) => {
            let _ = writeln!(out, "[Service]");
            let _ = writeln!(out, "Type=oneshot");
            if let Some(user) = &svc.user {
                let _ = writeln!(out, "User={}", user);
            }
            for (key, value) in &svc.environment {
                let _ = writeln!(out, "Environment={}={}", key, value);
            }
            let _ = writeln!(out, "ExecStart={}", svc.exec_start);
        }
        UnitKind::Timer(timer) => {
            let _ = writeln!(out, "[Timer]");
            match &timer.trigger {
                TimerTrigger::Calendar(cal) => {
                    let _ = writeln!(out, "OnCalendar={}", cal.expression());
                }
                TimerTrigger::Interval { boot_delay, every } => {
                    let _ = writeln!(out, "OnBootSec={}", boot_delay);
                    let _ = writeln!(out, "OnUnitActiveSec={}", every);
                }
            }
            if let Some(unit) = &timer.unit {
                let _ = writeln!(out, "Unit={}", unit);
            }
            out.push('\n');
            let _ = writeln!(out, "[Install]");
            let _ = writeln!(out, "WantedBy=timers.target");
        }
    }
    out
}

/// Write `text` to `path` atomically with mode 0644.
pub fn install(path: &Path, text: &str) -> io::Result<()> {
    write_file_atomic(path, text, UNIT_MODE)?;
    info!("Installed {}", path.display());
    Ok(())
}

/// Delete every path. Already-missing files are fine; the first other
/// error is returned after attempting all paths.
pub fn remove(paths: &[PathBuf]) -> io::Result<()> {
    let mut first_err = None;
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => info!("Removed {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} already absent", path.display());
            }
            Err(e) => {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
    }
    first_err.map_or(Ok(()), Err)
}
