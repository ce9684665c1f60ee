//! Kiosk login session files.
//!
//! greetd logs the kiosk user straight into labwc; labwc's autostart sets
//! up the output and launches the browser. A touch device, when configured,
//! is mapped onto the kiosk output through `rc.xml`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use nix::unistd::{chown, Gid, Uid};
use tracing::{debug, info};

use crate::config::SessionIdentity;
use crate::file_ops::write_file_atomic;
use crate::settings::KioskSettings;
use crate::types::{ResolutionMode, Rotation};

const MARKER: &str = "Managed by kioskify";
const SESSION_FILE_MODE: u32 = 0o644;

/// Writes and removes the files that make up the kiosk session.
pub trait SessionWriter {
    fn write(&self, settings: &KioskSettings) -> io::Result<()>;

    /// Delete every session file. Missing files are fine.
    fn remove(&self) -> io::Result<()>;
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// labwc autostart: output setup followed by the browser.
pub fn render_autostart(settings: &KioskSettings) -> String {
    let mut out = format!("# {}\n", MARKER);

    let mut randr = Vec::new();
    if settings.rotation != Rotation::Normal {
        randr.push(format!("--transform {}", settings.rotation));
    }
    if let ResolutionMode::Fixed(mode) = &settings.resolution_mode {
        randr.push(format!("--mode {}", mode));
    }
    if !randr.is_empty() {
        out.push_str(&format!(
            "wlr-randr --output {} {} &\n",
            settings.output_name,
            randr.join(" ")
        ));
    }

    out.push_str(&format!(
        "chromium-browser --kiosk --noerrdialogs --disable-infobars --no-first-run \
         --ozone-platform=wayland --start-maximized {} &\n",
        shell_quote(&settings.kiosk_url)
    ));
    out
}

/// greetd configuration that starts labwc as `user` without a greeter.
pub fn render_greetd(user: &str) -> String {
    format!(
        "# {}\n[terminal]\nvt = 7\n\n[default_session]\ncommand = \"/usr/bin/labwc\"\nuser = \"{}\"\n",
        MARKER, user
    )
}

/// labwc `rc.xml` mapping `device` onto `output`.
pub fn render_touch_rc(device: &str, output: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<!-- {} -->\n<labwc_config>\n  <touch deviceName=\"{}\" mapToOutput=\"{}\" mouseEmulation=\"yes\"/>\n</labwc_config>\n",
        MARKER,
        xml_escape(device),
        xml_escape(output)
    )
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Only files carrying the marker are ours to delete.
fn is_managed(path: &Path) -> bool {
    fs::read_to_string(path).is_ok_and(|c| c.contains(MARKER))
}

/// greetd + labwc session for one user.
#[derive(Debug, Clone)]
pub struct LabwcSession {
    greetd_config: PathBuf,
    identity: SessionIdentity,
}

impl LabwcSession {
    pub fn new(greetd_config: impl Into<PathBuf>, identity: SessionIdentity) -> Self {
        Self {
            greetd_config: greetd_config.into(),
            identity,
        }
    }

    pub fn autostart_path(&self) -> PathBuf {
        self.identity.labwc_dir().join("autostart")
    }

    pub fn rc_path(&self) -> PathBuf {
        self.identity.labwc_dir().join("rc.xml")
    }

    /// Write a file under the user's home and hand it to the user.
    fn write_user_file(&self, path: &Path, content: &str) -> io::Result<()> {
        write_file_atomic(path, content, SESSION_FILE_MODE)?;
        let uid = Some(Uid::from_raw(self.identity.uid));
        let gid = Some(Gid::from_raw(self.identity.gid));
        chown(path, uid, gid)?;
        if let Some(dir) = path.parent() {
            chown(dir, uid, gid)?;
        }
        info!("Wrote {}", path.display());
        Ok(())
    }
}

impl SessionWriter for LabwcSession {
    fn write(&self, settings: &KioskSettings) -> io::Result<()> {
        write_file_atomic(
            &self.greetd_config,
            &render_greetd(&self.identity.name),
            SESSION_FILE_MODE,
        )?;
        info!("Wrote {}", self.greetd_config.display());

        self.write_user_file(&self.autostart_path(), &render_autostart(settings))?;

        let rc = self.rc_path();
        match &settings.touch_device {
            Some(device) => {
                self.write_user_file(&rc, &render_touch_rc(device, &settings.output_name))?
            }
            None if is_managed(&rc) => remove_if_present(&rc)?,
            None => debug!("No touch device configured"),
        }
        Ok(())
    }

    fn remove(&self) -> io::Result<()> {
        for path in [self.greetd_config.clone(), self.autostart_path(), self.rc_path()] {
            if is_managed(&path) {
                remove_if_present(&path)?;
            } else if path.exists() {
                info!("Keeping {} (not written by kioskify)", path.display());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::{getgid, getuid};
    use tempfile::TempDir;

    fn session(dir: &Path) -> LabwcSession {
        let identity = SessionIdentity {
            name: "pi".into(),
            uid: getuid().as_raw(),
            gid: getgid().as_raw(),
            home: dir.join("home/pi"),
        };
        LabwcSession::new(dir.join("etc/greetd/config.toml"), identity)
    }

    #[test]
    fn test_autostart_default_has_no_randr() {
        let text = render_autostart(&KioskSettings::default());
        assert!(!text.contains("wlr-randr"));
        assert!(text.contains("--kiosk"));
        assert!(text.contains("'https://example.com' &\n"));
    }

    #[test]
    fn test_autostart_rotation_and_mode() {
        let settings = KioskSettings {
            rotation: Rotation::Rotate90,
            resolution_mode: ResolutionMode::Fixed("1280x720@60".into()),
            kiosk_url: "http://x/?a='b'".into(),
            ..Default::default()
        };
        let text = render_autostart(&settings);
        assert!(text.contains("wlr-randr --output HDMI-A-1 --transform 90 --mode 1280x720@60 &\n"));
        assert!(text.contains(r"'http://x/?a='\''b'\'''"));
    }

    #[test]
    fn test_greetd_and_touch_rendering() {
        assert!(render_greetd("pi").contains("user = \"pi\"\n"));
        let rc = render_touch_rc("Goodix <TS>", "DSI-1");
        assert!(rc.contains("deviceName=\"Goodix &lt;TS&gt;\""));
        assert!(rc.contains("mapToOutput=\"DSI-1\""));
    }

    #[test]
    fn test_write_then_remove() {
        let dir = TempDir::new().unwrap();
        let session = session(dir.path());
        let settings = KioskSettings {
            touch_device: Some("ILITEK".into()),
            ..Default::default()
        };

        session.write(&settings).unwrap();
        assert!(dir.path().join("etc/greetd/config.toml").exists());
        assert!(session.autostart_path().exists());
        assert!(session.rc_path().exists());

        // dropping the touch device removes our rc.xml
        session.write(&KioskSettings::default()).unwrap();
        assert!(!session.rc_path().exists());

        session.remove().unwrap();
        assert!(!session.autostart_path().exists());
        assert!(!dir.path().join("etc/greetd/config.toml").exists());
        session.remove().unwrap();
    }

    #[test]
    fn test_foreign_rc_is_kept() {
        let dir = TempDir::new().unwrap();
        let session = session(dir.path());
        fs::create_dir_all(session.identity.labwc_dir()).unwrap();
        fs::write(session.rc_path(), "<labwc_config/>").unwrap();

        session.write(&KioskSettings::default()).unwrap();
        session.remove().unwrap();
        assert!(session.rc_path().exists());
    }

    #[test]
    fn test_foreign_greetd_config_is_kept() {
        let dir = TempDir::new().unwrap();
        let session = session(dir.path());
        let greetd = dir.path().join("etc/greetd/config.toml");
        let stock = "[terminal]\nvt = 1\n\n[default_session]\ncommand = \"agreety --cmd /bin/sh\"\n";
        fs::create_dir_all(greetd.parent().unwrap()).unwrap();
        fs::write(&greetd, stock).unwrap();
        fs::create_dir_all(session.identity.labwc_dir()).unwrap();
        fs::write(session.autostart_path(), "swaybg -c '#000000' &\n").unwrap();

        session.remove().unwrap();
        assert_eq!(fs::read_to_string(&greetd).unwrap(), stock);
        assert!(session.autostart_path().exists());
    }
}
