//! Display brightness through the sysfs backlight interface.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::hardware::Backlight;

fn read_value(path: &Path) -> Result<u32> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    raw.trim()
        .parse()
        .with_context(|| format!("{} does not hold a number: {:?}", path.display(), raw.trim()))
}

/// Raw brightness value for `percent` of `max`, rounded to nearest.
pub fn scaled_brightness(max: u32, percent: u8) -> u32 {
    let percent = u64::from(percent.min(100));
    ((u64::from(max) * percent + 50) / 100) as u32
}

/// Current brightness as a percentage of the device maximum.
pub fn brightness_percent(device: &Backlight) -> Result<u8> {
    let max = read_value(&device.path.join("max_brightness"))?;
    if max == 0 {
        bail!("{} reports max_brightness 0", device.name);
    }
    let current = read_value(&device.path.join("brightness"))?.min(max);
    Ok(((u64::from(current) * 100 + u64::from(max) / 2) / u64::from(max)) as u8)
}

/// Set `device` to `percent` (0-100) of its maximum. Returns the raw value written.
pub fn set_brightness(device: &Backlight, percent: u8) -> Result<u32> {
    if percent > 100 {
        bail!("brightness {}% is outside 0-100", percent);
    }
    let max = read_value(&device.path.join("max_brightness"))?;
    let value = scaled_brightness(max, percent);

    let target = device.path.join("brightness");
    fs::write(&target, value.to_string())
        .with_context(|| format!("Failed to write {}", target.display()))?;

    info!("Set {} brightness to {}% ({}/{})", device.name, percent, value, max);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake(dir: &Path, max: &str) -> Backlight {
        let path = dir.join("10-0045");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("max_brightness"), max).unwrap();
        fs::write(path.join("brightness"), "0\n").unwrap();
        Backlight {
            name: "10-0045".into(),
            path,
        }
    }

    #[test]
    fn test_scaled_brightness() {
        assert_eq!(scaled_brightness(255, 0), 0);
        assert_eq!(scaled_brightness(255, 100), 255);
        assert_eq!(scaled_brightness(255, 50), 128);
        assert_eq!(scaled_brightness(31, 10), 3);
    }

    #[test]
    fn test_set_and_read_back() {
        let dir = TempDir::new().unwrap();
        let light = fake(dir.path(), "255\n");
        assert_eq!(set_brightness(&light, 40).unwrap(), 102);
        assert_eq!(fs::read_to_string(light.path.join("brightness")).unwrap(), "102");
        assert_eq!(brightness_percent(&light).unwrap(), 40);
    }

    #[test]
    fn test_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        let light = fake(dir.path(), "garbage");
        assert!(set_brightness(&light, 50).is_err());
        assert!(set_brightness(&light, 101).is_err());
    }
}
