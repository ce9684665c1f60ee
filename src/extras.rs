//! Extras menu: optional features and display brightness.

use tracing::warn;

use crate::backlight::{brightness_percent, set_brightness};
use crate::features::{Feature, FeatureParams, FeatureState, FeatureToggle, RebootFrequency};
use crate::hardware::{Backlight, HardwareInfo};
use crate::prompt::{ask_valid, select_value, PromptError, Prompter};
use crate::settings::KioskSettings;
use crate::validate::{validate_percentage, validate_time, validate_token};

use strum::IntoEnumIterator;

const BRIGHTNESS: &str = "Set display brightness";
const BACK: &str = "Back";

/// Ask for whatever `feature` needs to be enabled.
pub fn collect_params(
    prompter: &mut dyn Prompter,
    feature: Feature,
    settings: &KioskSettings,
) -> Result<FeatureParams, PromptError> {
    Ok(match feature {
        Feature::Watchdog => FeatureParams::Watchdog,
        Feature::PrivilegeToggle => FeatureParams::PrivilegeToggle,
        Feature::SleepSchedule => {
            let off = ask_valid(prompter, "Display off at (HH:MM)", "22:00", validate_time)?;
            let on = ask_valid(prompter, "Display on at (HH:MM)", "07:00", validate_time)?;
            let output = ask_valid(prompter, "Display output", &settings.output_name, |s| {
                validate_token("Output", s)
            })?;
            FeatureParams::SleepSchedule {
                off_time: off.to_string(),
                on_time: on.to_string(),
                output,
            }
        }
        Feature::RebootSchedule => {
            let frequency = select_value(
                prompter,
                "Reboot frequency",
                &[RebootFrequency::Daily, RebootFrequency::Weekly],
                &RebootFrequency::Daily,
            )?;
            let time = ask_valid(
                prompter,
                "Reboot time (HH:MM)",
                &settings.reboot_time.to_string(),
                validate_time,
            )?;
            FeatureParams::RebootSchedule {
                frequency,
                time: time.to_string(),
            }
        }
    })
}

/// Flip `feature` to the opposite of its observed state.
pub fn toggle_feature(
    prompter: &mut dyn Prompter,
    toggle: &FeatureToggle<'_>,
    feature: Feature,
    settings: &KioskSettings,
) -> Result<(), PromptError> {
    match toggle.status(feature) {
        FeatureState::Enabled => {
            if prompter.confirm(&format!("Disable {}?", feature.description()), true)? {
                // best effort, failures are logged
                let _ = toggle.disable(feature);
                prompter.notify(&format!("{} disabled", feature.description()));
            }
        }
        FeatureState::Disabled => {
            let params = collect_params(prompter, feature, settings)?;
            match toggle.enable(&params) {
                Ok(()) => prompter.notify(&format!("{} enabled", feature.description())),
                Err(e) => {
                    warn!("Enabling {} failed: {}", feature, e);
                    prompter.notify(&format!("Could not enable {}: {}", feature.description(), e));
                }
            }
        }
    }
    Ok(())
}

fn adjust_brightness(
    prompter: &mut dyn Prompter,
    lights: &[Backlight],
) -> Result<(), PromptError> {
    let device = match lights {
        [] => {
            prompter.notify("No backlight device found");
            return Ok(());
        }
        [only] => only,
        _ => {
            let names: Vec<String> = lights.iter().map(|l| l.name.clone()).collect();
            let index = prompter.select("Backlight", &names, 0)?;
            &lights[index.min(lights.len() - 1)]
        }
    };

    let current = brightness_percent(device)
        .map(|p| p.to_string())
        .unwrap_or_else(|_| "100".to_string());
    let percent = ask_valid(prompter, "Brightness (0-100%)", &current, validate_percentage)?;
    match set_brightness(device, percent) {
        Ok(_) => prompter.notify(&format!("Brightness set to {}%", percent)),
        Err(e) => prompter.notify(&format!("Could not set brightness: {:#}", e)),
    }
    Ok(())
}

/// Menu loop until Back or cancel.
pub fn run_extras(
    prompter: &mut dyn Prompter,
    toggle: &FeatureToggle<'_>,
    hardware: &HardwareInfo,
    settings: &KioskSettings,
) -> Result<(), PromptError> {
    let features: Vec<Feature> = Feature::iter().collect();

    loop {
        let mut labels: Vec<String> = features
            .iter()
            .map(|f| format!("{} [{}]", f.description(), toggle.status(*f)))
            .collect();
        labels.push(BRIGHTNESS.to_string());
        labels.push(BACK.to_string());

        let choice = match prompter.select("Extras", &labels, 0) {
            Ok(choice) => choice,
            Err(PromptError::Cancelled) => return Ok(()),
            Err(e) => return Err(e),
        };

        let result = if let Some(feature) = features.get(choice) {
            toggle_feature(prompter, toggle, *feature, settings)
        } else if choice == features.len() {
            adjust_brightness(prompter, &hardware.backlights)
        } else {
            return Ok(());
        };

        match result {
            Ok(()) | Err(PromptError::Cancelled) => continue,
            Err(e) => return Err(e),
        }
    }
}
