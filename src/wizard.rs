//! Settings questionnaire.
//!
//! Every answer is pre-filled from the previous run and validated before it
//! is accepted. Where hardware discovery found something (connectors, modes,
//! input devices) the operator picks from a list instead of typing.

use strum::IntoEnumIterator;

use crate::hardware::HardwareInfo;
use crate::prompt::{ask_valid, select_value, PromptError, Prompter};
use crate::settings::KioskSettings;
use crate::types::{RebootSchedule, ResolutionMode, Rotation};
use crate::validate::{validate_time, validate_token, validate_url};

const NO_TOUCH: &str = "none";

fn collect_output(
    prompter: &mut dyn Prompter,
    previous: &KioskSettings,
    hardware: &HardwareInfo,
) -> Result<String, PromptError> {
    if hardware.connectors.is_empty() {
        return ask_valid(prompter, "Display output", &previous.output_name, |s| {
            validate_token("Output", s)
        });
    }

    let names: Vec<String> = hardware.connectors.iter().map(|c| c.name.clone()).collect();
    let current = if names.contains(&previous.output_name) {
        previous.output_name.clone()
    } else {
        hardware
            .connected_output()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| names[0].clone())
    };
    select_value(prompter, "Display output", &names, &current)
}

fn collect_resolution(
    prompter: &mut dyn Prompter,
    previous: &KioskSettings,
    hardware: &HardwareInfo,
    output: &str,
) -> Result<ResolutionMode, PromptError> {
    let modes = hardware
        .connector(output)
        .map(|c| c.modes.as_slice())
        .unwrap_or_default();

    if modes.is_empty() {
        return ask_valid(
            prompter,
            "Resolution (auto or WIDTHxHEIGHT[@REFRESH])",
            &previous.resolution_mode.to_string(),
            |s| s.parse(),
        );
    }

    let mut choices = vec![ResolutionMode::Auto];
    choices.extend(modes.iter().map(|m| ResolutionMode::Fixed(m.clone())));
    select_value(prompter, "Resolution", &choices, &previous.resolution_mode)
}

fn collect_touch(
    prompter: &mut dyn Prompter,
    previous: &KioskSettings,
    hardware: &HardwareInfo,
) -> Result<Option<String>, PromptError> {
    let current = previous
        .touch_device
        .clone()
        .unwrap_or_else(|| NO_TOUCH.to_string());

    let answer = if hardware.input_devices.is_empty() {
        prompter
            .text("Touch device name (none to skip)", &current)?
            .trim()
            .to_string()
    } else {
        let mut choices = vec![NO_TOUCH.to_string()];
        choices.extend(hardware.input_devices.iter().cloned());
        select_value(prompter, "Touch device", &choices, &current)?
    };

    if answer.is_empty() || answer.eq_ignore_ascii_case(NO_TOUCH) {
        Ok(None)
    } else {
        Ok(Some(answer))
    }
}

/// Ask for every kiosk setting.
pub fn collect_settings(
    prompter: &mut dyn Prompter,
    previous: &KioskSettings,
    hardware: &HardwareInfo,
) -> Result<KioskSettings, PromptError> {
    let kiosk_url = ask_valid(prompter, "Kiosk URL", &previous.kiosk_url, validate_url)?;
    let output_name = collect_output(prompter, previous, hardware)?;
    let resolution_mode = collect_resolution(prompter, previous, hardware, &output_name)?;

    let rotations: Vec<Rotation> = Rotation::iter().collect();
    let rotation = select_value(prompter, "Rotation", &rotations, &previous.rotation)?;

    let touch_device = collect_touch(prompter, previous, hardware)?;

    let force_hdmi = prompter.confirm(
        "Force the output on even when no display is detected?",
        previous.force_hdmi,
    )?;
    let silent_boot = prompter.confirm("Hide boot messages?", previous.silent_boot)?;

    let schedules: Vec<RebootSchedule> = RebootSchedule::iter().collect();
    let reboot_schedule =
        select_value(prompter, "Scheduled reboot", &schedules, &previous.reboot_schedule)?;
    let reboot_time = if reboot_schedule == RebootSchedule::None {
        previous.reboot_time
    } else {
        ask_valid(
            prompter,
            "Reboot time (HH:MM)",
            &previous.reboot_time.to_string(),
            validate_time,
        )?
    };

    let timezone = ask_valid(prompter, "Timezone", &previous.timezone, |s| {
        validate_token("Timezone", s)
    })?;

    let enable_security = prompter.confirm(
        "Revoke passwordless sudo for the kiosk user?",
        previous.enable_security,
    )?;

    Ok(KioskSettings {
        kiosk_url,
        output_name,
        resolution_mode,
        rotation,
        touch_device,
        force_hdmi,
        silent_boot,
        reboot_schedule,
        reboot_time,
        timezone,
        enable_security,
    })
}
