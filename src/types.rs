//! Type-safe option values for kiosk settings.
//!
//! Stored in the snapshot via their `Display` form and parsed back with
//! `FromStr`, so a typo in a saved file degrades to the default instead of
//! propagating as a free-form string.

use strum::{Display, EnumIter, EnumString};

/// Generic Yes/No toggle for boolean-like options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Toggle {
    #[strum(serialize = "Yes")]
    Yes,
    #[default]
    #[strum(serialize = "No")]
    No,
}

impl Toggle {
    pub fn as_bool(self) -> bool {
        matches!(self, Self::Yes)
    }
}

impl From<bool> for Toggle {
    fn from(value: bool) -> Self {
        if value {
            Self::Yes
        } else {
            Self::No
        }
    }
}

/// Output rotation, named as `wlr-randr --transform` expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(Display, EnumString, EnumIter)]
pub enum Rotation {
    #[default]
    #[strum(serialize = "normal")]
    Normal,
    #[strum(serialize = "90")]
    Rotate90,
    #[strum(serialize = "180")]
    Rotate180,
    #[strum(serialize = "270")]
    Rotate270,
}

/// How often the kiosk reboots itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum RebootSchedule {
    #[default]
    #[strum(serialize = "None")]
    None,
    #[strum(serialize = "Daily")]
    Daily,
    #[strum(serialize = "Weekly")]
    Weekly,
}

/// Display mode requested for the kiosk output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResolutionMode {
    /// Use whatever the display advertises as preferred
    #[default]
    Auto,
    /// Explicit mode string as listed by DRM, e.g. `1920x1080@60`
    Fixed(String),
}

impl std::fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Fixed(mode) => write!(f, "{}", mode),
        }
    }
}

impl std::str::FromStr for ResolutionMode {
    type Err = crate::validate::ValidationError;

    /// `auto` or `WIDTHxHEIGHT` with an optional `@REFRESH`. DRM lists
    /// interlaced modes with an `i` after the height (`1920x1080i`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") || s.is_empty() {
            return Ok(Self::Auto);
        }
        let invalid = || crate::validate::ValidationError::Invalid {
            field: "Resolution",
            reason: format!("'{}' is not WIDTHxHEIGHT[i][@REFRESH]", s),
        };
        let (size, refresh) = match s.split_once('@') {
            Some((size, refresh)) => (size, Some(refresh)),
            None => (s, None),
        };
        let (w, h) = size.split_once('x').ok_or_else(invalid)?;
        let h = h.strip_suffix('i').unwrap_or(h);
        let numeric = |v: &str| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit());
        if !numeric(w) || !numeric(h) || refresh.is_some_and(|r| !numeric(r)) {
            return Err(invalid());
        }
        Ok(Self::Fixed(s.to_string()))
    }
}
