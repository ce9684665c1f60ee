//! Input validation for values collected by the prompt layer.
//!
//! Every validator returns the parsed value or a `ValidationError`. Callers
//! re-prompt on error; a `ValidationError` never reaches the system mutation
//! code.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// User input failed its format contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Time of day is not a 24-hour `HH:MM` value
    #[error("'{0}' is not a valid 24-hour time (expected HH:MM)")]
    InvalidTime(String),

    /// URL has no `http://` or `https://` scheme
    #[error("'{0}' must start with http:// or https://")]
    MissingScheme(String),

    /// Percentage outside 0-100
    #[error("'{0}' is not a percentage between 0 and 100")]
    PercentageOutOfRange(String),

    /// Required value is empty or contains whitespace
    #[error("{field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Wall-clock time of day, minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Build a time from components, `None` if out of range.
    pub const fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    pub const fn hour(self) -> u8 {
        self.hour
    }

    pub const fn minute(self) -> u8 {
        self.minute
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    /// Strict `HH:MM`: exactly two digits on each side of the colon.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidTime(s.to_string());

        let (h, m) = s.split_once(':').ok_or_else(invalid)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(invalid());
        }
        if !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }
}

/// Parse a 24-hour `HH:MM` time.
pub fn validate_time(input: &str) -> Result<TimeOfDay, ValidationError> {
    input.trim().parse()
}

/// Kiosk URL must carry an explicit http(s) scheme and a host.
pub fn validate_url(input: &str) -> Result<String, ValidationError> {
    let url = input.trim();
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or_else(|| ValidationError::MissingScheme(url.to_string()))?;

    if rest.is_empty() || rest.starts_with('/') {
        return Err(ValidationError::Invalid {
            field: "URL",
            reason: "must include a host name".to_string(),
        });
    }
    if url.contains(char::is_whitespace) {
        return Err(ValidationError::Invalid {
            field: "URL",
            reason: "cannot contain whitespace".to_string(),
        });
    }
    Ok(url.to_string())
}

/// Integer percentage in 0..=100.
pub fn validate_percentage(input: &str) -> Result<u8, ValidationError> {
    let trimmed = input.trim().trim_end_matches('%');
    match trimmed.parse::<u8>() {
        Ok(pct) if pct <= 100 => Ok(pct),
        _ => Err(ValidationError::PercentageOutOfRange(input.to_string())),
    }
}

/// Single whitespace-free token such as a timezone or connector name.
pub fn validate_token(field: &'static str, input: &str) -> Result<String, ValidationError> {
    let value = input.trim();
    if value.is_empty() {
        return Err(ValidationError::Invalid {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    if value.contains(char::is_whitespace) {
        return Err(ValidationError::Invalid {
            field,
            reason: "cannot contain whitespace".to_string(),
        });
    }
    Ok(value.to_string())
}

/// POSIX-portable login name: starts with a lowercase letter or underscore,
/// then lowercase letters, digits, `_` or `-`, at most 32 characters.
pub fn validate_user_name(input: &str) -> Result<String, ValidationError> {
    let invalid = |reason: &str| ValidationError::Invalid {
        field: "User name",
        reason: reason.to_string(),
    };

    if input.is_empty() || input.len() > 32 {
        return Err(invalid("must be 1-32 characters long"));
    }
    let mut chars = input.chars();
    let first_ok = chars
        .next()
        .is_some_and(|first| first.is_ascii_lowercase() || first == '_');
    if !first_ok {
        return Err(invalid("must start with a lowercase letter or underscore"));
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-') {
        return Err(invalid("may only contain a-z, 0-9, '_' and '-'"));
    }
    Ok(input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_accepts_valid() {
        let t = validate_time("07:30").unwrap();
        assert_eq!((t.hour(), t.minute()), (7, 30));
        assert_eq!(t.to_string(), "07:30");
        assert!(validate_time("00:00").is_ok());
        assert!(validate_time("23:59").is_ok());
    }

    #[test]
    fn test_time_rejects_invalid() {
        for bad in ["25:00", "24:00", "12:60", "7:30", "07:3", "0730", "", "ab:cd", "+1:00"] {
            assert!(
                matches!(validate_time(bad), Err(ValidationError::InvalidTime(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_url_requires_scheme() {
        assert_eq!(
            validate_url("homeassistant.local:8123"),
            Err(ValidationError::MissingScheme("homeassistant.local:8123".into()))
        );
        assert_eq!(
            validate_url("http://homeassistant.local:8123").unwrap(),
            "http://homeassistant.local:8123"
        );
        assert!(validate_url("https://example.com/dash?x=1").is_ok());
        assert!(validate_url("http://").is_err());
        assert!(validate_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_percentage_bounds() {
        assert_eq!(validate_percentage("0").unwrap(), 0);
        assert_eq!(validate_percentage("100").unwrap(), 100);
        assert_eq!(validate_percentage("75%").unwrap(), 75);
        assert!(validate_percentage("101").is_err());
        assert!(validate_percentage("-1").is_err());
        assert!(validate_percentage("half").is_err());
    }

    #[test]
    fn test_token_and_user_name() {
        assert_eq!(validate_token("Timezone", " Europe/Berlin ").unwrap(), "Europe/Berlin");
        assert!(validate_token("Timezone", "   ").is_err());
        assert!(validate_token("Output", "HDMI A").is_err());

        assert!(validate_user_name("pi").is_ok());
        assert!(validate_user_name("kiosk_user-2").is_ok());
        assert!(validate_user_name("Root").is_err());
        assert!(validate_user_name("bad name").is_err());
        assert!(validate_user_name("").is_err());
    }
}
