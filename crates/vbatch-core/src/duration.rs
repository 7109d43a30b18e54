//! Human-readable wait bounds of the form `[Nd][Nh][Nm][Ns]`.

use crate::errors::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;

static BOUND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$")
        .unwrap_or_else(|e| panic!("invalid bound regex: {}", e))
});

/// Parses a bound into seconds. Whitespace anywhere in the input is ignored,
/// an empty string is zero, and a missing bound is the largest representable
/// wait.
pub fn parse_bound(bound: Option<&str>) -> Result<u64, ConfigError> {
    let Some(raw) = bound else {
        return Ok(u64::MAX);
    };

    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let caps = BOUND_RE
        .captures(&compact)
        .ok_or_else(|| ConfigError::InvalidDuration(raw.to_string()))?;

    let component = |idx: usize| -> Result<u64, ConfigError> {
        match caps.get(idx) {
            Some(m) => m
                .as_str()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidDuration(raw.to_string())),
            None => Ok(0),
        }
    };

    let (days, hours, minutes, seconds) = (component(1)?, component(2)?, component(3)?, component(4)?);

    days.checked_mul(24)
        .and_then(|v| v.checked_add(hours))
        .and_then(|v| v.checked_mul(60))
        .and_then(|v| v.checked_add(minutes))
        .and_then(|v| v.checked_mul(60))
        .and_then(|v| v.checked_add(seconds))
        .ok_or_else(|| ConfigError::InvalidDuration(raw.to_string()))
}

/// Canonical rendering of a second count; `parse_bound` inverts it.
pub fn format_bound(total_secs: u64) -> String {
    if total_secs == 0 {
        return "0s".to_string();
    }

    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;

    let mut out = String::new();
    for (value, unit) in [(days, 'd'), (hours, 'h'), (minutes, 'm'), (seconds, 's')] {
        if value > 0 {
            out.push_str(&value.to_string());
            out.push(unit);
        }
    }
    out
}

/// Number of checks a wait loop may make: `ceil(bound / interval) + 1`.
pub fn attempt_budget(bound_secs: u64, interval_secs: u64) -> Result<u64, ConfigError> {
    if interval_secs == 0 {
        return Err(ConfigError::ZeroPollInterval);
    }
    Ok(bound_secs.div_ceil(interval_secs).saturating_add(1))
}
