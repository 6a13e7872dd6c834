//! JSON configuration.
//!
//! Every field has a default, so `{}` is a valid configuration file.
//! Durations are written as strings such as `"500ms"`, `"10s"` or `"2m"`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::error::{ResumeError, Result};

const MAX_SETTLE_DELAY: Duration = Duration::from_secs(10);
const MAX_TICK_INTERVAL: Duration = Duration::from_secs(60);
const MAX_GRACE_PERIOD: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Delay past the chosen hour boundary before firing.
    #[serde(default = "default_grace_period", with = "duration_format")]
    pub grace_period: Duration,

    /// Pause between foregrounding the target and typing.
    #[serde(default = "default_settle_delay", with = "duration_format")]
    pub settle_delay: Duration,

    #[serde(default = "default_tick_interval", with = "duration_format")]
    pub tick_interval: Duration,

    /// Process names (without extension) whose windows cannot be captured.
    #[serde(default = "default_ignored_processes")]
    pub ignored_processes: Vec<String>,

    /// Global hotkey cancelling an active capture. Empty disables it.
    #[serde(default = "default_cancel_hotkey")]
    pub cancel_hotkey: String,

    /// Global hotkey starting or stopping the countdown. Empty disables it.
    #[serde(default = "default_toggle_hotkey")]
    pub toggle_hotkey: String,

    /// Keep the system and display awake while the countdown is armed.
    #[serde(default = "default_true")]
    pub prevent_sleep: bool,

    #[serde(default)]
    pub verbose: bool,
}

fn default_grace_period() -> Duration {
    Duration::from_secs(10)
}

fn default_settle_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_ignored_processes() -> Vec<String> {
    vec!["explorer".to_string()]
}

fn default_cancel_hotkey() -> String {
    "escape".to_string()
}

fn default_toggle_hotkey() -> String {
    "ctrl+alt+r".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grace_period: default_grace_period(),
            settle_delay: default_settle_delay(),
            tick_interval: default_tick_interval(),
            ignored_processes: default_ignored_processes(),
            cancel_hotkey: default_cancel_hotkey(),
            toggle_hotkey: default_toggle_hotkey(),
            prevent_sleep: true,
            verbose: false,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| ResumeError::config_load(path, e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ResumeError::config_load(path, e.to_string()))
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| ResumeError::config_save(path, e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.grace_period >= MAX_GRACE_PERIOD {
            return Err(ResumeError::config_validation(
                "grace_period must be shorter than one hour",
            ));
        }

        if self.settle_delay > MAX_SETTLE_DELAY {
            return Err(ResumeError::config_validation(
                "settle_delay cannot exceed 10s",
            ));
        }

        if self.tick_interval.is_zero() || self.tick_interval > MAX_TICK_INTERVAL {
            return Err(ResumeError::config_validation(
                "tick_interval must be between 1ms and 60s",
            ));
        }

        if self.ignored_processes.iter().any(|name| name.trim().is_empty()) {
            return Err(ResumeError::config_validation(
                "ignored_processes cannot contain empty names",
            ));
        }

        Ok(())
    }
}

/// Parses `"500ms"`, `"10s"`, `"2m"`, `"1h"` or a bare number of milliseconds.
/// Case-insensitive; surrounding whitespace is ignored.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let value = input.trim().to_lowercase();
    if value.is_empty() {
        return Err(ResumeError::invalid_duration(input, "empty value"));
    }

    let (digits, unit_ms) = if let Some(n) = value.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = value.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = value.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = value.strip_suffix('h') {
        (n, 3_600_000)
    } else {
        (value.as_str(), 1)
    };

    let digits = digits.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ResumeError::invalid_duration(
            input,
            "expected a non-negative whole number with an optional ms/s/m/h unit",
        ));
    }

    let amount: u64 = digits
        .parse()
        .map_err(|_| ResumeError::invalid_duration(input, "number too large"))?;
    let millis = amount
        .checked_mul(unit_ms)
        .ok_or_else(|| ResumeError::invalid_duration(input, "number too large"))?;

    Ok(Duration::from_millis(millis))
}

/// Inverse of [`parse_duration`] for whole seconds and milliseconds.
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{millis}ms")
    }
}

mod duration_format {
    use super::{format_duration, parse_duration};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
