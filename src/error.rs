//! Error types for auto-resume.
//!
//! Every rejected state transition has its own variant so callers can tell a
//! refusal apart from success.

use std::io;
use thiserror::Error;

use crate::target::WindowHandle;

/// Main error type for auto-resume operations.
#[derive(Error, Debug)]
pub enum ResumeError {
    /// The global mouse listener could not be installed.
    #[error("failed to install mouse hook: {0}")]
    HookInstall(String),

    /// A countdown was requested without a captured target window.
    #[error("please select a target window first")]
    NoTarget,

    /// The fire time arrived but the target window no longer exists.
    #[error("target window {handle} is no longer available")]
    TargetGone { handle: WindowHandle },

    /// The requested change is not allowed while the countdown is armed.
    #[error("cannot {action} while the countdown is running")]
    CountdownArmed { action: &'static str },

    /// Start was requested while the countdown is already armed.
    #[error("countdown is already running")]
    AlreadyArmed,

    /// Capture was requested while a capture session is active.
    #[error("window capture is already in progress")]
    AlreadyCapturing,

    /// Capture cancel was requested with no capture session active.
    #[error("no window capture is in progress")]
    NotCapturing,

    /// Hour offset outside the selectable range.
    #[error("hour offset {value} is out of range (0..={max})")]
    InvalidHourOffset { value: usize, max: usize },

    /// Error injecting a keystroke.
    #[error("failed to send key '{key}': {reason}")]
    KeySendFailed { key: String, reason: String },

    /// Error querying or focusing a window.
    #[error("window error: {0}")]
    Window(String),

    /// Error registering or handling hotkey.
    #[error("hotkey error: {0}")]
    Hotkey(String),

    /// Platform-specific operation is not supported.
    #[error("operation not supported on this platform: {0}")]
    UnsupportedPlatform(String),

    /// Configuration validation error.
    #[error("configuration error: {0}")]
    ConfigValidation(String),

    /// Error reading or parsing configuration file.
    #[error("failed to load config from '{path}': {reason}")]
    ConfigLoad { path: String, reason: String },

    /// Error writing configuration file.
    #[error("failed to save config to '{path}': {reason}")]
    ConfigSave { path: String, reason: String },

    /// Error parsing duration string.
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for auto-resume operations.
pub type Result<T> = std::result::Result<T, ResumeError>;

impl ResumeError {
    pub fn hook_install(reason: impl Into<String>) -> Self {
        Self::HookInstall(reason.into())
    }

    pub fn countdown_armed(action: &'static str) -> Self {
        Self::CountdownArmed { action }
    }

    pub fn key_send_failed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::KeySendFailed {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn window(message: impl Into<String>) -> Self {
        Self::Window(message.into())
    }

    pub fn hotkey(message: impl Into<String>) -> Self {
        Self::Hotkey(message.into())
    }

    pub fn unsupported_platform(message: impl Into<String>) -> Self {
        Self::UnsupportedPlatform(message.into())
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation(message.into())
    }

    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config_save(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigSave {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_duration(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error should be shown to the user as a warning rather
    /// than an error.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::TargetGone { .. })
    }
}
