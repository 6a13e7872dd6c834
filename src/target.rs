//! The window chosen to receive the resume keystrokes.

use serde::Serialize;
use std::fmt;

/// Titles longer than this are cut and suffixed with an ellipsis in labels.
pub const TITLE_CHAR_LIMIT: usize = 35;

const NO_TITLE: &str = "[No Title]";
const ELLIPSIS: &str = "...";

/// Opaque platform window handle.
///
/// The OS owns the window, so a handle may stop referring to a live window at
/// any moment. Check it with [`WindowSystem::is_window`] before use.
///
/// [`WindowSystem::is_window`]: crate::platform::WindowSystem::is_window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct WindowHandle(u64);

impl WindowHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// A captured target. Process name and title are fixed at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetWindow {
    pub handle: WindowHandle,
    /// Executable name without extension; empty when the owner was not found.
    pub process_name: String,
    /// Window title; may legitimately be empty.
    pub title: String,
}

impl TargetWindow {
    pub fn new(
        handle: WindowHandle,
        process_name: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            handle,
            process_name: process_name.into(),
            title: title.into(),
        }
    }

    /// Title for display, truncated to [`TITLE_CHAR_LIMIT`] characters or
    /// replaced by a placeholder when empty.
    pub fn display_title(&self) -> String {
        if self.title.is_empty() {
            return NO_TITLE.to_string();
        }
        if self.title.chars().count() > TITLE_CHAR_LIMIT {
            let cut: String = self.title.chars().take(TITLE_CHAR_LIMIT).collect();
            format!("{cut}{ELLIPSIS}")
        } else {
            self.title.clone()
        }
    }

    /// Two-line label: process name, then quoted title and handle.
    pub fn label(&self) -> String {
        format!(
            "{}\n\"{}\" ({})",
            self.process_name,
            self.display_title(),
            self.handle
        )
    }
}
