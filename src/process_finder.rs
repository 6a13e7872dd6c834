//! Window owner lookup.
//!
//! Resolves the process that owns a window and reports its executable name
//! without the `.exe` suffix. A miss is not an error: the process may have
//! exited between the window lookup and the process enumeration.

use sysinfo::{ProcessesToUpdate, System};
use tracing::debug;

use crate::platform::WindowSystem;
use crate::target::WindowHandle;

const EXECUTABLE_SUFFIX: &str = ".exe";

/// PID to executable name mapping of the running processes.
pub trait ProcessTable: Send {
    fn executable_name(&mut self, pid: u32) -> Option<String>;
}

/// Process table backed by `sysinfo`.
///
/// # Example
///
/// ```
/// use auto_resume::process_finder::{ProcessFinder, ProcessTable};
///
/// let mut finder = ProcessFinder::new();
/// let own = finder.executable_name(std::process::id());
/// assert!(own.is_some());
/// ```
pub struct ProcessFinder {
    system: System,
}

impl Default for ProcessFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessFinder {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl ProcessTable for ProcessFinder {
    fn executable_name(&mut self, pid: u32) -> Option<String> {
        self.system.refresh_processes(ProcessesToUpdate::All, true);

        self.system
            .processes()
            .iter()
            .find(|(candidate, _)| candidate.as_u32() == pid)
            .map(|(_, process)| process.name().to_string_lossy().into_owned())
    }
}

/// Removes a trailing `.exe` (any case). Other dots are part of the name.
pub fn strip_executable_suffix(name: &str) -> &str {
    let split = name.len().saturating_sub(EXECUTABLE_SUFFIX.len());
    match (name.get(..split), name.get(split..)) {
        (Some(stem), Some(suffix))
            if !stem.is_empty() && suffix.eq_ignore_ascii_case(EXECUTABLE_SUFFIX) =>
        {
            stem
        }
        _ => name,
    }
}

/// Name of the running executable, used to keep our own windows out of
/// capture.
pub fn current_process_name() -> Option<String> {
    let exe = std::env::current_exe().ok()?;
    let file = exe.file_name()?.to_string_lossy().into_owned();
    Some(strip_executable_suffix(&file).to_string())
}

/// Resolves window handles to owning process names.
pub struct ProcessIdentifier {
    table: Box<dyn ProcessTable>,
}

impl ProcessIdentifier {
    pub fn new(table: Box<dyn ProcessTable>) -> Self {
        Self { table }
    }

    /// Owning process name of `window`, or `None` when either the owner PID
    /// or the process entry cannot be found.
    pub fn resolve_process_name(
        &mut self,
        windows: &dyn WindowSystem,
        window: WindowHandle,
    ) -> Option<String> {
        let Some(pid) = windows.owning_process_id(window) else {
            debug!(%window, "window has no owning process");
            return None;
        };
        let Some(executable) = self.table.executable_name(pid) else {
            debug!(%window, pid, "owning process not found in process list");
            return None;
        };
        Some(strip_executable_suffix(&executable).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::simulated::{Rect, SimulatedDesktop};

    #[test]
    fn test_strip_executable_suffix() {
        assert_eq!(strip_executable_suffix("notepad.exe"), "notepad");
        assert_eq!(strip_executable_suffix("Explorer.EXE"), "Explorer");
        assert_eq!(strip_executable_suffix("python3.11"), "python3.11");
        assert_eq!(strip_executable_suffix("my.app.exe"), "my.app");
        assert_eq!(strip_executable_suffix("firefox"), "firefox");
        assert_eq!(strip_executable_suffix(".exe"), ".exe");
        assert_eq!(strip_executable_suffix(""), "");
    }

    #[test]
    fn test_strip_executable_suffix_multibyte_name() {
        assert_eq!(strip_executable_suffix("ü"), "ü");
        assert_eq!(strip_executable_suffix("ärger.exe"), "ärger");
    }

    #[test]
    fn test_sysinfo_finds_own_process() {
        let mut finder = ProcessFinder::new();
        let name = finder.executable_name(std::process::id());
        assert!(name.is_some_and(|n| !n.is_empty()));
    }

    #[test]
    fn test_resolve_process_name() {
        let desktop = SimulatedDesktop::new();
        desktop.add_process(42, "notepad.exe");
        let window = desktop.open_window(0x10, 42, "Untitled", Rect::new(0, 0, 10, 10));

        let mut identifier = ProcessIdentifier::new(Box::new(desktop.clone()));
        assert_eq!(
            identifier.resolve_process_name(&desktop, window),
            Some("notepad".to_string())
        );
    }

    #[test]
    fn test_resolve_process_name_after_exit_is_absent() {
        let desktop = SimulatedDesktop::new();
        let window = desktop.open_window(0x10, 42, "orphan", Rect::new(0, 0, 10, 10));

        let mut identifier = ProcessIdentifier::new(Box::new(desktop.clone()));
        assert_eq!(identifier.resolve_process_name(&desktop, window), None);
        assert_eq!(
            identifier.resolve_process_name(&desktop, WindowHandle::new(0x99)),
            None
        );
    }
}
