//! In-memory desktop implementing every platform capability.
//!
//! Clones share state, so a test can hand one clone to the controller and
//! keep another to click, close windows and inspect what was typed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    ClickEvent, ClickSink, InputHook, KeyEvent, KeyInjector, Platform, ScreenPoint,
    SleepInhibitor, VirtualKey, WindowSystem,
};
use crate::error::{ResumeError, Result};
use crate::process_finder::ProcessTable;
use crate::target::WindowHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    fn contains(&self, point: ScreenPoint) -> bool {
        point.x >= self.left && point.x < self.right && point.y >= self.top && point.y < self.bottom
    }
}

#[derive(Debug, Clone)]
struct SimWindow {
    handle: WindowHandle,
    pid: u32,
    title: String,
    rect: Rect,
}

#[derive(Debug, Default)]
struct DesktopState {
    // Bottom to top in z-order.
    windows: Vec<SimWindow>,
    processes: HashMap<u32, String>,
    foreground: Option<WindowHandle>,
    keys: Vec<KeyEvent>,
    hook: Option<(ClickSink, u64)>,
    hook_installs: usize,
    fail_hook_install: bool,
    inhibited: bool,
    inhibit_calls: usize,
    release_calls: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedDesktop {
    state: Arc<Mutex<DesktopState>>,
}

impl SimulatedDesktop {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, DesktopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a running process by executable file name, e.g. `notepad.exe`.
    pub fn add_process(&self, pid: u32, executable: &str) {
        self.state().processes.insert(pid, executable.to_string());
    }

    pub fn end_process(&self, pid: u32) {
        self.state().processes.remove(&pid);
    }

    /// Opens a window on top of all others.
    pub fn open_window(&self, raw: u64, pid: u32, title: &str, rect: Rect) -> WindowHandle {
        let handle = WindowHandle::new(raw);
        self.state().windows.push(SimWindow {
            handle,
            pid,
            title: title.to_string(),
            rect,
        });
        handle
    }

    pub fn close_window(&self, handle: WindowHandle) {
        let mut state = self.state();
        state.windows.retain(|w| w.handle != handle);
        if state.foreground == Some(handle) {
            state.foreground = None;
        }
    }

    /// Delivers a primary-button press to the installed listener. Returns
    /// false when no listener is installed.
    pub fn click(&self, x: i32, y: i32) -> bool {
        let state = self.state();
        match &state.hook {
            Some((sink, session)) => sink
                .send(ClickEvent {
                    point: ScreenPoint::new(x, y),
                    session: *session,
                })
                .is_ok(),
            None => false,
        }
    }

    pub fn set_hook_failure(&self, fail: bool) {
        self.state().fail_hook_install = fail;
    }

    pub fn hook_installed(&self) -> bool {
        self.state().hook.is_some()
    }

    pub fn hook_installs(&self) -> usize {
        self.state().hook_installs
    }

    pub fn foreground(&self) -> Option<WindowHandle> {
        self.state().foreground
    }

    pub fn key_events(&self) -> Vec<KeyEvent> {
        self.state().keys.clone()
    }

    /// Text produced by the recorded key events, honouring shift.
    pub fn typed_text(&self) -> String {
        let mut shift = false;
        let mut text = String::new();
        for event in self.state().keys.iter() {
            match *event {
                KeyEvent::Down(VirtualKey::Shift) => shift = true,
                KeyEvent::Up(VirtualKey::Shift) => shift = false,
                KeyEvent::Down(VirtualKey::Letter(c)) if shift => text.push(c),
                KeyEvent::Down(VirtualKey::Letter(c)) => text.push(c.to_ascii_lowercase()),
                KeyEvent::Down(VirtualKey::Digit(c)) => text.push(c),
                KeyEvent::Down(VirtualKey::Space) => text.push(' '),
                KeyEvent::Down(VirtualKey::Enter) => text.push('\n'),
                KeyEvent::Up(_) => {}
            }
        }
        text
    }

    pub fn inhibited(&self) -> bool {
        self.state().inhibited
    }

    pub fn inhibit_calls(&self) -> usize {
        self.state().inhibit_calls
    }

    pub fn release_calls(&self) -> usize {
        self.state().release_calls
    }

    /// Bundles clones of this desktop as a [`Platform`].
    pub fn platform(&self) -> Platform {
        Platform {
            windows: Arc::new(self.clone()),
            hook: Box::new(self.clone()),
            keyboard: Box::new(self.clone()),
            inhibitor: Arc::new(self.clone()),
        }
    }
}

impl WindowSystem for SimulatedDesktop {
    fn window_at(&self, point: ScreenPoint) -> Option<WindowHandle> {
        self.state()
            .windows
            .iter()
            .rev()
            .find(|w| w.rect.contains(point))
            .map(|w| w.handle)
    }

    fn owning_process_id(&self, window: WindowHandle) -> Option<u32> {
        self.state()
            .windows
            .iter()
            .find(|w| w.handle == window)
            .map(|w| w.pid)
    }

    fn window_title(&self, window: WindowHandle) -> String {
        self.state()
            .windows
            .iter()
            .find(|w| w.handle == window)
            .map(|w| w.title.clone())
            .unwrap_or_default()
    }

    fn is_window(&self, window: WindowHandle) -> bool {
        self.state().windows.iter().any(|w| w.handle == window)
    }

    fn bring_to_foreground(&self, window: WindowHandle) -> Result<()> {
        let mut state = self.state();
        if !state.windows.iter().any(|w| w.handle == window) {
            return Err(ResumeError::window(format!("no such window {window}")));
        }
        state.foreground = Some(window);
        Ok(())
    }
}

impl InputHook for SimulatedDesktop {
    fn install(&mut self, sink: ClickSink, session: u64) -> Result<()> {
        let mut state = self.state();
        if state.fail_hook_install {
            return Err(ResumeError::hook_install("simulated failure"));
        }
        state.hook = Some((sink, session));
        state.hook_installs += 1;
        Ok(())
    }

    fn uninstall(&mut self) {
        self.state().hook = None;
    }

    fn is_installed(&self) -> bool {
        self.hook_installed()
    }
}

impl KeyInjector for SimulatedDesktop {
    fn send(&mut self, event: KeyEvent) -> Result<()> {
        self.state().keys.push(event);
        Ok(())
    }
}

impl SleepInhibitor for SimulatedDesktop {
    fn inhibit(&self) -> Result<()> {
        let mut state = self.state();
        state.inhibited = true;
        state.inhibit_calls += 1;
        Ok(())
    }

    fn release(&self) {
        let mut state = self.state();
        state.inhibited = false;
        state.release_calls += 1;
    }
}

impl ProcessTable for SimulatedDesktop {
    fn executable_name(&mut self, pid: u32) -> Option<String> {
        self.state().processes.get(&pid).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topmost_window_wins_hit_test() {
        let desktop = SimulatedDesktop::new();
        let below = desktop.open_window(1, 10, "below", Rect::new(0, 0, 100, 100));
        let above = desktop.open_window(2, 20, "above", Rect::new(50, 50, 150, 150));

        assert_eq!(desktop.window_at(ScreenPoint::new(10, 10)), Some(below));
        assert_eq!(desktop.window_at(ScreenPoint::new(60, 60)), Some(above));
        assert_eq!(desktop.window_at(ScreenPoint::new(500, 500)), None);
    }

    #[test]
    fn test_click_requires_installed_hook() {
        let mut desktop = SimulatedDesktop::new();
        assert!(!desktop.click(1, 1));

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        desktop.install(tx, 7).unwrap();
        assert!(desktop.click(3, 4));
        let click = rx.try_recv().unwrap();
        assert_eq!(click.point, ScreenPoint::new(3, 4));
        assert_eq!(click.session, 7);

        desktop.uninstall();
        assert!(!desktop.click(3, 4));
    }

    #[test]
    fn test_typed_text_honours_shift() {
        let mut desktop = SimulatedDesktop::new();
        for event in [
            KeyEvent::Down(VirtualKey::Shift),
            KeyEvent::Down(VirtualKey::Letter('O')),
            KeyEvent::Up(VirtualKey::Letter('O')),
            KeyEvent::Up(VirtualKey::Shift),
            KeyEvent::Down(VirtualKey::Letter('K')),
            KeyEvent::Up(VirtualKey::Letter('K')),
        ] {
            desktop.send(event).unwrap();
        }
        assert_eq!(desktop.typed_text(), "Ok");
    }
}
