//! Host platform capabilities consumed by the core.
//!
//! Each capability is a narrow trait so another platform (or the simulated
//! desktop used in tests) can stand in without touching the state machines.

pub mod simulated;

#[cfg(windows)]
pub mod windows;

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::Result;
use crate::target::WindowHandle;

pub use simulated::SimulatedDesktop;

/// Screen coordinates in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A primary-button press seen by the global listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickEvent {
    pub point: ScreenPoint,
    /// Capture session the listener was installed for.
    pub session: u64,
}

/// Where the listener posts clicks. The receiving end lives on the owner
/// thread; the listener never touches core state itself.
pub type ClickSink = UnboundedSender<ClickEvent>;

/// Window enumeration, hit-testing, liveness and focus control.
pub trait WindowSystem: Send + Sync {
    /// Top-level window under `point`, if any.
    fn window_at(&self, point: ScreenPoint) -> Option<WindowHandle>;

    fn owning_process_id(&self, window: WindowHandle) -> Option<u32>;

    /// Window title, empty when the window has none.
    fn window_title(&self, window: WindowHandle) -> String;

    fn is_window(&self, window: WindowHandle) -> bool;

    fn bring_to_foreground(&self, window: WindowHandle) -> Result<()>;
}

/// System-wide primary-button listener.
pub trait InputHook: Send {
    /// Every click posted to `sink` carries `session`.
    fn install(&mut self, sink: ClickSink, session: u64) -> Result<()>;

    /// Must not return until no further clicks can be delivered.
    fn uninstall(&mut self);

    fn is_installed(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualKey {
    /// `'A'..='Z'`
    Letter(char),
    /// `'0'..='9'`
    Digit(char),
    Space,
    Enter,
    Shift,
}

impl VirtualKey {
    /// Key and shift state producing an ASCII character on a US layout.
    pub fn for_ascii(c: char) -> Option<(VirtualKey, bool)> {
        match c {
            'A'..='Z' => Some((VirtualKey::Letter(c), true)),
            'a'..='z' => Some((VirtualKey::Letter(c.to_ascii_uppercase()), false)),
            '0'..='9' => Some((VirtualKey::Digit(c), false)),
            ' ' => Some((VirtualKey::Space, false)),
            '\n' | '\r' => Some((VirtualKey::Enter, false)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Down(VirtualKey),
    Up(VirtualKey),
}

/// Synthetic keyboard input delivered to whatever window has focus.
pub trait KeyInjector: Send {
    fn send(&mut self, event: KeyEvent) -> Result<()>;
}

/// Keeps the system and display awake.
pub trait SleepInhibitor: Send + Sync {
    fn inhibit(&self) -> Result<()>;

    fn release(&self);
}

/// Inhibitor used when sleep prevention is turned off in the config.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSleepInhibition;

impl SleepInhibitor for NoSleepInhibition {
    fn inhibit(&self) -> Result<()> {
        Ok(())
    }

    fn release(&self) {}
}

/// The full set of host capabilities.
pub struct Platform {
    pub windows: Arc<dyn WindowSystem>,
    pub hook: Box<dyn InputHook>,
    pub keyboard: Box<dyn KeyInjector>,
    pub inhibitor: Arc<dyn SleepInhibitor>,
}

/// Capabilities of the platform this binary was built for.
#[cfg(windows)]
pub fn native() -> Result<Platform> {
    Ok(windows::platform())
}

#[cfg(not(windows))]
pub fn native() -> Result<Platform> {
    Err(crate::error::ResumeError::unsupported_platform(
        "global mouse capture and keystroke injection are only implemented for Windows",
    ))
}
