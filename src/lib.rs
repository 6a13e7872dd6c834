//! # Auto Resume
//!
//! Types `RESUME` and Enter into a chosen window shortly after one of the next
//! five hour boundaries, so an interactive session rate-limited until the top
//! of the hour picks up again without anyone at the keyboard.
//!
//! ## Features
//!
//! - Pick the target window by clicking it anywhere on screen
//! - Fire at the next hour boundary plus 0 to 4 hours, with a short grace delay
//! - Live `HH:MM:SS` countdown; stop at any time
//! - System sleep is inhibited while the countdown is armed
//! - Global hotkeys for cancelling capture and toggling the countdown
//! - JSON configuration file support
//!
//! ## Example
//!
//! ```no_run
//! use auto_resume::platform::simulated::{Rect, SimulatedDesktop};
//! use auto_resume::{AppController, Config, Intent, SystemClock};
//! use tokio::sync::mpsc::unbounded_channel;
//!
//! let desktop = SimulatedDesktop::new();
//! desktop.add_process(8, "notepad.exe");
//! desktop.open_window(0x20, 8, "Untitled", Rect::new(0, 0, 400, 400));
//!
//! let (clicks_tx, mut clicks) = unbounded_channel();
//! let mut controller = AppController::new(
//!     SystemClock,
//!     desktop.platform(),
//!     Box::new(desktop.clone()),
//!     &Config::default(),
//!     clicks_tx,
//! )
//! .unwrap();
//!
//! controller.dispatch(Intent::BeginCapture).unwrap();
//! desktop.click(100, 100);
//! controller.on_click(clicks.try_recv().unwrap()).unwrap();
//! controller.dispatch(Intent::SelectHour(2)).unwrap();
//! controller.dispatch(Intent::ToggleCountdown).unwrap();
//! ```
//!
//! ## Configuration
//!
//! ```json
//! {
//!   "grace_period": "10s",
//!   "settle_delay": "500ms",
//!   "ignored_processes": ["explorer"],
//!   "toggle_hotkey": "ctrl+alt+r"
//! }
//! ```

pub mod capture;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod global_hotkey;
pub mod platform;
pub mod process_finder;
pub mod runtime;
pub mod schedule;
pub mod scheduler;
pub mod sender;
pub mod target;

pub use capture::{CaptureState, WindowCaptureSession};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use controller::{AppController, CancelReason, Intent, Snapshot};
pub use error::{ResumeError, Result};
pub use process_finder::{ProcessFinder, ProcessIdentifier};
pub use runtime::{EventLoop, Notice, UiEvent};
pub use schedule::HourOffset;
pub use scheduler::{AppState, TargetResumeScheduler, TickOutcome};
pub use sender::{ResumeDelivery, ResumeMessageSender};
pub use target::{TargetWindow, WindowHandle};
