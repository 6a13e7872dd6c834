//! Orchestration of capture, scheduling and delivery.
//!
//! The controller is the single owner of all core state. Presentation sends
//! it [`Intent`]s and reads [`Snapshot`]s; it never mutates state directly.

use chrono::Duration as ChronoDuration;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::capture::{ClickOutcome, WindowCaptureSession};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{ResumeError, Result};
use crate::platform::{ClickEvent, ClickSink, NoSleepInhibition, Platform, WindowSystem};
use crate::process_finder::{current_process_name, ProcessIdentifier, ProcessTable};
use crate::schedule::{hour_labels, HourOffset};
use crate::scheduler::{AppState, TargetResumeScheduler, TickOutcome};
use crate::sender::ResumeMessageSender;
use crate::target::TargetWindow;

const BTN_TARGET_CAPTURE: &str = "Click on target window or ESC to cancel";
const BTN_TARGET_SELECT: &str = "Click to select target window";
const BTN_START_CLICK: &str = "Click to start";
const BTN_START_SELECT: &str = "Select target window";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Escape pressed while capturing.
    Escape,
    /// The application lost input focus while capturing.
    FocusLost,
    /// An explicit cancel request.
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    BeginCapture,
    CancelCapture(CancelReason),
    SelectHour(usize),
    ToggleCountdown,
    Quit,
}

/// Read-only view of the core for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub state: AppState,
    pub capturing: bool,
    pub target: Option<TargetWindow>,
    pub hour_offset: HourOffset,
    /// Labels of the next five hour boundaries, independent of any countdown.
    pub hour_labels: Vec<String>,
    /// `HH:MM:SS` left while armed.
    pub countdown: Option<String>,
    pub target_button_text: String,
    pub start_button_text: String,
}

pub struct AppController<C: Clock> {
    scheduler: TargetResumeScheduler<C>,
    capture: WindowCaptureSession,
    sender: ResumeMessageSender,
    identifier: ProcessIdentifier,
    windows: Arc<dyn WindowSystem>,
}

impl<C: Clock> AppController<C> {
    pub fn new(
        clock: C,
        platform: Platform,
        processes: Box<dyn ProcessTable>,
        config: &Config,
        clicks: ClickSink,
    ) -> Result<Self> {
        let grace = ChronoDuration::from_std(config.grace_period).map_err(|_| {
            ResumeError::config_validation("grace_period is out of range")
        })?;

        let inhibitor = if config.prevent_sleep {
            platform.inhibitor
        } else {
            Arc::new(NoSleepInhibition)
        };

        let mut ignored = config.ignored_processes.clone();
        if let Some(own) = current_process_name() {
            debug!(process = %own, "excluding own process from capture");
            ignored.push(own);
        }

        Ok(Self {
            scheduler: TargetResumeScheduler::new(clock, inhibitor, grace),
            capture: WindowCaptureSession::new(platform.hook, clicks, ignored),
            sender: ResumeMessageSender::new(
                Arc::clone(&platform.windows),
                platform.keyboard,
                config.settle_delay,
            ),
            identifier: ProcessIdentifier::new(processes),
            windows: platform.windows,
        })
    }

    pub fn state(&self) -> AppState {
        self.scheduler.state()
    }

    pub fn is_armed(&self) -> bool {
        self.scheduler.is_armed()
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_capturing()
    }

    pub fn scheduler(&self) -> &TargetResumeScheduler<C> {
        &self.scheduler
    }

    /// Applies a presentation intent. `Quit` is left to the event loop.
    pub fn dispatch(&mut self, intent: Intent) -> Result<()> {
        match intent {
            Intent::BeginCapture => self.begin_capture(),
            Intent::CancelCapture(reason) => self.cancel_capture(reason),
            Intent::SelectHour(index) => self.select_hour(index).map(|_| ()),
            Intent::ToggleCountdown => self.toggle_countdown(),
            Intent::Quit => Ok(()),
        }
    }

    /// Clears the current target and starts listening for a click. Rejected
    /// while the countdown is armed.
    pub fn begin_capture(&mut self) -> Result<()> {
        if self.scheduler.is_armed() {
            return Err(ResumeError::countdown_armed("select a new target"));
        }
        if self.capture.is_capturing() {
            return Err(ResumeError::AlreadyCapturing);
        }
        self.scheduler.clear_target()?;
        self.capture.start()
    }

    /// Escape and focus loss arrive whether or not a capture is running and
    /// only act during one. An explicit cancel outside capture is an error.
    pub fn cancel_capture(&mut self, reason: CancelReason) -> Result<()> {
        if !self.capture.is_capturing() && reason != CancelReason::User {
            return Ok(());
        }
        self.capture.cancel()?;
        self.scheduler.clear_target()?;
        info!(?reason, "capture cancelled");
        Ok(())
    }

    pub fn select_hour(&mut self, index: usize) -> Result<HourOffset> {
        self.scheduler.select_hour_offset(index)
    }

    /// Stops an armed countdown, otherwise arms one.
    pub fn toggle_countdown(&mut self) -> Result<()> {
        if self.scheduler.stop() {
            return Ok(());
        }
        self.scheduler.start().map(|_| ())
    }

    /// Handles a click marshaled from the global listener. Returns the new
    /// target once capture completes.
    pub fn on_click(&mut self, click: ClickEvent) -> Result<Option<TargetWindow>> {
        let outcome = self
            .capture
            .handle_click(click, self.windows.as_ref(), &mut self.identifier);
        match outcome {
            ClickOutcome::Acquired(target) => {
                self.scheduler.set_target(target.clone())?;
                Ok(Some(target))
            }
            ClickOutcome::NotCapturing | ClickOutcome::NoWindow | ClickOutcome::Ignored { .. } => {
                Ok(None)
            }
        }
    }

    pub fn tick(&mut self) -> Result<TickOutcome> {
        self.scheduler.tick(&mut self.sender)
    }

    /// Process-exit cleanup: removes the listener and disarms the countdown.
    pub fn shutdown(&mut self) {
        if self.capture.is_capturing() {
            let _ = self.capture.cancel();
        }
        self.scheduler.stop();
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.scheduler.state();
        let capturing = self.capture.is_capturing();
        let target = self.scheduler.target().cloned();
        let countdown = self.scheduler.countdown_text();

        let target_button_text = match (&target, capturing) {
            (Some(target), _) if !target.process_name.is_empty() => target.label(),
            (_, true) => BTN_TARGET_CAPTURE.to_string(),
            _ => BTN_TARGET_SELECT.to_string(),
        };

        let start_button_text = match (state, &countdown) {
            (AppState::Waiting, Some(left)) => format!("Resuming in {left}"),
            (AppState::Ready, _) => BTN_START_CLICK.to_string(),
            _ => BTN_START_SELECT.to_string(),
        };

        Snapshot {
            state,
            capturing,
            target,
            hour_offset: self.scheduler.hour_offset(),
            hour_labels: hour_labels(&self.scheduler.clock().now()),
            countdown,
            target_button_text,
            start_button_text,
        }
    }
}
