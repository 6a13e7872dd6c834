//! Delivery of the resume keystrokes to the target window.

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ResumeError, Result};
use crate::platform::{KeyEvent, KeyInjector, VirtualKey, WindowSystem};
use crate::target::TargetWindow;

/// Text typed into the target, followed by Enter.
pub const RESUME_MESSAGE: &str = "RESUME";

/// Anything that can deliver the resume sequence to a target. The scheduler
/// depends only on this, so other mechanisms can be swapped in.
pub trait ResumeDelivery {
    /// Fails with [`ResumeError::TargetGone`] when the window no longer exists.
    fn fire(&mut self, target: &TargetWindow) -> Result<()>;
}

/// Key presses and releases typing `text` and then Enter. Uppercase letters
/// are wrapped in Shift.
pub fn keystrokes(text: &str) -> Result<Vec<KeyEvent>> {
    let mut events = Vec::with_capacity(text.len() * 4 + 2);
    for c in text.chars() {
        let (key, shift) = VirtualKey::for_ascii(c).ok_or_else(|| {
            ResumeError::key_send_failed(c.to_string(), "no key produces this character")
        })?;
        if shift {
            events.push(KeyEvent::Down(VirtualKey::Shift));
        }
        events.push(KeyEvent::Down(key));
        events.push(KeyEvent::Up(key));
        if shift {
            events.push(KeyEvent::Up(VirtualKey::Shift));
        }
    }
    events.push(KeyEvent::Down(VirtualKey::Enter));
    events.push(KeyEvent::Up(VirtualKey::Enter));
    Ok(events)
}

/// Foregrounds the target, waits for focus to land, then types
/// [`RESUME_MESSAGE`] and Enter. Fire-and-forget: nothing checks that the
/// target application actually processed the text.
pub struct ResumeMessageSender {
    windows: Arc<dyn WindowSystem>,
    keyboard: Box<dyn KeyInjector>,
    settle_delay: Duration,
}

impl ResumeMessageSender {
    pub fn new(
        windows: Arc<dyn WindowSystem>,
        keyboard: Box<dyn KeyInjector>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            windows,
            keyboard,
            settle_delay,
        }
    }
}

impl ResumeMessageSender {
    /// Sends `events` in order. If a send fails while Shift is held, a Shift
    /// release is still attempted so the modifier is not left stuck down.
    fn type_events(&mut self, events: &[KeyEvent]) -> Result<()> {
        let mut shift_down = false;
        for &event in events {
            if let Err(e) = self.keyboard.send(event) {
                if shift_down {
                    match self.keyboard.send(KeyEvent::Up(VirtualKey::Shift)) {
                        Ok(()) => debug!("shift released after failed keystroke"),
                        Err(release) => warn!(error = %release, "could not release shift"),
                    }
                }
                return Err(e);
            }
            match event {
                KeyEvent::Down(VirtualKey::Shift) => shift_down = true,
                KeyEvent::Up(VirtualKey::Shift) => shift_down = false,
                _ => {}
            }
        }
        Ok(())
    }
}

impl ResumeDelivery for ResumeMessageSender {
    fn fire(&mut self, target: &TargetWindow) -> Result<()> {
        if !self.windows.is_window(target.handle) {
            warn!(handle = %target.handle, "target window is gone");
            return Err(ResumeError::TargetGone {
                handle: target.handle,
            });
        }

        // Foregrounding can be refused by the OS; typing still goes ahead.
        if let Err(e) = self.windows.bring_to_foreground(target.handle) {
            warn!(handle = %target.handle, error = %e, "could not foreground target");
        }
        if !self.settle_delay.is_zero() {
            thread::sleep(self.settle_delay);
        }

        self.type_events(&keystrokes(RESUME_MESSAGE)?)?;

        info!(
            handle = %target.handle,
            process = %target.process_name,
            "resume message sent"
        );
        Ok(())
    }
}
