//! Interactive target selection through a global click listener.
//!
//! The listener only posts raw clicks into a channel. Resolution of the
//! clicked window happens in [`WindowCaptureSession::handle_click`], which
//! the owner thread calls when it drains that channel.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ResumeError, Result};
use crate::platform::{ClickEvent, ClickSink, InputHook, WindowSystem};
use crate::process_finder::ProcessIdentifier;
use crate::target::TargetWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureState {
    Idle,
    Capturing,
}

/// What a single intercepted click did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The click does not belong to the running session (none is running,
    /// or it was queued during an earlier one); dropped.
    NotCapturing,
    /// Nothing under the cursor; still capturing.
    NoWindow,
    /// The window belongs to an ignored process; still capturing.
    Ignored { process_name: String },
    /// Capture finished and the listener is gone.
    Acquired(TargetWindow),
}

pub struct WindowCaptureSession {
    hook: Box<dyn InputHook>,
    sink: ClickSink,
    ignored_processes: Vec<String>,
    state: CaptureState,
    session: u64,
}

impl WindowCaptureSession {
    pub fn new(
        hook: Box<dyn InputHook>,
        sink: ClickSink,
        ignored_processes: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            hook,
            sink,
            ignored_processes: ignored_processes.into_iter().collect(),
            state: CaptureState::Idle,
            session: 0,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state == CaptureState::Capturing
    }

    /// Installs the listener and enters `Capturing`. On failure the session
    /// stays `Idle`.
    pub fn start(&mut self) -> Result<()> {
        if self.is_capturing() {
            return Err(ResumeError::AlreadyCapturing);
        }

        self.session = self.session.wrapping_add(1);
        if let Err(e) = self.hook.install(self.sink.clone(), self.session) {
            warn!(error = %e, "window capture could not start");
            return Err(e);
        }

        self.state = CaptureState::Capturing;
        info!("window capture started");
        Ok(())
    }

    /// Removes the listener before returning, so no later click can be
    /// intercepted.
    pub fn cancel(&mut self) -> Result<()> {
        if !self.is_capturing() {
            return Err(ResumeError::NotCapturing);
        }
        self.finish();
        info!("window capture cancelled");
        Ok(())
    }

    fn finish(&mut self) {
        self.hook.uninstall();
        self.state = CaptureState::Idle;
    }

    /// Whether `process_name` may not be captured. An unknown (empty) name
    /// never matches.
    pub fn is_ignored(&self, process_name: &str) -> bool {
        !process_name.is_empty()
            && self
                .ignored_processes
                .iter()
                .any(|ignored| ignored.eq_ignore_ascii_case(process_name))
    }

    pub fn handle_click(
        &mut self,
        click: ClickEvent,
        windows: &dyn WindowSystem,
        identifier: &mut ProcessIdentifier,
    ) -> ClickOutcome {
        if !self.is_capturing() || click.session != self.session {
            debug!(?click, session = self.session, "dropping click from outside the running capture");
            return ClickOutcome::NotCapturing;
        }

        let Some(handle) = windows.window_at(click.point) else {
            debug!(?click, "no window under click");
            return ClickOutcome::NoWindow;
        };

        let process_name = identifier
            .resolve_process_name(windows, handle)
            .unwrap_or_default();
        if self.is_ignored(&process_name) {
            debug!(%handle, %process_name, "ignoring click on excluded process");
            return ClickOutcome::Ignored { process_name };
        }

        let title = windows.window_title(handle);
        let target = TargetWindow::new(handle, process_name, title);
        self.finish();
        info!(
            handle = %target.handle,
            process = %target.process_name,
            title = %target.title,
            "target window captured"
        );
        ClickOutcome::Acquired(target)
    }
}

impl Drop for WindowCaptureSession {
    fn drop(&mut self) {
        if self.is_capturing() {
            self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::simulated::{Rect, SimulatedDesktop};
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    struct Fixture {
        desktop: SimulatedDesktop,
        session: WindowCaptureSession,
        identifier: ProcessIdentifier,
        clicks: UnboundedReceiver<ClickEvent>,
    }

    fn fixture() -> Fixture {
        let desktop = SimulatedDesktop::new();
        desktop.add_process(1, "explorer.exe");
        desktop.add_process(2, "arcc.exe");
        desktop.add_process(3, "notepad.exe");
        desktop.open_window(0x100, 1, "", Rect::new(0, 0, 1000, 1000));
        desktop.open_window(0x200, 2, "ARCC", Rect::new(0, 0, 100, 100));
        desktop.open_window(0x300, 3, "Untitled", Rect::new(200, 200, 400, 400));
        // Window whose process has already exited.
        desktop.open_window(0x400, 9, "Ghost", Rect::new(500, 500, 600, 600));

        let (tx, clicks) = unbounded_channel();
        let session = WindowCaptureSession::new(
            Box::new(desktop.clone()),
            tx,
            ["explorer".to_string(), "arcc".to_string()],
        );
        let identifier = ProcessIdentifier::new(Box::new(desktop.clone()));
        Fixture {
            desktop,
            session,
            identifier,
            clicks,
        }
    }

    impl Fixture {
        fn click(&mut self, x: i32, y: i32) -> ClickOutcome {
            assert!(self.desktop.click(x, y));
            let click = self.clicks.try_recv().unwrap();
            let windows = self.desktop.clone();
            self.session
                .handle_click(click, &windows, &mut self.identifier)
        }
    }

    #[test]
    fn test_start_installs_hook() {
        let mut f = fixture();
        f.session.start().unwrap();
        assert!(f.session.is_capturing());
        assert!(f.desktop.hook_installed());
        assert!(matches!(
            f.session.start(),
            Err(ResumeError::AlreadyCapturing)
        ));
        assert_eq!(f.desktop.hook_installs(), 1);
    }

    #[test]
    fn test_hook_failure_leaves_session_idle() {
        let mut f = fixture();
        f.desktop.set_hook_failure(true);
        assert!(matches!(
            f.session.start(),
            Err(ResumeError::HookInstall(_))
        ));
        assert_eq!(f.session.state(), CaptureState::Idle);
        assert!(!f.desktop.hook_installed());
    }

    #[test]
    fn test_cancel_removes_hook() {
        let mut f = fixture();
        f.session.start().unwrap();
        f.session.cancel().unwrap();
        assert_eq!(f.session.state(), CaptureState::Idle);
        assert!(!f.desktop.hook_installed());
        assert!(matches!(f.session.cancel(), Err(ResumeError::NotCapturing)));
    }

    #[test]
    fn test_click_on_target_acquires_it() {
        let mut f = fixture();
        f.session.start().unwrap();

        let outcome = f.click(250, 250);
        let ClickOutcome::Acquired(target) = outcome else {
            panic!("expected acquisition, got {outcome:?}");
        };
        assert_eq!(target.process_name, "notepad");
        assert_eq!(target.title, "Untitled");
        assert_eq!(target.handle.raw(), 0x300);
        assert!(!f.session.is_capturing());
        assert!(!f.desktop.hook_installed());
    }

    #[test]
    fn test_shell_and_own_process_are_ignored() {
        let mut f = fixture();
        f.session.start().unwrap();

        assert_eq!(
            f.click(900, 900),
            ClickOutcome::Ignored {
                process_name: "explorer".to_string()
            }
        );
        assert_eq!(
            f.click(50, 50),
            ClickOutcome::Ignored {
                process_name: "arcc".to_string()
            }
        );
        assert!(f.session.is_capturing());
        assert!(f.desktop.hook_installed());
    }

    #[test]
    fn test_ignore_list_is_case_insensitive() {
        let f = fixture();
        assert!(f.session.is_ignored("Explorer"));
        assert!(!f.session.is_ignored(""));
        assert!(!f.session.is_ignored("notepad"));
    }

    #[test]
    fn test_unknown_process_is_captured_with_empty_name() {
        let mut f = fixture();
        f.session.start().unwrap();

        let ClickOutcome::Acquired(target) = f.click(550, 550) else {
            panic!("window of exited process should still be captured");
        };
        assert_eq!(target.process_name, "");
        assert_eq!(target.title, "Ghost");
    }

    #[test]
    fn test_click_outside_any_window_keeps_capturing() {
        let mut f = fixture();
        f.session.start().unwrap();
        assert_eq!(f.click(5000, 5000), ClickOutcome::NoWindow);
        assert!(f.session.is_capturing());
    }

    #[test]
    fn test_stale_click_after_cancel_is_dropped() {
        let mut f = fixture();
        f.session.start().unwrap();
        assert!(f.desktop.click(250, 250));
        f.session.cancel().unwrap();

        let stale = f.clicks.try_recv().unwrap();
        let windows = f.desktop.clone();
        assert_eq!(
            f.session.handle_click(stale, &windows, &mut f.identifier),
            ClickOutcome::NotCapturing
        );
    }

    #[test]
    fn test_click_from_previous_capture_is_dropped() {
        let mut f = fixture();
        f.session.start().unwrap();
        assert!(f.desktop.click(250, 250));
        f.session.cancel().unwrap();
        f.session.start().unwrap();

        let stale = f.clicks.try_recv().unwrap();
        let windows = f.desktop.clone();
        assert_eq!(
            f.session.handle_click(stale, &windows, &mut f.identifier),
            ClickOutcome::NotCapturing
        );
        assert!(f.session.is_capturing());
        assert!(f.desktop.hook_installed());

        assert!(matches!(f.click(250, 250), ClickOutcome::Acquired(_)));
    }

    #[test]
    fn test_drop_while_capturing_removes_hook() {
        let mut f = fixture();
        f.session.start().unwrap();
        let desktop = f.desktop.clone();
        drop(f);
        assert!(!desktop.hook_installed());
    }
}
