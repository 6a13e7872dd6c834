//! System-wide hotkeys forwarded to the event loop as intents.
//!
//! The toggle hotkey stays registered for the whole session. The cancel
//! hotkey is only registered while a capture is running, so Escape keeps
//! working normally in other applications the rest of the time.

use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::controller::{CancelReason, Intent};
use crate::error::{ResumeError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Parses strings such as `ctrl+alt+r` or `escape`.
pub fn parse_hotkey(hotkey_str: &str) -> Result<HotKey> {
    hotkey_str
        .trim()
        .parse::<HotKey>()
        .map_err(|e| ResumeError::hotkey(format!("invalid hotkey '{hotkey_str}': {e}")))
}

/// `None` for an empty string, which disables that hotkey.
fn parse_optional(hotkey_str: &str) -> Result<Option<HotKey>> {
    if hotkey_str.trim().is_empty() {
        Ok(None)
    } else {
        parse_hotkey(hotkey_str).map(Some)
    }
}

#[derive(Debug, Clone, Copy)]
struct Bindings {
    cancel: Option<HotKey>,
    toggle: Option<HotKey>,
}

impl Bindings {
    fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            cancel: parse_optional(&config.cancel_hotkey)?,
            toggle: parse_optional(&config.toggle_hotkey)?,
        })
    }

    fn intent_for(&self, id: u32) -> Option<Intent> {
        if self.toggle.map(|h| h.id()) == Some(id) {
            Some(Intent::ToggleCountdown)
        } else if self.cancel.map(|h| h.id()) == Some(id) {
            Some(Intent::CancelCapture(CancelReason::Escape))
        } else {
            None
        }
    }
}

/// Registers the configured hotkeys on a dedicated thread and forwards
/// presses into `intents`. `capturing` follows the capture state and drives
/// registration of the cancel hotkey.
///
/// Returns once registration of the toggle hotkey has succeeded or failed.
/// The thread ends when the intent receiver is dropped.
pub fn spawn_hotkey_listener(
    config: &Config,
    capturing: watch::Receiver<bool>,
    intents: UnboundedSender<Intent>,
) -> Result<JoinHandle<()>> {
    let bindings = Bindings::from_config(config)?;
    let (ready_tx, ready_rx) = std_mpsc::sync_channel::<Result<()>>(1);

    let handle = thread::Builder::new()
        .name("hotkeys".to_string())
        .spawn(move || run_listener(bindings, capturing, intents, ready_tx))?;

    ready_rx
        .recv()
        .map_err(|_| ResumeError::hotkey("hotkey thread exited during registration"))??;
    Ok(handle)
}

fn run_listener(
    bindings: Bindings,
    mut capturing: watch::Receiver<bool>,
    intents: UnboundedSender<Intent>,
    ready: std_mpsc::SyncSender<Result<()>>,
) {
    let manager = match GlobalHotKeyManager::new() {
        Ok(manager) => manager,
        Err(e) => {
            let _ = ready.send(Err(ResumeError::hotkey(format!(
                "failed to create hotkey manager: {e}"
            ))));
            return;
        }
    };

    if let Some(toggle) = bindings.toggle {
        if let Err(e) = manager.register(toggle) {
            let _ = ready.send(Err(ResumeError::hotkey(format!(
                "failed to register toggle hotkey: {e}"
            ))));
            return;
        }
        info!(hotkey = ?toggle, "toggle hotkey registered");
    }
    let _ = ready.send(Ok(()));

    let receiver = GlobalHotKeyEvent::receiver();
    let mut cancel_registered = false;

    loop {
        #[cfg(windows)]
        crate::platform::windows::pump_thread_messages();

        if let Some(cancel) = bindings.cancel {
            if capturing.has_changed().unwrap_or(false) {
                let wanted = *capturing.borrow_and_update();
                if wanted != cancel_registered {
                    let result = if wanted {
                        manager.register(cancel)
                    } else {
                        manager.unregister(cancel)
                    };
                    match result {
                        Ok(()) => {
                            cancel_registered = wanted;
                            debug!(registered = wanted, "cancel hotkey updated");
                        }
                        Err(e) => warn!(error = %e, "could not update cancel hotkey"),
                    }
                }
            }
        }

        while let Ok(event) = receiver.try_recv() {
            if event.state != HotKeyState::Pressed {
                continue;
            }
            let Some(intent) = bindings.intent_for(event.id) else {
                continue;
            };
            debug!(?intent, "hotkey pressed");
            if intents.send(intent).is_err() {
                return;
            }
        }

        if intents.is_closed() {
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use global_hotkey::hotkey::{Code, Modifiers};

    #[test]
    fn test_parse_default_hotkeys() {
        assert_eq!(
            parse_hotkey("ctrl+alt+r").unwrap(),
            HotKey::new(Some(Modifiers::CONTROL | Modifiers::ALT), Code::KeyR)
        );
        assert_eq!(
            parse_hotkey(" escape ").unwrap(),
            HotKey::new(None, Code::Escape)
        );
    }

    #[test]
    fn test_parse_invalid_hotkey() {
        assert!(matches!(
            parse_hotkey("ctrl+nosuchkey"),
            Err(ResumeError::Hotkey(_))
        ));
    }

    #[test]
    fn test_empty_hotkey_disables_binding() {
        let config = Config {
            cancel_hotkey: String::new(),
            ..Config::default()
        };
        let bindings = Bindings::from_config(&config).unwrap();
        assert!(bindings.cancel.is_none());
        assert!(bindings.toggle.is_some());
    }

    #[test]
    fn test_hotkey_ids_map_to_intents() {
        let bindings = Bindings::from_config(&Config::default()).unwrap();
        let toggle = bindings.toggle.unwrap().id();
        let cancel = bindings.cancel.unwrap().id();

        assert_eq!(bindings.intent_for(toggle), Some(Intent::ToggleCountdown));
        assert_eq!(
            bindings.intent_for(cancel),
            Some(Intent::CancelCapture(CancelReason::Escape))
        );
        let unbound = parse_hotkey("shift+f9").unwrap().id();
        assert_eq!(bindings.intent_for(unbound), None);
    }
}
