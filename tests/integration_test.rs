use auto_resume::config::{parse_duration, Config};
use auto_resume::platform::simulated::{Rect, SimulatedDesktop};
use auto_resume::platform::ClickEvent;
use auto_resume::{
    AppController, AppState, CancelReason, Intent, ManualClock, ResumeError, TickOutcome,
};
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

fn at(rfc3339: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap()
}

struct Desk {
    desktop: SimulatedDesktop,
    clock: ManualClock,
    controller: AppController<ManualClock>,
    clicks: UnboundedReceiver<ClickEvent>,
}

impl Desk {
    fn new(start: &str) -> Self {
        let desktop = SimulatedDesktop::new();
        desktop.add_process(4, "explorer.exe");
        desktop.add_process(8, "notepad.exe");
        desktop.open_window(0x10, 4, "", Rect::new(0, 0, 1920, 1080));
        desktop.open_window(0x20, 8, "Untitled", Rect::new(100, 100, 600, 600));

        let clock = ManualClock::new(at(start));
        let config = Config {
            settle_delay: Duration::ZERO,
            ..Config::default()
        };
        let (tx, clicks) = unbounded_channel();
        let controller = AppController::new(
            clock.clone(),
            desktop.platform(),
            Box::new(desktop.clone()),
            &config,
            tx,
        )
        .unwrap();

        Self {
            desktop,
            clock,
            controller,
            clicks,
        }
    }

    fn click(&mut self, x: i32, y: i32) {
        assert!(self.desktop.click(x, y), "listener should be installed");
        let click = self.clicks.try_recv().unwrap();
        self.controller.on_click(click).unwrap();
    }

    fn select_notepad(&mut self) {
        self.controller.dispatch(Intent::BeginCapture).unwrap();
        self.click(300, 300);
    }
}

#[test]
fn test_config_file_round_trip() {
    let json = r#"
    {
        "grace_period": "15s",
        "settle_delay": "250ms",
        "ignored_processes": ["explorer", "Taskmgr"],
        "toggle_hotkey": "ctrl+shift+r",
        "prevent_sleep": false
    }
    "#;

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(json.as_bytes()).unwrap();

    let config = Config::from_file(temp_file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.grace_period, Duration::from_secs(15));
    assert_eq!(config.settle_delay, Duration::from_millis(250));
    assert_eq!(config.tick_interval, Duration::from_secs(1));
    assert_eq!(config.ignored_processes, vec!["explorer", "Taskmgr"]);
    assert_eq!(config.cancel_hotkey, "escape");
    assert_eq!(config.toggle_hotkey, "ctrl+shift+r");
    assert!(!config.prevent_sleep);
    assert!(config.validate().is_ok());

    let out = NamedTempFile::new().unwrap();
    let out_path = out.path().to_str().unwrap();
    config.save_to_file(out_path).unwrap();
    assert_eq!(Config::from_file(out_path).unwrap(), config);
}

#[test]
fn test_missing_config_file_reports_path() {
    let err = Config::from_file("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, ResumeError::ConfigLoad { ref path, .. } if path == "/definitely/not/here.json"));
}

#[test]
fn test_duration_parsing() {
    assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
    assert_eq!(parse_duration("500").unwrap(), Duration::from_millis(500));
    assert!(parse_duration("ten seconds").is_err());
}

#[test]
fn test_resume_at_two_hours_past_next_boundary() {
    let mut desk = Desk::new("2026-05-04T14:05:00+00:00");
    desk.select_notepad();
    desk.controller.dispatch(Intent::SelectHour(2)).unwrap();
    desk.controller.dispatch(Intent::ToggleCountdown).unwrap();

    assert_eq!(desk.controller.state(), AppState::Waiting);
    assert_eq!(
        desk.controller.scheduler().fire_at().map(|t| t.to_rfc3339()),
        Some("2026-05-04T17:00:10+00:00".to_string())
    );
    assert!(desk.desktop.inhibited());

    let mut previous = desk.controller.scheduler().remaining().unwrap();
    for _ in 0..5 {
        desk.clock.advance(ChronoDuration::minutes(30));
        let TickOutcome::Pending { remaining } = desk.controller.tick().unwrap() else {
            panic!("fired too early");
        };
        assert!(remaining < previous);
        previous = remaining;
    }
    assert!(desk.desktop.key_events().is_empty());

    desk.clock.set(at("2026-05-04T17:00:10+00:00"));
    let outcome = desk.controller.tick().unwrap();
    assert!(matches!(outcome, TickOutcome::Fired { ref target } if target.process_name == "notepad"));

    assert_eq!(desk.desktop.typed_text(), "RESUME\n");
    assert_eq!(desk.desktop.foreground().map(|h| h.raw()), Some(0x20));
    assert!(!desk.desktop.inhibited());

    let snap = desk.controller.snapshot();
    assert_eq!(snap.state, AppState::Ready);
    assert_eq!(snap.hour_offset.index(), 0);
    assert_eq!(snap.countdown, None);

    // Single-shot: later ticks do nothing.
    desk.clock.advance(ChronoDuration::hours(1));
    assert_eq!(desk.controller.tick().unwrap(), TickOutcome::Stopped);
    assert_eq!(desk.desktop.typed_text(), "RESUME\n");
}

#[test]
fn test_late_evening_rolls_over_midnight() {
    let mut desk = Desk::new("2026-12-31T23:40:00+00:00");
    desk.select_notepad();
    desk.controller.dispatch(Intent::ToggleCountdown).unwrap();
    assert_eq!(
        desk.controller.scheduler().fire_at().map(|t| t.to_rfc3339()),
        Some("2027-01-01T00:00:10+00:00".to_string())
    );
    assert_eq!(
        desk.controller.snapshot().hour_labels,
        vec!["12am", "1am", "2am", "3am", "4am"]
    );
}

#[test]
fn test_shell_click_keeps_capture_running() {
    let mut desk = Desk::new("2026-05-04T14:05:00+00:00");
    desk.controller.dispatch(Intent::BeginCapture).unwrap();
    desk.click(1500, 900);

    assert!(desk.controller.is_capturing());
    assert_eq!(desk.controller.state(), AppState::Idle);

    desk.controller
        .dispatch(Intent::CancelCapture(CancelReason::Escape))
        .unwrap();
    assert!(!desk.desktop.hook_installed());
    assert!(!desk.desktop.click(300, 300));
}

#[test]
fn test_target_closed_before_fire() {
    let mut desk = Desk::new("2026-05-04T14:05:00+00:00");
    desk.select_notepad();
    desk.controller.dispatch(Intent::ToggleCountdown).unwrap();

    let handle = desk.controller.snapshot().target.unwrap().handle;
    desk.desktop.close_window(handle);
    desk.clock.set(at("2026-05-04T15:00:10+00:00"));

    let err = desk.controller.tick().unwrap_err();
    assert!(err.is_warning());
    assert!(matches!(err, ResumeError::TargetGone { .. }));
    assert!(desk.desktop.key_events().is_empty());
    assert!(!desk.controller.is_armed());
    assert!(!desk.desktop.inhibited());
}

#[test]
fn test_stop_is_idempotent_and_prevents_fire() {
    let mut desk = Desk::new("2026-05-04T14:05:00+00:00");
    desk.select_notepad();
    desk.controller.dispatch(Intent::ToggleCountdown).unwrap();
    desk.controller.dispatch(Intent::ToggleCountdown).unwrap();
    desk.controller.shutdown();

    assert_eq!(desk.desktop.inhibit_calls(), 1);
    assert_eq!(desk.desktop.release_calls(), 1);

    desk.clock.set(at("2026-05-04T15:00:10+00:00"));
    assert_eq!(desk.controller.tick().unwrap(), TickOutcome::Stopped);
    assert!(desk.desktop.key_events().is_empty());
}

#[test]
fn test_changes_rejected_while_armed() {
    let mut desk = Desk::new("2026-05-04T14:05:00+00:00");
    desk.select_notepad();
    desk.controller.dispatch(Intent::ToggleCountdown).unwrap();

    assert!(matches!(
        desk.controller.dispatch(Intent::SelectHour(3)),
        Err(ResumeError::CountdownArmed { .. })
    ));
    assert!(matches!(
        desk.controller.dispatch(Intent::BeginCapture),
        Err(ResumeError::CountdownArmed { .. })
    ));
    assert!(matches!(
        desk.controller.dispatch(Intent::SelectHour(5)),
        Err(ResumeError::CountdownArmed { .. })
    ));
    assert_eq!(desk.controller.snapshot().hour_offset.index(), 0);
}

#[test]
fn test_click_queued_before_recapture_is_not_a_selection() {
    let mut desk = Desk::new("2026-05-04T14:05:00+00:00");
    desk.controller.dispatch(Intent::BeginCapture).unwrap();
    assert!(desk.desktop.click(300, 300));
    desk.controller
        .dispatch(Intent::CancelCapture(CancelReason::Escape))
        .unwrap();
    desk.controller.dispatch(Intent::BeginCapture).unwrap();

    let stale = desk.clicks.try_recv().unwrap();
    assert_eq!(desk.controller.on_click(stale).unwrap(), None);
    assert!(desk.controller.is_capturing());
    assert_eq!(desk.controller.state(), AppState::Idle);

    desk.click(300, 300);
    assert_eq!(desk.controller.state(), AppState::Ready);
}
