//! Owner-thread event loop.
//!
//! All mutation of core state happens here, one event at a time: intents
//! from presentation, clicks marshaled from the global listener and the
//! once-per-second tick while a countdown is armed.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::controller::{AppController, Intent, Snapshot};
use crate::error::ResumeError;
use crate::platform::ClickEvent;
use crate::scheduler::TickOutcome;
use crate::target::TargetWindow;

/// Something presentation should surface to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    TargetAcquired(TargetWindow),
    Fired(TargetWindow),
    Warning(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Snapshot(Snapshot),
    Notice(Notice),
}

pub struct EventLoop<C: Clock> {
    controller: AppController<C>,
    intents: UnboundedReceiver<Intent>,
    clicks: UnboundedReceiver<ClickEvent>,
    ui: UnboundedSender<UiEvent>,
    tick_interval: Duration,
}

impl<C: Clock> EventLoop<C> {
    pub fn new(
        controller: AppController<C>,
        intents: UnboundedReceiver<Intent>,
        clicks: UnboundedReceiver<ClickEvent>,
        ui: UnboundedSender<UiEvent>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            controller,
            intents,
            clicks,
            ui,
            tick_interval,
        }
    }

    /// Runs until `Quit`, until every intent sender is gone or until
    /// `shutdown` resolves. The countdown is stopped and the listener
    /// removed before returning.
    pub async fn run<F>(mut self, shutdown: F) -> AppController<C>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker: Option<Interval> = None;
        self.publish_snapshot();

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                intent = self.intents.recv() => match intent {
                    None | Some(Intent::Quit) => break,
                    Some(intent) => self.apply(intent),
                },
                Some(click) = self.clicks.recv() => self.on_click(click),
                _ = next_tick(&mut ticker) => self.on_tick(),
            }

            self.sync_ticker(&mut ticker);
            self.publish_snapshot();
        }

        self.controller.shutdown();
        self.publish_snapshot();
        info!("event loop stopped");
        self.controller
    }

    fn apply(&mut self, intent: Intent) {
        debug!(?intent, "applying intent");
        if let Err(e) = self.controller.dispatch(intent) {
            self.report(e);
        }
    }

    fn on_click(&mut self, click: ClickEvent) {
        match self.controller.on_click(click) {
            Ok(Some(target)) => self.notify(Notice::TargetAcquired(target)),
            Ok(None) => {}
            Err(e) => self.report(e),
        }
    }

    fn on_tick(&mut self) {
        match self.controller.tick() {
            Ok(TickOutcome::Fired { target }) => self.notify(Notice::Fired(target)),
            Ok(TickOutcome::Pending { .. } | TickOutcome::Stopped) => {}
            Err(e) => self.report(e),
        }
    }

    fn sync_ticker(&self, ticker: &mut Option<Interval>) {
        match (self.controller.is_armed(), ticker.is_some()) {
            (true, false) => {
                let mut interval =
                    interval_at(Instant::now() + self.tick_interval, self.tick_interval);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                *ticker = Some(interval);
            }
            (false, true) => *ticker = None,
            _ => {}
        }
    }

    fn report(&self, e: ResumeError) {
        if e.is_warning() {
            warn!(error = %e, "operation failed");
            self.notify(Notice::Warning(e.to_string()));
        } else {
            error!(error = %e, "operation failed");
            self.notify(Notice::Error(e.to_string()));
        }
    }

    fn notify(&self, notice: Notice) {
        let _ = self.ui.send(UiEvent::Notice(notice));
    }

    fn publish_snapshot(&self) {
        let _ = self.ui.send(UiEvent::Snapshot(self.controller.snapshot()));
    }
}

/// Pending forever while no ticker is running.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
