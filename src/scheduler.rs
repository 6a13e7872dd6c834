//! Countdown state machine.
//!
//! Owns the target, the hour selection and the single-shot countdown.
//! `Stopped -> Armed` needs a target; `Armed -> Stopped` happens on a manual
//! stop or when a tick finds the fire instant reached. The sleep inhibition
//! taken at arm time lives inside the armed state, so leaving that state in
//! any way (stop, fire, drop at process exit) releases it exactly once.

use chrono::{DateTime, Duration};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{ResumeError, Result};
use crate::platform::SleepInhibitor;
use crate::schedule::{fire_instant, format_countdown, HourOffset};
use crate::sender::ResumeDelivery;
use crate::target::TargetWindow;

/// Projection of (target present, countdown armed) for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AppState {
    /// No target selected.
    Idle,
    /// Target selected, countdown stopped.
    Ready,
    /// Countdown armed.
    Waiting,
}

struct SleepGuard {
    inhibitor: Arc<dyn SleepInhibitor>,
}

impl Drop for SleepGuard {
    fn drop(&mut self) {
        self.inhibitor.release();
        debug!("sleep inhibition released");
    }
}

enum Countdown<Tz: chrono::TimeZone> {
    Stopped,
    Armed {
        fire_at: DateTime<Tz>,
        _sleep: Option<SleepGuard>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing armed.
    Stopped,
    /// Still counting down.
    Pending { remaining: Duration },
    /// The resume sequence went out; the countdown is now stopped.
    Fired { target: TargetWindow },
}

pub struct TargetResumeScheduler<C: Clock> {
    clock: C,
    inhibitor: Arc<dyn SleepInhibitor>,
    grace: Duration,
    target: Option<TargetWindow>,
    hour_offset: HourOffset,
    countdown: Countdown<C::Tz>,
}

impl<C: Clock> TargetResumeScheduler<C> {
    pub fn new(clock: C, inhibitor: Arc<dyn SleepInhibitor>, grace: Duration) -> Self {
        Self {
            clock,
            inhibitor,
            grace,
            target: None,
            hour_offset: HourOffset::default(),
            countdown: Countdown::Stopped,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn target(&self) -> Option<&TargetWindow> {
        self.target.as_ref()
    }

    pub fn hour_offset(&self) -> HourOffset {
        self.hour_offset
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.countdown, Countdown::Armed { .. })
    }

    pub fn fire_at(&self) -> Option<&DateTime<C::Tz>> {
        match &self.countdown {
            Countdown::Armed { fire_at, .. } => Some(fire_at),
            Countdown::Stopped => None,
        }
    }

    pub fn state(&self) -> AppState {
        if self.is_armed() {
            AppState::Waiting
        } else if self.target.is_some() {
            AppState::Ready
        } else {
            AppState::Idle
        }
    }

    /// Replaces the target. Rejected while armed.
    pub fn set_target(&mut self, target: TargetWindow) -> Result<()> {
        if self.is_armed() {
            return Err(ResumeError::countdown_armed("change the target"));
        }
        self.target = Some(target);
        Ok(())
    }

    /// Drops the target, returning the previous one. Rejected while armed.
    pub fn clear_target(&mut self) -> Result<Option<TargetWindow>> {
        if self.is_armed() {
            return Err(ResumeError::countdown_armed("clear the target"));
        }
        Ok(self.target.take())
    }

    pub fn select_hour_offset(&mut self, index: usize) -> Result<HourOffset> {
        if self.is_armed() {
            return Err(ResumeError::countdown_armed("change the hour"));
        }
        self.hour_offset = HourOffset::try_from(index)?;
        Ok(self.hour_offset)
    }

    /// Arms the countdown and returns the fire instant, which is computed
    /// once here and never recomputed while armed.
    pub fn start(&mut self) -> Result<DateTime<C::Tz>> {
        if self.is_armed() {
            return Err(ResumeError::AlreadyArmed);
        }
        let Some(target) = &self.target else {
            return Err(ResumeError::NoTarget);
        };

        let now = self.clock.now();
        let fire_at = fire_instant(&now, self.hour_offset, self.grace);

        let sleep = match self.inhibitor.inhibit() {
            Ok(()) => Some(SleepGuard {
                inhibitor: Arc::clone(&self.inhibitor),
            }),
            Err(e) => {
                warn!(error = %e, "could not keep the system awake; countdown continues");
                None
            }
        };

        info!(
            handle = %target.handle,
            offset = %self.hour_offset,
            fire_at = ?fire_at,
            "countdown armed"
        );
        self.countdown = Countdown::Armed {
            fire_at: fire_at.clone(),
            _sleep: sleep,
        };
        Ok(fire_at)
    }

    /// Disarms and releases sleep inhibition. Returns whether anything was
    /// armed; stopping a stopped countdown is a no-op.
    pub fn stop(&mut self) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.countdown = Countdown::Stopped;
        info!("countdown stopped");
        true
    }

    /// Time left until firing, never negative. `None` when stopped.
    pub fn remaining(&self) -> Option<Duration> {
        self.fire_at().map(|fire_at| {
            fire_at
                .clone()
                .signed_duration_since(self.clock.now())
                .max(Duration::zero())
        })
    }

    /// Remaining time as `HH:MM:SS`. `None` when stopped.
    pub fn countdown_text(&self) -> Option<String> {
        self.remaining().map(format_countdown)
    }

    /// Fires once the wall clock reaches the fire instant, then disarms and
    /// resets the hour selection. The countdown is disarmed even when
    /// delivery fails, so a later tick can never fire twice.
    pub fn tick(&mut self, delivery: &mut dyn ResumeDelivery) -> Result<TickOutcome> {
        let fire_at = match &self.countdown {
            Countdown::Armed { fire_at, .. } => fire_at.clone(),
            Countdown::Stopped => return Ok(TickOutcome::Stopped),
        };

        let now = self.clock.now();
        if now < fire_at {
            return Ok(TickOutcome::Pending {
                remaining: fire_at.signed_duration_since(now),
            });
        }

        let delivered = match self.target.clone() {
            Some(target) => delivery.fire(&target).map(|()| target),
            None => Err(ResumeError::NoTarget),
        };

        self.stop();
        self.hour_offset = HourOffset::default();

        delivered.map(|target| TickOutcome::Fired { target })
    }
}
