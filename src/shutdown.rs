// src/shutdown.rs - Hold-to-confirm countdown gating the shutdown action
use std::time::{Duration, Instant};

/// How long the shutdown gesture must be held without interruption.
pub const SHUTDOWN_HOLD: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownTimer {
    #[default]
    Idle,
    CountingDown {
        started_at: Instant,
    },
    /// Terminal for the session; never fires twice.
    Fired,
}

/// What the overlay and frame loop should do after one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Inactive,
    Remaining(u64),
    Fire,
    Spent,
}

impl ShutdownTimer {
    /// Feeds one frame into the timer. `holding` is whether this frame showed
    /// the shutdown gesture; elapsed time is measured on the wall clock from
    /// the first frame of the current uninterrupted run.
    pub fn observe(&mut self, holding: bool, now: Instant) -> Countdown {
        let started_at = match (*self, holding) {
            (ShutdownTimer::Fired, _) => return Countdown::Spent,
            (_, false) => {
                *self = ShutdownTimer::Idle;
                return Countdown::Inactive;
            }
            (ShutdownTimer::Idle, true) => {
                *self = ShutdownTimer::CountingDown { started_at: now };
                now
            }
            (ShutdownTimer::CountingDown { started_at }, true) => started_at,
        };

        let elapsed = now.saturating_duration_since(started_at);
        if elapsed >= SHUTDOWN_HOLD {
            *self = ShutdownTimer::Fired;
            Countdown::Fire
        } else {
            Countdown::Remaining(SHUTDOWN_HOLD.as_secs() - elapsed.as_secs())
        }
    }

    pub fn is_counting(&self) -> bool {
        matches!(self, ShutdownTimer::CountingDown { .. })
    }
}
