// src/controller.rs - Per-frame gesture classification and the actions it triggers
use std::fmt;
use std::time::Instant;

use crate::shutdown::{Countdown, ShutdownTimer};
use crate::tracking::{classify_frame, Gesture, HandLandmarks};

/// Volume change applied on every open-hand or fist frame.
pub const VOLUME_STEP: u8 = 2;

/// System output volume in percent, always within 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VolumeLevel(u8);

impl VolumeLevel {
    pub const MAX: u8 = 100;

    pub fn new(percent: i32) -> Self {
        Self(percent.clamp(0, Self::MAX as i32) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn raised(self) -> Self {
        Self::new(self.0 as i32 + VOLUME_STEP as i32)
    }

    pub fn lowered(self) -> Self {
        Self::new(self.0 as i32 - VOLUME_STEP as i32)
    }
}

impl Default for VolumeLevel {
    /// Used when the OS volume cannot be read at startup.
    fn default() -> Self {
        Self(50)
    }
}

impl fmt::Display for VolumeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything the controller carries from one frame to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerState {
    pub volume: VolumeLevel,
    pub shutdown: ShutdownTimer,
}

impl ControllerState {
    pub fn new(volume: VolumeLevel) -> Self {
        Self {
            volume,
            shutdown: ShutdownTimer::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SetVolume(VolumeLevel),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Raise,
    Lower,
    Warning,
}

/// What the overlay shows for a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderHints {
    pub gesture: Gesture,
    pub countdown: Option<u64>,
    pub volume_percent: u8,
    pub status: Option<String>,
    pub tone: Tone,
    pub fingertips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub gesture: Gesture,
    pub state: ControllerState,
    pub action: Option<Action>,
    pub hints: RenderHints,
}

/// Classifies the first hand of a frame and advances the controller state.
///
/// Pure: the returned action is for the caller to execute.
pub fn classify_and_act(hands: &[HandLandmarks], state: ControllerState, now: Instant) -> FrameOutcome {
    let gesture = classify_frame(hands);
    let mut shutdown = state.shutdown;
    let mut volume = state.volume;

    let countdown = shutdown.observe(gesture == Gesture::MiddleFingerUp, now);

    let (action, status, tone, remaining) = match (gesture, countdown) {
        (Gesture::MiddleFingerUp, Countdown::Remaining(secs)) => (
            None,
            Some(format!("Shutting down in {} seconds...", secs)),
            Tone::Warning,
            Some(secs),
        ),
        (Gesture::MiddleFingerUp, Countdown::Fire) => (
            Some(Action::Shutdown),
            Some("Shutting down...".to_string()),
            Tone::Warning,
            Some(0),
        ),
        (Gesture::ClosedFist, _) => {
            volume = volume.lowered();
            (
                Some(Action::SetVolume(volume)),
                Some(format!("Lowering volume: {}%", volume)),
                Tone::Lower,
                None,
            )
        }
        (Gesture::OpenHand, _) => {
            volume = volume.raised();
            (
                Some(Action::SetVolume(volume)),
                Some(format!("Raising volume: {}%", volume)),
                Tone::Raise,
                None,
            )
        }
        _ => (None, None, Tone::Neutral, None),
    };

    FrameOutcome {
        gesture,
        state: ControllerState { volume, shutdown },
        action,
        hints: RenderHints {
            gesture,
            countdown: remaining,
            volume_percent: volume.get(),
            status,
            tone,
            fingertips: hands.iter().map(HandLandmarks::fingertip_summary).collect(),
        },
    }
}
