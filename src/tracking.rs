// src/tracking.rs - Finger states and gesture classification from hand landmarks
use nalgebra::Vector3;

use crate::error::{ControllerError, Result};

pub const LANDMARK_COUNT: usize = 21;

/// MediaPipe hand landmark indices
/// See: https://google.github.io/mediapipe/solutions/hands.html
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_DIP: usize = 15;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_TIP: usize = 20;
}

/// Bone pairs of the 21-point hand skeleton, used for drawing.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];

/// One detected hand: 21 normalized points, smaller y is higher in the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    points: [Vector3<f64>; LANDMARK_COUNT],
    pub handedness: String,
    pub score: f64,
}

impl HandLandmarks {
    pub fn new(points: Vec<Vector3<f64>>, handedness: impl Into<String>, score: f64) -> Result<Self> {
        let points: [Vector3<f64>; LANDMARK_COUNT] = points
            .try_into()
            .map_err(|rejected: Vec<Vector3<f64>>| ControllerError::LandmarkCount {
                count: rejected.len(),
            })?;

        Ok(Self {
            points,
            handedness: handedness.into(),
            score,
        })
    }

    pub fn point(&self, index: usize) -> &Vector3<f64> {
        &self.points[index]
    }

    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }

    /// Fingertip heights, shown on the overlay for debugging poses.
    pub fn fingertip_summary(&self) -> String {
        format!(
            "Thumb: {:.2}, Index: {:.2}, Middle: {:.2}, Ring: {:.2}, Pinky: {:.2}",
            self.points[landmarks::THUMB_TIP].y,
            self.points[landmarks::INDEX_TIP].y,
            self.points[landmarks::MIDDLE_TIP].y,
            self.points[landmarks::RING_TIP].y,
            self.points[landmarks::PINKY_TIP].y,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    pub fn tip(self) -> usize {
        match self {
            Finger::Thumb => landmarks::THUMB_TIP,
            Finger::Index => landmarks::INDEX_TIP,
            Finger::Middle => landmarks::MIDDLE_TIP,
            Finger::Ring => landmarks::RING_TIP,
            Finger::Pinky => landmarks::PINKY_TIP,
        }
    }
}

/// Which joint each fingertip is compared against.
///
/// The middle-finger rule measures index and ring against their DIP joints
/// (7 and 15) while the open/fist rules use the knuckles (5 and 13). Tuning
/// one set changes detection sensitivity of that gesture only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseJoints {
    FullHand,
    MiddleFinger,
}

impl BaseJoints {
    pub fn base_of(self, finger: Finger) -> usize {
        match (self, finger) {
            (_, Finger::Thumb) => landmarks::THUMB_MCP,
            (BaseJoints::FullHand, Finger::Index) => landmarks::INDEX_MCP,
            (BaseJoints::MiddleFinger, Finger::Index) => landmarks::INDEX_DIP,
            (_, Finger::Middle) => landmarks::MIDDLE_MCP,
            (BaseJoints::FullHand, Finger::Ring) => landmarks::RING_MCP,
            (BaseJoints::MiddleFinger, Finger::Ring) => landmarks::RING_DIP,
            (_, Finger::Pinky) => landmarks::PINKY_MCP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerState {
    /// Tip above its base joint.
    Extended,
    /// Tip below its base joint.
    Bent,
    /// Tip exactly level with its base joint; counts as neither.
    Level,
}

impl FingerState {
    fn from_heights(tip_y: f64, base_y: f64) -> Self {
        if tip_y > base_y {
            FingerState::Bent
        } else if tip_y < base_y {
            FingerState::Extended
        } else {
            FingerState::Level
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerStates {
    pub thumb: FingerState,
    pub index: FingerState,
    pub middle: FingerState,
    pub ring: FingerState,
    pub pinky: FingerState,
}

impl FingerStates {
    pub fn get(&self, finger: Finger) -> FingerState {
        match finger {
            Finger::Thumb => self.thumb,
            Finger::Index => self.index,
            Finger::Middle => self.middle,
            Finger::Ring => self.ring,
            Finger::Pinky => self.pinky,
        }
    }

    pub fn all(&self, state: FingerState) -> bool {
        Finger::ALL.iter().all(|&finger| self.get(finger) == state)
    }
}

pub fn extract_states(hand: &HandLandmarks, bases: BaseJoints) -> FingerStates {
    let state = |finger: Finger| {
        FingerState::from_heights(hand.point(finger.tip()).y, hand.point(bases.base_of(finger)).y)
    };

    FingerStates {
        thumb: state(Finger::Thumb),
        index: state(Finger::Index),
        middle: state(Finger::Middle),
        ring: state(Finger::Ring),
        pinky: state(Finger::Pinky),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    OpenHand,
    ClosedFist,
    MiddleFingerUp,
    None,
}

impl Gesture {
    pub fn label(&self) -> &'static str {
        match self {
            Gesture::OpenHand => "Open hand",
            Gesture::ClosedFist => "Closed fist",
            Gesture::MiddleFingerUp => "Middle finger",
            Gesture::None => "No gesture",
        }
    }
}

/// Classifies one hand. Rules are checked in priority order and the first
/// match wins, so the middle-finger pose shadows open/fist.
pub fn classify(hand: &HandLandmarks) -> Gesture {
    let pointing = extract_states(hand, BaseJoints::MiddleFinger);
    if pointing.middle == FingerState::Extended
        && pointing.index == FingerState::Bent
        && pointing.ring == FingerState::Bent
    {
        return Gesture::MiddleFingerUp;
    }

    let full = extract_states(hand, BaseJoints::FullHand);
    if full.all(FingerState::Bent) {
        Gesture::ClosedFist
    } else if full.all(FingerState::Extended) {
        Gesture::OpenHand
    } else {
        Gesture::None
    }
}

/// Only the first detected hand drives actions; the rest are display-only.
pub fn classify_frame(hands: &[HandLandmarks]) -> Gesture {
    hands.first().map(classify).unwrap_or(Gesture::None)
}
