// src/frame_loop.rs - Capture -> landmarks -> classify -> act, one frame per tick
use std::time::Instant;

use image::RgbImage;
use tracing::{debug, error, info, warn};

use crate::controller::{classify_and_act, Action, ControllerState, RenderHints, VolumeLevel};
use crate::mediapipe_bridge::LandmarkProvider;
use crate::system::ActionExecutor;
use crate::tracking::{Gesture, HandLandmarks};
use crate::video::FrameSource;

pub trait Clock {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    QuitRequested,
    CaptureFailed(String),
    LandmarksFailed(String),
    ShutdownIssued,
}

/// Everything the display needs for one processed frame.
pub struct FrameReport {
    pub frame: RgbImage,
    pub hands: Vec<HandLandmarks>,
    pub hints: RenderHints,
}

pub enum Tick {
    Frame(FrameReport),
    Stopped(StopReason),
}

/// Owns the collaborators and the state carried between frames.
///
/// Frames are processed strictly one after another; once stopped, every
/// further tick reports the same reason without touching the camera.
pub struct FrameLoop {
    source: Box<dyn FrameSource>,
    landmarks: Box<dyn LandmarkProvider>,
    executor: Box<dyn ActionExecutor>,
    clock: Box<dyn Clock>,
    state: ControllerState,
    last_gesture: Gesture,
    frames: u64,
    stopped: Option<StopReason>,
}

impl FrameLoop {
    pub fn new(
        source: Box<dyn FrameSource>,
        landmarks: Box<dyn LandmarkProvider>,
        mut executor: Box<dyn ActionExecutor>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let volume = match executor.get_volume() {
            Ok(percent) => VolumeLevel::new(percent as i32),
            Err(e) => {
                let fallback = VolumeLevel::default();
                warn!(error = %e, fallback = fallback.get(), "Could not read system volume");
                fallback
            }
        };
        info!(volume = volume.get(), "Starting gesture control");

        Self {
            source,
            landmarks,
            executor,
            clock,
            state: ControllerState::new(volume),
            last_gesture: Gesture::None,
            frames: 0,
            stopped: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_some()
    }

    pub fn request_quit(&mut self) {
        if self.stopped.is_none() {
            info!("Quit requested");
            self.stopped = Some(StopReason::QuitRequested);
        }
    }

    pub fn tick(&mut self) -> Tick {
        if let Some(reason) = &self.stopped {
            return Tick::Stopped(reason.clone());
        }

        let frame = match self.source.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Frame capture failed");
                return self.stop(StopReason::CaptureFailed(e.to_string()));
            }
        };

        let hands = match self.landmarks.process(&frame) {
            Ok(hands) => hands,
            Err(e) => {
                error!(error = %e, "Hand landmark inference failed");
                return self.stop(StopReason::LandmarksFailed(e.to_string()));
            }
        };

        let was_counting = self.state.shutdown.is_counting();
        let outcome = classify_and_act(&hands, self.state, self.clock.now());
        self.state = outcome.state;

        match (was_counting, self.state.shutdown.is_counting()) {
            (false, true) => info!("Shutdown countdown started"),
            (true, false) if outcome.action != Some(Action::Shutdown) => info!("Shutdown countdown cancelled"),
            _ => {}
        }
        self.frames += 1;

        if outcome.gesture != self.last_gesture {
            debug!(frame = self.frames, gesture = ?outcome.gesture, "Gesture changed");
            self.last_gesture = outcome.gesture;
        }

        if let Some(action) = outcome.action {
            if self.execute(action) {
                return self.stop(StopReason::ShutdownIssued);
            }
        }

        Tick::Frame(FrameReport {
            frame,
            hands,
            hints: outcome.hints,
        })
    }

    /// Drives the loop without a window. `quit` sees every processed frame.
    pub fn run_until_stopped(&mut self, mut quit: impl FnMut(&FrameReport) -> bool) -> StopReason {
        loop {
            match self.tick() {
                Tick::Frame(report) => {
                    if quit(&report) {
                        self.request_quit();
                    }
                }
                Tick::Stopped(reason) => return reason,
            }
        }
    }

    /// Returns true when the loop must end after this action.
    fn execute(&mut self, action: Action) -> bool {
        match action {
            Action::SetVolume(level) => {
                if let Err(e) = self.executor.set_volume(level) {
                    warn!(error = %e, volume = level.get(), "Volume command failed, keeping local estimate");
                }
                false
            }
            Action::Shutdown => {
                info!("Shutdown gesture held, shutting down");
                if let Err(e) = self.executor.shutdown() {
                    error!(error = %e, "Shutdown command failed");
                }
                true
            }
        }
    }

    fn stop(&mut self, reason: StopReason) -> Tick {
        info!(?reason, frames = self.frames, "Frame loop stopped");
        self.stopped = Some(reason.clone());
        Tick::Stopped(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ControllerError, Result};
    use crate::shutdown::ShutdownTimer;
    use crate::tracking::fixtures::{closed_fist, middle_finger_up, open_hand};
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::time::Duration;

    struct SyntheticCamera {
        remaining: usize,
    }

    impl FrameSource for SyntheticCamera {
        fn read_frame(&mut self) -> Result<RgbImage> {
            if self.remaining == 0 {
                return Err(ControllerError::Capture {
                    reason: "device unplugged".to_string(),
                });
            }
            self.remaining -= 1;
            Ok(RgbImage::new(4, 3))
        }
    }

    /// Replays canned landmark sets; runs out into "no hand".
    struct ScriptedLandmarks {
        frames: VecDeque<Result<Vec<HandLandmarks>>>,
    }

    impl ScriptedLandmarks {
        fn new(frames: Vec<Vec<HandLandmarks>>) -> Self {
            Self {
                frames: frames.into_iter().map(Ok).collect(),
            }
        }
    }

    impl LandmarkProvider for ScriptedLandmarks {
        fn process(&mut self, _frame: &RgbImage) -> Result<Vec<HandLandmarks>> {
            self.frames.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        SetVolume(u8),
        Shutdown,
    }

    #[derive(Default)]
    struct RecordingExecutor {
        calls: Rc<RefCell<Vec<Call>>>,
        initial_volume: Option<u8>,
        fail_set_volume: bool,
    }

    impl ActionExecutor for RecordingExecutor {
        fn get_volume(&mut self) -> Result<u8> {
            self.initial_volume.ok_or_else(|| ControllerError::Command {
                program: "osascript".to_string(),
                reason: "not permitted".to_string(),
            })
        }

        fn set_volume(&mut self, level: VolumeLevel) -> Result<()> {
            self.calls.borrow_mut().push(Call::SetVolume(level.get()));
            if self.fail_set_volume {
                return Err(ControllerError::Command {
                    program: "pactl".to_string(),
                    reason: "exited with 1".to_string(),
                });
            }
            Ok(())
        }

        fn shutdown(&mut self) -> Result<()> {
            self.calls.borrow_mut().push(Call::Shutdown);
            Ok(())
        }
    }

    /// Advances by a fixed step every time it is read.
    struct ManualClock {
        next: Cell<Instant>,
        step: Duration,
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            let now = self.next.get();
            self.next.set(now + self.step);
            now
        }
    }

    struct Harness {
        frame_loop: FrameLoop,
        calls: Rc<RefCell<Vec<Call>>>,
    }

    fn harness(frames: Vec<Vec<HandLandmarks>>, executor: RecordingExecutor, step_ms: u64) -> Harness {
        let calls = executor.calls.clone();
        let camera = SyntheticCamera { remaining: frames.len() };
        let frame_loop = FrameLoop::new(
            Box::new(camera),
            Box::new(ScriptedLandmarks::new(frames)),
            Box::new(executor),
            Box::new(ManualClock {
                next: Cell::new(Instant::now()),
                step: Duration::from_millis(step_ms),
            }),
        );
        Harness { frame_loop, calls }
    }

    fn executor_at(volume: u8) -> RecordingExecutor {
        RecordingExecutor {
            initial_volume: Some(volume),
            ..RecordingExecutor::default()
        }
    }

    fn volumes_per_frame(frame_loop: &mut FrameLoop) -> (Vec<u8>, StopReason) {
        let mut volumes = Vec::new();
        let reason = frame_loop.run_until_stopped(|report| {
            volumes.push(report.hints.volume_percent);
            false
        });
        (volumes, reason)
    }

    #[test]
    fn gesture_sequence_drives_system_volume() {
        let frames = vec![vec![closed_fist()], vec![closed_fist()], vec![], vec![open_hand()]];
        let mut h = harness(frames, executor_at(50), 33);

        let (volumes, reason) = volumes_per_frame(&mut h.frame_loop);

        assert_eq!(volumes, vec![48, 46, 46, 48]);
        assert_eq!(
            *h.calls.borrow(),
            vec![Call::SetVolume(48), Call::SetVolume(46), Call::SetVolume(48)]
        );
        assert!(matches!(reason, StopReason::CaptureFailed(_)));
    }

    #[test]
    fn capture_failure_ends_the_loop_for_good() {
        let mut h = harness(vec![vec![open_hand()]], executor_at(10), 33);

        assert!(matches!(h.frame_loop.tick(), Tick::Frame(_)));
        assert!(matches!(h.frame_loop.tick(), Tick::Stopped(StopReason::CaptureFailed(_))));
        assert!(matches!(h.frame_loop.tick(), Tick::Stopped(StopReason::CaptureFailed(_))));
        assert_eq!(h.frame_loop.frames(), 1);
        assert!(h.frame_loop.is_stopped());
    }

    #[test]
    fn holding_middle_finger_shuts_down_once_and_stops() {
        let frames = vec![vec![middle_finger_up()]; 60];
        let mut h = harness(frames, executor_at(40), 100);

        let reason = h.frame_loop.run_until_stopped(|_| false);

        assert_eq!(reason, StopReason::ShutdownIssued);
        assert_eq!(*h.calls.borrow(), vec![Call::Shutdown]);
        // Frames at 0.0s .. 3.0s, the last one fires.
        assert_eq!(h.frame_loop.frames(), 31);
        assert_eq!(h.frame_loop.state().shutdown, ShutdownTimer::Fired);

        assert!(matches!(h.frame_loop.tick(), Tick::Stopped(StopReason::ShutdownIssued)));
        assert_eq!(h.calls.borrow().len(), 1);
    }

    #[test]
    fn short_hold_then_release_never_shuts_down() {
        // 30 frames at 100ms cover 0.0s .. 2.9s.
        let mut frames = vec![vec![middle_finger_up()]; 30];
        frames.push(vec![]);
        let mut h = harness(frames, executor_at(40), 100);

        let reason = h.frame_loop.run_until_stopped(|_| false);

        assert!(matches!(reason, StopReason::CaptureFailed(_)));
        assert!(h.calls.borrow().is_empty());
        assert_eq!(h.frame_loop.state().shutdown, ShutdownTimer::Idle);
    }

    #[test]
    fn interrupted_holds_do_not_accumulate() {
        let mut frames = vec![vec![middle_finger_up()]; 21];
        frames.push(vec![open_hand()]);
        frames.extend(vec![vec![middle_finger_up()]; 30]);
        let mut h = harness(frames, executor_at(40), 100);

        let reason = h.frame_loop.run_until_stopped(|_| false);

        assert!(matches!(reason, StopReason::CaptureFailed(_)));
        assert_eq!(*h.calls.borrow(), vec![Call::SetVolume(42)]);
        assert!(h.frame_loop.state().shutdown.is_counting());
    }

    #[test]
    fn failed_volume_command_keeps_the_estimate() {
        let executor = RecordingExecutor {
            initial_volume: Some(20),
            fail_set_volume: true,
            ..RecordingExecutor::default()
        };
        let mut h = harness(vec![vec![open_hand()]; 3], executor, 33);

        let (volumes, _) = volumes_per_frame(&mut h.frame_loop);

        assert_eq!(volumes, vec![22, 24, 26]);
        assert_eq!(h.frame_loop.state().volume.get(), 26);
    }

    #[test]
    fn unreadable_system_volume_starts_mid_scale() {
        let h = harness(vec![], RecordingExecutor::default(), 33);
        assert_eq!(h.frame_loop.state().volume.get(), 50);
    }

    #[test]
    fn quit_stops_before_the_next_capture() {
        let mut h = harness(vec![vec![open_hand()]; 10], executor_at(50), 33);

        let reason = h.frame_loop.run_until_stopped(|report| report.hints.volume_percent >= 54);

        assert_eq!(reason, StopReason::QuitRequested);
        assert_eq!(h.frame_loop.frames(), 2);
    }

    #[test]
    fn landmark_failure_stops_the_loop() {
        let landmarks = ScriptedLandmarks {
            frames: VecDeque::from(vec![
                Ok(vec![open_hand()]),
                Err(ControllerError::SidecarProtocol {
                    reason: "sidecar closed its output".to_string(),
                }),
            ]),
        };
        let mut frame_loop = FrameLoop::new(
            Box::new(SyntheticCamera { remaining: 5 }),
            Box::new(landmarks),
            Box::new(executor_at(50)),
            Box::new(SystemClock),
        );

        let reason = frame_loop.run_until_stopped(|_| false);

        assert!(matches!(reason, StopReason::LandmarksFailed(_)));
        assert_eq!(frame_loop.frames(), 1);
    }

    #[test]
    fn all_hands_are_reported_for_display() {
        let mut h = harness(vec![vec![open_hand(), closed_fist()]], executor_at(50), 33);

        match h.frame_loop.tick() {
            Tick::Frame(report) => {
                assert_eq!(report.hands.len(), 2);
                assert_eq!(report.hints.gesture, Gesture::OpenHand);
                assert_eq!(report.hints.fingertips.len(), 2);
            }
            Tick::Stopped(reason) => panic!("stopped early: {reason:?}"),
        }
    }
}
