// src/mediapipe_bridge.rs - Hand landmarks from a MediaPipe sidecar process
//
// MediaPipe has no Rust bindings, so inference runs in a helper process
// (`sidecar/hand_landmarks.py`). Protocol, one request per frame:
//   startup  <- "READY\n"
//   request  -> width u32 LE, height u32 LE, channels u32 LE, raw RGB bytes
//   reply    <- one JSON line: {"hands":[{"handedness","score","landmarks":[{x,y,z}..]}],"error":null}
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use image::RgbImage;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{ControllerError, Result};
use crate::tracking::HandLandmarks;

/// Source of per-frame hand landmarks. An empty result means no hand.
pub trait LandmarkProvider {
    fn process(&mut self, frame: &RgbImage) -> Result<Vec<HandLandmarks>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkSettings {
    /// Interpreter used to run the sidecar script.
    pub program: PathBuf,
    pub script: PathBuf,
    pub max_num_hands: u32,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for LandmarkSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("python3"),
            script: PathBuf::from("sidecar/hand_landmarks.py"),
            max_num_hands: 1,
            min_detection_confidence: 0.7,
            min_tracking_confidence: 0.5,
        }
    }
}

#[derive(Deserialize, Debug)]
struct LandmarkJson {
    x: f64,
    y: f64,
    #[serde(default)]
    z: f64,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default)]
    handedness: String,
    #[serde(default)]
    score: f64,
    landmarks: Vec<LandmarkJson>,
}

#[derive(Deserialize, Debug)]
struct DetectionReply {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// Decodes one reply line. A sidecar-reported error counts as "no hand" for
/// that frame; hands with the wrong number of points are skipped.
pub fn parse_reply(line: &str) -> Result<Vec<HandLandmarks>> {
    let reply: DetectionReply = serde_json::from_str(line).map_err(|e| ControllerError::SidecarProtocol {
        reason: format!("{}: {:?}", e, line.trim()),
    })?;

    if let Some(error) = reply.error {
        warn!(%error, "Landmark sidecar reported an error");
        return Ok(Vec::new());
    }

    let mut hands = Vec::with_capacity(reply.hands.len());
    for hand in reply.hands {
        let points = hand
            .landmarks
            .iter()
            .map(|lm| Vector3::new(lm.x, lm.y, lm.z))
            .collect();
        match HandLandmarks::new(points, hand.handedness, hand.score) {
            Ok(landmarks) => hands.push(landmarks),
            Err(e) => warn!(error = %e, "Skipping malformed hand"),
        }
    }
    Ok(hands)
}

pub struct MediaPipeSidecar {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl MediaPipeSidecar {
    #[instrument]
    pub fn spawn(settings: &LandmarkSettings) -> Result<Self> {
        if !settings.script.exists() {
            return Err(ControllerError::SidecarStart {
                reason: format!("script not found at {:?}", settings.script),
            });
        }

        info!(program = ?settings.program, script = ?settings.script, "Starting MediaPipe hand landmark sidecar");

        let mut process = Command::new(&settings.program)
            .arg(&settings.script)
            .arg("--max-num-hands")
            .arg(settings.max_num_hands.to_string())
            .arg("--min-detection-confidence")
            .arg(settings.min_detection_confidence.to_string())
            .arg("--min-tracking-confidence")
            .arg(settings.min_tracking_confidence.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| ControllerError::SidecarStart {
                reason: format!("failed to run {:?}: {}", settings.program, e),
            })?;

        let (Some(stdin), Some(stdout)) = (process.stdin.take(), process.stdout.take()) else {
            return Err(abandon(
                process,
                ControllerError::SidecarStart {
                    reason: "child pipes unavailable".to_string(),
                },
            ));
        };
        let mut stdout = BufReader::new(stdout);

        let mut ready = String::new();
        if let Err(e) = stdout.read_line(&mut ready) {
            return Err(abandon(process, ControllerError::SidecarIo(e)));
        }
        if ready.trim() != "READY" {
            return Err(abandon(
                process,
                ControllerError::SidecarStart {
                    reason: format!("expected READY, got {:?}", ready.trim()),
                },
            ));
        }

        info!("MediaPipe sidecar ready");
        Ok(Self {
            process,
            stdin,
            stdout,
        })
    }
}

/// Reaps a sidecar that failed its handshake and hands back the error.
fn abandon(mut process: Child, error: ControllerError) -> ControllerError {
    let _ = process.kill();
    let _ = process.wait();
    error
}

impl LandmarkProvider for MediaPipeSidecar {
    fn process(&mut self, frame: &RgbImage) -> Result<Vec<HandLandmarks>> {
        let header = [frame.width(), frame.height(), 3u32];
        for value in header {
            self.stdin.write_all(&value.to_le_bytes()).map_err(ControllerError::SidecarIo)?;
        }
        self.stdin.write_all(frame.as_raw()).map_err(ControllerError::SidecarIo)?;
        self.stdin.flush().map_err(ControllerError::SidecarIo)?;

        let mut line = String::new();
        let read = self.stdout.read_line(&mut line).map_err(ControllerError::SidecarIo)?;
        if read == 0 {
            return Err(ControllerError::SidecarProtocol {
                reason: "sidecar closed its output".to_string(),
            });
        }

        let hands = parse_reply(&line)?;
        if let Some(first) = hands.first() {
            debug!(hands = hands.len(), handedness = %first.handedness, score = first.score, "Hands detected");
        }
        Ok(hands)
    }
}

impl Drop for MediaPipeSidecar {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}
