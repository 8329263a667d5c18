// src/lib.rs - Gesture classification, capture and system control shared by the binaries
pub mod config;
pub mod controller;
pub mod error;
pub mod frame_loop;
pub mod mediapipe_bridge;
pub mod shutdown;
pub mod system;
pub mod tracking;
pub mod video;
