// src/system.rs - OS volume and power commands
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::controller::VolumeLevel;
use crate::error::{ControllerError, Result};

/// Side effects the controller can ask for.
///
/// Calls are fire-and-forget from the controller's point of view: the caller
/// logs failures and keeps its own volume estimate.
pub trait ActionExecutor {
    fn get_volume(&mut self) -> Result<u8>;
    fn set_volume(&mut self, level: VolumeLevel) -> Result<()>;
    fn shutdown(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SystemBackend {
    /// Pick the backend for the platform we were compiled for.
    #[default]
    Auto,
    Macos,
    Linux,
    /// Log commands instead of running them.
    DryRun,
}

impl SystemBackend {
    pub fn resolve(self) -> Self {
        match self {
            SystemBackend::Auto if cfg!(target_os = "macos") => SystemBackend::Macos,
            SystemBackend::Auto if cfg!(target_os = "linux") => SystemBackend::Linux,
            SystemBackend::Auto => {
                warn!("No volume backend for this platform, commands will only be logged");
                SystemBackend::DryRun
            }
            other => other,
        }
    }
}

pub fn executor_for(backend: SystemBackend) -> Box<dyn ActionExecutor> {
    let resolved = backend.resolve();
    info!(backend = ?resolved, "Using system backend");
    match resolved {
        SystemBackend::Macos => Box::new(MacOsExecutor),
        SystemBackend::Linux => Box::new(LinuxExecutor),
        SystemBackend::Auto | SystemBackend::DryRun => Box::new(DryRunExecutor::default()),
    }
}

/// Runs a program without a shell and returns its trimmed stdout.
fn run_command(program: &str, args: &[&str]) -> Result<String> {
    debug!(program, ?args, "Running system command");

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| ControllerError::Command {
            program: program.to_string(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ControllerError::Command {
            program: program.to_string(),
            reason: format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn unparseable(program: &str, output: &str) -> ControllerError {
    ControllerError::Command {
        program: program.to_string(),
        reason: format!("unexpected volume output {:?}", output),
    }
}

/// AppleScript through `osascript`.
pub struct MacOsExecutor;

impl MacOsExecutor {
    const PROGRAM: &'static str = "osascript";

    fn script(script: &str) -> Result<String> {
        run_command(Self::PROGRAM, &["-e", script])
    }
}

pub fn parse_osascript_volume(output: &str) -> Option<u8> {
    output
        .trim()
        .parse::<i32>()
        .ok()
        .map(|v| VolumeLevel::new(v).get())
}

impl ActionExecutor for MacOsExecutor {
    #[instrument(skip(self))]
    fn get_volume(&mut self) -> Result<u8> {
        let output = Self::script("output volume of (get volume settings)")?;
        parse_osascript_volume(&output).ok_or_else(|| unparseable(Self::PROGRAM, &output))
    }

    fn set_volume(&mut self, level: VolumeLevel) -> Result<()> {
        Self::script(&format!("set volume output volume {}", level.get())).map(|_| ())
    }

    #[instrument(skip(self))]
    fn shutdown(&mut self) -> Result<()> {
        Self::script("tell app \"System Events\" to shut down").map(|_| ())
    }
}

/// PulseAudio/PipeWire through `pactl`, power through systemd.
pub struct LinuxExecutor;

impl LinuxExecutor {
    const SINK: &'static str = "@DEFAULT_SINK@";
}

/// Reads the first channel percentage from `pactl get-sink-volume`, e.g.
/// `Volume: front-left: 32768 /  50% / -18.06 dB,   front-right: ...`.
pub fn parse_pactl_volume(output: &str) -> Option<u8> {
    output
        .split_whitespace()
        .find_map(|token| token.strip_suffix('%'))
        .and_then(|percent| percent.parse::<i32>().ok())
        .map(|v| VolumeLevel::new(v).get())
}

impl ActionExecutor for LinuxExecutor {
    #[instrument(skip(self))]
    fn get_volume(&mut self) -> Result<u8> {
        let output = run_command("pactl", &["get-sink-volume", Self::SINK])?;
        parse_pactl_volume(&output).ok_or_else(|| unparseable("pactl", &output))
    }

    fn set_volume(&mut self, level: VolumeLevel) -> Result<()> {
        let percent = format!("{}%", level.get());
        run_command("pactl", &["set-sink-volume", Self::SINK, &percent]).map(|_| ())
    }

    #[instrument(skip(self))]
    fn shutdown(&mut self) -> Result<()> {
        run_command("systemctl", &["poweroff"]).map(|_| ())
    }
}

/// Remembers the last volume it was given and never touches the OS.
#[derive(Debug)]
pub struct DryRunExecutor {
    volume: u8,
    shutdown_requested: bool,
}

impl Default for DryRunExecutor {
    fn default() -> Self {
        Self {
            volume: VolumeLevel::default().get(),
            shutdown_requested: false,
        }
    }
}

impl ActionExecutor for DryRunExecutor {
    fn get_volume(&mut self) -> Result<u8> {
        Ok(self.volume)
    }

    fn set_volume(&mut self, level: VolumeLevel) -> Result<()> {
        info!(volume = level.get(), "dry-run: set volume");
        self.volume = level.get();
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.shutdown_requested {
            warn!("dry-run: shut down requested again");
        }
        info!("dry-run: shut down");
        self.shutdown_requested = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_osascript_volume() {
        assert_eq!(parse_osascript_volume("44\n"), Some(44));
        assert_eq!(parse_osascript_volume("missing value"), None);
        assert_eq!(parse_osascript_volume("130"), Some(100));
    }

    #[test]
    fn parses_pactl_volume() {
        let output = "Volume: front-left: 32768 /  50% / -18.06 dB,   front-right: 32768 /  50% / -18.06 dB\n        balance 0.00";
        assert_eq!(parse_pactl_volume(output), Some(50));
        assert_eq!(parse_pactl_volume("Volume: front-left: 98304 / 150% / 10.57 dB"), Some(100));
        assert_eq!(parse_pactl_volume("No such entity"), None);
    }

    #[test]
    fn dry_run_remembers_volume() {
        let mut executor = DryRunExecutor::default();
        assert_eq!(executor.get_volume().unwrap(), 50);

        executor.set_volume(VolumeLevel::new(12)).unwrap();
        assert_eq!(executor.get_volume().unwrap(), 12);

        executor.shutdown().unwrap();
        assert!(executor.shutdown_requested);
    }

    #[test]
    fn explicit_backends_resolve_to_themselves() {
        assert_eq!(SystemBackend::Linux.resolve(), SystemBackend::Linux);
        assert_eq!(SystemBackend::DryRun.resolve(), SystemBackend::DryRun);
        assert_ne!(SystemBackend::Auto.resolve(), SystemBackend::Auto);
    }

    #[test]
    fn missing_program_is_a_command_error() {
        let err = run_command("gesture-volume-no-such-program", &[]).unwrap_err();
        assert!(matches!(err, ControllerError::Command { .. }));
    }
}
