//! Audible cues and completion notifications.

use super::pomodoro::TimerMode;
use crate::error::{CueError, NotifyError};
use notify_rust::Notification;
use serde::Serialize;

pub const COMPLETION_TITLE: &str = "Session Complete";

/// One oscillator note: frequency, length and starting gain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration_ms: u32,
    pub gain: f32,
    /// Offset from the start of the cue.
    pub delay_ms: u32,
}

const TICK_TONES: [Tone; 1] = [Tone {
    frequency_hz: 800.0,
    duration_ms: 10,
    gain: 0.1,
    delay_ms: 0,
}];

const CHIME_TONES: [Tone; 2] = [
    Tone {
        frequency_hz: 440.0,
        duration_ms: 500,
        gain: 0.3,
        delay_ms: 0,
    },
    Tone {
        frequency_hz: 660.0,
        duration_ms: 500,
        gain: 0.3,
        delay_ms: 100,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Cue {
    /// Soft metronome tick while running.
    Tick,
    /// Two-note chime at session end.
    Completion,
}

impl Cue {
    pub fn tones(&self) -> &'static [Tone] {
        match self {
            Cue::Tick => &TICK_TONES,
            Cue::Completion => &CHIME_TONES,
        }
    }
}

pub trait CuePlayer: Send {
    fn play(&mut self, cue: Cue) -> Result<(), CueError>;
}

/// Used when audio is muted or unavailable.
#[derive(Debug, Default)]
pub struct SilentCuePlayer;

impl CuePlayer for SilentCuePlayer {
    fn play(&mut self, _cue: Cue) -> Result<(), CueError> {
        Ok(())
    }
}

/// Arguments for sox's `play` that synthesize one tone.
pub fn synth_args(tone: &Tone) -> Vec<String> {
    vec![
        "-q".to_string(),
        "-n".to_string(),
        "synth".to_string(),
        format!("{:.3}", f64::from(tone.duration_ms) / 1000.0),
        "sine".to_string(),
        format!("{}", tone.frequency_hz),
        "vol".to_string(),
        format!("{}", tone.gain),
        "delay".to_string(),
        format!("{:.3}", f64::from(tone.delay_ms) / 1000.0),
    ]
}

/// Plays cues through the platform's sound command without waiting for it.
#[derive(Debug, Default)]
pub struct SystemCuePlayer;

impl SystemCuePlayer {
    #[cfg(target_os = "macos")]
    fn commands(cue: Cue) -> Vec<(&'static str, Vec<String>)> {
        let sound = match cue {
            Cue::Tick => "/System/Library/Sounds/Tink.aiff",
            Cue::Completion => "/System/Library/Sounds/Glass.aiff",
        };
        vec![("afplay", vec![sound.to_string()])]
    }

    #[cfg(target_os = "linux")]
    fn commands(cue: Cue) -> Vec<(&'static str, Vec<String>)> {
        cue.tones()
            .iter()
            .map(|tone| ("play", synth_args(tone)))
            .collect()
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    fn commands(_cue: Cue) -> Vec<(&'static str, Vec<String>)> {
        Vec::new()
    }
}

impl CuePlayer for SystemCuePlayer {
    fn play(&mut self, cue: Cue) -> Result<(), CueError> {
        let commands = Self::commands(cue);
        if commands.is_empty() {
            return Err(CueError::Unsupported);
        }
        for (program, args) in commands {
            tokio::process::Command::new(program)
                .args(args)
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .spawn()
                .map_err(|e| CueError::Failed(e.to_string()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Undetermined,
}

pub trait Notifier: Send {
    fn permission(&self) -> Permission;
    fn request_permission(&mut self);
    fn show(&mut self, title: &str, body: &str) -> Result<(), NotifyError>;
}

pub fn completion_body(mode: TimerMode) -> &'static str {
    match mode {
        TimerMode::Work => "Great focus! Time for a break.",
        TimerMode::ShortBreak | TimerMode::LongBreak => "Break is over. Ready to focus?",
    }
}

/// Shows the completion notification if allowed.
///
/// An undetermined permission is requested without showing anything this
/// time; a denied permission skips the request entirely.
pub fn notify_completion(notifier: &mut dyn Notifier, mode: TimerMode) -> Result<(), NotifyError> {
    match notifier.permission() {
        Permission::Granted => notifier.show(COMPLETION_TITLE, completion_body(mode)),
        Permission::Undetermined => {
            notifier.request_permission();
            Ok(())
        }
        Permission::Denied => Ok(()),
    }
}

/// Desktop notifications via the session's notification daemon.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&mut self) {}

    fn show(&mut self, title: &str, body: &str) -> Result<(), NotifyError> {
        Notification::new()
            .summary(title)
            .body(body)
            .show()
            .map(|_| ())
            .map_err(|e| NotifyError::Failed(e.to_string()))
    }
}

/// Stand-in when notifications are turned off.
#[derive(Debug, Default)]
pub struct DisabledNotifier;

impl Notifier for DisabledNotifier {
    fn permission(&self) -> Permission {
        Permission::Denied
    }

    fn request_permission(&mut self) {}

    fn show(&mut self, _title: &str, _body: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Unsupported)
    }
}
