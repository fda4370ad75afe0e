use crate::error::SettingsError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WORK_MINUTES: u32 = 25; // Default Pomodoro work time
pub const DEFAULT_SHORT_BREAK_MINUTES: u32 = 5;
pub const DEFAULT_LONG_BREAK_MINUTES: u32 = 15;
pub const DEFAULT_DAILY_GOAL: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    #[default]
    Work,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub fn as_str(&self) -> &str {
        match self {
            TimerMode::Work => "WORK",
            TimerMode::ShortBreak => "SHORT BREAK",
            TimerMode::LongBreak => "LONG BREAK",
        }
    }

    pub(crate) fn emoji(&self) -> &str {
        match self {
            TimerMode::Work => "💼",
            TimerMode::ShortBreak | TimerMode::LongBreak => "☕",
        }
    }

    /// Label shown next to the countdown in the window title.
    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Work => "Focus",
            TimerMode::ShortBreak | TimerMode::LongBreak => "Break",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerSettings {
    pub work: u32,
    pub short_break: u32,
    pub long_break: u32,
    pub goal: u32,
    pub auto_start: bool,
    pub metronome: bool,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work: DEFAULT_WORK_MINUTES,
            short_break: DEFAULT_SHORT_BREAK_MINUTES,
            long_break: DEFAULT_LONG_BREAK_MINUTES,
            goal: DEFAULT_DAILY_GOAL,
            auto_start: false,
            metronome: false,
        }
    }
}

impl TimerSettings {
    /// Configured length of `mode` in minutes.
    pub fn minutes_for(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Work => self.work,
            TimerMode::ShortBreak => self.short_break,
            TimerMode::LongBreak => self.long_break,
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.work == 0 {
            return Err(SettingsError::ZeroDuration("work"));
        }
        if self.short_break == 0 {
            return Err(SettingsError::ZeroDuration("short break"));
        }
        if self.long_break == 0 {
            return Err(SettingsError::ZeroDuration("long break"));
        }
        if self.goal == 0 {
            return Err(SettingsError::ZeroGoal);
        }
        Ok(())
    }

    /// Returns a copy with every field present in `patch` overwritten.
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        Self {
            work: patch.work.unwrap_or(self.work),
            short_break: patch.short_break.unwrap_or(self.short_break),
            long_break: patch.long_break.unwrap_or(self.long_break),
            goal: patch.goal.unwrap_or(self.goal),
            auto_start: patch.auto_start.unwrap_or(self.auto_start),
            metronome: patch.metronome.unwrap_or(self.metronome),
        }
    }
}

/// Partial settings update; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_break: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_break: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_start: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metronome: Option<bool>,
}

/// `totalSeconds(mode, settings)`: the full length of `mode` in seconds.
pub fn total_seconds(mode: TimerMode, settings: &TimerSettings) -> i64 {
    i64::from(settings.minutes_for(mode)) * 60
}

/// Renders a countdown as `m:ss`; negative values keep a leading `-`.
pub fn format_clock(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let abs = seconds.unsigned_abs();
    format!("{sign}{}:{:02}", abs / 60, abs % 60)
}

pub fn window_title(time_left: i64, mode: TimerMode, blocking: bool) -> String {
    let prefix = if blocking { "🛡️ " } else { "" };
    format!("{prefix}{} - {}", format_clock(time_left), mode.label())
}
