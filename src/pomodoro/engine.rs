//! Timer state engine.
//!
//! Owns mode, running flag, remaining time and settings. Everything derived
//! (total duration, progress, blocking eligibility) is computed on demand from
//! that state. Side effects the engine cannot perform itself (persisting
//! settings and history) are queued as [`EngineEvent`]s for the owner to drain.
//!
//! ```text
//! idle(mode) --start--> running(mode)
//! running --pause | reset | set_mode | tick reaching 0--> idle
//! idle --set_mode | reset | update_settings--> idle
//! ```

use super::clock::Clock;
use super::cues::{Cue, CuePlayer, Notifier, notify_completion};
use super::ledger::{SessionLedger, SessionRecord};
use super::pomodoro::{SettingsPatch, TimerMode, TimerSettings, total_seconds};
use crate::error::SettingsError;
use chrono::Local;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    SettingsChanged(TimerSettings),
    SessionCompleted {
        mode: TimerMode,
        record: Option<SessionRecord>,
    },
}

pub struct TimerEngine {
    settings: TimerSettings,
    mode: TimerMode,
    is_running: bool,
    time_left: i64,
    clock: Clock,
    ledger: SessionLedger,
    cues: Box<dyn CuePlayer>,
    notifier: Box<dyn Notifier>,
    events: Vec<EngineEvent>,
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("settings", &self.settings)
            .field("mode", &self.mode)
            .field("is_running", &self.is_running)
            .field("time_left", &self.time_left)
            .field("history", &self.ledger.len())
            .finish()
    }
}

impl TimerEngine {
    /// Starts idle in work mode with the full work duration remaining.
    pub fn new(
        settings: TimerSettings,
        ledger: SessionLedger,
        cues: Box<dyn CuePlayer>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let mode = TimerMode::Work;
        Self {
            time_left: total_seconds(mode, &settings),
            settings,
            mode,
            is_running: false,
            clock: Clock::default(),
            ledger,
            cues,
            notifier,
            events: Vec::new(),
        }
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn time_left(&self) -> i64 {
        self.time_left
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    pub fn total_seconds(&self) -> i64 {
        total_seconds(self.mode, &self.settings)
    }

    /// Remaining fraction of the current mode, clamped to `[0, 1]`.
    pub fn progress(&self) -> f64 {
        let total = self.total_seconds();
        if total == 0 {
            return 0.0;
        }
        (self.time_left as f64 / total as f64).clamp(0.0, 1.0)
    }

    pub fn is_blocking_active(&self) -> bool {
        self.mode == TimerMode::Work && self.is_running
    }

    pub fn sessions_completed_today(&self) -> usize {
        self.ledger.completed_today()
    }

    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn set_mode(&mut self, mode: TimerMode) {
        self.pause();
        self.mode = mode;
        self.time_left = self.total_seconds();
        info!(mode = mode.as_str(), time_left = self.time_left, "Mode set");
    }

    pub fn start(&mut self) {
        if self.is_running {
            return;
        }
        self.is_running = true;
        self.clock.arm();
        info!(mode = self.mode.as_str(), time_left = self.time_left, "Timer started");
        if self.time_left == 0 {
            self.complete();
        }
    }

    pub fn pause(&mut self) {
        if self.is_running {
            debug!(time_left = self.time_left, "Timer paused");
        }
        self.is_running = false;
        self.clock.disarm();
    }

    pub fn toggle(&mut self) {
        if self.is_running {
            self.pause();
        } else {
            self.start();
        }
    }

    pub fn reset(&mut self) {
        self.pause();
        self.time_left = self.total_seconds();
    }

    /// Shifts the countdown by `minutes`; negative values subtract and
    /// nothing clamps the result.
    pub fn add_time(&mut self, minutes: i64) {
        self.time_left = self.time_left.saturating_add(minutes.saturating_mul(60));
        if self.is_running && self.time_left == 0 {
            self.complete();
        }
    }

    /// Merges `patch` into the settings. While idle the countdown is reset to
    /// the new duration of the current mode; a running countdown is left as is.
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Result<(), SettingsError> {
        let merged = self.settings.merged(patch);
        merged.validate()?;
        self.settings = merged;
        self.events.push(EngineEvent::SettingsChanged(self.settings.clone()));
        if !self.is_running {
            self.time_left = self.total_seconds();
        }
        Ok(())
    }

    /// Waits for the next clock tick. Pends forever while idle.
    pub async fn next_tick(&mut self) {
        self.clock.tick().await;
    }

    /// One second elapsed. Completion fires only on the decrement that
    /// reaches zero.
    pub fn tick(&mut self) {
        if !self.is_running || self.time_left <= 0 {
            return;
        }
        self.time_left -= 1;
        if self.settings.metronome {
            self.play(Cue::Tick);
        }
        if self.time_left == 0 {
            self.complete();
        }
    }

    fn complete(&mut self) {
        self.pause();
        self.play(Cue::Completion);
        if let Err(e) = notify_completion(self.notifier.as_mut(), self.mode) {
            warn!("Failed to send notification: {}", e);
        }

        let record = if self.mode == TimerMode::Work {
            let record = SessionRecord::work(self.settings.work, Local::now());
            self.ledger.record(record.clone());
            Some(record)
        } else {
            None
        };
        info!(
            "{} {} session complete",
            self.mode.emoji(),
            self.mode.as_str()
        );
        self.events.push(EngineEvent::SessionCompleted {
            mode: self.mode,
            record,
        });
    }

    fn play(&mut self, cue: Cue) {
        if let Err(e) = self.cues.play(cue) {
            debug!("Cue {:?} not played: {}", cue, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pomodoro::cues::Permission;
    use crate::pomodoro::cues::testing::{RecordingCues, ScriptedNotifier};
    use crate::pomodoro::ledger::MAX_HISTORY;

    fn engine() -> (TimerEngine, RecordingCues, ScriptedNotifier) {
        let cues = RecordingCues::default();
        let notifier = ScriptedNotifier::new(Permission::Granted);
        let engine = TimerEngine::new(
            TimerSettings::default(),
            SessionLedger::new(),
            Box::new(cues.clone()),
            Box::new(notifier.clone()),
        );
        (engine, cues, notifier)
    }

    fn run_to_zero(engine: &mut TimerEngine) {
        engine.start();
        while engine.is_running() {
            engine.tick();
        }
    }

    #[test]
    fn starts_idle_in_work_mode() {
        let (engine, _, _) = engine();
        assert_eq!(engine.mode(), TimerMode::Work);
        assert!(!engine.is_running());
        assert_eq!(engine.time_left(), 25 * 60);
        assert_eq!(engine.progress(), 1.0);
    }

    #[test]
    fn start_is_reentrant_noop() {
        let (mut engine, _, _) = engine();
        engine.start();
        engine.start();
        assert!(engine.is_running());
        assert!(engine.clock.is_armed());
        engine.tick();
        assert_eq!(engine.time_left(), 25 * 60 - 1);
    }

    #[test]
    fn pause_twice_is_harmless() {
        let (mut engine, _, _) = engine();
        engine.start();
        engine.pause();
        engine.pause();
        assert!(!engine.is_running());
        assert!(!engine.clock.is_armed());
    }

    #[test]
    fn toggle_flips_running() {
        let (mut engine, _, _) = engine();
        engine.toggle();
        assert!(engine.is_running());
        engine.toggle();
        assert!(!engine.is_running());
    }

    #[test]
    fn tick_is_ignored_while_paused() {
        let (mut engine, _, _) = engine();
        engine.tick();
        assert_eq!(engine.time_left(), 25 * 60);
    }

    #[test]
    fn reset_and_set_mode_restore_full_duration() {
        let (mut engine, _, _) = engine();
        engine.start();
        engine.tick();
        engine.tick();
        engine.reset();
        assert!(!engine.is_running());
        assert_eq!(engine.progress(), 1.0);

        engine.start();
        engine.tick();
        engine.set_mode(TimerMode::ShortBreak);
        assert!(!engine.is_running());
        assert_eq!(engine.time_left(), 5 * 60);
        assert_eq!(engine.progress(), 1.0);

        engine.add_time(3);
        engine.set_mode(TimerMode::ShortBreak);
        assert_eq!(engine.time_left(), 5 * 60);
    }

    #[test]
    fn work_completion_fires_once_and_records_session() {
        let (mut engine, cues, notifier) = engine();
        engine.time_left = 2;
        engine.start();
        engine.tick();
        assert!(engine.is_running());
        engine.tick();
        assert!(!engine.is_running());
        assert_eq!(engine.time_left(), 0);
        assert_eq!(engine.ledger().len(), 1);
        assert_eq!(engine.ledger().records()[0].duration_minutes, 25);
        assert_eq!(cues.count(Cue::Completion), 1);
        assert_eq!(notifier.shown.lock().unwrap().len(), 1);

        engine.tick();
        assert_eq!(engine.time_left(), 0);
        assert_eq!(engine.ledger().len(), 1);

        let events = engine.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            EngineEvent::SessionCompleted { mode: TimerMode::Work, record: Some(_) }
        ));
    }

    #[test]
    fn break_completion_records_nothing() {
        let (mut engine, cues, _) = engine();
        engine.set_mode(TimerMode::LongBreak);
        engine.time_left = 2;
        run_to_zero(&mut engine);
        assert!(engine.ledger().is_empty());
        assert_eq!(cues.count(Cue::Completion), 1);
        assert_eq!(
            engine.take_events(),
            vec![EngineEvent::SessionCompleted {
                mode: TimerMode::LongBreak,
                record: None
            }]
        );
    }

    #[test]
    fn ledger_stays_capped_across_many_completions() {
        let (mut engine, _, _) = engine();
        for _ in 0..(MAX_HISTORY + 5) {
            engine.time_left = 1;
            run_to_zero(&mut engine);
        }
        assert_eq!(engine.ledger().len(), MAX_HISTORY);
        assert_eq!(engine.sessions_completed_today(), MAX_HISTORY);
    }

    #[test]
    fn metronome_ticks_only_when_enabled() {
        let (mut engine, cues, _) = engine();
        engine.start();
        engine.tick();
        assert_eq!(cues.count(Cue::Tick), 0);
        engine
            .update_settings(&SettingsPatch {
                metronome: Some(true),
                ..SettingsPatch::default()
            })
            .unwrap();
        engine.tick();
        engine.tick();
        assert_eq!(cues.count(Cue::Tick), 2);
    }

    #[test]
    fn blocking_requires_work_mode_and_running() {
        let (mut engine, _, _) = engine();
        assert!(!engine.is_blocking_active());
        engine.start();
        assert!(engine.is_blocking_active());
        for mode in [TimerMode::ShortBreak, TimerMode::LongBreak] {
            engine.set_mode(mode);
            assert!(!engine.is_blocking_active());
            engine.start();
            assert!(!engine.is_blocking_active());
        }
    }

    #[test]
    fn update_settings_while_idle_resets_countdown() {
        let (mut engine, _, _) = engine();
        engine
            .update_settings(&SettingsPatch {
                work: Some(50),
                ..SettingsPatch::default()
            })
            .unwrap();
        assert_eq!(engine.time_left(), 50 * 60);
        assert!(matches!(
            engine.take_events().as_slice(),
            [EngineEvent::SettingsChanged(settings)] if settings.work == 50
        ));
    }

    #[test]
    fn update_settings_while_running_keeps_countdown() {
        let (mut engine, _, _) = engine();
        engine.start();
        engine.tick();
        engine
            .update_settings(&SettingsPatch {
                work: Some(50),
                ..SettingsPatch::default()
            })
            .unwrap();
        assert_eq!(engine.time_left(), 25 * 60 - 1);
        engine.reset();
        assert_eq!(engine.time_left(), 50 * 60);
    }

    #[test]
    fn update_settings_rejects_zero_duration() {
        let (mut engine, _, _) = engine();
        let err = engine
            .update_settings(&SettingsPatch {
                short_break: Some(0),
                ..SettingsPatch::default()
            })
            .unwrap_err();
        assert_eq!(err, SettingsError::ZeroDuration("short break"));
        assert_eq!(engine.settings().short_break, 5);
        assert!(engine.take_events().is_empty());
    }

    #[test]
    fn add_time_is_unbounded_both_ways() {
        let (mut engine, _, _) = engine();
        engine.add_time(10);
        assert_eq!(engine.time_left(), 35 * 60);
        assert_eq!(engine.progress(), 1.0);
        engine.add_time(-40);
        assert_eq!(engine.time_left(), -5 * 60);
        assert_eq!(engine.progress(), 0.0);
    }

    #[test]
    fn negative_countdown_never_ticks_or_completes() {
        let (mut engine, _, _) = engine();
        engine.add_time(-30);
        engine.start();
        engine.tick();
        assert_eq!(engine.time_left(), -5 * 60);
        assert!(engine.is_running());
        assert!(engine.ledger().is_empty());
    }

    #[test]
    fn progress_stays_in_unit_range_while_counting_down() {
        let (mut engine, _, _) = engine();
        engine.time_left = 3;
        engine.start();
        let mut last = engine.progress();
        while engine.is_running() {
            engine.tick();
            let progress = engine.progress();
            assert!((0.0..=1.0).contains(&progress));
            assert!(progress <= last);
            last = progress;
        }
        assert_eq!(last, 0.0);
    }
}
