use super::pomodoro::TimerMode;
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_HISTORY: usize = 50;

/// A completed work session. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub mode: TimerMode,
    /// Creation instant in milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub duration_minutes: u32,
}

impl SessionRecord {
    pub fn work(duration_minutes: u32, completed_at: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            mode: TimerMode::Work,
            timestamp: completed_at.timestamp_millis(),
            duration_minutes,
        }
    }

    fn local_day(&self) -> Option<NaiveDate> {
        Local
            .timestamp_millis_opt(self.timestamp)
            .single()
            .map(|at| at.date_naive())
    }
}

/// Newest-first history of completed sessions, capped at [`MAX_HISTORY`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionLedger {
    records: Vec<SessionRecord>,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a stored history, keeping only the newest entries.
    pub fn from_records(mut records: Vec<SessionRecord>) -> Self {
        records.truncate(MAX_HISTORY);
        Self { records }
    }

    pub fn record(&mut self, record: SessionRecord) {
        self.records.insert(0, record);
        self.records.truncate(MAX_HISTORY);
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn completed_on(&self, day: NaiveDate) -> usize {
        self.records
            .iter()
            .filter(|record| record.mode == TimerMode::Work && record.local_day() == Some(day))
            .count()
    }

    pub fn completed_today(&self) -> usize {
        self.completed_on(Local::now().date_naive())
    }
}
