//! Domain clock: one tick per second while armed.
//!
//! The interval is created lazily on the first poll after `arm()` and dropped
//! on `disarm()`, so a tick that was already scheduled is never delivered once
//! the owner disarms the clock.

use tokio::time::{Duration, Instant, Interval, MissedTickBehavior, interval_at};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct Clock {
    period: Duration,
    armed: bool,
    interval: Option<Interval>,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(TICK_PERIOD)
    }
}

impl Clock {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            armed: false,
            interval: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Arms the clock. A second `arm()` keeps the existing schedule.
    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn disarm(&mut self) {
        self.armed = false;
        self.interval = None;
    }

    /// Resolves on the next tick; pends forever while disarmed.
    pub async fn tick(&mut self) {
        if !self.armed {
            std::future::pending::<()>().await;
        }
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        interval.tick().await;
    }
}
