//! Year/day progress arithmetic for the companion overlay widget
//!
//! The overlay itself (DOM, styling, preference persistence) lives in
//! the host; this module provides the math and the periodic refresh
//! task. The refresh loop has an explicit start/stop lifecycle so hosts
//! can tie it to visibility.

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Percentage of the current year that has elapsed at `now`, in
/// `[0, 100)`.
pub fn year_progress(now: NaiveDateTime) -> f64 {
    let start = year_start(now.year());
    let end = year_start(now.year() + 1);
    ratio(now - start, end - start)
}

/// Percentage of the current day that has elapsed at `now`, in
/// `[0, 100)`.
pub fn day_progress(now: NaiveDateTime) -> f64 {
    let start = now.date().and_hms_opt(0, 0, 0).unwrap_or(now);
    ratio(now - start, ChronoDuration::days(1))
}

fn year_start(year: i32) -> NaiveDateTime {
    // Jan 1 exists for every chrono-representable year.
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

fn ratio(elapsed: ChronoDuration, total: ChronoDuration) -> f64 {
    let total_ms = total.num_milliseconds();
    if total_ms <= 0 {
        return 0.0;
    }
    (elapsed.num_milliseconds() as f64 / total_ms as f64) * 100.0
}

/// Periodic refresh task. `start` is idempotent while running; `stop`
/// (or drop) aborts the loop.
pub struct ProgressTicker {
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    pub fn new(period: Duration) -> Self {
        Self { period, handle: None }
    }

    /// Begin ticking. Each tick receives the current year and day
    /// progress percentages. A second `start` while running is a no-op.
    pub fn start<F>(&mut self, mut on_tick: F)
    where
        F: FnMut(f64, f64) + Send + 'static,
    {
        if self.handle.is_some() {
            return;
        }
        let period = self.period;
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let now = chrono::Local::now().naive_local();
                on_tick(year_progress(now), day_progress(now));
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
