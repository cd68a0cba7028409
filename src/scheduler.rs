//! # scheduler — wall-clock aligned daemon loop
//!
//! Fires a job every `n` minutes on boundaries aligned to the hour
//! (`n = 60` ⇒ `HH:00`, `n = 15` ⇒ `:00 :15 :30 :45`). The clock is checked
//! once a minute; a missed slot (laptop asleep, long job) runs once on the
//! next check, never twice. Ctrl-C ends the loop cleanly.

use std::future::Future;
use std::time::Duration;

use anyhow::bail;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Timelike};
use tracing::info;

const CHECK_EVERY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduler {
    interval_min: u32,
}

impl Scheduler {
    pub fn every_minutes(n: u32) -> anyhow::Result<Self> {
        if n == 0 || 60 % n != 0 {
            bail!("schedule interval must divide 60 minutes, got {n}");
        }
        Ok(Self { interval_min: n })
    }

    pub fn interval_min(&self) -> u32 {
        self.interval_min
    }

    /// First aligned slot strictly after `now`.
    pub fn next_fire_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let into_hour = TimeDelta::minutes(i64::from(now.minute()))
            + TimeDelta::seconds(i64::from(now.second()))
            + TimeDelta::nanoseconds(i64::from(now.nanosecond()));
        let hour_start = now.clone() - into_hour;

        let slot = (now.minute() / self.interval_min + 1) * self.interval_min;
        hour_start + TimeDelta::minutes(i64::from(slot))
    }

    /// Run `job` once, immediately.
    pub async fn run_now<F, Fut>(&self, mut job: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        job().await;
    }

    /// Run `job` at every aligned slot until Ctrl-C.
    pub async fn run_forever<F, Fut>(&self, mut job: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut next = self.next_fire_after(&Local::now());
        info!(next_run = %next.format("%Y-%m-%d %H:%M"), "Scheduler started. Press Ctrl+C to stop.");

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Daemon stopped by user");
                    return;
                }
                _ = tokio::time::sleep(CHECK_EVERY) => {}
            }

            let now = Local::now();
            if now < next {
                continue;
            }

            info!(slot = %next.format("%H:%M"), "Scheduled run starting");
            job().await;

            next = self.next_fire_after(&Local::now());
            info!(next_run = %next.format("%Y-%m-%d %H:%M"), "Sleeping until next scheduled run");
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use chrono::Utc;

    use super::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, h, m, s).unwrap()
    }

    #[test]
    fn test_interval_must_divide_hour() {
        assert!(Scheduler::every_minutes(0).is_err());
        assert!(Scheduler::every_minutes(7).is_err());
        assert!(Scheduler::every_minutes(90).is_err());
        for n in [1, 5, 15, 20, 30, 60] {
            assert_eq!(Scheduler::every_minutes(n).unwrap().interval_min(), n);
        }
    }

    #[test]
    fn test_hourly_fires_on_the_hour() {
        let s = Scheduler::every_minutes(60).unwrap();
        assert_eq!(s.next_fire_after(&at(9, 0, 0)), at(10, 0, 0));
        assert_eq!(s.next_fire_after(&at(9, 0, 1)), at(10, 0, 0));
        assert_eq!(s.next_fire_after(&at(9, 59, 59)), at(10, 0, 0));
    }

    #[test]
    fn test_quarter_hour_slots() {
        let s = Scheduler::every_minutes(15).unwrap();
        assert_eq!(s.next_fire_after(&at(9, 0, 0)), at(9, 15, 0));
        assert_eq!(s.next_fire_after(&at(9, 14, 59)), at(9, 15, 0));
        assert_eq!(s.next_fire_after(&at(9, 15, 0)), at(9, 30, 0));
        assert_eq!(s.next_fire_after(&at(9, 50, 30)), at(10, 0, 0));
    }

    #[test]
    fn test_rolls_over_midnight() {
        let s = Scheduler::every_minutes(60).unwrap();
        let next = s.next_fire_after(&at(23, 30, 0));
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_run_now_runs_once() {
        let calls = Cell::new(0);
        let counter = &calls;
        Scheduler::every_minutes(60)
            .unwrap()
            .run_now(move || async move { counter.set(counter.get() + 1) })
            .await;
        assert_eq!(calls.get(), 1);
    }
}
