//! Interval trigger: pings one worker on a fixed period.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error};

use crate::error::ScheduleError;
use crate::worker::Trigger;

/// Sends [`Trigger::Run`] to a worker on every tick of its configured timer.
#[derive(Debug)]
pub struct IntervalTrigger {
    worker: usize,
    timer: String,
    triggers: mpsc::Sender<Trigger>,
}

impl IntervalTrigger {
    pub fn new(worker: usize, timer: impl Into<String>, triggers: mpsc::Sender<Trigger>) -> Self {
        Self {
            worker,
            timer: timer.into(),
            triggers,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Tick forever. A malformed timer sends a single [`Trigger::Stop`]
    /// instead, which disables the worker for good.
    ///
    /// Returns once the worker has gone away.
    pub async fn run(self) {
        let period = match parse_duration(&self.timer) {
            Ok(period) => period,
            Err(e) => {
                error!(worker = self.worker, error = %e, "Couldn't set a scheduler");
                let _ = self.triggers.send(Trigger::Stop).await;
                return;
            }
        };

        if period.is_zero() {
            debug!(worker = self.worker, timer = %self.timer, "Zero timer, not scheduling");
            return;
        }

        // The worker already ran once at startup, so the first tick is one
        // period out.
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if self.triggers.send(Trigger::Run).await.is_err() {
                debug!(worker = self.worker, "Worker gone, stopping timer");
                return;
            }
        }
    }
}

/// Parse a duration such as `"300ms"`, `"5s"`, `"1m30s"` or `"1.5h"`.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare `"0"`
/// is accepted. Negative durations are rejected.
pub fn parse_duration(value: &str) -> Result<Duration, ScheduleError> {
    let invalid = |reason: &str| ScheduleError::InvalidDuration {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let mut s = value.trim();
    if s.starts_with('-') {
        return Err(invalid("negative durations are not allowed"));
    }
    s = s.strip_prefix('+').unwrap_or(s);
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(invalid("empty duration"));
    }

    let mut total: u128 = 0;
    while !s.is_empty() {
        let (whole, rest) = split_digits(s);
        let (fraction, rest) = match rest.strip_prefix('.') {
            Some(after_dot) => split_digits(after_dot),
            None => ("", rest),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("expected a number"));
        }

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let (unit, rest) = rest.split_at(unit_len);
        if unit.is_empty() {
            return Err(invalid("missing unit"));
        }
        let scale = unit_nanos(unit).ok_or_else(|| invalid(&format!("unknown unit {unit:?}")))?;

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("value out of range"))?
        };
        let mut nanos = whole
            .checked_mul(scale)
            .ok_or_else(|| invalid("value out of range"))?;

        if !fraction.is_empty() {
            // 18 digits is already below nanosecond precision for every unit.
            let fraction = &fraction[..fraction.len().min(18)];
            let digits: u128 = fraction.parse().map_err(|_| invalid("value out of range"))?;
            nanos += digits * scale / 10u128.pow(fraction.len() as u32);
        }

        total = total
            .checked_add(nanos)
            .ok_or_else(|| invalid("value out of range"))?;
        s = rest;
    }

    let nanos = u64::try_from(total).map_err(|_| invalid("value out of range"))?;
    Ok(Duration::from_nanos(nanos))
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn unit_nanos(unit: &str) -> Option<u128> {
    let nanos = match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        "m" => 60 * 1_000_000_000,
        "h" => 3_600 * 1_000_000_000,
        _ => return None,
    };
    Some(nanos)
}
