//! Dispatch pacing
//!
//! Every request waits until at least the configured interval has passed
//! since the previous response was fully read. A random jitter on top makes
//! the request pattern look less mechanical.

use std::time::Duration;
use tokio::time::Instant;

/// Enforces the minimum idle gap between a response and the next request
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    jitter: Duration,
    last_finished: Option<Instant>,
}

impl Throttle {
    /// Creates a throttle; the first dispatch never waits
    pub fn new(interval: Duration, jitter: Duration) -> Self {
        Self {
            interval,
            jitter,
            last_finished: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Replaces the interval (used when robots.txt asks for a longer one)
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Draws the gap to keep before the next dispatch
    ///
    /// The value is uniform in `[interval, interval + jitter]`, rounded to
    /// a tenth of a second but never below the interval.
    pub fn next_delay(&self) -> Duration {
        let low = self.interval.as_secs_f64();
        let high = low + self.jitter.as_secs_f64();

        let drawn = if high > low {
            rand::random_range(low..=high)
        } else {
            low
        };
        let rounded = (drawn * 10.0).round() / 10.0;

        Duration::from_secs_f64(rounded.max(low))
    }

    /// Waits until the next dispatch is allowed
    ///
    /// The gap is counted from the last [`Throttle::finished`] call, so a
    /// slow response does not eat into it.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last_finished {
            let delay = self.next_delay();
            let ready = last + delay;
            if ready > Instant::now() {
                tracing::debug!("Sleeping {:.1}s before the next request", delay.as_secs_f64());
                tokio::time::sleep_until(ready).await;
            }
        }
    }

    /// Marks the end of a request, successful or not
    pub fn finished(&mut self) {
        self.last_finished = Some(Instant::now());
    }
}
