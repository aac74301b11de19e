//! Pre-recording countdown timer.
//!
//! Decrements once per second from a configured starting value and signals
//! completion exactly once. The timer is driven by polling with an explicit
//! `Instant` rather than by a background thread, which keeps the recording
//! loop single-threaded and the timer deterministic under test.

use std::time::{Duration, Instant};

/// Event produced while a countdown is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    /// One decrement elapsed; carries the new remaining value.
    Tick(u32),
    /// Remaining reached zero. Fired exactly once per armed countdown.
    Completed,
}

/// Polled countdown from an initial value down to zero.
///
/// Only one countdown can be armed at a time. Arming a new countdown while
/// one is in progress replaces it entirely, so a superseded countdown can
/// never fire its completion.
pub struct CountdownTimer {
    interval: Duration,
    remaining: u32,
    next_tick_at: Option<Instant>,
}

impl CountdownTimer {
    /// Creates a disarmed timer with the given decrement interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            remaining: 0,
            next_tick_at: None,
        }
    }

    /// Arms the timer at `initial`, implicitly cancelling any prior countdown.
    ///
    /// The first decrement is due one interval after `now`.
    pub fn start(&mut self, initial: u32, now: Instant) {
        self.remaining = initial;
        self.next_tick_at = if initial > 0 {
            Some(now + self.interval)
        } else {
            // Degenerate start at zero completes on the next poll
            Some(now)
        };
        tracing::debug!("Countdown armed at {}", initial);
    }

    /// Disarms the timer. No further events are produced.
    pub fn cancel(&mut self) {
        if self.next_tick_at.is_some() {
            tracing::debug!("Countdown cancelled at {}", self.remaining);
        }
        self.next_tick_at = None;
    }

    /// Whether a countdown is currently armed.
    pub fn is_active(&self) -> bool {
        self.next_tick_at.is_some()
    }

    /// Current displayed value, or `None` when disarmed.
    pub fn remaining(&self) -> Option<u32> {
        self.next_tick_at.map(|_| self.remaining)
    }

    /// Performs all decrements due at `now`.
    ///
    /// Each decrement yields `Tick(new_remaining)`. When remaining reaches
    /// zero, `Completed` is appended and the timer disarms itself, so a
    /// later poll yields nothing.
    pub fn poll(&mut self, now: Instant) -> Vec<CountdownEvent> {
        let mut events = Vec::new();

        while let Some(due) = self.next_tick_at {
            if now < due {
                break;
            }
            if self.remaining == 0 {
                self.next_tick_at = None;
                events.push(CountdownEvent::Completed);
                break;
            }
            self.remaining -= 1;
            events.push(CountdownEvent::Tick(self.remaining));
            if self.remaining == 0 {
                self.next_tick_at = None;
                events.push(CountdownEvent::Completed);
                break;
            }
            self.next_tick_at = Some(due + self.interval);
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_three_ticks_then_single_completion() {
        let mut timer = CountdownTimer::new(secs(1));
        let t0 = Instant::now();
        timer.start(3, t0);
        assert_eq!(timer.remaining(), Some(3));

        let mut events = Vec::new();
        for i in 1..=5 {
            events.extend(timer.poll(t0 + secs(i)));
        }

        assert_eq!(
            events,
            vec![
                CountdownEvent::Tick(2),
                CountdownEvent::Tick(1),
                CountdownEvent::Tick(0),
                CountdownEvent::Completed,
            ]
        );
        assert!(!timer.is_active());
        assert_eq!(timer.remaining(), None);
    }

    #[test]
    fn test_lagged_poll_catches_up() {
        let mut timer = CountdownTimer::new(secs(1));
        let t0 = Instant::now();
        timer.start(3, t0);

        // A single late poll still produces every decrement in order
        let events = timer.poll(t0 + secs(10));
        assert_eq!(events.len(), 4);
        assert_eq!(events.last(), Some(&CountdownEvent::Completed));
    }

    #[test]
    fn test_restart_cancels_prior_countdown() {
        let mut timer = CountdownTimer::new(secs(1));
        let t0 = Instant::now();
        timer.start(3, t0);
        assert_eq!(timer.poll(t0 + secs(1)), vec![CountdownEvent::Tick(2)]);

        // Restart mid-countdown; only the second countdown may complete
        timer.start(3, t0 + secs(1));

        let mut completions = 0;
        for i in 2..=10 {
            for event in timer.poll(t0 + secs(i)) {
                if event == CountdownEvent::Completed {
                    completions += 1;
                }
            }
        }
        assert_eq!(completions, 1);
    }

    #[test]
    fn test_cancel_stops_all_events() {
        let mut timer = CountdownTimer::new(secs(1));
        let t0 = Instant::now();
        timer.start(3, t0);
        timer.cancel();

        assert!(!timer.is_active());
        assert!(timer.poll(t0 + secs(10)).is_empty());
    }

    #[test]
    fn test_no_events_before_first_interval() {
        let mut timer = CountdownTimer::new(secs(1));
        let t0 = Instant::now();
        timer.start(3, t0);

        assert!(timer.poll(t0 + Duration::from_millis(999)).is_empty());
        assert_eq!(timer.remaining(), Some(3));
    }

    #[test]
    fn test_start_at_zero_completes_immediately() {
        let mut timer = CountdownTimer::new(secs(1));
        let t0 = Instant::now();
        timer.start(0, t0);

        assert_eq!(timer.poll(t0), vec![CountdownEvent::Completed]);
        assert!(!timer.is_active());
    }
}
