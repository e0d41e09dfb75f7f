//! Last-known-good output with time-based staleness.

use std::time::{Duration, Instant};

use crate::config::AppConfig;

/// Staleness thresholds, measured from the last accepted reading.
#[derive(Clone, Copy, Debug)]
pub struct GateTimings {
    /// Output is flagged stale at or beyond this age
    pub stale_after: Duration,
    /// A diagnostic snapshot is requested at or beyond this age
    pub snapshot_after: Duration,
    /// After a snapshot the acceptance clock reads this long ago
    pub snapshot_rewind: Duration,
}

impl Default for GateTimings {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(2),
            snapshot_after: Duration::from_secs(5),
            snapshot_rewind: Duration::from_secs(3),
        }
    }
}

impl GateTimings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            stale_after: config.stale_after(),
            snapshot_after: config.snapshot_after(),
            snapshot_rewind: config.snapshot_rewind(),
        }
    }
}

/// What the UI shows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GateView {
    pub text: String,
    pub stale: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateOutcome {
    pub view: GateView,
    /// The caller should save a snapshot of the current line images
    pub snapshot_due: bool,
}

/// Holds the last non-empty reading of a session.
///
/// Empty readings never replace the held text; they only let it age. Once it
/// is older than `snapshot_after`, one snapshot is requested and the clock is
/// rewound to `snapshot_rewind` ago, so snapshots repeat at most every
/// `snapshot_after - snapshot_rewind` while nothing is accepted.
pub struct OutputGate {
    last_text: String,
    last_valid_at: Instant,
    timings: GateTimings,
}

impl OutputGate {
    pub fn new(now: Instant, timings: GateTimings) -> Self {
        Self {
            last_text: String::new(),
            last_valid_at: now,
            timings,
        }
    }

    /// Feeds one tick's combined reading.
    pub fn observe(&mut self, combined: &str, now: Instant) -> GateOutcome {
        if !combined.is_empty() {
            self.last_text = combined.to_string();
            self.last_valid_at = now;
        }

        let age = now.saturating_duration_since(self.last_valid_at);
        let snapshot_due = age >= self.timings.snapshot_after;
        if snapshot_due {
            self.last_valid_at = now.checked_sub(self.timings.snapshot_rewind).unwrap_or(now);
        }

        GateOutcome {
            view: GateView {
                text: self.last_text.clone(),
                stale: age >= self.timings.stale_after,
            },
            snapshot_due,
        }
    }

    /// Current view without feeding a reading.
    pub fn peek(&self, now: Instant) -> GateView {
        GateView {
            text: self.last_text.clone(),
            stale: now.saturating_duration_since(self.last_valid_at) >= self.timings.stale_after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_empty_readings_never_erase_output() {
        let t0 = Instant::now();
        let mut gate = OutputGate::new(t0, GateTimings::default());

        let out = gate.observe("Zone: A  Pos: 1 m 2 m 3 m", t0);
        assert_eq!(out.view.text, "Zone: A  Pos: 1 m 2 m 3 m");
        assert!(!out.view.stale);

        for (i, text) in ["", ""].iter().enumerate() {
            let out = gate.observe(text, t0 + ms(100 * (i as u64 + 1)));
            assert_eq!(out.view.text, "Zone: A  Pos: 1 m 2 m 3 m");
            assert!(!out.view.stale);
        }
    }

    #[test]
    fn test_stale_after_two_seconds() {
        let t0 = Instant::now();
        let mut gate = OutputGate::new(t0, GateTimings::default());
        gate.observe("A", t0);

        let out = gate.observe("", t0 + ms(1999));
        assert!(!out.view.stale);

        let out = gate.observe("", t0 + ms(2000));
        assert!(out.view.stale);
        assert_eq!(out.view.text, "A");

        let out = gate.observe("", t0 + ms(2500));
        assert!(out.view.stale);
        assert!(!out.snapshot_due);
    }

    #[test]
    fn test_acceptance_clears_staleness() {
        let t0 = Instant::now();
        let mut gate = OutputGate::new(t0, GateTimings::default());
        gate.observe("A", t0);
        assert!(gate.observe("", t0 + ms(3000)).view.stale);

        let out = gate.observe("B", t0 + ms(3100));
        assert_eq!(out.view, GateView { text: "B".into(), stale: false });
    }

    #[test]
    fn test_snapshot_once_then_every_two_seconds() {
        let t0 = Instant::now();
        let mut gate = OutputGate::new(t0, GateTimings::default());
        gate.observe("A", t0);

        let out = gate.observe("", t0 + ms(5000));
        assert!(out.snapshot_due);
        assert!(out.view.stale);

        // Clock now reads 3 s ago: still stale, no new snapshot yet
        let out = gate.observe("", t0 + ms(5100));
        assert!(!out.snapshot_due);
        assert!(out.view.stale);

        assert!(!gate.observe("", t0 + ms(6900)).snapshot_due);
        assert!(gate.observe("", t0 + ms(7000)).snapshot_due);
    }

    #[test]
    fn test_fresh_session_goes_stale_without_readings() {
        let t0 = Instant::now();
        let mut gate = OutputGate::new(t0, GateTimings::default());
        let out = gate.observe("", t0 + ms(2100));
        assert_eq!(out.view, GateView { text: String::new(), stale: true });
    }

    #[test]
    fn test_peek_does_not_mutate() {
        let t0 = Instant::now();
        let mut gate = OutputGate::new(t0, GateTimings::default());
        gate.observe("A", t0);

        let view = gate.peek(t0 + ms(6000));
        assert_eq!(view, GateView { text: "A".into(), stale: true });

        // No rewind happened, so the next observe still requests a snapshot
        assert!(gate.observe("", t0 + ms(6000)).snapshot_due);
    }
}
