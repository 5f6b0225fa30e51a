//! Host-local countdown for the answering window.
//!
//! The countdown is an explicit little state machine rather than a callback
//! closure: callers own the one-second cadence (typically a
//! `tokio::time::interval` inside their event loop) and feed it [`Countdown::tick`]
//! calls. Completion is reported exactly once. The countdown is advisory by
//! design; whether an answer still counts is decided by the session phase,
//! never by a clock on someone's device.

/// What the countdown is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Not ticking; `start` resumes from the current remaining time.
    Idle,
    /// Ticking down once per second.
    Running,
    /// Reached zero and already reported completion.
    Expired,
}

/// A whole-second countdown with pause/reset/restart controls.
#[derive(Debug, Clone)]
pub struct Countdown {
    total: u32,
    remaining: u32,
    state: TimerState,
}

impl Countdown {
    /// Create an idle countdown of `seconds` (clamped to at least one).
    pub fn new(seconds: u32) -> Self {
        let total = seconds.max(1);
        Self {
            total,
            remaining: total,
            state: TimerState::Idle,
        }
    }

    /// Resume ticking from the current remaining time.
    pub fn start(&mut self) {
        if self.state == TimerState::Idle {
            self.state = TimerState::Running;
        }
    }

    /// Stop ticking without resetting the remaining time.
    pub fn pause(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Idle;
        }
    }

    /// Stop and set the remaining time to `seconds`, or back to the full
    /// duration when `None`.
    pub fn reset(&mut self, seconds: Option<u32>) {
        self.remaining = seconds.unwrap_or(self.total);
        self.state = TimerState::Idle;
    }

    /// Set the remaining time and immediately resume ticking.
    pub fn restart(&mut self, seconds: Option<u32>) {
        self.remaining = seconds.unwrap_or(self.total);
        self.state = TimerState::Running;
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `true` exactly once, on the tick that reaches zero; after
    /// that the countdown is [`TimerState::Expired`] and further ticks are
    /// inert until a reset or restart.
    pub fn tick(&mut self) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = TimerState::Expired;
            return true;
        }
        false
    }

    /// Seconds left on the clock.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// The full duration this countdown was created with.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Current state of the countdown.
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Whether the countdown is actively ticking.
    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Remaining time as a share of the full duration, for presentation.
    ///
    /// Capped at 100 so restarting with more time than the original
    /// duration cannot overflow a progress bar.
    pub fn percentage(&self) -> f32 {
        (self.remaining as f32 / self.total as f32 * 100.0).min(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_and_completes_once() {
        let mut countdown = Countdown::new(3);
        countdown.start();

        assert!(!countdown.tick());
        assert_eq!(countdown.remaining(), 2);
        assert!(!countdown.tick());
        assert!(countdown.tick());
        assert_eq!(countdown.remaining(), 0);
        assert_eq!(countdown.state(), TimerState::Expired);

        // Further ticks stay silent.
        assert!(!countdown.tick());
        assert!(!countdown.tick());
        assert_eq!(countdown.remaining(), 0);
    }

    #[test]
    fn does_not_tick_until_started() {
        let mut countdown = Countdown::new(5);
        assert!(!countdown.tick());
        assert_eq!(countdown.remaining(), 5);
    }

    #[test]
    fn pause_freezes_the_remaining_time() {
        let mut countdown = Countdown::new(10);
        countdown.start();
        countdown.tick();
        countdown.tick();
        countdown.pause();

        assert!(!countdown.tick());
        assert_eq!(countdown.remaining(), 8);

        countdown.start();
        assert!(!countdown.tick());
        assert_eq!(countdown.remaining(), 7);
    }

    #[test]
    fn reset_stops_and_restores_the_duration() {
        let mut countdown = Countdown::new(10);
        countdown.start();
        countdown.tick();
        countdown.reset(None);

        assert_eq!(countdown.remaining(), 10);
        assert_eq!(countdown.state(), TimerState::Idle);

        countdown.reset(Some(4));
        assert_eq!(countdown.remaining(), 4);
        assert!(!countdown.is_running());
    }

    #[test]
    fn restart_shortens_and_keeps_ticking() {
        let mut countdown = Countdown::new(20);
        countdown.start();
        countdown.tick();
        countdown.restart(Some(3));

        assert!(countdown.is_running());
        assert_eq!(countdown.remaining(), 3);
        assert!(!countdown.tick());
        assert!(!countdown.tick());
        assert!(countdown.tick());
        assert_eq!(countdown.state(), TimerState::Expired);
    }

    #[test]
    fn restart_after_expiry_runs_again() {
        let mut countdown = Countdown::new(1);
        countdown.start();
        assert!(countdown.tick());

        countdown.restart(None);
        assert!(countdown.is_running());
        assert_eq!(countdown.remaining(), 1);
        assert!(countdown.tick());
    }

    #[test]
    fn percentage_tracks_remaining_time() {
        let mut countdown = Countdown::new(20);
        assert_eq!(countdown.percentage(), 100.0);

        countdown.start();
        for _ in 0..5 {
            countdown.tick();
        }
        assert_eq!(countdown.percentage(), 75.0);

        // Restarting with the grace window leaves the bar nearly empty.
        countdown.restart(Some(3));
        assert!((countdown.percentage() - 15.0).abs() < 1e-4);

        // More time than the original duration cannot overflow the bar.
        countdown.restart(Some(40));
        assert_eq!(countdown.percentage(), 100.0);
    }
}
