//! One-shot timers driven by the owning actor's event loop.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Scheduled(Instant),
    Fired,
    Canceled,
}

/// At most one outstanding deadline. Scheduling again replaces the previous
/// deadline rather than queueing a second one.
#[derive(Debug, Clone, Copy)]
pub struct OneShot {
    delay: Duration,
    state: TimerState,
}

impl OneShot {
    pub fn new(delay: Duration) -> Self {
        Self { delay, state: TimerState::Idle }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            TimerState::Scheduled(at) => Some(at),
            _ => None,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.deadline().is_some()
    }

    pub fn schedule(&mut self, now: Instant) {
        self.state = TimerState::Scheduled(now + self.delay);
    }

    pub fn cancel(&mut self) {
        if self.is_scheduled() {
            self.state = TimerState::Canceled;
        }
    }

    /// Marks the timer fired if its deadline has passed. Returns whether it
    /// did, so each deadline fires exactly once.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.state {
            TimerState::Scheduled(at) if at <= now => {
                self.state = TimerState::Fired;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn fires_once_after_delay() {
        let start = Instant::now();
        let mut timer = OneShot::new(Duration::from_millis(100));
        assert_eq!(timer.state(), TimerState::Idle);

        timer.schedule(start);
        assert!(!timer.fire_if_due(start + Duration::from_millis(99)));
        assert!(timer.fire_if_due(start + Duration::from_millis(100)));
        assert_eq!(timer.state(), TimerState::Fired);
        assert!(!timer.fire_if_due(start + Duration::from_millis(500)));
    }

    #[test]
    fn rescheduling_replaces_deadline() {
        let start = Instant::now();
        let mut timer = OneShot::new(Duration::from_millis(100));

        timer.schedule(start);
        timer.schedule(start + Duration::from_millis(80));
        assert_eq!(timer.deadline(), Some(start + Duration::from_millis(180)));
        assert!(!timer.fire_if_due(start + Duration::from_millis(150)));
        assert!(timer.fire_if_due(start + Duration::from_millis(180)));
    }

    #[test]
    fn canceled_timer_never_fires() {
        let start = Instant::now();
        let mut timer = OneShot::new(Duration::from_millis(10));

        timer.cancel();
        assert_eq!(timer.state(), TimerState::Idle);

        timer.schedule(start);
        timer.cancel();
        assert_eq!(timer.state(), TimerState::Canceled);
        assert!(!timer.fire_if_due(start + Duration::from_secs(1)));
    }
}
