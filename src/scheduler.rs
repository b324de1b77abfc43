//! Cooperative periodic timers for the single event-loop context.
//!
//! Nothing here sleeps or spawns: the owner asks which timers are due at
//! `now`, runs their callbacks to completion, and uses
//! [`Scheduler::next_deadline`] to decide how long the loop may wait.

use std::time::{Duration, Instant};

/// Handle for a registered timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Timer {
    id: TimerId,
    period: Duration,
    next_due: Instant,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    timers: Vec<Timer>,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a timer firing every `period`, first at `now + period`
    pub fn every(&mut self, period: Duration, now: Instant) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        // A zero period would fire on every poll forever
        let period = period.max(Duration::from_millis(1));
        self.timers.push(Timer {
            id,
            period,
            next_due: now + period,
        });
        id
    }

    /// Stop a timer; unknown or already cancelled ids are ignored
    pub fn cancel(&mut self, id: TimerId) {
        self.timers.retain(|t| t.id != id);
    }

    #[cfg(test)]
    fn is_active(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    /// Timers due at `now`, in registration order.
    ///
    /// A timer that fell several periods behind fires once and is moved to
    /// its next deadline after `now`.
    pub fn due(&mut self, now: Instant) -> Vec<TimerId> {
        let mut fired = Vec::new();
        for timer in &mut self.timers {
            if timer.next_due > now {
                continue;
            }
            fired.push(timer.id);

            // Next multiple of the period strictly after `now`
            let behind = now.duration_since(timer.next_due).as_nanos();
            let into_period = (behind % timer.period.as_nanos()) as u64;
            timer.next_due = now + timer.period - Duration::from_nanos(into_period);
        }
        fired
    }

    /// Earliest upcoming deadline, if any timer is active
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.next_due).min()
    }
}
