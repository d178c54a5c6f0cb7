use tracing::debug;

const DUE_EPSILON_SECONDS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// Groups timers so they can be dropped together, e.g. everything owned by one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerScope(pub u32);

#[derive(Debug)]
struct PendingTimer<E> {
    handle: TimerHandle,
    scope: TimerScope,
    due_at_seconds: f64,
    event: E,
}

/// One-shot timers advanced by the fixed tick instead of a host event loop.
#[derive(Debug)]
pub struct TimerQueue<E> {
    now_seconds: f64,
    next_sequence: u64,
    pending: Vec<PendingTimer<E>>,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self {
            now_seconds: 0.0,
            next_sequence: 0,
            pending: Vec::new(),
        }
    }
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_seconds(&self) -> f64 {
        self.now_seconds
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_in_scope(&self, scope: TimerScope) -> usize {
        self.pending
            .iter()
            .filter(|timer| timer.scope == scope)
            .count()
    }

    pub fn schedule(&mut self, delay_seconds: f32, scope: TimerScope, event: E) -> TimerHandle {
        let handle = TimerHandle(self.next_sequence);
        self.next_sequence = self.next_sequence.saturating_add(1);
        let due_at_seconds = self.now_seconds + f64::from(delay_seconds.max(0.0));
        debug!(
            timer = handle.0,
            scope = scope.0,
            due_at_seconds,
            "timer_scheduled"
        );
        self.pending.push(PendingTimer {
            handle,
            scope,
            due_at_seconds,
            event,
        });
        handle
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|timer| timer.handle != handle);
        let cancelled = self.pending.len() != before;
        if cancelled {
            debug!(timer = handle.0, "timer_cancelled");
        }
        cancelled
    }

    pub fn cancel_scope(&mut self, scope: TimerScope) -> usize {
        let before = self.pending.len();
        self.pending.retain(|timer| timer.scope != scope);
        let cancelled = before - self.pending.len();
        if cancelled > 0 {
            debug!(scope = scope.0, cancelled, "timer_scope_cancelled");
        }
        cancelled
    }

    /// Moves the clock forward and returns every event that came due, earliest first.
    /// Timers due at the same instant fire in scheduling order; none are suppressed.
    pub fn advance(&mut self, dt_seconds: f32) -> Vec<(TimerScope, E)> {
        self.now_seconds += f64::from(dt_seconds.max(0.0));
        let now = self.now_seconds + DUE_EPSILON_SECONDS;

        let mut due = Vec::new();
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].due_at_seconds <= now {
                due.push(self.pending.remove(index));
            } else {
                index += 1;
            }
        }
        due.sort_by(|a, b| {
            a.due_at_seconds
                .total_cmp(&b.due_at_seconds)
                .then(a.handle.0.cmp(&b.handle.0))
        });
        due.into_iter()
            .map(|timer| (timer.scope, timer.event))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOM_A: TimerScope = TimerScope(0);
    const ROOM_B: TimerScope = TimerScope(1);

    fn events(fired: Vec<(TimerScope, &'static str)>) -> Vec<&'static str> {
        fired.into_iter().map(|(_, event)| event).collect()
    }

    #[test]
    fn timers_fire_once_when_due() {
        let mut timers = TimerQueue::new();
        timers.schedule(1.0, ROOM_A, "beat");
        assert!(timers.advance(0.5).is_empty());
        assert_eq!(events(timers.advance(0.5)), vec!["beat"]);
        assert!(timers.advance(10.0).is_empty());
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn fired_order_is_due_time_then_schedule_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(3.0, ROOM_A, "late");
        timers.schedule(1.0, ROOM_A, "early");
        timers.schedule(1.0, ROOM_B, "early_twin");
        assert_eq!(
            events(timers.advance(5.0)),
            vec!["early", "early_twin", "late"]
        );
    }

    #[test]
    fn many_small_ticks_reach_due_time() {
        let mut timers = TimerQueue::new();
        timers.schedule(1.0, ROOM_A, "one_second");
        let mut fired = Vec::new();
        for _ in 0..60 {
            fired.extend(events(timers.advance(1.0 / 60.0)));
        }
        assert_eq!(fired, vec!["one_second"]);
    }

    #[test]
    fn cancel_by_handle_and_by_scope() {
        let mut timers = TimerQueue::new();
        let handle = timers.schedule(1.0, ROOM_A, "cancelled");
        timers.schedule(1.0, ROOM_A, "scoped");
        timers.schedule(1.0, ROOM_B, "kept");

        assert!(timers.cancel(handle));
        assert!(!timers.cancel(handle));
        assert_eq!(timers.cancel_scope(ROOM_A), 1);
        assert_eq!(timers.pending_in_scope(ROOM_A), 0);
        assert_eq!(events(timers.advance(2.0)), vec!["kept"]);
    }
}
