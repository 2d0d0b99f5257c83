//! Deadline-based one-shot timers.
//!
//! Each entity owns its own [`Scheduler`], polled once per tick against the
//! entity's simulation clock. Scheduling a kind that is already pending
//! replaces it, so cancel-and-reschedule is a single operation.

#[derive(Debug, Clone, PartialEq)]
pub struct Scheduler<K> {
    pending: Vec<(K, f32)>,
}

impl<K> Default for Scheduler<K> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<K: Copy + PartialEq> Scheduler<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `kind` to fire at `deadline`, replacing any pending entry of
    /// the same kind.
    pub fn schedule(&mut self, kind: K, deadline: f32) {
        match self.pending.iter_mut().find(|(k, _)| *k == kind) {
            Some(entry) => entry.1 = deadline,
            None => self.pending.push((kind, deadline)),
        }
    }

    pub fn cancel(&mut self, kind: K) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(k, _)| *k != kind);
        before != self.pending.len()
    }

    pub fn is_pending(&self, kind: K) -> bool {
        self.pending.iter().any(|(k, _)| *k == kind)
    }

    pub fn deadline(&self, kind: K) -> Option<f32> {
        self.pending
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, deadline)| *deadline)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Removes and returns every entry due at `now`, earliest first.
    pub fn poll(&mut self, now: f32) -> Vec<K> {
        let mut due: Vec<(K, f32)> = Vec::new();
        self.pending.retain(|entry| {
            if entry.1 <= now {
                due.push(*entry);
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.1.total_cmp(&b.1));
        due.into_iter().map(|(kind, _)| kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Kind {
        A,
        B,
    }

    #[test]
    fn fires_once_at_deadline() {
        let mut timers = Scheduler::new();
        timers.schedule(Kind::A, 1.0);
        assert!(timers.poll(0.5).is_empty());
        assert_eq!(timers.poll(1.0), vec![Kind::A]);
        assert!(timers.poll(2.0).is_empty());
    }

    #[test]
    fn rescheduling_replaces_pending_entry() {
        let mut timers = Scheduler::new();
        timers.schedule(Kind::A, 1.0);
        timers.schedule(Kind::A, 3.0);
        assert!(timers.poll(2.0).is_empty());
        assert_eq!(timers.deadline(Kind::A), Some(3.0));
        assert_eq!(timers.poll(3.0), vec![Kind::A]);
    }

    #[test]
    fn cancel_only_touches_one_kind() {
        let mut timers = Scheduler::new();
        timers.schedule(Kind::A, 1.0);
        timers.schedule(Kind::B, 1.0);
        assert!(timers.cancel(Kind::A));
        assert!(!timers.cancel(Kind::A));
        assert!(timers.is_pending(Kind::B));
        assert_eq!(timers.poll(1.0), vec![Kind::B]);
    }

    #[test]
    fn due_entries_come_out_in_deadline_order() {
        let mut timers = Scheduler::new();
        timers.schedule(Kind::B, 0.4);
        timers.schedule(Kind::A, 0.2);
        assert_eq!(timers.poll(1.0), vec![Kind::A, Kind::B]);
        assert!(timers.is_empty());
    }
}
