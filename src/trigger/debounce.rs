//! Minimum spacing between committed state changes

/// Debounce gate
///
/// A transition may be committed once `interval_ms` has elapsed since the
/// last committed one. Callers that are refused keep their pending state
/// and ask again on the next evaluation, so a blocked transition is
/// delayed rather than lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debounce {
    interval_ms: u64,
    last_change_ms: Option<u64>,
}

impl Debounce {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_change_ms: None,
        }
    }

    pub fn ready(&self, now_ms: u64) -> bool {
        match self.last_change_ms {
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
            None => true,
        }
    }

    /// Record a committed transition at `now_ms`
    pub fn mark(&mut self, now_ms: u64) {
        self.last_change_ms = Some(now_ms);
    }

    pub fn last_change_ms(&self) -> Option<u64> {
        self.last_change_ms
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn set_interval_ms(&mut self, interval_ms: u64) {
        self.interval_ms = interval_ms;
    }

    pub fn reset(&mut self) {
        self.last_change_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_transition_is_free() {
        let debounce = Debounce::new(100);
        assert!(debounce.ready(0));
    }

    #[test]
    fn test_window() {
        let mut debounce = Debounce::new(10);
        debounce.mark(5);
        assert!(!debounce.ready(5));
        assert!(!debounce.ready(14));
        assert!(debounce.ready(15));
    }

    #[test]
    fn test_zero_interval() {
        let mut debounce = Debounce::new(0);
        debounce.mark(7);
        assert!(debounce.ready(7));
    }

    #[test]
    fn test_reset() {
        let mut debounce = Debounce::new(10);
        debounce.mark(5);
        debounce.reset();
        assert!(debounce.ready(6));
        assert_eq!(debounce.last_change_ms(), None);
    }
}
