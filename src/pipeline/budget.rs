//! Wall-clock budget for one run.

use std::time::{Duration, Instant};

/// Time budget shared by every source of a run.
///
/// Only gates the start of new detail fetches; requests already in flight
/// are bounded by the HTTP timeout.
#[derive(Debug, Clone, Copy)]
pub struct RunBudget {
    started: Instant,
    limit: Option<Duration>,
}

impl RunBudget {
    /// A budget that never runs out.
    pub fn unlimited() -> Self {
        Self {
            started: Instant::now(),
            limit: None,
        }
    }

    /// A budget of `limit`, starting now.
    pub fn new(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit: Some(limit),
        }
    }

    /// Budget from an optional number of seconds.
    pub fn from_secs(secs: Option<u64>) -> Self {
        match secs {
            Some(secs) => Self::new(Duration::from_secs(secs)),
            None => Self::unlimited(),
        }
    }

    /// Time left, or `None` for an unlimited budget.
    pub fn remaining(&self) -> Option<Duration> {
        self.limit
            .map(|limit| limit.saturating_sub(self.started.elapsed()))
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }
}

impl Default for RunBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_never_exhausted() {
        let budget = RunBudget::unlimited();
        assert!(!budget.is_exhausted());
        assert!(budget.remaining().is_none());
    }

    #[test]
    fn test_zero_budget_is_exhausted() {
        let budget = RunBudget::new(Duration::ZERO);
        assert!(budget.is_exhausted());
        assert_eq!(budget.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_from_secs() {
        assert!(!RunBudget::from_secs(Some(3600)).is_exhausted());
        assert!(RunBudget::from_secs(None).remaining().is_none());
    }
}
