//! # Sliding-window restart budgets.
//!
//! A [`RestartBudget`] is a `(max, within)` pair: at most `max` restarts
//! inside any `within`-long window, either side optionally infinite. A
//! [`RestartWindow`] is the matching counter: it records restart instants,
//! prunes those that fell out of the window, and reports when the budget is
//! exceeded.
//!
//! The parent carries one window for the whole brood and every child
//! carries its own; a restart must fit **both** budgets or the parent gives
//! up.
//!
//! Instants come from [`tokio::time::Instant`], so the window follows the
//! monotonic clock (and the paused test clock).

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// Raised when a [`RestartWindow`] overflows its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("restart budget exhausted")]
pub struct BudgetExhausted;

/// Restart budget: at most `max` restarts within any `within`-long window.
///
/// `None` on either side means infinite: an infinite `max` always accepts,
/// an infinite `within` never forgets (absolute cap).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestartBudget {
    /// Maximum number of restarts retained in the window, `None` = no cap.
    pub max: Option<usize>,
    /// Window length, `None` = restarts are never forgotten.
    pub within: Option<Duration>,
}

impl RestartBudget {
    /// Budget that never refuses a restart.
    pub const INFINITE: Self = Self {
        max: None,
        within: None,
    };

    /// Budget of `max` restarts within a `within`-long sliding window.
    pub fn new(max: usize, within: Duration) -> Self {
        Self {
            max: Some(max),
            within: Some(within),
        }
    }
}

impl Default for RestartBudget {
    /// Returns [`RestartBudget::INFINITE`].
    fn default() -> Self {
        Self::INFINITE
    }
}

/// Counter of recent restart instants for one budget scope.
#[derive(Debug, Default)]
pub struct RestartWindow(Vec<Instant>);

impl RestartWindow {
    /// Creates an empty window.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Records a restart at `now` against `budget`.
    ///
    /// Prunes instants older than `budget.within`, appends `now`, and fails
    /// when the retained count exceeds `budget.max`.
    pub fn record(&mut self, budget: &RestartBudget, now: Instant) -> Result<(), BudgetExhausted> {
        if let Some(within) = budget.within {
            if let Some(cutoff) = now.checked_sub(within) {
                self.0.retain(|t| *t >= cutoff);
            }
        }
        self.0.push(now);

        match budget.max {
            Some(max) if self.0.len() > max => Err(BudgetExhausted),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(Some(0), true ; "zero budget refuses the first restart")]
    #[test_case(Some(1), false ; "budget of one accepts the first restart")]
    #[test_case(None, false ; "infinite budget always accepts")]
    fn first_record(max: Option<usize>, exhausted: bool) {
        let budget = RestartBudget {
            max,
            within: Some(Duration::from_secs(5)),
        };
        let mut window = RestartWindow::new();

        let res = window.record(&budget, Instant::now());
        assert_eq!(res.is_err(), exhausted);
    }

    #[test]
    fn prunes_instants_outside_the_window() {
        let budget = RestartBudget::new(2, Duration::from_secs(5));
        let mut window = RestartWindow::new();
        let t0 = Instant::now() + Duration::from_secs(100);

        assert!(window.record(&budget, t0).is_ok());
        assert!(window.record(&budget, t0 + Duration::from_secs(1)).is_ok());
        assert!(window.record(&budget, t0 + Duration::from_secs(2)).is_err());

        // Six seconds later the first two have fallen out of the window.
        assert!(window.record(&budget, t0 + Duration::from_secs(7)).is_ok());
    }

    #[test]
    fn infinite_window_never_forgets() {
        let budget = RestartBudget {
            max: Some(2),
            within: None,
        };
        let mut window = RestartWindow::new();
        let t0 = Instant::now() + Duration::from_secs(100);

        assert!(window.record(&budget, t0).is_ok());
        assert!(window.record(&budget, t0 + Duration::from_secs(3600)).is_ok());
        assert!(window
            .record(&budget, t0 + Duration::from_secs(7200))
            .is_err());
    }
}
