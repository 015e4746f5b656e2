//! # Parent initialization options.
//!
//! [`Options`] defines the parent-wide restart budget and whether the
//! external lookup table is kept.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use brood::Options;
//!
//! let mut opts = Options::default();
//! opts.max_restarts = Some(10);
//! opts.max_seconds = Some(Duration::from_secs(30));
//! opts.registry = true;
//!
//! assert_eq!(opts.max_restarts, Some(10));
//! ```

use std::time::Duration;

use crate::policies::RestartBudget;

/// Options a [`Parent`](crate::Parent) is initialized with.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// Parent-wide cap on restarts inside the sliding window
    /// (`None` = unlimited).
    pub max_restarts: Option<usize>,
    /// Length of the parent-wide sliding window (`None` = restarts are
    /// never forgotten).
    pub max_seconds: Option<Duration>,
    /// Keep an external lookup table other tasks can read without calling
    /// into the parent.
    pub registry: bool,
}

impl Options {
    pub(crate) fn budget(&self) -> RestartBudget {
        RestartBudget {
            max: self.max_restarts,
            within: self.max_seconds,
        }
    }
}

impl Default for Options {
    /// Provides the default configuration:
    /// - `max_restarts = 3`
    /// - `max_seconds = 5s`
    /// - `registry = false`
    fn default() -> Self {
        Self {
            max_restarts: Some(3),
            max_seconds: Some(Duration::from_secs(5)),
            registry: false,
        }
    }
}
