//! # Per-child and parent-wide supervision policies.
//!
//! - [`Restart`] — whether a child re-enters after going down.
//! - [`ShutdownPolicy`] — how a child is terminated (graceful deadline,
//!   immediate kill, or unbounded wait).
//! - [`RestartBudget`] / [`RestartWindow`] — sliding-window limits on how
//!   often restarts may happen, enforced at both parent and child scope.

mod budget;
mod restart;
mod shutdown;

pub use budget::{BudgetExhausted, RestartBudget, RestartWindow};
pub use restart::Restart;
pub use shutdown::ShutdownPolicy;
