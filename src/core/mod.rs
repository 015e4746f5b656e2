//! # Engine core: registry, lifecycle, and restart coordination.
//!
//! The only public API re-exported from here is [`Parent`] plus the message
//! and view types it trades in. Everything else is an internal building
//! block the parent wires together.
//!
//! ## Files & responsibilities
//! - **parent.rs**: public facade; owns the registry, the inbox, and the
//!   flush set; exposes the child-management operations; classifies every
//!   incoming message and drives restart or clean deregistration.
//! - **state.rs**: pure registry — pid/id maps, reverse-dependency and
//!   shutdown-group indexes, startup-index counter, parent-wide restart
//!   window. Never performs I/O.
//! - **spawner.rs**: invokes a start descriptor, interprets its outcome,
//!   wires the child task + exit monitor, arms the lifetime timer.
//! - **stopper.rs**: terminates a list of records in order — graceful
//!   deadline, kill escalation, timer disarm, exit-signal flush.
//! - **restart.rs**: the planner — idempotent re-entry, budget charging,
//!   shutdown-group atomicity, pid rebinding, deferred resume.
//! - **message.rs**: the inbox protocol and the views served to callers.
//!
//! ## Signal flow
//! ```text
//! child task ──► monitor ─────────────┐
//! lifetime timer ─────────────────────┤
//! restart engine (deferred resume) ───┼──► parent inbox ──► host
//! other tasks (ParentMailbox) ────────┘                      │
//!                                                            ▼
//!                                          Parent::handle_message()
//!                                             ├─ ChildExit     → pop closure, stop
//!                                             │                  dependents, restart
//!                                             │                  per policy, report
//!                                             │                  Exited once
//!                                             ├─ ChildTimeout  → kill, then as exit
//!                                             │                  with reason Timeout
//!                                             ├─ ResumeRestart → re-run the plan
//!                                             ├─ Inquiry       → reply, never mutate
//!                                             └─ anything else → Unhandled(msg)
//! ```

mod message;
mod parent;
mod restart;
mod spawner;
mod state;
mod stopper;

pub use message::{
    ChildCounts, ChildInfo, ChildSummary, ExitedChild, Inquiry, Message, MessageOutcome,
    ParentMailbox,
};
pub use parent::{ChildStarted, Parent};
pub use restart::StoppedChildren;
