//! # brood
//!
//! **Brood** is an embeddable parenting core: a supervision engine a
//! long-running host task uses to start, monitor, and coordinate the
//! lifecycle of a dynamic set of Tokio child tasks — without giving up its
//! own request handling to a dedicated supervisor process.
//!
//! ## Features
//!
//! | Area            | Description                                                        | Key types / traits                         |
//! |-----------------|--------------------------------------------------------------------|--------------------------------------------|
//! | **Parenting**   | Start, stop, restart, and query children from the owning task.     | [`Parent`], [`ChildStarted`]               |
//! | **Specs**       | Declarative child descriptions with fluent defaults.               | [`ChildSpec`], [`ChildBlueprint`]          |
//! | **Tasks**       | Start descriptors: run, ignore, or fail per invocation.            | [`ChildTask`], [`ChildFn`], [`ChildInit`]  |
//! | **Policies**    | Restart rules, shutdown discipline, sliding restart budgets.       | [`Restart`], [`ShutdownPolicy`], [`RestartBudget`] |
//! | **Coordination**| Bindings drag dependents down; shutdown-groups live and die as one.| [`ChildRef`], [`ShutdownGroup`]            |
//! | **Dispatch**    | One entry point for every inbox message the host drains.           | [`Message`], [`MessageOutcome`]            |
//! | **Read side**   | Optional lock-free lookup table for out-of-task queries.           | [`Lookup`], [`ParentMailbox`]              |
//!
//! ## Example
//!
//! ```no_run
//! use brood::{ChildError, ChildSpec, MessageOutcome, Options, Parent, Restart};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut parent: Parent = Parent::new(Options::default());
//!
//!     // A permanent worker: crashes are restarted within the budget.
//!     parent.start_child(
//!         ChildSpec::run_fn(|ctx| async move {
//!             while !ctx.is_cancelled() {
//!                 // do work...
//!                 tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!             }
//!             Ok::<_, ChildError>(())
//!         })
//!         .id("worker")
//!         .restart(Restart::Permanent),
//!     )?;
//!
//!     // The host loop: supervision interleaved with everything else.
//!     loop {
//!         let msg = parent.next_message().await;
//!         match parent.handle_message(msg).await? {
//!             MessageOutcome::Exited { exit, .. } => {
//!                 println!("child {} exited: {}", exit.pid, exit.reason)
//!             }
//!             MessageOutcome::GaveUp(children) => {
//!                 println!("gave up on {} children", children.len())
//!             }
//!             MessageOutcome::Handled => {}
//!             MessageOutcome::Unhandled(_msg) => { /* the host's own message */ }
//!         }
//!     }
//! }
//! ```
//!
//! ---

mod children;
mod config;
mod core;
mod error;
mod lookup;
mod policies;

// ---- Public re-exports ----

pub use children::{
    BoxChildFuture, ChildBlueprint, ChildFn, ChildId, ChildInit, ChildPid, ChildRef, ChildSpec,
    ChildTask, ChildTaskRef, ShutdownGroup, StartResult,
};
pub use config::Options;
pub use crate::core::{
    ChildCounts, ChildInfo, ChildStarted, ChildSummary, ExitedChild, Inquiry, Message,
    MessageOutcome, Parent, ParentMailbox, StoppedChildren,
};
pub use error::{
    AwaitError, ChildError, ExitReason, MailboxClosed, RestartChildError, StartError,
    TooManyRestarts, UnknownChild,
};
pub use lookup::{ChildSnapshot, Lookup};
pub use policies::{BudgetExhausted, Restart, RestartBudget, ShutdownPolicy};
