//! # Parent: the in-task facade over the whole engine.
//!
//! A [`Parent`] is a plain value the host task owns. Every operation takes
//! `&mut self`; there is no lock because no other task ever touches the
//! state. Children run as Tokio tasks and talk back exclusively through
//! the parent's inbox.
//!
//! ## Host loop
//! ```text
//! let mut parent = Parent::new(Options::default());
//! parent.start_child(spec)?;
//! loop {
//!     let msg = parent.next_message().await;        // or select! with own channels
//!     match parent.handle_message(msg).await? {
//!         MessageOutcome::Exited { exit, gave_up } => { /* child gone (or replaced) */ }
//!         MessageOutcome::GaveUp(children) => { /* drop them from own views */ }
//!         MessageOutcome::Handled => {}
//!         MessageOutcome::Unhandled(msg) => { /* the host's own message */ }
//!     }
//! }
//! ```
//!
//! ## Rules
//! - Only three operations suspend: starting, stopping (bounded by the
//!   child's shutdown deadline), and the host's own awaits. Everything
//!   else is a non-blocking state transform.
//! - Shutdown-all proceeds in strict reverse startup order; restarts
//!   re-enter in ascending startup order.
//! - A cascade of related exits is reported through the one triggering
//!   exit, never once per dragged-down child.
//! - [`TooManyRestarts`] is fatal: propagate it out of the host task.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::debug;

use crate::children::{ChildId, ChildPid, ChildRef, ChildSpec};
use crate::config::Options;
use crate::core::message::{
    ChildCounts, ChildInfo, ChildSummary, ExitedChild, Inquiry, Message, MessageOutcome,
    ParentMailbox,
};
use crate::core::restart::{self, RestartEntry, StoppedChildren};
use crate::core::spawner::{self, SpawnOutcome};
use crate::core::state::{ChildRecord, ChildRuntime, State};
use crate::core::stopper;
use crate::error::{
    AwaitError, ExitReason, RestartChildError, StartError, TooManyRestarts, UnknownChild,
};
use crate::lookup::Lookup;

/// Successful outcome of [`Parent::start_child`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStarted {
    /// The child is running under this handle.
    Started(ChildPid),
    /// The start descriptor declined; nothing was registered.
    Ignored,
}

/// Supervision engine for a dynamic set of child tasks, owned by one host
/// task.
///
/// ## Example
/// ```rust
/// use brood::{ChildError, ChildSpec, Options, Parent};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut parent: Parent = Parent::new(Options::default());
///
///     parent.start_child(
///         ChildSpec::run_fn(|ctx| async move {
///             ctx.cancelled().await;
///             Ok::<_, ChildError>(())
///         })
///         .id("worker"),
///     )?;
///     assert_eq!(parent.num_children(), 1);
///
///     let stopped = parent.shutdown_all().await;
///     assert_eq!(stopped.len(), 1);
///     Ok(())
/// }
/// ```
pub struct Parent<M = ()> {
    pub(crate) state: State<M>,
    pub(crate) tx: mpsc::UnboundedSender<Message<M>>,
    rx: mpsc::UnboundedReceiver<Message<M>>,
    /// Exits already observed synchronously; their queued signals are
    /// swallowed instead of re-surfacing.
    pub(crate) flushed: HashSet<ChildPid>,
    lookup: Option<Lookup<M>>,
    next_pid: u64,
}

impl<M> Parent<M>
where
    M: Clone + Send + 'static,
{
    /// Initializes a parent with the given options.
    ///
    /// Must be called inside a Tokio runtime; children are spawned onto it.
    pub fn new(options: Options) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: State::new(options.budget()),
            tx,
            rx,
            flushed: HashSet::new(),
            lookup: options.registry.then(Lookup::new),
            next_pid: 0,
        }
    }

    /// Returns a cloneable sender other tasks can post messages with.
    pub fn mailbox(&self) -> ParentMailbox<M> {
        ParentMailbox {
            tx: self.tx.clone(),
        }
    }

    /// Returns the external lookup table, when `Options::registry` is set.
    pub fn lookup(&self) -> Option<Lookup<M>> {
        self.lookup.clone()
    }

    /// Awaits the next message in the parent's inbox.
    pub async fn next_message(&mut self) -> Message<M> {
        self.rx
            .recv()
            .await
            .expect("parent inbox cannot close while the parent lives")
    }

    // ---- Child management ----

    /// Starts a child from a spec (or anything convertible into one).
    pub fn start_child(&mut self, spec: impl Into<ChildSpec<M>>) -> Result<ChildStarted, StartError> {
        let spec = spec.into();

        if let Some(id) = &spec.id {
            if let Some(pid) = self.state.child_pid(id) {
                return Err(StartError::AlreadyStarted {
                    id: id.clone(),
                    pid,
                });
            }
        }
        for bound in &spec.binds_to {
            if self.state.resolve(bound).is_none() {
                return Err(StartError::failed(format!(
                    "bound child {bound} is not running"
                )));
            }
        }

        let pid = self.alloc_pid();
        match spawner::spawn_child(pid, &spec, &self.tx)? {
            SpawnOutcome::Ignored => Ok(ChildStarted::Ignored),
            SpawnOutcome::Started(runtime) => {
                self.state.register(spec, runtime);
                self.publish(pid);
                Ok(ChildStarted::Started(pid))
            }
        }
    }

    /// Stops a child and every child transitively bound to it, in reverse
    /// startup order.
    ///
    /// The returned set can be handed back to
    /// [`return_children`](Self::return_children).
    pub async fn shutdown_child(
        &mut self,
        child: impl Into<ChildRef>,
    ) -> Result<StoppedChildren<M>, UnknownChild> {
        let pid = self.state.resolve(&child.into()).ok_or(UnknownChild)?;

        let mut records = self.pop_closure(pid);
        records.sort_by(|a, b| b.startup_index.cmp(&a.startup_index));
        let stopped = self.stop_records(records).await;
        Ok(StoppedChildren::from_stopped(stopped))
    }

    /// Stops and immediately re-enters a child together with its bound
    /// dependents, temporaries included. Budgets are not charged.
    ///
    /// Returns the children that did not come back (declined or cascaded
    /// away); the host should drop them from any view of its own.
    pub async fn restart_child(
        &mut self,
        child: impl Into<ChildRef>,
    ) -> Result<Vec<ExitedChild<M>>, RestartChildError> {
        let stopped = self
            .shutdown_child(child)
            .await
            .map_err(|_| RestartChildError::UnknownChild)?;
        let report = restart::run(self, stopped.entries, true).await?;
        Ok(report.gave_up)
    }

    /// Stops every child in reverse startup order and reinitializes the
    /// registry, preserving the startup-index counter.
    pub async fn shutdown_all(&mut self) -> StoppedChildren<M> {
        let records = self.state.take_all();
        if let Some(lookup) = &self.lookup {
            lookup.clear();
        }
        let stopped = self.stop_records(records).await;
        StoppedChildren::from_stopped(stopped)
    }

    /// Re-inserts previously stopped children, subject to the restart plan
    /// (idempotent; children already live again are skipped).
    ///
    /// Returns the children that did not come back (declined or cascaded
    /// away); the host should drop them from any view of its own.
    pub async fn return_children(
        &mut self,
        stopped: StoppedChildren<M>,
    ) -> Result<Vec<ExitedChild<M>>, TooManyRestarts> {
        let report = restart::run(self, stopped.entries, true).await?;
        Ok(report.gave_up)
    }

    /// Blocks until the identified child terminates, up to `within`.
    ///
    /// On termination the child and its transitive dependents leave the
    /// registry without being restarted. On deadline expiry the child is
    /// left untouched.
    pub async fn await_child_termination(
        &mut self,
        id: impl Into<ChildId>,
        within: Duration,
    ) -> Result<ExitedChild<M>, AwaitError> {
        let id = id.into();
        let pid = self.state.child_pid(&id).ok_or(AwaitError::UnknownChild)?;

        let reason = {
            let record = self.state.get_mut(pid).ok_or(AwaitError::UnknownChild)?;
            match timeout(within, &mut record.runtime.monitor).await {
                Ok(joined) => joined.unwrap_or(ExitReason::Killed),
                Err(_elapsed) => return Err(AwaitError::Timeout),
            }
        };
        self.flushed.insert(pid);

        let mut records = self.pop_closure(pid);
        let position = records
            .iter()
            .position(|record| record.pid() == pid)
            .expect("awaited child is in its own closure");
        let mut trigger = records.remove(position);
        if let Some(timer) = trigger.runtime.timer.take() {
            timer.abort();
        }

        records.sort_by(|a, b| b.startup_index.cmp(&a.startup_index));
        self.stop_records(records).await;

        Ok(ExitedChild {
            pid,
            id: Some(id),
            meta: trigger.spec.meta.clone(),
            reason,
        })
    }

    // ---- Lifecycle dispatch ----

    /// Classifies and processes one inbox message.
    ///
    /// Hand every message of unknown origin here; anything the parent does
    /// not own comes back as [`MessageOutcome::Unhandled`].
    ///
    /// A [`TooManyRestarts`] error is fatal — propagate it out of the host
    /// task.
    pub async fn handle_message(
        &mut self,
        msg: Message<M>,
    ) -> Result<MessageOutcome<M>, TooManyRestarts> {
        match msg {
            Message::ChildExit { pid, reason } => {
                if self.flushed.remove(&pid) {
                    return Ok(MessageOutcome::Handled);
                }
                if !self.state.contains_pid(pid) {
                    return Ok(MessageOutcome::Unhandled(Message::ChildExit { pid, reason }));
                }
                let (exit, gave_up) = self.child_down(pid, reason, false).await?;
                Ok(MessageOutcome::Exited { exit, gave_up })
            }
            Message::ChildTimeout { pid } => {
                if !self.state.contains_pid(pid) {
                    // Timer fired between disarm and removal; already dealt
                    // with.
                    return Ok(MessageOutcome::Handled);
                }
                let (exit, gave_up) = self.child_down(pid, ExitReason::Timeout, true).await?;
                Ok(MessageOutcome::Exited { exit, gave_up })
            }
            Message::ResumeRestart(stopped) => {
                let report = restart::run(self, stopped.entries, false).await?;
                if report.deferred {
                    debug!("restart deferred again");
                }
                if report.gave_up.is_empty() {
                    Ok(MessageOutcome::Handled)
                } else {
                    Ok(MessageOutcome::GaveUp(report.gave_up))
                }
            }
            Message::Inquiry(inquiry) => {
                self.answer(inquiry);
                Ok(MessageOutcome::Handled)
            }
        }
    }

    /// Common path for a child that went (or is being taken) down.
    ///
    /// Returns the terminal report for the triggering child plus the
    /// children the accompanying restart permanently gave up on.
    async fn child_down(
        &mut self,
        pid: ChildPid,
        reason: ExitReason,
        kill_first: bool,
    ) -> Result<(ExitedChild<M>, Vec<ExitedChild<M>>), TooManyRestarts> {
        let mut records = self.pop_closure(pid);
        let position = records
            .iter()
            .position(|record| record.pid() == pid)
            .expect("triggering child is in its own closure");
        let mut trigger = records.remove(position);

        if kill_first {
            stopper::kill_child(&mut trigger).await;
            self.flushed.insert(pid);
        } else if let Some(timer) = trigger.runtime.timer.take() {
            timer.abort();
        }

        let exited = ExitedChild {
            pid,
            id: trigger.id().cloned(),
            meta: trigger.spec.meta.clone(),
            reason: reason.clone(),
        };
        debug!(%pid, id = ?exited.id, %reason, "child down");

        records.sort_by(|a, b| b.startup_index.cmp(&a.startup_index));
        let stopped_deps = self.stop_records(records).await;

        let mut gave_up = Vec::new();
        if trigger.spec.restart.wants_restart(&reason) {
            let mut entries = Vec::with_capacity(1 + stopped_deps.len());
            entries.push(RestartEntry {
                record: trigger,
                reason,
                record_restart: true,
            });
            entries.extend(stopped_deps.into_iter().map(|(record, _)| RestartEntry {
                record,
                reason: ExitReason::Shutdown,
                record_restart: false,
            }));
            let report = restart::run(self, entries, false).await?;
            gave_up = report.gave_up;
        }

        Ok((exited, gave_up))
    }

    fn answer(&self, inquiry: Inquiry<M>) {
        match inquiry {
            Inquiry::CountChildren { reply } => {
                let _ = reply.send(self.supervisor_count_children());
            }
            Inquiry::WhichChildren { reply } => {
                let _ = reply.send(self.supervisor_which_children());
            }
            Inquiry::ChildPid { id, reply } => {
                let _ = reply.send(self.state.child_pid(&id));
            }
            Inquiry::ChildMeta { id, reply } => {
                let _ = reply.send(self.state.child_meta(&ChildRef::Id(id)));
            }
        }
    }

    // ---- Queries ----

    /// Live children in ascending startup order.
    pub fn children(&self) -> Vec<ChildInfo<M>> {
        self.state
            .children_sorted()
            .into_iter()
            .map(|record| ChildInfo {
                id: record.id().cloned(),
                pid: record.pid(),
                meta: record.spec.meta.clone(),
            })
            .collect()
    }

    /// Number of live children.
    pub fn num_children(&self) -> usize {
        self.state.num_children()
    }

    /// Whether the reference names a live child.
    pub fn is_child(&self, child: impl Into<ChildRef>) -> bool {
        self.state.resolve(&child.into()).is_some()
    }

    /// Identity of the child running under `pid`, if it has one.
    pub fn child_id(&self, pid: ChildPid) -> Option<ChildId> {
        self.state.child_id(pid)
    }

    /// Current pid of the identified child.
    pub fn child_pid(&self, id: impl Into<ChildId>) -> Option<ChildPid> {
        self.state.child_pid(&id.into())
    }

    /// Current meta of the referenced child.
    pub fn child_meta(&self, child: impl Into<ChildRef>) -> Option<M> {
        self.state.child_meta(&child.into())
    }

    /// Applies a pure transformation to the referenced child's meta.
    pub fn update_child_meta(
        &mut self,
        child: impl Into<ChildRef>,
        update: impl FnOnce(&mut M),
    ) -> Result<(), UnknownChild> {
        let pid = self.state.update_meta(&child.into(), update)?;
        self.publish(pid);
        Ok(())
    }

    /// Supervisor-style summaries of the live children.
    pub fn supervisor_which_children(&self) -> Vec<ChildSummary> {
        self.state
            .children_sorted()
            .into_iter()
            .map(|record| ChildSummary {
                id: record.id().cloned(),
                pid: record.pid(),
            })
            .collect()
    }

    /// Supervisor-style counts of the live children.
    pub fn supervisor_count_children(&self) -> ChildCounts {
        let count = self.state.num_children();
        ChildCounts {
            specs: count,
            active: count,
            workers: count,
            supervisors: 0,
        }
    }

    // ---- Internals shared with the restart engine ----

    pub(crate) fn alloc_pid(&mut self) -> ChildPid {
        self.next_pid += 1;
        ChildPid::new(self.next_pid)
    }

    /// Removes a child and its transitive dependents from the registry and
    /// the lookup table.
    pub(crate) fn pop_closure(&mut self, pid: ChildPid) -> Vec<ChildRecord<M>> {
        let records = self.state.pop_with_dependents(pid);
        if let Some(lookup) = &self.lookup {
            for record in &records {
                if let Some(id) = record.id() {
                    lookup.remove(id);
                }
            }
        }
        records
    }

    /// Stops records in the given order, flushing their exit signals.
    pub(crate) async fn stop_records(
        &mut self,
        records: Vec<ChildRecord<M>>,
    ) -> Vec<(ChildRecord<M>, ExitReason)> {
        stopper::stop_children(records, &mut self.flushed).await
    }

    /// Re-registers a restarted record under its new runtime.
    ///
    /// Bindings whose prerequisite did not survive the restart are
    /// dissolved; everything else was rewritten to the new pids already.
    pub(crate) fn readmit(&mut self, mut record: ChildRecord<M>, runtime: ChildRuntime) {
        record
            .spec
            .binds_to
            .retain(|bound| self.state.resolve(bound).is_some());
        let pid = runtime.pid;
        self.state.re_register(record, runtime);
        self.publish(pid);
    }

    /// Mirrors a child's current id → (pid, meta) into the lookup table.
    fn publish(&self, pid: ChildPid) {
        let Some(lookup) = &self.lookup else {
            return;
        };
        let Some(record) = self.state.get(pid) else {
            return;
        };
        if let Some(id) = record.id() {
            lookup.insert(id.clone(), pid, record.spec.meta.clone());
        }
    }
}
