//! # The restart engine: re-entering a set of stopped children.
//!
//! Input is a list of records that were just taken out of the registry,
//! each tagged with its exit reason and whether the failure should be
//! charged against restart budgets. The plan:
//!
//! ```text
//! 1. drop entries already live again (idempotence under re-entry)
//! 2. sort by startup index, ascending
//! 3. charge budgets for genuine failures — refusal is fatal
//! 4. split: temporary children are given up unless explicitly included
//! 5. respawn sequentially, rewriting pid-expressed bindings as children
//!    come back under new pids
//! 6. on the first failure: roll back every group touched by the unstarted
//!    remainder, package the survivors into a ResumeRestart self-message
//! 7. on full success: report the children given up in step 4
//! ```
//!
//! ## Rules
//! - Running the plan twice over the same input leaves the registry as if
//!   it ran once.
//! - No shutdown-group is ever left with a strict subset of its members
//!   registered.
//! - Only entries tagged `record_restart` are charged; cascaded shutdowns
//!   ride along for free.
//! - Deferred retries carry no delay; the parent processes other work
//!   until the self-message is dequeued.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::children::{ChildPid, ChildRef, ShutdownGroup};
use crate::core::message::{ExitedChild, Message};
use crate::core::parent::Parent;
use crate::core::spawner::{self, SpawnOutcome};
use crate::core::state::ChildRecord;
use crate::error::{ExitReason, TooManyRestarts};
use crate::policies::Restart;

/// Children taken out of the registry, ready to be re-entered.
///
/// Produced by the shutdown operations and consumed by
/// [`Parent::return_children`](crate::Parent::return_children); also the
/// payload of the deferred-restart self-message. Opaque on purpose: the
/// records inside carry live runtime bookkeeping.
pub struct StoppedChildren<M> {
    pub(crate) entries: Vec<RestartEntry<M>>,
}

impl<M> StoppedChildren<M> {
    /// Number of stopped children carried.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was stopped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exit reason observed for the child with the given id, if present.
    pub fn exit_reason(&self, id: impl Into<crate::children::ChildId>) -> Option<&ExitReason> {
        let id = id.into();
        self.entries
            .iter()
            .find(|entry| entry.record.id() == Some(&id))
            .map(|entry| &entry.reason)
    }

    pub(crate) fn from_stopped(stopped: Vec<(ChildRecord<M>, ExitReason)>) -> Self {
        let entries = stopped
            .into_iter()
            .map(|(record, reason)| RestartEntry {
                record,
                reason,
                record_restart: false,
            })
            .collect();
        Self { entries }
    }
}

impl<M> fmt::Debug for StoppedChildren<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoppedChildren")
            .field("len", &self.entries.len())
            .finish()
    }
}

/// One stopped child inside a restart plan.
pub(crate) struct RestartEntry<M> {
    pub record: ChildRecord<M>,
    pub reason: ExitReason,
    /// Whether this child's failure counts against restart budgets.
    pub record_restart: bool,
}

/// What a plan run produced.
pub(crate) struct RestartReport<M> {
    /// Children that will not come back; the host may purge external views.
    pub gave_up: Vec<ExitedChild<M>>,
    /// Whether a `ResumeRestart` self-message was posted.
    pub deferred: bool,
}

/// Runs the restart plan over `entries`.
///
/// `include_temporary` re-enters temporary children too; used when the
/// caller stopped them explicitly and is returning them wholesale.
pub(crate) async fn run<M>(
    parent: &mut Parent<M>,
    entries: Vec<RestartEntry<M>>,
    include_temporary: bool,
) -> Result<RestartReport<M>, TooManyRestarts>
where
    M: Clone + Send + 'static,
{
    // Step 1: entries whose child is already live again are no-ops. Ids
    // cover named children; preserved startup indices cover anonymous ones.
    let mut entries: Vec<RestartEntry<M>> = entries
        .into_iter()
        .filter(|entry| {
            let id_live = entry
                .record
                .id()
                .is_some_and(|id| parent.state.contains_id(id));
            !id_live && !parent.state.has_startup_index(entry.record.startup_index)
        })
        .collect();

    // Step 2: children re-enter in the order they originally started.
    entries.sort_by_key(|entry| entry.record.startup_index);

    // Step 3: genuine failures are charged against both scopes up front.
    let now = Instant::now();
    for entry in entries.iter_mut().filter(|entry| entry.record_restart) {
        let parent_ok = parent.state.record_restart(now).is_ok();
        let child_ok = entry
            .record
            .restarts
            .record(&entry.record.spec.budget, now)
            .is_ok();
        if !parent_ok || !child_ok {
            warn!(pid = %entry.record.pid(), "restart budget exhausted, giving up");
            return Err(TooManyRestarts);
        }
    }

    // Step 4: temporary children that went down on their own stay down.
    let (to_start, to_ignore): (Vec<_>, Vec<_>) = entries.into_iter().partition(|entry| {
        include_temporary || entry.record.spec.restart != Restart::Temporary
    });

    let mut report = RestartReport {
        gave_up: Vec::new(),
        deferred: false,
    };
    for entry in to_ignore {
        give_up(&mut report.gave_up, entry);
    }

    // Step 5: sequential respawn, rebinding pid references as we go.
    let mut remap: HashMap<ChildPid, ChildPid> = HashMap::new();
    let mut pending: VecDeque<RestartEntry<M>> = to_start.into();

    while let Some(mut entry) = pending.pop_front() {
        rebind(&mut entry.record.spec.binds_to, &remap);

        let old_pid = entry.record.pid();
        let new_pid = parent.alloc_pid();

        match spawner::spawn_child(new_pid, &entry.record.spec, &parent.tx) {
            Ok(SpawnOutcome::Started(runtime)) => {
                debug!(%old_pid, %new_pid, id = ?entry.record.id(), "child restarted");
                remap.insert(old_pid, new_pid);
                parent.readmit(entry.record, runtime);
            }
            Ok(SpawnOutcome::Ignored) => {
                debug!(%old_pid, id = ?entry.record.id(), "child ignored its restart");
                let entangled = pending
                    .iter()
                    .any(|other| is_entangled(&other.record, &entry.record, old_pid));
                entry.reason = ExitReason::Ignored;
                give_up(&mut report.gave_up, entry);
                if entangled {
                    bail_out(parent, None, pending, &mut report).await;
                    return Ok(report);
                }
            }
            Err(err) => {
                warn!(%old_pid, id = ?entry.record.id(), error = %err, "child failed to restart");
                entry.reason = ExitReason::Failed(err.to_string());
                entry.record_restart = true;
                bail_out(parent, Some(entry), pending, &mut report).await;
                return Ok(report);
            }
        }
    }

    Ok(report)
}

/// Step 6: the cascade after a mid-plan failure.
///
/// Every shutdown-group touched by the unstarted remainder is rolled back
/// (already-revived members are stopped again), temporary children become
/// final no-shows, and the rest is packaged into a deferred self-message.
async fn bail_out<M>(
    parent: &mut Parent<M>,
    failing: Option<RestartEntry<M>>,
    unstarted: VecDeque<RestartEntry<M>>,
    report: &mut RestartReport<M>,
) where
    M: Clone + Send + 'static,
{
    let mut groups: HashSet<ShutdownGroup> = unstarted
        .iter()
        .filter_map(|entry| entry.record.spec.group.clone())
        .collect();
    if let Some(entry) = &failing {
        groups.extend(entry.record.spec.group.clone());
    }

    let mut pulled_back = Vec::new();
    for group in &groups {
        for pid in parent.state.children_in_group(group) {
            pulled_back.append(&mut parent.pop_closure(pid));
        }
    }
    pulled_back.sort_by(|a, b| b.startup_index.cmp(&a.startup_index));
    let stopped = parent.stop_records(pulled_back).await;

    let mut candidates: Vec<RestartEntry<M>> = Vec::new();
    candidates.extend(failing);
    candidates.extend(unstarted.into_iter().map(|mut entry| {
        entry.reason = ExitReason::Shutdown;
        entry.record_restart = false;
        entry
    }));
    candidates.extend(stopped.into_iter().map(|(record, _)| RestartEntry {
        record,
        reason: ExitReason::Shutdown,
        record_restart: false,
    }));

    let mut deferred = Vec::new();
    for entry in candidates {
        if entry.record.spec.restart == Restart::Temporary {
            give_up(&mut report.gave_up, entry);
        } else {
            deferred.push(entry);
        }
    }

    if !deferred.is_empty() {
        report.deferred = true;
        let _ = parent.tx.send(Message::ResumeRestart(StoppedChildren {
            entries: deferred,
        }));
    }
}

/// Substitutes new pids into handle-expressed bindings.
fn rebind(binds: &mut [ChildRef], remap: &HashMap<ChildPid, ChildPid>) {
    for bound in binds.iter_mut() {
        if let ChildRef::Pid(pid) = bound {
            if let Some(new_pid) = remap.get(pid) {
                *bound = ChildRef::Pid(*new_pid);
            }
        }
    }
}

/// Whether `pending` cannot come up without `ignored` (binding or group).
fn is_entangled<M>(
    pending: &ChildRecord<M>,
    ignored: &ChildRecord<M>,
    ignored_pid: ChildPid,
) -> bool {
    let same_group = matches!(
        (&pending.spec.group, &ignored.spec.group),
        (Some(a), Some(b)) if a == b
    );
    same_group
        || pending.spec.binds_to.iter().any(|bound| match bound {
            ChildRef::Pid(pid) => *pid == ignored_pid,
            ChildRef::Id(id) => Some(id) == ignored.spec.id.as_ref(),
        })
}

/// Records a child that will not come back, unless it is ephemeral.
fn give_up<M: Clone>(gave_up: &mut Vec<ExitedChild<M>>, entry: RestartEntry<M>) {
    if entry.record.spec.ephemeral {
        return;
    }
    gave_up.push(ExitedChild {
        pid: entry.record.pid(),
        id: entry.record.id().cloned(),
        meta: entry.record.spec.meta.clone(),
        reason: entry.reason,
    });
}
