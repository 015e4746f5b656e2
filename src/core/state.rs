//! # The registry: pure bookkeeping of live children.
//!
//! [`State`] owns every index the parent consults:
//! - `children` — pid → record (the single source of truth),
//! - `ids` — identity → pid (injective; one live child per id),
//! - `deps` — prerequisite pid → pids of the children bound to it,
//! - `groups` — shutdown-group → member pids,
//! - the parent-wide restart window, and the startup-index counter.
//!
//! ## Rules
//! - State never spawns, stops, or sleeps; it is a value. Side effects live
//!   in the spawner, the stopper, and the dispatcher.
//! - Every pid appearing in `ids`, `deps`, or `groups` is a key of
//!   `children`.
//! - Startup indices are assigned once, strictly increasing, and survive
//!   restarts (`re_register` keeps the record's original index), so
//!   shutdown order and restart order stay stable across the parent's
//!   lifetime.
//! - [`State::pop_with_dependents`] removes the transitive closure of a
//!   child under reverse-dependency edges and shutdown-group membership.
//!   The closure is a set; callers impose ordering. A visited set makes
//!   pathological binding cycles terminate — a cycle is just one atomic
//!   set.

use std::collections::{HashMap, HashSet};

use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::children::{ChildId, ChildPid, ChildRef, ChildSpec, ShutdownGroup};
use crate::error::{ExitReason, UnknownChild};
use crate::policies::{BudgetExhausted, RestartBudget, RestartWindow};

/// Live task handles of one running child.
pub(crate) struct ChildRuntime {
    /// Handle the child is registered under.
    pub pid: ChildPid,
    /// Cooperative stop signal.
    pub token: CancellationToken,
    /// Forced-kill handle of the child task.
    pub abort: AbortHandle,
    /// Monitor resolving to the child's exit reason.
    pub monitor: JoinHandle<ExitReason>,
    /// Armed lifetime timer, if the spec carries a timeout.
    pub timer: Option<AbortHandle>,
}

/// One registered child: spec, runtime attributes, restart history.
pub(crate) struct ChildRecord<M> {
    pub spec: ChildSpec<M>,
    pub startup_index: u64,
    pub restarts: RestartWindow,
    pub runtime: ChildRuntime,
}

impl<M> ChildRecord<M> {
    pub fn pid(&self) -> ChildPid {
        self.runtime.pid
    }

    pub fn id(&self) -> Option<&ChildId> {
        self.spec.id.as_ref()
    }
}

/// Registry of live children and the indexes over them.
pub(crate) struct State<M> {
    children: HashMap<ChildPid, ChildRecord<M>>,
    ids: HashMap<ChildId, ChildPid>,
    deps: HashMap<ChildPid, Vec<ChildPid>>,
    groups: HashMap<ShutdownGroup, Vec<ChildPid>>,
    window: RestartWindow,
    budget: RestartBudget,
    startup_index: u64,
}

impl<M> State<M> {
    pub fn new(budget: RestartBudget) -> Self {
        Self {
            children: HashMap::new(),
            ids: HashMap::new(),
            deps: HashMap::new(),
            groups: HashMap::new(),
            window: RestartWindow::new(),
            budget,
            startup_index: 0,
        }
    }

    /// Inserts a freshly started child and assigns its startup index.
    ///
    /// Panics if the pid is already registered or the id collides; callers
    /// check both before spawning.
    pub fn register(&mut self, spec: ChildSpec<M>, runtime: ChildRuntime) -> u64 {
        let index = self.startup_index;
        self.startup_index += 1;

        let record = ChildRecord {
            spec,
            startup_index: index,
            restarts: RestartWindow::new(),
            runtime,
        };
        self.insert(record);
        index
    }

    /// Re-inserts a previously popped record under a new runtime, keeping
    /// its startup index, spec, and restart history.
    pub fn re_register(&mut self, mut record: ChildRecord<M>, runtime: ChildRuntime) {
        record.runtime = runtime;
        self.insert(record);
    }

    fn insert(&mut self, record: ChildRecord<M>) {
        let pid = record.pid();
        assert!(
            !self.children.contains_key(&pid),
            "child {pid} is already registered"
        );

        if let Some(id) = record.id() {
            let prev = self.ids.insert(id.clone(), pid);
            assert!(prev.is_none(), "child id '{id}' is already registered");
        }
        if let Some(group) = &record.spec.group {
            self.groups.entry(group.clone()).or_default().push(pid);
        }
        for bound in &record.spec.binds_to {
            if let Some(prereq) = self.resolve(bound) {
                self.deps.entry(prereq).or_default().push(pid);
            }
        }
        self.children.insert(pid, record);
    }

    /// Resolves an id or pid reference to a live pid.
    pub fn resolve(&self, child: &ChildRef) -> Option<ChildPid> {
        match child {
            ChildRef::Id(id) => self.ids.get(id).copied(),
            ChildRef::Pid(pid) if self.children.contains_key(pid) => Some(*pid),
            ChildRef::Pid(_) => None,
        }
    }

    pub fn contains_pid(&self, pid: ChildPid) -> bool {
        self.children.contains_key(&pid)
    }

    pub fn contains_id(&self, id: &ChildId) -> bool {
        self.ids.contains_key(id)
    }

    /// Whether any live record carries the given startup index.
    ///
    /// Indices are unique and survive restarts, which makes this the
    /// idempotence check for anonymous children.
    pub fn has_startup_index(&self, index: u64) -> bool {
        self.children
            .values()
            .any(|record| record.startup_index == index)
    }

    pub fn get(&self, pid: ChildPid) -> Option<&ChildRecord<M>> {
        self.children.get(&pid)
    }

    pub fn get_mut(&mut self, pid: ChildPid) -> Option<&mut ChildRecord<M>> {
        self.children.get_mut(&pid)
    }

    /// Removes the transitive closure of `root` under reverse-dependency
    /// edges and shutdown-group membership.
    ///
    /// The returned records are a set; callers sort by startup index.
    pub fn pop_with_dependents(&mut self, root: ChildPid) -> Vec<ChildRecord<M>> {
        if !self.children.contains_key(&root) {
            return Vec::new();
        }

        let mut visited = HashSet::from([root]);
        let mut queue = vec![root];
        let mut members = Vec::new();

        while let Some(pid) = queue.pop() {
            members.push(pid);

            if let Some(record) = self.children.get(&pid) {
                if let Some(group) = &record.spec.group {
                    for mate in self.groups.get(group).into_iter().flatten() {
                        if visited.insert(*mate) {
                            queue.push(*mate);
                        }
                    }
                }
            }
            for dependent in self.deps.get(&pid).into_iter().flatten() {
                if visited.insert(*dependent) {
                    queue.push(*dependent);
                }
            }
        }

        members
            .into_iter()
            .filter_map(|pid| self.remove(pid))
            .collect()
    }

    fn remove(&mut self, pid: ChildPid) -> Option<ChildRecord<M>> {
        let record = self.children.remove(&pid)?;

        if let Some(id) = record.id() {
            self.ids.remove(id);
        }
        if let Some(group) = &record.spec.group {
            if let Some(members) = self.groups.get_mut(group) {
                members.retain(|member| *member != pid);
                if members.is_empty() {
                    self.groups.remove(group);
                }
            }
        }
        self.deps.remove(&pid);
        for dependents in self.deps.values_mut() {
            dependents.retain(|dependent| *dependent != pid);
        }
        Some(record)
    }

    /// Pids currently registered in `group`.
    pub fn children_in_group(&self, group: &ShutdownGroup) -> Vec<ChildPid> {
        self.groups.get(group).cloned().unwrap_or_default()
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn child_id(&self, pid: ChildPid) -> Option<ChildId> {
        self.children.get(&pid).and_then(|r| r.id().cloned())
    }

    pub fn child_pid(&self, id: &ChildId) -> Option<ChildPid> {
        self.ids.get(id).copied()
    }

    /// Live records in ascending startup order.
    pub fn children_sorted(&self) -> Vec<&ChildRecord<M>> {
        let mut records: Vec<_> = self.children.values().collect();
        records.sort_by_key(|record| record.startup_index);
        records
    }

    /// Charges one restart against the parent-wide budget.
    pub fn record_restart(&mut self, now: Instant) -> Result<(), BudgetExhausted> {
        self.window.record(&self.budget, now)
    }

    /// Empties the registry, keeping only the startup-index counter so
    /// children started later never collide with returned ones.
    pub fn reinitialize(&mut self) {
        self.children.clear();
        self.ids.clear();
        self.deps.clear();
        self.groups.clear();
        self.window = RestartWindow::new();
    }

    /// Removes every record, in reverse startup order, and reinitializes.
    pub fn take_all(&mut self) -> Vec<ChildRecord<M>> {
        let mut records: Vec<_> = self.children.drain().map(|(_, record)| record).collect();
        records.sort_by(|a, b| b.startup_index.cmp(&a.startup_index));
        self.reinitialize();
        records
    }
}

impl<M: Clone> State<M> {
    pub fn child_meta(&self, child: &ChildRef) -> Option<M> {
        let pid = self.resolve(child)?;
        self.children.get(&pid).map(|r| r.spec.meta.clone())
    }

    /// Applies a pure transformation to a child's meta.
    pub fn update_meta(
        &mut self,
        child: &ChildRef,
        update: impl FnOnce(&mut M),
    ) -> Result<ChildPid, UnknownChild> {
        let pid = self.resolve(child).ok_or(UnknownChild)?;
        let record = self.children.get_mut(&pid).ok_or(UnknownChild)?;
        update(&mut record.spec.meta);
        Ok(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::children::ChildFn;

    fn spec(id: Option<&'static str>) -> ChildSpec<u32> {
        let base = ChildSpec::run(ChildFn::arc(|_ctx| async { Ok(()) }));
        match id {
            Some(id) => base.id(id),
            None => base,
        }
    }

    fn runtime(raw: u64) -> ChildRuntime {
        let monitor = tokio::spawn(async { ExitReason::Normal });
        let abort = monitor.abort_handle();
        ChildRuntime {
            pid: ChildPid::new(raw),
            token: CancellationToken::new(),
            abort,
            monitor,
            timer: None,
        }
    }

    fn state() -> State<u32> {
        State::new(RestartBudget::INFINITE)
    }

    #[tokio::test]
    async fn register_assigns_dense_increasing_indices() {
        let mut state = state();
        assert_eq!(state.register(spec(Some("a")), runtime(1)), 0);
        assert_eq!(state.register(spec(Some("b")), runtime(2)), 1);
        assert_eq!(state.num_children(), 2);
        assert_eq!(state.child_pid(&ChildId::from("b")), Some(ChildPid::new(2)));
        assert_eq!(state.child_id(ChildPid::new(1)), Some(ChildId::from("a")));
    }

    #[tokio::test]
    async fn pop_collects_group_mates_and_dependents() {
        let mut state = state();
        state.register(spec(Some("a")), runtime(1));
        state.register(spec(Some("b")).binds_to(["a"]), runtime(2));
        state.register(spec(Some("c")).in_group("g"), runtime(3));
        state.register(spec(Some("d")).in_group("g").binds_to(["b"]), runtime(4));
        state.register(spec(Some("e")), runtime(5));

        // a drags b (bound), b drags d (bound), d drags c (group mate).
        let popped = state.pop_with_dependents(ChildPid::new(1));
        let mut ids: Vec<_> = popped
            .iter()
            .filter_map(|r| r.id().map(|id| id.as_str().to_string()))
            .collect();
        ids.sort();
        assert_eq!(ids, ["a", "b", "c", "d"]);

        assert_eq!(state.num_children(), 1);
        assert!(state.contains_id(&ChildId::from("e")));
        assert!(state.children_in_group(&ShutdownGroup::from("g")).is_empty());
    }

    #[tokio::test]
    async fn groups_are_never_half_removed() {
        let mut state = state();
        state.register(spec(Some("x")).in_group("pair"), runtime(1));
        state.register(spec(Some("y")).in_group("pair"), runtime(2));

        let popped = state.pop_with_dependents(ChildPid::new(2));
        assert_eq!(popped.len(), 2);
        assert_eq!(state.num_children(), 0);
    }

    #[tokio::test]
    async fn reinitialize_preserves_the_index_counter() {
        let mut state = state();
        state.register(spec(Some("a")), runtime(1));
        state.register(spec(Some("b")), runtime(2));

        let drained = state.take_all();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].id(), Some(&ChildId::from("b")));

        assert_eq!(state.register(spec(Some("c")), runtime(3)), 2);
    }

    #[tokio::test]
    async fn re_register_preserves_startup_index() {
        let mut state = state();
        state.register(spec(Some("a")), runtime(1));
        state.register(spec(Some("b")), runtime(2));

        let mut popped = state.pop_with_dependents(ChildPid::new(1));
        let record = popped.remove(0);
        assert_eq!(record.startup_index, 0);

        state.re_register(record, runtime(9));
        assert!(state.has_startup_index(0));
        assert_eq!(state.child_pid(&ChildId::from("a")), Some(ChildPid::new(9)));
    }

    #[tokio::test]
    #[should_panic(expected = "already registered")]
    async fn re_register_refuses_a_live_pid() {
        let mut state = state();
        state.register(spec(Some("a")), runtime(1));

        let mut popped = state.pop_with_dependents(ChildPid::new(1));
        let record = popped.remove(0);
        state.register(spec(Some("b")), runtime(1));
        state.re_register(record, runtime(1));
    }

    #[tokio::test]
    async fn update_meta_applies_the_transformation() {
        let mut state = state();
        state.register(spec(Some("a")).meta(1), runtime(1));

        let child = ChildRef::from("a");
        state.update_meta(&child, |m| *m += 1).unwrap();
        assert_eq!(state.child_meta(&child), Some(2));

        let missing = ChildRef::from("nope");
        assert_eq!(state.update_meta(&missing, |_| {}), Err(UnknownChild));
    }
}
