//! # Child specification.
//!
//! [`ChildSpec`] bundles everything the parent needs to run one child:
//! identity, start descriptor, user annotation (`meta`), shutdown and
//! restart policies, lifetime timeout, restart budget, bindings, and
//! shutdown-group membership.
//!
//! A spec can be built three ways:
//! - **Explicitly** — [`ChildSpec::run`] / [`ChildSpec::init`] plus the
//!   fluent setters.
//! - **From a bare descriptor** — `From<ChildTaskRef>` with all defaults.
//! - **From a blueprint plus argument** — `From<(B, A)>` where
//!   `B:`[`ChildBlueprint`]`<A, M>`, mirroring reusable component modules
//!   that know how to describe their own children.
//!
//! ## Defaults
//! - `shutdown` — graceful, 5000 ms deadline
//! - `restart` — [`Restart::Permanent`]
//! - `timeout` — none (infinite lifetime)
//! - `budget` — infinite
//! - `meta` — `M::default()`

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::children::{
    id::{ChildId, ChildRef, ShutdownGroup},
    task::{ChildFn, ChildInit, ChildTaskRef, StartResult},
};
use crate::error::ChildError;
use crate::policies::{Restart, RestartBudget, ShutdownPolicy};

/// Declarative description of one supervised child.
///
/// `M` is the opaque user annotation carried alongside the child; it must
/// be `Clone + Send` and defaults to `()`.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use brood::{ChildError, ChildSpec, Restart, ShutdownPolicy};
///
/// let spec: ChildSpec<u32> = ChildSpec::run_fn(|ctx| async move {
///     ctx.cancelled().await;
///     Ok::<_, ChildError>(())
/// })
/// .id("worker")
/// .meta(7)
/// .restart(Restart::Transient)
/// .shutdown(ShutdownPolicy::Graceful(Duration::from_millis(100)));
///
/// assert_eq!(spec.child_id().map(|id| id.as_str()), Some("worker"));
/// ```
pub struct ChildSpec<M = ()> {
    pub(crate) id: Option<ChildId>,
    pub(crate) start: ChildTaskRef,
    pub(crate) meta: M,
    pub(crate) shutdown: ShutdownPolicy,
    pub(crate) restart: Restart,
    pub(crate) timeout: Option<Duration>,
    pub(crate) budget: RestartBudget,
    pub(crate) binds_to: Vec<ChildRef>,
    pub(crate) group: Option<ShutdownGroup>,
    pub(crate) ephemeral: bool,
}

impl<M: Default> ChildSpec<M> {
    /// Creates a spec around an existing start descriptor, with defaults.
    pub fn run(start: ChildTaskRef) -> Self {
        Self {
            id: None,
            start,
            meta: M::default(),
            shutdown: ShutdownPolicy::default(),
            restart: Restart::default(),
            timeout: None,
            budget: RestartBudget::default(),
            binds_to: Vec::new(),
            group: None,
            ephemeral: false,
        }
    }

    /// Creates a spec from a closure producing the child future.
    pub fn run_fn<F, Fut>(func: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ChildError>> + Send + 'static,
    {
        Self::run(ChildFn::arc(func))
    }

    /// Creates a spec from a closure with full control over the start
    /// outcome (run, ignore, or fail).
    pub fn init<F>(func: F) -> Self
    where
        F: FnMut(CancellationToken) -> StartResult + Send + 'static,
    {
        Self::run(ChildInit::arc(func))
    }
}

impl<M> ChildSpec<M> {
    /// Sets the child's identity.
    pub fn id(mut self, id: impl Into<ChildId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the opaque user annotation.
    pub fn meta(mut self, meta: M) -> Self {
        self.meta = meta;
        self
    }

    /// Sets the restart policy.
    pub fn restart(mut self, restart: Restart) -> Self {
        self.restart = restart;
        self
    }

    /// Sets the shutdown policy.
    pub fn shutdown(mut self, shutdown: ShutdownPolicy) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Caps the child's lifetime; on expiry the parent terminates it with
    /// reason [`ExitReason::Timeout`](crate::ExitReason::Timeout).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the per-child restart budget.
    pub fn restart_budget(mut self, budget: RestartBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Declares the children this child depends on.
    ///
    /// A binding is directional: if a prerequisite goes down, this child
    /// goes down with it. Every referenced child must be live when this
    /// spec is started.
    pub fn binds_to<I, R>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ChildRef>,
    {
        self.binds_to = refs.into_iter().map(Into::into).collect();
        self
    }

    /// Places the child into a shutdown-group.
    pub fn in_group(mut self, group: impl Into<ShutdownGroup>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Marks the child ephemeral: when it leaves without a restart it
    /// vanishes silently instead of being reported as given up.
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Returns the child's identity, if any.
    pub fn child_id(&self) -> Option<&ChildId> {
        self.id.as_ref()
    }
}

impl<M: Default> From<ChildTaskRef> for ChildSpec<M> {
    /// A bare start descriptor becomes an anonymous child with defaults.
    fn from(start: ChildTaskRef) -> Self {
        Self::run(start)
    }
}

/// A component that knows how to describe its own child.
///
/// The blueprint form lets reusable modules own their spec defaults while
/// the caller supplies only the instantiation argument:
///
/// ```rust
/// use brood::{ChildBlueprint, ChildError, ChildSpec};
///
/// struct Poller;
///
/// impl ChildBlueprint<u64> for Poller {
///     fn child_spec(&self, interval_ms: u64) -> ChildSpec {
///         ChildSpec::run_fn(move |ctx| async move {
///             while !ctx.is_cancelled() {
///                 tokio::time::sleep(std::time::Duration::from_millis(interval_ms)).await;
///             }
///             Ok::<_, ChildError>(())
///         })
///         .id("poller")
///     }
/// }
///
/// let spec: ChildSpec = (Poller, 250).into();
/// assert!(spec.child_id().is_some());
/// ```
pub trait ChildBlueprint<A, M = ()> {
    /// Produces the spec for one child instantiated with `arg`.
    fn child_spec(&self, arg: A) -> ChildSpec<M>;
}

impl<B, A, M> From<(B, A)> for ChildSpec<M>
where
    B: ChildBlueprint<A, M>,
{
    fn from((blueprint, arg): (B, A)) -> Self {
        blueprint.child_spec(arg)
    }
}
