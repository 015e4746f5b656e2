//! # The child-task abstraction and its function-backed implementations.
//!
//! A child is described by a start descriptor — a [`ChildTask`] — that the
//! parent invokes every time the child is (re)started. Invoking it yields a
//! [`StartResult`] with one of three shapes:
//!
//! - [`StartResult::Run`] — a future for the parent to drive as a Tokio
//!   task; the child counts as *started*.
//! - [`StartResult::Ignore`] — the descriptor declined to start; nothing is
//!   registered.
//! - [`StartResult::Fail`] — starting failed with a reason.
//!
//! Two ready-made descriptors cover most uses: [`ChildFn`] wraps a closure
//! producing the child future (always runs), and [`ChildInit`] wraps a
//! closure producing the full [`StartResult`] (full control).
//!
//! ## Rules
//! - A started child receives a [`CancellationToken`] and **must** check it
//!   periodically; the token is the parent's cooperative stop signal.
//! - The descriptor is re-invoked on restart, so each invocation must
//!   produce a fresh, independent future.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::error::{ChildError, StartError};

/// Boxed future a child task runs to completion.
pub type BoxChildFuture = Pin<Box<dyn Future<Output = Result<(), ChildError>> + Send + 'static>>;

/// Shared handle to a start descriptor.
///
/// This is the type [`ChildSpec`](crate::ChildSpec) stores; cloning it is
/// cheap, and the same descriptor may back several children.
pub type ChildTaskRef = Arc<dyn ChildTask>;

/// Outcome of invoking a start descriptor.
pub enum StartResult {
    /// Run this future as the child task.
    Run(BoxChildFuture),
    /// Decline to start; the parent registers nothing.
    Ignore,
    /// Starting failed.
    Fail(StartError),
}

/// Start descriptor of a child.
///
/// `init` is called once per (re)start and must hand back a fresh future.
/// Implementations returning [`StartResult::Ignore`] or
/// [`StartResult::Fail`] let a child opt out of starting, e.g. when a
/// feature flag is off or a resource is missing.
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use brood::{ChildTask, StartResult};
///
/// struct Ticker;
///
/// impl ChildTask for Ticker {
///     fn init(&self, ctx: CancellationToken) -> StartResult {
///         StartResult::Run(Box::pin(async move {
///             while !ctx.is_cancelled() {
///                 tokio::time::sleep(std::time::Duration::from_secs(1)).await;
///             }
///             Ok(())
///         }))
///     }
/// }
/// ```
pub trait ChildTask: Send + Sync + 'static {
    /// Produces the child's future, or declines to start.
    ///
    /// The returned future **must** watch `ctx` and exit promptly once it is
    /// cancelled; otherwise the parent escalates to a forced kill when the
    /// child's shutdown deadline expires.
    fn init(&self, ctx: CancellationToken) -> StartResult;
}

/// Function-backed start descriptor that always runs.
///
/// Wraps a closure that *creates* a new future per start, so there is no
/// hidden state shared between restarts; share state explicitly through an
/// `Arc<...>` inside the closure when you need it.
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use brood::{ChildError, ChildFn, ChildTaskRef};
///
/// let task: ChildTaskRef = ChildFn::arc(|ctx: CancellationToken| async move {
///     if ctx.is_cancelled() {
///         return Ok(());
///     }
///     // do work...
///     Ok::<_, ChildError>(())
/// });
/// ```
pub struct ChildFn<F> {
    f: F,
}

impl<F> ChildFn<F> {
    /// Creates a new function-backed descriptor.
    ///
    /// Prefer [`ChildFn::arc`] when you immediately need a [`ChildTaskRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the descriptor and returns it as a shared handle.
    pub fn arc<Fut>(f: F) -> ChildTaskRef
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ChildError>> + Send + 'static,
    {
        Arc::new(Self::new(f))
    }
}

impl<F, Fut> ChildTask for ChildFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ChildError>> + Send + 'static,
{
    fn init(&self, ctx: CancellationToken) -> StartResult {
        StartResult::Run(Box::pin((self.f)(ctx)))
    }
}

/// Function-backed start descriptor with full control over the outcome.
///
/// The closure decides per invocation whether the child runs, is ignored,
/// or fails to start. It sits behind a [`Mutex`] so it may be `FnMut` and
/// carry state from one start attempt to the next; the lock is held only
/// while the closure runs, never while the child does.
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use brood::{ChildInit, ChildTaskRef, StartResult};
///
/// let mut warmed_up = false;
/// let task: ChildTaskRef = ChildInit::arc(move |_ctx: CancellationToken| {
///     if !warmed_up {
///         warmed_up = true;
///         return StartResult::Ignore;
///     }
///     StartResult::Run(Box::pin(async { Ok(()) }))
/// });
/// ```
pub struct ChildInit<F> {
    func: Mutex<F>,
}

impl<F> ChildInit<F> {
    /// Creates a new descriptor from the given closure.
    pub fn new(func: F) -> Self
    where
        F: FnMut(CancellationToken) -> StartResult + Send + 'static,
    {
        Self {
            func: Mutex::new(func),
        }
    }

    /// Creates the descriptor and returns it as a shared handle.
    pub fn arc(func: F) -> ChildTaskRef
    where
        F: FnMut(CancellationToken) -> StartResult + Send + 'static,
    {
        Arc::new(Self::new(func))
    }
}

impl<F> ChildTask for ChildInit<F>
where
    F: FnMut(CancellationToken) -> StartResult + Send + 'static,
{
    fn init(&self, ctx: CancellationToken) -> StartResult {
        let mut func = match self.func.lock() {
            Ok(guard) => guard,
            Err(_) => return StartResult::Fail(StartError::failed("start closure poisoned")),
        };
        (func)(ctx)
    }
}
