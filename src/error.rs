//! # Error and exit-reason types used by the parenting runtime.
//!
//! Two families live here:
//!
//! - **Domain errors** returned to tolerant callers: [`StartError`],
//!   [`UnknownChild`], [`AwaitError`], [`RestartChildError`],
//!   [`MailboxClosed`].
//! - **Fatal errors** the host must not swallow: [`TooManyRestarts`] means a
//!   restart budget is exhausted and the host task itself is expected to
//!   crash with it so its own supervisor can take over.
//!
//! [`ExitReason`] classifies how a child task left the parent's care, and
//! [`ChildError`] is the failure value a child future resolves to.

use thiserror::Error;

use crate::children::{ChildId, ChildPid};

/// Why a child task is no longer running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The child future resolved `Ok(())` on its own.
    Normal,
    /// The child observed the cooperative stop signal and exited cleanly.
    Shutdown,
    /// The child outlived its configured lifetime and was terminated.
    Timeout,
    /// The child was forcibly aborted.
    Killed,
    /// The child's start descriptor declined when its restart was
    /// attempted; the child will not come back.
    Ignored,
    /// The child future resolved to an error.
    Failed(String),
    /// The child task panicked.
    Panicked(String),
}

impl ExitReason {
    /// `true` for every reason except [`Normal`](Self::Normal) and
    /// [`Shutdown`](Self::Shutdown).
    ///
    /// Transient children are restarted only after an abnormal exit.
    pub fn is_abnormal(&self) -> bool {
        !matches!(self, Self::Normal | Self::Shutdown)
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Shutdown => f.write_str("shutdown"),
            Self::Timeout => f.write_str("timeout"),
            Self::Killed => f.write_str("killed"),
            Self::Ignored => f.write_str("ignored"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Panicked(info) => write!(f, "panicked: {info}"),
        }
    }
}

/// Failure value a child future resolves to.
///
/// The reason string becomes [`ExitReason::Failed`] when the parent observes
/// the exit.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct ChildError {
    reason: String,
}

impl ChildError {
    /// Creates a failure with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<&str> for ChildError {
    fn from(reason: &str) -> Self {
        Self::new(reason)
    }
}

impl From<String> for ChildError {
    fn from(reason: String) -> Self {
        Self { reason }
    }
}

/// Errors produced while starting a child.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StartError {
    /// Another live child already carries the requested id.
    #[error("child '{id}' is already started as {pid}")]
    AlreadyStarted {
        /// The colliding identity.
        id: ChildId,
        /// Handle of the child that already owns the id.
        pid: ChildPid,
    },
    /// The start descriptor reported a failure.
    #[error("child start failed: {reason}")]
    Failed {
        /// Reason reported by the start descriptor.
        reason: String,
    },
}

impl StartError {
    /// Creates a [`StartError::Failed`] with the given reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

/// The referenced id or pid does not belong to a live child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown child")]
pub struct UnknownChild;

/// A restart budget was exhausted.
///
/// This is fatal: the parent gives up, and the host task is expected to
/// propagate the error (crash) so that *its* supervisor can take over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("too many restarts")]
pub struct TooManyRestarts;

/// Errors produced by [`Parent::await_child_termination`](crate::Parent::await_child_termination).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AwaitError {
    /// The referenced id does not belong to a live child.
    #[error("unknown child")]
    UnknownChild,
    /// The child did not terminate within the given deadline.
    #[error("child did not terminate within the deadline")]
    Timeout,
}

/// Errors produced by [`Parent::restart_child`](crate::Parent::restart_child).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RestartChildError {
    /// The referenced id or pid does not belong to a live child.
    #[error("unknown child")]
    UnknownChild,
    /// A restart budget was exhausted while re-entering the stopped set.
    #[error(transparent)]
    TooManyRestarts(#[from] TooManyRestarts),
}

/// The parent behind a mailbox has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("parent mailbox is closed")]
pub struct MailboxClosed;
