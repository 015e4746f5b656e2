//! # Identities and handles for supervised children.
//!
//! Three ways to talk about a child:
//! - **[`ChildPid`]** — the runtime handle. Allocated by the parent when the
//!   child task starts, unique for the lifetime of the parent, never reused.
//! - **[`ChildId`]** — an optional, caller-supplied identity. Unique among
//!   *live* children; a child without an id is anonymous and reachable only
//!   through its pid.
//! - **[`ChildRef`]** — either of the above, accepted by every lookup and
//!   shutdown operation.
//!
//! [`ShutdownGroup`] names a set of children that stop and restart as one
//! atomic unit.

use std::borrow::Cow;
use std::fmt;

/// Runtime handle of a child task.
///
/// Pids are dense, monotonically increasing, and never reused, so a stale
/// pid can always be detected. The pid changes when a child is restarted;
/// the [`ChildId`] does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChildPid(u64);

impl ChildPid {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ChildPid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Caller-supplied identity of a child.
///
/// Cheap to clone; accepts both static and owned strings:
/// ```
/// use brood::ChildId;
///
/// let a = ChildId::from("db-conn");
/// let b = ChildId::from(String::from("db-conn"));
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChildId(Cow<'static, str>);

impl ChildId {
    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ChildId {
    fn from(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }
}

impl From<String> for ChildId {
    fn from(s: String) -> Self {
        Self(Cow::Owned(s))
    }
}

impl fmt::Display for ChildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tag naming a set of children that stop and restart atomically.
///
/// A group is never left half-alive: taking down one member takes down all
/// of them, and a failed group restart rolls the whole group back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShutdownGroup(Cow<'static, str>);

impl ShutdownGroup {
    /// Returns the group name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ShutdownGroup {
    fn from(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }
}

impl From<String> for ShutdownGroup {
    fn from(s: String) -> Self {
        Self(Cow::Owned(s))
    }
}

impl fmt::Display for ShutdownGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a child by identity or by runtime handle.
///
/// Anonymous children can only be referenced by pid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChildRef {
    /// Reference by caller-supplied identity.
    Id(ChildId),
    /// Reference by runtime handle.
    Pid(ChildPid),
}

impl From<ChildId> for ChildRef {
    fn from(id: ChildId) -> Self {
        Self::Id(id)
    }
}

impl From<ChildPid> for ChildRef {
    fn from(pid: ChildPid) -> Self {
        Self::Pid(pid)
    }
}

impl From<&'static str> for ChildRef {
    fn from(s: &'static str) -> Self {
        Self::Id(ChildId::from(s))
    }
}

impl From<String> for ChildRef {
    fn from(s: String) -> Self {
        Self::Id(ChildId::from(s))
    }
}

impl fmt::Display for ChildRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => fmt::Display::fmt(id, f),
            Self::Pid(pid) => fmt::Display::fmt(pid, f),
        }
    }
}
