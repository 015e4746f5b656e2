//! # Child descriptions: identities, start descriptors, and specs.
//!
//! - [`ChildPid`] / [`ChildId`] / [`ChildRef`] — how children are addressed.
//! - [`ChildTask`] and friends — the start descriptor invoked on every
//!   (re)start.
//! - [`ChildSpec`] — the declarative description a child is started from.

mod id;
mod spec;
mod task;

pub use id::{ChildId, ChildPid, ChildRef, ShutdownGroup};
pub use spec::{ChildBlueprint, ChildSpec};
pub use task::{BoxChildFuture, ChildFn, ChildInit, ChildTask, ChildTaskRef, StartResult};
