//! # Messages flowing through the parent's inbox, and the views it serves.
//!
//! The parent is a single-threaded cooperative actor: everything it reacts
//! to arrives as a [`Message`] in its inbox. Child monitors post
//! [`Message::ChildExit`], lifetime timers post [`Message::ChildTimeout`],
//! the restart engine posts [`Message::ResumeRestart`] to itself when it
//! bails out partway, and other tasks post [`Message::Inquiry`] requests
//! through a [`ParentMailbox`].
//!
//! The host drains the inbox and hands every message to
//! [`Parent::handle_message`](crate::Parent::handle_message), which answers
//! with a [`MessageOutcome`]:
//!
//! ```text
//! ChildExit (known pid)      → Exited { exit, gave_up }
//! ChildExit (already seen)   → Handled
//! ChildExit (foreign pid)    → Unhandled(msg)     host interprets it
//! ChildTimeout               → Exited { exit, gave_up }
//! ResumeRestart              → GaveUp(children) when some will not return,
//!                              Handled otherwise
//! Inquiry                    → Handled (reply already sent)
//! ```

use tokio::sync::{mpsc, oneshot};

use crate::children::{ChildId, ChildPid};
use crate::core::restart::StoppedChildren;
use crate::error::{ExitReason, MailboxClosed};

/// A message the host hands to the parent's dispatcher.
#[derive(Debug)]
pub enum Message<M> {
    /// A monitored child task has exited.
    ChildExit {
        /// Handle of the exited child.
        pid: ChildPid,
        /// Observed exit reason.
        reason: ExitReason,
    },
    /// A child's lifetime timer has expired.
    ChildTimeout {
        /// Handle of the timed-out child.
        pid: ChildPid,
    },
    /// Self-message carrying children whose restart was deferred.
    ResumeRestart(StoppedChildren<M>),
    /// Read-only request from another task.
    Inquiry(Inquiry<M>),
}

/// Read-only requests other tasks may post through a [`ParentMailbox`].
pub enum Inquiry<M> {
    /// Counts of the currently supervised children.
    CountChildren {
        /// Channel the reply is sent on.
        reply: oneshot::Sender<ChildCounts>,
    },
    /// Summaries of the currently supervised children.
    WhichChildren {
        /// Channel the reply is sent on.
        reply: oneshot::Sender<Vec<ChildSummary>>,
    },
    /// Current pid of the identified child.
    ChildPid {
        /// Identity to look up.
        id: ChildId,
        /// Channel the reply is sent on.
        reply: oneshot::Sender<Option<ChildPid>>,
    },
    /// Current meta of the identified child.
    ChildMeta {
        /// Identity to look up.
        id: ChildId,
        /// Channel the reply is sent on.
        reply: oneshot::Sender<Option<M>>,
    },
}

impl<M> std::fmt::Debug for Inquiry<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CountChildren { .. } => f.write_str("Inquiry::CountChildren"),
            Self::WhichChildren { .. } => f.write_str("Inquiry::WhichChildren"),
            Self::ChildPid { id, .. } => write!(f, "Inquiry::ChildPid({id})"),
            Self::ChildMeta { id, .. } => write!(f, "Inquiry::ChildMeta({id})"),
        }
    }
}

/// What the dispatcher made of a message.
#[derive(Debug)]
pub enum MessageOutcome<M> {
    /// A child terminated and was deregistered (and possibly replaced —
    /// the event is reported exactly once either way).
    Exited {
        /// Terminal report for the triggering child.
        exit: ExitedChild<M>,
        /// Children the accompanying restart permanently gave up on; the
        /// host should drop them from any view of its own.
        gave_up: Vec<ExitedChild<M>>,
    },
    /// A deferred restart ran and permanently gave up on these children.
    GaveUp(Vec<ExitedChild<M>>),
    /// The message belonged to the parent and has been fully processed.
    Handled,
    /// The message is not the parent's; the host should interpret it.
    Unhandled(Message<M>),
}

/// Terminal report for a child that left the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitedChild<M> {
    /// Handle the child ran under.
    pub pid: ChildPid,
    /// Identity of the child, if it had one.
    pub id: Option<ChildId>,
    /// User annotation at the time of exit.
    pub meta: M,
    /// Why the child exited.
    pub reason: ExitReason,
}

/// Registry view of one live child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildInfo<M> {
    /// Identity of the child, if it has one.
    pub id: Option<ChildId>,
    /// Current runtime handle.
    pub pid: ChildPid,
    /// Current user annotation.
    pub meta: M,
}

/// Summary of one live child, supervisor style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSummary {
    /// Identity of the child, if it has one.
    pub id: Option<ChildId>,
    /// Current runtime handle.
    pub pid: ChildPid,
}

/// Counts of the currently supervised children, supervisor style.
///
/// Every child this parent runs is a worker, so `specs`, `active`, and
/// `workers` coincide and `supervisors` is always zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChildCounts {
    /// Number of registered children.
    pub specs: usize,
    /// Number of running children.
    pub active: usize,
    /// Number of worker children.
    pub workers: usize,
    /// Number of supervisor children.
    pub supervisors: usize,
}

/// Cloneable sender other tasks use to post messages to the parent.
///
/// Must not be used from the parent's own task while it is blocked starting
/// a child; the parent would never get to answer.
pub struct ParentMailbox<M> {
    pub(crate) tx: mpsc::UnboundedSender<Message<M>>,
}

impl<M> Clone for ParentMailbox<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<M> ParentMailbox<M> {
    /// Posts a raw message to the parent's inbox.
    pub fn send(&self, msg: Message<M>) -> Result<(), MailboxClosed> {
        self.tx.send(msg).map_err(|_| MailboxClosed)
    }

    /// Asks the parent for its child counts.
    pub async fn count_children(&self) -> Result<ChildCounts, MailboxClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(Message::Inquiry(Inquiry::CountChildren { reply }))?;
        rx.await.map_err(|_| MailboxClosed)
    }

    /// Asks the parent for summaries of its children.
    pub async fn which_children(&self) -> Result<Vec<ChildSummary>, MailboxClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(Message::Inquiry(Inquiry::WhichChildren { reply }))?;
        rx.await.map_err(|_| MailboxClosed)
    }

    /// Asks the parent for the current pid of the identified child.
    pub async fn child_pid(&self, id: impl Into<ChildId>) -> Result<Option<ChildPid>, MailboxClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(Message::Inquiry(Inquiry::ChildPid {
            id: id.into(),
            reply,
        }))?;
        rx.await.map_err(|_| MailboxClosed)
    }

    /// Asks the parent for the current meta of the identified child.
    pub async fn child_meta(&self, id: impl Into<ChildId>) -> Result<Option<M>, MailboxClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(Message::Inquiry(Inquiry::ChildMeta {
            id: id.into(),
            reply,
        }))?;
        rx.await.map_err(|_| MailboxClosed)
    }
}
