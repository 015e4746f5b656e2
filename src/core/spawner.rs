//! # Starting one child: descriptor invocation, monitoring, timers.
//!
//! [`spawn_child`] runs a start descriptor and interprets its three
//! possible shapes:
//!
//! ```text
//! StartResult::Run(fut)  → spawn task + monitor, arm timer → Started
//! StartResult::Ignore    → nothing registered               → Ignored
//! StartResult::Fail(e)   → error propagated to the caller
//! ```
//!
//! ## Wiring
//! The child future runs as its own Tokio task. A second task — the
//! monitor — awaits the child's join handle, maps the join result to an
//! [`ExitReason`], posts `Message::ChildExit` into the parent inbox, and
//! resolves to the reason so the stopper can await the exit directly.
//!
//! ```text
//! child task ──► JoinHandle ──► monitor ──► inbox: ChildExit { pid, reason }
//!                                  └──────► JoinHandle<ExitReason> (stopper)
//! ```
//!
//! ## Rules
//! - A child that resolves `Ok(())` after its stop token was cancelled
//!   exits [`ExitReason::Shutdown`]; without the token it is
//!   [`ExitReason::Normal`].
//! - Aborted children exit [`ExitReason::Killed`]; panics surface as
//!   [`ExitReason::Panicked`] with the payload message.
//! - A finite `timeout` arms a one-shot timer posting
//!   `Message::ChildTimeout`; the timer reference is its abort handle.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::children::{ChildPid, ChildSpec, StartResult};
use crate::core::message::Message;
use crate::core::state::ChildRuntime;
use crate::error::{ExitReason, StartError};

/// What invoking a start descriptor produced.
pub(crate) enum SpawnOutcome {
    /// The child is running; its handles are ready to register.
    Started(ChildRuntime),
    /// The descriptor declined to start.
    Ignored,
}

/// Invokes `spec`'s start descriptor and wires up the child task.
pub(crate) fn spawn_child<M: Send + 'static>(
    pid: ChildPid,
    spec: &ChildSpec<M>,
    inbox: &mpsc::UnboundedSender<Message<M>>,
) -> Result<SpawnOutcome, StartError> {
    let token = CancellationToken::new();

    let fut = match spec.start.init(token.clone()) {
        StartResult::Run(fut) => fut,
        StartResult::Ignore => return Ok(SpawnOutcome::Ignored),
        StartResult::Fail(err) => return Err(err),
    };

    let task = tokio::spawn(fut);
    let abort = task.abort_handle();

    let monitor = {
        let inbox = inbox.clone();
        let token = token.clone();
        tokio::spawn(async move {
            let reason = match task.await {
                Ok(Ok(())) if token.is_cancelled() => ExitReason::Shutdown,
                Ok(Ok(())) => ExitReason::Normal,
                Ok(Err(err)) => ExitReason::Failed(err.to_string()),
                Err(join) => join_failure(join),
            };
            let _ = inbox.send(Message::ChildExit {
                pid,
                reason: reason.clone(),
            });
            reason
        })
    };

    let timer = spec.timeout.map(|after| arm_timer(pid, after, inbox));
    debug!(%pid, id = ?spec.id, "child started");

    Ok(SpawnOutcome::Started(ChildRuntime {
        pid,
        token,
        abort,
        monitor,
        timer,
    }))
}

/// Arms the one-shot lifetime timer for a child.
fn arm_timer<M: Send + 'static>(
    pid: ChildPid,
    after: Duration,
    inbox: &mpsc::UnboundedSender<Message<M>>,
) -> AbortHandle {
    let inbox = inbox.clone();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(after).await;
        let _ = inbox.send(Message::ChildTimeout { pid });
    });
    timer.abort_handle()
}

/// Maps an abnormal join to an exit reason.
fn join_failure(join: JoinError) -> ExitReason {
    if join.is_cancelled() {
        return ExitReason::Killed;
    }
    let info = match join.try_into_panic() {
        Ok(payload) => {
            if let Some(msg) = payload.downcast_ref::<&'static str>() {
                (*msg).to_string()
            } else if let Some(msg) = payload.downcast_ref::<String>() {
                msg.clone()
            } else {
                "opaque panic payload".to_string()
            }
        }
        Err(_) => "task failed to join".to_string(),
    };
    ExitReason::Panicked(info)
}
