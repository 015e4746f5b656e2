//! # Stopping children in a disciplined order.
//!
//! [`stop_children`] terminates a list of records in exactly the order it
//! is given (callers pass reverse startup order for shutdown-all). Per
//! child:
//!
//! ```text
//! 1. disarm the lifetime timer
//! 2. KillImmediately → abort, await the exit
//!    Graceful(d)     → cancel token, await up to d, then abort and await
//!    Infinity        → cancel token, await without a deadline
//! 3. mark the pid flushed so the dispatcher swallows the queued exit
//! ```
//!
//! The graceful deadline runs on the monotonic clock; escalation to a kill
//! is not cancellable. The call is synchronous — it returns only when every
//! child in the list has exited, with the observed [`ExitReason`] per
//! child.

use std::collections::HashSet;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::children::ChildPid;
use crate::core::state::ChildRecord;
use crate::error::ExitReason;
use crate::policies::ShutdownPolicy;

/// Stops every record in the given order; returns the observed exit
/// reasons alongside the records.
///
/// Each stopped pid is added to `flushed` so the dispatcher can drop the
/// exit signal the monitor already queued.
pub(crate) async fn stop_children<M>(
    records: Vec<ChildRecord<M>>,
    flushed: &mut HashSet<ChildPid>,
) -> Vec<(ChildRecord<M>, ExitReason)> {
    let mut stopped = Vec::with_capacity(records.len());
    for mut record in records {
        let reason = stop_child(&mut record).await;
        flushed.insert(record.pid());
        debug!(pid = %record.pid(), %reason, "child stopped");
        stopped.push((record, reason));
    }
    stopped
}

/// Kills one record unconditionally and waits for the exit.
///
/// Used for lifetime-timeout enforcement, where the per-child shutdown
/// policy does not apply.
pub(crate) async fn kill_child<M>(record: &mut ChildRecord<M>) -> ExitReason {
    disarm_timer(record);
    record.runtime.abort.abort();
    await_exit(&mut record.runtime.monitor).await
}

async fn stop_child<M>(record: &mut ChildRecord<M>) -> ExitReason {
    disarm_timer(record);

    match record.spec.shutdown {
        ShutdownPolicy::KillImmediately => {
            record.runtime.abort.abort();
            await_exit(&mut record.runtime.monitor).await
        }
        ShutdownPolicy::Infinity => {
            record.runtime.token.cancel();
            await_exit(&mut record.runtime.monitor).await
        }
        ShutdownPolicy::Graceful(deadline) => {
            record.runtime.token.cancel();
            match timeout(deadline, &mut record.runtime.monitor).await {
                Ok(joined) => joined.unwrap_or(ExitReason::Killed),
                Err(_elapsed) => {
                    warn!(pid = %record.pid(), ?deadline, "graceful deadline expired, killing");
                    record.runtime.abort.abort();
                    await_exit(&mut record.runtime.monitor).await
                }
            }
        }
    }
}

fn disarm_timer<M>(record: &mut ChildRecord<M>) {
    if let Some(timer) = record.runtime.timer.take() {
        timer.abort();
    }
}

async fn await_exit(monitor: &mut JoinHandle<ExitReason>) -> ExitReason {
    // The monitor task is never aborted, so a join error cannot happen in
    // practice; a kill is the closest description if it ever does.
    monitor.await.unwrap_or(ExitReason::Killed)
}
