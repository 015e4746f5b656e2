//! # Demo: dynamic_children
//!
//! Start, crash, restart, and stop children from a single host task.
//!
//! Demonstrates how to:
//! - Initialize a `Parent` and start children with ids, metas, and policies.
//! - Drive the host loop: drain the inbox and hand messages to
//!   `handle_message`.
//! - Watch a permanent child come back after a crash, with its dependent
//!   dragged down and rebound.
//!
//! ## Run
//! ```bash
//! cargo run --example dynamic_children
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use brood::{
    ChildError, ChildFn, ChildSpec, ChildStarted, MessageOutcome, Options, Parent, Restart,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut parent: Parent<&'static str> = Parent::new(Options::default());

    // 1) A flaky source: crashes once, then settles down.
    let attempts = Arc::new(AtomicU32::new(0));
    let source = {
        let attempts = attempts.clone();
        ChildFn::arc(move |ctx| {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    return Err(ChildError::from("connection lost"));
                }
                println!("[source] up (attempt {})", attempt + 1);
                ctx.cancelled().await;
                println!("[source] stopping");
                Ok(())
            }
        })
    };
    let source_pid = match parent.start_child(
        ChildSpec::run(source)
            .id("source")
            .meta("ingest")
            .restart(Restart::Permanent),
    )? {
        ChildStarted::Started(pid) => pid,
        ChildStarted::Ignored => unreachable!("source always starts"),
    };
    println!("[main] source started as {source_pid}");

    // 2) A sink bound to the source: if the source goes down, so does the
    //    sink, and both come back together.
    parent.start_child(
        ChildSpec::run(ChildFn::arc(|ctx| async move {
            println!("[sink] up");
            ctx.cancelled().await;
            println!("[sink] stopping");
            Ok::<_, ChildError>(())
        }))
        .id("sink")
        .meta("deliver")
        .binds_to(["source"]),
    )?;

    // 3) The host loop: supervise until the crash has been handled.
    loop {
        let msg = parent.next_message().await;
        match parent.handle_message(msg).await? {
            MessageOutcome::Exited { exit, gave_up } => {
                println!(
                    "[main] child {} ({:?}) exited: {}",
                    exit.pid, exit.id, exit.reason
                );
                for gone in gave_up {
                    println!("[main] gave up on {:?} ({})", gone.id, gone.reason);
                }
                break;
            }
            MessageOutcome::GaveUp(children) => {
                println!("[main] gave up on {} children", children.len());
            }
            MessageOutcome::Handled => {}
            MessageOutcome::Unhandled(msg) => {
                println!("[main] not mine: {msg:?}");
            }
        }
    }

    // The crash was restarted in place: both children are live again.
    for info in parent.children() {
        println!("[main] live: {:?} as {} (meta {:?})", info.id, info.pid, info.meta);
    }

    // 4) Wind down in reverse startup order.
    let stopped = parent.shutdown_all().await;
    println!("[main] stopped {} children, bye", stopped.len());
    Ok(())
}
