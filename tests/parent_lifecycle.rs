//! End-to-end lifecycle coverage: ordering, crashes, round-trips, queries.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use brood::{
    AwaitError, ChildError, ChildFn, ChildSpec, ChildStarted, ChildTaskRef, ExitReason,
    MessageOutcome, Options, Parent, Restart, StartError, StartResult, UnknownChild,
};

/// Child that runs until cancelled and exits cleanly.
fn idle_child() -> ChildTaskRef {
    ChildFn::arc(|ctx| async move {
        ctx.cancelled().await;
        Ok::<(), ChildError>(())
    })
}

/// Child that records its name when asked to stop, then exits cleanly.
fn tracked_child(name: &'static str, order: Arc<Mutex<Vec<&'static str>>>) -> ChildTaskRef {
    ChildFn::arc(move |ctx| {
        let order = order.clone();
        async move {
            ctx.cancelled().await;
            order.lock().unwrap().push(name);
            Ok::<(), ChildError>(())
        }
    })
}

fn started(outcome: ChildStarted) -> brood::ChildPid {
    match outcome {
        ChildStarted::Started(pid) => pid,
        ChildStarted::Ignored => panic!("child unexpectedly ignored its start"),
    }
}

#[tokio::test]
async fn children_are_listed_in_startup_order_and_stopped_in_reverse() {
    let mut parent: Parent<u32> = Parent::new(Options::default());
    let order = Arc::new(Mutex::new(Vec::new()));

    let pid_a = started(
        parent
            .start_child(
                ChildSpec::run(tracked_child("a", order.clone()))
                    .id("a")
                    .meta(1),
            )
            .unwrap(),
    );
    let pid_b = started(
        parent
            .start_child(
                ChildSpec::run(tracked_child("b", order.clone()))
                    .id("b")
                    .meta(2),
            )
            .unwrap(),
    );

    let infos = parent.children();
    assert_eq!(infos.len(), 2);
    assert_eq!(infos[0].id.as_ref().map(|id| id.as_str()), Some("a"));
    assert_eq!(infos[0].pid, pid_a);
    assert_eq!(infos[0].meta, 1);
    assert_eq!(infos[1].id.as_ref().map(|id| id.as_str()), Some("b"));
    assert_eq!(infos[1].pid, pid_b);
    assert_eq!(infos[1].meta, 2);

    let stopped = parent.shutdown_all().await;
    assert_eq!(stopped.len(), 2);
    assert_eq!(stopped.exit_reason("a"), Some(&ExitReason::Shutdown));
    assert_eq!(stopped.exit_reason("b"), Some(&ExitReason::Shutdown));
    assert_eq!(parent.num_children(), 0);

    // Reverse startup order: b goes down before a.
    assert_eq!(*order.lock().unwrap(), ["b", "a"]);
}

#[tokio::test]
async fn permanent_child_is_restarted_after_a_crash() {
    let mut parent: Parent<u32> = Parent::new(Options {
        max_restarts: Some(5),
        ..Options::default()
    });

    let attempts = Arc::new(AtomicU32::new(0));
    let task = {
        let attempts = attempts.clone();
        ChildFn::arc(move |ctx| {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    return Err(ChildError::from("boom"));
                }
                ctx.cancelled().await;
                Ok(())
            }
        })
    };

    let pid = started(
        parent
            .start_child(ChildSpec::run(task).id("a").meta(1))
            .unwrap(),
    );

    let msg = parent.next_message().await;
    match parent.handle_message(msg).await.unwrap() {
        MessageOutcome::Exited { exit, gave_up } => {
            assert_eq!(exit.pid, pid);
            assert_eq!(exit.id.as_ref().map(|id| id.as_str()), Some("a"));
            assert_eq!(exit.meta, 1);
            assert_eq!(exit.reason, ExitReason::Failed("boom".into()));
            assert!(gave_up.is_empty());
        }
        other => panic!("expected an exit event, got {other:?}"),
    }

    // The replacement runs under a fresh pid; the descriptor was re-invoked.
    let new_pid = parent.child_pid("a").expect("child is back");
    assert_ne!(new_pid, pid);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(parent.num_children(), 1);
}

#[tokio::test(start_paused = true)]
async fn await_child_termination_observes_the_exit() {
    let mut parent: Parent<u32> = Parent::new(Options::default());

    parent
        .start_child(
            ChildSpec::<u32>::run_fn(|_ctx| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(())
            })
            .id("c")
            .meta(7),
        )
        .unwrap();

    let exit = parent
        .await_child_termination("c", Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(exit.id.as_ref().map(|id| id.as_str()), Some("c"));
    assert_eq!(exit.meta, 7);
    assert_eq!(exit.reason, ExitReason::Normal);
    assert!(parent.child_pid("c").is_none());

    // The queued exit signal was flushed, not re-surfaced.
    let msg = parent.next_message().await;
    assert!(matches!(
        parent.handle_message(msg).await.unwrap(),
        MessageOutcome::Handled
    ));
}

#[tokio::test(start_paused = true)]
async fn await_child_termination_times_out_without_removing_the_child() {
    let mut parent: Parent<u32> = Parent::new(Options::default());
    parent
        .start_child(ChildSpec::run(idle_child()).id("d"))
        .unwrap();

    let err = parent
        .await_child_termination("d", Duration::ZERO)
        .await
        .unwrap_err();
    assert_eq!(err, AwaitError::Timeout);
    assert!(parent.child_pid("d").is_some());

    let err = parent
        .await_child_termination("nope", Duration::ZERO)
        .await
        .unwrap_err();
    assert_eq!(err, AwaitError::UnknownChild);
}

#[tokio::test]
async fn meta_updates_are_pure_transformations() {
    let mut parent: Parent<u32> = Parent::new(Options::default());
    parent
        .start_child(ChildSpec::run(idle_child()).id("a").meta(1))
        .unwrap();

    parent.update_child_meta("a", |meta| *meta += 1).unwrap();
    assert_eq!(parent.child_meta("a"), Some(2));

    assert_eq!(
        parent.update_child_meta("missing", |_| {}),
        Err(UnknownChild)
    );
    assert_eq!(parent.child_meta("missing"), None);
}

#[tokio::test]
async fn returning_stopped_children_restores_the_registry() {
    let mut parent: Parent<u32> = Parent::new(Options::default());
    parent
        .start_child(ChildSpec::run(idle_child()).id("a").meta(1))
        .unwrap();
    parent
        .start_child(ChildSpec::run(idle_child()).id("b").meta(2))
        .unwrap();
    parent
        .start_child(
            ChildSpec::run(idle_child())
                .id("tmp")
                .meta(3)
                .restart(Restart::Temporary),
        )
        .unwrap();

    let stopped = parent.shutdown_all().await;
    assert_eq!(parent.num_children(), 0);

    // Explicitly returned children come back wholesale, temporaries too,
    // in their original relative order, without charging budgets.
    let gave_up = parent.return_children(stopped).await.unwrap();
    assert!(gave_up.is_empty());
    let infos = parent.children();
    let ids: Vec<_> = infos
        .iter()
        .map(|info| info.id.as_ref().map(|id| id.as_str()))
        .collect();
    assert_eq!(ids, [Some("a"), Some("b"), Some("tmp")]);
    let metas: Vec<_> = infos.iter().map(|info| info.meta).collect();
    assert_eq!(metas, [1, 2, 3]);
}

#[tokio::test]
async fn start_child_rejects_collisions_and_stale_bindings() {
    let mut parent: Parent<u32> = Parent::new(Options::default());
    let pid = started(
        parent
            .start_child(ChildSpec::run(idle_child()).id("a"))
            .unwrap(),
    );

    match parent.start_child(ChildSpec::run(idle_child()).id("a")) {
        Err(StartError::AlreadyStarted { pid: existing, .. }) => assert_eq!(existing, pid),
        other => panic!("expected an id collision, got {other:?}"),
    }

    match parent.start_child(ChildSpec::run(idle_child()).id("b").binds_to(["ghost"])) {
        Err(StartError::Failed { reason }) => assert!(reason.contains("ghost")),
        other => panic!("expected a binding failure, got {other:?}"),
    }

    assert_eq!(parent.num_children(), 1);
}

#[tokio::test]
async fn ignored_starts_register_nothing() {
    let mut parent: Parent<u32> = Parent::new(Options::default());

    let outcome = parent
        .start_child(ChildSpec::init(|_ctx| StartResult::Ignore).id("quiet"))
        .unwrap();
    assert_eq!(outcome, ChildStarted::Ignored);
    assert_eq!(parent.num_children(), 0);
    assert!(!parent.is_child("quiet"));
}

#[tokio::test]
async fn shutdown_child_requires_a_live_reference() {
    let mut parent: Parent<u32> = Parent::new(Options::default());
    assert_eq!(parent.shutdown_child("ghost").await.unwrap_err(), UnknownChild);
}

#[tokio::test]
async fn round_trip_start_then_shutdown_leaves_no_residue() {
    let mut parent: Parent<u32> = Parent::new(Options::default());
    parent
        .start_child(ChildSpec::run(idle_child()).id("keep"))
        .unwrap();

    let pid = started(
        parent
            .start_child(ChildSpec::run(idle_child()).id("brief"))
            .unwrap(),
    );
    let stopped = parent.shutdown_child(pid).await.unwrap();
    assert_eq!(stopped.len(), 1);

    assert_eq!(parent.num_children(), 1);
    assert!(parent.is_child("keep"));
    assert!(!parent.is_child("brief"));

    // No exit signal leaks to the host for the stopped child.
    let msg = parent.next_message().await;
    assert!(matches!(
        parent.handle_message(msg).await.unwrap(),
        MessageOutcome::Handled
    ));
}

#[tokio::test]
async fn lookup_table_mirrors_the_registry() {
    let mut parent: Parent<u32> = Parent::new(Options {
        registry: true,
        ..Options::default()
    });
    let lookup = parent.lookup().expect("registry enabled");

    let pid = started(
        parent
            .start_child(ChildSpec::run(idle_child()).id("a").meta(1))
            .unwrap(),
    );
    assert_eq!(lookup.child_pid("a"), Some(pid));
    assert_eq!(lookup.child_meta("a"), Some(1));
    assert_eq!(lookup.len(), 1);

    parent.update_child_meta("a", |meta| *meta = 9).unwrap();
    assert_eq!(lookup.child_meta("a"), Some(9));

    parent.shutdown_all().await;
    assert!(lookup.is_empty());
}

#[tokio::test]
async fn mailbox_inquiries_are_answered_without_mutation() {
    let mut parent: Parent<u32> = Parent::new(Options::default());
    let pid_a = started(
        parent
            .start_child(ChildSpec::run(idle_child()).id("a").meta(7))
            .unwrap(),
    );
    parent
        .start_child(ChildSpec::run(idle_child()).id("b"))
        .unwrap();

    let mailbox = parent.mailbox();
    let asker = tokio::spawn(async move {
        let counts = mailbox.count_children().await.unwrap();
        let summaries = mailbox.which_children().await.unwrap();
        let pid = mailbox.child_pid("a").await.unwrap();
        let meta = mailbox.child_meta("a").await.unwrap();
        let missing = mailbox.child_pid("ghost").await.unwrap();
        (counts, summaries, pid, meta, missing)
    });

    for _ in 0..5 {
        let msg = parent.next_message().await;
        assert!(matches!(
            parent.handle_message(msg).await.unwrap(),
            MessageOutcome::Handled
        ));
    }

    let (counts, summaries, pid, meta, missing) = asker.await.unwrap();
    assert_eq!(counts.specs, 2);
    assert_eq!(counts.active, 2);
    assert_eq!(counts.workers, 2);
    assert_eq!(counts.supervisors, 0);
    assert_eq!(summaries.len(), 2);
    assert_eq!(pid, Some(pid_a));
    assert_eq!(meta, Some(7));
    assert_eq!(missing, None);
    assert_eq!(parent.num_children(), 2);
}

#[tokio::test]
async fn foreign_messages_are_handed_back() {
    let mut parent: Parent<u32> = Parent::new(Options::default());
    let pid = started(
        parent
            .start_child(ChildSpec::run(idle_child()).id("a"))
            .unwrap(),
    );
    parent.shutdown_child(pid).await.unwrap();

    // Drain the flushed exit for the stopped child.
    let msg = parent.next_message().await;
    assert!(matches!(
        parent.handle_message(msg).await.unwrap(),
        MessageOutcome::Handled
    ));

    // A second exit for the same pid is no longer the parent's business.
    let stale = brood::Message::ChildExit {
        pid,
        reason: ExitReason::Normal,
    };
    assert!(matches!(
        parent.handle_message(stale).await.unwrap(),
        MessageOutcome::Unhandled(_)
    ));
}
