#![allow(missing_docs)]
#![cfg(feature = "loom")]

use loom::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use opchain::{
    chain::Chain,
    executor::{Executor, SubmitMode},
    task::Outcome,
};

#[test]
fn loom_chain_order_and_single_outcome() {
    loom::model(|| {
        // A --> B, both succeed. B must observe A's work, and each outcome
        // callback must fire exactly once.
        let mut chain = Chain::new();
        let a_done = Arc::new(AtomicBool::new(false));
        let a_calls = Arc::new(AtomicUsize::new(0));
        let b_calls = Arc::new(AtomicUsize::new(0));
        let a = chain.task({
            let a_done = a_done.clone();
            move |handle| {
                a_done.store(true, Ordering::Release);
                handle.move_on();
            }
        });
        let b = chain.task({
            let a_done = a_done.clone();
            move |handle| {
                assert!(
                    a_done.load(Ordering::Acquire),
                    "B admitted before A finished"
                );
                handle.move_on();
            }
        });
        chain.after(a, b);
        chain.on_outcome(a, {
            let a_calls = a_calls.clone();
            move |outcome: Outcome| {
                assert!(outcome.finished);
                a_calls.fetch_add(1, Ordering::Relaxed);
            }
        });
        chain.on_outcome(b, {
            let b_calls = b_calls.clone();
            move |outcome: Outcome| {
                assert!(outcome.finished);
                b_calls.fetch_add(1, Ordering::Relaxed);
            }
        });

        Executor::new()
            .submit_all(chain, SubmitMode::Blocking)
            .expect("submit must succeed");

        assert_eq!(a_calls.load(Ordering::Relaxed), 1);
        assert_eq!(b_calls.load(Ordering::Relaxed), 1);
    });
}

#[test]
fn loom_cancellation_skips_dependent_work() {
    loom::model(|| {
        // A --> B; A cancels itself. B's work must never run, and B must
        // attribute the cancellation to A.
        let mut chain = Chain::new();
        let b_ran = Arc::new(AtomicBool::new(false));
        let b_outcome = Arc::new(Mutex::new(None));
        let a = chain.task(|handle| handle.cancel());
        let b = chain.task({
            let b_ran = b_ran.clone();
            move |handle| {
                b_ran.store(true, Ordering::Relaxed);
                handle.move_on();
            }
        });
        chain.after(a, b);
        chain.on_outcome(b, {
            let b_outcome = b_outcome.clone();
            move |outcome: Outcome| {
                *b_outcome.lock().unwrap() = Some(outcome);
            }
        });

        Executor::new()
            .submit_all(chain, SubmitMode::Blocking)
            .expect("submit must succeed");

        assert!(!b_ran.load(Ordering::Relaxed), "B ran despite cancellation");
        let outcome = b_outcome
            .lock()
            .unwrap()
            .clone()
            .expect("B's outcome must be reported");
        assert!(!outcome.finished);
        assert_eq!(outcome.origin, Some(a));
        assert!(outcome.error.is_none());
    });
}

#[test]
fn loom_external_cancel_races_with_completion() {
    loom::model(|| {
        // An external canceller races the task's own completion. Whichever
        // side wins, the outcome callback fires exactly once.
        let mut chain = Chain::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let a = chain.task(|handle| handle.move_on());
        let handle = chain.handle(a);
        chain.on_outcome(a, {
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::Relaxed);
            }
        });

        let canceller = loom::thread::spawn(move || handle.cancel());
        Executor::new()
            .submit_all(chain, SubmitMode::Blocking)
            .expect("submit must succeed");
        canceller.join().unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 1);
    });
}
