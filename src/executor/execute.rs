use crate::{
    executor::Plan,
    sync::{Arc, Ordering, fence, spawn_worker},
    task::{TaskHandle, TaskState},
};

pub(super) fn spawn_roots(plan: &Arc<Plan>) {
    for &root in &plan.roots {
        spawn_task(Arc::clone(plan), root);
    }
}

/// Give the task its dedicated worker thread. The thread lives for the whole
/// task execution, including the possibly-asynchronous duration of its work.
fn spawn_task(plan: Arc<Plan>, idx: u16) {
    let name = {
        let task = &plan.tasks[idx as usize];
        match task.name() {
            Some(task_name) => format!("{}-{}-{}", plan.thread_name, task.id(), task_name),
            None => format!("{}-{}", plan.thread_name, task.id()),
        }
    };
    spawn_worker(name, move || run_task(&plan, idx));
}

/// Execution entry point, invoked once per scheduled task on its worker
/// thread.
///
/// Inspects the direct dependencies' terminal cancellation state. If any is
/// cancelled, the work is skipped and the nearest cancelling ancestor's
/// record is adopted for reporting. Otherwise the work function runs and the
/// thread blocks on the task's completion gate until the work (synchronously
/// or via an asynchronous callback at its own discretion) triggers the
/// completion path.
fn run_task(plan: &Arc<Plan>, idx: u16) {
    let task = &plan.tasks[idx as usize];
    // The task blocks this thread for the duration of its asynchronous work;
    // running on the thread the caller needs for further scheduling is a
    // deadlock risk.
    #[cfg(not(feature = "loom"))]
    debug_assert_ne!(
        std::thread::current().id(),
        plan.submitter,
        "sequenced tasks must not run on the submitting thread"
    );

    let dependencies = &plan.parents[idx as usize];
    let cancelled_upstream = dependencies.iter().any(|&parent| {
        let state = plan.tasks[parent as usize].state();
        debug_assert!(state.is_terminal(), "run_task: dependency not terminal");
        state == TaskState::Cancelled
    });

    if cancelled_upstream {
        // Nearest cancelling ancestor wins: the first cancelled dependency
        // holding a reportable record, in edge insertion order.
        let record = dependencies
            .iter()
            .map(|&parent| &plan.tasks[parent as usize])
            .filter(|parent| parent.state() == TaskState::Cancelled)
            .find_map(|parent| parent.reportable_cancellation());
        tracing::debug!(
            task = %task.id(),
            origin = ?record.as_ref().map(|record| record.origin),
            "skipping work; upstream cancellation"
        );
        if let Some(record) = record {
            task.adopt(record);
        }
        task.complete(false);
    } else if !task.state().is_terminal() {
        task.mark_running();
        let work = task
            .take_work()
            .expect("run_task: work function already taken");
        work(TaskHandle {
            core: Arc::clone(task),
        });
        task.wait_for_completion();
    }
    // A task that is already terminal here was cancelled externally before
    // admission and has reported its outcome; nothing runs, nothing is
    // re-reported.

    finish_task(plan, idx);
}

/// Terminal notification, run exactly once per scheduled task on every path:
/// propagate readiness downstream and count down the submission latch.
///
/// A Release fence is issued before decrementing children's counters and an
/// Acquire fence after observing a counter reach zero, so a child spawned
/// here observes all of its parents' terminal state.
fn finish_task(plan: &Arc<Plan>, idx: u16) {
    let children = &plan.children[idx as usize];
    if !children.is_empty() {
        fence(Ordering::Release);
    }
    let mut ready = Vec::new();
    for &child in children {
        if plan.parents_left[child as usize].fetch_sub(1, Ordering::Relaxed) == 1 {
            ready.push(child);
        }
    }
    if !ready.is_empty() {
        fence(Ordering::Acquire);
    }
    for child in ready {
        spawn_task(Arc::clone(plan), child);
    }
    plan.latch.count_down();
}
