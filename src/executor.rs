mod execute;
mod setup;

/// Error returned by `Executor::submit` when the submitted selection or its
/// dependency graph is invalid.
pub use crate::executor::setup::SubmitError;
use crate::{
    chain::Chain,
    sync::{Arc, AtomicU16, Condvar, Mutex},
    task::TaskCore,
    types::TaskId,
};
use derive_more::Debug;

/// Adapter between a [`Chain`] and the worker threads that actually run its
/// tasks.
///
/// Key responsibilities:
/// - Validates the submitted selection and detects dependency cycles during
///   `submit`.
/// - Expands the selection to its transitive dependency closure, so linked
///   ancestors run even when not themselves selected.
/// - Admits a task only once every task it depends on has reached a terminal
///   state, using a fence+counter readiness protocol.
/// - Gives every admitted task a dedicated worker thread for its entire
///   lifetime, including the possibly-asynchronous duration of its work.
///
/// The executor is an explicit value: configuration and lifetime are
/// caller-controlled, and one executor may submit any number of chains.
#[must_use]
#[derive(Debug, Clone)]
pub struct Executor {
    thread_name: String,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    /// Create an executor with the default worker thread-name prefix.
    pub fn new() -> Self {
        Self {
            thread_name: "opchain".to_owned(),
        }
    }

    /// Set the prefix used to name worker threads.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Submit a selection of tasks from the chain, in any order.
    ///
    /// The chain is consumed so that every task executes at most once. The
    /// selection is expanded to its transitive dependency closure; tasks in
    /// the chain outside the closure are dropped unrun. Zero-dependency tasks
    /// of the closure start immediately, each on its own worker thread;
    /// everything else is admitted as its dependencies reach terminal states.
    /// Submission order is irrelevant to execution order.
    ///
    /// In [`SubmitMode::Blocking`] the call returns only once every task of
    /// the closure is terminal. In [`SubmitMode::Background`] it returns
    /// immediately; completion may be observed per task via outcome callbacks
    /// or collectively via [`Submission::wait`].
    ///
    /// # Errors
    /// [`SubmitError::UnknownTask`] if the selection names a task the chain
    /// does not contain, [`SubmitError::Cycle`] if the closure's dependency
    /// graph contains cycle(s).
    pub fn submit(
        &self,
        chain: Chain,
        selection: impl IntoIterator<Item = TaskId>,
        mode: SubmitMode,
    ) -> Result<Submission, SubmitError> {
        let plan = setup::build_plan(chain, selection, self.thread_name.clone())?;
        let plan = Arc::new(plan);
        tracing::debug!(
            tasks = plan.num_scheduled,
            roots = plan.roots.len(),
            ?mode,
            "submitting chain"
        );
        execute::spawn_roots(&plan);
        let submission = Submission { plan };
        if mode == SubmitMode::Blocking {
            submission.wait();
        }
        Ok(submission)
    }

    /// Submit every task in the chain. See [`submit`](Self::submit).
    ///
    /// # Errors
    /// [`SubmitError::Cycle`] if the dependency graph contains cycle(s).
    pub fn submit_all(&self, chain: Chain, mode: SubmitMode) -> Result<Submission, SubmitError> {
        let ids: Vec<TaskId> = (1..=chain.len())
            .map(|id| {
                id.try_into()
                    .ok()
                    .and_then(TaskId::new)
                    .expect("Executor::submit_all")
            })
            .collect();
        self.submit(chain, ids, mode)
    }
}

/// Whether `Executor::submit` blocks the calling thread.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SubmitMode {
    /// Block the submitting thread until every scheduled task (including
    /// transitively linked dependencies) reaches a terminal state.
    Blocking,
    /// Return immediately; the caller observes completion via per-task
    /// outcome callbacks or [`Submission::wait`].
    Background,
}

/// Handle to an in-flight submission.
///
/// Dropping the handle does not affect the submitted tasks; worker threads
/// keep the execution plan alive until every scheduled task is terminal.
#[derive(Debug)]
pub struct Submission {
    #[debug(skip)]
    plan: Arc<Plan>,
}

impl Submission {
    /// Block until every scheduled task of this submission is terminal.
    /// Returns immediately if they already are.
    pub fn wait(&self) {
        self.plan.latch.wait();
    }
}

/// Immutable execution plan shared by the submitting thread and every worker.
pub(crate) struct Plan {
    tasks: Vec<Arc<TaskCore>>,
    /// Direct dependency slot indices, per task. Empty for unscheduled slots.
    parents: Vec<Vec<u16>>,
    /// Scheduled dependents' slot indices, per task.
    children: Vec<Vec<u16>>,
    /// Number of dependencies that haven't reached a terminal state yet.
    parents_left: Vec<AtomicU16>,
    /// Slot indices of scheduled tasks with no dependencies.
    roots: Vec<u16>,
    num_scheduled: usize,
    latch: Latch,
    thread_name: String,
    #[cfg(not(feature = "loom"))]
    submitter: std::thread::ThreadId,
}

/// Countdown latch released when every scheduled task is terminal.
struct Latch {
    remaining: Mutex<usize>,
    cv: Condvar,
}

impl Latch {
    fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            cv: Condvar::new(),
        }
    }

    fn count_down(&self) {
        let mut remaining = self.remaining.lock().expect("Latch::count_down");
        *remaining = remaining
            .checked_sub(1)
            .expect("Latch::count_down: underflow");
        if *remaining == 0 {
            self.cv.notify_all();
        }
    }

    fn wait(&self) {
        let mut remaining = self.remaining.lock().expect("Latch::wait");
        while *remaining != 0 {
            remaining = self.cv.wait(remaining).expect("Latch::wait");
        }
    }
}
