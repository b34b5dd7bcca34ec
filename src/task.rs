use crate::{
    sync::{Arc, AtomicBool, AtomicU8, Condvar, Mutex, Ordering},
    types::{TaskError, TaskId},
};
use derive_more::Debug;

pub(crate) type WorkFn = Box<dyn FnOnce(TaskHandle) + Send + 'static>;
pub(crate) type OutcomeFn = Box<dyn FnOnce(Outcome) + Send + 'static>;

/// Lifecycle state of a task.
///
/// A task starts `Pending`, becomes `Running` once a worker thread admits it,
/// and ends in exactly one of the terminal states. Terminal states are
/// permanent.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    /// Created but not yet admitted by the executor.
    Pending = 0,
    /// The work function is executing (or awaiting its asynchronous
    /// completion).
    Running = 1,
    /// The work function ran and signaled normal success.
    Completed = 2,
    /// Skipped due to upstream cancellation, or explicitly cancelled.
    Cancelled = 3,
}

impl TaskState {
    /// Whether the task has reached a permanent state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Cancelled,
            _ => unreachable!("TaskState::from_u8"),
        }
    }
}

/// Terminal report delivered to a task's outcome callback, exactly once per
/// task execution.
#[must_use]
#[derive(Debug, Clone)]
pub struct Outcome {
    /// `true` for normal success, `false` for cancellation.
    pub finished: bool,
    /// The task whose explicit cancellation caused this outcome, if any.
    ///
    /// For a self-cancelled task this is the task itself; for a task skipped
    /// because of upstream cancellation it is the nearest cancelling
    /// ancestor.
    pub origin: Option<TaskId>,
    /// Error payload supplied by the originating cancellation, if any.
    pub error: Option<TaskError>,
}

/// Cancellation record: the originating task plus its optional error payload.
///
/// A task's own record is written only when the task cancels itself. Records
/// adopted from ancestors are kept in a separate slot so that "caused by me"
/// and "caused by an ancestor" never mix.
#[derive(Debug, Clone)]
pub(crate) struct CancelRecord {
    pub(crate) origin: TaskId,
    pub(crate) error: Option<TaskError>,
}

/// One-shot completion rendezvous: a condition variable guarded by a flag.
///
/// Starts unsignaled. The execution thread waits on it at most once per task
/// execution; the completion path signals it at most once (enforced upstream
/// by the `reported` guard on [`TaskCore`]).
#[derive(Debug)]
pub(crate) struct Gate {
    #[debug(skip)]
    signaled: Mutex<bool>,
    #[debug(skip)]
    cv: Condvar,
}

impl Gate {
    fn new() -> Self {
        Self {
            signaled: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    pub(crate) fn signal(&self) {
        let mut signaled = self.signaled.lock().expect("Gate::signal");
        *signaled = true;
        self.cv.notify_all();
    }

    pub(crate) fn wait(&self) {
        let mut signaled = self.signaled.lock().expect("Gate::wait");
        while !*signaled {
            signaled = self.cv.wait(signaled).expect("Gate::wait");
        }
    }
}

/// Shared task record: the unit of sequenced work.
///
/// Owned by the chain arena and shared with every [`TaskHandle`] clone, so a
/// work function may stash a handle in an asynchronous callback that outlives
/// the work invocation itself.
#[must_use]
#[derive(Debug)]
pub(crate) struct TaskCore {
    id: TaskId,
    name: Option<Box<str>>,
    #[debug(skip)]
    work: Mutex<Option<WorkFn>>,
    #[debug(skip)]
    on_outcome: Mutex<Option<OutcomeFn>>,
    #[debug(skip)]
    gate: Gate,
    #[debug(skip)]
    state: AtomicU8,
    /// Completion guard: the first completion wins, later invocations are
    /// ignored so misuse cannot double-signal the gate or double-fire the
    /// outcome callback.
    #[debug(skip)]
    reported: AtomicBool,
    /// Set iff this task cancelled itself. Never overwritten with an
    /// ancestor's record.
    #[debug(skip)]
    cancelled: Mutex<Option<CancelRecord>>,
    /// Nearest cancelling ancestor's record, adopted verbatim when this task
    /// skips its work.
    #[debug(skip)]
    inherited: Mutex<Option<CancelRecord>>,
}

impl TaskCore {
    pub(crate) fn new(id: TaskId, name: Option<Box<str>>, work: WorkFn) -> Self {
        Self {
            id,
            name,
            work: Mutex::new(Some(work)),
            on_outcome: Mutex::new(None),
            gate: Gate::new(),
            state: AtomicU8::new(TaskState::Pending as u8),
            reported: AtomicBool::new(false),
            cancelled: Mutex::new(None),
            inherited: Mutex::new(None),
        }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn mark_running(&self) {
        self.state
            .store(TaskState::Running as u8, Ordering::Release);
    }

    pub(crate) fn take_work(&self) -> Option<WorkFn> {
        self.work.lock().expect("TaskCore::take_work").take()
    }

    pub(crate) fn set_on_outcome(&self, callback: OutcomeFn) {
        let mut on_outcome = self.on_outcome.lock().expect("TaskCore::set_on_outcome");
        *on_outcome = Some(callback);
    }

    pub(crate) fn wait_for_completion(&self) {
        self.gate.wait();
    }

    /// The record a dependent should report when this task is a cancelled
    /// dependency: the task's own record if it cancelled itself, otherwise
    /// the ancestor record it adopted when it was skipped. The second lookup
    /// is what carries an origin across more than one dependency hop.
    pub(crate) fn reportable_cancellation(&self) -> Option<CancelRecord> {
        let own = self
            .cancelled
            .lock()
            .expect("TaskCore::reportable_cancellation: [1]")
            .clone();
        own.or_else(|| {
            self.inherited
                .lock()
                .expect("TaskCore::reportable_cancellation: [2]")
                .clone()
        })
    }

    /// Adopt an ancestor's cancellation record verbatim. The own-record slot
    /// is left untouched.
    pub(crate) fn adopt(&self, record: CancelRecord) {
        let mut inherited = self.inherited.lock().expect("TaskCore::adopt");
        if inherited.is_none() {
            *inherited = Some(record);
        }
    }

    /// Explicit cancellation: records `(self, error)` as the origin, then
    /// runs the completion path with `finished = false`.
    pub(crate) fn cancel(&self, error: Option<TaskError>) {
        if self.reported.load(Ordering::Acquire) {
            tracing::warn!(task = %self.id, "cancel after completion; ignoring");
            return;
        }
        {
            let mut own = self.cancelled.lock().expect("TaskCore::cancel");
            if own.is_none() {
                *own = Some(CancelRecord {
                    origin: self.id,
                    error,
                });
            }
        }
        self.complete(false);
    }

    /// Completion path. Determines the record to report, invokes the outcome
    /// callback, and only then releases the execution thread blocked on the
    /// gate, so outcome-dependent caller logic has already run by the time
    /// the worker resumes.
    pub(crate) fn complete(&self, finished: bool) {
        if self.reported.swap(true, Ordering::AcqRel) {
            tracing::warn!(task = %self.id, "completion path invoked more than once; ignoring");
            return;
        }
        let record = if finished {
            None
        } else {
            self.reportable_cancellation()
        };
        let state = if finished {
            TaskState::Completed
        } else {
            TaskState::Cancelled
        };
        self.state.store(state as u8, Ordering::Release);
        tracing::trace!(task = %self.id, ?state, "task terminal");
        let callback = self
            .on_outcome
            .lock()
            .expect("TaskCore::complete")
            .take();
        if let Some(callback) = callback {
            callback(Outcome {
                finished,
                origin: record.as_ref().map(|record| record.origin),
                error: record.and_then(|record| record.error),
            });
        }
        self.gate.signal();
    }
}

/// Handle to a task, passed to its work function and obtainable from the
/// chain for external cancellation.
///
/// Clones share the same task, and the handle is `Send`, so a work function
/// may hand it to whatever asynchronous machinery will eventually decide the
/// outcome. The work function must eventually call exactly one of
/// [`move_on`](Self::move_on), [`cancel`](Self::cancel) or
/// [`cancel_with`](Self::cancel_with); failing to do so permanently blocks
/// the task's worker thread.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    pub(crate) core: Arc<TaskCore>,
}

impl TaskHandle {
    /// Identifier of the task this handle refers to.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.core.id()
    }

    /// Diagnostic name of the task, if one was given.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.core.name()
    }

    /// Current lifecycle state of the task.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.core.state()
    }

    /// Report normal success and release the task's worker thread.
    pub fn move_on(&self) {
        self.core.complete(true);
    }

    /// Cancel the task with no associated error.
    pub fn cancel(&self) {
        self.core.cancel(None);
    }

    /// Cancel the task, attaching an error payload that downstream dependents
    /// will observe in their outcome callbacks.
    pub fn cancel_with(&self, error: impl Into<anyhow::Error>) {
        self.core.cancel(Some(std::sync::Arc::new(error.into())));
    }
}
