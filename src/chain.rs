use crate::{
    sync::Arc,
    task::{Outcome, TaskCore, TaskHandle},
    types::{IndexMap, IndexSet, TaskId, task_index},
};
use derive_more::Debug;

/// Arena of tasks plus the dependency edges between them.
///
/// Tasks are created with [`task`](Self::task) / [`named_task`](Self::named_task)
/// and wired with [`after`](Self::after). The chain records edges only; it
/// neither schedules nor runs anything. Submission hands the whole arena to an
/// [`Executor`](crate::executor::Executor), which consumes the chain so that
/// every task executes at most once.
#[must_use]
#[derive(Debug, Default)]
pub struct Chain {
    tasks: Vec<Arc<TaskCore>>,
    /// TaskId(child) -> set of tasks this child depends on.
    child_to_parents: IndexMap<TaskId, IndexSet<TaskId>>,
    /// TaskId(parent) -> set of tasks depending on this parent.
    parent_to_children: IndexMap<TaskId, IndexSet<TaskId>>,
}

impl Chain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the chain contains no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Create a task from its work function and return its id.
    ///
    /// The work function is invoked at most once, on a dedicated worker
    /// thread, with a [`TaskHandle`] through which it must eventually report
    /// its outcome.
    pub fn task(&mut self, work: impl FnOnce(TaskHandle) + Send + 'static) -> TaskId {
        self.insert(None, Box::new(work))
    }

    /// Like [`task`](Self::task), with a human-readable name for diagnostics.
    pub fn named_task(
        &mut self,
        name: impl Into<Box<str>>,
        work: impl FnOnce(TaskHandle) + Send + 'static,
    ) -> TaskId {
        self.insert(Some(name.into()), Box::new(work))
    }

    fn insert(&mut self, name: Option<Box<str>>, work: crate::task::WorkFn) -> TaskId {
        let id: TaskId = (self.tasks.len() + 1)
            .try_into()
            .ok()
            .and_then(|id: u16| TaskId::new(id))
            .expect("Chain::insert: task capacity exceeded");
        self.tasks.push(Arc::new(TaskCore::new(id, name, work)));
        id
    }

    /// Record that `dependent` must wait for `before` to reach a terminal
    /// state, and return `dependent` for fluent left-to-right composition.
    ///
    /// Pure edge addition: the order in which tasks are later handed to the
    /// executor has no bearing on execution order.
    ///
    /// # Panics
    /// If either id does not belong to this chain, or if the two ids are
    /// equal.
    pub fn after(&mut self, before: TaskId, dependent: TaskId) -> TaskId {
        assert!(
            task_index(before) < self.tasks.len(),
            "Task {before:?} does not belong to this chain"
        );
        assert!(
            task_index(dependent) < self.tasks.len(),
            "Task {dependent:?} does not belong to this chain"
        );
        assert_ne!(before, dependent, "Task {dependent:?} depends on itself");
        self.child_to_parents
            .entry(dependent)
            .or_default()
            .insert(before);
        self.parent_to_children
            .entry(before)
            .or_default()
            .insert(dependent);
        tracing::trace!(before = %before, dependent = %dependent, "dependency edge added");
        dependent
    }

    /// Register the outcome callback for a task. Invoked exactly once per
    /// task execution, before the task's worker thread is released. A repeat
    /// registration replaces the previous callback.
    ///
    /// # Panics
    /// If the id does not belong to this chain.
    pub fn on_outcome(&mut self, task: TaskId, callback: impl FnOnce(Outcome) + Send + 'static) {
        self.core(task).set_on_outcome(Box::new(callback));
    }

    /// Handle to a task, e.g. for cancelling it from outside before or during
    /// execution.
    ///
    /// # Panics
    /// If the id does not belong to this chain.
    #[must_use]
    pub fn handle(&self, task: TaskId) -> TaskHandle {
        TaskHandle {
            core: self.core(task).clone(),
        }
    }

    fn core(&self, task: TaskId) -> &Arc<TaskCore> {
        self.tasks
            .get(task_index(task))
            .unwrap_or_else(|| panic!("Task {task:?} does not belong to this chain"))
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        Vec<Arc<TaskCore>>,
        IndexMap<TaskId, IndexSet<TaskId>>,
        IndexMap<TaskId, IndexSet<TaskId>>,
    ) {
        let Self {
            tasks,
            child_to_parents,
            parent_to_children,
        } = self;
        (tasks, child_to_parents, parent_to_children)
    }
}
