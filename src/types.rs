use core::num::NonZeroU16;
use indexmap::{IndexMap as _IndexMap, IndexSet as _IndexSet};
use rustc_hash::FxBuildHasher;

/// Unique identifier of a task within a [`Chain`](crate::chain::Chain).
///
/// Compact `NonZeroU16` bounds the number of tasks and may enable minor
/// optimizations. Identifiers are assigned sequentially by the chain that
/// created the task.
pub type TaskId = NonZeroU16;

/// Opaque error payload attached to a cancellation.
///
/// Reference-counted so that a single originating record can be reported to
/// every downstream dependent without cloning the underlying error.
pub type TaskError = std::sync::Arc<anyhow::Error>;

pub(crate) type IndexMap<K, V> = _IndexMap<K, V, FxBuildHasher>;
pub(crate) type IndexSet<T> = _IndexSet<T, FxBuildHasher>;

/// Arena slot index of a task id. Ids are handed out sequentially from 1.
#[inline]
pub(crate) fn task_index(id: TaskId) -> usize {
    id.get() as usize - 1
}
