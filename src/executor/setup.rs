use crate::{
    chain::Chain,
    executor::{Latch, Plan},
    sync::AtomicU16,
    types::{TaskId, task_index},
};
use std::collections::VecDeque;
use thiserror::Error;
use unzip3::Unzip3;

/// Error kind for submission failures.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SubmitError {
    /// The dependency graph of the scheduled tasks contains cycle(s).
    #[error("dependency graph contains cycle(s)")]
    Cycle,
    /// The selection names a task the submitted chain does not contain.
    #[error("task {0} does not belong to the submitted chain")]
    UnknownTask(TaskId),
}

/// Build the execution plan for a submitted selection by:
/// - Resolving the selection against the chain's arena,
/// - Expanding it to its transitive dependency closure,
/// - Materializing per-slot edge lists and admission counters,
/// - Verifying with a Kahn-like pass that the closure is acyclic.
pub(super) fn build_plan(
    chain: Chain,
    selection: impl IntoIterator<Item = TaskId>,
    thread_name: String,
) -> Result<Plan, SubmitError> {
    #[cfg(not(feature = "loom"))]
    let submitter = std::thread::current().id();

    let (tasks, child_to_parents, parent_to_children) = chain.into_parts();

    // Phase 1: Resolve the selection and expand it to its transitive
    // dependency closure. A task linked as a dependency runs even when it was
    // not itself selected; chain tasks outside the closure are dropped unrun.
    let mut scheduled = vec![false; tasks.len()];
    let mut worklist = Vec::new();
    for id in selection {
        if task_index(id) >= tasks.len() {
            return Err(SubmitError::UnknownTask(id));
        }
        if !scheduled[task_index(id)] {
            scheduled[task_index(id)] = true;
            worklist.push(id);
        }
    }
    while let Some(id) = worklist.pop() {
        let Some(parents) = child_to_parents.get(&id) else {
            continue;
        };
        for &parent in parents {
            let idx = task_index(parent);
            if !scheduled[idx] {
                scheduled[idx] = true;
                worklist.push(parent);
            }
        }
    }
    let num_scheduled = scheduled.iter().filter(|&&in_closure| in_closure).count();

    // Phase 2: Materialize per-slot edge lists and admission counters, edges
    // restricted to the closure. Every parent of a closure member is itself a
    // closure member, so parent lists need no filtering; child lists do.
    // Unscheduled slots keep empty lists and are never spawned.
    let (parents, children, parents_left): (Vec<Vec<u16>>, Vec<Vec<u16>>, Vec<AtomicU16>) = tasks
        .iter()
        .enumerate()
        .map(|(idx, task)| {
            if !scheduled[idx] {
                return (Vec::new(), Vec::new(), AtomicU16::new(0));
            }
            let id = task.id();
            let parents: Vec<u16> = child_to_parents
                .get(&id)
                .map(|set| {
                    set.iter()
                        .map(|&parent| {
                            debug_assert!(scheduled[task_index(parent)], "build_plan: [1]");
                            task_index(parent) as u16
                        })
                        .collect()
                })
                .unwrap_or_default();
            let mut children: Vec<u16> = parent_to_children
                .get(&id)
                .map(|set| {
                    set.iter()
                        .map(|&child| task_index(child))
                        .filter(|&child| scheduled[child])
                        .map(|child| child as u16)
                        .collect()
                })
                .unwrap_or_default();
            // Sort children's indexes to achieve better cache locality.
            children.sort_unstable();
            let parents_total: u16 = parents.len().try_into().expect("build_plan: [2]");
            (parents, children, AtomicU16::new(parents_total))
        })
        .unzip3();

    let roots: Vec<u16> = (0..tasks.len())
        .filter(|&idx| scheduled[idx] && parents[idx].is_empty())
        .map(|idx| idx as u16)
        .collect();

    // Phase 3: Kahn-like pass over the closure. Pop a ready task, mark its
    // children ready as their counters drain. If the pass cannot reach every
    // scheduled task, the remaining subgraph must be cyclic.
    let mut counts: Vec<u16> = parents
        .iter()
        .map(|parents| parents.len().try_into().expect("build_plan: [3]"))
        .collect();
    let mut queue: VecDeque<u16> = roots.iter().copied().collect();
    let mut processed = 0usize;
    while let Some(idx) = queue.pop_front() {
        processed = processed.checked_add(1).expect("build_plan: [4]");
        for &child in &children[idx as usize] {
            let count = &mut counts[child as usize];
            *count = count.checked_sub(1).expect("build_plan: [5]");
            if *count == 0 {
                queue.push_back(child);
            }
        }
    }
    if processed != num_scheduled {
        return Err(SubmitError::Cycle);
    }

    Ok(Plan {
        tasks,
        parents,
        children,
        parents_left,
        roots,
        num_scheduled,
        latch: Latch::new(num_scheduled),
        thread_name,
        #[cfg(not(feature = "loom"))]
        submitter,
    })
}
