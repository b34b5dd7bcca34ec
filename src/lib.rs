//! Sequenced task chains with silent cancellation propagation.
//!
//! This crate provides a task-sequencing primitive: a directed chain of
//! asynchronous units of work with explicit ordering. It:
//! - Admits a task only after every task it depends on has reached a terminal
//!   state (completed or cancelled), and detects dependency cycles at
//!   submission time.
//! - Gives each task execution a dedicated worker thread and a one-shot
//!   completion rendezvous, so the work function may finish synchronously or
//!   through an asynchronous callback of its own choosing.
//! - Silently propagates a cancellation to every downstream task, along with
//!   the identity of the nearest cancelling ancestor and its optional error
//!   payload.
//!
//! Key modules:
//! - `chain`: the arena of tasks and the fluent dependency-edge builder.
//! - `task`: the task record, its lifecycle states, the handle handed to work
//!   functions and the outcome delivered to callbacks.
//! - `executor`: submission-time validation (dependency closure, cycle
//!   detection) and dependency-respecting parallel execution.
//! - `types`: task identifiers and the opaque cancellation error payload.
//!
//! Quick start:
//! 1. Build a [`chain::Chain`], creating tasks from work closures; each
//!    closure receives a [`task::TaskHandle`] and must eventually call
//!    `move_on`, `cancel` or `cancel_with` on it.
//! 2. Wire ordering with `Chain::after` and register outcome callbacks with
//!    `Chain::on_outcome`.
//! 3. Submit the chain to an [`executor::Executor`], either blocking until
//!    everything is terminal or in the background.
//!
//! Failure is modeled entirely as cancellation: there is no exception-based
//! error channel. A task is either finished normally or cancelled, and a
//! cancellation optionally carries an opaque error supplied by whichever task
//! originated it. A running work function is never forcibly interrupted;
//! cancellation is cooperative.

/// Task arena and dependency-edge construction.
///
/// Exposes [`chain::Chain`], which creates tasks, records "must run after"
/// edges, hands out task handles and registers outcome callbacks.
pub mod chain;
/// Submission and dependency-respecting execution.
///
/// Contains selection validation (transitive dependency closure, cycle
/// detection) and the admission protocol that spawns each task on its own
/// worker thread once its dependencies are terminal.
pub mod executor;
mod sync;
/// Task definitions: lifecycle states, the work-function handle and the
/// terminal outcome report.
pub mod task;
/// Core identifier and payload types used across the crate.
pub mod types;
