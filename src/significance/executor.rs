//! significance::executor — explicit parallel-map seam.
//!
//! Purpose
//! -------
//! Abstract the execution of the permutation loop behind a trait so the
//! significance test never reads ambient global concurrency configuration:
//! the executor is an explicit parameter, and task→result index
//! correspondence is preserved regardless of how the tasks are scheduled.
//!
//! Key behaviors
//! -------------
//! - [`ParallelMap::map`] applies a function to each task and returns the
//!   results in task order.
//! - [`RayonMap`] dispatches over rayon's work-stealing pool;
//!   [`SerialMap`] runs in the calling thread, useful for deterministic
//!   debugging and small workloads.
//!
//! Invariants & assumptions
//! ------------------------
//! - Implementations must preserve index correspondence: result `i` comes
//!   from task `i`. Both provided executors do (rayon's indexed collect and
//!   a plain in-order loop).
//! - The mapped function only reads shared state; all per-task inputs are
//!   owned by the task itself. This is what makes the permutation loop
//!   embarrassingly parallel.
//!
//! Testing notes
//! -------------
//! - A unit test checks that both executors produce identical, in-order
//!   results for an index-sensitive function.

use rayon::prelude::*;

/// An order-preserving parallel map over independent tasks.
pub trait ParallelMap {
    /// Apply `f` to every task, returning results in task order.
    fn map<T, R, F>(&self, tasks: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send;
}

/// RayonMap — parallel execution on rayon's global work-stealing pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct RayonMap;

impl ParallelMap for RayonMap {
    fn map<T, R, F>(&self, tasks: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send,
    {
        tasks.into_par_iter().map(f).collect()
    }
}

/// SerialMap — in-order execution in the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialMap;

impl ParallelMap for SerialMap {
    fn map<T, R, F>(&self, tasks: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send,
    {
        tasks.into_iter().map(f).collect()
    }
}
