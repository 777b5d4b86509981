//! Domain types shared across the diagnostic pipeline.

use std::fmt;

/// Process ID of the target process being dumped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(pub i32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

/// Immutable pool statistics read at rejection time.
///
/// Sourced from the pool when a submission is rejected; the diagnostic
/// pipeline never mutates it. The `Display` impl renders the executor-status
/// portion of the exhaustion message.
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Current number of worker threads.
    pub pool_size: usize,
    /// Workers currently executing a task.
    pub active_count: usize,
    /// Configured core size.
    pub core_size: usize,
    /// Configured maximum size.
    pub max_size: usize,
    /// Largest size the pool ever reached.
    pub largest_size: usize,
    /// Tasks accepted so far.
    pub task_count: u64,
    /// Tasks that ran to completion.
    pub completed_count: u64,
    /// Shutdown has been initiated.
    pub is_shutdown: bool,
    /// All workers have exited.
    pub is_terminated: bool,
    /// Shutdown initiated but workers still draining.
    pub is_terminating: bool,
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pool Size: {} (active: {}, core: {}, max: {}, largest: {}), \
             Task: {} (completed: {}), \
             Executor status:(isShutdown:{}, isTerminated:{}, isTerminating:{})",
            self.pool_size,
            self.active_count,
            self.core_size,
            self.max_size,
            self.largest_size,
            self.task_count,
            self.completed_count,
            self.is_shutdown,
            self.is_terminated,
            self.is_terminating
        )
    }
}
