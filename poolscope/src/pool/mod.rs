//! Fixed-size worker pool with a saturation-diagnosis rejection hook
//!
//! A thin factory around OS threads and a crossbeam channel. The queue
//! policy mirrors the classic bounded-executor knob: no buffering
//! (rendezvous hand-off), an unbounded backlog, or a bounded backlog of a
//! given capacity. When a submission cannot be accepted the pool snapshots
//! its statistics and fires the [`SaturationHandler`] on the submitting
//! thread; the resulting diagnostic error is returned to the submitter,
//! which owns any retry decision.

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TrySendError};
use log::warn;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::domain::{PoolStats, SubmitError};
use crate::saturation::SaturationHandler;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A worker that is between tasks (or still starting up) needs a moment to
/// reach the hand-off before a full queue can be called saturation.
const HANDOFF_GRACE: Duration = Duration::from_millis(50);

/// Backlog policy for submitted tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    /// No buffering: a task is accepted only if a worker takes it directly.
    Rendezvous,
    /// Unlimited backlog; the pool never saturates.
    Unbounded,
    /// Backlog of at most this many queued tasks.
    Bounded(usize),
}

impl QueuePolicy {
    /// Classic integer encoding: `0` = no buffering, negative = unbounded,
    /// positive = bounded capacity.
    #[must_use]
    pub fn from_capacity(queues: i32) -> Self {
        match queues {
            0 => Self::Rendezvous,
            n if n < 0 => Self::Unbounded,
            n => Self::Bounded(n.unsigned_abs() as usize),
        }
    }
}

/// Pool construction parameters.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads.
    pub threads: usize,
    /// Backlog policy.
    pub queue: QueuePolicy,
    /// Pool name; workers are named `<name>-<n>` and the detail artifact is
    /// `<name>.detail`.
    pub name: String,
    /// Fuzzy name of the OS process to dump on saturation.
    pub process_match: String,
}

impl PoolConfig {
    #[must_use]
    pub fn new(name: impl Into<String>, process_match: impl Into<String>) -> Self {
        let threads = std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get);
        Self {
            threads,
            queue: QueuePolicy::Rendezvous,
            name: name.into(),
            process_match: process_match.into(),
        }
    }
}

struct PoolShared {
    pool_size: usize,
    active: AtomicUsize,
    submitted: AtomicU64,
    completed: AtomicU64,
    shutdown: AtomicBool,
    terminated: AtomicBool,
}

/// Fixed-size worker pool.
///
/// Workers are spawned eagerly at construction, so the pool's size, core
/// size, maximum size, and largest size all coincide.
pub struct FixedPool {
    name: String,
    shared: Arc<PoolShared>,
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_seq: AtomicUsize,
    handler: SaturationHandler,
}

impl FixedPool {
    /// Pool with `threads` workers and the given backlog policy. The
    /// saturation handler dumps the process matching `process_match` with
    /// the default pipeline.
    ///
    /// # Errors
    /// Returns an error if a worker thread cannot be spawned.
    pub fn new(
        threads: usize,
        queue: QueuePolicy,
        name: impl Into<String>,
        process_match: &str,
    ) -> io::Result<Self> {
        let name = name.into();
        let handler = SaturationHandler::new(name.clone(), process_match);
        Self::with_handler(threads, queue, handler)
    }

    /// Pool from a [`PoolConfig`].
    ///
    /// # Errors
    /// Returns an error if a worker thread cannot be spawned.
    pub fn with_config(config: PoolConfig) -> io::Result<Self> {
        Self::new(config.threads, config.queue, config.name, &config.process_match)
    }

    /// Pool with an explicit rejection handler (custom dump command, detail
    /// directory, or timeout). The pool takes its name from the handler.
    ///
    /// # Errors
    /// Returns an error if a worker thread cannot be spawned.
    pub fn with_handler(
        threads: usize,
        queue: QueuePolicy,
        handler: SaturationHandler,
    ) -> io::Result<Self> {
        let name = handler.pool_name().to_string();
        let (tx, rx) = match queue {
            QueuePolicy::Rendezvous => crossbeam_channel::bounded(0),
            QueuePolicy::Unbounded => crossbeam_channel::unbounded(),
            QueuePolicy::Bounded(capacity) => crossbeam_channel::bounded(capacity),
        };

        let shared = Arc::new(PoolShared {
            pool_size: threads,
            active: AtomicUsize::new(0),
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
        });

        let worker_seq = AtomicUsize::new(1);
        let mut workers = Vec::with_capacity(threads);
        for _ in 0..threads {
            let worker_name = format!("{name}-{}", worker_seq.fetch_add(1, Ordering::Relaxed));
            let rx = rx.clone();
            let shared = Arc::clone(&shared);
            let handle = std::thread::Builder::new()
                .name(worker_name)
                .spawn(move || worker_loop(&rx, &shared))?;
            workers.push(handle);
        }

        Ok(Self {
            name,
            shared,
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            worker_seq,
            handler,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submit a task for execution.
    ///
    /// # Errors
    /// - [`SubmitError::Shutdown`] after [`FixedPool::shutdown`]
    /// - [`SubmitError::Rejected`] when the pool is saturated; the payload
    ///   is the diagnostic raised by the [`SaturationHandler`], normally
    ///   [`crate::DiagnosticError::PoolSaturated`] with the ranked summary
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> Result<(), SubmitError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = sender.as_ref() else {
            return Err(SubmitError::Shutdown(self.name.clone()));
        };

        match tx.try_send(Box::new(job)) {
            Ok(()) => {
                self.shared.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(job))
                if self.shared.active.load(Ordering::Acquire) < self.shared.pool_size =>
            {
                // Not every worker is mid-task; wait out the hand-off window
                match tx.send_timeout(job, HANDOFF_GRACE) {
                    Ok(()) => {
                        self.shared.submitted.fetch_add(1, Ordering::Relaxed);
                        Ok(())
                    }
                    Err(SendTimeoutError::Timeout(_)) => {
                        drop(sender);
                        self.reject()
                    }
                    Err(SendTimeoutError::Disconnected(_)) => {
                        Err(SubmitError::Shutdown(self.name.clone()))
                    }
                }
            }
            Err(TrySendError::Full(_)) => {
                drop(sender);
                self.reject()
            }
            Err(TrySendError::Disconnected(_)) => Err(SubmitError::Shutdown(self.name.clone())),
        }
    }

    fn reject(&self) -> Result<(), SubmitError> {
        let stats = self.stats();
        Err(SubmitError::Rejected(self.handler.handle(&stats)))
    }

    /// Immutable statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let shutdown = self.shared.shutdown.load(Ordering::Acquire);
        let terminated = self.shared.terminated.load(Ordering::Acquire);
        PoolStats {
            pool_size: self.shared.pool_size,
            active_count: self.shared.active.load(Ordering::Acquire),
            core_size: self.shared.pool_size,
            max_size: self.shared.pool_size,
            largest_size: self.shared.pool_size,
            task_count: self.shared.submitted.load(Ordering::Relaxed),
            completed_count: self.shared.completed.load(Ordering::Relaxed),
            is_shutdown: shutdown,
            is_terminated: terminated,
            is_terminating: shutdown && !terminated,
        }
    }

    /// Initiate shutdown: no new tasks are accepted, queued tasks still run.
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
        let mut sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        *sender = None;
    }

    /// Shut down and wait for every worker to exit.
    pub fn join(&self) {
        self.shutdown();
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        for handle in workers.drain(..) {
            if handle.join().is_err() {
                warn!("pool \"{}\": worker exited by panic", self.name);
            }
        }
        self.shared.terminated.store(true, Ordering::Release);
    }

    /// Next worker sequence number; exposed for factories that replace
    /// workers externally.
    #[must_use]
    pub fn next_worker_id(&self) -> usize {
        self.worker_seq.load(Ordering::Relaxed)
    }
}

impl Drop for FixedPool {
    fn drop(&mut self) {
        // Close the channel so workers exit once the backlog drains
        self.shutdown();
    }
}

fn worker_loop(rx: &Receiver<Job>, shared: &PoolShared) {
    for job in rx.iter() {
        shared.active.fetch_add(1, Ordering::AcqRel);
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            warn!("worker task panicked");
        }
        shared.active.fetch_sub(1, Ordering::AcqRel);
        shared.completed.fetch_add(1, Ordering::Relaxed);
    }
}
