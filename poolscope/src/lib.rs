//! # poolscope - Saturation Diagnostics for Bounded Worker Pools
//!
//! poolscope augments a fixed-size worker pool with a diagnostic that fires
//! exactly when the pool is saturated: all workers busy, backlog full, new
//! work rejected. Instead of a bare rejection, the submitter receives an
//! error whose message says where every worker is currently stuck.
//!
//! ## Architecture Overview
//!
//! ```text
//! submit() rejected
//!       │
//!       ▼
//! ┌──────────────────┐   spawns    ┌─────────────────────────────┐
//! │ SaturationHandler│ ──────────▶ │ external dump command       │
//! │ (caller thread)  │             │ (jps | awk | xargs jstack)  │
//! └────────┬─────────┘             └─────────────────────────────┘
//!          │ line stream (deadline-bounded)
//!          ▼
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  DumpParser  │──▶│HangAggregator│──▶│ ReportWriter │
//! │ (per-worker  │   │ (rank top    │   │ (summary +   │
//! │  records)    │   │  frames)     │   │  .detail)    │
//! └──────────────┘   └──────────────┘   └──────────────┘
//!          │
//!          ▼
//! Err(PoolSaturated("Thread pool is EXHAUSTED! ..."))
//! ```
//!
//! ## Module Structure
//!
//! - [`pool`]: the thin fixed-size pool factory (queue policy, worker
//!   naming, statistics) with the saturation hook wired in
//! - [`snapshot`]: spawns the external dump command and streams its output
//!   under a read deadline, reaping the child on every exit path
//! - [`dump`]: streaming parser turning dump text into per-worker records
//! - [`analysis`]: hang-point tally and ranking
//! - [`report`]: detail artifact persistence and summary composition
//! - [`saturation`]: the orchestrator tying the stages together
//! - [`process_lookup`], [`preflight`], [`cli`]: support for the `poolscope`
//!   binary, which runs the same capture pipeline on demand against a
//!   running process
//!
//! ## Typical Usage
//!
//! ```no_run
//! use poolscope::{FixedPool, QueuePolicy, SubmitError};
//!
//! let pool = FixedPool::new(10, QueuePolicy::Rendezvous, "order-pool", "my-app")?;
//! match pool.submit(|| { /* work */ }) {
//!     Ok(()) => {}
//!     Err(SubmitError::Rejected(diag)) => {
//!         // diag's message ranks the frames the workers are stuck on and
//!         // names the ~/order-pool.detail file with the full stacks
//!         eprintln!("{diag}");
//!     }
//!     Err(other) => eprintln!("{other}"),
//! }
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod domain;
pub mod dump;
pub mod pool;
pub mod preflight;
pub mod process_lookup;
pub mod report;
pub mod saturation;
pub mod snapshot;

pub use analysis::{HangAggregator, HangPoint};
pub use domain::{DiagnosticError, PoolStats, SubmitError};
pub use dump::{DumpParser, WorkerStackRecord};
pub use pool::{FixedPool, PoolConfig, QueuePolicy};
pub use report::{DumpSummary, ReportWriter};
pub use saturation::{capture_hang_report, SaturationHandler};
pub use snapshot::SnapshotCollector;
