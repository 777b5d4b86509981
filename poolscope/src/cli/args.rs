//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "poolscope",
    about = "Rank where a worker pool's threads are stuck, from a live stack dump",
    after_help = "\
EXAMPLES:
    poolscope my-app -w order-pool           Dump my-app, rank order-pool workers
    poolscope --pid 1234 -w order-pool       Dump an explicit PID
    poolscope -w order-pool --command 'cat dump.txt'
                                             Rank a pre-captured dump"
)]
pub struct Args {
    /// Process name to dump (fuzzy match against running processes)
    #[arg(value_name = "PROCESS")]
    pub process: Option<String>,

    /// Worker-name substring identifying the pool's threads
    #[arg(short, long, value_name = "NAME")]
    pub workers: String,

    /// Process ID to dump (skips the process-name lookup)
    #[arg(short, long)]
    pub pid: Option<i32>,

    /// Shell command producing the stack dump (instead of PROCESS/--pid)
    #[arg(long, value_name = "CMD")]
    pub command: Option<String>,

    /// Give up on the capture after this many seconds
    #[arg(long, default_value = "10", value_name = "SECS")]
    pub timeout: u64,

    /// Directory for the detail artifact (defaults to $HOME)
    #[arg(long, value_name = "DIR")]
    pub detail_dir: Option<PathBuf>,

    /// Also write the ranked report as JSON
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}
