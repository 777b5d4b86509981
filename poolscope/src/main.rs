//! # poolscope - Main Entry Point
//!
//! On-demand capture: dump a running process, isolate the named pool's
//! worker threads, rank their hang points, and persist the detail artifact.
//! The same pipeline fires automatically inside [`poolscope::FixedPool`]
//! when a saturated pool rejects work.

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::time::Duration;

use poolscope::cli::Args;
use poolscope::preflight::run_preflight_checks;
use poolscope::process_lookup::find_target_process;
use poolscope::report::{default_detail_dir, ReportWriter};
use poolscope::saturation::capture_hang_report;
use poolscope::snapshot::SnapshotCollector;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_code_for(&e)
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.to_string().contains("Missing required argument") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

/// Build the dump command from CLI arguments.
///
/// Three modes:
/// - `poolscope my-app -w pool` - resolve the process by name, dump its PID
/// - `poolscope --pid 1234 -w pool` - dump an explicit PID
/// - `poolscope --command 'cat d.txt' -w pool` - run an arbitrary producer
fn resolve_command(args: &Args) -> Result<String> {
    if let Some(command) = &args.command {
        if args.process.is_some() || args.pid.is_some() {
            bail!(
                "Cannot combine --command with PROCESS or --pid.\n\n\
                 Use either:\n  \
                 poolscope my-app -w pool        (auto-detect)\n  \
                 poolscope --command '...' -w pool"
            );
        }
        return Ok(command.clone());
    }

    if let Some(pid) = args.pid {
        return Ok(format!("jstack {pid}"));
    }

    if let Some(name) = &args.process {
        let hit = find_target_process(name)?;
        info!("resolved '{name}' to {} ({})", hit.pid, hit.comm);
        return Ok(format!("jstack {}", hit.pid.0));
    }

    bail!(
        "Missing required argument: PROCESS, --pid, or --command\n\n\
         Usage:\n  \
         poolscope my-app -w order-pool       Auto-detect the process\n  \
         poolscope --pid 1234 -w order-pool   Explicit PID\n\n\
         Run 'poolscope --help' for more options"
    )
}

fn run() -> Result<()> {
    let args = Args::parse();

    let detail_dir = args.detail_dir.clone().unwrap_or_else(default_detail_dir);
    run_preflight_checks(&detail_dir)?;
    let command = resolve_command(&args)?;

    if !args.quiet {
        println!("poolscope v{}", env!("CARGO_PKG_VERSION"));
        println!("workers: {}", args.workers);
    }

    let collector = SnapshotCollector::with_command(command)
        .with_timeout(Duration::from_secs(args.timeout));
    let stream = collector.collect()?;

    let writer = ReportWriter::with_detail_dir(detail_dir);
    let summary = capture_hang_report(stream, &args.workers, &writer)?;

    if summary.matched_workers == 0 {
        eprintln!(
            "warning: no worker threads matched \"{}\" - check the -w substring",
            args.workers
        );
    }
    if !args.quiet {
        println!(
            "{} worker threads matched, {} with live frames",
            summary.matched_workers, summary.hanging_workers
        );
    }
    for point in &summary.hang_points {
        println!("{} threads are hanging on this code : {}", point.count, point.frame);
    }
    println!(
        "You can fetch more thread statck information by the detail file : {}",
        summary.detail_path.display()
    );

    if let Some(json_path) = &args.json {
        let file = File::create(json_path)
            .with_context(|| format!("Failed to create {}", json_path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &summary)
            .context("Failed to serialize report")?;
        if !args.quiet {
            println!("saved: {}", json_path.display());
        }
    }

    Ok(())
}
