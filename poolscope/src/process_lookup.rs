//! Resolve the target process for an on-demand capture.
//!
//! Scans `/proc` for processes whose command name or executable basename
//! matches the requested pattern, the same fuzzy match the default dump
//! pipeline applies. An exact match wins over substring matches so that
//! `poolscope api` picks `api` even when `api-gateway` is also running.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::domain::Pid;

/// A process matched during lookup.
#[derive(Debug)]
pub struct ProcessHit {
    pub pid: Pid,
    pub comm: String,
    pub exe: String,
}

/// Find the process to dump by fuzzy name match.
///
/// # Errors
/// - no process matches the pattern
/// - several processes match and none matches exactly
pub fn find_target_process(pattern: &str) -> Result<ProcessHit> {
    let mut hits: Vec<ProcessHit> = Vec::new();

    let proc_dir = fs::read_dir("/proc").context("Failed to read /proc")?;
    for entry in proc_dir.flatten() {
        let file_name = entry.file_name();
        let Ok(pid) = file_name.to_string_lossy().parse::<i32>() else {
            continue;
        };
        // Kernel threads and inaccessible processes have no readable exe link
        let Ok(exe_path) = fs::read_link(format!("/proc/{pid}/exe")) else {
            continue;
        };
        let Ok(comm) = fs::read_to_string(format!("/proc/{pid}/comm")) else {
            continue;
        };
        let comm = comm.trim().to_string();
        let exe = exe_path.to_string_lossy().into_owned();
        if matches_pattern(&comm, &exe_path, pattern) {
            hits.push(ProcessHit { pid: Pid(pid), comm, exe });
        }
    }

    if let Some(exact) =
        hits.iter().position(|h| h.comm == pattern || exe_basename(&h.exe) == pattern)
    {
        return Ok(hits.swap_remove(exact));
    }

    match hits.len() {
        0 => bail!(
            "No process matching '{pattern}' found.\n\
             Check running processes with: ps aux | grep {pattern}"
        ),
        1 => Ok(hits.remove(0)),
        _ => {
            let listing: Vec<String> =
                hits.iter().map(|h| format!("  {} ({})", h.pid, h.comm)).collect();
            bail!(
                "Multiple processes match '{pattern}':\n{}\n\n\
                 Specify the PID explicitly: poolscope --pid <PID> ...",
                listing.join("\n")
            )
        }
    }
}

fn exe_basename(exe: &str) -> &str {
    Path::new(exe).file_name().and_then(|n| n.to_str()).unwrap_or(exe)
}

fn matches_pattern(comm: &str, exe_path: &Path, pattern: &str) -> bool {
    let basename = exe_path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    comm.contains(pattern) || basename.contains(pattern)
}
