//! Pre-flight checks for the poolscope binary
//!
//! Validates the environment before spawning the dump command, so failures
//! arrive as actionable messages instead of a dead pipeline.

use anyhow::{bail, Result};
use std::path::Path;

/// Run all pre-flight checks before capturing.
pub fn run_preflight_checks(detail_dir: &Path) -> Result<()> {
    check_platform()?;
    check_shell()?;
    check_detail_dir(detail_dir)?;
    Ok(())
}

/// Stack snapshots need POSIX process tooling.
fn check_platform() -> Result<()> {
    if cfg!(unix) {
        return Ok(());
    }
    bail!(
        "poolscope captures stack dumps through POSIX tooling and does not \
         support this platform. Run it on Linux or another Unix."
    );
}

/// The dump command is executed through `/bin/sh -c`.
fn check_shell() -> Result<()> {
    if Path::new("/bin/sh").exists() {
        return Ok(());
    }
    bail!("/bin/sh not found; the stack-dump pipeline needs a POSIX shell");
}

/// The detail artifact directory must exist before the capture starts.
fn check_detail_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    bail!(
        "Detail directory {} does not exist.\n\
         Create it or pass a different one with --detail-dir",
        dir.display()
    );
}
