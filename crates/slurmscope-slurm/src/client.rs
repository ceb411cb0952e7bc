use anyhow::{Context, Result, bail, ensure};
use tokio::process::Command;
use tracing::debug;

use slurmscope_types::RunningJob;

/// squeue column layout: id, name, state, runtime, time limit, nodes, reason
const SQUEUE_FORMAT: &str = "%i|%j|%T|%M|%l|%D|%R";

/// List the user's jobs currently known to the scheduler.
///
/// Returns an empty list when `squeue` is missing or exits non-zero, so a
/// host without Slurm still gets the log-discovery half of the dashboard.
pub async fn get_running_jobs(user: &str) -> Vec<RunningJob> {
    let output = match Command::new("squeue")
        .args(["-u", user, "--noheader", &format!("--format={SQUEUE_FORMAT}")])
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            debug!(error = %e, "squeue not available");
            return Vec::new();
        }
    };
    if !output.status.success() {
        debug!(status = %output.status, "squeue exited with failure");
        return Vec::new();
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(parse_squeue_line)
        .collect()
}

/// Parse one pipe-delimited `squeue` row.
///
/// The reason column is free text and may itself contain `|`, so splitting
/// is capped at seven fields; rows with fewer fields are rejected.
fn parse_squeue_line(line: &str) -> Option<RunningJob> {
    let parts: Vec<&str> = line.trim().splitn(7, '|').collect();
    let [id, name, state, runtime, limit, nodes, reason] = parts.as_slice() else {
        return None;
    };
    Some(RunningJob {
        id: id.to_string(),
        name: name.to_string(),
        state: state.to_string(),
        runtime: runtime.to_string(),
        limit: limit.to_string(),
        nodes: nodes.to_string(),
        reason: reason.to_string(),
        log_key: format!("{name}::{id}"),
    })
}

/// Cancel a job via `scancel`.
pub async fn cancel_job(job_id: &str) -> Result<()> {
    ensure!(
        !job_id.is_empty() && job_id.bytes().all(|b| b.is_ascii_digit()),
        "job id must be numeric"
    );

    let output = Command::new("scancel")
        .arg(job_id)
        .output()
        .await
        .context("failed to run scancel")?;
    if !output.status.success() {
        bail!(
            "scancel failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}
