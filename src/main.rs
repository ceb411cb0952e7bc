//! slurmscope - a CLI for browsing, tailing, and searching Slurm job logs

use std::io::Write;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::warn;

use slurmscope_logs::{
    DEFAULT_RECENT_LIMIT, LogPattern, RecentCache, StreamKind, TailEvent, bucket_key,
    collect_recent, resolve, search_log, spawn_tail,
};
use slurmscope_slurm::{RunningJob, cancel_job, get_running_jobs};
use slurmscope_types::JobLogEntry;

mod config;

use config::{Config, Overrides};

/// How often watch mode re-renders. Discovery itself is refreshed on the
/// configured interval through the bucketed cache; only squeue runs per tick.
const WATCH_TICK: Duration = Duration::from_secs(5);

/// Slurmscope - browse, tail, and search Slurm job logs
#[derive(Parser, Debug)]
#[command(name = "slurmscope")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root directory for Slurm log files
    #[arg(long, value_name = "DIR", global = true)]
    log_root: Option<std::path::PathBuf>,

    /// Log path template relative to the root, e.g. "{name}/job.{stream}.{id}"
    #[arg(long, value_name = "TEMPLATE", global = true)]
    log_pattern: Option<String>,

    /// Slurm user whose jobs to show
    #[arg(long, global = true)]
    user: Option<String>,

    /// Seconds between discovery refreshes in watch mode
    #[arg(long, value_name = "SECS", global = true)]
    refresh_secs: Option<u64>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Show running jobs and recently updated job logs
    Jobs {
        /// Keep refreshing until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// List recently updated job logs
    Recent {
        /// Maximum entries to show
        #[arg(long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Live-tail a job log until interrupted
    Tail {
        /// Job log key in the form name::id
        log_key: String,
        /// Tail stderr instead of stdout
        #[arg(long)]
        stderr: bool,
        /// Emit one JSON event per line instead of raw text
        #[arg(long)]
        json: bool,
    },
    /// Search a job log for a pattern, with context
    Search {
        /// Job log key in the form name::id
        log_key: String,
        /// Search pattern (case-insensitive regex by default)
        pattern: String,
        /// Context lines before and after each match (clamped to 0-10)
        #[arg(long, default_value_t = 3)]
        context: usize,
        /// Treat the pattern as a literal string, not a regex
        #[arg(long)]
        literal: bool,
        /// Search stderr instead of stdout
        #[arg(long)]
        stderr: bool,
        /// Emit JSON instead of human-readable matches
        #[arg(long)]
        json: bool,
    },
    /// Cancel a running job
    Cancel {
        /// Numeric Slurm job id
        job_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(Overrides {
        log_root: args.log_root.clone(),
        log_pattern: args.log_pattern.clone(),
        user: args.user.clone(),
        refresh_secs: args.refresh_secs,
    })?;

    // A structurally bad template is the one fatal config error; a missing
    // root only warns, the directory may appear once jobs start writing.
    let pattern = LogPattern::compile(&config.log_pattern)?;
    if !config.log_root.is_dir() {
        warn!(root = %config.log_root.display(), "log root does not exist yet");
    }

    let result = run_command(args.command, &config, &pattern).await;
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }
    result
}

async fn run_command(command: CliCommand, config: &Config, pattern: &LogPattern) -> Result<()> {
    match command {
        CliCommand::Jobs { watch } => cmd_jobs(config, pattern, watch).await,
        CliCommand::Recent { limit, json } => cmd_recent(config, pattern, limit, json),
        CliCommand::Tail {
            log_key,
            stderr,
            json,
        } => cmd_tail(config, pattern, &log_key, stream_for(stderr), json).await,
        CliCommand::Search {
            log_key,
            pattern: query,
            context,
            literal,
            stderr,
            json,
        } => cmd_search(
            config,
            pattern,
            &log_key,
            &query,
            context,
            !literal,
            stream_for(stderr),
            json,
        ),
        CliCommand::Cancel { job_id } => cancel_job(&job_id).await,
    }
}

fn stream_for(stderr: bool) -> StreamKind {
    if stderr { StreamKind::Err } else { StreamKind::Out }
}

// ---------------------------------------------------------------------------
// jobs
// ---------------------------------------------------------------------------

async fn cmd_jobs(config: &Config, pattern: &LogPattern, watch: bool) -> Result<()> {
    let mut cache = RecentCache::new();

    loop {
        let running = get_running_jobs(&config.user).await;
        let bucket = bucket_key(unix_now(), config.refresh_secs);
        let recent = cache
            .get_or_refresh(bucket, || {
                collect_recent(&config.log_root, pattern, DEFAULT_RECENT_LIMIT)
            })
            .to_vec();

        if watch {
            // clear screen and home the cursor between refreshes
            print!("\x1b[2J\x1b[1;1H");
        }
        print_running(&running);
        println!();
        print_recent(&recent, config, pattern);

        if !watch {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = sleep(WATCH_TICK) => {}
        }
    }
}

fn print_running(jobs: &[RunningJob]) {
    println!("RUNNING ({})", jobs.len());
    if jobs.is_empty() {
        println!("  no jobs in the queue");
        return;
    }
    println!(
        "  {:<8} {:<24} {:<10} {:>10} {:>10} {:>5}  {}",
        "ID", "NAME", "STATE", "TIME", "LIMIT", "NODES", "REASON"
    );
    for job in jobs {
        println!(
            "  {:<8} {:<24} {:<10} {:>10} {:>10} {:>5}  {}",
            job.id, job.name, job.state, job.runtime, job.limit, job.nodes, job.reason
        );
    }
}

fn print_recent(entries: &[JobLogEntry], config: &Config, pattern: &LogPattern) {
    println!("RECENT LOGS ({})", entries.len());
    if entries.is_empty() {
        println!(
            "  no log files match \"{}\" under {}",
            pattern.template(),
            config.log_root.display()
        );
        return;
    }
    println!(
        "  {:<20} {:<28} {:>9}  {}",
        "UPDATED", "LOG KEY", "SIZE", "NAME"
    );
    for entry in entries {
        println!(
            "  {:<20} {:<28} {:>9}  {}",
            entry
                .updated
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S"),
            entry.log_key,
            entry.size_display(),
            entry.name
        );
    }
}

// ---------------------------------------------------------------------------
// recent
// ---------------------------------------------------------------------------

fn cmd_recent(config: &Config, pattern: &LogPattern, limit: usize, json: bool) -> Result<()> {
    let entries = collect_recent(&config.log_root, pattern, limit);
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print_recent(&entries, config, pattern);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// tail
// ---------------------------------------------------------------------------

async fn cmd_tail(
    config: &Config,
    pattern: &LogPattern,
    log_key: &str,
    stream: StreamKind,
    json: bool,
) -> Result<()> {
    let Some(path) = resolve(&config.log_root, pattern, log_key, stream) else {
        bail!("log not found: {log_key} ({stream})");
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = spawn_tail(path, tx);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                handle.stop();
                return Ok(());
            }
            event = rx.recv() => match event {
                Some(event) => print_tail_event(&event, json)?,
                // the tail task is gone (I/O error already logged)
                None => return Ok(()),
            },
        }
    }
}

fn print_tail_event(event: &TailEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    match event {
        TailEvent::Snapshot(text) => print!("{text}"),
        TailEvent::Append(line) => print!("{line}"),
    }
    std::io::stdout().flush().context("failed to write to stdout")
}

// ---------------------------------------------------------------------------
// search
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn cmd_search(
    config: &Config,
    pattern: &LogPattern,
    log_key: &str,
    query: &str,
    context: usize,
    use_regex: bool,
    stream: StreamKind,
    json: bool,
) -> Result<()> {
    let Some(path) = resolve(&config.log_root, pattern, log_key, stream) else {
        bail!("log not found: {log_key} ({stream})");
    };

    let result = search_log(&path, query, context, use_regex)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    for (i, m) in result.matches.iter().enumerate() {
        if i > 0 && context > 0 {
            println!("--");
        }
        for line in &m.context_before {
            println!("  {:>6}  {}", line.line_number, line.text);
        }
        println!("> {:>6}  {}", m.line_number, m.text);
        for line in &m.context_after {
            println!("  {:>6}  {}", line.line_number, line.text);
        }
    }
    println!(
        "{} match{} total{}",
        result.total_matches,
        if result.total_matches == 1 { "" } else { "es" },
        if result.truncated {
            " (output truncated)"
        } else {
            ""
        }
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
