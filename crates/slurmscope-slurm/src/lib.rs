//! Slurm command-line wrappers for slurmscope
//!
//! Thin subprocess glue around `squeue` and `scancel`. Everything here is
//! best-effort: a missing binary or a failing command degrades to an empty
//! job list rather than taking the whole view down.

mod client;

pub use client::{cancel_job, get_running_jobs};

// Re-export types used in our public API
pub use slurmscope_types::RunningJob;
