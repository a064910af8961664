//! Readers for the running process's resource usage in procfs.
//!
//! This module provides:
//! - `cpu`: CPU time and thread count from /proc/<pid>/stat
//! - `fds`: open file descriptor count from /proc/<pid>/fd

pub mod cpu;
pub mod fds;

// Re-export commonly used types
pub use cpu::{cpu_utilization_percent, logical_cpu_count, parse_proc_stat, ProcStat, CLK_TCK};
pub use fds::count_open_fds;

/// Procfs directory of the running process.
pub const PROC_SELF: &str = "/proc/self";
