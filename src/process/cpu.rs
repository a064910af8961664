//! CPU statistics parsing for the running process.
//!
//! This module reads cumulative CPU time and the thread count from
//! `/proc/<pid>/stat` and provides the utilization formula used by the
//! system sampler.

use once_cell::sync::Lazy;
use std::fs;
use std::path::Path;

/// Get system clock ticks per second (usually 100, but can vary).
fn get_clk_tck() -> f64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_CLK_TCK
        // Returns -1 on error, 0 if undefined - both are handled by the > 0 check
        unsafe {
            let tck = libc::sysconf(libc::_SC_CLK_TCK);
            if tck > 0 {
                return tck as f64;
            }
        }
    }
    // Fallback to common default for error cases or non-Unix platforms
    100.0
}

/// System clock ticks per second (for CPU time calculation).
pub static CLK_TCK: Lazy<f64> = Lazy::new(get_clk_tck);

/// Fields of interest from `/proc/<pid>/stat`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcStat {
    /// utime + stime in seconds.
    pub cpu_time_seconds: f64,
    pub num_threads: u64,
}

/// Parse `/proc/<pid>/stat` below `proc_path`.
///
/// The command name (field 2) may contain spaces and parentheses, so fields
/// are counted from the last `)`.
pub fn parse_proc_stat(proc_path: &Path) -> Result<ProcStat, std::io::Error> {
    let content = fs::read_to_string(proc_path.join("stat"))?;

    let after_comm = content
        .rfind(')')
        .map(|idx| &content[idx + 1..])
        .ok_or_else(|| std::io::Error::other("Invalid stat format: missing comm"))?;

    // parts[0] is field 3 (state); utime=14, stime=15, num_threads=20.
    let parts: Vec<&str> = after_comm.split_whitespace().collect();
    if parts.len() <= 17 {
        return Err(std::io::Error::other("Invalid stat format"));
    }

    let utime: f64 = parts[11]
        .parse()
        .map_err(|_| std::io::Error::other("Failed to parse utime field"))?;
    let stime: f64 = parts[12]
        .parse()
        .map_err(|_| std::io::Error::other("Failed to parse stime field"))?;
    let num_threads: u64 = parts[17]
        .parse()
        .map_err(|_| std::io::Error::other("Failed to parse num_threads field"))?;

    Ok(ProcStat {
        cpu_time_seconds: (utime + stime) / *CLK_TCK,
        num_threads,
    })
}

/// Number of logical CPUs, or `None` if it cannot be determined.
pub fn logical_cpu_count() -> Option<usize> {
    #[cfg(unix)]
    {
        // SAFETY: sysconf has no preconditions for _SC_NPROCESSORS_ONLN
        let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
        if n > 0 {
            return Some(n as usize);
        }
    }
    std::thread::available_parallelism().ok().map(|n| n.get())
}

/// Share of total machine CPU capacity used over an interval, in percent.
///
/// Returns 0 when no wall time has elapsed.
pub fn cpu_utilization_percent(cpu_delta_seconds: f64, wall_delta_seconds: f64, cpus: usize) -> f64 {
    if wall_delta_seconds <= 0.0 || cpus == 0 {
        return 0.0;
    }
    (cpu_delta_seconds / (wall_delta_seconds * cpus as f64)) * 100.0
}
