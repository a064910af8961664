//! Open file descriptor counting from `/proc/<pid>/fd`.

use std::fs;
use std::path::Path;

/// Count entries in `/proc/<pid>/fd` below `proc_path`.
pub fn count_open_fds(proc_path: &Path) -> Result<u64, std::io::Error> {
    let mut count = 0;
    for entry in fs::read_dir(proc_path.join("fd"))? {
        entry?;
        count += 1;
    }
    Ok(count)
}
