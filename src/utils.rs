//! Disk usage reporting.

use std::path::Path;
use tracing::{debug, info};

const GIB: f64 = (1u64 << 30) as f64;

/// Capacity of the filesystem holding a path, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

/// Queries the filesystem that contains `path`.
#[cfg(unix)]
pub fn disk_usage(path: &Path) -> std::io::Result<DiskUsage> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    // SAFETY: c_path is a valid NUL-terminated string and `stat` is only read
    // after statvfs reports success.
    unsafe {
        let mut stat: libc::statvfs = std::mem::zeroed();
        if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
            return Err(std::io::Error::last_os_error());
        }

        let fragment = stat.f_frsize as u64;
        let blocks = stat.f_blocks as u64;
        let free_blocks = stat.f_bfree as u64;
        let available_blocks = stat.f_bavail as u64;
        Ok(DiskUsage {
            total: blocks.saturating_mul(fragment),
            used: blocks.saturating_sub(free_blocks).saturating_mul(fragment),
            free: available_blocks.saturating_mul(fragment),
        })
    }
}

#[cfg(not(unix))]
pub fn disk_usage(_path: &Path) -> std::io::Result<DiskUsage> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "disk usage is only reported on unix",
    ))
}

/// Logs the capacity of the filesystem holding `path`. Never fails.
pub fn log_disk_usage(path: &Path) {
    match disk_usage(path) {
        Ok(usage) => {
            info!("Total space : {:.2} GiB", usage.total as f64 / GIB);
            info!("Used space : {:.2} GiB", usage.used as f64 / GIB);
            info!("Free space : {:.2} GiB", usage.free as f64 / GIB);
        }
        Err(e) => debug!("Could not read disk usage of '{}': {}", path.display(), e),
    }
}
