use std::{fmt, path::Path};

use nix::sys::statvfs::statvfs;

use crate::{Error, Result};

/// A point-in-time reading of the capacity of the filesystem holding a
/// path.
///
/// Hosts typically surface this next to a script's output so a failed
/// run on a full disk explains itself.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DiskSpace {
    /// Total capacity of the filesystem, in bytes.
    pub total: u64,

    /// Bytes available to unprivileged callers.
    pub available: u64,
}

impl DiskSpace {
    /// Read the capacity of the filesystem containing `path`.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let stats = statvfs(path).map_err(|source| Error::CouldNotStatFilesystem {
            path: path.display().to_string(),
            source,
        })?;
        let fragment = stats.fragment_size() as u64;
        Ok(Self {
            total: stats.blocks() as u64 * fragment,
            available: stats.blocks_available() as u64 * fragment,
        })
    }
}

impl fmt::Display for DiskSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total: {}\navailable: {}",
            format_size(self.total),
            format_size(self.available)
        )
    }
}

/// Decimal units, two places.
fn format_size(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.2} GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.2} MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.2} KB", bytes as f64 / 1_000.0)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_format_with_decimal_units() {
        assert_eq!(format_size(999), "999 B");
        assert_eq!(format_size(1_000), "1.00 KB");
        assert_eq!(format_size(5_300_000), "5.30 MB");
        assert_eq!(format_size(12_000_000_000), "12.00 GB");
    }

    #[test]
    fn probe_reads_the_root_filesystem() {
        let space = DiskSpace::probe("/").unwrap();
        assert!(space.total > 0);
        assert!(space.available <= space.total);
    }

    #[test]
    fn display_reports_both_figures() {
        let space = DiskSpace {
            total: 2_000_000_000,
            available: 500_000_000,
        };
        assert_eq!(space.to_string(), "total: 2.00 GB\navailable: 500.00 MB");
    }
}
