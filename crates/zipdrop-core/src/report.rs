//! Build statistics and progress reporting.

use std::path::Path;
use std::time::Duration;

/// Statistics gathered while building an archive.
///
/// # Examples
///
/// ```
/// use zipdrop_core::BuildReport;
///
/// let mut report = BuildReport::default();
/// report.bytes_read = 1000;
/// report.archive_size = 250;
/// assert_eq!(report.compression_ratio(), 4.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Number of files stored in the archive.
    pub files_added: usize,

    /// Total bytes read from source files.
    pub bytes_read: u64,

    /// Size of the finished archive on disk.
    pub archive_size: u64,

    /// Entries left out of the archive (skipped symlinks, cycles).
    pub entries_skipped: usize,

    /// Time spent between Resolving and Done.
    pub duration: Duration,

    /// Warnings generated during the run.
    pub warnings: Vec<String>,
}

impl BuildReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a warning message to the report.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Returns `true` if any entry was left out of the archive.
    #[must_use]
    pub fn skipped_any(&self) -> bool {
        self.entries_skipped > 0
    }

    /// Returns `true` if any warnings were recorded.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Returns the compression ratio (bytes read / archive size).
    ///
    /// Returns 0.0 when either side is zero.
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        if self.archive_size == 0 || self.bytes_read == 0 {
            return 0.0;
        }
        self.bytes_read as f64 / self.archive_size as f64
    }
}

/// Callback trait for progress reporting while an archive is built.
///
/// The trait requires `Send` so front ends can drive it from a worker
/// thread.
///
/// # Examples
///
/// ```
/// use zipdrop_core::ProgressCallback;
/// use std::path::Path;
///
/// struct Printer;
///
/// impl ProgressCallback for Printer {
///     fn on_entry_start(&mut self, path: &Path, total: usize, current: usize) {
///         println!("[{current}/{total}] {}", path.display());
///     }
///
///     fn on_bytes_written(&mut self, _bytes: u64) {}
///
///     fn on_entry_complete(&mut self, _path: &Path) {}
///
///     fn on_complete(&mut self) {
///         println!("done");
///     }
/// }
/// ```
pub trait ProgressCallback: Send {
    /// Called before an entry is added.
    ///
    /// * `path` - Archive name of the entry
    /// * `total` - Total number of entries in this build
    /// * `current` - Current entry number (1-indexed)
    fn on_entry_start(&mut self, path: &Path, total: usize, current: usize);

    /// Called for every chunk of source bytes fed into the archive.
    fn on_bytes_written(&mut self, bytes: u64);

    /// Called after an entry has been fully written.
    fn on_entry_complete(&mut self, path: &Path);

    /// Called once the archive is finalized and in place.
    fn on_complete(&mut self);
}

/// No-op implementation of `ProgressCallback`.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_entry_start(&mut self, _path: &Path, _total: usize, _current: usize) {}

    fn on_bytes_written(&mut self, _bytes: u64) {}

    fn on_entry_complete(&mut self, _path: &Path) {}

    fn on_complete(&mut self) {}
}
