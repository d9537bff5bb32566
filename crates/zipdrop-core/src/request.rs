//! Request and result values exchanged with front ends.

use crate::BuildReport;
use std::path::PathBuf;

/// Everything a front end collects before asking for an archive.
///
/// # Examples
///
/// ```
/// use zipdrop_core::BuildRequest;
///
/// let request = BuildRequest::new(["Reports", "notes.txt"])
///     .with_output("backups/")
///     .with_destination("/mnt/cloud")
///     .with_include_hidden(true);
///
/// assert_eq!(request.sources.len(), 2);
/// assert_eq!(request.destinations.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequest {
    /// Files and directories to archive, in order. Each must exist.
    pub sources: Vec<PathBuf>,

    /// Archive file or directory to write into. `None` means the working
    /// directory.
    pub output_target: Option<PathBuf>,

    /// Archive hidden descendants of directory sources too.
    pub include_hidden: bool,

    /// Files or directories that receive a copy of the finished archive.
    pub destinations: Vec<PathBuf>,
}

impl BuildRequest {
    /// Creates a request for `sources` with default settings.
    #[must_use]
    pub fn new<I, P>(sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets the output file or directory.
    #[must_use]
    pub fn with_output(mut self, target: impl Into<PathBuf>) -> Self {
        self.output_target = Some(target.into());
        self
    }

    /// Adds one copy destination.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destinations.push(destination.into());
        self
    }

    /// Adds several copy destinations, keeping their order.
    #[must_use]
    pub fn with_destinations<I, P>(mut self, destinations: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.destinations
            .extend(destinations.into_iter().map(Into::into));
        self
    }

    /// Sets whether hidden files are archived.
    #[must_use]
    pub fn with_include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    /// Absolute path of the archive.
    pub archive_path: PathBuf,

    /// Absolute copy paths, one per satisfied destination, in request order.
    pub copied_paths: Vec<PathBuf>,

    /// Build statistics.
    pub report: BuildReport,
}
