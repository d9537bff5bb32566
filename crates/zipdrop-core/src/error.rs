//! Error types for bundle operations.

use crate::request::BuildResult;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `BundleError`.
pub type Result<T> = std::result::Result<T, BundleError>;

/// Errors that can occur while building and distributing an archive.
#[derive(Error, Debug)]
pub enum BundleError {
    /// A requested source file or directory does not exist.
    #[error("source not found: {}", path.display())]
    SourceNotFound {
        /// The path as it was requested.
        path: PathBuf,
    },

    /// A file or directory below a source could not be inspected.
    #[error("cannot read {}: {source}", path.display())]
    SourceUnreadable {
        /// The path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A path cannot be represented as a UTF-8 archive entry name.
    #[error("path is not valid UTF-8: {}", path.display())]
    InvalidEntryName {
        /// The offending path.
        path: PathBuf,
    },

    /// Two different source files would be stored under the same name.
    #[error(
        "duplicate archive entry '{name}': {} and {}",
        first.display(),
        second.display()
    )]
    DuplicateEntry {
        /// The colliding archive entry name.
        name: String,
        /// Source file that claimed the name first.
        first: PathBuf,
        /// Source file that collided with it.
        second: PathBuf,
    },

    /// The output location cannot be resolved or created.
    #[error("invalid output path {}: {source}", path.display())]
    InvalidOutputPath {
        /// The output location that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the archive failed. No partial archive is left behind.
    #[error("failed to write archive {}{}: {source}", archive.display(), EntrySuffix(entry.as_deref()))]
    ArchiveWrite {
        /// Final archive path that was being produced.
        archive: PathBuf,
        /// Archive entry in progress when the failure occurred.
        entry: Option<String>,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A single copy destination could not be written.
    #[error("destination unreachable {}: {source}", destination.display())]
    DestinationUnreachable {
        /// The destination as it was requested.
        destination: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The archive was built but one or more destinations failed.
    #[error("{0}")]
    DistributionIncomplete(Box<PartialDistribution>),

    /// Configuration values are out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },
}

struct EntrySuffix<'a>(Option<&'a str>);

impl fmt::Display for EntrySuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(entry) => write!(f, " (while adding '{entry}')"),
            None => Ok(()),
        }
    }
}

impl BundleError {
    /// Returns `true` if this error aborted the run before anything was
    /// distributed.
    ///
    /// Only [`BundleError::DestinationUnreachable`] and
    /// [`BundleError::DistributionIncomplete`] leave a finished archive behind.
    ///
    /// # Examples
    ///
    /// ```
    /// use zipdrop_core::BundleError;
    /// use std::path::PathBuf;
    ///
    /// let err = BundleError::SourceNotFound {
    ///     path: PathBuf::from("./does-not-exist"),
    /// };
    /// assert!(err.is_fatal());
    /// ```
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::DestinationUnreachable { .. } | Self::DistributionIncomplete(_)
        )
    }

    /// Returns the path this error is about, if it names one.
    ///
    /// # Examples
    ///
    /// ```
    /// use zipdrop_core::BundleError;
    /// use std::path::Path;
    /// use std::path::PathBuf;
    ///
    /// let err = BundleError::SourceNotFound {
    ///     path: PathBuf::from("./does-not-exist"),
    /// };
    /// assert_eq!(err.path(), Some(Path::new("./does-not-exist")));
    /// ```
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::SourceNotFound { path }
            | Self::SourceUnreadable { path, .. }
            | Self::InvalidEntryName { path }
            | Self::InvalidOutputPath { path, .. } => Some(path),
            Self::DuplicateEntry { second, .. } => Some(second),
            Self::ArchiveWrite { archive, .. } => Some(archive),
            Self::DestinationUnreachable { destination, .. } => Some(destination),
            Self::DistributionIncomplete(partial) => Some(&partial.result.archive_path),
            Self::InvalidConfig { .. } => None,
        }
    }

    /// Returns the partial outcome when distribution did not fully succeed.
    #[must_use]
    pub fn partial(&self) -> Option<&PartialDistribution> {
        match self {
            Self::DistributionIncomplete(partial) => Some(partial),
            _ => None,
        }
    }
}

/// A destination that could not receive a copy of the archive.
#[derive(Debug)]
pub struct DestinationFailure {
    /// The destination as it was requested.
    pub destination: PathBuf,

    /// Why the copy failed. Always [`BundleError::DestinationUnreachable`].
    pub error: BundleError,
}

impl DestinationFailure {
    pub(crate) fn new(destination: &Path, source: std::io::Error) -> Self {
        Self {
            destination: destination.to_path_buf(),
            error: BundleError::DestinationUnreachable {
                destination: destination.to_path_buf(),
                source,
            },
        }
    }
}

impl fmt::Display for DestinationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

/// Outcome of a run whose archive was built but whose distribution failed
/// for at least one destination.
#[derive(Debug)]
pub struct PartialDistribution {
    /// The archive path and every copy that did succeed.
    pub result: BuildResult,

    /// One entry per failed destination, in request order.
    pub failures: Vec<DestinationFailure>,
}

impl fmt::Display for PartialDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "archive created at {} but {} of {} destination(s) failed",
            self.result.archive_path.display(),
            self.failures.len(),
            self.failures.len() + self.result.copied_paths.len()
        )
    }
}
