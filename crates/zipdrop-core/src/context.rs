//! Per-run context shared by every bundle step.

use crate::BundleConfig;
use crate::BundleError;
use crate::Result;
use chrono::DateTime;
use chrono::Local;
use std::path::Path;
use std::path::PathBuf;

/// Timestamp layout for auto-generated archive names: sortable,
/// second resolution, and free of characters filesystems reject.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// State scoped to a single `run`.
///
/// Relative paths in a request are resolved against `working_dir`, and
/// auto-generated names use `started_at`. A context is created for each
/// run and dropped with it.
///
/// # Examples
///
/// ```
/// use zipdrop_core::BuildContext;
/// use zipdrop_core::BundleConfig;
///
/// let ctx = BuildContext::new("/tmp", BundleConfig::default())?;
/// assert!(ctx.absolutize("notes.txt").starts_with("/tmp"));
/// # Ok::<(), zipdrop_core::BundleError>(())
/// ```
#[derive(Debug, Clone)]
pub struct BuildContext {
    working_dir: PathBuf,
    started_at: DateTime<Local>,
    config: BundleConfig,
}

impl BuildContext {
    /// Creates a context rooted at `working_dir`, stamped with the current
    /// local time.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` does not validate.
    pub fn new(working_dir: impl Into<PathBuf>, config: BundleConfig) -> Result<Self> {
        Self::at(working_dir, config, Local::now())
    }

    /// Creates a context rooted at the process's current directory.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOutputPath` if the current directory cannot be read,
    /// or `InvalidConfig` if `config` does not validate.
    pub fn from_current_dir(config: BundleConfig) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|source| BundleError::InvalidOutputPath {
            path: PathBuf::from("."),
            source,
        })?;
        Self::new(cwd, config)
    }

    /// Creates a context with an explicit start time.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` does not validate.
    pub fn at(
        working_dir: impl Into<PathBuf>,
        config: BundleConfig,
        started_at: DateTime<Local>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            working_dir: working_dir.into(),
            started_at,
            config,
        })
    }

    /// Directory that relative request paths are resolved against.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// When this run started.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// The validated configuration for this run.
    #[must_use]
    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// `started_at` rendered with [`TIMESTAMP_FORMAT`].
    #[must_use]
    pub fn timestamp(&self) -> String {
        self.started_at.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Joins a relative path onto the working directory. Absolute paths are
    /// returned unchanged.
    #[must_use]
    pub fn absolutize(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        let ctx = BuildContext::at("/work", BundleConfig::default(), at).unwrap();
        assert_eq!(ctx.timestamp(), "20240307-090501");
    }

    #[test]
    fn test_absolutize() {
        let ctx = BuildContext::new("/work", BundleConfig::default()).unwrap();
        assert_eq!(ctx.absolutize("a/b"), Path::new("/work/a/b"));
        assert_eq!(ctx.absolutize("/abs/c"), Path::new("/abs/c"));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = BundleConfig::default().with_max_parallel_copies(0);
        assert!(matches!(
            BuildContext::new("/work", config),
            Err(BundleError::InvalidConfig { .. })
        ));
    }
}
