//! Configuration for bundle operations.

use crate::BundleError;
use crate::Result;

/// Base name used for auto-named archives built from several sources.
pub const DEFAULT_MULTI_SOURCE_BASE_NAME: &str = "archive";

/// Configuration for building and distributing archives.
///
/// Everything a caller chooses per request lives in
/// [`BuildRequest`](crate::BuildRequest); this holds the policy knobs that
/// usually stay fixed across requests.
///
/// # Examples
///
/// ```
/// use zipdrop_core::BundleConfig;
///
/// let config = BundleConfig::default()
///     .with_follow_symlinks(true)
///     .with_compression_level(9)
///     .with_max_parallel_copies(2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleConfig {
    /// Follow symlinks found below a source directory.
    ///
    /// Default: `false` (symlinks are skipped with a warning). When `true`,
    /// linked directories are descended into once; cycles are skipped.
    pub follow_symlinks: bool,

    /// Compression level (0-9).
    ///
    /// `Some(0)` stores entries uncompressed, `1..=9` deflates them.
    /// `None` uses the deflate default.
    ///
    /// Default: `Some(6)`.
    pub compression_level: Option<u8>,

    /// Store Unix permission bits on each entry.
    ///
    /// Default: `true`.
    pub preserve_permissions: bool,

    /// Base name for auto-named archives when more than one source is given.
    ///
    /// Default: `"archive"`.
    pub multi_source_base_name: String,

    /// Upper bound on destination copies running at the same time.
    ///
    /// Default: `4`. `1` copies sequentially.
    pub max_parallel_copies: usize,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            compression_level: Some(6),
            preserve_permissions: true,
            multi_source_base_name: DEFAULT_MULTI_SOURCE_BASE_NAME.to_string(),
            max_parallel_copies: 4,
        }
    }
}

impl BundleConfig {
    /// Creates a new `BundleConfig` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to follow symlinks.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Sets the compression level. `0` means store.
    #[must_use]
    pub fn with_compression_level(mut self, level: u8) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Sets whether to store permission bits.
    #[must_use]
    pub fn with_preserve_permissions(mut self, preserve: bool) -> Self {
        self.preserve_permissions = preserve;
        self
    }

    /// Sets the base name used for multi-source archives.
    #[must_use]
    pub fn with_multi_source_base_name(mut self, name: impl Into<String>) -> Self {
        self.multi_source_base_name = name.into();
        self
    }

    /// Sets the bound on concurrent destination copies.
    #[must_use]
    pub fn with_max_parallel_copies(mut self, copies: usize) -> Self {
        self.max_parallel_copies = copies;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Compression level is set but greater than 9
    /// - `max_parallel_copies` is zero
    /// - The multi-source base name is empty or contains a path separator
    pub fn validate(&self) -> Result<()> {
        if let Some(level) = self.compression_level
            && level > 9
        {
            return Err(BundleError::InvalidConfig {
                reason: format!("compression level must be 0-9, got {level}"),
            });
        }

        if self.max_parallel_copies == 0 {
            return Err(BundleError::InvalidConfig {
                reason: "max_parallel_copies must be at least 1".to_string(),
            });
        }

        let name = self.multi_source_base_name.as_str();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(BundleError::InvalidConfig {
                reason: format!("invalid base name: '{name}'"),
            });
        }

        Ok(())
    }
}
