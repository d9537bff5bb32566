//! Output path resolution.
//!
//! Turns the requested output location into a concrete archive file path.
//! Directory targets get an auto-generated `<base>-<timestamp>.zip` name
//! that never collides with a file already present.
//!
//! A generated name is only a candidate: nothing is reserved on disk, so two
//! runs in the same second can pick the same one. The builder claims it with
//! a no-clobber rename and moves on to the next suffix if it lost the race.

use crate::BuildContext;
use crate::BundleError;
use crate::Result;
use crate::atomic::suffixed;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;

/// Extension given to auto-named archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// A resolved archive location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPath {
    /// Where the archive should be written.
    pub path: PathBuf,

    /// `true` when the file name was generated. A generated name must not
    /// replace an existing file.
    pub generated: bool,

    /// Directories created while resolving, deepest first.
    created: Vec<PathBuf>,
}

impl OutputPath {
    /// Directories that did not exist before resolving, deepest first.
    #[must_use]
    pub fn created_dirs(&self) -> &[PathBuf] {
        &self.created
    }

    /// Removes the directories created while resolving, as long as they are
    /// still empty. Used when a run fails before the archive is written.
    pub fn remove_created_dirs(&self) {
        for dir in &self.created {
            if fs::remove_dir(dir).is_err() {
                break;
            }
            debug!(dir = %dir.display(), "removed unused output directory");
        }
    }
}

/// Resolves where the archive for this run is written.
///
/// - `None`: `<working dir>/<base>-<timestamp>.zip`
/// - An existing directory, a path ending in a separator, or a path with no
///   extension that is not an existing file: `<target>/<base>-<timestamp>.zip`
/// - Anything else: the path itself, verbatim
///
/// Auto-generated names get a `-1`, `-2`, ... suffix while the candidate is
/// taken. Missing parent directories are created.
///
/// # Examples
///
/// ```no_run
/// use zipdrop_core::BuildContext;
/// use zipdrop_core::BundleConfig;
/// use zipdrop_core::resolve::resolve_output_path;
/// use std::path::Path;
///
/// let ctx = BuildContext::new("/home/me", BundleConfig::default())?;
/// let path = resolve_output_path(&ctx, Some(Path::new("backups/")), "Reports")?;
/// // e.g. /home/me/backups/Reports-20240307-090501.zip
/// # Ok::<(), zipdrop_core::BundleError>(())
/// ```
///
/// # Errors
///
/// Returns `InvalidOutputPath` if the target directory (or the parent of an
/// explicit file) cannot be created.
pub fn resolve_output_path(
    ctx: &BuildContext,
    output_target: Option<&Path>,
    default_base_name: &str,
) -> Result<PathBuf> {
    resolve_output(ctx, output_target, default_base_name).map(|output| output.path)
}

/// Like [`resolve_output_path`], also reporting whether the name was
/// generated and which directories had to be created.
///
/// # Errors
///
/// See [`resolve_output_path`].
pub fn resolve_output(
    ctx: &BuildContext,
    output_target: Option<&Path>,
    default_base_name: &str,
) -> Result<OutputPath> {
    let mut created = Vec::new();

    let Some(requested) = output_target else {
        return Ok(OutputPath {
            path: auto_name(ctx, ctx.working_dir(), default_base_name),
            generated: true,
            created,
        });
    };

    let target = ctx.absolutize(requested);
    if is_directory_target(requested, &target) {
        create_dir(requested, &target, &mut created)?;
        return Ok(OutputPath {
            path: auto_name(ctx, &target, default_base_name),
            generated: true,
            created,
        });
    }

    if let Some(parent) = target.parent() {
        create_dir(requested, parent, &mut created)?;
    }
    debug!(output = %target.display(), "using explicit output path");
    Ok(OutputPath {
        path: target,
        generated: false,
        created,
    })
}

/// Picks the base name for auto-named archives.
///
/// With exactly one source this is the source's final path component (its
/// stem, for regular files), minus any leading dots. Otherwise, or when no
/// usable name remains, the configured multi-source base name is used.
///
/// # Examples
///
/// ```no_run
/// use zipdrop_core::BuildContext;
/// use zipdrop_core::BundleConfig;
/// use zipdrop_core::resolve::default_base_name;
///
/// let ctx = BuildContext::new("/data", BundleConfig::default())?;
/// assert_eq!(default_base_name(&ctx, &["Reports"]), "Reports");
/// assert_eq!(default_base_name(&ctx, &["a", "b"]), "archive");
/// # Ok::<(), zipdrop_core::BundleError>(())
/// ```
#[must_use]
pub fn default_base_name<P: AsRef<Path>>(ctx: &BuildContext, sources: &[P]) -> String {
    let generic = || ctx.config().multi_source_base_name.clone();

    let [source] = sources else {
        return generic();
    };

    let path = ctx.absolutize(source);
    let path = if path.file_name().is_some() {
        path
    } else {
        fs::canonicalize(&path).unwrap_or(path)
    };

    let name = if path.is_file() {
        path.file_stem()
    } else {
        path.file_name()
    };

    name.map(|n| n.to_string_lossy().trim_start_matches('.').to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(generic)
}

fn is_directory_target(requested: &Path, target: &Path) -> bool {
    target.is_dir()
        || ends_with_separator(requested)
        || (target.extension().is_none() && !target.is_file())
}

fn ends_with_separator(path: &Path) -> bool {
    path.as_os_str()
        .to_string_lossy()
        .chars()
        .last()
        .is_some_and(std::path::is_separator)
}

/// Creates `dir` and its missing parents, recording the ones that were
/// missing in `created`.
fn create_dir(requested: &Path, dir: &Path, created: &mut Vec<PathBuf>) -> Result<()> {
    let missing: Vec<PathBuf> = dir
        .ancestors()
        .take_while(|a| !a.as_os_str().is_empty() && fs::symlink_metadata(a).is_err())
        .map(Path::to_path_buf)
        .collect();

    fs::create_dir_all(dir).map_err(|source| BundleError::InvalidOutputPath {
        path: requested.to_path_buf(),
        source,
    })?;
    created.extend(missing);
    Ok(())
}

/// First `<base>-<timestamp>[-N].zip` in `dir` that is not taken right now.
fn auto_name(ctx: &BuildContext, dir: &Path, base: &str) -> PathBuf {
    let first = dir.join(format!("{base}-{}.{ARCHIVE_EXTENSION}", ctx.timestamp()));
    let mut suffix = 0u32;
    let mut candidate = first.clone();

    while fs::symlink_metadata(&candidate).is_ok() {
        suffix += 1;
        candidate = suffixed(&first, suffix);
    }

    debug!(output = %candidate.display(), "generated output path");
    candidate
}
