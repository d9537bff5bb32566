//! Hidden-entry rules and archive name computation.

use crate::BundleError;
use crate::Result;
use std::ffi::OsStr;
use std::path::Component;
use std::path::Path;

/// Marker that makes a file or directory hidden.
///
/// The POSIX dot convention is used on every host; filesystem "hidden"
/// attributes are not consulted.
pub const HIDDEN_PREFIX: char = '.';

/// Checks if a path's final component is hidden (starts with '.').
///
/// # Examples
///
/// ```
/// use zipdrop_core::filters;
/// use std::path::Path;
///
/// assert!(filters::is_hidden(Path::new(".secret")));
/// assert!(filters::is_hidden(Path::new("dir/.env")));
/// assert!(!filters::is_hidden(Path::new("visible.txt")));
/// assert!(!filters::is_hidden(Path::new(".hidden/visible.txt")));
/// ```
#[must_use]
pub fn is_hidden(path: &Path) -> bool {
    path.file_name().is_some_and(starts_with_dot)
}

/// Checks if any component of a relative path is hidden.
///
/// # Examples
///
/// ```
/// use zipdrop_core::filters;
/// use std::path::Path;
///
/// assert!(filters::has_hidden_component(Path::new(".secret/notes.txt")));
/// assert!(!filters::has_hidden_component(Path::new("a/b/c.txt")));
/// ```
#[must_use]
pub fn has_hidden_component(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(name) => starts_with_dot(name),
        _ => false,
    })
}

// Byte check so names that are not valid UTF-8 are still classified.
fn starts_with_dot(name: &OsStr) -> bool {
    let mut prefix = [0u8; 4];
    name.as_encoded_bytes()
        .starts_with(HIDDEN_PREFIX.encode_utf8(&mut prefix).as_bytes())
}

/// Builds the archive entry name for `relative` stored under `root_name`.
///
/// Components are joined with forward slashes whatever the host separator.
/// An empty `relative` yields `root_name` alone.
///
/// # Errors
///
/// Returns `InvalidEntryName` if a component is not valid UTF-8. `source`
/// is the filesystem path reported in that error.
///
/// # Examples
///
/// ```
/// use zipdrop_core::filters;
/// use std::path::Path;
///
/// let name = filters::entry_name("Reports", Path::new("q1/summary.txt"), Path::new("/x"))?;
/// assert_eq!(name, "Reports/q1/summary.txt");
/// # Ok::<(), zipdrop_core::BundleError>(())
/// ```
pub fn entry_name(root_name: &str, relative: &Path, source: &Path) -> Result<String> {
    let mut name = String::from(root_name);
    for component in relative.components() {
        if let Component::Normal(part) = component {
            let part = part.to_str().ok_or_else(|| BundleError::InvalidEntryName {
                path: source.to_path_buf(),
            })?;
            if !name.is_empty() {
                name.push('/');
            }
            name.push_str(part);
        }
    }
    Ok(name)
}

/// Returns the final component of `path` as UTF-8.
///
/// # Errors
///
/// Returns `InvalidEntryName` if the path has no final component or it is
/// not valid UTF-8.
pub fn base_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| BundleError::InvalidEntryName {
            path: path.to_path_buf(),
        })
}
