//! User path expansion.

use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

/// Replaces a leading `~` component with the user's home directory.
///
/// `~user` forms are left alone, as is everything when no home directory
/// can be determined.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match dirs::home_dir() {
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}
