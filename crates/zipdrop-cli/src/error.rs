//! Error conversion utilities for CLI.
//!
//! Converts zipdrop-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use zipdrop_core::BundleError;

/// Converts a fatal `BundleError` into an anyhow error with a hint.
pub fn convert_bundle_error(err: BundleError) -> anyhow::Error {
    match err {
        BundleError::SourceNotFound { path } => {
            anyhow!(
                "Source not found: {}\n\
                 HINT: Check the spelling; relative paths are resolved from the current directory.",
                path.display()
            )
        }
        BundleError::DuplicateEntry {
            name,
            first,
            second,
        } => {
            anyhow!(
                "Two sources would be stored as '{name}':\n  {}\n  {}\n\
                 HINT: Sources are stored under their own names; rename one of them or archive their parent.",
                first.display(),
                second.display()
            )
        }
        BundleError::InvalidOutputPath { path, source } => {
            anyhow!(
                "Cannot use output location '{}': {source}\n\
                 HINT: Use --output to choose a writable file or directory.",
                path.display()
            )
        }
        BundleError::ArchiveWrite {
            archive,
            entry,
            source,
        } => {
            let during = entry.map_or_else(String::new, |e| format!(" while adding '{e}'"));
            anyhow!(
                "Failed to write archive '{}'{during}: {source}\n\
                 HINT: Check free disk space and permissions. No partial archive was left behind.",
                archive.display()
            )
        }
        BundleError::InvalidEntryName { path } => {
            anyhow!(
                "Cannot store '{}': file names must be valid UTF-8\n\
                 HINT: Rename the file or leave its directory out.",
                path.display()
            )
        }
        _ => anyhow::Error::from(err),
    }
}
