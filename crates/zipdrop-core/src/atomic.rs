//! Write-then-rename helpers.
//!
//! Every file the core produces is first written to a hidden temporary file
//! in the target's own directory and renamed into place only once it is
//! complete. The temporary file is removed when it is dropped, so every
//! failure path leaves nothing behind.

use std::fs::File;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tempfile::PersistError;

/// A file being written that becomes visible at its final path only on
/// [`commit`](Self::commit).
///
/// # Examples
///
/// ```no_run
/// use std::io::Write;
/// use zipdrop_core::atomic::AtomicFile;
///
/// let mut file = AtomicFile::create("/backups/out.zip")?;
/// file.as_file_mut().write_all(b"PK")?;
/// file.commit()?;
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct AtomicFile {
    temp: NamedTempFile,
    target: PathBuf,
}

impl AtomicFile {
    /// Opens a temporary file next to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be created in the
    /// target's parent directory.
    pub fn create(target: impl Into<PathBuf>) -> io::Result<Self> {
        let target = target.into();
        let dir = parent_dir(&target);
        let temp = tempfile::Builder::new()
            .prefix(".zipdrop-")
            .suffix(".part")
            .tempfile_in(dir)?;
        Ok(Self { temp, target })
    }

    /// The final path this file will be renamed to.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Mutable access to the underlying temporary file.
    pub fn as_file_mut(&mut self) -> &mut File {
        self.temp.as_file_mut()
    }

    /// Flushes to disk and renames onto the target, replacing any file
    /// already there.
    ///
    /// # Errors
    ///
    /// Returns an error if syncing or renaming fails. The temporary file is
    /// removed in that case.
    pub fn commit(self) -> io::Result<PathBuf> {
        self.temp.as_file().sync_all()?;
        self.temp
            .persist(&self.target)
            .map_err(|PersistError { error, .. }| error)?;
        Ok(self.target)
    }

    /// Flushes to disk and renames onto the target only if nothing exists
    /// there yet.
    ///
    /// # Errors
    ///
    /// On failure the still-uncommitted file is handed back together with
    /// the error, so the caller can retry under another name. An
    /// `AlreadyExists` error means the target was taken.
    pub fn commit_new(self) -> Result<PathBuf, (Self, io::Error)> {
        if let Err(e) = self.temp.as_file().sync_all() {
            return Err((self, e));
        }
        let Self { temp, target } = self;
        match temp.persist_noclobber(&target) {
            Ok(_) => Ok(target),
            Err(PersistError { error, file }) => Err((Self { temp: file, target }, error)),
        }
    }

    /// Like [`commit_new`](Self::commit_new), moving on to `name-1.ext`,
    /// `name-2.ext`, ... while the target is taken. Returns the path the
    /// file landed at.
    ///
    /// # Errors
    ///
    /// Returns any failure other than the target being taken. The temporary
    /// file is removed in that case.
    pub fn commit_unique(self) -> io::Result<PathBuf> {
        let base = self.target.clone();
        let mut file = self;
        let mut suffix = 0u32;

        loop {
            match file.commit_new() {
                Ok(landed) => return Ok(landed),
                Err((returned, e)) if e.kind() == io::ErrorKind::AlreadyExists => {
                    suffix += 1;
                    file = returned.retarget(suffixed(&base, suffix));
                }
                Err((_, e)) => return Err(e),
            }
        }
    }

    /// Points this file at a different final path without touching its
    /// contents. The new target must live in the same directory.
    #[must_use]
    pub fn retarget(mut self, target: PathBuf) -> Self {
        debug_assert_eq!(parent_dir(&target), parent_dir(&self.target));
        self.target = target;
        self
    }
}

/// `name.zip` with suffix 2 becomes `name-2.zip`. Suffix 0 is the name itself.
#[must_use]
pub fn suffixed(path: &Path, suffix: u32) -> PathBuf {
    if suffix == 0 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}-{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{suffix}"),
    };
    path.with_file_name(name)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
