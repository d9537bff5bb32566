//! Source enumeration.
//!
//! Expands the requested files and directories into a flat, deterministic
//! list of [`ArchiveEntry`] values. Directories are walked with an explicit
//! work-list: children are visited in lexicographic order at every level,
//! depth first, so two walks over an unchanged tree produce the same
//! sequence.

use crate::BuildContext;
use crate::BundleError;
use crate::Result;
use crate::filters;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::warn;

/// One file to store in the archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveEntry {
    /// Absolute path of the file on disk.
    pub source: PathBuf,

    /// Name inside the archive, `/`-separated, rooted at the top-level
    /// source's own name.
    pub name: String,
}

/// Why an entry below a source directory was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Symlink, and symlinks are not followed.
    Symlink,
    /// Symlink to a directory that contains it.
    SymlinkCycle,
    /// Symlink whose target does not exist.
    BrokenSymlink,
    /// Neither a regular file nor a directory (socket, fifo, device).
    Special,
}

/// An entry the walker saw but did not include.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Filesystem path of the skipped entry.
    pub path: PathBuf,
    /// Why it was skipped.
    pub reason: SkipReason,
}

impl fmt::Display for SkippedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.reason {
            SkipReason::Symlink => "Skipped symlink",
            SkipReason::SymlinkCycle => "Skipped symlink cycle",
            SkipReason::BrokenSymlink => "Skipped broken symlink",
            SkipReason::Special => "Skipped special file",
        };
        write!(f, "{what}: {}", self.path.display())
    }
}

/// Result of walking every source of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Walk {
    /// Entries in archive order.
    pub entries: Vec<ArchiveEntry>,
    /// Entries left out, in the order they were met.
    pub skipped: Vec<SkippedEntry>,
}

/// A validated top-level source.
#[derive(Debug)]
struct Root {
    path: PathBuf,
    name: String,
    is_dir: bool,
}

/// A discovered child waiting on the work-list.
#[derive(Debug)]
struct Pending {
    path: PathBuf,
    relative: PathBuf,
    is_dir: bool,
    /// Canonical paths of the directories from the root down to this one.
    /// Only tracked while following symlinks.
    ancestors: Vec<PathBuf>,
}

/// Walks request sources, applying hidden-entry and symlink policy.
///
/// # Examples
///
/// ```no_run
/// use zipdrop_core::BuildContext;
/// use zipdrop_core::BundleConfig;
/// use zipdrop_core::walker::SourceWalker;
///
/// let ctx = BuildContext::from_current_dir(BundleConfig::default())?;
/// let walk = SourceWalker::new(&ctx, false).walk(&["photos", "notes.txt"])?;
/// for entry in &walk.entries {
///     println!("{} <- {}", entry.name, entry.source.display());
/// }
/// # Ok::<(), zipdrop_core::BundleError>(())
/// ```
#[derive(Debug)]
pub struct SourceWalker<'a> {
    ctx: &'a BuildContext,
    include_hidden: bool,
}

impl<'a> SourceWalker<'a> {
    /// Creates a walker bound to a run's context.
    #[must_use]
    pub fn new(ctx: &'a BuildContext, include_hidden: bool) -> Self {
        Self {
            ctx,
            include_hidden,
        }
    }

    /// Walks every source in order.
    ///
    /// All top-level sources are checked before any directory is read, so a
    /// missing source fails the walk without producing entries.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A source does not exist (`SourceNotFound`)
    /// - A directory cannot be listed (`SourceUnreadable`)
    /// - A name is not valid UTF-8 (`InvalidEntryName`)
    /// - Two different files map to one archive name (`DuplicateEntry`)
    pub fn walk<P: AsRef<Path>>(&self, sources: &[P]) -> Result<Walk> {
        let roots = sources
            .iter()
            .map(|source| self.locate(source.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut walk = Walk::default();
        let mut claimed: HashMap<String, PathBuf> = HashMap::new();

        for root in roots {
            if root.is_dir {
                self.walk_dir(&root, &mut walk, &mut claimed)?;
            } else {
                claim(&mut walk, &mut claimed, root.path, root.name)?;
            }
        }

        Ok(walk)
    }

    /// Resolves a requested source to an absolute path and its archive name.
    fn locate(&self, requested: &Path) -> Result<Root> {
        let not_found = |e: io::Error| {
            if e.kind() == io::ErrorKind::NotFound {
                BundleError::SourceNotFound {
                    path: requested.to_path_buf(),
                }
            } else {
                BundleError::SourceUnreadable {
                    path: requested.to_path_buf(),
                    source: e,
                }
            }
        };

        let absolute = self.ctx.absolutize(requested);
        // Canonicalize the parent only, so a symlinked source keeps its own
        // name in the archive.
        let path = match (absolute.parent(), absolute.file_name()) {
            (Some(parent), Some(name)) => fs::canonicalize(parent).map_err(not_found)?.join(name),
            _ => fs::canonicalize(&absolute).map_err(not_found)?,
        };

        let metadata = fs::metadata(&path).map_err(not_found)?;
        if !metadata.is_dir() && !metadata.is_file() {
            return Err(BundleError::SourceUnreadable {
                path: requested.to_path_buf(),
                source: io::Error::other("not a regular file or directory"),
            });
        }

        let name = filters::base_name(&path)?.to_string();
        Ok(Root {
            path,
            name,
            is_dir: metadata.is_dir(),
        })
    }

    fn walk_dir(
        &self,
        root: &Root,
        walk: &mut Walk,
        claimed: &mut HashMap<String, PathBuf>,
    ) -> Result<()> {
        let ancestors = if self.ctx.config().follow_symlinks {
            vec![canonical(&root.path)?]
        } else {
            Vec::new()
        };

        let mut stack = Vec::new();
        self.push_children(&root.path, Path::new(""), &ancestors, &mut stack, walk)?;

        while let Some(next) = stack.pop() {
            if next.is_dir {
                self.push_children(&next.path, &next.relative, &next.ancestors, &mut stack, walk)?;
            } else {
                let name = filters::entry_name(&root.name, &next.relative, &next.path)?;
                claim(walk, claimed, next.path, name)?;
            }
        }

        Ok(())
    }

    /// Lists `dir`, filters its children and pushes them so that the
    /// lexicographically first child is popped first.
    fn push_children(
        &self,
        dir: &Path,
        relative: &Path,
        ancestors: &[PathBuf],
        stack: &mut Vec<Pending>,
        walk: &mut Walk,
    ) -> Result<()> {
        let follow = self.ctx.config().follow_symlinks;
        let unreadable = |source| BundleError::SourceUnreadable {
            path: dir.to_path_buf(),
            source,
        };

        let mut children = fs::read_dir(dir)
            .map_err(unreadable)?
            .collect::<io::Result<Vec<_>>>()
            .map_err(unreadable)?;
        children.sort_by_key(fs::DirEntry::file_name);

        let mut batch = Vec::with_capacity(children.len());
        for child in children {
            let path = child.path();
            if !self.include_hidden && filters::is_hidden(&path) {
                debug!(path = %path.display(), "skipping hidden entry");
                continue;
            }

            let file_type = child.file_type().map_err(|source| BundleError::SourceUnreadable {
                path: path.clone(),
                source,
            })?;

            let is_dir = if file_type.is_symlink() {
                match self.follow_link(&path, ancestors)? {
                    Ok(is_dir) => is_dir,
                    Err(reason) => {
                        skip(walk, path, reason);
                        continue;
                    }
                }
            } else if file_type.is_dir() {
                true
            } else if file_type.is_file() {
                false
            } else {
                skip(walk, path, SkipReason::Special);
                continue;
            };

            let ancestors = if is_dir && follow {
                let mut chain = ancestors.to_vec();
                chain.push(canonical(&path)?);
                chain
            } else {
                Vec::new()
            };

            batch.push(Pending {
                relative: relative.join(child.file_name()),
                path,
                is_dir,
                ancestors,
            });
        }

        stack.extend(batch.into_iter().rev());
        Ok(())
    }

    /// Decides what to do with a symlink. The outer result carries hard
    /// errors, the inner one says whether it points at a directory or why it
    /// is skipped.
    ///
    /// A directory link is a cycle only when it points at one of the
    /// directories it sits in. Other links to already-seen directories are
    /// walked again under their own name.
    fn follow_link(
        &self,
        path: &Path,
        ancestors: &[PathBuf],
    ) -> Result<std::result::Result<bool, SkipReason>> {
        if !self.ctx.config().follow_symlinks {
            return Ok(Err(SkipReason::Symlink));
        }

        let Ok(metadata) = fs::metadata(path) else {
            return Ok(Err(SkipReason::BrokenSymlink));
        };

        if metadata.is_dir() {
            if ancestors.contains(&canonical(path)?) {
                Ok(Err(SkipReason::SymlinkCycle))
            } else {
                Ok(Ok(true))
            }
        } else if metadata.is_file() {
            Ok(Ok(false))
        } else {
            Ok(Err(SkipReason::Special))
        }
    }
}

/// Expands `sources` into archive entries.
///
/// Convenience wrapper over [`SourceWalker`] that drops the skip list.
///
/// # Errors
///
/// See [`SourceWalker::walk`].
pub fn enumerate<P: AsRef<Path>>(
    ctx: &BuildContext,
    sources: &[P],
    include_hidden: bool,
) -> Result<Vec<ArchiveEntry>> {
    SourceWalker::new(ctx, include_hidden)
        .walk(sources)
        .map(|walk| walk.entries)
}

/// Adds an entry unless the name is already taken. The same file under the
/// same name is stored once; a different file under a taken name is an error.
fn claim(
    walk: &mut Walk,
    claimed: &mut HashMap<String, PathBuf>,
    source: PathBuf,
    name: String,
) -> Result<()> {
    if let Some(first) = claimed.get(&name) {
        if *first == source {
            debug!(entry = %name, "source listed more than once, keeping first");
            return Ok(());
        }
        return Err(BundleError::DuplicateEntry {
            name,
            first: first.clone(),
            second: source,
        });
    }

    debug!(entry = %name, source = %source.display(), "queued archive entry");
    claimed.insert(name.clone(), source.clone());
    walk.entries.push(ArchiveEntry { source, name });
    Ok(())
}

fn skip(walk: &mut Walk, path: PathBuf, reason: SkipReason) {
    let skipped = SkippedEntry { path, reason };
    warn!("{skipped}");
    walk.skipped.push(skipped);
}

fn canonical(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|source| BundleError::SourceUnreadable {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::BundleConfig;
    use tempfile::TempDir;

    fn ctx(dir: &Path) -> BuildContext {
        BuildContext::new(dir, BundleConfig::default()).unwrap()
    }

    fn names(entries: &[ArchiveEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_single_file_at_root() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("hello.txt"), "hi").unwrap();

        let entries = enumerate(&ctx(temp.path()), &["hello.txt"], false).unwrap();

        assert_eq!(names(&entries), ["hello.txt"]);
        assert!(entries[0].source.is_absolute());
    }

    #[test]
    fn test_directory_rooted_at_its_name() {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("D");
        fs::create_dir_all(docs.join("a")).unwrap();
        fs::write(docs.join("a/b.txt"), "b").unwrap();

        let entries = enumerate(&ctx(temp.path()), &[&docs], false).unwrap();

        assert_eq!(names(&entries), ["D/a/b.txt"]);
    }

    #[test]
    fn test_lexicographic_depth_first_order() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("tree");
        fs::create_dir_all(root.join("a/inner")).unwrap();
        fs::create_dir_all(root.join("c")).unwrap();
        fs::write(root.join("b.txt"), "").unwrap();
        fs::write(root.join("a.txt"), "").unwrap();
        fs::write(root.join("a/z.txt"), "").unwrap();
        fs::write(root.join("a/inner/x.txt"), "").unwrap();
        fs::write(root.join("c/y.txt"), "").unwrap();

        let entries = enumerate(&ctx(temp.path()), &["tree"], false).unwrap();

        assert_eq!(
            names(&entries),
            [
                "tree/a/inner/x.txt",
                "tree/a/z.txt",
                "tree/a.txt",
                "tree/b.txt",
                "tree/c/y.txt",
            ]
        );
    }

    #[test]
    fn test_hidden_subtree_skipped() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("docs");
        fs::create_dir_all(root.join(".secret")).unwrap();
        fs::write(root.join(".secret/hidden.txt"), "x").unwrap();
        fs::write(root.join(".env"), "x").unwrap();
        fs::write(root.join("visible.txt"), "x").unwrap();

        let hidden_off = enumerate(&ctx(temp.path()), &["docs"], false).unwrap();
        assert_eq!(names(&hidden_off), ["docs/visible.txt"]);

        let hidden_on = enumerate(&ctx(temp.path()), &["docs"], true).unwrap();
        assert_eq!(
            names(&hidden_on),
            ["docs/.env", "docs/.secret/hidden.txt", "docs/visible.txt"]
        );
    }

    #[test]
    fn test_explicit_hidden_source_is_kept() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".profile"), "x").unwrap();

        let entries = enumerate(&ctx(temp.path()), &[".profile"], false).unwrap();
        assert_eq!(names(&entries), [".profile"]);
    }

    #[test]
    fn test_empty_directory_contributes_nothing() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("empty")).unwrap();

        let entries = enumerate(&ctx(temp.path()), &["empty"], false).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_missing_source_fails_before_walking() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("photos")).unwrap();
        fs::write(temp.path().join("photos/p.jpg"), "x").unwrap();

        let err = enumerate(&ctx(temp.path()), &["./photos", "./does-not-exist"], false)
            .unwrap_err();

        match err {
            BundleError::SourceNotFound { path } => {
                assert_eq!(path, Path::new("./does-not-exist"));
            }
            other => panic!("expected SourceNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_parent_is_source_not_found() {
        let temp = TempDir::new().unwrap();
        let err = enumerate(&ctx(temp.path()), &["nope/file.txt"], false).unwrap_err();
        assert!(matches!(err, BundleError::SourceNotFound { .. }));
    }

    #[test]
    fn test_same_source_twice_is_stored_once() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("dir")).unwrap();
        fs::write(temp.path().join("dir/a.txt"), "x").unwrap();

        let entries = enumerate(&ctx(temp.path()), &["dir", "./dir"], false).unwrap();
        assert_eq!(names(&entries), ["dir/a.txt"]);
    }

    #[test]
    fn test_colliding_directories_rejected() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("one/docs")).unwrap();
        fs::create_dir_all(temp.path().join("two/docs")).unwrap();
        fs::write(temp.path().join("one/docs/a.txt"), "1").unwrap();
        fs::write(temp.path().join("two/docs/a.txt"), "2").unwrap();

        let err = enumerate(&ctx(temp.path()), &["one/docs", "two/docs"], false).unwrap_err();
        match err {
            BundleError::DuplicateEntry { name, .. } => assert_eq!(name, "docs/a.txt"),
            other => panic!("expected DuplicateEntry, got {other:?}"),
        }
    }

    #[test]
    fn test_dot_source_uses_directory_name() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        fs::create_dir(&project).unwrap();
        fs::write(project.join("main.rs"), "fn main() {}").unwrap();

        let entries = enumerate(&ctx(&project), &["."], false).unwrap();
        assert_eq!(names(&entries), ["project/main.rs"]);
    }

    #[test]
    fn test_walk_is_deterministic() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("data");
        for dir in ["x", "y/z", "a"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        for file in ["x/1", "y/z/2", "a/3", "4", "y/5"] {
            fs::write(root.join(file), file).unwrap();
        }

        let ctx = ctx(temp.path());
        let first = enumerate(&ctx, &["data"], true).unwrap();
        let second = enumerate(&ctx, &["data"], true).unwrap();
        assert_eq!(first, second);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_skipped_by_default() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("src");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("target.txt"), "x").unwrap();
        std::os::unix::fs::symlink(root.join("target.txt"), root.join("link.txt")).unwrap();

        let walk = SourceWalker::new(&ctx(temp.path()), false)
            .walk(&["src"])
            .unwrap();

        assert_eq!(names(&walk.entries), ["src/target.txt"]);
        assert_eq!(walk.skipped.len(), 1);
        assert_eq!(walk.skipped[0].reason, SkipReason::Symlink);
        assert!(walk.skipped[0].to_string().starts_with("Skipped symlink:"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_detected_and_skipped() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("dir1");
        fs::create_dir_all(root.join("dir2")).unwrap();
        fs::write(root.join("dir2/file.txt"), "x").unwrap();
        std::os::unix::fs::symlink(&root, root.join("dir2/link")).unwrap();

        let ctx = BuildContext::new(
            temp.path(),
            BundleConfig::default().with_follow_symlinks(true),
        )
        .unwrap();
        let walk = SourceWalker::new(&ctx, false).walk(&["dir1"]).unwrap();

        assert_eq!(names(&walk.entries), ["dir1/dir2/file.txt"]);
        assert_eq!(walk.skipped.len(), 1);
        assert_eq!(walk.skipped[0].reason, SkipReason::SymlinkCycle);
    }

    #[cfg(unix)]
    #[test]
    fn test_link_to_sibling_directory_is_walked() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("src");
        fs::create_dir_all(root.join("b")).unwrap();
        fs::write(root.join("b/f.txt"), "x").unwrap();
        std::os::unix::fs::symlink(root.join("b"), root.join("a_link")).unwrap();
        std::os::unix::fs::symlink(root.join("b"), root.join("z_link")).unwrap();

        let ctx = BuildContext::new(
            temp.path(),
            BundleConfig::default().with_follow_symlinks(true),
        )
        .unwrap();
        let walk = SourceWalker::new(&ctx, false).walk(&["src"]).unwrap();

        assert_eq!(
            names(&walk.entries),
            ["src/a_link/f.txt", "src/b/f.txt", "src/z_link/f.txt"]
        );
        assert!(walk.skipped.is_empty(), "unexpected skips: {:?}", walk.skipped);
    }

    #[cfg(unix)]
    #[test]
    fn test_link_to_grandparent_is_a_cycle() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("top");
        fs::create_dir_all(root.join("mid/low")).unwrap();
        fs::write(root.join("mid/low/f.txt"), "x").unwrap();
        std::os::unix::fs::symlink(&root, root.join("mid/low/up")).unwrap();
        std::os::unix::fs::symlink(root.join("mid/low"), root.join("shortcut")).unwrap();

        let ctx = BuildContext::new(
            temp.path(),
            BundleConfig::default().with_follow_symlinks(true),
        )
        .unwrap();
        let walk = SourceWalker::new(&ctx, false).walk(&["top"]).unwrap();

        assert_eq!(
            names(&walk.entries),
            ["top/mid/low/f.txt", "top/shortcut/f.txt"]
        );
        assert_eq!(walk.skipped.len(), 2);
        assert!(
            walk.skipped
                .iter()
                .all(|s| s.reason == SkipReason::SymlinkCycle)
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_hidden_non_utf8_name_is_filtered() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let root = temp.path().join("D");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("visible.txt"), "x").unwrap();
        fs::write(root.join(OsStr::from_bytes(b".cache\xff")), "x").unwrap();

        let entries = enumerate(&ctx(temp.path()), &["D"], false).unwrap();
        assert_eq!(names(&entries), ["D/visible.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_followed_file_symlink_is_archived() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("src");
        fs::create_dir(&root).unwrap();
        fs::write(temp.path().join("outside.txt"), "x").unwrap();
        std::os::unix::fs::symlink(temp.path().join("outside.txt"), root.join("link.txt"))
            .unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone"), root.join("broken")).unwrap();

        let ctx = BuildContext::new(
            temp.path(),
            BundleConfig::default().with_follow_symlinks(true),
        )
        .unwrap();
        let walk = SourceWalker::new(&ctx, false).walk(&["src"]).unwrap();

        assert_eq!(names(&walk.entries), ["src/link.txt"]);
        assert_eq!(walk.skipped[0].reason, SkipReason::BrokenSymlink);
    }
}
