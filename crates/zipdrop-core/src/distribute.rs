//! Copy fan-out of a finished archive.
//!
//! Each destination is handled on its own: a failure is recorded and the
//! remaining destinations still run. Copies only read the finalized archive
//! and write to their own target, so they run on a bounded pool of scoped
//! threads. Destinations naming the same target are copied one after the
//! other by a single worker. Results are reported in request order
//! regardless of which copy finishes first.

use crate::BuildContext;
use crate::atomic::AtomicFile;
use crate::atomic::suffixed;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_buffer;
use crate::copy::same_contents;
use crate::error::DestinationFailure;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::fs::File;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Outcome of distributing one archive.
#[derive(Debug, Default)]
pub struct Distribution {
    /// Where copies landed, in request order, one per successful destination.
    pub copied: Vec<PathBuf>,

    /// Failed destinations, in request order.
    pub failures: Vec<DestinationFailure>,
}

impl Distribution {
    /// Returns `true` if every destination received a copy.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Copies `archive` to every destination.
///
/// A destination that is an existing directory, or has no extension and is
/// not an existing file, receives `<destination>/<archive file name>`;
/// missing directories are created. Any other destination is used as the
/// copy's file path and replaced if present.
///
/// Copies into a directory never overwrite an unrelated file: a target that
/// exists with different content gets a `-1`, `-2`, ... suffix, while one
/// that already holds identical bytes is simply replaced.
///
/// # Examples
///
/// ```no_run
/// use zipdrop_core::BuildContext;
/// use zipdrop_core::BundleConfig;
/// use zipdrop_core::distribute::distribute;
/// use std::path::Path;
///
/// let ctx = BuildContext::from_current_dir(BundleConfig::default())?;
/// let outcome = distribute(
///     &ctx,
///     Path::new("/backups/docs.zip"),
///     &["/mnt/dropbox", "/mnt/onedrive/latest.zip"],
/// );
/// for failure in &outcome.failures {
///     eprintln!("{failure}");
/// }
/// # Ok::<(), zipdrop_core::BundleError>(())
/// ```
pub fn distribute<P: AsRef<Path> + Sync>(
    ctx: &BuildContext,
    archive: &Path,
    destinations: &[P],
) -> Distribution {
    if destinations.is_empty() {
        return Distribution::default();
    }

    let groups = group_by_target(ctx, archive, destinations);
    let workers = ctx.config().max_parallel_copies.clamp(1, groups.len());
    info!(
        archive = %archive.display(),
        destinations = destinations.len(),
        targets = groups.len(),
        workers,
        "distributing archive"
    );

    let copy_one = |idx: usize| {
        let requested = destinations[idx].as_ref();
        let outcome = copy_to_destination(ctx, archive, requested).map_err(|e| {
            warn!(destination = %requested.display(), error = %e, "copy failed");
            DestinationFailure::new(requested, e)
        });
        (idx, outcome)
    };
    let copy_group = |group: &Vec<usize>| {
        group
            .iter()
            .map(|&idx| copy_one(idx))
            .collect::<Vec<_>>()
    };

    let done: Vec<_> = if workers == 1 {
        groups.iter().flat_map(copy_group).collect()
    } else {
        run_bounded(&groups, workers, copy_group)
            .into_iter()
            .flatten()
            .collect()
    };

    let mut slots: Vec<Option<_>> = (0..destinations.len()).map(|_| None).collect();
    for (idx, outcome) in done {
        slots[idx] = Some(outcome);
    }

    let mut distribution = Distribution::default();
    for outcome in slots.into_iter().flatten() {
        match outcome {
            Ok(path) => distribution.copied.push(path),
            Err(failure) => distribution.failures.push(failure),
        }
    }
    distribution
}

/// Groups destination indices by the file they would write, keeping first
/// appearance order. Destinations whose target cannot be worked out stay in
/// groups of their own and fail when copied.
fn group_by_target<P: AsRef<Path>>(
    ctx: &BuildContext,
    archive: &Path,
    destinations: &[P],
) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut by_target: HashMap<PathBuf, usize> = HashMap::new();

    for (idx, requested) in destinations.iter().enumerate() {
        let Ok(target) = resolve_target(ctx, archive, requested.as_ref()) else {
            groups.push(vec![idx]);
            continue;
        };
        match by_target.entry(target.path) {
            Entry::Occupied(slot) => groups[*slot.get()].push(idx),
            Entry::Vacant(slot) => {
                slot.insert(groups.len());
                groups.push(vec![idx]);
            }
        }
    }
    groups
}

/// Runs `job` over `items` on at most `workers` scoped threads, returning
/// results in item order.
fn run_bounded<T, R, F>(items: &[T], workers: usize, job: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let next = AtomicUsize::new(0);
    let mut slots: Vec<Option<R>> = (0..items.len()).map(|_| None).collect();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    let mut done = Vec::new();
                    loop {
                        let idx = next.fetch_add(1, Ordering::Relaxed);
                        let Some(item) = items.get(idx) else {
                            break;
                        };
                        done.push((idx, job(item)));
                    }
                    done
                })
            })
            .collect();

        for handle in handles {
            match handle.join() {
                Ok(done) => {
                    for (idx, result) in done {
                        slots[idx] = Some(result);
                    }
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
    });

    slots.into_iter().flatten().collect()
}

/// Where a copy for one destination goes.
#[derive(Debug)]
struct Target {
    path: PathBuf,
    into_directory: bool,
}

/// Works out the copy path for `requested` without touching the filesystem
/// beyond metadata lookups.
fn resolve_target(ctx: &BuildContext, archive: &Path, requested: &Path) -> io::Result<Target> {
    let destination = ctx.absolutize(requested);
    let into_directory = destination.is_dir()
        || (destination.extension().is_none() && !destination.is_file());

    let path = if into_directory {
        let name = archive
            .file_name()
            .ok_or_else(|| io::Error::other("archive path has no file name"))?;
        destination.join(name)
    } else {
        destination
    };
    Ok(Target {
        path,
        into_directory,
    })
}

/// Copies the archive to one destination and returns where it landed.
fn copy_to_destination(ctx: &BuildContext, archive: &Path, requested: &Path) -> io::Result<PathBuf> {
    let Target {
        path: target,
        into_directory,
    } = resolve_target(ctx, archive, requested)?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    if is_same_file(archive, &target)? {
        debug!(target = %target.display(), "destination is the archive itself");
        return Ok(target);
    }

    let mut file = AtomicFile::create(&target)?;
    let mut source = File::open(archive)?;
    copy_with_buffer(&mut source, file.as_file_mut(), &mut CopyBuffer::new(), |_| {})?;

    let landed = if into_directory {
        commit_without_clobbering(file, archive)?
    } else {
        file.commit()?
    };
    debug!(target = %landed.display(), "copied archive");
    Ok(landed)
}

/// Commits under the target name or the first free suffixed variant,
/// replacing only a file whose bytes already match the archive.
fn commit_without_clobbering(mut file: AtomicFile, archive: &Path) -> io::Result<PathBuf> {
    let target = file.target().to_path_buf();
    let mut suffix = 0u32;

    loop {
        let candidate = suffixed(&target, suffix);
        if candidate.is_file() && same_contents(archive, &candidate)? {
            return file.retarget(candidate).commit();
        }

        match file.retarget(candidate).commit_new() {
            Ok(landed) => return Ok(landed),
            Err((returned, e)) if e.kind() == io::ErrorKind::AlreadyExists => {
                // Another writer may have just landed the same archive here.
                let taken = returned.target();
                if taken.is_file() && same_contents(archive, taken)? {
                    return returned.commit();
                }
                file = returned;
                suffix += 1;
            }
            Err((_, e)) => return Err(e),
        }
    }
}

fn is_same_file(a: &Path, b: &Path) -> io::Result<bool> {
    if !b.exists() {
        return Ok(false);
    }
    Ok(fs::canonicalize(a)? == fs::canonicalize(b)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::BundleConfig;
    use crate::BundleError;
    use tempfile::TempDir;

    fn ctx(dir: &Path) -> BuildContext {
        BuildContext::new(dir, BundleConfig::default()).unwrap()
    }

    fn archive_in(dir: &Path) -> PathBuf {
        let archive = dir.join("bundle.zip");
        fs::write(&archive, b"PK\x05\x06 archive bytes").unwrap();
        archive
    }

    #[test]
    fn test_zero_destinations() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(temp.path());
        let none: [&str; 0] = [];

        let outcome = distribute(&ctx(temp.path()), &archive, &none);
        assert!(outcome.copied.is_empty());
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_copy_into_existing_directory() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(temp.path());
        let cloud = temp.path().join("cloud.sync");
        fs::create_dir(&cloud).unwrap();

        let outcome = distribute(&ctx(temp.path()), &archive, &[&cloud]);

        assert_eq!(outcome.copied, [cloud.join("bundle.zip")]);
        assert_eq!(
            fs::read(cloud.join("bundle.zip")).unwrap(),
            fs::read(&archive).unwrap()
        );
    }

    #[test]
    fn test_extensionless_destination_created_as_directory() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(temp.path());

        let outcome = distribute(&ctx(temp.path()), &archive, &["copies/nested"]);

        let expected = temp.path().join("copies/nested/bundle.zip");
        assert_eq!(outcome.copied, [expected.clone()]);
        assert!(expected.is_file());
    }

    #[test]
    fn test_explicit_file_destination_replaced() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(temp.path());
        let target = temp.path().join("backup/latest.zip");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "older").unwrap();

        let outcome = distribute(&ctx(temp.path()), &archive, &[&target]);

        assert_eq!(outcome.copied, [target.clone()]);
        assert_eq!(fs::read(&target).unwrap(), fs::read(&archive).unwrap());
    }

    #[test]
    fn test_unrelated_file_not_overwritten() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(temp.path());
        let cloud = temp.path().join("cloud");
        fs::create_dir(&cloud).unwrap();
        fs::write(cloud.join("bundle.zip"), "someone else's file").unwrap();

        let outcome = distribute(&ctx(temp.path()), &archive, &[&cloud]);

        assert_eq!(outcome.copied, [cloud.join("bundle-1.zip")]);
        assert_eq!(
            fs::read(cloud.join("bundle.zip")).unwrap(),
            b"someone else's file"
        );
    }

    #[test]
    fn test_identical_file_is_reused() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(temp.path());
        let cloud = temp.path().join("cloud");
        fs::create_dir(&cloud).unwrap();

        let ctx = ctx(temp.path());
        distribute(&ctx, &archive, &[&cloud]);
        let again = distribute(&ctx, &archive, &[&cloud]);

        assert_eq!(again.copied, [cloud.join("bundle.zip")]);
        assert!(!cloud.join("bundle-1.zip").exists());
    }

    #[test]
    fn test_archive_directory_as_destination() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(temp.path());

        let outcome = distribute(&ctx(temp.path()), &archive, &[temp.path()]);

        assert_eq!(outcome.copied, [temp.path().join("bundle.zip")]);
        assert!(!temp.path().join("bundle-1.zip").exists());
    }

    #[test]
    fn test_failure_does_not_stop_other_destinations() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(temp.path());
        fs::write(temp.path().join("blocker"), "a file, not a directory").unwrap();
        let valid = temp.path().join("valid");

        let outcome = distribute(
            &ctx(temp.path()),
            &archive,
            &[temp.path().join("blocker/sub/copy.zip"), valid.clone()],
        );

        assert_eq!(outcome.copied, [valid.join("bundle.zip")]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(
            outcome.failures[0].destination,
            temp.path().join("blocker/sub/copy.zip")
        );
        assert!(matches!(
            outcome.failures[0].error,
            BundleError::DestinationUnreachable { .. }
        ));
    }

    #[test]
    fn test_parallel_copies_keep_request_order() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(temp.path());
        let destinations: Vec<PathBuf> = (0..12)
            .map(|i| temp.path().join(format!("dest{i:02}")))
            .collect();

        let ctx = BuildContext::new(
            temp.path(),
            BundleConfig::default().with_max_parallel_copies(4),
        )
        .unwrap();
        let outcome = distribute(&ctx, &archive, &destinations);

        let expected: Vec<PathBuf> = destinations.iter().map(|d| d.join("bundle.zip")).collect();
        assert_eq!(outcome.copied, expected);
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_repeated_destination_lands_once() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(temp.path());
        let cloud = temp.path().join("cloud");
        fs::create_dir(&cloud).unwrap();

        let ctx = BuildContext::new(
            temp.path(),
            BundleConfig::default().with_max_parallel_copies(4),
        )
        .unwrap();

        for _ in 0..20 {
            let outcome = distribute(&ctx, &archive, &[&cloud, &cloud, &cloud, &cloud]);
            assert_eq!(outcome.copied, vec![cloud.join("bundle.zip"); 4]);
            assert!(outcome.is_complete());
        }

        let names: Vec<_> = fs::read_dir(&cloud)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["bundle.zip"]);
    }

    #[test]
    fn test_same_target_by_different_spellings() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(temp.path());
        let cloud = temp.path().join("cloud");
        fs::create_dir(&cloud).unwrap();

        let ctx = BuildContext::new(
            temp.path(),
            BundleConfig::default().with_max_parallel_copies(4),
        )
        .unwrap();
        let outcome = distribute(&ctx, &archive, &["cloud", "./cloud", "cloud/bundle.zip", "other"]);

        assert_eq!(
            outcome.copied,
            [
                cloud.join("bundle.zip"),
                cloud.join("bundle.zip"),
                cloud.join("bundle.zip"),
                temp.path().join("other/bundle.zip"),
            ]
        );
        assert!(!cloud.join("bundle-1.zip").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_concurrent_copies_to_one_directory_reuse_identical_file() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(temp.path());
        let cloud = temp.path().join("cloud");
        fs::create_dir(&cloud).unwrap();
        let ctx = ctx(temp.path());

        for _ in 0..10 {
            let landed: Vec<PathBuf> = thread::scope(|scope| {
                let handles: Vec<_> = (0..8)
                    .map(|_| scope.spawn(|| copy_to_destination(&ctx, &archive, &cloud)))
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap().unwrap())
                    .collect()
            });
            assert!(landed.iter().all(|p| *p == cloud.join("bundle.zip")));
        }

        let names: Vec<_> = fs::read_dir(&cloud)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["bundle.zip"]);
    }

    #[test]
    fn test_group_by_target() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(temp.path());
        fs::create_dir(temp.path().join("a")).unwrap();

        let groups = group_by_target(
            &ctx(temp.path()),
            &archive,
            &["a", "b", "./a", "a/bundle.zip", "b/other.zip"],
        );
        assert_eq!(groups, [vec![0, 2, 3], vec![1], vec![4]]);
    }

    #[test]
    fn test_run_bounded_preserves_order() {
        let items: Vec<u32> = (0..50).collect();
        let doubled = run_bounded(&items, 3, |n| n * 2);
        assert_eq!(doubled, (0..50).map(|n| n * 2).collect::<Vec<_>>());
    }
}
