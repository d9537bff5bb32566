//! High-level build-and-distribute API.

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use tracing::info;

use crate::BuildContext;
use crate::BuildRequest;
use crate::BuildReport;
use crate::BuildResult;
use crate::BundleConfig;
use crate::BundleError;
use crate::NoopProgress;
use crate::ProgressCallback;
use crate::Result;
use crate::builder;
use crate::distribute;
use crate::error::PartialDistribution;
use crate::resolve;
use crate::resolve::OutputPath;
use crate::walker::SourceWalker;

/// Stages of one run, in the order they happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Choosing the archive path.
    Resolving,
    /// Expanding sources into archive entries.
    Enumerating,
    /// Writing the archive.
    Building,
    /// Copying the archive to destinations.
    Distributing,
    /// Finished.
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolving",
            Self::Enumerating => "enumerating",
            Self::Building => "building",
            Self::Distributing => "distributing",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Builds an archive from `request` and copies it to every destination.
///
/// Relative paths in the request are resolved against the current working
/// directory.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration is invalid
/// - The output location cannot be created
/// - A source is missing or cannot be read
/// - Writing the archive fails (no archive is left behind)
/// - At least one destination failed; the archive and every successful
///   copy remain and are reported through
///   [`BundleError::DistributionIncomplete`]
///
/// # Examples
///
/// ```no_run
/// use zipdrop_core::BuildRequest;
/// use zipdrop_core::BundleConfig;
/// use zipdrop_core::run;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let request = BuildRequest::new(["Reports"])
///     .with_output("backups/")
///     .with_destination("/mnt/cloud");
/// let result = run(&request, &BundleConfig::default())?;
/// println!("archive at {}", result.archive_path.display());
/// # Ok(())
/// # }
/// ```
pub fn run(request: &BuildRequest, config: &BundleConfig) -> Result<BuildResult> {
    run_with_progress(request, config, &mut NoopProgress)
}

/// Like [`run`], reporting per-entry progress while the archive is written.
///
/// # Errors
///
/// See [`run`].
pub fn run_with_progress(
    request: &BuildRequest,
    config: &BundleConfig,
    progress: &mut dyn ProgressCallback,
) -> Result<BuildResult> {
    let ctx = BuildContext::from_current_dir(config.clone())?;
    run_in(&ctx, request, progress)
}

/// Runs `request` inside an existing context.
///
/// The context fixes the working directory and the timestamp used for
/// generated names, which makes runs reproducible under test.
///
/// # Errors
///
/// See [`run`].
pub fn run_in(
    ctx: &BuildContext,
    request: &BuildRequest,
    progress: &mut dyn ProgressCallback,
) -> Result<BuildResult> {
    let started = Instant::now();

    info!(phase = %Phase::Resolving, sources = request.sources.len(), "resolving output path");
    let base_name = resolve::default_base_name(ctx, &request.sources);
    let output = resolve::resolve_output(ctx, request.output_target.as_deref(), &base_name)?;

    let (archive_path, mut report) = match build_archive(ctx, request, &output, progress) {
        Ok(built) => built,
        Err(e) => {
            output.remove_created_dirs();
            return Err(e);
        }
    };

    info!(
        phase = %Phase::Distributing,
        destinations = request.destinations.len(),
        "distributing copies"
    );
    let distribution = distribute::distribute(ctx, &archive_path, &request.destinations);
    report.duration = started.elapsed();

    let result = BuildResult {
        archive_path,
        copied_paths: distribution.copied,
        report,
    };

    if !distribution.failures.is_empty() {
        return Err(BundleError::DistributionIncomplete(Box::new(
            PartialDistribution {
                result,
                failures: distribution.failures,
            },
        )));
    }

    info!(
        phase = %Phase::Done,
        archive = %result.archive_path.display(),
        copies = result.copied_paths.len(),
        elapsed_ms = result.report.duration.as_millis(),
        "run complete"
    );
    Ok(result)
}

/// Enumerating and Building. Returns where the archive landed, which for a
/// generated name may be a later suffix than the resolved one.
fn build_archive(
    ctx: &BuildContext,
    request: &BuildRequest,
    output: &OutputPath,
    progress: &mut dyn ProgressCallback,
) -> Result<(PathBuf, BuildReport)> {
    info!(phase = %Phase::Enumerating, include_hidden = request.include_hidden, "enumerating sources");
    let walk = SourceWalker::new(ctx, request.include_hidden).walk(&request.sources)?;

    info!(
        phase = %Phase::Building,
        archive = %output.path.display(),
        entries = walk.entries.len(),
        "building archive"
    );
    let (archive_path, mut report) = if output.generated {
        builder::build_unique(ctx, &walk.entries, &output.path, progress)?
    } else {
        let report = builder::build(ctx, &walk.entries, &output.path, progress)?;
        (output.path.clone(), report)
    };

    report.entries_skipped = walk.skipped.len();
    for skipped in &walk.skipped {
        report.add_warning(skipped.to_string());
    }
    Ok((archive_path, report))
}

/// The single capability every front end drives.
///
/// Front ends collect a [`BuildRequest`] however suits them and render the
/// returned [`BuildResult`] or error; they never reach into walker or
/// builder state.
pub trait ArchiveService {
    /// Builds and distributes one archive.
    ///
    /// # Errors
    ///
    /// See [`run`].
    fn submit(&self, request: &BuildRequest) -> Result<BuildResult>;
}

/// [`ArchiveService`] backed by this crate's pipeline.
///
/// # Examples
///
/// ```no_run
/// use zipdrop_core::ArchiveService;
/// use zipdrop_core::BuildRequest;
/// use zipdrop_core::BundleConfig;
/// use zipdrop_core::Bundler;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let service = Bundler::new(BundleConfig::default().with_compression_level(9));
/// let result = service.submit(&BuildRequest::new(["notes.txt"]))?;
/// assert!(result.copied_paths.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Bundler {
    config: BundleConfig,
}

impl Bundler {
    /// Creates a service that runs every request with `config`.
    #[must_use]
    pub fn new(config: BundleConfig) -> Self {
        Self { config }
    }

    /// The configuration applied to each request.
    #[must_use]
    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Like [`ArchiveService::submit`], with progress reporting.
    ///
    /// # Errors
    ///
    /// See [`run`].
    pub fn submit_with_progress(
        &self,
        request: &BuildRequest,
        progress: &mut dyn ProgressCallback,
    ) -> Result<BuildResult> {
        run_with_progress(request, &self.config, progress)
    }
}

impl ArchiveService for Bundler {
    fn submit(&self, request: &BuildRequest) -> Result<BuildResult> {
        run(request, &self.config)
    }
}
