//! ZIP archive construction.
//!
//! Entries are written in walker order with timestamps taken from each
//! source file's modification time, so building an unchanged tree twice
//! yields byte-identical archives. The archive is assembled in a temporary
//! file beside the destination and renamed into place only when complete.

use crate::BuildContext;
use crate::BuildReport;
use crate::BundleConfig;
use crate::BundleError;
use crate::ProgressCallback;
use crate::Result;
use crate::atomic::AtomicFile;
use crate::copy::CopyBuffer;
use crate::copy::copy_with_buffer;
use crate::walker::ArchiveEntry;
use chrono::DateTime;
use chrono::Datelike;
use chrono::Local;
use chrono::Timelike;
use std::fs::File;
use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::info;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Entries at or above this size need ZIP64 headers.
const LARGE_FILE_THRESHOLD: u64 = 0xFFFF_FFFF;

/// Writes `entries` to a ZIP file at `destination`.
///
/// Any existing file at `destination` is replaced only after the new
/// archive is complete.
///
/// # Examples
///
/// ```no_run
/// use zipdrop_core::BuildContext;
/// use zipdrop_core::BundleConfig;
/// use zipdrop_core::NoopProgress;
/// use zipdrop_core::builder::build;
/// use zipdrop_core::walker::enumerate;
/// use std::path::Path;
///
/// let ctx = BuildContext::from_current_dir(BundleConfig::default())?;
/// let entries = enumerate(&ctx, &["docs"], false)?;
/// let report = build(&ctx, &entries, Path::new("/backups/docs.zip"), &mut NoopProgress)?;
/// println!("{} files", report.files_added);
/// # Ok::<(), zipdrop_core::BundleError>(())
/// ```
///
/// # Errors
///
/// Returns `ArchiveWrite` naming the entry in progress if any read or write
/// fails. The temporary file is removed before the error is returned.
pub fn build(
    ctx: &BuildContext,
    entries: &[ArchiveEntry],
    destination: &Path,
    progress: &mut dyn ProgressCallback,
) -> Result<BuildReport> {
    let (file, report) = write_archive(ctx, entries, destination, progress)?;
    file.commit().map_err(|e| write_error(destination, None, e))?;
    finish(destination, &report, progress);
    Ok(report)
}

/// Like [`build`], but never replaces an existing file.
///
/// If `destination` is taken when the archive is complete, the archive lands
/// at the first free `name-1.zip`, `name-2.zip`, ... instead. Concurrent
/// runs that picked the same generated name therefore keep both archives.
/// Returns the path the archive landed at.
///
/// # Errors
///
/// See [`build`].
pub fn build_unique(
    ctx: &BuildContext,
    entries: &[ArchiveEntry],
    destination: &Path,
    progress: &mut dyn ProgressCallback,
) -> Result<(PathBuf, BuildReport)> {
    let (file, report) = write_archive(ctx, entries, destination, progress)?;
    let landed = file
        .commit_unique()
        .map_err(|e| write_error(destination, None, e))?;
    if landed.as_path() != destination {
        debug!(requested = %destination.display(), landed = %landed.display(), "archive name was taken");
    }
    finish(&landed, &report, progress);
    Ok((landed, report))
}

fn write_error(archive: &Path, entry: Option<&str>, source: io::Error) -> BundleError {
    BundleError::ArchiveWrite {
        archive: archive.to_path_buf(),
        entry: entry.map(str::to_string),
        source,
    }
}

/// Streams every entry into an uncommitted temporary file.
fn write_archive(
    ctx: &BuildContext,
    entries: &[ArchiveEntry],
    destination: &Path,
    progress: &mut dyn ProgressCallback,
) -> Result<(AtomicFile, BuildReport)> {
    let mut file = AtomicFile::create(destination).map_err(|e| write_error(destination, None, e))?;
    let mut report = BuildReport::new();
    let options = base_options(ctx.config());
    let mut buffer = CopyBuffer::new();
    let total = entries.len();

    {
        let mut zip = ZipWriter::new(file.as_file_mut());

        for (idx, entry) in entries.iter().enumerate() {
            let name = entry.name.as_str();
            progress.on_entry_start(Path::new(name), total, idx + 1);

            let bytes = add_entry(&mut zip, entry, ctx.config(), options, &mut buffer, progress)
                .map_err(|e| write_error(destination, Some(name), e))?;

            debug!(entry = name, bytes, "added archive entry");
            report.files_added += 1;
            report.bytes_read += bytes;
            progress.on_entry_complete(Path::new(name));
        }

        zip.finish().map_err(|e| {
            write_error(
                destination,
                None,
                io::Error::other(format!("failed to finish ZIP archive: {e}")),
            )
        })?;
    }

    report.archive_size = file
        .as_file_mut()
        .metadata()
        .map_err(|e| write_error(destination, None, e))?
        .len();
    Ok((file, report))
}

fn finish(archive: &Path, report: &BuildReport, progress: &mut dyn ProgressCallback) {
    info!(
        archive = %archive.display(),
        files = report.files_added,
        bytes = report.archive_size,
        "archive written"
    );
    progress.on_complete();
}

/// Compression settings shared by every entry of one build.
fn base_options(config: &BundleConfig) -> SimpleFileOptions {
    match config.compression_level {
        Some(0) => SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
        level => SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(level.map(i64::from)),
    }
}

/// Streams one source file into the archive, returning the bytes read.
fn add_entry<W: io::Write + io::Seek>(
    zip: &mut ZipWriter<W>,
    entry: &ArchiveEntry,
    config: &BundleConfig,
    options: SimpleFileOptions,
    buffer: &mut CopyBuffer,
    progress: &mut dyn ProgressCallback,
) -> io::Result<u64> {
    let mut source = File::open(&entry.source)?;
    let metadata = source.metadata()?;

    let options = entry_options(options, &metadata, config)?;
    zip.start_file(entry.name.as_str(), options)
        .map_err(|e| io::Error::other(format!("failed to start file in ZIP: {e}")))?;

    copy_with_buffer(&mut source, zip, buffer, |n| progress.on_bytes_written(n))
}

/// Per-entry options: modification time, permissions and ZIP64 flag.
fn entry_options(
    options: SimpleFileOptions,
    metadata: &Metadata,
    config: &BundleConfig,
) -> io::Result<SimpleFileOptions> {
    let modified: DateTime<Local> = metadata.modified()?.into();
    let options = options
        .last_modified_time(zip_timestamp(&modified))
        .large_file(metadata.len() >= LARGE_FILE_THRESHOLD);

    if config.preserve_permissions {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            return Ok(options.unix_permissions(metadata.permissions().mode()));
        }
    }

    Ok(options)
}

/// Converts a local time to a ZIP (MS-DOS) timestamp.
///
/// Times outside the representable range (before 1980 or after 2107) clamp
/// to the format's epoch, 1980-01-01 00:00:00.
fn zip_timestamp(time: &DateTime<Local>) -> zip::DateTime {
    let Ok(year) = u16::try_from(time.year()) else {
        return zip::DateTime::default();
    };
    #[allow(clippy::cast_possible_truncation)]
    let parts = (
        time.month() as u8,
        time.day() as u8,
        time.hour() as u8,
        time.minute() as u8,
        time.second() as u8,
    );
    zip::DateTime::from_date_and_time(year, parts.0, parts.1, parts.2, parts.3, parts.4)
        .unwrap_or_default()
}
