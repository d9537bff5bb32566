//! Bundle files and directories into a ZIP archive and copy it to any
//! number of destinations.
//!
//! `zipdrop-core` is the engine shared by every zipdrop front end. A run
//! resolves the output path, walks the sources, writes the archive
//! atomically and fans copies out to the requested destinations. A failed
//! destination never undoes the archive or the other copies.
//!
//! # Examples
//!
//! ```no_run
//! use zipdrop_core::BuildRequest;
//! use zipdrop_core::BundleConfig;
//! use zipdrop_core::run;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let request = BuildRequest::new(["Reports"])
//!     .with_output("/backups")
//!     .with_destination("/mnt/dropbox");
//! let result = run(&request, &BundleConfig::default())?;
//! println!(
//!     "{} files in {}",
//!     result.report.files_added,
//!     result.archive_path.display()
//! );
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod atomic;
pub mod builder;
pub mod config;
pub mod context;
pub mod copy;
pub mod distribute;
pub mod error;
pub mod filters;
pub mod report;
pub mod request;
pub mod resolve;
pub mod walker;

// Re-export main API types
pub use api::ArchiveService;
pub use api::Bundler;
pub use api::Phase;
pub use api::run;
pub use api::run_in;
pub use api::run_with_progress;
pub use builder::build;
pub use builder::build_unique;
pub use config::BundleConfig;
pub use context::BuildContext;
pub use distribute::Distribution;
pub use distribute::distribute;
pub use error::BundleError;
pub use error::DestinationFailure;
pub use error::PartialDistribution;
pub use error::Result;
pub use report::BuildReport;
pub use report::NoopProgress;
pub use report::ProgressCallback;
pub use request::BuildRequest;
pub use request::BuildResult;
pub use resolve::OutputPath;
pub use resolve::resolve_output;
pub use resolve::resolve_output_path;
pub use walker::ArchiveEntry;
pub use walker::enumerate;
