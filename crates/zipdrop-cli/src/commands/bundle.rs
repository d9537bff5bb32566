//! Bundle command: build the archive and copy it to every destination.

use super::Outcome;
use crate::cli::BundleArgs;
use crate::error::convert_bundle_error;
use crate::output::OutputFormatter;
use crate::paths::expand_tilde;
use crate::progress::CliProgress;
use anyhow::Result;
use tracing::debug;
use zipdrop_core::BuildRequest;
use zipdrop_core::BundleConfig;
use zipdrop_core::BundleError;
use zipdrop_core::Bundler;
use zipdrop_core::NoopProgress;

pub fn execute(args: &BundleArgs, formatter: &dyn OutputFormatter, quiet: bool) -> Result<Outcome> {
    let request = build_request(args);
    let bundler = Bundler::new(build_config(args));
    debug!(?request, config = ?bundler.config(), "submitting bundle request");

    let result = if !quiet && CliProgress::should_show() {
        let mut progress = CliProgress::new("Bundling");
        bundler.submit_with_progress(&request, &mut progress)
    } else {
        bundler.submit_with_progress(&request, &mut NoopProgress)
    };

    match result {
        Ok(result) => {
            formatter.format_bundle_result(&result)?;
            Ok(Outcome::Complete)
        }
        Err(BundleError::DistributionIncomplete(partial)) => {
            formatter.format_partial_result(&partial)?;
            Ok(Outcome::Partial)
        }
        Err(err) => Err(convert_bundle_error(err)),
    }
}

fn build_request(args: &BundleArgs) -> BuildRequest {
    let mut request = BuildRequest::new(args.sources.iter().map(|p| expand_tilde(p)))
        .with_destinations(args.copy_to.iter().map(|p| expand_tilde(p)))
        .with_include_hidden(args.include_hidden);
    if let Some(output) = &args.output {
        request = request.with_output(expand_tilde(output));
    }
    request
}

fn build_config(args: &BundleArgs) -> BundleConfig {
    BundleConfig::default()
        .with_follow_symlinks(args.follow_symlinks)
        .with_compression_level(args.compression_level)
        .with_preserve_permissions(!args.no_permissions)
        .with_max_parallel_copies(usize::from(args.jobs))
}
