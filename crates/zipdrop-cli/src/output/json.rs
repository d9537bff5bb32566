//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use zipdrop_core::BuildResult;
use zipdrop_core::PartialDistribution;

const OPERATION: &str = "bundle";

pub struct JsonFormatter;

#[derive(Debug, Serialize)]
struct FailureOutput {
    destination: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct BundleOutput {
    archive_path: String,
    copied_paths: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<FailureOutput>,
    files_added: usize,
    bytes_read: u64,
    archive_size: u64,
    compression_ratio: f64,
    entries_skipped: usize,
    duration_ms: u128,
    warnings: Vec<String>,
}

impl BundleOutput {
    fn new(result: &BuildResult) -> Self {
        let report = &result.report;
        Self {
            archive_path: result.archive_path.display().to_string(),
            copied_paths: result
                .copied_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            failures: Vec::new(),
            files_added: report.files_added,
            bytes_read: report.bytes_read,
            archive_size: report.archive_size,
            compression_ratio: report.compression_ratio(),
            entries_skipped: report.entries_skipped,
            duration_ms: report.duration.as_millis(),
            warnings: report.warnings.clone(),
        }
    }
}

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_bundle_result(&self, result: &BuildResult) -> Result<()> {
        Self::output(&JsonOutput::success(OPERATION, BundleOutput::new(result)))
    }

    fn format_partial_result(&self, partial: &PartialDistribution) -> Result<()> {
        let mut data = BundleOutput::new(&partial.result);
        data.failures = partial
            .failures
            .iter()
            .map(|f| FailureOutput {
                destination: f.destination.display().to_string(),
                error: f.error.to_string(),
            })
            .collect();

        Self::output(&JsonOutput::partial(OPERATION, data, partial.to_string()))
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::<()>::error(OPERATION, format!("{error:#}"));
        let _ = Self::output(&output);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use zipdrop_core::BuildReport;

    #[test]
    fn test_bundle_output_structure() {
        let result = BuildResult {
            archive_path: PathBuf::from("/out/a.zip"),
            copied_paths: vec![PathBuf::from("/cloud/a.zip")],
            report: BuildReport {
                files_added: 3,
                ..BuildReport::default()
            },
        };

        let json = serde_json::to_value(JsonOutput::success(OPERATION, BundleOutput::new(&result)))
            .unwrap();

        assert_eq!(json["operation"], "bundle");
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["archive_path"], "/out/a.zip");
        assert_eq!(json["data"]["copied_paths"][0], "/cloud/a.zip");
        assert_eq!(json["data"]["files_added"], 3);
        assert!(json["data"].get("failures").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_error_output_structure() {
        let output = JsonOutput::<()>::error(OPERATION, "source not found: x");
        let json = serde_json::to_value(output).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "source not found: x");
        assert!(json.get("data").is_none());
    }
}
