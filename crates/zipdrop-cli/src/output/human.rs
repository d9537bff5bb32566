//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use crate::progress::humanize_bytes;
use anyhow::Result;
use console::Term;
use console::style;
use zipdrop_core::BuildResult;
use zipdrop_core::PartialDistribution;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    fn headline(&self, complete: bool, text: &str) {
        let line = if !self.use_colors {
            text.to_string()
        } else if complete {
            format!("{} {text}", style("✓").green().bold())
        } else {
            format!("{} {text}", style("⚠").yellow().bold())
        };
        let _ = self.term.write_line(&line);
    }

    fn write_summary(&self, result: &BuildResult) {
        let report = &result.report;

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&format!(
            "  Files added:      {}",
            Self::format_number(report.files_added)
        ));
        let _ = self.term.write_line(&format!(
            "  Total size:       {}",
            humanize_bytes(report.bytes_read)
        ));
        let _ = self.term.write_line(&format!(
            "  Archive size:     {}",
            humanize_bytes(report.archive_size)
        ));

        if report.skipped_any() {
            let _ = self
                .term
                .write_line(&format!("  Entries skipped:  {}", report.entries_skipped));
        }

        if self.verbose {
            let _ = self.term.write_line(&format!(
                "  Compression:      {:.2}:1",
                report.compression_ratio()
            ));
            let _ = self
                .term
                .write_line(&format!("  Duration:         {:?}", report.duration));
        }

        for copy in &result.copied_paths {
            let _ = self
                .term
                .write_line(&format!("  Copied to:        {}", copy.display()));
        }

        if report.has_warnings() {
            let _ = self.term.write_line("");
            if self.use_colors {
                let _ = self
                    .term
                    .write_line(&format!("{}", style("Warnings:").yellow().bold()));
            } else {
                let _ = self.term.write_line("Warnings:");
            }
            for warning in &report.warnings {
                let _ = self.term.write_line(&format!("  - {warning}"));
            }
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_bundle_result(&self, result: &BuildResult) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.headline(
            true,
            &format!("Archive created: {}", result.archive_path.display()),
        );
        self.write_summary(result);
        Ok(())
    }

    fn format_partial_result(&self, partial: &PartialDistribution) -> Result<()> {
        // Failed destinations are reported even in quiet mode.
        let errors = Term::stderr();
        for failure in &partial.failures {
            let line = if self.use_colors {
                format!("{} {failure}", style("ERROR:").red().bold())
            } else {
                format!("ERROR: {failure}")
            };
            let _ = errors.write_line(&line);
        }

        if self.quiet {
            return Ok(());
        }

        self.headline(false, &partial.to_string());
        self.write_summary(&partial.result);
        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        // Always show errors, even in quiet mode
        let errors = Term::stderr();
        if self.use_colors {
            let _ = errors.write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = errors.write_line(&format!("ERROR: {error:?}"));
        }
    }
}
