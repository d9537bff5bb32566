//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "zipdrop")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub bundle: BundleArgs,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate shell completion scripts
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
pub struct BundleArgs {
    /// Files or directories to put in the archive
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<PathBuf>,

    /// Archive file, or directory to write an auto-named archive into
    /// (default: current directory)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Copy the finished archive here as well (can be repeated)
    #[arg(short = 'c', long = "copy-to", value_name = "PATH")]
    pub copy_to: Vec<PathBuf>,

    /// Include hidden files and directories
    #[arg(long)]
    pub include_hidden: bool,

    /// Follow symbolic links inside source directories
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Compression level (0 stores entries uncompressed)
    #[arg(long, default_value = "6", value_parser = clap::value_parser!(u8).range(0..=9))]
    pub compression_level: u8,

    /// Do not store Unix permission bits
    #[arg(long)]
    pub no_permissions: bool,

    /// Maximum number of copies written at once
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: u16,
}
