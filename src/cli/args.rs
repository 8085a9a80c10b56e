use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "i94-warehouse")]
#[command(about = "Builds a Parquet star-schema warehouse from I-94 immigration, demographics and temperature extracts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Hide the progress bar")]
    pub quiet: bool,
}

/// Where the configuration comes from; flags override the file and environment
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(short, long, help = "Configuration file (dl.cfg INI or TOML)")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Input base directory")]
    pub input: Option<PathBuf>,

    #[arg(short, long, help = "Output base directory")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Parquet compression: snappy, gzip, lz4, zstd or none")]
    pub compression: Option<String>,

    #[arg(long)]
    pub max_workers: Option<usize>,

    #[arg(long, help = "Abort on the first unparseable mapping line or ragged input record")]
    pub strict_mappings: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build every staging, dimension and fact table
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        #[arg(long, help = "Stop after the quality gate without writing the run report")]
        validate_only: bool,
    },

    /// Run the quality gate against an existing output
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Show row and file counts of every table in an output
    Info {
        #[command(flatten)]
        config: ConfigArgs,
    },
}
