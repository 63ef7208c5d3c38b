use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "talkforge")]
#[command(author, version, about = "Talking-head video render service")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP render service
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Render a single video and print the JSON result
    Render {
        /// URL of the portrait image
        #[arg(long)]
        image_url: String,

        /// URL of the voice clip
        #[arg(long)]
        audio_url: String,

        /// Quality tier: low, standard, high (or 480p, 720p, 1080p)
        #[arg(short, long)]
        quality: Option<String>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Check that the configured model weights are present
    CheckWeights,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
