//! Nexus CLI: plan and export edited videos from the command line.
//!
//! Usage:
//!   nexus export <VIDEO> [EDIT]   Export an edited copy of a video
//!   nexus plan [VIDEO] [EDIT]     Show the filter graph and engine command
//!   nexus presets                 List aspect ratios and color presets
//!   nexus check [--init-config]   Check engine availability

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::EditArgs;

#[derive(Parser)]
#[command(
    name = "nexus",
    about = "Trim, crop, grade, caption and sticker short videos",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export an edited copy of a video
    Export {
        /// Source video
        video: PathBuf,

        #[command(flatten)]
        edit: EditArgs,

        /// Output file path (defaults to <output_dir>/nexus_export.mp4)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the compiled filter graph and engine command without running it
    Plan {
        /// Source video (only echoed; nothing is read)
        video: Option<PathBuf>,

        #[command(flatten)]
        edit: EditArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// List aspect ratios and color presets
    Presets,

    /// Check engine availability
    Check {
        /// Write the default config file if none exists
        #[arg(long)]
        init_config: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = nexus_common::config::NexusConfig::load();

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    nexus_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Export {
            video,
            edit,
            output,
        } => commands::export::run(&config, video, edit, output).await,
        Commands::Plan { video, edit, json } => commands::plan::run(video, edit, json),
        Commands::Presets => commands::presets::run(),
        Commands::Check { init_config } => commands::check::run(&config, init_config),
    }
}
