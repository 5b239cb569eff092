//! Cinder CLI - Command-line interface for the Cinder engine

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{inspect, resave, run};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cinder")]
#[command(about = "Headless frame runner and scene tools for Cinder", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a scene headlessly for a number of frames
    Run {
        /// Path to scene file
        scene: PathBuf,

        /// Frames to render
        #[arg(long, default_value = "60")]
        frames: u64,

        /// Engine config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run the editor pass
        #[arg(long)]
        editor: bool,

        /// Draw the main pass in wireframe
        #[arg(long)]
        wireframe: bool,
    },

    /// Print a scene's entity hierarchy and components
    Inspect {
        /// Path to scene file
        scene: PathBuf,
    },

    /// Load a scene and write it back out
    Resave {
        /// Path to scene file
        scene: PathBuf,

        /// Output path
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scene,
            frames,
            config,
            editor,
            wireframe,
        } => run::run(run::RunArgs {
            scene,
            frames,
            config,
            editor,
            wireframe,
        }),
        Commands::Inspect { scene } => inspect::run(&scene),
        Commands::Resave { scene, out } => resave::run(&scene, &out),
    }
}
