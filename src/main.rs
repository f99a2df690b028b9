// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tiltcam::FilterKind;
use tiltcam::ViewMode;

mod cli;

#[derive(Parser)]
#[command(name = "tiltcam")]
#[command(about = "Record color + depth and re-render it with a depth-driven focus effect")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a clip from the synthetic capture source
    Record {
        /// Recording duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,

        /// Output file path (default: ~/.cache/tiltcam/video.mov)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Record a clip, then export it through the effect
    Demo {
        /// Recording duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,

        /// Effect to apply (blur, color, frozen)
        #[arg(short, long, default_value = "color")]
        filter: FilterKind,

        /// What to render (effect, depth, mask, video)
        #[arg(short, long, default_value = "effect")]
        view: ViewMode,

        /// Export file path (default: ~/.cache/tiltcam/exported-video.mov)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Turn a grayscale depth image into a focus mask image
    Mask {
        /// Depth image (bright = near)
        depth: PathBuf,

        #[command(flatten)]
        mask: cli::MaskArgs,

        /// Output file path (default: ~/.cache/tiltcam/mask_TIMESTAMP.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply an effect to a color image using a depth image
    Render {
        /// Color image
        color: PathBuf,

        /// Depth image (bright = near)
        depth: PathBuf,

        /// Effect to apply (blur, color, frozen)
        #[arg(short, long, default_value = "color")]
        filter: FilterKind,

        #[command(flatten)]
        mask: cli::MaskArgs,

        /// Output file path (default: ~/.cache/tiltcam/render_TIMESTAMP.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control log level, e.g. RUST_LOG=tiltcam=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = tiltcam::Config::load()?;

    match cli.command {
        Commands::Record { duration, output } => cli::record(&config, duration, output).map(|_| ()),
        Commands::Demo {
            duration,
            filter,
            view,
            output,
        } => cli::demo(&config, duration, filter, view, output),
        Commands::Mask { depth, mask, output } => cli::mask_image(&config, depth, mask, output),
        Commands::Render {
            color,
            depth,
            filter,
            mask,
            output,
        } => cli::render_image(&config, color, depth, filter, mask, output),
    }
}
