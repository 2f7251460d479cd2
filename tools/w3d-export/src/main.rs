//! w3d-export - W3D inspection and conversion tool
//!
//! Reads Westwood W3D files (meshes, skeletons, HLODs, animations), checks
//! their cross-references and re-exports them in a chosen mode and
//! animation compression.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use w3d_common::{Compression, ExportMode, ExportOptions};
use w3d_export::{DEFAULT_SETTINGS_FILE, Settings, convert, describe};

#[derive(Parser)]
#[command(name = "w3d-export")]
#[command(about = "W3D inspection and conversion tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the contents of a W3D file
    Inspect {
        /// Input .w3d file
        input: PathBuf,
    },

    /// Validate a W3D file without writing anything
    Check {
        /// Input .w3d file
        input: PathBuf,

        /// Skeleton file providing the hierarchy for animation-only input
        #[arg(long)]
        skeleton: Option<PathBuf>,
    },

    /// Re-export a W3D file
    Convert {
        /// Input .w3d file
        input: PathBuf,

        /// Output .w3d file (default: <input>_<mode>.w3d)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export mode: M, S, A or HAM (overrides the settings file)
        #[arg(short, long)]
        mode: Option<ExportMode>,

        /// Animation compression: U, TC or AD (overrides the settings file)
        #[arg(short, long)]
        compression: Option<Compression>,

        /// Skeleton file providing the hierarchy for animation-only input
        #[arg(long)]
        skeleton: Option<PathBuf>,

        /// Settings file
        #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
        settings: PathBuf,

        /// Remember the effective mode and compression in the settings file
        #[arg(long)]
        save_settings: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { input } => {
            let scene = w3d_export::load_scene(&input, None)?;
            tracing::info!("Contents of {:?}:", input);
            for line in describe(&scene) {
                tracing::info!("{}", line);
            }
        }

        Commands::Check { input, skeleton } => {
            tracing::info!("Checking {:?}", input);
            let scene = w3d_export::load_scene(&input, skeleton.as_deref())?;
            scene.validate()?;
            tracing::info!("File is valid!");
        }

        Commands::Convert {
            input,
            output,
            mode,
            compression,
            skeleton,
            settings: settings_path,
            save_settings,
        } => {
            let (mut settings, found) = Settings::load(&settings_path)?;
            settings.export = ExportOptions::new(
                mode.unwrap_or(settings.export.mode),
                compression.unwrap_or(settings.export.compression),
            );

            let output = output
                .unwrap_or_else(|| w3d_export::default_output_path(&input, &settings.export));
            tracing::info!(
                "Converting {:?} -> {:?} ({} mode, {} compression)",
                input,
                output,
                settings.export.mode,
                settings.export.compression
            );
            convert(&input, &output, &settings.export, skeleton.as_deref())?;

            // Once saved, settings keep being remembered
            if save_settings || found {
                settings.save(&settings_path)?;
            }
            tracing::info!("Done!");
        }
    }

    Ok(())
}
