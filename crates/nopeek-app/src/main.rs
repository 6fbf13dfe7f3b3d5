// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// NoPeek — Privacy sanitizer for photos
//
// Entry point. Initialises logging and backend services, then runs one CLI
// command.

mod services;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nopeek_core::error::Result;
use nopeek_core::identity::ImageExtension;
use nopeek_core::types::{FaceMaskStyle, SensitiveKind};

use services::app_services::{AppServices, SanitizeOptions, describe_filename};

#[derive(Parser)]
#[command(name = "nopeek")]
#[command(version)]
#[command(about = "NoPeek - strip metadata, faces and sensitive details from photos")]
struct Cli {
    /// Data directory (defaults to $XDG_DATA_HOME/nopeek)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Processing service URL for this run
    #[arg(long, global = true)]
    service_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sanitize a photo and store the original/sanitized pair
    Sanitize {
        /// Photo to sanitize
        path: PathBuf,

        /// Skip face detection entirely
        #[arg(long)]
        skip_faces: bool,

        /// Mask detected faces: blur, sticker or cartoon
        #[arg(long, conflicts_with = "skip_faces")]
        face_style: Option<FaceMaskStyle>,

        /// Categories to mask (comma separated): license_plate, document_file
        #[arg(long, value_delimiter = ',')]
        mask: Vec<SensitiveKind>,

        /// Do not mask any sensitive category
        #[arg(long, conflicts_with = "mask")]
        no_mask: bool,

        /// Write a PNG with detected faces outlined
        #[arg(long, conflicts_with = "skip_faces")]
        preview: Option<PathBuf>,
    },

    /// List stored image pairs
    Gallery,

    /// Delete an image pair by its base token
    Delete {
        /// Base token shared by the pair
        base: String,
    },

    /// Decode what a stored filename says was done to the image
    Inspect {
        /// Filename, e.g. 3k9x..._eelp.jpg
        filename: String,
    },

    /// Show or change persisted settings
    Config {
        /// Default processing service URL
        #[arg(long = "set-service-url")]
        set_service_url: Option<String>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Extension for saved images: jpg, jpeg, png or gif
        #[arg(long)]
        extension: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("NoPeek starting");

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Inspect { filename } = &cli.command {
        print!("{}", describe_filename(filename)?);
        return Ok(());
    }

    let svc = AppServices::init(cli.data_dir, cli.service_url)?;

    match cli.command {
        Commands::Sanitize {
            path,
            skip_faces,
            face_style,
            mask,
            no_mask,
            preview,
        } => {
            let options = SanitizeOptions {
                skip_faces,
                face_style,
                mask: if no_mask {
                    Some(Vec::new())
                } else if mask.is_empty() {
                    None
                } else {
                    Some(mask)
                },
                preview,
            };
            let done = svc.sanitize(&path, &options).await?;
            println!("saved as {}", done.filename);
            if !done.saved {
                println!("warning: the sanitized image could not be stored");
            }
        }

        Commands::Gallery => {
            let entries = svc.gallery().await?;
            if entries.is_empty() {
                println!("No sanitized images yet.");
            }
            for entry in entries {
                println!(
                    "{}  {}x{}  {} -> {}",
                    entry.pair.base,
                    entry.original.width,
                    entry.original.height,
                    entry.pair.original,
                    entry.pair.sanitized
                );
            }
        }

        Commands::Delete { base } => {
            let removed = svc.delete_pair(&base).await?;
            println!("removed {removed} file(s)");
        }

        Commands::Config {
            set_service_url,
            timeout_secs,
            extension,
        } => {
            let mut config = svc.config();
            let changed = set_service_url.is_some() || timeout_secs.is_some() || extension.is_some();
            if let Some(url) = set_service_url {
                config.service_url = url;
            }
            if let Some(secs) = timeout_secs {
                config.request_timeout_secs = secs;
            }
            if let Some(ext) = extension {
                config.image_extension = ImageExtension::from_extension(&ext).ok_or_else(|| {
                    nopeek_core::NoPeekError::UnknownOption(format!("image extension '{ext}'"))
                })?;
            }
            if changed {
                svc.save_config(&config)?;
                tracing::info!("config updated");
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!("data dir: {}", svc.data_dir().display());
        }

        Commands::Inspect { .. } => {}
    }

    Ok(())
}
