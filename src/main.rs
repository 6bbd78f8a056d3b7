//! filesplit - Parallel file splitter
//!
//! Usage:
//!   filesplit split <file>         - Split a file into parts and write a manifest
//!   filesplit verify <manifest>    - Check parts against a manifest

use clap::{Parser, Subcommand};
use filesplit::{config::SplitConfig, Error, Manifest, Result, SplitJob, Splitter};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "filesplit")]
#[command(author = "filesplit Contributors")]
#[command(version)]
#[command(about = "Split a file into verified parts")]
struct Cli {
    /// Configuration file path (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a file into parts
    Split {
        /// File to split
        file: PathBuf,

        /// Block size in bytes
        #[arg(short, long)]
        block_size: Option<u64>,

        /// Parallel workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Skip digest verification
        #[arg(long)]
        no_check: bool,

        /// Folder for the part files and manifest
        #[arg(short, long)]
        folder: Option<PathBuf>,
    },

    /// Verify parts against a manifest
    Verify {
        /// Manifest file
        manifest: PathBuf,

        /// Folder holding the parts (defaults to the manifest's folder)
        #[arg(short, long)]
        folder: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("filesplit={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Err(e) = run_command(cli.command, cli.config.as_deref()) {
        error!(stage = ?e.stage(), "Error: {}", e);
        std::process::exit(1);
    }
}

fn run_command(command: Commands, config_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::Split {
            file,
            block_size,
            workers,
            no_check,
            folder,
        } => {
            let mut config = match config_path {
                Some(path) => SplitConfig::load(expand_tilde(path))?,
                None => {
                    let mut config = SplitConfig::default();
                    config.apply_env_overrides();
                    config
                }
            };
            config.source = expand_tilde(&file);
            if let Some(size) = block_size {
                config.block_size = size;
            }
            if let Some(n) = workers {
                config.workers = n;
            }
            if no_check {
                config.verify = false;
            }
            if let Some(dir) = folder {
                config.output_dir = expand_tilde(&dir);
            }

            cmd_split(&config)
        }

        Commands::Verify { manifest, folder } => {
            cmd_verify(&expand_tilde(&manifest), folder.as_deref())
        }
    }
}

fn cmd_split(config: &SplitConfig) -> Result<()> {
    let job = SplitJob::prepare(config)?;
    let splitter = Splitter::new(job);

    let runtime = tokio::runtime::Runtime::new().map_err(|e| Error::Internal(e.to_string()))?;
    let outcome = runtime.block_on(splitter.split())?;

    let manifest = Manifest::build(splitter.job(), &outcome);
    let path = manifest.write_to(splitter.job().output_dir())?;

    println!("{}", manifest.original_file_name);
    for part in &manifest.parts {
        println!("  {}", part.file_name);
    }
    info!("Manifest: {}", path.display());

    Ok(())
}

fn cmd_verify(manifest_path: &Path, folder: Option<&Path>) -> Result<()> {
    let manifest = Manifest::load(manifest_path)?;
    let dir = match folder {
        Some(dir) => expand_tilde(dir),
        None => manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    info!(
        "Verifying {} parts of {}",
        manifest.part_count(),
        manifest.original_file_name
    );
    manifest.verify(&dir)?;

    if manifest.has_file_hash() {
        println!("OK: {} ({} parts)", manifest.original_file_name, manifest.part_count());
    } else {
        println!(
            "OK: {} ({} parts, no whole-file digest recorded)",
            manifest.original_file_name,
            manifest.part_count()
        );
    }

    Ok(())
}

/// Expand ~ to home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
