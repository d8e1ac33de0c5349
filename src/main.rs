use anyhow::Context;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

use waveform_parser::constants::{DEFAULT_SAVE_DIR, DIAGNOSTIC_LOG_FILE};
use waveform_parser::{logging, Config, Pipeline};

#[derive(Parser, Debug)]
#[command(name = "waveform_parser")]
#[command(about = "Decode exported waveform records into one signal CSV per record")]
#[command(version)]
struct Cli {
    /// Tabular export with subject_id, measured_datetime and waveform_raw columns
    source: Option<PathBuf>,

    /// Directory that receives the per-record CSV files
    #[arg(short = 'o', long)]
    save_dir: Option<PathBuf>,

    /// Rows read into memory at a time
    #[arg(short = 'c', long)]
    chunk_size: Option<usize>,

    /// TOML file providing source_path, save_dir and chunk_size
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// Command line values take precedence over the config file.
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load config '{}'", path.display()))?,
            None => {
                let source = self
                    .source
                    .clone()
                    .context("a SOURCE path or --config file is required")?;
                Config::new(source, DEFAULT_SAVE_DIR)
            }
        };

        if let Some(source) = self.source {
            config.source_path = source;
        }
        if let Some(save_dir) = self.save_dir {
            config.save_dir = save_dir;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _guard = logging::init_logging();

    let config = Cli::parse().into_config()?;

    fs::create_dir_all(&config.save_dir).with_context(|| {
        format!(
            "failed to create output directory '{}'",
            config.save_dir.display()
        )
    })?;

    println!("🔄 Decoding {}...", config.source_path.display());
    let source = config.source_path.clone();
    let mut pipeline = Pipeline::new(config)?;
    let result = match pipeline.run() {
        Ok(result) => result,
        Err(e) => {
            error!("Decoding failed: {}", e);
            return Err(e).with_context(|| format!("failed to decode '{}'", source.display()));
        }
    };

    info!("Pipeline finished");
    println!("\n📊 Results for {}:", source.display());
    println!("   Rows: {}", result.total_rows);
    println!("   Written: {}", result.written_rows);
    println!("   Skipped: {}", result.skipped_rows);
    println!("   Failed: {}", result.failed_rows);
    println!("   Chunks: {}", result.chunks);
    if result.failed_rows > 0 {
        println!(
            "\n⚠️  {} rows failed, see {}",
            result.failed_rows,
            DIAGNOSTIC_LOG_FILE
        );
    }

    Ok(())
}
