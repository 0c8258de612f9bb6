use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use rembg_batch::{Config, ImageProcessor, Session};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::parse();

    ensure!(
        config.input_dir.is_dir(),
        "Input directory does not exist: {}",
        config.input_dir.display()
    );

    let session = Session::new(&config)
        .with_context(|| format!("Failed to load model `{}`", config.model_name))?;

    let summary = ImageProcessor::new(session, config)
        .process_directory()
        .context("Batch run aborted")?;

    if summary.skipped_raw > 0 {
        warn!(count = summary.skipped_raw, "camera raw files were skipped");
    }

    Ok(())
}
