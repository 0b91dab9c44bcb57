//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence over the configured level. When
//! `numbers_file` is set, every unique number is also appended to that file,
//! one per line.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};
use uniqnum_core::config::{LogFormat, LoggingConfig};

use crate::handler::NUMBERS_TARGET;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber described by `config`
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let mut layers: Vec<BoxedLayer> = vec![console_layer(config)?];

    if let Some(path) = &config.numbers_file {
        layers.push(numbers_file_layer(path)?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

/// Layer appending the value of every unique number to `path`, one per line
fn numbers_file_layer(path: &Path) -> Result<BoxedLayer> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open numbers file: {}", path.display()))?;

    Ok(fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_filter(Targets::new().with_target(NUMBERS_TARGET, Level::INFO))
        .boxed())
}

fn console_layer(config: &LoggingConfig) -> Result<BoxedLayer> {
    let level = config.parse_level()?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let layer: BoxedLayer = match (config.format, config.timestamps) {
        (LogFormat::Json, true) => fmt::layer().json().with_filter(filter).boxed(),
        (LogFormat::Json, false) => fmt::layer().json().without_time().with_filter(filter).boxed(),
        (LogFormat::Text, true) => fmt::layer().with_target(true).with_filter(filter).boxed(),
        (LogFormat::Text, false) => fmt::layer()
            .with_target(true)
            .without_time()
            .with_filter(filter)
            .boxed(),
    };

    Ok(layer)
}
