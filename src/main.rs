use std::fs;
use std::time::Instant;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use inpaint_data_rs::imageops::convert;
use inpaint_data_rs::{Config, Dataset};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::parse();
    ensure!(config.data_dir.exists(), "Data directory does not exist");

    let dataset = Dataset::new(&config);
    ensure!(!dataset.is_empty(), "No images resolved from the image list");

    if let Some(batches) = config.stream_batches {
        return run_stream(&dataset, &config, batches);
    }

    let total = config.limit.unwrap_or(usize::MAX).min(dataset.len());
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;

    let progress_bar = ProgressBar::new(total as u64);
    progress_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec} {eta})",
        )?
        .progress_chars("#>-"),
    );

    (0..total)
        .into_par_iter()
        .progress_with(progress_bar.clone())
        .try_for_each(|index| dump_sample(&dataset, &config, index))?;

    progress_bar.finish();
    if dataset.fallback_count() > 0 {
        eprintln!(
            "{} sample(s) fell back to index 0, check the logs",
            dataset.fallback_count()
        );
    }

    Ok(())
}

/// Pull batches through the stream iterator and report throughput.
fn run_stream(dataset: &Dataset, config: &Config, batches: usize) -> Result<()> {
    ensure!(
        config.batch_size > 0 && dataset.len() >= config.batch_size,
        "Dataset is smaller than a single batch"
    );

    let start = Instant::now();
    let mut samples = 0usize;
    for batch in dataset.stream(config.batch_size).take(batches) {
        samples += batch?.len();
    }
    let elapsed = start.elapsed();
    println!(
        "{samples} samples in {elapsed:.2?} ({:.1} samples/s)",
        samples as f64 / elapsed.as_secs_f64()
    );

    Ok(())
}

/// Write the four planes of one sample as PNGs under the output directory.
fn dump_sample(dataset: &Dataset, config: &Config, index: usize) -> Result<()> {
    let sample = dataset
        .sample(index)
        .with_context(|| format!("Failed to build sample {index}"))?;

    let stem = dataset
        .name(index)
        .and_then(|name| std::path::Path::new(name).file_stem()?.to_str())
        .unwrap_or("sample");
    let target = |plane: &str| config.output_dir.join(format!("{index:06}_{stem}_{plane}.png"));

    convert::tensor_to_image(&sample.image).save(target("image"))?;
    convert::plane_to_image(&sample.grayscale).save(target("gray"))?;
    convert::plane_to_image(&sample.edge).save(target("edge"))?;
    convert::plane_to_image(&sample.mask).save(target("mask"))?;

    Ok(())
}
