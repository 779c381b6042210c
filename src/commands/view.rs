use anyhow::{Context, Result};
use std::io::BufRead;

use crate::acquisition::Acquirer;
use crate::archive::{Archive, MastClient};
use crate::cache::CacheManager;
use crate::config::{FigureOutput, RunArgs, RunConfig};
use crate::detection::{detect, format_source_table, run_chunked_detection};
use crate::error::ArchiveError;
use crate::image::{SkyImage, SCIENCE_HDU};
use crate::render::{comparison_figure, detection_figure, Figure};
use crate::targets::{prompt_for_target, Target};
use crate::viewer::run_viewer;

const TABLE_ROWS: usize = 10;

pub async fn view(args: &RunArgs) -> Result<()> {
    let stdin = std::io::stdin();
    view_with(args, |config| MastClient::new(config.request_timeout), &mut stdin.lock()).await
}

/// The full pipeline with an injectable archive. The configuration is
/// validated before `connect` runs or the cache is touched.
pub async fn view_with<A, F, R>(args: &RunArgs, connect: F, input: &mut R) -> Result<()>
where
    A: Archive,
    F: FnOnce(&RunConfig) -> Result<A, ArchiveError>,
    R: BufRead,
{
    let config = RunConfig::from_args(args)?;
    let target = resolve_target(&config, input)?;

    let archive = connect(&config).context("Failed to create archive client")?;
    let cache = CacheManager::new(&config.cache_dir);
    let acquirer = Acquirer::new(&archive, &cache, &config.acquisition);
    let fits_path = acquirer.acquire(target.name).await?;

    println!("\nReading FITS file...");
    let image = SkyImage::from_file(&fits_path, SCIENCE_HDU)
        .with_context(|| format!("Failed to load image from {}", fits_path.display()))?;

    let stats = image.statistics();
    println!(
        "Image {}x{} ({}): min {:.4}, max {:.4}, median {:.4}, std {:.4}",
        stats.width,
        stats.height,
        image.extname.as_deref().unwrap_or("HDU 1"),
        stats.min,
        stats.max,
        stats.median,
        stats.std_dev
    );
    if let Some(wcs) = image.wcs.as_ref() {
        let center = wcs.pixel_to_world(
            (image.width as f64 - 1.0) / 2.0,
            (image.height as f64 - 1.0) / 2.0,
        );
        println!(
            "Center {} at {:.4}\"/px",
            center.to_hms_dms(),
            wcs.pixel_scale_arcsec()
        );
    }

    let mut figures = vec![comparison_figure(&image, target.name, &config.render)];

    let detection = if config.perform_detection {
        println!("\nPerforming source detection...");
        match detect(&image, &config.detection) {
            Some(result) => {
                println!("Detected {} sources.", result.catalog.len());
                if !result.catalog.is_empty() {
                    println!("\nBrightest sources:");
                    print!("{}", format_source_table(&result.catalog, TABLE_ROWS));
                }
                if config.chunked_detection {
                    run_chunked_detection(&image, &result, &config.detection)?;
                }
                figures.push(detection_figure(&image, &result, &config.render));
                Some(result)
            }
            None => {
                println!("No finite pixels; skipping source detection.");
                None
            }
        }
    } else {
        println!("Skipping source detection...");
        None
    };

    present(&figures, &config.output).await?;

    if let Some(result) = detection {
        drop(result);
        tracing::debug!("Released detection results");
    }
    drop(figures);
    drop(image);
    tracing::debug!("Released image data");

    Ok(())
}

fn resolve_target<R: BufRead>(config: &RunConfig, input: &mut R) -> Result<&'static Target> {
    match config.target {
        Some(target) => Ok(target),
        None => prompt_for_target(input, &mut std::io::stdout()),
    }
}

/// Deliver rendered figures to the configured output
pub async fn present(figures: &[Figure], output: &FigureOutput) -> Result<()> {
    match output {
        FigureOutput::Viewer { host, port } => run_viewer(figures, host, *port).await,
        FigureOutput::Directory(dir) => {
            for figure in figures {
                let path = figure.save(dir)?;
                println!("Saved {}: {}", figure.title, path.display());
            }
            Ok(())
        }
        FigureOutput::None => {
            tracing::info!("Discarding {} rendered figure(s)", figures.len());
            Ok(())
        }
    }
}
