//! Threshold segmentation source detection.
//!
//! 1. Sigma-clipped background and noise give a flat detection threshold.
//! 2. Pixels above it are grouped into 8-connected segments.
//! 3. Segments with enough pixels are measured into a source catalog.

pub mod catalog;
pub mod chunked;
pub mod segmentation;
pub mod threshold;

use anyhow::Result;

use crate::image::SkyImage;
pub use catalog::{format_source_table, SourceCatalog, SourceRecord};
pub use chunked::{detect_sources_chunked, ChunkResult};
pub use segmentation::{detect_sources, SegmentationImage};
pub use threshold::{detect_threshold, sigma_clipped_stats, Threshold};

#[derive(Debug, Clone)]
pub struct DetectionParams {
    /// Threshold in units of background noise
    pub nsigma: f64,
    /// Minimum connected pixels per source
    pub npixels: usize,
    /// Clipping limit for background statistics
    pub sigma_clip: f64,
    pub maxiters: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            nsigma: 3.0,
            npixels: 10,
            sigma_clip: 3.0,
            maxiters: 10,
        }
    }
}

#[derive(Debug)]
pub struct DetectionResult {
    pub threshold: Threshold,
    pub segmentation: SegmentationImage,
    pub catalog: SourceCatalog,
}

/// Full-image detection. `None` when the image has no finite pixels.
pub fn detect(image: &SkyImage, params: &DetectionParams) -> Option<DetectionResult> {
    let threshold = detect_threshold(&image.data, params.nsigma, params.sigma_clip, params.maxiters)?;
    let segmentation = detect_sources(
        &image.data,
        image.width,
        image.height,
        &threshold,
        params.npixels,
    );
    let catalog = SourceCatalog::new(&image.data, &segmentation, image.wcs.as_ref());

    tracing::info!(
        "Detected {} sources above {:.4} (background {:.4}, noise {:.4})",
        catalog.len(),
        threshold.level(),
        threshold.background,
        threshold.noise
    );

    Some(DetectionResult {
        threshold,
        segmentation,
        catalog,
    })
}

/// Chunked detection with the global threshold. The per-chunk results are
/// only logged; the full-image catalog stays authoritative.
pub fn run_chunked_detection(image: &SkyImage, result: &DetectionResult, params: &DetectionParams) -> Result<()> {
    let chunks = detect_sources_chunked(
        &image.data,
        image.width,
        image.height,
        &result.threshold,
        params.npixels,
    )?;

    let total: u32 = chunks.iter().map(|c| c.segmentation.nlabels).sum();
    for chunk in &chunks {
        tracing::info!(
            "Chunk {}: rows {}..{}, {} sources",
            chunk.index,
            chunk.row_start,
            chunk.row_start + chunk.rows,
            chunk.segmentation.nlabels
        );
    }
    tracing::info!(
        "Chunked detection found {} sources across {} chunks (full image: {})",
        total,
        chunks.len(),
        result.catalog.len()
    );

    drop(chunks);
    tracing::debug!("Released chunked detection results");
    Ok(())
}
