use anyhow::{Context, Result};
use rayon::prelude::*;

use super::segmentation::{detect_sources, SegmentationImage};
use super::threshold::Threshold;

pub const CHUNK_COUNT: usize = 4;
pub const WORKER_COUNT: usize = 4;

/// Segmentation of one horizontal band of the image
#[derive(Debug)]
pub struct ChunkResult {
    pub index: usize,
    pub row_start: usize,
    pub rows: usize,
    pub segmentation: SegmentationImage,
}

/// Row ranges for `n` nearly equal bands; the first `height % n` bands get
/// one extra row.
pub fn chunk_rows(height: usize, n: usize) -> Vec<(usize, usize)> {
    let n = n.max(1);
    let base = height / n;
    let extra = height % n;

    let mut ranges = Vec::with_capacity(n);
    let mut start = 0;
    for i in 0..n {
        let rows = base + usize::from(i < extra);
        ranges.push((start, rows));
        start += rows;
    }
    ranges
}

/// Run source detection on row bands in parallel with the global threshold.
/// Results come back in band order.
pub fn detect_sources_chunked(
    data: &[f32],
    width: usize,
    height: usize,
    threshold: &Threshold,
    npixels: usize,
) -> Result<Vec<ChunkResult>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(WORKER_COUNT)
        .build()
        .context("Failed to build detection thread pool")?;

    let ranges = chunk_rows(height, CHUNK_COUNT);
    let results = pool.install(|| {
        ranges
            .par_iter()
            .enumerate()
            .map(|(index, &(row_start, rows))| {
                let band = &data[row_start * width..(row_start + rows) * width];
                let segmentation = detect_sources(band, width, rows, threshold, npixels);
                tracing::debug!(
                    "Chunk {} (rows {}..{}) found {} sources",
                    index,
                    row_start,
                    row_start + rows,
                    segmentation.nlabels
                );
                ChunkResult {
                    index,
                    row_start,
                    rows,
                    segmentation,
                }
            })
            .collect()
    });

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_rows_match_array_split() {
        assert_eq!(chunk_rows(10, 4), vec![(0, 3), (3, 3), (6, 2), (8, 2)]);
        assert_eq!(chunk_rows(8, 4), vec![(0, 2), (2, 2), (4, 2), (6, 2)]);
        assert_eq!(chunk_rows(2, 4), vec![(0, 1), (1, 1), (2, 0), (2, 0)]);
    }

    #[test]
    fn test_chunks_are_returned_in_order() {
        let width = 6;
        let height = 12;
        let mut data = vec![0.0f32; width * height];
        // One 2x2 blob in the middle of each band
        for band in 0..4 {
            let y = band * 3 + 1;
            for (dx, dy) in [(2, 0), (3, 0), (2, 1), (3, 1)] {
                data[(y + dy) * width + dx] = 50.0;
            }
        }
        let threshold = Threshold::new(0.0, 1.0, 3.0);

        let results = detect_sources_chunked(&data, width, height, &threshold, 4).unwrap();
        assert_eq!(results.len(), 4);
        for (i, chunk) in results.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.row_start, i * 3);
            assert_eq!(chunk.segmentation.nlabels, 1);
        }
    }
}
