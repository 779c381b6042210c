use std::collections::VecDeque;

use super::threshold::Threshold;

/// Label map: 0 is background, sources are 1..=nlabels
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationImage {
    pub width: usize,
    pub height: usize,
    pub labels: Vec<u32>,
    pub nlabels: u32,
}

impl SegmentationImage {
    #[inline]
    pub fn label(&self, x: usize, y: usize) -> u32 {
        self.labels[y * self.width + x]
    }

    /// Pixel count per label, indexed by label (entry 0 is background)
    pub fn areas(&self) -> Vec<usize> {
        let mut areas = vec![0usize; self.nlabels as usize + 1];
        for &label in &self.labels {
            areas[label as usize] += 1;
        }
        areas
    }
}

const NEIGHBORS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Label 8-connected regions of finite pixels strictly above the threshold.
///
/// Regions smaller than `npixels` are dropped. Surviving regions are
/// numbered consecutively in raster order of their first pixel.
pub fn detect_sources(
    data: &[f32],
    width: usize,
    height: usize,
    threshold: &Threshold,
    npixels: usize,
) -> SegmentationImage {
    debug_assert_eq!(data.len(), width * height);

    let above = |i: usize| {
        let v = data[i];
        v.is_finite() && v as f64 > threshold.at(i)
    };

    let mut labels = vec![0u32; data.len()];
    let mut nlabels = 0u32;
    let mut queue = VecDeque::new();
    let mut region = Vec::new();

    for start in 0..data.len() {
        if labels[start] != 0 || !above(start) {
            continue;
        }

        // Flood fill with a provisional label
        let provisional = nlabels + 1;
        labels[start] = provisional;
        queue.push_back(start);
        region.clear();

        while let Some(index) = queue.pop_front() {
            region.push(index);
            let x = (index % width) as isize;
            let y = (index / width) as isize;

            for (dx, dy) in NEIGHBORS {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                    continue;
                }
                let neighbor = ny as usize * width + nx as usize;
                if labels[neighbor] == 0 && above(neighbor) {
                    labels[neighbor] = provisional;
                    queue.push_back(neighbor);
                }
            }
        }

        if region.len() >= npixels {
            nlabels = provisional;
        } else {
            // Too small; mark as visited background so it is not revisited
            for &index in &region {
                labels[index] = u32::MAX;
            }
        }
    }

    for label in labels.iter_mut() {
        if *label == u32::MAX {
            *label = 0;
        }
    }

    SegmentationImage {
        width,
        height,
        labels,
        nlabels,
    }
}
