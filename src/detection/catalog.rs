//! Per-source properties measured from a segmentation map.
//!
//! Centroids and shapes come from intensity-weighted image moments over the
//! pixels of each segment. Coordinates are zero-based pixel positions.

use super::segmentation::SegmentationImage;
use crate::wcs::{SkyCoord, Wcs};

#[derive(Debug, Clone)]
pub struct BoundingBox {
    pub ixmin: usize,
    pub ixmax: usize,
    pub iymin: usize,
    pub iymax: usize,
}

#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub label: u32,
    pub xcentroid: f64,
    pub ycentroid: f64,
    pub sky_centroid: Option<SkyCoord>,
    pub bbox: BoundingBox,
    /// Number of pixels in the segment
    pub area: usize,
    /// Sum of pixel values in the segment
    pub segment_flux: f64,
    pub max_value: f64,
    /// 1-sigma extent along the major axis, in pixels
    pub semimajor_sigma: f64,
    pub semiminor_sigma: f64,
    /// Major axis angle from +x, counter-clockwise, in degrees
    pub orientation: f64,
    pub eccentricity: f64,
}

#[derive(Debug, Clone, Default)]
struct Accumulator {
    area: usize,
    flux: f64,
    max_value: f64,
    m10: f64,
    m01: f64,
    m20: f64,
    m02: f64,
    m11: f64,
    ixmin: usize,
    ixmax: usize,
    iymin: usize,
    iymax: usize,
}

impl Accumulator {
    fn add(&mut self, x: usize, y: usize, value: f64) {
        if self.area == 0 {
            self.ixmin = x;
            self.ixmax = x;
            self.iymin = y;
            self.iymax = y;
            self.max_value = value;
        } else {
            self.ixmin = self.ixmin.min(x);
            self.ixmax = self.ixmax.max(x);
            self.iymin = self.iymin.min(y);
            self.iymax = self.iymax.max(y);
            self.max_value = self.max_value.max(value);
        }
        self.area += 1;

        let (fx, fy) = (x as f64, y as f64);
        self.flux += value;
        self.m10 += fx * value;
        self.m01 += fy * value;
        self.m20 += fx * fx * value;
        self.m02 += fy * fy * value;
        self.m11 += fx * fy * value;
    }

    fn finish(&self, label: u32, wcs: Option<&Wcs>) -> SourceRecord {
        let m00 = self.flux;
        let (xc, yc) = if m00 != 0.0 {
            (self.m10 / m00, self.m01 / m00)
        } else {
            (
                (self.ixmin + self.ixmax) as f64 / 2.0,
                (self.iymin + self.iymax) as f64 / 2.0,
            )
        };

        // Central second moments normalised by flux
        let (mut cxx, mut cyy, cxy) = if m00 != 0.0 {
            (
                self.m20 / m00 - xc * xc,
                self.m02 / m00 - yc * yc,
                self.m11 / m00 - xc * yc,
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        // Single-pixel width floor for degenerate covariance
        if cxx * cyy - cxy * cxy < 1.0 / 144.0 {
            cxx += 1.0 / 12.0;
            cyy += 1.0 / 12.0;
        }

        let half_trace = (cxx + cyy) / 2.0;
        let diff = (((cxx - cyy) / 2.0).powi(2) + cxy * cxy).sqrt();
        let lambda1 = (half_trace + diff).max(0.0);
        let lambda2 = (half_trace - diff).max(0.0);

        let semimajor_sigma = lambda1.sqrt();
        let semiminor_sigma = lambda2.sqrt();
        let eccentricity = if lambda1 > 0.0 {
            (1.0 - lambda2 / lambda1).max(0.0).sqrt()
        } else {
            0.0
        };
        let orientation = 0.5 * (2.0 * cxy).atan2(cxx - cyy).to_degrees();

        SourceRecord {
            label,
            xcentroid: xc,
            ycentroid: yc,
            sky_centroid: wcs.map(|w| w.pixel_to_world(xc, yc)),
            bbox: BoundingBox {
                ixmin: self.ixmin,
                ixmax: self.ixmax,
                iymin: self.iymin,
                iymax: self.iymax,
            },
            area: self.area,
            segment_flux: m00,
            max_value: self.max_value,
            semimajor_sigma,
            semiminor_sigma,
            orientation,
            eccentricity,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceCatalog {
    /// One record per label, in label order
    pub sources: Vec<SourceRecord>,
}

impl SourceCatalog {
    pub fn new(data: &[f32], segmentation: &SegmentationImage, wcs: Option<&Wcs>) -> Self {
        let mut accumulators = vec![Accumulator::default(); segmentation.nlabels as usize];

        for (index, &label) in segmentation.labels.iter().enumerate() {
            if label == 0 {
                continue;
            }
            let x = index % segmentation.width;
            let y = index / segmentation.width;
            accumulators[label as usize - 1].add(x, y, data[index] as f64);
        }

        let sources = accumulators
            .iter()
            .enumerate()
            .map(|(i, acc)| acc.finish(i as u32 + 1, wcs))
            .collect();

        Self { sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Sources ordered by decreasing segment flux
    pub fn brightest(&self, n: usize) -> Vec<&SourceRecord> {
        let mut sorted: Vec<&SourceRecord> = self.sources.iter().collect();
        sorted.sort_by(|a, b| b.segment_flux.total_cmp(&a.segment_flux));
        sorted.truncate(n);
        sorted
    }
}

/// Text table of the brightest sources
pub fn format_source_table(catalog: &SourceCatalog, n: usize) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:>5} {:>9} {:>9} {:>6} {:>12} {:>10} {:>6} {:>24}\n",
        "label", "x", "y", "area", "flux", "max", "ecc", "sky"
    ));

    for source in catalog.brightest(n) {
        let sky = source
            .sky_centroid
            .map(|c| c.to_hms_dms())
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!(
            "{:>5} {:>9.2} {:>9.2} {:>6} {:>12.4e} {:>10.3} {:>6.3} {:>24}\n",
            source.label,
            source.xcentroid,
            source.ycentroid,
            source.area,
            source.segment_flux,
            source.max_value,
            source.eccentricity,
            sky
        ));
    }

    output
}
