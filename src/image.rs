use anyhow::{Context, Result};
use bumpalo::Bump;
use fitrs::{Fits, FitsData, Hdu, HeaderValue};
use std::path::Path;

use crate::wcs::{HeaderLookup, Wcs};

/// HDU holding science pixels and WCS in calibrated JWST products
pub const SCIENCE_HDU: usize = 1;

#[derive(Debug, Clone)]
pub struct ImageStatistics {
    pub width: usize,
    pub height: usize,
    pub finite_pixels: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// A 2D image in FITS order (row 0 is the bottom row) plus its WCS
pub struct SkyImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
    pub wcs: Option<Wcs>,
    pub extname: Option<String>,
}

impl HeaderLookup for Hdu {
    fn real(&self, key: &str) -> Option<f64> {
        match self.value(key)? {
            HeaderValue::IntegerNumber(n) => Some(*n as f64),
            HeaderValue::RealFloatingNumber(f) => Some(*f),
            HeaderValue::CharacterString(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn text(&self, key: &str) -> Option<String> {
        match self.value(key)? {
            HeaderValue::CharacterString(s) => Some(s.trim().to_string()),
            _ => None,
        }
    }
}

fn required_int(hdu: &Hdu, key: &str) -> Result<usize> {
    match hdu.value(key) {
        Some(HeaderValue::IntegerNumber(n)) if *n >= 0 => Ok(*n as usize),
        Some(_) => Err(anyhow::anyhow!("{} is not a non-negative integer", key)),
        None => Err(anyhow::anyhow!("Missing {} header", key)),
    }
}

impl SkyImage {
    /// Load pixels and WCS from the given HDU using fitrs
    pub fn from_file(path: &Path, hdu_index: usize) -> Result<Self> {
        let fits = Fits::open(path)
            .with_context(|| format!("Failed to open FITS file: {}", path.display()))?;

        let hdu = fits
            .get(hdu_index)
            .ok_or_else(|| anyhow::anyhow!("No HDU {} in {}", hdu_index, path.display()))?;
        let hdu: &Hdu = &hdu;

        let naxis = required_int(hdu, "NAXIS")?;
        if naxis < 2 {
            return Err(anyhow::anyhow!(
                "HDU {} does not contain 2D image data (NAXIS={})",
                hdu_index,
                naxis
            ));
        }
        let width = required_int(hdu, "NAXIS1")?;
        let height = required_int(hdu, "NAXIS2")?;

        let bzero = hdu.real("BZERO").unwrap_or(0.0);
        let bscale = hdu.real("BSCALE").unwrap_or(1.0);
        let scale = |v: f64| (v * bscale + bzero) as f32;

        let mut data: Vec<f32> = match hdu.read_data() {
            FitsData::Characters(_) => {
                return Err(anyhow::anyhow!("HDU {} contains character data, not an image", hdu_index));
            }
            FitsData::IntegersI32(array) => array
                .data
                .iter()
                .map(|&v| v.map(|n| scale(n as f64)).unwrap_or(f32::NAN))
                .collect(),
            FitsData::IntegersU32(array) => array
                .data
                .iter()
                .map(|&v| v.map(|n| scale(n as f64)).unwrap_or(f32::NAN))
                .collect(),
            FitsData::FloatingPoint32(array) => {
                array.data.iter().map(|&v| scale(v as f64)).collect()
            }
            FitsData::FloatingPoint64(array) => array.data.iter().map(|&v| scale(v)).collect(),
        };

        let plane = width * height;
        if data.len() < plane {
            return Err(anyhow::anyhow!(
                "Data size mismatch: expected {} pixels, got {}",
                plane,
                data.len()
            ));
        }
        if data.len() > plane {
            tracing::warn!("HDU {} has {} axes, using the first plane", hdu_index, naxis);
            data.truncate(plane);
        }

        let wcs = Wcs::from_header(hdu);
        if wcs.is_none() {
            tracing::warn!("No celestial WCS in HDU {}, sky coordinates unavailable", hdu_index);
        }

        Ok(Self {
            width,
            height,
            data,
            wcs,
            extname: hdu.text("EXTNAME"),
        })
    }

    pub fn from_pixels(width: usize, height: usize, data: Vec<f32>, wcs: Option<Wcs>) -> Result<Self> {
        if data.len() != width * height {
            return Err(anyhow::anyhow!(
                "Data size mismatch: expected {} pixels, got {}",
                width * height,
                data.len()
            ));
        }
        Ok(Self {
            width,
            height,
            data,
            wcs,
            extname: None,
        })
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    pub fn statistics(&self) -> ImageStatistics {
        // Use arena for temporary allocation
        let arena = Bump::new();
        let mut sorted = bumpalo::vec![in &arena];
        sorted.extend(self.data.iter().copied().filter(|v| v.is_finite()));
        sorted.sort_unstable_by(|a: &f32, b: &f32| a.total_cmp(b));

        let n = sorted.len();
        if n == 0 {
            return ImageStatistics {
                width: self.width,
                height: self.height,
                finite_pixels: 0,
                mean: f64::NAN,
                median: f64::NAN,
                std_dev: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
            };
        }

        let mean = sorted.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
        let variance = sorted.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0
        } else {
            sorted[n / 2] as f64
        };

        ImageStatistics {
            width: self.width,
            height: self.height,
            finite_pixels: n,
            mean,
            median,
            std_dev: variance.sqrt(),
            min: sorted[0] as f64,
            max: sorted[n - 1] as f64,
        }
    }
}
