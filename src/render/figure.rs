use anyhow::{Context, Result};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder, Rgb, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
pub const FOREGROUND: Rgb<u8> = Rgb([0, 0, 0]);

/// A rendered figure, ready to encode
pub struct Figure {
    /// File stem and viewer key
    pub name: String,
    pub title: String,
    pub canvas: RgbImage,
}

impl Figure {
    pub fn new(name: impl Into<String>, title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            canvas: RgbImage::from_pixel(width, height, BACKGROUND),
        }
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    /// Encode to an in-memory PNG
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut buffer, CompressionType::Fast, FilterType::Adaptive);
        encoder
            .write_image(
                &self.canvas,
                self.canvas.width(),
                self.canvas.height(),
                ColorType::Rgb8.into(),
            )
            .with_context(|| format!("Failed to encode figure '{}' as PNG", self.name))?;
        Ok(buffer)
    }

    /// Write `<dir>/<name>.png`
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        let output_path = dir.join(format!("{}.png", self.name));

        let file = File::create(&output_path)
            .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;
        let writer = BufWriter::new(file);

        let encoder = PngEncoder::new_with_quality(writer, CompressionType::Best, FilterType::Adaptive);
        encoder
            .write_image(
                &self.canvas,
                self.canvas.width(),
                self.canvas.height(),
                ColorType::Rgb8.into(),
            )
            .with_context(|| format!("Failed to write PNG image to {}", output_path.display()))?;

        Ok(output_path)
    }
}
