//! Image panels and the annotations drawn on them.
//!
//! Panels are drawn with the origin at the lower left: canvas row 0 holds
//! the last image row. Annotation positions are given in image pixels and
//! converted with the panel's display scale.

use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use super::text::{draw_text, draw_text_centered, text_width, GLYPH_HEIGHT};
use crate::colormap::{label_color, Colormap};
use crate::detection::SegmentationImage;
use crate::image::SkyImage;
use crate::normalize::ImageNormalize;
use crate::wcs::Wcs;

pub const SCALE_BAR_ARCSEC: f64 = 5.0;
const ANNOTATION: Rgb<u8> = Rgb([255, 255, 255]);

/// A rendered image plus the factor from image pixels to panel pixels
pub struct Panel {
    pub canvas: RgbImage,
    pub scale: f64,
    /// Source image height, for flipping annotation rows
    image_height: usize,
}

impl Panel {
    pub fn render(image: &SkyImage, norm: &ImageNormalize, colormap: Colormap) -> Self {
        let mut canvas = RgbImage::new(image.width as u32, image.height as u32);
        for (x, y, pixel) in canvas.enumerate_pixels_mut() {
            let row = image.height - 1 - y as usize;
            *pixel = colormap.map(norm.normalize(image.pixel(x as usize, row)));
        }
        Self {
            canvas,
            scale: 1.0,
            image_height: image.height,
        }
    }

    /// Blend segmentation label colors over the panel
    pub fn overlay_segments(&mut self, segmentation: &SegmentationImage, alpha: f64) {
        debug_assert_eq!(self.scale, 1.0, "overlay before downsampling");
        for (x, y, pixel) in self.canvas.enumerate_pixels_mut() {
            let row = segmentation.height - 1 - y as usize;
            let label = segmentation.label(x as usize, row);
            if label == 0 {
                continue;
            }
            let color = label_color(label);
            for c in 0..3 {
                let blended = alpha * color.0[c] as f64 + (1.0 - alpha) * pixel.0[c] as f64;
                pixel.0[c] = blended.round() as u8;
            }
        }
    }

    /// Shrink so neither side exceeds `max_size`
    pub fn fit_within(&mut self, max_size: u32) {
        let (w, h) = self.canvas.dimensions();
        let longest = w.max(h);
        if max_size == 0 || longest <= max_size {
            return;
        }
        let factor = max_size as f64 / longest as f64;
        let new_w = ((w as f64 * factor).round() as u32).max(1);
        let new_h = ((h as f64 * factor).round() as u32).max(1);
        tracing::debug!("Downsampling panel {}x{} -> {}x{}", w, h, new_w, new_h);
        self.canvas = imageops::resize(&self.canvas, new_w, new_h, imageops::FilterType::Triangle);
        self.scale *= factor;
    }

    /// Panel position of an image pixel coordinate
    pub fn to_display(&self, x: f64, y: f64) -> (f32, f32) {
        let dx = x * self.scale;
        let dy = (self.image_height as f64 - 1.0 - y) * self.scale;
        (dx as f32, dy as f32)
    }

    /// Angular scale bar: 10% up from the bottom, starting at 70% of the width
    pub fn draw_scale_bar(&mut self, wcs: &Wcs, image_width: usize) {
        let length_pix = (SCALE_BAR_ARCSEC / 3600.0) / wcs.pixel_scale_deg();
        let x_start = (image_width as f64 * 0.7).floor();
        let y_pos = (self.image_height as f64 * 0.1).floor();

        let (x0, y0) = self.to_display(x_start, y_pos);
        let (x1, _) = self.to_display(x_start + length_pix.floor(), y_pos);
        for offset in 0..2 {
            let y = y0 - offset as f32;
            draw_line_segment_mut(&mut self.canvas, (x0, y), (x1, y), ANNOTATION);
        }

        let label = format!("{}\"", SCALE_BAR_ARCSEC);
        let label_offset = self.image_height as f64 * 0.02 * self.scale;
        let text_y = (y0 as f64 - label_offset) as i64 - GLYPH_HEIGHT as i64;
        if text_y >= 0 {
            let center = ((x0 + x1) / 2.0).max(0.0) as u32;
            draw_text_centered(&mut self.canvas, center, text_y as u32, &label, ANNOTATION, 1);
        }
    }

    /// North and east arrows from the WCS, anchored near the upper left
    pub fn draw_compass(&mut self, wcs: &Wcs, image_width: usize) {
        let anchor_x = image_width as f64 * 0.12;
        let anchor_y = self.image_height as f64 * 0.85;
        let Some((north, east)) = wcs.compass(anchor_x, anchor_y) else {
            tracing::debug!("No compass: WCS does not project near the anchor");
            return;
        };

        let (w, h) = self.canvas.dimensions();
        let length = (w.min(h) as f32 * 0.08).max(8.0);
        let origin = self.to_display(anchor_x, anchor_y);

        for (direction, label) in [(north, "N"), (east, "E")] {
            // Image y points up; panel y points down
            let tip = (
                origin.0 + length * direction.0 as f32,
                origin.1 - length * direction.1 as f32,
            );
            draw_line_segment_mut(&mut self.canvas, origin, tip, ANNOTATION);

            let label_x = tip.0 + 4.0 * direction.0 as f32 - 2.0;
            let label_y = tip.1 - 4.0 * direction.1 as f32 - GLYPH_HEIGHT as f32 / 2.0;
            if label_x >= 0.0 && label_y >= 0.0 {
                draw_text(&mut self.canvas, label_x as u32, label_y as u32, label, ANNOTATION, 1);
            }
        }
    }
}

/// Format a colorbar tick value
pub fn format_tick(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-2..1e4).contains(&magnitude) {
        format!("{:.1e}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Vertical colorbar with ticks in data units. Returns the drawn width.
#[allow(clippy::too_many_arguments)]
pub fn draw_colorbar(
    canvas: &mut RgbImage,
    x: u32,
    y: u32,
    height: u32,
    norm: &ImageNormalize,
    colormap: Colormap,
    label: &str,
    color: Rgb<u8>,
) -> u32 {
    const BAR_WIDTH: u32 = 18;
    const TICKS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

    if height < 2 {
        return 0;
    }

    for row in 0..height {
        let t = 1.0 - row as f64 / (height - 1) as f64;
        let row_color = colormap.map(Some(t));
        for col in 0..BAR_WIDTH {
            if x + col < canvas.width() && y + row < canvas.height() {
                canvas.put_pixel(x + col, y + row, row_color);
            }
        }
    }
    draw_hollow_rect_mut(
        canvas,
        Rect::at(x as i32 - 1, y as i32 - 1).of_size(BAR_WIDTH + 2, height + 2),
        color,
    );

    let mut widest = 0;
    for t in TICKS {
        let ty = y + ((1.0 - t) * (height - 1) as f64).round() as u32;
        let tick_x = (x + BAR_WIDTH) as f32;
        draw_line_segment_mut(canvas, (tick_x, ty as f32), (tick_x + 4.0, ty as f32), color);

        let text = format_tick(norm.data_value(t));
        let text_y = ty.saturating_sub(GLYPH_HEIGHT / 2);
        draw_text(canvas, x + BAR_WIDTH + 7, text_y, &text, color, 1);
        widest = widest.max(text_width(&text, 1));
    }

    // Label centred above the bar
    let label_y = y.saturating_sub(GLYPH_HEIGHT + 6);
    draw_text_centered(canvas, x + BAR_WIDTH / 2, label_y, label, color, 1);

    BAR_WIDTH + 7 + widest
}

/// Draw a hollow marker around a source at display coordinates
pub fn draw_marker(canvas: &mut RgbImage, center: (f32, f32), radius: f32, color: Rgb<u8>) {
    imageproc::drawing::draw_hollow_circle_mut(
        canvas,
        (center.0.round() as i32, center.1.round() as i32),
        radius.max(3.0).round() as i32,
        color,
    );
}
