pub mod figure;
pub mod panel;
pub mod text;

use image::{imageops, Rgb, RgbImage};

use crate::colormap::Colormap;
use crate::detection::DetectionResult;
use crate::image::SkyImage;
use crate::normalize::{ImageNormalize, Stretch};
pub use figure::Figure;
use figure::FOREGROUND;
use panel::{draw_colorbar, draw_marker, Panel};
use text::{draw_text, draw_text_centered, GLYPH_HEIGHT};

pub const COMPARISON_FIGURE: &str = "comparison";
pub const DETECTION_FIGURE: &str = "source_detection_map";
pub const DEFAULT_MAX_PANEL_SIZE: u32 = 1200;

const MARGIN: u32 = 40;
const TITLE_HEIGHT: u32 = 36;
const PANEL_TITLE_HEIGHT: u32 = 20;
const PANEL_GAP: u32 = 48;
const COLORBAR_GAP: u32 = 16;
const COLORBAR_RESERVE: u32 = 90;
const MARKER_COLOR: Rgb<u8> = Rgb([0, 255, 255]);
const MAX_MARKERS: usize = 200;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub stretch: Stretch,
    pub max_panel_size: u32,
    /// Colormap for the detection map
    pub overlay_colormap: Colormap,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            stretch: Stretch::default(),
            max_panel_size: DEFAULT_MAX_PANEL_SIZE,
            overlay_colormap: Colormap::Gray,
        }
    }
}

fn annotate(panel: &mut Panel, image: &SkyImage) {
    match image.wcs.as_ref() {
        Some(wcs) => {
            panel.draw_scale_bar(wcs, image.width);
            panel.draw_compass(wcs, image.width);
        }
        None => tracing::debug!("No WCS: skipping scale bar and compass"),
    }
}

/// Write "RA" under a panel and "DEC" down its left side
fn draw_axis_labels(canvas: &mut RgbImage, x: u32, y: u32, panel_width: u32, panel_height: u32) {
    draw_text_centered(canvas, x + panel_width / 2, y + panel_height + 8, "RA", FOREGROUND, 1);

    let label_x = x.saturating_sub(14);
    let start_y = (y + panel_height / 2).saturating_sub(((GLYPH_HEIGHT + 2) * 3) / 2);
    for (i, c) in "DEC".chars().enumerate() {
        let cy = start_y + i as u32 * (GLYPH_HEIGHT + 2);
        draw_text(canvas, label_x, cy, &c.to_string(), FOREGROUND, 1);
    }
}

/// Side-by-side grayscale and false-color panels with scale bar, compass
/// and a colorbar on the false-color panel
pub fn comparison_figure(image: &SkyImage, target_name: &str, options: &RenderOptions) -> Figure {
    let variants = [("NIRCam", Colormap::Gray), ("False Color", Colormap::Inferno)];

    let mut panels = Vec::with_capacity(variants.len());
    for (title, colormap) in variants {
        // Normalization is recomputed per variant
        let norm = ImageNormalize::new(&image.data, options.stretch);
        let mut panel = Panel::render(image, &norm, colormap);
        panel.fit_within(options.max_panel_size);
        annotate(&mut panel, image);
        tracing::debug!("Rendered '{}' panel with {} colormap", title, colormap.name());
        panels.push((title, colormap, panel, norm));
    }

    let (panel_w, panel_h) = panels[0].2.canvas.dimensions();
    let width = MARGIN * 2 + panel_w * 2 + PANEL_GAP + COLORBAR_GAP + COLORBAR_RESERVE;
    let height = TITLE_HEIGHT + PANEL_TITLE_HEIGHT + panel_h + MARGIN * 2;

    let title = format!("JWST NIRCam Image: {}", target_name);
    let mut figure = Figure::new(COMPARISON_FIGURE, title.clone(), width, height);
    draw_text_centered(&mut figure.canvas, width / 2, 12, &title, FOREGROUND, 2);

    let top = TITLE_HEIGHT + PANEL_TITLE_HEIGHT;
    for (i, (panel_title, colormap, panel, norm)) in panels.iter().enumerate() {
        let x = MARGIN + i as u32 * (panel_w + PANEL_GAP);
        imageops::overlay(&mut figure.canvas, &panel.canvas, x as i64, top as i64);
        draw_text_centered(
            &mut figure.canvas,
            x + panel_w / 2,
            TITLE_HEIGHT + 4,
            panel_title,
            FOREGROUND,
            1,
        );
        draw_axis_labels(&mut figure.canvas, x, top, panel_w, panel_h);

        if *colormap == Colormap::Inferno {
            draw_colorbar(
                &mut figure.canvas,
                x + panel_w + COLORBAR_GAP,
                top,
                panel_h,
                norm,
                *colormap,
                "COUNTS",
                FOREGROUND,
            );
        }
    }

    figure
}

/// Segmentation labels blended over the normalized image, with markers on
/// the brightest sources
pub fn detection_figure(image: &SkyImage, detection: &DetectionResult, options: &RenderOptions) -> Figure {
    let norm = ImageNormalize::new(&image.data, options.stretch);
    let mut panel = Panel::render(image, &norm, options.overlay_colormap);
    panel.overlay_segments(&detection.segmentation, 0.5);
    panel.fit_within(options.max_panel_size);
    annotate(&mut panel, image);

    for source in detection.catalog.brightest(MAX_MARKERS) {
        let center = panel.to_display(source.xcentroid, source.ycentroid);
        let radius = (3.0 * source.semimajor_sigma * panel.scale) as f32;
        draw_marker(&mut panel.canvas, center, radius, MARKER_COLOR);
    }

    let (panel_w, panel_h) = panel.canvas.dimensions();
    let width = MARGIN * 2 + panel_w;
    let height = TITLE_HEIGHT + panel_h + MARGIN * 2;

    let mut figure = Figure::new(DETECTION_FIGURE, "Source Detection Map", width, height);
    draw_text_centered(&mut figure.canvas, width / 2, 12, "Source Detection Map", FOREGROUND, 2);
    imageops::overlay(&mut figure.canvas, &panel.canvas, MARGIN as i64, TITLE_HEIGHT as i64);
    draw_axis_labels(&mut figure.canvas, MARGIN, TITLE_HEIGHT, panel_w, panel_h);

    let summary = format!("{} sources", detection.catalog.len());
    draw_text(
        &mut figure.canvas,
        MARGIN,
        TITLE_HEIGHT + panel_h + 24,
        &summary,
        FOREGROUND,
        1,
    );

    figure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{detect, DetectionParams};
    use crate::wcs::Wcs;
    use std::collections::HashMap;

    fn test_wcs(size: usize) -> Wcs {
        let header: HashMap<String, String> = [
            ("CTYPE1", "RA---TAN"),
            ("CTYPE2", "DEC--TAN"),
            ("CRPIX1", format!("{}", size as f64 / 2.0).as_str()),
            ("CRPIX2", format!("{}", size as f64 / 2.0).as_str()),
            ("CRVAL1", "110.84"),
            ("CRVAL2", "-73.45"),
            ("CD1_1", "-8.61e-06"),
            ("CD2_2", "8.61e-06"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Wcs::from_header(&header).unwrap()
    }

    fn star_image(size: usize) -> SkyImage {
        let mut data = vec![1.0f32; size * size];
        let (cx, cy) = (size as f64 * 0.4, size as f64 * 0.6);
        for y in 0..size {
            for x in 0..size {
                let r2 = (x as f64 - cx).powi(2) + (y as f64 - cy).powi(2);
                data[y * size + x] += (500.0 * (-r2 / 8.0).exp()) as f32;
                data[y * size + x] += ((x * 7 + y * 13) % 5) as f32 * 0.1;
            }
        }
        SkyImage::from_pixels(size, size, data, Some(test_wcs(size))).unwrap()
    }

    #[test]
    fn test_comparison_layout() {
        let image = star_image(300);
        let options = RenderOptions {
            max_panel_size: 200,
            ..Default::default()
        };
        let figure = comparison_figure(&image, "SMACS 0723", &options);

        assert_eq!(figure.name, COMPARISON_FIGURE);
        assert_eq!(figure.title, "JWST NIRCam Image: SMACS 0723");
        let expected_width = MARGIN * 2 + 200 * 2 + PANEL_GAP + COLORBAR_GAP + COLORBAR_RESERVE;
        assert_eq!(figure.width(), expected_width);
        assert_eq!(figure.height(), TITLE_HEIGHT + PANEL_TITLE_HEIGHT + 200 + MARGIN * 2);
    }

    #[test]
    fn test_scale_bar_is_drawn_in_white() {
        let image = star_image(400);
        let options = RenderOptions {
            max_panel_size: 400,
            ..Default::default()
        };
        let figure = comparison_figure(&image, "T", &options);

        // 5" at 0.031"/px is 161 px; bar row is 10% up from the panel bottom
        let top = TITLE_HEIGHT + PANEL_TITLE_HEIGHT;
        let bar_y = top + (400 - 1 - 40);
        let bar_x = MARGIN + 280 + 80;
        assert_eq!(*figure.canvas.get_pixel(bar_x, bar_y), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_detection_figure() {
        let image = star_image(120);
        let detection = detect(&image, &DetectionParams::default()).unwrap();
        assert_eq!(detection.catalog.len(), 1);

        let options = RenderOptions {
            overlay_colormap: Colormap::Inferno,
            ..Default::default()
        };
        let figure = detection_figure(&image, &detection, &options);
        assert_eq!(figure.name, DETECTION_FIGURE);
        assert_eq!(figure.width(), MARGIN * 2 + 120);
        assert!(figure.to_png().is_ok());
    }
}
