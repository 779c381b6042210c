use image::Rgb;

/// Drawn where the normalized value is undefined (non-finite pixels)
pub const BAD_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

// Polynomial fit of matplotlib's inferno, evaluated per channel
const INFERNO: [[f64; 3]; 7] = [
    [0.0002189403691192265, 0.001651004631001012, -0.01948089843709184],
    [0.1065134194856116, 0.5639564367884091, 3.932712388889277],
    [11.60249308247187, -3.972853965665698, -15.9423941062914],
    [-41.70399613139459, 17.43639888205313, 44.35414519872813],
    [77.162935699427, -33.40235894210092, -81.80730925738993],
    [-71.31942824499214, 32.62606426397723, 73.20951985803202],
    [25.13112622477341, -12.24266895238567, -23.07032500287172],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    Gray,
    Inferno,
}

impl Colormap {
    /// Color for a display value in [0, 1]; `None` draws the bad color
    pub fn map(&self, value: Option<f64>) -> Rgb<u8> {
        let Some(t) = value else {
            return BAD_COLOR;
        };
        let t = t.clamp(0.0, 1.0);

        match self {
            Colormap::Gray => {
                let v = to_u8(t);
                Rgb([v, v, v])
            }
            Colormap::Inferno => {
                let mut rgb = [0u8; 3];
                for (channel, out) in rgb.iter_mut().enumerate() {
                    // Horner evaluation from the highest order term
                    let v = INFERNO
                        .iter()
                        .rev()
                        .fold(0.0, |acc, coeffs| acc * t + coeffs[channel]);
                    *out = to_u8(v);
                }
                Rgb(rgb)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Colormap::Gray => "gray",
            Colormap::Inferno => "inferno",
        }
    }
}

fn to_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Distinct, stable color for a segmentation label. Label 0 is background.
pub fn label_color(label: u32) -> Rgb<u8> {
    if label == 0 {
        return Rgb([0, 0, 0]);
    }

    // Golden-ratio hue steps keep neighbouring labels apart
    let hue = (label as f64 * 0.618_033_988_749_895).fract() * 360.0;
    let saturation = 0.65 + 0.35 * ((label * 7 % 5) as f64 / 4.0);
    let value = 0.75 + 0.25 * ((label * 3 % 4) as f64 / 3.0);
    hsv_to_rgb(hue, saturation, value)
}

fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> Rgb<u8> {
    let c = value * saturation;
    let h = hue / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    Rgb([to_u8(r + m), to_u8(g + m), to_u8(b + m)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_endpoints() {
        assert_eq!(Colormap::Gray.map(Some(0.0)), Rgb([0, 0, 0]));
        assert_eq!(Colormap::Gray.map(Some(1.0)), Rgb([255, 255, 255]));
        assert_eq!(Colormap::Gray.map(Some(2.0)), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_inferno_endpoints() {
        // matplotlib inferno: (0, 0, 4) at 0 and (252, 255, 164) at 1
        let low = Colormap::Inferno.map(Some(0.0));
        let high = Colormap::Inferno.map(Some(1.0));
        assert!(low.0.iter().all(|&c| c < 10), "{low:?}");
        assert!(high.0[0] > 240 && high.0[1] > 240, "{high:?}");
        assert!(high.0[2] > 130 && high.0[2] < 190, "{high:?}");
    }

    #[test]
    fn test_inferno_brightens() {
        let luma = |c: Rgb<u8>| c.0.iter().map(|&v| v as u32).sum::<u32>();
        let mut last = 0;
        for i in (0..=10).step_by(2) {
            let l = luma(Colormap::Inferno.map(Some(i as f64 / 10.0)));
            assert!(l >= last);
            last = l;
        }
    }

    #[test]
    fn test_missing_values_use_bad_color() {
        assert_eq!(Colormap::Gray.map(None), BAD_COLOR);
        assert_eq!(Colormap::Inferno.map(None), BAD_COLOR);
    }

    #[test]
    fn test_label_colors() {
        assert_eq!(label_color(0), Rgb([0, 0, 0]));
        assert_eq!(label_color(7), label_color(7));
        assert_ne!(label_color(1), label_color(2));
        assert_ne!(label_color(1), Rgb([0, 0, 0]));
    }
}
