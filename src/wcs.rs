//! World Coordinate System support for TAN (gnomonic) projected images.
//!
//! The linear part is a CD matrix, either read directly (`CDi_j`) or built
//! from `PCi_j` and `CDELTi`. Pixel coordinates are zero-based; FITS
//! `CRPIX` is one-based.

use nalgebra::{Matrix2, Vector2};
use std::collections::HashMap;

/// Read access to FITS header keywords
pub trait HeaderLookup {
    fn real(&self, key: &str) -> Option<f64>;
    fn text(&self, key: &str) -> Option<String>;
}

impl HeaderLookup for HashMap<String, String> {
    fn real(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.trim().parse::<f64>().ok())
    }

    fn text(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.trim().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyCoord {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

impl SkyCoord {
    /// Sexagesimal rendering, `HH:MM:SS.ss +DD:MM:SS.s`
    pub fn to_hms_dms(&self) -> String {
        let ra_hours = self.ra_deg.rem_euclid(360.0) / 15.0;
        let h = ra_hours.trunc();
        let m = ((ra_hours - h) * 60.0).trunc();
        let s = ((ra_hours - h) * 60.0 - m) * 60.0;

        let sign = if self.dec_deg < 0.0 { '-' } else { '+' };
        let dec = self.dec_deg.abs();
        let d = dec.trunc();
        let dm = ((dec - d) * 60.0).trunc();
        let ds = ((dec - d) * 60.0 - dm) * 60.0;

        format!(
            "{:02}:{:02}:{:05.2} {}{:02}:{:02}:{:04.1}",
            h as u32, m as u32, s, sign, d as u32, dm as u32, ds
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wcs {
    /// Reference pixel, one-based (CRPIX1, CRPIX2)
    pub crpix: [f64; 2],
    /// Reference sky position in degrees (CRVAL1, CRVAL2)
    pub crval: [f64; 2],
    /// Degrees per pixel, including rotation and parity
    pub cd: Matrix2<f64>,
    pub ctype: [String; 2],
}

impl Wcs {
    /// Build from header keywords. Returns `None` when the header carries no
    /// usable celestial TAN solution.
    pub fn from_header<H: HeaderLookup + ?Sized>(header: &H) -> Option<Self> {
        let ctype1 = header.text("CTYPE1")?;
        let ctype2 = header.text("CTYPE2")?;
        if !ctype1.starts_with("RA") || !ctype2.starts_with("DEC") {
            tracing::debug!("Unsupported WCS axes {} / {}", ctype1, ctype2);
            return None;
        }
        if !ctype1.contains("TAN") {
            tracing::warn!("Projection {} treated as TAN", ctype1);
        }

        let crpix = [header.real("CRPIX1")?, header.real("CRPIX2")?];
        let crval = [header.real("CRVAL1")?, header.real("CRVAL2")?];

        let cd = match header.real("CD1_1") {
            Some(cd11) => Matrix2::new(
                cd11,
                header.real("CD1_2").unwrap_or(0.0),
                header.real("CD2_1").unwrap_or(0.0),
                header.real("CD2_2").unwrap_or(0.0),
            ),
            None => {
                let cdelt1 = header.real("CDELT1")?;
                let cdelt2 = header.real("CDELT2")?;
                let pc = Matrix2::new(
                    header.real("PC1_1").unwrap_or(1.0),
                    header.real("PC1_2").unwrap_or(0.0),
                    header.real("PC2_1").unwrap_or(0.0),
                    header.real("PC2_2").unwrap_or(1.0),
                );
                Matrix2::new(cdelt1, 0.0, 0.0, cdelt2) * pc
            }
        };

        if cd.determinant().abs() < 1e-30 {
            return None;
        }

        Some(Self {
            crpix,
            crval,
            cd,
            ctype: [ctype1, ctype2],
        })
    }

    /// Sky coordinate of a zero-based pixel position
    pub fn pixel_to_world(&self, x: f64, y: f64) -> SkyCoord {
        let offset = Vector2::new(x + 1.0 - self.crpix[0], y + 1.0 - self.crpix[1]);
        let plane = self.cd * offset;

        let (ra, dec) = inverse_tan_project(
            plane.x.to_radians(),
            plane.y.to_radians(),
            self.crval[0].to_radians(),
            self.crval[1].to_radians(),
        );

        SkyCoord {
            ra_deg: ra.to_degrees().rem_euclid(360.0),
            dec_deg: dec.to_degrees(),
        }
    }

    /// Zero-based pixel position of a sky coordinate, or `None` if it lies
    /// on the far side of the tangent plane.
    pub fn world_to_pixel(&self, coord: SkyCoord) -> Option<(f64, f64)> {
        let (xi, eta) = tan_project(
            coord.ra_deg.to_radians(),
            coord.dec_deg.to_radians(),
            self.crval[0].to_radians(),
            self.crval[1].to_radians(),
        )?;
        let inverse = self.cd.try_inverse()?;
        let offset = inverse * Vector2::new(xi.to_degrees(), eta.to_degrees());
        Some((offset.x + self.crpix[0] - 1.0, offset.y + self.crpix[1] - 1.0))
    }

    /// Mean pixel scale in degrees
    pub fn pixel_scale_deg(&self) -> f64 {
        self.cd.determinant().abs().sqrt()
    }

    pub fn pixel_scale_arcsec(&self) -> f64 {
        self.pixel_scale_deg() * 3600.0
    }

    /// Unit vectors in pixel space pointing to increasing Dec (north) and
    /// increasing RA (east) at the given pixel.
    pub fn compass(&self, x: f64, y: f64) -> Option<((f64, f64), (f64, f64))> {
        let here = self.pixel_to_world(x, y);
        let step = self.pixel_scale_deg() * 10.0;
        let cos_dec = here.dec_deg.to_radians().cos().max(1e-6);

        let north = self.world_to_pixel(SkyCoord {
            ra_deg: here.ra_deg,
            dec_deg: here.dec_deg + step,
        })?;
        let east = self.world_to_pixel(SkyCoord {
            ra_deg: here.ra_deg + step / cos_dec,
            dec_deg: here.dec_deg,
        })?;

        let unit = |(px, py): (f64, f64)| {
            let (dx, dy) = (px - x, py - y);
            let len = (dx * dx + dy * dy).sqrt().max(f64::EPSILON);
            (dx / len, dy / len)
        };
        Some((unit(north), unit(east)))
    }
}

/// Forward gnomonic projection onto the plane tangent at `(crval_ra, crval_dec)`.
/// All angles in radians.
pub fn tan_project(ra: f64, dec: f64, crval_ra: f64, crval_dec: f64) -> Option<(f64, f64)> {
    let da = ra - crval_ra;
    let (sin_dec, cos_dec) = dec.sin_cos();
    let (sin_dec0, cos_dec0) = crval_dec.sin_cos();
    let cos_da = da.cos();

    let denom = sin_dec * sin_dec0 + cos_dec * cos_dec0 * cos_da;
    if denom <= 1e-12 {
        return None;
    }

    let xi = cos_dec * da.sin() / denom;
    let eta = (sin_dec * cos_dec0 - cos_dec * sin_dec0 * cos_da) / denom;
    Some((xi, eta))
}

/// Inverse gnomonic projection. All angles in radians.
pub fn inverse_tan_project(xi: f64, eta: f64, crval_ra: f64, crval_dec: f64) -> (f64, f64) {
    let (sin_dec0, cos_dec0) = crval_dec.sin_cos();
    let rho = (xi * xi + eta * eta).sqrt();
    if rho < 1e-15 {
        return (crval_ra, crval_dec);
    }

    let c = rho.atan();
    let (sin_c, cos_c) = c.sin_cos();

    let dec = (cos_c * sin_dec0 + eta * sin_c * cos_dec0 / rho).asin();
    let ra = crval_ra + (xi * sin_c).atan2(rho * cos_dec0 * cos_c - eta * sin_dec0 * sin_c);
    (ra, dec)
}
