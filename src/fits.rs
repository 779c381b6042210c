use anyhow::Result;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::wcs::{HeaderLookup, Wcs};

const BLOCK_SIZE: usize = 2880;
const CARD_SIZE: usize = 80;

/// One header/data unit as seen by a header-only walk of the file
#[derive(Debug)]
pub struct HduSummary {
    pub index: usize,
    pub name: Option<String>,
    /// `PRIMARY`, or the XTENSION value (`IMAGE`, `BINTABLE`, ...)
    pub kind: String,
    pub bitpix: i64,
    pub dimensions: Vec<usize>,
    pub keywords: HashMap<String, String>,
}

impl HduSummary {
    pub fn wcs(&self) -> Option<Wcs> {
        Wcs::from_header(&self.keywords)
    }

    fn data_bytes(&self) -> u64 {
        if self.dimensions.is_empty() {
            return 0;
        }
        let pcount = self.keywords.real("PCOUNT").unwrap_or(0.0) as u64;
        let gcount = self.keywords.real("GCOUNT").unwrap_or(1.0) as u64;
        let elements: u64 = self.dimensions.iter().map(|&d| d as u64).product();
        (self.bitpix.unsigned_abs() / 8) * gcount * (pcount + elements)
    }
}

/// Walk every HDU in a FITS file, reading headers and skipping data
pub fn read_hdu_summaries(path: &Path) -> Result<Vec<HduSummary>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut summaries = Vec::new();

    loop {
        let header_data = match read_header_blocks(&mut reader)? {
            Some(data) => data,
            None => break,
        };

        let keywords = parse_fits_header(&header_data);
        let index = summaries.len();
        let kind = if index == 0 {
            "PRIMARY".to_string()
        } else {
            keywords
                .get("XTENSION")
                .cloned()
                .unwrap_or_else(|| "UNKNOWN".to_string())
        };

        let naxis = keywords.real("NAXIS").unwrap_or(0.0) as usize;
        let dimensions = (1..=naxis)
            .filter_map(|i| keywords.real(&format!("NAXIS{}", i)))
            .map(|d| d as usize)
            .collect();

        let summary = HduSummary {
            index,
            name: keywords.get("EXTNAME").cloned(),
            kind,
            bitpix: keywords.real("BITPIX").unwrap_or(0.0) as i64,
            dimensions,
            keywords,
        };

        let padded = summary.data_bytes().div_ceil(BLOCK_SIZE as u64) * BLOCK_SIZE as u64;
        reader.seek(SeekFrom::Current(padded as i64))?;
        summaries.push(summary);
    }

    if summaries.is_empty() {
        return Err(anyhow::anyhow!("{} contains no FITS header", path.display()));
    }

    Ok(summaries)
}

/// Read 2880-byte blocks until one contains the END card. `None` at clean EOF.
fn read_header_blocks<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut header_data = Vec::new();

    loop {
        let mut block = vec![0u8; BLOCK_SIZE];
        match reader.read_exact(&mut block) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                if header_data.is_empty() {
                    return Ok(None);
                }
                return Err(anyhow::anyhow!("Truncated FITS header"));
            }
            Err(e) => return Err(e.into()),
        }

        let has_end = block
            .chunks(CARD_SIZE)
            .any(|card| card.starts_with(b"END") && card[3..].iter().all(|&b| b == b' '));
        header_data.extend_from_slice(&block);
        if has_end {
            return Ok(Some(header_data));
        }
    }
}

/// Parse 80-character cards into a keyword map
fn parse_fits_header(data: &[u8]) -> HashMap<String, String> {
    let mut keywords = HashMap::new();

    for chunk in data.chunks(CARD_SIZE) {
        let Ok(card) = std::str::from_utf8(chunk) else {
            continue;
        };
        let keyword = card.get(..8).unwrap_or(card).trim();

        if keyword == "END" {
            break;
        }
        if keyword.is_empty() || keyword == "COMMENT" || keyword == "HISTORY" {
            continue;
        }
        if card.get(8..10) != Some("= ") {
            continue;
        }

        let value_part = card[10..].trim_start();
        let value = if let Some(rest) = value_part.strip_prefix('\'') {
            // Quoted string; '' is an escaped quote
            let mut out = String::new();
            let mut chars = rest.chars().peekable();
            while let Some(c) = chars.next() {
                if c == '\'' {
                    if chars.peek() == Some(&'\'') {
                        out.push('\'');
                        chars.next();
                    } else {
                        break;
                    }
                } else {
                    out.push(c);
                }
            }
            out.trim_end().to_string()
        } else {
            value_part
                .split('/')
                .next()
                .unwrap_or("")
                .trim()
                .to_string()
        };

        keywords.insert(keyword.to_string(), value);
    }

    keywords
}

/// Format an HDU listing for display
pub fn format_hdu_summaries(filename: &str, summaries: &[HduSummary], verbose: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!("Filename: {}\n", filename));
    output.push_str(&format!(
        "{:<4} {:<12} {:<10} {:>7}  {}\n",
        "No.", "Name", "Type", "BITPIX", "Dimensions"
    ));

    for hdu in summaries {
        let dims = if hdu.dimensions.is_empty() {
            "()".to_string()
        } else {
            format!(
                "({})",
                hdu.dimensions
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        };
        output.push_str(&format!(
            "{:<4} {:<12} {:<10} {:>7}  {}\n",
            hdu.index,
            hdu.name.as_deref().unwrap_or(""),
            hdu.kind,
            hdu.bitpix,
            dims
        ));
    }

    // Observation info
    if let Some(primary) = summaries.first() {
        output.push_str("\nKey Metadata:\n");
        for (label, key) in [
            ("Telescope", "TELESCOP"),
            ("Instrument", "INSTRUME"),
            ("Detector", "DETECTOR"),
            ("Filter", "FILTER"),
            ("Target", "TARGPROP"),
            ("Date", "DATE-OBS"),
            ("Exposure", "EFFEXPTM"),
        ] {
            if let Some(value) = primary.keywords.get(key) {
                output.push_str(&format!("  {}: {}\n", label, value));
            }
        }
    }

    for hdu in summaries {
        if let Some(wcs) = hdu.wcs() {
            let center = hdu
                .dimensions
                .get(..2)
                .map(|d| wcs.pixel_to_world((d[0] as f64 - 1.0) / 2.0, (d[1] as f64 - 1.0) / 2.0));
            output.push_str(&format!("\nWCS (HDU {}):\n", hdu.index));
            output.push_str(&format!("  Axes: {} / {}\n", wcs.ctype[0], wcs.ctype[1]));
            output.push_str(&format!("  Pixel scale: {:.4}\"/px\n", wcs.pixel_scale_arcsec()));
            if let Some(center) = center {
                output.push_str(&format!("  Center: {}\n", center.to_hms_dms()));
            }
        }
    }

    if verbose {
        for hdu in summaries {
            output.push_str(&format!("\nHDU {} ", hdu.index));
            if let Some(ref name) = hdu.name {
                output.push_str(&format!("({})", name));
            }
            output.push_str(" - All Keywords:\n");

            let mut sorted_keys: Vec<_> = hdu.keywords.iter().collect();
            sorted_keys.sort_by_key(|&(k, _)| k);

            for (key, value) in sorted_keys {
                output.push_str(&format!("  {:<16} = {}\n", key, value));
            }
        }
    }

    output
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    fn card(text: &str) -> String {
        format!("{:<80}", text)
    }

    fn header_block(cards: &[String]) -> Vec<u8> {
        let mut bytes: Vec<u8> = cards.concat().into_bytes();
        bytes.extend(card("END").into_bytes());
        let padded = bytes.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
        bytes.resize(padded, b' ');
        bytes
    }

    /// Primary HDU with no data, then a float32 SCI image extension.
    pub(crate) fn write_test_fits(path: &Path, width: usize, height: usize, pixels: &[f32]) {
        let mut file = File::create(path).unwrap();
        let primary = header_block(&[
            card("SIMPLE  =                    T"),
            card("BITPIX  =                    8"),
            card("NAXIS   =                    0"),
            card("EXTEND  =                    T"),
            card("TELESCOP= 'JWST    '           / telescope used"),
            card("INSTRUME= 'NIRCAM  '"),
            card("TARGPROP= 'SMACS-J0723'"),
        ]);
        file.write_all(&primary).unwrap();

        let ext = header_block(&[
            card("XTENSION= 'IMAGE   '           / Image extension"),
            card("BITPIX  =                  -32"),
            card("NAXIS   =                    2"),
            card(&format!("NAXIS1  = {:>20}", width)),
            card(&format!("NAXIS2  = {:>20}", height)),
            card("PCOUNT  =                    0"),
            card("GCOUNT  =                    1"),
            card("EXTNAME = 'SCI     '"),
            card("CTYPE1  = 'RA---TAN'"),
            card("CTYPE2  = 'DEC--TAN'"),
            card("CRPIX1  =                  4.5"),
            card("CRPIX2  =                  4.5"),
            card("CRVAL1  =               110.84"),
            card("CRVAL2  =               -73.45"),
            card("CDELT1  =              8.61E-6"),
            card("CDELT2  =              8.61E-6"),
            card("PC1_1   =                 -1.0"),
            card("PC2_2   =                  1.0"),
        ]);
        file.write_all(&ext).unwrap();

        let mut data: Vec<u8> = pixels.iter().flat_map(|v| v.to_be_bytes()).collect();
        let padded = data.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
        data.resize(padded, 0);
        file.write_all(&data).unwrap();
    }

    #[test]
    fn test_parse_header_values() {
        let block = header_block(&[
            card("SIMPLE  =                    T / conforms"),
            card("OBJECT  = 'M16 / Eagle'        / quoted slash kept"),
            card("OBSERVER= 'O''Dell  '"),
            card("COMMENT this is not a keyword"),
            card("EXPTIME =               429.44 / seconds"),
        ]);
        let keywords = parse_fits_header(&block);

        assert_eq!(keywords.get("SIMPLE").map(String::as_str), Some("T"));
        assert_eq!(keywords.get("OBJECT").map(String::as_str), Some("M16 / Eagle"));
        assert_eq!(keywords.get("OBSERVER").map(String::as_str), Some("O'Dell"));
        assert_eq!(keywords.real("EXPTIME"), Some(429.44));
        assert!(!keywords.contains_key("COMMENT"));
    }

    #[test]
    fn test_walks_all_hdus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two_hdus.fits");
        let pixels: Vec<f32> = (0..64).map(|v| v as f32).collect();
        write_test_fits(&path, 8, 8, &pixels);

        let summaries = read_hdu_summaries(&path).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].kind, "PRIMARY");
        assert!(summaries[0].dimensions.is_empty());
        assert_eq!(summaries[1].kind, "IMAGE");
        assert_eq!(summaries[1].name.as_deref(), Some("SCI"));
        assert_eq!(summaries[1].bitpix, -32);
        assert_eq!(summaries[1].dimensions, vec![8, 8]);
        assert!(summaries[1].wcs().is_some());

        let text = format_hdu_summaries("two_hdus.fits", &summaries, false);
        assert!(text.contains("SCI"));
        assert!(text.contains("Instrument: NIRCAM"));
        assert!(text.contains("Pixel scale: 0.0310\"/px"));
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.fits");
        File::create(&path).unwrap();
        assert!(read_hdu_summaries(&path).is_err());
    }
}
