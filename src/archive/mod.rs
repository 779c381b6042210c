//! Archive seam: observation search, product listing and download.

pub mod mast;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

use crate::error::ArchiveError;

pub use mast::MastClient;

/// Remote catalog of observations and their data products
#[async_trait]
pub trait Archive: Send + Sync {
    /// Resolve `name` and return observations within `radius_deg` of it.
    async fn query_object(&self, name: &str, radius_deg: f64) -> Result<ObservationTable, ArchiveError>;

    /// List the data products attached to an observation.
    async fn product_list(&self, observation: &Observation) -> Result<Vec<Product>, ArchiveError>;

    /// Download a single product into `dest_dir`, returning the local path.
    async fn download_product(&self, product: &Product, dest_dir: &Path) -> Result<PathBuf, ArchiveError>;
}

/// Accepts identifiers the archive sends either as JSON strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Observation {
    #[serde(deserialize_with = "string_or_number")]
    pub obsid: String,
    #[serde(default)]
    pub obs_id: Option<String>,
    #[serde(default)]
    pub obs_collection: Option<String>,
    #[serde(default)]
    pub dataproduct_type: Option<String>,
    #[serde(default)]
    pub instrument_name: Option<String>,
    #[serde(default)]
    pub target_name: Option<String>,
}

impl Observation {
    pub fn display_id(&self) -> &str {
        self.obs_id.as_deref().unwrap_or(&self.obsid)
    }
}

/// Observation rows plus the column names the archive reported
#[derive(Debug, Clone, Default)]
pub struct ObservationTable {
    pub columns: Vec<String>,
    pub rows: Vec<Observation>,
}

impl ObservationTable {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Collection,
    ProductType,
    Instrument,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::Collection => "obs_collection",
            Column::ProductType => "dataproduct_type",
            Column::Instrument => "instrument_name",
        }
    }

    fn value<'a>(&self, obs: &'a Observation) -> Option<&'a str> {
        match self {
            Column::Collection => obs.obs_collection.as_deref(),
            Column::ProductType => obs.dataproduct_type.as_deref(),
            Column::Instrument => obs.instrument_name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Rows that do not match are dropped, even if nothing remains
    Required,
    /// Narrowing is kept only when at least one row survives
    Preferred,
}

/// One stage of the progressive observation filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationFilter {
    pub column: Column,
    pub value: String,
    pub mode: FilterMode,
}

impl ObservationFilter {
    pub fn required(column: Column, value: &str) -> Self {
        Self {
            column,
            value: value.to_string(),
            mode: FilterMode::Required,
        }
    }

    pub fn preferred(column: Column, value: &str) -> Self {
        Self {
            column,
            value: value.to_string(),
            mode: FilterMode::Preferred,
        }
    }

    /// Collection JWST, then images, then NIRCam when available.
    pub fn jwst_nircam_images() -> Vec<Self> {
        vec![
            Self::required(Column::Collection, "JWST"),
            Self::required(Column::ProductType, "image"),
            Self::preferred(Column::Instrument, "NIRCAM"),
        ]
    }
}

/// Apply filter stages in order. The collection stage always applies; the
/// others are skipped when the archive did not return their column.
pub fn filter_observations(table: &ObservationTable, filters: &[ObservationFilter]) -> Vec<Observation> {
    let mut rows = table.rows.clone();

    for filter in filters {
        if filter.column != Column::Collection && !table.has_column(filter.column.name()) {
            tracing::debug!("Column {} absent, skipping filter", filter.column.name());
            continue;
        }

        let narrowed: Vec<Observation> = rows
            .iter()
            .filter(|obs| filter.column.value(obs) == Some(filter.value.as_str()))
            .cloned()
            .collect();

        match filter.mode {
            FilterMode::Required => rows = narrowed,
            FilterMode::Preferred if !narrowed.is_empty() => rows = narrowed,
            FilterMode::Preferred => {
                tracing::debug!(
                    "No {} == {} rows, keeping {} observations",
                    filter.column.name(),
                    filter.value,
                    rows.len()
                );
            }
        }
    }

    rows
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(deserialize_with = "string_or_number")]
    pub obsid: String,
    pub product_filename: String,
    #[serde(default)]
    pub product_sub_group_description: Option<String>,
    #[serde(rename = "dataURI")]
    pub data_uri: String,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Selects calibrated products by subgroup tag and file extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    pub subgroup: String,
    pub extension: String,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            subgroup: "CAL".to_string(),
            extension: "fits".to_string(),
        }
    }
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        product.product_sub_group_description.as_deref() == Some(self.subgroup.as_str())
            && product.product_filename.ends_with(&self.extension)
    }

    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(id: &str, collection: &str, kind: &str, instrument: &str) -> Observation {
        Observation {
            obsid: id.to_string(),
            obs_id: Some(format!("jw-{id}")),
            obs_collection: Some(collection.to_string()),
            dataproduct_type: Some(kind.to_string()),
            instrument_name: Some(instrument.to_string()),
            target_name: None,
        }
    }

    fn table(rows: Vec<Observation>) -> ObservationTable {
        ObservationTable {
            columns: vec![
                "obsid".into(),
                "obs_collection".into(),
                "dataproduct_type".into(),
                "instrument_name".into(),
            ],
            rows,
        }
    }

    #[test]
    fn test_filter_prefers_nircam() {
        let t = table(vec![
            obs("1", "HST", "image", "WFC3/IR"),
            obs("2", "JWST", "image", "MIRI/IMAGE"),
            obs("3", "JWST", "spectrum", "NIRSPEC"),
            obs("4", "JWST", "image", "NIRCAM"),
        ]);
        let rows = filter_observations(&t, &ObservationFilter::jwst_nircam_images());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].obsid, "4");
    }

    #[test]
    fn test_instrument_filter_falls_back_when_empty() {
        let t = table(vec![
            obs("2", "JWST", "image", "MIRI/IMAGE"),
            obs("5", "JWST", "image", "NIRISS"),
        ]);
        let rows = filter_observations(&t, &ObservationFilter::jwst_nircam_images());
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_required_filters_can_empty_the_set() {
        let t = table(vec![obs("1", "HST", "image", "ACS/WFC")]);
        assert!(filter_observations(&t, &ObservationFilter::jwst_nircam_images()).is_empty());

        let t = table(vec![obs("3", "JWST", "spectrum", "NIRSPEC")]);
        assert!(filter_observations(&t, &ObservationFilter::jwst_nircam_images()).is_empty());
    }

    #[test]
    fn test_missing_columns_skip_their_stage() {
        let mut row = obs("7", "JWST", "", "");
        row.dataproduct_type = None;
        row.instrument_name = None;
        let t = ObservationTable {
            columns: vec!["obsid".into(), "obs_collection".into()],
            rows: vec![row],
        };
        let rows = filter_observations(&t, &ObservationFilter::jwst_nircam_images());
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_observation_accepts_numeric_obsid() {
        let row: Observation = serde_json::from_value(serde_json::json!({
            "obsid": 87602009,
            "obs_collection": "JWST",
            "instrument_name": null
        }))
        .unwrap();
        assert_eq!(row.obsid, "87602009");
        assert_eq!(row.instrument_name, None);
        assert_eq!(row.display_id(), "87602009");
    }

    #[test]
    fn test_product_filter_requires_cal_fits() {
        let products: Vec<Product> = serde_json::from_value(serde_json::json!([
            {"obsid": "1", "productFilename": "jw02736_i2d.fits", "productSubGroupDescription": "I2D", "dataURI": "mast:JWST/product/jw02736_i2d.fits"},
            {"obsid": "1", "productFilename": "jw02736_cal.json", "productSubGroupDescription": "CAL", "dataURI": "mast:JWST/product/jw02736_cal.json"},
            {"obsid": "1", "productFilename": "jw02736_cal.fits", "productSubGroupDescription": "CAL", "dataURI": "mast:JWST/product/jw02736_cal.fits", "size": 117538560}
        ]))
        .unwrap();

        let selected = ProductFilter::default().apply(&products);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].product_filename, "jw02736_cal.fits");
        assert_eq!(selected[0].size, Some(117538560));
    }
}
