//! Cache-first resolution of a target to a local calibrated image.

use std::path::PathBuf;

use crate::archive::{filter_observations, Archive, ObservationFilter, ProductFilter};
use crate::cache::CacheManager;
use crate::error::{AcquisitionError, ArchiveError};
use crate::retry::{RetryError, RetryPolicy};

#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    pub retry: RetryPolicy,
    pub search_radius_deg: f64,
    pub observation_filters: Vec<ObservationFilter>,
    pub product_filter: ProductFilter,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            search_radius_deg: 0.1,
            observation_filters: ObservationFilter::jwst_nircam_images(),
            product_filter: ProductFilter::default(),
        }
    }
}

impl AcquisitionConfig {
    fn collection(&self) -> String {
        self.observation_filters
            .first()
            .map(|f| f.value.clone())
            .unwrap_or_else(|| "archive".to_string())
    }
}

pub struct Acquirer<'a, A: Archive + ?Sized> {
    archive: &'a A,
    cache: &'a CacheManager,
    config: &'a AcquisitionConfig,
}

impl<'a, A: Archive + ?Sized> Acquirer<'a, A> {
    pub fn new(archive: &'a A, cache: &'a CacheManager, config: &'a AcquisitionConfig) -> Self {
        Self {
            archive,
            cache,
            config,
        }
    }

    /// Return a local file for `name`, downloading it only on a cache miss.
    ///
    /// Any failure while fetching falls back to a cache entry if one exists
    /// by then; otherwise the error is returned.
    pub async fn acquire(&self, name: &str) -> Result<PathBuf, AcquisitionError> {
        if let Some(path) = self.cache.lookup(name) {
            println!("Using cached file...");
            tracing::info!("Cache hit for '{}': {}", name, path.display());
            return Ok(path);
        }

        println!("Starting JWST data query...");
        match self.fetch(name).await {
            Ok(path) => Ok(path),
            Err(e) => match self.cache.lookup(name) {
                Some(path) => {
                    tracing::warn!("Error querying MAST: {}", e);
                    tracing::warn!("Using cached file instead: {}", path.display());
                    Ok(path)
                }
                None => Err(e),
            },
        }
    }

    async fn fetch(&self, name: &str) -> Result<PathBuf, AcquisitionError> {
        let archive = self.archive;
        let policy = &self.config.retry;
        let radius = self.config.search_radius_deg;

        let table = policy
            .run(
                |attempt| {
                    println!("Attempt {}/{}...", attempt, policy.max_attempts());
                    archive.query_object(name, radius)
                },
                ArchiveError::is_timeout,
            )
            .await
            .map_err(|e| match e {
                RetryError::Exhausted { attempts, last } => {
                    AcquisitionError::RetriesExhausted { attempts, last }
                }
                RetryError::Fatal(e) => AcquisitionError::Archive(e),
            })?;
        println!("Found {} observations", table.len());

        let observations = filter_observations(&table, &self.config.observation_filters);
        println!("Found {} JWST images total", observations.len());

        let observation = observations
            .first()
            .ok_or_else(|| AcquisitionError::NoObservations {
                target: name.to_string(),
                collection: self.config.collection(),
            })?;

        println!("Downloading calibrated image...");
        let products = self.archive.product_list(observation).await?;
        let mut subgroups: Vec<&str> = products
            .iter()
            .filter_map(|p| p.product_sub_group_description.as_deref())
            .collect();
        subgroups.sort_unstable();
        subgroups.dedup();
        tracing::info!("Available product types: {:?}", subgroups);

        let calibrated = self.config.product_filter.apply(&products);
        let product = calibrated
            .first()
            .ok_or_else(|| AcquisitionError::NoCalibratedProducts {
                obs_id: observation.display_id().to_string(),
            })?;

        let staging = self
            .cache
            .ensure_staging_dir()
            .map_err(|source| AcquisitionError::Cache {
                path: self.cache.cache_dir().to_path_buf(),
                source,
            })?;
        let staged = self.archive.download_product(product, &staging).await?;

        let path = self
            .cache
            .store(name, &staged)
            .map_err(|source| AcquisitionError::Cache {
                path: staged.clone(),
                source,
            })?;
        println!("Downloaded and cached file to: {}", path.display());
        Ok(path)
    }
}
