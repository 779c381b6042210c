use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::cache::CacheManager;
use crate::fits::{format_hdu_summaries, read_hdu_summaries};
use crate::targets::find_target;

/// Resolve a target key to its cache entry, or treat the argument as a path
pub fn resolve_fits_path(target_or_path: &str, cache_dir: &Path) -> Result<PathBuf> {
    let as_path = Path::new(target_or_path);
    if as_path.is_file() {
        return Ok(as_path.to_path_buf());
    }

    let target = find_target(target_or_path)
        .with_context(|| format!("'{}' is neither a file nor a target key", target_or_path))?;
    CacheManager::new(cache_dir)
        .lookup(target.name)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "{} is not cached in {}; run `fetch --target {}` first",
                target.name,
                cache_dir.display(),
                target.key
            )
        })
}

pub fn inspect(target_or_path: &str, cache_dir: &Path, all_keywords: bool) -> Result<()> {
    let path = resolve_fits_path(target_or_path, cache_dir)?;
    let summaries = read_hdu_summaries(&path)
        .with_context(|| format!("Failed to read FITS headers from {}", path.display()))?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    print!("{}", format_hdu_summaries(&filename, &summaries, all_keywords));
    Ok(())
}
