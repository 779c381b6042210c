use anyhow::Result;
use std::path::Path;

use crate::cache::CacheManager;
use crate::utils::{format_size, truncate_string};

pub fn show_cache(cache_dir: &Path) -> Result<()> {
    let cache = CacheManager::new(cache_dir);
    let entries = cache.entries()?;

    println!("Cache directory: {}", cache.cache_dir().display());
    if entries.is_empty() {
        println!("No cached files.");
        return Ok(());
    }

    println!("{:<44} {:>10} {:<20}", "File", "Size", "Modified");
    println!("{:-<76}", "");
    for entry in &entries {
        let name = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let modified = entry
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<44} {:>10} {:<20}",
            truncate_string(&name, 44),
            format_size(entry.size),
            modified
        );
    }

    println!(
        "\n{} file(s), {} total",
        entries.len(),
        format_size(cache.get_total_size()?)
    );
    Ok(())
}
