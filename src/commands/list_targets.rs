use crate::cache::CacheManager;
use crate::targets::{DEFAULT_TARGET_KEY, TARGETS};
use crate::utils::truncate_string;
use anyhow::Result;
use std::path::Path;

pub fn list_targets(cache_dir: &Path) -> Result<()> {
    let cache = CacheManager::new(cache_dir);

    println!(
        "{:<10} {:<22} {:<36} {:<8}",
        "Key", "Name", "Description", "Cached"
    );
    println!("{:-<80}", "");

    for target in &TARGETS {
        let key = if target.key == DEFAULT_TARGET_KEY {
            format!("{}*", target.key)
        } else {
            target.key.to_string()
        };
        let cached = if cache.lookup(target.name).is_some() {
            "yes"
        } else {
            "no"
        };

        println!(
            "{:<10} {:<22} {:<36} {:<8}",
            key,
            truncate_string(target.name, 22),
            truncate_string(target.description, 36),
            cached
        );
    }

    println!("\n* default target");
    Ok(())
}
