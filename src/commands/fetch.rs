use anyhow::{Context, Result};

use crate::acquisition::Acquirer;
use crate::archive::MastClient;
use crate::cache::CacheManager;
use crate::config::{RunArgs, RunConfig};
use crate::targets::prompt_for_target;
use crate::utils::format_size;

/// Resolve a target to a cached file, downloading it if needed
pub async fn fetch(args: &RunArgs) -> Result<()> {
    let config = RunConfig::from_args(args)?;
    let target = match config.target {
        Some(target) => target,
        None => prompt_for_target(&mut std::io::stdin().lock(), &mut std::io::stdout())?,
    };

    let archive =
        MastClient::new(config.request_timeout).context("Failed to create archive client")?;
    let cache = CacheManager::new(&config.cache_dir);
    let path = Acquirer::new(&archive, &cache, &config.acquisition)
        .acquire(target.name)
        .await?;

    let size = std::fs::metadata(&path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    println!(
        "{} ({}): {} ({})",
        target.key,
        target.name,
        path.display(),
        format_size(size)
    );
    Ok(())
}
