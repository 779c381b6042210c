use clap::Parser;
use tracing_subscriber::EnvFilter;

use jwst_view::cli::{Cli, Commands};
use jwst_view::commands::{fetch, inspect, list_targets, show_cache, view};
use jwst_view::config::RunArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::View {
            archive,
            no_detection,
            color_mode,
            stretch,
            chunked_detection,
            output,
            max_panel_size,
        } => {
            let args = RunArgs {
                no_detection,
                color_mode,
                stretch,
                chunked_detection,
                output,
                max_panel_size,
                ..archive.to_run_args()
            };
            view(&args).await?;
        }
        Commands::Fetch { archive } => {
            fetch(&archive.to_run_args()).await?;
        }
        Commands::Targets { cache_dir } => {
            list_targets(&cache_dir)?;
        }
        Commands::Cache { cache_dir } => {
            show_cache(&cache_dir)?;
        }
        Commands::Inspect {
            target_or_path,
            cache_dir,
            all_keywords,
        } => {
            inspect(&target_or_path, &cache_dir, all_keywords)?;
        }
    }

    Ok(())
}
