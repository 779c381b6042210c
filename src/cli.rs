use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::RunArgs;

#[derive(Parser)]
#[command(name = "jwst-view")]
#[command(about = "Fetch, cache and display calibrated JWST images from MAST", long_about = None)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch (or reuse) a target image, render it and detect sources
    View {
        #[command(flatten)]
        archive: ArchiveOptions,

        /// Skip source detection
        #[arg(long)]
        no_detection: bool,

        /// Colormap for the detection map (grayscale, false_color)
        #[arg(long, default_value = "grayscale")]
        color_mode: String,

        /// Display stretch (log, asinh, linear)
        #[arg(long, default_value = "log")]
        stretch: String,

        /// Also run detection on 4 row bands in parallel (results are only logged)
        #[arg(long)]
        chunked_detection: bool,

        /// Figure output: viewer, viewer:<port>, viewer:<host>:<port>, dir:<path>, none
        #[arg(short, long, default_value = "viewer")]
        output: String,

        /// Largest panel side in pixels; bigger images are downsampled
        #[arg(long, default_value = "1200")]
        max_panel_size: u32,
    },

    /// Download a target image into the cache without displaying it
    Fetch {
        #[command(flatten)]
        archive: ArchiveOptions,
    },

    /// List the predefined targets
    Targets {
        /// Cache directory, to show which targets are already downloaded
        #[arg(long, default_value = crate::cache::DEFAULT_CACHE_DIR)]
        cache_dir: PathBuf,
    },

    /// Show cached files
    Cache {
        /// Cache directory
        #[arg(long, default_value = crate::cache::DEFAULT_CACHE_DIR)]
        cache_dir: PathBuf,
    },

    /// Summarize the HDUs of a cached target or a FITS file
    Inspect {
        /// Target key (e.g. SMACS) or path to a FITS file
        target_or_path: String,

        /// Cache directory used to resolve target keys
        #[arg(long, default_value = crate::cache::DEFAULT_CACHE_DIR)]
        cache_dir: PathBuf,

        /// Print every header keyword
        #[arg(long)]
        all_keywords: bool,
    },
}

/// Target selection and archive access
#[derive(Args, Debug, Clone)]
pub struct ArchiveOptions {
    /// Target key; prompts when omitted
    #[arg(short, long)]
    pub target: Option<String>,

    /// Cache directory
    #[arg(long, default_value = crate::cache::DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Retries after the first timed-out query
    #[arg(long, default_value = "3")]
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each retry
    #[arg(long, default_value = "5")]
    pub retry_delay_secs: u64,

    /// Per-request timeout for archive calls
    #[arg(long, default_value = "1200")]
    pub timeout_secs: u64,

    /// Cone search radius in degrees
    #[arg(long, default_value = "0.1")]
    pub radius_deg: f64,
}

impl ArchiveOptions {
    /// Run arguments with display options left at their defaults
    pub fn to_run_args(&self) -> RunArgs {
        RunArgs {
            target: self.target.clone(),
            cache_dir: self.cache_dir.clone(),
            max_retries: self.max_retries,
            retry_delay_secs: self.retry_delay_secs,
            timeout_secs: self.timeout_secs,
            radius_deg: self.radius_deg,
            ..RunArgs::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_view_defaults_match_run_args() {
        let cli = Cli::try_parse_from(["jwst-view", "view"]).unwrap();
        let Commands::View {
            archive,
            color_mode,
            stretch,
            output,
            max_panel_size,
            ..
        } = cli.command
        else {
            panic!("expected view");
        };

        let defaults = RunArgs::default();
        let args = archive.to_run_args();
        assert_eq!(args.cache_dir, defaults.cache_dir);
        assert_eq!(args.max_retries, defaults.max_retries);
        assert_eq!(args.retry_delay_secs, defaults.retry_delay_secs);
        assert_eq!(args.timeout_secs, defaults.timeout_secs);
        assert_eq!(args.radius_deg, defaults.radius_deg);
        assert_eq!(color_mode, defaults.color_mode);
        assert_eq!(stretch, defaults.stretch);
        assert_eq!(output, defaults.output);
        assert_eq!(max_panel_size, defaults.max_panel_size);
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["jwst-view", "targets", "-v"]).unwrap();
        assert!(cli.verbose);
    }
}
