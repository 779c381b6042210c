//! Run configuration assembled from CLI arguments.
//!
//! Everything here is validated up front, before the archive or the cache
//! directory is touched.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::acquisition::AcquisitionConfig;
use crate::archive::mast::DEFAULT_TIMEOUT;
use crate::cache::DEFAULT_CACHE_DIR;
use crate::colormap::Colormap;
use crate::detection::DetectionParams;
use crate::error::ConfigError;
use crate::normalize::Stretch;
use crate::render::{RenderOptions, DEFAULT_MAX_PANEL_SIZE};
use crate::retry::RetryPolicy;
use crate::targets::{find_target, Target};
use crate::viewer::{DEFAULT_HOST, DEFAULT_PORT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Grayscale,
    FalseColor,
}

impl ColorMode {
    pub fn colormap(&self) -> Colormap {
        match self {
            ColorMode::Grayscale => Colormap::Gray,
            ColorMode::FalseColor => Colormap::Inferno,
        }
    }
}

impl FromStr for ColorMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grayscale" => Ok(ColorMode::Grayscale),
            "false_color" | "false-color" => Ok(ColorMode::FalseColor),
            _ => Err(ConfigError::UnsupportedColorMode(s.to_string())),
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMode::Grayscale => write!(f, "grayscale"),
            ColorMode::FalseColor => write!(f, "false_color"),
        }
    }
}

/// Where rendered figures go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FigureOutput {
    /// Serve from memory on a local HTTP viewer until Ctrl-C
    Viewer { host: String, port: u16 },
    /// Write `<name>.png` files into a directory
    Directory(PathBuf),
    /// Render and discard
    None,
}

impl Default for FigureOutput {
    fn default() -> Self {
        FigureOutput::Viewer {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl FromStr for FigureOutput {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || ConfigError::InvalidOutput(s.to_string());

        if trimmed.eq_ignore_ascii_case("none") {
            return Ok(FigureOutput::None);
        }
        if trimmed.eq_ignore_ascii_case("viewer") {
            return Ok(FigureOutput::default());
        }
        if let Some(path) = trimmed.strip_prefix("dir:") {
            if path.is_empty() {
                return Err(invalid());
            }
            return Ok(FigureOutput::Directory(PathBuf::from(path)));
        }
        if let Some(addr) = trimmed.strip_prefix("viewer:") {
            // viewer:<port> or viewer:<host>:<port>
            let (host, port) = match addr.rsplit_once(':') {
                Some((host, port)) => (host.to_string(), port),
                None => (DEFAULT_HOST.to_string(), addr),
            };
            let port = port.parse::<u16>().map_err(|_| invalid())?;
            if host.is_empty() {
                return Err(invalid());
            }
            return Ok(FigureOutput::Viewer { host, port });
        }

        Err(invalid())
    }
}

/// Raw option values as typed on the command line
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub target: Option<String>,
    pub no_detection: bool,
    pub color_mode: String,
    pub stretch: String,
    pub cache_dir: PathBuf,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub timeout_secs: u64,
    pub radius_deg: f64,
    pub chunked_detection: bool,
    pub output: String,
    pub max_panel_size: u32,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            target: None,
            no_detection: false,
            color_mode: ColorMode::default().to_string(),
            stretch: "log".to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            max_retries: RetryPolicy::default().max_retries,
            retry_delay_secs: RetryPolicy::default().initial_delay.as_secs(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            radius_deg: AcquisitionConfig::default().search_radius_deg,
            chunked_detection: false,
            output: "viewer".to_string(),
            max_panel_size: DEFAULT_MAX_PANEL_SIZE,
        }
    }
}

/// Validated configuration for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// `None` means prompt interactively
    pub target: Option<&'static Target>,
    pub color_mode: ColorMode,
    pub perform_detection: bool,
    pub chunked_detection: bool,
    pub cache_dir: PathBuf,
    pub request_timeout: Duration,
    pub acquisition: AcquisitionConfig,
    pub detection: DetectionParams,
    pub render: RenderOptions,
    pub output: FigureOutput,
}

impl RunConfig {
    pub fn from_args(args: &RunArgs) -> Result<Self, ConfigError> {
        let color_mode: ColorMode = args.color_mode.parse()?;
        let stretch: Stretch = args.stretch.parse()?;
        let output: FigureOutput = args.output.parse()?;
        let target = args.target.as_deref().map(find_target).transpose()?;

        let retry = RetryPolicy {
            max_retries: args.max_retries,
            initial_delay: Duration::from_secs(args.retry_delay_secs),
            ..RetryPolicy::default()
        };

        let acquisition = AcquisitionConfig {
            retry,
            search_radius_deg: args.radius_deg,
            ..AcquisitionConfig::default()
        };

        Ok(Self {
            target,
            color_mode,
            perform_detection: !args.no_detection,
            chunked_detection: args.chunked_detection,
            cache_dir: args.cache_dir.clone(),
            request_timeout: Duration::from_secs(args.timeout_secs),
            acquisition,
            detection: DetectionParams::default(),
            render: RenderOptions {
                stretch,
                max_panel_size: args.max_panel_size,
                overlay_colormap: color_mode.colormap(),
            },
            output,
        })
    }
}
