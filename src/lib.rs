pub mod acquisition;
pub mod archive;
pub mod cache;
pub mod cli;
pub mod colormap;
pub mod commands;
pub mod config;
pub mod detection;
pub mod error;
pub mod fits;
pub mod image;
pub mod normalize;
pub mod render;
pub mod retry;
pub mod targets;
pub mod utils;
pub mod viewer;
pub mod wcs;

// Re-export commonly used items
pub use image::{ImageStatistics, SkyImage};
pub use targets::{Target, TARGETS};
