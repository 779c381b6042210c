/// Display normalization: a min/max interval followed by a stretch
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Default softening for the log stretch
pub const DEFAULT_LOG_A: f64 = 1000.0;
/// Default softening for the asinh stretch
pub const DEFAULT_ASINH_A: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stretch {
    Linear,
    Log { a: f64 },
    Asinh { a: f64 },
}

impl Default for Stretch {
    fn default() -> Self {
        Stretch::Log { a: DEFAULT_LOG_A }
    }
}

impl Stretch {
    /// Map an interval-normalized value in [0, 1] to display space
    pub fn apply(&self, x: f64) -> f64 {
        match *self {
            Stretch::Linear => x,
            Stretch::Log { a } => (a * x + 1.0).ln() / (a + 1.0).ln(),
            Stretch::Asinh { a } => (x / a).asinh() / (1.0 / a).asinh(),
        }
    }
}

impl fmt::Display for Stretch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stretch::Linear => write!(f, "linear"),
            Stretch::Log { a } => write!(f, "log (a={})", a),
            Stretch::Asinh { a } => write!(f, "asinh (a={})", a),
        }
    }
}

impl FromStr for Stretch {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Stretch::Linear),
            "log" => Ok(Stretch::Log { a: DEFAULT_LOG_A }),
            "asinh" => Ok(Stretch::Asinh { a: DEFAULT_ASINH_A }),
            _ => Err(ConfigError::UnsupportedStretch(s.to_string())),
        }
    }
}

/// Range of finite pixel values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxInterval {
    pub vmin: f64,
    pub vmax: f64,
}

impl MinMaxInterval {
    /// `None` when no pixel is finite
    pub fn from_data(data: &[f32]) -> Option<Self> {
        let mut finite = data.iter().copied().filter(|v| v.is_finite());
        let first = finite.next()? as f64;
        let (vmin, vmax) = finite.fold((first, first), |(lo, hi), v| {
            (lo.min(v as f64), hi.max(v as f64))
        });
        Some(Self { vmin, vmax })
    }

    pub fn normalize(&self, value: f64) -> f64 {
        let range = self.vmax - self.vmin;
        if range <= 0.0 {
            return 0.0;
        }
        ((value - self.vmin) / range).clamp(0.0, 1.0)
    }
}

/// Interval plus stretch, applied per pixel
#[derive(Debug, Clone, Copy)]
pub struct ImageNormalize {
    pub interval: MinMaxInterval,
    pub stretch: Stretch,
}

impl ImageNormalize {
    pub fn new(data: &[f32], stretch: Stretch) -> Self {
        let interval = MinMaxInterval::from_data(data).unwrap_or(MinMaxInterval {
            vmin: 0.0,
            vmax: 0.0,
        });
        tracing::debug!(
            "Normalization interval [{}, {}] with {} stretch",
            interval.vmin,
            interval.vmax,
            stretch
        );
        Self { interval, stretch }
    }

    /// Display value in [0, 1], or `None` for non-finite pixels
    pub fn normalize(&self, value: f32) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        let x = self.interval.normalize(value as f64);
        Some(self.stretch.apply(x).clamp(0.0, 1.0))
    }

    /// Inverse of the stretch, used to label colorbars in data units
    pub fn data_value(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        let x = match self.stretch {
            Stretch::Linear => t,
            Stretch::Log { a } => ((a + 1.0).powf(t) - 1.0) / a,
            Stretch::Asinh { a } => a * (t * (1.0 / a).asinh()).sinh(),
        };
        self.interval.vmin + x * (self.interval.vmax - self.interval.vmin)
    }
}
