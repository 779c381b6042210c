use bumpalo::Bump;

/// Result of iterative sigma clipping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClippedStats {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    /// Pixels surviving the final iteration
    pub retained: usize,
    pub iterations: usize,
}

/// Detection threshold derived from the sigma-clipped background
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub background: f64,
    pub noise: f64,
    pub nsigma: f64,
}

impl Threshold {
    pub fn new(background: f64, noise: f64, nsigma: f64) -> Self {
        Self {
            background,
            noise,
            nsigma,
        }
    }

    /// Threshold at a pixel index. The background model is flat, so every
    /// pixel shares one level.
    #[inline]
    pub fn at(&self, _index: usize) -> f64 {
        self.level()
    }

    pub fn level(&self) -> f64 {
        self.background + self.nsigma * self.noise
    }
}

/// Sigma-clipped mean, median and standard deviation of the finite values.
///
/// Each iteration rejects values farther than `sigma` standard deviations
/// from the median, stopping when nothing more is rejected or after
/// `maxiters` iterations. Returns `None` when no value is finite.
pub fn sigma_clipped_stats(data: &[f32], sigma: f64, maxiters: usize) -> Option<ClippedStats> {
    let arena = Bump::new();
    let mut sorted = bumpalo::vec![in &arena];
    sorted.extend(data.iter().copied().filter(|v| v.is_finite()));
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_unstable_by(|a: &f32, b: &f32| a.total_cmp(b));

    // Clipping is symmetric about the median, so survivors stay contiguous
    let (mut lo, mut hi) = (0usize, sorted.len());
    let mut iterations = 0;

    while iterations < maxiters {
        let window = &sorted[lo..hi];
        let median = median_of_sorted(window);
        let (_, std_dev) = mean_std(window);
        iterations += 1;

        let lower = median - sigma * std_dev;
        let upper = median + sigma * std_dev;
        let new_lo = lo + window.partition_point(|&v| (v as f64) < lower);
        let new_hi = lo + window.partition_point(|&v| (v as f64) <= upper);

        if new_lo == lo && new_hi == hi {
            break;
        }
        if new_lo >= new_hi {
            break;
        }
        lo = new_lo;
        hi = new_hi;
    }

    let window = &sorted[lo..hi];
    let (mean, std_dev) = mean_std(window);
    Some(ClippedStats {
        mean,
        median: median_of_sorted(window),
        std_dev,
        retained: window.len(),
        iterations,
    })
}

/// Clipped mean plus `nsigma` times the clipped noise
pub fn detect_threshold(data: &[f32], nsigma: f64, sigma: f64, maxiters: usize) -> Option<Threshold> {
    let stats = sigma_clipped_stats(data, sigma, maxiters)?;
    tracing::debug!(
        "Sigma-clipped background: mean={:.4} median={:.4} std={:.4} ({} of {} pixels, {} iterations)",
        stats.mean,
        stats.median,
        stats.std_dev,
        stats.retained,
        data.len(),
        stats.iterations
    );
    Some(Threshold::new(stats.mean, stats.std_dev, nsigma))
}

fn median_of_sorted(sorted: &[f32]) -> f64 {
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0
    } else {
        sorted[n / 2] as f64
    }
}

fn mean_std(values: &[f32]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
