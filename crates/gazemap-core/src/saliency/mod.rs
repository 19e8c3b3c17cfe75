//! Saliency-map construction from raw gaze fixations.
//!
//! A map is built by rasterizing in-bounds fixations onto a zeroed grid at
//! the source image's resolution, smoothing with a Gaussian kernel, min-max
//! normalizing to `[0, 1]`, and resizing to the model input resolution.

// Allow common numeric conversion patterns in raster code
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

use crate::domain::{GazePoint, INPUT_SIZE};
use crate::error::{CoreError, CoreResult};

/// Which fixation samples of the merged stream are rasterized.
///
/// The source pipeline hard-coded this subsampling (visit every `stride`-th
/// sample starting at `offset`, dropping the last `tail` of the subsampled
/// view) with no recorded rationale. It is kept as the default behavior but
/// made an explicit policy so callers can widen or disable it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimPolicy {
    /// Index of the first sample visited.
    pub offset: usize,
    /// Step between visited samples.
    pub stride: usize,
    /// Number of subsampled entries dropped from the end.
    pub tail: usize,
}

impl Default for TrimPolicy {
    fn default() -> Self {
        Self {
            offset: 10,
            stride: 4,
            tail: 3,
        }
    }
}

impl TrimPolicy {
    /// A policy that visits every sample.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            offset: 0,
            stride: 1,
            tail: 0,
        }
    }

    /// Indices of the merged stream visited under this policy.
    pub fn indices(&self, len: usize) -> impl Iterator<Item = usize> + '_ {
        let stride = self.stride.max(1);
        let take = (len / stride).saturating_sub(self.tail);
        (0..take)
            .map(move |j| self.offset + j * stride)
            .filter(move |&i| i < len)
    }
}

/// Parameters for saliency-map construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SaliencyConfig {
    /// Standard deviation of the Gaussian smoothing kernel, in pixels.
    pub sigma: f32,
    /// Fixation subsampling policy.
    pub trim: TrimPolicy,
}

impl Default for SaliencyConfig {
    fn default() -> Self {
        Self {
            sigma: 19.0,
            trim: TrimPolicy::default(),
        }
    }
}

/// A normalized single-channel saliency grid.
///
/// Values are in `[0, 1]` with at least one pixel at each extreme.
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SaliencyMap {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl SaliencyMap {
    /// Builds a saliency map from a merged fixation stream.
    ///
    /// `points` is the session-ordered dominant-eye stream; `None` entries
    /// are dropped-tracking gaps. Only entries visited by the trim policy
    /// with both coordinates strictly inside `(0, 1)` are rasterized.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::FlatMap`] when the blurred grid has no value
    /// range to normalize over (no in-bounds fixation, or a saturated
    /// grid). Callers should treat the input as corrupt rather than let a
    /// NaN-filled map propagate.
    pub fn from_fixations(
        points: &[Option<GazePoint>],
        height: usize,
        width: usize,
        config: &SaliencyConfig,
    ) -> CoreResult<Self> {
        let mut grid = vec![0.0f32; height * width];
        let mut in_bounds = 0usize;

        for idx in config.trim.indices(points.len()) {
            let Some(point) = points[idx] else { continue };
            if !point.in_bounds() {
                continue;
            }
            let x = (point.x * width as f32) as usize;
            let y = (point.y * height as f32) as usize;
            grid[y * width + x] = 1.0;
            in_bounds += 1;
        }

        gaussian_blur(&mut grid, height, width, config.sigma);
        normalize_min_max(&mut grid).map_err(|()| CoreError::FlatMap { in_bounds })?;

        Ok(Self {
            width,
            height,
            data: grid,
        })
    }

    /// Map width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Map height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Row-major map values.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Consumes the map, returning its values.
    #[must_use]
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Value at `(row, col)`.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    /// Position `(row, col)` of the maximum value.
    #[must_use]
    pub fn argmax(&self) -> (usize, usize) {
        let mut best = 0usize;
        for (i, &v) in self.data.iter().enumerate() {
            if v > self.data[best] {
                best = i;
            }
        }
        (best / self.width, best % self.width)
    }

    /// Bilinearly resizes the map to `target_height` × `target_width`.
    ///
    /// Uses half-pixel centers, so resizing to the map's own dimensions is
    /// the identity.
    #[must_use]
    pub fn resize(&self, target_height: usize, target_width: usize) -> Self {
        if target_height == self.height && target_width == self.width {
            return self.clone();
        }

        let mut out = vec![0.0f32; target_height * target_width];
        let scale_y = self.height as f32 / target_height as f32;
        let scale_x = self.width as f32 / target_width as f32;

        for ty in 0..target_height {
            let sy = ((ty as f32 + 0.5) * scale_y - 0.5).max(0.0);
            let y0 = (sy as usize).min(self.height - 1);
            let y1 = (y0 + 1).min(self.height - 1);
            let fy = sy - y0 as f32;

            for tx in 0..target_width {
                let sx = ((tx as f32 + 0.5) * scale_x - 0.5).max(0.0);
                let x0 = (sx as usize).min(self.width - 1);
                let x1 = (x0 + 1).min(self.width - 1);
                let fx = sx - x0 as f32;

                let top = self.get(y0, x0) * (1.0 - fx) + self.get(y0, x1) * fx;
                let bottom = self.get(y1, x0) * (1.0 - fx) + self.get(y1, x1) * fx;
                out[ty * target_width + tx] = top * (1.0 - fy) + bottom * fy;
            }
        }

        Self {
            width: target_width,
            height: target_height,
            data: out,
        }
    }

    /// Resizes to the model input resolution.
    #[must_use]
    pub fn to_model_input(&self) -> Self {
        self.resize(INPUT_SIZE, INPUT_SIZE)
    }
}

/// In-place min-max normalization to `[0, 1]`.
///
/// Fails when the grid is flat, which would otherwise divide by zero.
fn normalize_min_max(grid: &mut [f32]) -> Result<(), ()> {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in grid.iter() {
        min = min.min(v);
        max = max.max(v);
    }
    let range = max - min;
    if !(range > 0.0) {
        return Err(());
    }
    for v in grid.iter_mut() {
        *v = (*v - min) / range;
    }
    Ok(())
}

/// Separable Gaussian smoothing with reflect boundary handling.
///
/// Kernel radius is `⌊4σ + 0.5⌋`, matching the truncation the source
/// pipeline's filter used.
pub fn gaussian_blur(grid: &mut [f32], height: usize, width: usize, sigma: f32) {
    debug_assert_eq!(grid.len(), height * width);
    if sigma <= 0.0 || grid.is_empty() {
        return;
    }

    let kernel = gaussian_kernel(sigma);
    let mut scratch = vec![0.0f32; grid.len()];

    // Horizontal pass: grid -> scratch
    for row in 0..height {
        let line = &grid[row * width..(row + 1) * width];
        let out = &mut scratch[row * width..(row + 1) * width];
        convolve_line(line, out, &kernel);
    }

    // Vertical pass: scratch -> grid (via per-column gather)
    let mut column = vec![0.0f32; height];
    let mut blurred = vec![0.0f32; height];
    for col in 0..width {
        for row in 0..height {
            column[row] = scratch[row * width + col];
        }
        convolve_line(&column, &mut blurred, &kernel);
        for row in 0..height {
            grid[row * width + col] = blurred[row];
        }
    }
}

/// Normalized 1-D Gaussian kernel of radius `⌊4σ + 0.5⌋`.
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (4.0 * sigma + 0.5) as usize;
    let radius = radius.max(1);
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);

    let mut kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let d = i as f64 - radius as f64;
            (-d * d / denom).exp() as f32
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// 1-D convolution with reflect boundary indexing.
fn convolve_line(line: &[f32], out: &mut [f32], kernel: &[f32]) {
    let n = line.len() as isize;
    let radius = (kernel.len() / 2) as isize;
    for (i, o) in out.iter_mut().enumerate() {
        let mut acc = 0.0f32;
        for (k, &w) in kernel.iter().enumerate() {
            let idx = i as isize + k as isize - radius;
            acc += w * line[reflect_index(idx, n)];
        }
        *o = acc;
    }
}

/// Reflects an out-of-range index back into `[0, n)`.
///
/// Uses the `(d c b a | a b c d | d c b a)` scheme, folding repeatedly for
/// kernels wider than the line.
fn reflect_index(mut i: isize, n: isize) -> usize {
    if n == 1 {
        return 0;
    }
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= n {
            i = 2 * n - 1 - i;
        } else {
            return i as usize;
        }
    }
}
