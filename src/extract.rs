//! Difference matting: recover straight-alpha RGBA from a white-background pass and a
//! black-background pass of the same subject.
//!
//! Per pixel, the Euclidean RGB distance between the two observations is normalized by the
//! distance between the two backgrounds ([`BG_DIST`]). An opaque surface looks the same on both
//! backgrounds (distance 0, alpha 1); a fully transparent point shows the backgrounds themselves
//! (distance [`BG_DIST`], alpha 0). Foreground color is recovered from the black pass, where
//! `observed = alpha * foreground`.
//!
//! Quantization truncates toward zero for both color and alpha. Results are bit-identical between
//! the sequential and the row-parallel paths.

use rayon::prelude::*;

use crate::foundation::{
    core::{ColorSample, PixelBuffer, Rgba8},
    error::{MatteError, MatteResult},
};

/// RGB distance between pure white and pure black: `sqrt(3 * 255^2)`.
pub const BG_DIST: f64 = 441.672_955_930_063_7;

/// Alpha at or below this carries no usable color; such pixels emit black.
pub const ALPHA_EPSILON: f64 = 0.01;

/// Threading options for [`extract_with`].
#[derive(Clone, Debug, Default)]
pub struct ExtractThreading {
    /// Split rows across a rayon pool.
    pub parallel: bool,
    /// Override rayon worker threads (parallel mode only).
    pub threads: Option<usize>,
}

/// Extract an RGBA matte from a white/black pass pair, sequentially.
pub fn extract(white: PixelBuffer, black: PixelBuffer) -> MatteResult<PixelBuffer> {
    extract_with(white, black, &ExtractThreading::default())
}

/// Extract an RGBA matte, optionally row-parallel.
///
/// Fails with [`MatteError::DimensionMismatch`] before touching any pixel when the passes differ
/// in size. Input alpha is ignored.
#[tracing::instrument(skip(white, black), fields(width = white.width(), height = white.height()))]
pub fn extract_with(
    white: PixelBuffer,
    black: PixelBuffer,
    threading: &ExtractThreading,
) -> MatteResult<PixelBuffer> {
    if !white.is_congruent(&black) {
        return Err(MatteError::DimensionMismatch {
            white: white.dimensions(),
            black: black.dimensions(),
        });
    }

    let (width, height) = white.dimensions();
    let row_bytes = white.row_bytes();
    let mut out = vec![0u8; white.as_raw().len()];

    if threading.parallel {
        let pool = build_thread_pool(threading.threads)?;
        pool.install(|| {
            out.par_chunks_mut(row_bytes)
                .zip(white.as_raw().par_chunks(row_bytes))
                .zip(black.as_raw().par_chunks(row_bytes))
                .for_each(|((dst, w), b)| matte_row(dst, w, b));
        });
    } else {
        for ((dst, w), b) in out
            .chunks_mut(row_bytes)
            .zip(white.as_raw().chunks(row_bytes))
            .zip(black.as_raw().chunks(row_bytes))
        {
            matte_row(dst, w, b);
        }
    }

    PixelBuffer::new(width, height, out)
}

/// Matte a single pixel from its white-pass and black-pass observations.
pub fn matte_pixel(white: ColorSample, black: ColorSample) -> Rgba8 {
    let alpha = estimate_alpha(white, black);

    let mut out = [0u8; 4];
    if alpha > ALPHA_EPSILON {
        for c in 0..3 {
            out[c] = recover_channel(black[c], alpha);
        }
    }
    // `as` truncates toward zero; alpha is already within [0, 1].
    out[3] = (alpha * 255.0) as u8;
    out
}

/// Normalized alpha in `[0, 1]` for one pixel.
pub fn estimate_alpha(white: ColorSample, black: ColorSample) -> f64 {
    let dr = f64::from(white[0]) - f64::from(black[0]);
    let dg = f64::from(white[1]) - f64::from(black[1]);
    let db = f64::from(white[2]) - f64::from(black[2]);
    let pixel_dist = (dr * dr + dg * dg + db * db).sqrt();
    (1.0 - pixel_dist / BG_DIST).clamp(0.0, 1.0)
}

fn recover_channel(observed_on_black: u8, alpha: f64) -> u8 {
    (f64::from(observed_on_black) / alpha).min(255.0) as u8
}

fn matte_row(dst: &mut [u8], white: &[u8], black: &[u8]) {
    for ((d, w), b) in dst
        .chunks_exact_mut(4)
        .zip(white.chunks_exact(4))
        .zip(black.chunks_exact(4))
    {
        let px = matte_pixel([w[0], w[1], w[2]], [b[0], b[1], b[2]]);
        d.copy_from_slice(&px);
    }
}

fn build_thread_pool(threads: Option<usize>) -> MatteResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(MatteError::validation(
            "extract threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| MatteError::validation(format!("failed to build rayon thread pool: {e}")))
}
