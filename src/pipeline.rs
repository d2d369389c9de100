use std::path::Path;

use crate::{
    codec::{load_image, save_png},
    extract::{ExtractThreading, extract_with},
    foundation::{core::PixelBuffer, error::MatteResult},
};

/// Decode + extract + encode one white/black pair.
///
/// This is the single-pair API used by both the CLI and the batch matcher. Both inputs are
/// decoded and the matte fully computed before `output` is touched, so a failed pair leaves no
/// file behind.
#[tracing::instrument(skip(threading))]
pub fn extract_pair_file(
    white: &Path,
    black: &Path,
    output: &Path,
    threading: &ExtractThreading,
) -> MatteResult<PixelBuffer> {
    let white_px = load_image(white)?;
    let black_px = load_image(black)?;
    let matte = extract_with(white_px, black_px, threading)?;
    save_png(output, &matte)?;
    tracing::debug!(width = matte.width(), height = matte.height(), "matte written");
    Ok(matte)
}
