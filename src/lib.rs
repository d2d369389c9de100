//! Difference matting for sprite pipelines.
//!
//! Photograph (or render) a subject twice, once over pure white and once over pure black, and
//! recover a straight-alpha RGBA image from the pair:
//!
//! - [`extract`] / [`extract_with`]: the pure per-pixel matte over two congruent buffers
//! - [`extract_pair_file`]: decode + extract + encode a single pair of files
//! - [`match_and_process`]: discover `<base>_white.*` / `<base>_black.*` pairs in a directory
//! - [`remove_background_file`]: single-image fallback through an external remover
#![forbid(unsafe_code)]

mod foundation;

pub mod batch;
pub mod codec;
pub mod extract;
pub mod fallback;
pub mod pipeline;

pub use crate::foundation::core::{ColorSample, PixelBuffer, Rgba8};
pub use crate::foundation::error::{MatteError, MatteResult};

pub use crate::batch::{
    BatchOptions, BatchReport, BatchWarning, MatchedPair, PairScan, ScanEntry, discover_pairs,
    match_and_process,
};
pub use crate::codec::{decode_image, encode_png, load_image, save_png};
pub use crate::extract::{
    ALPHA_EPSILON, BG_DIST, ExtractThreading, estimate_alpha, extract, extract_with, matte_pixel,
};
pub use crate::fallback::{
    Availability, BackgroundRemover, CommandRemover, DEFAULT_REMOVER, probe_remover,
    remove_background_file,
};
pub use crate::pipeline::extract_pair_file;
