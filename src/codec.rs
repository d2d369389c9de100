use std::{io::Cursor, path::Path};

use anyhow::Context as _;
use image::ImageEncoder as _;

use crate::foundation::{
    core::PixelBuffer,
    error::{MatteError, MatteResult},
};

/// Decode any format the `image` crate recognizes into straight RGBA8.
pub fn decode_image(bytes: &[u8]) -> MatteResult<PixelBuffer> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| MatteError::codec(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    PixelBuffer::new(width, height, rgba.into_raw())
}

/// Read and decode an image file.
pub fn load_image(path: &Path) -> MatteResult<PixelBuffer> {
    if !path.is_file() {
        return Err(MatteError::not_found(path));
    }
    let bytes = std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    decode_image(&bytes).map_err(|e| match e {
        MatteError::Codec(msg) => MatteError::codec(format!("'{}': {msg}", path.display())),
        other => other,
    })
}

/// Encode a buffer as an RGBA PNG in memory.
pub fn encode_png(buffer: &PixelBuffer) -> MatteResult<Vec<u8>> {
    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(Cursor::new(&mut out))
        .write_image(
            buffer.as_raw(),
            buffer.width(),
            buffer.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| MatteError::codec(format!("encode png: {e}")))?;
    Ok(out)
}

/// Encode `buffer` as PNG and write it to `path` in a single call.
///
/// The parent directory is created when missing. Nothing is written if encoding fails.
pub fn save_png(path: &Path, buffer: &PixelBuffer) -> MatteResult<()> {
    let bytes = encode_png(buffer)?;
    ensure_parent_dir(path)?;
    std::fs::write(path, bytes).with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

pub fn ensure_parent_dir(path: &Path) -> MatteResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32, rgba: Vec<u8>) -> Vec<u8> {
        let img = image::RgbaImage::from_raw(width, height, rgba).unwrap();
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decode_png_keeps_straight_rgba() {
        let bytes = png_bytes(1, 1, vec![100, 50, 200, 128]);
        let buf = decode_image(&bytes).unwrap();
        assert_eq!(buf.dimensions(), (1, 1));
        assert_eq!(buf.as_raw(), &[100, 50, 200, 128]);
    }

    #[test]
    fn decode_rgb_source_gets_opaque_alpha() {
        let img = image::RgbImage::from_raw(2, 1, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let buf = decode_image(&bytes).unwrap();
        assert_eq!(buf.as_raw(), &[1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn decode_garbage_is_codec_error() {
        assert!(matches!(
            decode_image(b"not an image"),
            Err(MatteError::Codec(_))
        ));
    }

    #[test]
    fn encode_then_decode_preserves_alpha() {
        let src = PixelBuffer::new(2, 1, vec![121, 121, 121, 105, 0, 0, 0, 0]).unwrap();
        let bytes = encode_png(&src).unwrap();
        assert_eq!(
            image::guess_format(&bytes).unwrap(),
            image::ImageFormat::Png
        );
        assert_eq!(decode_image(&bytes).unwrap(), src);
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let path = std::env::temp_dir().join("diffmatte_codec_missing_file.png");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(load_image(&path), Err(MatteError::NotFound { .. })));
    }
}
