//! JPEG normalization of images before they are sent to a provider.

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

use crate::error::PipelineError;

/// Re-encode arbitrary image bytes as JPEG.
///
/// Alpha is dropped since JPEG has no transparency. Animated GIFs contribute
/// their first frame.
pub fn to_jpeg(bytes: &[u8], path: &Path) -> Result<Vec<u8>, PipelineError> {
    let image = image::load_from_memory(bytes).map_err(|e| PipelineError::Decode {
        path: path.to_path_buf(),
        message: format!("Cannot decode image: {e}"),
    })?;

    let rgb = DynamicImage::ImageRgb8(image.into_rgb8());
    let mut buffer = Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("JPEG encoding failed: {e}"),
        })?;

    Ok(buffer.into_inner())
}

/// [`to_jpeg`] on the blocking pool, keeping the async runtime responsive.
pub async fn to_jpeg_blocking(bytes: Vec<u8>, path: &Path) -> Result<Vec<u8>, PipelineError> {
    let path_owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || to_jpeg(&bytes, &path_owned))
        .await
        .map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Task join error: {e}"),
        })?
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode a solid image of the given size in the given format.
    pub(crate) fn image_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::new_rgba8(width, height);
        let img = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.into_rgb8()),
            _ => img,
        };
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, format).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_png_becomes_jpeg() {
        let png = image_bytes(16, 8, ImageFormat::Png);
        let jpeg = to_jpeg(&png, Path::new("a.png")).unwrap();
        // JPEG SOI marker
        assert_eq!(&jpeg[0..3], &[0xFF, 0xD8, 0xFF]);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = to_jpeg(b"not an image", Path::new("bad.jpg")).unwrap_err();
        assert!(matches!(err, PipelineError::Decode { .. }));
        assert!(err.to_string().contains("bad.jpg"));
    }

    #[tokio::test]
    async fn test_blocking_variant() {
        let gif = image_bytes(4, 4, ImageFormat::Gif);
        let jpeg = to_jpeg_blocking(gif, Path::new("a.gif")).await.unwrap();
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
    }
}
