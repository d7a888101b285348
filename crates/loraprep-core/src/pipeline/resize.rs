//! Square resizing of a dataset for training resolutions.

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::path::Path;

use crate::error::PipelineError;
use crate::output::OutputDirectory;

use super::discovery::ImageScanner;

/// Counts from a resize run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeSummary {
    pub resized: usize,
    pub failed: usize,
}

/// Resizes every image of a dataset to `size × size`.
pub struct Resizer {
    scanner: ImageScanner,
    size: u32,
}

impl Resizer {
    pub fn new(scanner: ImageScanner, size: u32) -> Self {
        Self { scanner, size }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Resize all images in `src` into the fresh directory `dst`.
    ///
    /// Images are scaled to cover the square and center-cropped, then saved
    /// under their original file name and format. Unreadable images are
    /// logged and skipped. `on_item` is called after each image with its
    /// file name and whether it succeeded.
    pub async fn resize_dataset(
        &self,
        src: &Path,
        dst: &Path,
        on_item: impl Fn(&str, bool),
    ) -> Result<ResizeSummary, PipelineError> {
        let items = self.scanner.scan(src)?;
        if items.is_empty() {
            return Err(PipelineError::EmptyDataset(src.to_path_buf()));
        }
        let output = OutputDirectory::create(dst)?;
        tracing::info!("Found {} image(s) to resize to {}x{}", items.len(), self.size, self.size);

        let mut summary = ResizeSummary::default();
        for item in items {
            let name = item.file_name();
            let target = output.path().join(&name);
            let source = item.source_path.clone();
            let size = self.size;

            let result = tokio::task::spawn_blocking(move || resize_file(&source, &target, size))
                .await
                .unwrap_or_else(|e| {
                    Err(PipelineError::Decode {
                        path: item.source_path.clone(),
                        message: format!("Task join error: {e}"),
                    })
                });

            match result {
                Ok(()) => {
                    summary.resized += 1;
                    tracing::debug!("Resized {name} to {size}x{size}");
                    on_item(&name, true);
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!("Failed to resize {name}: {e}");
                    on_item(&name, false);
                }
            }
        }

        Ok(summary)
    }
}

/// Cover-fit `img` into a `size × size` square, cropping the overflow evenly.
pub fn cover_square(img: &DynamicImage, size: u32) -> DynamicImage {
    img.resize_to_fill(size, size, FilterType::Lanczos3)
}

fn resize_file(source: &Path, target: &Path, size: u32) -> Result<(), PipelineError> {
    let decode_err = |message: String| PipelineError::Decode {
        path: source.to_path_buf(),
        message,
    };

    let img = image::open(source).map_err(|e| decode_err(format!("Cannot decode image: {e}")))?;
    let format = ImageFormat::from_path(source)
        .map_err(|e| decode_err(format!("Unknown output format: {e}")))?;

    let resized = cover_square(&img, size);
    // JPEG cannot store alpha
    let resized = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(resized.into_rgb8()),
        _ => resized,
    };
    if let Err(e) = resized.save_with_format(target, format) {
        // The encoder may fail after the file was created
        if target.exists() {
            let _ = std::fs::remove_file(target);
        }
        return Err(decode_err(format!("Cannot write {}: {e}", target.display())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::tests::image_bytes;
    use std::fs;
    use std::sync::Mutex;

    #[test]
    fn test_cover_square_crops_to_exact_size() {
        let wide = DynamicImage::new_rgb8(300, 100);
        let out = cover_square(&wide, 64);
        assert_eq!((out.width(), out.height()), (64, 64));

        let tall = DynamicImage::new_rgb8(50, 400);
        let out = cover_square(&tall, 512);
        assert_eq!((out.width(), out.height()), (512, 512));
    }

    #[test]
    fn test_failed_encode_leaves_no_partial_file() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let source = src.path().join("icon.ico");
        fs::write(&source, image_bytes(16, 16, ImageFormat::Ico)).unwrap();
        let target = dst.path().join("icon.ico");

        // ICO cannot hold images larger than 256x256
        let err = resize_file(&source, &target, 300).unwrap_err();

        assert!(matches!(err, PipelineError::Decode { .. }));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_resize_dataset() {
        let src = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        fs::write(src.path().join("a.png"), image_bytes(40, 20, ImageFormat::Png)).unwrap();
        fs::write(src.path().join("b.jpg"), image_bytes(20, 40, ImageFormat::Jpeg)).unwrap();
        fs::write(src.path().join("broken.png"), b"nope").unwrap();
        let dst = root.path().join("set-16");

        let seen = Mutex::new(Vec::new());
        let summary = Resizer::new(ImageScanner::default(), 16)
            .resize_dataset(src.path(), &dst, |name, ok| {
                seen.lock().unwrap().push((name.to_string(), ok))
            })
            .await
            .unwrap();

        assert_eq!(summary, ResizeSummary { resized: 2, failed: 1 });
        for name in ["a.png", "b.jpg"] {
            let (w, h) = image::image_dimensions(dst.join(name)).unwrap();
            assert_eq!((w, h), (16, 16), "{name}");
        }
        assert!(!dst.join("broken.png").exists());
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_resize_refuses_existing_output() {
        let src = tempfile::tempdir().unwrap();
        fs::write(src.path().join("a.png"), image_bytes(4, 4, ImageFormat::Png)).unwrap();
        let dst = tempfile::tempdir().unwrap();

        let err = Resizer::new(ImageScanner::default(), 8)
            .resize_dataset(src.path(), dst.path(), |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::AlreadyExists(_)));
    }
}
