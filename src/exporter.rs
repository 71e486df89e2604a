use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use log::info;

use crate::errors::{CropperError, Result};
use crate::roi::Roi;

/// Fixed encoder quality for exported crops. Keeping it constant makes
/// re-runs reproduce byte-identical files for identical selections.
pub const JPEG_QUALITY: u8 = 90;

/// Writes the committed rectangles of one image as individual JPEG files
/// into the output directory.
pub struct CropExporter {
    output_dir: PathBuf,
}

impl CropExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Export one crop per rectangle as `<stem>_<index>.jpg`, zero-based in
    /// draw order. Existing files are overwritten. Every rectangle is
    /// validated against the image bounds first; an out-of-bounds rectangle
    /// aborts the whole export rather than being clamped, since the surface
    /// should never have produced one.
    pub fn export(
        &self,
        image: &DynamicImage,
        source_name: &str,
        rois: &[Roi],
    ) -> Result<Vec<PathBuf>> {
        for roi in rois {
            if !roi.is_valid() || !roi.fits_within(image.width(), image.height()) {
                return Err(CropperError::CropOutOfBounds {
                    roi: *roi,
                    width: image.width(),
                    height: image.height(),
                    path: PathBuf::from(source_name),
                });
            }
        }

        fs::create_dir_all(&self.output_dir).map_err(|e| CropperError::FileSystem {
            path: self.output_dir.clone(),
            operation: "create output directory".to_string(),
            source: e,
        })?;

        let stem = Path::new(source_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(source_name);

        let mut written = Vec::with_capacity(rois.len());
        for (index, roi) in rois.iter().enumerate() {
            let crop = image.crop_imm(roi.x, roi.y, roi.width, roi.height);
            let out_path = self.output_dir.join(format!("{stem}_{index}.jpg"));
            self.write_jpeg(&crop, &out_path)?;
            info!(
                "saved crop {} of {}: {}",
                index,
                source_name,
                out_path.display()
            );
            written.push(out_path);
        }

        Ok(written)
    }

    fn write_jpeg(&self, crop: &DynamicImage, out_path: &Path) -> Result<()> {
        let file = File::create(out_path).map_err(|e| CropperError::FileSystem {
            path: out_path.to_path_buf(),
            operation: "create crop file".to_string(),
            source: e,
        })?;
        let mut writer = BufWriter::new(file);
        let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
        crop.to_rgb8()
            .write_with_encoder(encoder)
            .map_err(|e| CropperError::FileSystem {
                path: out_path.to_path_buf(),
                operation: "encode crop".to_string(),
                source: std::io::Error::other(e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 120, 40])))
    }

    #[test]
    fn exports_one_file_per_roi_with_exact_dimensions() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let exporter = CropExporter::new(temp_dir.path());
        let image = test_image(100, 80);
        let rois = [Roi::new(10, 10, 30, 30), Roi::new(0, 0, 100, 80)];

        let written = exporter.export(&image, "photo.jpg", &rois)?;
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("photo_0.jpg"));
        assert!(written[1].ends_with("photo_1.jpg"));

        let crop = image::open(&written[0]).unwrap();
        assert_eq!((crop.width(), crop.height()), (30, 30));
        let full = image::open(&written[1]).unwrap();
        assert_eq!((full.width(), full.height()), (100, 80));
        Ok(())
    }

    #[test]
    fn out_of_bounds_roi_is_rejected_not_clamped() {
        let temp_dir = TempDir::new().unwrap();
        let exporter = CropExporter::new(temp_dir.path());
        let image = test_image(50, 50);

        let result = exporter.export(&image, "photo.jpg", &[Roi::new(30, 30, 30, 30)]);
        assert!(matches!(
            result,
            Err(CropperError::CropOutOfBounds { width: 50, .. })
        ));
        // 不正な矩形が一つでもあれば何も書き出さない
        assert!(!temp_dir.path().join("photo_0.jpg").exists());
    }

    #[test]
    fn zero_area_roi_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let exporter = CropExporter::new(temp_dir.path());
        let image = test_image(50, 50);

        let result = exporter.export(&image, "photo.jpg", &[Roi::new(10, 10, 0, 5)]);
        assert!(matches!(result, Err(CropperError::CropOutOfBounds { .. })));
    }

    #[test]
    fn rerun_overwrites_existing_crops() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let exporter = CropExporter::new(temp_dir.path());
        let rois = [Roi::new(0, 0, 20, 20)];

        exporter.export(&test_image(40, 40), "photo.jpg", &rois)?;
        let first = fs::read(temp_dir.path().join("photo_0.jpg")).unwrap();

        exporter.export(&test_image(40, 40), "photo.jpg", &rois)?;
        let second = fs::read(temp_dir.path().join("photo_0.jpg")).unwrap();

        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn creates_missing_output_directory() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("out").join("crops");
        let exporter = CropExporter::new(&nested);

        exporter.export(&test_image(30, 30), "photo.jpg", &[Roi::new(0, 0, 10, 10)])?;
        assert!(nested.join("photo_0.jpg").exists());
        Ok(())
    }
}
