use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::errors::{CropperError, Result};

/// List the JPEG files at the top level of `input_dir`, sorted lexically by
/// file name so every run visits images in the same order.
///
/// Non-image entries are ignored. Read-only: nothing is created or touched.
pub fn list_images(input_dir: &Path) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Err(CropperError::DirectoryNotFound {
            path: input_dir.to_path_buf(),
        });
    }

    let mut image_files: Vec<PathBuf> = WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let supported = is_jpeg(e.path());
            if !supported {
                debug!("skipping non-JPEG entry: {}", e.path().display());
            }
            supported
        })
        .map(|e| e.into_path())
        .collect();

    image_files.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));

    Ok(image_files)
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn lists_jpegs_in_lexical_order() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        for name in ["b.jpg", "a.JPG", "c.jpeg", "notes.txt", "d.png"] {
            fs::write(temp_dir.path().join(name), b"stub").unwrap();
        }

        let images = list_images(temp_dir.path())?;
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.jpg", "c.jpeg"]);
        Ok(())
    }

    #[test]
    fn does_not_recurse_into_subdirectories() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        let subdir = temp_dir.path().join("nested");
        fs::create_dir_all(&subdir).unwrap();
        fs::write(subdir.join("deep.jpg"), b"stub").unwrap();
        fs::write(temp_dir.path().join("top.jpg"), b"stub").unwrap();

        let images = list_images(temp_dir.path())?;
        assert_eq!(images.len(), 1);
        assert!(images[0].ends_with("top.jpg"));
        Ok(())
    }

    #[test]
    fn missing_directory_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone");
        assert!(matches!(
            list_images(&missing),
            Err(CropperError::DirectoryNotFound { .. })
        ));
    }

    #[test]
    fn empty_directory_yields_empty_list() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        assert!(list_images(temp_dir.path())?.is_empty());
        Ok(())
    }
}
