use std::path::PathBuf;

use clap::Parser;

use crate::errors::{CropperError, Result};

/// Iterate over JPEG images, ask for ROIs and save crops.
#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Path to the directory containing JPEG files.
    #[arg(short, long = "input_dir")]
    pub input_dir: PathBuf,

    /// Directory to save cropped images and ROI data.
    #[arg(short, long = "output_dir")]
    pub output_dir: PathBuf,
}

impl Config {
    /// Reject missing or non-directory paths before any window opens.
    /// The output directory is allowed to be absent; it is created at
    /// startup, but an existing non-directory path there is an error.
    pub fn validate(&self) -> Result<()> {
        if !self.input_dir.is_dir() {
            return Err(CropperError::DirectoryNotFound {
                path: self.input_dir.clone(),
            });
        }
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(CropperError::DirectoryNotFound {
                path: self.output_dir.clone(),
            });
        }
        Ok(())
    }
}
