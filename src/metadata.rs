use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::errors::{CropperError, Result};
use crate::roi::Roi;

/// File name of the persisted ROI record inside the output directory.
pub const METADATA_FILE: &str = "rois.json";

/// Mapping from source file name to its committed rectangles, in draw order.
/// A sorted map keeps the persisted file deterministic across runs.
pub type SessionRecord = BTreeMap<String, Vec<Roi>>;

/// Accumulates the session record in memory and persists it as `rois.json`.
///
/// The write goes through a temporary file in the same directory followed by
/// a rename, so an interrupted run never leaves a partial file behind.
pub struct MetadataWriter {
    path: PathBuf,
    record: SessionRecord,
}

impl MetadataWriter {
    /// Open the writer for an output directory, picking up a record left by
    /// a previous run so untouched entries survive a re-run. A malformed
    /// existing file is logged and replaced on the next flush.
    pub fn open(output_dir: &Path) -> Self {
        let path = output_dir.join(METADATA_FILE);
        let record = match fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<SessionRecord>(&data) {
                Ok(record) => {
                    if !record.is_empty() {
                        info!(
                            "loaded {} existing ROI entr{} from {}",
                            record.len(),
                            if record.len() == 1 { "y" } else { "ies" },
                            path.display()
                        );
                    }
                    record
                }
                Err(e) => {
                    warn!(
                        "ignoring malformed {}: {} (it will be rewritten)",
                        path.display(),
                        e
                    );
                    SessionRecord::new()
                }
            },
            Err(_) => SessionRecord::new(),
        };

        Self { path, record }
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    /// Rectangles a previous run committed for this image, if any.
    pub fn previous_rois(&self, source_name: &str) -> Option<&[Roi]> {
        self.record.get(source_name).map(Vec::as_slice)
    }

    /// Replace the entry for `source_name` with this run's rectangles.
    pub fn insert(&mut self, source_name: impl Into<String>, rois: Vec<Roi>) {
        self.record.insert(source_name.into(), rois);
    }

    /// Persist the full record atomically. An empty record still writes a
    /// valid `{}` file.
    pub fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CropperError::FileSystem {
                path: parent.to_path_buf(),
                operation: "create output directory".to_string(),
                source: e,
            })?;
        }

        let data = serde_json::to_string_pretty(&self.record).map_err(|e| {
            CropperError::MetadataWrite {
                path: self.path.clone(),
                source: Box::new(e),
            }
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data).map_err(|e| CropperError::MetadataWrite {
            path: tmp_path.clone(),
            source: Box::new(e),
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|e| CropperError::MetadataWrite {
            path: self.path.clone(),
            source: Box::new(e),
        })?;

        Ok(())
    }
}
