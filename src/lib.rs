pub mod app;
pub mod config;
pub mod errors;
pub mod exporter;
pub mod metadata;
pub mod roi;
pub mod session;
pub mod sources;

pub use config::Config;
pub use errors::{CropperError, Result};
pub use exporter::{CropExporter, JPEG_QUALITY};
pub use metadata::{MetadataWriter, SessionRecord, METADATA_FILE};
pub use roi::{Roi, RoiStore};
pub use session::{SessionController, SessionState, SurfaceEvent};
