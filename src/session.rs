use std::path::PathBuf;

use image::DynamicImage;
use log::{info, warn};

use crate::config::Config;
use crate::errors::{CropperError, Result};
use crate::exporter::CropExporter;
use crate::metadata::MetadataWriter;
use crate::roi::{Roi, RoiStore};
use crate::sources;

/// Discrete events emitted by the selection surface and consumed
/// synchronously by the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// A completed pointer drag produced a rectangle.
    RectangleDrawn(Roi),
    /// Freeze the current collection, export crops, record metadata, advance.
    Commit,
    /// Skip the current image: no crops, no metadata entry.
    Advance,
    /// Terminate the whole session after flushing committed metadata.
    Interrupt,
}

/// Session progress through the image sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading(usize),
    AwaitingSelection(usize),
    Exporting(usize),
    Terminated,
}

/// The image currently on screen.
pub struct CurrentImage {
    pub path: PathBuf,
    /// Source file name (stem + extension), the metadata key.
    pub name: String,
    pub image: DynamicImage,
}

/// Drives the per-image loop: load, await selection, export, advance.
///
/// Owns the ROI store, exporter and metadata writer; the selection surface
/// only renders state and feeds events in. Everything here is headless,
/// which is what the integration tests rely on.
pub struct SessionController {
    images: Vec<PathBuf>,
    state: SessionState,
    current: Option<CurrentImage>,
    store: RoiStore,
    exporter: CropExporter,
    writer: MetadataWriter,
}

impl SessionController {
    /// Enumerate the input directory and open the metadata writer. Fails
    /// eagerly if the input directory is missing; no window exists yet at
    /// this point.
    pub fn new(config: &Config) -> Result<Self> {
        let images = sources::list_images(&config.input_dir)?;
        info!(
            "found {} JPEG image(s) in {}",
            images.len(),
            config.input_dir.display()
        );

        Ok(Self {
            images,
            state: SessionState::Idle,
            current: None,
            store: RoiStore::new(),
            exporter: CropExporter::new(&config.output_dir),
            writer: MetadataWriter::open(&config.output_dir),
        })
    }

    /// Load the first image. With an empty input directory the session
    /// terminates immediately, still writing the (possibly empty) record.
    pub fn start(&mut self) -> Result<()> {
        debug_assert!(matches!(self.state, SessionState::Idle));
        self.load_from(0)
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.state, SessionState::Terminated)
    }

    pub fn current(&self) -> Option<&CurrentImage> {
        self.current.as_ref()
    }

    /// Rectangles drawn on the current image so far, in draw order.
    pub fn pending_rois(&self) -> &[Roi] {
        self.store.rois()
    }

    /// Rectangles a previous run committed for the current image, shown as
    /// reference outlines only.
    pub fn previous_rois(&self) -> &[Roi] {
        self.current
            .as_ref()
            .and_then(|c| self.writer.previous_rois(&c.name))
            .unwrap_or(&[])
    }

    /// (1-based position of the current image, total image count).
    pub fn progress(&self) -> (usize, usize) {
        let position = match self.state {
            SessionState::Loading(i)
            | SessionState::AwaitingSelection(i)
            | SessionState::Exporting(i) => i + 1,
            SessionState::Idle => 0,
            SessionState::Terminated => self.images.len(),
        };
        (position, self.images.len())
    }

    /// Consume one surface event. Recoverable per-image failures are
    /// handled internally; an `Err` from here is fatal for the session and
    /// has already triggered a best-effort metadata flush.
    pub fn handle_event(&mut self, event: SurfaceEvent) -> Result<()> {
        match event {
            SurfaceEvent::RectangleDrawn(roi) => {
                if let SessionState::AwaitingSelection(_) = self.state {
                    self.store.add(roi);
                }
                Ok(())
            }
            SurfaceEvent::Commit => self.commit_current(),
            SurfaceEvent::Advance => match self.state {
                SessionState::AwaitingSelection(i) => {
                    if let Some(current) = &self.current {
                        info!("skipped {}", current.name);
                    }
                    self.load_from(i + 1)
                }
                _ => Ok(()),
            },
            SurfaceEvent::Interrupt => self.terminate(false),
        }
    }

    /// Export the committed collection and record its geometry, then move
    /// on. Committing with nothing drawn is a skip: no crops, no entry.
    fn commit_current(&mut self) -> Result<()> {
        let SessionState::AwaitingSelection(index) = self.state else {
            return Ok(());
        };

        if self.store.is_empty() {
            if let Some(current) = &self.current {
                info!("no rectangles drawn for {}, skipping", current.name);
            }
            return self.load_from(index + 1);
        }

        self.state = SessionState::Exporting(index);
        let rois = self.store.commit();
        let Some(current) = self.current.take() else {
            return Ok(());
        };

        if let Err(e) = self.exporter.export(&current.image, &current.name, &rois) {
            let _ = self.flush_on_abort();
            return Err(e);
        }

        info!("committed {} rectangle(s) for {}", rois.len(), current.name);
        self.writer.insert(current.name, rois);

        // コミットごとに書き出す。強制終了しても直前までの記録は残る
        if let Err(e) = self.writer.flush() {
            self.state = SessionState::Terminated;
            return Err(e);
        }

        self.load_from(index + 1)
    }

    /// Walk forward from `index`, skipping images that fail to decode,
    /// until an image is on screen or the sequence is exhausted.
    fn load_from(&mut self, index: usize) -> Result<()> {
        self.current = None;
        self.store.reset();

        let mut index = index;
        while index < self.images.len() {
            self.state = SessionState::Loading(index);
            let path = &self.images[index];

            match image::open(path) {
                Ok(image) => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    info!(
                        "processing {} ({}/{}, {}x{})",
                        name,
                        index + 1,
                        self.images.len(),
                        image.width(),
                        image.height()
                    );
                    self.current = Some(CurrentImage {
                        path: path.clone(),
                        name,
                        image,
                    });
                    self.state = SessionState::AwaitingSelection(index);
                    return Ok(());
                }
                Err(source) => {
                    let err = CropperError::ImageDecode {
                        path: path.clone(),
                        source,
                    };
                    warn!("{err}, skipping");
                    index += 1;
                }
            }
        }

        // Sequence exhausted: normal completion.
        self.terminate(true)
    }

    fn terminate(&mut self, completed: bool) -> Result<()> {
        if self.is_terminated() {
            return Ok(());
        }
        self.state = SessionState::Terminated;
        self.current = None;
        self.writer.flush()?;
        if completed {
            info!("all images processed, metadata written");
        } else {
            info!("interrupted, committed metadata flushed");
        }
        Ok(())
    }

    /// Best-effort flush on a fatal error path; the original error wins.
    fn flush_on_abort(&mut self) -> Result<()> {
        self.state = SessionState::Terminated;
        self.current = None;
        self.writer.flush()
    }
}
