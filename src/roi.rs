use serde::{Deserialize, Serialize};

/// Rectangular region of interest in image pixel coordinates.
///
/// A valid rectangle has non-zero width and height and lies entirely inside
/// its image: `x + width <= image width`, `y + height <= image height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// True if the rectangle lies entirely within an image of the given
    /// dimensions. Uses checked arithmetic so degenerate u32 values near the
    /// maximum cannot wrap into a false positive.
    pub fn fits_within(&self, image_width: u32, image_height: u32) -> bool {
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        matches!((right, bottom), (Some(r), Some(b)) if r <= image_width && b <= image_height)
    }

    /// Build a rectangle from two drag corners in pixel space, in any drag
    /// direction. Coordinates are clamped to the image; a degenerate result
    /// (zero width or height after clamping) yields `None` and the drag is
    /// discarded.
    pub fn from_drag(
        start: (f32, f32),
        end: (f32, f32),
        image_width: u32,
        image_height: u32,
    ) -> Option<Self> {
        let min_x = start.0.min(end.0).max(0.0);
        let min_y = start.1.min(end.1).max(0.0);
        let max_x = start.0.max(end.0).min(image_width as f32);
        let max_y = start.1.max(end.1).min(image_height as f32);

        let x = min_x as u32;
        let y = min_y as u32;
        let width = (max_x as u32).saturating_sub(x);
        let height = (max_y as u32).saturating_sub(y);

        let roi = Self::new(x, y, width, height);
        (roi.is_valid() && roi.fits_within(image_width, image_height)).then_some(roi)
    }
}

/// Per-image mutable container of rectangles, owned by the session
/// controller for the duration of one image's interaction.
///
/// `commit` freezes the collection; nothing may be added afterwards until
/// `reset` starts the next image.
#[derive(Debug, Default)]
pub struct RoiStore {
    rois: Vec<Roi>,
    committed: bool,
}

impl RoiStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, roi: Roi) {
        debug_assert!(!self.committed, "add after commit");
        if !self.committed {
            self.rois.push(roi);
        }
    }

    /// Snapshot of the collection in draw order.
    pub fn rois(&self) -> &[Roi] {
        &self.rois
    }

    pub fn len(&self) -> usize {
        self.rois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }

    pub const fn is_committed(&self) -> bool {
        self.committed
    }

    /// Freeze the collection and return it in draw order.
    pub fn commit(&mut self) -> Vec<Roi> {
        self.committed = true;
        self.rois.clone()
    }

    /// Clear all rectangles when starting a new image.
    pub fn reset(&mut self) {
        self.rois.clear();
        self.committed = false;
    }
}
