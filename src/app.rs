use std::sync::{Arc, Mutex};

use eframe::egui;

use crate::errors::CropperError;
use crate::roi::Roi;
use crate::session::{SessionController, SurfaceEvent};

const PENDING_STROKE: egui::Color32 = egui::Color32::from_rgb(80, 220, 120);
const DRAFT_STROKE: egui::Color32 = egui::Color32::from_rgb(100, 150, 255);
const REFERENCE_STROKE: egui::Color32 = egui::Color32::from_rgb(140, 140, 140);

/// The interactive selection surface: one window showing one image at a
/// time, translating pointer drags and keypresses into `SurfaceEvent`s for
/// the session controller it owns.
pub struct CropperApp {
    session: SessionController,
    texture: Option<egui::TextureHandle>,
    /// 1-based position the texture was built for; rebuilt when it changes.
    texture_for: Option<usize>,
    /// In-progress drag corners in image pixel coordinates. Only a finished
    /// drag becomes a rectangle; these are discarded on commit or advance.
    drag_start: Option<(f32, f32)>,
    drag_current: Option<(f32, f32)>,
    /// Fatal session error handed back to `main` after the event loop ends.
    failure: Arc<Mutex<Option<CropperError>>>,
}

impl CropperApp {
    pub fn new(
        session: SessionController,
        failure: Arc<Mutex<Option<CropperError>>>,
        _cc: &eframe::CreationContext<'_>,
    ) -> Self {
        Self {
            session,
            texture: None,
            texture_for: None,
            drag_start: None,
            drag_current: None,
            failure,
        }
    }

    fn dispatch(&mut self, event: SurfaceEvent) {
        if let Err(e) = self.session.handle_event(event) {
            log::error!("{e}");
            *self.failure.lock().unwrap() = Some(e);
        }
    }

    fn clear_drag(&mut self) {
        self.drag_start = None;
        self.drag_current = None;
    }

    /// Upload the current image as a texture when the session moved on to a
    /// new one, and retitle the window after it.
    fn ensure_texture(&mut self, ctx: &egui::Context) {
        let (position, total) = self.session.progress();
        if self.texture_for == Some(position) {
            return;
        }
        let Some(current) = self.session.current() else {
            return;
        };

        let rgb = current.image.to_rgb8();
        let size = [rgb.width() as usize, rgb.height() as usize];
        let color_image = egui::ColorImage::from_rgb(size, rgb.as_raw());
        self.texture = Some(ctx.load_texture(
            current.name.clone(),
            color_image,
            egui::TextureOptions::LINEAR,
        ));
        self.texture_for = Some(position);
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(format!(
            "Select ROIs - {} ({}/{})",
            current.name, position, total
        )));
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let commit = ctx.input(|i| i.key_pressed(egui::Key::Enter) || i.key_pressed(egui::Key::Space));
        let advance = ctx.input(|i| i.key_pressed(egui::Key::Escape));

        if commit {
            self.clear_drag();
            self.dispatch(SurfaceEvent::Commit);
        } else if advance {
            self.clear_drag();
            self.dispatch(SurfaceEvent::Advance);
        }
    }

    fn show_image(&mut self, ui: &mut egui::Ui) {
        let Some(texture) = self.texture.clone() else {
            return;
        };
        let Some((image_width, image_height)) = self
            .session
            .current()
            .map(|c| (c.image.width(), c.image.height()))
        else {
            return;
        };

        // Shrink to fit the panel, never upscale, and center the image.
        let avail = ui.available_rect_before_wrap();
        let scale = (avail.width() / image_width as f32)
            .min(avail.height() / image_height as f32)
            .min(1.0);
        let desired = egui::vec2(image_width as f32 * scale, image_height as f32 * scale);
        let offset = ((avail.size() - desired) / 2.0).max(egui::Vec2::ZERO);
        let image_rect = egui::Rect::from_min_size(avail.min + offset, desired);

        let response = ui.allocate_rect(image_rect, egui::Sense::click_and_drag());
        let painter = ui.painter();
        painter.image(
            texture.id(),
            image_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        let to_pixel = |pos: egui::Pos2| {
            (
                (pos.x - image_rect.min.x) / scale,
                (pos.y - image_rect.min.y) / scale,
            )
        };
        let to_screen = |x: f32, y: f32| {
            egui::pos2(
                image_rect.min.x + x * scale,
                image_rect.min.y + y * scale,
            )
        };
        let roi_to_rect = |roi: &Roi| {
            egui::Rect::from_min_max(
                to_screen(roi.x as f32, roi.y as f32),
                to_screen((roi.x + roi.width) as f32, (roi.y + roi.height) as f32),
            )
        };

        // Rectangles a previous run saved for this image, reference only.
        for roi in self.session.previous_rois() {
            painter.rect_stroke(
                roi_to_rect(roi),
                0.0,
                egui::Stroke::new(1.0, REFERENCE_STROKE),
                egui::StrokeKind::Outside,
            );
        }

        // This run's rectangles, labeled with their draw-order index.
        for (index, roi) in self.session.pending_rois().iter().enumerate() {
            let rect = roi_to_rect(roi);
            painter.rect_stroke(
                rect,
                0.0,
                egui::Stroke::new(2.0, PENDING_STROKE),
                egui::StrokeKind::Outside,
            );
            painter.text(
                rect.min + egui::vec2(4.0, 2.0),
                egui::Align2::LEFT_TOP,
                index.to_string(),
                egui::FontId::monospace(13.0),
                PENDING_STROKE,
            );
        }

        // In-progress drag.
        if let (Some(start), Some(current)) = (self.drag_start, self.drag_current) {
            let rect = egui::Rect::from_two_pos(
                to_screen(start.0, start.1),
                to_screen(current.0, current.1),
            );
            painter.rect_filled(
                rect,
                0.0,
                egui::Color32::from_rgba_unmultiplied(100, 150, 255, 40),
            );
            painter.rect_stroke(
                rect,
                0.0,
                egui::Stroke::new(2.0, DRAFT_STROKE),
                egui::StrokeKind::Outside,
            );
        }

        if response.drag_started_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                self.drag_start = Some(to_pixel(pos));
                self.drag_current = self.drag_start;
            }
        }
        if response.dragged_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                self.drag_current = Some(to_pixel(pos));
            }
        }
        if response.drag_stopped_by(egui::PointerButton::Primary) {
            if let (Some(start), Some(end)) = (self.drag_start.take(), self.drag_current.take()) {
                let roi = Roi::from_drag(start, end, image_width, image_height);
                if let Some(roi) = roi {
                    self.dispatch(SurfaceEvent::RectangleDrawn(roi));
                }
            }
        }
    }
}

impl eframe::App for CropperApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) && !self.session.is_terminated() {
            self.dispatch(SurfaceEvent::Interrupt);
        }
        if self.session.is_terminated() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        self.handle_keys(ctx);
        if self.session.is_terminated() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        self.ensure_texture(ctx);

        egui::TopBottomPanel::top("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let (position, total) = self.session.progress();
                if let Some(current) = self.session.current() {
                    ui.strong(current.name.as_str());
                    ui.label(format!("{position}/{total}"));
                    ui.separator();
                    ui.label(format!(
                        "{}x{}",
                        current.image.width(),
                        current.image.height()
                    ));
                }
                ui.separator();
                ui.label(format!("{} rectangle(s)", self.session.pending_rois().len()));
                let previous = self.session.previous_rois().len();
                if previous > 0 {
                    ui.label(format!("({previous} saved previously)"));
                }
            });
        });

        egui::TopBottomPanel::bottom("hints").show(ctx, |ui| {
            ui.label(
                "drag: add rectangle  \u{2022}  Enter/Space: save crops and continue  \
                 \u{2022}  Esc: skip image  \u{2022}  close window: quit",
            );
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_image(ui);
        });
    }
}
