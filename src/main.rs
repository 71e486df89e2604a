use std::fs;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use eframe::egui;

use roi_cropper::app::CropperApp;
use roi_cropper::{Config, CropperError, SessionController};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    config.validate()?;
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    let mut session = SessionController::new(&config)?;
    session.start()?;
    if session.is_terminated() {
        // Empty input directory: the (possibly empty) record is already
        // written, no window to show.
        return Ok(());
    }

    let failure: Arc<Mutex<Option<CropperError>>> = Arc::new(Mutex::new(None));
    let app_failure = Arc::clone(&failure);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Select ROIs")
            .with_inner_size([1100.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native(
        "roi-cropper",
        options,
        Box::new(move |cc| Ok(Box::new(CropperApp::new(session, app_failure, cc)))),
    )
    .map_err(|e| anyhow::anyhow!("failed to run the selection window: {e}"))?;

    if let Some(err) = failure
        .lock()
        .expect("failure slot poisoned")
        .take()
    {
        return Err(err.into());
    }

    Ok(())
}
