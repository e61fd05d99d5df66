#![warn(clippy::all, rust_2018_idioms)]

use myseum_frame::{EditorConfig, FrameApp};

/// Environment variable naming an optional JSON config file.
const CONFIG_ENV: &str = "MYSEUM_FRAME_CONFIG";

fn main() -> eframe::Result<()> {
    env_logger::init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: myseum_frame <image>");
        std::process::exit(2);
    };
    let pixels = match image::open(&path) {
        Ok(image) => image.to_rgba8(),
        Err(err) => {
            log::error!("failed to open {path}: {err}");
            std::process::exit(1);
        }
    };

    let config = match std::env::var(CONFIG_ENV) {
        Ok(config_path) => EditorConfig::load(&config_path).unwrap_or_else(|err| {
            log::warn!("ignoring config {config_path}: {err}");
            EditorConfig::default()
        }),
        Err(_) => EditorConfig::default(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_title("Myseum frame"),
        ..Default::default()
    };

    eframe::run_native(
        "myseum_frame",
        options,
        Box::new(move |cc| Ok(Box::new(FrameApp::new(cc, pixels, config)))),
    )
}
