//! stlview - desktop STL scene viewer.
//!
//! Loads STL meshes (file dialog, drag-and-drop or command-line paths) into a
//! scene with a ground grid and build volume, and lets them be picked, moved,
//! rotated, scaled, recolored, duplicated and deleted.

mod app;
mod assets;
mod config;
mod render;
mod scene;
mod ui;

use config::ViewerConfig;
use std::path::PathBuf;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = ViewerConfig::load().unwrap_or_else(|err| {
        log::warn!("{}; using default configuration", err);
        ViewerConfig::default()
    });

    let files: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if !files.is_empty() {
        log::info!("Importing {} file(s) from the command line", files.len());
    }

    app::run(config, files);
}
