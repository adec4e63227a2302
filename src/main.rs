use log::{error, info, LevelFilter};
use reelspin::{app, config};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    // --- Logging Setup ---
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .filter_module("reelspin::core::gfx", LevelFilter::Warn)
        .filter_module("reelspin::reels", LevelFilter::Info)
        .init();

    info!("Application starting...");
    config::load();

    if let Err(e) = app::run() {
        error!("Application exited with error: {}", e);
        return Err(e);
    }

    info!("Application exited gracefully.");
    Ok(())
}
