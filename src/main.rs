//! Application entry point.

use log::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    info!("Logger initialized");

    let app = sprite_loop::App::new(sprite_loop::AppConfig::default()).map_err(|e| {
        error!("Failed to start: {e}");
        e
    })?;

    if let Err(e) = app.run() {
        error!("Application error: {e}");
        return Err(Box::new(e));
    }

    Ok(())
}
