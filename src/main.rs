//! KeyClack - plays a sound for every key press.

// Hide console window in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod autostart;
mod bindings;
mod config;
mod engine;
mod keyboard_hook;
mod keycodes;
mod library;
mod playback;
mod store;

use engine::Engine;
use keyboard_hook::KeyboardHook;
use playback::SoundPlayer;
use std::sync::Arc;
use std::time::Duration;
use store::DataDir;

const RELOAD_INTERVAL: Duration = Duration::from_millis(500);

fn init_logging(data_dir: &DataDir) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    // Release builds have no console to write to
    if !cfg!(debug_assertions) {
        let log_file = std::fs::create_dir_all(data_dir.logs_dir()).and_then(|_| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(data_dir.logs_dir().join("keyclack.log"))
        });
        if let Ok(file) = log_file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
    }

    builder.init();
}

fn main() {
    let data_dir = DataDir::from_env();
    init_logging(&data_dir);

    log::info!("KeyClack starting...");
    log::info!("Data directory: {}", data_dir.root().display());

    let engine = Arc::new(Engine::open(
        data_dir,
        config::resource_dir(),
        SoundPlayer::system(),
    ));
    autostart::sync_autostart(engine.auto_start());

    let hook_engine = Arc::clone(&engine);
    let mut keyboard_hook = KeyboardHook::new();
    if let Err(e) = keyboard_hook.start(Arc::new(move |key: &str| {
        hook_engine.handle_key_press(key);
    })) {
        log::error!("{}", e);
        engine.save_all();
        return;
    }

    log::info!("KeyClack running");

    // The hook thread ends when the session closes or the hook is removed
    while keyboard_hook.is_running() {
        engine.reload_if_changed();
        std::thread::sleep(RELOAD_INTERVAL);
    }

    log::info!("KeyClack shutting down...");

    keyboard_hook.stop();
    engine.save_all();

    log::info!("KeyClack stopped");
}
