//! Channel Factory - canvas editor
//!
//! Everything is rendered to a single canvas using egui + eframe. Natively the
//! workflows are kept as JSON files under the data directory; on the web they
//! live in localStorage.

#![warn(clippy::all)]

mod app;
mod canvas;

use std::rc::Rc;

use app::ChannelFactoryApp;
use channel_factory::{FactoryConfig, KeyValueStore, LaunchOptions, MemoryStore};

// Native entry point
#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    use clap::Parser;
    use channel_factory::launch::Cli;
    use channel_factory::persistence::FileStore;

    let launch = LaunchOptions::from(Cli::parse());

    let (config, config_error) = match FactoryConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (FactoryConfig::default(), Some(e)),
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_str())).init();
    if let Some(e) = config_error {
        log::error!("{}; using default configuration", e);
    }

    let store: Rc<dyn KeyValueStore> = match FileStore::new(config.resolved_storage_dir()) {
        Ok(store) => Rc::new(store),
        Err(e) => {
            log::error!("Workflows will not be saved: {}", e);
            Rc::new(MemoryStore::new())
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("Channel Factory"),
        ..Default::default()
    };

    eframe::run_native(
        "Channel Factory",
        native_options,
        Box::new(move |cc| Ok(Box::new(ChannelFactoryApp::new(cc, launch, store, config)))),
    )
}

// WASM entry point
#[cfg(target_arch = "wasm32")]
fn main() {
    use channel_factory::persistence::LocalStorageStore;
    use wasm_bindgen::JsCast;

    // Redirect panics to console.error
    console_error_panic_hook::set_once();

    // Setup logging to browser console
    console_log::init_with_level(log::Level::Debug).expect("Failed to init logger");

    let config = FactoryConfig::default();
    let launch = LaunchOptions::from_location();
    let store: Rc<dyn KeyValueStore> = match LocalStorageStore::open() {
        Ok(store) => Rc::new(store),
        Err(e) => {
            log::error!("Workflows will not be saved: {}", e);
            Rc::new(MemoryStore::new())
        }
    };

    let web_options = eframe::WebOptions::default();

    wasm_bindgen_futures::spawn_local(async move {
        let canvas = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("the_canvas_id"))
            .and_then(|e| e.dyn_into::<web_sys::HtmlCanvasElement>().ok());
        let Some(canvas) = canvas else {
            log::error!("Canvas element 'the_canvas_id' not found");
            return;
        };

        let start_result = eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(move |cc| Ok(Box::new(ChannelFactoryApp::new(cc, launch, store, config)))),
            )
            .await;

        // Hide loading screen
        if let Some(window) = web_sys::window() {
            let _ = js_sys::Reflect::get(&window, &"hideLoading".into())
                .ok()
                .and_then(|f| f.dyn_into::<js_sys::Function>().ok())
                .map(|f| f.call0(&window));
        }

        if let Err(e) = start_result {
            log::error!("Failed to start eframe: {:?}", e);
        }
    });
}
