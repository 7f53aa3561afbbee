//! WASM-compatible egui front end for repository impact-analysis graphs.
//!
//! Talks to the analysis service over HTTP, renders neighborhood and
//! whole-repository graphs with egui_graphs, and hosts the ingestion,
//! diff-analysis and question forms. Runs in the browser via WASM; a
//! native build compiles for tests but has no fetch backend.

pub mod api;
pub mod app;
pub mod graph_panel;
pub mod interaction;
pub mod layout;
pub mod lifecycle;
pub mod panels;
pub mod settings;

pub use app::{ActiveView, AppState, ImpactGraphApp};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Start the app in the browser, attached to the page's canvas element.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    // Better panic messages in the browser console
    console_error_panic_hook::set_once();

    let web_options = eframe::WebOptions::default();

    wasm_bindgen_futures::spawn_local(async {
        let canvas = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id("impact-graph-canvas"))
            .and_then(|element| element.dyn_into::<web_sys::HtmlCanvasElement>().ok())
            .expect("canvas element #impact-graph-canvas");

        eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(|cc| Ok(Box::new(ImpactGraphApp::new(cc)))),
            )
            .await
            .expect("Failed to start eframe");
    });
}
