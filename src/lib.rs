//! GPX 1.1 reading, writing and analysis, with a wasm-bindgen surface for
//! JavaScript callers.

pub mod analytics;
pub mod converter;
pub mod datetime;
pub mod error;
pub mod extensions;
pub mod gpx_types;
pub mod options;
pub mod parser;
pub mod simplify;
pub mod writer;
pub mod xml_tree;

use wasm_bindgen::prelude::*;

pub use crate::error::GpxError;
pub use crate::extensions::{Extension, Namespace, GPX_NAMESPACE};
pub use crate::gpx_types::*;
pub use crate::options::{ConvertOptions, GpxElementType, WriteOptions};
pub use crate::parser::{parse_gpx, read_gpx};
pub use crate::writer::{to_string, to_string_with, write_gpx};

/// Decode a GPX string into a plain JS object mirroring the document model.
#[wasm_bindgen(js_name = parseGpx)]
pub fn parse_gpx_js(gpx_string: &str) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let doc = parser::parse_gpx(gpx_string)?;
    Ok(serde_wasm_bindgen::to_value(&doc).map_err(GpxError::from)?)
}

/// Encode a document object (as returned by `parseGpx`) back into GPX XML.
#[wasm_bindgen(js_name = writeGpx)]
pub fn write_gpx_js(document: JsValue, options: JsValue) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let opts: WriteOptions = parse_options(options)?;
    let doc: GpxDocument = serde_wasm_bindgen::from_value(document).map_err(GpxError::from)?;
    Ok(writer::to_string_with(&doc, &opts)?)
}

/// Convert GPX string to GeoJSON, returned as a JS object.
#[wasm_bindgen(js_name = gpxToGeoJson)]
pub fn gpx_to_geojson(gpx_string: &str, options: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts: ConvertOptions = parse_options(options)?;
    let doc = parser::parse_gpx(gpx_string)?;
    let fc = converter::to_feature_collection(&doc, &opts);
    Ok(serde_wasm_bindgen::to_value(&fc).map_err(GpxError::from)?)
}

/// Convert GPX string to GeoJSON, returned as a JSON string.
#[wasm_bindgen(js_name = gpxToGeoJsonString)]
pub fn gpx_to_geojson_string(gpx_string: &str, options: JsValue) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let opts: ConvertOptions = parse_options(options)?;
    let doc = parser::parse_gpx(gpx_string)?;
    let fc = converter::to_feature_collection(&doc, &opts);
    serde_json::to_string(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Distance, elevation and time summary for every route and track.
#[wasm_bindgen(js_name = gpxStats)]
pub fn gpx_stats(gpx_string: &str) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let doc = parser::parse_gpx(gpx_string)?;
    let stats = analytics::document_stats(&doc);
    Ok(serde_wasm_bindgen::to_value(&stats).map_err(GpxError::from)?)
}

/// Simplify every route and track segment of a GPX string and re-encode it.
#[wasm_bindgen(js_name = simplifyTrack)]
pub fn simplify_track(gpx_string: &str, tolerance: f64) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let doc = parser::parse_gpx(gpx_string)?;
    let simplified = simplify::simplify_document(&doc, tolerance);
    Ok(writer::to_string(&simplified)?)
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: Option<String>) -> Result<(), JsValue> {
    use log::Level;

    let log_level = match level.as_deref() {
        Some("error") => Level::Error,
        Some("warn") => Level::Warn,
        Some("debug") => Level::Debug,
        Some("trace") => Level::Trace,
        _ => Level::Info,
    };

    console_log::init_with_level(log_level)
        .map_err(|e| JsValue::from_str(&format!("failed to initialize logger: {}", e)))?;

    log::info!("logging initialized at level {}", log_level);
    Ok(())
}

fn parse_options<T>(options: JsValue) -> Result<T, JsValue>
where
    T: Default + serde::de::DeserializeOwned,
{
    if options.is_undefined() || options.is_null() {
        Ok(T::default())
    } else {
        Ok(serde_wasm_bindgen::from_value(options).map_err(GpxError::from)?)
    }
}
