pub mod codec;
pub mod csv_codec;
pub mod device;
pub mod error;
pub mod exchange;
pub mod geojson_codec;
pub mod gpx_codec;
pub mod gpx_parser;
pub mod gpx_types;
pub mod gpx_writer;
pub mod kml_codec;
pub mod model;
pub mod options;
pub mod validator;

use wasm_bindgen::prelude::*;

pub use crate::error::RouteExchangeError;
pub use crate::exchange::{ExportResult, ImportResult, export_json, export_trip, import_route};
pub use crate::model::TripModel;
pub use crate::options::{DeviceProfile, ExportFormat, ExportOptions, ImportFormat};

/// Export a trip, returned as a JS object
/// `{ success, content, warnings, errors, fileName, mimeType }`.
///
/// Bad input is reported through `errors` rather than thrown.
#[wasm_bindgen(js_name = exportTrip)]
pub fn export_trip_js(trip: JsValue, options: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let result = match (parse_trip(trip), parse_options(options)) {
        (Ok(trip), Ok(opts)) => export_trip(&trip, &opts),
        (Err(err), _) | (_, Err(err)) => ExportResult::failure(err),
    };
    serde_wasm_bindgen::to_value(&result).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Import a route document. `format` is one of gpx, kml, geojson, csv or auto (default).
#[wasm_bindgen(js_name = importRoute)]
pub fn import_route_js(content: &str, format: Option<String>) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let result = match format.as_deref().unwrap_or_default().parse::<ImportFormat>() {
        Ok(format) => import_route(content, format),
        Err(err) => ImportResult::failure(err),
    };
    serde_wasm_bindgen::to_value(&result).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn parse_trip(trip: JsValue) -> Result<TripModel, String> {
    serde_wasm_bindgen::from_value(trip).map_err(|e| format!("Invalid trip: {e}"))
}

fn parse_options(options: JsValue) -> Result<ExportOptions, String> {
    if options.is_undefined() || options.is_null() {
        Ok(ExportOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| e.to_string())
    }
}
