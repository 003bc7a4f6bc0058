#![cfg(target_arch = "wasm32")]

use route_exchange_wasm::model::{Waypoint, WaypointRole};
use route_exchange_wasm::{TripModel, export_trip_js, import_route_js};
use serde::Serialize;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

fn scenario_trip() -> JsValue {
    let trip = TripModel::with_waypoints(vec![
        Waypoint::new("w1", "Berlin", 52.52, 13.405).with_role(WaypointRole::Start),
        Waypoint::new("w2", "Paris", 48.8566, 2.3522),
        Waypoint::new("w3", "Rome", 41.9028, 12.4964).with_role(WaypointRole::End),
    ]);
    serde_wasm_bindgen::to_value(&trip).unwrap()
}

fn to_json(value: JsValue) -> serde_json::Value {
    serde_wasm_bindgen::from_value(value).unwrap()
}

#[wasm_bindgen_test]
fn export_with_default_options() {
    let result = to_json(export_trip_js(scenario_trip(), JsValue::UNDEFINED).unwrap());
    assert_eq!(result["success"], true);
    assert!(
        result["content"]
            .as_str()
            .unwrap()
            .contains("<gpx xmlns=\"http://www.topografix.com/GPX/1/1\"")
    );
    assert_eq!(result["mimeType"], "application/gpx+xml");
}

#[wasm_bindgen_test]
fn bad_options_are_reported_not_thrown() {
    let options = serde_json::json!({ "format": "pdf" })
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap();
    let result = to_json(export_trip_js(scenario_trip(), options).unwrap());
    assert_eq!(result["success"], false);
    assert_eq!(result["content"], "");
    assert_eq!(result["errors"].as_array().unwrap().len(), 1);
}

#[wasm_bindgen_test]
fn import_round_trip() {
    let exported = to_json(export_trip_js(scenario_trip(), JsValue::NULL).unwrap());
    let content = exported["content"].as_str().unwrap();

    let imported = to_json(import_route_js(content, None).unwrap());
    assert_eq!(imported["success"], true);
    assert_eq!(imported["format"], "gpx");
    assert_eq!(imported["waypoints"].as_array().unwrap().len(), 3);
    assert_eq!(imported["waypoints"][2]["role"], "end");
}
