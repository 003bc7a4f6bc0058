use geojson::GeoJson;
use rstest::rstest;
use route_exchange_wasm::device::TOMTOM_SIZE_CEILING;
use route_exchange_wasm::model::{Campsite, Waypoint, WaypointRole, route_from_coords};
use route_exchange_wasm::validator::{check_well_formed, validate_gpx};
use route_exchange_wasm::{
    DeviceProfile, ExportFormat, ExportOptions, ImportFormat, TripModel, export_json, export_trip,
    import_route,
};

fn load_fixture(path: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{path}")).unwrap()
}

fn scenario_trip() -> TripModel {
    TripModel::with_waypoints(vec![
        Waypoint::new("berlin", "Berlin", 52.52, 13.405).with_role(WaypointRole::Start),
        Waypoint::new("paris", "Paris", 48.8566, 2.3522),
        Waypoint::new("rome", "Rome", 41.9028, 12.4964).with_role(WaypointRole::End),
    ])
}

fn routed_trip() -> TripModel {
    let mut trip = scenario_trip();
    trip.route = route_from_coords(trip.waypoints.iter().map(|w| (w.lat, w.lng)));
    trip
}

// ---- scenario ----

#[test]
fn test_berlin_paris_rome_scenario() {
    let opts = ExportOptions {
        include_route: false,
        ..ExportOptions::new(ExportFormat::Gpx)
    };
    let exported = export_trip(&scenario_trip(), &opts);
    assert!(exported.success);
    assert!(exported.errors.is_empty());

    let content = &exported.content;
    assert_eq!(content.matches("<wpt ").count(), 3);
    let berlin = content.find("<name>Berlin</name>").unwrap();
    let paris = content.find("<name>Paris</name>").unwrap();
    let rome = content.find("<name>Rome</name>").unwrap();
    assert!(berlin < paris && paris < rome);
    assert!(!content.contains("<trk>"));

    let imported = import_route(content, ImportFormat::Gpx);
    assert!(imported.success);
    let roles: Vec<WaypointRole> = imported.waypoints.iter().map(|w| w.role).collect();
    assert_eq!(
        roles,
        vec![WaypointRole::Start, WaypointRole::Waypoint, WaypointRole::End]
    );
    let names: Vec<&str> = imported.waypoints.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["Berlin", "Paris", "Rome"]);
    let ids: Vec<&str> = imported.waypoints.iter().map(|w| w.id.as_str()).collect();
    assert_eq!(ids, vec!["berlin", "paris", "rome"]);
}

// ---- round trip ----

#[rstest]
#[case::gpx(ExportFormat::Gpx)]
#[case::geojson(ExportFormat::GeoJson)]
#[case::csv(ExportFormat::Csv)]
fn test_round_trip_keeps_waypoints(#[case] format: ExportFormat) {
    let trip = TripModel::with_waypoints(vec![
        Waypoint::new("a", "Hamburg", 53.551086, 9.993682),
        Waypoint::new("b", "Kraków \"Old Town\"", 50.061947, 19.936856),
        Waypoint::new("c", "Cabo da Roca", 38.780556, -9.498889),
        Waypoint::new("d", "Nordkapp", 71.169493, 25.783164),
    ]);
    let exported = export_trip(&trip, &ExportOptions::new(format));
    assert!(exported.success, "{:?}", exported.errors);

    let imported = import_route(&exported.content, ImportFormat::Auto);
    assert!(imported.success, "{:?}", imported.errors);
    assert_eq!(imported.format, Some(format));
    assert_eq!(imported.waypoints.len(), trip.waypoints.len());
    for (original, recovered) in trip.waypoints.iter().zip(&imported.waypoints) {
        assert!((original.lat - recovered.lat).abs() < 1e-6);
        assert!((original.lng - recovered.lng).abs() < 1e-6);
        assert_eq!(original.name, recovered.name);
        assert_eq!(original.id, recovered.id);
    }
}

#[test]
fn test_round_trip_route_and_campsites_through_geojson() {
    let mut trip = routed_trip();
    trip.campsites.push(Campsite {
        id: "camp".into(),
        lat: 45.07,
        lng: 7.69,
        name: "Campeggio Torino".into(),
        amenities: vec!["water".into()],
        price: Some(19.0),
        currency: Some("EUR".into()),
        description: None,
    });

    let exported = export_trip(&trip, &ExportOptions::new(ExportFormat::GeoJson));
    let imported = import_route(&exported.content, ImportFormat::GeoJson);
    assert!(imported.success);
    assert_eq!(imported.campsites, trip.campsites);
    assert_eq!(imported.route_points.len(), 3);
    for (original, recovered) in trip.route.iter().zip(&imported.route_points) {
        assert!((original.distance_km - recovered.distance_km).abs() < 1e-9);
    }
}

// ---- empty options ----

#[rstest]
fn test_empty_options_yield_minimal_document(
    #[values(ExportFormat::Gpx, ExportFormat::Kml, ExportFormat::GeoJson, ExportFormat::Csv)]
    format: ExportFormat,
    #[values(
        DeviceProfile::Universal,
        DeviceProfile::Garmin,
        DeviceProfile::TomTom,
        DeviceProfile::Smartphone
    )]
    profile: DeviceProfile,
) {
    let opts = ExportOptions::nothing(format).with_profile(profile);
    let result = export_trip(&routed_trip(), &opts);
    assert!(result.success, "{:?}", result.errors);
    assert!(result.errors.is_empty());

    match format {
        ExportFormat::Gpx => {
            assert!(validate_gpx(&result.content, profile).is_structurally_valid());
            assert!(!result.content.contains("<wpt"));
        }
        ExportFormat::Kml => {
            assert!(check_well_formed(&result.content).is_ok());
            assert!(!result.content.contains("<Placemark"));
        }
        ExportFormat::GeoJson => {
            let GeoJson::FeatureCollection(fc) = result.content.parse::<GeoJson>().unwrap() else {
                panic!("Expected FeatureCollection");
            };
            assert!(fc.features.is_empty());
        }
        ExportFormat::Csv => assert_eq!(result.content, "id,name,lat,lng,role\n"),
    }
}

// ---- device properties ----

#[rstest]
fn test_gpx_namespace_and_single_root(
    #[values(
        DeviceProfile::Universal,
        DeviceProfile::Garmin,
        DeviceProfile::TomTom,
        DeviceProfile::Smartphone
    )]
    profile: DeviceProfile,
    #[values(true, false)] include_metadata: bool,
) {
    let opts = ExportOptions {
        include_metadata,
        include_vehicle_info: true,
        include_planning_data: true,
        ..ExportOptions::new(ExportFormat::Gpx).with_profile(profile)
    };
    let content = export_trip(&routed_trip(), &opts).content;
    assert_eq!(
        content
            .matches("xmlns=\"http://www.topografix.com/GPX/1/1\"")
            .count(),
        1
    );
    assert_eq!(content.matches("<gpx").count(), 1);
    assert_eq!(content.matches("</gpx>").count(), 1);
}

#[test]
fn test_garmin_waypoints_all_carry_symbols() {
    let mut trip = routed_trip();
    trip.waypoints.push(Waypoint::new("extra", "Napoli", 40.8518, 14.2681));
    let opts = ExportOptions::new(ExportFormat::Gpx).with_profile(DeviceProfile::Garmin);
    let result = export_trip(&trip, &opts);
    assert!(result.success);

    let blocks: Vec<&str> = result.content.split("<wpt ").skip(1).collect();
    assert_eq!(blocks.len(), 4);
    for block in blocks {
        let wpt = &block[..block.find("</wpt>").unwrap()];
        assert!(wpt.contains("<sym>"), "missing <sym> in {wpt}");
    }
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
}

#[test]
fn test_tomtom_oversized_route_warns_but_succeeds() {
    let mut trip = scenario_trip();
    let coords = (0..40_000).map(|i| (45.0 + i as f64 * 1e-4, 7.0 + i as f64 * 1e-4));
    trip.route = route_from_coords(coords);

    let opts = ExportOptions::new(ExportFormat::Gpx).with_profile(DeviceProfile::TomTom);
    let result = export_trip(&trip, &opts);
    assert!(result.success);
    assert!(result.warnings.iter().any(|w| w.contains("size")));
    assert!(result.content.matches("<trkpt ").count() < 40_000);
    assert!(result.content.contains("lat=\"48.999900\" lon=\"10.999900\""));

    // Other profiles keep every point.
    let universal = export_trip(&trip, &ExportOptions::new(ExportFormat::Gpx));
    assert!(universal.content.len() > TOMTOM_SIZE_CEILING);
    assert_eq!(universal.content.matches("<trkpt ").count(), 40_000);
}

#[test]
fn test_smartphone_gets_metadata_even_when_not_requested() {
    let opts = ExportOptions {
        include_metadata: false,
        ..ExportOptions::new(ExportFormat::Gpx).with_profile(DeviceProfile::Smartphone)
    };
    let result = export_trip(&scenario_trip(), &opts);
    assert!(result.content.contains("<metadata>"));
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
}

// ---- failures ----

#[test]
fn test_unsupported_format_fails_cleanly() {
    let trip_json = serde_json::to_string(&scenario_trip()).unwrap();
    let result = export_json(&trip_json, r#"{"format": "shapefile"}"#);
    assert!(!result.success);
    assert!(result.content.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("shapefile"));
}

#[test]
fn test_kml_import_is_not_supported() {
    let kml = export_trip(&scenario_trip(), &ExportOptions::new(ExportFormat::Kml)).content;
    let result = import_route(&kml, ImportFormat::Kml);
    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("not supported"));
}

#[test]
fn test_gpx_from_other_namespace_rejected() {
    let gpx10 = r#"<?xml version="1.0"?>
<gpx xmlns="http://www.topografix.com/GPX/1/0" version="1.0"><wpt lat="1" lon="1"/></gpx>"#;
    let result = import_route(gpx10, ImportFormat::Auto);
    assert!(!result.success);
    assert!(result.waypoints.is_empty());
    assert!(result.errors[0].contains("namespace"));
}

// ---- fixtures ----

#[test]
fn test_import_handheld_gpx() {
    let result = import_route(&load_fixture("alps_loop.gpx"), ImportFormat::Auto);
    assert!(result.success);
    assert_eq!(result.format, Some(ExportFormat::Gpx));

    let names: Vec<&str> = result.waypoints.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["Innsbruck", "Bolzano & Bozen", "Verona"]);
    let roles: Vec<WaypointRole> = result.waypoints.iter().map(|w| w.role).collect();
    assert_eq!(
        roles,
        vec![WaypointRole::Start, WaypointRole::Waypoint, WaypointRole::End]
    );
    assert_eq!(result.waypoints[0].id, "wpt-1");

    assert_eq!(result.campsites.len(), 1);
    assert_eq!(result.campsites[0].name, "Camping Garda");

    assert_eq!(result.route_points.len(), 3);
    assert_eq!(result.route_points[0].distance_km, 0.0);
    assert!(result.route_points[2].distance_km > 150.0);

    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].starts_with("Skipped <wpt>"));
}

#[test]
fn test_import_csv_skips_bad_rows() {
    let result = import_route(&load_fixture("coast_trip.csv"), ImportFormat::Auto);
    assert!(result.success);
    assert_eq!(result.format, Some(ExportFormat::Csv));

    let names: Vec<&str> = result.waypoints.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["Porto", "Lisboa"]);
    assert_eq!(result.waypoints[1].role, WaypointRole::End);

    assert_eq!(result.campsites.len(), 1);
    let camp = &result.campsites[0];
    assert_eq!(camp.id, "campsite-1");
    assert_eq!(camp.price, Some(24.5));
    assert_eq!(camp.amenities, vec!["water", "electricity", "showers"]);

    assert_eq!(result.route_points.len(), 2);
    assert!(result.route_points[1].distance_km > 250.0);

    assert_eq!(
        result.warnings,
        vec![
            "Skipped CSV row 3: invalid longitude 'north'".to_string(),
            "Skipped CSV row 11: coordinates (95, -8.5) out of range".to_string(),
        ]
    );
}

#[test]
fn test_import_geojson_without_feature_types() {
    let result = import_route(&load_fixture("coast_trip.geojson"), ImportFormat::Auto);
    assert!(result.success);
    assert_eq!(result.format, Some(ExportFormat::GeoJson));

    assert_eq!(result.waypoints.len(), 2);
    assert_eq!(result.waypoints[0].role, WaypointRole::Start);
    assert_eq!(result.waypoints[1].role, WaypointRole::End);
    assert_eq!(result.campsites.len(), 1);
    assert_eq!(result.campsites[0].id, "orbitur");
    assert!(result.route_points.is_empty());

    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("Polygon"));
}

#[test]
fn test_route_points_survive_csv() {
    let trip = routed_trip();
    let exported = export_trip(&trip, &ExportOptions::new(ExportFormat::Csv));
    let imported = import_route(&exported.content, ImportFormat::Csv);
    assert!(imported.success);
    assert_eq!(imported.route_points.len(), trip.route.len());
    for (a, b) in trip.route.iter().zip(&imported.route_points) {
        assert!((a.distance_km - b.distance_km).abs() < 1e-3);
    }
}

#[test]
fn test_import_plain_coordinate_csv() {
    let csv = "lat,lon\n52.52,13.405\n48.8566,2.3522\n41.9028,12.4964\n";
    let result = import_route(csv, ImportFormat::Auto);
    assert!(result.success);
    assert_eq!(result.format, Some(ExportFormat::Csv));
    assert_eq!(result.waypoints.len(), 3);
    assert_eq!(result.waypoints[0].role, WaypointRole::Start);
    assert_eq!(result.waypoints[2].role, WaypointRole::End);
    assert!(result.route_points.is_empty());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_multiline_name_survives_csv() {
    let trip = TripModel::with_waypoints(vec![
        Waypoint::new("w1", "Berlin\n\nMitte", 52.52, 13.405).with_role(WaypointRole::Start),
        Waypoint::new("w2", "Rome", 41.9028, 12.4964).with_role(WaypointRole::End),
    ]);
    let exported = export_trip(&trip, &ExportOptions::new(ExportFormat::Csv));
    let imported = import_route(&exported.content, ImportFormat::Auto);
    assert!(imported.success);
    assert_eq!(imported.waypoints, trip.waypoints);
    assert!(imported.warnings.is_empty());
}
