use chrono::{DateTime, Utc};
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

use crate::codec::{self, Codec, Decoded, Encoded, Result};
use crate::error::RouteExchangeError;
use crate::model::{
    Campsite, RoutePoint, TripMetadata, TripModel, Waypoint, WaypointRole, coordinates_in_range,
    route_from_coords,
};
use crate::options::{ExportFormat, ExportOptions};

const FEATURE_TYPE: &str = "featureType";

pub struct GeoJsonCodec;

impl Codec for GeoJsonCodec {
    fn format(&self) -> ExportFormat {
        ExportFormat::GeoJson
    }

    fn encode(&self, trip: &TripModel, opts: &ExportOptions) -> Result<Encoded> {
        let fc = to_feature_collection(trip, opts)?;
        let content = serde_json::to_string_pretty(&fc)?;

        let mut warnings = Vec::new();
        if opts.include_route && trip.route.len() == 1 {
            warnings.push("Route has a single point; GeoJSON LineString omitted".to_string());
        }

        Ok(Encoded { content, warnings })
    }

    fn decode(&self, content: &str) -> Result<Decoded> {
        let fc = match content.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(fc) => fc,
            GeoJson::Feature(_) => {
                return Err(RouteExchangeError::NotFeatureCollection("a Feature"));
            }
            GeoJson::Geometry(_) => {
                return Err(RouteExchangeError::NotFeatureCollection("a Geometry"));
            }
        };
        Ok(from_feature_collection(fc))
    }
}

/// Convert a trip into a GeoJSON FeatureCollection.
pub fn to_feature_collection(trip: &TripModel, opts: &ExportOptions) -> Result<FeatureCollection> {
    let mut features = Vec::new();

    if opts.include_waypoints {
        for (order, wpt) in trip.waypoints.iter().enumerate() {
            features.push(waypoint_to_feature(wpt, order));
        }
    }

    if opts.include_campsites {
        for site in &trip.campsites {
            features.push(campsite_to_feature(site));
        }
    }

    if opts.include_route && trip.route.len() >= 2 {
        features.push(route_to_feature(&trip.route, &codec::document_name(trip, opts)));
    }

    let props = collection_properties(trip, opts)?;

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: (!props.is_empty()).then(|| {
            let mut members = Map::new();
            members.insert("properties".to_string(), JsonValue::Object(props));
            members
        }),
    })
}

fn waypoint_to_feature(wpt: &Waypoint, order: usize) -> Feature {
    let geometry = Geometry::new(Value::Point(vec![wpt.lng, wpt.lat]));

    let mut props = Map::new();
    props.insert(FEATURE_TYPE.to_string(), JsonValue::String("waypoint".to_string()));
    props.insert("name".to_string(), JsonValue::String(wpt.name.clone()));
    props.insert("role".to_string(), JsonValue::String(wpt.role.to_string()));
    props.insert("order".to_string(), JsonValue::Number(order.into()));
    insert_optional(&mut props, "description", &wpt.description);

    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: Some(Id::String(wpt.id.clone())),
        properties: Some(props),
        foreign_members: None,
    }
}

fn campsite_to_feature(site: &Campsite) -> Feature {
    let geometry = Geometry::new(Value::Point(vec![site.lng, site.lat]));

    let mut props = Map::new();
    props.insert(FEATURE_TYPE.to_string(), JsonValue::String("campsite".to_string()));
    props.insert("name".to_string(), JsonValue::String(site.name.clone()));
    props.insert(
        "amenities".to_string(),
        JsonValue::Array(site.amenities.iter().cloned().map(JsonValue::String).collect()),
    );
    if let Some(price) = site.price.and_then(serde_json::Number::from_f64) {
        props.insert("price".to_string(), JsonValue::Number(price));
    }
    insert_optional(&mut props, "currency", &site.currency);
    insert_optional(&mut props, "description", &site.description);

    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: Some(Id::String(site.id.clone())),
        properties: Some(props),
        foreign_members: None,
    }
}

fn route_to_feature(route: &[RoutePoint], name: &str) -> Feature {
    let coords: Vec<Vec<f64>> = route.iter().map(|pt| vec![pt.lng, pt.lat]).collect();
    let geometry = Geometry::new(Value::LineString(coords));

    let mut props = Map::new();
    props.insert(FEATURE_TYPE.to_string(), JsonValue::String("route".to_string()));
    props.insert("name".to_string(), JsonValue::String(name.to_string()));
    let distances: Vec<JsonValue> = route
        .iter()
        .filter_map(|pt| serde_json::Number::from_f64(pt.distance_km))
        .map(JsonValue::Number)
        .collect();
    props.insert("distancesKm".to_string(), JsonValue::Array(distances));

    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

fn collection_properties(trip: &TripModel, opts: &ExportOptions) -> Result<Map<String, JsonValue>> {
    let mut props = Map::new();

    if opts.include_metadata {
        props.insert("name".to_string(), JsonValue::String(codec::document_name(trip, opts)));
        insert_optional(&mut props, "description", &codec::document_description(trip, opts));
        insert_optional(&mut props, "author", &codec::document_author(trip, opts));
        props.insert("created".to_string(), JsonValue::String(codec::document_timestamp(trip)));
    }
    if let Some(v) = trip.vehicle.as_ref().filter(|_| opts.include_vehicle_info) {
        props.insert("vehicle".to_string(), serde_json::to_value(v)?);
    }
    if let Some(c) = trip.costs.as_ref().filter(|_| opts.include_cost_data) {
        props.insert("costs".to_string(), serde_json::to_value(c)?);
    }
    if let Some(p) = trip.planning.as_ref().filter(|_| opts.include_planning_data) {
        props.insert("planning".to_string(), serde_json::to_value(p)?);
    }

    Ok(props)
}

fn insert_optional(props: &mut Map<String, JsonValue>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        props.insert(key.to_string(), JsonValue::String(v.clone()));
    }
}

/// A waypoint feature before its role can be settled.
struct PointFeature {
    id: Option<String>,
    lat: f64,
    lng: f64,
    props: Map<String, JsonValue>,
}

/// Rebuild waypoints, campsites and route from a FeatureCollection.
fn from_feature_collection(fc: FeatureCollection) -> Decoded {
    let mut decoded = Decoded {
        metadata: fc.foreign_members.as_ref().and_then(collection_metadata),
        ..Default::default()
    };
    let mut waypoint_features = Vec::new();

    for (index, feature) in fc.features.into_iter().enumerate() {
        let id = feature.id.as_ref().map(id_to_string);
        let props = feature.properties.unwrap_or_default();
        let kind = props.get(FEATURE_TYPE).and_then(JsonValue::as_str).map(str::to_string);

        let Some(geometry) = feature.geometry else {
            decoded.warnings.push(format!("Skipped feature {index}: no geometry"));
            continue;
        };

        match geometry.value {
            Value::Point(coords) => {
                let Some((lat, lng)) = point_lat_lng(&coords) else {
                    decoded.warnings.push(format!(
                        "Skipped feature {index}: invalid Point coordinates {coords:?}"
                    ));
                    continue;
                };
                let point = PointFeature { id, lat, lng, props };
                match kind.as_deref() {
                    None | Some("waypoint") => waypoint_features.push(point),
                    Some("campsite") => {
                        let site = campsite_from_feature(point, decoded.campsites.len());
                        decoded.campsites.push(site);
                    }
                    Some(other) => decoded
                        .warnings
                        .push(format!("Skipped feature {index}: unknown featureType '{other}'")),
                }
            }
            Value::LineString(coords) if decoded.route.is_empty() => {
                decoded.route = route_from_line(&coords, &props);
                if decoded.route.len() < coords.len() {
                    decoded
                        .warnings
                        .push(format!("Feature {index}: dropped invalid LineString positions"));
                }
            }
            Value::LineString(_) => decoded
                .warnings
                .push(format!("Skipped feature {index}: only the first LineString is imported")),
            other => decoded.warnings.push(format!(
                "Skipped feature {index}: unsupported geometry type {}",
                geometry_type_name(&other)
            )),
        }
    }

    let count = waypoint_features.len();
    decoded.waypoints = waypoint_features
        .into_iter()
        .enumerate()
        .map(|(i, pf)| {
            let role = string_prop(&pf.props, "role")
                .and_then(|r| r.parse::<WaypointRole>().ok())
                .unwrap_or_else(|| WaypointRole::from_position(i, count));
            Waypoint {
                id: pf
                    .id
                    .or_else(|| string_prop(&pf.props, "id"))
                    .unwrap_or_else(|| format!("wpt-{}", i + 1)),
                lat: pf.lat,
                lng: pf.lng,
                name: string_prop(&pf.props, "name")
                    .unwrap_or_else(|| format!("Waypoint {}", i + 1)),
                role,
                description: string_prop(&pf.props, "description"),
            }
        })
        .collect();

    decoded
}

/// Name, author, description and timestamp from the collection's `properties` member.
fn collection_metadata(members: &Map<String, JsonValue>) -> Option<TripMetadata> {
    let props = members.get("properties")?.as_object()?;
    let metadata = TripMetadata {
        title: string_prop(props, "name"),
        author: string_prop(props, "author"),
        created: props
            .get("created")
            .and_then(JsonValue::as_str)
            .and_then(|t| DateTime::parse_from_rfc3339(t.trim()).ok())
            .map(|t| t.with_timezone(&Utc)),
        description: string_prop(props, "description"),
    };
    (metadata != TripMetadata::default()).then_some(metadata)
}

fn campsite_from_feature(pf: PointFeature, index: usize) -> Campsite {
    let amenities = pf
        .props
        .get("amenities")
        .and_then(JsonValue::as_array)
        .map(|list| list.iter().filter_map(JsonValue::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    Campsite {
        id: pf
            .id
            .or_else(|| string_prop(&pf.props, "id"))
            .unwrap_or_else(|| format!("campsite-{}", index + 1)),
        lat: pf.lat,
        lng: pf.lng,
        name: string_prop(&pf.props, "name").unwrap_or_else(|| format!("Campsite {}", index + 1)),
        amenities,
        price: pf.props.get("price").and_then(JsonValue::as_f64),
        currency: string_prop(&pf.props, "currency"),
        description: string_prop(&pf.props, "description"),
    }
}

/// Route points from a LineString, keeping exported distances when they line up.
fn route_from_line(coords: &[Vec<f64>], props: &Map<String, JsonValue>) -> Vec<RoutePoint> {
    let positions: Vec<(f64, f64)> = coords.iter().filter_map(|c| point_lat_lng(c)).collect();
    let distances: Option<Vec<f64>> = props
        .get("distancesKm")
        .and_then(JsonValue::as_array)
        .map(|list| list.iter().filter_map(JsonValue::as_f64).collect());

    match distances {
        Some(d) if d.len() == positions.len() => positions
            .into_iter()
            .zip(d)
            .map(|((lat, lng), distance_km)| RoutePoint::new(lat, lng, distance_km))
            .collect(),
        _ => route_from_coords(positions),
    }
}

/// GeoJSON positions are [lng, lat, ...].
fn point_lat_lng(coords: &[f64]) -> Option<(f64, f64)> {
    match coords {
        [lng, lat, ..] if coordinates_in_range(*lat, *lng) => Some((*lat, *lng)),
        _ => None,
    }
}

fn string_prop(props: &Map<String, JsonValue>, key: &str) -> Option<String> {
    props
        .get(key)
        .and_then(JsonValue::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn id_to_string(id: &Id) -> String {
    match id {
        Id::String(s) => s.clone(),
        Id::Number(n) => n.to_string(),
    }
}

fn geometry_type_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}
