//! Trip model handed to the engine by the planning and routing side.
//!
//! Plain value types. The only behavior here is [`TripModel::check`], which
//! reports advisory findings and never rejects a trip.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mean Earth radius used for cumulative route distances.
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Position of a waypoint within the trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointRole {
    Start,
    #[default]
    Waypoint,
    End,
}

impl WaypointRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Waypoint => "waypoint",
            Self::End => "end",
        }
    }

    /// Role implied by a position in a sequence of `len` waypoints.
    pub fn from_position(index: usize, len: usize) -> Self {
        if index == 0 {
            Self::Start
        } else if index + 1 == len {
            Self::End
        } else {
            Self::Waypoint
        }
    }
}

impl fmt::Display for WaypointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaypointRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "waypoint" | "via" | "intermediate" => Ok(Self::Waypoint),
            "end" | "destination" => Ok(Self::End),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    #[serde(default)]
    pub role: WaypointRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Waypoint {
    pub fn new(id: impl Into<String>, name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lng,
            name: name.into(),
            role: WaypointRole::Waypoint,
            description: None,
        }
    }

    pub fn with_role(mut self, role: WaypointRole) -> Self {
        self.role = role;
        self
    }
}

/// A sample of the computed route geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePoint {
    pub lat: f64,
    pub lng: f64,
    /// Cumulative distance from the route start, in kilometres.
    #[serde(default)]
    pub distance_km: f64,
}

impl RoutePoint {
    pub fn new(lat: f64, lng: f64, distance_km: f64) -> Self {
        Self {
            lat,
            lng,
            distance_km,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campsite {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Campsite {
    /// Amenities and nightly price folded into one line of text.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(desc) = &self.description {
            parts.push(desc.clone());
        }
        if !self.amenities.is_empty() {
            parts.push(format!("Amenities: {}", self.amenities.join(", ")));
        }
        if let Some(price) = self.price {
            let currency = self.currency.as_deref().unwrap_or("EUR");
            parts.push(format!("Price: {price:.2} {currency}/night"));
        }
        parts.join(". ")
    }
}

/// Vehicle dimensions in metres, weight in tonnes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleProfile {
    pub height: f64,
    pub width: f64,
    pub weight: f64,
    pub length: f64,
    /// Litres per 100 km.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_consumption: Option<f64>,
}

impl VehicleProfile {
    pub const MAX_HEIGHT: f64 = 5.0;
    pub const MAX_WIDTH: f64 = 3.0;
    pub const MAX_WEIGHT: f64 = 40.0;
    pub const MAX_LENGTH: f64 = 20.0;

    fn out_of_bounds(&self) -> Vec<String> {
        [
            ("height", self.height, Self::MAX_HEIGHT, "m"),
            ("width", self.width, Self::MAX_WIDTH, "m"),
            ("weight", self.weight, Self::MAX_WEIGHT, "t"),
            ("length", self.length, Self::MAX_LENGTH, "m"),
        ]
        .into_iter()
        .filter(|(_, value, max, _)| !(*value > 0.0 && value <= max))
        .map(|(field, value, max, unit)| {
            format!("Vehicle {field} {value} is outside the range (0, {max}] {unit}")
        })
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub fuel_cost: f64,
    pub tolls: f64,
    #[serde(default)]
    pub accommodation: f64,
    pub total: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningData {
    pub total_distance_km: f64,
    pub estimated_duration_min: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_distance_limit_km: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A planned camper trip, already routed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripModel {
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
    #[serde(default)]
    pub route: Vec<RoutePoint>,
    #[serde(default)]
    pub campsites: Vec<Campsite>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<VehicleProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub costs: Option<CostBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planning: Option<PlanningData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TripMetadata>,
}

impl TripModel {
    pub fn with_waypoints(waypoints: Vec<Waypoint>) -> Self {
        Self {
            waypoints,
            ..Default::default()
        }
    }

    /// Advisory findings about the trip. An empty list means nothing to report.
    pub fn check(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for wpt in &self.waypoints {
            if !coordinates_in_range(wpt.lat, wpt.lng) {
                warnings.push(format!(
                    "Waypoint '{}' has out-of-range coordinates ({}, {})",
                    wpt.id, wpt.lat, wpt.lng
                ));
            }
        }
        for site in &self.campsites {
            if !coordinates_in_range(site.lat, site.lng) {
                warnings.push(format!(
                    "Campsite '{}' has out-of-range coordinates ({}, {})",
                    site.id, site.lat, site.lng
                ));
            }
        }

        let position = |role: WaypointRole| self.waypoints.iter().position(|w| w.role == role);
        let count = |role: WaypointRole| self.waypoints.iter().filter(|w| w.role == role).count();
        if count(WaypointRole::Start) > 1 {
            warnings.push("More than one waypoint has role 'start'".to_string());
        }
        if count(WaypointRole::End) > 1 {
            warnings.push("More than one waypoint has role 'end'".to_string());
        }
        if let (Some(start), Some(end)) =
            (position(WaypointRole::Start), position(WaypointRole::End))
        {
            if end < start {
                warnings.push("The 'end' waypoint comes before the 'start' waypoint".to_string());
            }
        }

        if let Some(vehicle) = &self.vehicle {
            warnings.extend(vehicle.out_of_bounds());
        }

        warnings
    }
}

pub fn coordinates_in_range(lat: f64, lng: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

/// Great-circle distance between two positions, in kilometres.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Build route points from bare coordinates, accumulating distance along the way.
pub fn route_from_coords(coords: impl IntoIterator<Item = (f64, f64)>) -> Vec<RoutePoint> {
    let mut route: Vec<RoutePoint> = Vec::new();
    for (lat, lng) in coords {
        let distance_km = match route.last() {
            Some(prev) => prev.distance_km + haversine_km(prev.lat, prev.lng, lat, lng),
            None => 0.0,
        };
        route.push(RoutePoint::new(lat, lng, distance_km));
    }
    route
}
