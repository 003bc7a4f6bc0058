use chrono::{DateTime, Utc};

use crate::codec::{Codec, Decoded, Encoded, Result};
use crate::device::CAMPSITE_SYMBOL;
use crate::gpx_parser::parse_gpx;
use crate::gpx_types::{GpxData, GpxMetadata, GpxPoint};
use crate::gpx_writer::write_gpx;
use crate::model::{Campsite, TripMetadata, TripModel, Waypoint, WaypointRole, route_from_coords};
use crate::options::{ExportFormat, ExportOptions};

/// `<type>` value that marks a `<wpt>` as a campsite rather than a trip waypoint.
const CAMPSITE_TYPE: &str = "campsite";

pub struct GpxCodec;

impl Codec for GpxCodec {
    fn format(&self) -> ExportFormat {
        ExportFormat::Gpx
    }

    fn encode(&self, trip: &TripModel, opts: &ExportOptions) -> Result<Encoded> {
        write_gpx(trip, opts)
    }

    fn decode(&self, content: &str) -> Result<Decoded> {
        let data = parse_gpx(content)?;
        Ok(project(data))
    }
}

/// Project the parsed tree onto the trip model.
fn project(data: GpxData) -> Decoded {
    let (campsite_points, waypoint_points): (Vec<GpxPoint>, Vec<GpxPoint>) = data
        .waypoints
        .into_iter()
        .partition(|pt| is_campsite(pt));

    let count = waypoint_points.len();
    let waypoints = waypoint_points
        .into_iter()
        .enumerate()
        .map(|(i, pt)| {
            let role = pt
                .point_type
                .as_deref()
                .and_then(|t| t.parse::<WaypointRole>().ok())
                .unwrap_or_else(|| WaypointRole::from_position(i, count));
            Waypoint {
                id: non_empty(pt.ext_id).unwrap_or_else(|| format!("wpt-{}", i + 1)),
                lat: pt.lat,
                lng: pt.lon,
                name: non_empty(pt.name).unwrap_or_else(|| format!("Waypoint {}", i + 1)),
                role,
                description: non_empty(pt.desc),
            }
        })
        .collect();

    let campsites = campsite_points
        .into_iter()
        .enumerate()
        .map(|(i, pt)| Campsite {
            id: non_empty(pt.ext_id).unwrap_or_else(|| format!("campsite-{}", i + 1)),
            lat: pt.lat,
            lng: pt.lon,
            name: non_empty(pt.name).unwrap_or_else(|| format!("Campsite {}", i + 1)),
            amenities: Vec::new(),
            price: None,
            currency: None,
            description: non_empty(pt.desc),
        })
        .collect();

    // The first non-empty track wins; a planned <rte> stands in when there is none.
    let route = match data.tracks.iter().find(|trk| trk.points().next().is_some()) {
        Some(track) => route_from_coords(track.points().map(|pt| (pt.lat, pt.lon))),
        None => data
            .routes
            .first()
            .map(|rte| route_from_coords(rte.points.iter().map(|pt| (pt.lat, pt.lon))))
            .unwrap_or_default(),
    };

    Decoded {
        waypoints,
        campsites,
        route,
        metadata: data.metadata.map(trip_metadata),
        warnings: data.warnings,
    }
}

/// A `<type>` hint decides; without one, the campground symbol marks a campsite.
fn is_campsite(pt: &GpxPoint) -> bool {
    match pt.point_type.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => t.eq_ignore_ascii_case(CAMPSITE_TYPE),
        None => pt
            .sym
            .as_deref()
            .is_some_and(|sym| sym.trim().eq_ignore_ascii_case(CAMPSITE_SYMBOL)),
    }
}

fn trip_metadata(meta: GpxMetadata) -> TripMetadata {
    TripMetadata {
        title: non_empty(meta.name),
        author: non_empty(meta.author),
        created: meta
            .time
            .and_then(|t| DateTime::parse_from_rfc3339(t.trim()).ok())
            .map(|t| t.with_timezone(&Utc)),
        description: non_empty(meta.desc),
    }
}

/// Drops values that are blank; anything else is kept as written.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
