//! KML 2.2 export. Consumers are treated as profile-agnostic and import is not
//! offered for this format.

use std::borrow::Cow;
use std::fmt::Write;

use quick_xml::escape::escape;

use crate::codec::{self, Codec, Encoded, Result, coord};
use crate::model::{TripModel, WaypointRole};
use crate::options::{ExportFormat, ExportOptions};

pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";
const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

/// Shared placemark styles: (id, icon).
const ICON_STYLES: [(&str, &str); 4] = [
    ("start", "http://maps.google.com/mapfiles/kml/paddle/grn-circle.png"),
    ("waypoint", "http://maps.google.com/mapfiles/kml/paddle/blu-circle.png"),
    ("end", "http://maps.google.com/mapfiles/kml/paddle/red-circle.png"),
    ("campsite", "http://maps.google.com/mapfiles/kml/shapes/campground.png"),
];

pub struct KmlCodec;

impl Codec for KmlCodec {
    fn format(&self) -> ExportFormat {
        ExportFormat::Kml
    }

    fn encode(&self, trip: &TripModel, opts: &ExportOptions) -> Result<Encoded> {
        write_kml(trip, opts)
    }
}

fn esc(s: &str) -> Cow<'_, str> {
    escape(s)
}

fn write_kml(trip: &TripModel, opts: &ExportOptions) -> Result<Encoded> {
    let mut out = String::new();
    let author = codec::document_author(trip, opts).filter(|_| opts.include_metadata);
    let writes_waypoints = opts.include_waypoints && !trip.waypoints.is_empty();
    let writes_campsites = opts.include_campsites && !trip.campsites.is_empty();
    let writes_route = opts.include_route && trip.route.len() >= 2;

    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    write!(out, "<kml xmlns=\"{KML_NAMESPACE}\"")?;
    if author.is_some() {
        write!(out, " xmlns:atom=\"{ATOM_NAMESPACE}\"")?;
    }
    out.push_str(">\n  <Document>\n");

    if opts.include_metadata {
        writeln!(out, "    <name>{}</name>", esc(&codec::document_name(trip, opts)))?;
        if let Some(author) = &author {
            writeln!(
                out,
                "    <atom:author><atom:name>{}</atom:name></atom:author>",
                esc(author)
            )?;
        }
        if let Some(desc) = codec::document_description(trip, opts) {
            writeln!(out, "    <description>{}</description>", esc(&desc))?;
        }
    }

    if writes_waypoints || writes_campsites {
        for (id, href) in ICON_STYLES {
            writeln!(
                out,
                "    <Style id=\"{id}\"><IconStyle><Icon><href>{href}</href></Icon></IconStyle></Style>"
            )?;
        }
    }
    if writes_route {
        out.push_str(
            "    <Style id=\"route\"><LineStyle><color>ff0000ff</color><width>4</width></LineStyle></Style>\n",
        );
    }

    let details = trip_details(trip, opts);
    if !details.is_empty() {
        out.push_str("    <ExtendedData>\n");
        for (key, value) in &details {
            writeln!(
                out,
                "      <Data name=\"{key}\"><value>{}</value></Data>",
                esc(value)
            )?;
        }
        out.push_str("    </ExtendedData>\n");
    }

    if writes_waypoints {
        for wpt in &trip.waypoints {
            write_point_placemark(
                &mut out,
                &wpt.name,
                wpt.description.as_deref(),
                style_for(wpt.role),
                wpt.lat,
                wpt.lng,
            )?;
        }
    }
    if writes_campsites {
        for site in &trip.campsites {
            let summary = site.summary();
            let desc = (!summary.is_empty()).then_some(summary.as_str());
            write_point_placemark(&mut out, &site.name, desc, "campsite", site.lat, site.lng)?;
        }
    }
    if writes_route {
        out.push_str("    <Placemark>\n");
        writeln!(out, "      <name>{}</name>", esc(&codec::document_name(trip, opts)))?;
        out.push_str("      <styleUrl>#route</styleUrl>\n");
        out.push_str("      <LineString>\n        <tessellate>1</tessellate>\n        <coordinates>");
        let coords: Vec<String> = trip
            .route
            .iter()
            .map(|pt| format!("{},{},0", coord(pt.lng), coord(pt.lat)))
            .collect();
        out.push_str(&coords.join(" "));
        out.push_str("</coordinates>\n      </LineString>\n    </Placemark>\n");
    }

    out.push_str("  </Document>\n</kml>\n");

    let mut warnings = Vec::new();
    if opts.include_route && trip.route.len() == 1 {
        warnings.push("Route has a single point; KML LineString omitted".to_string());
    }

    Ok(Encoded {
        content: out,
        warnings,
    })
}

fn style_for(role: WaypointRole) -> &'static str {
    role.as_str()
}

fn write_point_placemark(
    out: &mut String,
    name: &str,
    description: Option<&str>,
    style: &str,
    lat: f64,
    lng: f64,
) -> Result<()> {
    out.push_str("    <Placemark>\n");
    writeln!(out, "      <name>{}</name>", esc(name))?;
    if let Some(desc) = description {
        writeln!(out, "      <description>{}</description>", esc(desc))?;
    }
    writeln!(out, "      <styleUrl>#{style}</styleUrl>")?;
    writeln!(
        out,
        "      <Point><coordinates>{},{},0</coordinates></Point>",
        coord(lng),
        coord(lat)
    )?;
    out.push_str("    </Placemark>\n");
    Ok(())
}

/// Vehicle, cost and planning figures as flat `category.field` pairs.
fn trip_details(trip: &TripModel, opts: &ExportOptions) -> Vec<(&'static str, String)> {
    let mut details = Vec::new();
    if let Some(v) = trip.vehicle.as_ref().filter(|_| opts.include_vehicle_info) {
        details.push(("vehicle.height", format!("{:.2}", v.height)));
        details.push(("vehicle.width", format!("{:.2}", v.width)));
        details.push(("vehicle.length", format!("{:.2}", v.length)));
        details.push(("vehicle.weight", format!("{:.2}", v.weight)));
        if let Some(consumption) = v.fuel_consumption {
            details.push(("vehicle.fuelConsumption", format!("{consumption:.1}")));
        }
    }
    if let Some(c) = trip.costs.as_ref().filter(|_| opts.include_cost_data) {
        details.push(("cost.fuel", format!("{:.2}", c.fuel_cost)));
        details.push(("cost.tolls", format!("{:.2}", c.tolls)));
        details.push(("cost.accommodation", format!("{:.2}", c.accommodation)));
        details.push(("cost.total", format!("{:.2}", c.total)));
        details.push(("cost.currency", c.currency.clone()));
    }
    if let Some(p) = trip.planning.as_ref().filter(|_| opts.include_planning_data) {
        details.push(("planning.distanceKm", format!("{:.1}", p.total_distance_km)));
        details.push(("planning.durationMin", p.estimated_duration_min.to_string()));
        if let Some(days) = p.travel_days {
            details.push(("planning.travelDays", days.to_string()));
        }
        if let Some(limit) = p.daily_distance_limit_km {
            details.push(("planning.dailyLimitKm", format!("{limit:.1}")));
        }
    }
    details
}
