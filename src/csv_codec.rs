//! CSV export/import.
//!
//! A document is a series of blank-line separated sections, each with its own
//! header row. The waypoint section always comes first and is always present,
//! so even an export with nothing selected is a valid one-line CSV. Import is
//! best effort: sections are recognised by their column names and a bad row
//! is reported and skipped without aborting the rest. A plain coordinate
//! section reads as waypoints unless it carries distances or follows a
//! waypoint section.

use csv::{ReaderBuilder, StringRecord, Terminator, Trim, WriterBuilder};

use crate::codec::{self, Codec, Decoded, Encoded, Result, coord};
use crate::error::RouteExchangeError;
use crate::model::{
    Campsite, RoutePoint, TripModel, Waypoint, WaypointRole, coordinates_in_range,
    route_from_coords,
};
use crate::options::{ExportFormat, ExportOptions};

const WAYPOINT_HEADER: [&str; 5] = ["id", "name", "lat", "lng", "role"];
const CAMPSITE_HEADER: [&str; 7] = ["id", "name", "lat", "lng", "price", "currency", "amenities"];
const ROUTE_HEADER: [&str; 3] = ["lat", "lng", "distance_km"];
const DETAILS_HEADER: [&str; 3] = ["category", "field", "value"];

const LAT_ALIASES: [&str; 2] = ["lat", "latitude"];
const LNG_ALIASES: [&str; 4] = ["lng", "lon", "long", "longitude"];
const DISTANCE_ALIASES: [&str; 2] = ["distance_km", "distance"];

pub struct CsvCodec;

impl Codec for CsvCodec {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn encode(&self, trip: &TripModel, opts: &ExportOptions) -> Result<Encoded> {
        let mut sections = Vec::new();

        let waypoint_rows: Vec<Vec<String>> = if opts.include_waypoints {
            trip.waypoints
                .iter()
                .map(|w| {
                    vec![
                        w.id.clone(),
                        w.name.clone(),
                        coord(w.lat),
                        coord(w.lng),
                        w.role.to_string(),
                    ]
                })
                .collect()
        } else {
            Vec::new()
        };
        sections.push(write_section(&WAYPOINT_HEADER, &waypoint_rows)?);

        if opts.include_campsites && !trip.campsites.is_empty() {
            let rows: Vec<Vec<String>> = trip
                .campsites
                .iter()
                .map(|c| {
                    vec![
                        c.id.clone(),
                        c.name.clone(),
                        coord(c.lat),
                        coord(c.lng),
                        c.price.map(|p| format!("{p:.2}")).unwrap_or_default(),
                        c.currency.clone().unwrap_or_default(),
                        c.amenities.join(";"),
                    ]
                })
                .collect();
            sections.push(write_section(&CAMPSITE_HEADER, &rows)?);
        }

        if opts.include_route && !trip.route.is_empty() {
            let rows: Vec<Vec<String>> = trip
                .route
                .iter()
                .map(|p| vec![coord(p.lat), coord(p.lng), format!("{:.3}", p.distance_km)])
                .collect();
            sections.push(write_section(&ROUTE_HEADER, &rows)?);
        }

        let details = detail_rows(trip, opts);
        if !details.is_empty() {
            sections.push(write_section(&DETAILS_HEADER, &details)?);
        }

        Ok(Encoded {
            content: sections.join("\n"),
            warnings: Vec::new(),
        })
    }

    fn decode(&self, content: &str) -> Result<Decoded> {
        let mut decoded = Decoded::default();
        let mut raw_waypoints: Vec<RawWaypoint> = Vec::new();
        let mut recognised = false;
        let mut seen_waypoints = false;

        for block in split_sections(content) {
            let mut reader = ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .trim(Trim::All)
                .from_reader(block.text.as_bytes());
            let header = Header::new(reader.headers()?);

            let kind = header.kind(seen_waypoints);
            if kind.is_some() {
                recognised = true;
            }
            if kind == Some(SectionKind::Waypoints) {
                seen_waypoints = true;
            }

            for result in reader.records() {
                let record = match result {
                    Ok(record) => record,
                    Err(err) => {
                        decoded.warnings.push(format!("Skipped CSV row: {err}"));
                        continue;
                    }
                };
                let line = block.first_line
                    + record.position().map(|p| p.line() as usize).unwrap_or(1)
                    - 1;

                let parsed = match kind {
                    Some(SectionKind::Waypoints) => {
                        header.waypoint(&record).map(|w| raw_waypoints.push(w))
                    }
                    Some(SectionKind::Campsites) => header
                        .campsite(&record, decoded.campsites.len())
                        .map(|c| decoded.campsites.push(c)),
                    Some(SectionKind::Route) => {
                        header.route_point(&record).map(|p| decoded.route.push(p))
                    }
                    Some(SectionKind::Details) | None => Ok(()),
                };
                if let Err(reason) = parsed {
                    decoded.warnings.push(format!("Skipped CSV row {line}: {reason}"));
                }
            }

            if kind.is_none() {
                decoded.warnings.push(format!(
                    "Skipped CSV section at line {}: no latitude/longitude columns",
                    block.first_line
                ));
            }
        }

        if !recognised {
            return Err(RouteExchangeError::CsvHeader);
        }

        // Distances are recomputed unless every row carried one.
        if decoded.route.iter().any(|p| p.distance_km.is_nan()) {
            decoded.route = route_from_coords(decoded.route.iter().map(|p| (p.lat, p.lng)));
        }

        let count = raw_waypoints.len();
        decoded.waypoints = raw_waypoints
            .into_iter()
            .enumerate()
            .map(|(i, raw)| Waypoint {
                id: raw.id.unwrap_or_else(|| format!("wpt-{}", i + 1)),
                lat: raw.lat,
                lng: raw.lng,
                name: raw.name.unwrap_or_else(|| format!("Waypoint {}", i + 1)),
                role: raw.role.unwrap_or_else(|| WaypointRole::from_position(i, count)),
                description: None,
            })
            .collect();

        Ok(decoded)
    }
}

fn write_section<S: AsRef<str>>(header: &[&str], rows: &[Vec<S>]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row.iter().map(|field| field.as_ref()))?;
    }
    let bytes = writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn detail_rows(trip: &TripModel, opts: &ExportOptions) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut push = |category: &str, field: &str, value: String| {
        rows.push(vec![category.to_string(), field.to_string(), value]);
    };

    if opts.include_metadata {
        push("trip", "name", codec::document_name(trip, opts));
        if let Some(desc) = codec::document_description(trip, opts) {
            push("trip", "description", desc);
        }
        if let Some(author) = codec::document_author(trip, opts) {
            push("trip", "author", author);
        }
        push("trip", "created", codec::document_timestamp(trip));
    }
    if let Some(v) = trip.vehicle.as_ref().filter(|_| opts.include_vehicle_info) {
        push("vehicle", "height_m", format!("{:.2}", v.height));
        push("vehicle", "width_m", format!("{:.2}", v.width));
        push("vehicle", "length_m", format!("{:.2}", v.length));
        push("vehicle", "weight_t", format!("{:.2}", v.weight));
        if let Some(consumption) = v.fuel_consumption {
            push("vehicle", "fuel_l_per_100km", format!("{consumption:.1}"));
        }
    }
    if let Some(c) = trip.costs.as_ref().filter(|_| opts.include_cost_data) {
        push("cost", "fuel", format!("{:.2}", c.fuel_cost));
        push("cost", "tolls", format!("{:.2}", c.tolls));
        push("cost", "accommodation", format!("{:.2}", c.accommodation));
        push("cost", "total", format!("{:.2}", c.total));
        push("cost", "currency", c.currency.clone());
    }
    if let Some(p) = trip.planning.as_ref().filter(|_| opts.include_planning_data) {
        push("planning", "distance_km", format!("{:.1}", p.total_distance_km));
        push("planning", "duration_min", p.estimated_duration_min.to_string());
        if let Some(days) = p.travel_days {
            push("planning", "travel_days", days.to_string());
        }
        if let Some(limit) = p.daily_distance_limit_km {
            push("planning", "daily_limit_km", format!("{limit:.1}"));
        }
    }

    rows
}

/// A run of non-blank lines and the 1-based line it starts on.
struct Section {
    first_line: usize,
    text: String,
}

/// Split on blank lines that fall outside quoted fields.
fn split_sections(content: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;
    let mut in_quotes = false;

    for (i, line) in content.trim_start_matches('\u{feff}').lines().enumerate() {
        if !in_quotes && line.trim().is_empty() {
            sections.extend(current.take());
            continue;
        }
        let section = current.get_or_insert_with(|| Section {
            first_line: i + 1,
            text: String::new(),
        });
        section.text.push_str(line);
        section.text.push('\n');
        // An escaped quote ("") flips twice.
        if line.matches('"').count() % 2 == 1 {
            in_quotes = !in_quotes;
        }
    }
    sections.extend(current);
    sections
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Waypoints,
    Campsites,
    Route,
    Details,
}

/// Column positions resolved from a section's header row.
struct Header {
    names: Vec<String>,
}

struct RawWaypoint {
    id: Option<String>,
    name: Option<String>,
    lat: f64,
    lng: f64,
    role: Option<WaypointRole>,
}

impl Header {
    fn new(record: &StringRecord) -> Self {
        Self {
            names: record.iter().map(|h| h.trim().to_ascii_lowercase()).collect(),
        }
    }

    fn column(&self, aliases: &[&str]) -> Option<usize> {
        self.names.iter().position(|name| aliases.contains(&name.as_str()))
    }

    /// `None` when the section has no coordinate columns.
    fn kind(&self, seen_waypoints: bool) -> Option<SectionKind> {
        if self.column(&["category"]).is_some() && self.column(&["value"]).is_some() {
            return Some(SectionKind::Details);
        }
        self.column(&LAT_ALIASES)?;
        self.column(&LNG_ALIASES)?;
        let kind = if self.column(&["price", "amenities", "currency"]).is_some() {
            SectionKind::Campsites
        } else if self.column(&["id", "name", "role"]).is_some() {
            SectionKind::Waypoints
        } else if self.column(&DISTANCE_ALIASES).is_some() || seen_waypoints {
            SectionKind::Route
        } else {
            SectionKind::Waypoints
        };
        Some(kind)
    }

    fn text(&self, record: &StringRecord, aliases: &[&str]) -> Option<String> {
        self.column(aliases)
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn lat_lng(&self, record: &StringRecord) -> std::result::Result<(f64, f64), String> {
        let lat = self.number(record, &LAT_ALIASES, "latitude")?;
        let lng = self.number(record, &LNG_ALIASES, "longitude")?;
        if !coordinates_in_range(lat, lng) {
            return Err(format!("coordinates ({lat}, {lng}) out of range"));
        }
        Ok((lat, lng))
    }

    fn number(
        &self,
        record: &StringRecord,
        aliases: &[&str],
        label: &str,
    ) -> std::result::Result<f64, String> {
        let raw = self
            .text(record, aliases)
            .ok_or_else(|| format!("missing {label}"))?;
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid {label} '{raw}'"))
    }

    fn waypoint(&self, record: &StringRecord) -> std::result::Result<RawWaypoint, String> {
        let (lat, lng) = self.lat_lng(record)?;
        Ok(RawWaypoint {
            id: self.text(record, &["id"]),
            name: self.text(record, &["name"]),
            lat,
            lng,
            role: self.text(record, &["role"]).and_then(|r| r.parse().ok()),
        })
    }

    fn campsite(
        &self,
        record: &StringRecord,
        index: usize,
    ) -> std::result::Result<Campsite, String> {
        let (lat, lng) = self.lat_lng(record)?;
        let price = match self.text(record, &["price"]) {
            Some(raw) => Some(
                raw.parse::<f64>()
                    .map_err(|_| format!("invalid price '{raw}'"))?,
            ),
            None => None,
        };
        Ok(Campsite {
            id: self
                .text(record, &["id"])
                .unwrap_or_else(|| format!("campsite-{}", index + 1)),
            lat,
            lng,
            name: self
                .text(record, &["name"])
                .unwrap_or_else(|| format!("Campsite {}", index + 1)),
            amenities: self
                .text(record, &["amenities"])
                .map(|list| {
                    list.split(';')
                        .map(str::trim)
                        .filter(|a| !a.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            price,
            currency: self.text(record, &["currency"]),
            description: None,
        })
    }

    /// A missing distance is marked NaN and recomputed once the section is read.
    fn route_point(&self, record: &StringRecord) -> std::result::Result<RoutePoint, String> {
        let (lat, lng) = self.lat_lng(record)?;
        let distance_km = self
            .text(record, &DISTANCE_ALIASES)
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(f64::NAN);
        Ok(RoutePoint::new(lat, lng, distance_km))
    }
}
