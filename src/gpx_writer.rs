//! GPX 1.1 document writer.
//!
//! Output is assembled as text so the byte layout is fully under control:
//! declaration, `<gpx>` root, then metadata, waypoints, campsites, the track
//! and finally the document-level `<extensions>`, which is the element order
//! the GPX 1.1 schema requires.

use std::borrow::Cow;
use std::fmt::Write;

use quick_xml::escape::escape;

use crate::codec::{self, Encoded, Result, coord};
use crate::device::{self, CAMPSITE_SYMBOL, DevicePolicy};
use crate::gpx_types::*;
use crate::model::{Campsite, RoutePoint, TripModel, Waypoint};
use crate::options::ExportOptions;

const CREATOR: &str = "route-exchange-wasm";

/// Write `trip` as a GPX document tailored to the profile in `opts`.
pub fn write_gpx(trip: &TripModel, opts: &ExportOptions) -> Result<Encoded> {
    let policy = DevicePolicy::for_profile(opts.device_profile);
    let mut warnings = Vec::new();

    let writes_waypoints = opts.include_waypoints && !trip.waypoints.is_empty();
    let writes_campsites = opts.include_campsites && !trip.campsites.is_empty();
    let vehicle = trip.vehicle.as_ref().filter(|_| opts.include_vehicle_info);
    let costs = trip.costs.as_ref().filter(|_| opts.include_cost_data);
    let planning = trip.planning.as_ref().filter(|_| opts.include_planning_data);

    if opts.include_vehicle_info && vehicle.is_none() {
        warnings.push("Vehicle info requested but the trip has no vehicle profile".to_string());
    }
    if opts.include_cost_data && costs.is_none() {
        warnings.push("Cost data requested but the trip has no cost breakdown".to_string());
    }
    if opts.include_planning_data && planning.is_none() {
        warnings.push("Planning data requested but the trip has no planning figures".to_string());
    }

    let namespaces = Namespaces {
        camper: writes_waypoints || writes_campsites,
        vehicle: vehicle.is_some(),
        cost: costs.is_some(),
        planning: planning.is_some(),
    };

    let mut head = String::new();
    write_root_open(&mut head, &namespaces)?;

    if opts.include_metadata {
        write_metadata(&mut head, trip, opts, false)?;
    } else if policy.forces_metadata() {
        write_metadata(&mut head, trip, opts, true)?;
    }

    if writes_waypoints {
        for wpt in &trip.waypoints {
            write_waypoint(&mut head, wpt, &policy)?;
        }
    }
    if writes_campsites {
        for site in &trip.campsites {
            write_campsite(&mut head, site)?;
        }
    }

    let mut tail = String::new();
    if namespaces.has_document_extensions() {
        tail.push_str("  <extensions>\n");
        if let Some(v) = vehicle {
            writeln!(tail, "    <vehicle:profile>")?;
            writeln!(tail, "      <vehicle:height>{:.2}</vehicle:height>", v.height)?;
            writeln!(tail, "      <vehicle:width>{:.2}</vehicle:width>", v.width)?;
            writeln!(tail, "      <vehicle:length>{:.2}</vehicle:length>", v.length)?;
            writeln!(tail, "      <vehicle:weight>{:.2}</vehicle:weight>", v.weight)?;
            if let Some(consumption) = v.fuel_consumption {
                writeln!(
                    tail,
                    "      <vehicle:fuelConsumption>{consumption:.1}</vehicle:fuelConsumption>"
                )?;
            }
            writeln!(tail, "    </vehicle:profile>")?;
        }
        if let Some(c) = costs {
            writeln!(tail, "    <cost:breakdown currency=\"{}\">", esc(&c.currency))?;
            writeln!(tail, "      <cost:fuel>{:.2}</cost:fuel>", c.fuel_cost)?;
            writeln!(tail, "      <cost:tolls>{:.2}</cost:tolls>", c.tolls)?;
            writeln!(
                tail,
                "      <cost:accommodation>{:.2}</cost:accommodation>",
                c.accommodation
            )?;
            writeln!(tail, "      <cost:total>{:.2}</cost:total>", c.total)?;
            writeln!(tail, "    </cost:breakdown>")?;
        }
        if let Some(p) = planning {
            writeln!(tail, "    <plan:summary>")?;
            writeln!(tail, "      <plan:distanceKm>{:.1}</plan:distanceKm>", p.total_distance_km)?;
            writeln!(
                tail,
                "      <plan:durationMin>{}</plan:durationMin>",
                p.estimated_duration_min
            )?;
            if let Some(days) = p.travel_days {
                writeln!(tail, "      <plan:travelDays>{days}</plan:travelDays>")?;
            }
            if let Some(limit) = p.daily_distance_limit_km {
                writeln!(tail, "      <plan:dailyLimitKm>{limit:.1}</plan:dailyLimitKm>")?;
            }
            writeln!(tail, "    </plan:summary>")?;
        }
        tail.push_str("  </extensions>\n");
    }
    tail.push_str("</gpx>\n");

    let name = codec::document_name(trip, opts);
    let mut track = String::new();
    if opts.include_route && !trip.route.is_empty() {
        write_track(&mut track, &name, &trip.route)?;

        if let Some(ceiling) = policy.size_ceiling() {
            let estimated = head.len() + track.len() + tail.len();
            if estimated > ceiling {
                let frame = track_frame_len(&name)?;
                let bytes_per_point = (track.len() - frame) / trip.route.len();
                let budget = ceiling.saturating_sub(head.len() + tail.len() + frame);
                let stride = device::decimation_stride(trip.route.len(), bytes_per_point, budget);
                let thinned = device::decimate(&trip.route, stride);
                warnings.push(format!(
                    "Estimated GPX size of {estimated} bytes exceeds the {} size ceiling \
                     of {ceiling} bytes; route thinned from {} to {} points",
                    opts.device_profile,
                    trip.route.len(),
                    thinned.len()
                ));
                log::warn!(
                    "thinning route for {}: {} -> {} points",
                    opts.device_profile,
                    trip.route.len(),
                    thinned.len()
                );
                track.clear();
                write_track(&mut track, &name, &thinned)?;
            }
        }
    }

    let mut content = head;
    content.push_str(&track);
    content.push_str(&tail);

    Ok(Encoded { content, warnings })
}

/// Which namespaces the root element has to declare.
struct Namespaces {
    camper: bool,
    vehicle: bool,
    cost: bool,
    planning: bool,
}

impl Namespaces {
    fn has_document_extensions(&self) -> bool {
        self.vehicle || self.cost || self.planning
    }
}

fn esc(s: &str) -> Cow<'_, str> {
    escape(s)
}

fn write_root_open(out: &mut String, ns: &Namespaces) -> Result<()> {
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    write!(
        out,
        "<gpx xmlns=\"{GPX_NAMESPACE}\" version=\"1.1\" creator=\"{CREATOR}\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
         xsi:schemaLocation=\"{GPX_SCHEMA_LOCATION}\""
    )?;
    if ns.camper {
        write!(out, " xmlns:camper=\"{CAMPER_NAMESPACE}\"")?;
    }
    if ns.vehicle {
        write!(out, " xmlns:vehicle=\"{VEHICLE_NAMESPACE}\"")?;
    }
    if ns.cost {
        write!(out, " xmlns:cost=\"{COST_NAMESPACE}\"")?;
    }
    if ns.planning {
        write!(out, " xmlns:plan=\"{PLANNING_NAMESPACE}\"")?;
    }
    out.push_str(">\n");
    Ok(())
}

/// `minimal` keeps only name and time, for devices that need a preview header.
fn write_metadata(
    out: &mut String,
    trip: &TripModel,
    opts: &ExportOptions,
    minimal: bool,
) -> Result<()> {
    out.push_str("  <metadata>\n");
    writeln!(out, "    <name>{}</name>", esc(&codec::document_name(trip, opts)))?;
    if !minimal {
        if let Some(desc) = codec::document_description(trip, opts) {
            writeln!(out, "    <desc>{}</desc>", esc(&desc))?;
        }
        if let Some(author) = codec::document_author(trip, opts) {
            writeln!(out, "    <author>\n      <name>{}</name>\n    </author>", esc(&author))?;
        }
    }
    writeln!(out, "    <time>{}</time>", codec::document_timestamp(trip))?;
    out.push_str("  </metadata>\n");
    Ok(())
}

fn write_waypoint(out: &mut String, wpt: &Waypoint, policy: &DevicePolicy) -> Result<()> {
    writeln!(out, "  <wpt lat=\"{}\" lon=\"{}\">", coord(wpt.lat), coord(wpt.lng))?;
    writeln!(out, "    <name>{}</name>", esc(&wpt.name))?;
    if let Some(desc) = &wpt.description {
        writeln!(out, "    <desc>{}</desc>", esc(desc))?;
    }
    if let Some(sym) = policy.waypoint_symbol(wpt.role) {
        writeln!(out, "    <sym>{sym}</sym>")?;
    }
    writeln!(out, "    <type>{}</type>", wpt.role)?;
    write_id_extension(out, &wpt.id)?;
    out.push_str("  </wpt>\n");
    Ok(())
}

fn write_campsite(out: &mut String, site: &Campsite) -> Result<()> {
    writeln!(out, "  <wpt lat=\"{}\" lon=\"{}\">", coord(site.lat), coord(site.lng))?;
    writeln!(out, "    <name>{}</name>", esc(&site.name))?;
    let summary = site.summary();
    if !summary.is_empty() {
        writeln!(out, "    <desc>{}</desc>", esc(&summary))?;
    }
    writeln!(out, "    <sym>{CAMPSITE_SYMBOL}</sym>")?;
    out.push_str("    <type>campsite</type>\n");
    write_id_extension(out, &site.id)?;
    out.push_str("  </wpt>\n");
    Ok(())
}

fn write_id_extension(out: &mut String, id: &str) -> Result<()> {
    writeln!(
        out,
        "    <extensions>\n      <camper:id>{}</camper:id>\n    </extensions>",
        esc(id)
    )?;
    Ok(())
}

fn write_track(out: &mut String, name: &str, points: &[RoutePoint]) -> Result<()> {
    out.push_str("  <trk>\n");
    writeln!(out, "    <name>{}</name>", esc(name))?;
    out.push_str("    <trkseg>\n");
    for pt in points {
        writeln!(out, "      <trkpt lat=\"{}\" lon=\"{}\"/>", coord(pt.lat), coord(pt.lng))?;
    }
    out.push_str("    </trkseg>\n  </trk>\n");
    Ok(())
}

/// Length of the `<trk>` wrapper without any points.
fn track_frame_len(name: &str) -> Result<usize> {
    let mut frame = String::new();
    write_track(&mut frame, name, &[])?;
    Ok(frame.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::TOMTOM_SIZE_CEILING;
    use crate::model::{CostBreakdown, TripMetadata, VehicleProfile, WaypointRole};
    use crate::options::DeviceProfile;
    use chrono::{TimeZone, Utc};

    fn trip() -> TripModel {
        TripModel {
            waypoints: vec![
                Waypoint::new("w1", "Berlin", 52.52, 13.405).with_role(WaypointRole::Start),
                Waypoint::new("w2", "Rome", 41.9028, 12.4964).with_role(WaypointRole::End),
            ],
            metadata: Some(TripMetadata {
                title: Some("South".into()),
                created: Some(Utc.with_ymd_and_hms(2025, 5, 1, 7, 0, 0).unwrap()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_waypoint_element() {
        let out = write_gpx(&trip(), &ExportOptions::default()).unwrap().content;
        assert!(out.contains(
            "  <wpt lat=\"52.520000\" lon=\"13.405000\">\n    <name>Berlin</name>\n    <type>start</type>\n"
        ));
        assert!(out.contains("<camper:id>w2</camper:id>"));
        assert!(out.contains(&format!("xmlns:camper=\"{CAMPER_NAMESPACE}\"")));
        assert!(!out.contains("<sym>"));
    }

    #[test]
    fn test_metadata_block() {
        let opts = ExportOptions {
            author: Some("Alex".into()),
            ..Default::default()
        };
        let out = write_gpx(&trip(), &opts).unwrap().content;
        assert!(out.contains(
            "  <metadata>\n    <name>South</name>\n    <author>\n      <name>Alex</name>\n    </author>\n    <time>2025-05-01T07:00:00Z</time>\n  </metadata>\n"
        ));
    }

    #[test]
    fn test_names_are_escaped() {
        let mut t = trip();
        t.waypoints[0].name = "Fish & <Chips>".into();
        let out = write_gpx(&t, &ExportOptions::default()).unwrap().content;
        assert!(out.contains("<name>Fish &amp; &lt;Chips&gt;</name>"));
    }

    #[test]
    fn test_extension_namespaces_only_when_used() {
        let mut t = trip();
        t.vehicle = Some(VehicleProfile {
            height: 3.2,
            width: 2.3,
            weight: 3.5,
            length: 7.0,
            fuel_consumption: None,
        });
        t.costs = Some(CostBreakdown {
            fuel_cost: 180.0,
            tolls: 42.5,
            accommodation: 0.0,
            total: 222.5,
            currency: "EUR".into(),
        });

        let plain = write_gpx(&t, &ExportOptions::default()).unwrap().content;
        assert!(!plain.contains("xmlns:vehicle"));
        assert!(!plain.contains("<extensions>\n    <vehicle"));

        let opts = ExportOptions {
            include_vehicle_info: true,
            include_cost_data: true,
            ..Default::default()
        };
        let out = write_gpx(&t, &opts).unwrap().content;
        assert!(out.contains(&format!("xmlns:vehicle=\"{VEHICLE_NAMESPACE}\"")));
        assert!(out.contains(&format!("xmlns:cost=\"{COST_NAMESPACE}\"")));
        assert!(!out.contains("xmlns:plan"));
        assert!(out.contains("<vehicle:height>3.20</vehicle:height>"));
        assert!(out.contains("<cost:breakdown currency=\"EUR\">"));
        assert!(out.contains("<cost:total>222.50</cost:total>"));
        assert!(out.ends_with("  </extensions>\n</gpx>\n"));
    }

    #[test]
    fn test_missing_vehicle_is_warned() {
        let opts = ExportOptions {
            include_vehicle_info: true,
            ..Default::default()
        };
        let encoded = write_gpx(&trip(), &opts).unwrap();
        assert_eq!(encoded.warnings.len(), 1);
        assert!(encoded.warnings[0].contains("no vehicle profile"));
        assert!(!encoded.content.contains("<extensions>\n    <vehicle"));
    }

    #[test]
    fn test_smartphone_forces_minimal_metadata() {
        let opts = ExportOptions {
            include_metadata: false,
            author: Some("Alex".into()),
            ..Default::default()
        }
        .with_profile(DeviceProfile::Smartphone);
        let out = write_gpx(&trip(), &opts).unwrap().content;
        assert!(out.contains("<metadata>\n    <name>South</name>\n    <time>"));
        assert!(!out.contains("<author>"));
    }

    #[test]
    fn test_tomtom_thins_large_route() {
        let mut t = trip();
        t.route = (0..40_000)
            .map(|i| {
                let step = i as f64;
                RoutePoint::new(45.0 + step * 1e-5, 7.0 + step * 1e-5, step * 0.01)
            })
            .collect();
        let opts = ExportOptions::default().with_profile(DeviceProfile::TomTom);
        let encoded = write_gpx(&t, &opts).unwrap();

        assert!(encoded.content.len() <= TOMTOM_SIZE_CEILING);
        assert_eq!(encoded.warnings.len(), 1);
        assert!(encoded.warnings[0].contains("size ceiling"));
        // first and last samples survive thinning
        assert!(encoded.content.contains("<trkpt lat=\"45.000000\" lon=\"7.000000\"/>"));
        assert!(encoded.content.contains("<trkpt lat=\"45.399990\" lon=\"7.399990\"/>"));
    }

    #[test]
    fn test_universal_keeps_large_route() {
        let mut t = trip();
        t.route = (0..40_000)
            .map(|i| RoutePoint::new(45.0, 7.0 + i as f64 * 1e-5, 0.0))
            .collect();
        let encoded = write_gpx(&t, &ExportOptions::default()).unwrap();
        assert!(encoded.warnings.is_empty());
        assert_eq!(encoded.content.matches("<trkpt ").count(), 40_000);
    }
}
