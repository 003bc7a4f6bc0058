use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::RouteExchangeError;
use crate::gpx_types::*;

type Result<T> = std::result::Result<T, RouteExchangeError>;

/// Parse a GPX 1.1 XML string into GpxData.
///
/// The root element must be `<gpx>` bound to the GPX 1.1 namespace. Points
/// with missing or malformed coordinates are skipped and reported in
/// `GpxData::warnings`; unknown elements are skipped silently.
pub fn parse_gpx(xml: &str) -> Result<GpxData> {
    let mut reader = Reader::from_str(xml);
    let mut data = GpxData::default();
    let mut root_seen = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if !root_seen {
                    check_root(&e)?;
                    root_seen = true;
                    continue;
                }
                match e.local_name().as_ref() {
                    b"metadata" => data.metadata = Some(parse_metadata(&mut reader)?),
                    b"wpt" => {
                        if let Some(pt) = parse_point(&e, "wpt", &mut reader, &mut data.warnings)? {
                            data.waypoints.push(pt);
                        }
                    }
                    b"rte" => data.routes.push(parse_route(&mut reader, &mut data.warnings)?),
                    b"trk" => data.tracks.push(parse_track(&mut reader, &mut data.warnings)?),
                    _ => {
                        reader.read_to_end(e.name())?;
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if !root_seen {
                    check_root(&e)?;
                    root_seen = true;
                    continue;
                }
                if e.local_name().as_ref() == b"wpt" {
                    if let Some(pt) = parse_empty_point(&e, "wpt", &mut data.warnings) {
                        data.waypoints.push(pt);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(RouteExchangeError::XmlParse(e)),
            _ => {}
        }
    }

    if !root_seen {
        return Err(RouteExchangeError::UnexpectedRoot {
            expected: "gpx",
            found: "nothing".to_string(),
        });
    }

    Ok(data)
}

/// The root must be `<gpx>` and declare the GPX 1.1 namespace for its prefix.
fn check_root(e: &BytesStart<'_>) -> Result<()> {
    if e.local_name().as_ref() != b"gpx" {
        return Err(RouteExchangeError::UnexpectedRoot {
            expected: "gpx",
            found: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        });
    }

    let expected_key: Vec<u8> = match e.name().prefix() {
        Some(prefix) => [b"xmlns:".as_slice(), prefix.as_ref()].concat(),
        None => b"xmlns".to_vec(),
    };

    let mut found: Option<String> = None;
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| RouteExchangeError::XmlParse(e.into()))?;
        if attr.key.as_ref() == expected_key.as_slice() {
            found = Some(String::from_utf8_lossy(&attr.value).into_owned());
        }
    }

    match found {
        Some(ns) if ns == GPX_NAMESPACE => Ok(()),
        Some(ns) => Err(RouteExchangeError::WrongNamespace {
            expected: GPX_NAMESPACE,
            found: format!("'{ns}'"),
        }),
        None => Err(RouteExchangeError::WrongNamespace {
            expected: GPX_NAMESPACE,
            found: "none".to_string(),
        }),
    }
}

/// Parse lat/lon attributes from a point element's start tag.
fn parse_lat_lon(e: &BytesStart<'_>, element: &'static str) -> Result<(f64, f64)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| RouteExchangeError::XmlParse(e.into()))?;
        let key = attr.key.local_name();
        let val = std::str::from_utf8(&attr.value).unwrap_or_default();
        match key.as_ref() {
            b"lat" => lat = Some(parse_coordinate(element, "lat", val, 90.0)?),
            b"lon" => lon = Some(parse_coordinate(element, "lon", val, 180.0)?),
            _ => {}
        }
    }

    let lat = lat.ok_or(RouteExchangeError::MissingAttribute {
        element,
        attribute: "lat",
    })?;
    let lon = lon.ok_or(RouteExchangeError::MissingAttribute {
        element,
        attribute: "lon",
    })?;

    Ok((lat, lon))
}

fn parse_coordinate(
    element: &'static str,
    attribute: &'static str,
    value: &str,
    limit: f64,
) -> Result<f64> {
    let invalid = || RouteExchangeError::InvalidAttribute {
        element,
        attribute,
        value: value.to_string(),
    };
    let parsed = value.trim().parse::<f64>().map_err(|_| invalid())?;
    if !parsed.is_finite() || parsed.abs() > limit {
        return Err(invalid());
    }
    Ok(parsed)
}

/// A self-closing point element such as `<trkpt lat=".." lon=".."/>`.
fn parse_empty_point(
    e: &BytesStart<'_>,
    element: &'static str,
    warnings: &mut Vec<String>,
) -> Option<GpxPoint> {
    match parse_lat_lon(e, element) {
        Ok((lat, lon)) => Some(GpxPoint::new(lat, lon)),
        Err(err) => {
            warnings.push(format!("Skipped <{element}>: {err}"));
            None
        }
    }
}

/// Parse a point element (wpt, rtept, trkpt) and its children.
/// Called after receiving Event::Start for the point element.
fn parse_point<'a>(
    start: &BytesStart<'a>,
    element: &'static str,
    reader: &mut Reader<&'a [u8]>,
    warnings: &mut Vec<String>,
) -> Result<Option<GpxPoint>> {
    let (lat, lon) = match parse_lat_lon(start, element) {
        Ok(coords) => coords,
        Err(err) => {
            warnings.push(format!("Skipped <{element}>: {err}"));
            reader.read_to_end(start.name())?;
            return Ok(None);
        }
    };

    let mut point = GpxPoint::new(lat, lon);
    let end_name = start.name().0.to_vec();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => point.name = Some(read_text_owned(reader, &e)?),
                b"desc" => point.desc = Some(read_text_owned(reader, &e)?),
                b"sym" => point.sym = Some(read_text_owned(reader, &e)?),
                b"type" => point.point_type = Some(read_text_owned(reader, &e)?),
                b"extensions" => point.ext_id = parse_point_extensions(reader)?,
                _ => {
                    // Skip unknown elements
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(RouteExchangeError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(Some(point))
}

/// Pull the identifier out of a point's `<extensions>`; anything else is skipped.
fn parse_point_extensions<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Option<String>> {
    let mut id: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"id" => id = Some(read_text_owned(reader, &e)?),
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"extensions" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(RouteExchangeError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(id)
}

/// Parse a <metadata> element.
fn parse_metadata<'a>(reader: &mut Reader<&'a [u8]>) -> Result<GpxMetadata> {
    let mut metadata = GpxMetadata::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => metadata.name = Some(read_text_owned(reader, &e)?),
                b"desc" => metadata.desc = Some(read_text_owned(reader, &e)?),
                b"time" => metadata.time = Some(read_text_owned(reader, &e)?),
                b"author" => metadata.author = parse_author(reader)?,
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"metadata" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(RouteExchangeError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(metadata)
}

/// Parse an <author> person element, keeping only its name.
fn parse_author<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Option<String>> {
    let mut name: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => name = Some(read_text_owned(reader, &e)?),
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"author" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(RouteExchangeError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(name)
}

/// Parse a <rte> element.
fn parse_route<'a>(reader: &mut Reader<&'a [u8]>, warnings: &mut Vec<String>) -> Result<GpxRoute> {
    let mut route = GpxRoute::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"rtept" => {
                    if let Some(pt) = parse_point(&e, "rtept", reader, warnings)? {
                        route.points.push(pt);
                    }
                }
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"rtept" {
                    if let Some(pt) = parse_empty_point(&e, "rtept", warnings) {
                        route.points.push(pt);
                    }
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"rte" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(RouteExchangeError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(route)
}

/// Parse a <trk> element.
fn parse_track<'a>(reader: &mut Reader<&'a [u8]>, warnings: &mut Vec<String>) -> Result<GpxTrack> {
    let mut track = GpxTrack::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"trkseg" => {
                    let seg = parse_segment(reader, warnings)?;
                    if !seg.points.is_empty() {
                        track.segments.push(seg);
                    }
                }
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trk" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(RouteExchangeError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(track)
}

/// Parse a <trkseg> element.
fn parse_segment<'a>(
    reader: &mut Reader<&'a [u8]>,
    warnings: &mut Vec<String>,
) -> Result<GpxSegment> {
    let mut segment = GpxSegment::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"trkpt" => {
                    if let Some(pt) = parse_point(&e, "trkpt", reader, warnings)? {
                        segment.points.push(pt);
                    }
                }
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"trkpt" {
                    if let Some(pt) = parse_empty_point(&e, "trkpt", warnings) {
                        segment.points.push(pt);
                    }
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trkseg" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(RouteExchangeError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(segment)
}

/// Read text content of an element as an owned String.
/// Handles regular text, CDATA sections, and entity references (Event::GeneralRef).
fn read_text_owned<'a>(reader: &mut Reader<&'a [u8]>, start: &BytesStart<'_>) -> Result<String> {
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => {
                let raw = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                text.push_str(raw);
            }
            Ok(Event::CData(e)) => {
                let s = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                text.push_str(s);
            }
            Ok(Event::GeneralRef(e)) => {
                if let Ok(Some(ch)) = e.resolve_char_ref() {
                    text.push(ch);
                } else {
                    let name = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                    match name {
                        "amp" => text.push('&'),
                        "lt" => text.push('<'),
                        "gt" => text.push('>'),
                        "quot" => text.push('"'),
                        "apos" => text.push('\''),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(RouteExchangeError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(text)
}
