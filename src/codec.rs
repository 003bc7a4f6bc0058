//! Format codecs and the lookup from [`ExportFormat`] to its implementation.

use crate::csv_codec::CsvCodec;
use crate::error::RouteExchangeError;
use crate::geojson_codec::GeoJsonCodec;
use crate::gpx_codec::GpxCodec;
use crate::kml_codec::KmlCodec;
use crate::model::{Campsite, RoutePoint, TripMetadata, TripModel, Waypoint};
use crate::options::{ExportFormat, ExportOptions};

pub type Result<T> = std::result::Result<T, RouteExchangeError>;

/// A document produced by a codec, plus anything worth telling the caller.
#[derive(Debug, Default)]
pub struct Encoded {
    pub content: String,
    pub warnings: Vec<String>,
}

/// What a codec recovered from a document.
#[derive(Debug, Default)]
pub struct Decoded {
    pub waypoints: Vec<Waypoint>,
    pub campsites: Vec<Campsite>,
    pub route: Vec<RoutePoint>,
    pub metadata: Option<TripMetadata>,
    /// Items that were skipped, one line each.
    pub warnings: Vec<String>,
}

/// Encoder/decoder pair for one document format.
pub trait Codec: Sync {
    fn format(&self) -> ExportFormat;

    fn encode(&self, trip: &TripModel, opts: &ExportOptions) -> Result<Encoded>;

    /// Formats without import support keep this default.
    fn decode(&self, _content: &str) -> Result<Decoded> {
        Err(RouteExchangeError::UnsupportedImport(self.format()))
    }
}

/// The codec responsible for `format`.
pub fn codec_for(format: ExportFormat) -> &'static dyn Codec {
    match format {
        ExportFormat::Gpx => &GpxCodec,
        ExportFormat::Kml => &KmlCodec,
        ExportFormat::GeoJson => &GeoJsonCodec,
        ExportFormat::Csv => &CsvCodec,
    }
}

/// Name written into the document: the caller's custom name, then the trip
/// title, then a dated default.
pub fn document_name(trip: &TripModel, opts: &ExportOptions) -> String {
    if let Some(name) = opts.custom_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    let metadata = trip.metadata.as_ref();
    if let Some(title) = metadata
        .and_then(|m| m.title.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return title.to_string();
    }
    match metadata.and_then(|m| m.created) {
        Some(created) => format!("Camper Trip {}", created.format("%Y-%m-%d")),
        None => "Camper Trip".to_string(),
    }
}

pub fn document_description(trip: &TripModel, opts: &ExportOptions) -> Option<String> {
    opts.description
        .clone()
        .or_else(|| trip.metadata.as_ref().and_then(|m| m.description.clone()))
}

pub fn document_author(trip: &TripModel, opts: &ExportOptions) -> Option<String> {
    opts.author
        .clone()
        .or_else(|| trip.metadata.as_ref().and_then(|m| m.author.clone()))
}

/// Creation timestamp as ISO-8601 UTC with second precision.
pub fn document_timestamp(trip: &TripModel) -> String {
    trip.metadata
        .as_ref()
        .and_then(|m| m.created)
        .unwrap_or_else(chrono::Utc::now)
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Fixed six-decimal rendering used for every coordinate in text formats.
pub fn coord(value: f64) -> String {
    format!("{value:.6}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TripMetadata;
    use chrono::{TimeZone, Utc};

    fn dated_trip() -> TripModel {
        TripModel {
            metadata: Some(TripMetadata {
                created: Some(Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_every_format_has_a_codec() {
        for format in ExportFormat::ALL {
            assert_eq!(codec_for(format).format(), format);
        }
    }

    #[test]
    fn test_kml_decode_is_unsupported() {
        let err = codec_for(ExportFormat::Kml).decode("<kml/>").unwrap_err();
        assert_eq!(err.to_string(), "Format kml is not supported for import");
    }

    #[test]
    fn test_name_fallbacks() {
        let mut trip = dated_trip();
        let mut opts = ExportOptions::default();
        assert_eq!(document_name(&trip, &opts), "Camper Trip 2025-06-01");

        trip.metadata.as_mut().unwrap().title = Some("Norway".into());
        assert_eq!(document_name(&trip, &opts), "Norway");

        opts.custom_name = Some("  ".into());
        assert_eq!(document_name(&trip, &opts), "Norway");

        opts.custom_name = Some("Fjords".into());
        assert_eq!(document_name(&trip, &opts), "Fjords");
    }

    #[test]
    fn test_timestamp_is_utc_seconds() {
        assert_eq!(document_timestamp(&dated_trip()), "2025-06-01T09:30:00Z");
    }

    #[test]
    fn test_coord_six_decimals() {
        assert_eq!(coord(52.52), "52.520000");
        assert_eq!(coord(-0.1234567), "-0.123457");
    }
}
