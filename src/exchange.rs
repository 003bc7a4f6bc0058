//! Export/import entry points.
//!
//! Nothing here returns an error to the caller: every failure ends up in the
//! `errors` list of the returned result, with `success` set to false.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::codec::{self, codec_for};
use crate::error::RouteExchangeError;
use crate::model::{Campsite, RoutePoint, TripMetadata, TripModel, Waypoint};
use crate::options::{DeviceProfile, ExportFormat, ExportOptions, ImportFormat};
use crate::validator::{check_well_formed, validate_gpx};

/// Outcome of an export call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub success: bool,
    /// The document; empty when `success` is false.
    pub content: String,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ExportResult {
    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            errors: vec![error.to_string()],
            ..Default::default()
        }
    }
}

/// Outcome of an import call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ExportFormat>,
    pub waypoints: Vec<Waypoint>,
    pub campsites: Vec<Campsite>,
    pub route_points: Vec<RoutePoint>,
    /// Document-level name, author, description and timestamp, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TripMetadata>,
    /// Items that were skipped while reading.
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ImportResult {
    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            errors: vec![error.to_string()],
            ..Default::default()
        }
    }
}

/// Encode `trip` in the format and device profile selected by `options`.
pub fn export_trip(trip: &TripModel, options: &ExportOptions) -> ExportResult {
    log::debug!(
        "exporting {} waypoints, {} campsites, {} route points as {} for {}",
        trip.waypoints.len(),
        trip.campsites.len(),
        trip.route.len(),
        options.format,
        options.device_profile
    );

    let mut warnings = trip.check();

    let encoded = match codec_for(options.format).encode(trip, options) {
        Ok(encoded) => encoded,
        Err(err) => {
            log::warn!("{} export failed: {err}", options.format);
            return ExportResult::failure(err);
        }
    };
    warnings.extend(encoded.warnings);

    if matches!(options.format, ExportFormat::Gpx | ExportFormat::Kml) {
        if let Err(err) = check_well_formed(&encoded.content) {
            log::warn!("{} export produced a malformed document: {err}", options.format);
            return ExportResult::failure(err);
        }
    }
    if options.format == ExportFormat::Gpx {
        warnings.extend(validate_gpx(&encoded.content, options.device_profile).into_warnings());
    }

    ExportResult {
        success: true,
        content: encoded.content,
        warnings,
        errors: Vec::new(),
        file_name: Some(file_name(trip, options)),
        mime_type: Some(options.format.mime_type().to_string()),
    }
}

/// Decode `content`, detecting its format when `format` is `Auto`.
pub fn import_route(content: &str, format: ImportFormat) -> ImportResult {
    let format = match format.resolve(content) {
        Ok(format) => format,
        Err(err) => {
            log::warn!("import failed: {err}");
            return ImportResult::failure(err);
        }
    };

    match codec_for(format).decode(content) {
        Ok(decoded) => {
            log::debug!(
                "imported {} waypoints, {} campsites, {} route points from {format} ({} skipped)",
                decoded.waypoints.len(),
                decoded.campsites.len(),
                decoded.route.len(),
                decoded.warnings.len()
            );
            ImportResult {
                success: true,
                format: Some(format),
                waypoints: decoded.waypoints,
                campsites: decoded.campsites,
                route_points: decoded.route,
                metadata: decoded.metadata,
                warnings: decoded.warnings,
                errors: Vec::new(),
            }
        }
        Err(err) => {
            log::warn!("{format} import failed: {err}");
            ImportResult {
                format: Some(format),
                ..ImportResult::failure(err)
            }
        }
    }
}

/// Export from JSON-encoded trip and options, as received from a UI layer.
pub fn export_json(trip_json: &str, options_json: &str) -> ExportResult {
    let options = match parse_export_options(options_json) {
        Ok(options) => options,
        Err(err) => return ExportResult::failure(err),
    };
    let trip: TripModel = match serde_json::from_str(trip_json) {
        Ok(trip) => trip,
        Err(err) => return ExportResult::failure(format!("Invalid trip: {err}")),
    };
    export_trip(&trip, &options)
}

/// Parse export options from JSON, reporting an unknown format or device
/// profile by name before any other problem.
pub fn parse_export_options(json: &str) -> Result<ExportOptions, RouteExchangeError> {
    let value: JsonValue = serde_json::from_str(json)?;
    if let Some(format) = value.get("format").and_then(JsonValue::as_str) {
        format.parse::<ExportFormat>()?;
    }
    if let Some(profile) = value.get("deviceProfile").and_then(JsonValue::as_str) {
        profile.parse::<DeviceProfile>()?;
    }
    Ok(serde_json::from_value(value)?)
}

/// Download name: the document name reduced to `[a-z0-9-]` plus the extension.
fn file_name(trip: &TripModel, options: &ExportOptions) -> String {
    let name = codec::document_name(trip, options);
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "camper-trip" } else { slug };
    format!("{slug}.{}", options.format.extension())
}
