use thiserror::Error;

use crate::options::ExportFormat;

#[derive(Debug, Error)]
pub enum RouteExchangeError {
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },

    #[error("Unexpected root element <{found}>, expected <{expected}>")]
    UnexpectedRoot {
        expected: &'static str,
        found: String,
    },

    #[error("Root element <gpx> must declare namespace '{expected}' (found: {found})")]
    WrongNamespace {
        expected: &'static str,
        found: String,
    },

    #[error("Document is not well-formed: {0}")]
    Unbalanced(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Expected a GeoJSON FeatureCollection, found {0}")]
    NotFeatureCollection(&'static str),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV has no section with latitude/longitude columns")]
    CsvHeader,

    #[error("Unsupported export format '{0}' (expected gpx, kml, geojson or csv)")]
    UnsupportedFormat(String),

    #[error("Unsupported device profile '{0}' (expected universal, garmin, tomtom or smartphone)")]
    UnsupportedDeviceProfile(String),

    #[error("Format {0} is not supported for import")]
    UnsupportedImport(ExportFormat),

    #[error("Unable to detect the format of the imported content")]
    UndetectedFormat,

    #[error("Failed to write document: {0}")]
    Write(#[from] std::fmt::Error),
}
