use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RouteExchangeError;

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ExportFormat {
    #[default]
    Gpx,
    Kml,
    GeoJson,
    Csv,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [Self::Gpx, Self::Kml, Self::GeoJson, Self::Csv];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gpx => "gpx",
            Self::Kml => "kml",
            Self::GeoJson => "geojson",
            Self::Csv => "csv",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Gpx => "application/gpx+xml",
            Self::Kml => "application/vnd.google-earth.kml+xml",
            Self::GeoJson => "application/geo+json",
            Self::Csv => "text/csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = RouteExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gpx" => Ok(Self::Gpx),
            "kml" => Ok(Self::Kml),
            "geojson" | "json" => Ok(Self::GeoJson),
            "csv" => Ok(Self::Csv),
            _ => Err(RouteExchangeError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for ExportFormat {
    type Error = RouteExchangeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Class of consuming GPS hardware or software the output is tailored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum DeviceProfile {
    #[default]
    Universal,
    Garmin,
    TomTom,
    Smartphone,
}

impl DeviceProfile {
    pub const ALL: [DeviceProfile; 4] = [
        Self::Universal,
        Self::Garmin,
        Self::TomTom,
        Self::Smartphone,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Universal => "universal",
            Self::Garmin => "garmin",
            Self::TomTom => "tomtom",
            Self::Smartphone => "smartphone",
        }
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceProfile {
    type Err = RouteExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "universal" => Ok(Self::Universal),
            "garmin" => Ok(Self::Garmin),
            "tomtom" => Ok(Self::TomTom),
            "smartphone" => Ok(Self::Smartphone),
            _ => Err(RouteExchangeError::UnsupportedDeviceProfile(s.to_string())),
        }
    }
}

impl TryFrom<String> for DeviceProfile {
    type Error = RouteExchangeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Options for a single export call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    /// Output format (default: gpx)
    #[serde(default)]
    pub format: ExportFormat,

    /// Emit trip waypoints (default: true)
    #[serde(default = "default_true")]
    pub include_waypoints: bool,

    /// Emit selected campsites as points (default: true)
    #[serde(default = "default_true")]
    pub include_campsites: bool,

    /// Emit the route geometry as a track/line (default: true)
    #[serde(default = "default_true")]
    pub include_route: bool,

    /// Emit vehicle dimensions (default: false)
    #[serde(default)]
    pub include_vehicle_info: bool,

    /// Emit the cost breakdown (default: false)
    #[serde(default)]
    pub include_cost_data: bool,

    /// Emit distance/duration planning figures (default: false)
    #[serde(default)]
    pub include_planning_data: bool,

    /// Emit document name, author, description and timestamp (default: true)
    #[serde(default = "default_true")]
    pub include_metadata: bool,

    /// Target device class (default: universal)
    #[serde(default)]
    pub device_profile: DeviceProfile,

    #[serde(default)]
    pub custom_name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub author: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Gpx,
            include_waypoints: true,
            include_campsites: true,
            include_route: true,
            include_vehicle_info: false,
            include_cost_data: false,
            include_planning_data: false,
            include_metadata: true,
            device_profile: DeviceProfile::Universal,
            custom_name: None,
            description: None,
            author: None,
        }
    }
}

impl ExportOptions {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    /// Options with every inclusion flag switched off.
    pub fn nothing(format: ExportFormat) -> Self {
        Self {
            format,
            include_waypoints: false,
            include_campsites: false,
            include_route: false,
            include_vehicle_info: false,
            include_cost_data: false,
            include_planning_data: false,
            include_metadata: false,
            ..Default::default()
        }
    }

    pub fn with_profile(mut self, profile: DeviceProfile) -> Self {
        self.device_profile = profile;
        self
    }
}

/// Format declared by the caller of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ImportFormat {
    /// Sniff the format from the content.
    #[default]
    Auto,
    Gpx,
    Kml,
    GeoJson,
    Csv,
}

impl ImportFormat {
    /// Resolve to a concrete format, detecting it from `content` when needed.
    pub fn resolve(self, content: &str) -> Result<ExportFormat, RouteExchangeError> {
        match self {
            Self::Gpx => Ok(ExportFormat::Gpx),
            Self::Kml => Ok(ExportFormat::Kml),
            Self::GeoJson => Ok(ExportFormat::GeoJson),
            Self::Csv => Ok(ExportFormat::Csv),
            Self::Auto => detect_format(content).ok_or(RouteExchangeError::UndetectedFormat),
        }
    }
}

impl From<ExportFormat> for ImportFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Gpx => Self::Gpx,
            ExportFormat::Kml => Self::Kml,
            ExportFormat::GeoJson => Self::GeoJson,
            ExportFormat::Csv => Self::Csv,
        }
    }
}

impl FromStr for ImportFormat {
    type Err = RouteExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            other => other.parse::<ExportFormat>().map(Self::from),
        }
    }
}

impl TryFrom<String> for ImportFormat {
    type Error = RouteExchangeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

fn detect_format(content: &str) -> Option<ExportFormat> {
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with('{') {
        return Some(ExportFormat::GeoJson);
    }
    if trimmed.starts_with('<') {
        if trimmed.contains("<gpx") {
            return Some(ExportFormat::Gpx);
        }
        if trimmed.contains("<kml") {
            return Some(ExportFormat::Kml);
        }
        return None;
    }
    let first_line = trimmed.lines().next()?;
    first_line.contains(',').then_some(ExportFormat::Csv)
}

fn default_true() -> bool {
    true
}
