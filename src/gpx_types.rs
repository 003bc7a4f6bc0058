/// Namespace every GPX 1.1 document is bound to.
pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";
pub const GPX_SCHEMA_LOCATION: &str =
    "http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd";

/// Extension namespaces, declared on the root only when their data is written.
pub const CAMPER_NAMESPACE: &str = "https://camper-planner.eu/xmlschemas/Waypoint/v1";
pub const VEHICLE_NAMESPACE: &str = "https://camper-planner.eu/xmlschemas/VehicleProfile/v1";
pub const COST_NAMESPACE: &str = "https://camper-planner.eu/xmlschemas/CostBreakdown/v1";
pub const PLANNING_NAMESPACE: &str = "https://camper-planner.eu/xmlschemas/TripPlanning/v1";

/// Parsed GPX document: the strict intermediate tree read before anything is
/// projected onto the trip model.
#[derive(Debug, Default)]
pub struct GpxData {
    pub metadata: Option<GpxMetadata>,
    pub waypoints: Vec<GpxPoint>,
    pub routes: Vec<GpxRoute>,
    pub tracks: Vec<GpxTrack>,
    /// Per-point problems found while parsing; the offending points are skipped.
    pub warnings: Vec<String>,
}

/// The GPX `<metadata>` block.
#[derive(Debug, Default, Clone)]
pub struct GpxMetadata {
    pub name: Option<String>,
    pub desc: Option<String>,
    pub author: Option<String>,
    pub time: Option<String>,
}

/// A single GPX point (used for wpt, rtept, trkpt).
#[derive(Debug, Clone)]
pub struct GpxPoint {
    pub lat: f64,
    pub lon: f64,
    pub name: Option<String>,
    pub desc: Option<String>,
    pub sym: Option<String>,
    pub point_type: Option<String>,
    /// Identifier carried in the point's `<extensions>`.
    pub ext_id: Option<String>,
}

impl GpxPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            name: None,
            desc: None,
            sym: None,
            point_type: None,
            ext_id: None,
        }
    }
}

/// A GPX route (<rte>).
#[derive(Debug, Default)]
pub struct GpxRoute {
    pub points: Vec<GpxPoint>,
}

/// A GPX track (<trk>).
#[derive(Debug, Default)]
pub struct GpxTrack {
    pub segments: Vec<GpxSegment>,
}

impl GpxTrack {
    pub fn points(&self) -> impl Iterator<Item = &GpxPoint> {
        self.segments.iter().flat_map(|seg| seg.points.iter())
    }
}

/// A GPX track segment (<trkseg>).
#[derive(Debug, Default)]
pub struct GpxSegment {
    pub points: Vec<GpxPoint>,
}
