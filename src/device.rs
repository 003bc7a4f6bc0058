//! Per-device compatibility rules consulted while writing GPX and again by the
//! structural validator.

use crate::model::WaypointRole;
use crate::options::DeviceProfile;

/// Practical upper bound for GPX files loaded onto TomTom units.
pub const TOMTOM_SIZE_CEILING: usize = 1024 * 1024;

/// Symbol used for campsites on every profile.
pub const CAMPSITE_SYMBOL: &str = "Campground";

#[derive(Debug, Clone, Copy)]
pub struct DevicePolicy {
    pub profile: DeviceProfile,
}

impl DevicePolicy {
    pub fn for_profile(profile: DeviceProfile) -> Self {
        Self { profile }
    }

    /// Symbol written into `<sym>` for a trip waypoint, if the device wants one.
    pub fn waypoint_symbol(&self, role: WaypointRole) -> Option<&'static str> {
        match self.profile {
            DeviceProfile::Garmin => Some(match role {
                WaypointRole::Start => "Flag, Green",
                WaypointRole::End => "Flag, Red",
                WaypointRole::Waypoint => "Flag, Blue",
            }),
            _ => None,
        }
    }

    /// Byte ceiling the document should stay under, if the device has one.
    pub fn size_ceiling(&self) -> Option<usize> {
        match self.profile {
            DeviceProfile::TomTom => Some(TOMTOM_SIZE_CEILING),
            _ => None,
        }
    }

    /// Whether a metadata block is emitted even when the caller did not ask for one.
    pub fn forces_metadata(&self) -> bool {
        self.profile == DeviceProfile::Smartphone
    }

    pub fn requires_symbols(&self) -> bool {
        self.profile == DeviceProfile::Garmin
    }
}

/// Stride that thins `point_count` points of roughly `bytes_per_point` each
/// into `budget` bytes. Returns 1 when everything already fits.
pub fn decimation_stride(point_count: usize, bytes_per_point: usize, budget: usize) -> usize {
    if point_count == 0 || bytes_per_point == 0 {
        return 1;
    }
    let fitting = (budget / bytes_per_point).max(2);
    if point_count <= fitting {
        1
    } else {
        point_count.div_ceil(fitting - 1)
    }
}

/// Keep every `stride`-th item, always retaining the first and last.
pub fn decimate<T: Copy>(items: &[T], stride: usize) -> Vec<T> {
    if stride <= 1 || items.len() <= 2 {
        return items.to_vec();
    }
    let mut kept: Vec<T> = items.iter().step_by(stride).copied().collect();
    if (items.len() - 1) % stride != 0 {
        if let Some(last) = items.last() {
            kept.push(*last);
        }
    }
    kept
}
