//! Post-encode checks on generated documents.
//!
//! [`validate_gpx`] is advisory: it returns findings and never fails an export.
//! [`check_well_formed`] is the one hard check, run on every XML document.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::device::DevicePolicy;
use crate::error::RouteExchangeError;
use crate::gpx_types::GPX_NAMESPACE;
use crate::options::DeviceProfile;

/// Findings from [`validate_gpx`], split by kind.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationReport {
    /// Declaration, root element and namespace problems.
    pub structural: Vec<String>,
    /// Suggestions specific to the target device profile.
    pub device: Vec<String>,
}

impl ValidationReport {
    pub fn is_structurally_valid(&self) -> bool {
        self.structural.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.structural.is_empty() && self.device.is_empty()
    }

    pub fn into_warnings(self) -> Vec<String> {
        let mut warnings = self.structural;
        warnings.extend(self.device);
        warnings
    }
}

/// Inspect a generated GPX document for required markers and device constraints.
pub fn validate_gpx(content: &str, profile: DeviceProfile) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !content.trim_start().starts_with("<?xml") {
        report.structural.push("Missing XML declaration".to_string());
    }

    let opens = open_tag_positions(content, "gpx");
    let close = content.find("</gpx>");
    let balanced = opens.len() == 1
        && content.matches("</gpx>").count() == 1
        && close.is_some_and(|c| c > opens[0]);
    if !balanced {
        report
            .structural
            .push("GPX root element is missing or unbalanced".to_string());
    }

    if !content.contains(&format!("xmlns=\"{GPX_NAMESPACE}\"")) {
        report
            .structural
            .push(format!("Missing GPX 1.1 namespace declaration ({GPX_NAMESPACE})"));
    }

    let policy = DevicePolicy::for_profile(profile);
    match profile {
        DeviceProfile::Garmin => {
            let waypoints = waypoint_blocks(content);
            let missing = waypoints.iter().filter(|wpt| !wpt.contains("<sym>")).count();
            if missing > 0 && policy.requires_symbols() {
                report.device.push(format!(
                    "{missing} of {} waypoints lack a <sym> tag; Garmin devices render waypoints by symbol",
                    waypoints.len()
                ));
            }
        }
        DeviceProfile::TomTom => {
            if let Some(ceiling) = policy.size_ceiling() {
                if content.len() > ceiling {
                    report.device.push(format!(
                        "Document size of {} bytes exceeds the TomTom practical ceiling of {ceiling} bytes",
                        content.len()
                    ));
                }
            }
        }
        DeviceProfile::Smartphone => {
            if policy.forces_metadata() && !content.contains("<metadata>") {
                report
                    .device
                    .push("Smartphone apps expect a <metadata> block for previews".to_string());
            }
        }
        DeviceProfile::Universal => {
            let has_waypoints = !open_tag_positions(content, "wpt").is_empty();
            let has_track = !open_tag_positions(content, "trk").is_empty();
            if !has_waypoints && !has_track {
                report
                    .device
                    .push("Document contains neither waypoints nor a track".to_string());
            }
        }
    }

    report
}

/// Byte offsets of `<name` opening tags (not `<name2` or `<name:x`).
fn open_tag_positions(content: &str, name: &str) -> Vec<usize> {
    let needle = format!("<{name}");
    content
        .match_indices(&needle)
        .filter(|(pos, _)| {
            content[pos + needle.len()..]
                .chars()
                .next()
                .is_some_and(|c| c == '>' || c == '/' || c.is_whitespace())
        })
        .map(|(pos, _)| pos)
        .collect()
}

/// The text of each `<wpt>` element, up to its closing tag.
fn waypoint_blocks(content: &str) -> Vec<&str> {
    open_tag_positions(content, "wpt")
        .into_iter()
        .map(|start| {
            let rest = &content[start..];
            let tag_end = rest.find('>').map_or(rest.len(), |i| i + 1);
            if rest[..tag_end].ends_with("/>") {
                return &rest[..tag_end];
            }
            let end = rest.find("</wpt>").map_or(rest.len(), |i| i + "</wpt>".len());
            &rest[..end]
        })
        .collect()
}

/// Read the whole document with quick-xml, failing on mismatched or unclosed
/// tags and on anything other than exactly one root element.
pub fn check_well_formed(content: &str) -> Result<(), RouteExchangeError> {
    let mut reader = Reader::from_str(content);
    let mut depth: usize = 0;
    let mut roots = 0;

    loop {
        match reader.read_event()? {
            Event::Start(_) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Event::Empty(_) => {
                if depth == 0 {
                    roots += 1;
                }
            }
            Event::End(e) => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    RouteExchangeError::Unbalanced(format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    ))
                })?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(RouteExchangeError::Unbalanced(format!(
            "{depth} element(s) left open at end of document"
        )));
    }
    if roots != 1 {
        return Err(RouteExchangeError::Unbalanced(format!(
            "expected one root element, found {roots}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
        <gpx xmlns=\"http://www.topografix.com/GPX/1/1\" version=\"1.1\" creator=\"test\">\n</gpx>\n";

    #[test]
    fn test_minimal_document_is_structurally_valid() {
        let report = validate_gpx(MINIMAL, DeviceProfile::Universal);
        assert!(report.is_structurally_valid());
        // but empty for a universal consumer
        assert_eq!(report.device.len(), 1);
        assert!(!report.is_clean());
        assert!(check_well_formed(MINIMAL).is_ok());
    }

    #[test]
    fn test_missing_markers() {
        let report = validate_gpx("<gpx version=\"1.1\">", DeviceProfile::Universal);
        assert_eq!(
            report.structural,
            vec![
                "Missing XML declaration".to_string(),
                "GPX root element is missing or unbalanced".to_string(),
                "Missing GPX 1.1 namespace declaration (http://www.topografix.com/GPX/1/1)".to_string(),
            ]
        );
    }

    #[test]
    fn test_open_tag_positions_ignore_prefixes() {
        let doc = "<gpx><gpxx:WaypointExtension/><wpt lat=\"1\" lon=\"1\"/><wptx/></gpx>";
        assert_eq!(open_tag_positions(doc, "gpx"), vec![0]);
        assert_eq!(open_tag_positions(doc, "wpt").len(), 1);
    }

    #[test]
    fn test_garmin_symbols_checked() {
        let doc = "<?xml version=\"1.0\"?>\n<gpx xmlns=\"http://www.topografix.com/GPX/1/1\">\n\
            <wpt lat=\"1\" lon=\"1\"><name>a</name><sym>Flag, Blue</sym></wpt>\n\
            <wpt lat=\"2\" lon=\"2\"><name>b</name></wpt>\n\
            <wpt lat=\"3\" lon=\"3\"/>\n</gpx>";
        let report = validate_gpx(doc, DeviceProfile::Garmin);
        assert!(report.is_structurally_valid());
        assert_eq!(report.device.len(), 1);
        assert!(report.device[0].starts_with("2 of 3 waypoints"));
    }

    #[test]
    fn test_tomtom_size_checked() {
        let mut doc = String::from(MINIMAL);
        doc.push_str(&" ".repeat(crate::device::TOMTOM_SIZE_CEILING));
        let report = validate_gpx(&doc, DeviceProfile::TomTom);
        assert_eq!(report.device.len(), 1);
        assert!(report.device[0].contains("size"));
    }

    #[test]
    fn test_smartphone_metadata_checked() {
        let report = validate_gpx(MINIMAL, DeviceProfile::Smartphone);
        assert_eq!(report.device.len(), 1);
        assert!(report.device[0].contains("<metadata>"));
    }

    #[test]
    fn test_well_formedness() {
        assert!(check_well_formed("<a><b></b></a>").is_ok());
        assert!(check_well_formed("<a><b></a>").is_err());
        assert!(check_well_formed("<a><b>").is_err());
        assert!(check_well_formed("<a/><b/>").is_err());
        assert!(check_well_formed("").is_err());
    }
}
