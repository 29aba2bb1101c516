use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{Detection, MatchSource};
use crate::moment::CaptureMoment;

/// Characters a free-text label may not contain: path-illegal characters,
/// the extension dot, and the space/underscore separators.
const LABEL: &str = r#"[^/\\?%*:|"<>. _]+"#;

const YMD: &str = r"(?P<year>[0-9]{4})(?P<month>[0-9]{2})(?P<day>[0-9]{2})";
const HMS: &str = r"(?P<hour>[0-9]{2})(?P<minute>[0-9]{2})(?P<second>[0-9]{2})";
const Y_M_D: &str = r"(?P<year>[0-9]{4})-(?P<month>[0-9]{2})-(?P<day>[0-9]{2})";

/// Recognised file name layouts, most specific first. The order decides the
/// result for names that more than one entry accepts.
const TABLE: &[(&str, &str)] = &[
    (
        "yyyymmdd_hhmmss[_n][-Label]",
        r"^{YMD}_{HMS}(?:_(?P<dedup>[0-9]+))?(?:-(?P<label>{LABEL}))?$",
    ),
    (
        "yyyymmdd_hhmmss[-Label][_n]",
        r"^{YMD}_{HMS}(?:-(?P<label>{LABEL}))?(?:_(?P<dedup>[0-9]+))?$",
    ),
    ("yyyymmdd-hhmmss[-label]", r"^{YMD}-{HMS}(?:-(?P<label>{LABEL}))?$"),
    (
        "IMG|VID_yyyymmdd_hhmmss[-n]",
        r"^(?:IMG|VID)_{YMD}_{HMS}(?:-(?P<dedup>[0-9]+))?$",
    ),
    ("IMG-yyyymmdd-WAnnnn", r"^IMG-{YMD}-WA[0-9]{4}$"),
    (
        "Photo dd-mm-yyyy hh mm ss",
        r"^Photo (?P<day>[0-9]{2})-(?P<month>[0-9]{2})-(?P<year>[0-9]{4}) (?P<hour>[0-9]{2}) (?P<minute>[0-9]{2}) (?P<second>[0-9]{2})$",
    ),
    (
        "Desktop dd.mm.yyyy - hh.mm.ss.x",
        r"^Desktop (?P<day>[0-9]{2})\.(?P<month>[0-9]{2})\.(?P<year>[0-9]{4}) - (?P<hour>[0-9]{2})\.(?P<minute>[0-9]{2})\.(?P<second>[0-9]{2})\.[0-9]*$",
    ),
    ("download_yyyymmdd_hhmmss", r"^download_{YMD}_{HMS}$"),
    ("image_yyyymmdd_hhmmss", r"^image_{YMD}_{HMS}$"),
    ("Screenshot_yyyymmdd-hhmmss", r"^Screenshot_{YMD}-{HMS}$"),
    ("yyyy-mm-dd[ (n)]", r"^{Y_M_D}(?: \([0-9]+\))?$"),
    (
        "yyyy-mm-dd hh mm",
        r"^{Y_M_D} (?P<hour>[0-9]{2}) (?P<minute>[0-9]{2})$",
    ),
    (
        "Screenshot yyyy-mm-dd hh.mm.ss",
        r"^Screenshot {Y_M_D} (?P<hour>[0-9]{2})\.(?P<minute>[0-9]{2})\.(?P<second>[0-9]{2})$",
    ),
    (
        "Screenshot_yyyy-mm-dd-hh-mm-ss",
        r"^Screenshot_{Y_M_D}-(?P<hour>[0-9]{2})-(?P<minute>[0-9]{2})-(?P<second>[0-9]{2})$",
    ),
    ("yyyy-mm-dd_xxxxx", r"^{Y_M_D}_[0-9]{5}$"),
    (
        "yyyy-mm-dd hh mm ss[_n][ Label]",
        r"^{Y_M_D} (?P<hour>[0-9]{2}) (?P<minute>[0-9]{2}) (?P<second>[0-9]{2})(?:_(?P<dedup>[0-9]+))?(?: (?P<label>{LABEL}))?$",
    ),
    (
        "yyyy-mm-dd-hh-mm-ss[_n][ Label]",
        r"^{Y_M_D}-(?P<hour>[0-9]{2})-(?P<minute>[0-9]{2})-(?P<second>[0-9]{2})(?:_(?P<dedup>[0-9]+))?(?: (?P<label>{LABEL}))?$",
    ),
    (
        "WhatsApp Image|Video yyyy-mm-dd at hh.mm.ss",
        r"^WhatsApp (?:Image|Video) {Y_M_D} at (?P<hour>[0-9]{2})\.(?P<minute>[0-9]{2})\.(?P<second>[0-9]{2})$",
    ),
    ("FIH_yyyyMMdd_HHmmss", r"^FIH_{YMD}_{HMS}$"),
    (
        "PXL_yyyymmdd_hhmmss[xxx][.LABEL]",
        r"^PXL_{YMD}_{HMS}[0-9]{3}(?:\.(?P<label>[A-Z]+))?$",
    ),
];

struct FilenamePattern {
    name: &'static str,
    regex: Regex,
}

static PATTERNS: LazyLock<Vec<FilenamePattern>> = LazyLock::new(|| {
    TABLE
        .iter()
        .map(|&(name, source)| {
            let source = source
                .replace("{YMD}", YMD)
                .replace("{HMS}", HMS)
                .replace("{Y_M_D}", Y_M_D)
                .replace("{LABEL}", LABEL);
            FilenamePattern {
                name,
                regex: Regex::new(&source).unwrap(),
            }
        })
        .collect()
});

/// Match a file stem (no extension) against the pattern table. The first
/// entry that accepts the stem and yields a valid date and time decides the
/// result.
pub fn match_filename(stem: &str) -> Option<Detection> {
    for pattern in PATTERNS.iter() {
        let Some(caps) = pattern.regex.captures(stem) else {
            continue;
        };
        let Some((capture, deduplication_id, label)) = extract(&caps) else {
            continue;
        };
        log::debug!("  Match: {}", pattern.name);
        return Some(Detection {
            capture,
            deduplication_id,
            label,
            source: MatchSource::Filename(pattern.name),
        });
    }
    None
}

type Extracted = (CaptureMoment, Option<u64>, Option<String>);

fn extract(caps: &Captures) -> Option<Extracted> {
    let field = |name: &str| -> Option<u32> {
        match caps.name(name) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    let year = caps.name("year")?.as_str().parse().ok()?;
    let capture = CaptureMoment::from_fields(
        year,
        field("month")?,
        field("day")?,
        field("hour")?,
        field("minute")?,
        field("second")?,
    );
    let Some(capture) = capture else {
        log::debug!("  Rejected: {} is not a valid date and time", &caps[0]);
        return None;
    };
    let deduplication_id = match caps.name("dedup") {
        Some(m) => Some(m.as_str().parse().ok()?),
        None => None,
    };
    let label = caps.name("label").map(|m| m.as_str().to_string());
    Some((capture, deduplication_id, label))
}
