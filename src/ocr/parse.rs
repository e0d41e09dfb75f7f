//! Zone/position extraction from noisy OCR text.
//!
//! The HUD prints `Zone: <name> Pos: <x> <unit> <y> <unit> <z> <unit>`. OCR
//! drops letters, swaps `:` for `;`, inserts stray punctuation and may render
//! decimals with a comma, so the pattern is tolerant of all of that.

use regex::Regex;
use std::sync::OnceLock;

/// Case-insensitive, tolerant zone/position pattern. Axis separators are lazy
/// so a leading minus sign stays attached to its number. Units are ASCII only;
/// Unicode case folding would let the Kelvin sign pass for `k`.
const POSITION_PATTERN: &str = r"(?i)Zo?ne?\s*[:;]\s*(?P<zone>.+?)\s+Po?s\s*[:;]\s*(?P<x>-?\d+(?:[.,]\d+)?)\s*(?P<ux>(?-i:[kK]?[mM]))\W+?(?P<y>-?\d+(?:[.,]\d+)?)\s*(?P<uy>(?-i:[kK]?[mM]))\W+?(?P<z>-?\d+(?:[.,]\d+)?)\s*(?P<uz>(?-i:[kK]?[mM]))\b";

/// Values at or above this magnitude (meters) are displayed in kilometers.
const KM_DISPLAY_THRESHOLD: f64 = 10_000.0;

fn position_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(POSITION_PATTERN).ok()).as_ref()
}

/// One zone/position reading. Axes are in meters and always finite.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedRecord {
    pub zone: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// The matched substring of the (minus-normalized) input
    pub raw: String,
}

/// Extracts every zone/position record in document order.
///
/// Never fails: empty, whitespace-only or unrecognizable input yields an
/// empty vector. Records with a non-finite axis are dropped.
pub fn parse_all(text: &str) -> Vec<ParsedRecord> {
    let Some(re) = position_regex() else {
        return Vec::new();
    };
    if text.trim().is_empty() {
        return Vec::new();
    }
    let normalized = text.replace('\u{2212}', "-");

    re.captures_iter(&normalized)
        .filter_map(|caps| {
            let x = to_meters(&caps["x"], &caps["ux"])?;
            let y = to_meters(&caps["y"], &caps["uy"])?;
            let z = to_meters(&caps["z"], &caps["uz"])?;
            Some(ParsedRecord {
                zone: caps["zone"].trim().to_string(),
                x,
                y,
                z,
                raw: caps[0].to_string(),
            })
        })
        .collect()
}

/// Parses a number with `.` or `,` decimals and converts it to meters.
fn to_meters(number: &str, unit: &str) -> Option<f64> {
    let value: f64 = number.replace(',', ".").parse().ok()?;
    let meters = if unit.eq_ignore_ascii_case("km") {
        value * 1000.0
    } else {
        value
    };
    meters.is_finite().then_some(meters)
}

/// Renders a record as `Zone: <zone>  Pos: <x> <ux> <y> <uy> <z> <uz>`.
pub fn format_for_display(record: &ParsedRecord) -> String {
    let (x, ux) = format_axis(record.x);
    let (y, uy) = format_axis(record.y);
    let (z, uz) = format_axis(record.z);
    format!(
        "Zone: {}  Pos: {} {} {} {} {} {}",
        record.zone, x, ux, y, uy, z, uz
    )
}

/// Picks the display unit for one axis and formats its value.
pub fn format_axis(meters: f64) -> (String, &'static str) {
    if meters.abs() >= KM_DISPLAY_THRESHOLD {
        (format_decimal(meters / 1000.0), "km")
    } else {
        (format_decimal(meters), "m")
    }
}

/// At most three decimals, trailing zeros trimmed, negative zero as `0`.
fn format_decimal(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let s = format!("{:.3}", rounded);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
