//! Repair-then-parse for the radar's quasi-JSON frames.
//!
//! The head emits objects with bare keys (`{data:[{x:1.5,y:2}]}`) and, on
//! some firmware, a wall-clock suffix after the closing brace. Everything that
//! knows about those quirks lives here.

use log::debug;
use serde::Deserialize;
use serde_json::Value;

use crate::prelude::{CoreError, CoreResult, RadarPoint};

const LOG_EXCERPT_CHARS: usize = 160;

/// Detection fields as they appear on the wire. Types are not trusted: the
/// head has been seen sending string ids, float ids and `null` coordinates.
#[derive(Debug, Deserialize)]
struct RawDetection {
    #[serde(default)]
    x: Value,
    #[serde(default)]
    y: Value,
    #[serde(default)]
    a: Value,
    #[serde(default)]
    d: Value,
    #[serde(default)]
    id: Value,
    #[serde(default, rename = "type")]
    kind: Value,
}

/// Missing, null or non-numeric coordinates read as 0.
fn coordinate(value: &Value) -> f64 {
    value.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn measurement(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

fn passthrough(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        other => Some(other),
    }
}

impl From<RawDetection> for RadarPoint {
    fn from(raw: RawDetection) -> Self {
        RadarPoint {
            x_m: coordinate(&raw.x),
            y_m: coordinate(&raw.y),
            azimuth_deg: measurement(&raw.a),
            slant_range_m: measurement(&raw.d),
            id: passthrough(raw.id),
            kind: passthrough(raw.kind),
        }
    }
}

/// Rewrites a raw frame into valid JSON text.
///
/// Bare keys directly after `{` or `,` get quoted; anything inside string
/// literals is copied verbatim. Text after the last `}` is dropped.
pub fn repair_frame(raw: &str) -> String {
    let body = match raw.rfind('}') {
        Some(end) => &raw[..=end],
        None => raw,
    };

    let chars: Vec<char> = body.chars().collect();
    let mut out = String::with_capacity(body.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    let mut last_significant: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                last_significant = Some('"');
            }
            i += 1;
            continue;
        }

        if c == '"' {
            in_string = true;
            out.push(c);
            i += 1;
            continue;
        }

        let expects_key = matches!(last_significant, Some('{') | Some(','));
        if expects_key && is_key_char(c) {
            let start = i;
            while i < chars.len() && is_key_char(chars[i]) {
                i += 1;
            }
            let mut lookahead = i;
            while lookahead < chars.len() && chars[lookahead].is_whitespace() {
                lookahead += 1;
            }
            let word: String = chars[start..i].iter().collect();
            if lookahead < chars.len() && chars[lookahead] == ':' {
                out.push('"');
                out.push_str(&word);
                out.push('"');
            } else {
                out.push_str(&word);
            }
            last_significant = chars.get(i - 1).copied();
            continue;
        }

        if !c.is_whitespace() {
            last_significant = Some(c);
        }
        out.push(c);
        i += 1;
    }
    out
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Repairs and parses one frame into radar-frame detections.
///
/// A frame without a `data` array is a valid, empty frame. Entries that are
/// not objects are skipped; object fields are read leniently.
pub fn parse_frame(raw: &str) -> CoreResult<Vec<RadarPoint>> {
    let repaired = repair_frame(raw);
    let value: Value = serde_json::from_str(&repaired).map_err(|err| {
        CoreError::MalformedFrame(format!("{} in {:?}", err, excerpt(raw)))
    })?;

    let object = value.as_object().ok_or_else(|| {
        CoreError::MalformedFrame(format!("top level is not an object: {:?}", excerpt(raw)))
    })?;

    let Some(Value::Array(entries)) = object.get("data") else {
        return Ok(Vec::new());
    };

    let mut points = Vec::with_capacity(entries.len());
    for entry in entries {
        match RawDetection::deserialize(entry) {
            Ok(raw) => points.push(raw.into()),
            Err(err) => debug!("skipping detection {}: {}", entry, err),
        }
    }
    Ok(points)
}

/// Leading slice of `raw` for log lines.
pub fn excerpt(raw: &str) -> &str {
    match raw.char_indices().nth(LOG_EXCERPT_CHARS) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}
