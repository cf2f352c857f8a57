use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Canonical timestamp format stored on every detection record
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static CANONICAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").unwrap());

static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").unwrap());

/// Result of timestamp coercion. The external contract is always a bare
/// canonical string; the tag records whether the input survived or the
/// fallback kicked in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coerced {
    Parsed(String),
    Defaulted(String, &'static str),
}

impl Coerced {
    pub fn into_value(self) -> String {
        match self {
            Coerced::Parsed(s) => s,
            Coerced::Defaulted(s, _) => s,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Coerced::Defaulted(..))
    }
}

fn format_canonical(dt: DateTime<Utc>) -> String {
    dt.format(CANONICAL_FORMAT).to_string()
}

fn now_canonical() -> String {
    format_canonical(Utc::now())
}

fn from_epoch_millis(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(format_canonical)
}

/// Coerce any accepted timestamp representation into the canonical
/// `YYYY-MM-DD HH:MM:SS` form. Never fails; garbage falls back to the
/// current time with a logged warning.
pub fn coerce_timestamp(raw: Option<&Value>) -> Coerced {
    let raw = match raw {
        None | Some(Value::Null) => {
            return Coerced::Defaulted(now_canonical(), "missing");
        }
        Some(v) => v,
    };

    // JSON numbers are epoch milliseconds
    if let Some(millis) = raw.as_i64() {
        return match from_epoch_millis(millis) {
            Some(s) => Coerced::Parsed(s),
            None => {
                warn!("Timestamp out of range: {}", millis);
                Coerced::Defaulted(now_canonical(), "out_of_range")
            }
        };
    }

    let s = match raw.as_str() {
        Some(s) => s.trim(),
        None => {
            warn!("Unsupported timestamp value: {}", raw);
            return Coerced::Defaulted(now_canonical(), "unsupported_type");
        }
    };

    if s.is_empty() {
        return Coerced::Defaulted(now_canonical(), "missing");
    }

    // Pure numeric strings are epoch milliseconds too
    if NUMERIC_RE.is_match(s) {
        if let Some(formatted) = s.parse::<i64>().ok().and_then(from_epoch_millis) {
            return Coerced::Parsed(formatted);
        }
        warn!("Numeric timestamp out of range: {}", s);
        return Coerced::Defaulted(now_canonical(), "out_of_range");
    }

    // ISO-8601 style: truncate to whole seconds, separator becomes a space
    if s.contains('T') {
        let truncated: String = s.replace('T', " ").chars().take(19).collect();
        if let Ok(dt) = NaiveDateTime::parse_from_str(&truncated, CANONICAL_FORMAT) {
            return Coerced::Parsed(dt.format(CANONICAL_FORMAT).to_string());
        }
    }

    // Already canonical
    if CANONICAL_RE.is_match(s) {
        return Coerced::Parsed(s.to_string());
    }

    // Last-ditch generic parses before giving up
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Coerced::Parsed(format_canonical(dt.with_timezone(&Utc)));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Coerced::Parsed(format_canonical(dt.with_timezone(&Utc)));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y/%m/%d %H:%M:%S") {
        return Coerced::Parsed(dt.format(CANONICAL_FORMAT).to_string());
    }

    warn!("Unparseable timestamp {:?}, substituting current time", s);
    Coerced::Defaulted(now_canonical(), "unparseable")
}

/// Bare-value form of [`coerce_timestamp`], used by the normalizer
pub fn normalize_timestamp(raw: Option<&Value>) -> String {
    coerce_timestamp(raw).into_value()
}
