/// Default location when the client sent nothing usable
pub const DEFAULT_LOCATION: &str = "0,0";

/// Coerce location into the canonical `"x,y"` string.
///
/// An explicit location string wins unless it carries one of the broken
/// client sentinels (`"null,null"`, anything containing `"undefined"`).
/// Otherwise the coordinate pair is used, and failing that the default.
pub fn normalize_location(raw: Option<&str>, x: Option<f64>, y: Option<f64>) -> String {
    if let Some(raw) = raw {
        let trimmed = raw.trim();
        if !trimmed.is_empty() && trimmed != "null,null" && !trimmed.contains("undefined") {
            return raw.to_string();
        }
    }

    match (x, y) {
        (Some(x), Some(y)) => format!("{},{}", x, y),
        _ => DEFAULT_LOCATION.to_string(),
    }
}
