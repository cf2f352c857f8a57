use serde_json::Value;

/// Alias precedence chains for the canonical payload fields. Clients have
/// shipped several generations of key names; first present, non-empty
/// value wins.
pub const SESSION_ID: &[&str] = &["sessionId", "session_id"];
pub const DEVICE_ID: &[&str] = &["device_id", "vehicle_id", "deviceId"];
pub const TIMESTAMP: &[&str] = &["timestamp", "event_time"];
pub const OBJECT_TYPE: &[&str] = &["objectType", "object_type", "vehicle_type"];
pub const DIRECTION: &[&str] = &["direction", "heading"];
pub const LOCATION: &[&str] = &["location"];
pub const USER_ID: &[&str] = &["user_id", "userId"];
pub const IS_PUBLIC: &[&str] = &["is_public", "isPublic"];
pub const GPS_LATITUDE: &[&str] = &["gps_latitude", "gpsLatitude", "latitude"];
pub const GPS_LONGITUDE: &[&str] = &["gps_longitude", "gpsLongitude", "longitude"];
pub const GPS_LOCATION: &[&str] = &["gps_location", "gpsLocation"];
pub const POSITION_X: &[&str] = &["position_x", "exit_position_x", "positionX"];
pub const POSITION_Y: &[&str] = &["position_y", "exit_position_y", "positionY"];
pub const IMAGE_DATA: &[&str] = &["image_data", "imageData"];
pub const EVENT_TYPE: &[&str] = &["event_type", "eventType"];

/// First alias present in the payload, regardless of value type
pub fn get<'a>(payload: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|key| {
        let v = payload.get(key)?;
        if v.is_null() {
            None
        } else {
            Some(v)
        }
    })
}

/// First alias carrying a non-empty string. Non-string scalars are
/// stringified rather than rejected (old clients send numeric ids).
pub fn get_string(payload: &Value, aliases: &[&str]) -> Option<String> {
    for key in aliases.iter() {
        match payload.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => continue,
        }
    }
    None
}

/// Like [`get_string`] but with a default instead of `None`
pub fn get_string_or(payload: &Value, aliases: &[&str], default: &str) -> String {
    get_string(payload, aliases).unwrap_or_else(|| default.to_string())
}

/// Tolerant float extraction: JSON number or numeric string. Anything
/// else is `None` — never zero, since zero is a valid coordinate.
pub fn get_f64(payload: &Value, aliases: &[&str]) -> Option<f64> {
    for key in aliases.iter() {
        match payload.get(*key) {
            Some(Value::Number(n)) => return n.as_f64(),
            Some(Value::String(s)) => {
                if let Ok(parsed) = s.trim().parse::<f64>() {
                    return Some(parsed);
                }
            }
            _ => continue,
        }
    }
    None
}

/// Boolean extraction accepting bools and the usual string spellings
pub fn get_bool(payload: &Value, aliases: &[&str], default: bool) -> bool {
    for key in aliases.iter() {
        match payload.get(*key) {
            Some(Value::Bool(b)) => return *b,
            Some(Value::String(s)) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" => return true,
                "false" | "0" | "no" => return false,
                _ => continue,
            },
            _ => continue,
        }
    }
    default
}
