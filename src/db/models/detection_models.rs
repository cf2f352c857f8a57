use serde::{Deserialize, Serialize};

/// Canonical detection record, post-normalization. Persisted as a flat
/// document in one of the category collections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionEvent {
    pub session_id: String,
    pub device_id: String,
    /// Always `YYYY-MM-DD HH:MM:SS` after normalization
    pub timestamp: String,
    pub object_type: String,
    pub direction: String,
    /// Always a `"x,y"` pair, `"0,0"` when the client sent nothing usable
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_location: Option<String>,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub user_id: Option<String>,
    pub is_public: bool,
}

/// Bus image upload: a detection variant carrying the image payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusImageEvent {
    pub session_id: String,
    pub device_id: String,
    pub timestamp: String,
    /// entry | exit | continuous | unknown
    pub event_type: String,
    /// Base64-encoded image bytes, stored verbatim
    pub image_data: String,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub user_id: Option<String>,
    pub is_public: bool,
}

/// Collection holding bus image documents
pub const BUS_IMAGES_COLLECTION: &str = "bus_images";
