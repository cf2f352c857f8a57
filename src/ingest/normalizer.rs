use crate::config::IngestConfig;
use crate::db::models::{BusImageEvent, DetectionEvent};
use crate::ingest::classify::{classify, Category};
use crate::ingest::dedup::{bus_image_fingerprint, detection_fingerprint, DuplicateSuppressor};
use crate::ingest::fields;
use crate::ingest::location::normalize_location;
use crate::ingest::timestamp::normalize_timestamp;
use base64::Engine;
use log::debug;
use serde_json::Value;
use std::sync::Arc;

/// Why a payload was dropped without being persisted. Every variant is a
/// soft skip: reported to the client as a successful no-op, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Duplicate,
    MissingGps,
    MissingUser,
    MissingImage,
    BusRoutedElsewhere,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Duplicate => "duplicate",
            SkipReason::MissingGps => "missing_gps",
            SkipReason::MissingUser => "missing_user",
            SkipReason::MissingImage => "missing_image",
            SkipReason::BusRoutedElsewhere => "bus_routed_elsewhere",
        }
    }
}

/// Outcome of normalizing a detection payload
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Normalized {
        event: DetectionEvent,
        collection: &'static str,
    },
    Skipped(SkipReason),
}

/// Outcome of normalizing a bus-image payload. The companion detection is
/// gated by its own fingerprint; the image record itself is not.
#[derive(Debug, Clone, PartialEq)]
pub enum BusImageOutcome {
    Normalized {
        image: BusImageEvent,
        companion: Option<DetectionEvent>,
    },
    Skipped(SkipReason),
}

/// Turns raw heterogeneous payloads into canonical records ready for
/// persistence. Owns no storage; the duplicate suppressor is the only
/// shared state it touches.
pub struct EventNormalizer {
    dedup: Arc<DuplicateSuppressor>,
    accept_bus_in_logs: bool,
}

impl EventNormalizer {
    pub fn new(dedup: Arc<DuplicateSuppressor>, config: &IngestConfig) -> Self {
        Self {
            dedup,
            accept_bus_in_logs: config.accept_bus_in_logs,
        }
    }

    /// Canonicalize the fields shared by every detection variant
    fn extract_common(&self, payload: &Value) -> DetectionEvent {
        let session_id = fields::get_string_or(payload, fields::SESSION_ID, "unknown");
        let device_id = fields::get_string_or(payload, fields::DEVICE_ID, "unknown");
        let object_type = fields::get_string_or(payload, fields::OBJECT_TYPE, "unknown");
        let direction = fields::get_string_or(payload, fields::DIRECTION, "unknown");

        let timestamp = normalize_timestamp(fields::get(payload, fields::TIMESTAMP));

        let raw_location = fields::get_string(payload, fields::LOCATION);
        let position_x = fields::get_f64(payload, fields::POSITION_X);
        let position_y = fields::get_f64(payload, fields::POSITION_Y);
        let location = normalize_location(raw_location.as_deref(), position_x, position_y);

        let gps_latitude = fields::get_f64(payload, fields::GPS_LATITUDE);
        let gps_longitude = fields::get_f64(payload, fields::GPS_LONGITUDE);
        let gps_location = fields::get_string(payload, fields::GPS_LOCATION).or_else(|| {
            match (gps_latitude, gps_longitude) {
                (Some(lat), Some(lon)) => Some(format!("{},{}", lat, lon)),
                _ => None,
            }
        });

        DetectionEvent {
            session_id,
            device_id,
            timestamp,
            object_type,
            direction,
            location,
            gps_location,
            gps_latitude,
            gps_longitude,
            user_id: fields::get_string(payload, fields::USER_ID),
            is_public: fields::get_bool(payload, fields::IS_PUBLIC, false),
        }
    }

    /// Shared tail of the detection paths: dedup check, then classify
    fn finish(&self, event: DetectionEvent) -> Outcome {
        let fingerprint = detection_fingerprint(
            &event.session_id,
            &event.object_type,
            &event.device_id,
            &event.timestamp,
        );
        if self.dedup.is_duplicate(&fingerprint) {
            debug!("Suppressed duplicate detection: {}", fingerprint);
            return Outcome::Skipped(SkipReason::Duplicate);
        }

        let collection = classify(&event.object_type).collection_name();
        Outcome::Normalized { event, collection }
    }

    /// Basic log submissions: no GPS or user requirement. Bus-classified
    /// payloads are routed elsewhere unless the deployment accepts them
    /// on this path.
    pub fn normalize_log(&self, payload: &Value) -> Outcome {
        let event = self.extract_common(payload);

        if classify(&event.object_type) == Category::Bus && !self.accept_bus_in_logs {
            return Outcome::Skipped(SkipReason::BusRoutedElsewhere);
        }

        self.finish(event)
    }

    /// Tracking submissions require valid GPS coordinates and a user
    /// identity; anything missing short-circuits as a soft skip.
    pub fn normalize_tracking(&self, payload: &Value) -> Outcome {
        let event = self.extract_common(payload);

        if event.gps_latitude.is_none() || event.gps_longitude.is_none() {
            return Outcome::Skipped(SkipReason::MissingGps);
        }
        if event.user_id.is_none() {
            return Outcome::Skipped(SkipReason::MissingUser);
        }

        self.finish(event)
    }

    /// Bus-image uploads: validate the payload, then synthesize the
    /// companion detection ("bus", direction derived from the event type),
    /// deduplicated under the image-specific fingerprint.
    pub fn normalize_bus_image(&self, payload: &Value) -> BusImageOutcome {
        let common = self.extract_common(payload);

        let image_data = match fields::get_string(payload, fields::IMAGE_DATA) {
            Some(data)
                if base64::engine::general_purpose::STANDARD
                    .decode(data.trim())
                    .map(|bytes| !bytes.is_empty())
                    .unwrap_or(false) =>
            {
                data
            }
            _ => return BusImageOutcome::Skipped(SkipReason::MissingImage),
        };

        let event_type = match fields::get_string(payload, fields::EVENT_TYPE).as_deref() {
            Some("entry") => "entry",
            Some("exit") => "exit",
            Some("continuous") => "continuous",
            _ => "unknown",
        }
        .to_string();

        let image = BusImageEvent {
            session_id: common.session_id.clone(),
            device_id: common.device_id.clone(),
            timestamp: common.timestamp.clone(),
            event_type: event_type.clone(),
            image_data,
            gps_latitude: common.gps_latitude,
            gps_longitude: common.gps_longitude,
            user_id: common.user_id.clone(),
            is_public: common.is_public,
        };

        let fingerprint =
            bus_image_fingerprint(&common.session_id, &common.device_id, &common.timestamp);
        let companion = if self.dedup.is_duplicate(&fingerprint) {
            debug!("Suppressed companion detection: {}", fingerprint);
            None
        } else {
            let direction = if event_type == "exit" {
                "outbound"
            } else {
                "inbound"
            };
            Some(DetectionEvent {
                object_type: "bus".to_string(),
                direction: direction.to_string(),
                ..common
            })
        };

        BusImageOutcome::Normalized { image, companion }
    }
}
