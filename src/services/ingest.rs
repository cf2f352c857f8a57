use crate::db::models::BUS_IMAGES_COLLECTION;
use crate::db::store::DocumentStore;
use crate::error::Error;
use crate::ingest::classify::Category;
use crate::ingest::normalizer::{BusImageOutcome, EventNormalizer, Outcome};
use anyhow::Result;
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Result of one ingestion request. Skips are successes: the pipeline
/// never fails on malformed input, only on a storage fault.
#[derive(Debug, Serialize)]
pub struct IngestReport {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub companion_id: Option<Uuid>,
}

impl IngestReport {
    fn stored(id: Uuid) -> Self {
        Self {
            status: "stored",
            reason: None,
            id: Some(id),
            companion_id: None,
        }
    }

    fn skipped(reason: &'static str) -> Self {
        Self {
            status: "skipped",
            reason: Some(reason),
            id: None,
            companion_id: None,
        }
    }
}

/// Thin orchestrator over the normalizer and the document store
pub struct IngestService {
    normalizer: EventNormalizer,
    store: Arc<dyn DocumentStore>,
}

impl IngestService {
    pub fn new(normalizer: EventNormalizer, store: Arc<dyn DocumentStore>) -> Self {
        Self { normalizer, store }
    }

    async fn persist(&self, collection: &str, doc: Value) -> Result<Uuid> {
        let id = self.store.insert(collection, doc).await?;
        info!("Stored detection {} in {}", id, collection);
        Ok(id)
    }

    fn to_doc<T: Serialize>(record: &T) -> Result<Value> {
        serde_json::to_value(record)
            .map_err(|e| Error::Serialization(format!("Failed to encode record: {}", e)).into())
    }

    /// Basic detection log submission
    pub async fn ingest_log(&self, payload: &Value) -> Result<IngestReport> {
        match self.normalizer.normalize_log(payload) {
            Outcome::Normalized { event, collection } => {
                let id = self.persist(collection, Self::to_doc(&event)?).await?;
                Ok(IngestReport::stored(id))
            }
            Outcome::Skipped(reason) => Ok(IngestReport::skipped(reason.as_str())),
        }
    }

    /// GPS tracking submission; requires coordinates and a user identity
    pub async fn ingest_tracking(&self, payload: &Value) -> Result<IngestReport> {
        match self.normalizer.normalize_tracking(payload) {
            Outcome::Normalized { event, collection } => {
                let id = self.persist(collection, Self::to_doc(&event)?).await?;
                Ok(IngestReport::stored(id))
            }
            Outcome::Skipped(reason) => Ok(IngestReport::skipped(reason.as_str())),
        }
    }

    /// Bus-image upload. The image document is always stored; the
    /// synthesized companion detection rides its own fingerprint.
    pub async fn ingest_bus_image(&self, payload: &Value) -> Result<IngestReport> {
        match self.normalizer.normalize_bus_image(payload) {
            BusImageOutcome::Normalized { image, companion } => {
                let image_id = self
                    .persist(BUS_IMAGES_COLLECTION, Self::to_doc(&image)?)
                    .await?;

                let companion_id = match companion {
                    Some(event) => Some(
                        self.persist(Category::Bus.collection_name(), Self::to_doc(&event)?)
                            .await?,
                    ),
                    None => None,
                };

                Ok(IngestReport {
                    status: "stored",
                    reason: None,
                    id: Some(image_id),
                    companion_id,
                })
            }
            BusImageOutcome::Skipped(reason) => Ok(IngestReport::skipped(reason.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;
    use crate::db::store::{DocFilter, MemoryStore};
    use crate::ingest::dedup::DuplicateSuppressor;
    use serde_json::json;

    fn service() -> (IngestService, Arc<MemoryStore>) {
        let config = IngestConfig::default();
        let store = Arc::new(MemoryStore::new());
        let normalizer =
            EventNormalizer::new(Arc::new(DuplicateSuppressor::new(&config)), &config);
        (IngestService::new(normalizer, store.clone()), store)
    }

    const B64_PIXEL: &str = "iVBORw0KGgo=";

    #[tokio::test]
    async fn tracking_without_gps_never_reaches_storage() -> Result<()> {
        let (service, store) = service();

        let report = service
            .ingest_tracking(&json!({
                "session_id": "s1",
                "vehicle_type": "car",
                "position_x": 3,
                "position_y": 4
            }))
            .await?;

        assert_eq!(report.status, "skipped");
        assert_eq!(report.reason, Some("missing_gps"));
        assert_eq!(store.count("vehicle_detections", &DocFilter::new()).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn tracking_with_gps_and_user_is_stored() -> Result<()> {
        let (service, store) = service();

        let report = service
            .ingest_tracking(&json!({
                "session_id": "s1",
                "vehicle_type": "car",
                "position_x": 3,
                "position_y": 4,
                "gps_latitude": 52.52,
                "gps_longitude": 13.405,
                "user_id": "u1"
            }))
            .await?;

        assert_eq!(report.status, "stored");
        assert!(report.id.is_some());

        let doc = store
            .find_one(
                "vehicle_detections",
                &DocFilter::new().eq("session_id", "s1"),
                None,
            )
            .await?
            .expect("stored document");
        assert_eq!(doc["location"], "3,4");
        assert_eq!(doc["user_id"], "u1");
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_submission_is_skipped_and_not_persisted() -> Result<()> {
        let (service, store) = service();
        let payload = json!({
            "session_id": "s1",
            "device_id": "d1",
            "vehicle_type": "car",
            "timestamp": "2024-05-01 08:30:15"
        });

        let first = service.ingest_log(&payload).await?;
        assert_eq!(first.status, "stored");

        let second = service.ingest_log(&payload).await?;
        assert_eq!(second.status, "skipped");
        assert_eq!(second.reason, Some("duplicate"));

        assert_eq!(store.count("vehicle_detections", &DocFilter::new()).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn bus_image_produces_two_records() -> Result<()> {
        let (service, store) = service();

        let report = service
            .ingest_bus_image(&json!({
                "session_id": "s1",
                "device_id": "d1",
                "event_type": "exit",
                "image_data": B64_PIXEL,
                "timestamp": "2024-05-01 08:30:15"
            }))
            .await?;

        assert_eq!(report.status, "stored");
        assert!(report.companion_id.is_some());
        assert_eq!(store.count("bus_images", &DocFilter::new()).await?, 1);

        let companion = store
            .find_one(
                "bus_detections",
                &DocFilter::new().eq("object_type", "bus"),
                None,
            )
            .await?
            .expect("companion detection");
        assert_eq!(companion["direction"], "outbound");
        Ok(())
    }

    #[tokio::test]
    async fn repeated_bus_image_stores_only_the_image() -> Result<()> {
        let (service, store) = service();
        let payload = json!({
            "session_id": "s1",
            "device_id": "d1",
            "event_type": "entry",
            "image_data": B64_PIXEL,
            "timestamp": "2024-05-01 08:30:15"
        });

        service.ingest_bus_image(&payload).await?;
        let second = service.ingest_bus_image(&payload).await?;

        assert_eq!(second.status, "stored");
        assert!(second.companion_id.is_none());
        assert_eq!(store.count("bus_images", &DocFilter::new()).await?, 2);
        assert_eq!(store.count("bus_detections", &DocFilter::new()).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn log_endpoint_routes_buses_elsewhere() -> Result<()> {
        let (service, store) = service();

        let report = service
            .ingest_log(&json!({"session_id": "s1", "objectType": "bus"}))
            .await?;

        assert_eq!(report.status, "skipped");
        assert_eq!(report.reason, Some("bus_routed_elsewhere"));
        assert_eq!(store.count("bus_detections", &DocFilter::new()).await?, 0);
        Ok(())
    }
}
