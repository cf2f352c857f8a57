use crate::db::store::{DocFilter, DocumentStore};
use crate::ingest::classify::Category;
use anyhow::Result;
use log::info;
use serde::Serialize;
use std::sync::Arc;

/// Fields whose absence marks a detection document as incomplete
const REQUIRED_FIELDS: &[&str] = &["gps_latitude", "gps_longitude", "user_id"];

#[derive(Debug, Serialize)]
pub struct CleanupSummary {
    pub deleted: u64,
    pub per_collection: Vec<(String, u64)>,
}

/// Bulk cleanup over persisted documents: deletes detections that were
/// stored without GPS coordinates or a user identity.
pub struct CleanupService {
    store: Arc<dyn DocumentStore>,
}

impl CleanupService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn purge_incomplete(&self) -> Result<CleanupSummary> {
        let mut summary = CleanupSummary {
            deleted: 0,
            per_collection: Vec::new(),
        };

        for category in [Category::Bus, Category::Vehicle, Category::Other] {
            let collection = category.collection_name();
            let mut deleted = 0;
            for field in REQUIRED_FIELDS {
                deleted += self
                    .store
                    .delete_many(collection, &DocFilter::new().missing(field))
                    .await?;
            }
            info!("Cleanup removed {} documents from {}", deleted, collection);
            summary.deleted += deleted;
            summary.per_collection.push((collection.to_string(), deleted));
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn purges_documents_missing_gps_or_user() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(
                "vehicle_detections",
                json!({"session_id": "keep", "gps_latitude": 1.0, "gps_longitude": 2.0, "user_id": "u1"}),
            )
            .await?;
        store
            .insert(
                "vehicle_detections",
                json!({"session_id": "no-gps", "gps_latitude": null, "gps_longitude": null, "user_id": "u1"}),
            )
            .await?;
        store
            .insert(
                "bus_detections",
                json!({"session_id": "no-user", "gps_latitude": 1.0, "gps_longitude": 2.0}),
            )
            .await?;

        let summary = CleanupService::new(store.clone()).purge_incomplete().await?;

        assert_eq!(summary.deleted, 2);
        assert_eq!(store.count("vehicle_detections", &DocFilter::new()).await?, 1);
        assert_eq!(store.count("bus_detections", &DocFilter::new()).await?, 0);
        Ok(())
    }
}
