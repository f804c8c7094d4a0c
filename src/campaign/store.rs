//! Campaign store — in-memory campaign registry shared across tasks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::campaign::model::{Campaign, CampaignConfig, CampaignSummary};
use crate::error::StoreError;
use crate::recipients::RecipientTable;

/// In-memory campaign registry. All mutation goes through the write lock, so
/// a mutation passed to [`CampaignStore::update`] is atomic from any other
/// reader's perspective.
pub struct CampaignStore {
    inner: RwLock<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    campaigns: HashMap<Uuid, Campaign>,
    /// Creation order, newest first.
    order: Vec<Uuid>,
}

impl CampaignStore {
    /// Create an empty store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(StoreInner::default()),
        })
    }

    /// Create a campaign from a configuration and recipient snapshot and
    /// return its id.
    pub async fn create(&self, config: CampaignConfig, recipients: RecipientTable) -> Uuid {
        let campaign = Campaign::new(config, recipients);
        let id = campaign.id;

        let mut inner = self.inner.write().await;
        inner.order.insert(0, id);
        inner.campaigns.insert(id, campaign);

        info!(campaign_id = %id, "Campaign created");
        id
    }

    /// Fetch a campaign by id.
    pub async fn get(&self, id: Uuid) -> Option<Campaign> {
        self.inner.read().await.campaigns.get(&id).cloned()
    }

    /// Listing projections, most-recently-created first.
    pub async fn list(&self) -> Vec<CampaignSummary> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.campaigns.get(id))
            .map(Campaign::summary)
            .collect()
    }

    /// Remove a campaign. Removing an unknown id is a no-op; returns whether
    /// anything was removed.
    pub async fn delete(&self, id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        let removed = inner.campaigns.remove(&id).is_some();
        if removed {
            inner.order.retain(|existing| *existing != id);
            info!(campaign_id = %id, "Campaign deleted");
        } else {
            debug!(campaign_id = %id, "Delete of unknown campaign ignored");
        }
        removed
    }

    /// Apply a mutation to one campaign atomically under the write lock.
    pub async fn update<T>(
        &self,
        id: Uuid,
        mutation: impl FnOnce(&mut Campaign) -> T,
    ) -> Result<T, StoreError> {
        let mut inner = self.inner.write().await;
        let campaign = inner
            .campaigns
            .get_mut(&id)
            .ok_or(StoreError::NotFound { id })?;
        Ok(mutation(campaign))
    }

    /// Number of stored campaigns.
    pub async fn count(&self) -> usize {
        self.inner.read().await.campaigns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::model::{DripInterval, SendMode};

    fn config(subject: &str) -> CampaignConfig {
        CampaignConfig {
            subject: subject.to_string(),
            body: "Hello!".to_string(),
            mode: SendMode::Bulk,
            batch_size: 1000,
            drip_rate: 1000,
            drip_interval: DripInterval::Daily,
        }
    }

    fn table() -> RecipientTable {
        RecipientTable::from_csv("id\n1\n2").unwrap()
    }

    #[tokio::test]
    async fn create_and_get() {
        let store = CampaignStore::new();
        let id = store.create(config("First"), table()).await;

        let campaign = store.get(id).await.unwrap();
        assert_eq!(campaign.config.subject, "First");
        assert_eq!(campaign.total_recipients(), 2);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = CampaignStore::new();
        store.create(config("First"), table()).await;
        store.create(config("Second"), table()).await;

        let subjects: Vec<_> = store
            .list()
            .await
            .into_iter()
            .map(|s| s.subject)
            .collect();
        assert_eq!(subjects, ["Second", "First"]);
    }

    #[tokio::test]
    async fn delete_is_noop_for_unknown_id() {
        let store = CampaignStore::new();
        let id = store.create(config("First"), table()).await;

        assert!(!store.delete(Uuid::new_v4()).await);
        assert_eq!(store.count().await, 1);

        assert!(store.delete(id).await);
        assert_eq!(store.count().await, 0);
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn update_mutates_in_place() {
        let store = CampaignStore::new();
        let id = store.create(config("First"), table()).await;

        store
            .update(id, |c| {
                c.config.subject = "Renamed".to_string();
            })
            .await
            .unwrap();

        assert_eq!(store.get(id).await.unwrap().config.subject, "Renamed");
    }

    #[tokio::test]
    async fn update_of_unknown_id_fails() {
        let store = CampaignStore::new();
        let err = store.update(Uuid::new_v4(), |_| ()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
