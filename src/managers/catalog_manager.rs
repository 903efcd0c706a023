use poise::serenity_prelude::UserId;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::BotConfig;
use crate::error::{BotError, Result};
use crate::panel::SharedPanel;
use crate::state::{CatalogKind, SharedCatalogStore};

/// Refreshes local catalogs from the panel. Admin only.
pub struct CatalogManager {
    config: Arc<BotConfig>,
    panel: SharedPanel,
    store: SharedCatalogStore,
}

impl CatalogManager {
    pub fn new(config: Arc<BotConfig>, panel: SharedPanel, store: SharedCatalogStore) -> Self {
        Self {
            config,
            panel,
            store,
        }
    }

    /// Fetch `kind` from the panel and replace the local snapshot.
    /// Returns the number of entries saved.
    pub async fn refresh(&self, kind: CatalogKind, requester: UserId) -> Result<usize> {
        if !self.config.is_admin(requester) {
            warn!(
                "User {} tried to refresh {} without admin rights",
                requester,
                kind.label()
            );
            return Err(BotError::PermissionDenied {
                message: format!("fetch{}", kind.label()),
            });
        }

        let entries = match kind {
            CatalogKind::Images => self.panel.list_images().await?,
            CatalogKind::Nodes => self.panel.list_nodes().await?,
        };

        self.store.replace_snapshot(kind, &entries).await?;

        info!(
            "{} refreshed {} {} from the panel",
            requester,
            entries.len(),
            kind.label()
        );
        Ok(entries.len())
    }
}

/// Shared catalog manager type
pub type SharedCatalogManager = Arc<CatalogManager>;

pub fn create_shared_catalog_manager(
    config: Arc<BotConfig>,
    panel: SharedPanel,
    store: SharedCatalogStore,
) -> SharedCatalogManager {
    Arc::new(CatalogManager::new(config, panel, store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::PanelClient;
    use crate::state::catalog::{CatalogStore, JsonCatalogStore};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ADMIN: u64 = 111;
    const MEMBER: u64 = 222;

    fn test_config(url: &str, storage: &str) -> Arc<BotConfig> {
        let json = serde_json::json!({
            "token": "t",
            "url": url,
            "key": "test-key",
            "admin_users": [ADMIN.to_string()],
            "storage_path": storage
        });
        Arc::new(serde_json::from_value(json).unwrap())
    }

    fn setup(mock_server: &MockServer, dir: &tempfile::TempDir) -> (CatalogManager, Arc<JsonCatalogStore>) {
        let storage = dir.path().join("storage");
        let config = test_config(&mock_server.uri(), storage.to_str().unwrap());
        let panel = Arc::new(
            PanelClient::new(mock_server.uri(), "test-key", Duration::from_secs(5)).unwrap(),
        );
        let store = Arc::new(JsonCatalogStore::new(storage));
        let manager = CatalogManager::new(config, panel, store.clone());
        (manager, store)
    }

    #[tokio::test]
    async fn test_non_admin_makes_no_request_and_writes_nothing() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(0)
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (manager, store) = setup(&mock_server, &dir);

        for kind in [CatalogKind::Images, CatalogKind::Nodes] {
            let result = manager.refresh(kind, UserId::new(MEMBER)).await;
            assert!(matches!(result, Err(BotError::PermissionDenied { .. })));
            assert!(!store.path_for(kind).exists());
        }
        assert!(!dir.path().join("storage").exists());
    }

    #[tokio::test]
    async fn test_fetch_images_round_trip() {
        let mock_server = MockServer::start().await;
        let images = serde_json::json!([
            {"id": "img-1", "name": "nginx"},
            {"id": "img-2", "name": "minecraft", "Variables": {"EULA": {"required": true}}}
        ]);
        Mock::given(method("GET"))
            .and(path("/api/images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&images))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (manager, store) = setup(&mock_server, &dir);

        let count = manager
            .refresh(CatalogKind::Images, UserId::new(ADMIN))
            .await
            .unwrap();
        assert_eq!(count, 2);

        let written = std::fs::read_to_string(store.path_for(CatalogKind::Images)).unwrap();
        assert_eq!(written, serde_json::to_string_pretty(&images).unwrap());

        let image = store.find_image("minecraft").await.unwrap().unwrap();
        assert_eq!(image.id, serde_json::json!("img-2"));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_snapshot() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/nodes"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (manager, store) = setup(&mock_server, &dir);
        store
            .replace_snapshot(CatalogKind::Nodes, &[serde_json::json!({"id": 1})])
            .await
            .unwrap();

        let result = manager.refresh(CatalogKind::Nodes, UserId::new(ADMIN)).await;
        assert!(matches!(result, Err(BotError::PanelStatus { status: 500, .. })));
        assert_eq!(store.node_ids().await.unwrap(), vec![serde_json::json!(1)]);
    }
}
