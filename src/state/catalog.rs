use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{BotError, Result};

/// Which panel collection a catalog file mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Images,
    Nodes,
}

impl CatalogKind {
    pub fn file_name(self) -> &'static str {
        match self {
            CatalogKind::Images => "images.json",
            CatalogKind::Nodes => "nodes.json",
        }
    }

    /// Plural noun used in replies and logs
    pub fn label(self) -> &'static str {
        match self {
            CatalogKind::Images => "images",
            CatalogKind::Nodes => "nodes",
        }
    }
}

/// An image as the panel describes it. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageDescriptor {
    pub id: Value,
    pub name: String,
    #[serde(rename = "Variables", default)]
    pub variables: Option<BTreeMap<String, VariableSpec>>,
}

/// Declaration of one image variable
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariableSpec {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
}

impl VariableSpec {
    /// The declared default, if it carries a usable value
    pub fn default_value(&self) -> Option<&Value> {
        match &self.default {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(v) => Some(v),
        }
    }
}

/// Local snapshots of panel collections.
///
/// Snapshots are replaced whole; there are no partial updates.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Replace the snapshot for `kind` with `entries`
    async fn replace_snapshot(&self, kind: CatalogKind, entries: &[Value]) -> Result<()>;

    /// Read the current snapshot. A catalog that was never fetched is empty.
    async fn snapshot(&self, kind: CatalogKind) -> Result<Vec<Value>>;

    /// Find an image by exact name
    async fn find_image(&self, name: &str) -> Result<Option<ImageDescriptor>> {
        let images = self.snapshot(CatalogKind::Images).await?;
        let Some(entry) = images
            .into_iter()
            .find(|entry| entry.get("name").and_then(Value::as_str) == Some(name))
        else {
            return Ok(None);
        };

        serde_json::from_value(entry)
            .map(Some)
            .map_err(|e| BotError::Internal {
                message: format!("malformed image entry '{}': {}", name, e),
            })
    }

    /// IDs of every known node
    async fn node_ids(&self) -> Result<Vec<Value>> {
        let nodes = self.snapshot(CatalogKind::Nodes).await?;
        Ok(nodes
            .into_iter()
            .filter_map(|mut node| node.get_mut("id").map(Value::take))
            .filter(|id| !id.is_null())
            .collect())
    }
}

/// Catalogs stored as pretty-printed JSON files in one directory
pub struct JsonCatalogStore {
    root: PathBuf,
}

impl JsonCatalogStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, kind: CatalogKind) -> PathBuf {
        self.root.join(kind.file_name())
    }
}

#[async_trait]
impl CatalogStore for JsonCatalogStore {
    async fn replace_snapshot(&self, kind: CatalogKind, entries: &[Value]) -> Result<()> {
        let path = self.path_for(kind);
        let path_str = path.display().to_string();
        let content = serde_json::to_string_pretty(entries)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| BotError::StateSave {
                path: self.root.display().to_string(),
                source: e,
            })?;

        // Write to temp file first, then rename so readers never see a partial file
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| BotError::StateSave {
                path: path_str.clone(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| BotError::StateSave {
                path: path_str.clone(),
                source: e,
            })?;

        info!("Saved {} {} to {}", entries.len(), kind.label(), path_str);
        Ok(())
    }

    async fn snapshot(&self, kind: CatalogKind) -> Result<Vec<Value>> {
        let path = self.path_for(kind);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| BotError::StateParse {
                    path: path.display().to_string(),
                    source: e,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No {} catalog at {}", kind.label(), path.display());
                Ok(Vec::new())
            }
            Err(e) => Err(BotError::StateLoad {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }
}

/// Shared catalog store type
pub type SharedCatalogStore = Arc<dyn CatalogStore>;

pub fn create_shared_catalog_store(root: &str) -> SharedCatalogStore {
    Arc::new(JsonCatalogStore::new(root))
}
