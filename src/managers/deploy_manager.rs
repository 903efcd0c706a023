use poise::serenity_prelude::UserId;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::BotConfig;
use crate::error::{BotError, Result};
use crate::messages;
use crate::panel::{DeployInstanceRequest, SharedPanel};
use crate::state::{ImageDescriptor, SharedCatalogStore};

/// Primary ports are drawn from this range
const PORT_RANGE: std::ops::RangeInclusive<u32> = 10000..=99999;

/// Parsed `deploy` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployArgs {
    pub memory: String,
    pub cpu: String,
    pub image_name: String,
    pub name: String,
    /// `key=value` assignments; later ones win
    pub variables: HashMap<String, String>,
}

impl DeployArgs {
    /// Parse `<memory> <cpu> <imageName> <name> [var=value ...]`
    pub fn parse<S: AsRef<str>>(args: &[S], prefix: &str) -> Result<Self> {
        if args.len() < 4 {
            return Err(BotError::Validation {
                message: messages::deploy_usage(prefix),
            });
        }

        let variables = args[4..]
            .iter()
            .filter_map(|arg| arg.as_ref().split_once('='))
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Ok(Self {
            memory: args[0].as_ref().to_string(),
            cpu: args[1].as_ref().to_string(),
            image_name: args[2].as_ref().to_string(),
            name: args[3].as_ref().to_string(),
            variables,
        })
    }
}

/// Resolve image variables: provided value, else declared default, else fail if required
pub fn resolve_variables(
    image: &ImageDescriptor,
    provided: &HashMap<String, String>,
) -> Result<Map<String, Value>> {
    let mut resolved = Map::new();

    let Some(declared) = &image.variables else {
        return Ok(resolved);
    };

    for (key, spec) in declared {
        if let Some(value) = provided.get(key) {
            resolved.insert(key.clone(), Value::String(value.clone()));
        } else if let Some(default) = spec.default_value() {
            resolved.insert(key.clone(), default.clone());
        } else if spec.required {
            return Err(BotError::Validation {
                message: format!("Variable {} is required but not provided.", key),
            });
        }
    }

    Ok(resolved)
}

pub fn random_port() -> u32 {
    rand::thread_rng().gen_range(PORT_RANGE)
}

/// A deployed instance, ready to be shown to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedInstance {
    pub volume_id: String,
    pub link: String,
    pub memory: String,
    pub cpu: String,
    pub image_name: String,
    pub name: String,
    pub port: u32,
}

/// Turns `deploy` commands into panel deployments
pub struct DeployManager {
    config: Arc<BotConfig>,
    panel: SharedPanel,
    store: SharedCatalogStore,
}

impl DeployManager {
    pub fn new(config: Arc<BotConfig>, panel: SharedPanel, store: SharedCatalogStore) -> Self {
        Self {
            config,
            panel,
            store,
        }
    }

    /// Validate against the local catalogs and deploy on a random node
    pub async fn deploy(&self, args: &DeployArgs, requester: UserId) -> Result<DeployedInstance> {
        let image = self
            .store
            .find_image(&args.image_name)
            .await?
            .ok_or_else(|| BotError::ImageNotFound {
                name: args.image_name.clone(),
            })?;

        let variables = resolve_variables(&image, &args.variables)?;

        let node_ids = self.store.node_ids().await?;
        let node_id = node_ids
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(BotError::NoNodes)?;

        let port = random_port();
        let request = DeployInstanceRequest {
            image: image.id.clone(),
            imagename: args.image_name.clone(),
            memory: args.memory.clone(),
            cpu: args.cpu.clone(),
            name: args.name.clone(),
            ports: format!("{}:{}", port, port),
            node_id,
            user: requester.to_string(),
            primary: port,
            variables: serde_json::to_string(&variables)?,
        };

        let response = self.panel.deploy_instance(&request).await.map_err(|e| {
            error!("Deploy of '{}' for {} failed: {}", args.image_name, requester, e);
            e
        })?;
        let volume_id = response.volume_id_string();

        info!(
            "Deployed '{}' ({}) for {} as volume {} on port {}",
            args.name, args.image_name, requester, volume_id, port
        );

        Ok(DeployedInstance {
            link: self.config.instance_url(&volume_id),
            volume_id,
            memory: args.memory.clone(),
            cpu: args.cpu.clone(),
            image_name: args.image_name.clone(),
            name: args.name.clone(),
            port,
        })
    }
}

/// Shared deploy manager type
pub type SharedDeployManager = Arc<DeployManager>;

pub fn create_shared_deploy_manager(
    config: Arc<BotConfig>,
    panel: SharedPanel,
    store: SharedCatalogStore,
) -> SharedDeployManager {
    Arc::new(DeployManager::new(config, panel, store))
}
