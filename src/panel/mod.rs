pub mod client;
pub mod types;

pub use client::{PanelApi, PanelClient};
pub use types::{CreateUserRequest, DeployInstanceRequest, DeployInstanceResponse, UserLookup};

use std::sync::Arc;

/// Shared panel API handle
pub type SharedPanel = Arc<dyn PanelApi>;
