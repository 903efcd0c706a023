//! Request and response bodies for the panel API.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/getUser`
#[derive(Debug, Clone, Serialize)]
pub struct UserLookupRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl UserLookupRequest {
    pub fn by_email(email: &str) -> Self {
        Self {
            kind: "email".to_string(),
            value: email.to_string(),
        }
    }
}

/// Outcome of a user lookup. Statuses other than found / not found are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLookup {
    Found,
    NotFound,
}

/// Body of `POST /api/auth/create-user`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Body of `POST /api/instances/deploy`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployInstanceRequest {
    /// Image ID, passed through as the panel returned it
    pub image: serde_json::Value,
    pub imagename: String,
    pub memory: String,
    pub cpu: String,
    pub name: String,
    /// `"<port>:<port>"`
    pub ports: String,
    #[serde(rename = "nodeId")]
    pub node_id: serde_json::Value,
    pub user: String,
    pub primary: u32,
    /// JSON-encoded object of resolved variables
    pub variables: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeployInstanceResponse {
    #[serde(rename = "volumeId")]
    pub volume_id: serde_json::Value,
}

impl DeployInstanceResponse {
    /// Volume ID as text, whether the panel sent a string or a number
    pub fn volume_id_string(&self) -> String {
        match &self.volume_id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
