//! Panel HTTP client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::types::*;
use crate::error::{BotError, Result};

/// Operations the bot needs from the panel.
#[async_trait]
pub trait PanelApi: Send + Sync {
    /// Look up a panel account by email
    async fn get_user_by_email(&self, email: &str) -> Result<UserLookup>;

    /// Create a panel account
    async fn create_user(&self, request: &CreateUserRequest) -> Result<()>;

    /// Fetch all image descriptors
    async fn list_images(&self) -> Result<Vec<Value>>;

    /// Fetch all node descriptors
    async fn list_nodes(&self) -> Result<Vec<Value>>;

    /// Deploy a new instance
    async fn deploy_instance(&self, request: &DeployInstanceRequest)
        -> Result<DeployInstanceResponse>;
}

/// reqwest-backed panel client. Every request carries the static API key.
#[derive(Clone)]
pub struct PanelClient {
    client: Client,
    base_url: String,
}

impl PanelClient {
    pub fn new(base_url: impl Into<String>, api_key: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key).map_err(|_| BotError::ConfigValidation {
            message: "panel api key contains characters not allowed in a header".to_string(),
        })?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn unexpected(endpoint: &str, response: Response) -> BotError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        warn!("Panel returned {} for {}", status, endpoint);
        BotError::PanelStatus {
            endpoint: endpoint.to_string(),
            status,
            body,
        }
    }

    async fn get_list(&self, endpoint: &str) -> Result<Vec<Value>> {
        let response = self.client.get(self.url(endpoint)).send().await?;

        if !response.status().is_success() {
            return Err(Self::unexpected(endpoint, response).await);
        }

        let items: Vec<Value> = response.json().await?;
        debug!("Fetched {} entries from {}", items.len(), endpoint);
        Ok(items)
    }
}

#[async_trait]
impl PanelApi for PanelClient {
    #[instrument(skip(self, email))]
    async fn get_user_by_email(&self, email: &str) -> Result<UserLookup> {
        const ENDPOINT: &str = "/api/getUser";

        let response = self
            .client
            .post(self.url(ENDPOINT))
            .json(&UserLookupRequest::by_email(email))
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED => Ok(UserLookup::Found),
            StatusCode::BAD_REQUEST => Ok(UserLookup::NotFound),
            _ => Err(Self::unexpected(ENDPOINT, response).await),
        }
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    async fn create_user(&self, request: &CreateUserRequest) -> Result<()> {
        const ENDPOINT: &str = "/api/auth/create-user";

        let response = self
            .client
            .post(self.url(ENDPOINT))
            .json(request)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(Self::unexpected(ENDPOINT, response).await);
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_images(&self) -> Result<Vec<Value>> {
        self.get_list("/api/images").await
    }

    #[instrument(skip(self))]
    async fn list_nodes(&self) -> Result<Vec<Value>> {
        self.get_list("/api/nodes").await
    }

    #[instrument(skip(self, request), fields(image = %request.imagename))]
    async fn deploy_instance(
        &self,
        request: &DeployInstanceRequest,
    ) -> Result<DeployInstanceResponse> {
        const ENDPOINT: &str = "/api/instances/deploy";

        let response = self
            .client
            .post(self.url(ENDPOINT))
            .json(request)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(Self::unexpected(ENDPOINT, response).await);
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_client(mock_server: &MockServer) -> PanelClient {
        PanelClient::new(mock_server.uri(), "test-key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_get_user_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/getUser"))
            .and(header("x-api-key", "test-key"))
            .and(body_json(serde_json::json!({"type": "email", "value": "a@b.com"})))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let lookup = client.get_user_by_email("a@b.com").await.unwrap();
        assert_eq!(lookup, UserLookup::Found);
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/getUser"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let lookup = client.get_user_by_email("new@b.com").await.unwrap();
        assert_eq!(lookup, UserLookup::NotFound);
    }

    #[tokio::test]
    async fn test_get_user_other_status_is_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/getUser"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let result = client.get_user_by_email("a@b.com").await;

        match result {
            Err(BotError::PanelStatus { status, body, .. }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "down");
            }
            other => panic!("expected PanelStatus error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_user() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/auth/create-user"))
            .and(header("x-api-key", "test-key"))
            .and(body_json(serde_json::json!({
                "username": "alice",
                "email": "a@b.com",
                "password": "abcdef12",
                "userId": "42"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let request = CreateUserRequest {
            username: "alice".to_string(),
            email: "a@b.com".to_string(),
            password: "abcdef12".to_string(),
            user_id: "42".to_string(),
        };
        assert!(client.create_user(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_user_rejects_200() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/auth/create-user"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let request = CreateUserRequest {
            username: "alice".to_string(),
            email: "a@b.com".to_string(),
            password: "abcdef12".to_string(),
            user_id: "42".to_string(),
        };
        assert!(client.create_user(&request).await.is_err());
    }

    #[tokio::test]
    async fn test_list_images() {
        let mock_server = MockServer::start().await;

        let images = serde_json::json!([
            {"id": "img-1", "name": "minecraft", "Variables": {"EULA": {"required": true}}},
            {"id": "img-2", "name": "nginx"}
        ]);

        Mock::given(method("GET"))
            .and(path("/api/images"))
            .and(header("x-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&images))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let result = client.list_images().await.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0]["name"], "minecraft");
    }

    #[tokio::test]
    async fn test_list_nodes_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/nodes"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        assert!(matches!(
            client.list_nodes().await,
            Err(BotError::PanelStatus { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_deploy_instance() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/instances/deploy"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"volumeId": "vol-9"})),
            )
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let request = DeployInstanceRequest {
            image: serde_json::json!("img-1"),
            imagename: "nginx".to_string(),
            memory: "512".to_string(),
            cpu: "1".to_string(),
            name: "web".to_string(),
            ports: "12345:12345".to_string(),
            node_id: serde_json::json!("node-1"),
            user: "42".to_string(),
            primary: 12345,
            variables: "{}".to_string(),
        };

        let response = client.deploy_instance(&request).await.unwrap();
        assert_eq!(response.volume_id_string(), "vol-9");
    }
}
