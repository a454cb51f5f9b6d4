//! Target API trait and its reqwest implementation

use crate::config::HttpConfig;
use crate::errors::HttpError;
use crate::types::{HttpMethod, TargetResponse, UserPayload};
use reqwest::{header::LOCATION, Client, RequestBuilder};
use serde_json::Value as JsonValue;
use stampede_config::TargetConfig;
use stampede_core::ResourceId;
use tracing::{debug, trace};
use url::Url;

/// The system under test, seen as a black box
///
/// Implementations must be shareable across every VU task. A returned
/// `Err` means no HTTP status was obtained (transport failure or timeout);
/// any status, including 4xx/5xx, comes back as `Ok`.
#[async_trait::async_trait]
pub trait UsersTarget: Send + Sync {
    /// `POST /users`
    async fn create_user(&self, payload: &UserPayload) -> Result<TargetResponse, HttpError>;

    /// `GET /users`
    async fn list_users(&self) -> Result<TargetResponse, HttpError>;

    /// `PUT /users/{id}`
    async fn update_user(
        &self,
        id: &ResourceId,
        payload: &UserPayload,
    ) -> Result<TargetResponse, HttpError>;
}

/// Users API reached over HTTP with one pooled client
#[derive(Debug, Clone)]
pub struct HttpTarget {
    client: Client,
    base_url: Url,
    config: HttpConfig,
}

impl HttpTarget {
    /// Build the shared client for a base URL
    pub fn new(base_url: &str, config: HttpConfig) -> Result<Self, HttpError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| HttpError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(HttpError::InvalidUrl(base_url.to_string()));
        }

        debug!(
            "Creating HTTP client for {} with {}s timeout",
            base_url,
            config.timeout.as_secs()
        );
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .pool_idle_timeout(config.idle_timeout)
            .build()
            .map_err(HttpError::Client)?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Build from the `target` configuration section
    pub fn from_config(config: &TargetConfig) -> Result<Self, HttpError> {
        Self::new(&config.base_url, HttpConfig::from(config))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// `{base}/users` or `{base}/users/{id}`, keeping any base path prefix
    fn users_url(&self, id: Option<&ResourceId>) -> Result<Url, HttpError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| HttpError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty().push("users");
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        Ok(url)
    }

    fn request(&self, method: HttpMethod, url: Url) -> RequestBuilder {
        trace!("Building {} request to {}", method, url);
        self.client.request(method.into(), url)
    }

    /// Send and read the whole response so latency covers the body too
    async fn send(&self, request: RequestBuilder) -> Result<TargetResponse, HttpError> {
        let response = request.send().await?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            None
        } else {
            serde_json::from_slice::<JsonValue>(&bytes).ok()
        };

        trace!("HTTP response received: {} ({} bytes)", status, bytes.len());
        Ok(TargetResponse {
            status,
            body,
            location,
        })
    }
}

#[async_trait::async_trait]
impl UsersTarget for HttpTarget {
    async fn create_user(&self, payload: &UserPayload) -> Result<TargetResponse, HttpError> {
        let url = self.users_url(None)?;
        self.send(self.request(HttpMethod::Post, url).json(payload))
            .await
    }

    async fn list_users(&self) -> Result<TargetResponse, HttpError> {
        let url = self.users_url(None)?;
        self.send(self.request(HttpMethod::Get, url)).await
    }

    async fn update_user(
        &self,
        id: &ResourceId,
        payload: &UserPayload,
    ) -> Result<TargetResponse, HttpError> {
        let url = self.users_url(Some(id))?;
        self.send(self.request(HttpMethod::Put, url).json(payload))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload() -> UserPayload {
        UserPayload {
            name: "Load Test".to_string(),
            username: "load_1_1".to_string(),
            email: "load_1_1@example.com".to_string(),
            date_of_birth: Some("1990-01-01".to_string()),
            gender: Some("other".to_string()),
            location: Some("VU 1".to_string()),
        }
    }

    fn target(server: &MockServer) -> HttpTarget {
        HttpTarget::new(&server.uri(), HttpConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_create_user_returns_status_and_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(json!({"username": "load_1_1", "dateOfBirth": "1990-01-01"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "u-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let response = target(&server).create_user(&payload()).await.unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.resource_id().unwrap().as_str(), "u-1");
    }

    #[tokio::test]
    async fn test_create_user_location_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(201).insert_header("Location", "/users/17"))
            .mount(&server)
            .await;

        let response = target(&server).create_user(&payload()).await.unwrap();
        assert!(response.body.is_none());
        assert_eq!(response.resource_id().unwrap().as_str(), "17");
    }

    #[tokio::test]
    async fn test_error_status_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let response = target(&server).list_users().await.unwrap();
        assert_eq!(response.status, 503);
        assert!(response.body.is_none());
    }

    #[tokio::test]
    async fn test_update_user_path() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/users/abc%201"))
            .and(body_partial_json(json!({"email": "load_1_1@example.com"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "abc 1"})))
            .expect(1)
            .mount(&server)
            .await;

        let response = target(&server)
            .update_user(&ResourceId::new("abc 1"), &payload())
            .await
            .unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_base_path_prefix_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let target =
            HttpTarget::new(&format!("{}/api/v1/", server.uri()), HttpConfig::default()).unwrap();
        let response = target.list_users().await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, Some(json!([])));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let config = HttpConfig {
            timeout: Duration::from_millis(50),
            ..HttpConfig::default()
        };
        let target = HttpTarget::new(&server.uri(), config).unwrap();
        let error = target.list_users().await.unwrap_err();
        assert!(error.is_timeout(), "unexpected error: {}", error);
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpTarget::new("not a url", HttpConfig::default()),
            Err(HttpError::InvalidUrl(_))
        ));
        assert!(HttpTarget::new("mailto:someone@example.com", HttpConfig::default()).is_err());
    }

    #[test]
    fn test_from_target_config() {
        let config = TargetConfig {
            base_url: "http://localhost:3000".to_string(),
            timeout: Duration::from_secs(5),
            ..TargetConfig::default()
        };
        let target = HttpTarget::from_config(&config).unwrap();
        assert_eq!(target.config().timeout, Duration::from_secs(5));
        assert_eq!(target.base_url().as_str(), "http://localhost:3000/");
    }
}
