//! Client for the external auth service's current-user endpoint.

use serde::Deserialize;
use serde_json::Value;

use crate::config::AuthServiceConfig;
use crate::error::GateError;

const CURRENT_USER_PATH: &str = "/auth/v1/user";

/// An authenticated user as returned by the auth service. Opaque apart from `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser(pub Value);

impl AuthUser {
    /// The user's identifier, if the object carries a string `id`.
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }
}

/// Response envelope: `{ "data": { "user": object | null } }`.
#[derive(Debug, Deserialize)]
struct CurrentUserResponse {
    #[serde(default)]
    data: Option<CurrentUserData>,
}

#[derive(Debug, Deserialize)]
struct CurrentUserData {
    #[serde(default)]
    user: Option<Value>,
}

/// HTTP client for the auth service.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    endpoint: String,
    anon_key: String,
}

impl AuthClient {
    pub fn new(config: &AuthServiceConfig) -> Result<Self, GateError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}{CURRENT_USER_PATH}", config.url.trim_end_matches('/')),
            anon_key: config.anon_key.clone(),
        })
    }

    /// Look up the current user. `Ok(None)` means no session.
    pub async fn current_user(&self) -> Result<Option<AuthUser>, GateError> {
        let resp = self
            .http
            .get(&self.endpoint)
            .bearer_auth(&self.anon_key)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(GateError::Status(resp.status().as_u16()));
        }

        let body: CurrentUserResponse = resp.json().await?;
        Ok(body
            .data
            .and_then(|d| d.user)
            .filter(|u| !u.is_null())
            .map(AuthUser))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AuthClient {
        AuthClient::new(&AuthServiceConfig {
            url: format!("{}/", server.uri()),
            anon_key: "anon-key".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_current_user_present() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "user": { "id": "user-1", "email": "a@b.c" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let user = client_for(&server).current_user().await.unwrap().unwrap();
        assert_eq!(user.id(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_current_user_null_or_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "data": { "user": null } })),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.current_user().await.unwrap().is_none());
        assert!(client.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server).current_user().await.unwrap_err();
        assert!(matches!(err, GateError::Status(401)));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).current_user().await.unwrap_err();
        assert!(matches!(err, GateError::Request(_)));
    }
}
