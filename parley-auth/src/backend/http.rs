//! HTTP backend
//!
//! Maps the backend contract onto the Parley REST API, translating HTTP
//! status codes into the auth error taxonomy.

use super::{AuthBackend, LoginResponse};
use crate::scope::{Conversation, Directory, Group};
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use parley_core::{Identity, ServerConfig};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// REST implementation of [`AuthBackend`]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevokeResponse {
    affected_count: usize,
}

impl HttpBackend {
    /// Create a backend against the given base URL
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AuthResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AuthError::network_with_source("Failed to build HTTP client", Box::new(e))
            })?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> AuthResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| AuthError::network_with_source("Request failed", Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = %status, "Backend returned error status");
            return Err(map_status(status));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AuthError::network_with_source("Malformed response body", Box::new(e)))
    }

    async fn execute_empty(&self, request: reqwest::RequestBuilder) -> AuthResult<()> {
        let response = request
            .send()
            .await
            .map_err(|e| AuthError::network_with_source("Request failed", Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status(status));
        }
        Ok(())
    }
}

/// Translate an HTTP error status into the auth taxonomy
fn map_status(status: StatusCode) -> AuthError {
    match status {
        StatusCode::UNAUTHORIZED => AuthError::Unauthorized,
        StatusCode::FORBIDDEN => AuthError::forbidden("Rejected by backend"),
        StatusCode::NOT_FOUND => AuthError::not_found("Referenced resource"),
        StatusCode::LOCKED => AuthError::AccountLocked,
        StatusCode::SERVICE_UNAVAILABLE => AuthError::UnderMaintenance,
        _ => AuthError::network(format!("Unexpected status: {}", status)),
    }
}

#[async_trait]
impl AuthBackend for HttpBackend {
    async fn fetch_config(&self) -> AuthResult<ServerConfig> {
        self.execute(self.client.get(self.url("/api/config"))).await
    }

    async fn implicit_login(&self) -> AuthResult<LoginResponse> {
        self.execute(self.client.post(self.url("/api/auth/implicit")))
            .await
    }

    async fn login(&self, email: &str, password: &str) -> AuthResult<LoginResponse> {
        let request = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }));

        // A credential rejection is not a session-token problem
        self.execute(request).await.map_err(|e| match e {
            AuthError::Unauthorized => AuthError::InvalidCredentials,
            other => other,
        })
    }

    async fn verify_sso(&self) -> AuthResult<LoginResponse> {
        let request = self.client.post(self.url("/api/auth/sso/verify"));

        self.execute(request).await.map_err(|e| match e {
            AuthError::Unauthorized | AuthError::Forbidden { .. } => {
                AuthError::sso_failed("Trust assertion rejected by backend")
            }
            other => other,
        })
    }

    async fn verify_token(&self, token: &str) -> AuthResult<Identity> {
        self.execute(
            self.client
                .get(self.url("/api/auth/verify"))
                .bearer_auth(token),
        )
        .await
    }

    async fn logout(&self, token: &str) -> AuthResult<()> {
        self.execute_empty(
            self.client
                .post(self.url("/api/auth/logout"))
                .bearer_auth(token),
        )
        .await
    }

    async fn fetch_directory(&self, token: &str) -> AuthResult<Directory> {
        self.execute(
            self.client
                .get(self.url("/api/directory"))
                .bearer_auth(token),
        )
        .await
    }

    async fn create_group(&self, token: &str, name: &str) -> AuthResult<Group> {
        self.execute(
            self.client
                .post(self.url("/api/groups"))
                .bearer_auth(token)
                .json(&json!({ "name": name })),
        )
        .await
    }

    async fn delete_group(&self, token: &str, group_id: &str) -> AuthResult<()> {
        self.execute_empty(
            self.client
                .delete(self.url(&format!("/api/groups/{}", group_id)))
                .bearer_auth(token),
        )
        .await
    }

    async fn delegate_manager(
        &self,
        token: &str,
        manager_id: &str,
        group_id: &str,
    ) -> AuthResult<()> {
        self.execute_empty(
            self.client
                .post(self.url(&format!("/api/groups/{}/managers", group_id)))
                .bearer_auth(token)
                .json(&json!({ "managerId": manager_id })),
        )
        .await
    }

    async fn revoke_delegation(
        &self,
        token: &str,
        manager_id: &str,
        group_id: &str,
    ) -> AuthResult<()> {
        self.execute_empty(
            self.client
                .delete(self.url(&format!(
                    "/api/groups/{}/managers/{}",
                    group_id, manager_id
                )))
                .bearer_auth(token),
        )
        .await
    }

    async fn move_conversation(
        &self,
        token: &str,
        conversation_id: &str,
        dest_group_id: &str,
    ) -> AuthResult<Conversation> {
        self.execute(
            self.client
                .post(self.url(&format!("/api/conversations/{}/move", conversation_id)))
                .bearer_auth(token)
                .json(&json!({ "groupId": dest_group_id })),
        )
        .await
    }

    async fn share_conversation(
        &self,
        token: &str,
        conversation_id: &str,
        group_id: &str,
    ) -> AuthResult<Conversation> {
        self.execute(
            self.client
                .post(self.url(&format!("/api/conversations/{}/share", conversation_id)))
                .bearer_auth(token)
                .json(&json!({ "groupId": group_id })),
        )
        .await
    }

    async fn unassign_group(
        &self,
        token: &str,
        conversation_id: &str,
    ) -> AuthResult<Conversation> {
        self.execute(
            self.client
                .post(self.url(&format!(
                    "/api/conversations/{}/unassign",
                    conversation_id
                )))
                .bearer_auth(token),
        )
        .await
    }

    async fn revoke_all_sessions(&self, token: &str) -> AuthResult<usize> {
        let response: RevokeResponse = self
            .execute(
                self.client
                    .post(self.url("/api/admin/revoke-sessions"))
                    .bearer_auth(token),
            )
            .await?;
        Ok(response.affected_count)
    }
}
