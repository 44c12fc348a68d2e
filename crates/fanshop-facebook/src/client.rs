// Graph API client (HTTP direct, no SDK)

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::config::GraphConfig;
use crate::token::{GraphErrorEnvelope, TokenCheck, TokenValidator};
use fanshop_types::TokenStatus;

#[derive(Debug, Deserialize)]
struct Identity {
    id: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PermissionList {
    #[serde(default)]
    data: Vec<Permission>,
}

#[derive(Debug, Deserialize)]
struct Permission {
    permission: String,
    status: String,
}

/// Thin client over the Graph API endpoints the back office needs
pub struct GraphClient {
    http_client: reqwest::Client,
    api_root: String,
}

impl GraphClient {
    pub fn new(config: &GraphConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            api_root: config.api_root(),
        })
    }

    /// GET `{root}/{path}` authenticated with `token`, returning the status and JSON body
    async fn get_json(
        &self,
        path: &str,
        token: &str,
        fields: Option<&str>,
    ) -> std::result::Result<(StatusCode, Value), String> {
        let url = format!("{}/{}", self.api_root, path);
        let mut request = self.http_client.get(&url).query(&[("access_token", token)]);
        if let Some(fields) = fields {
            request = request.query(&[("fields", fields)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("Network error calling Graph API: {}", e))?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| format!("Unreadable Graph API response (HTTP {}): {}", status, e))?;

        Ok((status, body))
    }

    /// Permissions currently granted to `token`. Failures yield an empty list.
    async fn granted_scopes(&self, token: &str) -> Vec<String> {
        match self.get_json("me/permissions", token, None).await {
            Ok((status, body)) if status.is_success() => {
                match serde_json::from_value::<PermissionList>(body) {
                    Ok(list) => list
                        .data
                        .into_iter()
                        .filter(|p| p.status == "granted")
                        .map(|p| p.permission)
                        .collect(),
                    Err(e) => {
                        tracing::warn!("Unexpected permissions payload: {}", e);
                        Vec::new()
                    }
                }
            }
            Ok((status, _)) => {
                tracing::warn!("Permission lookup failed with HTTP {}", status);
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Permission lookup failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl TokenValidator for GraphClient {
    async fn validate(&self, token: &str) -> TokenCheck {
        let token = token.trim();
        if token.is_empty() {
            return TokenCheck::invalid("Token is empty");
        }

        let (status, body) = match self.get_json("me", token, Some("id,name")).await {
            Ok(response) => response,
            Err(message) => {
                tracing::warn!("Token check failed: {}", message);
                return TokenCheck::invalid(message);
            }
        };

        if let Ok(envelope) = serde_json::from_value::<GraphErrorEnvelope>(body.clone()) {
            let check = envelope.error.to_check();
            tracing::info!(status = %check.status.as_str(), "Token rejected by Graph API");
            return check;
        }

        if !status.is_success() {
            return TokenCheck::invalid(format!("Graph API returned HTTP {}", status));
        }

        let identity = match serde_json::from_value::<Identity>(body) {
            Ok(identity) => identity,
            Err(e) => return TokenCheck::invalid(format!("Unexpected identity payload: {}", e)),
        };

        let scopes = self.granted_scopes(token).await;
        let message = match &identity.name {
            Some(name) => format!("Token valid for {} ({})", name, identity.id),
            None => format!("Token valid for {}", identity.id),
        };

        TokenCheck {
            status: TokenStatus::Valid,
            message,
            scopes,
            account_id: Some(identity.id),
            account_name: identity.name,
            checked_at: chrono::Utc::now(),
        }
    }
}
