// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the userbot bridge.
//!
//! The bridge owns the automated client session and exposes story reads as
//! JSON endpoints. [`BridgeClient`] maps them onto [`StorySource`] and turns
//! flood-control responses into [`StorybotError::RateLimited`]. It never
//! retries; pacing is the queue engine's job.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use storybot_config::model::SessionConfig;
use storybot_core::{
    AdapterType, Entity, HealthStatus, MediaRef, PluginAdapter, StoryId, StoryItem, StorySource,
    StorybotError,
};

use crate::types::{
    ActiveRequest, BridgeErrorResponse, ByIdRequest, DownloadRequest, PinnedRequest,
    ResolveRequest, StoriesResponse,
};

/// Wait assumed when the bridge reports a flood without saying how long.
const DEFAULT_FLOOD_WAIT: Duration = Duration::from_secs(60);

/// HTTP client for bridge communication.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    client: reqwest::Client,
    base_url: url::Url,
}

impl BridgeClient {
    /// Builds a client from the `[session]` config section.
    pub fn new(config: &SessionConfig) -> Result<Self, StorybotError> {
        let mut base_url = url::Url::parse(&config.bridge_url).map_err(|e| {
            StorybotError::Config(format!("invalid session.bridge_url: {e}"))
        })?;
        // Keep any path prefix when joining endpoint paths.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|e| {
                StorybotError::Config(format!("invalid session.api_key header value: {e}"))
            })?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| StorybotError::session("failed to build HTTP client", e))?;

        Ok(Self { client, base_url })
    }

    /// Builds a client and verifies the bridge is reachable and logged in.
    ///
    /// This is the initializer behind the process-wide session handle.
    pub async fn connect(config: &SessionConfig) -> Result<Arc<Self>, StorybotError> {
        let client = Self::new(config)?;
        match client.health_check().await? {
            HealthStatus::Healthy => {
                info!(bridge = %client.base_url, "session bridge connected");
                Ok(Arc::new(client))
            }
            HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason) => {
                Err(StorybotError::Session {
                    message: format!("session bridge not ready: {reason}"),
                    source: None,
                })
            }
        }
    }

    fn endpoint(&self, path: &str) -> Result<url::Url, StorybotError> {
        self.base_url
            .join(path)
            .map_err(|e| StorybotError::Internal(format!("bad bridge endpoint {path}: {e}")))
    }

    async fn post(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<reqwest::Response, StorybotError> {
        let response = self
            .client
            .post(self.endpoint(path)?)
            .json(body)
            .send()
            .await
            .map_err(|e| StorybotError::session(format!("request to {path} failed"), e))?;

        let status = response.status();
        debug!(%status, path, "bridge response received");

        if status.is_success() {
            Ok(response)
        } else {
            Err(error_from_response(path, response).await)
        }
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, StorybotError> {
        let body = self
            .post(path, body)
            .await?
            .text()
            .await
            .map_err(|e| StorybotError::session("failed to read response body", e))?;
        serde_json::from_str(&body)
            .map_err(|e| StorybotError::session(format!("failed to parse {path} response"), e))
    }
}

/// Classifies a non-2xx bridge response.
async fn error_from_response(path: &str, response: reqwest::Response) -> StorybotError {
    let status = response.status();
    let header_wait = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<BridgeErrorResponse>(&body).ok();

    let flood_code = parsed
        .as_ref()
        .is_some_and(|e| e.error.code.starts_with("FLOOD_WAIT"));
    if flood_code
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.as_u16() == 420
    {
        let secs = parsed
            .as_ref()
            .and_then(|e| e.error.retry_after)
            .or(header_wait);
        let wait = secs.map(Duration::from_secs).unwrap_or(DEFAULT_FLOOD_WAIT);
        warn!(path, ?wait, "bridge reported flood wait");
        return StorybotError::RateLimited { wait };
    }

    let detail = match &parsed {
        Some(e) => format!("{}: {}", e.error.code, e.error.message),
        None => format!("{status}: {body}"),
    };

    if status == StatusCode::NOT_FOUND {
        StorybotError::NotFound(detail)
    } else {
        StorybotError::Session {
            message: format!("bridge {path} returned {detail}"),
            source: None,
        }
    }
}

#[async_trait]
impl PluginAdapter for BridgeClient {
    fn name(&self) -> &str {
        "userbot-bridge"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Session
    }

    async fn health_check(&self) -> Result<HealthStatus, StorybotError> {
        let response = self
            .client
            .get(self.endpoint("health")?)
            .send()
            .await
            .map_err(|e| StorybotError::session("bridge health check failed", e))?;
        let status = response.status();
        Ok(if status.is_success() {
            HealthStatus::Healthy
        } else if status.is_server_error() {
            HealthStatus::Unhealthy(format!("bridge returned {status}"))
        } else {
            HealthStatus::Degraded(format!("bridge returned {status}"))
        })
    }

    async fn shutdown(&self) -> Result<(), StorybotError> {
        Ok(())
    }
}

#[async_trait]
impl StorySource for BridgeClient {
    async fn resolve_entity(&self, link: &str) -> Result<Entity, StorybotError> {
        self.post_json("entities/resolve", &ResolveRequest { link })
            .await
    }

    async fn fetch_active_stories(
        &self,
        entity: &Entity,
    ) -> Result<Vec<StoryItem>, StorybotError> {
        let response: StoriesResponse = self
            .post_json("stories/active", &ActiveRequest { entity })
            .await?;
        Ok(response.stories)
    }

    async fn fetch_pinned_stories(
        &self,
        entity: &Entity,
        offset_id: Option<StoryId>,
    ) -> Result<Vec<StoryItem>, StorybotError> {
        let response: StoriesResponse = self
            .post_json("stories/pinned", &PinnedRequest { entity, offset_id })
            .await?;
        Ok(response.stories)
    }

    async fn fetch_stories_by_id(
        &self,
        entity: &Entity,
        ids: &[StoryId],
    ) -> Result<Vec<StoryItem>, StorybotError> {
        let response: StoriesResponse = self
            .post_json("stories/by-id", &ByIdRequest { entity, ids })
            .await?;
        Ok(response.stories)
    }

    async fn download_media(&self, media: &MediaRef) -> Result<Vec<u8>, StorybotError> {
        let bytes = self
            .post("media/download", &DownloadRequest { media })
            .await?
            .bytes()
            .await
            .map_err(|e| StorybotError::session("failed to read media body", e))?;
        Ok(bytes.to_vec())
    }
}
