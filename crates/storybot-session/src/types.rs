// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types exchanged with the userbot bridge.

use serde::{Deserialize, Serialize};
use storybot_core::{Entity, MediaRef, StoryId, StoryItem};

#[derive(Debug, Serialize)]
pub struct ResolveRequest<'a> {
    pub link: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ActiveRequest<'a> {
    pub entity: &'a Entity,
}

#[derive(Debug, Serialize)]
pub struct PinnedRequest<'a> {
    pub entity: &'a Entity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_id: Option<StoryId>,
}

#[derive(Debug, Serialize)]
pub struct ByIdRequest<'a> {
    pub entity: &'a Entity,
    pub ids: &'a [StoryId],
}

#[derive(Debug, Serialize)]
pub struct DownloadRequest<'a> {
    pub media: &'a MediaRef,
}

/// Response body of every story listing endpoint.
#[derive(Debug, Deserialize)]
pub struct StoriesResponse {
    #[serde(default)]
    pub stories: Vec<StoryItem>,
}

/// Error envelope returned by the bridge on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct BridgeErrorResponse {
    pub error: BridgeErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct BridgeErrorBody {
    /// Upstream error code, e.g. `FLOOD_WAIT` or `USERNAME_NOT_OCCUPIED`.
    pub code: String,
    #[serde(default)]
    pub message: String,
    /// Seconds to wait before the next request, for flood errors.
    #[serde(default)]
    pub retry_after: Option<u64>,
}
