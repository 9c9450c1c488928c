// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interpretation of inbound text and button data.

use url::Url;

use storybot_core::{LinkKind, StoryId, StorybotError};

/// Separator between the identity and the id list in button data.
const CONTINUATION_SEPARATOR: char = '&';

/// Telegram rejects inline button data longer than this.
pub const MAX_ACTION_DATA_BYTES: usize = 64;

/// A validated `<base>/<handle>/s/<id>` permalink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryLink {
    pub handle: String,
    pub story_id: StoryId,
}

/// Classifies user text as a story request target.
///
/// Returns `None` when the text is neither an identity nor a story link.
pub fn classify_text(text: &str, hosts: &[String]) -> Option<LinkKind> {
    let text = text.trim();
    if is_identity(text) {
        return Some(LinkKind::Identity);
    }
    parse_story_link(text, hosts)
        .ok()
        .map(|_| LinkKind::DirectLink)
}

fn is_identity(text: &str) -> bool {
    (text.starts_with('@') || text.starts_with('+'))
        && text.len() > 1
        && !text.chars().any(char::is_whitespace)
}

/// Parses a story permalink, accepting links with or without a scheme.
pub fn parse_story_link(link: &str, hosts: &[String]) -> Result<StoryLink, StorybotError> {
    let invalid = || StorybotError::InvalidLink(link.to_string());

    let candidate = if link.contains("://") {
        link.to_string()
    } else {
        format!("https://{link}")
    };
    let url = Url::parse(&candidate).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }

    let host = url.host_str().ok_or_else(invalid)?;
    if !hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
        return Err(invalid());
    }

    let segments: Vec<&str> = url
        .path_segments()
        .ok_or_else(invalid)?
        .filter(|s| !s.is_empty())
        .collect();
    match segments.as_slice() {
        [handle, "s", id] => {
            let story_id = id
                .parse::<StoryId>()
                .ok()
                .filter(|id| *id > 0)
                .ok_or_else(invalid)?;
            Ok(StoryLink {
                handle: (*handle).to_string(),
                story_id,
            })
        }
        _ => Err(invalid()),
    }
}

/// Encodes the data of a "download more" button.
pub fn encode_continuation(identity: &str, ids: &[StoryId]) -> String {
    let list = ids
        .iter()
        .map(StoryId::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("{identity}{CONTINUATION_SEPARATOR}[{list}]")
}

/// Splits `ids` into runs whose encoded button data fits in
/// [`MAX_ACTION_DATA_BYTES`], keeping their order.
///
/// A run always holds at least one id, so a run can still be too long when
/// the identity itself nearly fills the limit.
pub fn split_continuation(identity: &str, ids: &[StoryId]) -> Vec<Vec<StoryId>> {
    let mut runs = Vec::new();
    let mut current: Vec<StoryId> = Vec::new();
    for &id in ids {
        current.push(id);
        if current.len() > 1
            && encode_continuation(identity, &current).len() > MAX_ACTION_DATA_BYTES
        {
            current.pop();
            runs.push(std::mem::replace(&mut current, vec![id]));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Decodes `<identity>&<json id array>` button data.
pub fn parse_continuation(data: &str) -> Option<(String, Vec<StoryId>)> {
    let (identity, ids) = data.split_once(CONTINUATION_SEPARATOR)?;
    if !is_identity(identity) {
        return None;
    }
    let ids: Vec<StoryId> = serde_json::from_str(ids).ok()?;
    if ids.is_empty() {
        return None;
    }
    Some((identity.to_string(), ids))
}
