// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Story lookup for a dispatched task.
//!
//! [`FetchService::fetch`] never fails: every error is converted into a
//! user-facing [`FetchOutcome::Failure`] text at this boundary.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use storybot_core::{
    ChatTransport, Entity, LinkKind, SharedSession, StoryId, StoryItem, StorySource,
    StorybotError,
};

use crate::intake::parse_story_link;
use crate::messages;
use crate::notify::AdminNotifier;
use crate::settings::QueueSettings;
use crate::task::Task;

/// What the queue engine receives back from a fetch.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The task failed; the text is shown to the requester.
    Failure(String),
    Stories(StorySet),
}

/// Stories to deliver, grouped by category.
#[derive(Debug, Clone)]
pub struct StorySet {
    pub entity: Entity,
    pub particular: Option<StoryItem>,
    pub active: Vec<StoryItem>,
    pub pinned: Vec<StoryItem>,
    pub paginated: Vec<StoryItem>,
}

impl StorySet {
    fn new(entity: Entity) -> Self {
        Self {
            entity,
            particular: None,
            active: Vec::new(),
            pinned: Vec::new(),
            paginated: Vec::new(),
        }
    }
}

/// Looks up the stories a task asks for through the shared session.
pub struct FetchService {
    session: Arc<SharedSession<dyn StorySource>>,
    transport: Arc<dyn ChatTransport>,
    notifier: AdminNotifier,
    story_link_hosts: Vec<String>,
    fetch_delay: Duration,
}

impl FetchService {
    pub fn new(
        session: Arc<SharedSession<dyn StorySource>>,
        transport: Arc<dyn ChatTransport>,
        notifier: AdminNotifier,
        settings: &QueueSettings,
    ) -> Self {
        Self {
            session,
            transport,
            notifier,
            story_link_hosts: settings.story_link_hosts.clone(),
            fetch_delay: settings.fetch_delay,
        }
    }

    /// Fetches by cursor, by identity or by direct link.
    ///
    /// Never fails: errors come back as [`FetchOutcome::Failure`] carrying
    /// the text to show the requester.
    pub async fn fetch(&self, task: &Task) -> FetchOutcome {
        match task.kind {
            LinkKind::DirectLink => match self.fetch_particular(task).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(link = task.link.as_str(), error = %e, "story link lookup failed");
                    FetchOutcome::Failure(match e.rate_limit_wait() {
                        Some(wait) => messages::rate_limited(wait),
                        None => messages::BROKEN_STORY_LINK.to_string(),
                    })
                }
            },
            LinkKind::Identity => match self.fetch_identity(task).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(link = task.link.as_str(), error = %e, "story lookup failed");
                    FetchOutcome::Failure(classify_failure(&e, &task.link))
                }
            },
        }
    }

    async fn fetch_identity(&self, task: &Task) -> Result<FetchOutcome, StorybotError> {
        let source = self.session.get().await?;
        let entity = source.resolve_entity(&task.link).await?;

        self.announce(task, messages::FETCHING).await;

        if let Some(ids) = &task.cursor {
            let stories = source.fetch_stories_by_id(&entity, ids).await?;
            if stories.is_empty() {
                return Ok(FetchOutcome::Failure(messages::NOT_FOUND.to_string()));
            }
            debug!(count = stories.len(), "continuation stories fetched");
            let mut set = StorySet::new(entity);
            set.paginated = stories;
            return Ok(FetchOutcome::Stories(set));
        }

        let active = source.fetch_active_stories(&entity).await?;
        tokio::time::sleep(self.fetch_delay).await;

        let pinned = self.fetch_all_pinned(source.as_ref(), &entity).await?;
        let pinned = without_active(pinned, &active);

        if active.is_empty() && pinned.is_empty() {
            return Ok(FetchOutcome::Failure(messages::NOT_FOUND.to_string()));
        }

        info!(
            link = task.link.as_str(),
            active = active.len(),
            pinned = pinned.len(),
            "stories found"
        );
        let found = messages::stories_found(active.len(), pinned.len());
        task.status_messages
            .post(self.transport.as_ref(), task.chat_id, &found)
            .await;
        self.notifier.info(task, &found).await;

        let mut set = StorySet::new(entity);
        set.active = active;
        set.pinned = pinned;
        Ok(FetchOutcome::Stories(set))
    }

    /// Walks pinned pages from newest to oldest until an empty page, a
    /// failed request or an offset that stops moving.
    async fn fetch_all_pinned(
        &self,
        source: &dyn StorySource,
        entity: &Entity,
    ) -> Result<Vec<StoryItem>, StorybotError> {
        let mut pinned = source.fetch_pinned_stories(entity, None).await?;
        tokio::time::sleep(self.fetch_delay).await;

        let mut seen: HashSet<StoryId> = pinned.iter().map(|s| s.id).collect();
        let mut offset = pinned.last().map(|s| s.id);

        while let Some(current) = offset {
            let page = match source.fetch_pinned_stories(entity, Some(current)).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        offset_id = current,
                        error = %e,
                        "pinned page request failed, keeping earlier pages"
                    );
                    break;
                }
            };
            tokio::time::sleep(self.fetch_delay).await;

            offset = page.last().map(|s| s.id).filter(|next| *next < current);
            pinned.extend(page.into_iter().filter(|s| seen.insert(s.id)));
        }

        Ok(pinned)
    }

    async fn fetch_particular(&self, task: &Task) -> Result<FetchOutcome, StorybotError> {
        let link = parse_story_link(&task.link, &self.story_link_hosts)?;
        let source = self.session.get().await?;
        let entity = source.resolve_entity(&link.handle).await?;

        let story = source
            .fetch_stories_by_id(&entity, &[link.story_id])
            .await?
            .into_iter()
            .find(|s| s.id == link.story_id)
            .ok_or_else(|| StorybotError::NotFound(format!("story {}", link.story_id)))?;

        self.announce(task, messages::STORY_FOUND).await;

        let mut set = StorySet::new(entity);
        set.particular = Some(story);
        Ok(FetchOutcome::Stories(set))
    }

    /// Posts the transient "processing started" message and the admin notice.
    async fn announce(&self, task: &Task, text: &str) {
        task.status_messages
            .post(self.transport.as_ref(), task.chat_id, text)
            .await;
        self.notifier.task_started(task).await;
    }
}

/// Maps a lookup error onto the text shown to the requester.
pub fn classify_failure(error: &StorybotError, link: &str) -> String {
    if let Some(wait) = error.rate_limit_wait() {
        return messages::rate_limited(wait);
    }
    if link.starts_with('+') {
        return messages::PRIVATE_PHONE.to_string();
    }
    messages::WRONG_LINK.to_string()
}

/// Drops pinned stories that are also active.
fn without_active(pinned: Vec<StoryItem>, active: &[StoryItem]) -> Vec<StoryItem> {
    let active: HashSet<StoryId> = active.iter().map(|s| s.id).collect();
    pinned
        .into_iter()
        .filter(|s| !active.contains(&s.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use storybot_core::ChatId;
    use storybot_test_utils::{
        MockFailure, MockStorySource, MockTransport, SourceCall, photo, user, video,
    };

    const ADMIN: ChatId = ChatId(1000);
    const CHAT: ChatId = ChatId(5);

    fn fetch_service(
        source: MockStorySource,
    ) -> (Arc<MockTransport>, Arc<MockStorySource>, FetchService) {
        let transport = Arc::new(MockTransport::new());
        let source = Arc::new(source);
        let session: Arc<SharedSession<dyn StorySource>> =
            Arc::new(SharedSession::ready(source.clone() as Arc<dyn StorySource>));
        let settings = QueueSettings {
            admin_chat: ADMIN,
            ..QueueSettings::default()
        };
        let notifier = AdminNotifier::new(transport.clone(), ADMIN);
        let service = FetchService::new(session, transport.clone(), notifier, &settings);
        (transport, source, service)
    }

    fn identity_task(link: &str) -> Task {
        Task::new(CHAT, link, LinkKind::Identity).with_user(user(CHAT.0))
    }

    fn stories(outcome: FetchOutcome) -> StorySet {
        match outcome {
            FetchOutcome::Stories(set) => set,
            FetchOutcome::Failure(text) => panic!("unexpected failure: {text}"),
        }
    }

    fn failure(outcome: FetchOutcome) -> String {
        match outcome {
            FetchOutcome::Failure(text) => text,
            FetchOutcome::Stories(set) => panic!("unexpected stories: {set:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn identity_fetch_collects_active_and_all_pinned_pages() {
        let source = MockStorySource::new()
            .with_active(vec![photo(20), video(21)])
            .with_pinned((1..=12).map(photo).chain([photo(20)]).collect())
            .with_pinned_page_size(5);
        let (transport, source, service) = fetch_service(source);
        let task = identity_task("@alice");

        let set = stories(service.fetch(&task).await);

        assert_eq!(set.active.len(), 2);
        let pinned: Vec<StoryId> = set.pinned.iter().map(|s| s.id).collect();
        assert_eq!(pinned, (1..=12).rev().collect::<Vec<_>>());

        let pinned_calls: Vec<SourceCall> = source
            .calls()
            .await
            .into_iter()
            .filter(|c| matches!(c, SourceCall::Pinned(_)))
            .collect();
        assert_eq!(
            pinned_calls,
            vec![
                SourceCall::Pinned(None),
                SourceCall::Pinned(Some(9)),
                SourceCall::Pinned(Some(4)),
                SourceCall::Pinned(Some(1)),
            ]
        );

        let texts = transport.texts_to(CHAT).await;
        assert_eq!(texts[0], messages::FETCHING);
        assert_eq!(texts[1], messages::stories_found(2, 12));
        assert_eq!(task.status_messages.len().await, 2);
        assert_eq!(transport.texts_to(ADMIN).await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pinned_page_failure_keeps_earlier_pages() {
        let source = MockStorySource::new()
            .with_pinned((1..=8).map(photo).collect())
            .with_pinned_page_size(3)
            .fail_pinned_at(Some(3), MockFailure::Session);
        let (_transport, _source, service) = fetch_service(source);

        let set = stories(service.fetch(&identity_task("@alice")).await);
        assert_eq!(set.pinned.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn pinned_paging_stops_when_offset_does_not_advance() {
        let source = MockStorySource::new()
            .with_pinned((1..=8).map(photo).collect())
            .with_pinned_page_size(3)
            .ignoring_pinned_offset();
        let (_transport, source, service) = fetch_service(source);

        let set = stories(service.fetch(&identity_task("@alice")).await);

        let pinned: Vec<StoryId> = set.pinned.iter().map(|s| s.id).collect();
        assert_eq!(pinned, vec![8, 7, 6]);
        let pinned_calls: Vec<SourceCall> = source
            .calls()
            .await
            .into_iter()
            .filter(|c| matches!(c, SourceCall::Pinned(_)))
            .collect();
        assert_eq!(
            pinned_calls,
            vec![SourceCall::Pinned(None), SourceCall::Pinned(Some(6))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn continuation_fetches_exact_ids() {
        let source = MockStorySource::new().with_pinned((1..=8).map(photo).collect());
        let (_transport, source, service) = fetch_service(source);
        let task = identity_task("@alice").with_cursor(vec![3, 2]);

        let set = stories(service.fetch(&task).await);
        assert_eq!(set.paginated.iter().map(|s| s.id).collect::<Vec<_>>(), vec![3, 2]);
        assert!(set.active.is_empty() && set.pinned.is_empty());
        assert!(!source.calls().await.contains(&SourceCall::Active));
    }

    #[tokio::test(start_paused = true)]
    async fn continuation_with_vanished_stories_is_not_found() {
        let (_transport, _source, service) = fetch_service(MockStorySource::new());
        let task = identity_task("@alice").with_cursor(vec![3]);
        assert_eq!(failure(service.fetch(&task).await), messages::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn no_stories_is_not_found() {
        let (transport, _source, service) = fetch_service(MockStorySource::new());
        assert_eq!(
            failure(service.fetch(&identity_task("@alice")).await),
            messages::NOT_FOUND
        );
        assert_eq!(transport.texts_to(CHAT).await, vec![messages::FETCHING]);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_classified() {
        let rate_limited = MockStorySource::new()
            .fail_active(MockFailure::RateLimited(Duration::from_secs(600)));
        let (_t, _s, service) = fetch_service(rate_limited);
        assert!(failure(service.fetch(&identity_task("+123")).await).contains("wait 10 minutes"));

        let unknown = MockStorySource::new().fail_resolve(MockFailure::NotFound);
        let (_t, _s, service) = fetch_service(unknown);
        assert_eq!(
            failure(service.fetch(&identity_task("+123")).await),
            messages::PRIVATE_PHONE
        );
        assert_eq!(
            failure(service.fetch(&identity_task("@nobody")).await),
            messages::WRONG_LINK
        );
    }

    #[tokio::test(start_paused = true)]
    async fn direct_link_fetches_one_story() {
        let source = MockStorySource::new().with_active(vec![photo(42)]);
        let (transport, source, service) = fetch_service(source);
        let task = Task::new(CHAT, "https://t.me/alice/s/42", LinkKind::DirectLink);

        let set = stories(service.fetch(&task).await);
        assert_eq!(set.particular.map(|s| s.id), Some(42));
        assert_eq!(transport.texts_to(CHAT).await, vec![messages::STORY_FOUND]);
        assert!(source.calls().await.contains(&SourceCall::Resolve("alice".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn direct_link_to_missing_story_fails_immediately() {
        let (transport, _source, service) = fetch_service(MockStorySource::new());
        let task = Task::new(CHAT, "https://t.me/alice/s/42", LinkKind::DirectLink);

        assert_eq!(failure(service.fetch(&task).await), messages::BROKEN_STORY_LINK);
        assert!(transport.calls().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_direct_link_never_reaches_the_session() {
        let (_transport, source, service) = fetch_service(MockStorySource::new());
        let task = Task::new(CHAT, "https://t.me/alice", LinkKind::DirectLink);
        assert_eq!(failure(service.fetch(&task).await), messages::BROKEN_STORY_LINK);
        assert!(source.calls().await.is_empty());
    }

    proptest! {
        #[test]
        fn pinned_excludes_every_active_id(
            active in proptest::collection::btree_set(1i32..40, 0..15),
            pinned in proptest::collection::btree_set(1i32..40, 0..25),
        ) {
            let active: Vec<StoryItem> = active.into_iter().map(photo).collect();
            let raw: Vec<StoryItem> = pinned.into_iter().map(photo).collect();
            let shared = raw.iter().filter(|p| active.iter().any(|a| a.id == p.id)).count();

            let result = without_active(raw.clone(), &active);

            prop_assert!(result.iter().all(|p| active.iter().all(|a| a.id != p.id)));
            prop_assert_eq!(result.len(), raw.len() - shared);
        }
    }
}
