// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Upload of fetched stories to the requester.
//!
//! Categories are delivered in a fixed order (particular, active, pinned,
//! paginated). A failing category is reported to the admin chat and the
//! next one proceeds. [`DeliveryService::deliver`] itself never fails.

use std::sync::Arc;

use tracing::{debug, info, warn};

use storybot_core::{
    ActionButton, ChatTransport, Entity, MediaItem, MediaKind, MessageRef, SendOptions,
    SharedSession, StoryId, StorySource, StorybotError,
};

use crate::fetch::StorySet;
use crate::intake::{MAX_ACTION_DATA_BYTES, encode_continuation, split_continuation};
use crate::media::{DownloadPolicy, StoryRecord, chunk, download_all, map_stories};
use crate::messages;
use crate::notify::AdminNotifier;
use crate::settings::QueueSettings;
use crate::task::Task;

const BUTTONS_PER_ROW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Particular,
    Active,
    Pinned,
    Paginated,
}

impl Category {
    /// Name shown to the requester.
    fn label(self) -> &'static str {
        match self {
            Self::Particular => "Requested",
            Self::Active => "Active",
            Self::Pinned | Self::Paginated => "Pinned",
        }
    }

    /// Name used in admin notices and logs.
    fn name(self) -> &'static str {
        match self {
            Self::Particular => "particular",
            Self::Active => "active",
            Self::Pinned => "pinned",
            Self::Paginated => "paginated",
        }
    }

    fn default_caption(self) -> Option<&'static str> {
        match self {
            Self::Particular => None,
            Self::Active => Some(messages::ACTIVE_CAPTION),
            Self::Pinned | Self::Paginated => Some(messages::PINNED_CAPTION),
        }
    }
}

pub struct DeliveryService {
    session: Arc<SharedSession<dyn StorySource>>,
    transport: Arc<dyn ChatTransport>,
    notifier: AdminNotifier,
    settings: QueueSettings,
}

impl DeliveryService {
    pub fn new(
        session: Arc<SharedSession<dyn StorySource>>,
        transport: Arc<dyn ChatTransport>,
        notifier: AdminNotifier,
        settings: QueueSettings,
    ) -> Self {
        Self {
            session,
            transport,
            notifier,
            settings,
        }
    }

    pub async fn deliver(&self, task: &Task, set: StorySet) {
        let source = match self.session.get().await {
            Ok(source) => source,
            Err(e) => {
                warn!(error = %e, "session unavailable for delivery");
                self.notifier.error(task, &e.to_string()).await;
                return;
            }
        };
        let source = source.as_ref();
        let StorySet {
            entity,
            particular,
            active,
            pinned,
            paginated,
        } = set;

        if let Some(story) = particular {
            let mut records = map_stories(std::slice::from_ref(&story));
            for record in &mut records {
                record.caption = Some(messages::particular_caption(
                    record.caption.as_deref(),
                    record.date,
                ));
            }
            let policy = self.active_policy();
            let result = self
                .upload(source, task, Category::Particular, records, policy)
                .await;
            self.report(task, Category::Particular, result).await;
        }

        if !active.is_empty() {
            let records = map_stories(&active);
            let policy = self.active_policy();
            let result = self
                .upload(source, task, Category::Active, records, policy)
                .await;
            self.report(task, Category::Active, result).await;
        }

        if !pinned.is_empty() {
            let result = self.deliver_pinned(source, task, &entity, map_stories(&pinned)).await;
            self.report(task, Category::Pinned, result).await;
        }

        if !paginated.is_empty() {
            let records = map_stories(&paginated);
            let policy = self.pinned_policy();
            let result = self
                .upload(source, task, Category::Paginated, records, policy)
                .await;
            self.report(task, Category::Paginated, result).await;
        }
    }

    /// Uploads the first page of pinned stories and offers the rest as
    /// continuation buttons.
    async fn deliver_pinned(
        &self,
        source: &dyn StorySource,
        task: &Task,
        entity: &Entity,
        mut records: Vec<StoryRecord>,
    ) -> Result<usize, StorybotError> {
        // Listings may omit media; the kind is only known after a refetch.
        fill_missing_media(source, entity, &mut records).await?;
        records.sort_by_key(|r| r.kind != MediaKind::Photo);

        let total = records.len();
        let page_size = self.settings.pinned_page_size.max(1);
        let later_pages: Vec<Vec<StoryId>> = records
            .get(page_size..)
            .unwrap_or_default()
            .chunks(page_size)
            .map(|page| page.iter().map(|r| r.id).collect())
            .collect();
        records.truncate(page_size);

        let uploaded = self
            .upload(source, task, Category::Pinned, records, self.pinned_policy())
            .await?;

        if !later_pages.is_empty() {
            let buttons = page_buttons(&task.link, page_size, &later_pages);
            let text = messages::pinned_progress(page_size.min(total), total);
            self.transport
                .send_message(task.chat_id, &text, SendOptions::default().with_buttons(buttons))
                .await?;
        }

        Ok(uploaded)
    }

    /// Downloads, filters, packs and uploads one category.
    ///
    /// Returns the number of uploaded items.
    async fn upload(
        &self,
        source: &dyn StorySource,
        task: &Task,
        category: Category,
        mut records: Vec<StoryRecord>,
        policy: DownloadPolicy,
    ) -> Result<usize, StorybotError> {
        let chat = task.chat_id;
        let label = category.label();
        let status = task
            .status_messages
            .post(self.transport.as_ref(), chat, &messages::category_downloading(label))
            .await;

        debug!(category = category.name(), count = records.len(), "downloading stories");
        download_all(source, &mut records, policy).await;

        let eligible: Vec<StoryRecord> = records
            .into_iter()
            .filter(|r| r.is_uploadable(self.settings.item_limit_mb))
            .collect();
        let count = eligible.len();
        self.update_status(task, status, &messages::category_downloaded(label, count))
            .await;

        if eligible.is_empty() {
            self.transport
                .send_message(chat, &messages::category_too_large(label), SendOptions::default())
                .await?;
            self.report_uploaded(task, category, 0).await;
            return Ok(0);
        }

        for batch in chunk(eligible, self.settings.album_max_items, self.settings.album_limit_mb) {
            let items: Vec<MediaItem> = batch
                .into_iter()
                .filter_map(|r| r.into_media_item(category.default_caption()))
                .collect();
            self.transport.send_media_group(chat, items).await?;
        }

        self.update_status(task, status, &messages::category_uploaded(label, count))
            .await;
        info!(category = category.name(), count, chat_id = %chat, "stories uploaded");
        self.report_uploaded(task, category, count).await;
        Ok(count)
    }

    async fn report_uploaded(&self, task: &Task, category: Category, count: usize) {
        self.notifier
            .info(
                task,
                &format!("📥 {count} {} stories uploaded to user!", category.name()),
            )
            .await;
    }

    async fn report(&self, task: &Task, category: Category, result: Result<usize, StorybotError>) {
        if let Err(e) = result {
            warn!(category = category.name(), error = %e, "story delivery failed");
            self.notifier
                .error(task, &format!("{} stories: {e}", category.name()))
                .await;
        }
    }

    /// Edits the category status message, or posts a new one if the first
    /// could not be sent.
    async fn update_status(&self, task: &Task, status: Option<MessageRef>, text: &str) {
        match status {
            Some(message) => {
                if let Err(e) = self
                    .transport
                    .edit_message_text(task.chat_id, message, text)
                    .await
                {
                    warn!(error = %e, "failed to update status message");
                }
            }
            None => {
                task.status_messages
                    .post(self.transport.as_ref(), task.chat_id, text)
                    .await;
            }
        }
    }

    fn active_policy(&self) -> DownloadPolicy {
        DownloadPolicy::active(self.settings.download_delay)
    }

    fn pinned_policy(&self) -> DownloadPolicy {
        DownloadPolicy::pinned(self.settings.pinned_video_timeout, self.settings.download_delay)
    }
}

/// Replaces records listed without media with their full version.
async fn fill_missing_media(
    source: &dyn StorySource,
    entity: &Entity,
    records: &mut [StoryRecord],
) -> Result<(), StorybotError> {
    let missing: Vec<StoryId> = records
        .iter()
        .filter(|r| r.media.is_none())
        .map(|r| r.id)
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    debug!(count = missing.len(), "refetching stories without media");
    let full = source.fetch_stories_by_id(entity, &missing).await?;
    for record in records.iter_mut().filter(|r| r.media.is_none()) {
        if let Some(item) = full.iter().find(|item| item.id == record.id) {
            *record = StoryRecord::from_item(item);
        }
    }
    Ok(())
}

/// Buttons for the remaining pages, three per row.
///
/// A page whose button data would exceed Telegram's limit is split across
/// several buttons.
fn page_buttons(
    identity: &str,
    page_size: usize,
    pages: &[Vec<StoryId>],
) -> Vec<Vec<ActionButton>> {
    let mut buttons = Vec::new();
    for (index, page) in pages.iter().enumerate() {
        let mut from = page_size * (index + 1) + 1;
        for run in split_continuation(identity, page) {
            let to = from + run.len() - 1;
            let data = encode_continuation(identity, &run);
            if data.len() > MAX_ACTION_DATA_BYTES {
                warn!(identity, bytes = data.len(), "button data too long, skipping page button");
            } else {
                buttons.push(ActionButton::new(messages::page_button(from, to), data));
            }
            from = to + 1;
        }
    }
    buttons
        .chunks(BUTTONS_PER_ROW)
        .map(<[ActionButton]>::to_vec)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use storybot_core::{ChatId, LinkKind, StoryItem};
    use storybot_test_utils::{
        MIB, MockStorySource, MockTransport, SourceCall, photo, user, video,
    };

    const ADMIN: ChatId = ChatId(1000);
    const CHAT: ChatId = ChatId(5);

    struct Fixture {
        transport: Arc<MockTransport>,
        source: Arc<MockStorySource>,
        service: DeliveryService,
    }

    fn fixture(source: MockStorySource) -> Fixture {
        let transport = Arc::new(MockTransport::new());
        let source = Arc::new(source);
        let session: Arc<SharedSession<dyn StorySource>> =
            Arc::new(SharedSession::ready(source.clone() as Arc<dyn StorySource>));
        let settings = QueueSettings {
            admin_chat: ADMIN,
            item_limit_mb: 2,
            album_limit_mb: 5,
            ..QueueSettings::default()
        };
        let notifier = AdminNotifier::new(transport.clone(), ADMIN);
        let service = DeliveryService::new(session, transport.clone(), notifier, settings);
        Fixture {
            transport,
            source,
            service,
        }
    }

    fn task() -> Task {
        Task::new(CHAT, "@alice", LinkKind::Identity).with_user(user(CHAT.0))
    }

    fn entity() -> Entity {
        Entity {
            id: 1,
            access_hash: Some(1),
            username: Some("alice".into()),
        }
    }

    fn set() -> StorySet {
        StorySet {
            entity: entity(),
            particular: None,
            active: Vec::new(),
            pinned: Vec::new(),
            paginated: Vec::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn active_stories_are_uploaded_as_albums() {
        let active: Vec<StoryItem> = (1..=12).map(photo).collect();
        let f = fixture(MockStorySource::new());
        let task = task();

        f.service
            .deliver(&task, StorySet { active, ..set() })
            .await;

        let albums = f.transport.albums_to(CHAT).await;
        let sizes: Vec<usize> = albums.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![10, 2]);
        assert_eq!(albums[0][0].caption.as_deref(), Some(messages::ACTIVE_CAPTION));

        let edits = f.transport.edits_in(CHAT).await;
        assert_eq!(
            edits,
            vec![
                messages::category_downloaded("Active", 12),
                messages::category_uploaded("Active", 12),
            ]
        );
        assert_eq!(task.status_messages.len().await, 1);
        let admin = f.transport.texts_to(ADMIN).await;
        assert!(admin[0].starts_with("📥 12 active stories uploaded to user\\!"));
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_items_are_excluded() {
        let source = MockStorySource::new().with_payload_size(2, 3 * MIB);
        let f = fixture(source);

        f.service
            .deliver(&task(), StorySet { active: vec![photo(1), photo(2), video(3)], ..set() })
            .await;

        let albums = f.transport.albums_to(CHAT).await;
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn albums_respect_size_ceiling() {
        let mut source = MockStorySource::new();
        for id in 1..=4 {
            source = source.with_payload_size(id, 2 * MIB);
        }
        let f = fixture(source);

        f.service
            .deliver(&task(), StorySet { active: (1..=4).map(photo).collect(), ..set() })
            .await;

        let sizes: Vec<usize> = f.transport.albums_to(CHAT).await.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_uploadable_sends_explanation() {
        let source = MockStorySource::new()
            .with_payload_size(1, 3 * MIB)
            .with_download_failure(2);
        let f = fixture(source);

        f.service
            .deliver(&task(), StorySet { active: vec![photo(1), photo(2)], ..set() })
            .await;

        assert!(f.transport.albums_to(CHAT).await.is_empty());
        let texts = f.transport.texts_to(CHAT).await;
        assert!(texts.contains(&messages::category_too_large("Active")));
        let admin = f.transport.texts_to(ADMIN).await;
        assert!(admin[0].starts_with("📥 0 active stories uploaded to user\\!"));
    }

    #[tokio::test(start_paused = true)]
    async fn pinned_first_page_is_photo_first_with_buttons() {
        let pinned: Vec<StoryItem> = vec![
            video(13),
            photo(12),
            video(11),
            photo(10),
            video(9),
            photo(8),
            video(7),
            photo(6),
            video(5),
            video(4),
            video(3),
            video(2),
            video(1),
        ];
        let f = fixture(MockStorySource::new());

        f.service
            .deliver(&task(), StorySet { pinned, ..set() })
            .await;

        let albums = f.transport.albums_to(CHAT).await;
        assert_eq!(albums.len(), 1);
        let kinds: Vec<MediaKind> = albums[0].iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MediaKind::Photo,
                MediaKind::Photo,
                MediaKind::Photo,
                MediaKind::Photo,
                MediaKind::Video,
            ]
        );

        let calls = f.transport.calls().await;
        let buttons = calls
            .iter()
            .find_map(|c| match c {
                storybot_test_utils::TransportCall::Sent { text, options, .. }
                    if text == &messages::pinned_progress(5, 13) =>
                {
                    Some(options.buttons.clone())
                }
                _ => None,
            })
            .expect("progress message with buttons");
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0][0].text, "📥 6-10 📥");
        assert_eq!(buttons[0][0].action_data, "@alice&[11,9,7,5,4]");
        assert_eq!(buttons[0][1].text, "📥 11-13 📥");
        assert_eq!(buttons[0][1].action_data, "@alice&[3,2,1]");
    }

    #[tokio::test(start_paused = true)]
    async fn pinned_items_without_media_are_refetched() {
        let source = MockStorySource::new()
            .with_pinned(vec![photo(1), photo(2)])
            .with_stripped_media(&[2]);
        let f = fixture(source);
        let mut listed = photo(2);
        listed.media = None;

        f.service
            .deliver(&task(), StorySet { pinned: vec![photo(1), listed], ..set() })
            .await;

        assert!(f.source.calls().await.contains(&SourceCall::ById(vec![2])));
        assert_eq!(f.transport.albums_to(CHAT).await[0].len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn refetched_photos_sort_ahead_of_videos() {
        let source = MockStorySource::new()
            .with_pinned(vec![video(9), video(8), photo(7)])
            .with_stripped_media(&[7]);
        let f = fixture(source);
        let mut listed = photo(7);
        listed.media = None;

        f.service
            .deliver(
                &task(),
                StorySet { pinned: vec![video(9), video(8), listed], ..set() },
            )
            .await;

        let kinds: Vec<MediaKind> = f.transport.albums_to(CHAT).await[0]
            .iter()
            .map(|m| m.kind)
            .collect();
        assert_eq!(kinds, vec![MediaKind::Photo, MediaKind::Video, MediaKind::Video]);
    }

    #[tokio::test(start_paused = true)]
    async fn particular_story_carries_post_date() {
        let mut story = photo(42);
        story.caption = Some("hi".into());
        let f = fixture(MockStorySource::new());

        f.service
            .deliver(&task(), StorySet { particular: Some(story), ..set() })
            .await;

        let albums = f.transport.albums_to(CHAT).await;
        assert_eq!(albums.len(), 1);
        let caption = albums[0][0].caption.clone().unwrap();
        assert!(caption.starts_with("hi\n\n📅 Post date: "));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_category_is_reported_and_next_proceeds() {
        let f = fixture(MockStorySource::new());
        f.transport.fail_media_groups(true);

        f.service
            .deliver(
                &task(),
                StorySet {
                    active: vec![photo(1)],
                    pinned: vec![photo(2)],
                    ..set()
                },
            )
            .await;

        let calls = f.source.calls().await;
        assert!(calls.contains(&SourceCall::Download("loc-1".into())));
        assert!(calls.contains(&SourceCall::Download("loc-2".into())));

        let errors: Vec<String> = f
            .transport
            .texts_to(ADMIN)
            .await
            .into_iter()
            .filter(|t| t.starts_with("🛑 ERROR 🛑"))
            .collect();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn buttons_wrap_after_three() {
        let pages: Vec<Vec<StoryId>> = (0..4).map(|p| vec![p * 10, p * 10 + 1]).collect();
        let rows = page_buttons("@bob", 5, &pages);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[1][0].text, "📥 21-22 📥");
    }

    #[test]
    fn long_identity_pages_fit_button_data() {
        let identity = format!("@{}", "a".repeat(32));
        let pages: Vec<Vec<StoryId>> = (12_000..12_020)
            .rev()
            .collect::<Vec<_>>()
            .chunks(10)
            .map(<[StoryId]>::to_vec)
            .collect();

        let buttons: Vec<ActionButton> = page_buttons(&identity, 10, &pages).concat();

        for button in &buttons {
            assert!(button.action_data.len() <= MAX_ACTION_DATA_BYTES);
        }
        let ids: Vec<StoryId> = buttons
            .iter()
            .flat_map(|b| crate::intake::parse_continuation(&b.action_data).unwrap().1)
            .collect();
        assert_eq!(ids, pages.concat());
        assert!(buttons[0].text.starts_with("📥 11-"));
        assert!(buttons.last().unwrap().text.ends_with("-30 📥"));
    }

    #[test]
    fn oversized_identity_gets_no_button() {
        let identity = format!("@{}", "a".repeat(60));
        assert!(page_buttons(&identity, 5, &[vec![1, 2]]).is_empty());
    }
}
