// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of Telegram updates into [`InboundEvent`]s.

use storybot_core::{ChatId, InboundEvent, UserProfile};
use teloxide::types::{CallbackQuery, Message, User};

/// Copies the fields of a Telegram user that Storybot persists.
pub fn user_profile(user: &User) -> UserProfile {
    UserProfile {
        id: user.id.0 as i64,
        is_bot: user.is_bot,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        language_code: user.language_code.clone(),
    }
}

/// Converts a text message. Non-text messages (stickers, media) yield `None`.
pub fn text_event(msg: &Message) -> Option<InboundEvent> {
    let text = msg.text()?;
    Some(InboundEvent::Text {
        chat_id: ChatId(msg.chat.id.0),
        from: msg.from.as_ref().map(user_profile),
        text: text.trim().to_string(),
        received_at: msg.date,
    })
}

/// Converts an inline-button press.
///
/// The reply goes to the presser's private chat, which shares the user id.
pub fn callback_event(query: &CallbackQuery) -> Option<InboundEvent> {
    let data = query.data.as_deref()?;
    Some(InboundEvent::Action {
        chat_id: ChatId(query.from.id.0 as i64),
        from: user_profile(&query.from),
        data: data.to_string(),
        received_at: chrono::Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_private_message(user_id: u64, username: Option<&str>, text: &str) -> Message {
        let mut from = serde_json::json!({
            "id": user_id,
            "is_bot": false,
            "first_name": "Test",
            "language_code": "en",
        });
        if let Some(uname) = username {
            from["username"] = serde_json::json!(uname);
        }

        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": from,
            "text": text,
        });

        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    fn make_sticker_message() -> Message {
        let json = serde_json::json!({
            "message_id": 2,
            "date": 1700000000i64,
            "chat": {"id": 5i64, "type": "private", "first_name": "Test"},
            "from": {"id": 5, "is_bot": false, "first_name": "Test"},
            "location": {"latitude": 1.0, "longitude": 2.0},
        });
        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    fn make_callback(user_id: u64, data: Option<&str>) -> CallbackQuery {
        let mut json = serde_json::json!({
            "id": "cbq-1",
            "from": {"id": user_id, "is_bot": false, "first_name": "Test"},
            "chat_instance": "ci",
        });
        if let Some(d) = data {
            json["data"] = serde_json::json!(d);
        }
        serde_json::from_value(json).expect("failed to deserialize mock callback")
    }

    #[test]
    fn text_message_maps_fields() {
        let msg = make_private_message(12345, Some("tester"), "  @durov  ");
        let Some(InboundEvent::Text {
            chat_id,
            from,
            text,
            received_at,
        }) = text_event(&msg)
        else {
            panic!("expected a text event");
        };
        assert_eq!(chat_id, ChatId(12345));
        assert_eq!(text, "@durov");
        assert_eq!(received_at.timestamp(), 1700000000);
        let from = from.unwrap();
        assert_eq!(from.id, 12345);
        assert_eq!(from.username.as_deref(), Some("tester"));
        assert_eq!(from.language_code.as_deref(), Some("en"));
    }

    #[test]
    fn non_text_message_is_ignored() {
        assert!(text_event(&make_sticker_message()).is_none());
    }

    #[test]
    fn callback_uses_presser_id_as_chat() {
        let query = make_callback(777, Some("durov&[6,7]"));
        let Some(InboundEvent::Action { chat_id, from, data, .. }) = callback_event(&query) else {
            panic!("expected an action event");
        };
        assert_eq!(chat_id, ChatId(777));
        assert_eq!(from.id, 777);
        assert_eq!(data, "durov&[6,7]");
    }

    #[test]
    fn callback_without_data_is_ignored() {
        assert!(callback_event(&make_callback(1, None)).is_none());
    }
}
