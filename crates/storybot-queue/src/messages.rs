// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing texts.

use std::time::Duration;

use chrono::{DateTime, Utc};

pub const USAGE: &str = "🔗 Please send 1 of the next options:\n\n\
    username (with '@' symbol):\n@durov\n\n\
    or phone number (with '+' symbol):\n+71234567890\n\n\
    or the direct link to story:\nhttps://t.me/durov/s/1";

pub const INVALID_INPUT: &str = "🚫 Please send a valid link to user (username or phone number)";

pub const ONE_LINK_AT_ONCE: &str = "⚠️ Only 1 link can be proceeded at once, please be patient";

pub const FETCHING: &str = "⏳ Fetching stories...";
pub const STORY_FOUND: &str = "⚡️ Story founded successfully!";

pub const NOT_FOUND: &str = "🚫 Stories not found!";
pub const WRONG_LINK: &str = "🚫 Wrong link to user!";
pub const BROKEN_STORY_LINK: &str = "🚫 Something wrong with the link!";
pub const PRIVATE_PHONE: &str =
    "⚠️ if user keeps phone number private, the bot cannot get access to stories";

pub const RESTART_PROMPT: &str = "Are you sure?";
pub const RESTART_CONFIRM: &str = "Yes";
pub const RESTARTING: &str = "⏳ Restarting...";

/// Default caption of an uploaded item without its own caption.
pub const ACTIVE_CAPTION: &str = "Active stories";
pub const PINNED_CAPTION: &str = "Pinned stories";

/// Formats a remaining wait as `"M minute and S seconds"` or `"S seconds"`.
pub fn countdown(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    let (minutes, seconds) = (secs / 60, secs % 60);
    if minutes > 0 {
        format!("{minutes} minute and {seconds} seconds")
    } else {
        format!("{seconds} seconds")
    }
}

pub fn cooldown_wait(remaining: Duration) -> String {
    format!(
        "⏳ Please wait {}, your link will be processed right after\n\n\
         Note: the timer resets each time any user's link is processed (not just yours)",
        countdown(remaining)
    )
}

pub fn queue_position(ahead: usize) -> String {
    format!("⏳ Please wait for your turn, there're {ahead} users before you!")
}

pub fn rate_limited(wait: Duration) -> String {
    let minutes = (wait.as_secs() + 30) / 60;
    format!(
        "⚠️ There're too much requests from the users, please wait {minutes} minutes\n\n\
         (You can use the scheduled message feature btw)"
    )
}

pub fn stories_found(active: usize, pinned: usize) -> String {
    format!("⚡️ {active} Active stories found and\n📌 {pinned} Pinned ones!")
}

/// Status texts of one delivery category ("Active", "Pinned", ...).
pub fn category_downloading(category: &str) -> String {
    format!("⏳ Downloading {category} stories...")
}

pub fn category_downloaded(category: &str, count: usize) -> String {
    format!("📥 {count} {category} stories downloaded successfully!\n⏳ Uploading stories to Telegram...")
}

pub fn category_uploaded(category: &str, count: usize) -> String {
    format!("✅ {count} {category} stories uploaded!")
}

pub fn category_too_large(category: &str) -> String {
    format!(
        "❌ Cannot download {category} stories, most likely they have too large size to send them via bot"
    )
}

pub fn pinned_progress(uploaded: usize, total: usize) -> String {
    format!("Uploaded {uploaded}/{total} pinned stories ✅")
}

/// Label of the button requesting stories `from..=to` (1-based positions).
pub fn page_button(from: usize, to: usize) -> String {
    format!("📥 {from}-{to} 📥")
}

/// Caption of a single requested story: original caption plus post date.
pub fn particular_caption(caption: Option<&str>, date: DateTime<Utc>) -> String {
    let mut text = String::new();
    if let Some(caption) = caption.filter(|c| !c.is_empty()) {
        text.push_str(caption);
        text.push('\n');
    }
    text.push_str("\n📅 Post date: ");
    text.push_str(&date.format("%a, %d %b %Y %H:%M:%S GMT").to_string());
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn countdown_with_minutes() {
        assert_eq!(
            countdown(Duration::from_secs(4 * 60 + 7)),
            "4 minute and 7 seconds"
        );
    }

    #[test]
    fn countdown_seconds_only() {
        assert_eq!(countdown(Duration::from_millis(42_900)), "42 seconds");
        assert_eq!(countdown(Duration::ZERO), "0 seconds");
    }

    #[test]
    fn rate_limit_rounds_to_minutes() {
        assert!(rate_limited(Duration::from_secs(300)).contains("wait 5 minutes"));
        assert!(rate_limited(Duration::from_secs(89)).contains("wait 1 minutes"));
        assert!(rate_limited(Duration::from_secs(10)).contains("wait 0 minutes"));
    }

    #[test]
    fn particular_caption_keeps_original_text() {
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(
            particular_caption(Some("hello"), date),
            "hello\n\n📅 Post date: Fri, 01 Mar 2024 12:30:00 GMT"
        );
        assert_eq!(
            particular_caption(None, date),
            "\n📅 Post date: Fri, 01 Mar 2024 12:30:00 GMT"
        );
    }

    #[test]
    fn page_button_label() {
        assert_eq!(page_button(6, 10), "📥 6-10 📥");
    }
}
