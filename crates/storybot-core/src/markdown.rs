// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MarkdownV2 escaping for text sent with [`TextMode::MarkdownV2`](crate::TextMode).
//!
//! Telegram requires 18 characters to be escaped outside code spans. Content
//! inside inline code or fenced blocks is left untouched so JSON payloads can
//! be shown verbatim.

/// Characters that must be escaped in MarkdownV2 outside code blocks.
const SPECIAL_CHARS: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escapes every MarkdownV2 special character, code spans included.
///
/// Use for untrusted fragments (user names, links) that are interpolated into
/// a larger MarkdownV2 message.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    for ch in text.chars() {
        if SPECIAL_CHARS.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Escapes the body of a MarkdownV2 code block (backslash and backtick only).
pub fn escape_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '\\' || ch == '`' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Escapes text for MarkdownV2 while preserving inline code and fenced blocks.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut result = String::with_capacity(text.len() * 2);
    let mut rest = text;

    while let Some(ch) = rest.chars().next() {
        if ch == '`' {
            let ticks = rest.chars().take_while(|c| *c == '`').count();
            let (fence, after) = rest.split_at(ticks);
            match ticks {
                1 | 3.. => {
                    // Copy through to the matching closing fence, or to the end.
                    let close = after.find(fence).map(|i| i + fence.len());
                    let end = close.unwrap_or(after.len());
                    result.push_str(fence);
                    result.push_str(&after[..end]);
                    rest = &after[end..];
                }
                _ => {
                    for _ in 0..ticks {
                        result.push_str("\\`");
                    }
                    rest = after;
                }
            }
        } else {
            if SPECIAL_CHARS.contains(&ch) {
                result.push('\\');
            }
            result.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string() {
        assert_eq!(escape_markdown_v2(""), "");
        assert_eq!(escape_text(""), "");
    }

    #[test]
    fn escapes_all_special_characters_without_backtick() {
        let input = "_*[]()~>#+-=|{}.!";
        let expected = "\\_\\*\\[\\]\\(\\)\\~\\>\\#\\+\\-\\=\\|\\{\\}\\.\\!";
        assert_eq!(escape_markdown_v2(input), expected);
    }

    #[test]
    fn escape_text_escapes_backticks_too() {
        assert_eq!(escape_text("a`b"), "a\\`b");
        assert_eq!(escape_text("+123"), "\\+123");
    }

    #[test]
    fn escape_code_only_touches_backslash_and_backtick() {
        assert_eq!(escape_code(r#"{"a":"x\"y`z.!"}"#), r#"{"a":"x\\"y\`z.!"}"#);
    }

    #[test]
    fn preserves_inline_code() {
        let result = escape_markdown_v2("Use `println!()` to print.");
        assert_eq!(result, "Use `println!()` to print\\.");
    }

    #[test]
    fn preserves_fenced_json_block() {
        let input = "🛑 ERROR 🛑\n```\n{\"id\":1,\"first_name\":\"a.b\"}\n```\nend.";
        let result = escape_markdown_v2(input);
        assert!(result.contains("{\"id\":1,\"first_name\":\"a.b\"}"));
        assert!(result.ends_with("end\\."));
    }

    #[test]
    fn unclosed_code_is_left_as_is() {
        assert_eq!(escape_markdown_v2("x `foo."), "x `foo.");
        assert_eq!(escape_markdown_v2("```\nno close."), "```\nno close.");
    }

    #[test]
    fn double_backtick_is_escaped() {
        assert_eq!(escape_markdown_v2("a``b"), "a\\`\\`b");
    }

    #[test]
    fn multibyte_text_is_preserved() {
        assert_eq!(escape_markdown_v2("📥 6-10 📥"), "📥 6\\-10 📥");
    }
}
