// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Script-based input language detection.
//!
//! Counts characters per Unicode script and picks the dominant one. Any kana
//! marks the text as Japanese, since Japanese also uses Han characters.

#[derive(Default)]
struct ScriptCounts {
    kana: usize,
    hangul: usize,
    han: usize,
    cyrillic: usize,
    thai: usize,
    arabic: usize,
}

impl ScriptCounts {
    fn of(text: &str) -> Self {
        let mut counts = Self::default();
        for c in text.chars() {
            match c as u32 {
                0x3040..=0x30FF | 0xFF66..=0xFF9F => counts.kana += 1,
                0xAC00..=0xD7AF | 0x1100..=0x11FF | 0x3130..=0x318F => counts.hangul += 1,
                0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0xF900..=0xFAFF => counts.han += 1,
                0x0400..=0x04FF => counts.cyrillic += 1,
                0x0E00..=0x0E7F => counts.thai += 1,
                0x0600..=0x06FF | 0x0750..=0x077F => counts.arabic += 1,
                _ => {}
            }
        }
        counts
    }
}

/// Best-guess language code for `text`. Latin and unrecognized scripts map to `en`.
pub fn detect_language(text: &str) -> &'static str {
    let counts = ScriptCounts::of(text);
    if counts.kana > 0 {
        return "ja";
    }
    [
        (counts.hangul, "ko"),
        (counts.han, "zh"),
        (counts.cyrillic, "ru"),
        (counts.thai, "th"),
        (counts.arabic, "ar"),
    ]
    .into_iter()
    .filter(|(n, _)| *n > 0)
    .max_by_key(|(n, _)| *n)
    .map(|(_, code)| code)
    .unwrap_or("en")
}

/// Compares a detected code with a configured one on the primary subtag, so `zh` matches `zh-TW`.
pub fn same_language(detected: &str, configured: &str) -> bool {
    let primary = configured.split(['-', '_']).next().unwrap_or(configured);
    primary.eq_ignore_ascii_case(detected)
}
