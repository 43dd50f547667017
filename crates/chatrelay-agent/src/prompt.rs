// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly: system message, prior turns, then the new user turn.

use chatrelay_core::{ChatMessage, ConversationEntry};

const TOPIC_WORDS: usize = 3;
const TOPIC_CHARS: usize = 20;

/// Short labels for earlier user turns: the first few words, capped in length.
pub fn recent_topics(entries: &[ConversationEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| {
            let words: Vec<&str> = e.user_text.split_whitespace().take(TOPIC_WORDS).collect();
            words.join(" ").chars().take(TOPIC_CHARS).collect::<String>()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

/// System message text: persona, optional topic hint, optional language directive.
pub fn system_prompt(persona: &str, topics: &[String], preferred_language: Option<&str>) -> String {
    let mut prompt = persona.trim().to_string();
    if !topics.is_empty() {
        prompt.push_str("\nRecent topics: ");
        prompt.push_str(&topics.join(", "));
    }
    if let Some(lang) = preferred_language {
        prompt.push_str(&format!("\nAlways reply in the language with code '{lang}'."));
    }
    prompt
}

/// Builds the message list sent to the backend.
pub fn build_messages(
    system: String,
    history: &[ConversationEntry],
    user_turn: String,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(ChatMessage::system(system));
    for entry in history {
        messages.push(ChatMessage::user(entry.user_text.clone()));
        messages.push(ChatMessage::assistant(entry.assistant_text.clone()));
    }
    messages.push(ChatMessage::user(user_turn));
    messages
}

/// Appends a translation of the user's text as extra context.
pub fn with_translation(original: &str, translated: &str) -> String {
    format!("{original}\n\n(Translation: {translated})")
}
