// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slash-command and keyword dispatch.
//!
//! Recognized input is answered locally and never reaches the language model.
//! Precedence: a leading `/` command, then a weather keyword as the first
//! word, then nothing.

use std::sync::Arc;

use chatrelay_core::{ConversationEntry, SettingsStore, UserSettings, WeatherService};
use chrono::Utc;
use tracing::{debug, warn};

use crate::history::ConversationHistory;

pub(crate) const HELP_TEXT: &str = "Available commands:\n\
/lang <code> - set the language I reply in (e.g. /lang en, /lang zh-TW)\n\
/search <keyword> - search our recent conversation\n\
/help - show this message\n\
weather <city> - current weather for a city";

const LANG_USAGE: &str = "Usage: /lang <code>, for example /lang en";
const LANG_SAVE_FAILED: &str = "Sorry, I could not save your language setting. Please try again later.";
const SEARCH_USAGE: &str = "Usage: /search <keyword>";
const WEATHER_UNAVAILABLE: &str = "Sorry, the weather service is unavailable right now.";

pub struct CommandDispatcher {
    history: ConversationHistory,
    settings: Arc<dyn SettingsStore>,
    weather: Arc<dyn WeatherService>,
    weather_keywords: Vec<String>,
}

impl CommandDispatcher {
    pub fn new(
        history: ConversationHistory,
        settings: Arc<dyn SettingsStore>,
        weather: Arc<dyn WeatherService>,
        weather_keywords: Vec<String>,
    ) -> Self {
        Self {
            history,
            settings,
            weather,
            weather_keywords,
        }
    }

    /// Returns a local reply when `raw_text` is a command, `None` otherwise.
    pub async fn dispatch(&self, raw_text: &str, user_id: &str) -> Option<String> {
        let mut tokens = raw_text.split_whitespace();
        let first = tokens.next()?;
        let args: Vec<&str> = tokens.collect();

        if first.starts_with('/') {
            let command = first.to_lowercase();
            debug!(user_id, command = %command, "dispatching command");
            let reply = match command.as_str() {
                "/lang" => self.set_language(user_id, &args).await,
                "/search" => self.search(user_id, &args).await,
                _ => HELP_TEXT.to_string(),
            };
            return Some(reply);
        }

        if self.is_weather_keyword(first) {
            return Some(self.weather(&args).await);
        }

        None
    }

    fn is_weather_keyword(&self, token: &str) -> bool {
        let token = token.to_lowercase();
        self.weather_keywords.iter().any(|k| k.to_lowercase() == token)
    }

    async fn set_language(&self, user_id: &str, args: &[&str]) -> String {
        let Some(code) = args.first() else {
            return LANG_USAGE.to_string();
        };
        let settings = UserSettings {
            user_id: user_id.to_string(),
            language: Some((*code).to_string()),
            updated_at: Utc::now(),
        };
        match self.settings.put_settings(&settings).await {
            Ok(()) => format!("Reply language set to {code}."),
            Err(e) => {
                warn!(user_id, error = %e, "failed to save language setting");
                LANG_SAVE_FAILED.to_string()
            }
        }
    }

    async fn search(&self, user_id: &str, args: &[&str]) -> String {
        if args.is_empty() {
            return SEARCH_USAGE.to_string();
        }
        let keyword = args.join(" ");
        let matches = self.history.search(user_id, &keyword).await;
        format_search_results(&keyword, &matches)
    }

    async fn weather(&self, args: &[&str]) -> String {
        if args.is_empty() {
            let keyword = self
                .weather_keywords
                .first()
                .map(String::as_str)
                .unwrap_or("weather");
            return format!("Usage: {keyword} <city>");
        }
        let location = args.join(" ");
        match self.weather.current(&location).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(location = %location, error = %e, "weather lookup failed");
                WEATHER_UNAVAILABLE.to_string()
            }
        }
    }
}

fn format_search_results(keyword: &str, matches: &[ConversationEntry]) -> String {
    if matches.is_empty() {
        return format!("No conversations found containing \"{keyword}\".");
    }
    let blocks: Vec<String> = matches
        .iter()
        .map(|e| format!("Q: {}\nA: {}", e.user_text, e.assistant_text))
        .collect();
    format!(
        "Found {} matching conversation(s):\n\n{}",
        matches.len(),
        blocks.join("\n\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatrelay_core::HistoryStore;
    use chatrelay_storage::InMemoryStore;
    use chatrelay_test_utils::{FailingStore, MockWeather};

    struct Fixture {
        store: Arc<InMemoryStore>,
        weather: Arc<MockWeather>,
        dispatcher: CommandDispatcher,
    }

    fn fixture_with_weather(weather: MockWeather) -> Fixture {
        let store = Arc::new(InMemoryStore::default());
        let weather = Arc::new(weather);
        let dispatcher = CommandDispatcher::new(
            ConversationHistory::new(store.clone()),
            store.clone(),
            weather.clone(),
            vec!["weather".into(), "天氣".into()],
        );
        Fixture {
            store,
            weather,
            dispatcher,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_weather(MockWeather::new())
    }

    #[tokio::test]
    async fn lang_sets_preference() {
        let f = fixture();
        let reply = f.dispatcher.dispatch("/lang en", "U1").await.unwrap();
        assert!(reply.contains("en"));
        let settings = f.store.get_settings("U1").await.unwrap().unwrap();
        assert_eq!(settings.language.as_deref(), Some("en"));

        f.dispatcher.dispatch("/LANG zh-TW", "U1").await.unwrap();
        let settings = f.store.get_settings("U1").await.unwrap().unwrap();
        assert_eq!(settings.language.as_deref(), Some("zh-TW"));
    }

    #[tokio::test]
    async fn bare_lang_is_usage_hint() {
        let f = fixture();
        assert_eq!(f.dispatcher.dispatch("/lang", "U1").await.unwrap(), LANG_USAGE);
        assert!(f.store.get_settings("U1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lang_store_failure_is_reported() {
        let store = Arc::new(FailingStore);
        let dispatcher = CommandDispatcher::new(
            ConversationHistory::new(store.clone()),
            store,
            Arc::new(MockWeather::new()),
            vec!["weather".into()],
        );
        assert_eq!(
            dispatcher.dispatch("/lang ja", "U1").await.unwrap(),
            LANG_SAVE_FAILED
        );
    }

    #[tokio::test]
    async fn search_formats_matches_oldest_first() {
        let f = fixture();
        f.store
            .append("U1", &ConversationEntry::new("weather in Tokyo", "Sunny"))
            .await
            .unwrap();
        f.store
            .append("U1", &ConversationEntry::new("hello", "hi there"))
            .await
            .unwrap();
        f.store
            .append("U1", &ConversationEntry::new("Tokyo trip ideas", "Visit Asakusa"))
            .await
            .unwrap();

        let reply = f.dispatcher.dispatch("/search   Tokyo", "U1").await.unwrap();
        assert!(reply.starts_with("Found 2 matching"));
        let first = reply.find("Q: weather in Tokyo").unwrap();
        let second = reply.find("Q: Tokyo trip ideas").unwrap();
        assert!(first < second);
        assert!(reply.contains("A: Visit Asakusa"));
        assert!(!reply.contains("hello"));
    }

    #[tokio::test]
    async fn search_joins_keyword_tokens() {
        let f = fixture();
        f.store
            .append("U1", &ConversationEntry::new("New York pizza", "try it"))
            .await
            .unwrap();
        let reply = f.dispatcher.dispatch("/search New   York", "U1").await.unwrap();
        assert!(reply.contains("Q: New York pizza"));
    }

    #[tokio::test]
    async fn search_without_match_or_keyword() {
        let f = fixture();
        let reply = f.dispatcher.dispatch("/search pizza", "U1").await.unwrap();
        assert!(reply.contains("No conversations found"));
        assert_eq!(f.dispatcher.dispatch("/search", "U1").await.unwrap(), SEARCH_USAGE);
    }

    #[tokio::test]
    async fn help_and_unknown_commands() {
        let f = fixture();
        assert_eq!(f.dispatcher.dispatch("/help", "U1").await.unwrap(), HELP_TEXT);
        assert_eq!(f.dispatcher.dispatch("/unknown x", "U1").await.unwrap(), HELP_TEXT);
    }

    #[tokio::test]
    async fn weather_keyword_is_case_insensitive() {
        let f = fixture();
        let reply = f.dispatcher.dispatch("Weather New York", "U1").await.unwrap();
        assert!(reply.starts_with("New York:"));
        let reply = f.dispatcher.dispatch("天氣 台北", "U1").await.unwrap();
        assert!(reply.starts_with("台北:"));
        assert_eq!(f.weather.queries().await, vec!["New York", "台北"]);
    }

    #[tokio::test]
    async fn weather_without_location_or_service() {
        let f = fixture();
        assert_eq!(
            f.dispatcher.dispatch("weather", "U1").await.unwrap(),
            "Usage: weather <city>"
        );

        let f = fixture_with_weather(MockWeather::failing());
        assert_eq!(
            f.dispatcher.dispatch("weather Paris", "U1").await.unwrap(),
            WEATHER_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn plain_text_passes_through() {
        let f = fixture();
        assert!(f.dispatcher.dispatch("how's the weather today?", "U1").await.is_none());
        assert!(f.dispatcher.dispatch("tell me a joke", "U1").await.is_none());
        assert!(f.dispatcher.dispatch("   ", "U1").await.is_none());
        assert!(f.weather.queries().await.is_empty());
    }
}
