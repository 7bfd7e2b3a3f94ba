//! Location extraction from free-form weather questions

use regex::Regex;

/// Tokens that describe time or politeness rather than a place
const STOP_WORDS: [&str; 5] = ["now", "today", "tonight", "tomorrow", "please"];

/// Pulls a location out of a question such as "What's the weather in Tokyo?"
pub struct LocationExtractor {
    default_location: String,
    delimiter: Option<Regex>,
    trailing: Option<Regex>,
}

impl LocationExtractor {
    pub fn new(default_location: impl Into<String>) -> Self {
        Self {
            default_location: default_location.into(),
            // Greedy prefix so the capture starts after the last " in "
            delimiter: Regex::new(r"(?is)^.*\sin\s+(.+)$").ok(),
            trailing: Regex::new(r"[\s\p{P}]+$").ok(),
        }
    }

    pub fn default_location(&self) -> &str {
        &self.default_location
    }

    /// Location named after the last " in ", sanitized, or the default
    pub fn extract(&self, question: &str) -> String {
        let candidate = self
            .delimiter
            .as_ref()
            .and_then(|re| re.captures(question))
            .and_then(|caps| caps.get(1))
            .map(|m| self.sanitize(m.as_str()))
            .unwrap_or_default();

        if candidate.is_empty() {
            self.default_location.clone()
        } else {
            candidate
        }
    }

    /// Strip trailing punctuation and drop stop words, keeping token order
    pub fn sanitize(&self, location: &str) -> String {
        let kept: Vec<&str> = self
            .strip_trailing(location)
            .split_whitespace()
            .filter(|token| {
                let bare = self.strip_trailing(token).to_lowercase();
                !STOP_WORDS.contains(&bare.as_str())
            })
            .collect();

        self.strip_trailing(&kept.join(" ")).to_string()
    }

    fn strip_trailing<'a>(&self, text: &'a str) -> &'a str {
        match self.trailing.as_ref().and_then(|re| re.find(text)) {
            Some(m) => &text[..m.start()],
            None => text.trim_end(),
        }
    }
}

/// Last whitespace-separated token, used for the single not-found retry
pub fn last_token(location: &str) -> Option<&str> {
    location.split_whitespace().last()
}
