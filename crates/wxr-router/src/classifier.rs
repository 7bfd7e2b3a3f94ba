//! Keyword route classification

use tracing::debug;

use wxr_core::Route;

/// Words that send a question to the weather pipeline
pub const WEATHER_KEYWORDS: [&str; 6] = ["weather", "temperature", "forecast", "rain", "wind", "humidity"];

/// Case-insensitive substring classifier
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self::with_keywords(WEATHER_KEYWORDS)
    }

    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords.into_iter().map(|k| k.as_ref().to_lowercase()).collect(),
        }
    }

    /// `Weather` if any keyword appears anywhere in the question
    pub fn classify(&self, question: &str) -> Route {
        let question_lower = question.to_lowercase();
        match self.keywords.iter().find(|k| question_lower.contains(k.as_str())) {
            Some(keyword) => {
                debug!(target: "router", keyword = %keyword, "weather keyword matched");
                Route::Weather
            }
            None => Route::Rag,
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}
