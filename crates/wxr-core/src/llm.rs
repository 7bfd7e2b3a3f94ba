//! Text generation trait and prompt helpers

use async_trait::async_trait;

use crate::Result;

/// Used when a caller passes an empty system instruction
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant. Answer concisely, cite sources when provided, and do not reveal chain-of-thought.";

/// Trait for text generation backends (e.g., Hugging Face router, Gemini)
///
/// Implementations must accept an empty `context`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate an answer to `question` grounded in `context`
    async fn generate(&self, system_instruction: &str, context: &str, question: &str) -> Result<String>;

    /// Get the model ID being used
    fn model_id(&self) -> &str;
}

/// Resolve the system instruction, substituting the default for empty input
pub fn system_instruction(instruction: &str) -> &str {
    if instruction.trim().is_empty() {
        DEFAULT_SYSTEM_INSTRUCTION
    } else {
        instruction
    }
}

/// Build the human turn of the answer prompt
pub fn user_prompt(context: &str, question: &str) -> String {
    format!(
        "Context:\n{}\n\nQuestion: {}\n\nRespond with a short, well-structured answer.",
        context, question
    )
}

/// Clean up raw model output.
///
/// Drops `<think>...</think>` reasoning blocks (including an unterminated
/// trailing one) and a leading `Answer:` label.
pub fn clean_answer(raw: &str) -> String {
    let mut text = raw.to_string();

    while let Some(start) = text.find("<think>") {
        match text[start..].find("</think>") {
            Some(offset) => {
                let end = start + offset + "</think>".len();
                text.replace_range(start..end, "");
            }
            None => {
                text.truncate(start);
            }
        }
    }

    // Some models omit the opening tag and only emit the closing one
    if let Some(pos) = text.find("</think>") {
        text = text[pos + "</think>".len()..].to_string();
    }

    let trimmed = text.trim();
    trimmed
        .strip_prefix("Answer:")
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}
