//! Fixed-window character splitter

use chrono::Utc;
use serde_json::json;

use wxr_core::{DocumentChunk, Error, Metadata, Page, RagSettings, Result};

/// Splits text into windows of `chunk_size` characters, each starting
/// `chunk_size - chunk_overlap` characters after the previous one.
///
/// Windows are counted in `char`s, so multi-byte text is never cut inside
/// a code point. Dropping the first `chunk_overlap` characters of every
/// chunk but the first and concatenating gives back the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidInput("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::InvalidInput(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_settings(settings: &RagSettings) -> Result<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split_text(&self, content: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let chars: Vec<char> = content.chars().collect();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());

            if end >= chars.len() {
                break;
            }

            start = end - self.chunk_overlap;
        }

        chunks
    }

    /// Split every page and attach per-chunk metadata.
    ///
    /// `chunk_index` counts across the whole document, in source order.
    pub fn split_pages(&self, pages: &[Page], source: &str) -> Vec<DocumentChunk> {
        let document_id = document_id(pages);
        let ingested_at = Utc::now().to_rfc3339();
        let mut chunks = Vec::new();

        for page in pages {
            for text in self.split_text(&page.text) {
                let mut metadata = Metadata::new();
                metadata.insert("source".to_string(), json!(source));
                metadata.insert("page".to_string(), json!(page.number));
                metadata.insert("chunk_index".to_string(), json!(chunks.len()));
                metadata.insert("document_id".to_string(), json!(document_id));
                metadata.insert("ingested_at".to_string(), json!(ingested_at));
                chunks.push(DocumentChunk::new(text, metadata));
            }
        }

        chunks
    }
}

/// Stable id for a document's content
pub fn document_id(pages: &[Page]) -> String {
    let mut context = md5::Context::new();
    for page in pages {
        context.consume(page.text.as_bytes());
    }
    format!("{:x}", context.compute())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rebuild(chunks: &[String], overlap: usize) -> String {
        let mut text = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let skip = if i == 0 { 0 } else { overlap };
            text.extend(chunk.chars().skip(skip));
        }
        text
    }

    #[test]
    fn test_chunks_reconstruct_source() {
        let splitter = TextSplitter::new(1000, 150).unwrap();
        let source: String = (0..4321).map(|i| char::from(b'a' + (i % 26) as u8)).collect();

        let chunks = splitter.split_text(&source);
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.chars().count() <= 1000));
        assert_eq!(rebuild(&chunks, 150), source);
    }

    #[test]
    fn test_overlap_is_shared() {
        let splitter = TextSplitter::new(10, 4).unwrap();
        let chunks = splitter.split_text("abcdefghijklmnop");
        assert_eq!(chunks, vec!["abcdefghij", "ghijklmnop"]);
    }

    #[test]
    fn test_multibyte_text() {
        let splitter = TextSplitter::new(4, 1).unwrap();
        let chunks = splitter.split_text("日本語のテキスト");
        assert_eq!(rebuild(&chunks, 1), "日本語のテキスト");
    }

    #[test]
    fn test_short_and_empty_input() {
        let splitter = TextSplitter::new(100, 10).unwrap();
        assert_eq!(splitter.split_text("tiny"), vec!["tiny"]);
        assert!(splitter.split_text("").is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(TextSplitter::new(0, 0).is_err());
        assert!(TextSplitter::new(100, 100).is_err());
    }

    #[test]
    fn test_page_metadata() {
        let splitter = TextSplitter::new(5, 1).unwrap();
        let pages = vec![
            Page { number: 1, text: "abcdefg".to_string() },
            Page { number: 2, text: "xyz".to_string() },
        ];
        let chunks = splitter.split_pages(&pages, "manual.pdf");

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].text, "xyz");
        assert_eq!(chunks[2].metadata["page"], 2);
        assert_eq!(chunks[2].metadata["chunk_index"], 2);
        assert_eq!(chunks[0].metadata["source"], "manual.pdf");
        assert_eq!(chunks[0].metadata["document_id"], chunks[2].metadata["document_id"]);
        assert_eq!(document_id(&pages).len(), 32);
    }
}
