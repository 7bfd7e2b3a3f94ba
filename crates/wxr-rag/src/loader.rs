//! Document loaders for PDF, Markdown, HTML and plain text

use std::path::Path;

use async_trait::async_trait;
use pulldown_cmark::{Event, Parser, TagEnd};
use scraper::{Html, Selector};
use tokio::process::Command;
use tracing::debug;

use wxr_core::{DocumentSource, Error, Page, Result};

/// Kind of document, decided from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Markdown,
    Html,
    Text,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => DocumentKind::Pdf,
            "md" | "markdown" => DocumentKind::Markdown,
            "html" | "htm" => DocumentKind::Html,
            _ => DocumentKind::Text,
        }
    }
}

/// Loads files from disk, one [`Page`] per PDF page and a single page for
/// every other format
#[derive(Debug, Clone)]
pub struct FileLoader {
    pdftotext: String,
}

impl FileLoader {
    pub fn new() -> Self {
        Self {
            pdftotext: "pdftotext".to_string(),
        }
    }

    /// Use a specific `pdftotext` executable
    pub fn with_pdftotext(program: impl Into<String>) -> Self {
        Self {
            pdftotext: program.into(),
        }
    }

    async fn load_pdf(&self, path: &Path) -> Result<Vec<Page>> {
        let output = Command::new(&self.pdftotext)
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::Configuration(format!(
                    "'{}' is required to read PDF files (install poppler-utils)",
                    self.pdftotext
                )),
                _ => Error::Io(e),
            })?;

        if !output.status.success() {
            return Err(Error::InvalidInput(format!(
                "pdftotext failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(split_form_feeds(&text))
    }
}

impl Default for FileLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentSource for FileLoader {
    async fn load_pages(&self, path: &Path) -> Result<Vec<Page>> {
        let kind = DocumentKind::from_path(path);
        debug!(target: "ingest", path = %path.display(), ?kind, "loading document");

        if kind == DocumentKind::Pdf {
            return self.load_pdf(path).await;
        }

        let raw = tokio::fs::read_to_string(path).await?;
        let text = match kind {
            DocumentKind::Markdown => markdown_to_text(&raw),
            DocumentKind::Html => html_to_text(&raw)?,
            _ => raw,
        };

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Page { number: 1, text }])
    }
}

/// pdftotext separates pages with form feeds; blank pages are skipped but
/// keep their number
pub(crate) fn split_form_feeds(text: &str) -> Vec<Page> {
    text.split('\u{c}')
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| Page {
            number: i + 1,
            text: page.to_string(),
        })
        .collect()
}

pub(crate) fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::new();
    for event in Parser::new(markdown) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock) => {
                text.push_str("\n\n")
            }
            _ => {}
        }
    }
    text.trim_end().to_string()
}

pub(crate) fn html_to_text(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let body = Selector::parse("body").map_err(|e| Error::InvalidInput(format!("Bad selector: {}", e)))?;

    let lines: Vec<String> = document
        .select(&body)
        .flat_map(|node| node.text())
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
        .collect();

    Ok(lines.join("\n"))
}
