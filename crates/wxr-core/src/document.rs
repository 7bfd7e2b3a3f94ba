//! Document source capability

use std::path::Path;

use async_trait::async_trait;

use crate::{Page, Result};

/// Trait for loaders that turn a document into ordered page-level text
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn load_pages(&self, path: &Path) -> Result<Vec<Page>>;
}
