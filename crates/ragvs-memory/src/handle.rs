use tokio::sync::OnceCell;

use crate::error::MemoryError;
use crate::knowledge::KnowledgeStore;
use crate::qdrant_ops::QdrantOps;
use crate::vector_store::VectorStore;

/// Process-wide, lazily connected knowledge store.
///
/// The Qdrant client is built on first use; concurrent first callers share a single
/// initialization. Without a configured URL every access fails with
/// [`MemoryError::StoreUnavailable`].
#[derive(Debug)]
pub struct StoreHandle {
    url: Option<String>,
    collection: String,
    cell: OnceCell<KnowledgeStore>,
}

impl StoreHandle {
    #[must_use]
    pub fn qdrant(url: Option<String>, collection: impl Into<String>) -> Self {
        Self {
            url: url.filter(|u| !u.trim().is_empty()),
            collection: collection.into(),
            cell: OnceCell::new(),
        }
    }

    /// Wrap an already constructed backend, e.g. [`crate::InMemoryVectorStore`].
    #[must_use]
    pub fn with_store(store: Box<dyn VectorStore>, collection: impl Into<String>) -> Self {
        let collection = collection.into();
        Self {
            url: None,
            cell: OnceCell::new_with(Some(KnowledgeStore::new(store, collection.clone()))),
            collection,
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.cell.initialized()
    }

    /// # Errors
    ///
    /// Returns [`MemoryError::StoreUnavailable`] when no URL is configured, or a Qdrant
    /// error if the client cannot be built.
    pub async fn get(&self) -> Result<&KnowledgeStore, MemoryError> {
        self.cell
            .get_or_try_init(|| async {
                let url = self.url.as_deref().ok_or_else(|| {
                    MemoryError::StoreUnavailable("vector store URL is not configured".into())
                })?;
                let ops = QdrantOps::new(url)?;
                tracing::info!(url, collection = %self.collection, "connected knowledge store");
                Ok(KnowledgeStore::new(Box::new(ops), self.collection.clone()))
            })
            .await
    }
}
