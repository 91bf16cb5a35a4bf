//! Knowledge persistence for ragvs: paragraph chunking, vector storage with Qdrant
//! (or an in-memory backend), and `SQLite` chat logs.

pub mod document;
pub mod error;
pub mod handle;
pub mod in_memory_store;
pub mod knowledge;
pub mod qdrant_ops;
pub mod sqlite;
pub mod types;
pub mod vector_store;

pub use document::{KnowledgeChunk, KnowledgeMetadata, SplitterConfig, TextSplitter};
pub use error::MemoryError;
pub use handle::StoreHandle;
pub use in_memory_store::InMemoryVectorStore;
pub use knowledge::{DOCUMENT_TYPE, KnowledgeRecord, KnowledgeStore};
pub use qdrant_ops::QdrantOps;
pub use sqlite::SqliteStore;
pub use types::{ChatLog, Route, ScoredMatch};
pub use vector_store::{
    FieldCondition, ScoredVectorPoint, StoredPoint, VectorFilter, VectorPoint,
    VectorStore, VectorStoreError,
};
