pub mod splitter;
pub mod types;

pub use splitter::{SplitterConfig, TextSplitter};
pub use types::{KnowledgeChunk, KnowledgeMetadata};
