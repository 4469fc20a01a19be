//! Knowledge retrieval: sources, caching, and context rendering.

pub mod cache;
pub mod memory;
pub mod retriever;
pub mod source;

pub use cache::{SingleSlotCache, cache_key};
pub use memory::InMemoryKnowledgeSource;
pub use retriever::{
    KnowledgeRetriever, MODE_FULL_SNAPSHOT, MODE_TARGETED, NO_CONTEXT_MARKER, RetrievalMode,
    RetrievedContext,
};
pub use source::{KnowledgeRecord, KnowledgeSource, RecordCategory, SourceError};
