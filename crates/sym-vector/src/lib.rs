//! SYM Vector crate - vector store adapter, embeddings, semantic search.
//!
//! Two backends sit behind the [`VectorBackend`] trait: an in-memory
//! cosine index and the Pinecone data-plane API. [`VectorStoreAdapter`]
//! layers the namespace and existence checks on top of either one.

pub mod embedding;
pub mod index;
pub mod pinecone;
pub mod search;
pub mod store;

pub use embedding::{EmbeddingService, MockEmbedding, OpenAiEmbedding};
pub use index::{SearchHit, VectorBackend, VectorIndex};
pub use pinecone::PineconeBackend;
pub use search::{filter_hits, SemanticHit, SemanticSearch};
pub use store::VectorStoreAdapter;
