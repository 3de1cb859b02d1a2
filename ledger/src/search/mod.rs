//! Lexical search and the embedding index.

pub mod embedding;
pub mod lexical;

pub use embedding::{EmbeddingIndex, EmbeddingProvider};
pub use lexical::{search_lexical, MAX_QUERY_LEN};
