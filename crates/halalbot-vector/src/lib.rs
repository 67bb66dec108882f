//! halalbot-vector
//!
//! A small, fully offline stand-in for the production embedding model and
//! nearest-neighbour index. It reads the corpus metadata file
//! (`[{"text": ..., "source": ...}, ...]`), embeds passages with a
//! feature-hashing embedder and answers queries with an exact flat scan, so
//! the ranking pipeline can run end to end without a model download.

pub mod embed;
pub mod flat;
pub mod gateway;
pub mod metadata;

pub use embed::HashEmbedder;
pub use flat::FlatIndex;
pub use gateway::{to_similarity, FlatGateway};
pub use metadata::MetadataStore;
