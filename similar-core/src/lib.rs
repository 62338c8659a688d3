pub mod app_config;
pub mod assets;
pub mod cache;
pub mod embedding;
pub mod environment;
pub mod image_loader;
pub mod search;
pub mod similarity;

// Re-export key entry points
pub use cache::{EmbeddingCache, WritePolicy};
pub use embedding::ImageEmbedder;
pub use environment::{init_image_embedder, init_ort};
pub use search::{DEFAULT_TOP_K, MatchResult, SimilarAssetFinder};
