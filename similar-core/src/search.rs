use camino::Utf8Path;
use log::{debug, warn};

use crate::{assets::{self, DEFAULT_EXTENSIONS}, cache::{EmbeddingCache, WritePolicy}, embedding::ImageEmbedder, similarity};

/// Number of matches returned when a caller does not ask for a specific amount
pub const DEFAULT_TOP_K: usize = 3;

/// Finds the images in a directory that look most like a query image.
///
/// Every embedding, the query's included, goes through the owned [`EmbeddingCache`]. New
/// embeddings computed during a search are written to the cache file once, when the search
/// finishes.
pub struct SimilarAssetFinder<E: ImageEmbedder> {
    cache: EmbeddingCache<E>,
    extensions: Vec<String>,
}

impl<E: ImageEmbedder> SimilarAssetFinder<E> {
    pub fn using(mut cache: EmbeddingCache<E>) -> Self {
        cache.set_write_policy(WritePolicy::Deferred);
        SimilarAssetFinder {
            cache,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Replaces the candidate file extensions (without leading dot, compared case-sensitively)
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Returns the `top_k` images under `assets_dir` (searched recursively) most similar to the
    /// image at `query`, highest similarity first.
    ///
    /// Fails if the query image cannot be embedded or `assets_dir` cannot be searched. A
    /// candidate that cannot be loaded or embedded is skipped and never fails the call.
    pub fn find_similar_assets(&mut self, query: &Utf8Path, assets_dir: &Utf8Path, top_k: usize)
        -> Result<Vec<MatchResult>, FindSimilarError>
    {
        debug!("SimilarAssetFinder: Searching {} for images similar to {}, top_k: {}", assets_dir, query, top_k);
        let result = self.search(query, assets_dir, top_k);

        if let Err(e) = self.cache.flush() {
            warn!("SimilarAssetFinder: Could not persist embedding cache after search: {}", e);
        }

        result
    }

    pub fn cache(&self) -> &EmbeddingCache<E> {
        &self.cache
    }

    pub fn into_cache(self) -> EmbeddingCache<E> {
        self.cache
    }

    fn search(&mut self, query: &Utf8Path, assets_dir: &Utf8Path, top_k: usize)
        -> Result<Vec<MatchResult>, FindSimilarError>
    {
        let query_embedding = self.cache.get_embedding(query)
            .map_err(|e| FindSimilarError {
                query: query.to_owned(),
                r#type: FindSimilarErrorType::InvalidQueryImage { source: e },
            })?;

        let paths = assets::discover_images(assets_dir, &self.extensions)
            .map_err(|e| FindSimilarError {
                query: query.to_owned(),
                r#type: FindSimilarErrorType::AssetsDirectory { path: assets_dir.to_owned(), source: e },
            })?;

        let mut candidates = Vec::with_capacity(paths.len());
        for path in paths {
            match self.cache.get_embedding(&path) {
                Ok(embedding) => candidates.push((path, embedding)),
                Err(e) => debug!("SimilarAssetFinder: Skipping candidate {}: {}", path, e),
            }
        }
        debug!("SimilarAssetFinder: Ranking {} candidates", candidates.len());

        Ok(similarity::rank(&query_embedding, candidates, top_k))
    }
}

pub use result::*;
pub use error::*;

mod result;
mod error;
