use std::{path::{self, PathBuf}, sync::{Arc, Mutex, PoisonError}};

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use normalize_path::NormalizePath;
use serde::Serialize;
use similar_core::{EmbeddingCache, ImageEmbedder, MatchResult, SimilarAssetFinder, app_config::AppConfig, init_image_embedder, init_ort, search::FindSimilarError};

/// Finder over whichever embedder the process was configured with
pub type DynFinder = SimilarAssetFinder<Box<dyn ImageEmbedder>>;
/// One finder per process, shared by every request. The mutex serialises searches, which also
/// keeps cache writes single-writer within the process.
pub type SharedFinder = Arc<Mutex<DynFinder>>;

/// Initializes ONNX Runtime, loads the configured model and opens the configured cache.
pub fn build_finder(config: &AppConfig, onnx_lib_dir: Option<&Utf8Path>) -> anyhow::Result<DynFinder> {
    init_ort(onnx_lib_dir)?;
    let embedder = init_image_embedder(config)
        .with_context(|| format!("Could not load image model from {}", config.image_model_path()))?;

    let cache = EmbeddingCache::open(&config.cache_file, Box::new(embedder) as Box<dyn ImageEmbedder>);
    Ok(SimilarAssetFinder::using(cache).with_extensions(config.extensions.clone()))
}

/// A match as it is reported over the wire
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WireMatch {
    pub file: String,
    pub path: String,
    pub similarity: f32,
}

impl From<MatchResult> for WireMatch {
    fn from(result: MatchResult) -> Self {
        WireMatch {
            file: result.name,
            path: result.path.into_string(),
            similarity: result.similarity,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MatchesResponse {
    pub matches: Vec<WireMatch>,
}

/// Runs one search against the shared finder and converts the results for transport.
pub fn find_matches(finder: &Mutex<DynFinder>, image_path: &Utf8Path, assets_dir: &Utf8Path, top_k: usize)
    -> Result<MatchesResponse, FindSimilarError>
{
    // a panic in an earlier request cannot leave the finder half updated, cache writes are atomic
    let mut finder = finder.lock().unwrap_or_else(PoisonError::into_inner);
    let matches = finder.find_similar_assets(image_path, assets_dir, top_k)?
        .into_iter()
        .map(WireMatch::from)
        .collect();

    Ok(MatchesResponse { matches })
}

/// Converts a command line path to an absolute, normalized UTF-8 path
pub fn clean_path(path: PathBuf) -> anyhow::Result<Utf8PathBuf> {
    let absolute = path::absolute(&path)
        .with_context(|| format!("Could not make path absolute: {}", path.display()))?
        .normalize();

    Utf8PathBuf::from_path_buf(absolute)
        .map_err(|p| anyhow::anyhow!("Path is not valid UTF-8: {}", p.display()))
}
