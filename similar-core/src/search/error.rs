use std::{error::Error, fmt};

use camino::Utf8PathBuf;

use crate::{assets::DiscoveryError, cache::CacheError};

// Not using thiserror::Error derive macros because every error type carries the query path.
#[derive(Debug)]
pub struct FindSimilarError {
    pub query: Utf8PathBuf,
    pub r#type: FindSimilarErrorType,
}
#[derive(Debug)]
pub enum FindSimilarErrorType {
    InvalidQueryImage { source: CacheError },
    AssetsDirectory { path: Utf8PathBuf, source: DiscoveryError },
}
impl fmt::Display for FindSimilarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.r#type {
            FindSimilarErrorType::InvalidQueryImage { source } => {
                write!(f, "Query image {} could not be loaded or embedded: {}", self.query, source)
            },
            FindSimilarErrorType::AssetsDirectory { path, source } => {
                write!(f, "Assets directory {} could not be searched: {}", path, source)
            },
        }
    }
}
impl Error for FindSimilarError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.r#type {
            FindSimilarErrorType::InvalidQueryImage { source } => Some(source),
            FindSimilarErrorType::AssetsDirectory { source, .. } => Some(source),
        }
    }
}
