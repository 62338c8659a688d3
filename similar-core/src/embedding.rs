use std::sync::Arc;

use image::RgbImage;

#[derive(thiserror::Error, Debug)]
pub enum EmbeddingError {
    #[error("Error during intialization of model for embedding from path: {model_path}")]
    Initialization { model_path: String, #[source] source: anyhow::Error },
    #[error("Error while preprocessing image in preparation for embedding at step: {step}")]
    Preprocessing { step: &'static str, #[source] source: anyhow::Error },
    #[error("Error while performing neural network calculations at step: {step}")]
    Calculation { step: &'static str, #[source] source: anyhow::Error },
    #[error("Model produced unusable output: {msg}")]
    Output { msg: String },
    #[error("Error: {msg}")]
    Unknown { msg: &'static str, #[source] source: anyhow::Error },
}

/// A frozen, pretrained feature extractor. Given normalized RGB pixel data it returns a
/// fixed-length vector. Implementations are not required to return unit-norm vectors.
///
/// Takes `&self` so one embedder can be shared between a cache and whoever else needs it;
/// implementations that hold mutable model state should guard it internally (see
/// [`sessions::SessionPool`]).
pub trait ImageEmbedder: Send + Sync {
    fn embed(&self, image: &RgbImage) -> Result<Vec<f32>, EmbeddingError>;
}

impl<E: ImageEmbedder + ?Sized> ImageEmbedder for Arc<E> {
    fn embed(&self, image: &RgbImage) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed(image)
    }
}

impl<E: ImageEmbedder + ?Sized> ImageEmbedder for Box<E> {
    fn embed(&self, image: &RgbImage) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed(image)
    }
}

pub mod sessions;

// model modules
pub mod siglip2;
