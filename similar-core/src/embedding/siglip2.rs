use camino::Utf8Path;
use image::{imageops::{self, FilterType}, RgbImage};
use log::{debug, info};
use ndarray::Array;
use ort::{inputs, value::TensorRef};

use crate::embedding::{EmbeddingError, ImageEmbedder, sessions::{SessionPool, SessionPoolExt, create_session_pool}};

/// Image tower of SigLIP2 base patch16-512, exported to ONNX with an "input" tensor of shape
/// (1, 3, 512, 512) and an "output" tensor of shape (1, 768).
pub struct Siglip2ImageEmbedder {
    sessions: SessionPool,
}

impl Siglip2ImageEmbedder {
    pub const VECTOR_LENGTH: usize = 768;
    pub const INPUT_SIZE: u32 = 512;
    /// Model location relative to a model resource directory
    pub const DEFAULT_MODEL_PATH: &'static str = "siglip2-base-patch16-512/image_embedder.onnx";

    /// Loads the model at `model_path` into `pool_size` sessions. ONNX Runtime must already be
    /// initialized, see [`crate::environment::init_ort`].
    pub fn from_file(model_path: &Utf8Path, pool_size: u32) -> Result<Self, EmbeddingError> {
        debug!("Initializing image embedding resources for Siglip2 Embedder");
        let sessions = create_session_pool(pool_size, model_path)?;
        info!("Loaded Siglip2 image embedder from {}", model_path);

        Ok(Siglip2ImageEmbedder { sessions })
    }
}

impl ImageEmbedder for Siglip2ImageEmbedder {
    fn embed(&self, image: &RgbImage) -> Result<Vec<f32>, EmbeddingError> {
        let size = Self::INPUT_SIZE as usize;
        let resized = imageops::resize(image, Self::INPUT_SIZE, Self::INPUT_SIZE, FilterType::Triangle);
        let mut input = Array::<f32, _>::zeros((1, 3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            let [r, g, b] = pixel.0;
            input[[0, 0, y, x]] = (r as f32) / 255.;
            input[[0, 1, y, x]] = (g as f32) / 255.;
            input[[0, 2, y, x]] = (b as f32) / 255.;
        }

        let tensor = TensorRef::from_array_view(&input)
            .map_err(|e| EmbeddingError::Preprocessing {
                step: "Converting to tensor",
                source: e.into(),
            })?;

        let mut model = self.sessions.get_session();
        let outputs = model.run(inputs!["input" => tensor])
            .map_err(|e| EmbeddingError::Calculation {
                step: "Performing image embedding",
                source: e.into(),
            })?;
        let vector: Vec<f32> = outputs.get("output")
            .ok_or_else(|| EmbeddingError::Output { msg: "model did not place output in 'output' key".to_owned() })?
            .try_extract_array::<f32>()
            .map_err(|e| EmbeddingError::Unknown {
                msg: "Error while extracting array from output as f32",
                source: e.into(),
            })?
            .iter()
            .copied()
            .collect();

        if vector.len() != Self::VECTOR_LENGTH {
            return Err(EmbeddingError::Output {
                msg: format!("expected a vector of length {} but got {}", Self::VECTOR_LENGTH, vector.len()),
            });
        }

        Ok(vector)
    }
}
