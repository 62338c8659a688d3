#![allow(dead_code)]

use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};

use camino::{Utf8Path, Utf8PathBuf};
use image::{Rgb, RgbImage};
use similar_core::embedding::{EmbeddingError, ImageEmbedder};
use tempfile::TempDir;

/// Embeds an image as its mean color, scaled so the output is never unit length. Counts calls.
#[derive(Clone, Default)]
pub struct FakeEmbedder {
    calls: Arc<AtomicUsize>,
}

impl FakeEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageEmbedder for FakeEmbedder {
    fn embed(&self, image: &RgbImage) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let count = (image.width() * image.height()).max(1) as f32;
        let mut sums = [0f32; 3];
        for pixel in image.pixels() {
            for (sum, channel) in sums.iter_mut().zip(pixel.0) {
                *sum += channel as f32;
            }
        }
        Ok(sums.iter().map(|s| 3.0 * s / count).collect())
    }
}

pub fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
}

pub fn write_image(path: &Utf8Path, color: [u8; 3]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    RgbImage::from_pixel(16, 16, Rgb(color)).save(path).unwrap();
}
