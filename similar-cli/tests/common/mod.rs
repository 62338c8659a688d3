#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use image::{Rgb, RgbImage};
use similar_cli::utility::SharedFinder;
use similar_core::{EmbeddingCache, ImageEmbedder, SimilarAssetFinder, embedding::EmbeddingError};
use tempfile::TempDir;

/// Embeds an image as its mean color
struct MeanColorEmbedder;

impl ImageEmbedder for MeanColorEmbedder {
    fn embed(&self, image: &RgbImage) -> Result<Vec<f32>, EmbeddingError> {
        let count = (image.width() * image.height()).max(1) as f32;
        let mut sums = [0f32; 3];
        for pixel in image.pixels() {
            for (sum, channel) in sums.iter_mut().zip(pixel.0) {
                *sum += channel as f32;
            }
        }
        Ok(sums.iter().map(|s| s / count).collect())
    }
}

pub struct Fixture {
    _dir: TempDir,
    pub root: Utf8PathBuf,
    pub query: Utf8PathBuf,
    pub assets: Utf8PathBuf,
    pub finder: SharedFinder,
}

/// A red query image and three candidates, the reddish one being the best match
pub fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let query = root.join("query.png");
    let assets = root.join("assets");
    write_image(&query, [255, 0, 0]);
    write_image(&assets.join("reddish.png"), [240, 20, 20]);
    write_image(&assets.join("purple.png"), [128, 0, 128]);
    write_image(&assets.join("blue.png"), [0, 0, 255]);

    let cache = EmbeddingCache::open(root.join("cache.json"), Box::new(MeanColorEmbedder) as Box<dyn ImageEmbedder>);
    let finder = Arc::new(Mutex::new(SimilarAssetFinder::using(cache)));

    Fixture { _dir: dir, root, query, assets, finder }
}

pub fn write_image(path: &Utf8Path, color: [u8; 3]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    RgbImage::from_pixel(8, 8, Rgb(color)).save(path).unwrap();
}
