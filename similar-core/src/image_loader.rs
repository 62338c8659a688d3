use camino::Utf8Path;
use image::{DynamicImage, ImageReader, RgbImage};
use log::debug;

#[derive(thiserror::Error, Debug)]
pub enum ImageLoadError {
    #[error("Error opening image file at path: {path}")]
    Open { path: String, #[source] source: anyhow::Error },
    #[error("Error decoding image file at path: {path}")]
    Decode { path: String, #[source] source: anyhow::Error },
}

/// Opens the image at `path` and flattens it into 3 channel RGB.
///
/// The format is guessed from the file contents rather than the extension, so a mislabeled
/// jpeg saved as .png still loads. No resizing happens here, embedders do their own
/// preprocessing.
pub fn load_and_normalize(path: &Utf8Path) -> Result<RgbImage, ImageLoadError> {
    debug!("ImageLoader: Loading image at path: {}", path);
    let img = ImageReader::open(path)
        .map_err(|e| ImageLoadError::Open { path: path.to_string(), source: e.into() })?
        .with_guessed_format()
        .map_err(|e| ImageLoadError::Open { path: path.to_string(), source: e.into() })?
        .decode()
        .map_err(|e| ImageLoadError::Decode { path: path.to_string(), source: e.into() })?;

    Ok(normalize(img))
}

/// Converts a decoded image of any color mode into RGB, dropping alpha.
///
/// The decoder already expands palette images to RGB, or to RGBA when they carry a
/// transparency entry, so indexed data never reaches this point.
pub fn normalize(img: DynamicImage) -> RgbImage {
    img.into_rgb8()
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use image::{GrayAlphaImage, LumaA, Rgb, Rgba, RgbaImage};
    use tempfile::TempDir;

    use super::*;

    fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn rgba_image_loses_alpha_but_keeps_color() {
        let dir = TempDir::new().unwrap();
        let path = utf8_dir(&dir).join("rgba.png");
        RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 0])).save(&path).unwrap();

        let img = load_and_normalize(&path).unwrap();

        assert_eq!(img.dimensions(), (4, 4));
        assert_eq!(*img.get_pixel(0, 0), Rgb([10, 20, 30]));
    }

    #[test]
    fn palette_with_transparency_keeps_palette_colors() {
        let dir = TempDir::new().unwrap();
        let path = utf8_dir(&dir).join("indexed.png");
        {
            let file = std::io::BufWriter::new(std::fs::File::create(&path).unwrap());
            let mut encoder = png::Encoder::new(file, 2, 1);
            encoder.set_color(png::ColorType::Indexed);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_palette(vec![10, 20, 30, 200, 100, 50]);
            // first entry fully transparent, second opaque
            encoder.set_trns(vec![0, 255]);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&[0, 1]).unwrap();
        }

        let img = load_and_normalize(&path).unwrap();

        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(*img.get_pixel(0, 0), Rgb([10, 20, 30]));
        assert_eq!(*img.get_pixel(1, 0), Rgb([200, 100, 50]));
    }

    #[test]
    fn gray_alpha_expands_to_three_channels() {
        let img = normalize(DynamicImage::ImageLumaA8(
            GrayAlphaImage::from_pixel(2, 2, LumaA([200, 128]))));

        assert_eq!(*img.get_pixel(1, 1), Rgb([200, 200, 200]));
    }

    #[test]
    fn format_is_guessed_from_contents() {
        let dir = TempDir::new().unwrap();
        let png = utf8_dir(&dir).join("real.png");
        RgbImage::from_pixel(3, 3, Rgb([1, 2, 3])).save(&png).unwrap();
        let mislabeled = utf8_dir(&dir).join("actually_png.jpg");
        std::fs::copy(&png, &mislabeled).unwrap();

        assert!(load_and_normalize(&mislabeled).is_ok());
    }

    #[test]
    fn missing_file_is_open_error() {
        let dir = TempDir::new().unwrap();
        let path = utf8_dir(&dir).join("nope.png");

        assert!(matches!(load_and_normalize(&path), Err(ImageLoadError::Open { .. })));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let dir = TempDir::new().unwrap();
        let path = utf8_dir(&dir).join("corrupt.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\nthis is not really a png").unwrap();

        assert!(matches!(load_and_normalize(&path), Err(ImageLoadError::Decode { .. })));
    }
}
