use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use super::worker::off_thread;
use crate::texture::{Texture, TextureWrap};

/// Decodes an equirectangular `.hdr` or `.exr` file into a float texture
pub fn load_environment(path: impl AsRef<Path>) -> Result<Texture> {
    let path = path.as_ref();
    let image = image::ImageReader::open(path)
        .with_context(|| format!("Failed to open environment map: {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("Failed to read environment map: {}", path.display()))?
        .decode()
        .with_context(|| format!("Failed to decode environment map: {}", path.display()))?;

    let texture = into_texture(image)?;
    info!(
        "Loaded environment map {}: {}x{}",
        path.display(),
        texture.width,
        texture.height
    );
    Ok(texture)
}

/// [`load_environment`] with the decode moved to a loader thread
pub async fn load_environment_async(path: PathBuf) -> Result<Texture> {
    off_thread(path.display().to_string(), move || load_environment(&path)).await
}

/// Same as [`load_environment`] for an in-memory file
pub fn load_environment_from_bytes(bytes: &[u8]) -> Result<Texture> {
    let image = image::load_from_memory(bytes).context("Failed to decode environment map")?;
    into_texture(image)
}

fn into_texture(image: image::DynamicImage) -> Result<Texture> {
    let rgba = image.into_rgba32f();
    let (width, height) = rgba.dimensions();
    Ok(Texture::rgba32f(width, height, rgba.into_raw())?.with_wrap(TextureWrap::Repeat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb32FImage};
    use std::io::Cursor;

    fn encoded_hdr() -> Vec<u8> {
        let image = Rgb32FImage::from_fn(4, 2, |x, _| image::Rgb([x as f32, 0.5, 2.0]));
        let mut bytes = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb32F(image)
            .write_to(&mut bytes, ImageFormat::Hdr)
            .unwrap();
        bytes.into_inner()
    }

    #[test]
    fn decodes_radiance_hdr_into_float_texture() {
        let texture = load_environment_from_bytes(&encoded_hdr()).unwrap();
        assert!(texture.is_hdr());
        assert_eq!((texture.width, texture.height), (4, 2));
        assert_eq!(texture.wrap, TextureWrap::Repeat);
        let average = texture.average_color();
        assert!((average.z - 2.0).abs() < 0.05);
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sky.hdr");
        std::fs::write(&path, encoded_hdr()).unwrap();
        assert_eq!(load_environment(&path).unwrap().width, 4);
    }

    #[test]
    fn async_load_decodes_off_the_calling_thread() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sky.hdr");
        std::fs::write(&path, encoded_hdr()).unwrap();
        let texture = pollster::block_on(load_environment_async(path)).unwrap();
        assert_eq!((texture.width, texture.height), (4, 2));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_environment("/nonexistent/sky.hdr").unwrap_err();
        assert!(err.to_string().contains("sky.hdr"));
    }
}
