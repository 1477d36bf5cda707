use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{ensure, Result};
use glam::Vec3;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Texel storage, always four channels
#[derive(Debug, Clone)]
pub enum TexelData {
    Rgba8(Vec<u8>),
    Rgba32F(Vec<f32>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureWrap {
    Clamp,
    Repeat,
}

/// CPU-side image that GPU backends upload on first use, keyed by `id`
#[derive(Debug, Clone)]
pub struct Texture {
    id: u64,
    pub width: u32,
    pub height: u32,
    pub data: TexelData,
    pub wrap: TextureWrap,
}

impl Texture {
    pub fn rgba8(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        ensure!(
            data.len() == (width * height * 4) as usize,
            "expected {} bytes for a {}x{} rgba8 texture, got {}",
            width * height * 4,
            width,
            height,
            data.len()
        );
        Ok(Self::with_data(width, height, TexelData::Rgba8(data)))
    }

    pub fn rgba32f(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        ensure!(
            data.len() == (width * height * 4) as usize,
            "expected {} floats for a {}x{} rgba32f texture, got {}",
            width * height * 4,
            width,
            height,
            data.len()
        );
        Ok(Self::with_data(width, height, TexelData::Rgba32F(data)))
    }

    fn with_data(width: u32, height: u32, data: TexelData) -> Self {
        Self {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            width,
            height,
            data,
            wrap: TextureWrap::Clamp,
        }
    }

    pub fn with_wrap(mut self, wrap: TextureWrap) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_hdr(&self) -> bool {
        matches!(self.data, TexelData::Rgba32F(_))
    }

    /// Mean RGB over all texels, used as the ambient term of an environment map
    pub fn average_color(&self) -> Vec3 {
        let texels = (self.width * self.height) as usize;
        if texels == 0 {
            return Vec3::ZERO;
        }
        let sum = match &self.data {
            TexelData::Rgba8(bytes) => bytes.chunks_exact(4).fold(Vec3::ZERO, |acc, px| {
                acc + Vec3::new(px[0] as f32, px[1] as f32, px[2] as f32) / 255.0
            }),
            TexelData::Rgba32F(floats) => floats
                .chunks_exact(4)
                .fold(Vec3::ZERO, |acc, px| acc + Vec3::new(px[0], px[1], px[2])),
        };
        sum / texels as f32
    }

    /// Alpha channel in [0, 1] at texel (x, y)
    pub fn alpha_at(&self, x: u32, y: u32) -> f32 {
        let i = ((y * self.width + x) * 4 + 3) as usize;
        match &self.data {
            TexelData::Rgba8(bytes) => bytes[i] as f32 / 255.0,
            TexelData::Rgba32F(floats) => floats[i],
        }
    }
}

/// White square whose alpha fades out radially beyond `opaque_radius` (0..1 of the half extent)
pub fn radial_floor_texture(dim: u32, opaque_radius: f32) -> Texture {
    let dim = dim.max(2);
    let mut data = vec![0u8; (dim * dim * 4) as usize];
    let last = (dim - 1) as f32;

    for x in 0..dim {
        for y in 0..dim {
            let x_cent = 2.0 * (x as f32 / last - 0.5);
            let y_cent = 2.0 * (y as f32 / last - 0.5);
            let d = (x_cent * x_cent + y_cent * y_cent).sqrt();

            let mut a = 1.0f32;
            if d > opaque_radius {
                let d = (d - opaque_radius) / (1.0 - opaque_radius);
                a = (1.0 - d).clamp(0.0, 1.0);
                a = (a.powf(1.5) * 1.5).min(1.0);
            }

            let i = ((y * dim + x) * 4) as usize;
            data[i] = 255;
            data[i + 1] = 255;
            data[i + 2] = 255;
            data[i + 3] = (a * 255.0) as u8;
        }
    }

    Texture::with_data(dim, dim, TexelData::Rgba8(data)).with_wrap(TextureWrap::Repeat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radial_texture_is_opaque_in_center_and_clear_in_corners() {
        let texture = radial_floor_texture(65, 0.0);
        assert_eq!(texture.width, 65);
        assert!(texture.alpha_at(32, 32) > 0.99);
        assert_eq!(texture.alpha_at(0, 0), 0.0);
        assert_eq!(texture.alpha_at(64, 64), 0.0);
    }

    #[test]
    fn radial_texture_keeps_opaque_radius() {
        let texture = radial_floor_texture(101, 0.5);
        // 0.4 of the half extent from the centre lies inside the opaque disc
        assert!(texture.alpha_at(70, 50) > 0.99);
        assert!(texture.alpha_at(100, 50) < 0.01);
    }

    #[test]
    fn rgba8_rejects_wrong_length() {
        assert!(Texture::rgba8(2, 2, vec![0; 15]).is_err());
        assert!(Texture::rgba8(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn average_color_of_uniform_hdr_texture() {
        let texture = Texture::rgba32f(2, 1, vec![0.5, 1.0, 2.0, 1.0, 0.5, 1.0, 2.0, 1.0]).unwrap();
        assert_eq!(texture.average_color(), Vec3::new(0.5, 1.0, 2.0));
        assert!(texture.is_hdr());
    }

    #[test]
    fn texture_ids_are_unique() {
        let a = radial_floor_texture(2, 0.0);
        let b = radial_floor_texture(2, 0.0);
        assert_ne!(a.id(), b.id());
    }
}
