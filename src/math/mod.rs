mod aabb;
mod color;
mod jitter;

pub use aabb::AABB;
pub use color::hex_to_rgb;
pub use jitter::halton;
