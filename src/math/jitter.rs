/// Radical inverse of `index` in the given base, in [0, 1)
pub fn halton(index: u32, base: u32) -> f32 {
    let mut result = 0.0;
    let mut fraction = 1.0 / base as f32;
    let mut i = index;
    while i > 0 {
        result += (i % base) as f32 * fraction;
        i /= base;
        fraction /= base as f32;
    }
    result
}
