pub mod environment;
pub mod gltf;
mod worker;

pub use environment::{load_environment, load_environment_async, load_environment_from_bytes};
pub use self::gltf::{build_gltf, import_gltf, load_gltf, load_gltf_async, GltfData, GltfSource};
