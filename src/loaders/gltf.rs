use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use glam::{EulerRot, Quat, Vec2, Vec3};
use log::{debug, info, warn};

use super::worker::off_thread;
use crate::scene::{Geometry, Material, Node, NodeRef, Topology};
use crate::texture::Texture;

/// Where a glTF document comes from
#[derive(Debug, Clone)]
pub enum GltfSource {
    Path(PathBuf),
    /// Self-contained `.glb` or embedded `.gltf`
    Bytes(Vec<u8>),
}

impl GltfSource {
    pub fn path(path: impl AsRef<Path>) -> Self {
        Self::Path(path.as_ref().to_path_buf())
    }

    fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

/// Parsed document with buffers and decoded textures.
///
/// Holds no `Rc`, so it can be produced on a loader thread and handed back to
/// the event loop for node conversion.
pub struct GltfData {
    description: String,
    document: gltf::Document,
    buffers: Vec<gltf::buffer::Data>,
    textures: Vec<Texture>,
}

/// Decoded document plus everything node conversion needs
struct Imported {
    document: gltf::Document,
    buffers: Vec<gltf::buffer::Data>,
    textures: Vec<Rc<Texture>>,
    materials: Vec<Rc<Material>>,
    default_material: Rc<Material>,
}

/// Reads and decodes a glTF document and its images. Blocking.
pub fn import_gltf(source: &GltfSource) -> Result<GltfData> {
    let (document, buffers, images) = match source {
        GltfSource::Path(path) => gltf::import(path),
        GltfSource::Bytes(bytes) => gltf::import_slice(bytes),
    }
    .with_context(|| format!("Failed to load glTF file: {}", source.describe()))?;

    let textures = images
        .iter()
        .enumerate()
        .map(|(index, image)| convert_image(index, image))
        .collect::<Result<Vec<_>>>()?;

    Ok(GltfData {
        description: source.describe(),
        document,
        buffers,
        textures,
    })
}

/// Loads the default scene of a glTF document as one group node.
///
/// Node transforms are kept as local position/rotation/scale, so the returned
/// hierarchy matches the document. Meshes with a single primitive become mesh
/// nodes; multi-primitive meshes become a group of mesh nodes.
pub fn load_gltf(source: &GltfSource) -> Result<NodeRef> {
    build_gltf(import_gltf(source)?)
}

/// [`load_gltf`] with reading and decoding moved to a loader thread
pub async fn load_gltf_async(source: GltfSource) -> Result<NodeRef> {
    let data = off_thread(source.describe(), move || import_gltf(&source)).await?;
    build_gltf(data)
}

/// Converts imported data into a node hierarchy
pub fn build_gltf(data: GltfData) -> Result<NodeRef> {
    let GltfData {
        description,
        document,
        buffers,
        textures,
    } = data;

    let mut imported = Imported {
        document,
        buffers,
        materials: Vec::new(),
        textures: textures.into_iter().map(Rc::new).collect(),
        default_material: Rc::new(Material::standard(Vec3::splat(0.7))),
    };
    imported.materials = imported
        .document
        .materials()
        .map(|material| Rc::new(convert_material(&material, &imported.textures)))
        .collect();

    let scene = match imported.document.default_scene() {
        Some(scene) => scene,
        None => match imported.document.scenes().next() {
            Some(scene) => scene,
            None => bail!("glTF file {description} contains no scene"),
        },
    };

    let root = Node::group()
        .with_name(scene.name().unwrap_or("gltf scene"))
        .into_ref();
    let mut mesh_nodes = 0;
    for node in scene.nodes() {
        let child = convert_node(&node, &imported, &mut mesh_nodes)?;
        root.borrow_mut().add_child(child);
    }

    info!(
        "Loaded glTF {}: {} nodes, {} mesh nodes, {} materials, {} textures",
        description,
        imported.document.nodes().count(),
        mesh_nodes,
        imported.materials.len(),
        imported.textures.len()
    );
    Ok(root)
}

fn convert_node(node: &gltf::Node, imported: &Imported, mesh_nodes: &mut usize) -> Result<NodeRef> {
    let (translation, rotation, scale) = node.transform().decomposed();
    let (x, y, z) = Quat::from_array(rotation).to_euler(EulerRot::XYZ);

    let mut converted = Node::group().with_name(node.name().unwrap_or_default());
    converted.position = Vec3::from_array(translation);
    converted.rotation = Vec3::new(x, y, z);
    converted.scale = Vec3::from_array(scale);

    if let Some(mesh) = node.mesh() {
        let mut parts = Vec::new();
        for primitive in mesh.primitives() {
            if let Some(part) = convert_primitive(&primitive, imported)? {
                parts.push(part);
            }
        }
        *mesh_nodes += parts.len();

        if parts.len() == 1 {
            if let Some(part) = parts.pop() {
                converted.kind = part.kind;
            }
        } else {
            for part in parts {
                converted.add_child(part.into_ref());
            }
        }
    }

    let converted = converted.into_ref();
    for child in node.children() {
        let child = convert_node(&child, imported, mesh_nodes)?;
        converted.borrow_mut().add_child(child);
    }
    Ok(converted)
}

fn convert_primitive(primitive: &gltf::Primitive, imported: &Imported) -> Result<Option<Node>> {
    let topology = match primitive.mode() {
        gltf::mesh::Mode::Triangles => Topology::Triangles,
        gltf::mesh::Mode::Lines => Topology::Lines,
        mode => {
            warn!("Skipping glTF primitive with unsupported mode {mode:?}");
            return Ok(None);
        }
    };

    let reader = primitive.reader(|buffer| imported.buffers.get(buffer.index()).map(|data| data.0.as_slice()));
    let positions: Vec<Vec3> = reader
        .read_positions()
        .context("Mesh primitive has no positions")?
        .map(Vec3::from_array)
        .collect();
    if positions.is_empty() {
        return Ok(None);
    }

    let mut geometry = Geometry::new(topology, positions);
    if let Some(normals) = reader.read_normals() {
        geometry = geometry.with_normals(normals.map(Vec3::from_array).collect());
    }
    if let Some(uvs) = reader.read_tex_coords(0) {
        geometry = geometry.with_uvs(uvs.into_f32().map(Vec2::from_array).collect());
    }
    if let Some(colors) = reader.read_colors(0) {
        geometry = geometry.with_colors(colors.into_rgb_f32().map(Vec3::from_array).collect());
    }
    if let Some(indices) = reader.read_indices() {
        geometry = geometry.with_indices(indices.into_u32().collect());
    }

    let material = primitive
        .material()
        .index()
        .and_then(|index| imported.materials.get(index))
        .unwrap_or(&imported.default_material);

    Ok(Some(Node::mesh(Rc::new(geometry), Rc::clone(material))))
}

fn convert_material(material: &gltf::Material, textures: &[Rc<Texture>]) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, a] = pbr.base_color_factor();

    let mut converted = Material::standard(Vec3::new(r, g, b));
    converted.opacity = a;
    converted.transparent = material.alpha_mode() == gltf::material::AlphaMode::Blend;
    converted.metalness = pbr.metallic_factor();
    converted.roughness = pbr.roughness_factor();
    converted.map = pbr
        .base_color_texture()
        .and_then(|info| textures.get(info.texture().source().index()))
        .cloned();
    converted
}

fn convert_image(index: usize, image: &gltf::image::Data) -> Result<Texture> {
    debug!("Texture {}: {}x{} ({:?})", index, image.width, image.height, image.format);

    let texels = (image.width * image.height) as usize;
    let rgba = match image.format {
        gltf::image::Format::R8G8B8A8 => image.pixels.clone(),
        gltf::image::Format::R8G8B8 => image
            .pixels
            .chunks_exact(3)
            .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 255])
            .collect(),
        gltf::image::Format::R8G8 => image
            .pixels
            .chunks_exact(2)
            .flat_map(|rg| [rg[0], rg[1], 0, 255])
            .collect(),
        gltf::image::Format::R8 => image.pixels.iter().flat_map(|&l| [l, l, l, 255]).collect(),
        format => {
            warn!("Unsupported texture format {format:?} for image {index}, using white");
            vec![255; texels * 4]
        }
    };

    Texture::rgba8(image.width, image.height, rgba).with_context(|| format!("glTF image {index}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal embedded glTF: one triangle under a translated parent node
    fn triangle_gltf() -> Vec<u8> {
        // 3 positions (36 bytes) + 3 u16 indices (6 bytes, padded to 8)
        let mut bin = Vec::new();
        for v in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in v {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        bin.extend_from_slice(&[0, 0]);

        let json = serde_json::json!({
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "name": "triangle", "nodes": [0] }],
            "nodes": [
                { "name": "parent", "translation": [0.0, 2.0, 0.0], "children": [1] },
                { "name": "leaf", "mesh": 0 }
            ],
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }] }],
            "materials": [{ "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.5, 0.25, 1.0], "metallicFactor": 0.0 } }],
            "buffers": [{ "byteLength": bin.len(), "uri": data_uri(&bin) }],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
            ],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                  "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
                { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
            ]
        });
        serde_json::to_vec(&json).unwrap()
    }

    fn data_uri(bytes: &[u8]) -> String {
        const TABLE: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
        let mut out = String::from("data:application/octet-stream;base64,");
        for chunk in bytes.chunks(3) {
            let n = chunk.iter().enumerate().fold(0u32, |acc, (i, b)| acc | (*b as u32) << (16 - 8 * i));
            for i in 0..4 {
                if i <= chunk.len() {
                    out.push(TABLE[(n >> (18 - 6 * i) & 63) as usize] as char);
                } else {
                    out.push('=');
                }
            }
        }
        out
    }

    #[test]
    fn loads_hierarchy_from_bytes() {
        let root = load_gltf(&GltfSource::Bytes(triangle_gltf())).unwrap();
        let root = root.borrow();
        assert_eq!(root.name, "triangle");
        assert_eq!(root.children().len(), 1);

        let parent = root.children()[0].borrow();
        assert_eq!(parent.name, "parent");
        assert_eq!(parent.position, Vec3::new(0.0, 2.0, 0.0));

        let leaf = parent.children()[0].borrow();
        let mesh = leaf.as_mesh().unwrap();
        assert_eq!(mesh.geometry.vertex_count(), 3);
        assert_eq!(mesh.geometry.indices, vec![0, 1, 2]);
        assert_eq!(mesh.material.color, Vec3::new(1.0, 0.5, 0.25));
        assert_eq!(mesh.material.metalness, 0.0);
    }

    #[test]
    fn async_load_builds_the_same_hierarchy() {
        let root = pollster::block_on(load_gltf_async(GltfSource::Bytes(triangle_gltf()))).unwrap();
        let root = root.borrow();
        assert_eq!(root.name, "triangle");
        assert_eq!(root.children()[0].borrow().name, "parent");
    }

    #[test]
    fn async_load_reports_decode_errors() {
        let err = pollster::block_on(load_gltf_async(GltfSource::path("/nonexistent/model.glb"))).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to load glTF file"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_gltf(&GltfSource::path("/nonexistent/model.glb")).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to load glTF file"));
    }

    #[test]
    fn garbage_bytes_are_an_error() {
        assert!(load_gltf(&GltfSource::Bytes(b"not a gltf".to_vec())).is_err());
    }
}
