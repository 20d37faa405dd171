/// Mesh and material data model shared by the parsers and the renderer
use std::collections::HashMap;

/// Reflectance record for one named material
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    pub opacity: f32,
}

impl Material {
    /// Record opened by a `newmtl` line, before any property lines overwrite it.
    /// Note the ambient differs from the renderer fallback in `Default`.
    pub fn newmtl_defaults() -> Self {
        Self {
            ambient: [1.0, 1.0, 1.0],
            ..Self::default()
        }
    }
}

impl Default for Material {
    /// Fallback record used when a group references a name absent from the table.
    fn default() -> Self {
        Self {
            ambient: [0.2, 0.2, 0.2],
            diffuse: [0.8, 0.8, 0.8],
            specular: [0.5, 0.5, 0.5],
            shininess: 32.0,
            opacity: 1.0,
        }
    }
}

/// A contiguous run of triangle indices sharing one material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialGroup {
    /// Offset into the index array, in indices (not bytes)
    pub start_index: u32,
    pub index_count: u32,
}

/// A fully assembled, renderable mesh
///
/// Positions and normals are flat 3xN arrays over the same N vertices;
/// indices are triangle corners in u16 range. Constructed once per load and
/// immutable afterwards; a new load replaces it wholesale.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u16>,
    /// Material groups in first-seen order
    pub material_groups: Vec<(String, MaterialGroup)>,
    pub materials: HashMap<String, Material>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Material for a group name, falling back to the default record.
    pub fn material_or_default(&self, name: &str) -> Material {
        self.materials.get(name).copied().unwrap_or_default()
    }
}
