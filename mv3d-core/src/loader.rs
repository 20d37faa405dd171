/// Mesh assembly: parse, synthesize normals, normalize, package
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{info, warn};
use thiserror::Error;

use crate::bounds::normalize_positions;
use crate::mesh::{Material, MeshData};
use crate::mtl::parse_mtl;
use crate::normals::synthesize_normals;
use crate::obj::{parse_obj, ObjError, ParsePolicy};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ObjError),
}

/// Assemble a renderable mesh from OBJ text and an already-parsed material
/// table. This is the text-level entry point; `load_model` adds file IO on
/// top of it.
pub fn assemble(
    obj_text: &str,
    materials: HashMap<String, Material>,
    policy: ParsePolicy,
) -> Result<MeshData, ObjError> {
    let obj = parse_obj(obj_text, policy)?;
    let vertex_count = obj.positions.len() / 3;
    let normals = synthesize_normals(&obj.normal_accumulators, vertex_count);

    let mut positions = obj.positions;
    normalize_positions(&mut positions);

    Ok(MeshData {
        positions,
        normals,
        indices: obj.indices,
        material_groups: obj.material_groups,
        materials,
    })
}

/// Load a model from disk.
///
/// An unreadable OBJ file aborts the load; an unreadable material library
/// degrades to an empty table so the mesh still displays with default
/// shading.
pub fn load_model(
    obj_path: &Path,
    mtl_path: Option<&Path>,
    policy: ParsePolicy,
) -> Result<MeshData, LoadError> {
    let obj_text = fs::read_to_string(obj_path).map_err(|source| LoadError::Io {
        path: obj_path.display().to_string(),
        source,
    })?;

    let materials = match mtl_path {
        Some(path) => match fs::read_to_string(path) {
            Ok(text) => parse_mtl(&text),
            Err(err) => {
                warn!(
                    "material library {} unavailable ({err}), rendering with defaults",
                    path.display()
                );
                HashMap::new()
            }
        },
        None => HashMap::new(),
    };

    let mesh = assemble(&obj_text, materials, policy)?;
    info!(
        "loaded {}: {} vertices, {} triangles, {} material groups",
        obj_path.display(),
        mesh.vertex_count(),
        mesh.triangle_count(),
        mesh.material_groups.len()
    );
    Ok(mesh)
}

/// Unit cube shown before the first model load
const CUBE_OBJ: &str = "\
v -1 -1  1
v  1 -1  1
v  1  1  1
v -1  1  1
v -1 -1 -1
v  1 -1 -1
v  1  1 -1
v -1  1 -1
f 1 2 3 4
f 6 5 8 7
f 4 3 7 8
f 5 6 2 1
f 2 6 7 3
f 5 1 4 8
";

/// Built-in fallback mesh for when no model file has been supplied.
pub fn builtin_cube() -> MeshData {
    match assemble(CUBE_OBJ, HashMap::new(), ParsePolicy::Strict) {
        Ok(mesh) => mesh,
        // The cube source is a compile-time constant; a parse failure here
        // is a programming error, not a runtime condition.
        Err(err) => unreachable!("built-in cube mesh failed to parse: {err}"),
    }
}
