/// MV3D Core Library - Model parsing, normal synthesis, and camera logic
///
/// This library provides the stateless core of the viewer: OBJ geometry
/// parsing with material-group batching, per-vertex normal synthesis,
/// bounding-box normalization, MTL material tables, and the orbit camera
/// with its view/projection matrix derivation. It has no windowing or GPU
/// dependencies.
pub mod bounds;
pub mod camera;
pub mod loader;
pub mod mesh;
pub mod mtl;
pub mod normals;
pub mod obj;

// Re-export commonly used types
pub use bounds::BoundingBox;
pub use camera::{perspective_matrix, OrbitCamera};
pub use loader::{assemble, builtin_cube, load_model, LoadError};
pub use mesh::{Material, MaterialGroup, MeshData};
pub use mtl::parse_mtl;
pub use obj::{parse_obj, ObjError, ParsePolicy};
