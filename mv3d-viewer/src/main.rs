/// MV3D - Interactive 3D model viewer
///
/// Usage: mv3d [model.obj] [materials.mtl]
///
/// With no arguments a built-in cube is shown. A material library is looked
/// up next to the OBJ file when none is given explicitly. Models can also be
/// dropped onto the window at any time.
///
/// Controls:
///   - Drag: orbit the model
///   - Wheel: zoom (2x to 20x distance)
///   - Double click: reset the camera
use std::path::PathBuf;

use anyhow::Result;

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let obj_path = args.next().map(PathBuf::from);
    let mtl_path = args.next().map(PathBuf::from);

    mv3d_viewer::run(obj_path, mtl_path)
}
