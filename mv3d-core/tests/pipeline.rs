/// End-to-end mesh assembly tests over the full parse -> synthesize ->
/// normalize pipeline
use std::collections::HashMap;

use mv3d_core::bounds::BoundingBox;
use mv3d_core::{assemble, parse_mtl, ParsePolicy};

const EPSILON: f32 = 1e-6;

#[test]
fn obj_and_mtl_assemble_into_grouped_mesh() {
    let obj = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0 0 1
usemtl shell
f 1 2 3 4
usemtl trim
f 1 2 5
";
    let mtl = "\
newmtl shell
Kd 0.9 0.2 0.2
Ns 64
newmtl trim
Kd 0.2 0.2 0.9
Tr 0.5
";

    let mesh = assemble(obj, parse_mtl(mtl), ParsePolicy::Strict).unwrap();

    assert_eq!(mesh.vertex_count(), 5);
    assert_eq!(mesh.triangle_count(), 3);

    assert_eq!(mesh.material_groups.len(), 2);
    let (shell_name, shell) = &mesh.material_groups[0];
    let (trim_name, trim) = &mesh.material_groups[1];
    assert_eq!(shell_name, "shell");
    assert_eq!(shell.start_index, 0);
    assert_eq!(shell.index_count, 6);
    assert_eq!(trim_name, "trim");
    assert_eq!(trim.start_index, 6);
    assert_eq!(trim.index_count, 3);

    assert_eq!(mesh.material_or_default("shell").diffuse, [0.9, 0.2, 0.2]);
    assert_eq!(mesh.material_or_default("trim").opacity, 0.5);
}

#[test]
fn group_without_material_record_falls_back_to_defaults() {
    let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl mystery\nf 1 2 3\n";
    let mesh = assemble(obj, HashMap::new(), ParsePolicy::Strict).unwrap();

    let material = mesh.material_or_default("mystery");
    assert_eq!(material.ambient, [0.2, 0.2, 0.2]);
    assert_eq!(material.diffuse, [0.8, 0.8, 0.8]);
    assert_eq!(material.specular, [0.5, 0.5, 0.5]);
    assert_eq!(material.shininess, 32.0);
    assert_eq!(material.opacity, 1.0);
}

#[test]
fn assembled_mesh_is_normalized_to_two_unit_span() {
    let obj = "\
v 10 0 0
v 50 0 0
v 50 20 0
v 10 20 5
f 1 2 3 4
";
    let mesh = assemble(obj, HashMap::new(), ParsePolicy::Strict).unwrap();
    let bbox = BoundingBox::from_positions(&mesh.positions);

    assert!((bbox.longest_extent() - 2.0).abs() < EPSILON);
    for axis in 0..3 {
        assert!(bbox.center()[axis].abs() < EPSILON);
    }
}

#[test]
fn cancelling_faces_leave_zero_normals_while_unreferenced_default() {
    // Same triangle wound both ways: contributions cancel exactly.
    // A fourth vertex no face touches gets the (0, 0, 1) default.
    let obj = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 5 5 5
f 1 2 3
f 3 2 1
";
    let mesh = assemble(obj, HashMap::new(), ParsePolicy::Strict).unwrap();

    for vertex in 0..3 {
        let normal = &mesh.normals[vertex * 3..vertex * 3 + 3];
        assert_eq!(normal, &[0.0, 0.0, 0.0]);
    }
    assert_eq!(&mesh.normals[9..12], &[0.0, 0.0, 1.0]);
}

#[test]
fn lenient_policy_assembles_despite_junk_lines() {
    let obj = "\
v 0 0 0
v 1 0 banana
v 1 0 0
v 0 1 0
f 1 2 99
f 1 2 3
";
    let mesh = assemble(obj, HashMap::new(), ParsePolicy::Lenient).unwrap();
    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.triangle_count(), 1);
}

#[test]
fn strict_policy_aborts_on_first_bad_line() {
    let obj = "v 0 0 0\nv 1 0 banana\n";
    assert!(assemble(obj, HashMap::new(), ParsePolicy::Strict).is_err());
}
