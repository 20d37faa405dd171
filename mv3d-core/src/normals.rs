/// Per-vertex normal synthesis from accumulated face normals
use std::collections::HashMap;

/// Default direction for vertices no face ever referenced
const UNREFERENCED_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];

/// Turn per-vertex normal accumulators into a flat 3xN normal array.
///
/// A vertex absent from the accumulator map gets (0, 0, 1). A vertex that
/// was referenced but whose contributions cancel to zero magnitude keeps the
/// zero vector; it is not substituted and not renormalized. The asymmetry is
/// deliberate and matches the averaging behavior the renderer expects.
pub fn synthesize_normals(
    accumulators: &HashMap<usize, [f32; 3]>,
    vertex_count: usize,
) -> Vec<f32> {
    let mut normals = Vec::with_capacity(vertex_count * 3);
    for vertex in 0..vertex_count {
        let mut normal = *accumulators.get(&vertex).unwrap_or(&UNREFERENCED_NORMAL);
        let length =
            (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
        if length > 0.0 {
            normal = [
                normal[0] / length,
                normal[1] / length,
                normal[2] / length,
            ];
        }
        normals.extend_from_slice(&normal);
    }
    normals
}
