/// Axis-aligned bounding box and mesh normalization
/// An axis-aligned bounding box in object space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    /// Compute the box over a flat 3xN position array.
    /// An empty array yields a zero-sized box at the origin.
    pub fn from_positions(positions: &[f32]) -> Self {
        if positions.is_empty() {
            return Self {
                min: [0.0; 3],
                max: [0.0; 3],
            };
        }

        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for position in positions.chunks_exact(3) {
            for axis in 0..3 {
                min[axis] = min[axis].min(position[axis]);
                max[axis] = max[axis].max(position[axis]);
            }
        }
        Self { min, max }
    }

    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }

    pub fn extent(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn longest_extent(&self) -> f32 {
        let extent = self.extent();
        extent[0].max(extent[1]).max(extent[2])
    }
}

/// Recenter and rescale positions in place so the mesh spans exactly 2 units
/// along its longest axis, centered at the origin. Aspect ratio is preserved
/// on the other axes.
///
/// A zero-extent mesh (all positions identical) keeps scale 1.0 instead of
/// scaling to infinity; it is still recentered.
///
/// Returns the bounding box of the positions before rewriting.
pub fn normalize_positions(positions: &mut [f32]) -> BoundingBox {
    let bbox = BoundingBox::from_positions(positions);
    let center = bbox.center();
    let longest = bbox.longest_extent();
    let scale = if longest > 0.0 { 2.0 / longest } else { 1.0 };

    for position in positions.chunks_exact_mut(3) {
        for axis in 0..3 {
            position[axis] = (position[axis] - center[axis]) * scale;
        }
    }

    bbox
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_bounding_box() {
        let positions = [1.0, 2.0, 3.0, -1.0, 4.0, 0.0];
        let bbox = BoundingBox::from_positions(&positions);
        assert_eq!(bbox.min, [-1.0, 2.0, 0.0]);
        assert_eq!(bbox.max, [1.0, 4.0, 3.0]);
        assert_eq!(bbox.center(), [0.0, 3.0, 1.5]);
        assert_eq!(bbox.longest_extent(), 3.0);
    }

    #[test]
    fn test_empty_positions() {
        let bbox = BoundingBox::from_positions(&[]);
        assert_eq!(bbox.min, [0.0; 3]);
        assert_eq!(bbox.max, [0.0; 3]);
        assert_eq!(bbox.longest_extent(), 0.0);
    }

    #[test]
    fn test_normalization_invariant() {
        // An uneven box: extents 4 x 2 x 1, offset from the origin
        let mut positions = vec![
            10.0, 20.0, 30.0, //
            14.0, 20.0, 30.0, //
            14.0, 22.0, 30.0, //
            10.0, 22.0, 31.0,
        ];
        normalize_positions(&mut positions);

        let bbox = BoundingBox::from_positions(&positions);
        assert!((bbox.longest_extent() - 2.0).abs() < EPSILON);
        for axis in 0..3 {
            assert!(bbox.center()[axis].abs() < EPSILON);
        }
        // Aspect ratio preserved: 4:2:1 becomes 2:1:0.5
        let extent = bbox.extent();
        assert!((extent[0] - 2.0).abs() < EPSILON);
        assert!((extent[1] - 1.0).abs() < EPSILON);
        assert!((extent[2] - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_degenerate_box_recenters_without_scaling() {
        let mut positions = vec![3.0, 4.0, 5.0, 3.0, 4.0, 5.0];
        normalize_positions(&mut positions);
        // Scale clamps to 1.0, positions collapse onto the origin
        for value in &positions {
            assert!(value.abs() < EPSILON);
            assert!(value.is_finite());
        }
    }
}
