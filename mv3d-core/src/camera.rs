/// Orbit camera state machine and view/projection matrix derivation
use nalgebra::{Matrix4, Vector3};

pub const ROTATION_SPEED: f32 = 0.005;
pub const ZOOM_SPEED: f32 = 0.001;
pub const MIN_ZOOM: f32 = 2.0;
pub const MAX_ZOOM: f32 = 20.0;
/// Just short of straight up/down, avoiding the gimbal flip at the poles
pub const MAX_ROTATION_X: f32 = std::f32::consts::PI / 2.2;

const DEFAULT_ZOOM: f32 = 5.0;

/// Orbit/zoom camera driven by pointer or single-finger drag gestures.
///
/// Both input modalities feed the same three drag operations; the caller is
/// responsible for routing platform events here.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub rotation_x: f32,
    pub rotation_y: f32,
    pub zoom: f32,
    dragging: bool,
    last_x: f32,
    last_y: f32,
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self {
            rotation_x: 0.0,
            rotation_y: 0.0,
            zoom: DEFAULT_ZOOM,
            dragging: false,
            last_x: 0.0,
            last_y: 0.0,
        }
    }

    pub fn drag_start(&mut self, x: f32, y: f32) {
        self.dragging = true;
        self.last_x = x;
        self.last_y = y;
    }

    /// Apply an incremental drag sample. No-op unless a drag is active.
    pub fn drag_move(&mut self, x: f32, y: f32) {
        if !self.dragging {
            return;
        }

        let dx = x - self.last_x;
        let dy = y - self.last_y;

        self.rotation_y += dx * ROTATION_SPEED;
        self.rotation_x = (self.rotation_x + dy * ROTATION_SPEED)
            .clamp(-MAX_ROTATION_X, MAX_ROTATION_X);

        self.last_x = x;
        self.last_y = y;
    }

    /// End the drag. There is no inertia.
    pub fn drag_end(&mut self) {
        self.dragging = false;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Wheel/pinch zoom; positive deltas move the camera away.
    pub fn zoom_by(&mut self, delta: f32) {
        self.zoom = (self.zoom + delta * ZOOM_SPEED).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn reset(&mut self) {
        self.rotation_x = 0.0;
        self.rotation_y = 0.0;
        self.zoom = DEFAULT_ZOOM;
    }

    /// Derive the view transform: translate back along the view axis, then
    /// rotate about X, then about Y. The multiplication order is fixed;
    /// changing it changes which axes the rotations happen around.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        let translation = Matrix4::new_translation(&Vector3::new(0.0, 0.0, -self.zoom));
        let rotate_x = Matrix4::new_rotation(Vector3::x() * self.rotation_x);
        let rotate_y = Matrix4::new_rotation(Vector3::y() * self.rotation_y);
        translation * rotate_x * rotate_y
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}

/// Perspective projection shared by the renderer: fixed 45 degree vertical
/// field of view, near 0.1, far 100.
pub fn perspective_matrix(width: u32, height: u32) -> Matrix4<f32> {
    let aspect = width as f32 / height.max(1) as f32;
    Matrix4::new_perspective(aspect, std::f32::consts::PI / 4.0, 0.1, 100.0)
}
