use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Perspective projection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y.to_radians(),
            self.aspect.max(0.01),
            self.near,
            self.far,
        )
    }
}

/// Perspective camera. The view is always rebuilt from the current position
/// by [`Camera::look_at`]; the projection matrix is cached and refreshed
/// lazily after [`Camera::set_aspect`].
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    up: Vec3,
    view: Mat4,
    projection: Projection,
    projection_matrix: Mat4,
    projection_dirty: bool,
}

impl Camera {
    pub fn new(position: Vec3, projection: Projection) -> Self {
        Self {
            position,
            up: Vec3::Y,
            view: Mat4::from_translation(-position),
            projection_matrix: projection.matrix(),
            projection,
            projection_dirty: false,
        }
    }

    /// Aims the camera at `target` from its current position.
    ///
    /// Degenerate configurations (target on the camera, or straight along
    /// the up axis) keep the previous view.
    pub fn look_at(&mut self, target: Vec3) {
        let forward = target - self.position;
        if forward.length_squared() <= f32::EPSILON
            || forward.cross(self.up).length_squared() <= f32::EPSILON
        {
            return;
        }
        self.view = Mat4::look_at_rh(self.position, target, self.up);
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    /// Direction the camera faces in world space.
    pub fn forward(&self) -> Vec3 {
        -self.view.inverse().z_axis.truncate().normalize_or_zero()
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn aspect(&self) -> f32 {
        self.projection.aspect
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if self.projection.aspect != aspect {
            self.projection.aspect = aspect;
            self.projection_dirty = true;
        }
    }

    pub fn is_projection_dirty(&self) -> bool {
        self.projection_dirty
    }

    /// Rebuilds the cached projection matrix if the projection changed.
    pub fn update_projection_matrix(&mut self) {
        if self.projection_dirty {
            self.projection_matrix = self.projection.matrix();
            self.projection_dirty = false;
        }
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection_matrix * self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(
            Vec3::new(0.0, 0.0, 10.0),
            Projection {
                fov_y: 40.0,
                aspect: 1.0,
                near: 1.0,
                far: 1000.0,
            },
        )
    }

    #[test]
    fn look_at_faces_the_target() {
        let mut camera = camera();
        camera.position = Vec3::new(3.0, -2.0, 10.0);
        camera.look_at(Vec3::ZERO);
        let expected = (Vec3::ZERO - camera.position).normalize();
        assert!(camera.forward().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn look_at_is_recomputed_not_accumulated() {
        let mut a = camera();
        a.position = Vec3::new(1.0, 1.0, 10.0);
        a.look_at(Vec3::ZERO);
        a.position = Vec3::new(2.0, 0.5, 10.0);
        a.look_at(Vec3::ZERO);

        let mut b = camera();
        b.position = Vec3::new(2.0, 0.5, 10.0);
        b.look_at(Vec3::ZERO);
        assert_eq!(a.view(), b.view());
    }

    #[test]
    fn degenerate_look_at_keeps_previous_view() {
        let mut camera = camera();
        camera.look_at(Vec3::ZERO);
        let before = camera.view();
        camera.look_at(camera.position);
        assert_eq!(camera.view(), before);
        assert!(!camera.view().is_nan());
    }

    #[test]
    fn aspect_change_marks_projection_dirty() {
        let mut camera = camera();
        let before = camera.projection_matrix();
        camera.set_aspect(2.0);
        assert!(camera.is_projection_dirty());
        camera.update_projection_matrix();
        assert!(!camera.is_projection_dirty());
        assert_ne!(camera.projection_matrix(), before);
    }
}
