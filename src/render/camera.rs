use crate::config::CameraConfig;
use crate::render::pick::Ray;
use glam::{Mat4, Vec2, Vec3, Vec4};

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;
const MIN_DISTANCE: f32 = 0.5;

/// Camera orbiting a target point. Yaw and pitch describe the viewing
/// direction; the eye sits `distance` behind the target along it.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    viewport_origin: Vec2,
    viewport_size: Vec2,
}

impl OrbitCamera {
    pub fn new(eye: Vec3, target: Vec3, fov_y: f32, near: f32, far: f32) -> Self {
        let offset = target - eye;
        let distance = offset.length().max(MIN_DISTANCE);
        let (yaw, pitch) = forward_to_yaw_pitch(offset);
        Self {
            target,
            distance,
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            fov_y,
            aspect: 1.0,
            near,
            far,
            viewport_origin: Vec2::ZERO,
            viewport_size: Vec2::ONE,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(
            Vec3::from_array(config.position),
            Vec3::from_array(config.target),
            config.fov_deg.to_radians(),
            config.near,
            config.far,
        )
    }

    pub fn forward(&self) -> Vec3 {
        camera_basis(self.yaw, self.pitch).0
    }

    /// (forward, right, up)
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        camera_basis(self.yaw, self.pitch)
    }

    pub fn eye(&self) -> Vec3 {
        self.target - self.forward() * self.distance
    }

    /// Rotates around the target. Deltas are pointer travel in points.
    pub fn orbit(&mut self, delta: Vec2, speed: f32) {
        self.yaw += delta.x * speed;
        self.pitch = (self.pitch - delta.y * speed).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw = wrap_angle(self.yaw);
    }

    /// Slides the target in the view plane so the scene follows the pointer.
    pub fn pan(&mut self, delta: Vec2) {
        let (_, right, up) = self.basis();
        let world_per_point =
            2.0 * self.distance * (self.fov_y * 0.5).tan() / self.viewport_size.y.max(1.0);
        self.target += (-right * delta.x + up * delta.y) * world_per_point;
    }

    /// Positive `lines` moves closer.
    pub fn zoom(&mut self, lines: f32, step: f32) {
        let factor = (1.0 - step.clamp(0.0, 0.9)).powf(lines);
        self.distance = (self.distance * factor).clamp(MIN_DISTANCE, self.far * 0.5);
    }

    /// Sets the on-screen rectangle the scene is drawn into. Returns `false`
    /// and keeps the previous state for empty rectangles.
    pub fn set_viewport(&mut self, origin: Vec2, size: Vec2) -> bool {
        if !(size.x >= 1.0 && size.y >= 1.0) {
            return false;
        }
        self.viewport_origin = origin;
        self.viewport_size = size;
        self.aspect = size.x / size.y;
        true
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    pub fn screen_to_ndc(&self, point: Vec2) -> Vec2 {
        let local = (point - self.viewport_origin) / self.viewport_size;
        Vec2::new(local.x * 2.0 - 1.0, 1.0 - local.y * 2.0)
    }

    pub fn ndc_to_screen(&self, ndc: Vec2) -> Vec2 {
        let local = Vec2::new((ndc.x + 1.0) * 0.5, (1.0 - ndc.y) * 0.5);
        self.viewport_origin + local * self.viewport_size
    }

    /// World-space ray from the eye through a screen point.
    pub fn ray_from_screen(&self, point: Vec2) -> Ray {
        let ndc = self.screen_to_ndc(point);
        let inverse = self.view_projection().inverse();
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        Ray::new(self.eye(), (far - near).normalize_or_zero())
    }

    pub fn to_clip(&self, world: Vec3) -> Vec4 {
        self.view_projection() * world.extend(1.0)
    }

    /// Screen position of a world point, `None` when it is behind the near plane.
    pub fn project(&self, world: Vec3) -> Option<Vec2> {
        let clip = self.to_clip(world);
        if clip.w < self.near {
            return None;
        }
        Some(self.ndc_to_screen(clip.truncate().truncate() / clip.w))
    }
}

fn forward_to_yaw_pitch(forward: Vec3) -> (f32, f32) {
    let dir = forward.normalize_or_zero();
    if dir == Vec3::ZERO {
        return (0.0, 0.0);
    }
    (dir.z.atan2(dir.x), dir.y.clamp(-1.0, 1.0).asin())
}

fn camera_basis(yaw: f32, pitch: f32) -> (Vec3, Vec3, Vec3) {
    let cos_pitch = pitch.cos();
    let forward = Vec3::new(yaw.cos() * cos_pitch, pitch.sin(), yaw.sin() * cos_pitch);
    let right = Vec3::new(-yaw.sin(), 0.0, yaw.cos());
    let up = right.cross(forward).normalize_or_zero();
    (forward, right, up)
}

fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    if angle.is_finite() {
        (angle + PI).rem_euclid(TAU) - PI
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> OrbitCamera {
        let mut camera = OrbitCamera::from_config(&CameraConfig::default());
        camera.set_viewport(Vec2::ZERO, Vec2::new(800.0, 600.0));
        camera
    }

    #[test]
    fn from_config_keeps_eye_position() {
        let camera = OrbitCamera::from_config(&CameraConfig::default());
        assert!((camera.eye() - Vec3::new(-10.0, 30.0, 30.0)).length() < 1e-3);
        assert!(camera.yaw.is_finite() && camera.pitch.is_finite());
    }

    #[test]
    fn viewport_sets_exact_aspect() {
        let mut camera = camera();
        assert!(camera.set_viewport(Vec2::new(10.0, 20.0), Vec2::new(1024.0, 333.0)));
        assert_eq!(camera.aspect, 1024.0 / 333.0);
    }

    #[test]
    fn empty_viewport_is_ignored() {
        let mut camera = camera();
        assert!(!camera.set_viewport(Vec2::ZERO, Vec2::new(0.0, 500.0)));
        assert_eq!(camera.aspect, 800.0 / 600.0);
    }

    #[test]
    fn target_projects_to_viewport_center() {
        let camera = camera();
        let center = camera.project(camera.target).unwrap();
        assert!((center - Vec2::new(400.0, 300.0)).length() < 1e-2);
    }

    #[test]
    fn ray_through_projected_point_passes_through_it() {
        let camera = camera();
        let point = Vec3::new(3.0, 1.0, -2.0);
        let screen = camera.project(point).unwrap();
        let ray = camera.ray_from_screen(screen);
        let to_point = point - ray.origin;
        let along = to_point.dot(ray.direction);
        let miss = (to_point - ray.direction * along).length();
        assert!(miss < 1e-3, "ray misses by {miss}");
    }

    #[test]
    fn orbit_clamps_pitch() {
        let mut camera = camera();
        camera.orbit(Vec2::new(0.0, -100_000.0), 0.01);
        assert!(camera.pitch <= PITCH_LIMIT);
        assert!(camera.eye().is_finite());
    }

    #[test]
    fn zoom_in_reduces_distance() {
        let mut camera = camera();
        let before = camera.distance;
        camera.zoom(1.0, 0.1);
        assert!(camera.distance < before);
        camera.zoom(-1000.0, 0.1);
        assert_eq!(camera.distance, camera.far * 0.5);
    }

    #[test]
    fn pan_moves_target_only_in_view_plane() {
        let mut camera = camera();
        let forward = camera.forward();
        let before = camera.target;
        camera.pan(Vec2::new(25.0, -10.0));
        let moved = camera.target - before;
        assert!(moved.length() > 0.0);
        assert!(moved.dot(forward).abs() < 1e-4);
    }
}
