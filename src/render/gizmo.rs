use crate::render::camera::OrbitCamera;
use crate::render::pick::{closest_axis_parameter, ray_plane, Ray};
use crate::scene::{NodeId, Transform};
use glam::{Vec2, Vec3};

pub const SCALE_MIN: f32 = 0.0;
pub const SCALE_MAX: f32 = 3.0;
/// Ring drags stay inside the same half turn the property panel edits.
pub const ROTATION_MIN: f32 = 0.0;
pub const ROTATION_MAX: f32 = std::f32::consts::PI;

/// Handle length as a fraction of the eye distance, so handles keep a steady
/// on-screen size.
const HANDLE_SCREEN_FRACTION: f32 = 0.15;
const RING_RADIUS: f32 = 0.9;
const RING_SEGMENTS: usize = 48;
const PICK_RADIUS_PX: f32 = 10.0;
const UNIFORM_RADIUS_PX: f32 = 12.0;
/// Uniform scale change per point of vertical pointer travel.
const UNIFORM_SCALE_PER_POINT: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GizmoMode {
    #[default]
    Translate,
    Rotate,
    Scale,
}

impl GizmoMode {
    pub const ALL: [GizmoMode; 3] = [GizmoMode::Translate, GizmoMode::Rotate, GizmoMode::Scale];

    pub fn label(self) -> &'static str {
        match self {
            GizmoMode::Translate => "Translate",
            GizmoMode::Rotate => "Rotate",
            GizmoMode::Scale => "Scale",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }

    pub fn color(self) -> [u8; 3] {
        match self {
            Axis::X => [255, 80, 80],
            Axis::Y => [80, 200, 80],
            Axis::Z => [80, 160, 255],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GizmoHandle {
    /// Arrow along an axis (translate and scale modes).
    Axis(Axis),
    /// Ring around an axis (rotate mode).
    Ring(Axis),
    /// Center box for uniform scale.
    Uniform,
}

impl GizmoHandle {
    pub fn color(self) -> [u8; 3] {
        match self {
            GizmoHandle::Axis(axis) | GizmoHandle::Ring(axis) => axis.color(),
            GizmoHandle::Uniform => [240, 240, 240],
        }
    }
}

/// World-space outline of one handle, ready to project.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleShape {
    pub handle: GizmoHandle,
    pub points: Vec<Vec3>,
    pub closed: bool,
}

#[derive(Debug, Clone, Copy)]
enum DragAnchor {
    AxisParameter(f32),
    RingVector(Vec3),
    Pointer(Vec2),
}

#[derive(Debug, Clone, Copy)]
struct GizmoDrag {
    handle: GizmoHandle,
    origin: Vec3,
    start: Transform,
    anchor: DragAnchor,
}

/// Translate/rotate/scale manipulator. Holds at most one attached node.
#[derive(Debug, Default)]
pub struct TransformGizmo {
    mode: GizmoMode,
    attached: Option<NodeId>,
    drag: Option<GizmoDrag>,
    hovered: Option<GizmoHandle>,
}

impl TransformGizmo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> GizmoMode {
        self.mode
    }

    /// Switching modes cancels a drag in progress.
    pub fn set_mode(&mut self, mode: GizmoMode) {
        if self.mode != mode {
            self.mode = mode;
            self.drag = None;
            self.hovered = None;
        }
    }

    pub fn attached(&self) -> Option<NodeId> {
        self.attached
    }

    /// Binds the gizmo to `node`, releasing whatever it was bound to.
    /// Returns the node it was detached from.
    pub fn attach(&mut self, node: NodeId) -> Option<NodeId> {
        let previous = self.attached.replace(node);
        if previous != Some(node) {
            self.drag = None;
            self.hovered = None;
        }
        previous.filter(|id| *id != node)
    }

    pub fn detach(&mut self) -> Option<NodeId> {
        self.drag = None;
        self.hovered = None;
        self.attached.take()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn active_handle(&self) -> Option<GizmoHandle> {
        self.drag.map(|drag| drag.handle)
    }

    pub fn hovered(&self) -> Option<GizmoHandle> {
        self.hovered
    }

    pub fn set_hovered(&mut self, handle: Option<GizmoHandle>) {
        self.hovered = handle;
    }

    pub fn handle_length(camera: &OrbitCamera, origin: Vec3) -> f32 {
        (camera.eye().distance(origin) * HANDLE_SCREEN_FRACTION).max(1e-3)
    }

    /// Handles shown in the current mode, in world space.
    pub fn handle_shapes(&self, origin: Vec3, length: f32) -> Vec<HandleShape> {
        let mut shapes = Vec::new();
        match self.mode {
            GizmoMode::Translate | GizmoMode::Scale => {
                for axis in Axis::ALL {
                    shapes.push(HandleShape {
                        handle: GizmoHandle::Axis(axis),
                        points: vec![origin, origin + axis.unit() * length],
                        closed: false,
                    });
                }
                if self.mode == GizmoMode::Scale {
                    shapes.push(HandleShape {
                        handle: GizmoHandle::Uniform,
                        points: vec![origin],
                        closed: false,
                    });
                }
            }
            GizmoMode::Rotate => {
                for axis in Axis::ALL {
                    shapes.push(HandleShape {
                        handle: GizmoHandle::Ring(axis),
                        points: ring_points(origin, axis, length * RING_RADIUS),
                        closed: true,
                    });
                }
            }
        }
        shapes
    }

    /// Handle under a screen point. The uniform handle sits on top of the axes.
    pub fn hit_test(&self, camera: &OrbitCamera, origin: Vec3, pointer: Vec2) -> Option<GizmoHandle> {
        let length = Self::handle_length(camera, origin);
        let mut best: Option<(GizmoHandle, f32)> = None;

        for shape in self.handle_shapes(origin, length) {
            let distance = if shape.handle == GizmoHandle::Uniform {
                match camera.project(origin) {
                    Some(center) if center.distance(pointer) <= UNIFORM_RADIUS_PX => {
                        return Some(GizmoHandle::Uniform)
                    }
                    _ => continue,
                }
            } else {
                screen_distance(camera, &shape, pointer)
            };
            if distance <= PICK_RADIUS_PX && best.map_or(true, |(_, d)| distance < d) {
                best = Some((shape.handle, distance));
            }
        }

        best.map(|(handle, _)| handle)
    }

    /// Starts dragging `handle` of the attached node. `origin` is the node's
    /// world position.
    pub fn begin_drag(
        &mut self,
        handle: GizmoHandle,
        ray: &Ray,
        pointer: Vec2,
        origin: Vec3,
        start: Transform,
    ) -> bool {
        if self.attached.is_none() {
            return false;
        }
        let anchor = match handle {
            GizmoHandle::Axis(axis) => {
                match closest_axis_parameter(ray, origin, axis.unit()) {
                    Some(parameter) => DragAnchor::AxisParameter(parameter),
                    None => return false,
                }
            }
            GizmoHandle::Ring(axis) => match ray_plane(ray, origin, axis.unit()) {
                Some(hit) if hit.distance_squared(origin) > 1e-8 => {
                    DragAnchor::RingVector(hit - origin)
                }
                _ => return false,
            },
            GizmoHandle::Uniform => DragAnchor::Pointer(pointer),
        };
        self.drag = Some(GizmoDrag {
            handle,
            origin,
            start,
            anchor,
        });
        true
    }

    /// Transform the attached node should take for the current pointer.
    /// `None` when not dragging or when the ray gives no usable answer.
    pub fn update_drag(&self, ray: &Ray, pointer: Vec2) -> Option<Transform> {
        let drag = self.drag?;
        let mut transform = drag.start;

        match (drag.handle, drag.anchor) {
            (GizmoHandle::Axis(axis), DragAnchor::AxisParameter(start)) => {
                let current = closest_axis_parameter(ray, drag.origin, axis.unit())?;
                if self.mode == GizmoMode::Scale {
                    let ratio = if start.abs() > 1e-4 { current / start } else { 1.0 };
                    let index = axis.index();
                    transform.scale[index] =
                        (drag.start.scale[index] * ratio).clamp(SCALE_MIN, SCALE_MAX);
                } else {
                    transform.position = drag.start.position + axis.unit() * (current - start);
                }
            }
            (GizmoHandle::Ring(axis), DragAnchor::RingVector(start)) => {
                let hit = ray_plane(ray, drag.origin, axis.unit())?;
                let current = hit - drag.origin;
                let angle = signed_angle(start, current, axis.unit());
                let index = axis.index();
                transform.rotation[index] =
                    (drag.start.rotation[index] + angle).clamp(ROTATION_MIN, ROTATION_MAX);
            }
            (GizmoHandle::Uniform, DragAnchor::Pointer(start)) => {
                let factor = (1.0 + (start.y - pointer.y) * UNIFORM_SCALE_PER_POINT).max(0.0);
                transform.scale = (drag.start.scale * factor)
                    .clamp(Vec3::splat(SCALE_MIN), Vec3::splat(SCALE_MAX));
            }
            _ => return None,
        }

        Some(transform)
    }

    /// Ends the drag and returns the node that was being manipulated.
    pub fn end_drag(&mut self) -> Option<NodeId> {
        self.drag.take().and(self.attached)
    }
}

fn ring_points(origin: Vec3, axis: Axis, radius: f32) -> Vec<Vec3> {
    let (u, v) = match axis {
        Axis::X => (Vec3::Y, Vec3::Z),
        Axis::Y => (Vec3::Z, Vec3::X),
        Axis::Z => (Vec3::X, Vec3::Y),
    };
    (0..RING_SEGMENTS)
        .map(|i| {
            let t = i as f32 / RING_SEGMENTS as f32 * std::f32::consts::TAU;
            origin + (u * t.cos() + v * t.sin()) * radius
        })
        .collect()
}

fn signed_angle(from: Vec3, to: Vec3, axis: Vec3) -> f32 {
    axis.dot(from.cross(to)).atan2(from.dot(to))
}

fn screen_distance(camera: &OrbitCamera, shape: &HandleShape, pointer: Vec2) -> f32 {
    let projected: Vec<Option<Vec2>> = shape.points.iter().map(|p| camera.project(*p)).collect();
    let mut segments: Vec<(Option<Vec2>, Option<Vec2>)> =
        projected.windows(2).map(|pair| (pair[0], pair[1])).collect();
    if shape.closed && projected.len() > 2 {
        segments.push((projected[projected.len() - 1], projected[0]));
    }
    segments
        .into_iter()
        .filter_map(|(a, b)| Some(point_segment_distance(pointer, a?, b?)))
        .fold(f32::INFINITY, f32::min)
}

pub fn point_segment_distance(point: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-12 {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;

    fn camera() -> OrbitCamera {
        let mut camera = OrbitCamera::from_config(&CameraConfig::default());
        camera.set_viewport(Vec2::ZERO, Vec2::new(1000.0, 800.0));
        camera
    }

    fn screen(camera: &OrbitCamera, world: Vec3) -> Vec2 {
        camera.project(world).unwrap()
    }

    #[test]
    fn attaching_new_node_detaches_previous() {
        let mut gizmo = TransformGizmo::new();
        assert_eq!(gizmo.attach(1), None);
        assert_eq!(gizmo.attach(2), Some(1));
        assert_eq!(gizmo.attached(), Some(2));
        assert_eq!(gizmo.attach(2), None);
        assert_eq!(gizmo.detach(), Some(2));
        assert_eq!(gizmo.attached(), None);
    }

    #[test]
    fn axis_handle_is_hit_near_its_projection() {
        let camera = camera();
        let gizmo = TransformGizmo::new();
        let origin = Vec3::new(1.0, 0.5, -1.0);
        let length = TransformGizmo::handle_length(&camera, origin);
        let on_x = screen(&camera, origin + Vec3::X * length * 0.7);
        assert_eq!(
            gizmo.hit_test(&camera, origin, on_x),
            Some(GizmoHandle::Axis(Axis::X))
        );
        assert_eq!(gizmo.hit_test(&camera, origin, on_x + Vec2::new(0.0, 200.0)), None);
    }

    #[test]
    fn translate_drag_moves_along_axis() {
        let camera = camera();
        let mut gizmo = TransformGizmo::new();
        gizmo.attach(7);
        let origin = Vec3::new(0.0, 1.0, 0.0);
        let start = Transform::from_position(origin);
        let length = TransformGizmo::handle_length(&camera, origin);

        let press = screen(&camera, origin + Vec3::X * length * 0.5);
        let release = screen(&camera, origin + Vec3::X * (length * 0.5 + 2.0));
        assert!(gizmo.begin_drag(
            GizmoHandle::Axis(Axis::X),
            &camera.ray_from_screen(press),
            press,
            origin,
            start,
        ));
        let moved = gizmo
            .update_drag(&camera.ray_from_screen(release), release)
            .unwrap();
        assert!((moved.position - (origin + Vec3::new(2.0, 0.0, 0.0))).length() < 1e-3);
        assert_eq!(gizmo.end_drag(), Some(7));
        assert!(!gizmo.is_dragging());
    }

    #[test]
    fn scale_drag_is_clamped() {
        let camera = camera();
        let mut gizmo = TransformGizmo::new();
        gizmo.set_mode(GizmoMode::Scale);
        gizmo.attach(3);
        let origin = Vec3::ZERO;
        let length = TransformGizmo::handle_length(&camera, origin);

        let press = screen(&camera, Vec3::Y * length * 0.25);
        let far = screen(&camera, Vec3::Y * length * 2.0);
        assert!(gizmo.begin_drag(
            GizmoHandle::Axis(Axis::Y),
            &camera.ray_from_screen(press),
            press,
            origin,
            Transform::IDENTITY,
        ));
        let scaled = gizmo.update_drag(&camera.ray_from_screen(far), far).unwrap();
        assert_eq!(scaled.scale.y, SCALE_MAX);
        assert_eq!(scaled.scale.x, 1.0);
    }

    #[test]
    fn uniform_scale_follows_vertical_travel() {
        let camera = camera();
        let mut gizmo = TransformGizmo::new();
        gizmo.set_mode(GizmoMode::Scale);
        gizmo.attach(3);
        let center = screen(&camera, Vec3::ZERO);
        assert_eq!(
            gizmo.hit_test(&camera, Vec3::ZERO, center),
            Some(GizmoHandle::Uniform)
        );
        let ray = camera.ray_from_screen(center);
        assert!(gizmo.begin_drag(GizmoHandle::Uniform, &ray, center, Vec3::ZERO, Transform::IDENTITY));
        let up = gizmo.update_drag(&ray, center - Vec2::new(0.0, 50.0)).unwrap();
        assert!((up.scale - Vec3::splat(1.5)).length() < 1e-5);
        let down = gizmo.update_drag(&ray, center + Vec2::new(0.0, 500.0)).unwrap();
        assert_eq!(down.scale, Vec3::ZERO);
    }

    #[test]
    fn rotate_drag_adds_swept_angle() {
        let camera = camera();
        let mut gizmo = TransformGizmo::new();
        gizmo.set_mode(GizmoMode::Rotate);
        gizmo.attach(9);
        let origin = Vec3::ZERO;

        // Quarter turn around +Y: from +Z towards +X.
        let from = screen(&camera, Vec3::new(0.0, 0.0, 2.0));
        let to = screen(&camera, Vec3::new(2.0, 0.0, 0.0));
        assert!(gizmo.begin_drag(
            GizmoHandle::Ring(Axis::Y),
            &camera.ray_from_screen(from),
            from,
            origin,
            Transform::IDENTITY,
        ));
        let rotated = gizmo.update_drag(&camera.ray_from_screen(to), to).unwrap();
        assert!((rotated.rotation.y - std::f32::consts::FRAC_PI_2).abs() < 1e-3);
        assert_eq!(rotated.rotation.x, 0.0);
    }

    #[test]
    fn rotate_drag_stays_within_half_turn() {
        let camera = camera();
        let mut gizmo = TransformGizmo::new();
        gizmo.set_mode(GizmoMode::Rotate);
        gizmo.attach(9);
        let on_z = screen(&camera, Vec3::new(0.0, 0.0, 2.0));
        let on_x = screen(&camera, Vec3::new(2.0, 0.0, 0.0));

        // Quarter turn backwards from zero does not wrap to nearly a full turn.
        assert!(gizmo.begin_drag(
            GizmoHandle::Ring(Axis::Y),
            &camera.ray_from_screen(on_x),
            on_x,
            Vec3::ZERO,
            Transform::IDENTITY,
        ));
        let back = gizmo.update_drag(&camera.ray_from_screen(on_z), on_z).unwrap();
        assert_eq!(back.rotation.y, ROTATION_MIN);
        gizmo.end_drag();

        let mut start = Transform::IDENTITY;
        start.rotation.y = 2.0;
        assert!(gizmo.begin_drag(
            GizmoHandle::Ring(Axis::Y),
            &camera.ray_from_screen(on_z),
            on_z,
            Vec3::ZERO,
            start,
        ));
        let forward = gizmo.update_drag(&camera.ray_from_screen(on_x), on_x).unwrap();
        assert_eq!(forward.rotation.y, ROTATION_MAX);
    }

    #[test]
    fn mode_change_cancels_drag() {
        let camera = camera();
        let mut gizmo = TransformGizmo::new();
        gizmo.attach(1);
        let point = screen(&camera, Vec3::X);
        let ray = camera.ray_from_screen(point);
        assert!(gizmo.begin_drag(GizmoHandle::Axis(Axis::X), &ray, point, Vec3::ZERO, Transform::IDENTITY));
        gizmo.set_mode(GizmoMode::Rotate);
        assert!(!gizmo.is_dragging());
        assert!(gizmo.update_drag(&ray, point).is_none());
    }

    #[test]
    fn drag_requires_attachment() {
        let camera = camera();
        let mut gizmo = TransformGizmo::new();
        let point = screen(&camera, Vec3::X);
        let ray = camera.ray_from_screen(point);
        assert!(!gizmo.begin_drag(GizmoHandle::Axis(Axis::X), &ray, point, Vec3::ZERO, Transform::IDENTITY));
    }
}
