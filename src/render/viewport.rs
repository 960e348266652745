//! Software projection of the scene graph into egui shapes.
//!
//! Draw order is back to front: base meshes (the ground), helper lines,
//! depth-sorted pickable meshes, then overlays (wireframes, selection box,
//! gizmo). Mesh faces get flat Lambert shading from the first directional
//! light.

use crate::render::camera::OrbitCamera;
use crate::render::gizmo::{GizmoHandle, TransformGizmo};
use crate::scene::{face_normal, Aabb, Geometry, NodeId, NodeKind, SceneGraph};
use egui::{Color32, Painter, Pos2, Shape, Stroke};
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

const AMBIENT: f32 = 0.35;
const DIFFUSE: f32 = 0.65;
const SELECTION_COLOR: Color32 = Color32::from_rgb(255, 140, 0);
const WIREFRAME_WIDTH: f32 = 1.0;
const GIZMO_WIDTH: f32 = 3.0;
const GIZMO_ACTIVE_WIDTH: f32 = 5.0;

struct Light {
    direction: Vec3,
    color: Vec3,
}

struct ProjectedTriangle {
    points: [Pos2; 3],
    depth: f32,
    color: Color32,
}

/// Counts reported by a paint pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaintStats {
    pub triangles: usize,
    pub lines: usize,
}

pub fn paint_scene(
    painter: &Painter,
    scene: &SceneGraph,
    camera: &OrbitCamera,
    selection: Option<NodeId>,
    gizmo: &TransformGizmo,
) -> PaintStats {
    let view_projection = camera.view_projection();
    let light = scene_light(scene);
    let mut stats = PaintStats::default();

    let mut base = Vec::new();
    let mut meshes = Vec::new();
    let mut wire_edges: Vec<(Vec3, Vec3, Color32)> = Vec::new();
    let mut lines: Vec<(Vec3, Vec3, Color32)> = Vec::new();

    for node in scene.nodes().iter().filter(|node| node.visible) {
        let Some(world) = scene.world_matrix(node.id) else {
            continue;
        };
        match &node.kind {
            NodeKind::Mesh(mesh) => {
                let color = rgb(mesh.material.color);
                if mesh.material.wireframe {
                    for tri in mesh.geometry.triangles() {
                        let w = tri.map(|p| world.transform_point3(p));
                        wire_edges.push((w[0], w[1], color));
                        wire_edges.push((w[1], w[2], color));
                        wire_edges.push((w[2], w[0], color));
                    }
                    continue;
                }
                let target = if node.pickable { &mut meshes } else { &mut base };
                project_mesh(
                    target,
                    &world,
                    &view_projection,
                    camera,
                    &light,
                    &mesh.geometry,
                    mesh.material.color,
                    mesh.material.opacity,
                );
            }
            NodeKind::Grid {
                size,
                divisions,
                center_color,
                line_color,
            } => grid_lines(&mut lines, &world, *size, *divisions, *center_color, *line_color),
            NodeKind::Axes { length } => {
                let origin = world.transform_point3(Vec3::ZERO);
                for (axis, color) in [
                    (Vec3::X, Color32::from_rgb(255, 0, 0)),
                    (Vec3::Y, Color32::from_rgb(0, 255, 0)),
                    (Vec3::Z, Color32::from_rgb(0, 0, 255)),
                ] {
                    lines.push((origin, world.transform_point3(axis * *length), color));
                }
            }
            NodeKind::BoundsBox { bounds, color } => {
                box_lines(&mut lines, &world, bounds, rgb(*color));
            }
            NodeKind::DirectionalLight(_) => {}
        }
    }

    stats.triangles += paint_triangles(painter, base);
    stats.lines += paint_lines(painter, &view_projection, camera, &lines, 1.0);
    stats.triangles += paint_triangles(painter, meshes);
    stats.lines += paint_lines(painter, &view_projection, camera, &wire_edges, WIREFRAME_WIDTH);

    if let Some(selected) = selection {
        if let (Some(node), Some(world)) = (scene.get(selected), scene.world_matrix(selected)) {
            if let Some(mesh) = node.mesh() {
                let mut outline = Vec::new();
                box_lines(&mut outline, &world, &mesh.geometry.bounds(), SELECTION_COLOR);
                stats.lines += paint_lines(painter, &view_projection, camera, &outline, 1.5);
            }
        }
    }

    if let Some(attached) = gizmo.attached() {
        if let Some(origin) = scene.world_position(attached) {
            stats.lines += paint_gizmo(painter, camera, gizmo, origin);
        }
    }

    stats
}

fn scene_light(scene: &SceneGraph) -> Light {
    scene
        .nodes()
        .iter()
        .find_map(|node| match &node.kind {
            NodeKind::DirectionalLight(data) => {
                let position = scene.world_position(node.id).unwrap_or(Vec3::Y);
                Some(Light {
                    direction: position.normalize_or(Vec3::Y),
                    color: Vec3::from_array(data.color.map(|c| c as f32 / 255.0))
                        * data.intensity,
                })
            }
            _ => None,
        })
        .unwrap_or(Light {
            direction: Vec3::new(1.0, 1.0, 1.0).normalize(),
            color: Vec3::ONE,
        })
}

#[allow(clippy::too_many_arguments)]
fn project_mesh(
    out: &mut Vec<ProjectedTriangle>,
    world: &Mat4,
    view_projection: &Mat4,
    camera: &OrbitCamera,
    light: &Light,
    geometry: &Geometry,
    color: [u8; 3],
    opacity: f32,
) {
    let eye = camera.eye();
    let base = Vec3::from_array(color.map(|c| c as f32 / 255.0));
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0) as u8;
    let normal_matrix = normal_matrix(world);

    for (tri, stored) in geometry.triangles().iter().zip(geometry.normals()) {
        let world_tri = tri.map(|p| world.transform_point3(p));
        let clip = world_tri.map(|p| *view_projection * p.extend(1.0));
        if clip.iter().any(|c| c.w < camera.near) {
            continue;
        }
        let centroid = (world_tri[0] + world_tri[1] + world_tri[2]) / 3.0;
        let mut normal = world_normal(normal_matrix, *stored, &world_tri);
        if normal.dot(eye - centroid) < 0.0 {
            normal = -normal;
        }
        let shade = AMBIENT + DIFFUSE * normal.dot(light.direction).max(0.0);
        let lit = (base * light.color * shade).clamp(Vec3::ZERO, Vec3::ONE);

        out.push(ProjectedTriangle {
            points: clip.map(|c| to_pos(camera, c)),
            depth: clip.iter().map(|c| c.z / c.w).sum::<f32>() / 3.0,
            color: Color32::from_rgba_unmultiplied(
                (lit.x * 255.0) as u8,
                (lit.y * 255.0) as u8,
                (lit.z * 255.0) as u8,
                alpha,
            ),
        });
    }
}

/// Inverse-transpose of the upper 3x3, or `None` for a singular transform.
fn normal_matrix(world: &Mat4) -> Option<Mat3> {
    let linear = Mat3::from_mat4(*world);
    (linear.determinant().abs() > 1e-12).then(|| linear.inverse().transpose())
}

/// Stored face normal carried into world space. Falls back to the winding of
/// the transformed face when the transform is singular.
fn world_normal(normal_matrix: Option<Mat3>, stored: Vec3, world_tri: &[Vec3; 3]) -> Vec3 {
    normal_matrix
        .map(|m| (m * stored).normalize_or_zero())
        .filter(|n| *n != Vec3::ZERO)
        .unwrap_or_else(|| face_normal(world_tri))
}

fn paint_triangles(painter: &Painter, mut triangles: Vec<ProjectedTriangle>) -> usize {
    if triangles.is_empty() {
        return 0;
    }
    triangles.sort_by(|a, b| b.depth.total_cmp(&a.depth));

    let mut mesh = egui::Mesh::default();
    for tri in &triangles {
        let base = mesh.vertices.len() as u32;
        for point in tri.points {
            mesh.colored_vertex(point, tri.color);
        }
        mesh.add_triangle(base, base + 1, base + 2);
    }
    painter.add(Shape::mesh(mesh));
    triangles.len()
}

fn paint_lines(
    painter: &Painter,
    view_projection: &Mat4,
    camera: &OrbitCamera,
    lines: &[(Vec3, Vec3, Color32)],
    width: f32,
) -> usize {
    let mut painted = 0;
    for (a, b, color) in lines {
        let clip_a = *view_projection * a.extend(1.0);
        let clip_b = *view_projection * b.extend(1.0);
        if let Some((a, b)) = clip_segment(clip_a, clip_b, camera.near) {
            painter.line_segment([to_pos(camera, a), to_pos(camera, b)], Stroke::new(width, *color));
            painted += 1;
        }
    }
    painted
}

fn paint_gizmo(painter: &Painter, camera: &OrbitCamera, gizmo: &TransformGizmo, origin: Vec3) -> usize {
    let length = TransformGizmo::handle_length(camera, origin);
    let highlighted = gizmo.active_handle().or(gizmo.hovered());
    let mut painted = 0;

    for shape in gizmo.handle_shapes(origin, length) {
        let active = highlighted == Some(shape.handle);
        let color = if active {
            Color32::from_rgb(255, 230, 0)
        } else {
            rgb(shape.handle.color())
        };

        if shape.handle == GizmoHandle::Uniform {
            if let Some(center) = camera.project(origin) {
                let rect = egui::Rect::from_center_size(pos(center), egui::vec2(12.0, 12.0));
                painter.rect_filled(rect, 2.0, color);
                painted += 1;
            }
            continue;
        }

        let points: Vec<Pos2> = shape
            .points
            .iter()
            .filter_map(|p| camera.project(*p).map(pos))
            .collect();
        if points.len() != shape.points.len() {
            continue;
        }
        let stroke = Stroke::new(if active { GIZMO_ACTIVE_WIDTH } else { GIZMO_WIDTH }, color);
        if shape.closed {
            painter.add(Shape::closed_line(points, stroke));
        } else if let [start, end] = points[..] {
            painter.line_segment([start, end], stroke);
            painter.circle_filled(end, 5.0, color);
        }
        painted += 1;
    }
    painted
}

fn grid_lines(
    out: &mut Vec<(Vec3, Vec3, Color32)>,
    world: &Mat4,
    size: f32,
    divisions: u32,
    center_color: [u8; 3],
    line_color: [u8; 3],
) {
    let divisions = divisions.max(1);
    let half = size * 0.5;
    let step = size / divisions as f32;
    for i in 0..=divisions {
        let offset = -half + step * i as f32;
        let color = if i * 2 == divisions {
            rgb(center_color)
        } else {
            rgb(line_color)
        };
        out.push((
            world.transform_point3(Vec3::new(offset, 0.0, -half)),
            world.transform_point3(Vec3::new(offset, 0.0, half)),
            color,
        ));
        out.push((
            world.transform_point3(Vec3::new(-half, 0.0, offset)),
            world.transform_point3(Vec3::new(half, 0.0, offset)),
            color,
        ));
    }
}

fn box_lines(out: &mut Vec<(Vec3, Vec3, Color32)>, world: &Mat4, bounds: &Aabb, color: Color32) {
    if bounds.is_empty() {
        return;
    }
    let corners = bounds.corners().map(|c| world.transform_point3(c));
    for (a, b) in Aabb::EDGES {
        out.push((corners[a], corners[b], color));
    }
}

/// Trims a clip-space segment to the part in front of the near plane.
fn clip_segment(a: Vec4, b: Vec4, near: f32) -> Option<(Vec4, Vec4)> {
    match (a.w >= near, b.w >= near) {
        (true, true) => Some((a, b)),
        (false, false) => None,
        (a_inside, _) => {
            let t = (near - a.w) / (b.w - a.w);
            let cut = a + (b - a) * t;
            if a_inside {
                Some((a, cut))
            } else {
                Some((cut, b))
            }
        }
    }
}

fn to_pos(camera: &OrbitCamera, clip: Vec4) -> Pos2 {
    pos(camera.ndc_to_screen(Vec2::new(clip.x / clip.w, clip.y / clip.w)))
}

fn pos(point: Vec2) -> Pos2 {
    Pos2::new(point.x, point.y)
}

fn rgb(color: [u8; 3]) -> Color32 {
    Color32::from_rgb(color[0], color[1], color[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_crossing_near_plane_is_trimmed() {
        let a = Vec4::new(0.0, 0.0, 0.5, 2.0);
        let b = Vec4::new(1.0, 0.0, 0.5, -2.0);
        let (start, end) = clip_segment(a, b, 0.1).unwrap();
        assert_eq!(start, a);
        assert!((end.w - 0.1).abs() < 1e-6);
        assert!(clip_segment(b, b, 0.1).is_none());
    }

    #[test]
    fn grid_has_two_lines_per_division_step() {
        let mut lines = Vec::new();
        grid_lines(&mut lines, &Mat4::IDENTITY, 10.0, 4, [0, 0, 0], [9, 9, 9]);
        assert_eq!(lines.len(), 10);
        let centers = lines.iter().filter(|(_, _, c)| *c == Color32::BLACK).count();
        assert_eq!(centers, 2);
    }

    #[test]
    fn shading_uses_stored_normal() {
        let tri = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let stored = Vec3::new(0.0, 1.0, 1.0).normalize();
        let normal = world_normal(normal_matrix(&Mat4::IDENTITY), stored, &tri);
        assert!((normal - stored).length() < 1e-6);
    }

    #[test]
    fn stored_normal_follows_non_uniform_scale() {
        let world = Mat4::from_scale(Vec3::new(1.0, 2.0, 1.0));
        let stored = Vec3::new(0.0, 1.0, 1.0).normalize();
        let tri = [Vec3::ZERO, Vec3::X, Vec3::Y].map(|p| world.transform_point3(p));
        let normal = world_normal(normal_matrix(&world), stored, &tri);
        assert!((normal - Vec3::new(0.0, 0.5, 1.0).normalize()).length() < 1e-6);
    }

    #[test]
    fn singular_transform_falls_back_to_winding() {
        let world = Mat4::from_scale(Vec3::new(1.0, 1.0, 0.0));
        assert!(normal_matrix(&world).is_none());
        let tri = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let normal = world_normal(None, Vec3::new(0.0, 1.0, 1.0).normalize(), &tri);
        assert_eq!(normal, Vec3::Z);
    }

    #[test]
    fn light_defaults_without_light_node() {
        let scene = SceneGraph::new();
        let light = scene_light(&scene);
        assert!((light.direction.length() - 1.0).abs() < 1e-6);
    }
}
