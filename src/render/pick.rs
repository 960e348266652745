//! CPU ray picking.
//!
//! Pointer picks cast a world-space ray from the camera and test it against
//! every pickable mesh. Each mesh is tested in its local space (the ray is
//! moved through the inverse world matrix without renormalising, so the ray
//! parameter stays comparable across meshes): bounds first, then every
//! triangle with Möller–Trumbore.

use crate::scene::{NodeId, SceneGraph};
use glam::Vec3;

const EPSILON: f32 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub node: NodeId,
    /// Ray parameter of the hit.
    pub distance: f32,
    pub point: Vec3,
}

/// Double-sided ray/triangle test. Returns the ray parameter of the hit.
pub fn ray_triangle(origin: Vec3, direction: Vec3, tri: &[Vec3; 3]) -> Option<f32> {
    let edge1 = tri[1] - tri[0];
    let edge2 = tri[2] - tri[0];
    let p = direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - tri[0];
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv_det;
    (t > EPSILON).then_some(t)
}

/// Nearest pickable mesh under the ray. Equal distances keep the node that
/// comes first in scene order.
pub fn pick_mesh(scene: &SceneGraph, ray: &Ray) -> Option<PickHit> {
    let mut best: Option<PickHit> = None;

    for node in scene.pickable_meshes() {
        let Some(mesh) = node.mesh() else {
            continue;
        };
        let Some(world) = scene.world_matrix(node.id) else {
            continue;
        };
        if world.determinant().abs() < 1e-12 {
            // Fully flattened meshes have no area to hit.
            continue;
        }
        let inverse = world.inverse();
        let local_origin = inverse.transform_point3(ray.origin);
        let local_direction = inverse.transform_vector3(ray.direction);

        let limit = best.map_or(f32::INFINITY, |hit| hit.distance);
        match mesh.geometry.bounds().ray_entry(local_origin, local_direction) {
            Some(entry) if entry <= limit => {}
            _ => continue,
        }

        for tri in mesh.geometry.triangles() {
            let Some(t) = ray_triangle(local_origin, local_direction, tri) else {
                continue;
            };
            if best.map_or(true, |hit| t < hit.distance) {
                best = Some(PickHit {
                    node: node.id,
                    distance: t,
                    point: ray.at(t),
                });
            }
        }
    }

    best
}

/// Parameter along the line `origin + s * axis` of the point closest to the
/// ray. `None` when the two are parallel.
pub fn closest_axis_parameter(ray: &Ray, origin: Vec3, axis: Vec3) -> Option<f32> {
    let w0 = origin - ray.origin;
    let a = axis.dot(axis);
    let b = axis.dot(ray.direction);
    let c = ray.direction.dot(ray.direction);
    let d = axis.dot(w0);
    let e = ray.direction.dot(w0);
    let denom = a * c - b * b;
    if denom.abs() < 1e-8 {
        return None;
    }
    Some((b * e - c * d) / denom)
}

pub fn ray_plane(ray: &Ray, point: Vec3, normal: Vec3) -> Option<Vec3> {
    let denom = normal.dot(ray.direction);
    if denom.abs() < 1e-6 {
        return None;
    }
    let t = normal.dot(point - ray.origin) / denom;
    (t >= 0.0).then(|| ray.at(t))
}
