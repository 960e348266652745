use glam::Vec3;

/// Axis-aligned bounding box in whatever space its points were given in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut bounds = Self::EMPTY;
        for point in points {
            bounds.include(point);
        }
        bounds
    }

    pub fn include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(a.x, b.y, b.z),
        ]
    }

    /// The twelve edges as index pairs into [`Aabb::corners`].
    pub const EDGES: [(usize, usize); 12] = [
        (0, 1),
        (1, 2),
        (2, 3),
        (3, 0),
        (4, 5),
        (5, 6),
        (6, 7),
        (7, 4),
        (0, 4),
        (1, 5),
        (2, 6),
        (3, 7),
    ];

    /// Slab test. `direction` need not be normalized; the returned parameter is
    /// in units of `direction`. A ray starting inside the box reports `0.0`.
    pub fn ray_entry(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            if d.abs() < 1e-12 {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (self.min[axis] - o) * inv;
            let mut t1 = (self.max[axis] - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

/// Triangle soup with one normal per face.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    triangles: Vec<[Vec3; 3]>,
    normals: Vec<Vec3>,
    bounds: Aabb,
}

impl Geometry {
    /// Builds geometry from faces. Normals shorter than epsilon are replaced by
    /// the winding normal; a missing normal list is treated the same way.
    pub fn new(triangles: Vec<[Vec3; 3]>, normals: Vec<Vec3>) -> Self {
        let normals = triangles
            .iter()
            .enumerate()
            .map(|(index, tri)| {
                let stored = normals.get(index).copied().unwrap_or(Vec3::ZERO);
                if stored.length_squared() > 1e-12 {
                    stored.normalize()
                } else {
                    face_normal(tri)
                }
            })
            .collect();
        let bounds = Aabb::from_points(triangles.iter().flat_map(|tri| tri.iter().copied()));
        Self {
            triangles,
            normals,
            bounds,
        }
    }

    /// Axis-aligned box centred on the origin.
    #[cfg(test)]
    pub fn cuboid(size: Vec3) -> Self {
        let corners = Aabb::from_center_size(Vec3::ZERO, size).corners();
        let quads: [[usize; 4]; 6] = [
            [0, 3, 2, 1], // -z
            [4, 5, 6, 7], // +z
            [0, 4, 7, 3], // -x
            [1, 2, 6, 5], // +x
            [0, 1, 5, 4], // -y
            [3, 7, 6, 2], // +y
        ];
        let mut triangles = Vec::with_capacity(12);
        for [a, b, c, d] in quads {
            triangles.push([corners[a], corners[b], corners[c]]);
            triangles.push([corners[a], corners[c], corners[d]]);
        }
        Self::new(triangles, Vec::new())
    }

    /// Horizontal quad on the XZ plane facing +Y.
    pub fn ground_plane(width: f32, depth: f32) -> Self {
        let hx = width * 0.5;
        let hz = depth * 0.5;
        let p = [
            Vec3::new(-hx, 0.0, -hz),
            Vec3::new(hx, 0.0, -hz),
            Vec3::new(hx, 0.0, hz),
            Vec3::new(-hx, 0.0, hz),
        ];
        Self::new(
            vec![[p[0], p[3], p[2]], [p[0], p[2], p[1]]],
            vec![Vec3::Y, Vec3::Y],
        )
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn triangles(&self) -> &[[Vec3; 3]] {
        &self.triangles
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }
}

pub fn face_normal(tri: &[Vec3; 3]) -> Vec3 {
    (tri[1] - tri[0]).cross(tri[2] - tri[0]).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_has_twelve_outward_faces() {
        let cube = Geometry::cuboid(Vec3::splat(2.0));
        assert_eq!(cube.triangle_count(), 12);
        for (tri, normal) in cube.triangles().iter().zip(cube.normals()) {
            let centroid = (tri[0] + tri[1] + tri[2]) / 3.0;
            assert!(centroid.dot(*normal) > 0.0, "normal points inward");
        }
        assert_eq!(cube.bounds().min, Vec3::splat(-1.0));
        assert_eq!(cube.bounds().max, Vec3::splat(1.0));
    }

    #[test]
    fn zero_normals_are_recomputed_from_winding() {
        let tri = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let geometry = Geometry::new(vec![tri], vec![Vec3::ZERO]);
        assert!((geometry.normals()[0] - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn ray_entry_hits_and_misses() {
        let bounds = Aabb::from_center_size(Vec3::ZERO, Vec3::splat(2.0));
        let hit = bounds.ray_entry(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(hit, Some(4.0));
        assert!(bounds
            .ray_entry(Vec3::new(3.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0))
            .is_none());
        assert_eq!(bounds.ray_entry(Vec3::ZERO, Vec3::X), Some(0.0));
    }

    #[test]
    fn empty_bounds_are_empty() {
        assert!(Aabb::EMPTY.is_empty());
    }
}
