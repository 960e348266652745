mod geometry;

pub use geometry::{face_normal, Aabb, Geometry};

use crate::config::SceneConfig;
use glam::{EulerRot, Mat4, Quat, Vec3};

pub type NodeId = u64;

/// Local transform. Rotation is Euler XYZ in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    #[cfg(test)]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: [u8; 3],
    pub wireframe: bool,
    pub opacity: f32,
}

impl Material {
    pub fn solid(color: [u8; 3]) -> Self {
        Self {
            color,
            wireframe: false,
            opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub geometry: Geometry,
    pub material: Material,
    /// Where "reset position" puts the mesh back.
    pub home_position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLightData {
    pub color: [u8; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Mesh(MeshData),
    Grid {
        size: f32,
        divisions: u32,
        center_color: [u8; 3],
        line_color: [u8; 3],
    },
    Axes {
        length: f32,
    },
    BoundsBox {
        bounds: Aabb,
        color: [u8; 3],
    },
    DirectionalLight(DirectionalLightData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: NodeId,
    pub name: String,
    pub transform: Transform,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
    /// Only nodes carrying this flag take part in pointer picking.
    pub pickable: bool,
    pub visible: bool,
}

impl SceneNode {
    pub fn mesh(&self) -> Option<&MeshData> {
        match &self.kind {
            NodeKind::Mesh(data) => Some(data),
            _ => None,
        }
    }

    pub fn mesh_mut(&mut self) -> Option<&mut MeshData> {
        match &mut self.kind {
            NodeKind::Mesh(data) => Some(data),
            _ => None,
        }
    }
}

/// Flat node storage with parent/child links. Iteration order is insertion order.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    next_id: NodeId,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.index_of(id).map(|index| &self.nodes[index])
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        let index = self.index_of(id)?;
        Some(&mut self.nodes[index])
    }

    pub fn add(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        self.insert(name.into(), kind, None)
    }

    /// Returns `None` when the parent does not exist.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        kind: NodeKind,
    ) -> Option<NodeId> {
        let parent_index = self.index_of(parent)?;
        let id = self.insert(name.into(), kind, Some(parent));
        self.nodes[parent_index].children.push(id);
        Some(id)
    }

    fn insert(&mut self, name: String, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        if self.next_id == 0 {
            self.next_id = 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.push(SceneNode {
            id,
            name,
            transform: Transform::IDENTITY,
            parent,
            children: Vec::new(),
            kind,
            pickable: false,
            visible: true,
        });
        id
    }

    /// Removes the node and its whole subtree. Returns the removed node itself.
    pub fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        let index = self.index_of(id)?;
        if let Some(parent) = self.nodes[index].parent {
            if let Some(parent_node) = self.get_mut(parent) {
                parent_node.children.retain(|child| *child != id);
            }
        }

        let mut doomed = vec![id];
        let mut cursor = 0;
        while cursor < doomed.len() {
            if let Some(node) = self.get(doomed[cursor]) {
                doomed.extend(node.children.iter().copied());
            }
            cursor += 1;
        }

        let mut removed = None;
        let mut kept = Vec::with_capacity(self.nodes.len());
        for node in self.nodes.drain(..) {
            if node.id == id {
                removed = Some(node);
            } else if !doomed.contains(&node.id) {
                kept.push(node);
            }
        }
        self.nodes = kept;
        removed
    }

    /// Deep-copies a mesh node (geometry and material included) under the same
    /// parent with a new id. Children are not copied.
    pub fn duplicate(&mut self, id: NodeId, offset: Vec3) -> Option<NodeId> {
        let source = self.get(id)?;
        let NodeKind::Mesh(data) = &source.kind else {
            return None;
        };
        let mut data = data.clone();
        data.home_position += offset;
        let name = format!("{} (copy)", source.name);
        let mut transform = source.transform;
        transform.position += offset;
        let pickable = source.pickable;
        let parent = source.parent;

        let copy = match parent {
            Some(parent) => self.add_child(parent, name, NodeKind::Mesh(data))?,
            None => self.add(name, NodeKind::Mesh(data)),
        };
        if let Some(node) = self.get_mut(copy) {
            node.transform = transform;
            node.pickable = pickable;
        }
        Some(copy)
    }

    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let mut node = self.get(id)?;
        let mut matrix = node.transform.matrix();
        while let Some(parent) = node.parent {
            node = self.get(parent)?;
            matrix = node.transform.matrix() * matrix;
        }
        Some(matrix)
    }

    pub fn world_position(&self, id: NodeId) -> Option<Vec3> {
        self.world_matrix(id).map(|m| m.w_axis.truncate())
    }

    /// Pickable, visible mesh nodes in scene order.
    pub fn pickable_meshes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes
            .iter()
            .filter(|node| node.pickable && node.visible && node.mesh().is_some())
    }

    pub fn last_pickable_mesh(&self) -> Option<NodeId> {
        self.pickable_meshes().last().map(|node| node.id)
    }

    fn index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }
}

/// Builds the fixed part of the world: light, ground, grid, axes and the build
/// volume outline. Imported meshes are added on top of this.
pub fn bootstrap_scene(config: &SceneConfig) -> SceneGraph {
    let mut scene = SceneGraph::new();

    let light = scene.add(
        "Directional Light",
        NodeKind::DirectionalLight(DirectionalLightData {
            color: config.light_color,
            intensity: config.light_intensity,
        }),
    );
    if let Some(node) = scene.get_mut(light) {
        node.transform.position = Vec3::from_array(config.light_position);
    }

    scene.add(
        "Ground",
        NodeKind::Mesh(MeshData {
            geometry: Geometry::ground_plane(config.ground_size, config.ground_size),
            material: Material::solid(config.ground_color),
            home_position: Vec3::ZERO,
        }),
    );

    scene.add(
        "Grid",
        NodeKind::Grid {
            size: config.ground_size,
            divisions: config.grid_divisions,
            center_color: config.grid_center_color,
            line_color: config.grid_color,
        },
    );

    scene.add(
        "Axes",
        NodeKind::Axes {
            length: config.axes_length,
        },
    );

    if config.show_bounds {
        let size = config.bounds_size;
        scene.add(
            "Build Volume",
            NodeKind::BoundsBox {
                bounds: Aabb::from_center_size(
                    Vec3::new(0.0, size * 0.5, 0.0),
                    Vec3::splat(size),
                ),
                color: config.bounds_color,
            },
        );
    }

    log::debug!("Scene bootstrapped with {} nodes", scene.len());
    scene
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh_kind() -> NodeKind {
        NodeKind::Mesh(MeshData {
            geometry: Geometry::cuboid(Vec3::ONE),
            material: Material::solid([10, 20, 30]),
            home_position: Vec3::ZERO,
        })
    }

    #[test]
    fn remove_drops_whole_subtree() {
        let mut scene = SceneGraph::new();
        let root = scene.add("root", mesh_kind());
        let child = scene.add_child(root, "child", mesh_kind()).unwrap();
        let grandchild = scene.add_child(child, "grandchild", mesh_kind()).unwrap();
        let other = scene.add("other", mesh_kind());

        let removed = scene.remove(root).unwrap();
        assert_eq!(removed.id, root);
        assert_eq!(removed.name, "root");
        assert!(!scene.contains(child));
        assert!(!scene.contains(grandchild));
        assert!(scene.contains(other));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn removing_child_unlinks_it_from_parent() {
        let mut scene = SceneGraph::new();
        let root = scene.add("root", mesh_kind());
        let child = scene.add_child(root, "child", mesh_kind()).unwrap();
        scene.remove(child);
        assert!(scene.get(root).unwrap().children.is_empty());
    }

    #[test]
    fn remove_missing_node_is_none() {
        let mut scene = SceneGraph::new();
        assert!(scene.remove(42).is_none());
    }

    #[test]
    fn world_matrix_composes_parent_chain() {
        let mut scene = SceneGraph::new();
        let root = scene.add("root", mesh_kind());
        let child = scene.add_child(root, "child", mesh_kind()).unwrap();
        scene.get_mut(root).unwrap().transform.position = Vec3::new(1.0, 0.0, 0.0);
        scene.get_mut(root).unwrap().transform.scale = Vec3::splat(2.0);
        scene.get_mut(child).unwrap().transform.position = Vec3::new(0.0, 1.0, 0.0);

        let world = scene.world_position(child).unwrap();
        assert!((world - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn duplicate_copies_material_independently() {
        let mut scene = SceneGraph::new();
        let id = scene.add("part.stl", mesh_kind());
        scene.get_mut(id).unwrap().pickable = true;

        let copy = scene.duplicate(id, Vec3::new(2.0, 0.0, 0.0)).unwrap();
        assert_ne!(copy, id);
        let node = scene.get(copy).unwrap();
        assert_eq!(node.name, "part.stl (copy)");
        assert!(node.pickable);
        assert_eq!(node.transform.position, Vec3::new(2.0, 0.0, 0.0));

        scene.get_mut(copy).unwrap().mesh_mut().unwrap().material.color = [1, 2, 3];
        assert_eq!(
            scene.get(id).unwrap().mesh().unwrap().material.color,
            [10, 20, 30]
        );
    }

    #[test]
    fn duplicate_rejects_non_mesh_nodes() {
        let mut scene = SceneGraph::new();
        let axes = scene.add("Axes", NodeKind::Axes { length: 1.0 });
        assert!(scene.duplicate(axes, Vec3::ZERO).is_none());
    }

    #[test]
    fn bootstrap_has_no_pickable_nodes() {
        let scene = bootstrap_scene(&SceneConfig::default());
        assert!(scene.len() >= 4);
        assert_eq!(scene.pickable_meshes().count(), 0);
        assert!(scene
            .nodes()
            .iter()
            .any(|node| matches!(node.kind, NodeKind::Grid { .. })));
    }

    #[test]
    fn transform_matrix_applies_scale_then_rotation_then_translation() {
        let transform = Transform {
            position: Vec3::new(0.0, 0.0, 5.0),
            rotation: Vec3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2),
            scale: Vec3::new(2.0, 1.0, 1.0),
        };
        let moved = transform.matrix().transform_point3(Vec3::X);
        assert!((moved - Vec3::new(0.0, 2.0, 5.0)).length() < 1e-5);
    }
}
