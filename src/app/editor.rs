use super::input::InputAction;
use crate::assets::{ImportOutcome, ImportQueue};
use crate::config::ViewerConfig;
use crate::render::{pick_mesh, OrbitCamera, TransformGizmo};
use crate::scene::{
    bootstrap_scene, Geometry, Material, MeshData, NodeId, NodeKind, SceneGraph, SceneNode,
};
use crate::ui::{apply_field, PanelAction, PanelOptions, PanelOutput, PanelView};
use glam::{Vec2, Vec3};
use std::path::PathBuf;

/// Pointer travel (points) before a primary press turns into an orbit drag.
const CLICK_SLOP: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    Pressed { start: Vec2 },
    Manipulate,
    Orbit { last: Vec2 },
    Pan { last: Vec2 },
}

/// Work done by one [`Editor::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub imported: usize,
    pub failed: usize,
    pub nudged: bool,
}

/// All mutable application state. Owned by the window handler and touched
/// only from the event-loop thread.
pub struct Editor {
    config: ViewerConfig,
    scene: SceneGraph,
    camera: OrbitCamera,
    gizmo: TransformGizmo,
    selection: Option<NodeId>,
    imports: ImportQueue,
    pending_nudge: Vec3,
    gesture: Gesture,
    status: Option<String>,
}

impl Editor {
    pub fn new(config: ViewerConfig) -> Self {
        let scene = bootstrap_scene(&config.scene);
        let camera = OrbitCamera::from_config(&config.camera);
        Self {
            config,
            scene,
            camera,
            gizmo: TransformGizmo::new(),
            selection: None,
            imports: ImportQueue::new(),
            pending_nudge: Vec3::ZERO,
            gesture: Gesture::Idle,
            status: None,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn gizmo(&self) -> &TransformGizmo {
        &self.gizmo
    }

    pub fn selection(&self) -> Option<NodeId> {
        self.selection
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn imports_in_flight(&self) -> usize {
        self.imports.in_flight()
    }

    fn set_status(&mut self, message: String) {
        log::info!("{}", message);
        self.status = Some(message);
    }

    // ---- import -------------------------------------------------------

    /// Queues a file for background decoding; the mesh shows up on a later tick.
    pub fn import_file(&mut self, path: PathBuf) {
        self.imports.spawn(path);
    }

    pub fn import_files<I: IntoIterator<Item = PathBuf>>(&mut self, paths: I) {
        for path in paths {
            self.import_file(path);
        }
    }

    /// Adds decoded geometry as a pickable mesh resting on the ground plane.
    pub fn insert_mesh(&mut self, name: &str, geometry: Geometry) -> NodeId {
        let bounds = geometry.bounds();
        let center = bounds.center();
        let home = Vec3::new(-center.x, -bounds.min.y, -center.z);
        let triangles = geometry.triangle_count();

        let id = self.scene.add(
            name,
            NodeKind::Mesh(MeshData {
                geometry,
                material: Material::solid(self.config.editing.default_color),
                home_position: home,
            }),
        );
        if let Some(node) = self.scene.get_mut(id) {
            node.transform.position = home;
            node.pickable = true;
        }
        log::info!("Added {} ({} triangles) as node {}", name, triangles, id);
        id
    }

    fn apply_import(&mut self, outcome: ImportOutcome) -> bool {
        match outcome.result {
            Ok(geometry) => {
                self.insert_mesh(&outcome.name, geometry);
                self.set_status(format!("Imported {}", outcome.name));
                true
            }
            Err(err) => {
                match &outcome.path {
                    Some(path) => log::warn!("Import of {} failed: {}", path.display(), err),
                    None => log::warn!("Import of {} failed: {}", outcome.name, err),
                }
                self.status = Some(format!("Could not import {}: {}", outcome.name, err));
                false
            }
        }
    }

    // ---- selection ----------------------------------------------------

    /// Selects a pickable mesh (attaching the gizmo) or clears the selection.
    /// Ids that are not pickable meshes clear it too.
    pub fn select(&mut self, node: Option<NodeId>) {
        let node = node.filter(|id| {
            self.scene
                .get(*id)
                .is_some_and(|n| n.pickable && n.mesh().is_some())
        });
        match node {
            Some(id) => {
                if let Some(previous) = self.gizmo.attach(id) {
                    log::debug!("Gizmo moved from node {} to {}", previous, id);
                }
                if self.selection != Some(id) {
                    log::info!("Selected node {}", id);
                }
                self.selection = Some(id);
            }
            None => {
                self.gizmo.detach();
                if self.selection.take().is_some() {
                    log::debug!("Selection cleared");
                }
            }
        }
    }

    /// Casts a ray through a screen point and selects what it hits.
    pub fn pick_at(&mut self, point: Vec2) -> Option<NodeId> {
        let ray = self.camera.ray_from_screen(point);
        let hit = pick_mesh(&self.scene, &ray).map(|hit| hit.node);
        self.select(hit);
        hit
    }

    /// Selected mesh, or the newest pickable mesh when nothing is selected.
    pub fn active_mesh(&self) -> Option<NodeId> {
        self.selection
            .filter(|id| self.scene.contains(*id))
            .or_else(|| self.scene.last_pickable_mesh())
    }

    pub fn delete_selected(&mut self) -> Option<SceneNode> {
        let id = self.selection.take()?;
        self.gizmo.detach();
        self.gesture = Gesture::Idle;
        let removed = self.scene.remove(id);
        if let Some(node) = &removed {
            self.set_status(format!("Deleted {}", node.name));
        }
        removed
    }

    pub fn duplicate_selected(&mut self) -> Option<NodeId> {
        let id = self.selection?;
        let offset = Vec3::from_array(self.config.editing.duplicate_offset);
        let copy = self.scene.duplicate(id, offset)?;
        self.select(Some(copy));
        if let Some(node) = self.scene.get(copy) {
            let message = format!("Duplicated as {}", node.name);
            self.set_status(message);
        }
        Some(copy)
    }

    // ---- keyboard -----------------------------------------------------

    /// Nudges are accumulated and applied on the next tick.
    pub fn queue_nudge(&mut self, direction: Vec3) {
        self.pending_nudge += direction * self.config.editing.nudge_step;
    }

    pub fn apply_pending_nudges(&mut self) -> bool {
        let offset = std::mem::take(&mut self.pending_nudge);
        if offset == Vec3::ZERO {
            return false;
        }
        let Some(node) = self.active_mesh().and_then(|id| self.scene.get_mut(id)) else {
            return false;
        };
        node.transform.position += offset;
        true
    }

    pub fn reset_active_position(&mut self) -> bool {
        let Some(node) = self.active_mesh().and_then(|id| self.scene.get_mut(id)) else {
            return false;
        };
        let Some(home) = node.mesh().map(|mesh| mesh.home_position) else {
            return false;
        };
        node.transform.position = home;
        true
    }

    /// Returns `true` when the action asks the application to quit.
    pub fn handle_action(&mut self, action: InputAction) -> bool {
        match action {
            InputAction::Nudge(direction) => self.queue_nudge(direction),
            InputAction::ResetPosition => {
                self.reset_active_position();
            }
            InputAction::DeleteSelected => {
                self.delete_selected();
            }
            InputAction::DuplicateSelected => {
                self.duplicate_selected();
            }
            InputAction::SetGizmoMode(mode) => {
                if self.gesture == Gesture::Manipulate {
                    self.gizmo.end_drag();
                    self.gesture = Gesture::Idle;
                }
                self.gizmo.set_mode(mode);
            }
            InputAction::Quit => return true,
            InputAction::None => {}
        }
        false
    }

    // ---- pointer ------------------------------------------------------

    pub fn orbit_enabled(&self) -> bool {
        !self.gizmo.is_dragging()
    }

    pub fn pointer_pressed(&mut self, button: PointerButton, point: Vec2) {
        match button {
            PointerButton::Primary => {
                self.gesture = if self.try_begin_manipulation(point) {
                    Gesture::Manipulate
                } else {
                    Gesture::Pressed { start: point }
                };
            }
            PointerButton::Secondary => {
                if self.gesture == Gesture::Idle {
                    self.gesture = Gesture::Pan { last: point };
                }
            }
        }
    }

    fn try_begin_manipulation(&mut self, point: Vec2) -> bool {
        let Some(id) = self.gizmo.attached() else {
            return false;
        };
        let (Some(origin), Some(node)) = (self.scene.world_position(id), self.scene.get(id)) else {
            return false;
        };
        let start = node.transform;
        let Some(handle) = self.gizmo.hit_test(&self.camera, origin, point) else {
            return false;
        };
        let ray = self.camera.ray_from_screen(point);
        let started = self.gizmo.begin_drag(handle, &ray, point, origin, start);
        if started {
            log::debug!("Dragging {:?} on node {}", handle, id);
        }
        started
    }

    pub fn pointer_moved(&mut self, point: Vec2) {
        match self.gesture {
            Gesture::Idle => {
                let hovered = self.gizmo.attached().and_then(|id| {
                    let origin = self.scene.world_position(id)?;
                    self.gizmo.hit_test(&self.camera, origin, point)
                });
                self.gizmo.set_hovered(hovered);
            }
            Gesture::Pressed { start } => {
                if start.distance(point) > CLICK_SLOP {
                    self.gesture = Gesture::Orbit { last: start };
                    self.pointer_moved(point);
                }
            }
            Gesture::Orbit { last } => {
                if self.orbit_enabled() {
                    self.camera.orbit(point - last, self.config.camera.orbit_speed);
                }
                self.gesture = Gesture::Orbit { last: point };
            }
            Gesture::Pan { last } => {
                self.camera.pan(point - last);
                self.gesture = Gesture::Pan { last: point };
            }
            Gesture::Manipulate => {
                let ray = self.camera.ray_from_screen(point);
                let Some(transform) = self.gizmo.update_drag(&ray, point) else {
                    return;
                };
                if let Some(node) = self.gizmo.attached().and_then(|id| self.scene.get_mut(id)) {
                    node.transform = transform;
                }
            }
        }
    }

    pub fn pointer_released(&mut self, button: PointerButton, point: Vec2) {
        match (button, self.gesture) {
            (PointerButton::Primary, Gesture::Pressed { .. }) => {
                self.gesture = Gesture::Idle;
                self.pick_at(point);
            }
            (PointerButton::Primary, Gesture::Manipulate) => {
                self.pointer_moved(point);
                self.gesture = Gesture::Idle;
                if let Some(id) = self.gizmo.end_drag() {
                    log::debug!("Finished dragging node {}", id);
                }
            }
            (PointerButton::Primary, Gesture::Orbit { .. })
            | (PointerButton::Secondary, Gesture::Pan { .. }) => {
                self.gesture = Gesture::Idle;
            }
            _ => {}
        }
        // A drag never outlives the primary button.
        if button == PointerButton::Primary {
            self.gizmo.end_drag();
        }
    }

    /// Positive `lines` zooms in.
    pub fn scroll(&mut self, lines: f32) {
        if lines != 0.0 {
            self.camera.zoom(lines, self.config.camera.zoom_step);
        }
    }

    // ---- frame --------------------------------------------------------

    /// Updates the camera for the on-screen scene rectangle (in points).
    pub fn set_viewport(&mut self, origin: Vec2, size: Vec2) -> bool {
        let previous = self.camera.aspect;
        let changed = self.camera.set_viewport(origin, size);
        if changed && previous != self.camera.aspect {
            log::debug!("Viewport {}x{} (aspect {:.3})", size.x, size.y, self.camera.aspect);
        }
        changed
    }

    /// Drains finished imports and applies queued nudges.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        for outcome in self.imports.poll() {
            if self.apply_import(outcome) {
                report.imported += 1;
            } else {
                report.failed += 1;
            }
        }
        report.nudged = self.apply_pending_nudges();
        report
    }

    pub fn panel_view(&self) -> PanelView<'_> {
        let bound = self.active_mesh().and_then(|id| self.scene.get(id));
        PanelView {
            bound_name: bound.map(|node| node.name.as_str()),
            triangle_count: bound
                .and_then(|node| node.mesh())
                .map_or(0, |mesh| mesh.geometry.triangle_count()),
            selected: self.selection.is_some(),
            options: bound.and_then(PanelOptions::from_node),
            mode: self.gizmo.mode(),
            status: self.status(),
            imports_in_flight: self.imports_in_flight(),
        }
    }

    /// Applies panel edits to the active mesh. Returns `true` when the user
    /// asked for the file dialog.
    pub fn apply_panel(&mut self, output: PanelOutput) -> bool {
        if let Some(node) = self.active_mesh().and_then(|id| self.scene.get_mut(id)) {
            for field in output.fields {
                apply_field(node, field);
            }
        }

        let mut open_dialog = false;
        for action in output.actions {
            match action {
                PanelAction::Import => open_dialog = true,
                PanelAction::Duplicate => {
                    self.duplicate_selected();
                }
                PanelAction::Delete => {
                    self.delete_selected();
                }
                PanelAction::ResetPosition => {
                    self.reset_active_position();
                }
                PanelAction::SetMode(mode) => {
                    self.handle_action(InputAction::SetGizmoMode(mode));
                }
            }
        }
        open_dialog
    }
}
