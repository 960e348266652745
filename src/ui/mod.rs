use crate::render::{Axis, GizmoMode, ROTATION_MAX, ROTATION_MIN, SCALE_MAX, SCALE_MIN};
use crate::scene::SceneNode;
use std::ops::RangeInclusive;

pub const SCALE_RANGE: RangeInclusive<f32> = SCALE_MIN..=SCALE_MAX;
pub const ROTATION_RANGE: RangeInclusive<f32> = ROTATION_MIN..=ROTATION_MAX;

/// Editable options of the mesh bound to the panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelOptions {
    pub color: [u8; 3],
    pub wireframe: bool,
    pub scale: [f32; 3],
    pub rotation: [f32; 3],
}

impl PanelOptions {
    /// `None` for nodes without a mesh.
    pub fn from_node(node: &SceneNode) -> Option<Self> {
        let mesh = node.mesh()?;
        Some(Self {
            color: mesh.material.color,
            wireframe: mesh.material.wireframe,
            scale: node.transform.scale.to_array(),
            rotation: node.transform.rotation.to_array(),
        })
    }
}

/// One field change coming out of the panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelField {
    Color([u8; 3]),
    Wireframe(bool),
    Scale(Axis, f32),
    Rotation(Axis, f32),
}

impl PanelField {
    /// Brings scale and rotation values into their allowed ranges. NaN
    /// becomes the lower bound.
    pub fn clamped(self) -> Self {
        match self {
            PanelField::Scale(axis, value) => PanelField::Scale(axis, clamp_to(value, &SCALE_RANGE)),
            PanelField::Rotation(axis, value) => {
                PanelField::Rotation(axis, clamp_to(value, &ROTATION_RANGE))
            }
            other => other,
        }
    }
}

fn clamp_to(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        *range.start()
    } else {
        value.clamp(*range.start(), *range.end())
    }
}

/// Applies a (clamped) field to a mesh node. Returns `false` when the node
/// has no mesh.
pub fn apply_field(node: &mut SceneNode, field: PanelField) -> bool {
    let field = field.clamped();
    match field {
        PanelField::Scale(axis, value) => {
            if node.mesh().is_none() {
                return false;
            }
            node.transform.scale[axis.index()] = value;
        }
        PanelField::Rotation(axis, value) => {
            if node.mesh().is_none() {
                return false;
            }
            node.transform.rotation[axis.index()] = value;
        }
        PanelField::Color(color) => match node.mesh_mut() {
            Some(mesh) => mesh.material.color = color,
            None => return false,
        },
        PanelField::Wireframe(wireframe) => match node.mesh_mut() {
            Some(mesh) => mesh.material.wireframe = wireframe,
            None => return false,
        },
    }
    true
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelAction {
    Import,
    Duplicate,
    Delete,
    ResetPosition,
    SetMode(GizmoMode),
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PanelOutput {
    pub fields: Vec<PanelField>,
    pub actions: Vec<PanelAction>,
}

/// Everything the panel displays for one frame.
pub struct PanelView<'a> {
    pub bound_name: Option<&'a str>,
    pub triangle_count: usize,
    pub selected: bool,
    pub options: Option<PanelOptions>,
    pub mode: GizmoMode,
    pub status: Option<&'a str>,
    pub imports_in_flight: usize,
}

/// Side panel with import actions, gizmo mode and mesh options.
pub fn show_property_panel(ctx: &egui::Context, view: &PanelView<'_>) -> PanelOutput {
    let mut output = PanelOutput::default();

    egui::SidePanel::right("property_panel")
        .resizable(false)
        .default_width(250.0)
        .show(ctx, |ui| {
            ui.heading("Scene");
            ui.horizontal(|ui| {
                if ui.button("Import…").clicked() {
                    output.actions.push(PanelAction::Import);
                }
                if ui
                    .add_enabled(view.selected, egui::Button::new("Duplicate"))
                    .clicked()
                {
                    output.actions.push(PanelAction::Duplicate);
                }
                if ui
                    .add_enabled(view.selected, egui::Button::new("Delete"))
                    .clicked()
                {
                    output.actions.push(PanelAction::Delete);
                }
            });
            if view.imports_in_flight > 0 {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(format!("Importing {} file(s)", view.imports_in_flight));
                });
            }

            ui.separator();
            ui.label("Gizmo");
            ui.horizontal(|ui| {
                for mode in GizmoMode::ALL {
                    if ui.selectable_label(view.mode == mode, mode.label()).clicked()
                        && view.mode != mode
                    {
                        output.actions.push(PanelAction::SetMode(mode));
                    }
                }
            });

            ui.separator();
            match (view.bound_name, view.options) {
                (Some(name), Some(options)) => {
                    ui.strong(name);
                    ui.label(format!("{} triangles", view.triangle_count));
                    mesh_options(ui, options, &mut output);
                    if ui.button("Reset position").clicked() {
                        output.actions.push(PanelAction::ResetPosition);
                    }
                }
                _ => {
                    ui.weak("Import an STL file to edit it here.");
                }
            }

            if let Some(status) = view.status {
                ui.separator();
                ui.label(status);
            }
        });

    output
}

fn mesh_options(ui: &mut egui::Ui, options: PanelOptions, output: &mut PanelOutput) {
    let mut color = options.color;
    ui.horizontal(|ui| {
        ui.label("color");
        if ui.color_edit_button_srgb(&mut color).changed() {
            output.fields.push(PanelField::Color(color));
        }
    });

    let mut wireframe = options.wireframe;
    if ui.checkbox(&mut wireframe, "wireframe").changed() {
        output.fields.push(PanelField::Wireframe(wireframe));
    }

    egui::Grid::new("transform_fields")
        .num_columns(2)
        .show(ui, |ui| {
            for axis in Axis::ALL {
                let mut value = options.scale[axis.index()];
                ui.label(format!("scale{}", axis_suffix(axis)));
                let slider = egui::Slider::new(&mut value, SCALE_RANGE)
                    .clamping(egui::SliderClamping::Edits)
                    .step_by(0.01);
                if ui.add(slider).changed() {
                    output.fields.push(PanelField::Scale(axis, value).clamped());
                }
                ui.end_row();
            }
            for axis in Axis::ALL {
                let mut value = options.rotation[axis.index()];
                ui.label(format!("rotation{}", axis_suffix(axis)));
                let slider = egui::Slider::new(&mut value, ROTATION_RANGE)
                    .clamping(egui::SliderClamping::Edits);
                if ui.add(slider).changed() {
                    output.fields.push(PanelField::Rotation(axis, value).clamped());
                }
                ui.end_row();
            }
        });
}

fn axis_suffix(axis: Axis) -> &'static str {
    match axis {
        Axis::X => "X",
        Axis::Y => "Y",
        Axis::Z => "Z",
    }
}
