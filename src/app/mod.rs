mod editor;
mod egui_host;
mod input;
mod timing;

pub use editor::{Editor, PointerButton};
pub use egui_host::{EguiFrameOutput, EguiHost};

use crate::config::ViewerConfig;
use crate::render::{paint_scene, FrameStatus, PaintStats, RenderContext};
use crate::ui::{show_property_panel, PanelOutput};
use input::action_for_key;
use timing::{FrameStats, FrameTiming};

use glam::Vec2;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

/// Points of egui scroll delta per wheel line.
const POINTS_PER_LINE: f32 = 50.0;

pub struct App {
    window: Option<Arc<Window>>,
    render: Option<RenderContext>,
    egui: Option<EguiHost>,
    editor: Editor,
    timing: FrameTiming,
    paint_stats: PaintStats,
    target_frame_duration: Duration,
    next_frame_time: Instant,
    startup_files: Vec<PathBuf>,
}

impl App {
    fn new(config: ViewerConfig, startup_files: Vec<PathBuf>) -> Self {
        let now = Instant::now();
        Self {
            window: None,
            render: None,
            egui: None,
            editor: Editor::new(config),
            timing: FrameTiming::new(now),
            paint_stats: PaintStats::default(),
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: now,
            startup_files,
        }
    }

    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(monitor) = window.current_monitor() {
            if let Some(millihz) = monitor.refresh_rate_millihertz() {
                let hz = millihz as f32 / 1000.0;
                if hz > 1.0 {
                    target = Duration::from_secs_f32(1.0 / hz);
                }
            }
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if let Some(render) = &mut self.render {
            if render.resize(new_size) {
                log::info!("Window resized to {}x{}", new_size.width, new_size.height);
            }
        }
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        self.timing.tick(Instant::now());
        let report = self.editor.tick();
        if report.imported + report.failed > 0 {
            log::debug!(
                "Imports this frame: {} added, {} failed",
                report.imported,
                report.failed
            );
        }
        if report.nudged {
            log::trace!("Applied keyboard nudge");
        }

        let (Some(window), Some(egui)) = (self.window.clone(), self.egui.as_mut()) else {
            return;
        };

        let editor = &mut self.editor;
        let stats = self.timing.stats();
        let previous_paint = self.paint_stats;
        let mut panel_output = PanelOutput::default();
        let mut paint_stats = PaintStats::default();

        let frame = egui.run(&window, |ctx| {
            panel_output = show_property_panel(ctx, &editor.panel_view());
            egui::CentralPanel::default()
                .frame(egui::Frame::NONE)
                .show(ctx, |ui| {
                    let rect = ui.max_rect();
                    editor.set_viewport(
                        Vec2::new(rect.min.x, rect.min.y),
                        Vec2::new(rect.width(), rect.height()),
                    );
                    let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
                    route_pointer(ui, &response, editor);

                    paint_stats = paint_scene(
                        &ui.painter_at(rect),
                        editor.scene(),
                        editor.camera(),
                        editor.selection(),
                        editor.gizmo(),
                    );
                    paint_overlay(ui, rect, stats, editor.scene().len(), previous_paint);
                });
        });
        self.paint_stats = paint_stats;

        if self.editor.apply_panel(panel_output) {
            self.open_file_dialog();
        }

        let clear_color = self.editor.config().window.clear_color;
        if let Some(render) = &mut self.render {
            match render.render(frame, clear_color) {
                Ok(FrameStatus::Presented) => {}
                Ok(status) => log::debug!("Frame not presented: {:?}", status),
                Err(err) => {
                    log::error!("Rendering failed: {}", err);
                    event_loop.exit();
                }
            }
        }
    }

    fn open_file_dialog(&mut self) {
        let picked = rfd::FileDialog::new()
            .set_title("Import STL")
            .add_filter("STL mesh", &["stl", "STL"])
            .pick_files();
        match picked {
            Some(paths) => self.editor.import_files(paths),
            None => log::debug!("File dialog cancelled"),
        }
    }
}

/// Forwards egui pointer state over the scene rectangle to the editor.
fn route_pointer(ui: &egui::Ui, response: &egui::Response, editor: &mut Editor) {
    use egui::PointerButton as Button;

    let (position, pressed, released, any_down, scroll) = ui.input(|input| {
        let pointer = &input.pointer;
        (
            pointer.latest_pos(),
            [
                pointer.button_pressed(Button::Primary),
                pointer.button_pressed(Button::Secondary),
            ],
            [
                pointer.button_released(Button::Primary),
                pointer.button_released(Button::Secondary),
            ],
            pointer.any_down(),
            input.raw_scroll_delta.y,
        )
    });
    let Some(position) = position else {
        return;
    };
    let point = Vec2::new(position.x, position.y);
    let over_scene = response.hovered() || response.contains_pointer();
    let buttons = [PointerButton::Primary, PointerButton::Secondary];

    if over_scene {
        for (button, down) in buttons.iter().zip(pressed) {
            if down {
                editor.pointer_pressed(*button, point);
            }
        }
    }
    if over_scene || any_down {
        editor.pointer_moved(point);
    }
    for (button, up) in buttons.iter().zip(released) {
        if up {
            editor.pointer_released(*button, point);
        }
    }
    if over_scene && scroll != 0.0 {
        editor.scroll(scroll / POINTS_PER_LINE);
    }
}

fn paint_overlay(
    ui: &egui::Ui,
    rect: egui::Rect,
    stats: FrameStats,
    node_count: usize,
    paint: PaintStats,
) {
    let text = format!(
        "{:.0} fps  {:.1} ms\n{} nodes  {} triangles  {} lines",
        stats.fps, stats.frame_ms, node_count, paint.triangles, paint.lines
    );
    ui.painter().text(
        rect.left_top() + egui::vec2(8.0, 8.0),
        egui::Align2::LEFT_TOP,
        text,
        egui::FontId::monospace(12.0),
        egui::Color32::from_gray(60),
    );
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_config = &self.editor.config().window;
        let window_attrs = WindowAttributes::default()
            .with_title(window_config.title.clone())
            .with_inner_size(PhysicalSize::new(window_config.width, window_config.height))
            .with_resizable(true);

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .expect("Failed to create window"),
        );

        let render = match RenderContext::new(window.clone()) {
            Ok(render) => render,
            Err(err) => {
                log::error!("Renderer setup failed: {}", err);
                event_loop.exit();
                return;
            }
        };

        self.egui = Some(EguiHost::new(&window));
        self.render = Some(render);
        self.update_target_frame_duration(&window);
        self.window = Some(window);

        let files = std::mem::take(&mut self.startup_files);
        self.editor.import_files(files);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let (Some(window), Some(egui)) = (self.window.as_ref(), self.egui.as_mut()) {
            egui.on_window_event(window, &event);
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.handle_resize(new_size);
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                    window.request_redraw();
                }
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.window.as_ref().map(|window| window.inner_size()) {
                    self.handle_resize(size);
                }
            }
            WindowEvent::Moved(_) => {
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::DroppedFile(path) => {
                self.editor.import_file(path);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let keyboard_captured = self
                    .egui
                    .as_ref()
                    .is_some_and(|egui| egui.wants_keyboard_input());
                if keyboard_captured {
                    return;
                }
                let action = action_for_key(event.physical_key, event.state == ElementState::Pressed);
                if self.editor.handle_action(action) {
                    event_loop.exit();
                }
            }
            WindowEvent::RedrawRequested => {
                self.frame(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

pub fn run(config: ViewerConfig, startup_files: Vec<PathBuf>) {
    log::info!("Drop STL files on the window or use Import… in the panel");
    log::info!("Press ESC or close the window to exit");

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config, startup_files);
    event_loop.run_app(&mut app).expect("Event loop error");

    log::info!("Goodbye");
}
