use winit::event::WindowEvent;
use winit::window::Window;

use crate::render::{GraphicsContext, SceneRenderer, UiFrame};

/// egui settings panel drawn over the rendered frame
pub struct SettingsPanel {
    ctx: egui::Context,
    state: egui_winit::State,
    visible: bool,
    /// Last load or drop failure, shown until the next success
    pub notice: Option<String>,
}

impl SettingsPanel {
    pub fn new(window: &Window, visible: bool) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        Self {
            ctx,
            state,
            visible,
            notice: None,
        }
    }

    /// Returns true when egui consumed the event
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.visible && self.state.on_window_event(window, event).consumed
    }

    pub fn run<C: GraphicsContext>(&mut self, window: &Window, renderer: &mut SceneRenderer<C>) -> Option<UiFrame> {
        if !self.visible {
            return None;
        }

        let raw_input = self.state.take_egui_input(window);
        let notice = self.notice.clone();
        let full_output = self.ctx.run(raw_input, |ctx| {
            egui::Window::new("settings")
                .default_pos(egui::pos2(10.0, 10.0))
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(
                        egui::RichText::new(renderer.render_status_message())
                            .monospace()
                            .color(egui::Color32::from_rgb(74, 158, 255)),
                    );
                    if let Some(notice) = &notice {
                        ui.colored_label(egui::Color32::LIGHT_RED, notice);
                    }
                    ui.separator();
                    renderer.add_ui(ui);
                });
        });

        self.state
            .handle_platform_output(window, full_output.platform_output);
        let pixels_per_point = self.ctx.pixels_per_point();
        Some(UiFrame {
            primitives: self.ctx.tessellate(full_output.shapes, pixels_per_point),
            textures_delta: full_output.textures_delta,
            pixels_per_point,
        })
    }
}
