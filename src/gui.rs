//! Debug panel: a list of controllers bound to properties of a lesson's world, painted
//! with egui.
//!
//! ```ignore
//! panel
//!     .add_number("elevation", |w: &World| w.elevation(), |w, v| w.set_elevation(v))
//!     .min(-3.0)
//!     .max(3.0)
//!     .step(0.01);
//! ```

use crate::color::Color;

type Getter<T, V> = Box<dyn Fn(&T) -> V>;
type Setter<T, V> = Box<dyn Fn(&mut T, V)>;
type Callback<T> = Box<dyn FnMut(&mut T)>;

enum Kind<T> {
    Number {
        get: Getter<T, f32>,
        set: Setter<T, f32>,
        min: Option<f32>,
        max: Option<f32>,
        step: Option<f32>,
    },
    Bool {
        get: Getter<T, bool>,
        set: Setter<T, bool>,
    },
    Color {
        get: Getter<T, Color>,
        set: Setter<T, Color>,
    },
    Options {
        options: Vec<String>,
        get: Getter<T, usize>,
        set: Setter<T, usize>,
    },
    Button {
        action: Callback<T>,
    },
}

struct Controller<T> {
    name: String,
    kind: Kind<T>,
    on_change: Option<Callback<T>>,
    on_finish_change: Option<Callback<T>>,
    /// A colour edit whose finish callback waits for the pointer to come up.
    pending_finish: bool,
}

impl<T> Controller<T> {
    fn changed(&mut self, target: &mut T, finished: bool) {
        if let Some(on_change) = &mut self.on_change {
            on_change(target);
        }
        if finished {
            self.changed_finish(target);
        }
    }

    fn changed_finish(&mut self, target: &mut T) {
        if let Some(on_finish_change) = &mut self.on_finish_change {
            on_finish_change(target);
        }
    }

    /// Applies a colour picked this frame, if any. Pickers report every move of a drag,
    /// so the finish callback runs once the edit is `settled`.
    fn edit_color(&mut self, target: &mut T, edited: Option<Color>, settled: bool) {
        if let Some(color) = edited {
            let Kind::Color { set, .. } = &self.kind else {
                return;
            };
            set(target, color);
            self.changed(target, false);
            self.pending_finish = true;
        }
        if self.pending_finish && settled {
            self.pending_finish = false;
            self.changed_finish(target);
        }
    }

    /// Snaps, clamps and stores a number, returning the stored value.
    fn set_number(&mut self, target: &mut T, value: f32, finished: bool) -> Option<f32> {
        let Kind::Number {
            set, min, max, step, ..
        } = &self.kind
        else {
            return None;
        };
        let value = snap_clamp(value, *min, *max, *step);
        set(target, value);
        self.changed(target, finished);
        Some(value)
    }
}

/// Rounds to the nearest `step` counted from `min` (or `max`), then clamps.
pub fn snap_clamp(value: f32, min: Option<f32>, max: Option<f32>, step: Option<f32>) -> f32 {
    let mut value = value;
    if let Some(step) = step.filter(|s| *s > 0.0) {
        let offset = min.or(max).unwrap_or(0.0) as f64;
        let step = step as f64;
        let snapped = ((value as f64 - offset) / step).round() * step + offset;
        value = snapped as f32;
    }
    if let Some(min) = min {
        value = value.max(min);
    }
    if let Some(max) = max {
        value = value.min(max);
    }
    value
}

/// Fluent configuration of the controller that was just added.
pub struct ControllerBuilder<'p, T> {
    controller: &'p mut Controller<T>,
}

impl<T> ControllerBuilder<'_, T> {
    pub fn min(self, value: f32) -> Self {
        if let Kind::Number { min, .. } = &mut self.controller.kind {
            *min = Some(value);
        }
        self
    }

    pub fn max(self, value: f32) -> Self {
        if let Kind::Number { max, .. } = &mut self.controller.kind {
            *max = Some(value);
        }
        self
    }

    pub fn step(self, value: f32) -> Self {
        if let Kind::Number { step, .. } = &mut self.controller.kind {
            *step = Some(value);
        }
        self
    }

    pub fn name(self, name: &str) -> Self {
        self.controller.name = name.to_owned();
        self
    }

    /// Runs after every change, including each step of a drag.
    pub fn on_change<F: FnMut(&mut T) + 'static>(self, f: F) -> Self {
        self.controller.on_change = Some(Box::new(f));
        self
    }

    /// Runs once a drag ends or a discrete edit lands.
    pub fn on_finish_change<F: FnMut(&mut T) + 'static>(self, f: F) -> Self {
        self.controller.on_finish_change = Some(Box::new(f));
        self
    }
}

pub struct DebugPanel<T> {
    title: String,
    controllers: Vec<Controller<T>>,
    pub visible: bool,
}

impl<T> DebugPanel<T> {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_owned(),
            controllers: Vec::new(),
            visible: true,
        }
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    fn push(&mut self, name: &str, kind: Kind<T>) -> ControllerBuilder<'_, T> {
        self.controllers.push(Controller {
            name: name.to_owned(),
            kind,
            on_change: None,
            on_finish_change: None,
            pending_finish: false,
        });
        let last = self.controllers.len() - 1;
        ControllerBuilder {
            controller: &mut self.controllers[last],
        }
    }

    pub fn add_number<G, S>(&mut self, name: &str, get: G, set: S) -> ControllerBuilder<'_, T>
    where
        G: Fn(&T) -> f32 + 'static,
        S: Fn(&mut T, f32) + 'static,
    {
        self.push(
            name,
            Kind::Number {
                get: Box::new(get),
                set: Box::new(set),
                min: None,
                max: None,
                step: None,
            },
        )
    }

    pub fn add_bool<G, S>(&mut self, name: &str, get: G, set: S) -> ControllerBuilder<'_, T>
    where
        G: Fn(&T) -> bool + 'static,
        S: Fn(&mut T, bool) + 'static,
    {
        self.push(
            name,
            Kind::Bool {
                get: Box::new(get),
                set: Box::new(set),
            },
        )
    }

    pub fn add_color<G, S>(&mut self, name: &str, get: G, set: S) -> ControllerBuilder<'_, T>
    where
        G: Fn(&T) -> Color + 'static,
        S: Fn(&mut T, Color) + 'static,
    {
        self.push(
            name,
            Kind::Color {
                get: Box::new(get),
                set: Box::new(set),
            },
        )
    }

    /// A drop-down over `options`; the bound value is the selected index.
    pub fn add_options<G, S>(
        &mut self,
        name: &str,
        options: &[&str],
        get: G,
        set: S,
    ) -> ControllerBuilder<'_, T>
    where
        G: Fn(&T) -> usize + 'static,
        S: Fn(&mut T, usize) + 'static,
    {
        self.push(
            name,
            Kind::Options {
                options: options.iter().map(|o| o.to_string()).collect(),
                get: Box::new(get),
                set: Box::new(set),
            },
        )
    }

    pub fn add_button<F>(&mut self, name: &str, action: F) -> ControllerBuilder<'_, T>
    where
        F: FnMut(&mut T) + 'static,
    {
        self.push(
            name,
            Kind::Button {
                action: Box::new(action),
            },
        )
    }

    fn find(&mut self, name: &str) -> Option<&mut Controller<T>> {
        self.controllers.iter_mut().find(|c| c.name == name)
    }

    /// Sets a number as if it had been typed into the panel.
    pub fn set_number(&mut self, target: &mut T, name: &str, value: f32) -> Option<f32> {
        self.find(name)?.set_number(target, value, true)
    }

    pub fn set_bool(&mut self, target: &mut T, name: &str, value: bool) -> bool {
        let Some(controller) = self.find(name) else {
            return false;
        };
        let Kind::Bool { set, .. } = &controller.kind else {
            return false;
        };
        set(target, value);
        controller.changed(target, true);
        true
    }

    pub fn set_color(&mut self, target: &mut T, name: &str, color: Color) -> bool {
        match self.find(name) {
            Some(controller) if matches!(controller.kind, Kind::Color { .. }) => {
                controller.edit_color(target, Some(color), true);
                true
            }
            _ => false,
        }
    }

    pub fn select(&mut self, target: &mut T, name: &str, index: usize) -> bool {
        let Some(controller) = self.find(name) else {
            return false;
        };
        let Kind::Options { options, set, .. } = &controller.kind else {
            return false;
        };
        if index >= options.len() {
            return false;
        }
        set(target, index);
        controller.changed(target, true);
        true
    }

    pub fn press(&mut self, target: &mut T, name: &str) -> bool {
        match self.find(name) {
            Some(Controller {
                kind: Kind::Button { action },
                ..
            }) => {
                action(target);
                true
            }
            _ => false,
        }
    }

    pub fn show(&mut self, ctx: &egui::Context, target: &mut T) {
        if !self.visible {
            return;
        }
        egui::Window::new(self.title.as_str())
            .anchor(egui::Align2::RIGHT_TOP, [-8.0, 8.0])
            .resizable(false)
            .show(ctx, |ui| {
                for controller in &mut self.controllers {
                    show_controller(ui, controller, target);
                }
            });
    }
}

fn show_controller<T>(ui: &mut egui::Ui, controller: &mut Controller<T>, target: &mut T) {
    let name = controller.name.clone();
    match &mut controller.kind {
        Kind::Number {
            get,
            min,
            max,
            step,
            ..
        } => {
            let mut value = get(target);
            let response = match (*min, *max) {
                (Some(min), Some(max)) => {
                    let mut slider = egui::Slider::new(&mut value, min..=max).text(&name);
                    if let Some(step) = *step {
                        slider = slider.step_by(step as f64);
                    }
                    ui.add(slider)
                }
                _ => ui
                    .horizontal(|ui| {
                        let mut drag = egui::DragValue::new(&mut value);
                        if let Some(step) = *step {
                            drag = drag.speed(step as f64);
                        }
                        let response = ui.add(drag);
                        ui.label(&name);
                        response
                    })
                    .inner,
            };
            if response.changed() {
                controller.set_number(target, value, !response.dragged());
            } else if response.drag_stopped() {
                controller.changed_finish(target);
            }
        }
        Kind::Bool { get, set } => {
            let mut value = get(target);
            if ui.checkbox(&mut value, &name).changed() {
                set(target, value);
                controller.changed(target, true);
            }
        }
        Kind::Color { get, .. } => {
            let [r, g, b] = get(target).to_array().map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
            let mut rgb = [r, g, b];
            let response = ui
                .horizontal(|ui| {
                    let response = ui.color_edit_button_srgb(&mut rgb);
                    ui.label(&name);
                    response
                })
                .inner;
            let edited = response.changed().then(|| {
                Color::new(
                    rgb[0] as f32 / 255.0,
                    rgb[1] as f32 / 255.0,
                    rgb[2] as f32 / 255.0,
                )
            });
            let settled = !ui.input(|i| i.pointer.any_down());
            controller.edit_color(target, edited, settled);
        }
        Kind::Options { options, get, set } => {
            let mut selected = get(target);
            let before = selected;
            egui::ComboBox::from_label(&name)
                .selected_text(options.get(selected).map(String::as_str).unwrap_or(""))
                .show_ui(ui, |ui| {
                    for (i, option) in options.iter().enumerate() {
                        ui.selectable_value(&mut selected, i, option);
                    }
                });
            if selected != before {
                set(target, selected);
                controller.changed(target, true);
            }
        }
        Kind::Button { action } => {
            if ui.button(&name).clicked() {
                action(target);
            }
        }
    }
}

/// egui context, winit input translation and wgpu painter of the window.
pub(crate) struct GuiLayer {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    frame: Option<egui::FullOutput>,
}

impl std::fmt::Debug for GuiLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GuiLayer")
    }
}

impl GuiLayer {
    pub(crate) fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::viewport::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let renderer = egui_wgpu::Renderer::new(device, format, None, 1, false);
        Self {
            ctx,
            state,
            renderer,
            frame: None,
        }
    }

    /// Returns true if the panel used the event, e.g. a drag that started on a slider.
    pub(crate) fn on_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    pub(crate) fn run(&mut self, window: &winit::window::Window, ui: impl FnMut(&egui::Context)) {
        let raw_input = self.state.take_egui_input(window);
        let mut output = self.ctx.run(raw_input, ui);
        self.state
            .handle_platform_output(window, std::mem::take(&mut output.platform_output));
        self.frame = Some(output);
    }

    /// Paints the last [`GuiLayer::run`] on top of `view`. `buffer_scale` maps physical
    /// window pixels to surface pixels. The returned command buffers have to be submitted
    /// before the encoder.
    pub(crate) fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size_in_pixels: [u32; 2],
        buffer_scale: f32,
    ) -> Vec<wgpu::CommandBuffer> {
        let Some(output) = self.frame.take() else {
            return Vec::new();
        };
        let paint_jobs = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels,
            pixels_per_point: output.pixels_per_point * buffer_scale,
        };
        for (id, image_delta) in &output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }
        let commands = self
            .renderer
            .update_buffers(device, queue, encoder, &paint_jobs, &screen);
        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                })
                .forget_lifetime();
            self.renderer.render(&mut render_pass, &paint_jobs, &screen);
        }
        for id in &output.textures_delta.free {
            self.renderer.free_texture(id);
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[derive(Default)]
    struct World {
        elevation: f32,
        count: f32,
        regenerated: u32,
        changes: u32,
        visible: bool,
        kind: usize,
        spins: u32,
        tint: Option<Color>,
    }

    #[test]
    fn numbers_snap_to_step_from_min() {
        assert_relative_eq!(snap_clamp(1.234, Some(-3.0), Some(3.0), Some(0.01)), 1.23);
        assert_relative_eq!(snap_clamp(0.26, Some(0.1), None, Some(0.5)), 0.1);
        assert_relative_eq!(snap_clamp(150.0, Some(100.0), Some(1_000_000.0), Some(100.0)), 200.0);
    }

    #[test]
    fn numbers_clamp_to_range() {
        assert_relative_eq!(snap_clamp(-7.0, Some(-3.0), Some(3.0), Some(0.01)), -3.0);
        assert_relative_eq!(snap_clamp(42.0, None, Some(10.0), None), 10.0);
        assert_relative_eq!(snap_clamp(0.123_45, None, None, None), 0.123_45);
    }

    #[test]
    fn set_number_fires_change_and_finish_callbacks() {
        let mut panel = DebugPanel::<World>::new("test");
        panel
            .add_number("count", |w| w.count, |w, v| w.count = v)
            .min(100.0)
            .max(1_000_000.0)
            .step(100.0)
            .on_change(|w| w.changes += 1)
            .on_finish_change(|w| w.regenerated += 1);
        let mut world = World::default();
        assert_eq!(panel.set_number(&mut world, "count", 1049.0), Some(1000.0));
        assert_relative_eq!(world.count, 1000.0);
        assert_eq!(world.changes, 1);
        assert_eq!(world.regenerated, 1);
        assert_eq!(panel.set_number(&mut world, "missing", 1.0), None);
    }

    #[test]
    fn renamed_controllers_are_found_by_their_new_name() {
        let mut panel = DebugPanel::<World>::new("test");
        panel
            .add_number("y", |w| w.elevation, |w, v| w.elevation = v)
            .min(-3.0)
            .max(3.0)
            .step(0.01)
            .name("elevation");
        let mut world = World::default();
        assert!(panel.set_number(&mut world, "y", 1.0).is_none());
        assert_eq!(panel.set_number(&mut world, "elevation", 9.0), Some(3.0));
    }

    #[test]
    fn bools_options_and_buttons() {
        let mut panel = DebugPanel::<World>::new("test");
        panel.add_bool("visible", |w| w.visible, |w, v| w.visible = v);
        panel.add_options("kind", &["basic", "standard"], |w| w.kind, |w, i| w.kind = i);
        panel.add_button("spin", |w| w.spins += 1);
        assert_eq!(panel.len(), 3);

        let mut world = World::default();
        assert!(panel.set_bool(&mut world, "visible", true));
        assert!(world.visible);
        assert!(panel.select(&mut world, "kind", 1));
        assert!(!panel.select(&mut world, "kind", 2));
        assert_eq!(world.kind, 1);
        assert!(panel.press(&mut world, "spin"));
        assert!(!panel.press(&mut world, "visible"));
        assert_eq!(world.spins, 1);
    }

    #[test]
    fn color_drags_finish_once_the_pointer_is_up() {
        let mut panel = DebugPanel::<World>::new("test");
        panel
            .add_color("inside", |w| w.tint.unwrap_or(Color::BLACK), |w, c| w.tint = Some(c))
            .on_change(|w| w.changes += 1)
            .on_finish_change(|w| w.regenerated += 1);
        let mut world = World::default();
        let Some(picker) = panel.find("inside") else {
            panic!("colour controller is missing");
        };
        for red in [0.2, 0.4, 0.6] {
            picker.edit_color(&mut world, Some(Color::new(red, 0.0, 0.0)), false);
        }
        picker.edit_color(&mut world, None, false);
        assert_eq!(world.changes, 3);
        assert_eq!(world.regenerated, 0);

        picker.edit_color(&mut world, None, true);
        picker.edit_color(&mut world, None, true);
        assert_eq!(world.regenerated, 1);
        assert_eq!(world.tint, Some(Color::new(0.6, 0.0, 0.0)));

        assert!(panel.set_color(&mut world, "inside", Color::WHITE));
        assert!(!panel.set_color(&mut world, "missing", Color::WHITE));
        assert_eq!(world.regenerated, 2);
    }
}
