//! A red cube whose position, visibility, wireframe and colour are driven from the debug
//! panel, plus a button that spins it once around its vertical axis.

use std::f32::consts::TAU;

use instant::Duration;
use winit::event::{DeviceEvent, WindowEvent};

use crate::{
    color::Color,
    context::{Context, InitContext},
    data_structures::{
        instance::Instance,
        scene_graph::{MaterialId, NodeId},
    },
    flow::{FlowConsturctor, GraphicsFlow, Out},
    geometry::box_geometry,
    gui::DebugPanel,
    material::Material,
    render::Render,
    scene::Scene,
    tween::Tween,
};

/// One full turn in one second.
pub fn spin_tween(from: f32) -> Tween {
    Tween::to(from, from + TAU, 1.0)
}

pub struct CubeWorld {
    scene: Scene,
    cube: NodeId,
    material: MaterialId,
    spin: Option<Tween>,
}

impl CubeWorld {
    fn new(ctx: &InitContext) -> Self {
        let mut scene = Scene::new(ctx);
        let geometry = scene.add_geometry("cube", &box_geometry(1.0, 1.0, 1.0));
        let material = scene.add_material(Material::basic(0xff0000));
        let cube = scene.add_mesh(None, "cube", geometry, material, Instance::new());
        Self {
            scene,
            cube,
            material,
            spin: None,
        }
    }

    pub fn elevation(&self) -> f32 {
        self.scene[self.cube].transform.position.y
    }

    pub fn set_elevation(&mut self, y: f32) {
        self.scene[self.cube].transform.position.y = y;
    }

    pub fn visible(&self) -> bool {
        self.scene[self.cube].visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.scene[self.cube].visible = visible;
    }

    pub fn wireframe(&self) -> bool {
        self.scene
            .material(self.material)
            .is_some_and(|m| m.wireframe)
    }

    pub fn set_wireframe(&mut self, wireframe: bool) {
        if let Some(material) = self.scene.material_mut(self.material) {
            material.wireframe = wireframe;
        }
    }

    pub fn color(&self) -> Color {
        self.scene
            .material(self.material)
            .map_or(Color::WHITE, |m| m.color)
    }

    pub fn set_color(&mut self, color: Color) {
        if let Some(material) = self.scene.material_mut(self.material) {
            material.color = color;
        }
    }

    /// Restarts from the current angle if a spin is still running.
    pub fn spin(&mut self) {
        let from = self.scene[self.cube].transform.rotation.y;
        self.spin = Some(spin_tween(from));
    }

    fn animate(&mut self, dt: f32) {
        let Some(tween) = &mut self.spin else {
            return;
        };
        self.scene[self.cube].transform.rotation.y = tween.advance(dt);
        if tween.is_finished() {
            self.spin = None;
        }
    }
}

pub struct DebugUi {
    world: CubeWorld,
    panel: DebugPanel<CubeWorld>,
}

impl DebugUi {
    pub fn new(ctx: &InitContext) -> Self {
        let mut panel = DebugPanel::new("Debug");
        panel
            .add_number("y", CubeWorld::elevation, CubeWorld::set_elevation)
            .min(-3.0)
            .max(3.0)
            .step(0.01)
            .name("elevation");
        panel.add_bool("visible", CubeWorld::visible, CubeWorld::set_visible);
        panel.add_bool("wireframe", CubeWorld::wireframe, CubeWorld::set_wireframe);
        panel.add_color("color", CubeWorld::color, CubeWorld::set_color);
        panel.add_button("spin", CubeWorld::spin);
        Self {
            world: CubeWorld::new(ctx),
            panel,
        }
    }
}

pub fn constructor() -> FlowConsturctor<(), ()> {
    Box::new(|ctx| {
        Box::pin(async move {
            let flow: Box<dyn GraphicsFlow<(), ()>> = Box::new(DebugUi::new(&ctx));
            flow
        })
    })
}

impl GraphicsFlow<(), ()> for DebugUi {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        super::look_around(ctx, "Debug UI", [0.0, 0.0, 3.0]);
        Out::Empty
    }

    fn on_update(&mut self, _: &Context, _: &mut (), dt: Duration) -> Out<(), ()> {
        self.world.animate(dt.as_secs_f32());
        Out::Empty
    }

    fn on_tick(&mut self, _: &Context, _: &mut ()) -> Out<(), ()> {
        Out::Empty
    }

    fn on_device_events(&mut self, _: &Context, _: &mut (), _: &DeviceEvent) -> Out<(), ()> {
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut (), _: &WindowEvent) -> Out<(), ()> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut (), event: ()) -> Option<()> {
        Some(event)
    }

    fn on_gui(&mut self, gui: &egui::Context, _: &mut ()) -> Out<(), ()> {
        self.panel.show(gui, &mut self.world);
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        (&self.world.scene).into()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn spin_turns_once_in_a_second() {
        let mut tween = spin_tween(0.5);
        assert_relative_eq!(tween.value(), 0.5);
        tween.advance(0.5);
        assert!(!tween.is_finished());
        assert!(tween.value() > 0.5 && tween.value() < 0.5 + TAU);
        tween.advance(0.6);
        assert!(tween.is_finished());
        assert_relative_eq!(tween.value(), 0.5 + TAU);
    }
}
