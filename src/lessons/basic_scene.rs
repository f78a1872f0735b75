//! A red cube in front of the camera, nothing moves.

use instant::Duration;
use winit::event::{DeviceEvent, WindowEvent};

use crate::{
    camera::Camera,
    context::{Context, InitContext},
    data_structures::instance::Instance,
    flow::{FlowConsturctor, GraphicsFlow, Out},
    geometry::primitives::box_geometry,
    material::Material,
    render::Render,
    scene::Scene,
};

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 600;

pub struct BasicScene {
    scene: Scene,
}

impl BasicScene {
    pub fn new(ctx: &InitContext) -> Self {
        let mut scene = Scene::new(ctx);
        let geometry = scene.add_geometry("cube", &box_geometry(1.0, 1.0, 1.0));
        let material = scene.add_material(Material::basic(0xff0000));
        scene.add_mesh(None, "cube", geometry, material, Instance::new());
        Self { scene }
    }
}

pub fn constructor() -> FlowConsturctor<(), ()> {
    Box::new(|ctx| {
        Box::pin(async move {
            let flow: Box<dyn GraphicsFlow<(), ()>> = Box::new(BasicScene::new(&ctx));
            flow
        })
    })
}

impl GraphicsFlow<(), ()> for BasicScene {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        ctx.set_title("Basic scene");
        ctx.set_window_size(WIDTH, HEIGHT);
        ctx.camera.camera = Camera::new((0.0, 0.0, 3.0));
        ctx.camera.controls.enabled = false;
        Out::Empty
    }

    fn on_update(&mut self, _: &Context, _: &mut (), _: Duration) -> Out<(), ()> {
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

    fn on_gui(&mut self, _: &egui::Context, _: &mut ()) -> Out<(), ()> {
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        (&self.scene).into()
    }
}
