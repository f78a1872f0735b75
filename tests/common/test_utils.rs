#![allow(dead_code)]
#[cfg(feature = "integration-tests")]
use flow_lessons::flow::ImageTestResult;
#[cfg(feature = "integration-tests")]
use flow_lessons::{
    context::Context,
    flow::{GraphicsFlow, Out},
    render::Render,
    scene::Scene,
};

pub(crate) struct State {
    frame_counter: u32,
    init_invocations: u32,
    update_invocations: u32,
    gui_invocations: u32,
    pub dummy_state: String,
}
impl State {
    pub fn new() -> Self {
        Self {
            frame_counter: 0,
            init_invocations: 0,
            update_invocations: 0,
            gui_invocations: 0,
            dummy_state: String::new(),
        }
    }

    pub fn frame(&mut self) {
        self.frame_counter += 1;
    }

    pub fn init(&mut self) {
        self.init_invocations += 1;
    }

    pub fn update(&mut self) {
        self.update_invocations += 1;
    }

    pub fn gui(&mut self) {
        self.gui_invocations += 1;
    }

    pub fn frame_counter(&self) -> u32 {
        self.frame_counter
    }

    pub fn init_invocations(&self) -> u32 {
        self.init_invocations
    }

    pub fn update_invocations(&self) -> u32 {
        self.update_invocations
    }

    pub fn gui_invocations(&self) -> u32 {
        self.gui_invocations
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub(crate) struct FrameCounter(pub(crate) u32);
impl FrameCounter {
    pub(crate) fn frame(&self) -> u32 {
        self.0
    }

    pub(crate) fn progress(&mut self) {
        self.0 += 1;
    }
}

#[cfg(feature = "integration-tests")]
pub(crate) type Frame<'a> = image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView<'a>>;

#[cfg(feature = "integration-tests")]
type Validate =
    Box<dyn Fn(&Context, &mut FrameCounter, &mut Frame<'_>) -> Result<ImageTestResult, anyhow::Error>>;

/// Renders an optional scene and hands every frame to `validate`.
#[cfg(feature = "integration-tests")]
pub(crate) struct TestRender {
    pub(crate) scene: Option<Scene>,
    pub(crate) setup: Box<dyn Fn(&mut Context)>,
    pub(crate) validate: Validate,
}

#[cfg(feature = "integration-tests")]
impl TestRender {
    pub(crate) fn new<S, V>(scene: Option<Scene>, setup: S, validate: V) -> Self
    where
        S: Fn(&mut Context) + 'static,
        V: Fn(&Context, &mut FrameCounter, &mut Frame<'_>) -> Result<ImageTestResult, anyhow::Error>
            + 'static,
    {
        Self {
            scene,
            setup: Box::new(setup),
            validate: Box::new(validate),
        }
    }
}

#[cfg(feature = "integration-tests")]
impl GraphicsFlow<FrameCounter, ()> for TestRender {
    fn on_init(&mut self, ctx: &mut Context, _: &mut FrameCounter) -> Out<FrameCounter, ()> {
        (self.setup)(ctx);
        Out::Empty
    }

    fn on_update(
        &mut self,
        _: &Context,
        state: &mut FrameCounter,
        _: std::time::Duration,
    ) -> Out<FrameCounter, ()> {
        state.progress();
        Out::Empty
    }

    fn on_tick(&mut self, _: &Context, _: &mut FrameCounter) -> Out<FrameCounter, ()> {
        Out::Empty
    }

    fn on_device_events(
        &mut self,
        _: &Context,
        _: &mut FrameCounter,
        _: &flow_lessons::DeviceEvent,
    ) -> Out<FrameCounter, ()> {
        Out::Empty
    }

    fn on_window_events(
        &mut self,
        _: &Context,
        _: &mut FrameCounter,
        _: &flow_lessons::WindowEvent,
    ) -> Out<FrameCounter, ()> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut FrameCounter, event: ()) -> Option<()> {
        Some(event)
    }

    fn on_gui(&mut self, _: &egui::Context, _: &mut FrameCounter) -> Out<FrameCounter, ()> {
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        self.scene.as_ref().map_or(Render::None, Render::Scene)
    }

    fn render_to_texture(
        &self,
        ctx: &Context,
        state: &mut FrameCounter,
        texture: &mut Frame<'_>,
    ) -> Result<ImageTestResult, anyhow::Error> {
        (self.validate)(ctx, state, texture)
    }
}

/// Pixel at the centre of the viewport; the readback is padded to 256 pixel rows so the
/// texture centre is the centre of the projection.
#[cfg(feature = "integration-tests")]
pub(crate) fn centre_pixel(texture: &Frame<'_>) -> image::Rgba<u8> {
    let (width, height) = texture.dimensions();
    *texture.get_pixel(width / 2, height / 2)
}

/// The readback is in the surface format, which may be BGRA, so only grey values are
/// compared.
#[cfg(feature = "integration-tests")]
pub(crate) fn is_grey(pixel: &image::Rgba<u8>, value: u8, tolerance: u8) -> bool {
    pixel.0[..3].iter().all(|c| c.abs_diff(value) <= tolerance)
}

#[macro_export]
macro_rules! golden_image_test {
    ($graphics_elem:expr) => {{
        use crate::common::test_utils::FrameCounter;
        use flow_lessons::flow::FlowConsturctor;
        use flow_lessons::flow::GraphicsFlow;
        let build = $graphics_elem;
        let model_constructor: FlowConsturctor<FrameCounter, ()> = Box::new(move |ctx| {
            Box::pin(async move {
                let g_flow: Box<dyn GraphicsFlow<FrameCounter, ()>> = Box::new(build(ctx).await);
                g_flow
            })
        });

        flow_lessons::flow::run(vec![model_constructor])
            .expect("Failed to run flow for integration test.");
    }};
}
