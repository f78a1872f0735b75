//! Flow control and application event loop.
//!
//! A "flow" is one lesson (or any other self-contained scene) that handles input,
//! updates its world and says what to draw each frame. The engine owns the window and
//! GPU context, distributes events and composes the renders of all active flows.
//!
//! Per frame the engine ticks and updates the flows, moves the camera, builds the debug
//! panel, draws the composed [`Render`] of all flows (shadow pass, then main pass),
//! paints the panel on top and presents. Window events reach the panel first; orbit
//! controls only see what the panel left alone.

use std::{fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};

#[cfg(feature = "integration-tests")]
use tokio::runtime::Runtime;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    context::{Context, InitContext},
    gui::GuiLayer,
    render::{FrameTarget, Render},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// What a lifecycle hook hands back to the engine.
///
/// - `FutEvent`: futures resolving to custom events. Once resolved, every event travels
///   through the flows' `on_custom_events` until one of them consumes it.
/// - `FutFn`: futures resolving to a mutation of the shared state, applied by the engine.
/// - `Configure`: a change to the [`Context`] applied before the next frame, e.g. moving
///   the camera or switching shadows on.
/// - `Empty`: nothing to do; most hooks of the lessons return this.
pub enum Out<S, E> {
    FutEvent(Vec<Box<dyn Future<Output = E>>>),
    FutFn(Vec<Box<dyn Future<Output = Box<dyn FnOnce(&mut S)>>>>),
    Configure(Box<dyn FnOnce(&mut Context)>),
    Empty,
}

impl<S, E> Default for Out<S, E> {
    fn default() -> Self {
        Self::Empty
    }
}

#[cfg(feature = "integration-tests")]
pub enum ImageTestResult {
    Passed,
    Waiting,
    Failed,
}

/// A lesson, or any other scene the engine can drive.
///
/// `S` is state shared by all flows of one run and `E` the custom event type. The engine
/// calls `on_init` once, then per frame `on_tick` (every `tick_duration_millis`),
/// `on_update`, `on_gui` and `on_render`. Input hooks run as events arrive.
pub trait GraphicsFlow<S, E> {
    /// Window title and size, camera, orbit controls, shadows and clear colour are set here.
    fn on_init(&mut self, ctx: &mut Context, state: &mut S) -> Out<S, E>;

    /// Per frame, with the time since the previous frame.
    fn on_update(&mut self, ctx: &Context, state: &mut S, dt: Duration) -> Out<S, E>;

    /// Fixed rate updates, see [`Context::tick_duration_millis`].
    fn on_tick(&mut self, ctx: &Context, state: &mut S) -> Out<S, E>;

    fn on_device_events(&mut self, ctx: &Context, state: &mut S, event: &DeviceEvent) -> Out<S, E>;

    /// Sees every window event, including the ones the debug panel consumed.
    fn on_window_events(&mut self, ctx: &Context, state: &mut S, event: &WindowEvent) -> Out<S, E>;

    /// Gives the event back when this flow does not consume it, so the next flow sees it.
    fn on_custom_events(&mut self, ctx: &Context, state: &mut S, event: E) -> Option<E>;

    /// Builds this frame's debug panel.
    fn on_gui(&mut self, gui: &egui::Context, state: &mut S) -> Out<S, E>;

    fn on_render(&self) -> Render<'_>;

    /// Inspects the rendered frame. Flows that assert nothing pass right away.
    #[cfg(feature = "integration-tests")]
    fn render_to_texture(
        &self,
        _ctx: &Context,
        _state: &mut S,
        _texture: &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<ImageTestResult, anyhow::Error> {
        Ok(ImageTestResult::Passed)
    }
}

// `FlowEvent` travels through the wasm event loop, which wants `Debug`
impl<State, Event> Debug for dyn GraphicsFlow<State, Event> + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// Builds a flow once the GPU is up. Lessons load their textures in here.
pub type FlowConsturctor<S, E> =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow<S, E>>>>>>;

/// Everything that exists once the window and GPU are up.
#[derive(Debug)]
pub struct AppState<State: 'static> {
    pub(crate) ctx: Context,
    gui: GuiLayer,
    state: State,
    is_surface_configured: bool,
}

impl<State: Default> AppState<State> {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let ctx = Context::new(window).await?;
        let gui = GuiLayer::new(&ctx.window, &ctx.device, ctx.config.format);
        Ok(Self {
            ctx,
            gui,
            state: State::default(),
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.is_surface_configured = true;
        }
    }

    fn render<Event>(
        &mut self,
        graphics_flows: &mut [Box<dyn GraphicsFlow<State, Event>>],
        #[cfg(feature = "integration-tests")] async_runtime: &Runtime,
        #[cfg(feature = "integration-tests")] event_loop: &EventLoopProxy<
            FlowEvent<State, Event>,
        >,
    ) -> Result<Vec<Out<State, Event>>, wgpu::SurfaceError> {
        // keep frames coming
        self.ctx.window.request_redraw();

        if !self.is_surface_configured {
            return Ok(Vec::new());
        }

        let output = self.ctx.surface.get_current_texture()?;

        let mut outs = Vec::new();
        {
            let state = &mut self.state;
            self.gui.run(&self.ctx.window, |gui| {
                outs.extend(graphics_flows.iter_mut().map(|flow| flow.on_gui(gui, state)));
            });
        }

        #[cfg(not(feature = "integration-tests"))]
        let (view, depth_view) = (
            output
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
            self.ctx
                .depth_texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
        );

        // golden image tests draw offscreen and read the frame back
        #[cfg(feature = "integration-tests")]
        let capture = FrameCapture::new(&self.ctx);
        #[cfg(feature = "integration-tests")]
        let (view, depth_view) = capture.views();

        let mut encoder: wgpu::CommandEncoder =
            self.ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });

        let render = Render::Composed(graphics_flows.iter().map(|flow| flow.on_render()).collect());
        let ctx = &mut self.ctx;
        ctx.renderer.draw(
            &ctx.device,
            &ctx.queue,
            &mut encoder,
            &ctx.camera,
            ctx.shadows,
            FrameTarget {
                color: &view,
                depth: &depth_view,
                clear: ctx.clear_colour,
            },
            render,
        );

        let gui_commands = self.gui.paint(
            &self.ctx.device,
            &self.ctx.queue,
            &mut encoder,
            &view,
            [self.ctx.config.width, self.ctx.config.height],
            self.ctx.sizes.buffer_scale(self.ctx.window.scale_factor()),
        );

        #[cfg(feature = "integration-tests")]
        capture.copy(&mut encoder);

        self.ctx
            .queue
            .submit(gui_commands.into_iter().chain(iter::once(encoder.finish())));

        #[cfg(feature = "integration-tests")]
        {
            let Some(mut img) = async_runtime.block_on(capture.read(&self.ctx.device)) else {
                panic!("The rendered frame could not be read back")
            };
            let state = &mut self.state;
            let mut all_passed = true;
            for flow in graphics_flows.iter() {
                match flow.render_to_texture(&self.ctx, state, &mut img) {
                    Err(e) => panic!("{}", e),
                    Ok(ImageTestResult::Failed) => panic!("Assertion failed"),
                    Ok(ImageTestResult::Waiting) => all_passed = false,
                    Ok(ImageTestResult::Passed) => {}
                }
            }
            if all_passed && event_loop.send_event(FlowEvent::Exit).is_err() {
                panic!("All assertions passed but the event loop could not exit");
            }
        }

        output.present();
        Ok(outs)
    }
}

/// Offscreen target of one golden image frame. Rows of the readback buffer have to be a
/// multiple of 256 bytes, so both sides are padded to multiples of 256 pixels.
#[cfg(feature = "integration-tests")]
struct FrameCapture {
    color: wgpu::Texture,
    depth: wgpu::Texture,
    buffer: wgpu::Buffer,
    extent: wgpu::Extent3d,
}

#[cfg(feature = "integration-tests")]
impl FrameCapture {
    const BYTES_PER_PIXEL: u32 = 4;

    fn new(ctx: &Context) -> Self {
        let pad = |side: u32| side.div_ceil(256).max(1) * 256;
        let extent = wgpu::Extent3d {
            width: pad(ctx.config.width),
            height: pad(ctx.config.height),
            depth_or_array_layers: 1,
        };
        let target = |label, format| {
            ctx.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: extent,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
        };
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("golden image readback"),
            size: (Self::BYTES_PER_PIXEL * extent.width * extent.height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        Self {
            color: target("golden image colour", ctx.config.format),
            depth: target(
                "golden image depth",
                crate::data_structures::texture::Texture::DEPTH_FORMAT,
            ),
            buffer,
            extent,
        }
    }

    fn views(&self) -> (wgpu::TextureView, wgpu::TextureView) {
        let desc = wgpu::TextureViewDescriptor::default();
        (self.color.create_view(&desc), self.depth.create_view(&desc))
    }

    fn copy(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &self.color,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(Self::BYTES_PER_PIXEL * self.extent.width),
                    rows_per_image: Some(self.extent.height),
                },
            },
            self.extent,
        );
    }

    async fn read(
        &self,
        device: &wgpu::Device,
    ) -> Option<image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView<'_>>> {
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let slice = self.buffer.slice(..);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        let _ = device.poll(wgpu::Maintain::Wait);
        rx.receive().await.and_then(Result::ok)?;
        image::ImageBuffer::from_raw(self.extent.width, self.extent.height, slice.get_mapped_range())
    }
}

pub struct App<State: 'static, Event: 'static> {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<FlowEvent<State, Event>>,
    state: Option<AppState<State>>,
    graphics_flows: Vec<Box<dyn GraphicsFlow<State, Event>>>,
    // taken on the first `resumed`
    constructors: Option<Vec<FlowConsturctor<State, Event>>>,
    last_time: Instant,
    time_since_tick: Duration,
}

impl<State, Event> App<State, Event>
where
    State: 'static + Default,
    Event: 'static,
{
    fn new(
        event_loop: &EventLoop<FlowEvent<State, Event>>,
        constructors: Vec<FlowConsturctor<State, Event>>,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            last_time: Instant::now(),
            time_since_tick: Duration::from_millis(0),
        })
    }

    fn dispatch(&mut self, outs: Vec<Out<State, Event>>) {
        if let Some(state) = &mut self.state {
            for out in outs {
                handle_flow_output(
                    #[cfg(not(target_arch = "wasm32"))]
                    &self.async_runtime,
                    &mut state.state,
                    &mut state.ctx,
                    self.proxy.clone(),
                    out,
                );
            }
        }
    }

    fn init_flows(&mut self) {
        let Some(app_state) = &mut self.state else {
            return;
        };
        let outs: Vec<_> = self
            .graphics_flows
            .iter_mut()
            .map(|flow| flow.on_init(&mut app_state.ctx, &mut app_state.state))
            .collect();
        self.dispatch(outs);
    }

    /// tick → update → camera, then render.
    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let dt = self.last_time.elapsed();
        self.last_time = Instant::now();
        self.time_since_tick += dt;

        let Some(state) = &mut self.state else {
            return;
        };
        let mut outs = Vec::new();
        if self.time_since_tick >= Duration::from_millis(state.ctx.tick_duration_millis) {
            outs.extend(
                self.graphics_flows
                    .iter_mut()
                    .map(|f| f.on_tick(&state.ctx, &mut state.state)),
            );
            self.time_since_tick = Duration::from_millis(0);
        }
        outs.extend(
            self.graphics_flows
                .iter_mut()
                .map(|f| f.on_update(&state.ctx, &mut state.state, dt)),
        );
        self.dispatch(outs);

        let Some(state) = &mut self.state else {
            return;
        };
        state.ctx.update_camera();
        match state.render(
            &mut self.graphics_flows,
            #[cfg(feature = "integration-tests")]
            &self.async_runtime,
            #[cfg(feature = "integration-tests")]
            &self.proxy,
        ) {
            Ok(outs) => self.dispatch(outs),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of GPU memory, exiting");
                event_loop.exit();
            }
            Err(e) => {
                log::error!("Unable to render {}", e);
            }
        }
    }
}

pub(crate) enum FlowEvent<State: 'static, Event: 'static> {
    /// The web builds its context asynchronously and hands it over with this.
    #[cfg(target_arch = "wasm32")]
    Initialized {
        state: AppState<State>,
        flows: Vec<Box<dyn GraphicsFlow<State, Event>>>,
    },
    /// Resolved state mutations, natively these apply without the event loop.
    #[cfg(target_arch = "wasm32")]
    Mut(Box<dyn FnOnce(&mut State)>),
    Custom(Event),
    /// Every image assertion passed.
    #[cfg(feature = "integration-tests")]
    Exit,
    /// Uninhabited; keeps `State` used where the variants above are compiled out.
    #[cfg(not(target_arch = "wasm32"))]
    #[allow(dead_code)]
    _Marker(std::convert::Infallible, std::marker::PhantomData<State>),
}

impl<State, Event> Debug for FlowEvent<State, Event> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(target_arch = "wasm32")]
            Self::Initialized { state: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
            #[cfg(target_arch = "wasm32")]
            Self::Mut(_) => f.write_str("Mut(|&mut State| -> {...})"),
            Self::Custom(_) => f.write_str("Custom(E)"),
            #[cfg(feature = "integration-tests")]
            Self::Exit => f.write_str("Exit"),
            #[cfg(not(target_arch = "wasm32"))]
            Self::_Marker(never, _) => match *never {},
        }
    }
}

#[cfg(target_arch = "wasm32")]
const CANVAS_SELECTOR: &str = "canvas.webgl";

impl<State: 'static + Default, Event: 'static> ApplicationHandler<FlowEvent<State, Event>>
    for App<State, Event>
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(constructors) = self.constructors.take() else {
            // resumed again (e.g. after a suspend on mobile); everything already exists
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("flow-lessons");

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.query_selector(CANVAS_SELECTOR).ok().flatten());
            match canvas {
                Some(canvas) => {
                    window_attributes = window_attributes.with_canvas(Some(canvas.unchecked_into()))
                }
                None => log::error!("no <{CANVAS_SELECTOR}> element on the page"),
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Could not create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        let init_future = async move {
            let app_state = AppState::new(window).await?;

            let flow_futures: Vec<_> = constructors
                .into_iter()
                // `InitContext` only clones handles
                .map(|constructor| constructor((&app_state.ctx).into()))
                .collect();
            let flows: Vec<_> = futures::future::join_all(flow_futures).await;
            anyhow::Ok((app_state, flows))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok((mut app_state, flows)) => {
                    let size = app_state.ctx.window.inner_size();
                    app_state.resize(size.width, size.height);
                    self.graphics_flows = flows;
                    self.state = Some(app_state);
                    self.init_flows();
                }
                Err(e) => {
                    log::error!("App initialization failed. Cannot create the main context: {e}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match init_future.await {
                    Ok((app_state, flows)) => {
                        let sent = proxy.send_event(FlowEvent::Initialized {
                            state: app_state,
                            flows,
                        });
                        if sent.is_err() {
                            log::error!("The event loop closed during initialization");
                        }
                    }
                    Err(e) => {
                        log::error!("App initialization failed. Cannot create the main context: {e}")
                    }
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent<State, Event>) {
        #[cfg(not(feature = "integration-tests"))]
        let _ = event_loop;
        match event {
            #[cfg(target_arch = "wasm32")]
            FlowEvent::Initialized { state, flows } => {
                // sent by the wasm initialisation in `resumed`
                self.graphics_flows = flows;
                let app_state = self.state.insert(state);

                let size = app_state.ctx.window.inner_size();
                app_state.resize(size.width, size.height);
                self.init_flows();
                if let Some(app_state) = &self.state {
                    app_state.ctx.window.request_redraw();
                }
            }
            FlowEvent::Custom(custom_event) => {
                if let Some(state) = &mut self.state {
                    let result = self
                        .graphics_flows
                        .iter_mut()
                        .try_fold(custom_event, |event, flow| {
                            flow.on_custom_events(&state.ctx, &mut state.state, event)
                        });
                    if result.is_some() {
                        log::warn!("custom event was not consumed by any flow");
                    }
                }
            }
            #[cfg(target_arch = "wasm32")]
            FlowEvent::Mut(fn_once) => {
                if let Some(state) = &mut self.state {
                    fn_once(&mut state.state);
                }
            }
            #[cfg(feature = "integration-tests")]
            FlowEvent::Exit => {
                event_loop.exit();
            }
            #[cfg(not(target_arch = "wasm32"))]
            FlowEvent::_Marker(never, _) => match never {},
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };
        let outs: Vec<_> = self
            .graphics_flows
            .iter_mut()
            .map(|f| f.on_device_events(&state.ctx, &mut state.state, &event))
            .collect();
        self.dispatch(outs);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };

        let consumed = state.gui.on_window_event(&state.ctx.window, &event);
        let height = state.ctx.viewport_height();
        let controls = &mut state.ctx.camera.controls;
        if consumed {
            controls.release_drag(&event);
        } else {
            controls.handle_window_events(&event, height);
        }

        let outs: Vec<_> = self
            .graphics_flows
            .iter_mut()
            .map(|f| f.on_window_events(&state.ctx, &mut state.state, &event))
            .collect();
        self.dispatch(outs);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    state.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.frame(event_loop),
            _ => {}
        }
    }
}

/// Resolves the futures of `out`. Events go back through the event loop. State mutations
/// apply right away natively and once they arrive on the web.
fn handle_flow_output<State, Event>(
    #[cfg(not(target_arch = "wasm32"))] async_runtime: &tokio::runtime::Runtime,
    state: &mut State,
    ctx: &mut Context,
    proxy: EventLoopProxy<FlowEvent<State, Event>>,
    out: Out<State, Event>,
) {
    match out {
        Out::FutEvent(futures) => {
            let resolved = futures::future::join_all(futures.into_iter().map(Pin::from));
            #[cfg(not(target_arch = "wasm32"))]
            send_all(&proxy, async_runtime.block_on(resolved).into_iter().map(FlowEvent::Custom));
            #[cfg(target_arch = "wasm32")]
            wasm_bindgen_futures::spawn_local(async move {
                send_all(&proxy, resolved.await.into_iter().map(FlowEvent::Custom));
            });
        }
        Out::FutFn(futures) => {
            let mutations: Vec<Pin<Box<dyn Future<Output = Box<dyn FnOnce(&mut State)>>>>> =
                futures.into_iter().map(Pin::from).collect();
            let resolved = futures::future::join_all(mutations);
            #[cfg(not(target_arch = "wasm32"))]
            {
                let _ = &proxy;
                for mutation in async_runtime.block_on(resolved) {
                    mutation(state);
                }
            }
            #[cfg(target_arch = "wasm32")]
            {
                let _ = state;
                wasm_bindgen_futures::spawn_local(async move {
                    send_all(&proxy, resolved.await.into_iter().map(FlowEvent::Mut));
                });
            }
        }
        Out::Configure(f) => f(ctx),
        Out::Empty => (),
    }
}

fn send_all<State, Event>(
    proxy: &EventLoopProxy<FlowEvent<State, Event>>,
    events: impl IntoIterator<Item = FlowEvent<State, Event>>,
) {
    for event in events {
        if let Err(e) = proxy.send_event(event) {
            log::error!("Event loop was closed before all flow output landed: {e}");
            break;
        }
    }
}

pub fn run<State: 'static + Default, Event: 'static>(
    constructors: Vec<FlowConsturctor<State, Event>>,
) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            eprintln!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {e}").into());
        }
    }

    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop: EventLoop<FlowEvent<State, Event>> = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        winit::event_loop::EventLoop::with_user_event()
            .with_any_thread(true)
            .build()?
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop: EventLoop<FlowEvent<State, Event>> = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        winit::event_loop::EventLoop::with_user_event()
            .with_any_thread(true)
            .build()?
    };

    #[cfg(not(feature = "integration-tests"))]
    let event_loop: EventLoop<FlowEvent<State, Event>> = EventLoop::with_user_event().build()?;

    let mut app: App<State, Event> = App::new(&event_loop, constructors)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}
