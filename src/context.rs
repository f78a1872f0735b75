use std::sync::Arc;

use anyhow::anyhow;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{self, CameraResources, CameraUniform, OrbitControls, Projection},
    color::Color,
    data_structures::texture,
    pipelines::Layouts,
    render::{self, SceneRenderer, ShadowSettings},
    resources::texture::DefaultTextures,
};

/// Window size in logical pixels plus the pixel ratio the drawing buffer is rendered at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sizes {
    pub width: f32,
    pub height: f32,
    pub pixel_ratio: f32,
}

impl Sizes {
    /// Pixel ratios above 2 are capped.
    pub const MAX_PIXEL_RATIO: f32 = 2.0;

    pub fn from_physical(width: u32, height: u32, scale_factor: f64) -> Self {
        let scale = scale_factor.max(f64::EPSILON) as f32;
        Self {
            width: width as f32 / scale,
            height: height as f32 / scale,
            pixel_ratio: scale.min(Self::MAX_PIXEL_RATIO),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height.max(1.0)
    }

    /// Size of the surface in physical pixels, never zero.
    pub fn drawing_buffer(&self) -> [u32; 2] {
        [
            ((self.width * self.pixel_ratio).round() as u32).max(1),
            ((self.height * self.pixel_ratio).round() as u32).max(1),
        ]
    }

    /// Drawing buffer pixels per physical window pixel, below one once the ratio is capped.
    pub fn buffer_scale(&self, scale_factor: f64) -> f32 {
        self.pixel_ratio / scale_factor.max(f64::EPSILON) as f32
    }
}

/// Sizes the surface after the drawing buffer rather than the physical window.
fn fit_surface(config: &mut wgpu::SurfaceConfiguration, sizes: &Sizes) -> [u32; 2] {
    let [width, height] = sizes.drawing_buffer();
    config.width = width;
    config.height = height;
    [width, height]
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub sizes: Sizes,
    pub clear_colour: wgpu::Color,
    pub shadows: ShadowSettings,
    pub tick_duration_millis: u64,
    pub(crate) renderer: SceneRenderer,
    pub(crate) layouts: Arc<Layouts>,
    pub(crate) defaults: Arc<DefaultTextures>,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("no graphics adapter is compatible with the window"))?;
        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    // WebGL doesn't support all of wgpu's features, so if
                    // we're building for the web we'll have to disable some.
                    required_limits: if cfg!(target_arch = "wasm32") {
                        wgpu::Limits::downlevel_webgl2_defaults()
                    } else {
                        wgpu::Limits::default()
                    },
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let surface_caps = surface.get_capabilities(&adapter);
        // Colours are converted to linear before shading, so the surface has to encode
        // back to sRGB.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("the surface reports no texture formats"))?;
        let sizes = Sizes::from_physical(size.width, size.height, window.scale_factor());
        let mut config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: 1,
            height: 1,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        fit_surface(&mut config, &sizes);

        let camera = camera::Camera::new((0.0, 0.0, 3.0));
        let projection =
            Projection::new(config.width, config.height, cgmath::Deg(75.0), 0.1, 100.0);

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(
            &camera,
            &projection,
            [config.width, config.height],
            sizes.pixel_ratio,
        );

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let layouts = Arc::new(Layouts::new(&device));
        let bind_group_layout = layouts.camera.clone();

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.camera,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let camera = CameraResources {
            camera,
            controls: OrbitControls::new(),
            uniform: camera_uniform,
            buffer: camera_buffer,
            bind_group: camera_bind_group,
            bind_group_layout,
        };

        let depth_texture = render::depth_texture(&device, &config);
        let defaults = Arc::new(DefaultTextures::new(&device, &queue)?);
        let renderer = SceneRenderer::new(&device, &layouts, config.format);

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            sizes,
            clear_colour: Color::BLACK.to_wgpu(),
            shadows: ShadowSettings::default(),
            tick_duration_millis: 500,
            renderer,
            layouts,
            defaults,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }

    /// Asks the window for a fixed inner size in logical pixels. Platforms that resize
    /// right away are applied here, the others send a regular resize event.
    pub fn set_window_size(&mut self, width: u32, height: u32) {
        let requested = winit::dpi::LogicalSize::new(width, height);
        if let Some(size) = self.window.request_inner_size(requested) {
            self.resize(size.width, size.height);
        }
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_colour = color.to_wgpu();
    }

    /// Resizes surface, depth buffer and projection to the drawing buffer of the new
    /// physical window size.
    /// Zero sized windows are ignored.
    pub(crate) fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.sizes = Sizes::from_physical(width, height, self.window.scale_factor());
        let [width, height] = fit_surface(&mut self.config, &self.sizes);
        log::debug!("drawing buffer {width}x{height} at ratio {}", self.sizes.pixel_ratio);
        self.projection.resize(width, height);
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = render::depth_texture(&self.device, &self.config);
        true
    }

    /// Height of the window in physical pixels, the space pointer events arrive in.
    pub(crate) fn viewport_height(&self) -> f32 {
        self.window.inner_size().height as f32
    }

    /// Applies orbit controls and uploads the camera uniform.
    pub(crate) fn update_camera(&mut self) {
        let height = self.viewport_height();
        let camera = &mut self.camera;
        camera
            .controls
            .update(&mut camera.camera, &self.projection, height);
        camera.uniform.update_view_proj(
            &camera.camera,
            &self.projection,
            [self.config.width, self.config.height],
            self.sizes.pixel_ratio,
        );
        self.queue
            .write_buffer(&camera.buffer, 0, bytemuck::cast_slice(&[camera.uniform]));
    }
}

/// What a lesson constructor gets while the window is coming up: everything needed to
/// load assets and build scenes, without the surface.
#[derive(Clone, Debug)]
pub struct InitContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub layouts: Arc<Layouts>,
    pub defaults: Arc<DefaultTextures>,
    pub format: wgpu::TextureFormat,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            layouts: ctx.layouts.clone(),
            defaults: ctx.defaults.clone(),
            format: ctx.config.format,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn pixel_ratio_is_capped_at_two() {
        let sizes = Sizes::from_physical(2400, 1800, 3.0);
        assert_relative_eq!(sizes.width, 800.0);
        assert_relative_eq!(sizes.height, 600.0);
        assert_relative_eq!(sizes.pixel_ratio, 2.0);
        assert_eq!(sizes.drawing_buffer(), [1600, 1200]);
    }

    #[test]
    fn aspect_follows_the_window() {
        let sizes = Sizes::from_physical(800, 600, 1.0);
        assert_relative_eq!(sizes.aspect(), 800.0 / 600.0);
        let tall = Sizes::from_physical(600, 1200, 1.0);
        assert_relative_eq!(tall.aspect(), 0.5);
    }

    fn surface_config(width: u32, height: u32) -> wgpu::SurfaceConfiguration {
        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: wgpu::TextureFormat::Bgra8UnormSrgb,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    #[test]
    fn surface_is_sized_after_the_capped_drawing_buffer() {
        let mut config = surface_config(3000, 1500);
        let sizes = Sizes::from_physical(3000, 1500, 3.0);
        assert_eq!(fit_surface(&mut config, &sizes), [2000, 1000]);
        assert_eq!([config.width, config.height], [2000, 1000]);
        assert_relative_eq!(sizes.buffer_scale(3.0), 2.0 / 3.0);

        let sizes = Sizes::from_physical(1600, 1200, 2.0);
        assert_eq!(fit_surface(&mut config, &sizes), [1600, 1200]);
        assert_relative_eq!(sizes.buffer_scale(2.0), 1.0);
    }

    #[test]
    fn drawing_buffer_is_never_empty() {
        let sizes = Sizes::from_physical(0, 0, 1.0);
        assert_eq!(sizes.drawing_buffer(), [1, 1]);
        assert_relative_eq!(sizes.aspect(), 0.0);
    }
}
