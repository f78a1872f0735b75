//! Render pipelines and the cache that builds them on demand.
//!
//! Three WGSL programs cover everything a scene draws: `mesh.wgsl` (all material kinds),
//! `points.wgsl` (particles) and `shadow.wgsl` (depth only). Fixed-function state that
//! materials can change (topology, culling, blending, depth writes) is part of the
//! [`PipelineKey`].

use std::collections::HashMap;

use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    geometry::ParticleRaw,
    material::{Blending, Side},
    resources::texture::{lights_layout, material_layout, points_layout, uniform_layout},
};

pub mod mesh;
pub mod points;
pub mod shadow;

/// Bind group layouts shared by every pipeline and every scene.
#[derive(Debug)]
pub struct Layouts {
    pub material: wgpu::BindGroupLayout,
    pub points: wgpu::BindGroupLayout,
    pub camera: wgpu::BindGroupLayout,
    pub lights: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            material: material_layout(device),
            points: points_layout(device),
            camera: uniform_layout(
                device,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                "camera_bind_group_layout",
            ),
            lights: lights_layout(device),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topology {
    Triangles,
    Lines,
}

impl From<Topology> for wgpu::PrimitiveTopology {
    fn from(topology: Topology) -> Self {
        match topology {
            Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
            Topology::Lines => wgpu::PrimitiveTopology::LineList,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineKey {
    Mesh {
        topology: Topology,
        side: Side,
        /// `None` draws opaque.
        blending: Option<Blending>,
        depth_write: bool,
    },
    Points {
        blending: Option<Blending>,
        depth_write: bool,
    },
    Shadow,
}

/// Depth attachment settings of a pipeline.
#[derive(Clone, Copy, Debug)]
pub struct DepthSettings {
    pub format: wgpu::TextureFormat,
    pub write: bool,
    pub bias: wgpu::DepthBiasState,
}

impl DepthSettings {
    pub fn new(write: bool) -> Self {
        Self {
            format: Texture::DEPTH_FORMAT,
            write,
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

/// Builds a pipeline from `vs_main` and, when a colour target is given, `fs_main`.
#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    color_format: Option<wgpu::TextureFormat>,
    blend: Option<wgpu::BlendState>,
    depth: Option<DepthSettings>,
    primitive: wgpu::PrimitiveState,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);
    let targets = [color_format.map(|format| wgpu::ColorTargetState {
        format,
        blend,
        write_mask: wgpu::ColorWrites::ALL,
    })];

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: color_format.map(|_| wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &targets,
            compilation_options: Default::default(),
        }),
        primitive,
        depth_stencil: depth.map(|depth| wgpu::DepthStencilState {
            format: depth.format,
            depth_write_enabled: depth.write,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: depth.bias,
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

pub(crate) fn primitive(topology: Topology, cull_mode: Option<wgpu::Face>) -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: topology.into(),
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

/// Pipelines by key, created the first time a frame needs them.
#[derive(Debug)]
pub struct PipelineCache {
    color_format: wgpu::TextureFormat,
    mesh_layout: wgpu::PipelineLayout,
    points_layout: wgpu::PipelineLayout,
    shadow_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl PipelineCache {
    pub fn new(device: &wgpu::Device, layouts: &Layouts, color_format: wgpu::TextureFormat) -> Self {
        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&layouts.material, &layouts.camera, &layouts.lights],
            push_constant_ranges: &[],
        });
        let points_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Points Pipeline Layout"),
            bind_group_layouts: &[&layouts.points, &layouts.camera],
            push_constant_ranges: &[],
        });
        let shadow_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow Pipeline Layout"),
            bind_group_layouts: &[&layouts.camera],
            push_constant_ranges: &[],
        });
        Self {
            color_format,
            mesh_layout,
            points_layout,
            shadow_layout,
            pipelines: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Must be called for every key before the render pass that uses it begins.
    pub fn prepare(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        log::debug!("creating pipeline {key:?}");
        let pipeline = match key {
            PipelineKey::Mesh {
                topology,
                side,
                blending,
                depth_write,
            } => mesh::mk_mesh_pipeline(
                device,
                &self.mesh_layout,
                self.color_format,
                topology,
                side,
                blending,
                depth_write,
            ),
            PipelineKey::Points {
                blending,
                depth_write,
            } => points::mk_points_pipeline(
                device,
                &self.points_layout,
                self.color_format,
                blending,
                depth_write,
            ),
            PipelineKey::Shadow => shadow::mk_shadow_pipeline(device, &self.shadow_layout),
        };
        self.pipelines.insert(key, pipeline);
    }

    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }
}

pub(crate) fn mesh_vertex_layouts() -> [wgpu::VertexBufferLayout<'static>; 2] {
    [ModelVertex::desc(), InstanceRaw::desc()]
}

pub(crate) fn particle_vertex_layouts() -> [wgpu::VertexBufferLayout<'static>; 1] {
    [ParticleRaw::desc()]
}
