use crate::{
    material::Blending,
    pipelines::{DepthSettings, Topology, mk_render_pipeline, particle_vertex_layouts, primitive},
};

/// Particles are instanced quads: six vertices from the vertex index, one instance per
/// particle.
pub fn mk_points_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    blending: Option<Blending>,
    depth_write: bool,
) -> wgpu::RenderPipeline {
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Points Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("points.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        "Points Pipeline",
        layout,
        Some(color_format),
        Some(blending.map_or(wgpu::BlendState::REPLACE, |b| b.state())),
        Some(DepthSettings::new(depth_write)),
        primitive(Topology::Triangles, None),
        &particle_vertex_layouts(),
        shader,
    )
}
