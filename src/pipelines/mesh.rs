use crate::{
    material::{Blending, Side},
    pipelines::{DepthSettings, Topology, mesh_vertex_layouts, mk_render_pipeline, primitive},
};

pub fn mk_mesh_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    topology: Topology,
    side: Side,
    blending: Option<Blending>,
    depth_write: bool,
) -> wgpu::RenderPipeline {
    let cull_mode = match (topology, side) {
        (Topology::Lines, _) | (_, Side::Double) => None,
        (_, Side::Front) => Some(wgpu::Face::Back),
        (_, Side::Back) => Some(wgpu::Face::Front),
    };
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Mesh Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("mesh.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        "Mesh Pipeline",
        layout,
        Some(color_format),
        Some(blending.map_or(wgpu::BlendState::REPLACE, |b| b.state())),
        Some(DepthSettings::new(depth_write)),
        primitive(topology, cull_mode),
        &mesh_vertex_layouts(),
        shader,
    )
}
