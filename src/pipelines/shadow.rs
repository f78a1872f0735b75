use crate::pipelines::{DepthSettings, Topology, mesh_vertex_layouts, mk_render_pipeline, primitive};

pub fn mk_shadow_pipeline(device: &wgpu::Device, layout: &wgpu::PipelineLayout) -> wgpu::RenderPipeline {
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Shadow Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shadow.wgsl").into()),
    };
    let depth = DepthSettings {
        bias: wgpu::DepthBiasState {
            constant: 2,
            slope_scale: 2.0,
            clamp: 0.0,
        },
        ..DepthSettings::new(true)
    };
    mk_render_pipeline(
        device,
        "Shadow Pipeline",
        layout,
        None,
        None,
        Some(depth),
        primitive(Topology::Triangles, None),
        &mesh_vertex_layouts(),
        shader,
    )
}
