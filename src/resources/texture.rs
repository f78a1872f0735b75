use std::sync::Arc;

use crate::data_structures::texture::{self, ColorSpace, Texture};

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

fn sampler_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Bindings of a mesh material, in the order the mesh shader declares them.
///
/// 0 uniform, 1 sampler, 2 map, 3 alpha, 4 ambient occlusion, 5 displacement,
/// 6 normal, 7 metalness, 8 roughness, 9 matcap, 10 gradient, 11 gradient sampler,
/// 12 environment cube, 13 environment sampler.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    use wgpu::{ShaderStages as S, TextureViewDimension as D};
    let both = S::VERTEX | S::FRAGMENT;
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            uniform_entry(0, both),
            sampler_entry(1, both),
            texture_entry(2, S::FRAGMENT, D::D2),
            texture_entry(3, S::FRAGMENT, D::D2),
            texture_entry(4, S::FRAGMENT, D::D2),
            texture_entry(5, both, D::D2),
            texture_entry(6, S::FRAGMENT, D::D2),
            texture_entry(7, S::FRAGMENT, D::D2),
            texture_entry(8, S::FRAGMENT, D::D2),
            texture_entry(9, S::FRAGMENT, D::D2),
            texture_entry(10, S::FRAGMENT, D::D2),
            sampler_entry(11, S::FRAGMENT),
            texture_entry(12, S::FRAGMENT, D::Cube),
            sampler_entry(13, S::FRAGMENT),
        ],
        label: Some("Material bind_group_layout"),
    })
}

/// 0 uniform, 1 sampler, 2 alpha map.
pub fn points_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    use wgpu::ShaderStages as S;
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            uniform_entry(0, S::VERTEX | S::FRAGMENT),
            sampler_entry(1, S::FRAGMENT),
            texture_entry(2, S::FRAGMENT, wgpu::TextureViewDimension::D2),
        ],
        label: Some("Points bind_group_layout"),
    })
}

/// 0 lights uniform, 1 shadow map array, 2 comparison sampler.
pub fn lights_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    use wgpu::ShaderStages as S;
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            uniform_entry(0, S::VERTEX | S::FRAGMENT),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: S::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2Array,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: S::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("Lights bind_group_layout"),
    })
}

pub fn uniform_layout(
    device: &wgpu::Device,
    visibility: wgpu::ShaderStages,
    label: &str,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[uniform_entry(0, visibility)],
        label: Some(label),
    })
}

/// Stand-ins bound in place of missing maps, so one pipeline serves every material.
#[derive(Debug)]
pub struct DefaultTextures {
    pub white: Arc<Texture>,
    pub normal: Arc<Texture>,
    pub cube: Arc<Texture>,
    pub sampler: wgpu::Sampler,
}

impl DefaultTextures {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> anyhow::Result<Self> {
        let white = Texture::solid(device, queue, [255; 4], ColorSpace::Srgb, "default white");
        let normal = Texture::create_default_normal_map(device, queue);
        let face = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            1,
            1,
            image::Rgba([255; 4]),
        ));
        let faces = [0; 6].map(|_| face.clone());
        let cube = Texture::cube_from_images(device, queue, &faces, "default cube")?;
        Ok(Self {
            white: Arc::new(white),
            normal: Arc::new(normal),
            cube: Arc::new(cube),
            sampler: texture::create_default_sampler(device),
        })
    }
}
