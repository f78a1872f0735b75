//! Surface materials for meshes and points.
//!
//! One shader serves every [`MaterialKind`]; a material is packed into a
//! [`MaterialUniform`] plus a bind group of maps. Unset maps are bound to neutral
//! stand-ins from [`DefaultTextures`].

use std::sync::Arc;

use bitflags::bitflags;
use cgmath::Matrix4;

use crate::{
    color::Color,
    data_structures::texture::Texture,
    resources::texture::DefaultTextures,
};

#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    /// Unlit.
    #[default]
    Basic = 0,
    Normal = 1,
    Matcap = 2,
    Depth = 3,
    Lambert = 4,
    Phong = 5,
    Toon = 6,
    Standard = 7,
}

impl MaterialKind {
    pub const ALL: [MaterialKind; 8] = [
        MaterialKind::Basic,
        MaterialKind::Normal,
        MaterialKind::Matcap,
        MaterialKind::Depth,
        MaterialKind::Lambert,
        MaterialKind::Phong,
        MaterialKind::Toon,
        MaterialKind::Standard,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MaterialKind::Basic => "MeshBasicMaterial",
            MaterialKind::Normal => "MeshNormalMaterial",
            MaterialKind::Matcap => "MeshMatcapMaterial",
            MaterialKind::Depth => "MeshDepthMaterial",
            MaterialKind::Lambert => "MeshLambertMaterial",
            MaterialKind::Phong => "MeshPhongMaterial",
            MaterialKind::Toon => "MeshToonMaterial",
            MaterialKind::Standard => "MeshStandardMaterial",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Blending {
    #[default]
    Normal,
    Additive,
}

impl Blending {
    pub fn state(&self) -> wgpu::BlendState {
        match self {
            Blending::Normal => wgpu::BlendState::ALPHA_BLENDING,
            Blending::Additive => wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            },
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MaterialFlags: u32 {
        const MAP = 1 << 0;
        const ALPHA_MAP = 1 << 1;
        const AO_MAP = 1 << 2;
        const DISPLACEMENT_MAP = 1 << 3;
        const NORMAL_MAP = 1 << 4;
        const METALNESS_MAP = 1 << 5;
        const ROUGHNESS_MAP = 1 << 6;
        const MATCAP = 1 << 7;
        const GRADIENT_MAP = 1 << 8;
        const ENV_MAP = 1 << 9;
        const FLAT_SHADING = 1 << 10;
        const TRANSPARENT = 1 << 11;
        const DOUBLE_SIDED = 1 << 12;
        const BACK_SIDE = 1 << 13;
    }
}

#[derive(Clone, Debug, Default)]
pub struct MaterialMaps {
    pub map: Option<Arc<Texture>>,
    pub alpha_map: Option<Arc<Texture>>,
    pub ao_map: Option<Arc<Texture>>,
    pub displacement_map: Option<Arc<Texture>>,
    pub normal_map: Option<Arc<Texture>>,
    pub metalness_map: Option<Arc<Texture>>,
    pub roughness_map: Option<Arc<Texture>>,
    pub matcap: Option<Arc<Texture>>,
    pub gradient_map: Option<Arc<Texture>>,
    /// Cube texture.
    pub env_map: Option<Arc<Texture>>,
}

impl MaterialMaps {
    fn flags(&self) -> MaterialFlags {
        let mut flags = MaterialFlags::empty();
        flags.set(MaterialFlags::MAP, self.map.is_some());
        flags.set(MaterialFlags::ALPHA_MAP, self.alpha_map.is_some());
        flags.set(MaterialFlags::AO_MAP, self.ao_map.is_some());
        flags.set(MaterialFlags::DISPLACEMENT_MAP, self.displacement_map.is_some());
        flags.set(MaterialFlags::NORMAL_MAP, self.normal_map.is_some());
        flags.set(MaterialFlags::METALNESS_MAP, self.metalness_map.is_some());
        flags.set(MaterialFlags::ROUGHNESS_MAP, self.roughness_map.is_some());
        flags.set(MaterialFlags::MATCAP, self.matcap.is_some());
        flags.set(MaterialFlags::GRADIENT_MAP, self.gradient_map.is_some());
        flags.set(MaterialFlags::ENV_MAP, self.env_map.is_some());
        flags
    }

    /// The colour map decides the uv repeat; without one the first bound map does.
    fn repeat(&self) -> [f32; 2] {
        [
            &self.map,
            &self.alpha_map,
            &self.ao_map,
            &self.displacement_map,
            &self.normal_map,
            &self.metalness_map,
            &self.roughness_map,
        ]
        .into_iter()
        .flatten()
        .map(|t| t.repeat)
        .next()
        .unwrap_or([1.0, 1.0])
    }
}

#[derive(Clone, Debug)]
pub struct Material {
    pub kind: MaterialKind,
    pub color: Color,
    pub opacity: f32,
    pub transparent: bool,
    pub wireframe: bool,
    pub side: Side,
    pub flat_shading: bool,
    pub depth_write: bool,
    pub blending: Blending,
    pub shininess: f32,
    pub specular: Color,
    pub metalness: f32,
    pub roughness: f32,
    pub ao_map_intensity: f32,
    pub displacement_scale: f32,
    pub normal_scale: [f32; 2],
    pub env_map_intensity: f32,
    pub maps: MaterialMaps,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            kind: MaterialKind::Basic,
            color: Color::WHITE,
            opacity: 1.0,
            transparent: false,
            wireframe: false,
            side: Side::Front,
            flat_shading: false,
            depth_write: true,
            blending: Blending::Normal,
            shininess: 30.0,
            specular: Color::from_hex(0x111111),
            metalness: 0.0,
            roughness: 1.0,
            ao_map_intensity: 1.0,
            displacement_scale: 1.0,
            normal_scale: [1.0, 1.0],
            env_map_intensity: 1.0,
            maps: MaterialMaps::default(),
        }
    }
}

impl Material {
    pub fn new(kind: MaterialKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn basic<C: Into<Color>>(color: C) -> Self {
        Self::new(MaterialKind::Basic).with_color(color)
    }

    pub fn normal() -> Self {
        Self::new(MaterialKind::Normal)
    }

    pub fn matcap(matcap: Arc<Texture>) -> Self {
        let mut material = Self::new(MaterialKind::Matcap);
        material.maps.matcap = Some(matcap);
        material
    }

    pub fn depth() -> Self {
        Self::new(MaterialKind::Depth)
    }

    pub fn lambert() -> Self {
        Self::new(MaterialKind::Lambert)
    }

    pub fn phong() -> Self {
        Self::new(MaterialKind::Phong)
    }

    pub fn toon() -> Self {
        Self::new(MaterialKind::Toon)
    }

    pub fn standard() -> Self {
        Self::new(MaterialKind::Standard)
    }

    pub fn with_color<C: Into<Color>>(mut self, color: C) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness;
        self
    }

    pub fn with_maps(mut self, maps: MaterialMaps) -> Self {
        self.maps = maps;
        self
    }

    /// Blended, drawn after the opaque pass.
    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    pub fn flags(&self) -> MaterialFlags {
        let mut flags = self.maps.flags();
        flags.set(MaterialFlags::FLAT_SHADING, self.flat_shading);
        flags.set(MaterialFlags::TRANSPARENT, self.transparent);
        flags.set(MaterialFlags::DOUBLE_SIDED, self.side == Side::Double);
        flags.set(MaterialFlags::BACK_SIDE, self.side == Side::Back);
        flags
    }

    pub fn uniform(&self) -> MaterialUniform {
        let [r, g, b] = self.color.to_linear();
        let [sr, sg, sb] = self.specular.to_linear();
        let [rx, ry] = self.maps.repeat();
        MaterialUniform {
            color: [r, g, b, if self.transparent { self.opacity } else { 1.0 }],
            specular: [sr, sg, sb, self.shininess],
            pbr: [
                self.metalness,
                self.roughness,
                self.ao_map_intensity,
                self.displacement_scale,
            ],
            extra: [
                self.normal_scale[0],
                self.normal_scale[1],
                self.env_map_intensity,
                0.0,
            ],
            uv_transform: [rx, ry, 0.0, 0.0],
            kind: self.kind as u32,
            flags: self.flags().bits(),
            _padding: [0; 2],
        }
    }

    /// Bind group for group 0 of the mesh pipeline.
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        defaults: &DefaultTextures,
    ) -> wgpu::BindGroup {
        let maps = &self.maps;
        let gradient_sampler = maps
            .gradient_map
            .as_ref()
            .and_then(|t| t.sampler.as_ref())
            .unwrap_or(&defaults.sampler);
        // the colour map's sampler drives every 2D map so repeat wrapping applies to all
        let sampler = [&maps.map, &maps.ao_map, &maps.normal_map, &maps.roughness_map]
            .into_iter()
            .flatten()
            .find_map(|t| t.sampler.as_ref())
            .unwrap_or(&defaults.sampler);
        let env_sampler = maps
            .env_map
            .as_ref()
            .and_then(|t| t.sampler.as_ref())
            .unwrap_or(&defaults.sampler);
        let views = [
            view(&maps.map, &defaults.white),
            view(&maps.alpha_map, &defaults.white),
            view(&maps.ao_map, &defaults.white),
            view(&maps.displacement_map, &defaults.white),
            view(&maps.normal_map, &defaults.normal),
            view(&maps.metalness_map, &defaults.white),
            view(&maps.roughness_map, &defaults.white),
            view(&maps.matcap, &defaults.white),
            view(&maps.gradient_map, &defaults.white),
        ];
        let env_view = view(&maps.env_map, &defaults.cube);

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ];
        entries.extend(views.iter().enumerate().map(|(i, view)| wgpu::BindGroupEntry {
            binding: 2 + i as u32,
            resource: wgpu::BindingResource::TextureView(*view),
        }));
        entries.extend([
            wgpu::BindGroupEntry {
                binding: 11,
                resource: wgpu::BindingResource::Sampler(gradient_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 12,
                resource: wgpu::BindingResource::TextureView(env_view),
            },
            wgpu::BindGroupEntry {
                binding: 13,
                resource: wgpu::BindingResource::Sampler(env_sampler),
            },
        ]);
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &entries,
            label: Some("material_bind_group"),
        })
    }
}

fn view<'a>(map: &'a Option<Arc<Texture>>, fallback: &'a Arc<Texture>) -> &'a wgpu::TextureView {
    &map.as_ref().unwrap_or(fallback).view
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    /// linear rgb, opacity
    pub color: [f32; 4],
    /// linear rgb, shininess
    pub specular: [f32; 4],
    /// metalness, roughness, ao intensity, displacement scale
    pub pbr: [f32; 4],
    /// normal scale xy, env map intensity
    pub extra: [f32; 4],
    /// repeat xy, offset xy
    pub uv_transform: [f32; 4],
    pub kind: u32,
    pub flags: u32,
    _padding: [u32; 2],
}

/// Material of a particle cloud.
#[derive(Clone, Debug)]
pub struct PointsMaterial {
    /// World units with attenuation, pixels without.
    pub size: f32,
    pub size_attenuation: bool,
    pub color: Color,
    pub transparent: bool,
    pub opacity: f32,
    pub alpha_map: Option<Arc<Texture>>,
    pub depth_write: bool,
    pub blending: Blending,
    pub vertex_colors: bool,
}

impl Default for PointsMaterial {
    fn default() -> Self {
        Self {
            size: 1.0,
            size_attenuation: true,
            color: Color::WHITE,
            transparent: false,
            opacity: 1.0,
            alpha_map: None,
            depth_write: true,
            blending: Blending::Normal,
            vertex_colors: false,
        }
    }
}

impl PointsMaterial {
    pub fn uniform(&self, model: Matrix4<f32>) -> PointsUniform {
        let [r, g, b] = self.color.to_linear();
        PointsUniform {
            color: [r, g, b, if self.transparent { self.opacity } else { 1.0 }],
            params: [
                self.size,
                if self.size_attenuation { 1.0 } else { 0.0 },
                if self.vertex_colors { 1.0 } else { 0.0 },
                if self.alpha_map.is_some() { 1.0 } else { 0.0 },
            ],
            model: model.into(),
        }
    }

    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        defaults: &DefaultTextures,
    ) -> wgpu::BindGroup {
        let alpha = self.alpha_map.as_ref().unwrap_or(&defaults.white);
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(
                        alpha.sampler.as_ref().unwrap_or(&defaults.sampler),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&alpha.view),
                },
            ],
            label: Some("points_bind_group"),
        })
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointsUniform {
    pub color: [f32; 4],
    /// size, size attenuation, vertex colours, alpha map
    pub params: [f32; 4],
    pub model: [[f32; 4]; 4],
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn uniforms_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<MaterialUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<PointsUniform>() % 16, 0);
    }

    #[test]
    fn standard_and_phong_defaults() {
        let m = Material::standard();
        assert_eq!(m.metalness, 0.0);
        assert_eq!(m.roughness, 1.0);
        assert_eq!(m.ao_map_intensity, 1.0);
        assert_eq!(m.displacement_scale, 1.0);
        assert_eq!(Material::phong().shininess, 30.0);
    }

    #[test]
    fn opacity_needs_transparency() {
        let mut m = Material::basic(0xff0000);
        m.opacity = 0.5;
        assert_eq!(m.uniform().color[3], 1.0);
        m.transparent = true;
        assert_eq!(m.uniform().color[3], 0.5);
        assert_relative_eq!(m.uniform().color[0], 1.0);
        assert!(m.flags().contains(MaterialFlags::TRANSPARENT));
    }

    #[test]
    fn flags_track_side_and_shading() {
        let mut m = Material::normal();
        m.flat_shading = true;
        m.side = Side::Double;
        let flags = m.flags();
        assert!(flags.contains(MaterialFlags::FLAT_SHADING | MaterialFlags::DOUBLE_SIDED));
        assert!(!flags.intersects(MaterialFlags::MAP | MaterialFlags::BACK_SIDE));
        assert_eq!(m.uniform().kind, 1);
    }

    #[test]
    fn points_uniform_packs_switches() {
        let m = PointsMaterial {
            size: 0.05,
            vertex_colors: true,
            ..Default::default()
        };
        let u = m.uniform(Matrix4::from_scale(1.0));
        assert_eq!(u.params, [0.05, 1.0, 1.0, 0.0]);
        assert_eq!(u.model[3][3], 1.0);
    }

    #[test]
    fn kinds_are_listed_in_shader_order() {
        for (i, kind) in MaterialKind::ALL.iter().enumerate() {
            assert_eq!(*kind as u32, i as u32);
        }
    }
}
