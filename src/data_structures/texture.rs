//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU texture resources, and
//! helpers for depth and shadow targets, solid placeholder textures, images and
//! cube maps.

use anyhow::*;
use image::{GenericImageView, ImageFormat, load_from_memory_with_format};

/// How texel values are interpreted when sampled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorSpace {
    /// Colour maps, matcaps, gradients and environment maps.
    #[default]
    Srgb,
    /// Data maps: normal, ambient occlusion, height, metalness, roughness, alpha.
    Linear,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    Linear,
    Nearest,
}

impl From<Filter> for wgpu::FilterMode {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Linear => wgpu::FilterMode::Linear,
            Filter::Nearest => wgpu::FilterMode::Nearest,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Wrap {
    #[default]
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

impl From<Wrap> for wgpu::AddressMode {
    fn from(wrap: Wrap) -> Self {
        match wrap {
            Wrap::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            Wrap::Repeat => wgpu::AddressMode::Repeat,
            Wrap::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

/// Sampling and interpretation settings chosen when a texture is loaded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureOptions {
    pub color_space: ColorSpace,
    pub wrap: Wrap,
    /// Uv scale applied by materials that use this texture as their colour map.
    pub repeat: [f32; 2],
    pub mag_filter: Filter,
    pub min_filter: Filter,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            color_space: ColorSpace::Srgb,
            wrap: Wrap::ClampToEdge,
            repeat: [1.0, 1.0],
            mag_filter: Filter::Linear,
            min_filter: Filter::Linear,
        }
    }
}

impl TextureOptions {
    pub fn data() -> Self {
        Self {
            color_space: ColorSpace::Linear,
            ..Default::default()
        }
    }

    pub fn repeated(mut self, x: f32, y: f32) -> Self {
        self.wrap = Wrap::Repeat;
        self.repeat = [x, y];
        self
    }

    pub fn nearest(mut self) -> Self {
        self.mag_filter = Filter::Nearest;
        self.min_filter = Filter::Nearest;
        self
    }

    fn format(&self) -> wgpu::TextureFormat {
        match self.color_space {
            ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
        }
    }

    fn sampler(&self, device: &wgpu::Device) -> wgpu::Sampler {
        let address_mode = self.wrap.into();
        device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: self.mag_filter.into(),
            min_filter: self.min_filter.into(),
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        })
    }
}

/// A GPU texture with a view and optional sampler.
#[derive(Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
    pub repeat: [f32; 2],
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture usable both as a depth attachment and as a comparison
    /// sampled texture (shadow maps).
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        Self::depth(device, size, 1, None, label)
    }

    /// Depth texture of `layers` layers, viewed as a whole as a 2d array.
    pub fn create_depth_array(
        device: &wgpu::Device,
        size: [u32; 2],
        layers: u32,
        label: &str,
    ) -> Self {
        Self::depth(
            device,
            size,
            layers.max(1),
            Some(wgpu::TextureViewDimension::D2Array),
            label,
        )
    }

    /// Attachment view of a single layer of a depth array.
    pub fn layer_view(&self, layer: u32) -> wgpu::TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_array_layer: layer,
            array_layer_count: Some(1),
            ..Default::default()
        })
    }

    fn depth(
        device: &wgpu::Device,
        size: [u32; 2],
        layers: u32,
        dimension: Option<wgpu::TextureViewDimension>,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: layers,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension,
            ..Default::default()
        });
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        }));

        Self {
            texture,
            view,
            sampler,
            repeat: [1.0, 1.0],
        }
    }

    /// A 1×1 texture of a single texel, used wherever a material has no map bound.
    pub fn solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        color_space: ColorSpace,
        label: &str,
    ) -> Texture {
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            1,
            1,
            image::Rgba(rgba),
        ));
        let options = TextureOptions {
            color_space,
            wrap: Wrap::Repeat,
            ..Default::default()
        };
        Self::from_image(device, queue, &img, Some(label), &options)
    }

    /// The blue/purple-ish colour that represents an unperturbed normal.
    pub fn create_default_normal_map(device: &wgpu::Device, queue: &wgpu::Queue) -> Texture {
        Self::solid(
            device,
            queue,
            [127, 127, 255, 255],
            ColorSpace::Linear,
            "default normal map",
        )
    }

    /// Load a texture from raw byte data (image file contents).
    ///
    /// * `format` is an optional file extension hint (e.g. "png"). If None, auto-detect.
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
        format: Option<&str>,
        options: &TextureOptions,
    ) -> Result<Self> {
        let img = decode(bytes, format)?;
        Ok(Self::from_image(device, queue, &img, Some(label), options))
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
        options: &TextureOptions,
    ) -> Self {
        let dimensions = img.dimensions();
        let rgba = img.to_rgba8();

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: options.format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: Some(options.sampler(device)),
            repeat: options.repeat,
        }
    }

    /// Six square faces in the order +x, -x, +y, -y, +z, -z, viewed as a cube.
    pub fn cube_from_images(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[image::DynamicImage; 6],
        label: &str,
    ) -> Result<Self> {
        let (width, height) = faces[0].dimensions();
        if let Some(face) = faces.iter().find(|face| face.dimensions() != (width, height)) {
            bail!(
                "cube map {label} mixes face sizes {:?} and {:?}",
                (width, height),
                face.dimensions()
            );
        }
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 6,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for (layer, face) in faces.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                },
                &face.to_rgba8(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        Ok(Self {
            texture,
            view,
            sampler: Some(create_default_sampler(device)),
            repeat: [1.0, 1.0],
        })
    }
}

pub fn decode(bytes: &[u8], format: Option<&str>) -> Result<image::DynamicImage> {
    let img = match format {
        None => image::load_from_memory(bytes)?,
        Some(fmt) => match ImageFormat::from_extension(fmt) {
            Some(format) => load_from_memory_with_format(bytes, format)?,
            None => bail!("unsupported image format {fmt}"),
        },
    };
    Ok(img)
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_maps_are_linear() {
        assert_eq!(TextureOptions::data().format(), wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(
            TextureOptions::default().format(),
            wgpu::TextureFormat::Rgba8UnormSrgb
        );
    }

    #[test]
    fn repeated_switches_wrapping() {
        let grass = TextureOptions::default().repeated(8.0, 8.0);
        assert_eq!(grass.wrap, Wrap::Repeat);
        assert_eq!(grass.repeat, [8.0, 8.0]);
        assert_eq!(TextureOptions::default().nearest().mag_filter, Filter::Nearest);
    }

    #[test]
    fn decode_rejects_unknown_extension() {
        assert!(decode(&[0, 1, 2], Some("nope")).is_err());
        assert!(decode(&[0, 1, 2], None).is_err());
    }

    #[test]
    fn decode_reads_png() {
        let img = image::RgbaImage::from_pixel(2, 3, image::Rgba([255, 0, 0, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        let decoded = decode(bytes.get_ref(), Some("png")).unwrap();
        assert_eq!(decoded.dimensions(), (2, 3));
    }
}
