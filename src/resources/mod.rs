//! Loading of external files (texture images) and creation of GPU resources from them.
//!
//! Natively, paths are resolved against `./assets`; on the web they are fetched relative
//! to the page origin.

use std::sync::Arc;

use crate::data_structures::texture::{Texture, TextureOptions, decode};

pub mod texture;

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("page origin is not readable"))?;
    let base = reqwest::Url::parse(&format!("{}/", origin))?;
    Ok(base.join(file_name)?)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read(path).await?
    };

    Ok(data)
}

pub async fn load_texture(
    file_name: &str,
    options: &TextureOptions,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Texture> {
    let data = load_binary(file_name).await?;
    Texture::from_bytes(device, queue, &data, file_name, extension(file_name), options)
}

/// `[px, nx, py, ny, pz, nz]`
pub async fn load_cube_texture(
    file_names: [&str; 6],
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Texture> {
    let mut faces = Vec::with_capacity(6);
    for file_name in file_names {
        let data = load_binary(file_name).await?;
        faces.push(decode(&data, extension(file_name))?);
    }
    let faces: [image::DynamicImage; 6] = faces
        .try_into()
        .map_err(|_| anyhow::anyhow!("a cube map needs exactly six faces"))?;
    Texture::cube_from_images(device, queue, &faces, file_names[0])
}

fn extension(file_name: &str) -> Option<&str> {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
}

/// Loader used by lessons. A texture that fails to load is reported and replaced by a
/// 1×1 white placeholder, so the scene still comes up without its assets.
pub struct TextureLoader<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
}

impl<'a> TextureLoader<'a> {
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> Self {
        Self { device, queue }
    }

    pub async fn load(&self, file_name: &str, options: TextureOptions) -> Arc<Texture> {
        match load_texture(file_name, &options, self.device, self.queue).await {
            Ok(texture) => {
                log::debug!("loaded texture {file_name}");
                Arc::new(texture)
            }
            Err(e) => {
                log::error!("could not load texture {file_name}: {e}");
                let mut placeholder =
                    Texture::solid(self.device, self.queue, [255; 4], options.color_space, file_name);
                placeholder.repeat = options.repeat;
                Arc::new(placeholder)
            }
        }
    }
}

/// Loads six images `[px, nx, py, ny, pz, nz]` into one cube texture.
pub struct CubeTextureLoader<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
}

impl<'a> CubeTextureLoader<'a> {
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> Self {
        Self { device, queue }
    }

    /// `None` if any face is missing; materials then reflect nothing.
    pub async fn load(&self, file_names: [&str; 6]) -> Option<Arc<Texture>> {
        match load_cube_texture(file_names, self.device, self.queue).await {
            Ok(texture) => Some(Arc::new(texture)),
            Err(e) => {
                log::error!("could not load cube texture {}: {e}", file_names[0]);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_hint_from_path() {
        assert_eq!(extension("textures/door/color.jpg"), Some("jpg"));
        assert_eq!(extension("textures/particles/2.png"), Some("png"));
        assert_eq!(extension("README"), None);
    }

    #[test]
    fn missing_asset_is_an_error() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        assert!(rt.block_on(load_binary("textures/does/not/exist.png")).is_err());
    }
}
