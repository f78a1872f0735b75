use crate::data_structures::model::Vertex;

/// Particle positions with optional per-particle colours.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointCloud {
    pub positions: Vec<[f32; 3]>,
    pub colors: Option<Vec<[f32; 3]>>,
}

impl PointCloud {
    pub fn new(positions: Vec<[f32; 3]>) -> Self {
        Self {
            positions,
            colors: None,
        }
    }

    pub fn with_colors(mut self, colors: Vec<[f32; 3]>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Interleaves positions and colours; missing colours are white. Colour values are
    /// linear.
    pub fn to_raw(&self) -> Vec<ParticleRaw> {
        self.positions
            .iter()
            .enumerate()
            .map(|(i, position)| ParticleRaw {
                position: *position,
                color: self
                    .colors
                    .as_ref()
                    .and_then(|colors| colors.get(i))
                    .copied()
                    .unwrap_or([1.0; 3]),
            })
            .collect()
    }
}

/// One particle as seen by the points shader. Every particle is drawn as an instance of
/// a six vertex quad.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleRaw {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex for ParticleRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ParticleRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_colours_default_to_white() {
        let cloud = PointCloud::new(vec![[0.0; 3], [1.0, 2.0, 3.0]]);
        let raw = cloud.to_raw();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[1].position, [1.0, 2.0, 3.0]);
        assert_eq!(raw[1].color, [1.0; 3]);
    }

    #[test]
    fn colours_are_interleaved() {
        let cloud = PointCloud::new(vec![[0.0; 3]]).with_colors(vec![[0.5, 0.25, 0.0]]);
        assert_eq!(cloud.to_raw()[0].color, [0.5, 0.25, 0.0]);
        assert_eq!(std::mem::size_of::<ParticleRaw>(), 24);
    }
}
