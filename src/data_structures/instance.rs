//! Object transforms and their per-instance GPU representation.
//!
//! Every drawable in a scene is uploaded as one [`InstanceRaw`] (world matrix, normal
//! matrix, shadow flag). Meshes that share geometry and material are drawn with a single
//! instanced call.

use std::ops::Mul;

use cgmath::{Matrix, Rotation3, SquareMatrix};

use crate::data_structures::model;

/// Local transform: position, Euler rotation (radians, applied x then y then z in the
/// object's frame) and scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Vector3<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: cgmath::Vector3::new(0.0, 0.0, 0.0),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: cgmath::Vector3::new(x, y, z),
            ..Self::new()
        }
    }

    pub fn with_rotation(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = cgmath::Vector3::new(x, y, z);
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = cgmath::Vector3::new(scale, scale, scale);
        self
    }

    pub fn quaternion(&self) -> cgmath::Quaternion<f32> {
        cgmath::Quaternion::from_angle_x(cgmath::Rad(self.rotation.x))
            * cgmath::Quaternion::from_angle_y(cgmath::Rad(self.rotation.y))
            * cgmath::Quaternion::from_angle_z(cgmath::Rad(self.rotation.z))
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.quaternion())
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

/// Parent-then-child composition, yielding the child's matrix in the parent's space.
impl Mul<&Instance> for &cgmath::Matrix4<f32> {
    type Output = cgmath::Matrix4<f32>;

    fn mul(self, rhs: &Instance) -> Self::Output {
        self * rhs.to_matrix()
    }
}

/// The actual data stored on the GPU per drawn object.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
    receive_shadow: f32,
}

impl InstanceRaw {
    /// Normals use the inverse transpose so non-uniform scale keeps them perpendicular.
    pub fn new(world: cgmath::Matrix4<f32>, receive_shadow: bool) -> Self {
        let upper = cgmath::Matrix3::from_cols(
            world.x.truncate(),
            world.y.truncate(),
            world.z.truncate(),
        );
        let normal = upper
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or(upper);
        Self {
            model: world.into(),
            normal: normal.into(),
            receive_shadow: if receive_shadow { 1.0 } else { 0.0 },
        }
    }

    pub fn translation(&self) -> cgmath::Vector3<f32> {
        cgmath::Vector3::new(self.model[3][0], self.model[3][1], self.model[3][2])
    }
}

/*
 * Layout: world matrix as four vec4 columns (locations 5..=8), normal matrix as three
 * vec3 columns (9..=11), shadow flag (12). Locations 0..=4 belong to ModelVertex.
 */
impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 25]>() as wgpu::BufferAddress,
                    shader_location: 12,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}
