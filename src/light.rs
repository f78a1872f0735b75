//! Light sources, fog and the uniform block the mesh shader lights with.
//!
//! Lights are scene nodes: their position comes from the node's world matrix. Directional
//! lights always point at the world origin.
//!
//! Shadow maps live in the layers of one depth array: layer 0 belongs to the shadowed
//! directional light, every shadowed point light gets six more, one per cube face.

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Vector3};

use crate::{camera::OPENGL_TO_WGPU_MATRIX, color::Color};

pub const MAX_DIRECTIONAL_LIGHTS: usize = 2;
pub const MAX_POINT_LIGHTS: usize = 8;
pub const MAX_POINT_SHADOWS: usize = 4;
pub const SHADOW_LAYERS: u32 = 1 + 6 * MAX_POINT_SHADOWS as u32;

/// First of the six shadow map layers of the point shadow in `slot`.
pub fn point_shadow_layer(slot: usize) -> usize {
    1 + 6 * slot
}

/// Looking direction and up vector of each cube face, in +x, -x, +y, -y, +z, -z order.
const CUBE_FACES: [([f32; 3], [f32; 3]); 6] = [
    ([1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
    ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, -1.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, 0.0, 1.0], [0.0, -1.0, 0.0]),
    ([0.0, 0.0, -1.0], [0.0, -1.0, 0.0]),
];

/// The cube face `direction` falls on. The mesh shader picks faces the same way.
pub fn cube_face(direction: Vector3<f32>) -> usize {
    let [x, y, z] = [direction.x.abs(), direction.y.abs(), direction.z.abs()];
    if x >= y && x >= z {
        if direction.x >= 0.0 { 0 } else { 1 }
    } else if y >= z {
        if direction.y >= 0.0 { 2 } else { 3 }
    } else if direction.z >= 0.0 {
        4
    } else {
        5
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Light {
    Ambient(AmbientLight),
    Directional(DirectionalLight),
    Point(PointLight),
}

impl Light {
    pub fn ambient<C: Into<Color>>(color: C, intensity: f32) -> Self {
        Self::Ambient(AmbientLight {
            color: color.into(),
            intensity,
        })
    }

    pub fn directional<C: Into<Color>>(color: C, intensity: f32) -> Self {
        Self::Directional(DirectionalLight {
            color: color.into(),
            intensity,
            cast_shadow: false,
            shadow: LightShadow::default(),
        })
    }

    /// A `distance` of zero never cuts the light off.
    pub fn point<C: Into<Color>>(color: C, intensity: f32, distance: f32) -> Self {
        Self::Point(PointLight {
            color: color.into(),
            intensity,
            distance,
            decay: 1.0,
            cast_shadow: false,
            shadow: LightShadow::default(),
        })
    }

    /// Turns on shadows with a `map_size` square map reaching `far`. Ambient light casts
    /// nothing.
    pub fn with_shadow(mut self, map_size: u32, far: f32) -> Self {
        let settings = match &mut self {
            Light::Ambient(_) => None,
            Light::Directional(l) => Some((&mut l.cast_shadow, &mut l.shadow)),
            Light::Point(l) => Some((&mut l.cast_shadow, &mut l.shadow)),
        };
        if let Some((cast_shadow, shadow)) = settings {
            *cast_shadow = true;
            shadow.map_size = map_size;
            shadow.far = far;
        }
        self
    }

    /// The shadow settings of a shadow casting light.
    pub fn shadow(&self) -> Option<&LightShadow> {
        match self {
            Light::Directional(l) if l.cast_shadow => Some(&l.shadow),
            Light::Point(l) if l.cast_shadow => Some(&l.shadow),
            _ => None,
        }
    }

    pub fn intensity(&self) -> f32 {
        match self {
            Light::Ambient(l) => l.intensity,
            Light::Directional(l) => l.intensity,
            Light::Point(l) => l.intensity,
        }
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        match self {
            Light::Ambient(l) => l.intensity = intensity,
            Light::Directional(l) => l.intensity = intensity,
            Light::Point(l) => l.intensity = intensity,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    pub cast_shadow: bool,
    pub shadow: LightShadow,
}

impl DirectionalLight {
    /// Orthographic light-space transform looking from `position` to the origin.
    pub fn shadow_view_proj(&self, position: Vector3<f32>) -> Matrix4<f32> {
        let eye = Point3::from_vec(position);
        let direction = -position.normalize();
        let up = if direction.y.abs() > 0.999 {
            Vector3::unit_z()
        } else {
            Vector3::unit_y()
        };
        let view = Matrix4::look_at_rh(eye, Point3::origin(), up);
        let e = self.shadow.extent;
        let proj = cgmath::ortho(-e, e, -e, e, self.shadow.near, self.shadow.far);
        OPENGL_TO_WGPU_MATRIX * proj * view
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PointLight {
    pub color: Color,
    pub intensity: f32,
    pub distance: f32,
    pub decay: f32,
    pub cast_shadow: bool,
    pub shadow: LightShadow,
}

impl PointLight {
    /// 90 degree perspective transforms of the six cube faces around `position`.
    pub fn shadow_view_projs(&self, position: Vector3<f32>) -> [Matrix4<f32>; 6] {
        let eye = Point3::from_vec(position);
        let proj = cgmath::perspective(cgmath::Deg(90.0), 1.0, self.shadow.near, self.shadow.far);
        CUBE_FACES.map(|(direction, up)| {
            let view = Matrix4::look_to_rh(eye, direction.into(), up.into());
            OPENGL_TO_WGPU_MATRIX * proj * view
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightShadow {
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
    /// Half width of the orthographic shadow camera, unused by point lights.
    pub extent: f32,
    pub bias: f32,
}

impl Default for LightShadow {
    fn default() -> Self {
        Self {
            map_size: 512,
            near: 0.5,
            far: 500.0,
            extent: 5.0,
            bias: 0.0,
        }
    }
}

/// Linear fog, fully opaque at `far`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fog {
    pub color: Color,
    pub near: f32,
    pub far: f32,
}

impl Fog {
    pub fn new<C: Into<Color>>(color: C, near: f32, far: f32) -> Self {
        Self {
            color: color.into(),
            near,
            far,
        }
    }

    pub fn factor(&self, depth: f32) -> f32 {
        let t = ((depth - self.near) / (self.far - self.near).max(f32::EPSILON)).clamp(0.0, 1.0);
        t * t * (3.0 - 2.0 * t)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirectionalLightRaw {
    /// Direction the light travels, w unused.
    pub direction: [f32; 4],
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLightRaw {
    /// xyz world position, w cutoff distance.
    pub position: [f32; 4],
    /// rgb premultiplied by intensity, w decay.
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    pub ambient: [f32; 4],
    /// directional count, point count
    pub counts: [u32; 4],
    pub directional: [DirectionalLightRaw; MAX_DIRECTIONAL_LIGHTS],
    pub point: [PointLightRaw; MAX_POINT_LIGHTS],
    pub fog_color: [f32; 4],
    /// near, far, enabled
    pub fog: [f32; 4],
    pub shadow_view_proj: [[f32; 4]; 4],
    /// enabled, bias, texel size, index of the shadowed directional light
    pub shadow: [f32; 4],
    /// Per point light: enabled, bias, texel size, first shadow layer.
    pub point_shadow: [[f32; 4]; MAX_POINT_LIGHTS],
    /// Six faces per shadow slot, face `f` of slot `s` at `6 * s + f`.
    pub point_shadow_view_proj: [[[f32; 4]; 4]; 6 * MAX_POINT_SHADOWS],
}

impl Default for LightsUniform {
    fn default() -> Self {
        use cgmath::SquareMatrix;
        Self {
            ambient: [0.0; 4],
            counts: [0; 4],
            directional: Default::default(),
            point: Default::default(),
            fog_color: [0.0; 4],
            fog: [0.0; 4],
            shadow_view_proj: Matrix4::identity().into(),
            shadow: [0.0; 4],
            point_shadow: [[0.0; 4]; MAX_POINT_LIGHTS],
            point_shadow_view_proj: [Matrix4::identity().into(); 6 * MAX_POINT_SHADOWS],
        }
    }
}

impl LightsUniform {
    /// Packs visible lights with their world positions. Lights past the per-type limit are
    /// dropped with a warning.
    pub fn collect<'a, I>(lights: I, fog: Option<&Fog>) -> Self
    where
        I: IntoIterator<Item = (&'a Light, Vector3<f32>)>,
    {
        let mut uniform = Self::default();
        let mut dropped = 0;
        for (light, position) in lights {
            match light {
                Light::Ambient(l) => {
                    let [r, g, b] = l.color.to_linear();
                    uniform.ambient[0] += r * l.intensity;
                    uniform.ambient[1] += g * l.intensity;
                    uniform.ambient[2] += b * l.intensity;
                }
                Light::Directional(l) => {
                    let i = uniform.counts[0] as usize;
                    if i >= MAX_DIRECTIONAL_LIGHTS {
                        dropped += 1;
                        continue;
                    }
                    let direction = if position.magnitude2() > 0.0 {
                        -position.normalize()
                    } else {
                        -Vector3::unit_y()
                    };
                    let [r, g, b] = l.color.to_linear();
                    uniform.directional[i] = DirectionalLightRaw {
                        direction: direction.extend(0.0).into(),
                        color: [r * l.intensity, g * l.intensity, b * l.intensity, 1.0],
                    };
                    uniform.counts[0] += 1;
                }
                Light::Point(l) => {
                    let i = uniform.counts[1] as usize;
                    if i >= MAX_POINT_LIGHTS {
                        dropped += 1;
                        continue;
                    }
                    let [r, g, b] = l.color.to_linear();
                    uniform.point[i] = PointLightRaw {
                        position: position.extend(l.distance).into(),
                        color: [r * l.intensity, g * l.intensity, b * l.intensity, l.decay],
                    };
                    uniform.counts[1] += 1;
                }
            }
        }
        if dropped > 0 {
            log::warn!("{dropped} light(s) over the shader limit were ignored");
        }
        if let Some(fog) = fog {
            let [r, g, b] = fog.color.to_linear();
            uniform.fog_color = [r, g, b, 1.0];
            uniform.fog = [fog.near, fog.far, 1.0, 0.0];
        }
        uniform
    }

    pub fn set_shadow(&mut self, view_proj: Matrix4<f32>, shadow: &LightShadow, light_index: u32) {
        self.shadow_view_proj = view_proj.into();
        self.shadow = [
            1.0,
            shadow.bias,
            1.0 / shadow.map_size.max(1) as f32,
            light_index as f32,
        ];
    }

    /// Shades the point light at `point_index` with the cube faces rendered into shadow
    /// slot `slot`.
    pub fn set_point_shadow(
        &mut self,
        point_index: usize,
        slot: usize,
        view_projs: &[Matrix4<f32>; 6],
        shadow: &LightShadow,
    ) {
        if point_index >= MAX_POINT_LIGHTS || slot >= MAX_POINT_SHADOWS {
            log::warn!("point shadow {point_index} does not fit into slot {slot}");
            return;
        }
        for (face, view_proj) in view_projs.iter().enumerate() {
            self.point_shadow_view_proj[6 * slot + face] = (*view_proj).into();
        }
        self.point_shadow[point_index] = [
            1.0,
            shadow.bias,
            1.0 / shadow.map_size.max(1) as f32,
            point_shadow_layer(slot) as f32,
        ];
    }
}

/// Attenuation of a point light at distance `d`, zero past `distance` unless it is zero.
pub fn point_attenuation(d: f32, distance: f32, decay: f32) -> f32 {
    if distance > 0.0 {
        (1.0 - d / distance).clamp(0.0, 1.0).powf(decay)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::{Transform, Vector4};

    use super::*;

    #[test]
    fn uniform_layout_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<LightsUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<PointLightRaw>(), 32);
    }

    #[test]
    fn caps_the_number_of_lights() {
        let ghosts: Vec<Light> = (0..10).map(|_| Light::point(0xff00ff, 2.0, 3.0)).collect();
        let uniform = LightsUniform::collect(
            ghosts.iter().map(|l| (l, Vector3::new(1.0, 0.0, 0.0))),
            None,
        );
        assert_eq!(uniform.counts[1], MAX_POINT_LIGHTS as u32);
        assert_eq!(uniform.point[0].position[3], 3.0);
        assert_eq!(uniform.point[0].color[3], 1.0);
    }

    #[test]
    fn ambient_lights_add_up() {
        let lights = [Light::ambient(0xffffff, 0.25), Light::ambient(0xffffff, 0.25)];
        let uniform = LightsUniform::collect(lights.iter().map(|l| (l, Vector3::new(0.0, 0.0, 0.0))), None);
        assert_relative_eq!(uniform.ambient[0], 0.5);
        assert_eq!(uniform.counts, [0; 4]);
    }

    #[test]
    fn directional_light_shines_towards_the_origin() {
        let moon = Light::directional(0xb9d5ff, 0.12);
        let uniform = LightsUniform::collect([(&moon, Vector3::new(0.0, 5.0, 0.0))], None);
        assert_eq!(uniform.counts[0], 1);
        assert_relative_eq!(uniform.directional[0].direction[1], -1.0);
    }

    #[test]
    fn fog_is_packed_with_the_lights() {
        let fog = Fog::new(0x262837, 1.0, 20.0);
        let uniform = LightsUniform::collect(std::iter::empty(), Some(&fog));
        assert_eq!(uniform.fog, [1.0, 20.0, 1.0, 0.0]);
        assert_relative_eq!(fog.factor(0.5), 0.0);
        assert_relative_eq!(fog.factor(25.0), 1.0);
        assert_relative_eq!(fog.factor(10.5), 0.5);
    }

    #[test]
    fn legacy_point_attenuation() {
        assert_relative_eq!(point_attenuation(0.0, 3.0, 1.0), 1.0);
        assert_relative_eq!(point_attenuation(1.5, 3.0, 1.0), 0.5);
        assert_relative_eq!(point_attenuation(4.0, 3.0, 1.0), 0.0);
        assert_relative_eq!(point_attenuation(100.0, 0.0, 1.0), 1.0);
    }

    #[test]
    fn shadow_settings_follow_the_light_kind() {
        let door = Light::point(0xff7d46, 1.0, 7.0).with_shadow(256, 7.0);
        let shadow = door.shadow().expect("door light casts shadows");
        assert_eq!(shadow.map_size, 256);
        assert_relative_eq!(shadow.far, 7.0);
        assert!(Light::point(0xff7d46, 1.0, 7.0).shadow().is_none());
        assert!(Light::ambient(0xffffff, 0.1).with_shadow(256, 7.0).shadow().is_none());
    }

    #[test]
    fn cube_faces_look_along_the_major_axis() {
        let Light::Point(ghost) = Light::point(0xff00ff, 2.0, 3.0).with_shadow(256, 7.0) else {
            unreachable!()
        };
        let position = Vector3::new(1.0, 2.0, -1.0);
        let faces = ghost.shadow_view_projs(position);
        let directions = [
            Vector3::new(3.0, 0.5, -0.2),
            Vector3::new(-2.0, 0.3, 0.1),
            Vector3::new(0.1, 4.0, 0.2),
            Vector3::new(0.2, -1.5, 0.3),
            Vector3::new(-0.4, 0.1, 2.5),
            Vector3::new(0.3, -0.2, -3.0),
        ];
        for (expected, direction) in directions.into_iter().enumerate() {
            let face = cube_face(direction);
            assert_eq!(face, expected);
            let world = Point3::from_vec(position + direction);
            let p = faces[face].transform_point(world);
            assert!(p.x.abs() <= 1.0 && p.y.abs() <= 1.0, "{p:?} is off face {face}");
            assert!(p.z > 0.0 && p.z < 1.0);
        }
        // straight ahead lands in the middle of the face
        let centre = faces[0].transform_point(Point3::from_vec(position + Vector3::unit_x()));
        assert_relative_eq!(centre.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(centre.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn point_shadows_take_six_layers_each() {
        let Light::Point(ghost) = Light::point(0x00ffff, 2.0, 3.0).with_shadow(256, 7.0) else {
            unreachable!()
        };
        let faces = ghost.shadow_view_projs(Vector3::new(0.0, 1.0, 0.0));
        let mut uniform = LightsUniform::default();
        uniform.set_point_shadow(2, 1, &faces, &ghost.shadow);
        assert_eq!(uniform.point_shadow[2], [1.0, 0.0, 1.0 / 256.0, 7.0]);
        assert_eq!(uniform.point_shadow[0][0], 0.0);
        let last: [[f32; 4]; 4] = faces[5].into();
        assert_eq!(uniform.point_shadow_view_proj[11], last);
        assert_eq!(point_shadow_layer(MAX_POINT_SHADOWS - 1) + 6, SHADOW_LAYERS as usize);

        uniform.set_point_shadow(0, MAX_POINT_SHADOWS, &faces, &ghost.shadow);
        assert_eq!(uniform.point_shadow[0][0], 0.0);
    }

    #[test]
    fn shadow_camera_centres_the_origin() {
        let Light::Directional(mut moon) = Light::directional(0xb9d5ff, 0.12) else {
            unreachable!()
        };
        moon.shadow.far = 15.0;
        let m = moon.shadow_view_proj(Vector3::new(4.0, 5.0, -2.0));
        let clip: Vector4<f32> = m * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(clip.x / clip.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip.y / clip.w, 0.0, epsilon = 1e-5);
        let depth = clip.z / clip.w;
        assert!(depth > 0.0 && depth < 1.0);
        // straight overhead needs a different up vector
        let top = moon.shadow_view_proj(Vector3::new(0.0, 5.0, 0.0));
        let p = top.transform_point(Point3::new(1.0, 0.0, 0.0));
        assert!(p.x.is_finite() && p.y.is_finite());
    }
}
