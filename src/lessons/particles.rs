//! Fifty thousand coloured particles rolling as a wave around a white cube.

use std::sync::Arc;

use instant::Duration;
use rand::Rng;
use winit::event::{DeviceEvent, WindowEvent};

use crate::{
    clock::Clock,
    color::Color,
    context::{Context, InitContext},
    data_structures::{
        instance::Instance,
        scene_graph::NodeId,
        texture::{Texture, TextureOptions},
    },
    flow::{FlowConsturctor, GraphicsFlow, Out},
    geometry::{PointCloud, box_geometry},
    material::{Blending, Material, PointsMaterial},
    render::Render,
    resources::TextureLoader,
    scene::Scene,
};

#[derive(Clone, Debug, PartialEq)]
pub struct ParticleParameters {
    pub count: usize,
    /// Edge length of the cube the particles start in.
    pub spread: f32,
    pub size: f32,
    pub color: Color,
    /// Radians per second around y.
    pub rotation_speed: f32,
}

impl Default for ParticleParameters {
    fn default() -> Self {
        Self {
            count: 50_000,
            spread: 10.0,
            size: 0.05,
            color: Color::from_hex(0xff88cc),
            rotation_speed: 0.2,
        }
    }
}

/// Uniformly spread particles with random colours.
pub fn random_particles<R: Rng + ?Sized>(parameters: &ParticleParameters, rng: &mut R) -> PointCloud {
    let mut component = || (rng.r#gen::<f32>() - 0.5) * parameters.spread;
    let positions: Vec<[f32; 3]> = (0..parameters.count)
        .map(|_| [component(), component(), component()])
        .collect();
    let colors = (0..parameters.count)
        .map(|_| [rng.r#gen(), rng.r#gen(), rng.r#gen()])
        .collect();
    PointCloud::new(positions).with_colors(colors)
}

/// Lifts every particle to `sin(t + x)`.
pub fn wave(cloud: &mut PointCloud, t: f32) {
    for [x, y, _] in &mut cloud.positions {
        *y = (t + *x).sin();
    }
}

pub struct Particles {
    scene: Scene,
    particles: NodeId,
    parameters: ParticleParameters,
    clock: Clock,
}

impl Particles {
    pub fn new<R: Rng + ?Sized>(
        ctx: &InitContext,
        parameters: ParticleParameters,
        alpha_map: Arc<Texture>,
        rng: &mut R,
    ) -> Self {
        let mut scene = Scene::new(ctx);
        let material = PointsMaterial {
            size: parameters.size,
            size_attenuation: true,
            color: parameters.color,
            transparent: true,
            alpha_map: Some(alpha_map),
            depth_write: false,
            blending: Blending::Additive,
            vertex_colors: true,
            ..Default::default()
        };
        let particles = scene.add_points(
            None,
            "particles",
            random_particles(&parameters, rng),
            material,
            Instance::new(),
        );

        let cube = scene.add_geometry("cube", &box_geometry(1.0, 1.0, 1.0));
        let white = scene.add_material(Material::basic(Color::WHITE));
        scene.add_mesh(None, "cube", cube, white, Instance::new());

        Self {
            scene,
            particles,
            parameters,
            clock: Clock::new(),
        }
    }
}

pub fn constructor() -> FlowConsturctor<(), ()> {
    Box::new(|ctx| {
        Box::pin(async move {
            let alpha_map = TextureLoader::new(&ctx.device, &ctx.queue)
                .load("textures/particles/2.png", TextureOptions::data())
                .await;
            let flow: Box<dyn GraphicsFlow<(), ()>> = Box::new(Particles::new(
                &ctx,
                ParticleParameters::default(),
                alpha_map,
                &mut rand::thread_rng(),
            ));
            flow
        })
    })
}

impl GraphicsFlow<(), ()> for Particles {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        super::look_around(ctx, "Particles", [0.0, 0.0, 3.0]);
        Out::Empty
    }

    fn on_update(&mut self, _: &Context, _: &mut (), dt: Duration) -> Out<(), ()> {
        let t = self.clock.advance(dt);
        self.scene[self.particles].transform.rotation.y = t * self.parameters.rotation_speed;
        if let Some(cloud) = self.scene.points_mut(self.particles) {
            wave(cloud, t);
        }
        self.scene.write_to_buffer(self.particles);
        Out::Empty
    }

    fn on_tick(&mut self, _: &Context, _: &mut ()) -> Out<(), ()> {
        Out::Empty
    }

    fn on_device_events(&mut self, _: &Context, _: &mut (), _: &DeviceEvent) -> Out<(), ()> {
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut (), _: &WindowEvent) -> Out<(), ()> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut (), event: ()) -> Option<()> {
        Some(event)
    }

    fn on_gui(&mut self, _: &egui::Context, _: &mut ()) -> Out<(), ()> {
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        (&self.scene).into()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn particles_fill_the_spread_cube() {
        let parameters = ParticleParameters {
            count: 2_000,
            ..Default::default()
        };
        let cloud = random_particles(&parameters, &mut StdRng::seed_from_u64(9));
        assert_eq!(cloud.len(), 2_000);
        assert!(
            cloud
                .positions
                .iter()
                .flatten()
                .all(|c| c.abs() <= parameters.spread / 2.0)
        );
        let colors = cloud.colors.as_ref().unwrap();
        assert_eq!(colors.len(), 2_000);
        assert!(colors.iter().flatten().all(|c| (0.0..1.0).contains(c)));
    }

    #[test]
    fn wave_only_moves_particles_vertically() {
        let mut cloud = PointCloud::new(vec![[0.0, 4.0, 1.0], [1.5, -2.0, -3.0]]);
        wave(&mut cloud, 0.5);
        assert_relative_eq!(cloud.positions[0][1], 0.5f32.sin());
        assert_relative_eq!(cloud.positions[1][1], 2.0f32.sin());
        assert_eq!(cloud.positions[0][0], 0.0);
        assert_eq!(cloud.positions[1][2], -3.0);
    }

    #[test]
    fn defaults_match_the_lesson() {
        let parameters = ParticleParameters::default();
        assert_eq!(parameters.count, 50_000);
        assert_relative_eq!(parameters.size, 0.05);
    }
}
