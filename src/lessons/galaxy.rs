//! Galaxy generator. Every parameter lives in the debug panel and the galaxy is rebuilt
//! whenever a value is committed. The first draft of the lesson, a white cube of random
//! stars, stays selectable next to the spiral.

use std::f32::consts::TAU;

use instant::Duration;
use rand::{Rng, SeedableRng, rngs::StdRng};
use winit::event::{DeviceEvent, WindowEvent};

use crate::{
    color::Color,
    context::{Context, InitContext},
    data_structures::{instance::Instance, scene_graph::NodeId},
    flow::{FlowConsturctor, GraphicsFlow, Out},
    geometry::PointCloud,
    gui::DebugPanel,
    material::{Blending, PointsMaterial},
    render::Render,
    scene::Scene,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GalaxyShape {
    /// White stars spread evenly over a cube of side 3. Ignores everything but count and
    /// size.
    Cube,
    #[default]
    Spiral,
}

impl GalaxyShape {
    pub const NAMES: [&'static str; 2] = ["cube", "spiral"];
    const ALL: [GalaxyShape; 2] = [GalaxyShape::Cube, GalaxyShape::Spiral];

    fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or_default()
    }

    fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GalaxyParameters {
    pub shape: GalaxyShape,
    pub count: usize,
    pub size: f32,
    pub radius: f32,
    pub branches: u32,
    /// Extra rotation per unit of distance from the centre.
    pub spin: f32,
    pub randomness: f32,
    /// Higher values pull the scatter closer to the arms.
    pub randomness_power: f32,
    pub inside_color: Color,
    pub outside_color: Color,
}

impl Default for GalaxyParameters {
    fn default() -> Self {
        Self {
            shape: GalaxyShape::default(),
            count: 1000,
            size: 0.02,
            radius: 5.0,
            branches: 3,
            spin: 1.0,
            randomness: 0.2,
            randomness_power: 3.0,
            inside_color: Color::from_hex(0xff6030),
            outside_color: Color::from_hex(0x1b3984),
        }
    }
}

impl GalaxyParameters {
    pub fn material(&self) -> PointsMaterial {
        PointsMaterial {
            size: self.size,
            size_attenuation: true,
            depth_write: false,
            blending: Blending::Additive,
            vertex_colors: self.shape == GalaxyShape::Spiral,
            ..Default::default()
        }
    }
}

fn scatter<R: Rng + ?Sized>(rng: &mut R, parameters: &GalaxyParameters, radius: f32) -> f32 {
    let sign = if rng.r#gen::<bool>() { 1.0 } else { -1.0 };
    rng.r#gen::<f32>().powf(parameters.randomness_power) * sign * parameters.randomness * radius
}

pub fn generate_galaxy<R: Rng + ?Sized>(parameters: &GalaxyParameters, rng: &mut R) -> PointCloud {
    match parameters.shape {
        GalaxyShape::Cube => generate_cube(parameters.count, rng),
        GalaxyShape::Spiral => generate_spiral(parameters, rng),
    }
}

/// `count` uncoloured stars in the cube from -1.5 to 1.5 on every axis.
pub fn generate_cube<R: Rng + ?Sized>(count: usize, rng: &mut R) -> PointCloud {
    let mut coordinate = || (rng.r#gen::<f32>() - 0.5) * 3.0;
    let positions = (0..count)
        .map(|_| [coordinate(), coordinate(), coordinate()])
        .collect();
    PointCloud::new(positions)
}

/// Particles spread over `branches` arms that bend with `spin`, coloured from the inside
/// colour at the centre to the outside colour at `radius`.
pub fn generate_spiral<R: Rng + ?Sized>(parameters: &GalaxyParameters, rng: &mut R) -> PointCloud {
    let branches = parameters.branches.max(1);
    let mut positions = Vec::with_capacity(parameters.count);
    let mut colors = Vec::with_capacity(parameters.count);
    for i in 0..parameters.count {
        let radius = rng.r#gen::<f32>() * parameters.radius;
        let branch_angle = (i as u32 % branches) as f32 / branches as f32 * TAU;
        let spin_angle = radius * parameters.spin;
        let angle = branch_angle + spin_angle;

        let random = [
            scatter(rng, parameters, radius),
            scatter(rng, parameters, radius),
            scatter(rng, parameters, radius),
        ];
        positions.push([
            angle.cos() * radius + random[0],
            random[1],
            angle.sin() * radius + random[2],
        ]);

        let mix = if parameters.radius > 0.0 {
            radius / parameters.radius
        } else {
            0.0
        };
        colors.push(
            parameters
                .inside_color
                .lerp(&parameters.outside_color, mix)
                .to_linear(),
        );
    }
    PointCloud::new(positions).with_colors(colors)
}

pub struct GalaxyWorld {
    scene: Scene,
    parameters: GalaxyParameters,
    points: Option<NodeId>,
    rng: StdRng,
}

impl GalaxyWorld {
    pub fn new(ctx: &InitContext, parameters: GalaxyParameters, rng: StdRng) -> Self {
        let mut world = Self {
            scene: Scene::new(ctx),
            parameters,
            points: None,
            rng,
        };
        world.regenerate();
        world
    }

    /// Drops the current galaxy with its buffers and builds a new one.
    pub fn regenerate(&mut self) {
        if let Some(old) = self.points.take() {
            self.scene.remove_points(old);
        }
        let cloud = generate_galaxy(&self.parameters, &mut self.rng);
        log::debug!("generated a galaxy of {} stars", cloud.len());
        let points = self.scene.add_points(
            None,
            "galaxy",
            cloud,
            self.parameters.material(),
            Instance::new(),
        );
        self.points = Some(points);
    }

    pub fn parameters(&self) -> &GalaxyParameters {
        &self.parameters
    }

    /// Takes effect on the next [`GalaxyWorld::regenerate`].
    pub fn parameters_mut(&mut self) -> &mut GalaxyParameters {
        &mut self.parameters
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The node of the current galaxy.
    pub fn points(&self) -> Option<NodeId> {
        self.points
    }
}

pub struct Galaxy {
    world: GalaxyWorld,
    panel: DebugPanel<GalaxyWorld>,
}

fn regenerate(world: &mut GalaxyWorld) {
    world.regenerate();
}

/// Count slider range and step.
pub const COUNT_RANGE: (f32, f32, f32) = (100.0, 1_000_000.0, 100.0);

fn panel() -> DebugPanel<GalaxyWorld> {
    let (min, max, step) = COUNT_RANGE;
    let mut panel = DebugPanel::new("Galaxy");
    panel
        .add_options(
            "shape",
            &GalaxyShape::NAMES,
            |w: &GalaxyWorld| w.parameters.shape.index(),
            |w, i| w.parameters.shape = GalaxyShape::from_index(i),
        )
        .on_finish_change(regenerate);
    panel
        .add_number(
            "count",
            |w: &GalaxyWorld| w.parameters.count as f32,
            |w, v| w.parameters.count = v as usize,
        )
        .min(min)
        .max(max)
        .step(step)
        .on_finish_change(regenerate);
    panel
        .add_number(
            "size",
            |w: &GalaxyWorld| w.parameters.size,
            |w, v| w.parameters.size = v,
        )
        .min(0.001)
        .max(0.1)
        .step(0.001)
        .on_finish_change(regenerate);
    panel
        .add_number(
            "radius",
            |w: &GalaxyWorld| w.parameters.radius,
            |w, v| w.parameters.radius = v,
        )
        .min(0.01)
        .max(20.0)
        .step(0.01)
        .on_finish_change(regenerate);
    panel
        .add_number(
            "branches",
            |w: &GalaxyWorld| w.parameters.branches as f32,
            |w, v| w.parameters.branches = v as u32,
        )
        .min(2.0)
        .max(20.0)
        .step(1.0)
        .on_finish_change(regenerate);
    panel
        .add_number(
            "spin",
            |w: &GalaxyWorld| w.parameters.spin,
            |w, v| w.parameters.spin = v,
        )
        .min(-5.0)
        .max(5.0)
        .step(0.001)
        .on_finish_change(regenerate);
    panel
        .add_number(
            "randomness",
            |w: &GalaxyWorld| w.parameters.randomness,
            |w, v| w.parameters.randomness = v,
        )
        .min(0.0)
        .max(2.0)
        .step(0.001)
        .on_finish_change(regenerate);
    panel
        .add_number(
            "randomnessPower",
            |w: &GalaxyWorld| w.parameters.randomness_power,
            |w, v| w.parameters.randomness_power = v,
        )
        .min(1.0)
        .max(10.0)
        .step(0.001)
        .on_finish_change(regenerate);
    panel
        .add_color(
            "insideColor",
            |w: &GalaxyWorld| w.parameters.inside_color,
            |w, c| w.parameters.inside_color = c,
        )
        .on_finish_change(regenerate);
    panel
        .add_color(
            "outsideColor",
            |w: &GalaxyWorld| w.parameters.outside_color,
            |w, c| w.parameters.outside_color = c,
        )
        .on_finish_change(regenerate);
    panel
}

impl Galaxy {
    pub fn new(ctx: &InitContext, parameters: GalaxyParameters) -> Self {
        Self {
            world: GalaxyWorld::new(ctx, parameters, StdRng::from_entropy()),
            panel: panel(),
        }
    }
}

pub fn constructor() -> FlowConsturctor<(), ()> {
    Box::new(|ctx| {
        Box::pin(async move {
            let flow: Box<dyn GraphicsFlow<(), ()>> =
                Box::new(Galaxy::new(&ctx, GalaxyParameters::default()));
            flow
        })
    })
}

impl GraphicsFlow<(), ()> for Galaxy {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        super::look_around(ctx, "Galaxy generator", [3.0, 3.0, 3.0]);
        Out::Empty
    }

    fn on_update(&mut self, _: &Context, _: &mut (), _: Duration) -> Out<(), ()> {
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

    fn on_gui(&mut self, gui: &egui::Context, _: &mut ()) -> Out<(), ()> {
        self.panel.show(gui, &mut self.world);
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        (&self.world.scene).into()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::gui::snap_clamp;

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn generates_the_requested_number_of_stars() {
        let parameters = GalaxyParameters {
            count: 500,
            ..Default::default()
        };
        let cloud = generate_galaxy(&parameters, &mut seeded());
        assert_eq!(cloud.len(), 500);
        assert_eq!(cloud.colors.as_ref().map(Vec::len), Some(500));
    }

    #[test]
    fn stars_stay_within_radius_plus_scatter() {
        let parameters = GalaxyParameters {
            count: 2000,
            ..Default::default()
        };
        let limit = parameters.radius * (1.0 + parameters.randomness * 3f32.sqrt());
        let cloud = generate_galaxy(&parameters, &mut seeded());
        for [x, y, z] in &cloud.positions {
            assert!((x * x + y * y + z * z).sqrt() <= limit + 1e-4);
            assert!(y.abs() <= parameters.randomness * parameters.radius);
        }
    }

    #[test]
    fn without_randomness_stars_lie_on_the_arms() {
        let parameters = GalaxyParameters {
            count: 300,
            branches: 3,
            spin: 0.0,
            randomness: 0.0,
            ..Default::default()
        };
        let cloud = generate_galaxy(&parameters, &mut seeded());
        for (i, [x, y, z]) in cloud.positions.iter().enumerate() {
            assert_eq!(*y, 0.0);
            let branch = (i % 3) as f32 / 3.0 * TAU;
            let radius = (x * x + z * z).sqrt();
            if radius > 1e-3 {
                assert_relative_eq!(x / radius, branch.cos(), epsilon = 1e-3);
                assert_relative_eq!(z / radius, branch.sin(), epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn colour_fades_from_inside_to_outside() {
        let parameters = GalaxyParameters {
            count: 1000,
            randomness: 0.0,
            inside_color: Color::from_hex(0xffffff),
            outside_color: Color::from_hex(0x000000),
            ..Default::default()
        };
        let cloud = generate_galaxy(&parameters, &mut seeded());
        let colors = cloud.colors.unwrap();
        for ([x, _, z], color) in cloud.positions.iter().zip(&colors) {
            let radius = (x * x + z * z).sqrt();
            let expected = Color::WHITE
                .lerp(&Color::BLACK, radius / parameters.radius)
                .to_linear();
            assert_relative_eq!(color[0], expected[0], epsilon = 1e-4);
        }
        // brighter towards the centre
        let (near, far): (Vec<_>, Vec<_>) = cloud
            .positions
            .iter()
            .zip(&colors)
            .partition(|([x, _, z], _)| (x * x + z * z).sqrt() < parameters.radius / 2.0);
        let mean = |stars: &[(&[f32; 3], &[f32; 3])]| {
            stars.iter().map(|(_, c)| c[0]).sum::<f32>() / stars.len().max(1) as f32
        };
        assert!(mean(&near) > mean(&far));
    }

    #[test]
    fn same_seed_same_galaxy() {
        let parameters = GalaxyParameters::default();
        let a = generate_galaxy(&parameters, &mut seeded());
        let b = generate_galaxy(&parameters, &mut seeded());
        assert_eq!(a, b);
    }

    #[test]
    fn defaults_start_from_the_first_draft() {
        let parameters = GalaxyParameters::default();
        assert_eq!(parameters.count, 1000);
        assert_relative_eq!(parameters.size, 0.02);
        assert_relative_eq!(parameters.radius, 5.0);

        let cube = GalaxyParameters {
            shape: GalaxyShape::Cube,
            ..parameters
        };
        let material = cube.material();
        assert_relative_eq!(material.size, 0.02);
        assert!(material.size_attenuation);
        assert!(!material.depth_write);
        assert_eq!(material.blending, Blending::Additive);
        assert!(!material.vertex_colors);
        assert_eq!(material.color, Color::WHITE);
        assert!(GalaxyParameters::default().material().vertex_colors);
    }

    #[test]
    fn cube_stars_fill_a_cube_of_side_three() {
        let parameters = GalaxyParameters {
            shape: GalaxyShape::Cube,
            radius: 20.0,
            ..Default::default()
        };
        let cloud = generate_galaxy(&parameters, &mut seeded());
        assert_eq!(cloud.len(), 1000);
        assert!(cloud.colors.is_none());
        for position in &cloud.positions {
            assert!(position.iter().all(|c| (-1.5..=1.5).contains(c)));
        }
        // radius plays no part in the cube
        assert_eq!(cloud, generate_cube(1000, &mut seeded()));
    }

    #[test]
    fn count_slider_spans_a_hundred_to_a_million() {
        let (min, max, step) = COUNT_RANGE;
        assert_relative_eq!(snap_clamp(20.0, Some(min), Some(max), Some(step)), 100.0);
        assert_relative_eq!(snap_clamp(1234.0, Some(min), Some(max), Some(step)), 1200.0);
        assert_relative_eq!(snap_clamp(5e6, Some(min), Some(max), Some(step)), 1_000_000.0);
        assert_eq!(panel().len(), 10);
    }

    #[test]
    fn shapes_round_trip_through_the_drop_down() {
        for shape in [GalaxyShape::Cube, GalaxyShape::Spiral] {
            assert_eq!(GalaxyShape::from_index(shape.index()), shape);
        }
        assert_eq!(GalaxyShape::NAMES[GalaxyShape::Cube.index()], "cube");
        assert_eq!(GalaxyShape::from_index(7), GalaxyShape::Spiral);
    }
}
