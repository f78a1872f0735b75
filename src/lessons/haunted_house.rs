//! A house on a foggy graveyard lit by a weak moon, a door lamp and three ghosts.

use std::f32::consts::{PI, TAU};

use instant::Duration;
use rand::{Rng, SeedableRng, rngs::StdRng};
use winit::event::{DeviceEvent, WindowEvent};

use crate::{
    clock::Clock,
    color::Color,
    context::{Context, InitContext},
    data_structures::{
        instance::Instance,
        scene_graph::{NodeId, NodeKind},
        texture::TextureOptions,
    },
    flow::{FlowConsturctor, GraphicsFlow, Out},
    geometry::{box_geometry, cone, plane, sphere},
    gui::DebugPanel,
    light::{Fog, Light},
    material::{Material, MaterialMaps},
    render::Render,
    resources::TextureLoader,
    scene::Scene,
};

pub const FOG_COLOR: u32 = 0x262837;
pub const GRAVES: usize = 50;

/// Random grave on the ring between radius 3 and 9 around the house, slightly tilted.
pub fn place_grave<R: Rng + ?Sized>(rng: &mut R) -> Instance {
    let angle = rng.r#gen::<f32>() * TAU;
    let radius = 3.0 + rng.r#gen::<f32>() * 6.0;
    let tilt_y = (rng.r#gen::<f32>() - 0.5) * 0.4;
    let tilt_z = (rng.r#gen::<f32>() - 0.5) * 0.4;
    Instance::at(angle.sin() * radius, 0.3, angle.cos() * radius).with_rotation(0.0, tilt_y, tilt_z)
}

pub fn place_graves<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<Instance> {
    (0..count).map(|_| place_grave(rng)).collect()
}

/// Positions of the three ghosts at `t` seconds.
pub fn ghost_positions(t: f32) -> [[f32; 3]; 3] {
    let first = t * 0.5;
    let second = -t * 0.32;
    let third = -t * 0.18;
    [
        [first.cos() * 4.0, (t * 3.0).sin(), first.sin() * 4.0],
        [
            second.cos() * 5.0,
            (t * 4.0).sin() + (t * 2.5).sin(),
            second.sin() * 5.0,
        ],
        [
            third.cos() * (7.0 + (t * 0.32).sin()),
            (t * 4.0).sin() + (t * 2.5).sin(),
            third.sin() * (7.0 + (t * 0.5).sin()),
        ],
    ]
}

/// The bouncing sphere circles the graveyard at radius 7.
pub fn sphere_position(t: f32) -> [f32; 3] {
    [t.cos() * 7.0, (t * 4.0).sin().abs(), t.sin() * 7.0]
}

struct Maps {
    color: &'static str,
    ambient_occlusion: &'static str,
    normal: &'static str,
    roughness: &'static str,
}

async fn load_surface(loader: &TextureLoader<'_>, maps: Maps, repeat: f32) -> MaterialMaps {
    let color = TextureOptions::default().repeated(repeat, repeat);
    let data = TextureOptions::data().repeated(repeat, repeat);
    MaterialMaps {
        map: Some(loader.load(maps.color, color).await),
        ao_map: Some(loader.load(maps.ambient_occlusion, data).await),
        normal_map: Some(loader.load(maps.normal, data).await),
        roughness_map: Some(loader.load(maps.roughness, data).await),
        ..Default::default()
    }
}

pub struct HouseTextures {
    door: MaterialMaps,
    bricks: MaterialMaps,
    grass: MaterialMaps,
}

impl HouseTextures {
    pub async fn load(ctx: &InitContext) -> Self {
        let loader = TextureLoader::new(&ctx.device, &ctx.queue);
        let data = TextureOptions::data();
        let door = MaterialMaps {
            map: Some(
                loader
                    .load("textures/door/color.jpg", TextureOptions::default())
                    .await,
            ),
            alpha_map: Some(loader.load("textures/door/alpha.jpg", data).await),
            ao_map: Some(
                loader
                    .load("textures/door/ambientOcclusion.jpg", data)
                    .await,
            ),
            displacement_map: Some(loader.load("textures/door/height.jpg", data).await),
            normal_map: Some(loader.load("textures/door/normal.jpg", data).await),
            metalness_map: Some(loader.load("textures/door/metalness.jpg", data).await),
            roughness_map: Some(loader.load("textures/door/roughness.jpg", data).await),
            ..Default::default()
        };
        let bricks = Maps {
            color: "textures/bricks/color.jpg",
            ambient_occlusion: "textures/bricks/ambientOcclusion.jpg",
            normal: "textures/bricks/normal.jpg",
            roughness: "textures/bricks/roughness.jpg",
        };
        let grass = Maps {
            color: "textures/grass/color.jpg",
            ambient_occlusion: "textures/grass/ambientOcclusion.jpg",
            normal: "textures/grass/normal.jpg",
            roughness: "textures/grass/roughness.jpg",
        };
        Self {
            door,
            bricks: load_surface(&loader, bricks, 1.0).await,
            grass: load_surface(&loader, grass, 8.0).await,
        }
    }
}

pub struct Graveyard {
    scene: Scene,
    ambient: NodeId,
    moon: NodeId,
    ghosts: [NodeId; 3],
    sphere: NodeId,
    clock: Clock,
}

fn cast_shadow(scene: &mut Scene, node: NodeId) {
    if let Some(mesh) = scene.graph[node].as_mesh_mut() {
        mesh.cast_shadow = true;
    }
}

impl Graveyard {
    fn new<R: Rng + ?Sized>(ctx: &InitContext, textures: HouseTextures, rng: &mut R) -> Self {
        let mut scene = Scene::new(ctx);
        scene.fog = Some(Fog::new(FOG_COLOR, 1.0, 20.0));

        let house = scene.add_group(None, "house", Instance::new());

        let walls_geometry = scene.add_geometry("walls", &box_geometry(4.0, 2.5, 4.0));
        let walls_material = scene.add_material(Material::standard().with_maps(textures.bricks));
        let walls = scene.add_mesh(
            Some(house),
            "walls",
            walls_geometry,
            walls_material,
            Instance::at(0.0, 2.5 / 2.0, 0.0),
        );
        cast_shadow(&mut scene, walls);

        let roof_geometry = scene.add_geometry("roof", &cone(3.5, 1.0, 4));
        let roof_material = scene.add_material(Material::standard().with_color(0xb35f45));
        scene.add_mesh(
            Some(house),
            "roof",
            roof_geometry,
            roof_material,
            Instance::at(0.0, 2.5 + 0.5, 0.0).with_rotation(0.0, PI * 0.25, 0.0),
        );

        let door_geometry = scene.add_geometry("door", &plane(2.2, 2.2, 100, 100));
        let mut door_material = Material::standard().with_maps(textures.door);
        door_material.transparent = true;
        door_material.displacement_scale = 0.1;
        let door_material = scene.add_material(door_material);
        scene.add_mesh(
            Some(house),
            "door",
            door_geometry,
            door_material,
            Instance::at(0.0, 1.0, 2.0 + 0.01),
        );

        let bush_geometry = scene.add_geometry("bush", &sphere(1.0, 16, 16));
        let bush_material = scene.add_material(Material::standard().with_color(0x89c854));
        let bushes = [
            (0.5, [1.0, 0.1, 2.2]),
            (0.25, [1.4, 0.1, 2.1]),
            (0.4, [-1.4, 0.1, 2.2]),
            (0.15, [-1.3, 0.05, 2.6]),
        ];
        for (scale, [x, y, z]) in bushes {
            let bush = scene.add_mesh(
                Some(house),
                "bush",
                bush_geometry,
                bush_material,
                Instance::at(x, y, z).with_scale(scale),
            );
            cast_shadow(&mut scene, bush);
        }

        scene.add_light(
            Some(house),
            "door light",
            Light::point(0xff7d46, 1.0, 7.0).with_shadow(256, 7.0),
            Instance::at(0.0, 2.2, 2.7),
        );

        let graves = scene.add_group(None, "graves", Instance::new());
        let grave_geometry = scene.add_geometry("grave", &box_geometry(0.6, 0.8, 0.2));
        let grave_material = scene.add_material(Material::standard().with_color(0xb2b6b1));
        for placement in place_graves(rng, GRAVES) {
            let grave = scene.add_mesh(
                Some(graves),
                "grave",
                grave_geometry,
                grave_material,
                placement,
            );
            cast_shadow(&mut scene, grave);
        }

        let sphere_geometry = scene.add_geometry("sphere", &sphere(1.0, 32, 32));
        let sphere_material = scene.add_material(Material::standard().with_roughness(0.7));
        let sphere = scene.add_mesh(
            None,
            "sphere",
            sphere_geometry,
            sphere_material,
            Instance::at(0.0, 1.0, 0.0),
        );

        let floor_geometry = scene.add_geometry("floor", &plane(20.0, 20.0, 1, 1));
        let floor_material = scene.add_material(Material::standard().with_maps(textures.grass));
        let floor = scene.add_mesh(
            None,
            "floor",
            floor_geometry,
            floor_material,
            Instance::new().with_rotation(-PI * 0.5, 0.0, 0.0),
        );
        if let Some(mesh) = scene.graph[floor].as_mesh_mut() {
            mesh.receive_shadow = true;
        }

        // without a leading '#' the style is not a colour and falls back to white
        let ambient = scene.add_light(
            None,
            "ambient",
            Light::ambient(Color::from_style("b9d5ff"), 0.12),
            Instance::new(),
        );

        let moon = Light::directional(Color::from_style("#b9d5ff"), 0.12).with_shadow(256, 15.0);
        let moon = scene.add_light(None, "moon", moon, Instance::at(4.0, 5.0, -2.0));

        let ghost_colors = ["#ff00ff", "#00ffff", "#ffff00"];
        let ghosts = ghost_colors.map(|color| {
            scene.add_light(
                None,
                "ghost",
                Light::point(Color::from_style(color), 2.0, 3.0).with_shadow(256, 7.0),
                Instance::new(),
            )
        });

        Self {
            scene,
            ambient,
            moon,
            ghosts,
            sphere,
            clock: Clock::new(),
        }
    }

    fn intensity(&self, light: NodeId) -> f32 {
        match &self.scene[light].kind {
            NodeKind::Light(light) => light.intensity(),
            _ => 0.0,
        }
    }

    fn set_intensity(&mut self, light: NodeId, intensity: f32) {
        if let Some(light) = self.scene.light_mut(light) {
            light.set_intensity(intensity);
        }
    }

    fn moon_position(&self, axis: usize) -> f32 {
        self.scene[self.moon].transform.position[axis]
    }

    fn set_moon_position(&mut self, axis: usize, value: f32) {
        self.scene[self.moon].transform.position[axis] = value;
    }

    fn animate(&mut self, dt: Duration) {
        let t = self.clock.advance(dt);
        for (ghost, [x, y, z]) in self.ghosts.into_iter().zip(ghost_positions(t)) {
            self.scene[ghost].transform.position = [x, y, z].into();
        }
        self.scene[self.sphere].transform.position = sphere_position(t).into();
    }
}

pub struct HauntedHouse {
    world: Graveyard,
    panel: DebugPanel<Graveyard>,
}

impl HauntedHouse {
    /// Graves are scattered with `rng`.
    pub fn new<R: Rng + ?Sized>(ctx: &InitContext, textures: HouseTextures, rng: &mut R) -> Self {
        let world = Graveyard::new(ctx, textures, rng);

        let mut panel = DebugPanel::new("Haunted house");
        let ambient = world.ambient;
        panel
            .add_number(
                "intensity",
                move |w: &Graveyard| w.intensity(ambient),
                move |w, v| w.set_intensity(ambient, v),
            )
            .min(0.0)
            .max(1.0)
            .step(0.001)
            .name("ambient intensity");
        let moon = world.moon;
        panel
            .add_number(
                "intensity",
                move |w: &Graveyard| w.intensity(moon),
                move |w, v| w.set_intensity(moon, v),
            )
            .min(0.0)
            .max(1.0)
            .step(0.001)
            .name("moon intensity");
        for (axis, name) in ["x", "y", "z"].into_iter().enumerate() {
            panel
                .add_number(
                    name,
                    move |w: &Graveyard| w.moon_position(axis),
                    move |w, v| w.set_moon_position(axis, v),
                )
                .min(-5.0)
                .max(5.0)
                .step(0.001);
        }

        Self { world, panel }
    }
}

pub fn constructor() -> FlowConsturctor<(), ()> {
    Box::new(|ctx| {
        Box::pin(async move {
            let textures = HouseTextures::load(&ctx).await;
            let flow: Box<dyn GraphicsFlow<(), ()>> =
                Box::new(HauntedHouse::new(&ctx, textures, &mut StdRng::from_entropy()));
            flow
        })
    })
}

impl GraphicsFlow<(), ()> for HauntedHouse {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        super::look_around(ctx, "Haunted house", [4.0, 2.0, 5.0]);
        ctx.set_clear_color(Color::from_hex(FOG_COLOR));
        ctx.shadows.enabled = true;
        Out::Empty
    }

    fn on_update(&mut self, _: &Context, _: &mut (), dt: Duration) -> Out<(), ()> {
        self.world.animate(dt);
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

    #[test]
    fn graves_stay_on_the_ring_around_the_house() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..GRAVES * 4 {
            let grave = place_grave(&mut rng);
            let p = grave.position;
            let distance = (p.x * p.x + p.z * p.z).sqrt();
            assert!((3.0..=9.0).contains(&distance), "grave at distance {distance}");
            assert_relative_eq!(p.y, 0.3);
            assert_relative_eq!(grave.rotation.x, 0.0);
            assert!(grave.rotation.y.abs() <= 0.2);
            assert!(grave.rotation.z.abs() <= 0.2);
        }
    }

    #[test]
    fn graves_are_reproducible_with_a_seed() {
        let a = place_grave(&mut StdRng::seed_from_u64(3));
        let b = place_grave(&mut StdRng::seed_from_u64(3));
        assert_eq!(a.position, b.position);
        assert_eq!(a.rotation, b.rotation);
    }

    #[test]
    fn seeded_graveyards_match() {
        let first = place_graves(&mut StdRng::seed_from_u64(11), GRAVES);
        let second = place_graves(&mut StdRng::seed_from_u64(11), GRAVES);
        assert_eq!(first.len(), GRAVES);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.position, b.position);
            assert_eq!(a.rotation, b.rotation);
        }
        let other = place_graves(&mut StdRng::seed_from_u64(12), GRAVES);
        assert!(first.iter().zip(&other).any(|(a, b)| a.position != b.position));
    }

    #[test]
    fn ghosts_start_on_their_orbits() {
        let [first, second, third] = ghost_positions(0.0);
        assert_relative_eq!(first[0], 4.0);
        assert_relative_eq!(second[0], 5.0);
        assert_relative_eq!(third[0], 7.0);
        for ghost in [first, second, third] {
            assert_relative_eq!(ghost[1], 0.0);
            assert_relative_eq!(ghost[2], 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn first_ghost_keeps_its_radius() {
        for t in [0.3, 1.7, 12.0, 100.0] {
            let [[x, y, z], ..] = ghost_positions(t);
            assert_relative_eq!((x * x + z * z).sqrt(), 4.0, epsilon = 1e-4);
            assert!(y.abs() <= 1.0);
        }
    }

    #[test]
    fn sphere_bounces_above_the_floor() {
        for t in [0.0, 0.2, 0.9, 3.3] {
            let [x, y, z] = sphere_position(t);
            assert!(y >= 0.0 && y <= 1.0);
            assert_relative_eq!((x * x + z * z).sqrt(), 7.0, epsilon = 1e-4);
        }
    }
}
