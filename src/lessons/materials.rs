//! One material shared by a sphere, a plane and a torus, switchable between every
//! material kind. The standard material reflects a cube environment map.

use std::sync::Arc;

use instant::Duration;
use winit::event::{DeviceEvent, WindowEvent};

use crate::{
    clock::Clock,
    color::Color,
    context::{Context, InitContext},
    data_structures::{
        instance::Instance,
        scene_graph::{MaterialId, NodeId},
        texture::{Texture, TextureOptions},
    },
    flow::{FlowConsturctor, GraphicsFlow, Out},
    geometry::{plane, sphere, torus},
    gui::DebugPanel,
    light::Light,
    material::{Material, MaterialKind, MaterialMaps, Side},
    render::Render,
    resources::{CubeTextureLoader, TextureLoader},
    scene::Scene,
};

const ENVIRONMENT: [&str; 6] = [
    "textures/environmentMaps/0/px.jpg",
    "textures/environmentMaps/0/nx.jpg",
    "textures/environmentMaps/0/py.jpg",
    "textures/environmentMaps/0/ny.jpg",
    "textures/environmentMaps/0/pz.jpg",
    "textures/environmentMaps/0/nz.jpg",
];

#[derive(Clone, Debug, Default)]
pub struct LessonTextures {
    pub door_color: Option<Arc<Texture>>,
    pub door_alpha: Option<Arc<Texture>>,
    pub door_ambient_occlusion: Option<Arc<Texture>>,
    pub door_height: Option<Arc<Texture>>,
    pub door_normal: Option<Arc<Texture>>,
    pub door_metalness: Option<Arc<Texture>>,
    pub door_roughness: Option<Arc<Texture>>,
    pub matcap: Option<Arc<Texture>>,
    pub gradient: Option<Arc<Texture>>,
    pub environment: Option<Arc<Texture>>,
}

impl LessonTextures {
    pub async fn load(ctx: &InitContext) -> Self {
        let loader = TextureLoader::new(&ctx.device, &ctx.queue);
        let color = TextureOptions::default();
        let data = TextureOptions::data();
        Self {
            door_color: Some(loader.load("textures/door/color.jpg", color).await),
            door_alpha: Some(loader.load("textures/door/alpha.jpg", data).await),
            door_ambient_occlusion: Some(
                loader
                    .load("textures/door/ambientOcclusion.jpg", data)
                    .await,
            ),
            door_height: Some(loader.load("textures/door/height.jpg", data).await),
            door_normal: Some(loader.load("textures/door/normal.jpg", data).await),
            door_metalness: Some(loader.load("textures/door/metalness.jpg", data).await),
            door_roughness: Some(loader.load("textures/door/roughness.jpg", data).await),
            matcap: Some(loader.load("textures/matcaps/8.png", color).await),
            // nearest filtering keeps the toon bands hard
            gradient: Some(
                loader
                    .load("textures/gradients/5.jpg", color.nearest())
                    .await,
            ),
            environment: CubeTextureLoader::new(&ctx.device, &ctx.queue)
                .load(ENVIRONMENT)
                .await,
        }
    }
}

/// The lesson's setup of each material kind.
pub fn material_for(kind: MaterialKind, textures: &LessonTextures) -> Material {
    match kind {
        MaterialKind::Basic => {
            let mut material = Material::basic(Color::WHITE).with_maps(MaterialMaps {
                map: textures.door_color.clone(),
                alpha_map: textures.door_alpha.clone(),
                ..Default::default()
            });
            material.transparent = true;
            material.side = Side::Double;
            material
        }
        MaterialKind::Normal => {
            let mut material = Material::normal();
            material.flat_shading = true;
            material
        }
        MaterialKind::Matcap => match &textures.matcap {
            Some(matcap) => Material::matcap(matcap.clone()),
            None => Material::new(MaterialKind::Matcap),
        },
        MaterialKind::Depth => Material::depth(),
        MaterialKind::Lambert => Material::lambert(),
        MaterialKind::Phong => {
            let mut material = Material::phong();
            material.shininess = 100.0;
            material.specular = Color::from_hex(0x0000ff);
            material
        }
        MaterialKind::Toon => Material::toon().with_maps(MaterialMaps {
            gradient_map: textures.gradient.clone(),
            ..Default::default()
        }),
        MaterialKind::Standard => {
            let mut material = Material::standard()
                .with_roughness(0.2)
                .with_maps(MaterialMaps {
                    env_map: textures.environment.clone(),
                    ..Default::default()
                });
            material.metalness = 0.7;
            material
        }
    }
}

/// Rotation (x, y) of every object after `t` seconds.
pub fn rotation_at(t: f32) -> [f32; 2] {
    [0.15 * t, 0.5 * t]
}

pub struct MaterialsWorld {
    scene: Scene,
    textures: LessonTextures,
    material: MaterialId,
    kind: MaterialKind,
    objects: [NodeId; 3],
    clock: Clock,
}

impl MaterialsWorld {
    fn new(ctx: &InitContext, textures: LessonTextures) -> Self {
        let mut scene = Scene::new(ctx);
        let kind = MaterialKind::Standard;
        let material = scene.add_material(material_for(kind, &textures));

        let sphere = scene.add_geometry("sphere", &sphere(0.5, 64, 64));
        let plane = scene.add_geometry("plane", &plane(1.0, 1.0, 100, 100));
        let torus = scene.add_geometry("torus", &torus(0.3, 0.2, 64, 128));
        let objects = [
            scene.add_mesh(None, "sphere", sphere, material, Instance::at(-1.5, 0.0, 0.0)),
            scene.add_mesh(None, "plane", plane, material, Instance::new()),
            scene.add_mesh(None, "torus", torus, material, Instance::at(1.5, 0.0, 0.0)),
        ];

        scene.add_light(None, "ambient", Light::ambient(0xffffff, 0.5), Instance::new());
        scene.add_light(
            None,
            "point",
            Light::point(0xffffff, 0.5, 0.0),
            Instance::at(2.0, 3.0, 4.0),
        );

        Self {
            scene,
            textures,
            material,
            kind,
            objects,
            clock: Clock::new(),
        }
    }

    fn property(&self, read: impl Fn(&Material) -> f32) -> f32 {
        self.scene.material(self.material).map_or(0.0, read)
    }

    fn set_property(&mut self, write: impl Fn(&mut Material)) {
        if let Some(material) = self.scene.material_mut(self.material) {
            write(material);
        }
    }

    pub fn kind_index(&self) -> usize {
        MaterialKind::ALL
            .iter()
            .position(|k| *k == self.kind)
            .unwrap_or_default()
    }

    /// Swaps the shared material for the preset of another kind.
    pub fn set_kind_index(&mut self, index: usize) {
        let Some(kind) = MaterialKind::ALL.get(index).copied() else {
            return;
        };
        log::info!("switching to {}", kind.name());
        self.kind = kind;
        self.scene
            .replace_material(self.material, material_for(kind, &self.textures));
    }

    fn animate(&mut self, dt: Duration) {
        let [x, y] = rotation_at(self.clock.advance(dt));
        for object in self.objects {
            let rotation = &mut self.scene[object].transform.rotation;
            rotation.x = x;
            rotation.y = y;
        }
    }
}

pub struct Materials {
    world: MaterialsWorld,
    panel: DebugPanel<MaterialsWorld>,
}

impl Materials {
    pub fn new(ctx: &InitContext, textures: LessonTextures) -> Self {
        let mut panel = DebugPanel::new("Material");
        let names = MaterialKind::ALL.map(|k| k.name());
        panel.add_options(
            "material",
            &names,
            MaterialsWorld::kind_index,
            MaterialsWorld::set_kind_index,
        );
        panel
            .add_number(
                "metalness",
                |w: &MaterialsWorld| w.property(|m| m.metalness),
                |w, v| w.set_property(|m| m.metalness = v),
            )
            .min(0.0)
            .max(1.0)
            .step(0.0001);
        panel
            .add_number(
                "roughness",
                |w: &MaterialsWorld| w.property(|m| m.roughness),
                |w, v| w.set_property(|m| m.roughness = v),
            )
            .min(0.0)
            .max(1.0)
            .step(0.0001);
        panel
            .add_number(
                "aoMapIntensity",
                |w: &MaterialsWorld| w.property(|m| m.ao_map_intensity),
                |w, v| w.set_property(|m| m.ao_map_intensity = v),
            )
            .min(0.0)
            .max(10.0)
            .step(0.0001);
        panel
            .add_number(
                "displacementScale",
                |w: &MaterialsWorld| w.property(|m| m.displacement_scale),
                |w, v| w.set_property(|m| m.displacement_scale = v),
            )
            .min(0.0)
            .max(1.0)
            .step(0.0001);
        Self {
            world: MaterialsWorld::new(ctx, textures),
            panel,
        }
    }
}

pub fn constructor() -> FlowConsturctor<(), ()> {
    Box::new(|ctx| {
        Box::pin(async move {
            let textures = LessonTextures::load(&ctx).await;
            let flow: Box<dyn GraphicsFlow<(), ()>> = Box::new(Materials::new(&ctx, textures));
            flow
        })
    })
}

impl GraphicsFlow<(), ()> for Materials {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        super::look_around(ctx, "Materials", [1.0, 1.0, 2.0]);
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
    fn standard_preset_is_a_shiny_metal() {
        let material = material_for(MaterialKind::Standard, &LessonTextures::default());
        assert_eq!(material.kind, MaterialKind::Standard);
        assert_relative_eq!(material.metalness, 0.7);
        assert_relative_eq!(material.roughness, 0.2);
        assert!(material.maps.env_map.is_none());
    }

    #[test]
    fn every_kind_has_a_preset_of_that_kind() {
        let textures = LessonTextures::default();
        for kind in MaterialKind::ALL {
            assert_eq!(material_for(kind, &textures).kind, kind);
        }
        let basic = material_for(MaterialKind::Basic, &textures);
        assert!(basic.transparent);
        assert_eq!(basic.side, Side::Double);
        assert!(material_for(MaterialKind::Normal, &textures).flat_shading);
    }

    #[test]
    fn objects_turn_faster_around_y() {
        let [x, y] = rotation_at(2.0);
        assert_relative_eq!(x, 0.3);
        assert_relative_eq!(y, 1.0);
    }
}
