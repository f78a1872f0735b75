//! Render composition and draw batching.
//!
//! Flows describe what to draw by returning a [`Render`]. Each frame the scenes found in
//! it are turned into a [`ScenePlan`] (a pure function of the scene graph, see [`plan`])
//! and then drawn by the [`SceneRenderer`]:
//!
//! 1. shadow passes for the first shadow casting directional light of every scene and
//!    six more (one per cube face) for each shadow casting point light
//! 2. opaque batches, instanced by geometry, material and wireframe
//! 3. transparent meshes, back to front
//! 4. particle clouds

use std::{collections::HashMap, ops::Range};

use cgmath::{InnerSpace, Matrix4, Point3, SquareMatrix, Vector3};
use slotmap::SecondaryMap;

use crate::{
    camera::CameraResources,
    data_structures::{
        instance::InstanceRaw,
        model::DrawMesh,
        scene_graph::{GeometryId, MaterialId, NodeId, NodeKind, PointsId, SceneGraph},
        texture::Texture,
    },
    light::{
        DirectionalLight, Light, LightsUniform, MAX_DIRECTIONAL_LIGHTS, MAX_POINT_LIGHTS,
        MAX_POINT_SHADOWS, PointLight, point_shadow_layer,
    },
    material::{Blending, Material, PointsMaterial},
    pipelines::{Layouts, PipelineCache, PipelineKey, Topology},
    scene::Scene,
};

/// What a flow wants drawn this frame.
pub enum Render<'a> {
    None,
    Scene(&'a Scene),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    fn collect_scenes(self, scenes: &mut Vec<&'a Scene>) {
        match self {
            Render::None => (),
            Render::Scene(scene) => scenes.push(scene),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.collect_scenes(scenes)),
        }
    }
}

impl<'a> From<&'a Scene> for Render<'a> {
    fn from(scene: &'a Scene) -> Self {
        Render::Scene(scene)
    }
}

/// Shadow maps are rendered only while enabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShadowSettings {
    pub enabled: bool,
}

/// Meshes sharing geometry, material and wireframe mode, drawn with one call.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshBatch {
    pub key: PipelineKey,
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub wireframe: bool,
    /// Into the frame's instance buffer.
    pub instances: Range<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PointsDraw {
    pub key: PipelineKey,
    pub points: PointsId,
    pub world: Matrix4<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShadowBatch {
    pub geometry: GeometryId,
    pub instances: Range<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct ScenePlan {
    pub opaque: Vec<MeshBatch>,
    pub transparent: Vec<MeshBatch>,
    pub points: Vec<PointsDraw>,
    pub shadow_casters: Vec<ShadowBatch>,
    /// Visible lights with their world positions.
    pub lights: Vec<(Light, Vector3<f32>)>,
}

impl ScenePlan {
    pub fn pipeline_keys(&self) -> impl Iterator<Item = PipelineKey> + '_ {
        self.opaque
            .iter()
            .chain(self.transparent.iter())
            .map(|batch| batch.key)
            .chain(self.points.iter().map(|draw| draw.key))
    }

    /// The first shadow casting directional light that fits into the lights uniform,
    /// with its index among the directional lights.
    pub fn shadow_light(&self) -> Option<(u32, &DirectionalLight, Vector3<f32>)> {
        self.lights
            .iter()
            .filter_map(|(light, position)| match light {
                Light::Directional(directional) => Some((directional, *position)),
                _ => None,
            })
            .take(MAX_DIRECTIONAL_LIGHTS)
            .enumerate()
            .find(|(_, (light, _))| light.cast_shadow)
            .map(|(i, (light, position))| (i as u32, light, position))
    }

    /// Shadow casting point lights that fit into the lights uniform, with their index
    /// among the point lights. Their position in the iteration is their shadow slot.
    pub fn point_shadow_lights(&self) -> impl Iterator<Item = (usize, &PointLight, Vector3<f32>)> {
        self.lights
            .iter()
            .filter_map(|(light, position)| match light {
                Light::Point(point) => Some((point, *position)),
                _ => None,
            })
            .take(MAX_POINT_LIGHTS)
            .enumerate()
            .filter(|(_, (light, _))| light.cast_shadow)
            .take(MAX_POINT_SHADOWS)
            .map(|(i, (light, position))| (i, light, position))
    }
}

pub fn mesh_key(material: &Material) -> PipelineKey {
    PipelineKey::Mesh {
        topology: if material.wireframe {
            Topology::Lines
        } else {
            Topology::Triangles
        },
        side: material.side,
        blending: blending(material.transparent, material.blending),
        depth_write: material.depth_write,
    }
}

pub fn points_key(material: &PointsMaterial) -> PipelineKey {
    PipelineKey::Points {
        blending: blending(material.transparent, material.blending),
        depth_write: material.depth_write,
    }
}

fn blending(transparent: bool, blending: Blending) -> Option<Blending> {
    match (transparent, blending) {
        (true, blending) => Some(blending),
        (false, Blending::Additive) => Some(Blending::Additive),
        (false, Blending::Normal) => None,
    }
}

/// Turns the visible part of `graph` into draw batches, appending per-instance data to
/// `instances`. World matrices are computed here from the local transforms, so the
/// graph's cached world matrices do not have to be current.
pub fn plan<'m, M, P>(
    graph: &SceneGraph,
    material_of: M,
    points_material_of: P,
    eye: Point3<f32>,
    instances: &mut Vec<InstanceRaw>,
) -> ScenePlan
where
    M: Fn(MaterialId) -> Option<&'m Material>,
    P: Fn(PointsId) -> Option<&'m PointsMaterial>,
{
    let mut plan = ScenePlan::default();
    let mut worlds: SecondaryMap<NodeId, Matrix4<f32>> = SecondaryMap::new();
    let mut opaque: Vec<((GeometryId, MaterialId, bool), PipelineKey, Vec<InstanceRaw>)> =
        Vec::new();
    let mut opaque_index: HashMap<(GeometryId, MaterialId, bool), usize> = HashMap::new();
    let mut transparent: Vec<(f32, MeshBatch, InstanceRaw)> = Vec::new();
    let mut casters: Vec<(GeometryId, Vec<InstanceRaw>)> = Vec::new();

    for (id, node) in graph.visible_nodes() {
        let parent = node
            .parent()
            .and_then(|p| worlds.get(p).copied())
            .unwrap_or_else(Matrix4::identity);
        let world = &parent * &node.transform;
        worlds.insert(id, world);

        match &node.kind {
            NodeKind::Group => (),
            NodeKind::Light(light) => plan.lights.push((light.clone(), world.w.truncate())),
            NodeKind::Points(points) => match points_material_of(*points) {
                Some(material) => plan.points.push(PointsDraw {
                    key: points_key(material),
                    points: *points,
                    world,
                }),
                None => log::debug!("{} has no particles", node.name),
            },
            NodeKind::Mesh(mesh) => {
                let Some(material) = material_of(mesh.material) else {
                    log::debug!("{} has no material", node.name);
                    continue;
                };
                let raw = InstanceRaw::new(world, mesh.receive_shadow);
                if mesh.cast_shadow {
                    match casters.iter_mut().find(|(g, _)| *g == mesh.geometry) {
                        Some((_, list)) => list.push(raw),
                        None => casters.push((mesh.geometry, vec![raw])),
                    }
                }
                let key = mesh_key(material);
                if material.is_transparent() {
                    let distance = (world.w.truncate() - eye_vec(eye)).magnitude2();
                    transparent.push((
                        distance,
                        MeshBatch {
                            key,
                            geometry: mesh.geometry,
                            material: mesh.material,
                            wireframe: material.wireframe,
                            instances: 0..0,
                        },
                        raw,
                    ));
                } else {
                    let batch = (mesh.geometry, mesh.material, material.wireframe);
                    match opaque_index.get(&batch) {
                        Some(i) => opaque[*i].2.push(raw),
                        None => {
                            opaque_index.insert(batch, opaque.len());
                            opaque.push((batch, key, vec![raw]));
                        }
                    }
                }
            }
        }
    }

    for ((geometry, material, wireframe), key, raws) in opaque {
        plan.opaque.push(MeshBatch {
            key,
            geometry,
            material,
            wireframe,
            instances: push_all(instances, raws),
        });
    }

    transparent.sort_by(|a, b| b.0.total_cmp(&a.0));
    for (_, mut batch, raw) in transparent {
        batch.instances = push_all(instances, vec![raw]);
        plan.transparent.push(batch);
    }

    for (geometry, raws) in casters {
        plan.shadow_casters.push(ShadowBatch {
            geometry,
            instances: push_all(instances, raws),
        });
    }
    plan
}

fn eye_vec(eye: Point3<f32>) -> Vector3<f32> {
    Vector3::new(eye.x, eye.y, eye.z)
}

fn push_all(instances: &mut Vec<InstanceRaw>, raws: Vec<InstanceRaw>) -> Range<u32> {
    let start = instances.len() as u32;
    instances.extend(raws);
    start..instances.len() as u32
}

/// Colour and depth attachments of one frame.
pub struct FrameTarget<'t> {
    pub color: &'t wgpu::TextureView,
    pub depth: &'t wgpu::TextureView,
    pub clear: wgpu::Color,
}

/// Owns the pipelines and the shared instance buffer.
#[derive(Debug)]
pub struct SceneRenderer {
    pipelines: PipelineCache,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
}

impl SceneRenderer {
    const INITIAL_INSTANCES: usize = 256;

    pub fn new(device: &wgpu::Device, layouts: &Layouts, color_format: wgpu::TextureFormat) -> Self {
        Self {
            pipelines: PipelineCache::new(device, layouts, color_format),
            instance_buffer: instance_buffer(device, Self::INITIAL_INSTANCES),
            instance_capacity: Self::INITIAL_INSTANCES,
        }
    }

    pub fn instance_capacity(&self) -> usize {
        self.instance_capacity
    }

    fn reserve(&mut self, device: &wgpu::Device, needed: usize) {
        if needed <= self.instance_capacity {
            return;
        }
        let capacity = needed.next_power_of_two();
        log::debug!("growing instance buffer to {capacity}");
        self.instance_buffer.destroy();
        self.instance_buffer = instance_buffer(device, capacity);
        self.instance_capacity = capacity;
    }

    /// Uploads every uniform the frame needs and records the shadow and main passes.
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        camera: &CameraResources,
        shadows: ShadowSettings,
        target: FrameTarget<'_>,
        render: Render<'_>,
    ) {
        let mut scenes = Vec::new();
        render.collect_scenes(&mut scenes);

        let mut instances = Vec::new();
        let plans: Vec<ScenePlan> = scenes
            .iter()
            .map(|scene| {
                plan(
                    &scene.graph,
                    |id| scene.material(id),
                    |id| scene.gpu_points(id).map(|p| &p.material),
                    camera.camera.position,
                    &mut instances,
                )
            })
            .collect();

        self.reserve(device, instances.len());
        if !instances.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }

        let mut shadowed: Vec<(usize, Vec<usize>)> = Vec::new();
        for (i, (scene, plan)) in scenes.iter().zip(&plans).enumerate() {
            scene.write_material_uniforms();
            plan.points
                .iter()
                .for_each(|draw| scene.write_points_uniform(draw.points, draw.world));
            let mut lights = LightsUniform::collect(
                plan.lights.iter().map(|(light, position)| (light, *position)),
                scene.fog.as_ref(),
            );
            if shadows.enabled {
                let layers = write_shadow_cameras(scene, plan, &mut lights);
                if !layers.is_empty() {
                    shadowed.push((i, layers));
                }
            }
            scene.write_lights(&lights);
            plan.pipeline_keys()
                .for_each(|key| self.pipelines.prepare(device, key));
        }
        if !shadowed.is_empty() {
            self.pipelines.prepare(device, PipelineKey::Shadow);
        }

        for (i, layers) in shadowed {
            let (scene, plan) = (scenes[i], &plans[i]);
            for layer in layers {
                self.shadow_pass(encoder, scene, plan, layer);
            }
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(target.clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        for (scene, plan) in scenes.iter().zip(&plans) {
            render_pass.set_bind_group(1, &camera.bind_group, &[]);
            render_pass.set_bind_group(2, scene.lights_bind_group(), &[]);
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            for batch in plan.opaque.iter().chain(plan.transparent.iter()) {
                let (Some(pipeline), Some(mesh), Some(material)) = (
                    self.pipelines.get(&batch.key),
                    scene.mesh(batch.geometry),
                    scene.gpu_material(batch.material),
                ) else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &material.bind_group, &[]);
                render_pass.draw_mesh_instanced(mesh, batch.wireframe, batch.instances.clone());
            }
            for draw in &plan.points {
                let (Some(pipeline), Some(points)) =
                    (self.pipelines.get(&draw.key), scene.gpu_points(draw.points))
                else {
                    continue;
                };
                if points.num_particles == 0 {
                    continue;
                }
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &points.bind_group, &[]);
                render_pass.set_vertex_buffer(0, points.vertex_buffer.slice(..));
                render_pass.draw(0..6, 0..points.num_particles);
            }
        }
    }

    fn shadow_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        scene: &Scene,
        plan: &ScenePlan,
        layer: usize,
    ) {
        let target = scene.shadow_target();
        let (Some(pipeline), Some(view), Some(camera)) = (
            self.pipelines.get(&PipelineKey::Shadow),
            target.layers.get(layer),
            target.cameras.get(layer),
        ) else {
            return;
        };
        let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        shadow_pass.set_pipeline(pipeline);
        shadow_pass.set_bind_group(0, &camera.bind_group, &[]);
        shadow_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        for batch in &plan.shadow_casters {
            if let Some(mesh) = scene.mesh(batch.geometry) {
                shadow_pass.draw_mesh_instanced(mesh, false, batch.instances.clone());
            }
        }
    }
}

/// Uploads the light cameras of every shadow map the plan needs and points `lights` at
/// them. Returns the shadow map layers to render.
fn write_shadow_cameras(scene: &Scene, plan: &ScenePlan, lights: &mut LightsUniform) -> Vec<usize> {
    let mut layers = Vec::new();
    if let Some((index, light, position)) = plan.shadow_light() {
        let view_proj = light.shadow_view_proj(position);
        if scene.write_shadow_camera(0, view_proj) {
            lights.set_shadow(view_proj, &light.shadow, index);
            layers.push(0);
        }
    }
    for (slot, (index, light, position)) in plan.point_shadow_lights().enumerate() {
        let faces = light.shadow_view_projs(position);
        let first = point_shadow_layer(slot);
        let written = faces
            .iter()
            .enumerate()
            .all(|(face, view_proj)| scene.write_shadow_camera(first + face, *view_proj));
        if written {
            lights.set_point_shadow(index, slot, &faces, &light.shadow);
            layers.extend(first..first + 6);
        }
    }
    layers
}

fn instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Recreates the depth attachment after a resize.
pub(crate) fn depth_texture(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> Texture {
    Texture::create_depth_texture(device, [config.width, config.height], "depth_texture")
}

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;
    use crate::{
        data_structures::{instance::Instance, scene_graph::MeshNode},
        material::Side,
    };

    struct Fixture {
        graph: SceneGraph,
        materials: SlotMap<MaterialId, Material>,
        points: SlotMap<PointsId, PointsMaterial>,
        geometries: SlotMap<GeometryId, ()>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                graph: SceneGraph::new(),
                materials: SlotMap::with_key(),
                points: SlotMap::with_key(),
                geometries: SlotMap::with_key(),
            }
        }

        fn mesh(
            &mut self,
            parent: Option<NodeId>,
            geometry: GeometryId,
            material: MaterialId,
            at: Instance,
        ) -> NodeId {
            let kind = NodeKind::Mesh(MeshNode {
                geometry,
                material,
                cast_shadow: false,
                receive_shadow: false,
            });
            self.graph.add(parent, "mesh", kind, at)
        }

        fn plan(&self, eye: Point3<f32>, instances: &mut Vec<InstanceRaw>) -> ScenePlan {
            plan(
                &self.graph,
                |id| self.materials.get(id),
                |id| self.points.get(id),
                eye,
                instances,
            )
        }
    }

    #[test]
    fn shared_geometry_and_material_are_instanced() {
        let mut f = Fixture::new();
        let grave = f.geometries.insert(());
        let stone = f.materials.insert(Material::standard());
        for i in 0..50 {
            f.mesh(None, grave, stone, Instance::at(i as f32, 0.3, 0.0));
        }
        let mut instances = Vec::new();
        let plan = f.plan(Point3::new(0.0, 0.0, 5.0), &mut instances);
        assert_eq!(plan.opaque.len(), 1);
        assert_eq!(plan.opaque[0].instances, 0..50);
        assert_eq!(instances.len(), 50);
        assert!(plan.transparent.is_empty());
    }

    #[test]
    fn wireframe_splits_batches() {
        let mut f = Fixture::new();
        let cube = f.geometries.insert(());
        let solid = f.materials.insert(Material::basic(0xff0000));
        let mut wire = Material::basic(0xff0000);
        wire.wireframe = true;
        let wire = f.materials.insert(wire);
        f.mesh(None, cube, solid, Instance::new());
        f.mesh(None, cube, wire, Instance::new());
        let plan = f.plan(Point3::new(0.0, 0.0, 3.0), &mut Vec::new());
        assert_eq!(plan.opaque.len(), 2);
        assert!(matches!(
            plan.opaque[1].key,
            PipelineKey::Mesh {
                topology: Topology::Lines,
                ..
            }
        ));
    }

    #[test]
    fn transparent_meshes_are_sorted_back_to_front() {
        let mut f = Fixture::new();
        let quad = f.geometries.insert(());
        let mut glass = Material::basic(0xffffff);
        glass.transparent = true;
        glass.side = Side::Double;
        let glass = f.materials.insert(glass);
        let near = f.mesh(None, quad, glass, Instance::at(0.0, 0.0, 2.0));
        let far = f.mesh(None, quad, glass, Instance::at(0.0, 0.0, -2.0));
        let mut instances = Vec::new();
        let plan = f.plan(Point3::new(0.0, 0.0, 5.0), &mut instances);
        assert_eq!(plan.transparent.len(), 2);
        let first = &instances[plan.transparent[0].instances.start as usize];
        let second = &instances[plan.transparent[1].instances.start as usize];
        assert_eq!(first.translation().z, f.graph[far].transform.position.z);
        assert_eq!(second.translation().z, f.graph[near].transform.position.z);
        assert!(matches!(
            plan.transparent[0].key,
            PipelineKey::Mesh {
                blending: Some(Blending::Normal),
                side: Side::Double,
                ..
            }
        ));
    }

    #[test]
    fn hidden_groups_and_children_are_skipped() {
        let mut f = Fixture::new();
        let cube = f.geometries.insert(());
        let red = f.materials.insert(Material::basic(0xff0000));
        let group = f.graph.add(None, "group", NodeKind::Group, Instance::at(0.0, 1.0, 0.0));
        f.mesh(Some(group), cube, red, Instance::at(1.0, 0.0, 0.0));
        let mut instances = Vec::new();
        let plan = f.plan(Point3::new(0.0, 0.0, 3.0), &mut instances);
        assert_eq!(instances[0].translation(), Vector3::new(1.0, 1.0, 0.0));
        assert_eq!(plan.opaque.len(), 1);

        f.graph[group].visible = false;
        let plan = f.plan(Point3::new(0.0, 0.0, 3.0), &mut Vec::new());
        assert!(plan.opaque.is_empty());
    }

    #[test]
    fn lights_and_shadow_casters_are_collected() {
        let mut f = Fixture::new();
        let wall = f.geometries.insert(());
        let brick = f.materials.insert(Material::standard());
        let mut moon = Light::directional(0xb9d5ff, 0.12);
        if let Light::Directional(l) = &mut moon {
            l.cast_shadow = true;
        }
        f.graph.add(None, "ambient", NodeKind::Light(Light::ambient(0xffffff, 0.12)), Instance::new());
        f.graph.add(None, "moon", NodeKind::Light(moon), Instance::at(4.0, 5.0, -2.0));
        let walls = f.mesh(None, wall, brick, Instance::at(0.0, 1.25, 0.0));
        if let Some(mesh) = f.graph[walls].as_mesh_mut() {
            mesh.cast_shadow = true;
        }
        let mut instances = Vec::new();
        let plan = f.plan(Point3::new(4.0, 2.0, 5.0), &mut instances);
        assert_eq!(plan.lights.len(), 2);
        let (index, _, position) = plan.shadow_light().expect("moon casts shadows");
        assert_eq!(index, 0);
        assert_eq!(position, Vector3::new(4.0, 5.0, -2.0));
        assert_eq!(plan.shadow_casters.len(), 1);
        assert_eq!(plan.shadow_casters[0].instances, 1..2);
        assert_eq!(instances.len(), 2);
    }

    #[test]
    fn shadow_casting_point_lights_get_slots() {
        let mut f = Fixture::new();
        let house = f.graph.add(None, "house", NodeKind::Group, Instance::at(1.0, 0.0, 0.0));
        let door = Light::point(0xff7d46, 1.0, 7.0).with_shadow(256, 7.0);
        f.graph.add(Some(house), "door light", NodeKind::Light(door), Instance::at(0.0, 2.2, 2.7));
        f.graph.add(None, "lamp", NodeKind::Light(Light::point(0xffffff, 1.0, 0.0)), Instance::new());
        for _ in 0..4 {
            let ghost = Light::point(0xff00ff, 2.0, 3.0).with_shadow(256, 7.0);
            f.graph.add(None, "ghost", NodeKind::Light(ghost), Instance::new());
        }
        let plan = f.plan(Point3::new(4.0, 2.0, 5.0), &mut Vec::new());
        let slots: Vec<usize> = plan.point_shadow_lights().map(|(index, _, _)| index).collect();
        // the lamp casts nothing and the last ghost is past the shadow limit
        assert_eq!(slots, vec![0, 2, 3, 4]);
        let (_, door, position) = plan.point_shadow_lights().next().expect("door light");
        assert_eq!(door.shadow.map_size, 256);
        assert_eq!(position, Vector3::new(1.0, 2.2, 2.7));
        assert!(plan.shadow_light().is_none());
    }

    #[test]
    fn point_lights_past_the_uniform_cast_no_shadows() {
        let mut f = Fixture::new();
        for _ in 0..MAX_POINT_LIGHTS {
            f.graph.add(None, "lamp", NodeKind::Light(Light::point(0xffffff, 1.0, 0.0)), Instance::new());
        }
        let late = Light::point(0xffffff, 1.0, 0.0).with_shadow(256, 7.0);
        f.graph.add(None, "late", NodeKind::Light(late), Instance::new());
        let plan = f.plan(Point3::new(0.0, 0.0, 3.0), &mut Vec::new());
        assert_eq!(plan.point_shadow_lights().count(), 0);
    }

    #[test]
    fn additive_points_are_blended_without_depth_writes() {
        let mut f = Fixture::new();
        let material = PointsMaterial {
            depth_write: false,
            blending: Blending::Additive,
            ..Default::default()
        };
        let id = f.points.insert(material);
        f.graph.add(None, "particles", NodeKind::Points(id), Instance::new());
        let plan = f.plan(Point3::new(0.0, 0.0, 3.0), &mut Vec::new());
        assert_eq!(
            plan.points[0].key,
            PipelineKey::Points {
                blending: Some(Blending::Additive),
                depth_write: false
            }
        );
        assert_eq!(plan.pipeline_keys().count(), 1);
    }

    #[test]
    fn composed_renders_flatten() {
        let mut scenes = Vec::new();
        Render::Composed(vec![Render::None, Render::Composed(vec![])]).collect_scenes(&mut scenes);
        assert!(scenes.is_empty());
    }
}
