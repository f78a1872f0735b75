//! A scene: the node graph plus the GPU resources its nodes refer to.
//!
//! GPU objects are created as soon as something is added, so rendering only has to
//! upload uniforms. Geometries and materials can be shared by any number of meshes.

use std::{
    ops::{Index, IndexMut},
    sync::Arc,
};

use slotmap::SlotMap;
use wgpu::util::DeviceExt;

use crate::{
    camera::CameraUniform,
    context::InitContext,
    data_structures::{
        instance::Instance,
        model::Mesh,
        scene_graph::{
            GeometryId, MaterialId, MeshNode, Node, NodeId, NodeKind, PointsId, SceneGraph,
        },
        texture::Texture,
    },
    geometry::{Geometry, PointCloud},
    light::{Fog, Light, LightsUniform, SHADOW_LAYERS},
    material::{Material, MaterialUniform, PointsMaterial, PointsUniform},
    pipelines::Layouts,
    resources::texture::DefaultTextures,
};

#[derive(Debug)]
pub(crate) struct GpuMaterial {
    pub(crate) material: Material,
    pub(crate) buffer: wgpu::Buffer,
    pub(crate) bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
pub(crate) struct GpuPoints {
    pub(crate) cloud: PointCloud,
    pub(crate) material: PointsMaterial,
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) num_particles: u32,
    pub(crate) uniform_buffer: wgpu::Buffer,
    pub(crate) bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
pub(crate) struct ShadowCamera {
    pub(crate) buffer: wgpu::Buffer,
    pub(crate) bind_group: wgpu::BindGroup,
}

/// Depth array of all shadow maps, with one attachment and light camera per layer.
#[derive(Debug)]
pub(crate) struct ShadowTarget {
    pub(crate) map: Texture,
    pub(crate) layers: Vec<wgpu::TextureView>,
    pub(crate) cameras: Vec<ShadowCamera>,
}

impl ShadowTarget {
    fn new(device: &wgpu::Device, layouts: &Layouts, size: u32) -> Self {
        let cameras = (0..SHADOW_LAYERS)
            .map(|layer| {
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("Shadow Camera Buffer {layer}")),
                    contents: bytemuck::cast_slice(&[CameraUniform::new()]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    layout: &layouts.camera,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                    label: Some("shadow_camera_bind_group"),
                });
                ShadowCamera { buffer, bind_group }
            })
            .collect();
        let (map, layers) = shadow_maps(device, size);
        Self {
            map,
            layers,
            cameras,
        }
    }

    fn size(&self) -> u32 {
        self.map.texture.width()
    }
}

fn shadow_maps(device: &wgpu::Device, size: u32) -> (Texture, Vec<wgpu::TextureView>) {
    let map = Texture::create_depth_array(device, [size, size], SHADOW_LAYERS, "shadow_map");
    let layers = (0..SHADOW_LAYERS).map(|layer| map.layer_view(layer)).collect();
    (map, layers)
}

#[derive(Debug)]
pub struct Scene {
    pub graph: SceneGraph,
    pub fog: Option<Fog>,
    geometries: SlotMap<GeometryId, Mesh>,
    materials: SlotMap<MaterialId, GpuMaterial>,
    points: SlotMap<PointsId, GpuPoints>,
    lights_buffer: wgpu::Buffer,
    lights_bind_group: wgpu::BindGroup,
    shadow: ShadowTarget,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    layouts: Arc<Layouts>,
    defaults: Arc<DefaultTextures>,
}

impl Scene {
    pub fn new(ctx: &InitContext) -> Self {
        let device = ctx.device.clone();
        let lights_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lights Buffer"),
            contents: bytemuck::cast_slice(&[LightsUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        // 1×1 maps until a shadow casting light is added
        let shadow = ShadowTarget::new(&device, &ctx.layouts, 1);
        let lights_bind_group =
            lights_bind_group(&device, &ctx.layouts, &lights_buffer, &shadow.map);
        Self {
            graph: SceneGraph::new(),
            fog: None,
            geometries: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            points: SlotMap::with_key(),
            lights_buffer,
            lights_bind_group,
            shadow,
            device,
            queue: ctx.queue.clone(),
            layouts: ctx.layouts.clone(),
            defaults: ctx.defaults.clone(),
        }
    }

    pub fn add_geometry(&mut self, name: &str, geometry: &Geometry) -> GeometryId {
        self.geometries
            .insert(Mesh::from_geometry(&self.device, name, geometry))
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Material Buffer"),
                contents: bytemuck::cast_slice(&[material.uniform()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let bind_group =
            material.create_bind_group(&self.device, &self.layouts.material, &buffer, &self.defaults);
        self.materials.insert(GpuMaterial {
            material,
            buffer,
            bind_group,
        })
    }

    /// Swaps the material behind `id`, rebinding its maps. Every mesh using `id` follows.
    pub fn replace_material(&mut self, id: MaterialId, material: Material) -> bool {
        let Some(gpu) = self.materials.get_mut(id) else {
            return false;
        };
        gpu.bind_group = material.create_bind_group(
            &self.device,
            &self.layouts.material,
            &gpu.buffer,
            &self.defaults,
        );
        gpu.material = material;
        true
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id).map(|gpu| &gpu.material)
    }

    /// For scalar properties (colour, roughness, wireframe, ...). Maps are bound when the
    /// material is added, so changing them needs [`Scene::replace_material`].
    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id).map(|gpu| &mut gpu.material)
    }

    pub fn add_group(&mut self, parent: Option<NodeId>, name: &str, transform: Instance) -> NodeId {
        self.graph.add(parent, name, NodeKind::Group, transform)
    }

    pub fn add_mesh(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        geometry: GeometryId,
        material: MaterialId,
        transform: Instance,
    ) -> NodeId {
        if !self.geometries.contains_key(geometry) || !self.materials.contains_key(material) {
            log::warn!("mesh {name} refers to a geometry or material of another scene");
        }
        let mesh = MeshNode {
            geometry,
            material,
            cast_shadow: false,
            receive_shadow: false,
        };
        self.graph.add(parent, name, NodeKind::Mesh(mesh), transform)
    }

    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        self.graph.add_child(parent, child)
    }

    /// Adding a shadow casting light grows the shadow maps to its
    /// [`LightShadow::map_size`](crate::light::LightShadow::map_size). All lights share
    /// one map size, the largest requested.
    pub fn add_light(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        light: Light,
        transform: Instance,
    ) -> NodeId {
        if let Some(shadow) = light.shadow() {
            let current = self.shadow.size();
            if current < 2 || shadow.map_size > current {
                self.set_shadow_map_size(shadow.map_size);
            }
        }
        self.graph.add(parent, name, NodeKind::Light(light), transform)
    }

    pub fn light_mut(&mut self, id: NodeId) -> Option<&mut Light> {
        self.graph.get_mut(id).and_then(Node::as_light_mut)
    }

    pub fn set_shadow_map_size(&mut self, size: u32) {
        let size = size.max(1);
        if self.shadow.size() == size {
            return;
        }
        log::debug!("shadow maps resized to {size}x{size}");
        (self.shadow.map, self.shadow.layers) = shadow_maps(&self.device, size);
        self.lights_bind_group = lights_bind_group(
            &self.device,
            &self.layouts,
            &self.lights_buffer,
            &self.shadow.map,
        );
    }

    pub fn add_points(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        cloud: PointCloud,
        material: PointsMaterial,
        transform: Instance,
    ) -> NodeId {
        let raw = cloud.to_raw();
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Particle Buffer", name)),
                contents: bytemuck::cast_slice(&raw),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Points Buffer"),
                contents: bytemuck::cast_slice(&[material.uniform(transform.to_matrix())]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let bind_group = material.create_bind_group(
            &self.device,
            &self.layouts.points,
            &uniform_buffer,
            &self.defaults,
        );
        let id = self.points.insert(GpuPoints {
            num_particles: raw.len() as u32,
            cloud,
            material,
            vertex_buffer,
            uniform_buffer,
            bind_group,
        });
        self.graph.add(parent, name, NodeKind::Points(id), transform)
    }

    /// Removes a points node and destroys its GPU buffers right away.
    pub fn remove_points(&mut self, node: NodeId) -> Option<PointCloud> {
        let points = detach_points(&mut self.graph, &mut self.points, node)?;
        points.vertex_buffer.destroy();
        points.uniform_buffer.destroy();
        Some(points.cloud)
    }

    pub fn points(&self, node: NodeId) -> Option<&PointCloud> {
        let id = self.points_id(node)?;
        self.points.get(id).map(|p| &p.cloud)
    }

    fn points_id(&self, node: NodeId) -> Option<PointsId> {
        match self.graph.get(node)?.kind {
            NodeKind::Points(id) => Some(id),
            _ => None,
        }
    }

    /// CPU side particles. Call [`Scene::write_to_buffer`] after editing them.
    pub fn points_mut(&mut self, node: NodeId) -> Option<&mut PointCloud> {
        let id = self.points_id(node)?;
        self.points.get_mut(id).map(|p| &mut p.cloud)
    }

    /// Uploads the particles of `node`. A cloud that changed size gets a new buffer.
    pub fn write_to_buffer(&mut self, node: NodeId) {
        let Some(id) = self.points_id(node) else {
            log::warn!("write_to_buffer called on a node without particles");
            return;
        };
        let Some(points) = self.points.get_mut(id) else {
            return;
        };
        let raw = points.cloud.to_raw();
        if raw.len() as u32 == points.num_particles {
            self.queue
                .write_buffer(&points.vertex_buffer, 0, bytemuck::cast_slice(&raw));
        } else {
            points.vertex_buffer.destroy();
            points.vertex_buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Particle Buffer"),
                    contents: bytemuck::cast_slice(&raw),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                });
            points.num_particles = raw.len() as u32;
        }
    }

    pub(crate) fn mesh(&self, id: GeometryId) -> Option<&Mesh> {
        self.geometries.get(id)
    }

    pub(crate) fn gpu_material(&self, id: MaterialId) -> Option<&GpuMaterial> {
        self.materials.get(id)
    }

    pub(crate) fn gpu_points(&self, id: PointsId) -> Option<&GpuPoints> {
        self.points.get(id)
    }

    pub(crate) fn lights_bind_group(&self) -> &wgpu::BindGroup {
        &self.lights_bind_group
    }

    pub(crate) fn shadow_target(&self) -> &ShadowTarget {
        &self.shadow
    }

    pub(crate) fn write_material_uniforms(&self) {
        for gpu in self.materials.values() {
            let uniform: MaterialUniform = gpu.material.uniform();
            self.queue
                .write_buffer(&gpu.buffer, 0, bytemuck::cast_slice(&[uniform]));
        }
    }

    pub(crate) fn write_points_uniform(&self, id: PointsId, world: cgmath::Matrix4<f32>) {
        if let Some(points) = self.points.get(id) {
            let uniform: PointsUniform = points.material.uniform(world);
            self.queue
                .write_buffer(&points.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
        }
    }

    pub(crate) fn write_lights(&self, uniform: &LightsUniform) {
        self.queue
            .write_buffer(&self.lights_buffer, 0, bytemuck::cast_slice(&[*uniform]));
    }

    /// Uploads the light camera of shadow map `layer`. Returns false (and skips the
    /// upload) while the maps are still the 1×1 stand-ins.
    pub(crate) fn write_shadow_camera(&self, layer: usize, view_proj: cgmath::Matrix4<f32>) -> bool {
        let Some(camera) = self.shadow.cameras.get(layer) else {
            return false;
        };
        if self.shadow.size() < 2 {
            log::debug!("no shadow map for layer {layer}");
            return false;
        }
        let mut uniform = CameraUniform::new();
        uniform.view_proj = view_proj.into();
        self.queue
            .write_buffer(&camera.buffer, 0, bytemuck::cast_slice(&[uniform]));
        true
    }
}

/// Unlinks the points node `node` (with its children) and takes its particles out of
/// `arena`. Other nodes are left alone.
fn detach_points<V>(
    graph: &mut SceneGraph,
    arena: &mut SlotMap<PointsId, V>,
    node: NodeId,
) -> Option<V> {
    let id = match graph.get(node)?.kind {
        NodeKind::Points(id) => id,
        _ => return None,
    };
    graph.remove(node);
    arena.remove(id)
}

fn lights_bind_group(
    device: &wgpu::Device,
    layouts: &Layouts,
    buffer: &wgpu::Buffer,
    shadow_map: &Texture,
) -> wgpu::BindGroup {
    let entries = [
        Some(wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }),
        Some(wgpu::BindGroupEntry {
            binding: 1,
            resource: wgpu::BindingResource::TextureView(&shadow_map.view),
        }),
        shadow_map.sampler.as_ref().map(|sampler| wgpu::BindGroupEntry {
            binding: 2,
            resource: wgpu::BindingResource::Sampler(sampler),
        }),
    ];
    let entries: Vec<_> = entries.into_iter().flatten().collect();
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &layouts.lights,
        entries: &entries,
        label: Some("lights_bind_group"),
    })
}

impl Index<NodeId> for Scene {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.graph[id]
    }
}

impl IndexMut<NodeId> for Scene {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.graph[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points_nodes<V>(graph: &SceneGraph, arena: &SlotMap<PointsId, V>) -> Vec<PointsId> {
        graph
            .iter()
            .filter_map(|(_, node)| match node.kind {
                NodeKind::Points(id) if arena.contains_key(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn replacing_particles_leaves_a_single_points_node() {
        let mut graph = SceneGraph::new();
        let mut arena: SlotMap<PointsId, PointCloud> = SlotMap::with_key();
        graph.add(None, "light", NodeKind::Group, Instance::new());

        let mut current = None;
        for count in [1000, 300, 2500] {
            if let Some(old) = current.take() {
                let removed = detach_points(&mut graph, &mut arena, old).expect("old particles");
                assert_ne!(removed.len(), count);
            }
            let cloud = PointCloud::new(vec![[0.0; 3]; count]);
            let id = arena.insert(cloud);
            current = Some(graph.add(None, "galaxy", NodeKind::Points(id), Instance::new()));

            let live = points_nodes(&graph, &arena);
            assert_eq!(live.len(), 1);
            assert_eq!(arena.len(), 1);
            assert_eq!(arena[live[0]].len(), count);
        }
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn only_points_nodes_are_detached() {
        let mut graph = SceneGraph::new();
        let mut arena: SlotMap<PointsId, PointCloud> = SlotMap::with_key();
        let group = graph.add(None, "group", NodeKind::Group, Instance::new());
        let id = arena.insert(PointCloud::new(vec![[1.0, 2.0, 3.0]]));
        let particles = graph.add(Some(group), "particles", NodeKind::Points(id), Instance::new());

        assert!(detach_points(&mut graph, &mut arena, group).is_none());
        assert_eq!(graph.len(), 2);
        assert!(detach_points(&mut graph, &mut arena, particles).is_some());
        assert!(graph.get(particles).is_none());
        assert!(graph[group].children().is_empty());
        assert!(detach_points(&mut graph, &mut arena, particles).is_none());
        assert!(arena.is_empty());
    }
}
