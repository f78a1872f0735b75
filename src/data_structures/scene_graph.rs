//! Scene graph and hierarchical scene organization.
//!
//! Nodes live in a slotmap arena and refer to each other by [`NodeId`]. Every node keeps
//! its local transform next to a cached world matrix, which
//! [`SceneGraph::update_world_matrices`] recomputes top down (`parent * local`).

use std::ops::{Index, IndexMut};

use cgmath::{Matrix4, SquareMatrix, Vector3};
use log::warn;
use slotmap::SlotMap;

use crate::{data_structures::instance::Instance, light::Light};

slotmap::new_key_type! {
    pub struct NodeId;
    pub struct GeometryId;
    pub struct MaterialId;
    pub struct PointsId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshNode {
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh(MeshNode),
    Points(PointsId),
    Light(Light),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub transform: Instance,
    pub visible: bool,
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    world: Matrix4<f32>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// As of the last [`SceneGraph::update_world_matrices`].
    pub fn world_position(&self) -> Vector3<f32> {
        self.world.w.truncate()
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut MeshNode> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_light_mut(&mut self) -> Option<&mut Light> {
        match &mut self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    /// Inserts a node under `parent`, or at the top level. An unknown parent puts the
    /// node at the top level as well.
    pub fn add(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        kind: NodeKind,
        transform: Instance,
    ) -> NodeId {
        let parent = parent.filter(|p| {
            let known = self.nodes.contains_key(*p);
            if !known {
                warn!("parent of {name} is not part of this scene, adding it at the top level");
            }
            known
        });
        let parent_world = parent.map_or(Matrix4::identity(), |p| self.nodes[p].world);
        let id = self.nodes.insert(Node {
            name: name.to_owned(),
            world: &parent_world * &transform,
            transform,
            visible: true,
            kind,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Moves `child` (with its subtree) under `parent`. Moving a node below itself is
    /// refused.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            return false;
        }
        if self.ancestors(parent).any(|a| a == child) || parent == child {
            warn!("cannot attach a node below itself");
            return false;
        }
        self.detach(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        true
    }

    /// Removes `id` and its subtree, returning the removed nodes.
    pub fn remove(&mut self, id: NodeId) -> Vec<(NodeId, Node)> {
        if !self.nodes.contains_key(id) {
            return Vec::new();
        }
        self.detach(id);
        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(next) {
                stack.extend(node.children.iter().copied());
                removed.push((next, node));
            }
        }
        removed
    }

    fn detach(&mut self, id: NodeId) {
        match self.nodes[id].parent.take() {
            Some(p) => self.nodes[p].children.retain(|c| *c != id),
            None => self.roots.retain(|r| *r != id),
        }
    }

    fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes.get(id).and_then(|n| n.parent), |p| {
            self.nodes.get(*p).and_then(|n| n.parent)
        })
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| id)
    }

    pub fn update_world_matrices(&mut self) {
        let mut stack: Vec<(NodeId, Matrix4<f32>)> = self
            .roots
            .iter()
            .map(|root| (*root, Matrix4::identity()))
            .collect();
        while let Some((id, parent)) = stack.pop() {
            let node = &mut self.nodes[id];
            node.world = &parent * &node.transform;
            let world = node.world;
            stack.extend(node.children.iter().map(|child| (*child, world)));
        }
    }

    /// Visible only if the node and all of its ancestors are.
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.visible)
            && self.ancestors(id).all(|a| self.nodes[a].visible)
    }

    /// Depth first walk that skips hidden subtrees.
    pub fn visible_nodes(&self) -> Vec<(NodeId, &Node)> {
        let mut visible = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if !node.visible {
                continue;
            }
            visible.push((id, node));
            stack.extend(node.children.iter().rev().copied());
        }
        visible
    }
}

impl Index<NodeId> for SceneGraph {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id]
    }
}

impl IndexMut<NodeId> for SceneGraph {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.nodes[id]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn house() -> (SceneGraph, NodeId, NodeId, NodeId) {
        let mut graph = SceneGraph::new();
        let house = graph.add(None, "house", NodeKind::Group, Instance::at(1.0, 0.0, 0.0));
        let door = graph.add(Some(house), "door", NodeKind::Group, Instance::at(0.0, 1.0, 2.01));
        let knob = graph.add(Some(door), "knob", NodeKind::Group, Instance::at(0.5, 0.0, 0.0));
        (graph, house, door, knob)
    }

    #[test]
    fn world_transforms_follow_the_parent_chain() {
        let (mut graph, house, _, knob) = house();
        graph[house].transform.position.y = 10.0;
        graph.update_world_matrices();
        let p = graph[knob].world_position();
        assert_relative_eq!(p.x, 1.5);
        assert_relative_eq!(p.y, 11.0);
        assert_relative_eq!(p.z, 2.01);
    }

    #[test]
    fn hidden_parent_hides_children() {
        let (mut graph, house, door, knob) = house();
        graph[door].visible = false;
        assert!(graph.is_visible(house));
        assert!(!graph.is_visible(knob));
        let visible: Vec<_> = graph.visible_nodes().into_iter().map(|(id, _)| id).collect();
        assert_eq!(visible, vec![house]);
    }

    #[test]
    fn remove_takes_the_subtree() {
        let (mut graph, house, door, knob) = house();
        let removed = graph.remove(door);
        assert_eq!(removed.len(), 2);
        assert!(graph.get(knob).is_none());
        assert!(graph[house].children().is_empty());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn reparenting() {
        let (mut graph, house, door, knob) = house();
        assert!(graph.add_child(house, knob));
        assert_eq!(graph[knob].parent(), Some(house));
        assert!(graph[door].children().is_empty());
        assert!(!graph.add_child(knob, house));
        assert!(!graph.add_child(door, door));
    }

    #[test]
    fn unknown_parent_falls_back_to_the_top_level() {
        let (mut graph, _, door, _) = house();
        graph.remove(door);
        let orphan = graph.add(Some(door), "orphan", NodeKind::Group, Instance::new());
        assert!(graph.roots().contains(&orphan));
        assert_eq!(graph.find("orphan"), Some(orphan));
    }
}
