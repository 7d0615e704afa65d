//! Scene graph ownership and hierarchy operations.
//!
//! The graph owns entities and nodes in ordered maps so enumeration (and
//! therefore serialization) is deterministic. Hierarchy links are ids
//! rather than pointers; all operations keep the parent/children lists
//! consistent in both directions.
//!
//! Misuse by callers (unknown entity on node creation, parenting a node to
//! itself) is a programming error and panics; recoverable conditions during
//! load are reported through [`DeserializeError`](crate::DeserializeError)
//! by the persistence layer instead.

use std::collections::{BTreeMap, BTreeSet};

use crate::serialize::{Reflect, SceneObject};

use super::entity::{Entity, EntityId};
use super::node::{NodeCore, NodeId};

/// Owner of all live entities and scene nodes.
#[derive(Default)]
pub struct SceneGraph {
    entities: BTreeMap<EntityId, Entity>,
    nodes: BTreeMap<NodeId, Box<dyn SceneObject>>,
    next_entity: u32,
    next_node: u32,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- entities ----

    /// Creates a new empty entity and returns its id.
    pub fn create_entity(&mut self, name: &str) -> EntityId {
        self.next_entity += 1;
        let id = EntityId(self.next_entity);
        self.entities.insert(
            id,
            Entity {
                id,
                name: name.to_owned(),
                controller: None,
                nodes: Vec::new(),
            },
        );
        id
    }

    /// Inserts an already-built entity, keeping any existing entity that
    /// is live under the same id. Used during scene load so repeated
    /// records cannot clobber live state.
    pub fn register_entity(&mut self, entity: Entity) -> EntityId {
        let id = entity.id;
        self.next_entity = self.next_entity.max(id.0);
        self.entities.entry(id).or_insert(entity);
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Removes an entity and all nodes it owns.
    ///
    /// Children of removed nodes that belong to other entities survive and
    /// are re-parented to the nearest surviving ancestor (or become roots).
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        let doomed: BTreeSet<NodeId> = entity.nodes.iter().copied().collect();

        // Re-home surviving children before anything is dropped.
        let mut moves: Vec<(NodeId, Option<NodeId>)> = Vec::new();
        for &node in &doomed {
            let Some(core) = self.core(node) else { continue };
            let mut ancestor = core.parent;
            while let Some(a) = ancestor {
                if !doomed.contains(&a) {
                    break;
                }
                ancestor = self.core(a).and_then(|c| c.parent);
            }
            for &child in &core.children {
                if !doomed.contains(&child) {
                    moves.push((child, ancestor));
                }
            }
        }
        for (child, new_parent) in moves {
            if let Some(core) = self.core_mut(child) {
                core.parent = new_parent;
            }
            if let Some(parent) = new_parent
                && let Some(core) = self.core_mut(parent)
                && !core.children.contains(&child)
            {
                core.children.push(child);
            }
        }

        for &node in &doomed {
            if let Some(parent) = self.core(node).and_then(|c| c.parent)
                && !doomed.contains(&parent)
                && let Some(core) = self.core_mut(parent)
            {
                core.children.retain(|&c| c != node);
            }
            self.nodes.remove(&node);
        }
        Some(entity)
    }

    // ---- nodes ----

    /// Creates a node owned by `entity` at the root level.
    ///
    /// # Panics
    ///
    /// Panics if the entity does not exist or `T` is not a node type.
    pub fn create_node<T: Reflect>(&mut self, entity: EntityId, node: T) -> NodeId {
        self.adopt_node(entity, Box::new(node))
    }

    /// Attaches an already-constructed node to `entity` at the root level
    /// and assigns it a live id.
    pub(crate) fn adopt_node(
        &mut self,
        entity: EntityId,
        mut node: Box<dyn SceneObject>,
    ) -> NodeId {
        self.next_node += 1;
        let id = NodeId(self.next_node);
        let type_name = node.type_name();
        {
            let core = node
                .node_core_mut()
                .unwrap_or_else(|| panic!("'{type_name}' is not a scene node type"));
            core.id = id;
            core.entity = entity;
            core.parent = None;
            core.children.clear();
        }
        self.entities
            .get_mut(&entity)
            .unwrap_or_else(|| panic!("cannot attach node to unknown entity {entity:?}"))
            .nodes
            .push(id);
        self.nodes.insert(id, node);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&dyn SceneObject> {
        self.nodes.get(&id).map(|n| n.as_ref())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut dyn SceneObject> {
        self.nodes.get_mut(&id).map(|n| n.as_mut())
    }

    /// Typed access to a node's concrete type.
    pub fn node_as<T: Reflect>(&self, id: NodeId) -> Option<&T> {
        self.node(id)?.as_any().downcast_ref::<T>()
    }

    pub fn node_as_mut<T: Reflect>(&mut self, id: NodeId) -> Option<&mut T> {
        self.node_mut(id)?.as_any_mut().downcast_mut::<T>()
    }

    pub fn core(&self, id: NodeId) -> Option<&NodeCore> {
        self.node(id)?.node_core()
    }

    pub fn core_mut(&mut self, id: NodeId) -> Option<&mut NodeCore> {
        self.node_mut(id)?.node_core_mut()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &dyn SceneObject)> {
        self.nodes.iter().map(|(&id, n)| (id, n.as_ref()))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Re-parents `node` under `parent`, or detaches it to the root level
    /// when `parent` is `None`. Keeps both children lists consistent.
    ///
    /// # Panics
    ///
    /// Panics if `node == parent` or either id is unknown.
    pub fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) {
        assert!(
            Some(node) != parent,
            "cannot parent node {node:?} to itself"
        );
        assert!(self.nodes.contains_key(&node), "unknown node {node:?}");
        if let Some(p) = parent {
            assert!(self.nodes.contains_key(&p), "unknown parent node {p:?}");
        }

        let old_parent = self.core(node).and_then(|c| c.parent);
        if old_parent == parent {
            return;
        }
        if let Some(old) = old_parent
            && let Some(core) = self.core_mut(old)
        {
            core.children.retain(|&c| c != node);
        }
        if let Some(core) = self.core_mut(node) {
            core.parent = parent;
        }
        if let Some(p) = parent
            && let Some(core) = self.core_mut(p)
        {
            core.children.push(node);
        }
        self.mark_dirty(node);
    }

    /// Removes a node and its whole subtree, detaching every removed node
    /// from its owning entity.
    pub fn remove_node_recursive(&mut self, id: NodeId) {
        if let Some(parent) = self.core(id).and_then(|c| c.parent)
            && let Some(core) = self.core_mut(parent)
        {
            core.children.retain(|&c| c != id);
        }

        let mut stack = vec![id];
        let mut subtree = Vec::new();
        while let Some(node) = stack.pop() {
            if let Some(core) = self.core(node) {
                stack.extend(core.children.iter().copied());
                subtree.push(node);
            }
        }
        for node in subtree {
            if let Some(owner) = self.core(node).map(|c| c.entity)
                && let Some(entity) = self.entities.get_mut(&owner)
            {
                entity.nodes.retain(|&n| n != node);
            }
            self.nodes.remove(&node);
        }
    }

    /// Marks a node and all of its descendants dirty.
    pub fn mark_dirty(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if let Some(core) = self.core_mut(node) {
                core.dirty = true;
                stack.extend(core.children.iter().copied());
            }
        }
    }

    /// Drops all entities and nodes.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.nodes.clear();
        self.next_entity = 0;
        self.next_node = 0;
    }
}
