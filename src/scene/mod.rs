//! Scene graph: entities, nodes, hierarchy, and scene file persistence.
//!
//! Entities ([`Entity`]) own nodes; nodes embed [`NodeCore`] for name,
//! transform, and hierarchy links, and the [`SceneGraph`] keeps the links
//! consistent. [`save_scene`]/[`load_scene`] persist a whole graph through
//! the reflection-driven serializer; hierarchy travels in a fixed node
//! table so links can be resolved in a second pass after every node exists.

pub mod controller;
pub mod entity;
pub mod graph;
pub mod node;
pub mod persistence;

pub use controller::{FreeFlyController, OrbitController};
pub use entity::{Entity, EntityId};
pub use graph::SceneGraph;
pub use node::{CameraNode, GroupNode, LightNode, Material, MeshNode, NodeCore, NodeId};
pub use persistence::{load_scene, load_scene_file, save_scene, save_scene_file};

use crate::registry::TypeRegistry;

/// Registers every built-in scene type with the registry.
///
/// Call this once at startup before saving or loading scenes; the order is
/// part of the numeric id assignment, so keep additions at the end.
pub fn register_scene_types(registry: &mut TypeRegistry) {
    registry.register::<Entity>();
    registry.register::<GroupNode>();
    registry.register::<MeshNode>();
    registry.register::<CameraNode>();
    registry.register::<LightNode>();
    registry.register::<Material>();
    registry.register::<OrbitController>();
    registry.register::<FreeFlyController>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_types_register_once() {
        let mut registry = TypeRegistry::new();
        register_scene_types(&mut registry);
        assert_eq!(registry.len(), 8);
        assert!(registry.contains::<MeshNode>());
        assert!(registry.id_by_name("OrbitController").is_some());
    }
}
