//! Scene graph and reflective binary serialization core for the Vermilion
//! editor.
//!
//! The crate has two halves:
//!
//! - [`serialize`] — a tag-based, self-describing binary object format.
//!   Types declare a [`Schema`](serialize::Schema) of tagged fields; chunks
//!   carry type names and byte counts so old readers skip unknown tags and
//!   corrupted records stay contained.
//! - [`scene`] — entities and typed scene nodes in a [`SceneGraph`],
//!   persisted through the serializer with hierarchy links resolved in a
//!   second pass.
//!
//! Polymorphic fields (entity controllers, heterogeneous node storage) are
//! reconstructed through the [`TypeRegistry`]; shared handles
//! ([`Shared<T>`](serialize::Shared)) round-trip as one instance per file.

pub mod assets;
pub mod registry;
pub mod scene;
pub mod serialize;

pub use assets::AssetResolver;
pub use registry::TypeRegistry;
pub use scene::{
    CameraNode, Entity, EntityId, GroupNode, LightNode, Material, MeshNode, NodeCore, NodeId,
    OrbitController,
    SceneGraph, load_scene, load_scene_file, register_scene_types, save_scene, save_scene_file,
};
pub use serialize::{
    Codec, DeserializeError, Reflect, SceneObject, SerializeError, Shared,
};
