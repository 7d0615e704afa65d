//! Entities: the ownership roots of the scene graph.
//!
//! An entity owns zero or more scene nodes (the nodes carry a non-owning
//! back-reference to their entity id). The owned-node list is runtime
//! state rebuilt during scene load from the node table, so it is not a
//! declared field; only the fields in the schema are persisted.

use std::sync::OnceLock;

use crate::serialize::{
    BinReader, BinWriter, Codec, DeserializeError, ReadSession, Reflect, Schema, SceneObject,
    SerializeError, WriteSession,
};

use super::node::NodeId;

/// Stable numeric identity of an entity within one scene.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u32);

impl Codec for EntityId {
    fn write_value(
        &self,
        w: &mut BinWriter<'_>,
        session: &mut WriteSession<'_>,
    ) -> Result<u64, SerializeError> {
        self.0.write_value(w, session)
    }

    fn read_value(
        &mut self,
        r: &mut BinReader<'_>,
        session: &mut ReadSession<'_>,
    ) -> Result<u64, DeserializeError> {
        self.0.read_value(r, session)
    }
}

/// A named object in the scene that owns nodes and, optionally, a
/// polymorphic controller driving it.
#[derive(Default)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    /// Behavior attached to this entity, reconstructed through the type
    /// registry on load.
    pub controller: Option<Box<dyn SceneObject>>,
    /// Nodes owned by this entity, in creation order. Rebuilt on load.
    pub(crate) nodes: Vec<NodeId>,
}

impl Entity {
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }
}

impl Reflect for Entity {
    const NAME: &'static str = "Entity";

    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Entity>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(Self::NAME)
                .field(1, |e: &Entity| &e.id, |e: &mut Entity| &mut e.id)
                .field(2, |e: &Entity| &e.name, |e: &mut Entity| &mut e.name)
                .field(
                    3,
                    |e: &Entity| &e.controller,
                    |e: &mut Entity| &mut e.controller,
                )
        })
    }
}
