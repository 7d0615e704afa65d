//! Scene node types.
//!
//! [`NodeCore`] is the base level every node type embeds: name, local
//! transform, and the graph links (owning entity, parent, children). The
//! links are maintained by the [`SceneGraph`](super::SceneGraph) and
//! persisted by the node table, not by the node's own chunk, so only name
//! and transform appear in the `SceneNode` schema.
//!
//! Concrete node types embed the core and chain their schema into it, so a
//! serialized node is a `[derived chunk][SceneNode chunk]` sequence.
//! [`GroupNode`] declares no fields of its own and therefore contributes no
//! chunk at all — only the base chunk is emitted for it.

use std::path::Path;
use std::sync::OnceLock;

use crate::serialize::{
    BinReader, BinWriter, Codec, ReadSession, Reflect, Schema, Shared, WriteSession,
};

use super::entity::EntityId;

/// Live identity of a node within one [`SceneGraph`](super::SceneGraph).
///
/// Distinct from the dense serialization ids used inside scene files,
/// which are assigned per save and never outlive it. Node ids never appear
/// in a schema: hierarchy travels in the scene file's node table and is
/// re-resolved on load.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

/// Column-major 4x4 identity matrix.
pub const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Base state shared by every scene node type.
pub struct NodeCore {
    pub name: String,
    /// Local transform relative to the parent, column-major.
    pub local_transform: [f32; 16],
    pub(crate) id: NodeId,
    pub(crate) entity: EntityId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) dirty: bool,
}

impl Default for NodeCore {
    fn default() -> Self {
        Self {
            name: String::new(),
            local_transform: IDENTITY,
            id: NodeId::default(),
            entity: EntityId::default(),
            parent: None,
            children: Vec::new(),
            dirty: true,
        }
    }
}

impl NodeCore {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag after the transform system has consumed it.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

impl Reflect for NodeCore {
    const NAME: &'static str = "SceneNode";

    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<NodeCore>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(Self::NAME)
                .field(1, |n: &NodeCore| &n.name, |n: &mut NodeCore| &mut n.name)
                .field_with(
                    2,
                    |n: &NodeCore, w: &mut BinWriter<'_>, _s: &mut WriteSession<'_>| {
                        w.write_bytes(bytemuck::cast_slice(&n.local_transform))
                    },
                    |n: &mut NodeCore, r: &mut BinReader<'_>, _s: &mut ReadSession<'_>| {
                        r.read_bytes(bytemuck::cast_slice_mut(&mut n.local_transform))
                    },
                )
        })
    }

    fn node_core(&self) -> Option<&NodeCore> {
        Some(self)
    }

    fn node_core_mut(&mut self) -> Option<&mut NodeCore> {
        Some(self)
    }
}

/// A transform-only node used for grouping. Declares no fields of its own.
#[derive(Default)]
pub struct GroupNode {
    pub core: NodeCore,
}

impl Reflect for GroupNode {
    const NAME: &'static str = "GroupNode";

    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<GroupNode>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(Self::NAME).base(|n: &GroupNode| &n.core, |n: &mut GroupNode| &mut n.core)
        })
    }

    fn node_core(&self) -> Option<&NodeCore> {
        Some(&self.core)
    }

    fn node_core_mut(&mut self) -> Option<&mut NodeCore> {
        Some(&mut self.core)
    }
}

/// Surface appearance, shared between mesh nodes.
pub struct Material {
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    /// Texture reference by path; empty means untextured.
    pub texture: String,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            metallic: 0.0,
            roughness: 0.5,
            texture: String::new(),
        }
    }
}

impl Reflect for Material {
    const NAME: &'static str = "Material";

    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Material>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(Self::NAME)
                .field(
                    1,
                    |m: &Material| &m.base_color,
                    |m: &mut Material| &mut m.base_color,
                )
                .field(2, |m: &Material| &m.metallic, |m: &mut Material| &mut m.metallic)
                .field(
                    3,
                    |m: &Material| &m.roughness,
                    |m: &mut Material| &mut m.roughness,
                )
                .field(4, |m: &Material| &m.texture, |m: &mut Material| &mut m.texture)
        })
    }
}

crate::impl_object_codec!(Material);

/// A node that renders an imported mesh.
#[derive(Default)]
pub struct MeshNode {
    pub core: NodeCore,
    /// Absolute path at runtime; persisted project-relative when a
    /// resolver is attached to the session.
    pub mesh_path: String,
    pub casts_shadow: bool,
    /// Shared with other mesh nodes; serialized once per session.
    pub material: Shared<Material>,
}

impl Reflect for MeshNode {
    const NAME: &'static str = "MeshNode";

    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<MeshNode>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(Self::NAME)
                .field_with(
                    1,
                    |n: &MeshNode, w: &mut BinWriter<'_>, s: &mut WriteSession<'_>| {
                        let stored = match s.resolver() {
                            Some(resolver) => resolver
                                .to_relative(Path::new(&n.mesh_path))
                                .to_string_lossy()
                                .into_owned(),
                            None => n.mesh_path.clone(),
                        };
                        stored.write_value(w, s)
                    },
                    |n: &mut MeshNode, r: &mut BinReader<'_>, s: &mut ReadSession<'_>| {
                        let mut stored = String::new();
                        let consumed = stored.read_value(r, s)?;
                        n.mesh_path = match s.resolver() {
                            Some(resolver) => resolver
                                .to_absolute(Path::new(&stored))
                                .to_string_lossy()
                                .into_owned(),
                            None => stored,
                        };
                        Ok(consumed)
                    },
                )
                .field(
                    2,
                    |n: &MeshNode| &n.casts_shadow,
                    |n: &mut MeshNode| &mut n.casts_shadow,
                )
                .field(3, |n: &MeshNode| &n.material, |n: &mut MeshNode| &mut n.material)
                .base(|n: &MeshNode| &n.core, |n: &mut MeshNode| &mut n.core)
        })
    }

    fn node_core(&self) -> Option<&NodeCore> {
        Some(&self.core)
    }

    fn node_core_mut(&mut self) -> Option<&mut NodeCore> {
        Some(&mut self.core)
    }
}

/// A perspective camera node.
pub struct CameraNode {
    pub core: NodeCore,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for CameraNode {
    fn default() -> Self {
        Self {
            core: NodeCore::default(),
            fov_y: std::f32::consts::FRAC_PI_3,
            z_near: 0.1,
            z_far: 1000.0,
        }
    }
}

impl Reflect for CameraNode {
    const NAME: &'static str = "CameraNode";

    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<CameraNode>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(Self::NAME)
                .field(1, |n: &CameraNode| &n.fov_y, |n: &mut CameraNode| &mut n.fov_y)
                .field(2, |n: &CameraNode| &n.z_near, |n: &mut CameraNode| &mut n.z_near)
                .field(3, |n: &CameraNode| &n.z_far, |n: &mut CameraNode| &mut n.z_far)
                .base(|n: &CameraNode| &n.core, |n: &mut CameraNode| &mut n.core)
        })
    }

    fn node_core(&self) -> Option<&NodeCore> {
        Some(&self.core)
    }

    fn node_core_mut(&mut self) -> Option<&mut NodeCore> {
        Some(&mut self.core)
    }
}

/// A point/directional light node.
pub struct LightNode {
    pub core: NodeCore,
    pub color: [f32; 3],
    pub intensity: f32,
}

impl Default for LightNode {
    fn default() -> Self {
        Self {
            core: NodeCore::default(),
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
        }
    }
}

impl Reflect for LightNode {
    const NAME: &'static str = "LightNode";

    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<LightNode>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(Self::NAME)
                .field(1, |n: &LightNode| &n.color, |n: &mut LightNode| &mut n.color)
                .field(
                    2,
                    |n: &LightNode| &n.intensity,
                    |n: &mut LightNode| &mut n.intensity,
                )
                .base(|n: &LightNode| &n.core, |n: &mut LightNode| &mut n.core)
        })
    }

    fn node_core(&self) -> Option<&NodeCore> {
        Some(&self.core)
    }

    fn node_core_mut(&mut self) -> Option<&mut NodeCore> {
        Some(&mut self.core)
    }
}
