//! Scene file save and load.
//!
//! A scene file is a magic/version header, an entity table, and a node
//! table. Entities and node fields are stored as self-describing chunks;
//! the hierarchy is stored in fixed node records outside the chunks, using
//! dense serialization ids assigned at save time:
//!
//! ```text
//! [magic:4][version:u16]
//! [entity_count:u32]{ entity chunk }*
//! [node_count:u32]{
//!     [sid:u32][type_name:u8+bytes][entity_id:u32][parent_sid:u32]
//!     [child_count:u32][child_sid:u32]*
//!     node chunks
//! }*
//! ```
//!
//! Node types are keyed by persisted name, so a file does not depend on
//! the registration order of the registry that wrote it.
//!
//! Loading is two passes: materialize every node from its record and
//! chunks, then resolve parent and children links once all serialization
//! ids are known. A node record naming an entity that is not in the entity
//! table is fatal; an unknown node type is fatal too, since the record
//! does not carry a size to skip by.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use crate::assets::AssetResolver;
use crate::registry::TypeRegistry;
use crate::serialize::{
    BinReader, BinWriter, DeserializeError, ReadSession, SerializeError, WriteSession,
    read_object, write_object,
};

use super::entity::{Entity, EntityId};
use super::graph::SceneGraph;
use super::node::NodeId;

const MAGIC: &[u8; 4] = b"VMSC";
const VERSION: u16 = 1;

/// No-parent marker in node records; serialization ids start at 1.
const NO_PARENT: u32 = 0;

/// Writes the whole scene graph to `out`. Returns the bytes written.
///
/// Every node type present in the graph (and every controller type attached
/// to an entity) must be registered, otherwise the save fails with
/// [`SerializeError::UnregisteredType`].
pub fn save_scene<O: Write + Seek>(
    graph: &SceneGraph,
    registry: &TypeRegistry,
    resolver: Option<&AssetResolver>,
    out: &mut O,
) -> Result<u64, SerializeError> {
    let mut w = BinWriter::new(out);
    let mut session = match resolver {
        Some(resolver) => WriteSession::with_resolver(registry, resolver),
        None => WriteSession::new(registry),
    };

    let mut total = 0u64;
    total += w.write_bytes(MAGIC)?;
    total += w.write_u16(VERSION)?;

    // Entity table.
    total += w.write_u32(graph.entity_count() as u32)?;
    for entity in graph.entities() {
        total += write_object(entity, &mut w, &mut session)?;
    }

    // Dense per-save ids, in entity enumeration order.
    let mut sids: HashMap<NodeId, u32> = HashMap::new();
    let mut order: Vec<NodeId> = Vec::new();
    for entity in graph.entities() {
        for &node in entity.nodes() {
            sids.insert(node, 1 + order.len() as u32);
            order.push(node);
        }
    }

    // Node table.
    total += w.write_u32(order.len() as u32)?;
    for &id in &order {
        // Entity node lists only ever reference live nodes.
        let node = graph.node(id).expect("entity references a dropped node");
        let core = node
            .node_core()
            .expect("scene graph holds a non-node object");

        let name = node.type_name();
        if !registry.is_registered(name) {
            return Err(SerializeError::UnregisteredType { name });
        }
        let parent_sid = core
            .parent()
            .and_then(|p| sids.get(&p).copied())
            .unwrap_or(NO_PARENT);

        total += w.write_u32(sids[&id])?;
        total += w.write_u8(name.len() as u8)?;
        total += w.write_bytes(name.as_bytes())?;
        total += w.write_u32(core.entity().0)?;
        total += w.write_u32(parent_sid)?;
        total += w.write_u32(core.children().len() as u32)?;
        for child in core.children() {
            total += w.write_u32(sids[child])?;
        }

        total += node.write_fields(&mut w, &mut session)?;
    }

    log::info!(
        "saved scene: {} entities, {} nodes, {total} bytes",
        graph.entity_count(),
        order.len()
    );
    Ok(total)
}

struct NodeRecord {
    node: NodeId,
    sid: u32,
    parent_sid: u32,
    child_sids: Vec<u32>,
}

/// Replaces the contents of `graph` with the scene read from `input`.
///
/// The graph is cleared before reading; on error it may be left partially
/// populated and should be discarded.
pub fn load_scene<I: Read + Seek>(
    graph: &mut SceneGraph,
    registry: &TypeRegistry,
    resolver: Option<&AssetResolver>,
    input: &mut I,
) -> Result<(), DeserializeError> {
    let mut r = BinReader::new(input);
    let mut session = match resolver {
        Some(resolver) => ReadSession::with_resolver(registry, resolver),
        None => ReadSession::new(registry),
    };

    let mut magic = [0u8; 4];
    r.read_bytes(&mut magic)?;
    if &magic != MAGIC {
        return Err(DeserializeError::BadHeader {
            message: format!("bad magic {magic:02x?}, not a scene file"),
        });
    }
    let version = r.read_u16()?;
    if version != VERSION {
        return Err(DeserializeError::BadHeader {
            message: format!("unsupported scene version {version} (expected {VERSION})"),
        });
    }

    graph.clear();

    let entity_count = r.read_u32()?;
    for _ in 0..entity_count {
        let mut entity = Entity::default();
        read_object(&mut entity, &mut r, &mut session)?;
        graph.register_entity(entity);
    }

    // First pass: materialize nodes and remember the link records.
    // Counts come from the stream and may be corrupt; collections grow as
    // records are actually read rather than reserving up front.
    let node_count = r.read_u32()?;
    let mut by_sid: HashMap<u32, NodeId> = HashMap::new();
    let mut records: Vec<NodeRecord> = Vec::new();
    for _ in 0..node_count {
        let sid = r.read_u32()?;
        let name_len = r.read_u8()? as usize;
        let mut name_bytes = vec![0u8; name_len];
        r.read_bytes(&mut name_bytes)?;
        let type_name =
            String::from_utf8(name_bytes).map_err(|e| DeserializeError::Corrupt {
                message: format!("node type name is not valid UTF-8: {e}"),
            })?;
        let entity_id = EntityId(r.read_u32()?);
        let parent_sid = r.read_u32()?;
        let child_count = r.read_u32()?;
        let mut child_sids = Vec::new();
        for _ in 0..child_count {
            child_sids.push(r.read_u32()?);
        }

        let Some(mut node) = registry.create_by_name(&type_name) else {
            return Err(DeserializeError::UnknownNodeType {
                name: type_name,
                node: sid,
            });
        };
        node.read_fields(&mut r, &mut session)?;

        if graph.entity(entity_id).is_none() {
            return Err(DeserializeError::MissingEntity {
                entity: entity_id.0,
                node: sid,
            });
        }
        let id = graph.adopt_node(entity_id, node);
        by_sid.insert(sid, id);
        records.push(NodeRecord {
            node: id,
            sid,
            parent_sid,
            child_sids,
        });
    }

    // Second pass: resolve hierarchy links now that every sid is known.
    for record in &records {
        let parent = match record.parent_sid {
            NO_PARENT => None,
            sid => Some(*by_sid.get(&sid).ok_or_else(|| DeserializeError::Corrupt {
                message: format!(
                    "node {} references unknown parent serialization id {sid}",
                    record.sid
                ),
            })?),
        };
        let mut children = Vec::with_capacity(record.child_sids.len());
        for &sid in &record.child_sids {
            children.push(*by_sid.get(&sid).ok_or_else(|| DeserializeError::Corrupt {
                message: format!(
                    "node {} references unknown child serialization id {sid}",
                    record.sid
                ),
            })?);
        }
        if let Some(core) = graph.core_mut(record.node) {
            core.parent = parent;
            core.children = children;
        }
    }

    log::info!("loaded scene: {entity_count} entities, {node_count} nodes");
    Ok(())
}

/// Saves a scene graph to a file, creating or truncating it.
pub fn save_scene_file(
    graph: &SceneGraph,
    registry: &TypeRegistry,
    resolver: Option<&AssetResolver>,
    path: &Path,
) -> Result<u64, SerializeError> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    let written = save_scene(graph, registry, resolver, &mut out)?;
    out.flush()?;
    Ok(written)
}

/// Loads a scene graph from a file, replacing the graph's contents.
pub fn load_scene_file(
    graph: &mut SceneGraph,
    registry: &TypeRegistry,
    resolver: Option<&AssetResolver>,
    path: &Path,
) -> Result<(), DeserializeError> {
    let file = File::open(path)?;
    let mut input = BufReader::new(file);
    load_scene(graph, registry, resolver, &mut input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::node::{GroupNode, MeshNode};
    use std::io::Cursor;
    use std::sync::Arc;

    fn test_registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register::<GroupNode>();
        registry.register::<MeshNode>();
        registry
    }

    fn sample_scene() -> SceneGraph {
        let mut graph = SceneGraph::new();
        let props = graph.create_entity("props");
        let root = graph.create_node(props, GroupNode::default());
        graph.core_mut(root).unwrap().name = "root".to_owned();

        let mut mesh = MeshNode::default();
        mesh.core.name = "crate".to_owned();
        mesh.mesh_path = "meshes/crate.glb".to_owned();
        mesh.casts_shadow = true;
        let material = mesh.material.clone();
        let a = graph.create_node(props, mesh);
        graph.set_parent(a, Some(root));

        let mut sibling = MeshNode::default();
        sibling.core.name = "crate2".to_owned();
        sibling.mesh_path = "meshes/crate.glb".to_owned();
        sibling.material = material;
        let b = graph.create_node(props, sibling);
        graph.set_parent(b, Some(root));

        graph
    }

    #[test]
    fn scene_round_trip() {
        let registry = test_registry();
        let graph = sample_scene();

        let mut buf = Cursor::new(Vec::new());
        let written = save_scene(&graph, &registry, None, &mut buf).unwrap();
        assert_eq!(written, buf.get_ref().len() as u64);

        buf.set_position(0);
        let mut loaded = SceneGraph::new();
        load_scene(&mut loaded, &registry, None, &mut buf).unwrap();

        assert_eq!(loaded.entity_count(), 1);
        assert_eq!(loaded.node_count(), 3);

        let entity = loaded.entities().next().unwrap();
        assert_eq!(entity.name, "props");
        let [root, a, b] = entity.nodes() else {
            panic!("expected three nodes");
        };
        assert_eq!(loaded.core(*root).unwrap().name, "root");
        assert_eq!(loaded.core(*root).unwrap().children(), &[*a, *b]);
        assert_eq!(loaded.core(*a).unwrap().parent(), Some(*root));

        let mesh_a = loaded.node_as::<MeshNode>(*a).unwrap();
        assert_eq!(mesh_a.mesh_path, "meshes/crate.glb");
        assert!(mesh_a.casts_shadow);

        // The shared material deduplicates back into one instance.
        let mat_a = loaded.node_as::<MeshNode>(*a).unwrap().material.clone();
        let mat_b = loaded.node_as::<MeshNode>(*b).unwrap().material.clone();
        assert!(Arc::ptr_eq(&mat_a, &mat_b));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let registry = test_registry();
        let mut buf = Cursor::new(b"NOPE\x01\x00".to_vec());
        let mut graph = SceneGraph::new();
        assert!(matches!(
            load_scene(&mut graph, &registry, None, &mut buf),
            Err(DeserializeError::BadHeader { .. })
        ));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let registry = test_registry();
        let graph = sample_scene();

        let mut buf = Cursor::new(Vec::new());
        save_scene(&graph, &registry, None, &mut buf).unwrap();
        let mut bytes = buf.into_inner();
        bytes[4] = 0x63; // version 99
        bytes[5] = 0x00;

        let mut loaded = SceneGraph::new();
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(
            load_scene(&mut loaded, &registry, None, &mut cursor),
            Err(DeserializeError::BadHeader { .. })
        ));
    }

    #[test]
    fn unregistered_node_type_fails_save() {
        let mut registry = TypeRegistry::new();
        registry.register::<GroupNode>();
        // MeshNode deliberately not registered.
        let graph = sample_scene();

        let mut buf = Cursor::new(Vec::new());
        assert!(matches!(
            save_scene(&graph, &registry, None, &mut buf),
            Err(SerializeError::UnregisteredType { name: "MeshNode" })
        ));
    }
}
