//! End-to-end scene persistence tests against the public API.

use std::io::Cursor;
use std::sync::Arc;

use vermilion_scene::serialize::{BinWriter, SceneObject, WriteSession};
use vermilion_scene::{
    AssetResolver, CameraNode, DeserializeError, GroupNode, LightNode, MeshNode, OrbitController,
    SceneGraph, TypeRegistry, load_scene, load_scene_file, register_scene_types, save_scene,
    save_scene_file,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn full_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    register_scene_types(&mut registry);
    registry
}

/// An editor-shaped scene: a props entity with a group root over two mesh
/// nodes sharing one material, plus a rig entity holding camera and light
/// with a controller attached.
fn editor_scene() -> SceneGraph {
    let mut graph = SceneGraph::new();

    let props = graph.create_entity("props");
    let root = graph.create_node(props, GroupNode::default());
    graph.core_mut(root).unwrap().name = "props root".to_owned();

    let mut crate_mesh = MeshNode::default();
    crate_mesh.core.name = "crate".to_owned();
    crate_mesh.core.local_transform[12] = 2.0;
    crate_mesh.mesh_path = "/project/meshes/crate.glb".to_owned();
    crate_mesh.casts_shadow = true;
    crate_mesh.material.write().base_color = [0.8, 0.2, 0.2, 1.0];
    let material = crate_mesh.material.clone();
    let crate_id = graph.create_node(props, crate_mesh);
    graph.set_parent(crate_id, Some(root));

    let mut barrel_mesh = MeshNode::default();
    barrel_mesh.core.name = "barrel".to_owned();
    barrel_mesh.mesh_path = "/project/meshes/barrel.glb".to_owned();
    barrel_mesh.material = material;
    let barrel_id = graph.create_node(props, barrel_mesh);
    graph.set_parent(barrel_id, Some(root));

    let rig = graph.create_entity("camera rig");
    let orbit = OrbitController {
        target: [0.0, 1.0, 0.0],
        distance: 8.0,
        speed: 0.5,
    };
    graph.entity_mut(rig).unwrap().controller = Some(Box::new(orbit));
    let camera = graph.create_node(rig, CameraNode::default());
    graph.core_mut(camera).unwrap().name = "main camera".to_owned();
    let light = graph.create_node(rig, LightNode::default());
    graph.set_parent(light, Some(camera));

    graph
}

#[test]
fn editor_scene_round_trips() {
    init();
    let registry = full_registry();
    let graph = editor_scene();

    let mut buf = Cursor::new(Vec::new());
    let written = save_scene(&graph, &registry, None, &mut buf).unwrap();
    assert_eq!(written, buf.get_ref().len() as u64);

    buf.set_position(0);
    let mut loaded = SceneGraph::new();
    load_scene(&mut loaded, &registry, None, &mut buf).unwrap();

    assert_eq!(loaded.entity_count(), 2);
    assert_eq!(loaded.node_count(), 5);

    let mut entities = loaded.entities();
    let props = entities.next().unwrap();
    let rig = entities.next().unwrap();
    assert_eq!(props.name, "props");
    assert_eq!(rig.name, "camera rig");

    // Hierarchy survives through the node table.
    let [root, crate_id, barrel_id] = props.nodes() else {
        panic!("props should own three nodes");
    };
    assert_eq!(loaded.core(*root).unwrap().name, "props root");
    assert_eq!(loaded.core(*root).unwrap().children(), &[*crate_id, *barrel_id]);
    assert_eq!(loaded.core(*crate_id).unwrap().parent(), Some(*root));

    let crate_mesh = loaded.node_as::<MeshNode>(*crate_id).unwrap();
    assert_eq!(crate_mesh.core.local_transform[12], 2.0);
    assert!(crate_mesh.casts_shadow);
    assert_eq!(crate_mesh.material.read().base_color, [0.8, 0.2, 0.2, 1.0]);

    // Both meshes resolve to one material instance after load.
    let mat_a = loaded.node_as::<MeshNode>(*crate_id).unwrap().material.clone();
    let mat_b = loaded.node_as::<MeshNode>(*barrel_id).unwrap().material.clone();
    assert!(Arc::ptr_eq(&mat_a, &mat_b));

    // The rig's controller came back as its concrete type.
    let controller = rig.controller.as_ref().unwrap();
    let orbit = controller.as_any().downcast_ref::<OrbitController>().unwrap();
    assert_eq!(orbit.distance, 8.0);
    assert_eq!(orbit.target, [0.0, 1.0, 0.0]);

    let [camera, light] = rig.nodes() else {
        panic!("rig should own two nodes");
    };
    assert_eq!(loaded.core(*light).unwrap().parent(), Some(*camera));
}

#[test]
fn scene_round_trips_through_a_file() {
    init();
    let registry = full_registry();
    let graph = editor_scene();

    let path = std::env::temp_dir().join(format!("vermilion_it_{}.vmsc", std::process::id()));
    save_scene_file(&graph, &registry, None, &path).unwrap();

    let mut loaded = SceneGraph::new();
    load_scene_file(&mut loaded, &registry, None, &path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.entity_count(), graph.entity_count());
    assert_eq!(loaded.node_count(), graph.node_count());
}

#[test]
fn polymorphic_node_through_base_handle() {
    init();
    let registry = full_registry();

    let mut mesh = MeshNode::default();
    mesh.core.name = "held as base".to_owned();
    mesh.mesh_path = "meshes/held.glb".to_owned();
    let handle: Box<dyn SceneObject> = Box::new(mesh);

    let mut buf = Cursor::new(Vec::new());
    {
        let mut w = BinWriter::new(&mut buf);
        let mut session = WriteSession::new(&registry);
        // Dispatch goes through the concrete schema even via the base handle.
        handle.write_fields(&mut w, &mut session).unwrap();
    }

    buf.set_position(0);
    let mut rebuilt = registry.create_by_name(handle.type_name()).unwrap();
    {
        let mut r = vermilion_scene::serialize::BinReader::new(&mut buf);
        let mut session = vermilion_scene::serialize::ReadSession::new(&registry);
        rebuilt.read_fields(&mut r, &mut session).unwrap();
    }

    let mesh = rebuilt.as_any().downcast_ref::<MeshNode>().unwrap();
    assert_eq!(mesh.mesh_path, "meshes/held.glb");
    // The base chunk carried the core fields.
    assert_eq!(mesh.core.name, "held as base");
}

#[test]
fn unknown_controller_type_is_tolerated() {
    init();
    let writer_registry = full_registry();

    // A reader built before controllers existed.
    let mut reader_registry = TypeRegistry::new();
    reader_registry.register::<vermilion_scene::Entity>();
    reader_registry.register::<GroupNode>();
    reader_registry.register::<MeshNode>();
    reader_registry.register::<CameraNode>();
    reader_registry.register::<LightNode>();
    reader_registry.register::<vermilion_scene::Material>();

    let graph = editor_scene();
    let mut buf = Cursor::new(Vec::new());
    save_scene(&graph, &writer_registry, None, &mut buf).unwrap();

    buf.set_position(0);
    let mut loaded = SceneGraph::new();
    load_scene(&mut loaded, &reader_registry, None, &mut buf).unwrap();

    // Everything loads; only the unknown controller is dropped to None.
    assert_eq!(loaded.entity_count(), 2);
    assert_eq!(loaded.node_count(), 5);
    let rig = loaded.entities().nth(1).unwrap();
    assert_eq!(rig.name, "camera rig");
    assert!(rig.controller.is_none());
}

#[test]
fn missing_entity_is_fatal() {
    init();
    let registry = full_registry();

    // Hand-build a scene file whose single node references an entity that
    // is not in the entity table.
    let mut buf = Cursor::new(Vec::new());
    {
        let mut w = BinWriter::new(&mut buf);
        let mut session = WriteSession::new(&registry);
        w.write_bytes(b"VMSC").unwrap();
        w.write_u16(1).unwrap(); // version
        w.write_u32(0).unwrap(); // no entities
        w.write_u32(1).unwrap(); // one node
        w.write_u32(1).unwrap(); // sid
        w.write_u8("GroupNode".len() as u8).unwrap();
        w.write_bytes(b"GroupNode").unwrap();
        w.write_u32(77).unwrap(); // bogus entity id
        w.write_u32(0).unwrap(); // no parent
        w.write_u32(0).unwrap(); // no children
        GroupNode::default().write_fields(&mut w, &mut session).unwrap();
    }

    buf.set_position(0);
    let mut graph = SceneGraph::new();
    assert!(matches!(
        load_scene(&mut graph, &registry, None, &mut buf),
        Err(DeserializeError::MissingEntity { entity: 77, node: 1 })
    ));
}

#[test]
fn mesh_paths_persist_project_relative() {
    init();
    let registry = full_registry();
    let graph = editor_scene();

    let save_resolver = AssetResolver::new("/project");
    let mut buf = Cursor::new(Vec::new());
    save_scene(&graph, &registry, Some(&save_resolver), &mut buf).unwrap();

    // Loading under a different project root re-anchors the paths.
    let load_resolver = AssetResolver::new("/mnt/checkout");
    buf.set_position(0);
    let mut loaded = SceneGraph::new();
    load_scene(&mut loaded, &registry, Some(&load_resolver), &mut buf).unwrap();

    let props = loaded.entities().next().unwrap();
    let crate_id = props.nodes()[1];
    let mesh = loaded.node_as::<MeshNode>(crate_id).unwrap();
    assert_eq!(mesh.mesh_path, "/mnt/checkout/meshes/crate.glb");
}
