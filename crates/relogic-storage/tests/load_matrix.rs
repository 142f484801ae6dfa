//! Compatibility matrix: every combination of file level and engine level,
//! plus descriptors with exactly one field wrong.

use relogic_core::{
    FeatureLevel, KindRegistry, LogicGraph, NodeBehavior, NodeError, NodeKind, PropertyTree, PropertyType, Shape,
};
use relogic_storage::bytes::ByteWriter;
use relogic_storage::{decode, encode, FileAge, Header, LoadOptions, StorageError, Version};

#[derive(Debug)]
struct Anchor;

impl NodeBehavior for Anchor {
    fn kind(&self) -> NodeKind {
        NodeKind::AnchorPoint
    }

    fn input_shape(&self) -> Shape {
        Shape::structure([("offset", Shape::Leaf(PropertyType::Vec2i))])
    }

    fn output_shape(&self) -> Shape {
        Shape::empty()
    }

    fn recompute(&mut self, _inputs: &PropertyTree, _outputs: &mut PropertyTree) -> Result<(), NodeError> {
        Ok(())
    }
}

fn host() -> Version {
    Version::new(27, 0, 130, "")
}

fn registry() -> KindRegistry {
    let mut registry = KindRegistry::new();
    registry.register(NodeKind::AnchorPoint, |_| Ok(Box::new(Anchor) as Box<dyn NodeBehavior>));
    registry
}

fn load(bytes: &[u8], level: FeatureLevel) -> Result<LogicGraph, StorageError> {
    let host = host();
    let registry = registry();
    let options = LoadOptions {
        feature_level: level,
        host_version: &host,
        registry: &registry,
    };
    decode(bytes, &options).map(|decoded| decoded.graph)
}

/// An empty container with a freely chosen tag and enumerator.
fn container(tag: [u8; 2], stored_level: u8) -> Vec<u8> {
    let header = Header {
        level_tag: tag,
        host_version: host(),
        engine_version: Version::new(0, 1, 0, ""),
        feature_level: stored_level,
        feature_level_offset: 0,
    };
    let mut w = ByteWriter::new();
    header.write(&mut w).unwrap();
    w.count(0).unwrap();
    w.count(0).unwrap();
    w.into_inner()
}

#[test]
fn same_level_loads() {
    for level in FeatureLevel::ALL {
        let bytes = encode(&LogicGraph::new(level), &host(), &host()).unwrap();
        let graph = load(&bytes, level).unwrap();
        assert_eq!(graph.feature_level(), level);
        assert_eq!(graph.node_count(), 0);
    }
}

#[test]
fn level_01_file_in_level_02_engine() {
    let bytes = encode(&LogicGraph::new(FeatureLevel::Level01), &host(), &host()).unwrap();
    let err = load(&bytes, FeatureLevel::Level02).unwrap_err();
    assert!(matches!(
        err,
        StorageError::FeatureLevelMismatch {
            file: 1,
            engine: FeatureLevel::Level02,
            age: FileAge::Older,
        }
    ));
}

#[test]
fn level_02_file_in_level_01_engine() {
    let bytes = encode(&LogicGraph::new(FeatureLevel::Level02), &host(), &host()).unwrap();
    let err = load(&bytes, FeatureLevel::Level01).unwrap_err();
    assert!(matches!(
        err,
        StorageError::FeatureLevelMismatch {
            file: 2,
            engine: FeatureLevel::Level01,
            age: FileAge::Newer,
        }
    ));
}

#[test]
fn engine_tag_over_older_payload_is_corrupt() {
    let bytes = container(*b"02", 1);
    assert!(matches!(
        load(&bytes, FeatureLevel::Level02),
        Err(StorageError::CorruptData { .. })
    ));
    let bytes = container(*b"01", 2);
    assert!(matches!(
        load(&bytes, FeatureLevel::Level01),
        Err(StorageError::CorruptData { .. })
    ));
}

#[test]
fn unknown_tag_counts_as_newer() {
    let bytes = container(*b"99", 1);
    let err = load(&bytes, FeatureLevel::Level01).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"feature level mismatch: loaded file with feature level 99 but the engine runs with feature level 01 (file is newer)"
    );
}

#[test]
fn level_02_kinds_round_trip_at_level_02() {
    let mut graph = LogicGraph::new(FeatureLevel::Level02);
    let id = graph.create_node("anchor", Box::new(Anchor)).unwrap();
    graph
        .set_input(id, &relogic_core::PropertyPath::from_indices([0]), [3i32, 4])
        .unwrap();

    let bytes = encode(&graph, &host(), &host()).unwrap();
    let loaded = load(&bytes, FeatureLevel::Level02).unwrap();
    let node = loaded.node(id).unwrap();
    assert_eq!(node.kind(), NodeKind::AnchorPoint);
    assert_eq!(node.inputs().child("offset").unwrap().get::<[i32; 2]>().unwrap(), [3, 4]);
}

#[test]
fn level_02_kind_in_level_01_payload_is_corrupt() {
    let mut graph = LogicGraph::new(FeatureLevel::Level02);
    graph.create_node("anchor", Box::new(Anchor)).unwrap();
    let mut bytes = encode(&graph, &host(), &host()).unwrap();

    // Relabel the whole container as level 01.
    bytes[2..4].copy_from_slice(b"01");
    let offset = Header::read(&mut relogic_storage::bytes::ByteReader::new(&bytes))
        .unwrap()
        .feature_level_offset;
    bytes[offset] = 1;

    let err = load(&bytes, FeatureLevel::Level01).unwrap_err();
    assert!(matches!(err, StorageError::CorruptData { .. }));
    assert!(err.to_string().contains("AnchorPoint"));
}
