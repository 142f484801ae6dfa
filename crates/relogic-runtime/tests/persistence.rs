//! Saving and loading through the engine.

use relogic_runtime::kinds::{Animation, Channel, Interface, Timer};
use relogic_runtime::{
    EngineConfig, FeatureLevel, FileAge, LogicEngine, NodeBehavior, NodeError, NodeId, NodeKind, PropertyPath,
    PropertyRef, PropertyTree, PropertyType, Shape, StorageError, Version,
};

fn port(id: NodeId, index: u32) -> PropertyRef {
    PropertyRef::new(id, PropertyPath::from_indices([index]))
}

fn pair() -> Box<dyn NodeBehavior> {
    Box::new(Interface::new(Shape::structure([
        ("speed", Shape::Leaf(PropertyType::Float)),
        ("label", Shape::Leaf(PropertyType::String)),
    ])))
}

fn float_out(engine: &LogicEngine, id: NodeId, name: &str) -> f32 {
    engine.node(id).unwrap().outputs().child(name).unwrap().get().unwrap()
}

/// `first -> (gap) -> third`, with values pushed through once.
fn populated() -> (LogicEngine, NodeId, NodeId) {
    let mut engine = LogicEngine::default();
    let first = engine.create_node("first", pair()).unwrap();
    let gone = engine.create_node("gone", pair()).unwrap();
    let third = engine.create_node("third", pair()).unwrap();
    engine.destroy_node(gone).unwrap();

    engine.set_input(first, &PropertyPath::from_indices([0]), 2.5f32).unwrap();
    engine
        .set_input(first, &PropertyPath::from_indices([1]), String::from("fast"))
        .unwrap();
    engine.create_link(&port(first, 0), &port(third, 0)).unwrap();
    engine.update().unwrap();
    (engine, first, third)
}

#[test]
fn save_and_load_restore_ids_links_and_values() {
    let (engine, first, third) = populated();
    let mut bytes = Vec::new();
    engine.save(&mut bytes).unwrap();

    let mut loaded = LogicEngine::default();
    loaded.load(&mut bytes.as_slice()).unwrap();

    assert_eq!(loaded.graph().node_ids(), vec![first, third]);
    assert!(loaded.node(NodeId(1)).is_none());
    assert_eq!(loaded.find_by_name("third"), Some(third));
    assert_eq!(loaded.graph().link_count(), 1);
    assert!(loaded.is_linked(third));
    assert_eq!(float_out(&loaded, third, "speed"), 2.5);

    let label: String = loaded.node(first).unwrap().inputs().child("label").unwrap().get().unwrap();
    assert_eq!(label, "fast");

    // Saving the loaded graph reproduces the original bytes.
    assert_eq!(loaded.save_to_vec().unwrap(), bytes);
}

#[test]
fn loaded_nodes_run_in_the_next_update() {
    let (engine, first, third) = populated();
    let bytes = engine.save_to_vec().unwrap();

    let mut loaded = LogicEngine::default();
    loaded.load_from_slice(&bytes).unwrap();
    assert!(loaded.is_dirty(first));
    assert!(loaded.is_dirty(third));

    let report = loaded.update().unwrap();
    assert_eq!(report.executed, vec![first, third]);
    assert!(loaded.update().unwrap().executed.is_empty());
}

#[test]
fn failed_load_leaves_the_engine_untouched() {
    let (mut engine, first, _) = populated();
    engine.set_input(first, &PropertyPath::from_indices([0]), 4.0f32).unwrap();
    let before = engine.save_to_vec().unwrap();
    let order = engine.execution_order();

    let err = engine.load_from_slice(b"invaliddata").unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"not relogic content: expected file bytes 0-1 to be 'rl', but found 'in'"
    );

    let mut truncated = before.clone();
    truncated.truncate(before.len() - 3);
    assert!(matches!(
        engine.load_from_slice(&truncated),
        Err(StorageError::CorruptData { .. })
    ));

    assert_eq!(engine.save_to_vec().unwrap(), before);
    assert_eq!(engine.execution_order(), order);
    assert!(engine.is_dirty(first));
}

#[test]
fn far_away_node_id_is_rejected_without_allocating() {
    let (mut engine, first, _) = populated();
    let before = engine.save_to_vec().unwrap();

    // An empty graph saves as the descriptor plus two zero counts, so the
    // first node id sits four bytes past the descriptor.
    let descriptor = LogicEngine::default().save_to_vec().unwrap().len() - 8;
    let mut crafted = before.clone();
    crafted[descriptor + 4..descriptor + 8].copy_from_slice(&5_000_000u32.to_le_bytes());

    let err = engine.load_from_slice(&crafted).unwrap_err();
    assert!(matches!(err, StorageError::CorruptData { .. }), "{err}");
    assert!(err.to_string().contains("unused slots"));

    assert_eq!(engine.save_to_vec().unwrap(), before);
    assert_eq!(engine.graph().node_ids()[0], first);
}

#[test]
fn feature_level_matrix() {
    for file_level in FeatureLevel::ALL {
        let bytes = LogicEngine::with_feature_level(file_level).save_to_vec().unwrap();
        for engine_level in FeatureLevel::ALL {
            let mut engine = LogicEngine::with_feature_level(engine_level);
            let result = engine.load_from_slice(&bytes);
            if file_level == engine_level {
                assert!(result.is_ok(), "{file_level} into {engine_level}: {result:?}");
                continue;
            }
            match result {
                Err(StorageError::FeatureLevelMismatch { file, engine, age }) => {
                    assert_eq!(file, file_level.as_u8());
                    assert_eq!(engine, engine_level);
                    let expected = if file_level < engine_level {
                        FileAge::Older
                    } else {
                        FileAge::Newer
                    };
                    assert_eq!(age, expected);
                }
                other => panic!("{file_level} into {engine_level}: unexpected {other:?}"),
            }
        }
    }
}

#[test]
fn newer_file_message() {
    let bytes = LogicEngine::with_feature_level(FeatureLevel::Level02).save_to_vec().unwrap();
    let err = LogicEngine::default().load_from_slice(&bytes).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"feature level mismatch: loaded file with feature level 02 but the engine runs with feature level 01 (file is newer)"
    );
}

#[test]
fn host_major_version_must_match() {
    let config = EngineConfig {
        host_version: Version::new(10, 20, 900, "suffix"),
        ..EngineConfig::default()
    };
    let bytes = LogicEngine::new(config).save_to_vec().unwrap();

    let err = LogicEngine::default().load_from_slice(&bytes).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"incompatible host version: expected major version 27 but found 10 (file version 10.20.900-suffix)"
    );

    // Minor, patch and label differences are accepted.
    let same_major = LogicEngine::new(EngineConfig {
        host_version: Version::new(27, 9, 0, ""),
        ..EngineConfig::default()
    })
    .save_to_vec().unwrap();
    assert!(LogicEngine::default().load_from_slice(&same_major).is_ok());
}

#[test]
fn peek_reads_only_the_descriptor() {
    let bytes = LogicEngine::with_feature_level(FeatureLevel::Level02).save_to_vec().unwrap();
    assert_eq!(LogicEngine::peek_feature_level(&bytes).unwrap(), FeatureLevel::Level02);

    assert!(matches!(
        LogicEngine::peek_feature_level(b"invaliddata"),
        Err(StorageError::NotThisProduct { .. })
    ));
}

#[derive(Debug)]
struct Doubler;

impl NodeBehavior for Doubler {
    fn kind(&self) -> NodeKind {
        NodeKind::Script
    }

    fn input_shape(&self) -> Shape {
        Shape::structure([("x", Shape::Leaf(PropertyType::Float))])
    }

    fn output_shape(&self) -> Shape {
        Shape::structure([("x", Shape::Leaf(PropertyType::Float))])
    }

    fn recompute(&mut self, inputs: &PropertyTree, outputs: &mut PropertyTree) -> Result<(), NodeError> {
        let x = inputs.child("x")?.get::<f32>()?;
        outputs.child_mut("x")?.set(x * 2.0)?;
        Ok(())
    }
}

#[test]
fn custom_kinds_need_a_registered_factory() {
    let mut engine = LogicEngine::default();
    engine.create_node("double", Box::new(Doubler)).unwrap();
    let bytes = engine.save_to_vec().unwrap();

    let mut loader = LogicEngine::default();
    let err = loader.load_from_slice(&bytes).unwrap_err();
    assert!(matches!(
        err,
        StorageError::UnregisteredNodeKind { kind: NodeKind::Script }
    ));

    loader.register_kind(NodeKind::Script, |_| Ok(Box::new(Doubler) as Box<dyn NodeBehavior>));
    loader.load_from_slice(&bytes).unwrap();
    assert_eq!(loader.graph().node_count(), 1);
}

#[test]
fn timer_drives_an_animation_across_save_and_load() {
    let mut engine = LogicEngine::default();
    let timer = engine.create_node("clock", Box::new(Timer::new())).unwrap();
    let channel = Channel::new(vec![0.0, 2.0], vec![0.0, 100.0]).unwrap();
    let anim = engine
        .create_node("fade", Box::new(Animation::new(channel)))
        .unwrap();
    // time_delta -> progress
    engine.create_link(&port(timer, 1), &port(anim, 0)).unwrap();

    engine.set_input(timer, &PropertyPath::from_indices([0]), 1_000_000i64).unwrap();
    engine.update().unwrap();
    assert_eq!(float_out(&engine, anim, "channel"), 0.0);
    assert_eq!(float_out(&engine, anim, "duration"), 2.0);

    engine.set_input(timer, &PropertyPath::from_indices([0]), 1_250_000i64).unwrap();
    engine.update().unwrap();
    assert_eq!(float_out(&engine, timer, "time_delta"), 0.25);
    assert_eq!(float_out(&engine, anim, "channel"), 25.0);

    let mut loaded = LogicEngine::default();
    loaded.load_from_slice(&engine.save_to_vec().unwrap()).unwrap();
    assert_eq!(float_out(&loaded, anim, "channel"), 25.0);
    loaded.update().unwrap();
    assert_eq!(loaded.node(anim).unwrap().kind(), NodeKind::Animation);
}

#[test]
fn animation_failure_does_not_block_the_timer() {
    let mut engine = LogicEngine::default();
    let timer = engine.create_node("clock", Box::new(Timer::new())).unwrap();
    let channel = Channel::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
    let anim = engine
        .create_node("fade", Box::new(Animation::new(channel)))
        .unwrap();
    engine.create_link(&port(timer, 1), &port(anim, 0)).unwrap();

    engine.set_input(timer, &PropertyPath::from_indices([0]), 1_000_000i64).unwrap();
    engine.update().unwrap();
    // A three-second step pushes progress past 1.
    engine.set_input(timer, &PropertyPath::from_indices([0]), 4_000_000i64).unwrap();
    let err = engine.update().unwrap_err();
    assert_eq!(err.failures.len(), 1);
    assert_eq!(err.failures[0].node, anim);
    assert_eq!(float_out(&engine, timer, "time_delta"), 3.0);
}

#[test]
fn extreme_keyframes_survive_save_and_load() {
    let mut engine = LogicEngine::default();
    let channel = Channel::new(
        vec![-1.0e30, -0.0, f32::MIN_POSITIVE, 1.0e30],
        vec![f32::MAX, f32::MIN, f32::from_bits(1), -0.0],
    )
    .unwrap();
    let anim = engine
        .create_node("extreme", Box::new(Animation::new(channel.clone())))
        .unwrap();
    engine.update().unwrap();
    assert_eq!(float_out(&engine, anim, "channel"), f32::MAX);

    let mut loaded = LogicEngine::default();
    loaded.load_from_slice(&engine.save_to_vec().unwrap()).unwrap();
    loaded.update().unwrap();
    assert_eq!(float_out(&loaded, anim, "duration"), 2.0e30);
    assert_eq!(float_out(&loaded, anim, "channel"), f32::MAX);
    assert_eq!(loaded.save_to_vec().unwrap(), engine.save_to_vec().unwrap());
}

#[test]
fn non_finite_keyframes_never_reach_a_saved_graph() {
    assert!(Channel::new(vec![0.0, 1.0], vec![f32::NAN, 0.0]).is_err());
    assert!(Channel::new(vec![0.0, f32::INFINITY], vec![0.0, 0.0]).is_err());
}
