//! Tree lifecycle and configuration cascade behavior.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;

use formtree_engine::model::{ConfigValue, NodeId, options};
use formtree_engine::{CreateNode, EngineError, EngineEvent, EventKind, FormEngine};

fn record_events(engine: &mut FormEngine) -> Rc<RefCell<Vec<EngineEvent>>> {
    let log: Rc<RefCell<Vec<EngineEvent>>> = Rc::default();
    let sink = Rc::clone(&log);
    engine.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    log
}

fn behavior(engine: &FormEngine, id: NodeId) -> String {
    engine
        .resolve_option(id, options::ERROR_BEHAVIOR)
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

#[test]
fn options_resolve_through_nearest_ancestor_scope() {
    let mut engine = FormEngine::new();
    let outer_group = engine.create_node(CreateNode::group().named("outer")).unwrap();
    engine
        .set_option(outer_group, options::ERROR_BEHAVIOR, "foobar")
        .unwrap();
    let inner_group = engine
        .create_node(CreateNode::group().named("inner").under(outer_group))
        .unwrap();
    engine
        .set_option(inner_group, options::ERROR_BEHAVIOR, "live")
        .unwrap();

    let explicit = engine
        .create_node(
            CreateNode::input()
                .named("explicit")
                .under(inner_group)
                .with_option(options::ERROR_BEHAVIOR, "barfoo"),
        )
        .unwrap();
    let sibling = engine
        .create_node(CreateNode::input().named("sibling").under(inner_group))
        .unwrap();
    let cousin = engine
        .create_node(CreateNode::input().named("cousin").under(outer_group))
        .unwrap();

    assert_eq!(behavior(&engine, explicit), "barfoo");
    assert_eq!(behavior(&engine, sibling), "live");
    assert_eq!(behavior(&engine, cousin), "foobar");
}

#[test]
fn late_ancestor_write_is_seen_by_existing_descendants() {
    let mut engine = FormEngine::new();
    let form = engine.create_node(CreateNode::group()).unwrap();
    let field = engine.create_node(CreateNode::input().under(form)).unwrap();

    // Nothing written yet: the process-wide default applies.
    assert_eq!(behavior(&engine, field), "blur");

    engine.set_option(form, options::ERROR_BEHAVIOR, "dirty").unwrap();
    assert_eq!(behavior(&engine, field), "dirty");
}

#[test]
fn unknown_option_keys_cascade_untouched() {
    let mut engine = FormEngine::new();
    let form = engine.create_node(CreateNode::group()).unwrap();
    let field = engine.create_node(CreateNode::input().under(form)).unwrap();

    engine.set_option(form, "flavor", "legacy").unwrap();
    engine.set_option(form, "totally_made_up", json!(42)).unwrap();

    let flavor = engine
        .resolve_option(field, "flavor")
        .and_then(|v| v.as_str().map(str::to_string));
    assert_eq!(flavor.as_deref(), Some("legacy"));
    assert_eq!(
        engine.resolve_option(field, "totally_made_up").and_then(|v| v.as_u64()),
        Some(42)
    );
    assert!(engine.resolve_option(field, "never_written").is_none());
}

#[test]
fn delay_falls_back_to_the_global_default() {
    let mut engine = FormEngine::new();
    let field = engine.create_node(CreateNode::input()).unwrap();
    assert_eq!(
        engine.resolve_option(field, options::DELAY).and_then(|v| v.as_u64()),
        Some(options::DEFAULT_DELAY_MS)
    );
}

#[test]
fn unnamed_nodes_get_generated_names() {
    let mut engine = FormEngine::new();
    let first = engine.create_node(CreateNode::input()).unwrap();
    let second = engine.create_node(CreateNode::group()).unwrap();

    assert_eq!(engine.node(first).unwrap().name, "input_1");
    assert_eq!(engine.node(second).unwrap().name, "group_2");
}

#[test]
fn created_fires_before_prop_resolution() {
    let mut engine = FormEngine::new();
    let log = record_events(&mut engine);
    let field = engine
        .create_node(CreateNode::input().with_prop("label", "Email"))
        .unwrap();

    let kinds: Vec<EventKind> = log
        .borrow()
        .iter()
        .filter(|event| event.node == field)
        .map(|event| event.kind.clone())
        .collect();
    assert_eq!(kinds.first(), Some(&EventKind::Created));
    assert!(kinds.contains(&EventKind::Prop { name: "label".to_string() }));
}

#[test]
fn remove_tears_down_the_subtree() {
    let mut engine = FormEngine::new();
    let form = engine.create_node(CreateNode::group()).unwrap();
    let row = engine.create_node(CreateNode::group().under(form)).unwrap();
    let field = engine.create_node(CreateNode::input().under(row)).unwrap();
    assert_eq!(engine.node_count(), 3);

    let log = record_events(&mut engine);
    engine.remove_node(row).unwrap();

    assert_eq!(engine.node_count(), 1);
    assert!(engine.node(row).is_none());
    assert!(engine.node(field).is_none());
    assert!(log.borrow().iter().any(|event| {
        event.node == form && event.kind == EventKind::ChildRemoved(row)
    }));
}

#[test]
fn a_failed_create_rolls_back_without_structural_events() {
    let mut engine = FormEngine::new();
    let form = engine.create_node(CreateNode::group()).unwrap();
    let log = record_events(&mut engine);

    let result = engine.create_node(
        CreateNode::input()
            .under(form)
            .with_prop("validation", "no_such_rule"),
    );

    assert!(result.is_err());
    assert_eq!(engine.node_count(), 1);
    assert!(engine.node(form).unwrap().children().is_empty());
    // The child never announced itself, so neither does the rollback.
    assert!(!log.borrow().iter().any(|event| {
        matches!(event.kind, EventKind::ChildAdded(_) | EventKind::ChildRemoved(_))
    }));
}

#[test]
fn moving_under_a_descendant_is_rejected() {
    let mut engine = FormEngine::new();
    let form = engine.create_node(CreateNode::group()).unwrap();
    let row = engine.create_node(CreateNode::group().under(form)).unwrap();

    assert!(matches!(
        engine.move_node(form, row),
        Err(EngineError::CyclicMove { .. })
    ));
    assert!(matches!(
        engine.move_node(form, form),
        Err(EngineError::CyclicMove { .. })
    ));
}

#[test]
fn moving_a_node_recascades_its_configuration() {
    let mut engine = FormEngine::new();
    let strict = engine.create_node(CreateNode::group().named("strict")).unwrap();
    engine.set_option(strict, options::ERROR_BEHAVIOR, "live").unwrap();
    let lax = engine.create_node(CreateNode::group().named("lax")).unwrap();
    let field = engine.create_node(CreateNode::input().under(lax)).unwrap();
    assert_eq!(behavior(&engine, field), "blur");

    engine.move_node(field, strict).unwrap();

    assert_eq!(behavior(&engine, field), "live");
    assert_eq!(engine.node(field).unwrap().parent(), Some(strict));
    assert!(engine.node(lax).unwrap().children().is_empty());
    assert_eq!(engine.node(strict).unwrap().children(), &[field]);
}

#[test]
fn option_writes_skip_shadowed_subtrees() {
    let mut engine = FormEngine::new();
    let form = engine.create_node(CreateNode::group()).unwrap();
    let shadowed = engine
        .create_node(
            CreateNode::group()
                .under(form)
                .with_option(options::ERROR_BEHAVIOR, "dirty"),
        )
        .unwrap();
    let under_shadow = engine
        .create_node(CreateNode::input().under(shadowed))
        .unwrap();
    let plain = engine.create_node(CreateNode::input().under(form)).unwrap();

    let log = record_events(&mut engine);
    engine.set_option(form, options::ERROR_BEHAVIOR, "live").unwrap();

    let notified: Vec<NodeId> = log
        .borrow()
        .iter()
        .filter(|event| {
            event.kind == EventKind::Prop { name: format!("config:{}", options::ERROR_BEHAVIOR) }
        })
        .map(|event| event.node)
        .collect();
    assert!(notified.contains(&form));
    assert!(notified.contains(&plain));
    assert!(!notified.contains(&shadowed));
    assert!(!notified.contains(&under_shadow));

    // The shadowed subtree still resolves its own value.
    assert_eq!(behavior(&engine, under_shadow), "dirty");
    assert_eq!(behavior(&engine, plain), "live");
}

#[test]
fn config_value_shapes_round_trip() {
    let mut engine = FormEngine::new();
    let form = engine.create_node(CreateNode::group()).unwrap();
    engine
        .set_option(form, options::DELAY, ConfigValue::json(json!(150)))
        .unwrap();
    let field = engine.create_node(CreateNode::input().under(form)).unwrap();
    assert_eq!(
        engine.resolve_option(field, options::DELAY).and_then(|v| v.as_u64()),
        Some(150)
    );
}
