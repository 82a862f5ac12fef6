//! Plugin application, the prop pipeline, and class resolution.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::json;

use formtree_engine::model::{ClassSource, ConfigValue, NodeType, PropValue, options};
use formtree_engine::{
    CreateNode, Feature, FormEngine, NodeDefinition, Plugin, PluginSignal, PropHook, PropRecord,
};

fn uppercase_label_plugin() -> Plugin {
    Plugin::new("uppercase-label", |ctx| {
        let hook: PropHook = Rc::new(|mut record: PropRecord, next| {
            if record.prop == "label"
                && let Some(upper) = record.value.as_str().map(str::to_uppercase)
            {
                record.value = PropValue::text(upper);
            }
            next(record)
        });
        ctx.add_prop_hook(hook);
        Ok(PluginSignal::Continue)
    })
}

#[test]
fn hooks_transform_props_before_commit() {
    let mut engine = FormEngine::new();
    engine.register_plugin(uppercase_label_plugin());
    let field = engine
        .create_node(CreateNode::input().with_prop("label", "Email"))
        .unwrap();
    assert_eq!(
        engine.node(field).unwrap().prop("label").and_then(PropValue::as_str),
        Some("EMAIL")
    );

    // Later assignments go through the same chain.
    engine.set_prop(field, "label", "Work email").unwrap();
    assert_eq!(
        engine.node(field).unwrap().prop("label").and_then(PropValue::as_str),
        Some("WORK EMAIL")
    );
}

#[test]
fn a_hook_that_drops_the_continuation_swallows_the_assignment() {
    let mut engine = FormEngine::new();
    let swallow = Plugin::new("swallow-secret", |ctx| {
        let hook: PropHook = Rc::new(|record: PropRecord, next| {
            if record.prop == "secret" { None } else { next(record) }
        });
        ctx.add_prop_hook(hook);
        Ok(PluginSignal::Continue)
    });
    engine.register_plugin(swallow);

    let field = engine
        .create_node(
            CreateNode::input()
                .with_prop("secret", "hunter2")
                .with_prop("help", "visible"),
        )
        .unwrap();

    let node = engine.node(field).unwrap();
    assert!(node.prop("secret").is_none());
    assert_eq!(node.prop("help").and_then(PropValue::as_str), Some("visible"));
}

#[test]
fn halt_stops_later_plugins_but_keeps_earlier_effects() {
    let mut engine = FormEngine::new();
    engine.register_plugin(Plugin::new("first", |ctx| {
        ctx.stage_prop("from_first", true);
        Ok(PluginSignal::Halt)
    }));
    engine.register_plugin(Plugin::new("second", |ctx| {
        ctx.stage_prop("from_second", true);
        Ok(PluginSignal::Continue)
    }));

    let field = engine.create_node(CreateNode::input()).unwrap();
    let node = engine.node(field).unwrap();
    assert_eq!(node.prop("from_first").and_then(PropValue::as_bool), Some(true));
    assert!(node.prop("from_second").is_none());
}

#[test]
fn a_failing_plugin_is_skipped_without_aborting_the_node() {
    let mut engine = FormEngine::new();
    engine.register_plugin(Plugin::new("broken", |ctx| {
        ctx.stage_prop("before_failure", true);
        Err(formtree_engine::EngineError::Plugin {
            plugin: "broken".to_string(),
            reason: "backend unavailable".to_string(),
        })
    }));
    engine.register_plugin(Plugin::new("healthy", |ctx| {
        ctx.stage_prop("from_healthy", true);
        Ok(PluginSignal::Continue)
    }));

    let field = engine.create_node(CreateNode::input()).unwrap();
    let node = engine.node(field).unwrap();
    // Effects staged before the failure stick; later plugins still run.
    assert_eq!(node.prop("before_failure").and_then(PropValue::as_bool), Some(true));
    assert_eq!(node.prop("from_healthy").and_then(PropValue::as_bool), Some(true));
}

fn rating_library() -> Plugin {
    Plugin::new("rating-library", |_| Ok(PluginSignal::Continue)).with_library(|ctx| {
        if !ctx.is_defined() {
            ctx.define(
                NodeDefinition::of_type(NodeType::Custom("rating".to_string()))
                    .with_schema(json!({"element": "div"}))
                    .allow_props(["rating_max"])
                    .with_feature(Feature::new("rating-defaults", |ctx| {
                        ctx.stage_prop("rating_max", 5.0);
                        Ok(PluginSignal::Continue)
                    })),
            )?;
        }
        Ok(PluginSignal::Continue)
    })
}

#[test]
fn define_installs_type_schema_and_feature_defaults() {
    let mut engine = FormEngine::new();
    engine.register_plugin(rating_library());
    let field = engine.create_node(CreateNode::input()).unwrap();

    let node = engine.node(field).unwrap();
    assert_eq!(node.node_type, NodeType::Custom("rating".to_string()));
    assert_eq!(node.schema(), Some(&json!({"element": "div"})));
    assert_eq!(node.prop("rating_max").and_then(PropValue::as_u64), Some(5));
}

#[test]
fn define_is_one_shot_per_node() {
    let mut engine = FormEngine::new();
    engine.register_plugin(rating_library());
    engine.register_plugin(Plugin::new("usurper", |ctx| {
        // Errors inside a plugin are contained; the first definition wins.
        ctx.define(NodeDefinition::of_type(NodeType::Custom("stolen".to_string())))?;
        Ok(PluginSignal::Continue)
    }));

    let field = engine.create_node(CreateNode::input()).unwrap();
    assert_eq!(
        engine.node(field).unwrap().node_type,
        NodeType::Custom("rating".to_string())
    );
}

#[test]
fn library_functions_resolve_the_type_before_any_run() {
    let mut engine = FormEngine::new();
    let seen: Rc<RefCell<Option<String>>> = Rc::default();
    let sink = Rc::clone(&seen);
    engine.register_plugin(Plugin::new("observer", move |ctx| {
        *sink.borrow_mut() = Some(ctx.node().node_type.tag().to_string());
        Ok(PluginSignal::Continue)
    }));
    // Registered after the observer, yet its library function runs first.
    engine.register_plugin(rating_library());

    engine.create_node(CreateNode::input()).unwrap();
    assert_eq!(seen.borrow().as_deref(), Some("rating"));
}

#[test]
fn declared_prop_whitelist_ignores_strangers() {
    let mut engine = FormEngine::new();
    engine.register_plugin(rating_library());
    let field = engine.create_node(CreateNode::input()).unwrap();

    engine.set_prop(field, "bogus", "nope").unwrap();
    engine.set_prop(field, "rating_max", 10.0).unwrap();
    engine.set_prop(field, "label", "Stars").unwrap();

    let node = engine.node(field).unwrap();
    assert!(node.prop("bogus").is_none());
    assert_eq!(node.prop("rating_max").and_then(PropValue::as_u64), Some(10));
    // Universal props bypass the whitelist.
    assert_eq!(node.prop("label").and_then(PropValue::as_str), Some("Stars"));
}

#[test]
fn classes_compose_defaults_cascade_and_props_in_priority_order() {
    let mut engine = FormEngine::new();
    let form = engine.create_node(CreateNode::group()).unwrap();
    let mut sections = BTreeMap::new();
    sections.insert("outer".to_string(), ClassSource::tokens("theme-outer"));
    engine
        .set_option(form, options::CLASSES, ConfigValue::Classes(sections))
        .unwrap();
    let field = engine.create_node(CreateNode::input().under(form)).unwrap();

    assert_eq!(
        engine.resolve_classes(field, "outer").unwrap(),
        "formtree-outer theme-outer"
    );

    // A $reset at the head of a higher-priority source discards all of it.
    engine.set_prop(field, "outer_class", "$reset custom").unwrap();
    assert_eq!(engine.resolve_classes(field, "outer").unwrap(), "custom");

    // Resolution is pure: repeating it changes nothing.
    assert_eq!(engine.resolve_classes(field, "outer").unwrap(), "custom");
}

#[test]
fn root_classes_function_replaces_the_stock_defaults() {
    let mut engine = FormEngine::new();
    let form = engine.create_node(CreateNode::group()).unwrap();
    engine
        .set_option(
            form,
            options::ROOT_CLASSES,
            ConfigValue::RootClasses(Rc::new(|section| {
                Some(ClassSource::tokens(format!("x-{section}")))
            })),
        )
        .unwrap();
    let field = engine.create_node(CreateNode::input().under(form)).unwrap();

    assert_eq!(engine.resolve_classes(field, "label").unwrap(), "x-label");
    assert_eq!(engine.resolve_classes(field, "outer").unwrap(), "x-outer");
}

#[test]
fn function_sources_see_live_node_state() {
    let mut engine = FormEngine::new();
    let field = engine
        .create_node(CreateNode::input().with_value(json!("")))
        .unwrap();
    let mut sections = BTreeMap::new();
    sections.insert(
        "input".to_string(),
        ClassSource::func(|node| {
            ClassSource::flags([("filled", !node.value.as_str().unwrap_or("").is_empty())])
        }),
    );
    engine
        .set_prop(field, "classes", PropValue::SectionClasses(sections))
        .unwrap();

    assert_eq!(engine.resolve_classes(field, "input").unwrap(), "formtree-input");
    engine.set_value(field, json!("hello"), Some(0)).unwrap();
    assert_eq!(
        engine.resolve_classes(field, "input").unwrap(),
        "formtree-input filled"
    );
}

#[test]
fn flag_map_sources_filter_by_flag() {
    let mut engine = FormEngine::new();
    let field = engine.create_node(CreateNode::input()).unwrap();
    engine
        .set_prop(
            field,
            "wrapper_class",
            PropValue::Classes(ClassSource::flags([("compact", true), ("wide", false)])),
        )
        .unwrap();
    assert_eq!(
        engine.resolve_classes(field, "wrapper").unwrap(),
        "formtree-wrapper compact"
    );
}
