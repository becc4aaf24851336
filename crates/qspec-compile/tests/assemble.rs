//! End-to-end descriptor assembly: raw JSON input through to the descriptor
//! the execution engine receives.

use qspec_ast::QuerySpec;
use qspec_compile::{
    CompileError, Diagnostic, JsonFilterTranslator, QueryContext, TranslationError,
};
use qspec_ir::{
    BaseDescriptor, CompareOp, Direction, Include, OrderTerm, Predicate, RelationHandle, Slot,
};
use qspec_registry::{ModelRegistry, RegistryError, RelationDef, StaticRegistry};
use serde_json::{json, Map, Value};

fn context() -> QueryContext {
    let registry = StaticRegistry::default()
        .with_relation(
            "pictures",
            RelationDef {
                model: "Picture".to_string(),
                table: Some("pictures".to_string()),
                aliases: vec![],
            },
        )
        .with_relation(
            "owner",
            RelationDef {
                model: "User".to_string(),
                table: Some("users".to_string()),
                aliases: vec![],
            },
        );
    QueryContext::new(registry, JsonFilterTranslator)
}

fn record(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_default_pagination() -> Result<(), CompileError> {
    let ctx = context();
    let descriptor = ctx.compiler().serialize(&QuerySpec::from_value(&json!({})))?;

    assert_eq!(descriptor.offset, Slot::Value(0));
    assert_eq!(descriptor.limit, Slot::Value(20));
    Ok(())
}

#[test]
fn test_page_offset() -> Result<(), CompileError> {
    let ctx = context();
    let spec = QuerySpec::from_value(&json!({ "page": 3, "perPage": 10 }));
    let descriptor = ctx.compiler().serialize(&spec)?;

    assert_eq!(descriptor.offset, Slot::Value(20));
    assert_eq!(descriptor.limit, Slot::Value(10));
    Ok(())
}

#[test]
fn test_all_page_omits_pagination() -> Result<(), CompileError> {
    let ctx = context();
    let spec = QuerySpec::from_value(&json!({ "allPage": true, "page": 4, "perPage": 50 }));

    for single in [false, true] {
        let descriptor = ctx.compiler().assemble(&spec, None, single)?;
        assert!(descriptor.offset.is_omitted());
        assert!(descriptor.limit.is_omitted());

        let json = serde_json::to_value(&descriptor)?;
        assert!(json.get("offset").is_none());
        assert!(json.get("limit").is_none());
    }
    Ok(())
}

#[test]
fn test_all_page_keeps_base_pagination() -> Result<(), CompileError> {
    let ctx = context();
    let spec = QuerySpec::from_value(&json!({ "allPage": true }));
    let base = BaseDescriptor {
        offset: Some(5),
        limit: Some(15),
        ..BaseDescriptor::default()
    };

    let descriptor = ctx.compiler().assemble(&spec, Some(&base), true)?;
    assert_eq!(descriptor.offset, Slot::Value(5));
    assert_eq!(descriptor.limit, Slot::Value(15));
    assert!(descriptor.order.is_cleared());
    Ok(())
}

#[test]
fn test_single_fetch_clears_order_and_pagination() -> Result<(), CompileError> {
    let ctx = context();
    let spec = QuerySpec::from_value(&json!({
        "orderBy": ["-age", "$pictures.age$"],
        "page": 2,
        "allPage": false
    }));
    let base = BaseDescriptor {
        offset: Some(5),
        limit: Some(15),
        order: Some(vec![OrderTerm::new("id", Direction::Asc)]),
        ..BaseDescriptor::default()
    };

    let descriptor = ctx.compiler().assemble(&spec, Some(&base), true)?;
    assert!(descriptor.offset.is_cleared());
    assert!(descriptor.limit.is_cleared());
    assert!(descriptor.order.is_cleared());

    let json = serde_json::to_value(&descriptor)?;
    assert_eq!(json["offset"], Value::Null);
    assert_eq!(json["limit"], Value::Null);
    assert_eq!(json["order"], Value::Null);
    Ok(())
}

#[test]
fn test_base_pagination_wins_over_computed() -> Result<(), CompileError> {
    let ctx = context();
    let spec = QuerySpec::from_value(&json!({ "page": 3, "perPage": 10 }));
    let base = BaseDescriptor {
        limit: Some(1),
        ..BaseDescriptor::default()
    };

    let descriptor = ctx.compiler().assemble(&spec, Some(&base), false)?;
    assert_eq!(descriptor.offset, Slot::Value(20));
    assert_eq!(descriptor.limit, Slot::Value(1));
    Ok(())
}

#[test]
fn test_order_resolution() -> Result<(), CompileError> {
    let ctx = context();
    let spec = QuerySpec::from_value(&json!({
        "orderBy": ["-age", "age", "$pictures.age$", "$ghost.age$"]
    }));

    let descriptor = ctx.compiler().serialize(&spec)?;
    assert_eq!(
        descriptor.order,
        Slot::Value(vec![
            OrderTerm::new("age", Direction::Desc),
            OrderTerm::new("age", Direction::Asc),
            OrderTerm::qualified(
                "age",
                Direction::Asc,
                RelationHandle::new("Picture").with_table("pictures"),
                "pictures",
            ),
            OrderTerm::new("age", Direction::Asc),
        ])
    );
    Ok(())
}

#[test]
fn test_base_order_wins() -> Result<(), CompileError> {
    let ctx = context();
    let spec = QuerySpec::from_value(&json!({ "orderBy": ["-age"] }));
    let base = BaseDescriptor {
        order: Some(vec![OrderTerm::new("id", Direction::Asc)]),
        ..BaseDescriptor::default()
    };

    let descriptor = ctx.compiler().assemble(&spec, Some(&base), false)?;
    assert_eq!(
        descriptor.order,
        Slot::Value(vec![OrderTerm::new("id", Direction::Asc)])
    );
    Ok(())
}

#[test]
fn test_filters_conjoined() -> Result<(), CompileError> {
    let ctx = context();
    let spec = QuerySpec::from_value(&json!({
        "filter": { "a": 1 },
        "additionalFilter": { "b": 2 }
    }));

    let descriptor = ctx.compiler().serialize(&spec)?;
    let predicate = &descriptor.where_clause;
    assert!(predicate.matches(&record(json!({ "a": 1, "b": 2 }))));
    assert!(!predicate.matches(&record(json!({ "a": 1 }))));
    assert!(!predicate.matches(&record(json!({ "b": 2 }))));
    Ok(())
}

#[test]
fn test_access_filter_survives_base_where_and_caller_override() -> Result<(), CompileError> {
    let ctx = context();
    let spec = QuerySpec::from_value(&json!({
        "filter": { "$and": [{ "tenant": 1 }], "$or": [{ "tenant": 1 }, { "tenant": 2 }] },
        "additionalFilter": { "$and": [{ "tenant": 2 }] }
    }));
    let base = BaseDescriptor {
        where_clause: Some(Predicate::compare("archived", CompareOp::Eq, json!(false))),
        ..BaseDescriptor::default()
    };

    let descriptor = ctx.compiler().assemble(&spec, Some(&base), false)?;
    let Predicate::And { operands } = &descriptor.where_clause else {
        panic!("expected a conjunction");
    };
    assert_eq!(operands.len(), 3);
    assert_eq!(operands[0], base.where_clause.clone().unwrap());

    for tenant in [1, 2] {
        let row = record(json!({ "tenant": tenant, "archived": false }));
        assert!(!descriptor.where_clause.matches(&row));
    }
    Ok(())
}

#[test]
fn test_empty_filters_are_still_applied() -> Result<(), CompileError> {
    let ctx = context();
    let descriptor = ctx.compiler().serialize(&QuerySpec::default())?;

    assert_eq!(
        descriptor.where_clause,
        Predicate::all(vec![Predicate::True, Predicate::True])
    );
    Ok(())
}

#[test]
fn test_expands() -> Result<(), CompileError> {
    let ctx = context();
    let spec = QuerySpec::from_value(&json!({
        "expands": [
            { "name": "pictures", "limit": 5, "required": true },
            { "name": "ghost" },
            "tags"
        ]
    }));

    let (descriptor, diagnostics) = ctx.compiler().assemble_with_diagnostics(&spec, None, false)?;
    assert_eq!(descriptor.include.len(), 2);

    let Include::Expand(pictures) = &descriptor.include[0] else {
        panic!("expected resolved expand");
    };
    assert_eq!(pictures.limit, Some(5));
    assert_eq!(pictures.required, Some(true));
    assert_eq!(descriptor.include[1], Include::Name("tags".to_string()));

    assert_eq!(
        diagnostics.entries(),
        [Diagnostic::UnresolvedExpand {
            name: "ghost".to_string(),
            model_name: None,
        }]
    );
    Ok(())
}

#[test]
fn test_include_and_attributes_concatenate() -> Result<(), CompileError> {
    let ctx = context();
    let spec = QuerySpec::from_value(&json!({
        "attributes": ["name"],
        "expands": ["owner"]
    }));
    let base = BaseDescriptor {
        include: vec![Include::Name("owner".to_string())],
        attributes: vec!["id".to_string()],
        ..BaseDescriptor::default()
    };

    let descriptor = ctx.compiler().assemble(&spec, Some(&base), false)?;
    assert_eq!(
        descriptor.include,
        vec![
            Include::Name("owner".to_string()),
            Include::Name("owner".to_string()),
        ]
    );
    assert_eq!(
        descriptor.attributes,
        Some(vec!["id".to_string(), "name".to_string()])
    );
    Ok(())
}

#[test]
fn test_empty_attributes_omitted() -> Result<(), CompileError> {
    let ctx = context();
    let descriptor = ctx.compiler().serialize(&QuerySpec::default())?;

    assert_eq!(descriptor.attributes, None);
    assert!(serde_json::to_value(&descriptor)?.get("attributes").is_none());
    Ok(())
}

#[test]
fn test_base_options_pass_through() -> Result<(), CompileError> {
    let ctx = context();
    let base: BaseDescriptor = serde_json::from_value(json!({ "paranoid": false, "raw": true }))?;

    let descriptor = ctx.compiler().assemble(&QuerySpec::default(), Some(&base), false)?;
    let json = serde_json::to_value(&descriptor)?;
    assert_eq!(json["paranoid"], json!(false));
    assert_eq!(json["raw"], json!(true));
    Ok(())
}

#[test]
fn test_base_options_cannot_shadow_compiled_fields() -> Result<(), CompileError> {
    let ctx = context();
    let spec = QuerySpec::from_value(&json!({ "additionalFilter": { "tenant": 7 } }));
    let mut base = BaseDescriptor::default();
    base.options.insert("where".to_string(), json!({ "type": "true" }));
    base.options.insert("offset".to_string(), json!(40));
    base.options.insert("paranoid".to_string(), json!(false));

    let (descriptor, diagnostics) =
        ctx.compiler()
            .assemble_with_diagnostics(&spec, Some(&base), true)?;
    assert_eq!(descriptor.options.len(), 1);
    assert_eq!(
        diagnostics.entries(),
        [
            Diagnostic::ReservedOption { key: "where".to_string() },
            Diagnostic::ReservedOption { key: "offset".to_string() },
        ]
    );

    let json = serde_json::to_value(&descriptor)?;
    assert_eq!(json["offset"], Value::Null);
    assert_eq!(json["paranoid"], json!(false));

    let wire_where: Predicate = serde_json::from_value(json["where"].clone())?;
    assert!(!wire_where.matches(&record(json!({ "tenant": 8 }))));
    assert!(wire_where.matches(&record(json!({ "tenant": 7 }))));

    let text = serde_json::to_string(&descriptor)?;
    assert_eq!(text.matches("\"where\"").count(), 1);
    assert_eq!(text.matches("\"offset\"").count(), 1);
    Ok(())
}

#[test]
fn test_repeated_assembly_is_stable() -> Result<(), CompileError> {
    let ctx = context();
    let spec = QuerySpec::from_value(&json!({
        "filter": { "a": { "$gt": 1 } },
        "orderBy": ["-$pictures.age$"],
        "expands": [{ "name": "pictures", "order": ["-age"] }]
    }));
    let base = BaseDescriptor {
        include: vec![Include::Name("owner".to_string())],
        ..BaseDescriptor::default()
    };
    let before = spec.clone();

    let first = ctx.compiler().assemble(&spec, Some(&base), false)?;
    let second = ctx.compiler().assemble(&spec, Some(&base), false)?;
    assert_eq!(first, second);
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(spec, before);
    Ok(())
}

#[test]
fn test_malformed_filter_propagates() {
    let ctx = context();
    let spec = QuerySpec::from_value(&json!({ "filter": { "a": { "$regex": "x" } } }));

    let result = ctx.compiler().serialize(&spec);
    assert!(matches!(
        result,
        Err(CompileError::Translation(TranslationError::UnknownOperator(_)))
    ));
}

#[test]
fn test_registry_failure_propagates() {
    struct Unavailable;

    impl ModelRegistry for Unavailable {
        fn lookup(&self, key: &str) -> Result<Option<RelationHandle>, RegistryError> {
            Err(RegistryError::Lookup {
                key: key.to_string(),
                reason: "models not registered".to_string(),
            })
        }
    }

    let ctx = QueryContext::new(Unavailable, JsonFilterTranslator);
    let spec = QuerySpec::from_value(&json!({ "expands": [{ "name": "pictures" }] }));

    let result = ctx.compiler().serialize(&spec);
    assert!(matches!(result, Err(CompileError::Configuration(_))));
}

#[test]
fn test_serialize_json_shape() -> Result<(), CompileError> {
    let ctx = context();
    let spec = QuerySpec::from_value(&json!({ "orderBy": ["-age"], "attributes": ["id"] }));

    let json = ctx.compiler().serialize_json(&spec)?;
    assert_eq!(json["offset"], json!(0));
    assert_eq!(json["limit"], json!(20));
    assert_eq!(json["order"], json!([{ "column": "age", "direction": "DESC" }]));
    assert_eq!(json["include"], json!([]));
    assert_eq!(json["attributes"], json!(["id"]));
    assert_eq!(json["where"]["type"], json!("and"));
    Ok(())
}
