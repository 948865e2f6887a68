//! Integration tests for field values
//!
//! Tests Value variants, type tags, and conversions.

use trestle_foundation::{EntityId, EntitySource, TrVec, TypeId, Value, ValueType};

// =============================================================================
// Type tags
// =============================================================================

#[test]
fn every_variant_reports_its_type() {
    let id = EntityId::new(TypeId::new(0), 0);

    assert_eq!(Value::Bool(true).value_type(), ValueType::Bool);
    assert_eq!(Value::Int(-3).value_type(), ValueType::Int);
    assert_eq!(Value::str("x").value_type(), ValueType::Str);
    assert_eq!(Value::List(TrVec::new()).value_type(), ValueType::List);
    assert_eq!(Value::EntityRef(id).value_type(), ValueType::EntityRef);
}

#[test]
fn type_tags_render_for_error_messages() {
    assert_eq!(format!("{}", ValueType::Bool), "bool");
    assert_eq!(format!("{}", ValueType::List), "list");
    assert_eq!(format!("{}", ValueType::EntityRef), "entity-ref");
}

// =============================================================================
// Conversions and accessors
// =============================================================================

#[test]
fn conversions_from_native_types() {
    assert_eq!(Value::from(false), Value::Bool(false));
    assert_eq!(Value::from(7i64), Value::Int(7));
    assert_eq!(Value::from("app"), Value::str("app"));

    let id = EntityId::new(TypeId::new(1), 4);
    assert_eq!(Value::from(id), Value::EntityRef(id));
}

#[test]
fn accessors_are_variant_selective() {
    let id = EntityId::new(TypeId::new(0), 1);

    assert_eq!(Value::EntityRef(id).as_entity_ref(), Some(id));
    assert_eq!(Value::Int(1).as_entity_ref(), None);
    assert_eq!(Value::str("a").as_str(), Some("a"));
    assert_eq!(Value::Bool(true).as_str(), None);
}

#[test]
fn nested_lists_compare_by_value() {
    let a = Value::List(TrVec::new().push_back(Value::Int(1)).push_back(Value::str("x")));
    let b = Value::List(TrVec::new().push_back(Value::Int(1)).push_back(Value::str("x")));
    let c = Value::List(TrVec::new().push_back(Value::Int(2)));

    assert_eq!(a, b);
    assert_ne!(a, c);
}

// =============================================================================
// Entity sources
// =============================================================================

#[test]
fn sources_compare_by_content() {
    assert_eq!(
        EntitySource::project_file("/p/app.iml"),
        EntitySource::project_file("/p/app.iml")
    );
    assert_ne!(
        EntitySource::external_system("gradle"),
        EntitySource::external_system("maven")
    );
    assert_ne!(EntitySource::Internal, EntitySource::external_system("gradle"));
}
