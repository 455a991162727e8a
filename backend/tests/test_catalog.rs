//! Tests for catalog loading and validation

use automation_bridge_core::runtime::{AutomationRuntime, Catalog, CatalogError, MemoryRuntime};
use std::fs;

fn parse(json: &str) -> Result<Catalog, CatalogError> {
    Catalog::from_json(json)
}

#[test]
fn test_minimal_catalog() {
    let catalog = parse(r#"{"classes": [{"prog_id": "Only.Name"}]}"#).unwrap();
    assert_eq!(catalog.classes.len(), 1);
    assert!(catalog.classes[0].clsid.is_none());
    assert!(catalog.classes[0].properties.is_empty());
}

#[test]
fn test_empty_document_is_an_empty_catalog() {
    assert!(parse("{}").unwrap().classes.is_empty());
}

#[test]
fn test_rejects_malformed_json() {
    assert!(matches!(parse("{\"classes\": ["), Err(CatalogError::ParseError(_))));
}

#[test]
fn test_rejects_duplicate_names() {
    let err = parse(r#"{"classes": [{"prog_id": "A.B"}, {"prog_id": "A.B"}]}"#).unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateClass(name) if name == "A.B"));
}

#[test]
fn test_rejects_duplicate_class_ids_ignoring_case() {
    let err = parse(
        r#"{"classes": [
            {"prog_id": "A.B", "clsid": "{AAAAAAAA-0000-0000-0000-000000000001}"},
            {"prog_id": "C.D", "clsid": "{aaaaaaaa-0000-0000-0000-000000000001}"}
        ]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateClass(_)));
}

#[test]
fn test_rejects_unbraced_identifiers() {
    let err = parse(r#"{"classes": [{"prog_id": "A.B", "clsid": "AAAAAAAA-0000"}]}"#).unwrap_err();
    assert!(matches!(err, CatalogError::InvalidIdentifier { .. }));

    let err = parse(r#"{"classes": [{"prog_id": "A.B", "interfaces": ["{}"]}]}"#).unwrap_err();
    assert!(matches!(err, CatalogError::InvalidIdentifier { .. }));
}

#[test]
fn test_rejects_member_that_is_both_kinds() {
    let err = parse(
        r#"{"classes": [{"prog_id": "A.B",
            "properties": {"Run": {"value": 1}},
            "methods": {"Run": {}}}]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateMember { member, .. } if member == "Run"));
}

#[test]
fn test_rejects_ambiguous_properties() {
    let none = parse(r#"{"classes": [{"prog_id": "A.B", "properties": {"P": {}}}]}"#).unwrap_err();
    assert!(matches!(none, CatalogError::InvalidProperty { .. }));

    let two = parse(
        r#"{"classes": [{"prog_id": "A.B", "properties": {"P": {"value": 1, "unreadable": "no"}}}]}"#,
    )
    .unwrap_err();
    assert!(matches!(two, CatalogError::InvalidProperty { .. }));
}

#[test]
fn test_rejects_dangling_object_references() {
    let err = parse(
        r#"{"classes": [{"prog_id": "A.B", "methods": {"Open": {"returns": {"object": "Missing.Class"}}}}]}"#,
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Class 'A.B': member 'Open' references unknown class 'Missing.Class'"
    );
}

#[test]
fn test_load_from_file() {
    let path = std::env::temp_dir().join(format!("automation-bridge-catalog-{}.json", std::process::id()));
    fs::write(
        &path,
        r#"{"classes": [{"prog_id": "File.Object", "clsid": "{F1F1F1F1-0000-0000-0000-000000000001}"}]}"#,
    )
    .unwrap();

    let catalog = Catalog::from_file(&path).unwrap();
    fs::remove_file(&path).unwrap();

    let runtime = MemoryRuntime::new(catalog);
    assert_eq!(
        runtime.class_id_from_name("File.Object").unwrap(),
        "{F1F1F1F1-0000-0000-0000-000000000001}"
    );
}

#[test]
fn test_missing_file_is_load_error() {
    let err = Catalog::from_file("/nonexistent/automation-bridge/catalog.json").unwrap_err();
    assert!(matches!(err, CatalogError::LoadError(_)));
}
