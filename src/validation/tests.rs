use super::{ErrorKind, ErrorMode, ValidationError, Validator, WarningKind};
use serde_json::{Value, json};

fn model(id: &str, parent: Option<&str>) -> Value {
    let mut value = json!({ "type": "tradle.Model", "id": id, "title": id, "properties": {} });
    if let Some(parent) = parent {
        value["subClassOf"] = json!(parent);
    }
    value
}

fn base() -> Vec<Value> {
    vec![
        model("tradle.Object", None),
        model("tradle.Enum", Some("tradle.Object")),
        model("tradle.Form", Some("tradle.Object")),
    ]
}

fn set(extra: Vec<Value>) -> Value {
    let mut models = base();
    models.extend(extra);
    Value::Array(models)
}

#[test]
fn test_single_model_skips_reference_pass() {
    let validator = Validator::new();
    let single = json!({
        "type": "tradle.Model",
        "id": "a.Car",
        "subClassOf": "a.Vehicle",
        "properties": { "owner": { "type": "object", "ref": "a.Nobody" } }
    });

    let report = validator.validate(&single).unwrap();
    assert!(report.is_clean());
    assert!(report.warnings.is_empty());
}

#[test]
fn test_set_runs_every_pass() {
    let validator = Validator::new();
    let models = set(vec![json!({
        "type": "tradle.Model",
        "id": "a.Car",
        "properties": { "owner": { "type": "object", "ref": "a.Nobody" } }
    })]);

    let err = validator.validate(&models).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Reference);
    assert!(err.to_string().starts_with("invalid model \"a.Car\""));
}

#[test]
fn test_map_input_matches_array_input() {
    let validator = Validator::new();
    let models = set(vec![model("a.Thing", Some("tradle.Object"))]);
    let by_id: serde_json::Map<String, Value> = models
        .as_array()
        .unwrap()
        .iter()
        .map(|m| (m["id"].as_str().unwrap().to_string(), m.clone()))
        .collect();

    validator.validate(&models).unwrap();
    validator.validate(&Value::Object(by_id)).unwrap();
}

#[test]
fn test_model_errors_carry_model_context() {
    let validator = Validator::new();
    let models = set(vec![json!({
        "type": "tradle.Model",
        "id": "a.Person",
        "properties": { "name": { "type": "string" } },
        "required": ["missing"]
    })]);

    let err = validator.validate(&models).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @r#"invalid model "a.Person": group "required" lists property "missing", which was not found in "properties""#
    );
}

#[test]
fn test_cycles_fail_instead_of_looping() {
    let validator = Validator::new();
    let models = set(vec![model("a.One", Some("a.Two")), model("a.Two", Some("a.One"))]);

    let err = validator.validate(&models).unwrap_err();
    assert!(err.to_string().contains("cyclic inheritance"));
}

#[test]
fn test_collect_mode_keeps_going_on_consistency_errors() {
    let validator = Validator::new().with_mode(ErrorMode::Collect);
    let models = set(vec![
        json!({
            "type": "tradle.Model",
            "id": "a.One",
            "properties": { "x": { "type": "string" } },
            "hidden": ["x"],
            "required": ["x"]
        }),
        json!({
            "type": "tradle.Model",
            "id": "a.Two",
            "properties": {},
            "sort": "nothing"
        }),
    ]);

    let report = validator.validate(&models).unwrap();
    assert!(!report.is_clean());
    assert_eq!(report.errors.len(), 2);
    assert!(report.errors[1].to_string().starts_with("invalid model \"a.Two\""));
}

#[test]
fn test_collect_mode_still_aborts_on_structural_errors() {
    let validator = Validator::new().with_mode(ErrorMode::Collect);
    let models = set(vec![json!({
        "type": "tradle.Model",
        "id": "a.One",
        "properties": { "x": { "type": "number", "pattern": "\\d+" } }
    })]);

    let err = validator.validate(&models).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ClosedSchema);
}

#[test]
fn test_collect_mode_aggregates_reference_failures() {
    let validator = Validator::new().with_mode(ErrorMode::Collect);
    let models = set(vec![
        model("a.One", Some("a.Gone")),
        model("a.Two", Some("a.AlsoGone")),
    ]);

    match validator.validate(&models).unwrap_err() {
        ValidationError::Aggregate(errors) => assert_eq!(errors.len(), 2),
        other => panic!("expected aggregate, got {other}"),
    }
}

#[test]
fn test_collect_mode_keeps_model_errors_when_references_fail() {
    let validator = Validator::new().with_mode(ErrorMode::Collect);
    let models = set(vec![
        json!({
            "type": "tradle.Model",
            "id": "a.One",
            "properties": { "x": { "type": "string" } },
            "hidden": ["x"],
            "required": ["x"]
        }),
        model("a.Two", Some("a.Gone")),
    ]);

    let errors = match validator.validate(&models).unwrap_err() {
        ValidationError::Aggregate(errors) => errors,
        other => panic!("expected aggregate, got {other}"),
    };
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    assert_eq!(messages.len(), 2, "{messages:?}");
    assert!(messages[0].starts_with("invalid model \"a.One\""));
    assert!(messages[1].starts_with("invalid model \"a.Two\""));
    assert_eq!(errors[1].kind(), ErrorKind::Reference);
}

#[test]
fn test_warnings_are_reported() {
    let validator = Validator::new();
    let mut verifiable = model("tradle.Verifiable", None);
    verifiable["isInterface"] = json!(true);
    let models = set(vec![
        verifiable,
        json!({
            "type": "tradle.Model",
            "id": "a.Passport",
            "interfaces": ["tradle.Verifiable"],
            "evidentiaryDocuments": ["a.Missing"],
            "properties": { "sig": { "type": "string", "signature": true } }
        }),
    ]);

    let report = validator.validate(&models).unwrap();
    let kinds: Vec<_> = report.warnings.iter().map(|w| w.kind).collect();
    assert_eq!(
        kinds,
        vec![WarningKind::DeprecatedSignature, WarningKind::UnresolvedEvidentiaryDocument]
    );
}

#[test]
fn test_layer_entry_points() {
    let validator = Validator::new();
    let car = json!({
        "type": "tradle.Model",
        "id": "a.Car",
        "properties": {
            "wheels": { "type": "number" },
            "colour": { "type": "string" }
        }
    });
    let broken = json!({
        "type": "tradle.Model",
        "id": "a.Broken",
        "properties": { "label": { "type": "string", "displayAs": "{wheels}" } }
    });

    validator.validate_model(&car).unwrap();
    validator.validate_property(&car, "wheels").unwrap();
    assert!(validator.validate_property(&car, "doors").is_err());
    assert!(validator.validate_property(&broken, "label").is_err());
    assert!(validator.validate_model(&broken).is_err());
    assert!(validator.get_direct_references(&car).unwrap().is_empty());
}

#[test]
fn test_reference_entry_points() {
    let validator = Validator::new();
    let models = set(vec![
        model("a.Colour", Some("tradle.Enum")),
        json!({
            "type": "tradle.Model",
            "id": "a.Car",
            "properties": { "colour": { "type": "string", "ref": "a.Colour" } }
        }),
    ]);

    validator.validate_references(&models).unwrap();
    let references = validator.get_references(&models, &["a.Car"]).unwrap();
    assert_eq!(
        references.into_iter().collect::<Vec<_>>(),
        vec!["a.Colour", "tradle.Enum", "tradle.Object"]
    );
}

#[test]
fn test_input_is_not_mutated() {
    let validator = Validator::new().with_mode(ErrorMode::Collect);
    let models = set(vec![json!({
        "type": "tradle.Model",
        "id": "a.Album",
        "properties": {
            "photos": { "type": "array", "items": { "ref": "tradle.Photo", "backlink": "album" } },
            "address": { "type": "object", "properties": { "street": { "type": "string" } } }
        }
    })]);
    let before = models.clone();

    let _ = validator.validate(&models);
    assert_eq!(models, before);
}
