//! End-to-end scenarios over whole model sets
mod common;

use common::{bank_models, bank_with, base_models, model, with_base};
use modelguard::validation::{ErrorKind, ErrorMode, ValidationError, Validator};
use serde_json::{Value, json};
use std::collections::{BTreeSet, VecDeque};

fn error(models: &Value) -> ValidationError {
    Validator::new()
        .validate(models)
        .expect_err("validation should fail")
}

#[test]
fn test_base_and_bank_fixtures_are_valid() {
    let validator = Validator::new();

    let report = validator.validate(&Value::Array(base_models())).unwrap();
    assert!(report.is_clean());

    let report = validator.validate(&bank_models()).unwrap();
    assert!(report.is_clean());
    assert!(report.warnings.is_empty());
}

#[test]
fn test_wrong_type_is_structural() {
    let models = bank_with("bank.Document", |model| model["type"] = json!("tradle.Form"));
    let err = error(&models);
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert!(err.to_string().contains("\"type\""));
}

#[test]
fn test_bad_model_id_names_the_format() {
    let validator = Validator::new();
    for id in ["9lives", "bank/Loan", "bank_Loan"] {
        let err = validator
            .validate_model(&json!({ "type": "tradle.Model", "id": id, "properties": {} }))
            .unwrap_err();
        assert!(err.to_string().contains("model id"), "{id}: {err}");
    }
}

#[test]
fn test_group_and_list_need_display_as() {
    let models = bank_with("bank.LoanApplication", |model| {
        model["properties"]["fullName"]
            .as_object_mut()
            .unwrap()
            .remove("displayAs");
    });
    assert!(error(&models).to_string().contains("displayAs"));

    let models = bank_with("bank.LoanApplication", |model| {
        model["properties"]["fullName"]
            .as_object_mut()
            .unwrap()
            .remove("group");
    });
    assert!(error(&models).to_string().contains("displayAs"));
}

#[test]
fn test_context_implementors_need_context_id() {
    let models = bank_with("bank.LoanApplication", |model| {
        model["interfaces"] = json!(["tradle.Message", "tradle.Context"]);
    });
    let err = error(&models);
    assert!(err.to_string().contains("contextId"), "{err}");

    let models = bank_with("bank.LoanApplication", |model| {
        model["interfaces"] = json!(["tradle.Message", "tradle.Context"]);
        model["properties"]["contextId"] = json!({ "type": "string" });
    });
    Validator::new().validate(&models).unwrap();
}

#[test]
fn test_required_must_be_declared() {
    let models = bank_with("bank.Loan", |model| model["required"] = json!(["missing"]));
    let err = error(&models);
    assert_eq!(err.kind(), ErrorKind::Consistency);
    assert!(err.to_string().contains("\"missing\""));
}

#[test]
fn test_backlinks_must_be_symmetric() {
    // bank.LoanApplication descends from both tradle.Form and tradle.Object
    for reference in ["bank.Loan", "tradle.Form", "tradle.Object"] {
        let models = bank_with("bank.Document", |model| {
            model["properties"]["application"]["ref"] = json!(reference);
        });
        let err = error(&models);
        assert!(
            err.to_string()
                .starts_with("invalid model \"bank.LoanApplication\": invalid property \"documents\""),
            "{reference}: {err}"
        );
    }
}

#[test]
fn test_enum_limits_must_exist() {
    let models = bank_with("bank.LoanApplication", |model| {
        model["properties"]["cardColour"]["limit"] = json!(["purple"]);
    });
    let err = error(&models);
    assert!(err.to_string().contains("does not exist"), "{err}");
}

#[test]
fn test_financial_products_require_forms() {
    let models = bank_with("bank.Loan", |model| {
        model.as_object_mut().unwrap().remove("forms");
    });
    assert!(error(&models).to_string().contains("require forms"));

    let models = bank_with("bank.Loan", |model| model["forms"] = json!(["tradle.Money"]));
    let err = error(&models);
    assert_eq!(err.kind(), ErrorKind::Consistency);
    assert!(err.to_string().contains("\"forms\""), "{err}");
}

#[test]
fn test_duplicate_ids_fail_at_assembly() {
    let models = with_base(vec![model("a.Twin", None), model("a.Twin", None)]);
    let err = error(&models);
    assert_eq!(err.to_string(), "found two models with id \"a.Twin\"");
}

#[test]
fn test_cyclic_inheritance_terminates() {
    let models = with_base(vec![
        model("a.One", Some("a.Two")),
        model("a.Two", Some("a.Three")),
        model("a.Three", Some("a.One")),
    ]);
    let err = error(&models);
    assert!(err.to_string().contains("cyclic inheritance"), "{err}");

    // Enum checks walk the ancestor chain too
    let mut looped = model("a.Loop", Some("a.Loop"));
    looped["enum"] = json!([{ "id": "x", "title": "X" }]);
    let err = error(&with_base(vec![looped]));
    assert!(err.to_string().contains("cyclic inheritance"), "{err}");
}

#[test]
fn test_collect_mode_reports_every_broken_model() {
    let mut models = bank_with("bank.Loan", |model| model["sort"] = json!("nothing"));
    if let Some(models) = models.as_array_mut() {
        let document = models
            .iter_mut()
            .find(|model| model["id"] == "bank.Document")
            .unwrap();
        document["hidden"] = json!(["scan"]);
        document["required"] = json!(["scan"]);
    }

    let report = Validator::new()
        .with_mode(ErrorMode::Collect)
        .validate(&models)
        .unwrap();
    assert_eq!(report.errors.len(), 2);
}

#[test]
fn test_validation_never_mutates_input() {
    let models = bank_models();
    let before = models.clone();

    Validator::new().validate(&models).unwrap();
    Validator::new()
        .with_mode(ErrorMode::Collect)
        .validate_references(&models)
        .unwrap();
    assert_eq!(models, before);
}

/// Reachability by plain breadth-first search over direct references
fn reachable(validator: &Validator, models: &Value, seeds: &[&str]) -> BTreeSet<String> {
    let by_id = |id: &str| {
        models
            .as_array()
            .unwrap()
            .iter()
            .find(|model| model["id"] == id)
            .cloned()
    };

    let mut seen = BTreeSet::new();
    let mut queue: VecDeque<String> = seeds.iter().map(|id| id.to_string()).collect();
    while let Some(id) = queue.pop_front() {
        if id == "tradle.Model" {
            continue;
        }
        let model = by_id(&id).unwrap();
        for next in validator.get_direct_references(&model).unwrap() {
            if seen.insert(next.clone()) {
                queue.push_back(next);
            }
        }
    }
    seen
}

#[test]
fn test_get_references_is_the_reachable_set() {
    let validator = Validator::new();
    let models = bank_models();

    let closure = validator.get_references(&models, &["bank.Loan"]).unwrap();
    assert_eq!(closure, reachable(&validator, &models, &["bank.Loan"]));
    assert!(closure.contains("bank.Colour"));
    assert!(closure.contains("tradle.Object"));

    // idempotent and independent of seed order
    assert_eq!(validator.get_references(&models, &["bank.Loan"]).unwrap(), closure);
    assert_eq!(
        validator
            .get_references(&models, &["bank.Colour", "bank.MyLoan"])
            .unwrap(),
        validator
            .get_references(&models, &["bank.MyLoan", "bank.Colour"])
            .unwrap()
    );
}

#[test]
fn test_get_references_reports_missing_models() {
    let validator = Validator::new();
    let err = validator
        .get_references(&bank_models(), &["bank.Nope"])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Reference);
    assert!(err.to_string().contains("missing model"));
}
