#![allow(dead_code)]

use modelguard::loader::ModelLoader;
use serde_json::{Value, json};
use std::path::PathBuf;

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// The reserved protocol models
pub fn base_models() -> Vec<Value> {
    serde_json::from_str(include_str!("../fixtures/base/tradle.json"))
        .expect("base fixture is valid JSON")
}

/// Base models followed by `models`
pub fn with_base(models: Vec<Value>) -> Value {
    let mut all = base_models();
    all.extend(models);
    Value::Array(all)
}

/// The complete, valid bank fixture set including the base models
pub fn bank_models() -> Value {
    ModelLoader::load(&[fixtures_dir()]).expect("fixtures load")
}

/// Bank fixture with one model replaced by id
pub fn bank_with(id: &str, edit: impl FnOnce(&mut Value)) -> Value {
    let mut models = bank_models();
    let model = models
        .as_array_mut()
        .and_then(|models| models.iter_mut().find(|model| model["id"] == id))
        .unwrap_or_else(|| panic!("fixture model {id} exists"));
    edit(model);
    models
}

pub fn model(id: &str, parent: Option<&str>) -> Value {
    let mut value = json!({ "type": "tradle.Model", "id": id, "title": id, "properties": {} });
    if let Some(parent) = parent {
        value["subClassOf"] = json!(parent);
    }
    value
}
