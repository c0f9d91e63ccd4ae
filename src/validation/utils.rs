//! Shared predicates and lookups over a model set

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use super::ValidationError;
use crate::document::{ModelDoc, ModelSet};

pub static MODEL_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][.a-zA-Z0-9]*$").expect("valid model id regex"));

pub static PROPERTY_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[_a-zA-Z][_a-zA-Z0-9]*$").expect("valid property name regex"));

pub fn is_model_id(id: &str) -> bool {
    MODEL_ID_REGEX.is_match(id)
}

pub fn is_property_name(name: &str) -> bool {
    PROPERTY_NAME_REGEX.is_match(name)
}

/// Walk the `subClassOf` chain upwards, nearest parent first.
///
/// A parent missing from the set still appears in the chain and ends it. A chain
/// that leads back into itself fails with a cyclic inheritance error.
pub fn ancestors<'a>(
    set: &ModelSet<'a>,
    model: ModelDoc<'a>,
) -> Result<Vec<&'a str>, ValidationError> {
    let mut chain = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    if let Some(id) = model.id() {
        visited.insert(id);
    }

    let mut parent = model.sub_class_of();
    while let Some(id) = parent {
        if !visited.insert(id) {
            let mut path: Vec<&str> = model.id().into_iter().collect();
            path.extend(chain.iter().copied());
            path.push(id);
            return Err(ValidationError::consistency(format!(
                "cyclic inheritance: {}",
                path.join(" -> ")
            )));
        }

        chain.push(id);
        parent = set.get(id).and_then(|ancestor| ancestor.sub_class_of());
    }

    Ok(chain)
}

pub fn is_subclass_of(
    set: &ModelSet<'_>,
    model: ModelDoc<'_>,
    ancestor: &str,
) -> Result<bool, ValidationError> {
    // Fast path: direct parent
    if model.sub_class_of() == Some(ancestor) {
        return Ok(true);
    }
    Ok(ancestors(set, model)?.contains(&ancestor))
}

pub fn is_subclass_of_any(
    set: &ModelSet<'_>,
    model: ModelDoc<'_>,
    candidates: &[&str],
) -> Result<bool, ValidationError> {
    let chain = ancestors(set, model)?;
    Ok(candidates.iter().any(|candidate| chain.contains(candidate)))
}

/// Same as `is_subclass_of`, looking the model up by id first
pub fn id_is_subclass_of(
    set: &ModelSet<'_>,
    id: &str,
    ancestor: &str,
) -> Result<bool, ValidationError> {
    match set.get(id) {
        Some(model) => is_subclass_of(set, model, ancestor),
        None => Ok(false),
    }
}

/// Quote and join ids for messages
pub fn quoted_list<'s>(items: impl IntoIterator<Item = &'s str>) -> String {
    items
        .into_iter()
        .map(|item| format!("\"{item}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn model(id: &str, parent: Option<&str>) -> Value {
        let mut value = json!({ "type": "tradle.Model", "id": id, "properties": {} });
        if let Some(parent) = parent {
            value["subClassOf"] = json!(parent);
        }
        value
    }

    #[test]
    fn grammars() {
        assert!(is_model_id("com.example.Thing2"));
        assert!(!is_model_id("2com.example"));
        assert!(!is_model_id("com-example"));
        assert!(is_property_name("_link"));
        assert!(is_property_name("firstName"));
        assert!(!is_property_name("first.name"));
        assert!(!is_property_name("1st"));
    }

    #[test]
    fn walks_chain_including_unresolved_root() {
        let models = json!([
            model("a.Base", Some("tradle.Enum")),
            model("a.Mid", Some("a.Base")),
            model("a.Leaf", Some("a.Mid")),
        ]);
        let set = ModelSet::from_value(&models).unwrap();
        let leaf = set.get("a.Leaf").unwrap();

        assert_eq!(ancestors(&set, leaf).unwrap(), vec!["a.Mid", "a.Base", "tradle.Enum"]);
        assert!(is_subclass_of(&set, leaf, "tradle.Enum").unwrap());
        assert!(!is_subclass_of(&set, leaf, "tradle.Form").unwrap());
        assert!(is_subclass_of_any(&set, leaf, &["tradle.Form", "a.Base"]).unwrap());
        assert!(!id_is_subclass_of(&set, "a.Missing", "a.Base").unwrap());
    }

    #[test]
    fn cyclic_chain_fails_closed() {
        let models = json!([
            model("a.One", Some("a.Two")),
            model("a.Two", Some("a.Three")),
            model("a.Three", Some("a.One")),
        ]);
        let set = ModelSet::from_value(&models).unwrap();

        let err = ancestors(&set, set.get("a.One").unwrap()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cyclic inheritance: a.One -> a.Two -> a.Three -> a.One"
        );
        assert!(is_subclass_of(&set, set.get("a.Two").unwrap(), "tradle.Enum").is_err());
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let models = json!([model("a.Loop", Some("a.Loop"))]);
        let set = ModelSet::from_value(&models).unwrap();
        assert!(ancestors(&set, set.get("a.Loop").unwrap()).is_err());
    }
}
