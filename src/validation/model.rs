use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

use super::ValidationError;
use super::diagnostics::Diagnostics;
use super::property::{PropertyOwner, PropertyValidator};
use super::utils::{MODEL_ID_REGEX, is_model_id, is_subclass_of, quoted_list};
use crate::document::{ModelDoc, ModelSet};
use crate::protocol::ProtocolRegistry;

/// Property groups that list names from `properties`
pub const PROPERTY_GROUPS: &[&str] = &[
    "required",
    "softRequired",
    "viewCols",
    "editCols",
    "gridCols",
    "hidden",
    "virtual",
];

/// Expected shape of a top-level model attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModelField {
    Str,
    Bool,
    StrArray,
    Object,
    EnumValues,
    PrimaryKeys,
    Indexes,
}

fn model_field(attribute: &str) -> Option<ModelField> {
    use ModelField::*;

    Some(match attribute {
        "id" | "type" | "title" | "description" | "plural" | "icon" | "sort" | "subClassOf" => Str,
        "abstract" | "isInterface" | "inlined" | "internalUse" | "notShareable"
        | "customerCanHaveMultiple" => Bool,
        "interfaces" | "required" | "softRequired" | "viewCols" | "editCols" | "gridCols"
        | "hidden" | "virtual" | "forms" | "additionalForms" | "multiEntryForms"
        | "evidentiaryDocuments" => StrArray,
        "properties" | "verifiableAspects" => Object,
        "enum" => EnumValues,
        "primaryKeys" => PrimaryKeys,
        "indexes" => Indexes,
        _ => return None,
    })
}

pub struct ModelValidator<'r> {
    registry: &'r ProtocolRegistry,
    properties: PropertyValidator<'r>,
}

impl<'r> ModelValidator<'r> {
    pub fn new(registry: &'r ProtocolRegistry) -> Self {
        Self {
            registry,
            properties: PropertyValidator::new(registry),
        }
    }

    /// Validate a raw document, which must at least be an object
    pub fn validate_value(
        &self,
        model: &Value,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ValidationError> {
        let model = ModelDoc::from_value(model)
            .ok_or_else(|| ValidationError::structural("expected model to be an object"))?;
        self.validate(model, None, diagnostics)
    }

    /// Validate one model's shape. With a `set`, inheritance questions follow the
    /// full ancestor chain instead of the direct parent.
    pub fn validate<'a>(
        &self,
        model: ModelDoc<'a>,
        set: Option<&ModelSet<'a>>,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ValidationError> {
        let reserved = &self.registry.reserved;

        if model.type_tag() != Some(reserved.model.as_str()) {
            return Err(ValidationError::structural(format!(
                "expected \"type\": \"{}\"",
                reserved.model
            )));
        }

        match model.get("id") {
            Some(Value::String(id)) if is_model_id(id) => {}
            _ => {
                return Err(ValidationError::structural(format!(
                    "invalid model id: expected string \"id\" matching {}, e.g. com.example.BeerSpaceship",
                    MODEL_ID_REGEX.as_str()
                )));
            }
        }

        debug!("Validating model {}", model.display_id());

        check_fields(model.raw())?;

        let properties = model.properties().ok_or_else(|| {
            ValidationError::structural("expected \"properties\" to be an object")
        })?;
        self.properties
            .validate_all(PropertyOwner::model(model, properties), diagnostics)?;

        match model.sub_class_of() {
            Some(parent) if parent == reserved.financial_product => {
                self.check_financial_product(model)?
            }
            Some(parent) if parent == reserved.form => self.check_form(model)?,
            _ => {}
        }

        self.check_interface_contracts(model)?;
        self.check_groups(model)?;
        check_verifiable_aspects(model)?;

        if let Some(sort) = model.str("sort")
            && !model.has_property(sort)
            && !self.registry.is_protocol_property(sort)
        {
            return Err(ValidationError::consistency(format!(
                "\"sort\" references non-existent property \"{sort}\""
            )));
        }

        if model.get("customerCanHaveMultiple").is_some()
            && !self.descends_from(model, set, &reserved.financial_product)?
        {
            return Err(ValidationError::consistency(format!(
                "\"customerCanHaveMultiple\" is only allowed on subclasses of \"{}\"",
                reserved.financial_product
            )));
        }

        if let Some(values) = model.get("enum") {
            self.check_enum(model, set, values)?;
        }

        Ok(())
    }

    fn descends_from<'a>(
        &self,
        model: ModelDoc<'a>,
        set: Option<&ModelSet<'a>>,
        ancestor: &str,
    ) -> Result<bool, ValidationError> {
        match set {
            Some(set) => is_subclass_of(set, model, ancestor),
            None => Ok(model.sub_class_of() == Some(ancestor)),
        }
    }

    fn check_financial_product(&self, model: ModelDoc<'_>) -> Result<(), ValidationError> {
        let reserved = &self.registry.reserved;
        let has_forms = model
            .get("forms")
            .and_then(Value::as_array)
            .is_some_and(|forms| !forms.is_empty());
        if !has_forms {
            return Err(ValidationError::consistency(format!(
                "subclasses of \"{}\" require forms: expected \"forms\" to list form model ids",
                reserved.financial_product
            )));
        }

        self.require_message_interface(model, &reserved.financial_product)
    }

    fn check_form(&self, model: ModelDoc<'_>) -> Result<(), ValidationError> {
        self.require_message_interface(model, &self.registry.reserved.form)
    }

    fn require_message_interface(
        &self,
        model: ModelDoc<'_>,
        parent: &str,
    ) -> Result<(), ValidationError> {
        let message = &self.registry.reserved.message;
        if model.implements(message) {
            Ok(())
        } else {
            Err(ValidationError::consistency(format!(
                "subclasses of \"{parent}\" should implement interface \"{message}\""
            )))
        }
    }

    fn check_interface_contracts(&self, model: ModelDoc<'_>) -> Result<(), ValidationError> {
        for interface in model.interfaces() {
            let Some(contract) = self.registry.interface_contracts.get(interface) else {
                continue;
            };

            for (name, expected_type) in &contract.properties {
                let declared_type = model
                    .property(name)
                    .and_then(|property| property.get("type"))
                    .and_then(Value::as_str);
                if declared_type != Some(expected_type.as_str()) {
                    return Err(ValidationError::consistency(format!(
                        "interface \"{interface}\" requires property \"{name}\" of type \"{expected_type}\""
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_groups(&self, model: ModelDoc<'_>) -> Result<(), ValidationError> {
        for group in PROPERTY_GROUPS {
            let mut seen = HashSet::new();
            for entry in model.strings(group) {
                if self.registry.is_protocol_property(entry) {
                    continue;
                }
                if !model.has_property(entry) {
                    return Err(ValidationError::consistency(format!(
                        "group \"{group}\" lists property \"{entry}\", which was not found in \"properties\""
                    )));
                }
                if !seen.insert(entry) {
                    return Err(ValidationError::consistency(format!(
                        "group \"{group}\" lists property \"{entry}\" more than once"
                    )));
                }
            }
        }

        let required: HashSet<&str> = model.strings("required").collect();
        let mut overlap: Vec<&str> = model
            .strings("hidden")
            .filter(|entry| required.contains(entry))
            .collect();
        if !overlap.is_empty() {
            overlap.sort_unstable();
            overlap.dedup();
            return Err(ValidationError::consistency(format!(
                "properties cannot be both \"hidden\" and \"required\": {}",
                quoted_list(overlap)
            )));
        }

        Ok(())
    }

    fn check_enum<'a>(
        &self,
        model: ModelDoc<'a>,
        set: Option<&ModelSet<'a>>,
        values: &Value,
    ) -> Result<(), ValidationError> {
        let enumeration = &self.registry.reserved.enumeration;
        if !self.descends_from(model, set, enumeration)? {
            return Err(ValidationError::consistency(format!(
                "\"enum\" is only allowed on subclasses of \"{enumeration}\""
            )));
        }

        let mut seen = HashSet::new();
        for value in values.as_array().into_iter().flatten() {
            let id = value.get("id").and_then(Value::as_str).unwrap_or_default();
            if !seen.insert(id) {
                return Err(ValidationError::consistency(format!(
                    "\"enum\" lists value \"{id}\" more than once"
                )));
            }
        }
        Ok(())
    }
}

/// Closed schema over top-level model attributes
fn check_fields(model: &Map<String, Value>) -> Result<(), ValidationError> {
    for (attribute, value) in model {
        let field = model_field(attribute).ok_or_else(|| {
            ValidationError::closed_schema(format!("unknown model attribute \"{attribute}\""))
        })?;

        match field {
            ModelField::Str => expect(value.is_string(), attribute, "a string")?,
            ModelField::Bool => expect(value.is_boolean(), attribute, "a boolean")?,
            ModelField::Object => expect(value.is_object(), attribute, "an object")?,
            ModelField::StrArray => expect(is_string_array(value), attribute, "an array of strings")?,
            ModelField::EnumValues => check_enum_values(value)?,
            ModelField::PrimaryKeys => check_key_schema(value, "primaryKeys")?,
            ModelField::Indexes => {
                let indexes = value.as_array().ok_or_else(|| {
                    ValidationError::structural("expected \"indexes\" to be an array")
                })?;
                for (position, index) in indexes.iter().enumerate() {
                    check_key_schema(index, &format!("indexes[{position}]"))?;
                }
            }
        }
    }

    if !model.contains_key("properties") {
        return Err(ValidationError::structural(
            "expected \"properties\" to be an object",
        ));
    }

    Ok(())
}

fn check_verifiable_aspects(model: ModelDoc<'_>) -> Result<(), ValidationError> {
    let Some(aspects) = model.get("verifiableAspects").and_then(Value::as_object) else {
        return Ok(());
    };

    for (aspect, spec) in aspects {
        let methods = spec.get("methods");
        if !spec.is_object() || !methods.is_some_and(is_string_array) {
            return Err(ValidationError::structural(format!(
                "expected \"verifiableAspects.{aspect}.methods\" to be an array of strings"
            )));
        }
    }
    Ok(())
}

fn expect(valid: bool, attribute: &str, description: &str) -> Result<(), ValidationError> {
    if valid {
        Ok(())
    } else {
        Err(ValidationError::structural(format!(
            "expected \"{attribute}\" to be {description}"
        )))
    }
}

fn is_string_array(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|items| items.iter().all(Value::is_string))
}

fn check_enum_values(value: &Value) -> Result<(), ValidationError> {
    let values = value.as_array().ok_or_else(|| {
        ValidationError::structural("expected \"enum\" to be an array of { id, title }")
    })?;

    for (position, entry) in values.iter().enumerate() {
        let id = entry.get("id").and_then(Value::as_str);
        let title = entry.get("title").and_then(Value::as_str);
        match (id, title) {
            (Some(id), Some(_)) if is_model_id(id) => {}
            (Some(id), Some(_)) => {
                return Err(ValidationError::structural(format!(
                    "\"enum[{position}]\" has invalid id \"{id}\", expected to match {}",
                    MODEL_ID_REGEX.as_str()
                )));
            }
            _ => {
                return Err(ValidationError::structural(format!(
                    "expected \"enum[{position}]\" to have string \"id\" and \"title\""
                )));
            }
        }
    }
    Ok(())
}

/// `{ hashKey, rangeKey?, name? }`, where keys are templates: a string or `{ template }`
fn check_key_schema(value: &Value, path: &str) -> Result<(), ValidationError> {
    let schema = value.as_object().ok_or_else(|| {
        ValidationError::structural(format!("expected \"{path}\" to be an object"))
    })?;

    for (attribute, value) in schema {
        let (valid, expected) = match attribute.as_str() {
            "hashKey" | "rangeKey" => (is_key_template(value), "a key template"),
            "name" if path != "primaryKeys" => (value.is_string(), "a string"),
            _ => {
                return Err(ValidationError::closed_schema(format!(
                    "unknown attribute \"{attribute}\" in \"{path}\""
                )));
            }
        };
        if !valid {
            return Err(ValidationError::structural(format!(
                "invalid \"{path}.{attribute}\": expected {expected}"
            )));
        }
    }

    if !schema.contains_key("hashKey") {
        return Err(ValidationError::structural(format!(
            "expected \"{path}\" to declare \"hashKey\""
        )));
    }
    Ok(())
}

fn is_key_template(value: &Value) -> bool {
    match value {
        Value::String(template) => !template.is_empty(),
        Value::Object(map) => {
            map.len() == 1 && map.get("template").and_then(Value::as_str).is_some()
        }
        _ => false,
    }
}
