use serde_json::{Map, Value};
use tracing::debug;

use super::ValidationError;
use super::attributes::{AttributeSchema, ObjectFlavor, PROPERTY_TYPES, PropertyKind, check_attribute_types};
use super::diagnostics::{Diagnostics, WarningKind};
use super::utils::{PROPERTY_NAME_REGEX, is_property_name};
use crate::document::ModelDoc;
use crate::protocol::ProtocolRegistry;

const FORBIDDEN_PROPERTY_NAMES: &[&str] = &["tojson", "id"];

/// Top-level MIME types accepted with a `/*` wildcard subtype
const MIME_TOP_LEVEL_TYPES: &[&str] = &[
    "application",
    "audio",
    "example",
    "font",
    "image",
    "message",
    "model",
    "multipart",
    "text",
    "video",
];

/// The properties map a property lives in: a model, or an inline nested shape
#[derive(Debug, Clone, Copy)]
pub struct PropertyOwner<'a> {
    pub id: Option<&'a str>,
    pub properties: &'a Map<String, Value>,
}

impl<'a> PropertyOwner<'a> {
    pub fn model(model: ModelDoc<'a>, properties: &'a Map<String, Value>) -> Self {
        Self {
            id: model.id(),
            properties,
        }
    }

    pub fn nested(properties: &'a Map<String, Value>) -> Self {
        Self {
            id: None,
            properties,
        }
    }

    pub fn get(&self, name: &str) -> Option<&'a Map<String, Value>> {
        self.properties.get(name).and_then(Value::as_object)
    }
}

pub struct PropertyValidator<'r> {
    registry: &'r ProtocolRegistry,
}

impl<'r> PropertyValidator<'r> {
    pub fn new(registry: &'r ProtocolRegistry) -> Self {
        Self { registry }
    }

    /// Validate every property of `owner`, tagging failures with the property name
    pub fn validate_all(
        &self,
        owner: PropertyOwner<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ValidationError> {
        owner.properties.keys().try_for_each(|name| {
            self.validate(owner, name, diagnostics)
                .map_err(|err| err.context(format!("invalid property \"{name}\"")))
        })
    }

    pub fn validate(
        &self,
        owner: PropertyOwner<'_>,
        name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ValidationError> {
        if FORBIDDEN_PROPERTY_NAMES.contains(&name.to_lowercase().as_str()) {
            return Err(ValidationError::structural(format!(
                "property name \"{name}\" is not allowed"
            )));
        }

        if !is_property_name(name) {
            return Err(ValidationError::structural(format!(
                "property name \"{name}\" must adhere to {}",
                PROPERTY_NAME_REGEX.as_str()
            )));
        }

        let value = owner.properties.get(name).ok_or_else(|| {
            ValidationError::reference(format!("property \"{name}\" is not declared"))
        })?;
        let property = value.as_object().ok_or_else(|| {
            ValidationError::structural("expected property definition to be an object")
        })?;

        self.check_underscore(owner, name, value, property)?;
        self.check_definition(owner, name, property, diagnostics)
    }

    // Underscore-prefixed names are reserved for protocol and virtual properties
    fn check_underscore(
        &self,
        owner: PropertyOwner<'_>,
        name: &str,
        value: &Value,
        property: &Map<String, Value>,
    ) -> Result<(), ValidationError> {
        if !name.starts_with('_')
            || name == self.registry.type_tag
            || is_true(property, "virtual")
            || owner.id.is_some_and(|id| self.registry.is_protocol_root(id))
        {
            return Ok(());
        }

        match self.registry.protocol_property(name) {
            Some(protocol) if protocol == value => Ok(()),
            _ => Err(ValidationError::consistency(
                "non-virtual properties must not begin with an underscore",
            )),
        }
    }

    /// Everything past the name checks. Also used for derived array item properties.
    fn check_definition(
        &self,
        owner: PropertyOwner<'_>,
        name: &str,
        property: &Map<String, Value>,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ValidationError> {
        let type_name = property
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ValidationError::structural(format!(
                    "expected \"type\" to be one of: {}",
                    PROPERTY_TYPES.join(", ")
                ))
            })?;

        check_attribute_types(property)?;

        let kind = PropertyKind::parse(type_name).ok_or_else(|| {
            ValidationError::structural(format!(
                "expected \"type\" to be one of: {}",
                PROPERTY_TYPES.join(", ")
            ))
        })?;

        if property.contains_key("group") {
            check_group(owner, name, property)?;
        }
        if property.contains_key("allowedMimeTypes") {
            self.check_mime_types(property)?;
        }
        if property.contains_key("list") {
            check_list(owner, name, property)?;
        }
        if property.contains_key("displayAs") {
            check_display_as(property)?;
        }

        match kind {
            PropertyKind::Object => self.check_object(owner, name, property, diagnostics)?,
            PropertyKind::Array => self.check_array(owner, name, property, diagnostics)?,
            PropertyKind::String => {
                kind.schema(ObjectFlavor::Plain).check(property)?;
                if is_true(property, "signature") {
                    diagnostics.warn(
                        WarningKind::DeprecatedSignature,
                        owner.id,
                        format!(
                            "\"signature\" on string property \"{name}\" is deprecated; use type \"object\" with ref \"{}\"",
                            self.registry.reserved.photo
                        ),
                    );
                }
            }
            PropertyKind::Number
            | PropertyKind::Date
            | PropertyKind::Boolean
            | PropertyKind::Enum
            | PropertyKind::Bytes => kind.schema(ObjectFlavor::Plain).check(property)?,
        }

        if property.contains_key("units") {
            self.check_units(kind, property)?;
        }

        Ok(())
    }

    fn object_flavor(&self, property: &Map<String, Value>) -> ObjectFlavor {
        let reserved = &self.registry.reserved;
        let range = str_attr(property, "range");
        let reference = str_attr(property, "ref");

        if range == Some("photo") || reference == Some(reserved.photo.as_str()) {
            ObjectFlavor::Photo
        } else if range == Some("document")
            || reference == Some(reserved.file.as_str())
            || reference == Some(reserved.json.as_str())
        {
            ObjectFlavor::Document
        } else {
            ObjectFlavor::Plain
        }
    }

    fn check_object(
        &self,
        owner: PropertyOwner<'_>,
        name: &str,
        property: &Map<String, Value>,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ValidationError> {
        let reserved = &self.registry.reserved;
        PropertyKind::Object
            .schema(self.object_flavor(property))
            .check(property)?;

        let range = str_attr(property, "range");
        let reference = str_attr(property, "ref");
        let nested = property.get("properties").and_then(Value::as_object);

        let shapes = [reference.is_some(), nested.is_some(), range == Some("json")]
            .into_iter()
            .filter(|present| *present)
            .count();
        match shapes {
            0 => {
                return Err(ValidationError::consistency(
                    "expected \"ref\", inlined \"properties\", or range \"json\"",
                ));
            }
            1 => {}
            _ => {
                return Err(ValidationError::consistency(
                    "expected only one of \"ref\", inlined \"properties\", or range \"json\"",
                ));
            }
        }

        if let Some(nested) = nested {
            debug!("Validating inline properties of \"{name}\"");
            return self.validate_all(PropertyOwner::nested(nested), diagnostics);
        }

        if range == Some("photo") {
            if let Some(reference) = reference
                && reference != reserved.photo
            {
                return Err(ValidationError::consistency(format!(
                    "expected \"ref\" to be \"{}\"",
                    reserved.photo
                )));
            }
            return Ok(());
        }

        if range == Some("document") || is_true(property, "dataBundle") {
            self.check_file(owner, property)?;
        }

        Ok(())
    }

    fn check_file(
        &self,
        owner: PropertyOwner<'_>,
        property: &Map<String, Value>,
    ) -> Result<(), ValidationError> {
        let reserved = &self.registry.reserved;
        if let Some(reference) = str_attr(property, "ref")
            && reference != reserved.photo
            && reference != reserved.file
            && reference != reserved.json
        {
            return Err(ValidationError::consistency(format!(
                "expected \"ref\" to be a subclass of \"{}\"",
                reserved.file
            )));
        }

        if !is_true(property, "dataBundle") {
            return Ok(());
        }

        if let Some(range) = str_attr(property, "range")
            && range != "document"
        {
            return Err(ValidationError::consistency(
                "\"dataBundle\" properties take range \"document\" or no range at all",
            ));
        }

        let bundles = owner
            .properties
            .values()
            .filter(|other| other.get("dataBundle").and_then(Value::as_bool) == Some(true))
            .count();
        if bundles > 1 {
            return Err(ValidationError::consistency(
                "only one \"dataBundle\" property is allowed",
            ));
        }

        Ok(())
    }

    fn check_array(
        &self,
        owner: PropertyOwner<'_>,
        name: &str,
        property: &Map<String, Value>,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ValidationError> {
        AttributeSchema::ARRAY.check(property)?;

        let items = property
            .get("items")
            .and_then(Value::as_object)
            .ok_or_else(|| ValidationError::structural("expected \"items\" on array property"))?;

        let reference = match items.get("ref") {
            None => None,
            Some(Value::String(reference)) => Some(reference.as_str()),
            Some(_) => return Err(ValidationError::structural("expected \"items.ref\" to be a string")),
        };

        match items.get("backlink") {
            Some(Value::String(_)) => {
                if reference.is_none() {
                    return Err(ValidationError::consistency(
                        "expected \"backlink\" to be accompanied by \"ref\"",
                    ));
                }
            }
            Some(_) => {
                return Err(ValidationError::structural(
                    "expected \"items.backlink\" to be a string",
                ));
            }
            None => {
                if let Some(nested) = items.get("properties").and_then(Value::as_object) {
                    debug!("Validating inline item properties of \"{name}\"");
                    self.validate_all(PropertyOwner::nested(nested), diagnostics)?;
                    return check_item_groups(property, nested);
                }

                match items.get("type") {
                    Some(item_type) => {
                        let kind = item_type.as_str().and_then(PropertyKind::parse).ok_or_else(|| {
                            ValidationError::structural(format!(
                                "expected \"items.type\" to be one of: {}",
                                PROPERTY_TYPES.join(", ")
                            ))
                        })?;
                        if reference.is_some() && !kind.is_complex() {
                            return Err(ValidationError::consistency(
                                "expected \"items.type\" to be \"object\" or \"array\" when \"ref\" is set",
                            ));
                        }
                        if reference.is_none() && kind.is_complex() {
                            return Err(ValidationError::consistency(format!(
                                "expected \"items\" of type \"{}\" to declare \"ref\"",
                                kind.as_str()
                            )));
                        }
                    }
                    None if reference.is_none() => {
                        return Err(ValidationError::structural(
                            "expected \"items\" to declare \"ref\", inline \"properties\", or a primitive \"type\"",
                        ));
                    }
                    None => {}
                }
            }
        }

        if reference.is_some() {
            let inner = self.implied_item_property(items);
            self.check_definition(owner, name, &inner, diagnostics)
                .map_err(|err| err.context("invalid \"items\""))?;
        }

        Ok(())
    }

    /// Ref-bearing items validate as an object property. Works on a copy.
    fn implied_item_property(&self, items: &Map<String, Value>) -> Map<String, Value> {
        let mut inner = items.clone();
        inner.remove("backlink");
        inner.remove("filter");
        inner.insert("type".to_string(), Value::String("object".to_string()));

        let is_photo = str_attr(items, "range") == Some("photo")
            || str_attr(items, "ref") == Some(self.registry.reserved.photo.as_str());
        if is_photo {
            inner.insert("range".to_string(), Value::String("photo".to_string()));
        }
        inner
    }

    fn check_units(
        &self,
        kind: PropertyKind,
        property: &Map<String, Value>,
    ) -> Result<(), ValidationError> {
        let money = self.registry.reserved.money.as_str();
        if kind != PropertyKind::Number && str_attr(property, "ref") != Some(money) {
            return Err(ValidationError::consistency(format!(
                "\"units\" requires \"type\": \"number\" or \"ref\": \"{money}\""
            )));
        }
        Ok(())
    }

    fn check_mime_types(&self, property: &Map<String, Value>) -> Result<(), ValidationError> {
        let reserved = &self.registry.reserved;
        let is_container = matches!(str_attr(property, "type"), Some("object" | "array"));
        if !is_container {
            return Err(ValidationError::consistency(
                "\"allowedMimeTypes\" is only allowed on object or array properties",
            ));
        }

        let reference = str_attr(property, "ref").or_else(|| {
            property
                .get("items")
                .and_then(|items| items.get("ref"))
                .and_then(Value::as_str)
        });
        let is_photo = reference == Some(reserved.photo.as_str());
        if !is_photo && reference != Some(reserved.file.as_str()) {
            return Err(ValidationError::consistency(format!(
                "\"allowedMimeTypes\" requires a \"{}\" or \"{}\" property",
                reserved.photo, reserved.file
            )));
        }

        let mime_types = property
            .get("allowedMimeTypes")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str);

        for mime_type in mime_types {
            if is_photo && !mime_type.starts_with("image/") {
                return Err(ValidationError::consistency(format!(
                    "\"allowedMimeTypes\" has mime type \"{mime_type}\", which is invalid for {}",
                    reserved.photo
                )));
            }
            if !is_known_mime_type(mime_type) {
                return Err(ValidationError::consistency(format!(
                    "\"allowedMimeTypes\" has unknown mime type \"{mime_type}\""
                )));
            }
        }

        Ok(())
    }
}

/// A registered `type/subtype`, or `<known top-level type>/*`
fn is_known_mime_type(mime_type: &str) -> bool {
    match mime_type.split_once('/') {
        Some((top, "*")) => MIME_TOP_LEVEL_TYPES.contains(&top),
        Some(("*", _)) | None => false,
        Some(_) => mime_guess::get_mime_extensions_str(mime_type).is_some(),
    }
}

fn check_group(
    owner: PropertyOwner<'_>,
    name: &str,
    property: &Map<String, Value>,
) -> Result<(), ValidationError> {
    if !property.contains_key("displayAs") {
        return Err(ValidationError::consistency(format!(
            "property \"{name}\" is invalid: \"group\" is allowed only with \"displayAs\""
        )));
    }
    check_members(owner, name, property, "group")
}

fn check_list(
    owner: PropertyOwner<'_>,
    name: &str,
    property: &Map<String, Value>,
) -> Result<(), ValidationError> {
    if !property.contains_key("displayAs") {
        return Err(ValidationError::consistency(format!(
            "property \"{name}\" is invalid: \"list\" is allowed only with \"displayAs\""
        )));
    }
    check_members(owner, name, property, "list")
}

// One level of grouping only: members may not be groups themselves
fn check_members(
    owner: PropertyOwner<'_>,
    name: &str,
    property: &Map<String, Value>,
    attribute: &str,
) -> Result<(), ValidationError> {
    let members = property
        .get(attribute)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);

    for member in members {
        if member == name {
            return Err(ValidationError::consistency(format!(
                "\"{attribute}\" of property \"{name}\" cannot reference \"{name}\""
            )));
        }

        let referenced = owner.get(member).ok_or_else(|| {
            ValidationError::consistency(format!(
                "\"{attribute}\" of property \"{name}\" references non-existent property \"{member}\""
            ))
        })?;

        if referenced.contains_key("group") {
            return Err(ValidationError::consistency(format!(
                "\"{attribute}\" of property \"{name}\" has a nested group property \"{member}\""
            )));
        }
    }

    Ok(())
}

fn check_display_as(property: &Map<String, Value>) -> Result<(), ValidationError> {
    if str_attr(property, "type") != Some("string") {
        return Err(ValidationError::consistency(
            "\"displayAs\" is reserved for string properties",
        ));
    }
    if !property.contains_key("group") {
        return Err(ValidationError::consistency(
            "\"displayAs\" must be accompanied by \"group\"",
        ));
    }
    Ok(())
}

// Array-level `required`/`viewCols` refer to the inline item shape
fn check_item_groups(
    property: &Map<String, Value>,
    nested: &Map<String, Value>,
) -> Result<(), ValidationError> {
    for group in ["required", "viewCols"] {
        let entries = property
            .get(group)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str);
        for entry in entries {
            if !nested.contains_key(entry) {
                return Err(ValidationError::consistency(format!(
                    "group {group} lists property {entry}, which was not found in \"items.properties\""
                )));
            }
        }
    }
    Ok(())
}

fn str_attr<'m>(property: &'m Map<String, Value>, attribute: &str) -> Option<&'m str> {
    property.get(attribute).and_then(Value::as_str)
}

fn is_true(property: &Map<String, Value>, attribute: &str) -> bool {
    property.get(attribute).and_then(Value::as_bool) == Some(true)
}
