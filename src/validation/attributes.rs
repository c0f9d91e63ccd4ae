//! Property attribute schemas
//!
//! Each declared property `type` maps to a `PropertyKind`, and each kind owns a
//! closed whitelist of attributes. Whitelists are composed from layers: the
//! attributes every property may carry, plus the extras of its kind. Object
//! properties additionally specialize into photo and document flavors.

use serde_json::{Map, Value};

use super::ValidationError;

pub const PROPERTY_TYPES: &[&str] = &[
    "string", "number", "date", "object", "array", "boolean", "enum", "bytes",
];

pub const PROPERTY_RANGES: &[&str] = &[
    "json", "email", "password", "phone", "year", "photo", "check", "url", "model", "document",
    "troolean", "objects", "property",
];

const CAMERA_TYPES: &[&str] = &["front", "back"];
const SCANNERS: &[&str] = &["id-document", "payment-card"];
const ALLOWED_ROLES: &[&str] = &["me"];

// mirrors react-native TextInput.keyboardType
const KEYBOARDS: &[&str] = &[
    "default",
    "email-address",
    "numeric",
    "phone-pad",
    "ascii-capable",
    "numbers-and-punctuation",
    "url",
    "number-pad",
    "name-phone-pad",
    "decimal-pad",
    "twitter",
    "web-search",
];

const COMMON: &[&str] = &[
    "icon",
    "type",
    "skipLabel",
    "title",
    "shortTitle",
    "description",
    "readOnly",
    "displayName",
    "default",
    "allowRoles",
    "hidden",
    "immutable",
    "internalUse",
    "clientUse",
    "virtual",
    "sample",
    "showIf",
    "hideIf",
];

const BOOLEAN_EXTRAS: &[&str] = &["range"];

const NUMBER_EXTRAS: &[&str] = &[
    "range", "min", "max", "minDate", "maxDate", "units", "minLength", "maxLength", "keyboard",
];

const STRING_EXTRAS: &[&str] = &[
    "ref",
    "range",
    "pattern",
    "minLength",
    "maxLength",
    "keyboard",
    "group",
    "list",
    "displayAs",
    "markdown",
    "signature",
];

const ENUM_EXTRAS: &[&str] = &["oneOf", "pin", "limit", "filter"];

const DATE_EXTRAS: &[&str] = &["min", "max", "minDate", "maxDate", "format"];

const OBJECT_EXTRAS: &[&str] = &[
    "range",
    "ref",
    "inlined",
    "allowToAdd",
    "properties",
    "units",
    "pin",
    "limit",
    "partial",
    "allowedMimeTypes",
    "set",
    "implements",
];

const PHOTO_EXTRAS: &[&str] = &[
    "mainPhoto",
    "component",
    "allowPicturesFromLibrary",
    "coverPhoto",
    "cameraType",
    "allowedMimeTypes",
    "scanner",
    "signature",
];

const FILE_EXTRAS: &[&str] = &["allowPicturesFromLibrary", "allowedMimeTypes", "dataBundle"];

const ARRAY_EXTRAS: &[&str] = &[
    "range",
    "items",
    "inlined",
    "allowToAdd",
    "required",
    "viewCols",
    "pin",
    "limit",
];

type Layers = &'static [&'static [&'static str]];

const STRING_LAYERS: Layers = &[COMMON, STRING_EXTRAS];
const NUMBER_LAYERS: Layers = &[COMMON, NUMBER_EXTRAS];
const DATE_LAYERS: Layers = &[COMMON, DATE_EXTRAS];
const BOOLEAN_LAYERS: Layers = &[COMMON, BOOLEAN_EXTRAS];
const ENUM_LAYERS: Layers = &[COMMON, ENUM_EXTRAS];
const BYTES_LAYERS: Layers = &[COMMON];
const OBJECT_LAYERS: Layers = &[COMMON, OBJECT_EXTRAS];
const PHOTO_LAYERS: Layers = &[COMMON, OBJECT_EXTRAS, PHOTO_EXTRAS];
const DOCUMENT_LAYERS: Layers = &[COMMON, OBJECT_EXTRAS, FILE_EXTRAS];
const ARRAY_LAYERS: Layers = &[COMMON, OBJECT_EXTRAS, PHOTO_EXTRAS, ARRAY_EXTRAS];

/// Closed set of attributes, as a stack of layers
#[derive(Debug, Clone, Copy)]
pub struct AttributeSchema {
    pub name: &'static str,
    layers: Layers,
}

impl AttributeSchema {
    pub const STRING: Self = Self::new("string", STRING_LAYERS);
    pub const NUMBER: Self = Self::new("number", NUMBER_LAYERS);
    pub const DATE: Self = Self::new("date", DATE_LAYERS);
    pub const BOOLEAN: Self = Self::new("boolean", BOOLEAN_LAYERS);
    pub const ENUM: Self = Self::new("enum", ENUM_LAYERS);
    pub const BYTES: Self = Self::new("bytes", BYTES_LAYERS);
    pub const OBJECT: Self = Self::new("object", OBJECT_LAYERS);
    pub const PHOTO: Self = Self::new("photo", PHOTO_LAYERS);
    pub const DOCUMENT: Self = Self::new("document", DOCUMENT_LAYERS);
    pub const ARRAY: Self = Self::new("array", ARRAY_LAYERS);

    const fn new(name: &'static str, layers: Layers) -> Self {
        Self { name, layers }
    }

    pub fn allows(&self, attribute: &str) -> bool {
        self.layers
            .iter()
            .any(|layer| layer.contains(&attribute))
    }

    /// Reject the first attribute outside this schema
    pub fn check(&self, property: &Map<String, Value>) -> Result<(), ValidationError> {
        match property.keys().find(|attribute| !self.allows(attribute)) {
            Some(attribute) => Err(ValidationError::closed_schema(format!(
                "attribute \"{attribute}\" is not allowed on {} properties",
                self.name
            ))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    String,
    Number,
    Date,
    Object,
    Array,
    Boolean,
    Enum,
    Bytes,
}

impl PropertyKind {
    pub fn parse(type_name: &str) -> Option<Self> {
        Some(match type_name {
            "string" => Self::String,
            "number" => Self::Number,
            "date" => Self::Date,
            "object" => Self::Object,
            "array" => Self::Array,
            "boolean" => Self::Boolean,
            "enum" => Self::Enum,
            "bytes" => Self::Bytes,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Date => "date",
            Self::Object => "object",
            Self::Array => "array",
            Self::Boolean => "boolean",
            Self::Enum => "enum",
            Self::Bytes => "bytes",
        }
    }

    pub fn is_complex(self) -> bool {
        matches!(self, Self::Object | Self::Array)
    }

    /// Whitelist for this kind; object properties pick theirs by flavor
    pub fn schema(self, flavor: ObjectFlavor) -> AttributeSchema {
        match self {
            Self::String => AttributeSchema::STRING,
            Self::Number => AttributeSchema::NUMBER,
            Self::Date => AttributeSchema::DATE,
            Self::Boolean => AttributeSchema::BOOLEAN,
            Self::Enum => AttributeSchema::ENUM,
            Self::Bytes => AttributeSchema::BYTES,
            Self::Array => AttributeSchema::ARRAY,
            Self::Object => match flavor {
                ObjectFlavor::Plain => AttributeSchema::OBJECT,
                ObjectFlavor::Photo => AttributeSchema::PHOTO,
                ObjectFlavor::Document => AttributeSchema::DOCUMENT,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectFlavor {
    Plain,
    Photo,
    Document,
}

/// Expected shape of an attribute's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Bool,
    Str,
    Number,
    /// A number or a string holding one
    Numberish,
    StrArray,
    Array,
    Object,
    Any,
    /// String or object
    Sample,
    OneOf(&'static [&'static str]),
    /// List of `{ interface, property }`
    Implements,
}

/// Value kind of every known property attribute; `None` means unknown
pub fn attribute_kind(attribute: &str) -> Option<AttrKind> {
    use AttrKind::*;

    Some(match attribute {
        "type" => OneOf(PROPERTY_TYPES),
        "range" => OneOf(PROPERTY_RANGES),
        "scanner" => OneOf(SCANNERS),
        "keyboard" => OneOf(KEYBOARDS),
        "cameraType" => OneOf(CAMERA_TYPES),
        "allowRoles" => OneOf(ALLOWED_ROLES),
        "inlined" | "readOnly" | "immutable" | "skipLabel" | "displayName" | "markdown"
        | "signature" | "internalUse" | "clientUse" | "allowToAdd" | "mainPhoto" | "hidden"
        | "allowPicturesFromLibrary" | "coverPhoto" | "dataBundle" | "virtual" | "partial"
        | "set" => Bool,
        "title" | "shortTitle" | "description" | "ref" | "displayAs" | "minDate" | "maxDate"
        | "units" | "icon" | "pattern" | "component" | "showIf" | "hideIf" | "filter"
        | "format" => Str,
        "group" | "list" | "allowedMimeTypes" | "required" | "viewCols" => StrArray,
        "min" | "max" => Numberish,
        "minLength" | "maxLength" => Number,
        "items" | "properties" => Object,
        "oneOf" | "pin" | "limit" => Array,
        "default" => Any,
        "sample" => Sample,
        "implements" => Implements,
        _ => return None,
    })
}

impl AttrKind {
    pub fn check(self, attribute: &str, value: &Value) -> Result<(), ValidationError> {
        let valid = match self {
            Self::Bool => value.is_boolean(),
            Self::Str => value.is_string(),
            Self::Number => value.is_number(),
            Self::Numberish => match value {
                Value::Number(_) => true,
                Value::String(s) => s.trim().parse::<f64>().is_ok(),
                _ => false,
            },
            Self::StrArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
            Self::Sample => value.is_string() || value.is_object(),
            Self::OneOf(allowed) => {
                return match value.as_str() {
                    Some(v) if allowed.contains(&v) => Ok(()),
                    _ => Err(ValidationError::structural(format!(
                        "expected \"{attribute}\" to be one of: {}",
                        allowed.join(", ")
                    ))),
                };
            }
            Self::Implements => value.as_array().is_some_and(|items| {
                items.iter().all(|item| {
                    item.get("interface").is_some_and(Value::is_string)
                        && item.get("property").is_some_and(Value::is_string)
                })
            }),
        };

        if valid {
            Ok(())
        } else {
            Err(ValidationError::structural(format!(
                "expected \"{attribute}\" to be {}",
                self.describe()
            )))
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Bool => "a boolean",
            Self::Str => "a string",
            Self::Number => "a number",
            Self::Numberish => "a number or numeric string",
            Self::StrArray => "an array of strings",
            Self::Array => "an array",
            Self::Object => "an object",
            Self::Any => "any value",
            Self::Sample => "a string or an object",
            Self::OneOf(_) => "one of the allowed values",
            Self::Implements => "an array of { interface, property } objects",
        }
    }
}

/// Type-check every attribute of a property, rejecting unknown ones
pub fn check_attribute_types(property: &Map<String, Value>) -> Result<(), ValidationError> {
    for (attribute, value) in property {
        let kind = attribute_kind(attribute).ok_or_else(|| {
            ValidationError::closed_schema(format!("unknown property attribute \"{attribute}\""))
        })?;
        kind.check(attribute, value)?;
    }
    Ok(())
}
