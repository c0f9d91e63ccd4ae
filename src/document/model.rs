use serde_json::{Map, Value};

/// Read-only view over a model document
#[derive(Debug, Clone, Copy)]
pub struct ModelDoc<'a> {
    raw: &'a Map<String, Value>,
}

impl<'a> ModelDoc<'a> {
    pub fn new(raw: &'a Map<String, Value>) -> Self {
        Self { raw }
    }

    pub fn from_value(value: &'a Value) -> Option<Self> {
        value.as_object().map(Self::new)
    }

    pub fn raw(&self) -> &'a Map<String, Value> {
        self.raw
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.raw.get(key)
    }

    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.raw.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&'a str> {
        self.str("id")
    }

    /// Id for messages; documents without a string id show as `<unknown>`
    pub fn display_id(&self) -> &'a str {
        self.id().unwrap_or("<unknown>")
    }

    pub fn type_tag(&self) -> Option<&'a str> {
        self.str("type")
    }

    pub fn sub_class_of(&self) -> Option<&'a str> {
        self.str("subClassOf")
    }

    /// String entries of an array attribute; non-string entries are skipped
    pub fn strings(&self, key: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.raw
            .get(key)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &'a str> + use<'a> {
        self.strings("interfaces")
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces().any(|id| id == interface)
    }

    pub fn properties(&self) -> Option<&'a Map<String, Value>> {
        self.raw.get("properties").and_then(Value::as_object)
    }

    pub fn property(&self, name: &str) -> Option<&'a Value> {
        self.properties().and_then(|props| props.get(name))
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    /// True only for an explicit `true`
    pub fn flag(&self, key: &str) -> bool {
        self.raw.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn is_abstract(&self) -> bool {
        self.flag("abstract")
    }

    pub fn is_interface(&self) -> bool {
        self.flag("isInterface")
    }
}

/// Split `com.example.Thing` into (`com.example`, `Thing`)
pub fn parse_model_id(id: &str) -> (&str, &str) {
    match id.rsplit_once('.') {
        Some((namespace, name)) => (namespace, name),
        None => ("", id),
    }
}
