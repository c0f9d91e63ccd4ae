//! Model documents and the id-indexed model set built from them

mod model;

pub use model::{ModelDoc, parse_model_id};

use serde_json::Value;
use std::collections::HashMap;

use crate::protocol::ProtocolRegistry;
use crate::validation::ValidationError;

/// Models addressed by id: an arena of borrowed documents plus an id index.
///
/// Built once per validation call, never mutated afterwards.
#[derive(Debug, Default)]
pub struct ModelSet<'a> {
    models: Vec<ModelDoc<'a>>,
    index: HashMap<&'a str, usize>,
}

impl<'a> ModelSet<'a> {
    /// Build from a list of documents. Two documents with the same id are fatal.
    pub fn from_documents<I>(documents: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut set = Self::default();
        for (position, document) in documents.into_iter().enumerate() {
            set.insert(document, position)?;
        }
        Ok(set)
    }

    /// Build from an array of models or a map of id → model
    pub fn from_value(value: &'a Value) -> Result<Self, ValidationError> {
        match value {
            Value::Array(models) => Self::from_documents(models),
            Value::Object(by_id) => {
                let mut set = Self::default();
                for (position, (key, document)) in by_id.iter().enumerate() {
                    let id = set.insert(document, position)?;
                    if id != key {
                        return Err(ValidationError::consistency(format!(
                            "model keyed as \"{key}\" declares id \"{id}\""
                        )));
                    }
                }
                Ok(set)
            }
            _ => Err(ValidationError::structural(
                "expected a model, an array of models, or a map of model id to model",
            )),
        }
    }

    fn insert(&mut self, document: &'a Value, position: usize) -> Result<&'a str, ValidationError> {
        let model = ModelDoc::from_value(document).ok_or_else(|| {
            ValidationError::structural(format!("expected model at position {position} to be an object"))
        })?;
        let id = model.id().ok_or_else(|| {
            ValidationError::structural(format!(
                "expected string \"id\" on model at position {position}, e.g. com.example.BeerSpaceship"
            ))
        })?;

        if self.index.contains_key(id) {
            return Err(ValidationError::consistency(format!(
                "found two models with id \"{id}\""
            )));
        }

        self.index.insert(id, self.models.len());
        self.models.push(model);
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Option<ModelDoc<'a>> {
        self.index.get(id).map(|&slot| self.models[slot])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Models in input order
    pub fn iter(&self) -> impl Iterator<Item = ModelDoc<'a>> + '_ {
        self.models.iter().copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.models.iter().filter_map(|model| model.id())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// The three accepted input shapes, normalized
#[derive(Debug)]
pub enum ModelInput<'a> {
    Single(ModelDoc<'a>),
    Set(ModelSet<'a>),
}

impl<'a> ModelInput<'a> {
    pub fn from_value(value: &'a Value, registry: &ProtocolRegistry) -> Result<Self, ValidationError> {
        if let Some(model) = ModelDoc::from_value(value)
            && is_model(model, registry)
        {
            return Ok(Self::Single(model));
        }

        ModelSet::from_value(value).map(Self::Set)
    }
}

/// A lone model document rather than a map of them
pub fn is_model(model: ModelDoc<'_>, registry: &ProtocolRegistry) -> bool {
    model.type_tag() == Some(registry.reserved.model.as_str())
        && model.properties().is_some()
        && model.id().is_some()
}
