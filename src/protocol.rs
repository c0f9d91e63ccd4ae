//! Protocol registry: the reserved models the rule set special-cases by identity
//!
//! Nothing in the validators hardcodes a model id. Every sentinel (the Model
//! type tag, the Enum root, FinancialProduct, ...) and the root Object
//! protocol properties come from a `ProtocolRegistry` handed to the engine,
//! so rules can be exercised against any protocol version.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::Path;

/// Sentinel ids of the reserved base models
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReservedModels {
    pub model: String,
    pub object: String,
    #[serde(rename = "enum")]
    pub enumeration: String,
    pub financial_product: String,
    pub my_product: String,
    pub form: String,
    pub method: String,
    pub money: String,
    pub photo: String,
    pub file: String,
    pub json: String,
    pub message: String,
    pub verifiable: String,
    pub identity: String,
    pub profile: String,
}

impl Default for ReservedModels {
    fn default() -> Self {
        Self {
            model: "tradle.Model".to_string(),
            object: "tradle.Object".to_string(),
            enumeration: "tradle.Enum".to_string(),
            financial_product: "tradle.FinancialProduct".to_string(),
            my_product: "tradle.MyProduct".to_string(),
            form: "tradle.Form".to_string(),
            method: "tradle.Method".to_string(),
            money: "tradle.Money".to_string(),
            photo: "tradle.Photo".to_string(),
            file: "tradle.File".to_string(),
            json: "tradle.Json".to_string(),
            message: "tradle.Message".to_string(),
            verifiable: "tradle.Verifiable".to_string(),
            identity: "tradle.Identity".to_string(),
            profile: "tradle.Profile".to_string(),
        }
    }
}

/// Properties an interface forces on its implementors, with their declared `type`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceContract {
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProtocolRegistry {
    pub reserved: ReservedModels,

    /// Models allowed to declare any underscore-prefixed property
    pub protocol_roots: Vec<String>,

    /// Type tag property, legal on every model
    pub type_tag: String,

    /// Protocol properties inherited from the root Object model
    pub object_properties: Map<String, Value>,

    pub interface_contracts: BTreeMap<String, InterfaceContract>,
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        let reserved = ReservedModels::default();
        let protocol_roots = vec![reserved.object.clone(), reserved.message.clone()];

        let object_properties = match json!({
            "_t": { "type": "string", "range": "model", "readOnly": true },
            "_s": { "type": "string", "readOnly": true },
            "_seq": { "type": "number", "readOnly": true },
            "_permalink": { "type": "string", "readOnly": true },
            "_link": { "type": "string", "readOnly": true },
            "_prevlink": { "type": "string", "readOnly": true },
            "_time": { "type": "date", "readOnly": true },
            "_author": { "type": "string", "readOnly": true },
            "_version": { "type": "number", "readOnly": true }
        }) {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let mut interface_contracts = BTreeMap::new();
        interface_contracts.insert(
            "tradle.Context".to_string(),
            InterfaceContract {
                properties: BTreeMap::from([("contextId".to_string(), "string".to_string())]),
            },
        );

        Self {
            reserved,
            protocol_roots,
            type_tag: "_t".to_string(),
            object_properties,
            interface_contracts,
        }
    }
}

impl ProtocolRegistry {
    /// Load a registry from a YAML or JSON file. Omitted fields keep their defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read protocol registry {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse protocol registry {}", path.display()))
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse protocol registry {}", path.display()))
        }
    }

    pub fn protocol_property(&self, name: &str) -> Option<&Value> {
        self.object_properties.get(name)
    }

    pub fn is_protocol_property(&self, name: &str) -> bool {
        name == self.type_tag || self.object_properties.contains_key(name)
    }

    pub fn is_protocol_root(&self, id: &str) -> bool {
        self.protocol_roots.iter().any(|root| root == id)
    }
}
