//! Cross-model referential integrity over a complete model set

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::{debug, error};

use super::diagnostics::{Diagnostics, WarningKind};
use super::error::references_unknown_model;
use super::utils::{id_is_subclass_of, is_subclass_of, is_subclass_of_any, quoted_list};
use super::{ErrorMode, ValidationError};
use crate::document::{ModelDoc, ModelSet, parse_model_id};
use crate::protocol::ProtocolRegistry;

pub struct ReferenceValidator<'s, 'a> {
    set: &'s ModelSet<'a>,
    registry: &'s ProtocolRegistry,
}

impl<'s, 'a> ReferenceValidator<'s, 'a> {
    pub fn new(set: &'s ModelSet<'a>, registry: &'s ProtocolRegistry) -> Self {
        Self { set, registry }
    }

    /// Check every model in the set. Each model first has its whole reference
    /// closure resolved, then its own references checked.
    pub fn validate_all(
        &self,
        mode: ErrorMode,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ValidationError> {
        let mut failures = Vec::new();

        for model in self.set.iter() {
            let id = model.display_id();
            let result = self
                .closure(&[id], required_references)
                .and_then(|_| self.validate_model(model, diagnostics))
                .map_err(|err| err.context(format!("invalid model \"{id}\"")));

            if let Err(err) = result {
                match mode {
                    ErrorMode::FailFast => return Err(err),
                    ErrorMode::Collect => {
                        error!("{err}");
                        failures.push(err);
                    }
                }
            }
        }

        match ValidationError::from_many(failures) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn validate_model(
        &self,
        model: ModelDoc<'a>,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ValidationError> {
        let reserved = &self.registry.reserved;
        debug!("Checking references of {}", model.display_id());

        if let Some(parent) = model.sub_class_of() {
            self.resolve("subClassOf", parent)?;
            if is_subclass_of(self.set, model, &reserved.financial_product)? {
                self.check_product_forms(model)?;
            }
        }

        self.check_interfaces(model, diagnostics)?;

        if let Some(properties) = model.properties() {
            self.check_properties(model, properties)?;
        }

        self.check_verification_methods(model, diagnostics)?;

        for id in model.strings("multiEntryForms") {
            let form = self.resolve("multiEntryForms", id)?;
            if !self.is_form_like(form)? {
                return Err(ValidationError::consistency(format!(
                    "models referenced in \"multiEntryForms\" should be subclasses of \"{}\" or \"{}\", found \"{id}\"",
                    reserved.form, reserved.my_product
                )));
            }
        }

        Ok(())
    }

    /// Ids reachable from `subset` by following direct references, breadth first.
    ///
    /// Seeds are only part of the result if something in the closure references
    /// them. The Model sentinel is never expanded.
    pub fn get_references<S: AsRef<str>>(
        &self,
        subset: &[S],
    ) -> Result<BTreeSet<&'a str>, ValidationError> {
        self.closure(subset, direct_references)
    }

    fn closure<S: AsRef<str>>(
        &self,
        subset: &[S],
        edges: fn(ModelDoc<'a>) -> BTreeSet<&'a str>,
    ) -> Result<BTreeSet<&'a str>, ValidationError> {
        let mut references = BTreeSet::new();
        let mut batch = self.expand(subset.iter().map(|id| id.as_ref()))?;

        loop {
            let added: Vec<&'a str> = batch
                .iter()
                .flat_map(|model| edges(*model))
                .filter(|id| references.insert(*id))
                .collect();

            if added.is_empty() {
                return Ok(references);
            }
            batch = self.expand(added)?;
        }
    }

    fn expand<'i>(
        &self,
        ids: impl IntoIterator<Item = &'i str>,
    ) -> Result<Vec<ModelDoc<'a>>, ValidationError> {
        ids.into_iter()
            .filter(|id| *id != self.registry.reserved.model)
            .map(|id| {
                self.set.get(id).ok_or_else(|| {
                    ValidationError::reference(format!("missing model \"{id}\""))
                })
            })
            .collect()
    }

    fn resolve(&self, attribute: &str, id: &str) -> Result<ModelDoc<'a>, ValidationError> {
        self.set.get(id).ok_or_else(|| {
            ValidationError::reference(format!(
                "\"{attribute}\" {}",
                references_unknown_model(id)
            ))
        })
    }

    fn is_form_like(&self, model: ModelDoc<'a>) -> Result<bool, ValidationError> {
        let reserved = &self.registry.reserved;
        is_subclass_of_any(
            self.set,
            model,
            &[reserved.form.as_str(), reserved.my_product.as_str()],
        )
    }

    fn check_product_forms(&self, model: ModelDoc<'a>) -> Result<(), ValidationError> {
        let reserved = &self.registry.reserved;

        for id in model.strings("forms") {
            let form = self.resolve("forms", id)?;
            if !self.is_form_like(form)? {
                return Err(ValidationError::consistency(format!(
                    "\"forms\" references model \"{id}\", which is not a subclass of \"{}\" or \"{}\"",
                    reserved.form, reserved.my_product
                )));
            }
        }

        let (namespace, name) = parse_model_id(model.display_id());
        let my_product = if namespace.is_empty() {
            format!("My{name}")
        } else {
            format!("{namespace}.My{name}")
        };
        if !self.set.contains(&my_product) {
            return Err(ValidationError::reference(format!(
                "expected \"{my_product}\" to exist as a subclass of \"{}\"",
                reserved.my_product
            )));
        }

        Ok(())
    }

    fn check_interfaces(
        &self,
        model: ModelDoc<'a>,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ValidationError> {
        for id in model.interfaces() {
            let interface = self.resolve("interfaces", id)?;
            if !interface.is_interface() {
                return Err(ValidationError::consistency(format!(
                    "\"interfaces\" references model \"{id}\", which is not an interface (missing \"isInterface\": true)"
                )));
            }

            if model.is_abstract() {
                continue;
            }

            let missing: Vec<&str> = interface
                .strings("required")
                .filter(|name| {
                    !model.has_property(name) && !self.registry.is_protocol_property(name)
                })
                .collect();
            if !missing.is_empty() {
                return Err(ValidationError::consistency(format!(
                    "interface \"{id}\" requires implementing properties: {}",
                    quoted_list(missing)
                )));
            }
        }

        if model.implements(&self.registry.reserved.verifiable) {
            for id in model.strings("evidentiaryDocuments") {
                if !self.set.contains(id) {
                    diagnostics.warn(
                        WarningKind::UnresolvedEvidentiaryDocument,
                        model.id(),
                        format!("\"evidentiaryDocuments\" {}", references_unknown_model(id)),
                    );
                }
            }
        }

        Ok(())
    }

    fn check_verification_methods(
        &self,
        model: ModelDoc<'a>,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ValidationError> {
        let method_root = &self.registry.reserved.method;

        for method in verification_methods(model) {
            match self.set.get(method) {
                None => diagnostics.warn(
                    WarningKind::UnresolvedVerificationMethod,
                    model.id(),
                    format!("\"verifiableAspects\" {}", references_unknown_model(method)),
                ),
                Some(target) if !is_subclass_of(self.set, target, method_root)? => {
                    return Err(ValidationError::consistency(format!(
                        "method \"{method}\" in \"verifiableAspects\" must reference a subclass of \"{method_root}\""
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn check_properties(
        &self,
        model: ModelDoc<'a>,
        properties: &'a Map<String, Value>,
    ) -> Result<(), ValidationError> {
        properties.iter().try_for_each(|(name, property)| {
            let Some(property) = property.as_object() else {
                return Ok(());
            };
            self.check_property(model, name, property)
                .map_err(|err| err.context(format!("invalid property \"{name}\"")))
        })
    }

    fn check_property(
        &self,
        model: ModelDoc<'a>,
        name: &str,
        property: &'a Map<String, Value>,
    ) -> Result<(), ValidationError> {
        if let Some(reference) = str_attr(property, "ref") {
            let target = self.resolve("ref", reference)?;
            let enumeration = &self.registry.reserved.enumeration;
            if str_attr(property, "type") == Some("string")
                && !is_subclass_of(self.set, target, enumeration)?
            {
                return Err(ValidationError::consistency(format!(
                    "expected \"ref\" to reference a subclass of \"{enumeration}\""
                )));
            }
        }

        if property.get("set").and_then(Value::as_bool) == Some(true) {
            self.check_set(property)?;
        }

        for list in ["limit", "pin"] {
            if let Some(values) = property.get(list).and_then(Value::as_array) {
                self.check_enum_values(name, list, property, values)?;
            }
        }

        if let Some(items) = property.get("items").and_then(Value::as_object) {
            if let Some(reference) = str_attr(items, "ref") {
                let target = self.resolve("items.ref", reference)?;
                if let Some(backlink) = str_attr(items, "backlink") {
                    self.check_backlink(model, target, backlink)?;
                }
            }
            if let Some(nested) = items.get("properties").and_then(Value::as_object) {
                self.check_properties(model, nested)?;
            }
        }

        if let Some(nested) = property.get("properties").and_then(Value::as_object) {
            self.check_properties(model, nested)?;
        }

        Ok(())
    }

    fn check_set(&self, property: &Map<String, Value>) -> Result<(), ValidationError> {
        let reserved = &self.registry.reserved;
        let allowed = match target_ref(property) {
            Some(reference) if reference == reserved.money => true,
            Some(reference) => id_is_subclass_of(self.set, reference, &reserved.enumeration)?,
            None => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(ValidationError::consistency(format!(
                "\"set\" requires \"ref\" to \"{}\" or a subclass of \"{}\"",
                reserved.money, reserved.enumeration
            )))
        }
    }

    fn check_enum_values(
        &self,
        name: &str,
        list: &str,
        property: &Map<String, Value>,
        values: &[Value],
    ) -> Result<(), ValidationError> {
        let Some(target) = target_ref(property).and_then(|reference| self.set.get(reference))
        else {
            return Ok(());
        };
        if !is_subclass_of(self.set, target, &self.registry.reserved.enumeration)? {
            return Ok(());
        }

        let enum_id = target.display_id();
        let members: Vec<&str> = target
            .get("enum")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|member| member.get("id").and_then(Value::as_str))
            .collect();

        for (position, value) in values.iter().enumerate() {
            let wanted = match value {
                Value::String(id) => Some(id.as_str()),
                Value::Object(stub) => stub.get("id").and_then(Value::as_str),
                _ => None,
            };
            let found = wanted.is_some_and(|wanted| {
                members
                    .iter()
                    .any(|member| names_enum_member(enum_id, member, wanted))
            });

            if !found {
                return Err(ValidationError::consistency(format!(
                    "\"{name}.{list}[{position}]\" value {value} does not exist in \"{enum_id}\""
                )));
            }
        }
        Ok(())
    }

    /// `owner` lists `target` items whose `backlink` property points back at `owner`
    fn check_backlink(
        &self,
        owner: ModelDoc<'a>,
        target: ModelDoc<'a>,
        backlink: &str,
    ) -> Result<(), ValidationError> {
        let owner_id = owner.display_id();
        if property_ref(target, backlink) == Some(owner_id) {
            return Ok(());
        }

        for interface in target.interfaces() {
            let Some(reference) = self
                .set
                .get(interface)
                .and_then(|interface| property_ref(interface, backlink))
            else {
                continue;
            };

            if reference == owner_id
                || id_is_subclass_of(self.set, reference, owner_id)?
                || self.is_party_pair(reference, owner_id)
            {
                return Ok(());
            }
        }

        Err(ValidationError::consistency(format!(
            "\"backlink\" \"{backlink}\" implies \"{}\" has property \"{backlink}\" referencing \"{owner_id}\"",
            target.display_id()
        )))
    }

    // Message parties are declared as Identity on one side and Profile on the other
    fn is_party_pair(&self, left: &str, right: &str) -> bool {
        let reserved = &self.registry.reserved;
        let is_party = |id: &str| id == reserved.identity || id == reserved.profile;
        is_party(left) && is_party(right)
    }
}

/// Every model id one model mentions: property refs (array items and inline
/// properties included), parent, interfaces, form lists, verification methods
/// and evidentiary documents.
pub fn direct_references(model: ModelDoc<'_>) -> BTreeSet<&str> {
    let mut references = required_references(model);
    references.extend(model.strings("evidentiaryDocuments"));
    references.extend(verification_methods(model));
    references
}

// Direct references minus the advisory ones, which only warn when unresolved
fn required_references(model: ModelDoc<'_>) -> BTreeSet<&str> {
    let mut references = BTreeSet::new();

    if let Some(properties) = model.properties() {
        collect_property_refs(properties, &mut references);
    }
    references.extend(model.sub_class_of());
    references.extend(model.interfaces());
    for list in ["forms", "additionalForms", "multiEntryForms"] {
        references.extend(model.strings(list));
    }

    references
}

fn collect_property_refs<'a>(properties: &'a Map<String, Value>, references: &mut BTreeSet<&'a str>) {
    for property in properties.values().filter_map(Value::as_object) {
        references.extend(target_ref(property));

        let items = property.get("items").and_then(Value::as_object);
        let nested = [Some(property), items]
            .into_iter()
            .flatten()
            .filter_map(|shape| shape.get("properties").and_then(Value::as_object));
        for nested in nested {
            collect_property_refs(nested, references);
        }
    }
}

fn verification_methods(model: ModelDoc<'_>) -> impl Iterator<Item = &str> {
    model
        .get("verifiableAspects")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|aspects| aspects.values())
        .filter_map(|aspect| aspect.get("methods").and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_str)
}

fn str_attr<'a>(property: &'a Map<String, Value>, attribute: &str) -> Option<&'a str> {
    property.get(attribute).and_then(Value::as_str)
}

/// The model a property points at: its items' `ref` for arrays, its own otherwise
fn target_ref(property: &Map<String, Value>) -> Option<&str> {
    if str_attr(property, "type") == Some("array")
        && let Some(items) = property.get("items").and_then(Value::as_object)
    {
        return str_attr(items, "ref");
    }
    str_attr(property, "ref")
}

fn property_ref<'a>(model: ModelDoc<'a>, name: &str) -> Option<&'a str> {
    model
        .property(name)
        .and_then(|property| property.get("ref"))
        .and_then(Value::as_str)
}

/// Enum values may be written as the bare id or prefixed with the enum model id
fn names_enum_member(enum_id: &str, member: &str, wanted: &str) -> bool {
    if wanted == member {
        return true;
    }
    wanted
        .strip_prefix(enum_id)
        .and_then(|rest| {
            let mut chars = rest.chars();
            chars.next()?;
            Some(chars.as_str())
        })
        .is_some_and(|bare| bare == member)
}
