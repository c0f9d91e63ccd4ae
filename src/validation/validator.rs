use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, error, info};

use super::diagnostics::{Diagnostics, Warning};
use super::model::ModelValidator;
use super::property::{PropertyOwner, PropertyValidator};
use super::refs::{ReferenceValidator, direct_references};
use super::ValidationError;
use crate::document::{ModelDoc, ModelInput, ModelSet};
use crate::graph::InheritanceGraph;
use crate::protocol::ProtocolRegistry;

/// What to do with a failing model once the rest of the set can still be checked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorMode {
    /// Return the first error
    #[default]
    FailFast,
    /// Record reference and consistency failures and keep going.
    /// Structural and closed-schema failures still abort.
    Collect,
}

/// Outcome of a successful validation call
#[derive(Debug, Default)]
pub struct Report {
    pub warnings: Vec<Warning>,
    /// Model-level failures recorded in collect mode
    pub errors: Vec<ValidationError>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn with_warnings(diagnostics: Diagnostics) -> Self {
        Self {
            warnings: diagnostics.into_warnings(),
            errors: Vec::new(),
        }
    }
}

pub struct Validator {
    registry: ProtocolRegistry,
    mode: ErrorMode,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::with_registry(ProtocolRegistry::default())
    }

    pub fn with_registry(registry: ProtocolRegistry) -> Self {
        Self {
            registry,
            mode: ErrorMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ErrorMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn registry(&self) -> &ProtocolRegistry {
        &self.registry
    }

    pub fn mode(&self) -> ErrorMode {
        self.mode
    }

    /// Validate a single model, an array of models, or a map of id → model.
    ///
    /// A single model only gets the shape checks; a set also gets the
    /// inheritance and reference passes.
    pub fn validate(&self, input: &Value) -> Result<Report, ValidationError> {
        let mut diagnostics = Diagnostics::new();

        let errors = match ModelInput::from_value(input, &self.registry)? {
            ModelInput::Single(model) => {
                debug!("Validating single model {}", model.display_id());
                ModelValidator::new(&self.registry).validate(model, None, &mut diagnostics)?;
                Vec::new()
            }
            ModelInput::Set(set) => self.validate_set(&set, &mut diagnostics)?,
        };

        let report = Report {
            warnings: diagnostics.into_warnings(),
            errors,
        };
        if report.is_clean() {
            info!("✓ Validation passed with {} warnings", report.warnings.len());
        }
        Ok(report)
    }

    fn validate_set(
        &self,
        set: &ModelSet<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<ValidationError>, ValidationError> {
        debug!("Validating {} models", set.len());
        let models = ModelValidator::new(&self.registry);
        let mut errors = Vec::new();

        for model in set.iter() {
            let Err(err) = models.validate(model, Some(set), diagnostics) else {
                continue;
            };
            let err = err.context(format!("invalid model \"{}\"", model.display_id()));

            if self.mode == ErrorMode::Collect && !err.kind().is_structural() {
                error!("{err}");
                errors.push(err);
            } else {
                return Err(err);
            }
        }

        debug!("Checking inheritance graph...");
        let result = InheritanceGraph::new(set).check().and_then(|()| {
            debug!("Checking references...");
            ReferenceValidator::new(set, &self.registry).validate_all(self.mode, diagnostics)
        });

        match result {
            Ok(()) => Ok(errors),
            Err(err) if errors.is_empty() => Err(err),
            // Collected model errors travel with the set-wide failures
            Err(ValidationError::Aggregate(failures)) => {
                errors.extend(failures);
                Err(ValidationError::Aggregate(errors))
            }
            Err(err) => {
                errors.push(err);
                Err(ValidationError::Aggregate(errors))
            }
        }
    }

    /// Shape checks for one model, without a set to resolve against
    pub fn validate_model(&self, model: &Value) -> Result<Report, ValidationError> {
        let mut diagnostics = Diagnostics::new();
        ModelValidator::new(&self.registry).validate_value(model, &mut diagnostics)?;
        Ok(Report::with_warnings(diagnostics))
    }

    /// Check one property of `model` in isolation
    pub fn validate_property(&self, model: &Value, name: &str) -> Result<Report, ValidationError> {
        let doc = ModelDoc::from_value(model)
            .ok_or_else(|| ValidationError::structural("expected model to be an object"))?;
        let properties = doc.properties().ok_or_else(|| {
            ValidationError::structural("expected \"properties\" to be an object")
        })?;
        if !doc.has_property(name) {
            return Err(ValidationError::reference(format!(
                "property \"{name}\" is not declared in \"properties\""
            )));
        }

        let mut diagnostics = Diagnostics::new();
        PropertyValidator::new(&self.registry).validate(
            PropertyOwner::model(doc, properties),
            name,
            &mut diagnostics,
        )?;
        Ok(Report::with_warnings(diagnostics))
    }

    /// Only the inheritance and reference passes over a set
    pub fn validate_references(&self, models: &Value) -> Result<Report, ValidationError> {
        let set = ModelSet::from_value(models)?;
        let mut diagnostics = Diagnostics::new();

        InheritanceGraph::new(&set).check()?;
        ReferenceValidator::new(&set, &self.registry).validate_all(self.mode, &mut diagnostics)?;
        Ok(Report::with_warnings(diagnostics))
    }

    /// Ids transitively referenced from `subset`
    pub fn get_references<S: AsRef<str>>(
        &self,
        models: &Value,
        subset: &[S],
    ) -> Result<BTreeSet<String>, ValidationError> {
        let set = ModelSet::from_value(models)?;
        let references = ReferenceValidator::new(&set, &self.registry).get_references(subset)?;
        Ok(references.into_iter().map(str::to_owned).collect())
    }

    pub fn get_direct_references(&self, model: &Value) -> Result<BTreeSet<String>, ValidationError> {
        let doc = ModelDoc::from_value(model)
            .ok_or_else(|| ValidationError::structural("expected model to be an object"))?;
        Ok(direct_references(doc).into_iter().map(str::to_owned).collect())
    }
}
