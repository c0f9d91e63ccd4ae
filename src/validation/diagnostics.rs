//! Advisory warnings collected during validation

use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// `evidentiaryDocuments` entry that does not resolve
    UnresolvedEvidentiaryDocument,
    /// `verifiableAspects.*.methods` entry that does not resolve
    UnresolvedVerificationMethod,
    /// `signature` on a string property
    DeprecatedSignature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub model: Option<String>,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.model {
            Some(model) => write!(f, "model \"{model}\": {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Collects warnings so callers decide how to surface them
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, kind: WarningKind, model: Option<&str>, message: impl Into<String>) {
        let warning = Warning {
            kind,
            model: model.map(str::to_string),
            message: message.into(),
        };
        warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}
