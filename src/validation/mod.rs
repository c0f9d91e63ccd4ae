//! Layered validation of model definitions: model shape, property metadata,
//! then cross-model references

pub mod attributes;
mod diagnostics;
mod error;
pub mod model;
pub mod property;
pub mod refs;
pub mod utils;
mod validator;

#[cfg(test)]
mod tests;

pub use diagnostics::{Diagnostics, Warning, WarningKind};
pub use error::{ErrorKind, ValidationError};
pub use model::ModelValidator;
pub use property::{PropertyOwner, PropertyValidator};
pub use refs::{ReferenceValidator, direct_references};
pub use validator::{ErrorMode, Report, Validator};
