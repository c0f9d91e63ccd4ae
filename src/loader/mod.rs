//! Loads model definitions from JSON and YAML files into one flat model list

mod file_scanner;

pub use file_scanner::FileScanner;

use anyhow::{Context, Result, bail};
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::error_utils::{create_named_source, line_column_span};

/// A model file that is not valid JSON or YAML
#[derive(Error, Debug, Diagnostic)]
#[error("Failed to parse {path}")]
#[diagnostic(code(modelguard::parse))]
pub struct ParseError {
    #[source_code]
    src: NamedSource<String>,

    #[label("{reason}")]
    span: Option<SourceSpan>,

    reason: String,

    path: String,
}

impl ParseError {
    fn new(path: &Path, content: String, span: Option<SourceSpan>, reason: String) -> Self {
        Self {
            src: create_named_source(path, content),
            span,
            reason,
            path: path.display().to_string(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

pub struct ModelLoader;

impl ModelLoader {
    /// Read every model file under `paths` (files or directories, walked
    /// recursively) and concatenate their models in path order.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Value> {
        let mut models = Vec::new();

        for path in paths {
            for file in FileScanner::scan(path.as_ref())? {
                debug!("  Loading {}...", file.display());
                Self::load_file(&file, &mut models)?;
            }
        }

        info!("Loaded {} models", models.len());
        Ok(Value::Array(models))
    }

    /// A file holds one model, a list of models, or a map of id → model
    pub fn load_file(path: &Path, models: &mut Vec<Value>) -> Result<()> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        match Self::parse(path, content)? {
            Value::Array(items) => models.extend(items),
            Value::Object(model) if model.contains_key("type") => models.push(Value::Object(model)),
            Value::Object(by_id) => models.extend(by_id.into_iter().map(|(_, model)| model)),
            Value::Null => debug!("  Skipping empty file {}", path.display()),
            _ => bail!(
                "{} must contain a model, a list of models, or a map of model id to model",
                path.display()
            ),
        }

        Ok(())
    }

    fn parse(path: &Path, content: String) -> Result<Value, ParseError> {
        if FileScanner::is_json_file(path) {
            let parsed: Result<Value, _> = serde_json::from_str(&content);
            match parsed {
                Ok(value) => Ok(value),
                Err(e) => {
                    let span = line_column_span(&content, e.line(), e.column());
                    Err(ParseError::new(path, content, Some(span), e.to_string()))
                }
            }
        } else {
            let parsed: Result<Value, _> = serde_yaml::from_str(&content);
            match parsed {
                Ok(value) => Ok(value),
                Err(e) => {
                    let span = e
                        .location()
                        .map(|location| SourceSpan::from(location.index().min(content.len())));
                    Err(ParseError::new(path, content, span, e.to_string()))
                }
            }
        }
    }
}
