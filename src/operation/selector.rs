//! Output selection
//!
//! A selector decides what an invocation emits for each response:
//! `*` emits the whole response, `Field` (or `Field/Sub`) emits one field,
//! and `^Param` echoes the value the caller passed for an input field.

use super::error::UsageError;
use super::path_extractor::extract_by_path;
use super::protocol::OperationDescriptor;
use super::request::OperationRequest;
use super::response::OperationResponse;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSelector {
    /// The full response object
    All,
    /// A response field, slash paths allowed
    Field(String),
    /// The pre-call value of an input field, by canonical name
    Param(String),
}

impl OutputSelector {
    /// Parse and validate a selector expression against the operation
    pub fn parse(expr: &str, op: &OperationDescriptor) -> Result<Self, UsageError> {
        let expr = expr.trim();
        let invalid = |reason: &str| UsageError::InvalidSelector {
            selector: expr.to_string(),
            reason: reason.to_string(),
        };

        if expr.is_empty() {
            return Err(invalid("selector is empty"));
        }
        if expr == "*" {
            return Ok(OutputSelector::All);
        }

        if let Some(param) = expr.strip_prefix('^') {
            if param.is_empty() {
                return Err(invalid("'^' must be followed by a parameter name"));
            }
            let field = op
                .field(param)
                .ok_or_else(|| invalid(&format!("'{}' is not a parameter of {}", param, op.command)))?;
            return Ok(OutputSelector::Param(field.name.clone()));
        }

        let path = expr.trim_start_matches('/');
        if path.is_empty() {
            return Err(invalid("field path is empty"));
        }
        if !op.output_fields.is_empty() {
            let head = path.split('/').next().unwrap_or(path);
            if !op.output_fields.iter().any(|f| f == head) {
                return Err(invalid(&format!(
                    "'{}' is not an output field of {}",
                    head, op.command
                )));
            }
        }
        Ok(OutputSelector::Field(path.to_string()))
    }

    /// Selector used when the caller passes none
    pub fn default_for(op: &OperationDescriptor) -> Self {
        match &op.primary_field {
            Some(field) => OutputSelector::Field(field.clone()),
            None => OutputSelector::All,
        }
    }

    /// Resolve the optional caller expression, falling back to the default
    pub fn resolve(expr: Option<&str>, op: &OperationDescriptor) -> Result<Self, UsageError> {
        match expr {
            Some(expr) => Self::parse(expr, op),
            None => Ok(Self::default_for(op)),
        }
    }

    /// Select the output for one response. `snapshot` is the request as the
    /// caller supplied it, before any cursor was written into it.
    pub fn select(&self, response: &OperationResponse, snapshot: &OperationRequest) -> Value {
        match self {
            OutputSelector::All => response.as_value().clone(),
            OutputSelector::Field(path) => extract_by_path(response.as_value(), path),
            OutputSelector::Param(name) => snapshot.get_raw(name).cloned().unwrap_or(Value::Null),
        }
    }
}

impl fmt::Display for OutputSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSelector::All => f.write_str("*"),
            OutputSelector::Field(path) => f.write_str(path),
            OutputSelector::Param(name) => write!(f, "^{}", name),
        }
    }
}
