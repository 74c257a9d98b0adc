//! Operation descriptor types
//!
//! This module defines the data structures that describe a single remote
//! operation in a data-driven way: which service and action it calls, which
//! input fields it declares, how it paginates, and how its output is shaped.
//! Descriptors are loaded from JSON rather than hard-coded per operation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// AWS API protocol types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApiProtocol {
    /// EC2/IAM/SQS style: Action=X&Version=Y as query params, XML response
    #[default]
    Query,
    /// JSON-RPC style with X-Amz-Target header
    Json,
}

/// Declared type of an input field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    #[default]
    String,
    Integer,
    Boolean,
    StringList,
    Object,
    ObjectList,
}

impl FieldType {
    /// Whether a JSON value is an acceptable value for this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            FieldType::Object => value.is_object(),
            FieldType::ObjectList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_object)),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, FieldType::StringList | FieldType::ObjectList)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::StringList => "string-list",
            FieldType::Object => "object",
            FieldType::ObjectList => "object-list",
        };
        f.write_str(name)
    }
}

/// How destructive an operation is. Operations at or above the configured
/// threshold require confirmation unless forced.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    Deserialize,
    Serialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ConfirmImpact {
    /// Read-only operation
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl ConfirmImpact {
    /// Anything above `None` changes remote state
    pub fn is_mutating(&self) -> bool {
        *self > ConfirmImpact::None
    }
}

/// A single declared input field
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FieldSpec {
    /// Parameter name as the caller writes it (e.g., "QueueUrl")
    pub name: String,

    #[serde(default, rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub required: bool,

    /// Alternative names accepted for this field
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Position in the wire request, slash-separated for nested placement
    /// (e.g., "Filter/Key"). Defaults to `name`.
    #[serde(default)]
    pub wire_name: Option<String>,
}

impl FieldSpec {
    /// Case-insensitive match against the name or any alias
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    pub fn wire_path(&self) -> &str {
        self.wire_name.as_deref().unwrap_or(&self.name)
    }
}

/// Pagination configuration for API calls
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PaginationConfig {
    /// Input field that carries the cursor (e.g., "NextToken", "Marker")
    #[serde(default)]
    pub input_token: Option<String>,
    /// Path to extract the output cursor from the response
    #[serde(default)]
    pub output_token: Option<String>,
    /// Input field for page size
    #[serde(default)]
    pub max_results_param: Option<String>,
    /// Page size applied when the caller leaves `max_results_param` unset
    #[serde(default)]
    pub max_results: Option<u32>,
}

/// Configuration for a single operation
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OperationDescriptor {
    /// Verb-noun command name (e.g., "Get-SQSQueue")
    pub command: String,

    /// Service key used for endpoint and signing lookup (e.g., "sqs")
    pub service: String,

    /// API action name (e.g., "ListQueues")
    pub action: String,

    #[serde(default)]
    pub protocol: ApiProtocol,

    #[serde(default)]
    pub fields: Vec<FieldSpec>,

    #[serde(default)]
    pub pagination: Option<PaginationConfig>,

    /// Response field emitted when the caller does not pass a selector
    #[serde(default)]
    pub primary_field: Option<String>,

    /// Known top-level response fields. Empty means unchecked.
    #[serde(default)]
    pub output_fields: Vec<String>,

    #[serde(default)]
    pub confirm_impact: ConfirmImpact,

    /// Input field whose value names the affected resource in prompts
    #[serde(default)]
    pub target_field: Option<String>,

    /// Parameters always included in the wire request
    #[serde(default)]
    pub static_params: HashMap<String, Value>,
}

impl OperationDescriptor {
    /// Look up a declared field by name or alias
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.matches(name))
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Declared name for `name`, resolving case and aliases
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.field(name).map_or(name, |f| f.name.as_str())
    }

    /// Input cursor field, if the operation paginates, by declared name
    pub fn input_token(&self) -> Option<&str> {
        self.pagination
            .as_ref()
            .and_then(|p| p.input_token.as_deref())
            .map(|token| self.canonical_name(token))
    }

    /// Page-size field, by declared name
    pub fn max_results_field(&self) -> Option<&str> {
        self.pagination
            .as_ref()
            .and_then(|p| p.max_results_param.as_deref())
            .map(|param| self.canonical_name(param))
    }

    /// Output cursor path, if the operation paginates
    pub fn output_token(&self) -> Option<&str> {
        self.pagination
            .as_ref()
            .and_then(|p| p.output_token.as_deref())
    }

    pub fn is_paginated(&self) -> bool {
        self.input_token().is_some() && self.output_token().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_protocol_deserialize() {
        let protocol: ApiProtocol = serde_json::from_str(r#""query""#).unwrap();
        assert_eq!(protocol, ApiProtocol::Query);

        let protocol: ApiProtocol = serde_json::from_str(r#""json""#).unwrap();
        assert_eq!(protocol, ApiProtocol::Json);
    }

    #[test]
    fn test_confirm_impact_ordering() {
        assert!(ConfirmImpact::High > ConfirmImpact::Medium);
        assert!(ConfirmImpact::Low > ConfirmImpact::None);
        assert!(!ConfirmImpact::None.is_mutating());
        assert!(ConfirmImpact::Low.is_mutating());
    }

    #[test]
    fn test_field_type_accepts() {
        assert!(FieldType::String.accepts(&json!("a")));
        assert!(!FieldType::String.accepts(&json!(1)));
        assert!(FieldType::Integer.accepts(&json!(10)));
        assert!(!FieldType::Integer.accepts(&json!(1.5)));
        assert!(FieldType::StringList.accepts(&json!(["a", "b"])));
        assert!(!FieldType::StringList.accepts(&json!(["a", 1])));
        assert!(FieldType::ObjectList.accepts(&json!([{"Key": "k"}])));
    }

    #[test]
    fn test_descriptor_deserialize() {
        let json = r#"{
            "command": "Get-SQSQueue",
            "service": "sqs",
            "action": "ListQueues",
            "fields": [
                {"name": "QueueNamePrefix", "aliases": ["Prefix"]},
                {"name": "MaxResults", "type": "integer"},
                {"name": "NextToken"}
            ],
            "pagination": {"input_token": "NextToken", "output_token": "/NextToken"},
            "primary_field": "QueueUrl"
        }"#;
        let op: OperationDescriptor = serde_json::from_str(json).unwrap();

        assert_eq!(op.protocol, ApiProtocol::Query);
        assert_eq!(op.confirm_impact, ConfirmImpact::None);
        assert!(op.is_paginated());
        assert_eq!(op.field("prefix").unwrap().name, "QueueNamePrefix");
        assert_eq!(op.field("maxresults").unwrap().field_type, FieldType::Integer);
        assert!(op.field("Unknown").is_none());
    }

    #[test]
    fn test_pagination_fields_resolve_to_declared_names() {
        let json = r#"{
            "command": "Get-Widget",
            "service": "widgets",
            "action": "ListWidgets",
            "fields": [{"name": "NextToken"}, {"name": "PageSize", "aliases": ["Limit"]}],
            "pagination": {"input_token": "nexttoken", "output_token": "/NextToken", "max_results_param": "limit"}
        }"#;
        let op: OperationDescriptor = serde_json::from_str(json).unwrap();

        assert_eq!(op.input_token(), Some("NextToken"));
        assert_eq!(op.max_results_field(), Some("PageSize"));
        assert_eq!(op.canonical_name("undeclared"), "undeclared");
    }

    #[test]
    fn test_wire_path_defaults_to_name() {
        let field = FieldSpec {
            name: "TableName".to_string(),
            ..Default::default()
        };
        assert_eq!(field.wire_path(), "TableName");

        let nested = FieldSpec {
            name: "FilterKey".to_string(),
            wire_name: Some("Filter/Key".to_string()),
            ..Default::default()
        };
        assert_eq!(nested.wire_path(), "Filter/Key");
    }
}
