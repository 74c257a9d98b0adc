//! Request binding
//!
//! Turns caller input (typed values or `Name=Value` text) into an
//! `OperationRequest` validated against the operation's declared fields,
//! and renders it into the wire shape the transport sends.

use super::error::UsageError;
use super::path_extractor::insert_by_path;
use super::protocol::{FieldSpec, FieldType, OperationDescriptor};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Bound input values keyed by canonical field name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationRequest {
    values: BTreeMap<String, Value>,
}

impl OperationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a typed value for a declared field (name or alias)
    pub fn set(
        &mut self,
        op: &OperationDescriptor,
        name: &str,
        value: Value,
    ) -> Result<(), UsageError> {
        let field = resolve_field(op, name)?;
        if !field.field_type.accepts(&value) {
            return Err(invalid_value(op, field, &value.to_string()));
        }
        self.values.insert(field.name.clone(), value);
        Ok(())
    }

    /// Bind a text value, parsing it according to the declared type.
    ///
    /// String lists accumulate across repeated binds and split on commas.
    pub fn bind(&mut self, op: &OperationDescriptor, name: &str, raw: &str) -> Result<(), UsageError> {
        let field = resolve_field(op, name)?;
        let parsed = parse_value(op, field, raw)?;

        match (field.field_type.is_list(), self.values.get_mut(&field.name)) {
            (true, Some(Value::Array(existing))) => {
                if let Value::Array(more) = parsed {
                    existing.extend(more);
                }
            }
            _ => {
                self.values.insert(field.name.clone(), parsed);
            }
        }
        Ok(())
    }

    /// Bind a `Name=Value` assignment
    pub fn bind_assignment(&mut self, op: &OperationDescriptor, assignment: &str) -> Result<(), UsageError> {
        let (name, raw) = assignment
            .split_once('=')
            .filter(|(name, _)| !name.trim().is_empty())
            .ok_or_else(|| UsageError::MalformedAssignment(assignment.to_string()))?;
        self.bind(op, name.trim(), raw)
    }

    /// Build a request from a list of `Name=Value` assignments
    pub fn from_assignments<'a>(
        op: &OperationDescriptor,
        assignments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, UsageError> {
        let mut request = Self::new();
        for assignment in assignments {
            request.bind_assignment(op, assignment)?;
        }
        Ok(request)
    }

    /// Value of a field by canonical name, alias or any casing
    pub fn get(&self, op: &OperationDescriptor, name: &str) -> Option<&Value> {
        op.field(name).and_then(|f| self.values.get(&f.name))
    }

    /// Value of a field by its canonical name
    pub fn get_raw(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn is_set(&self, name: &str) -> bool {
        match self.values.get(name) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    /// Set the pagination cursor on the request
    pub fn set_cursor(&mut self, field: &str, cursor: &str) {
        self.values
            .insert(field.to_string(), Value::String(cursor.to_string()));
    }

    /// Declared required fields that are not set, in declaration order
    pub fn missing_required(&self, op: &OperationDescriptor) -> Vec<String> {
        op.required_fields()
            .filter(|f| !self.is_set(&f.name))
            .map(|f| f.name.clone())
            .collect()
    }

    /// Snapshot as a JSON object keyed by canonical field name
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Render the wire request: static params, page-size default, then each
    /// bound field at its wire path.
    pub fn to_wire(&self, op: &OperationDescriptor) -> Map<String, Value> {
        let mut wire = Map::new();

        for (key, value) in &op.static_params {
            insert_by_path(&mut wire, key, value.clone());
        }

        let default_page_size = op.pagination.as_ref().and_then(|p| p.max_results);
        if let (Some(param), Some(max)) = (op.max_results_field(), default_page_size) {
            if !self.values.contains_key(param) {
                let path = op.field(param).map(FieldSpec::wire_path).unwrap_or(param);
                insert_by_path(&mut wire, path, Value::from(max));
            }
        }

        for (name, value) in &self.values {
            if value.is_null() {
                continue;
            }
            let path = op.field(name).map(FieldSpec::wire_path).unwrap_or(name);
            insert_by_path(&mut wire, path, value.clone());
        }

        wire
    }
}

fn resolve_field<'a>(op: &'a OperationDescriptor, name: &str) -> Result<&'a FieldSpec, UsageError> {
    op.field(name).ok_or_else(|| UsageError::UnknownField {
        command: op.command.clone(),
        name: name.to_string(),
    })
}

fn invalid_value(op: &OperationDescriptor, field: &FieldSpec, raw: &str) -> UsageError {
    UsageError::InvalidValue {
        command: op.command.clone(),
        field: field.name.clone(),
        expected: field.field_type.to_string(),
        value: raw.to_string(),
    }
}

fn parse_value(op: &OperationDescriptor, field: &FieldSpec, raw: &str) -> Result<Value, UsageError> {
    let trimmed = raw.trim();
    match field.field_type {
        FieldType::String => Ok(Value::String(raw.to_string())),
        FieldType::Integer => trimmed
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid_value(op, field, raw)),
        FieldType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "$true" | "yes" | "1" => Ok(Value::Bool(true)),
            "false" | "$false" | "no" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid_value(op, field, raw)),
        },
        FieldType::StringList => Ok(Value::Array(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        )),
        FieldType::Object => match serde_json::from_str::<Value>(trimmed) {
            Ok(value @ Value::Object(_)) => Ok(value),
            _ => Err(invalid_value(op, field, raw)),
        },
        FieldType::ObjectList => match serde_json::from_str::<Value>(trimmed) {
            Ok(value) if field.field_type.accepts(&value) => Ok(value),
            Ok(value @ Value::Object(_)) => Ok(Value::Array(vec![value])),
            _ => Err(invalid_value(op, field, raw)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::protocol::PaginationConfig;
    use serde_json::json;

    fn descriptor() -> OperationDescriptor {
        serde_json::from_value(json!({
            "command": "Get-EC2Instance",
            "service": "ec2",
            "action": "DescribeInstances",
            "fields": [
                {"name": "InstanceId", "type": "string-list", "aliases": ["Id"]},
                {"name": "Filter", "type": "object-list"},
                {"name": "MaxResults", "type": "integer"},
                {"name": "DryRun", "type": "boolean"},
                {"name": "NextToken"},
                {"name": "OwnerTag", "wire_name": "Tag/Owner"},
                {"name": "Region", "required": true}
            ],
            "pagination": {
                "input_token": "NextToken",
                "output_token": "/nextToken",
                "max_results_param": "MaxResults",
                "max_results": 100
            },
            "static_params": {"IncludeAllInstances": true}
        }))
        .unwrap()
    }

    #[test]
    fn test_bind_parses_declared_types() {
        let op = descriptor();
        let request = OperationRequest::from_assignments(
            &op,
            ["maxresults=10", "DryRun=$true", "Id=i-1, i-2", "Filter={\"Name\":\"a\"}"],
        )
        .unwrap();

        assert_eq!(request.get(&op, "MaxResults"), Some(&json!(10)));
        assert_eq!(request.get(&op, "DryRun"), Some(&json!(true)));
        assert_eq!(request.get(&op, "InstanceId"), Some(&json!(["i-1", "i-2"])));
        assert_eq!(request.get(&op, "Filter"), Some(&json!([{"Name": "a"}])));
    }

    #[test]
    fn test_string_list_accumulates() {
        let op = descriptor();
        let request =
            OperationRequest::from_assignments(&op, ["InstanceId=i-1", "InstanceId=i-2,i-3"]).unwrap();
        assert_eq!(
            request.get_raw("InstanceId"),
            Some(&json!(["i-1", "i-2", "i-3"]))
        );
    }

    #[test]
    fn test_bind_rejects_bad_values() {
        let op = descriptor();
        let mut request = OperationRequest::new();

        let err = request.bind(&op, "MaxResults", "ten").unwrap_err();
        assert!(matches!(err, UsageError::InvalidValue { ref field, .. } if field == "MaxResults"));

        let err = request.bind(&op, "Bogus", "1").unwrap_err();
        assert!(matches!(err, UsageError::UnknownField { .. }));

        let err = request.bind_assignment(&op, "NoEquals").unwrap_err();
        assert_eq!(err, UsageError::MalformedAssignment("NoEquals".to_string()));
    }

    #[test]
    fn test_set_checks_type() {
        let op = descriptor();
        let mut request = OperationRequest::new();
        assert!(request.set(&op, "MaxResults", json!(5)).is_ok());
        assert!(request.set(&op, "MaxResults", json!("5")).is_err());
    }

    #[test]
    fn test_missing_required() {
        let op = descriptor();
        let mut request = OperationRequest::new();
        assert_eq!(request.missing_required(&op), vec!["Region".to_string()]);

        request.bind(&op, "Region", "").unwrap();
        assert_eq!(request.missing_required(&op), vec!["Region".to_string()]);

        request.bind(&op, "Region", "us-east-1").unwrap();
        assert!(request.missing_required(&op).is_empty());
    }

    #[test]
    fn test_to_wire_applies_static_defaults_and_paths() {
        let op = descriptor();
        let request = OperationRequest::from_assignments(&op, ["OwnerTag=ops", "InstanceId=i-1"]).unwrap();
        let wire = Value::Object(request.to_wire(&op));

        assert_eq!(
            wire,
            json!({
                "IncludeAllInstances": true,
                "MaxResults": 100,
                "Tag": {"Owner": "ops"},
                "InstanceId": ["i-1"]
            })
        );
    }

    #[test]
    fn test_caller_page_size_wins_over_default() {
        let mut op = descriptor();
        op.pagination = Some(PaginationConfig {
            max_results_param: Some("MaxResults".to_string()),
            max_results: Some(50),
            ..Default::default()
        });
        let request = OperationRequest::from_assignments(&op, ["MaxResults=7"]).unwrap();
        assert_eq!(request.to_wire(&op)["MaxResults"], json!(7));
    }

    #[test]
    fn test_page_size_param_spelled_differently_from_field() {
        let mut op = descriptor();
        op.pagination = Some(PaginationConfig {
            max_results_param: Some("maxresults".to_string()),
            max_results: Some(50),
            ..Default::default()
        });
        let request = OperationRequest::from_assignments(&op, ["MaxResults=7"]).unwrap();
        let wire = request.to_wire(&op);

        assert_eq!(wire["MaxResults"], json!(7));
        assert!(!wire.contains_key("maxresults"));
    }

    #[test]
    fn test_set_cursor() {
        let op = descriptor();
        let mut request = OperationRequest::new();
        request.set_cursor("NextToken", "tok1");
        assert_eq!(request.get(&op, "nexttoken"), Some(&json!("tok1")));
    }
}
