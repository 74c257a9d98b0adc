//! JSON Protocol Handler
//!
//! Handles AWS JSON-RPC protocol (used by DynamoDB, SSM, Logs, etc.)
//! - Request: POST with X-Amz-Target header, JSON body
//! - Response: JSON

use super::ProtocolHandler;
use crate::aws::http::AwsHttpClient;
use crate::operation::error::RemoteError;
use crate::operation::protocol::OperationDescriptor;
use crate::operation::request::OperationRequest;
use crate::operation::response::OperationResponse;
use anyhow::Context;
use serde_json::Value;

pub struct JsonProtocolHandler;

impl JsonProtocolHandler {
    /// Build the JSON body for a request
    pub fn build_body(&self, op: &OperationDescriptor, request: &OperationRequest) -> String {
        Value::Object(request.to_wire(op)).to_string()
    }

    /// Execute the API request (async implementation)
    pub async fn execute_impl(
        &self,
        http: &AwsHttpClient,
        op: &OperationDescriptor,
        request: &OperationRequest,
    ) -> Result<String, RemoteError> {
        let body = self.build_body(op, request);
        http.json_request(&op.service, &op.action, &body).await
    }
}

impl ProtocolHandler for JsonProtocolHandler {
    fn parse_response(&self, body: &str) -> Result<OperationResponse, RemoteError> {
        // Some actions (DeleteParameter) answer with an empty body
        if body.trim().is_empty() {
            return Ok(OperationResponse::new(Value::Object(Default::default())));
        }
        let json: Value = serde_json::from_str(body).context("Invalid JSON response")?;
        Ok(OperationResponse::new(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::protocol::{FieldSpec, FieldType, PaginationConfig};
    use serde_json::json;

    fn describe_log_groups() -> OperationDescriptor {
        OperationDescriptor {
            command: "Get-CWLLogGroup".to_string(),
            service: "logs".to_string(),
            action: "DescribeLogGroups".to_string(),
            fields: vec![
                FieldSpec {
                    name: "LogGroupNamePrefix".to_string(),
                    wire_name: Some("logGroupNamePrefix".to_string()),
                    ..Default::default()
                },
                FieldSpec {
                    name: "Limit".to_string(),
                    field_type: FieldType::Integer,
                    wire_name: Some("limit".to_string()),
                    ..Default::default()
                },
                FieldSpec {
                    name: "NextToken".to_string(),
                    wire_name: Some("nextToken".to_string()),
                    ..Default::default()
                },
            ],
            pagination: Some(PaginationConfig {
                input_token: Some("NextToken".to_string()),
                output_token: Some("/nextToken".to_string()),
                max_results_param: Some("Limit".to_string()),
                max_results: Some(50),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_body_uses_wire_names() {
        let op = describe_log_groups();
        let mut request = OperationRequest::new();
        request.bind(&op, "LogGroupNamePrefix", "/aws/lambda").unwrap();
        request.set_cursor("NextToken", "abc");

        let body: Value = serde_json::from_str(&JsonProtocolHandler.build_body(&op, &request)).unwrap();
        assert_eq!(
            body,
            json!({"logGroupNamePrefix": "/aws/lambda", "nextToken": "abc", "limit": 50})
        );
    }

    #[test]
    fn test_parse_response() {
        let response = JsonProtocolHandler
            .parse_response(r#"{"TableNames": ["a", "b"], "LastEvaluatedTableName": "b"}"#)
            .unwrap();
        assert_eq!(response.as_value()["TableNames"], json!(["a", "b"]));
    }

    #[test]
    fn test_parse_empty_body() {
        let response = JsonProtocolHandler.parse_response("").unwrap();
        assert_eq!(response.as_value(), &json!({}));
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(JsonProtocolHandler.parse_response("<html>").is_err());
    }
}
