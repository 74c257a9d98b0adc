//! Query Protocol Handler
//!
//! Handles AWS Query protocol (used by EC2, IAM, SQS, SNS, STS)
//! - Request: Action=X&Version=Y plus flattened parameters
//! - Response: XML

use super::ProtocolHandler;
use crate::aws::http::{get_service, xml_to_json, AwsHttpClient};
use crate::operation::error::RemoteError;
use crate::operation::path_extractor::unwrap_query_response;
use crate::operation::protocol::OperationDescriptor;
use crate::operation::request::OperationRequest;
use crate::operation::response::OperationResponse;
use serde_json::Value;

pub struct QueryProtocolHandler;

impl QueryProtocolHandler {
    /// Flatten the wire request into query parameters.
    ///
    /// Lists become `Name.member.N`, or `Name.N` for EC2; object keys are
    /// appended with a dot (`Filter.1.Name`).
    pub fn build_params(
        &self,
        op: &OperationDescriptor,
        request: &OperationRequest,
        flat_lists: bool,
    ) -> Vec<(String, String)> {
        let mut params = Vec::new();
        for (key, value) in request.to_wire(op) {
            flatten_param(&key, &value, flat_lists, &mut params);
        }
        params
    }

    /// Execute the API request (async implementation)
    pub async fn execute_impl(
        &self,
        http: &AwsHttpClient,
        op: &OperationDescriptor,
        request: &OperationRequest,
    ) -> Result<String, RemoteError> {
        let flat_lists = get_service(&op.service).is_some_and(|s| s.flat_query_lists);
        let params = self.build_params(op, request, flat_lists);
        http.query_request(&op.service, &op.action, &params).await
    }
}

fn flatten_param(prefix: &str, value: &Value, flat_lists: bool, out: &mut Vec<(String, String)>) {
    match value {
        Value::String(s) => out.push((prefix.to_string(), s.clone())),
        Value::Number(n) => out.push((prefix.to_string(), n.to_string())),
        Value::Bool(b) => out.push((prefix.to_string(), b.to_string())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                let key = if flat_lists {
                    format!("{}.{}", prefix, i + 1)
                } else {
                    format!("{}.member.{}", prefix, i + 1)
                };
                flatten_param(&key, item, flat_lists, out);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                flatten_param(&format!("{}.{}", prefix, k), v, flat_lists, out);
            }
        }
        Value::Null => {}
    }
}

impl ProtocolHandler for QueryProtocolHandler {
    fn parse_response(&self, body: &str) -> Result<OperationResponse, RemoteError> {
        let json = xml_to_json(body)?;
        // Strip the ActionResponse/ActionResult envelope
        let payload = unwrap_query_response(&json).unwrap_or(json);
        Ok(OperationResponse::new(match payload {
            Value::Null => Value::Object(Default::default()),
            other => other,
        }))
    }
}
