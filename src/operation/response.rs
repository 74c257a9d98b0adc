use super::path_extractor::extract_cursor;
use super::protocol::OperationDescriptor;
use serde_json::Value;

/// Parsed response of a single remote call
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResponse {
    body: Value,
}

impl OperationResponse {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    pub fn as_value(&self) -> &Value {
        &self.body
    }

    /// Continuation cursor, if the operation paginates and one was returned
    pub fn cursor(&self, op: &OperationDescriptor) -> Option<String> {
        op.output_token()
            .and_then(|path| extract_cursor(&self.body, path))
    }
}
