//! Protocol handlers for the AWS wire protocols
//!
//! Each handler turns an `OperationRequest` into a wire request and parses
//! the raw response back into a JSON document.

mod json;
mod query;

pub use self::json::JsonProtocolHandler;
pub use self::query::QueryProtocolHandler;

use super::http::AwsHttpClient;
use crate::operation::error::RemoteError;
use crate::operation::protocol::{ApiProtocol, OperationDescriptor};
use crate::operation::request::OperationRequest;
use crate::operation::response::OperationResponse;

/// Response parsing for a specific protocol
///
/// Parsing is kept sync so handlers stay dyn-compatible; the async request
/// side lives on each handler as an inherent method.
pub trait ProtocolHandler: Send + Sync {
    fn parse_response(&self, body: &str) -> Result<OperationResponse, RemoteError>;
}

/// Send one request for `op` and parse the reply
pub async fn execute(
    http: &AwsHttpClient,
    op: &OperationDescriptor,
    request: &OperationRequest,
) -> Result<OperationResponse, RemoteError> {
    match op.protocol {
        ApiProtocol::Query => {
            let body = QueryProtocolHandler.execute_impl(http, op, request).await?;
            QueryProtocolHandler.parse_response(&body)
        }
        ApiProtocol::Json => {
            let body = JsonProtocolHandler.execute_impl(http, op, request).await?;
            JsonProtocolHandler.parse_response(&body)
        }
    }
}
