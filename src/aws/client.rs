//! AWS Client - Lightweight HTTP-based client
//!
//! Uses SigV4 signing with direct HTTP calls instead of heavy SDK

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::OnceCell;

use super::credentials::load_credentials;
use super::handlers;
use super::http::AwsHttpClient;
use crate::operation::error::{InvokeError, RemoteError, TransportKind};
use crate::operation::invoker::RemoteCall;
use crate::operation::protocol::OperationDescriptor;
use crate::operation::request::OperationRequest;
use crate::operation::response::OperationResponse;

/// Container for AWS HTTP client
pub struct AwsClients {
    pub http: AwsHttpClient,
    pub region: String,
    pub profile: String,
}

impl AwsClients {
    /// Create AWS client for a given profile and region
    /// Note: credential files are read on a blocking thread
    pub async fn new(profile: &str, region: &str, endpoint_url: Option<String>) -> Result<Self> {
        let profile_for_closure = profile.to_string();
        let credentials =
            tokio::task::spawn_blocking(move || load_credentials(&profile_for_closure)).await??;

        Ok(Self {
            http: AwsHttpClient::new(credentials, region, endpoint_url),
            region: region.to_string(),
            profile: profile.to_string(),
        })
    }
}

#[async_trait]
impl RemoteCall for AwsClients {
    async fn call(
        &self,
        op: &OperationDescriptor,
        request: &OperationRequest,
    ) -> Result<OperationResponse, RemoteError> {
        handlers::execute(&self.http, op, request).await
    }
}

/// AWS clients built on the first remote call.
///
/// Usage errors, what-if runs and declined confirmations never reach the
/// transport, so they never need credentials.
pub struct LazyAwsClients {
    profile: String,
    region: String,
    endpoint_url: Option<String>,
    clients: OnceCell<AwsClients>,
}

impl LazyAwsClients {
    pub fn new(profile: &str, region: &str, endpoint_url: Option<String>) -> Self {
        Self {
            profile: profile.to_string(),
            region: region.to_string(),
            endpoint_url,
            clients: OnceCell::new(),
        }
    }

    /// Load credentials and build the clients once
    pub async fn get(&self) -> Result<&AwsClients> {
        self.clients
            .get_or_try_init(|| {
                AwsClients::new(&self.profile, &self.region, self.endpoint_url.clone())
            })
            .await
            .context("Could not create AWS client")
    }

    pub fn is_initialized(&self) -> bool {
        self.clients.initialized()
    }
}

#[async_trait]
impl RemoteCall for LazyAwsClients {
    async fn call(
        &self,
        op: &OperationDescriptor,
        request: &OperationRequest,
    ) -> Result<OperationResponse, RemoteError> {
        self.get().await?.call(op, request).await
    }
}

/// Short remediation hint for common AWS failures
pub fn error_hint(err: &InvokeError) -> Option<&'static str> {
    let remote = err.remote()?;
    if let RemoteError::Transport { kind, .. } = remote {
        return match kind {
            TransportKind::Timeout => Some("Request timed out - check connection"),
            TransportKind::NameResolution | TransportKind::Connect => {
                Some("Connection failed - check network, proxy, region and --endpoint-url")
            }
            TransportKind::Other => None,
        };
    }

    match remote.code()? {
        "InvalidClientTokenId" | "SignatureDoesNotMatch" | "UnrecognizedClientException" => {
            Some("Invalid credentials - run 'aws configure'")
        }
        "ExpiredToken" | "ExpiredTokenException" | "RequestExpired" => {
            Some("Credentials expired - refresh or reconfigure")
        }
        "AccessDenied" | "AccessDeniedException" | "UnauthorizedOperation" => {
            Some("Access denied - check IAM permissions")
        }
        _ => None,
    }
}
