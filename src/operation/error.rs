//! Error taxonomy for operation invocation

use thiserror::Error;

/// Caller mistakes detected before any remote call is attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("{command}: required parameter '{field}' is missing")]
    MissingRequired { command: String, field: String },

    #[error("{command}: unknown parameter '{name}'")]
    UnknownField { command: String, name: String },

    #[error("{command}: parameter '{field}' expects {expected}, got '{value}'")]
    InvalidValue {
        command: String,
        field: String,
        expected: String,
        value: String,
    },

    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("malformed parameter assignment '{0}', expected Name=Value")]
    MalformedAssignment(String),
}

/// Classification of a transport-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    NameResolution,
    Connect,
    Timeout,
    Other,
}

/// Failure reported by the remote collaborator
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request to {endpoint} failed: {message}")]
    Transport {
        kind: TransportKind,
        endpoint: String,
        message: String,
    },

    #[error("{service} returned {code}: {message} (HTTP {status})")]
    Service {
        service: String,
        code: String,
        message: String,
        status: u16,
        request_id: Option<String>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RemoteError {
    /// Name resolution and connection failures get a clarified message
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            RemoteError::Transport {
                kind: TransportKind::NameResolution | TransportKind::Connect,
                ..
            }
        )
    }

    /// AWS error code, when the service returned one
    pub fn code(&self) -> Option<&str> {
        match self {
            RemoteError::Service { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Diagnostic prefixed to connectivity failures of the given kind
pub fn connectivity_diagnostic(kind: TransportKind) -> &'static str {
    match kind {
        TransportKind::NameResolution => {
            "Name resolution failure attempting to reach service. Check your network connection \
and proxy settings, and confirm the region or endpoint is valid"
        }
        _ => {
            "Connection failure attempting to reach service. Check your network connection \
and proxy settings, and confirm the endpoint is reachable"
        }
    }
}

/// Everything an invocation can fail with
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error("{message}")]
    Connectivity {
        message: String,
        #[source]
        source: RemoteError,
    },

    #[error(transparent)]
    Remote(RemoteError),

    #[error("{0}: operation was not confirmed")]
    NotConfirmed(String),

    #[error("{0}: this operation is not supported in read-only mode")]
    ReadOnly(String),

    #[error("{0}: invocation was cancelled")]
    Cancelled(String),
}

impl InvokeError {
    /// Rewrap connectivity failures, pass everything else through unchanged
    pub fn from_remote(command: &str, err: RemoteError) -> Self {
        match err {
            RemoteError::Transport { kind, .. } if err.is_connectivity() => {
                InvokeError::Connectivity {
                    message: format!("{command}: {} ({err})", connectivity_diagnostic(kind)),
                    source: err,
                }
            }
            err => InvokeError::Remote(err),
        }
    }

    /// The remote error underneath, if any
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            InvokeError::Connectivity { source, .. } => Some(source),
            InvokeError::Remote(err) => Some(err),
            _ => None,
        }
    }
}
