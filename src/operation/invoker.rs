//! Operation invoker
//!
//! One generic implementation of the bind → call → select → paginate loop
//! shared by every operation in the catalog. The remote side is reached
//! through the `RemoteCall` trait so the loop never knows about HTTP.

use super::error::{InvokeError, RemoteError, UsageError};
use super::history::ResultLog;
use super::path_extractor::value_to_string;
use super::protocol::{ConfirmImpact, OperationDescriptor};
use super::request::OperationRequest;
use super::response::OperationResponse;
use super::selector::OutputSelector;
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The remote collaborator: one request in, one response out
#[async_trait]
pub trait RemoteCall: Send + Sync {
    async fn call(
        &self,
        op: &OperationDescriptor,
        request: &OperationRequest,
    ) -> Result<OperationResponse, RemoteError>;
}

/// What the caller is asked to confirm
#[derive(Debug, Clone)]
pub struct ConfirmPrompt<'a> {
    pub command: &'a str,
    pub action: &'a str,
    pub target: String,
    pub impact: ConfirmImpact,
}

/// Asks the caller whether a mutating operation may proceed
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &ConfirmPrompt<'_>) -> bool;
}

/// Declines every prompt. Used when no interactive caller exists.
pub struct DenyAll;

impl Confirm for DenyAll {
    fn confirm(&self, _prompt: &ConfirmPrompt<'_>) -> bool {
        false
    }
}

/// What to do when a required field is not set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MissingFieldPolicy {
    /// Fail with a usage error before calling
    #[default]
    Error,
    /// Log a warning and call anyway
    Warn,
}

#[derive(Debug, Clone, Copy)]
pub struct InvokePolicy {
    pub missing_required: MissingFieldPolicy,
    /// Operations at or above this impact prompt unless forced
    pub confirm_threshold: ConfirmImpact,
    pub read_only: bool,
}

impl Default for InvokePolicy {
    fn default() -> Self {
        Self {
            missing_required: MissingFieldPolicy::Error,
            confirm_threshold: ConfirmImpact::Medium,
            read_only: false,
        }
    }
}

/// Per-call switches
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    pub select: Option<String>,
    pub force: bool,
    pub what_if: bool,
    pub no_auto_iteration: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationState {
    Start,
    Requesting,
    Done,
    Aborted,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSummary {
    pub calls: usize,
    pub emitted: usize,
    pub state: PaginationState,
}

pub struct Invoker<'a> {
    remote: &'a dyn RemoteCall,
    confirm: &'a dyn Confirm,
    policy: InvokePolicy,
    cancel: CancellationToken,
}

impl<'a> Invoker<'a> {
    pub fn new(remote: &'a dyn RemoteCall, confirm: &'a dyn Confirm) -> Self {
        Self {
            remote,
            confirm,
            policy: InvokePolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_policy(mut self, policy: InvokePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Token checked before every page
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run one operation to completion, emitting the selected value of each
    /// page. Pages emitted before a failure stay emitted.
    pub async fn invoke<F>(
        &self,
        op: &OperationDescriptor,
        mut request: OperationRequest,
        options: &InvokeOptions,
        log: &mut ResultLog,
        mut emit: F,
    ) -> Result<InvocationSummary, InvokeError>
    where
        F: FnMut(Value),
    {
        let selector = OutputSelector::resolve(options.select.as_deref(), op)?;
        self.check_required(op, &request)?;

        if op.confirm_impact.is_mutating() && self.policy.read_only {
            return Err(InvokeError::ReadOnly(op.command.clone()));
        }

        if op.confirm_impact.is_mutating() && options.what_if {
            info!(
                "What if: performing {} ({}) on target \"{}\"",
                op.command,
                op.action,
                target_of(op, &request)
            );
            return Ok(InvocationSummary {
                calls: 0,
                emitted: 0,
                state: PaginationState::Start,
            });
        }

        if self.needs_confirmation(op, options) {
            let prompt = ConfirmPrompt {
                command: &op.command,
                action: &op.action,
                target: target_of(op, &request),
                impact: op.confirm_impact,
            };
            if !self.confirm.confirm(&prompt) {
                debug!("{} declined by caller", op.command);
                return Err(InvokeError::NotConfirmed(op.command.clone()));
            }
        }

        let manual_cursor = op.input_token().is_some_and(|token| request.is_set(token));
        let auto_paginate = op.is_paginated() && !manual_cursor && !options.no_auto_iteration;

        let snapshot = request.clone();
        log.begin(&op.command, snapshot.to_value());

        let mut summary = InvocationSummary {
            calls: 0,
            emitted: 0,
            state: PaginationState::Start,
        };

        loop {
            if self.cancel.is_cancelled() {
                if summary.calls == 0 {
                    log.finish(PaginationState::Cancelled, None);
                    return Err(InvokeError::Cancelled(op.command.clone()));
                }
                debug!("{} cancelled after {} page(s)", op.command, summary.calls);
                summary.state = PaginationState::Cancelled;
                break;
            }

            summary.state = PaginationState::Requesting;
            debug!(
                "Invoking {} ({}:{}), page {}",
                op.command,
                op.service,
                op.action,
                summary.calls + 1
            );

            let response = match self.remote.call(op, &request).await {
                Ok(response) => response,
                Err(err) => {
                    warn!("{} failed on page {}: {}", op.command, summary.calls + 1, err);
                    let err = InvokeError::from_remote(&op.command, err);
                    log.finish(PaginationState::Aborted, Some(err.to_string()));
                    return Err(err);
                }
            };
            summary.calls += 1;
            log.record_response(response.as_value());

            emit(selector.select(&response, &snapshot));
            summary.emitted += 1;
            log.record_emit();

            let next = if auto_paginate { response.cursor(op) } else { None };
            match (next, op.input_token()) {
                (Some(cursor), Some(field)) => request.set_cursor(field, &cursor),
                _ => {
                    summary.state = PaginationState::Done;
                    break;
                }
            }
        }

        log.finish(summary.state, None);
        Ok(summary)
    }

    fn check_required(
        &self,
        op: &OperationDescriptor,
        request: &OperationRequest,
    ) -> Result<(), UsageError> {
        let missing = request.missing_required(op);
        let Some(first) = missing.first() else {
            return Ok(());
        };

        match self.policy.missing_required {
            MissingFieldPolicy::Error => Err(UsageError::MissingRequired {
                command: op.command.clone(),
                field: first.clone(),
            }),
            MissingFieldPolicy::Warn => {
                for field in &missing {
                    warn!("{}: required parameter '{}' is missing", op.command, field);
                }
                Ok(())
            }
        }
    }

    fn needs_confirmation(&self, op: &OperationDescriptor, options: &InvokeOptions) -> bool {
        op.confirm_impact.is_mutating()
            && op.confirm_impact >= self.policy.confirm_threshold
            && !options.force
    }
}

/// Human-readable name of the resource an operation acts on
fn target_of(op: &OperationDescriptor, request: &OperationRequest) -> String {
    op.target_field
        .as_deref()
        .and_then(|field| request.get(op, field))
        .map(|value| value_to_string(value, ""))
        .unwrap_or_default()
}
