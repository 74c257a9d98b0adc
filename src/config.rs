//! Command-line and environment configuration

use crate::aws::credentials::get_profile_region;
use crate::operation::history::ResultLog;
use crate::operation::invoker::{InvokeOptions, InvokePolicy, MissingFieldPolicy};
use crate::operation::protocol::ConfirmImpact;
use clap::Parser;
use std::path::PathBuf;

const FALLBACK_REGION: &str = "us-east-1";

/// Invoke AWS operations by verb-noun command name
#[derive(Debug, Parser)]
#[command(name = "awsop", version, about)]
pub struct Args {
    /// Command to run (e.g. Get-SQSQueue) or service:Action
    #[arg(required_unless_present = "list")]
    pub command: Option<String>,

    /// Parameters as Name=Value
    #[arg(value_name = "NAME=VALUE")]
    pub params: Vec<String>,

    /// List the available commands and exit
    #[arg(long)]
    pub list: bool,

    /// Output selector: '*', a response field, or '^Param'
    #[arg(long, allow_hyphen_values = true)]
    pub select: Option<String>,

    /// Skip the confirmation prompt
    #[arg(long)]
    pub force: bool,

    /// Describe a mutating operation without calling it
    #[arg(long)]
    pub what_if: bool,

    /// Make a single call even when the operation paginates
    #[arg(long)]
    pub no_auto_iteration: bool,

    /// AWS profile to use
    #[arg(long, env = "AWS_PROFILE", default_value = "default")]
    pub profile: String,

    /// AWS region (falls back to AWS_DEFAULT_REGION, then the profile region)
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Custom endpoint URL for all services (e.g. LocalStack)
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Operation catalog file to use instead of the built-in one
    #[arg(long, env = "AWSOP_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Log filter directive (e.g. "debug", "awsop=trace"); RUST_LOG also works
    #[arg(long, env = "AWSOP_LOG")]
    pub log_level: Option<String>,

    /// Refuse operations that change remote state
    #[arg(long)]
    pub readonly: bool,

    /// Behavior when a required parameter is missing
    #[arg(long, value_enum, default_value_t = MissingFieldPolicy::Error)]
    pub missing_required: MissingFieldPolicy,

    /// Lowest impact that asks for confirmation
    #[arg(long, value_enum, default_value_t = ConfirmImpact::Medium)]
    pub confirm_threshold: ConfirmImpact,

    /// Invocations kept in the result log
    #[arg(long, default_value_t = 10)]
    pub history_entries: usize,

    /// Responses kept per log entry
    #[arg(long, default_value_t = 5)]
    pub history_responses: usize,
}

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub profile: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub catalog: Option<PathBuf>,
    pub policy: InvokePolicy,
    pub history_entries: usize,
    pub history_responses: usize,
}

impl Config {
    pub fn from_args(args: &Args) -> Self {
        let region = resolve_region(
            args.region.as_deref(),
            std::env::var("AWS_DEFAULT_REGION").ok().as_deref(),
            || get_profile_region(&args.profile),
        );

        Self {
            profile: args.profile.clone(),
            region,
            endpoint_url: args.endpoint_url.clone().filter(|u| !u.is_empty()),
            catalog: args.catalog.clone(),
            policy: InvokePolicy {
                missing_required: args.missing_required,
                confirm_threshold: args.confirm_threshold,
                read_only: args.readonly,
            },
            history_entries: args.history_entries,
            history_responses: args.history_responses,
        }
    }

    pub fn result_log(&self) -> ResultLog {
        ResultLog::new(self.history_entries, self.history_responses)
    }
}

impl Args {
    pub fn invoke_options(&self) -> InvokeOptions {
        InvokeOptions {
            select: self.select.clone(),
            force: self.force,
            what_if: self.what_if,
            no_auto_iteration: self.no_auto_iteration,
        }
    }
}

/// Explicit region, then AWS_DEFAULT_REGION, then the profile, then us-east-1
fn resolve_region(
    explicit: Option<&str>,
    default_env: Option<&str>,
    profile_region: impl FnOnce() -> Option<String>,
) -> String {
    let non_empty = |r: &&str| !r.is_empty();
    explicit
        .filter(non_empty)
        .or_else(|| default_env.filter(non_empty))
        .map(str::to_string)
        .or_else(profile_region)
        .unwrap_or_else(|| FALLBACK_REGION.to_string())
}
