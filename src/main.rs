use anyhow::{bail, Result};
use awsop::aws::{error_hint, LazyAwsClients};
use awsop::config::{Args, Config};
use awsop::operation::{
    load_catalog, Confirm, ConfirmImpact, ConfirmPrompt, InvokeError, Invoker, OperationCatalog,
    OperationRequest, PaginationState,
};
use clap::Parser;
use std::io::{self, BufRead, Write};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Asks on the terminal before a mutating call
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &ConfirmPrompt<'_>) -> bool {
        let mut stderr = io::stderr();
        let _ = write!(
            stderr,
            "Performing the operation \"{} ({})\" on target \"{}\". Continue? [y/N] ",
            prompt.command, prompt.action, prompt.target
        );
        let _ = stderr.flush();

        read_answer(io::stdin().lock())
    }
}

/// One line of input, accepted when it is "y" or "yes". Must run on a
/// multi-threaded runtime worker.
fn read_answer(mut input: impl BufRead) -> bool {
    let mut answer = String::new();
    let read = tokio::task::block_in_place(|| input.read_line(&mut answer));
    if read.is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn init_logging(directive: Option<&str>) {
    let env_filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn,awsop=info".into()),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();
}

fn print_catalog(catalog: &OperationCatalog) {
    for op in catalog.operations() {
        let impact = match op.confirm_impact {
            ConfirmImpact::None => String::new(),
            impact => format!(" [{:?}]", impact).to_lowercase(),
        };
        let paged = if op.is_paginated() { " (paged)" } else { "" };
        println!(
            "{:<24} {}:{}{}{}",
            op.command, op.service, op.action, paged, impact
        );
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::from_args(&args);
    let catalog = load_catalog(config.catalog.as_deref())?;

    if args.list {
        print_catalog(&catalog);
        return Ok(());
    }

    let Some(command) = args.command.as_deref() else {
        bail!("no command given; use --list to see the available commands");
    };
    let op = catalog.get(command)?;
    let request = OperationRequest::from_assignments(op, args.params.iter().map(String::as_str))?;

    debug!(
        "Invoking {} ({}:{}) in {} with profile '{}'",
        op.command, op.service, op.action, config.region, config.profile
    );
    // Credentials load on the first call, after usage checks and confirmation
    let clients = LazyAwsClients::new(&config.profile, &config.region, config.endpoint_url.clone());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current page");
            on_interrupt.cancel();
        }
    });

    let invoker = Invoker::new(&clients, &StdinConfirm)
        .with_policy(config.policy)
        .with_cancellation(cancel);
    let mut log = config.result_log();

    let outcome = invoker
        .invoke(op, request, &args.invoke_options(), &mut log, |value| {
            let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
            println!("{}", text);
        })
        .await;

    match outcome {
        Ok(summary) => {
            debug!(
                "{} finished: {} call(s), {} value(s) emitted",
                op.command, summary.calls, summary.emitted
            );
            if summary.state == PaginationState::Cancelled {
                warn!("{} was cancelled before all pages were read", op.command);
            }
            Ok(())
        }
        Err(err) => {
            if let Some(entry) = log.last() {
                debug!(
                    "{} stopped after {} call(s) in state {:?}",
                    entry.command, entry.calls, entry.state
                );
            }
            Err(with_hint(err))
        }
    }
}

fn with_hint(err: InvokeError) -> anyhow::Error {
    match error_hint(&err) {
        Some(hint) => anyhow::Error::new(err).context(hint),
        None => err.into(),
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    if let Err(err) = run(args).await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
