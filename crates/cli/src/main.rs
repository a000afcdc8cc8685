//! nomaster entry point.
//!
//! This binary is the composition root:
//!
//! 1. **Resolve configuration** from flags, environment, and the config file.
//! 2. **Wire observability** (`tracing-subscriber`, optional OTLP exporter).
//! 3. **Construct infrastructure**: the GitHub client and the webhook listener.
//! 4. **Run the dispatcher** until the queue closes, an unexpected event stops
//!    it, or Ctrl-C is received.
//!
//! Exit status is zero on Ctrl-C and non-zero on any startup error or when
//! the dispatcher stops on an unexpected event kind.

mod config;
mod observability;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dispatcher::{DispatchExit, Dispatcher, DispatcherConfig};
use github::{GithubClient, GithubClientConfig};
use listener::{ListenerConfig, WebhookListener};
use pipeline::{CommentSelector, PolicyEvaluator};
use tracing::{debug, error, info};

use crate::config::{default_config_paths, load_config_file, CliArgs, Settings};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("nomaster: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let loaded = load_config_file(args.config.as_deref(), &default_config_paths())?;
    let settings = Settings::resolve(&args, loaded).context("invalid configuration")?;
    let _observability = observability::init(&settings)?;

    match &settings.config_file {
        Some(path) => debug!("Configuration loaded from {}", path.display()),
        None => debug!("No configuration file found, using flags and defaults"),
    }

    let github = GithubClient::new(GithubClientConfig {
        api_url: settings.api_url.clone(),
        token: settings.token.clone(),
        request_timeout: Some(settings.request_timeout),
    })
    .context("failed to build GitHub client")?;

    let dispatcher = Dispatcher::new(
        DispatcherConfig {
            policy: PolicyEvaluator::new(settings.protected_branch.clone()),
            comments: CommentSelector::new(
                settings.comment.clone(),
                settings.comment_pool.clone(),
            ),
            on_unexpected_event: settings.on_unexpected_event,
        },
        Arc::new(github),
    );

    let (mut source, listener) = WebhookListener::bind(ListenerConfig {
        host: settings.host.clone(),
        port: settings.port,
        path: settings.path.clone(),
        healthcheck: settings.healthcheck.clone(),
        secret: settings.secret.clone(),
    })
    .await
    .context("failed to start webhook listener")?;

    info!("Running nomaster on port {}", listener.local_addr().port());
    debug!("Application endpoint: {}", settings.path);
    debug!("Healthcheck endpoint: {}", settings.healthcheck);
    debug!("Protected branch: {}", settings.protected_branch);

    let exit = tokio::select! {
        exit = dispatcher.run(&mut source) => exit,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            info!("Shutting down");
            listener.abort();
            return Ok(ExitCode::SUCCESS);
        }
    };

    match exit {
        DispatchExit::UnexpectedEvent { kind } => {
            error!(kind = %kind, "Stopped on unexpected event kind");
            listener.abort();
            Ok(ExitCode::FAILURE)
        }
        DispatchExit::SourceClosed => {
            listener
                .finish()
                .await
                .context("webhook listener stopped")?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
