//! A Pod controller whose reconciler only logs
//!
//! The logging format is selected once from the command line, the resulting
//! logger is installed for the runtime and handed to the reconciler through its
//! context.

mod cli;
mod error;
mod reconciler;

pub use error::Error;

use cli::Args;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kref_logs::{Logger, LoggingOptions};
use kube::{
    api::ListParams,
    runtime::{watcher, Controller},
    Api, Client,
};
use reconciler::{error_policy, reconcile, Context};
use std::{process::ExitCode, sync::Arc};
use tracing::{debug, error, info, warn};

/// Target of everything logged while the process starts or stops
const SETUP: &str = "setup";

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::from_env();
    let logger = match args.logging().build() {
        Ok(logger) => logger,
        Err(err) => {
            // the requested logger cannot be built, report through the default one
            let err = Error::from(err);
            if let Ok(fallback) = LoggingOptions::default().build() {
                fallback.in_scope(|| {
                    error!(target: SETUP, error = %err, "{}", err.setup_message());
                });
            }
            return ExitCode::FAILURE;
        }
    };
    logger.install();

    match run(logger).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(target: SETUP, error = %err, "{}", err.setup_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(logger: Logger) -> Result<(), Error> {
    let client = Client::try_default().await.map_err(Error::Client)?;
    let pods = Api::<Pod>::all(client);
    pods.list(&ListParams::default().limit(1))
        .await
        .map_err(Error::Controller)?;
    let ctx = Arc::new(Context { logger });

    info!(target: SETUP, version = env!("CARGO_PKG_VERSION"), "starting manager");
    Controller::new(pods, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!(object = %obj, "reconciled"),
                Err(err) => warn!(error = %err, "reconcile failed"),
            }
        })
        .await;
    info!(target: SETUP, "controller terminated");
    Ok(())
}
