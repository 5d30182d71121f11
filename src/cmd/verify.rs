//! Submit content and follow the task to completion: `claimcheck text|url|file`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use claimcheck::client::{HttpClient, VerificationApi};
use claimcheck::config::ClientConfig;
use claimcheck::coordinator::SubmissionCoordinator;
use claimcheck::progress::{ProgressObserver, TaskOutcome, build_transport};
use claimcheck::request::VerificationRequest;
use claimcheck::ui::{VerifyUI, render_result};

use super::super::Cli;
use super::cli_overrides;

pub async fn cmd_verify(cli: &Cli, project_dir: PathBuf, request: VerificationRequest) -> Result<()> {
    // Reject empty input before touching configuration or the network.
    let request = request.validate()?;

    let config = ClientConfig::load(project_dir, &cli_overrides(cli))?;
    for warning in config.validate() {
        warn!("config: {}", warning);
    }
    info!(
        base_url = %config.base_url,
        transport = %config.transport,
        "using verification service"
    );

    let api: Arc<dyn VerificationApi> = Arc::new(HttpClient::new(
        config.base_url.clone(),
        config.timeout,
    )?);
    let transport = build_transport(config.transport, api.clone(), config.poll_interval);
    let coordinator = SubmissionCoordinator::new(api, ProgressObserver::new(transport, config.settle));

    let ui = if cli.json {
        VerifyUI::hidden()
    } else {
        VerifyUI::new(request.kind().path())
    };

    // Mirror every state change onto the progress bar.
    let mut states = coordinator.subscribe();
    let renderer = {
        let ui = ui.clone();
        tokio::spawn(async move {
            while states.changed().await.is_ok() {
                let state = states.borrow_and_update().clone();
                ui.render(&state);
            }
        })
    };

    let submitted = tokio::select! {
        result = coordinator.submit(request) => result,
        _ = tokio::signal::ctrl_c() => {
            coordinator.cancel();
            renderer.abort();
            ui.cancelled();
            bail!("Verification cancelled");
        }
    };

    let result = match submitted {
        Ok(result) => result,
        Err(err) => {
            renderer.abort();
            ui.fail(&err.to_string());
            return Err(err.into());
        }
    };

    let finished = tokio::select! {
        state = coordinator.wait_idle() => state,
        _ = tokio::signal::ctrl_c() => {
            coordinator.cancel();
            renderer.abort();
            ui.cancelled();
            bail!("Verification cancelled");
        }
    };
    renderer.abort();
    ui.finish(finished.outcome);

    if cli.json {
        let json = serde_json::to_string_pretty(result.as_ref())
            .context("Failed to serialize verification result")?;
        println!("{}", json);
    } else {
        print!("{}", render_result(&result));
    }

    if finished.outcome == Some(TaskOutcome::Error) {
        bail!("The verification service reported an error for this task");
    }
    Ok(())
}
