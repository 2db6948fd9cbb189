//! CVP Controller
//!
//! Reads a desired-state document and reconciles Arista CloudVision Portal
//! against it:
//! - Configlets: created, updated or deleted by content
//! - Image bundles: created or updated, with optional local image uploads
//! - Containers: the declared hierarchy, its configlets and member devices
//! - Devices: placement, configlets, image bundles, factory reset, removal
//! - Tasks: executed or cancelled, optionally waiting for completion
//!
//! The run report is printed as JSON on stdout.

mod backoff;
mod config;
mod diff;
mod error;
mod facts;
mod reconcile_helpers;
mod reconciler;
#[cfg(test)]
mod test_utils;
mod topology;

use anyhow::{bail, Context};
use config::Config;
use facts::{FactCollector, FactScope};
use cvp_client::CvpClient;
use cvp_state::DesiredState;
use reconciler::Reconciler;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting CVP Controller");

    let config = Config::from_env().context("loading configuration from the environment")?;

    info!("Configuration:");
    info!("  CVP URL: {}", config.cvp_url);
    info!("  State file: {}", config.state_file.display());
    info!("  Dry run: {}", config.options.dry_run);
    info!("  Workers: {}", config.options.workers);

    let state = DesiredState::from_path(&config.state_file)
        .with_context(|| format!("reading desired state from {}", config.state_file.display()))?;

    let client = CvpClient::with_timeout(config.cvp_url.clone(), config.cvp_token.clone(), config.http_timeout)
        .context("building the CVP client")?;
    let cvp = client
        .validate_session()
        .await
        .with_context(|| format!("validating the session against {}", config.cvp_url))?;
    info!("Connected to CVP {}", cvp.version);

    if let Some(pattern) = &config.options.fact_filter {
        let scoped = FactCollector::new(&client, config.options.workers)
            .with_filter(pattern)?
            .collect(&[FactScope::Devices])
            .await?;
        let hostnames: Vec<&str> = scoped.devices.iter().map(|d| d.hostname.as_str()).collect();
        info!("Fact filter '{}' limits changes to devices: {:?}", pattern, hostnames);
    }

    let report = Reconciler::new(client, config.options).reconcile(&state).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.success {
        bail!("reconciliation finished with failures");
    }
    Ok(())
}
