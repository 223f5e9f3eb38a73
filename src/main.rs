// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{bail, Context, Result};
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use argocd_bootstrap::bootstrap::Bootstrap;
use argocd_bootstrap::config::Config;
use argocd_bootstrap::exposure::{CredentialStatus, KubectlPortForward, TerminalOperator};
use argocd_bootstrap::helm::HelmCli;
use argocd_bootstrap::kubernetes::KubeCluster;
use argocd_bootstrap::registry::Registry;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Argo CD bootstrap");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: namespace={}, exposure={:?}, applications={:?}",
        config.namespace, config.exposure, config.applications
    );

    let registry = Registry::standard(&config).context("invalid resource registry")?;

    let helm = HelmCli::new(config.helm_bin.clone())?;
    let tunnel = KubectlPortForward::new(config.kubectl_bin.clone());

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let summary = Bootstrap::new(
        config,
        registry,
        Arc::new(KubeCluster::new(client)),
        Arc::new(helm),
        Box::new(tunnel),
        Box::new(TerminalOperator),
    )
    .run()
    .await?;

    if let CredentialStatus::NotReady {
        attempts,
        last_error,
    } = summary.exposure.credential
    {
        warn!(
            ?last_error,
            "Admin password was not available after {} attempts; read it later from the argocd-initial-admin-secret secret",
            attempts
        );
    }
    if let Some(tunnel) = &summary.exposure.tunnel {
        info!(
            "Argo CD is reachable at https://localhost:{} through svc/{}",
            tunnel.local_port, tunnel.service
        );
    }

    if !summary.is_success() {
        bail!("bootstrap finished with resources that did not converge");
    }

    info!("Bootstrap complete");
    Ok(())
}
