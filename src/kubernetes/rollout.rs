// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deployment rollout waiting

use crate::error::{BootstrapError, Result};
use k8s_openapi::api::apps::v1::Deployment;
use kube::{Api, Client};
use kube_runtime::wait::await_condition;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Wait for a deployment to finish rolling out within `timeout`.
/// Returns `Ok(false)` when the timeout elapses first.
#[instrument(skip(client))]
pub async fn wait_for_rollout(
    client: &Client,
    namespace: &str,
    name: &str,
    timeout: Duration,
) -> Result<bool> {
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);

    info!(
        "Waiting up to {}s for deployment {}/{} to roll out...",
        timeout.as_secs(),
        namespace,
        name
    );

    match tokio::time::timeout(timeout, await_condition(deployments, name, is_rolled_out)).await {
        Ok(Ok(_)) => {
            info!("Deployment {}/{} rolled out", namespace, name);
            Ok(true)
        }
        Ok(Err(e)) => Err(BootstrapError::WatchError(format!(
            "watching deployment {}/{}: {}",
            namespace, name, e
        ))),
        Err(_) => {
            warn!("Deployment {}/{} did not roll out within {}s", namespace, name, timeout.as_secs());
            Ok(false)
        }
    }
}

/// A deployment is rolled out once the controller observed the latest
/// generation and every desired replica is updated and available
pub fn is_rolled_out(deployment: Option<&Deployment>) -> bool {
    let Some(deployment) = deployment else {
        return false;
    };
    let Some(status) = deployment.status.as_ref() else {
        return false;
    };

    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    let observed = status.observed_generation.unwrap_or(0) >= deployment.metadata.generation.unwrap_or(0);

    observed
        && status.updated_replicas.unwrap_or(0) >= desired
        && status.available_replicas.unwrap_or(0) >= desired
}
