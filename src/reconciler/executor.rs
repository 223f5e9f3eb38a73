// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Convergent actions for probed resources

use crate::error::ErrorCategory;
use crate::helm::Helm;
use crate::kubernetes::{build_secret, load_secret_data, validate_secret_data, Cluster};
use crate::types::{
    ActionError, ActionResult, ChartSource, ConvergePolicy, DesiredSpec, ManagedResource,
    ReleaseSpec, ResourceState, SecretSpec, ValuesOverlay,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

pub struct ActionExecutor {
    cluster: Arc<dyn Cluster>,
    helm: Arc<dyn Helm>,
    namespace: String,
    rollout_timeout: Duration,
    /// Repositories already registered during this run
    repos_added: HashSet<String>,
}

impl ActionExecutor {
    pub fn new(
        cluster: Arc<dyn Cluster>,
        helm: Arc<dyn Helm>,
        namespace: &str,
        rollout_timeout: Duration,
    ) -> Self {
        Self {
            cluster,
            helm,
            namespace: namespace.to_string(),
            rollout_timeout,
            repos_added: HashSet::new(),
        }
    }

    /// Issue the minimal action bringing `resource` to its desired state
    #[instrument(skip(self, resource), fields(resource = %resource.name, kind = %resource.kind()))]
    pub async fn converge(
        &mut self,
        resource: &ManagedResource,
        state: &ResourceState,
    ) -> ActionResult {
        match (state, resource.policy, &resource.desired) {
            (ResourceState::Unknown(reason), _, _) => {
                warn!("Refusing to act on {} with unknown state", resource.name);
                ActionResult::failed(ActionError::new(
                    ErrorCategory::Unknown,
                    format!("state unknown: {}", reason),
                ))
            }
            (ResourceState::Present, ConvergePolicy::InstallOrUpgrade, DesiredSpec::HelmRelease(spec)) => {
                self.install_or_upgrade(spec).await
            }
            (ResourceState::Present, _, _) => {
                info!("{} already present, skipping", resource.name);
                ActionResult::skipped()
            }
            (ResourceState::Absent, _, DesiredSpec::Namespace { name }) => {
                self.create_namespace(name).await
            }
            (ResourceState::Absent, _, DesiredSpec::HelmRelease(spec)) => {
                self.install_or_upgrade(spec).await
            }
            (ResourceState::Absent, _, DesiredSpec::Secret(spec)) => self.create_secret(spec).await,
        }
    }

    /// Install-or-upgrade a release with extra values layered on top
    #[instrument(skip(self, resource, overlay), fields(resource = %resource.name))]
    pub async fn converge_with_overlay(
        &mut self,
        resource: &ManagedResource,
        overlay: &ValuesOverlay,
    ) -> ActionResult {
        let Some(spec) = resource.release() else {
            return ActionResult::failed(ActionError::new(
                ErrorCategory::InvalidInput,
                format!("{} is not a Helm release", resource.name),
            ));
        };
        self.install_or_upgrade(&spec.with_overlay(overlay)).await
    }

    async fn create_namespace(&self, name: &str) -> ActionResult {
        match self.cluster.create_namespace(name).await {
            Ok(()) => ActionResult::applied(),
            Err(e) => {
                error!("Failed to create namespace {}: {}", name, e);
                ActionResult::failed(ActionError::from(&e))
            }
        }
    }

    async fn create_secret(&self, spec: &SecretSpec) -> ActionResult {
        let data = match load_secret_data(&spec.source) {
            Ok(data) => data,
            Err(e) => {
                error!("Cannot build secret {}: {}", spec.secret_name, e);
                return ActionResult::failed(ActionError::from(&e));
            }
        };
        debug!(
            "Secret {} built from {} with {} keys",
            spec.secret_name,
            spec.source.display(),
            data.len()
        );
        if let Err(e) = validate_secret_data(&spec.secret_type, &data) {
            error!("Cannot build secret {}: {}", spec.secret_name, e);
            return ActionResult::failed(ActionError::from(&e));
        }

        let secret = build_secret(&spec.secret_name, &self.namespace, &spec.secret_type, data);
        match self.cluster.create_secret(&self.namespace, &secret).await {
            Ok(()) => ActionResult::applied(),
            Err(e) => {
                error!("Failed to create secret {}: {}", spec.secret_name, e);
                ActionResult::failed(ActionError::from(&e))
            }
        }
    }

    async fn install_or_upgrade(&mut self, spec: &ReleaseSpec) -> ActionResult {
        if let ChartSource::Repository {
            repo_name,
            repo_url,
            ..
        } = &spec.chart
        {
            if !self.repos_added.contains(repo_name) {
                if let Err(e) = self.helm.add_repo(repo_name, repo_url).await {
                    error!("Failed to add Helm repository {}: {}", repo_name, e);
                    return ActionResult::failed(ActionError::from(&e));
                }
                self.repos_added.insert(repo_name.clone());
            }
        }

        if let Err(e) = self.helm.upgrade_install(&self.namespace, spec).await {
            error!("Failed to install or upgrade {}: {}", spec.release_name, e);
            return ActionResult::failed(ActionError::from(&e));
        }

        if let Some(rollout) = &spec.rollout {
            match self
                .cluster
                .wait_for_rollout(&self.namespace, &rollout.deployment, self.rollout_timeout)
                .await
            {
                Ok(true) => {}
                Ok(false) => warn!(
                    "Rollout of {} timed out; continuing, it may still converge",
                    rollout.deployment
                ),
                Err(e) => warn!("Could not watch rollout of {}: {}", rollout.deployment, e),
            }
        }

        ActionResult::applied()
    }
}
