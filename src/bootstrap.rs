// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Top-level run: infrastructure, exposure, confirmation, applications.

use crate::config::{ApplicationsMode, Config, ExposureMethod};
use crate::constants::resources;
use crate::error::{BootstrapError, Result};
use crate::exposure::{
    is_affirmative, ExposureReport, ExposureSelector, ExposureSettings, Operator, TunnelLauncher,
};
use crate::helm::Helm;
use crate::kubernetes::Cluster;
use crate::reconciler::{ActionExecutor, Driver, ResourceOutcome, StateProber};
use crate::registry::Registry;
use crate::types::Tier;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationsDecision {
    Installed,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcomes: Vec<ResourceOutcome>,
    pub exposure: ExposureReport,
    pub applications: ApplicationsDecision,
}

impl RunSummary {
    /// Every attempted resource reached a satisfied outcome
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.outcome.is_satisfied())
    }
}

pub struct Bootstrap {
    config: Config,
    registry: Registry,
    cluster: Arc<dyn Cluster>,
    helm: Arc<dyn Helm>,
    tunnel: Box<dyn TunnelLauncher>,
    operator: Box<dyn Operator>,
    exposure: ExposureSettings,
}

impl Bootstrap {
    pub fn new(
        config: Config,
        registry: Registry,
        cluster: Arc<dyn Cluster>,
        helm: Arc<dyn Helm>,
        tunnel: Box<dyn TunnelLauncher>,
        operator: Box<dyn Operator>,
    ) -> Self {
        let exposure = ExposureSettings::from_config(&config);
        Self {
            config,
            registry,
            cluster,
            helm,
            tunnel,
            operator,
            exposure,
        }
    }

    /// Replace the exposure settings derived from the configuration
    pub fn with_exposure_settings(mut self, settings: ExposureSettings) -> Self {
        self.exposure = settings;
        self
    }

    #[instrument(skip(self), fields(namespace = %self.config.namespace))]
    pub async fn run(self) -> Result<RunSummary> {
        let Bootstrap {
            config,
            registry,
            cluster,
            helm,
            tunnel,
            mut operator,
            exposure: settings,
        } = self;

        let mut selector =
            ExposureSelector::new(&settings, cluster.as_ref(), tunnel.as_ref(), operator.as_mut());
        // Ingress values go into the first Argo CD install so reruns upgrade it with the same values
        let registry = match selector.choose()? {
            ExposureMethod::Ingress => {
                registry.with_release_overlay(resources::ARGOCD, &settings.ingress_overlay())?
            }
            ExposureMethod::PortForward => registry,
        };

        let namespace = config.namespace.clone();
        let mut driver = Driver::new(
            &registry,
            StateProber::new(cluster.clone(), helm.clone(), &namespace),
            ActionExecutor::new(cluster.clone(), helm.clone(), &namespace, config.rollout_timeout),
        );

        info!("Reconciling infrastructure tier");
        if let Err(e) = driver.reconcile(Tier::Infrastructure).await {
            driver.log_summary();
            return Err(e);
        }

        let unsatisfied = driver.unsatisfied(Tier::Infrastructure);
        if !unsatisfied.is_empty() {
            driver.log_summary();
            return Err(BootstrapError::InfrastructureNotReady(unsatisfied));
        }

        let argocd = registry.get(resources::ARGOCD).ok_or_else(|| {
            BootstrapError::InvalidRegistry(format!("no '{}' resource", resources::ARGOCD))
        })?;

        let exposure = selector.run(driver.executor_mut(), argocd).await?;

        let applications = match config.applications {
            ApplicationsMode::Yes => ApplicationsDecision::Installed,
            ApplicationsMode::No => ApplicationsDecision::Declined,
            ApplicationsMode::Prompt => match operator.confirm_applications() {
                Ok(answer) if is_affirmative(&answer) => ApplicationsDecision::Installed,
                Ok(_) => ApplicationsDecision::Declined,
                Err(e) => {
                    warn!("No answer to the application prompt ({}), skipping applications", e);
                    ApplicationsDecision::Declined
                }
            },
        };

        match applications {
            ApplicationsDecision::Installed => {
                info!("Reconciling application tier");
                if let Err(e) = driver.reconcile(Tier::Application).await {
                    driver.log_summary();
                    return Err(e);
                }
            }
            ApplicationsDecision::Declined => {
                info!("Application tier skipped");
            }
        }

        driver.log_summary();
        let summary = RunSummary {
            outcomes: driver.outcomes().to_vec(),
            exposure,
            applications,
        };
        if !summary.is_success() {
            warn!("Bootstrap finished with unconverged resources");
        }
        Ok(summary)
    }
}
