// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Making Argo CD reachable and fetching its initial admin password.

pub mod operator;
pub mod tunnel;

use crate::config::{Config, ExposureMethod, ExposureMode};
use crate::constants::{argocd, poll};
use crate::error::{BootstrapError, ErrorCategory, Result};
use crate::kubernetes::Cluster;
use crate::reconciler::ActionExecutor;
use crate::types::{AdminCredential, ManagedResource, ValuesOverlay};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

pub use operator::{is_affirmative, parse_exposure_choice, Operator, TerminalOperator};
pub use tunnel::{KubectlPortForward, TunnelHandle, TunnelLauncher};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExposureChoice {
    Ingress { overlay: ValuesOverlay },
    PortForward { service: String, local_port: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExposureState {
    AwaitingChoice,
    Configuring(ExposureMethod),
    Exposed(ExposureChoice),
    Failed(ErrorCategory),
}

/// What happened to the admin credential during exposure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
    /// Ingress exposure does not poll for the credential
    NotPolled,
    Shown { attempt: u32 },
    /// `last_error` is the category of the last failed read, if any
    NotReady {
        attempts: u32,
        last_error: Option<ErrorCategory>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposureReport {
    pub state: ExposureState,
    pub credential: CredentialStatus,
    pub tunnel: Option<TunnelHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            attempts: poll::CREDENTIAL_ATTEMPTS,
            interval: Duration::from_secs(poll::CREDENTIAL_INTERVAL_SECS),
        }
    }
}

/// Exposure parameters taken from configuration
#[derive(Debug, Clone)]
pub struct ExposureSettings {
    pub namespace: String,
    pub mode: ExposureMode,
    pub local_port: Option<u16>,
    pub ingress_values: Option<PathBuf>,
    pub hostname: Option<String>,
    pub poll: PollSettings,
}

impl ExposureSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            namespace: config.namespace.clone(),
            mode: config.exposure,
            local_port: config.port_forward_port,
            ingress_values: config.argocd_ingress_values.clone(),
            hostname: config.argocd_hostname.clone(),
            poll: PollSettings::default(),
        }
    }

    /// Values enabling the Argo CD server ingress on the nginx class
    pub fn ingress_overlay(&self) -> ValuesOverlay {
        let mut set = BTreeMap::from([
            ("server.ingress.enabled".to_string(), "true".to_string()),
            (
                "server.ingress.ingressClassName".to_string(),
                argocd::INGRESS_CLASS.to_string(),
            ),
        ]);
        if let Some(hostname) = &self.hostname {
            set.insert("server.ingress.hostname".to_string(), hostname.clone());
        }
        ValuesOverlay {
            values_files: self.ingress_values.iter().cloned().collect(),
            set,
        }
    }
}

/// Exposure failure together with the state the selector ended in
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ExposureError {
    /// Always `ExposureState::Failed`
    pub state: ExposureState,
    #[source]
    pub source: BootstrapError,
}

impl ExposureError {
    pub fn category(&self) -> ErrorCategory {
        self.source.category()
    }
}

impl From<ExposureError> for BootstrapError {
    fn from(err: ExposureError) -> Self {
        err.source
    }
}

/// One-shot state machine: `AwaitingChoice -> Configuring -> Exposed | Failed`.
///
/// `choose` settles the method up front so callers can fold the ingress
/// values into the Argo CD release before it is first installed. `run`
/// consumes the selector so it cannot be re-entered.
pub struct ExposureSelector<'a> {
    settings: &'a ExposureSettings,
    cluster: &'a dyn Cluster,
    tunnel: &'a dyn TunnelLauncher,
    operator: &'a mut dyn Operator,
    state: ExposureState,
}

impl<'a> ExposureSelector<'a> {
    pub fn new(
        settings: &'a ExposureSettings,
        cluster: &'a dyn Cluster,
        tunnel: &'a dyn TunnelLauncher,
        operator: &'a mut dyn Operator,
    ) -> Self {
        Self {
            settings,
            cluster,
            tunnel,
            operator,
            state: ExposureState::AwaitingChoice,
        }
    }

    pub fn state(&self) -> &ExposureState {
        &self.state
    }

    /// Settle the exposure method. Asks the operator at most once.
    pub fn choose(&mut self) -> std::result::Result<ExposureMethod, ExposureError> {
        if let ExposureState::Configuring(method) = self.state {
            return Ok(method);
        }
        let method = match self.await_choice() {
            Ok(method) => method,
            Err(e) => return Err(self.fail(e)),
        };
        self.transition(ExposureState::Configuring(method));
        Ok(method)
    }

    /// Expose Argo CD. An `argocd_resource` that already carries the ingress
    /// values is not upgraded a second time.
    #[instrument(skip_all, fields(namespace = %self.settings.namespace))]
    pub async fn run(
        mut self,
        executor: &mut ActionExecutor,
        argocd_resource: &ManagedResource,
    ) -> std::result::Result<ExposureReport, ExposureError> {
        let method = self.choose()?;

        match method {
            ExposureMethod::Ingress => {
                let overlay = self.settings.ingress_overlay();
                if argocd_resource
                    .release()
                    .is_some_and(|spec| spec.includes(&overlay))
                {
                    info!("Argo CD release already carries the ingress values");
                } else {
                    let result = executor
                        .converge_with_overlay(argocd_resource, &overlay)
                        .await;
                    if let Some(err) = result.error {
                        return Err(self.fail(BootstrapError::ExposureFailed(err)));
                    }
                }
                info!("Argo CD exposed through the ingress controller");
                self.transition(ExposureState::Exposed(ExposureChoice::Ingress { overlay }));
                Ok(ExposureReport {
                    state: self.state,
                    credential: CredentialStatus::NotPolled,
                    tunnel: None,
                })
            }
            ExposureMethod::PortForward => {
                let service = match self.resolve_service().await {
                    Ok(service) => service,
                    Err(e) => return Err(self.fail(e)),
                };
                let local_port = match self.resolve_local_port() {
                    Ok(port) => port,
                    Err(e) => return Err(self.fail(e)),
                };
                let handle = match self.tunnel.launch(
                    &self.settings.namespace,
                    &service,
                    local_port,
                    argocd::SERVICE_PORT,
                ) {
                    Ok(handle) => handle,
                    Err(e) => return Err(self.fail(e)),
                };

                let credential = self.poll_credential().await;
                self.transition(ExposureState::Exposed(ExposureChoice::PortForward {
                    service,
                    local_port,
                }));
                Ok(ExposureReport {
                    state: self.state,
                    credential,
                    tunnel: Some(handle),
                })
            }
        }
    }

    fn await_choice(&mut self) -> Result<ExposureMethod> {
        match self.settings.mode {
            ExposureMode::Fixed(method) => {
                info!("Exposure method {:?} taken from configuration", method);
                Ok(method)
            }
            ExposureMode::Interactive => {
                let answer = self.operator.choose_exposure()?;
                parse_exposure_choice(&answer)
            }
        }
    }

    /// First candidate service that exists; probe errors count as absent
    async fn resolve_service(&self) -> Result<String> {
        let namespace = &self.settings.namespace;
        for candidate in argocd::SERVICE_CANDIDATES {
            match self.cluster.service_exists(namespace, candidate).await {
                Ok(true) => {
                    info!("Using Argo CD service {}", candidate);
                    return Ok(candidate.to_string());
                }
                Ok(false) => debug!("Service {} not found", candidate),
                Err(e) => warn!("Could not look up service {}: {}", candidate, e),
            }
        }

        Err(BootstrapError::ServiceNotFound {
            namespace: namespace.clone(),
            candidates: argocd::SERVICE_CANDIDATES.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn resolve_local_port(&mut self) -> Result<u16> {
        if let Some(port) = self.settings.local_port {
            return Ok(port);
        }
        match self.settings.mode {
            ExposureMode::Interactive => {
                let answer = self.operator.choose_local_port(argocd::DEFAULT_LOCAL_PORT)?;
                operator::parse_local_port(&answer, argocd::DEFAULT_LOCAL_PORT)
            }
            ExposureMode::Fixed(_) => Ok(argocd::DEFAULT_LOCAL_PORT),
        }
    }

    /// Poll for the admin secret, showing the password at most once.
    /// A read error is logged as a warning whenever its category changes.
    async fn poll_credential(&mut self) -> CredentialStatus {
        let PollSettings { attempts, interval } = self.settings.poll;
        let mut last_error: Option<ErrorCategory> = None;

        for attempt in 1..=attempts {
            match self
                .cluster
                .read_secret_field(
                    &self.settings.namespace,
                    argocd::ADMIN_SECRET,
                    argocd::ADMIN_SECRET_FIELD,
                )
                .await
            {
                Ok(Some(bytes)) if !bytes.is_empty() => {
                    let credential = AdminCredential::from_bytes(&bytes);
                    self.operator.show_credential(&credential);
                    info!("Admin credential retrieved on attempt {}", attempt);
                    return CredentialStatus::Shown { attempt };
                }
                Ok(_) => debug!("Admin secret not ready (attempt {}/{})", attempt, attempts),
                Err(e) => {
                    let category = e.category();
                    if last_error != Some(category) {
                        warn!(
                            "Reading admin secret {} failed (attempt {}/{}): {}",
                            argocd::ADMIN_SECRET,
                            attempt,
                            attempts,
                            e
                        );
                    } else {
                        debug!(
                            "Reading admin secret failed (attempt {}/{}): {}",
                            attempt, attempts, e
                        );
                    }
                    last_error = Some(category);
                }
            }

            if attempt < attempts {
                sleep(interval).await;
            }
        }

        warn!(
            "Admin secret {} not available after {} attempts; the tunnel is still up, read it later with kubectl",
            argocd::ADMIN_SECRET,
            attempts
        );
        CredentialStatus::NotReady {
            attempts,
            last_error,
        }
    }

    fn transition(&mut self, next: ExposureState) {
        debug!("Exposure state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, error: BootstrapError) -> ExposureError {
        warn!("Exposure failed: {}", error);
        self.transition(ExposureState::Failed(error.category()));
        ExposureError {
            state: self.state.clone(),
            source: error,
        }
    }
}
