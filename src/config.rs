// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// How Argo CD should be made reachable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureMethod {
    Ingress,
    PortForward,
}

/// Where the exposure method comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureMode {
    Interactive,
    Fixed(ExposureMethod),
}

/// Whether the application tier is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationsMode {
    Prompt,
    Yes,
    No,
}

/// Bootstrap configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace every managed resource lives in
    pub namespace: String,
    pub exposure: ExposureMode,
    /// Local port for the port-forward tunnel; prompts (or 8080) when unset
    pub port_forward_port: Option<u16>,
    pub applications: ApplicationsMode,
    /// Root directory of the local application charts
    pub charts_dir: PathBuf,
    /// Directory holding optional `<resource>.yaml` values files
    pub values_dir: PathBuf,
    /// File or directory the SSL secret is created from
    pub ssl_secret_source: PathBuf,
    pub argocd_ingress_values: Option<PathBuf>,
    pub argocd_hostname: Option<String>,
    pub rollout_timeout: Duration,
    pub helm_bin: Option<PathBuf>,
    pub kubectl_bin: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let namespace = var("BOOTSTRAP_NAMESPACE").unwrap_or_else(|| "automation".to_string());

        let exposure = match var("EXPOSURE_METHOD").as_deref().map(str::trim) {
            None | Some("interactive") => ExposureMode::Interactive,
            Some("ingress") => ExposureMode::Fixed(ExposureMethod::Ingress),
            Some("port-forward") => ExposureMode::Fixed(ExposureMethod::PortForward),
            Some(other) => bail!(
                "EXPOSURE_METHOD must be one of interactive, ingress, port-forward (got '{}')",
                other
            ),
        };

        let port_forward_port = var("PORT_FORWARD_PORT")
            .map(|v| parse_port(&v))
            .transpose()
            .context("PORT_FORWARD_PORT is not a valid port")?;

        let applications = match var("DEPLOY_APPLICATIONS").as_deref().map(str::trim) {
            None | Some("prompt") => ApplicationsMode::Prompt,
            Some("yes") => ApplicationsMode::Yes,
            Some("no") => ApplicationsMode::No,
            Some(other) => bail!(
                "DEPLOY_APPLICATIONS must be one of prompt, yes, no (got '{}')",
                other
            ),
        };

        let rollout_timeout = match var("ROLLOUT_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(
                v.trim()
                    .parse()
                    .context("ROLLOUT_TIMEOUT_SECS is not a number of seconds")?,
            ),
            None => Duration::from_secs(300),
        };

        Ok(Config {
            namespace,
            exposure,
            port_forward_port,
            applications,
            charts_dir: var("CHARTS_DIR").map(PathBuf::from).unwrap_or_else(|| "charts".into()),
            values_dir: var("VALUES_DIR").map(PathBuf::from).unwrap_or_else(|| "values".into()),
            ssl_secret_source: var("SSL_SECRET_SOURCE")
                .map(PathBuf::from)
                .unwrap_or_else(|| "ssl".into()),
            argocd_ingress_values: var("ARGOCD_INGRESS_VALUES").map(PathBuf::from),
            argocd_hostname: var("ARGOCD_HOSTNAME"),
            rollout_timeout,
            helm_bin: var("HELM_BIN").map(PathBuf::from),
            kubectl_bin: var("KUBECTL_BIN").map(PathBuf::from),
        })
    }
}

/// Parse a non-zero TCP port
pub fn parse_port(value: &str) -> Result<u16> {
    let port: u16 = value
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a port number", value.trim()))?;
    if port == 0 {
        bail!("port 0 is not allowed");
    }
    Ok(port)
}
