// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::{Helm, ReleaseInfo};
use crate::error::{BootstrapError, ErrorCategory, Result};
use crate::types::ReleaseSpec;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info, instrument};
use url::Url;

/// `Helm` implemented by shelling out to the helm binary
#[derive(Debug, Clone)]
pub struct HelmCli {
    binary: PathBuf,
}

impl HelmCli {
    /// Use `binary` when given, otherwise resolve `helm` on PATH
    pub fn new(binary: Option<PathBuf>) -> Result<Self> {
        let binary = match binary {
            Some(path) => path,
            None => which::which("helm")
                .map_err(|e| BootstrapError::ToolNotFound(format!("helm: {}", e)))?,
        };
        Ok(Self { binary })
    }

    async fn run(&self, command: &str, args: &[String]) -> Result<String> {
        debug!("Running {} {}", self.binary.display(), args.join(" "));

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|source| BootstrapError::CommandError {
                tool: self.binary.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BootstrapError::HelmError {
                command: command.to_string(),
                category: classify_helm_error(&stderr),
                message: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Helm for HelmCli {
    #[instrument(skip(self))]
    async fn find_release(&self, namespace: &str, release: &str) -> Result<Option<ReleaseInfo>> {
        let args = vec![
            "list".to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
            "--all".to_string(),
            "--filter".to_string(),
            format!("^{}$", release),
            "--output".to_string(),
            "json".to_string(),
        ];
        let stdout = self.run("list", &args).await?;
        let releases = parse_release_list(&stdout)?;

        Ok(releases.into_iter().find(|r| r.name == release))
    }

    #[instrument(skip(self))]
    async fn add_repo(&self, name: &str, url: &Url) -> Result<()> {
        let args = vec![
            "repo".to_string(),
            "add".to_string(),
            name.to_string(),
            url.to_string(),
            "--force-update".to_string(),
        ];
        self.run("repo add", &args).await?;
        info!("Helm repository {} registered", name);
        Ok(())
    }

    #[instrument(skip(self, spec), fields(release = %spec.release_name))]
    async fn upgrade_install(&self, namespace: &str, spec: &ReleaseSpec) -> Result<()> {
        info!(
            "Installing or upgrading release {} from {}",
            spec.release_name,
            spec.chart.chart_ref()
        );
        self.run("upgrade --install", &upgrade_install_args(namespace, spec))
            .await?;
        Ok(())
    }
}

/// Arguments of the `helm upgrade --install` call for a release
pub fn upgrade_install_args(namespace: &str, spec: &ReleaseSpec) -> Vec<String> {
    let mut args = vec![
        "upgrade".to_string(),
        "--install".to_string(),
        spec.release_name.clone(),
        spec.chart.chart_ref(),
        "--namespace".to_string(),
        namespace.to_string(),
    ];

    if let Some(version) = spec.chart.version() {
        args.push("--version".to_string());
        args.push(version.to_string());
    }

    for file in &spec.values_files {
        args.push("--values".to_string());
        args.push(file.display().to_string());
    }

    for (key, value) in &spec.set {
        args.push("--set".to_string());
        args.push(format!("{}={}", key, value));
    }

    args
}

fn parse_release_list(stdout: &str) -> Result<Vec<ReleaseInfo>> {
    // helm prints nothing at all for an empty list on some versions
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(stdout).map_err(|e| BootstrapError::HelmError {
        command: "list".to_string(),
        category: ErrorCategory::Unknown,
        message: format!("unparseable output: {}", e),
    })
}

/// Classify helm's stderr into the shared error categories
pub fn classify_helm_error(stderr: &str) -> ErrorCategory {
    let stderr = stderr.to_lowercase();

    if stderr.contains("forbidden")
        || stderr.contains("unauthorized")
        || stderr.contains("permission denied")
    {
        ErrorCategory::PermissionDenied
    } else if stderr.contains("another operation (install/upgrade/rollback) is in progress")
        || stderr.contains("already exists")
    {
        ErrorCategory::Conflict
    } else if stderr.contains("timed out") || stderr.contains("deadline exceeded") {
        ErrorCategory::Timeout
    } else if stderr.contains("not found") || stderr.contains("no such file") {
        ErrorCategory::NotFound
    } else {
        ErrorCategory::Unknown
    }
}
