// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Namespace,
    HelmRelease,
    Secret,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Namespace => "Namespace",
            ResourceKind::HelmRelease => "HelmRelease",
            ResourceKind::Secret => "Secret",
        };
        f.write_str(s)
    }
}

/// The reconciliation pass a resource belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Infrastructure,
    Application,
}

/// What to do when a probe reports the resource as present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergePolicy {
    /// Present short-circuits; there is no drift detection
    CreateIfAbsent,
    /// Always converge through `helm upgrade --install`
    InstallOrUpgrade,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartSource {
    Repository {
        repo_name: String,
        repo_url: Url,
        chart: String,
        version: Option<String>,
    },
    Local(PathBuf),
}

impl ChartSource {
    /// Chart reference as passed to helm (`repo/chart` or a path)
    pub fn chart_ref(&self) -> String {
        match self {
            ChartSource::Repository {
                repo_name, chart, ..
            } => format!("{}/{}", repo_name, chart),
            ChartSource::Local(path) => path.display().to_string(),
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            ChartSource::Repository { version, .. } => version.as_deref(),
            ChartSource::Local(_) => None,
        }
    }
}

/// Deployment whose rollout is awaited after a release is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutCheck {
    pub deployment: String,
}

/// Extra values layered on top of a release's declared values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValuesOverlay {
    pub values_files: Vec<PathBuf>,
    pub set: BTreeMap<String, String>,
}

impl ValuesOverlay {
    pub fn is_empty(&self) -> bool {
        self.values_files.is_empty() && self.set.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSpec {
    pub release_name: String,
    pub chart: ChartSource,
    /// Values files in the order helm should merge them
    pub values_files: Vec<PathBuf>,
    pub set: BTreeMap<String, String>,
    pub rollout: Option<RolloutCheck>,
}

impl ReleaseSpec {
    /// Copy of this spec with the overlay's files appended and its `--set` entries winning
    pub fn with_overlay(&self, overlay: &ValuesOverlay) -> ReleaseSpec {
        let mut spec = self.clone();
        spec.values_files
            .extend(overlay.values_files.iter().cloned());
        spec.set
            .extend(overlay.set.iter().map(|(k, v)| (k.clone(), v.clone())));
        spec
    }

    /// Whether every file and `--set` entry of the overlay is already part of this spec
    pub fn includes(&self, overlay: &ValuesOverlay) -> bool {
        overlay
            .values_files
            .iter()
            .all(|f| self.values_files.contains(f))
            && overlay
                .set
                .iter()
                .all(|(k, v)| self.set.get(k) == Some(v))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretSpec {
    pub secret_name: String,
    pub secret_type: String,
    /// A file (one key) or a directory (one key per regular file)
    pub source: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesiredSpec {
    Namespace { name: String },
    HelmRelease(ReleaseSpec),
    Secret(SecretSpec),
}

/// One unit of desired state in the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedResource {
    pub name: String,
    pub depends_on: Vec<String>,
    pub desired: DesiredSpec,
    pub tier: Tier,
    pub policy: ConvergePolicy,
}

impl ManagedResource {
    pub fn new(name: &str, tier: Tier, desired: DesiredSpec) -> Self {
        Self {
            name: name.to_string(),
            depends_on: Vec::new(),
            desired,
            tier,
            policy: ConvergePolicy::CreateIfAbsent,
        }
    }

    pub fn depends_on(mut self, names: &[&str]) -> Self {
        self.depends_on = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn install_or_upgrade(mut self) -> Self {
        self.policy = ConvergePolicy::InstallOrUpgrade;
        self
    }

    pub fn kind(&self) -> ResourceKind {
        match self.desired {
            DesiredSpec::Namespace { .. } => ResourceKind::Namespace,
            DesiredSpec::HelmRelease(_) => ResourceKind::HelmRelease,
            DesiredSpec::Secret(_) => ResourceKind::Secret,
        }
    }

    pub fn release(&self) -> Option<&ReleaseSpec> {
        match &self.desired {
            DesiredSpec::HelmRelease(spec) => Some(spec),
            _ => None,
        }
    }
}
