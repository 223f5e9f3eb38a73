// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The fixed, ordered set of resources the bootstrap converges.

use crate::config::Config;
use crate::constants::{argocd, repos, resources, ssl};
use crate::error::{BootstrapError, Result};
use crate::types::{
    ChartSource, DesiredSpec, ManagedResource, ReleaseSpec, RolloutCheck, SecretSpec, Tier,
    ValuesOverlay,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use url::Url;

/// Validated resource registry. Immutable once built.
#[derive(Debug, Clone)]
pub struct Registry {
    resources: Vec<ManagedResource>,
}

impl Registry {
    /// Build a registry, rejecting duplicate names, unknown dependencies,
    /// dependency cycles and infrastructure resources that depend on the
    /// application tier.
    pub fn new(resources: Vec<ManagedResource>) -> Result<Self> {
        let mut index: HashMap<&str, &ManagedResource> = HashMap::new();
        for resource in &resources {
            if index.insert(resource.name.as_str(), resource).is_some() {
                return Err(BootstrapError::InvalidRegistry(format!(
                    "duplicate resource name '{}'",
                    resource.name
                )));
            }
        }

        for resource in &resources {
            for dep in &resource.depends_on {
                let Some(target) = index.get(dep.as_str()) else {
                    return Err(BootstrapError::InvalidRegistry(format!(
                        "'{}' depends on unknown resource '{}'",
                        resource.name, dep
                    )));
                };
                if target.tier > resource.tier {
                    return Err(BootstrapError::InvalidRegistry(format!(
                        "'{}' depends on '{}' from a later tier",
                        resource.name, dep
                    )));
                }
            }
        }

        let registry = Self { resources };
        let all: Vec<&ManagedResource> = registry.resources.iter().collect();
        let sorted = topological_order(&all);
        if sorted.len() != all.len() {
            let emitted: HashSet<&str> = sorted.iter().map(|r| r.name.as_str()).collect();
            let cyclic: Vec<&str> = all
                .iter()
                .map(|r| r.name.as_str())
                .filter(|n| !emitted.contains(n))
                .collect();
            return Err(BootstrapError::InvalidRegistry(format!(
                "dependency cycle among {:?}",
                cyclic
            )));
        }

        Ok(registry)
    }

    /// All resources in registration order
    pub fn list(&self) -> &[ManagedResource] {
        &self.resources
    }

    pub fn get(&self, name: &str) -> Option<&ManagedResource> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Layer `overlay` onto the declared values of release `name`
    pub fn with_release_overlay(mut self, name: &str, overlay: &ValuesOverlay) -> Result<Self> {
        let resource = self
            .resources
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| BootstrapError::InvalidRegistry(format!("no '{}' resource", name)))?;
        let DesiredSpec::HelmRelease(spec) = &resource.desired else {
            return Err(BootstrapError::InvalidRegistry(format!(
                "'{}' is not a Helm release",
                name
            )));
        };
        let merged = spec.with_overlay(overlay);
        resource.desired = DesiredSpec::HelmRelease(merged);
        Ok(self)
    }

    /// Resources of one tier, dependencies first, ties kept in registration order
    pub fn ordered(&self, tier: Tier) -> Vec<&ManagedResource> {
        let members: Vec<&ManagedResource> =
            self.resources.iter().filter(|r| r.tier == tier).collect();
        topological_order(&members)
    }

    /// The standard bootstrap: namespace, ingress controller, Argo CD, then the applications
    pub fn standard(config: &Config) -> Result<Self> {
        let ns = resources::NAMESPACE;
        let mut list = vec![
            ManagedResource::new(
                ns,
                Tier::Infrastructure,
                DesiredSpec::Namespace {
                    name: config.namespace.clone(),
                },
            ),
            ManagedResource::new(
                resources::NGINX_INGRESS,
                Tier::Infrastructure,
                DesiredSpec::HelmRelease(ReleaseSpec {
                    release_name: resources::NGINX_INGRESS.to_string(),
                    chart: repository_chart(
                        repos::INGRESS_NGINX_NAME,
                        repos::INGRESS_NGINX_URL,
                        "ingress-nginx",
                    )?,
                    values_files: values_file(config, resources::NGINX_INGRESS),
                    set: BTreeMap::new(),
                    rollout: Some(RolloutCheck {
                        deployment: format!("{}-ingress-nginx-controller", resources::NGINX_INGRESS),
                    }),
                }),
            )
            .depends_on(&[ns]),
            ManagedResource::new(
                resources::ARGOCD,
                Tier::Infrastructure,
                DesiredSpec::HelmRelease(ReleaseSpec {
                    release_name: resources::ARGOCD.to_string(),
                    chart: repository_chart(repos::ARGO_NAME, repos::ARGO_URL, "argo-cd")?,
                    values_files: values_file(config, resources::ARGOCD),
                    set: BTreeMap::new(),
                    rollout: Some(RolloutCheck {
                        deployment: argocd::SERVER_DEPLOYMENT.to_string(),
                    }),
                }),
            )
            .depends_on(&[ns])
            .install_or_upgrade(),
        ];

        list.push(
            ManagedResource::new(
                resources::SSL_SECRET,
                Tier::Application,
                DesiredSpec::Secret(SecretSpec {
                    secret_name: ssl::SECRET_NAME.to_string(),
                    secret_type: ssl::SECRET_TYPE.to_string(),
                    source: config.ssl_secret_source.clone(),
                }),
            )
            .depends_on(&[ns]),
        );
        list.push(
            local_release(config, resources::MYSQL, "mysql").depends_on(&[ns]),
        );
        list.push(
            local_release(config, resources::AUTOMATION_ASSESSMENT, "automation-assessment")
                .depends_on(&[resources::MYSQL, resources::SSL_SECRET]),
        );
        list.push(
            local_release(config, resources::USER_MANAGEMENT_MYSQL, "mysql").depends_on(&[ns]),
        );
        list.push(
            local_release(config, resources::USER_MANAGEMENT, "user-management")
                .depends_on(&[resources::USER_MANAGEMENT_MYSQL, resources::SSL_SECRET]),
        );
        list.push(
            local_release(config, resources::ROOT_APP, "root-app").depends_on(&[resources::ARGOCD]),
        );

        Self::new(list)
    }
}

/// Stable Kahn ordering: repeatedly emit the earliest resource whose
/// in-set dependencies have all been emitted. Dependencies outside the set
/// belong to an earlier tier and do not constrain the order.
fn topological_order<'a>(members: &[&'a ManagedResource]) -> Vec<&'a ManagedResource> {
    let in_set: HashSet<&str> = members.iter().map(|r| r.name.as_str()).collect();
    let mut emitted: HashSet<&str> = HashSet::new();
    let mut order = Vec::with_capacity(members.len());

    loop {
        let next = members.iter().find(|r| {
            !emitted.contains(r.name.as_str())
                && r.depends_on
                    .iter()
                    .all(|d| !in_set.contains(d.as_str()) || emitted.contains(d.as_str()))
        });
        match next {
            Some(resource) => {
                emitted.insert(resource.name.as_str());
                order.push(*resource);
            }
            None => break,
        }
    }

    order
}

fn repository_chart(repo_name: &str, repo_url: &str, chart: &str) -> Result<ChartSource> {
    let repo_url = Url::parse(repo_url).map_err(|e| {
        BootstrapError::InvalidRegistry(format!("invalid repository URL {}: {}", repo_url, e))
    })?;
    Ok(ChartSource::Repository {
        repo_name: repo_name.to_string(),
        repo_url,
        chart: chart.to_string(),
        version: None,
    })
}

fn local_release(config: &Config, name: &str, chart_dir: &str) -> ManagedResource {
    ManagedResource::new(
        name,
        Tier::Application,
        DesiredSpec::HelmRelease(ReleaseSpec {
            release_name: name.to_string(),
            chart: ChartSource::Local(config.charts_dir.join(chart_dir)),
            values_files: values_file(config, name),
            set: BTreeMap::new(),
            rollout: None,
        }),
    )
    .install_or_upgrade()
}

/// `<values_dir>/<name>.yaml` when it exists
fn values_file(config: &Config, name: &str) -> Vec<PathBuf> {
    let path = config.values_dir.join(format!("{}.yaml", name));
    if path.is_file() {
        vec![path]
    } else {
        Vec::new()
    }
}
