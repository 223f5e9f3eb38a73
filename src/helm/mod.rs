// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Helm release queries and install-or-upgrade.

pub mod cli;

use crate::error::Result;
use crate::types::ReleaseSpec;
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

pub use cli::{classify_helm_error, upgrade_install_args, HelmCli};

/// One entry of `helm list -o json`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub name: String,
    pub namespace: String,
    pub revision: String,
    pub status: String,
    pub chart: String,
    #[serde(default)]
    pub app_version: String,
}

impl ReleaseInfo {
    pub fn is_deployed(&self) -> bool {
        self.status == "deployed"
    }
}

#[async_trait]
pub trait Helm: Send + Sync {
    /// Look up a release by exact name in any status
    async fn find_release(&self, namespace: &str, release: &str) -> Result<Option<ReleaseInfo>>;

    /// Register (or refresh) a chart repository
    async fn add_repo(&self, name: &str, url: &Url) -> Result<()>;

    /// `helm upgrade --install`: converges whether or not the release exists
    async fn upgrade_install(&self, namespace: &str, spec: &ReleaseSpec) -> Result<()>;
}
