// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes API access for namespaces, secrets, services and rollouts.

pub mod namespaces;
pub mod rollout;
pub mod secrets;
pub mod services;

use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::Client;
use std::time::Duration;

pub use namespaces::{create_namespace, namespace_exists};
pub use rollout::{is_rolled_out, wait_for_rollout};
pub use secrets::{
    build_secret, load_secret_data, read_secret_field, secret_exists, validate_secret_data,
};
pub use services::service_exists;

/// The cluster operations the reconciler and exposure step rely on
#[async_trait]
pub trait Cluster: Send + Sync {
    async fn namespace_exists(&self, name: &str) -> Result<bool>;

    async fn create_namespace(&self, name: &str) -> Result<()>;

    async fn secret_exists(&self, namespace: &str, name: &str) -> Result<bool>;

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<()>;

    /// Decoded value of one data field, `None` when the secret or field is missing
    async fn read_secret_field(
        &self,
        namespace: &str,
        name: &str,
        field: &str,
    ) -> Result<Option<Vec<u8>>>;

    async fn service_exists(&self, namespace: &str, name: &str) -> Result<bool>;

    /// Wait until the deployment is fully rolled out; `false` when `timeout` elapsed first
    async fn wait_for_rollout(
        &self,
        namespace: &str,
        deployment: &str,
        timeout: Duration,
    ) -> Result<bool>;
}

/// `Cluster` backed by a kube client
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Cluster for KubeCluster {
    async fn namespace_exists(&self, name: &str) -> Result<bool> {
        namespaces::namespace_exists(&self.client, name).await
    }

    async fn create_namespace(&self, name: &str) -> Result<()> {
        namespaces::create_namespace(&self.client, name).await
    }

    async fn secret_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        secrets::secret_exists(&self.client, namespace, name).await
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<()> {
        secrets::create_secret(&self.client, namespace, secret).await
    }

    async fn read_secret_field(
        &self,
        namespace: &str,
        name: &str,
        field: &str,
    ) -> Result<Option<Vec<u8>>> {
        secrets::read_secret_field(&self.client, namespace, name, field).await
    }

    async fn service_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        services::service_exists(&self.client, namespace, name).await
    }

    async fn wait_for_rollout(
        &self,
        namespace: &str,
        deployment: &str,
        timeout: Duration,
    ) -> Result<bool> {
        rollout::wait_for_rollout(&self.client, namespace, deployment, timeout).await
    }
}
