// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Read-only state probes

use crate::helm::Helm;
use crate::kubernetes::Cluster;
use crate::types::{DesiredSpec, ManagedResource, ResourceState};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct StateProber {
    cluster: Arc<dyn Cluster>,
    helm: Arc<dyn Helm>,
    namespace: String,
}

impl StateProber {
    pub fn new(cluster: Arc<dyn Cluster>, helm: Arc<dyn Helm>, namespace: &str) -> Self {
        Self {
            cluster,
            helm,
            namespace: namespace.to_string(),
        }
    }

    /// Probe one resource. Query failures become `Unknown`, never an error.
    #[instrument(skip(self, resource), fields(resource = %resource.name, kind = %resource.kind()))]
    pub async fn probe(&self, resource: &ManagedResource) -> ResourceState {
        let present = match &resource.desired {
            DesiredSpec::Namespace { name } => self.cluster.namespace_exists(name).await,
            DesiredSpec::HelmRelease(spec) => self
                .helm
                .find_release(&self.namespace, &spec.release_name)
                .await
                .map(|release| match release {
                    Some(info) if info.is_deployed() => true,
                    Some(info) => {
                        debug!(
                            "Release {} exists with status {}, treating as absent",
                            info.name, info.status
                        );
                        false
                    }
                    None => false,
                }),
            DesiredSpec::Secret(spec) => {
                self.cluster
                    .secret_exists(&self.namespace, &spec.secret_name)
                    .await
            }
        };

        match present {
            Ok(true) => ResourceState::Present,
            Ok(false) => ResourceState::Absent,
            Err(e) => {
                warn!("Probe of {} failed, state unknown: {}", resource.name, e);
                ResourceState::Unknown(e.to_string())
            }
        }
    }
}
