// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::Result;
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Client};
use tracing::{debug, instrument};

/// Check whether a service exists in a namespace
#[instrument(skip(client))]
pub async fn service_exists(client: &Client, namespace: &str, name: &str) -> Result<bool> {
    let services: Api<Service> = Api::namespaced(client.clone(), namespace);
    let exists = services.get_opt(name).await?.is_some();
    debug!("Service {}/{} exists: {}", namespace, name, exists);
    Ok(exists)
}
