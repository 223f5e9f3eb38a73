// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Secret lookup, creation and file-based secret construction

use crate::constants::{ssl, FIELD_MANAGER};
use crate::error::{BootstrapError, Result};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::{
    api::{ObjectMeta, PostParams},
    Api, Client,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(client))]
pub async fn secret_exists(client: &Client, namespace: &str, name: &str) -> Result<bool> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    Ok(secrets.get_opt(name).await?.is_some())
}

#[instrument(skip(client, secret), fields(secret = secret.metadata.name.as_deref().unwrap_or_default()))]
pub async fn create_secret(client: &Client, namespace: &str, secret: &Secret) -> Result<()> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let pp = PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    };
    secrets.create(&pp, secret).await?;
    info!("Secret created in namespace {}", namespace);
    Ok(())
}

/// Read one data field of a secret. The API returns data base64-encoded;
/// `ByteString` holds the decoded bytes.
#[instrument(skip(client))]
pub async fn read_secret_field(
    client: &Client,
    namespace: &str,
    name: &str,
    field: &str,
) -> Result<Option<Vec<u8>>> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let Some(secret) = secrets.get_opt(name).await? else {
        debug!("Secret {}/{} does not exist yet", namespace, name);
        return Ok(None);
    };

    Ok(secret
        .data
        .as_ref()
        .and_then(|d| d.get(field))
        .map(|value| value.0.clone()))
}

/// Load secret data from a file (one key named after the file) or a
/// directory (one key per regular file, sorted by name)
pub fn load_secret_data(source: &Path) -> Result<BTreeMap<String, ByteString>> {
    let metadata = fs::metadata(source).map_err(|e| source_error(source, e))?;
    let mut data = BTreeMap::new();

    if metadata.is_dir() {
        let entries = fs::read_dir(source).map_err(|e| source_error(source, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| source_error(source, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(key) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let contents = fs::read(&path).map_err(|e| source_error(&path, e))?;
            data.insert(key.to_string(), ByteString(contents));
        }
    } else {
        let key = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                source_error(
                    source,
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"),
                )
            })?;
        let contents = fs::read(source).map_err(|e| source_error(source, e))?;
        data.insert(key.to_string(), ByteString(contents));
    }

    if data.is_empty() {
        return Err(source_error(
            source,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no files in secret source"),
        ));
    }

    Ok(data)
}

fn source_error(path: &Path, source: std::io::Error) -> BootstrapError {
    BootstrapError::SecretSourceError {
        path: path.to_path_buf(),
        source,
    }
}

/// Check that data for a TLS secret carries both the certificate and key entries.
/// Other secret types accept any keys.
pub fn validate_secret_data(secret_type: &str, data: &BTreeMap<String, ByteString>) -> Result<()> {
    if secret_type != ssl::SECRET_TYPE {
        return Ok(());
    }
    let missing: Vec<&str> = [ssl::TLS_CERT_KEY, ssl::TLS_KEY_KEY]
        .into_iter()
        .filter(|key| !data.contains_key(*key))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(BootstrapError::InvalidInput(format!(
            "{} secret is missing {}",
            secret_type,
            missing.join(", ")
        )))
    }
}

/// Build the secret object to create
pub fn build_secret(
    name: &str,
    namespace: &str,
    secret_type: &str,
    data: BTreeMap<String, ByteString>,
) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(data),
        type_: Some(secret_type.to_string()),
        ..Default::default()
    }
}
