// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Background port-forward tunnel.
//!
//! The tunnel process is detached: it is never joined or killed by this
//! program and keeps running after the bootstrap exits. Stopping it is up to
//! the operator.

use crate::error::{BootstrapError, Result};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{info, instrument};

/// Identifies a launched tunnel for the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelHandle {
    pub pid: Option<u32>,
    pub local_port: u16,
    pub service: String,
}

pub trait TunnelLauncher: Send + Sync {
    /// Start forwarding `local_port` to `service:remote_port` without waiting on it
    fn launch(
        &self,
        namespace: &str,
        service: &str,
        local_port: u16,
        remote_port: u16,
    ) -> Result<TunnelHandle>;
}

/// Tunnel through `kubectl port-forward`
#[derive(Debug, Clone)]
pub struct KubectlPortForward {
    binary: Option<PathBuf>,
}

impl KubectlPortForward {
    /// Use `binary` when given, otherwise `kubectl` is looked up on PATH at launch
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self { binary }
    }

    fn binary(&self) -> Result<PathBuf> {
        match &self.binary {
            Some(path) => Ok(path.clone()),
            None => find_kubectl(std::env::var_os("PATH")),
        }
    }
}

/// Resolve `kubectl` in the given search path
pub fn find_kubectl(paths: Option<OsString>) -> Result<PathBuf> {
    let cwd = std::env::current_dir()
        .map_err(|e| BootstrapError::ToolNotFound(format!("kubectl: {}", e)))?;
    which::which_in("kubectl", paths, cwd)
        .map_err(|e| BootstrapError::ToolNotFound(format!("kubectl: {}", e)))
}

impl TunnelLauncher for KubectlPortForward {
    #[instrument(skip(self))]
    fn launch(
        &self,
        namespace: &str,
        service: &str,
        local_port: u16,
        remote_port: u16,
    ) -> Result<TunnelHandle> {
        let binary = self.binary()?;
        let child = Command::new(&binary)
            .args(port_forward_args(namespace, service, local_port, remote_port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| BootstrapError::CommandError {
                tool: binary.display().to_string(),
                source,
            })?;

        // Dropping the std Child neither waits for nor kills the process
        let pid = child.id();
        info!(
            "Port-forward to svc/{} started on localhost:{} (pid {}); it keeps running after exit, stop it with `kill {}`",
            service, local_port, pid, pid
        );

        Ok(TunnelHandle {
            pid: Some(pid),
            local_port,
            service: service.to_string(),
        })
    }
}

pub fn port_forward_args(
    namespace: &str,
    service: &str,
    local_port: u16,
    remote_port: u16,
) -> Vec<String> {
    vec![
        "port-forward".to_string(),
        format!("svc/{}", service),
        "--namespace".to_string(),
        namespace.to_string(),
        format!("{}:{}", local_port, remote_port),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_forward_args() {
        assert_eq!(
            port_forward_args("automation", "argocd-server", 8080, 443),
            ["port-forward", "svc/argocd-server", "--namespace", "automation", "8080:443"]
        );
    }

    #[test]
    fn test_missing_binary_fails_to_launch() {
        let launcher = KubectlPortForward::new(Some(PathBuf::from("/nonexistent/kubectl")));

        let err = launcher
            .launch("automation", "argocd-server", 8080, 443)
            .unwrap_err();

        assert!(matches!(err, BootstrapError::CommandError { .. }));
    }

    #[test]
    fn test_kubectl_not_on_path() {
        let empty = tempfile::tempdir().unwrap();

        let err = find_kubectl(Some(empty.path().as_os_str().to_owned())).unwrap_err();

        assert!(matches!(err, BootstrapError::ToolNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_does_not_wait_for_tunnel() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::{Duration, Instant};

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("kubectl");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let launcher = KubectlPortForward::new(Some(script));

        let started = Instant::now();
        let handle = launcher
            .launch("automation", "argocd-server", 8080, 443)
            .unwrap();
        let elapsed = started.elapsed();

        let pid = handle.pid.expect("launched tunnel has a pid");
        let _ = Command::new("kill").arg(pid.to_string()).status();
        assert!(elapsed < Duration::from_secs(1), "launch took {:?}", elapsed);
        assert_eq!(handle.local_port, 8080);
        assert_eq!(handle.service, "argocd-server");
    }
}
