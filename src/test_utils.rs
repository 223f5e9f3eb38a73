// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mock Kubernetes API plus in-memory fakes for the
//! cluster, Helm, tunnel and operator seams.

use crate::error::{BootstrapError, ErrorCategory, Result as BootstrapResult};
use crate::exposure::{Operator, TunnelHandle, TunnelLauncher};
use crate::helm::{Helm, ReleaseInfo};
use crate::kubernetes::Cluster;
use crate::types::{
    AdminCredential, ChartSource, DesiredSpec, ManagedResource, ReleaseSpec, SecretSpec, Tier,
};
use async_trait::async_trait;
use http::{Request, Response};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::error::ErrorResponse;
use kube::Client;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;
use url::Url;

/// A mock HTTP service that returns predefined responses based on request paths
/// and remembers every request it served.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response for GET requests matching the path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Number of requests served for this method and exact path
    pub fn requests(&self, method: &str, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, p)| m == method && p == path)
            .count()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "https://kubernetes.default.svc")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Prefix match so a registered collection path also covers sub-paths
        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let response = self.find_response(&method, &path);
        self.requests.lock().unwrap().push((method, path.clone()));

        Box::pin(async move {
            let (status, body) = response.unwrap_or_else(|| (404, not_found_json("resource", &path)));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

fn status_json(code: u16, reason: &str, message: String) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// Create a mock namespace JSON response
pub fn namespace_json(name: &str) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid"
        }
    })
    .to_string()
}

pub fn not_found_json(resource: &str, name: &str) -> String {
    status_json(404, "NotFound", format!("{} \"{}\" not found", resource, name))
}

pub fn forbidden_json(resource: &str) -> String {
    status_json(
        403,
        "Forbidden",
        format!("{} is forbidden: User \"system:serviceaccount:ci:bootstrap\" cannot get resource", resource),
    )
}

pub fn already_exists_json(resource: &str, name: &str) -> String {
    status_json(409, "AlreadyExists", format!("{} \"{}\" already exists", resource, name))
}

/// A secret with a single data field, base64-encoded the way the API returns it
pub fn secret_json(name: &str, namespace: &str, field: &str, value: &[u8]) -> String {
    let secret = Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(field.to_string(), ByteString(value.to_vec()))])),
        ..Default::default()
    };
    let mut json = serde_json::to_value(&secret).unwrap();
    json["apiVersion"] = "v1".into();
    json["kind"] = "Secret".into();
    json.to_string()
}

pub fn service_json(name: &str, namespace: &str) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {
            "name": name,
            "namespace": namespace
        },
        "spec": {
            "ports": [{ "port": 443, "targetPort": 8080 }]
        }
    })
    .to_string()
}

fn api_error(code: u16, reason: &str) -> BootstrapError {
    BootstrapError::KubeError(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("fake {}", reason),
        reason: reason.to_string(),
        code,
    }))
}

#[derive(Default)]
struct ClusterState {
    namespaces: HashSet<String>,
    secrets: HashSet<(String, String)>,
    services: HashSet<(String, String)>,
    failing_probes: bool,
    racing_namespace_create: bool,
    rollouts_time_out: bool,
    /// Attempt on which the admin password appears, and its value
    credential: Option<(u32, String)>,
    credential_reads: u32,
    forbidden_credential_reads: bool,
    mutations: Vec<String>,
    rollout_waits: Vec<String>,
}

/// In-memory cluster. Clones share state.
#[derive(Clone, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<ClusterState>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(self, name: &str) -> Self {
        self.state.lock().unwrap().namespaces.insert(name.to_string());
        self
    }

    pub fn with_secret(self, namespace: &str, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .secrets
            .insert((namespace.to_string(), name.to_string()));
        self
    }

    pub fn with_service(self, namespace: &str, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .services
            .insert((namespace.to_string(), name.to_string()));
        self
    }

    /// Every existence probe fails with a server error
    pub fn failing_probes(self) -> Self {
        self.state.lock().unwrap().failing_probes = true;
        self
    }

    /// Namespace creation answers 409 while the namespace appears anyway
    pub fn racing_namespace_create(self) -> Self {
        self.state.lock().unwrap().racing_namespace_create = true;
        self
    }

    pub fn rollouts_time_out(self) -> Self {
        self.state.lock().unwrap().rollouts_time_out = true;
        self
    }

    /// The admin secret becomes readable on the given read attempt
    pub fn credential_on_attempt(self, attempt: u32, password: &str) -> Self {
        self.state.lock().unwrap().credential = Some((attempt, password.to_string()));
        self
    }

    /// Reading the admin secret answers 403
    pub fn forbidden_credential_reads(self) -> Self {
        self.state.lock().unwrap().forbidden_credential_reads = true;
        self
    }

    pub fn mutations(&self) -> Vec<String> {
        self.state.lock().unwrap().mutations.clone()
    }

    pub fn rollout_waits(&self) -> Vec<String> {
        self.state.lock().unwrap().rollout_waits.clone()
    }

    pub fn credential_reads(&self) -> u32 {
        self.state.lock().unwrap().credential_reads
    }

    pub fn has_secret(&self, namespace: &str, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .secrets
            .contains(&(namespace.to_string(), name.to_string()))
    }
}

#[async_trait]
impl Cluster for FakeCluster {
    async fn namespace_exists(&self, name: &str) -> BootstrapResult<bool> {
        let state = self.state.lock().unwrap();
        if state.failing_probes {
            return Err(api_error(500, "InternalError"));
        }
        Ok(state.namespaces.contains(name))
    }

    async fn create_namespace(&self, name: &str) -> BootstrapResult<()> {
        let mut state = self.state.lock().unwrap();
        state.mutations.push(format!("create_namespace:{}", name));
        let inserted = state.namespaces.insert(name.to_string());
        if !inserted || state.racing_namespace_create {
            return Err(api_error(409, "AlreadyExists"));
        }
        Ok(())
    }

    async fn secret_exists(&self, namespace: &str, name: &str) -> BootstrapResult<bool> {
        let state = self.state.lock().unwrap();
        if state.failing_probes {
            return Err(api_error(500, "InternalError"));
        }
        Ok(state
            .secrets
            .contains(&(namespace.to_string(), name.to_string())))
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> BootstrapResult<()> {
        let name = secret.metadata.name.clone().unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        state
            .mutations
            .push(format!("create_secret:{}/{}", namespace, name));
        if !state.secrets.insert((namespace.to_string(), name)) {
            return Err(api_error(409, "AlreadyExists"));
        }
        Ok(())
    }

    async fn read_secret_field(
        &self,
        _namespace: &str,
        _name: &str,
        _field: &str,
    ) -> BootstrapResult<Option<Vec<u8>>> {
        let mut state = self.state.lock().unwrap();
        state.credential_reads += 1;
        if state.forbidden_credential_reads {
            return Err(api_error(403, "Forbidden"));
        }
        let reads = state.credential_reads;
        Ok(match &state.credential {
            Some((attempt, password)) if reads >= *attempt => Some(password.as_bytes().to_vec()),
            _ => None,
        })
    }

    async fn service_exists(&self, namespace: &str, name: &str) -> BootstrapResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state
            .services
            .contains(&(namespace.to_string(), name.to_string())))
    }

    async fn wait_for_rollout(
        &self,
        namespace: &str,
        deployment: &str,
        _timeout: Duration,
    ) -> BootstrapResult<bool> {
        let mut state = self.state.lock().unwrap();
        state
            .rollout_waits
            .push(format!("{}/{}", namespace, deployment));
        Ok(!state.rollouts_time_out)
    }
}

#[derive(Default)]
struct HelmState {
    releases: HashMap<String, String>,
    failing_list: bool,
    failing_repo_add: bool,
    failing_upgrades: HashMap<String, ErrorCategory>,
    upgrades: Vec<ReleaseSpec>,
    repos_added: Vec<String>,
}

/// In-memory Helm. A successful upgrade-install marks the release deployed.
#[derive(Clone, Default)]
pub struct FakeHelm {
    state: Arc<Mutex<HelmState>>,
}

impl FakeHelm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_release(self, name: &str, status: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .releases
            .insert(name.to_string(), status.to_string());
        self
    }

    pub fn failing_list(self) -> Self {
        self.state.lock().unwrap().failing_list = true;
        self
    }

    pub fn failing_repo_add(self) -> Self {
        self.state.lock().unwrap().failing_repo_add = true;
        self
    }

    pub fn failing_upgrade(self, release: &str, category: ErrorCategory) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_upgrades
            .insert(release.to_string(), category);
        self
    }

    /// Every upgrade-install attempt, failed ones included
    pub fn upgrades(&self) -> Vec<ReleaseSpec> {
        self.state.lock().unwrap().upgrades.clone()
    }

    pub fn repos_added(&self) -> Vec<String> {
        self.state.lock().unwrap().repos_added.clone()
    }
}

#[async_trait]
impl Helm for FakeHelm {
    async fn find_release(
        &self,
        namespace: &str,
        release: &str,
    ) -> BootstrapResult<Option<ReleaseInfo>> {
        let state = self.state.lock().unwrap();
        if state.failing_list {
            return Err(BootstrapError::HelmError {
                command: "list".to_string(),
                category: ErrorCategory::Timeout,
                message: "Kubernetes cluster unreachable".to_string(),
            });
        }
        Ok(state.releases.get(release).map(|status| ReleaseInfo {
            name: release.to_string(),
            namespace: namespace.to_string(),
            revision: "1".to_string(),
            status: status.clone(),
            chart: format!("{}-1.0.0", release),
            app_version: String::new(),
        }))
    }

    async fn add_repo(&self, name: &str, _url: &Url) -> BootstrapResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_repo_add {
            return Err(BootstrapError::HelmError {
                command: "repo add".to_string(),
                category: ErrorCategory::Unknown,
                message: "looks like the repository is not reachable".to_string(),
            });
        }
        state.repos_added.push(name.to_string());
        Ok(())
    }

    async fn upgrade_install(&self, _namespace: &str, spec: &ReleaseSpec) -> BootstrapResult<()> {
        let mut state = self.state.lock().unwrap();
        state.upgrades.push(spec.clone());
        if let Some(category) = state.failing_upgrades.get(&spec.release_name).copied() {
            return Err(BootstrapError::HelmError {
                command: "upgrade".to_string(),
                category,
                message: format!("upgrade of {} failed", spec.release_name),
            });
        }
        state
            .releases
            .insert(spec.release_name.clone(), "deployed".to_string());
        Ok(())
    }
}

#[derive(Default)]
struct OperatorScript {
    exposure: VecDeque<String>,
    local_port: VecDeque<String>,
    applications: VecDeque<String>,
    prompts: Vec<String>,
    shown: Vec<String>,
}

/// Operator answering from queued responses. An unscripted prompt fails.
#[derive(Clone, Default)]
pub struct ScriptedOperator {
    script: Arc<Mutex<OperatorScript>>,
}

impl ScriptedOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exposure(self, answer: &str) -> Self {
        self.script.lock().unwrap().exposure.push_back(answer.to_string());
        self
    }

    pub fn local_port(self, answer: &str) -> Self {
        self.script.lock().unwrap().local_port.push_back(answer.to_string());
        self
    }

    pub fn applications(self, answer: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .applications
            .push_back(answer.to_string());
        self
    }

    /// Names of the prompts asked, in order
    pub fn prompts(&self) -> Vec<String> {
        self.script.lock().unwrap().prompts.clone()
    }

    pub fn shown_credentials(&self) -> Vec<String> {
        self.script.lock().unwrap().shown.clone()
    }

    fn answer(&self, prompt: &str, pick: fn(&mut OperatorScript) -> Option<String>) -> BootstrapResult<String> {
        let mut script = self.script.lock().unwrap();
        script.prompts.push(prompt.to_string());
        pick(&mut *script)
            .ok_or_else(|| BootstrapError::InvalidInput(format!("no scripted answer for {}", prompt)))
    }
}

impl Operator for ScriptedOperator {
    fn choose_exposure(&mut self) -> BootstrapResult<String> {
        self.answer("exposure", |s| s.exposure.pop_front())
    }

    fn choose_local_port(&mut self, _default: u16) -> BootstrapResult<String> {
        self.answer("local_port", |s| s.local_port.pop_front())
    }

    fn confirm_applications(&mut self) -> BootstrapResult<String> {
        self.answer("applications", |s| s.applications.pop_front())
    }

    fn show_credential(&mut self, credential: &AdminCredential) {
        self.script
            .lock()
            .unwrap()
            .shown
            .push(credential.expose().to_string());
    }
}

/// Tunnel launcher that only records what it was asked to start
#[derive(Clone, Default)]
pub struct RecordingTunnel {
    launches: Arc<Mutex<Vec<(String, u16, u16)>>>,
}

impl RecordingTunnel {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(service, local_port, remote_port)` per launch
    pub fn launches(&self) -> Vec<(String, u16, u16)> {
        self.launches.lock().unwrap().clone()
    }
}

impl TunnelLauncher for RecordingTunnel {
    fn launch(
        &self,
        _namespace: &str,
        service: &str,
        local_port: u16,
        remote_port: u16,
    ) -> BootstrapResult<TunnelHandle> {
        self.launches
            .lock()
            .unwrap()
            .push((service.to_string(), local_port, remote_port));
        Ok(TunnelHandle {
            pid: None,
            local_port,
            service: service.to_string(),
        })
    }
}

/// The namespace resource, named `namespace` as in the standard registry
pub fn namespace_resource(namespace: &str) -> ManagedResource {
    ManagedResource::new(
        "namespace",
        Tier::Infrastructure,
        DesiredSpec::Namespace {
            name: namespace.to_string(),
        },
    )
}

/// Install-or-upgrade release of the local chart `charts/<name>`
pub fn release_resource(name: &str) -> ManagedResource {
    ManagedResource::new(
        name,
        Tier::Infrastructure,
        DesiredSpec::HelmRelease(ReleaseSpec {
            release_name: name.to_string(),
            chart: ChartSource::Local(PathBuf::from(format!("charts/{}", name))),
            values_files: Vec::new(),
            set: BTreeMap::new(),
            rollout: None,
        }),
    )
    .install_or_upgrade()
}

/// Install-or-upgrade release of a chart from repository `repo`
pub fn repo_release_resource(name: &str, repo: &str) -> ManagedResource {
    ManagedResource::new(
        name,
        Tier::Infrastructure,
        DesiredSpec::HelmRelease(ReleaseSpec {
            release_name: name.to_string(),
            chart: ChartSource::Repository {
                repo_name: repo.to_string(),
                repo_url: Url::parse(&format!("https://charts.example.com/{}", repo)).unwrap(),
                chart: name.to_string(),
                version: None,
            },
            values_files: Vec::new(),
            set: BTreeMap::new(),
            rollout: None,
        }),
    )
    .install_or_upgrade()
}

pub fn secret_resource(secret_name: &str, source: &str) -> ManagedResource {
    ManagedResource::new(
        "ssl-secret",
        Tier::Infrastructure,
        DesiredSpec::Secret(SecretSpec {
            secret_name: secret_name.to_string(),
            secret_type: "kubernetes.io/tls".to_string(),
            source: PathBuf::from(source),
        }),
    )
}
