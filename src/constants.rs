// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Field manager name recorded on objects we create
pub const FIELD_MANAGER: &str = "argocd-bootstrap";

/// Names of the resources in the standard registry
pub mod resources {
    pub const NAMESPACE: &str = "namespace";
    pub const NGINX_INGRESS: &str = "nginx-ingress";
    pub const ARGOCD: &str = "argocd";
    pub const SSL_SECRET: &str = "ssl-secret";
    pub const MYSQL: &str = "mysql";
    pub const AUTOMATION_ASSESSMENT: &str = "automation-assessment";
    pub const USER_MANAGEMENT_MYSQL: &str = "user-management-mysql";
    pub const USER_MANAGEMENT: &str = "user-management";
    pub const ROOT_APP: &str = "root-app";
}

/// Helm repositories used by the infrastructure tier
pub mod repos {
    pub const INGRESS_NGINX_NAME: &str = "ingress-nginx";
    pub const INGRESS_NGINX_URL: &str = "https://kubernetes.github.io/ingress-nginx";
    pub const ARGO_NAME: &str = "argo";
    pub const ARGO_URL: &str = "https://argoproj.github.io/argo-helm";
}

/// Argo CD exposure and credential settings
pub mod argocd {
    /// Services tried in order when port-forwarding: primary, then legacy chart naming
    pub const SERVICE_CANDIDATES: [&str; 2] = ["argocd-server", "argo-cd-argocd-server"];
    /// Port the Argo CD server service listens on
    pub const SERVICE_PORT: u16 = 443;
    pub const DEFAULT_LOCAL_PORT: u16 = 8080;
    pub const ADMIN_SECRET: &str = "argocd-initial-admin-secret";
    pub const ADMIN_SECRET_FIELD: &str = "password";
    pub const SERVER_DEPLOYMENT: &str = "argocd-server";
    pub const INGRESS_CLASS: &str = "nginx";
}

/// Credential polling configuration
pub mod poll {
    pub const CREDENTIAL_ATTEMPTS: u32 = 30;
    pub const CREDENTIAL_INTERVAL_SECS: u64 = 1;
}

/// Secret name and type used for the application TLS material
pub mod ssl {
    pub const SECRET_NAME: &str = "ssl-certificate";
    pub const SECRET_TYPE: &str = "kubernetes.io/tls";
    /// Keys a `kubernetes.io/tls` secret must carry
    pub const TLS_CERT_KEY: &str = "tls.crt";
    pub const TLS_KEY_KEY: &str = "tls.key";
}
