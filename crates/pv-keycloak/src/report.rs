//! Provisioning summary.

use std::fmt::Write as _;

use pv_core::StepLog;
use serde::Serialize;

const RULE_WIDTH: usize = 50;

/// Public endpoints of a provisioned realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointUrls {
    /// Realm base URL.
    pub realm: String,
    /// Authorization endpoint.
    pub auth: String,
    /// Token endpoint.
    pub token: String,
    /// Userinfo endpoint.
    pub userinfo: String,
    /// End-session endpoint.
    pub logout: String,
    /// OpenID discovery document.
    pub discovery: String,
}

impl EndpointUrls {
    /// Derives the endpoints of `realm` on `server_url`.
    pub fn new(server_url: &str, realm: &str) -> Self {
        let realm_url = format!(
            "{}/realms/{}",
            server_url.trim_end_matches('/'),
            urlencoding::encode(realm)
        );
        let oidc = format!("{realm_url}/protocol/openid-connect");
        Self {
            auth: format!("{oidc}/auth"),
            token: format!("{oidc}/token"),
            userinfo: format!("{oidc}/userinfo"),
            logout: format!("{oidc}/logout"),
            discovery: format!("{realm_url}/.well-known/openid-configuration"),
            realm: realm_url,
        }
    }
}

/// Everything a provisioning run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    /// Server base URL.
    pub server_url: String,
    /// Realm name.
    pub realm: String,
    /// Client identifier.
    pub client_id: String,
    /// Client internal id, once known.
    pub client_internal_id: Option<String>,
    /// Whether this run created the client.
    pub client_created: bool,
    /// Client secret, if it could be fetched.
    pub client_secret: Option<String>,
    /// Client roles ensured by the run, in declared order.
    pub roles: Vec<String>,
    /// Users ensured by the run, in order.
    pub users: Vec<String>,
    /// Derived endpoint URLs.
    pub urls: EndpointUrls,
    /// Per-step outcomes.
    pub steps: StepLog,
}

impl ProvisionReport {
    /// Creates an empty report.
    pub fn new(server_url: &str, realm: &str, client_id: &str) -> Self {
        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            realm: realm.to_string(),
            client_id: client_id.to_string(),
            client_internal_id: None,
            client_created: false,
            client_secret: None,
            roles: Vec::new(),
            users: Vec::new(),
            urls: EndpointUrls::new(server_url, realm),
            steps: StepLog::new(),
        }
    }

    /// Realm base URL.
    pub fn realm_url(&self) -> &str {
        &self.urls.realm
    }

    /// Authorization endpoint.
    pub fn auth_url(&self) -> &str {
        &self.urls.auth
    }

    /// Token endpoint.
    pub fn token_url(&self) -> &str {
        &self.urls.token
    }

    /// Userinfo endpoint.
    pub fn userinfo_url(&self) -> &str {
        &self.urls.userinfo
    }

    /// End-session endpoint.
    pub fn logout_url(&self) -> &str {
        &self.urls.logout
    }

    /// OpenID discovery document.
    pub fn discovery_url(&self) -> &str {
        &self.urls.discovery
    }

    /// Returns whether every step succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.steps.has_failures()
    }

    /// Renders the human-readable summary. Missing values are shown as
    /// `(unavailable)`; rendering never fails.
    #[must_use]
    pub fn render(&self) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        let headline = if self.is_success() {
            "Provisioning complete!"
        } else {
            "Provisioning finished with errors"
        };
        let or_unavailable = |v: Option<&str>| v.unwrap_or("(unavailable)").to_string();
        let list = |items: &[String]| {
            if items.is_empty() {
                "(none)".to_string()
            } else {
                items.join(", ")
            }
        };

        let mut out = String::new();
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{headline}");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Realm:         {}", self.realm);
        let _ = writeln!(out, "Client ID:     {}", self.client_id);
        let _ = writeln!(
            out,
            "Client Secret: {}",
            or_unavailable(self.client_secret.as_deref())
        );
        let _ = writeln!(out, "Roles:         {}", list(&self.roles));
        if !self.users.is_empty() {
            let _ = writeln!(out, "Users:         {}", list(&self.users));
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Keycloak URLs:");
        let _ = writeln!(out, "  Realm:    {}", self.urls.realm);
        let _ = writeln!(out, "  Auth:     {}", self.urls.auth);
        let _ = writeln!(out, "  Token:    {}", self.urls.token);
        let _ = writeln!(out, "  Userinfo: {}", self.urls.userinfo);
        out
    }
}
