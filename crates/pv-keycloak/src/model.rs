//! Admin API representations.
//!
//! Only the fields the provisioner sends or reads are modelled; unknown
//! fields in server responses are ignored.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Request body for creating a realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmSpec {
    /// Realm name (unique on the server).
    pub realm: String,
    /// Whether the realm is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Allow self-registration.
    #[serde(default)]
    pub registration_allowed: bool,
    /// Allow login with email.
    #[serde(default)]
    pub login_with_email_allowed: bool,
    /// Allow several users with the same email.
    #[serde(default)]
    pub duplicate_emails_allowed: bool,
    /// Allow password reset.
    #[serde(default)]
    pub reset_password_allowed: bool,
    /// Allow users to edit their username.
    #[serde(default)]
    pub edit_username_allowed: bool,
    /// Enable brute force detection.
    #[serde(default)]
    pub brute_force_protected: bool,
}

impl RealmSpec {
    /// Creates an enabled realm with server defaults for everything else.
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
            enabled: true,
            display_name: None,
            registration_allowed: false,
            login_with_email_allowed: false,
            duplicate_emails_allowed: false,
            reset_password_allowed: false,
            edit_username_allowed: false,
            brute_force_protected: false,
        }
    }

    /// Creates a realm for an end-user application: email login, password
    /// reset and brute force protection on; self-registration, duplicate
    /// emails and username edits off.
    pub fn for_application(realm: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            login_with_email_allowed: true,
            reset_password_allowed: true,
            brute_force_protected: true,
            ..Self::new(realm)
        }
    }
}

/// Realm as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmRepresentation {
    /// Internal identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Realm name.
    pub realm: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Whether the realm is enabled.
    #[serde(default)]
    pub enabled: bool,
}

/// Request body for creating a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSpec {
    /// Client identifier (OAuth `client_id`).
    pub client_id: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the client is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Public client (no secret).
    #[serde(default)]
    pub public_client: bool,
    /// Authorization code flow.
    #[serde(default = "default_true")]
    pub standard_flow_enabled: bool,
    /// Resource owner password credentials.
    #[serde(default)]
    pub direct_access_grants_enabled: bool,
    /// Service account for backend calls.
    #[serde(default)]
    pub service_accounts_enabled: bool,
    /// Fine-grained authorization services.
    #[serde(default)]
    pub authorization_services_enabled: bool,
    /// Protocol.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Allowed redirect URIs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redirect_uris: Vec<String>,
    /// Allowed web origins (CORS).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub web_origins: Vec<String>,
    /// Custom attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

fn default_protocol() -> String {
    "openid-connect".to_string()
}

impl ClientSpec {
    /// Creates a confidential OpenID Connect client with authorization code,
    /// direct grants and a service account, a 5 minute access token
    /// lifespan and S256 PKCE.
    pub fn confidential(client_id: impl Into<String>) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert("access.token.lifespan".to_string(), "300".to_string());
        attributes.insert("pkce.code.challenge.method".to_string(), "S256".to_string());

        Self {
            client_id: client_id.into(),
            name: None,
            description: None,
            enabled: true,
            public_client: false,
            standard_flow_enabled: true,
            direct_access_grants_enabled: true,
            service_accounts_enabled: true,
            authorization_services_enabled: false,
            protocol: default_protocol(),
            redirect_uris: Vec::new(),
            web_origins: Vec::new(),
            attributes,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Allows an origin: adds it to the web origins and `<origin>/*` to the
    /// redirect URIs.
    #[must_use]
    pub fn with_origin(mut self, origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        self.redirect_uris.push(format!("{origin}/*"));
        self.web_origins.push(origin.to_string());
        self
    }
}

/// Client as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRepresentation {
    /// Server-generated internal identifier.
    pub id: String,
    /// Client identifier.
    pub client_id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the client is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Whether it's a public client.
    #[serde(default)]
    pub public_client: bool,
}

/// Client secret response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSecret {
    /// Credential type (normally "secret").
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// The client secret value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Request body for creating a client role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSpec {
    /// Role name (unique within the client).
    pub name: String,
    /// Role description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether this is a composite role.
    #[serde(default)]
    pub composite: bool,
    /// Whether this is a client role.
    #[serde(default = "default_true")]
    pub client_role: bool,
}

impl RoleSpec {
    /// Creates a non-composite client role.
    pub fn client_role(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
            composite: false,
            client_role: true,
        }
    }
}

/// Role as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRepresentation {
    /// Internal identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Role name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether it's a composite role.
    #[serde(default)]
    pub composite: bool,
    /// Whether it's a client role.
    #[serde(default)]
    pub client_role: bool,
    /// Owning client's internal id, for client roles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
}

/// Password credential attached to a new user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRepresentation {
    /// Credential type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Credential value.
    pub value: String,
    /// Require change on first login.
    #[serde(default)]
    pub temporary: bool,
}

impl CredentialRepresentation {
    /// Creates a password credential.
    pub fn password(value: impl Into<String>, temporary: bool) -> Self {
        Self {
            kind: "password".to_string(),
            value: value.into(),
            temporary,
        }
    }
}

impl fmt::Debug for CredentialRepresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRepresentation")
            .field("kind", &self.kind)
            .field("value", &"********")
            .field("temporary", &self.temporary)
            .finish()
    }
}

/// Request body for creating a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSpec {
    /// Username.
    pub username: String,
    /// Email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Whether the user is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Initial credentials.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<CredentialRepresentation>,
}

impl UserSpec {
    /// Creates an enabled user without credentials.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: None,
            enabled: true,
            credentials: Vec::new(),
        }
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Adds a permanent password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.credentials
            .push(CredentialRepresentation::password(password, false));
        self
    }
}

/// User as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRepresentation {
    /// Internal identifier.
    pub id: String,
    /// Username.
    pub username: String,
    /// Email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Whether the user is enabled.
    #[serde(default)]
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_realm_payload() {
        let spec = RealmSpec::for_application("calendar", "Calendar Application");
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["realm"], "calendar");
        assert_eq!(json["displayName"], "Calendar Application");
        assert_eq!(json["loginWithEmailAllowed"], true);
        assert_eq!(json["bruteForceProtected"], true);
        assert_eq!(json["registrationAllowed"], false);
        assert_eq!(json["editUsernameAllowed"], false);
    }

    #[test]
    fn confidential_client_payload() {
        let spec = ClientSpec::confidential("calendar-app")
            .with_origin("http://localhost:3000")
            .with_origin("http://localhost:8000/");
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["clientId"], "calendar-app");
        assert_eq!(json["publicClient"], false);
        assert_eq!(json["serviceAccountsEnabled"], true);
        assert_eq!(json["protocol"], "openid-connect");
        assert_eq!(json["redirectUris"][1], "http://localhost:8000/*");
        assert_eq!(json["webOrigins"][1], "http://localhost:8000");
        assert_eq!(json["attributes"]["pkce.code.challenge.method"], "S256");
    }

    #[test]
    fn client_representation_ignores_unknown_fields() {
        let json = r#"{"id":"c-1","clientId":"calendar-app","surrogateAuthRequired":false}"#;
        let client: ClientRepresentation = serde_json::from_str(json).unwrap();
        assert_eq!(client.id, "c-1");
        assert!(!client.public_client);
    }

    #[test]
    fn user_password_is_not_debug_printed() {
        let user = UserSpec::new("testuser").with_password("testpass");
        let printed = format!("{user:?}");
        assert!(!printed.contains("testpass"));

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["credentials"][0]["type"], "password");
        assert_eq!(json["credentials"][0]["value"], "testpass");
    }
}
