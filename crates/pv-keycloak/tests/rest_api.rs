//! REST adapter behaviour against a mocked admin API.

use pv_core::{ensure, Credential, Outcome, ProvisionError, StepStatus};
use pv_keycloak::{ProvisionPlan, Provisioner, RealmResource, RealmSpec, RestAdminApi};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/realms/master/protocol/openid-connect/token";

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "admin-token",
            "expires_in": 300,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}

fn connect(server: &MockServer) -> RestAdminApi {
    RestAdminApi::connect(&server.uri(), &Credential::admin_password("admin", "admin")).unwrap()
}

fn realm_body() -> Value {
    json!({ "id": "r-1", "realm": "calendar", "enabled": true })
}

async fn mount_existing_realm_and_client(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/admin/realms/calendar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(realm_body()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/calendar/clients"))
        .and(query_param("clientId", "calendar-app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "c-1", "clientId": "calendar-app", "enabled": true, "publicClient": false }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/calendar/clients/c-1/client-secret"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "type": "secret", "value": "s3cret" })),
        )
        .mount(server)
        .await;
}

fn role_body(name: &str) -> Value {
    json!({ "id": format!("role-{name}"), "name": name, "clientRole": true, "containerId": "c-1" })
}

#[tokio::test]
async fn absent_realm_is_created_once() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/admin/realms/calendar"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/calendar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(realm_body()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/admin/realms"))
        .and(body_string_contains("\"realm\":\"calendar\""))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let api = connect(&server);
    let outcome = ensure(&RealmResource::new(&api, RealmSpec::new("calendar")))
        .await
        .unwrap();

    assert!(outcome.was_created());
    assert_eq!(outcome.entity().realm, "calendar");
}

#[tokio::test]
async fn existing_realm_is_left_alone() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/admin/realms/calendar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(realm_body()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/admin/realms"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let api = connect(&server);
    let outcome = ensure(&RealmResource::new(&api, RealmSpec::new("calendar")))
        .await
        .unwrap();
    assert!(!outcome.was_created());
}

#[tokio::test]
async fn forbidden_probe_is_an_error_not_absence() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/admin/realms/calendar"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/admin/realms"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let api = connect(&server);
    let err = ensure(&RealmResource::new(&api, RealmSpec::new("calendar")))
        .await
        .err()
        .unwrap();
    assert_eq!(err.status(), Some(403));
}

#[tokio::test]
async fn password_grant_token_is_reused() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("client_id=admin-cli"))
        .and(body_string_contains("username=admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "admin-token",
            "expires_in": 300
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/calendar"))
        .and(header("authorization", "Bearer admin-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(realm_body()))
        .expect(2)
        .mount(&server)
        .await;

    let api = connect(&server);
    let realm = RealmResource::new(&api, RealmSpec::new("calendar"));
    ensure(&realm).await.unwrap();
    ensure(&realm).await.unwrap();
}

#[tokio::test]
async fn rejected_admin_login_is_an_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
        .mount(&server)
        .await;

    let api = connect(&server);
    let err = ensure(&RealmResource::new(&api, RealmSpec::new("calendar")))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ProvisionError::Auth { status: 401, .. }));
}

#[tokio::test]
async fn fully_provisioned_server_gets_no_writes() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_existing_realm_and_client(&server).await;

    for role in ["reader", "writer", "owner"] {
        Mock::given(method("GET"))
            .and(path(format!("/admin/realms/calendar/clients/c-1/roles/{role}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(role_body(role)))
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(wiremock::matchers::path_regex("^/admin/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let api = connect(&server);
    let report = Provisioner::new(&api).run(&ProvisionPlan::calendar()).await;

    assert!(report.is_success());
    assert!(!report.client_created);
    assert_eq!(report.steps.count(Outcome::Existing), 5);
    assert_eq!(report.client_internal_id.as_deref(), Some("c-1"));
    assert_eq!(report.client_secret.as_deref(), Some("s3cret"));
}

#[tokio::test]
async fn missing_roles_are_created_in_declared_order() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_existing_realm_and_client(&server).await;

    for role in ["reader", "writer", "owner"] {
        let role_path = format!("/admin/realms/calendar/clients/c-1/roles/{role}");
        Mock::given(method("GET"))
            .and(path(role_path.as_str()))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(role_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(role_body(role)))
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/admin/realms/calendar/clients/c-1/roles"))
        .respond_with(ResponseTemplate::new(201))
        .expect(3)
        .mount(&server)
        .await;

    let api = connect(&server);
    let report = Provisioner::new(&api).run(&ProvisionPlan::calendar()).await;
    assert!(report.is_success());

    let created: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path().ends_with("/roles"))
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["name"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(created, ["reader", "writer", "owner"]);

    let statuses: Vec<&StepStatus> = report
        .steps
        .records()
        .iter()
        .filter(|r| r.kind == "client role")
        .map(|r| &r.status)
        .collect();
    assert!(statuses.iter().all(|s| **s == StepStatus::Created));
}

#[tokio::test]
async fn absent_client_is_registered() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/admin/realms/calendar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(realm_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/calendar/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/realms/calendar/clients"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": "c-9", "clientId": "calendar-app" }])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/admin/realms/calendar/clients"))
        .and(body_string_contains("\"clientId\":\"calendar-app\""))
        .respond_with(ResponseTemplate::new(201).insert_header(
            "Location",
            format!("{}/admin/realms/calendar/clients/c-9", server.uri()).as_str(),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let api = connect(&server);
    let plan = ProvisionPlan::new(
        RealmSpec::new("calendar"),
        pv_keycloak::ClientSpec::confidential("calendar-app"),
    );
    let report = Provisioner::new(&api).run(&plan).await;

    assert!(report.client_created);
    assert_eq!(report.client_internal_id.as_deref(), Some("c-9"));
    // secret endpoint is not mocked: the run still succeeds without it
    assert!(report.is_success());
    assert_eq!(report.client_secret, None);
}
