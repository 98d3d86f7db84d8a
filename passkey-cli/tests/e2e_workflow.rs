//! End-to-end workflow tests for passkey-cli.
//!
//! Each test starts an in-process auth server and drives the binary with a
//! shell-script authenticator, covering the full options → ceremony →
//! verify chain across process boundaries.

#![cfg(unix)]

use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use assert_cmd::Command;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

const ASSERTION: &str = r#"{"id":"Y3JlZA","rawId":"Y3JlZA","type":"public-key","response":{"clientDataJSON":"e30","authenticatorData":"YXV0aA","signature":"c2ln"}}"#;
const ATTESTATION: &str = r#"{"id":"Y3JlZA","rawId":"Y3JlZA","type":"public-key","response":{"clientDataJSON":"e30","attestationObject":"YXR0"}}"#;

#[derive(Clone, Default)]
struct Recorded {
    register_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    verify_bodies: Arc<Mutex<Vec<Value>>>,
}

fn passkey() -> Command {
    let mut cmd = Command::cargo_bin("passkey").unwrap();
    for var in ["PASSKEY_AUTH_URL", "PASSKEY_AUTH_TOKEN", "PASSKEY_AUTHENTICATOR", "RUST_LOG"] {
        cmd.env_remove(var);
    }
    cmd
}

/// Start the auth server on its own runtime thread.
fn spawn_server() -> (String, Recorded) {
    let recorded = Recorded::default();

    let app = Router::new()
        .route(
            "/api/auth/passkey/generate-authenticate-options",
            get(|| async {
                Json(json!({ "challenge": "dGVzdC1jaGFsbGVuZ2U", "rpId": "localhost", "timeout": 60000 }))
            }),
        )
        .route(
            "/api/auth/passkey/verify-authentication",
            post(
                |State(recorded): State<Recorded>, Json(body): Json<Value>| async move {
                    recorded.verify_bodies.lock().unwrap().push(body);
                    Json(json!({
                        "session": { "id": "session-id", "userId": "user-id" },
                        "user": { "id": "user-id", "email": "test@example.com" }
                    }))
                },
            ),
        )
        .route(
            "/api/auth/passkey/generate-register-options",
            get(
                |State(recorded): State<Recorded>,
                 Query(query): Query<HashMap<String, String>>| async move {
                    recorded.register_queries.lock().unwrap().push(query);
                    Json(json!({
                        "challenge": "cmVnaXN0ZXItY2hhbGxlbmdl",
                        "rp": { "name": "Localhost", "id": "localhost" },
                        "user": { "id": "dXNlci1pZA", "name": "test@example.com", "displayName": "Test" },
                        "pubKeyCredParams": [{ "type": "public-key", "alg": -7 }]
                    }))
                },
            ),
        )
        .route(
            "/api/auth/passkey/verify-registration",
            post(
                |State(recorded): State<Recorded>, Json(body): Json<Value>| async move {
                    let rejected = body["name"] == "reject";
                    recorded.verify_bodies.lock().unwrap().push(body);
                    if rejected {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({ "code": "FAILED_TO_VERIFY_REGISTRATION", "message": "Failed to verify registration" })),
                        )
                            .into_response();
                    }
                    Json(json!({
                        "passkey": { "id": "passkey-id", "name": "Work Laptop", "credentialID": "Y3JlZA" }
                    }))
                    .into_response()
                },
            ),
        )
        .route(
            "/api/auth/passkey/list-user-passkeys",
            get(|| async {
                Json(json!([{
                    "id": "passkey-id",
                    "name": "Work Laptop",
                    "credentialID": "Y3JlZA",
                    "deviceType": "multiDevice",
                    "backedUp": true
                }]))
            }),
        )
        .with_state(recorded.clone());

    let (addr_tx, addr_rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            addr_tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });
    let addr = addr_rx.recv().unwrap();

    (format!("http://{addr}/api/auth"), recorded)
}

/// Write an executable authenticator script that records its request.
fn write_authenticator(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("authenticator.sh");
    let script = format!(
        "#!/bin/sh\nrequest=$(cat)\nprintf '%s' \"$request\" > \"{}\"\n{body}\n",
        dir.join("request.json").display()
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn approving_authenticator(dir: &Path) -> PathBuf {
    write_authenticator(
        dir,
        &format!(
            "case \"$request\" in\n  *'\"operation\":\"create\"'*) printf '%s' '{ATTESTATION}' ;;\n  *) printf '%s' '{ASSERTION}' ;;\nesac"
        ),
    )
}

// ============================================================================
// Complete Workflow Tests: Sign-in, Add, List
// ============================================================================

#[test]
fn test_e2e_sign_in_with_authenticator() {
    let (base_url, recorded) = spawn_server();
    let temp = TempDir::new().unwrap();
    let authenticator = approving_authenticator(temp.path());

    let mut cmd = passkey();
    cmd.args(["--url", base_url.as_str(), "sign-in", "--autofill", "--authenticator"])
        .arg(&authenticator);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Signed in with passkey"))
        .stdout(predicate::str::contains("test@example.com"));

    let request: Value =
        serde_json::from_slice(&fs::read(temp.path().join("request.json")).unwrap()).unwrap();
    assert_eq!(request["operation"], "get");
    assert_eq!(request["useAutofill"], true);
    assert_eq!(request["options"]["challenge"], "dGVzdC1jaGFsbGVuZ2U");

    let bodies = recorded.verify_bodies.lock().unwrap().clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["response"]["rawId"], "Y3JlZA");
}

#[test]
fn test_e2e_add_then_list() {
    let (base_url, recorded) = spawn_server();
    let temp = TempDir::new().unwrap();
    let authenticator = approving_authenticator(temp.path());

    let mut cmd = passkey();
    cmd.args([
        "--url",
        base_url.as_str(),
        "add",
        "--name",
        "Work Laptop",
        "--attachment",
        "platform",
        "--authenticator",
    ])
    .arg(&authenticator);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Passkey registered"))
        .stdout(predicate::str::contains("Work Laptop"));

    let queries = recorded.register_queries.lock().unwrap().clone();
    assert_eq!(queries[0]["name"], "Work Laptop");
    assert_eq!(queries[0]["authenticatorAttachment"], "platform");
    let bodies = recorded.verify_bodies.lock().unwrap().clone();
    assert_eq!(bodies[0]["name"], "Work Laptop");
    assert_eq!(bodies[0]["response"]["response"]["transports"], json!(["internal"]));

    let mut cmd = passkey();
    cmd.args(["--url", base_url.as_str(), "list"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1 passkey(s)"))
        .stdout(predicate::str::contains("multiDevice (backed up)"));
}

#[test]
fn test_e2e_cancelled_ceremony() {
    let (base_url, recorded) = spawn_server();
    let temp = TempDir::new().unwrap();
    let authenticator = write_authenticator(temp.path(), "echo 'User cancelled' >&2\nexit 2");

    let mut cmd = passkey();
    cmd.args(["--url", base_url.as_str(), "sign-in", "--authenticator"])
        .arg(&authenticator);
    cmd.assert()
        .failure()
        .code(75)
        .stderr(predicate::str::contains("User cancelled"));

    assert!(recorded.verify_bodies.lock().unwrap().is_empty());
}

#[test]
fn test_e2e_rejected_registration() {
    let (base_url, _recorded) = spawn_server();
    let temp = TempDir::new().unwrap();
    let authenticator = approving_authenticator(temp.path());

    let mut cmd = passkey();
    cmd.args(["--url", base_url.as_str(), "--json", "add", "--name", "reject", "--authenticator"])
        .arg(&authenticator);
    cmd.assert()
        .failure()
        .code(77)
        .stdout(predicate::str::contains("FAILED_TO_VERIFY_REGISTRATION"));
}

#[test]
fn test_e2e_options_json() {
    let (base_url, _recorded) = spawn_server();

    let mut cmd = passkey();
    cmd.args(["--url", base_url.as_str(), "--json", "options", "authenticate"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"challenge\": \"dGVzdC1jaGFsbGVuZ2U\""))
        .stdout(predicate::str::contains("\"error\": null"));
}
