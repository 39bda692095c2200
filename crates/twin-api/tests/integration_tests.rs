use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`
use twin_anchor::LedgerHandles;
use twin_api::auth::{ROLE_APPROVER, ROLE_GOVERNANCE, ROLE_REQUESTER};
use twin_api::{AppState, Claims, JwtAuth, ServerConfig, TwinServer};
use twin_core::{link_hex, Facet};
use uuid::Uuid;

const SCAN_ID: &str = "11111111-1111-1111-1111-111111111111";
const JWT_SECRET: &str = "integration-secret-at-least-32-chars";

fn setup() -> (Router, AppState) {
    let config = ServerConfig::default();
    let state = AppState::from_handles(
        &LedgerHandles::simulated(),
        JwtAuth::new(JWT_SECRET),
        config.max_reveal_requests,
    );
    let router = TwinServer::new(config, state.clone()).router();
    (router, state)
}

fn token(auth: &JwtAuth, sub: &str, role: &str) -> String {
    auth.encode(&Claims::for_user(sub, role, chrono::Duration::hours(1)))
        .unwrap()
}

fn approval(auth: &JwtAuth, approver: &str, tx: &str) -> String {
    auth.encode(&Claims::approval(approver, tx, chrono::Duration::minutes(10)))
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json_as(uri: &str, bearer: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_as(uri: &str, bearer: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
        .body(Body::empty())
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response: Response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn scan_body() -> Value {
    json!({
        "scan_id": SCAN_ID,
        "garment_id": "22222222-2222-2222-2222-222222222222",
        "allowed_facets": [
            {"facet_type": "authenticity", "payload_preview": {"verified": 1}},
            {"facet_type": "ownership", "payload_preview": {"owner": "did:example:erin"}}
        ],
        "resolved_scope": "public",
        "policy_version": "policy-2026.1"
    })
}

#[tokio::test]
async fn test_health_and_request_id() {
    let (router, _) = setup();

    let response = router.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let req = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-abc-123")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-abc-123");

    let (status, json) = send(&router, get("/health/detailed")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["components"]["public"]["ledger"], "cardano");
    assert_eq!(json["components"]["private"]["ledger"], "midnight");
}

#[tokio::test]
async fn test_anchor_scan_returns_linked_hashes() {
    let (router, _) = setup();

    let (status, json) = send(&router, post_json("/tx/anchor-scan", scan_body())).await;
    assert_eq!(status, StatusCode::OK);

    let public = json["cardano_tx_hash"].as_str().unwrap();
    let private = json["midnight_tx_hash"].as_str().unwrap();
    let root = json["crosschain_root_hash"].as_str().unwrap();
    assert_eq!(public.len(), 64);
    assert_eq!(private.len(), 64);
    assert_eq!(
        root,
        link_hex(public, private, &Uuid::parse_str(SCAN_ID).unwrap())
    );

    let (status, json) =
        send(&router, post_json("/tx/verify-root", json!({"crosschain_root_hash": root}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_consistent"], true);

    // Simulated anchors are never confirmed
    let (status, json) = send(&router, get(&format!("/tx/verify/public/{}", public))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ledger"], "cardano");
    assert_eq!(json["confirmed"], false);

    let (_, json) = send(&router, get(&format!("/tx/verify/midnight/{}", private))).await;
    assert_eq!(json["confirmed"], false);

    let (status, json) = send(&router, get(&format!("/tx/anchors/{}", SCAN_ID))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["anchors"].as_array().unwrap().len(), 1);
    assert_eq!(json["anchors"][0]["cross_ledger_root"], root);

    let (_, json) = send(&router, get(&format!("/tx/anchors/{}", Uuid::new_v4()))).await;
    assert!(json["anchors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_anchor_scan_validation_errors() {
    let (router, _) = setup();

    let mut body = scan_body();
    body["scan_id"] = json!("not-a-uuid");
    body["resolved_scope"] = json!("everyone");
    body["allowed_facets"][0]["payload_preview"] = json!("flat string");

    let (status, json) = send(&router, post_json("/tx/anchor-scan", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");

    let fields: Vec<&str> = json["error"]["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"scan_id"));
    assert!(fields.contains(&"resolved_scope"));
    assert!(fields.contains(&"allowed_facets[0].payload_preview"));

    let req = Request::builder()
        .method("POST")
        .uri("/tx/anchor-scan")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"scan_id\": "))
        .unwrap();
    let (status, json) = send(&router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_verify_root_never_errors() {
    let (router, _) = setup();

    let (status, json) = send(
        &router,
        post_json("/tx/verify-root", json!({"crosschain_root_hash": "9".repeat(64)})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["is_consistent"].is_boolean());

    let (status, json) = send(
        &router,
        post_json("/tx/verify-root", json!({"crosschain_root_hash": "xyz"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_consistent"], false);

    let (status, _) = send(&router, get(&format!("/tx/verify/sidechain/{}", "a".repeat(64)))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reveal_requires_authenticated_approvers() {
    let (router, state) = setup();
    let tx = "d".repeat(64);
    let scan = Uuid::parse_str(SCAN_ID).unwrap();
    let sealed = state
        .sealer()
        .seal(&scan, &Facet::new("pricing", json!({"eur": 1200})))
        .unwrap();
    let request_id = Uuid::new_v4();

    // Anonymous callers reach neither submission nor unsealing
    let legacy = json!({
        "private_tx_id": tx,
        "requester_id": "auditor-3",
        "approvals": ["alice", "bob"],
        "reason": "warranty fraud investigation"
    });
    let (status, json) = send(&router, post_json("/tx/reveal", legacy.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "UNAUTHORIZED");
    let unseal_body = json!({
        "scan_id": SCAN_ID,
        "facet_type": sealed.facet_type,
        "nonce": sealed.nonce,
        "ciphertext": sealed.ciphertext
    });
    let (status, json) = send(
        &router,
        post_json(&format!("/tx/reveal/{}/unseal", request_id), unseal_body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!json.to_string().contains("1200"));

    // Approver names in the body count for nothing
    let auth = state.jwt_auth().clone();
    let requester = token(&auth, "auditor-3", ROLE_REQUESTER);
    let (status, _) = send(&router, post_json_as("/tx/reveal", &requester, legacy)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let submit = |tokens: Vec<String>| {
        post_json_as(
            "/tx/reveal",
            &requester,
            json!({
                "private_tx_id": tx,
                "approval_tokens": tokens,
                "reason": "warranty fraud investigation"
            }),
        )
    };

    // Approvals signed with another secret
    let forger = JwtAuth::new("attacker-controlled-secret-32-chars!");
    let (status, _) = send(
        &router,
        submit(vec![approval(&forger, "alice", &tx), approval(&forger, "bob", &tx)]),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Session tokens are not approvals
    let (status, _) = send(
        &router,
        submit(vec![
            token(&auth, "alice", ROLE_APPROVER),
            token(&auth, "bob", ROLE_APPROVER),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Approval for a different transaction
    let (status, _) = send(
        &router,
        submit(vec![approval(&auth, "alice", &tx), approval(&auth, "bob", &"e".repeat(64))]),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // One approver twice
    let (status, json) = send(
        &router,
        submit(vec![approval(&auth, "alice", &tx), approval(&auth, "alice", &tx)]),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json["error"]["message"].as_str().unwrap().contains("Quorum"));

    // Requester approving their own request
    let (status, _) = send(
        &router,
        submit(vec![approval(&auth, "alice", &tx), approval(&auth, "auditor-3", &tx)]),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = send(&router, submit(vec![String::new(); 17])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["details"][0]["field"], "approval_tokens");
}

#[tokio::test]
async fn test_reveal_lifecycle() {
    let (router, state) = setup();
    let auth = state.jwt_auth().clone();
    let tx = "d".repeat(64);
    let scan = Uuid::parse_str(SCAN_ID).unwrap();
    let sealed = state
        .sealer()
        .seal(&scan, &Facet::new("pricing", json!({"eur": 1200})))
        .unwrap();
    let requester = token(&auth, "auditor-3", ROLE_REQUESTER);
    let other = token(&auth, "auditor-9", ROLE_REQUESTER);
    let governance = token(&auth, "board-1", ROLE_GOVERNANCE);

    let (status, json) = send(
        &router,
        post_json_as(
            "/tx/reveal",
            &requester,
            json!({
                "private_tx_id": tx,
                "approval_tokens": [approval(&auth, "alice", &tx), approval(&auth, "bob", &tx)],
                "reason": "warranty fraud investigation"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "authorized");
    assert_eq!(json["requester_id"], "auditor-3");
    assert_eq!(json["approvals"], json!(["alice", "bob"]));
    let request_id = json["request_id"].as_str().unwrap().to_string();

    let (status, _) = send(&router, get_as(&format!("/tx/reveal/{}", request_id), &other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&router, get_as(&format!("/tx/reveal/{}", request_id), &governance)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&router, get_as(&format!("/tx/reveals/{}", tx), &requester)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, json) = send(&router, get_as(&format!("/tx/reveals/{}", tx), &governance)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);

    let unseal_body = json!({
        "scan_id": SCAN_ID,
        "facet_type": sealed.facet_type,
        "nonce": sealed.nonce,
        "ciphertext": sealed.ciphertext
    });
    let unseal_uri = format!("/tx/reveal/{}/unseal", request_id);

    let (status, json) = send(&router, post_json_as(&unseal_uri, &other, unseal_body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!json.to_string().contains("1200"));

    let (status, json) =
        send(&router, post_json_as(&unseal_uri, &requester, unseal_body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["payload_preview"]["eur"], 1200);

    let reject_uri = format!("/tx/reveal/{}/reject", request_id);
    let (status, _) = send(
        &router,
        post_json_as(&reject_uri, &requester, json!({"reason": "changed my mind"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = send(
        &router,
        post_json_as(&reject_uri, &governance, json!({"reason": "board withdrew approval"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "rejected");

    let (status, _) = send(
        &router,
        post_json_as(&reject_uri, &governance, json!({"reason": "again"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = send(&router, post_json_as(&unseal_uri, &requester, unseal_body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!json.to_string().contains("1200"));

    let (status, _) = send(
        &router,
        get_as(&format!("/tx/reveal/{}", Uuid::new_v4()), &governance),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let (router, _) = setup();
    let padding = "x".repeat(2 * 1024 * 1024);
    let body = json!({"crosschain_root_hash": padding}).to_string();

    let req = Request::builder()
        .method("POST")
        .uri("/tx/verify-root")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();
    let response = router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_openapi_document_served() {
    let (router, _) = setup();
    let (status, json) = send(&router, get("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/tx/anchor-scan"]["post"].is_object());
    assert!(json["paths"]["/tx/reveal"]["post"].is_object());
}
