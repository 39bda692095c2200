//! Ledger HTTP clients against mock servers

use serde_json::{json, Value};
use std::time::Duration;
use twin_anchor::{
    AnchorConfig, BuildError, ChainClient, HttpChainClient, LedgerError, LedgerHandles,
    LedgerQuery, RealShieldedBackend, SecretSource, METADATA_LABEL,
};
use twin_core::{AnchorRequest, Facet, Scope, TxId};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zeroize::Zeroizing;

const ADDRESS: &str = "addr_test1qzanchorwallet";

fn tx_hash() -> String {
    "ab".repeat(32)
}

fn client(server: &MockServer) -> HttpChainClient {
    HttpChainClient::new(server.uri(), Some("preprod-key".into()), Duration::from_secs(5)).unwrap()
}

async fn mount_funded_gateway(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/addresses/{}/utxos", ADDRESS)))
        .and(header("project_id", "preprod-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "tx_hash": "11".repeat(32),
                "output_index": 0,
                "amount": [{"unit": "lovelace", "quantity": "4000000"}]
            },
            {
                "tx_hash": "22".repeat(32),
                "output_index": 1,
                "amount": [
                    {"unit": "lovelace", "quantity": "9000000"},
                    {"unit": "abc123token", "quantity": "5"}
                ]
            }
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/epochs/latest/parameters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "min_fee_a": 44,
            "min_fee_b": 155381,
            "max_tx_size": 16384,
            "key_deposit": "2000000"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_utxos_parse_lovelace_and_404_means_empty() {
    let server = MockServer::start().await;
    mount_funded_gateway(&server).await;
    let c = client(&server);

    let utxos = c.utxos(ADDRESS).await.unwrap();
    assert_eq!(utxos.len(), 2);
    assert_eq!(utxos[1].lovelace, 9_000_000);

    Mock::given(method("GET"))
        .and(path("/addresses/addr_unused/utxos"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    assert!(c.utxos("addr_unused").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_confirmations_from_block_heights() {
    let server = MockServer::start().await;
    let hash = tx_hash();
    Mock::given(method("GET"))
        .and(path(format!("/txs/{}", hash)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hash": hash, "block_height": 100})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blocks/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"height": 104})))
        .mount(&server)
        .await;

    let c = client(&server);
    let tx = TxId::parse(hash).unwrap();
    assert_eq!(c.confirmations(&tx).await.unwrap(), Some(5));

    let unknown = TxId::parse("cd".repeat(32)).unwrap();
    assert_eq!(c.confirmations(&unknown).await.unwrap(), None);
}

#[tokio::test]
async fn test_gateway_errors_are_typed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/epochs/latest/parameters"))
        .respond_with(ResponseTemplate::new(403).set_body_string("invalid project token"))
        .mount(&server)
        .await;

    let err = client(&server).protocol_params().await.unwrap_err();
    assert!(matches!(err, LedgerError::Api { status: 403, .. }));
}

#[tokio::test]
async fn test_gateway_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"is_healthy": true})))
        .mount(&server)
        .await;
    assert!(client(&server).is_healthy().await);

    let dead = HttpChainClient::new("http://127.0.0.1:9", None, Duration::from_millis(200)).unwrap();
    assert!(!dead.is_healthy().await);
}

fn real_public_config(server: &MockServer, fallback: bool) -> AnchorConfig {
    let mut config = AnchorConfig::default();
    config.call_timeout = Duration::from_secs(5);
    config.public.settings.endpoint = Some(server.uri());
    config.public.settings.fallback = fallback;
    config.public.project_id = Some("preprod-key".into());
    config.public.address = Some(ADDRESS.into());
    config.public.wallet_seed = Some(SecretSource::Bytes(Zeroizing::new([5u8; 32])));
    config
}

fn request() -> AnchorRequest {
    AnchorRequest::new(
        Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap(),
        Uuid::new_v4(),
        Scope::Public,
        vec![
            Facet::new("authenticity", json!({"verified": 1})),
            Facet::new("ownership", json!({"owner": "did:example:dave"})),
        ],
        "policy-1",
    )
    .unwrap()
}

#[tokio::test]
async fn test_real_public_anchor_submits_metadata_once() {
    let server = MockServer::start().await;
    mount_funded_gateway(&server).await;
    Mock::given(method("POST"))
        .and(path("/tx/submit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(tx_hash())))
        .expect(1)
        .mount(&server)
        .await;

    let handles = LedgerHandles::from_config(&real_public_config(&server, false)).unwrap();
    let result = handles.service().anchor(&request()).await.unwrap();
    assert_eq!(result.public_tx_id.as_str(), tx_hash());

    let requests = server.received_requests().await.unwrap();
    let submit = requests
        .iter()
        .find(|r| r.url.path() == "/tx/submit")
        .expect("submission sent");
    let body: Value = serde_json::from_slice(&submit.body).unwrap();

    // Largest input first; change returned to the wallet
    assert_eq!(body["body"]["inputs"].as_array().unwrap().len(), 1);
    assert_eq!(body["body"]["inputs"][0]["tx_hash"], "22".repeat(32));
    assert_eq!(body["body"]["outputs"][0]["address"], ADDRESS);
    assert!(body["body"]["metadata"][METADATA_LABEL.to_string()]["map"].is_array());
    assert_eq!(body["witnesses"].as_array().unwrap().len(), 1);

    let raw = String::from_utf8_lossy(&submit.body);
    assert!(raw.contains("authenticity"));
    assert!(!raw.contains("ownership"));
    assert!(!raw.contains("did:example:dave"));
}

#[tokio::test]
async fn test_real_submission_failure_respects_fallback_flag() {
    let server = MockServer::start().await;
    mount_funded_gateway(&server).await;
    Mock::given(method("POST"))
        .and(path("/tx/submit"))
        .respond_with(ResponseTemplate::new(500).set_body_string("mempool full"))
        .mount(&server)
        .await;

    let strict = LedgerHandles::from_config(&real_public_config(&server, false)).unwrap();
    let err = strict.service().anchor(&request()).await.unwrap_err();
    assert!(matches!(
        err,
        twin_anchor::AnchorError::Build(BuildError::PublicAnchorFailed {
            source: LedgerError::Api { status: 500, .. }
        })
    ));

    let lenient = LedgerHandles::from_config(&real_public_config(&server, true)).unwrap();
    let result = lenient.service().anchor(&request()).await.unwrap();
    assert_ne!(result.public_tx_id.as_str(), tx_hash());
    assert_eq!(result.public_tx_id.as_str().len(), 64);
}

#[tokio::test]
async fn test_shielded_rpc_roundtrip() {
    let server = MockServer::start().await;
    let hash = "ef".repeat(32);

    Mock::given(method("POST"))
        .and(header("authorization", "Bearer node-token"))
        .and(body_partial_json(json!({"method": "shielded_getTransaction"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0", "id": 1, "result": {"confirmations": 3}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "system_health"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0", "id": 2, "result": {"peers": 8, "isSyncing": false, "shouldHavePeers": true}
        })))
        .mount(&server)
        .await;

    let node = RealShieldedBackend::new(server.uri(), Some("node-token".into()), Duration::from_secs(5)).unwrap();
    let tx = TxId::parse(hash).unwrap();
    assert_eq!(node.confirmations(&tx).await.unwrap(), Some(3));
    assert!(node.is_healthy().await);
    assert!(!format!("{:?}", node).contains("node-token"));
}

#[tokio::test]
async fn test_shielded_rpc_error_and_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "shielded_getTransaction"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0", "id": 1, "result": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "shielded_submitTransaction"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0", "id": 2, "error": {"code": -32010, "message": "proof rejected"}
        })))
        .mount(&server)
        .await;

    let mut config = AnchorConfig::default();
    config.private.settings.endpoint = Some(server.uri());
    config.private.sealing_key = Some(SecretSource::Bytes(Zeroizing::new([8u8; 32])));
    let handles = LedgerHandles::from_config(&config).unwrap();

    let tx = TxId::parse("ef".repeat(32)).unwrap();
    assert_eq!(handles.private_query.confirmations(&tx).await.unwrap(), None);

    let err = handles.service().anchor(&request()).await.unwrap_err();
    assert!(matches!(
        err,
        twin_anchor::AnchorError::Build(BuildError::PrivateAnchorFailed {
            source: LedgerError::Rpc { code: -32010, .. }
        })
    ));
}
