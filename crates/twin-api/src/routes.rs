//! API routes for Twin Anchor endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::OpenApi;
use uuid::Uuid;

use crate::auth::{Claims, ROLE_GOVERNANCE, ROLE_REQUESTER};
use crate::error::{ApiError, ApiResult, ErrorResponse};
use crate::middleware::auth_middleware;
use crate::state::AppState;
use twin_anchor::{AnchorRecord, SealedFacet, CARDANO, MIDNIGHT};
use twin_core::{AnchorRequest, Facet, RevealState, ValidationError};
use twin_reveal::{RevealRecord, RevealRequest, MAX_APPROVALS};

/// Health check response
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentHealth>,
}

/// Per-ledger health
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ComponentHealth {
    pub public: ComponentStatus,
    pub private: ComponentStatus,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ComponentStatus {
    pub ledger: String,
    pub status: String,
    pub latency_ms: u64,
}

/// Basic health check handler (lightweight)
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Basic health check", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        components: None,
    })
}

/// Detailed health check probing both ledgers
#[utoipa::path(
    get,
    path = "/health/detailed",
    responses(
        (status = 200, description = "Health with per-ledger status", body = HealthResponse)
    )
)]
pub async fn health_detailed(State(state): State<AppState>) -> Json<HealthResponse> {
    let health = state.verifier().health().await;
    let component = |b: &twin_anchor::BackendHealth| ComponentStatus {
        ledger: b.ledger.clone(),
        status: if b.healthy { "healthy" } else { "unhealthy" }.to_string(),
        latency_ms: b.latency_ms,
    };
    let overall = if health.all_healthy() {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: overall.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        components: Some(ComponentHealth {
            public: component(&health.public),
            private: component(&health.private),
        }),
    })
}

/// One disclosed facet as sent by the policy engine
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct FacetInput {
    #[serde(default)]
    pub facet_type: String,
    #[serde(default = "empty_object")]
    #[schema(value_type = Object)]
    pub payload_preview: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Scan anchoring request
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AnchorScanRequest {
    #[serde(default)]
    pub scan_id: String,
    #[serde(default)]
    pub garment_id: String,
    #[serde(default)]
    pub allowed_facets: Vec<FacetInput>,
    /// `public`, `friends_only` or `private`
    #[serde(default)]
    pub resolved_scope: String,
    #[serde(default)]
    pub policy_version: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AnchorScanResponse {
    pub cardano_tx_hash: String,
    pub midnight_tx_hash: String,
    pub crosschain_root_hash: String,
}

/// Anchor a scan on both ledgers
#[utoipa::path(
    post,
    path = "/tx/anchor-scan",
    request_body = AnchorScanRequest,
    responses(
        (status = 200, description = "Scan anchored", body = AnchorScanResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Anchoring failed", body = ErrorResponse)
    )
)]
pub async fn anchor_scan(
    State(state): State<AppState>,
    payload: Result<Json<AnchorScanRequest>, JsonRejection>,
) -> ApiResult<Json<AnchorScanResponse>> {
    let Json(req) = payload?;
    let facets = req
        .allowed_facets
        .into_iter()
        .map(|f| Facet::new(f.facet_type, f.payload_preview))
        .collect();
    let request = AnchorRequest::from_wire(
        &req.scan_id,
        &req.garment_id,
        &req.resolved_scope,
        facets,
        &req.policy_version,
    )?;

    let result = state.service().anchor(&request).await?;

    Ok(Json(AnchorScanResponse {
        cardano_tx_hash: result.public_tx_id.into_string(),
        midnight_tx_hash: result.private_tx_id.into_string(),
        crosschain_root_hash: result.cross_ledger_root,
    }))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct VerifyRootRequest {
    #[serde(default)]
    pub crosschain_root_hash: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct VerifyRootResponse {
    pub is_consistent: bool,
}

/// Check a cross-ledger root
#[utoipa::path(
    post,
    path = "/tx/verify-root",
    request_body = VerifyRootRequest,
    responses(
        (status = 200, description = "Consistency verdict", body = VerifyRootResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse)
    )
)]
pub async fn verify_root(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRootRequest>, JsonRejection>,
) -> ApiResult<Json<VerifyRootResponse>> {
    let Json(req) = payload?;
    let is_consistent = state
        .verifier()
        .verify_cross_ledger(&req.crosschain_root_hash)
        .await;
    Ok(Json(VerifyRootResponse { is_consistent }))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TxVerifyResponse {
    pub ledger: String,
    pub tx_id: String,
    pub confirmed: bool,
}

/// Confirmation check for a single ledger
#[utoipa::path(
    get,
    path = "/tx/verify/{ledger}/{tx_id}",
    params(
        ("ledger" = String, Path, description = "`public`/`cardano` or `private`/`midnight`"),
        ("tx_id" = String, Path, description = "Transaction id, 64 hex characters")
    ),
    responses(
        (status = 200, description = "Confirmation verdict", body = TxVerifyResponse),
        (status = 400, description = "Unknown ledger", body = ErrorResponse)
    )
)]
pub async fn verify_tx(
    State(state): State<AppState>,
    Path((ledger, tx_id)): Path<(String, String)>,
) -> ApiResult<Json<TxVerifyResponse>> {
    let (ledger, confirmed) = match ledger.as_str() {
        "public" | CARDANO => (CARDANO, state.verifier().verify_public(&tx_id).await),
        "private" | MIDNIGHT => (MIDNIGHT, state.verifier().verify_private(&tx_id).await),
        other => return Err(ApiError::BadRequest(format!("unknown ledger '{}'", other))),
    };
    Ok(Json(TxVerifyResponse {
        ledger: ledger.to_string(),
        tx_id,
        confirmed,
    }))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AnchorEntry {
    pub public_tx_id: String,
    pub private_tx_id: String,
    pub cross_ledger_root: String,
    pub anchored_at: chrono::DateTime<chrono::Utc>,
}

impl From<AnchorRecord> for AnchorEntry {
    fn from(record: AnchorRecord) -> Self {
        Self {
            public_tx_id: record.public_tx_id,
            private_tx_id: record.private_tx_id,
            cross_ledger_root: record.cross_ledger_root,
            anchored_at: record.anchored_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ScanAnchorsResponse {
    pub scan_id: Uuid,
    pub anchors: Vec<AnchorEntry>,
}

/// Anchors recorded for one scan, oldest first
#[utoipa::path(
    get,
    path = "/tx/anchors/{scan_id}",
    params(("scan_id" = Uuid, Path, description = "Scan id")),
    responses(
        (status = 200, description = "Recorded anchors", body = ScanAnchorsResponse),
        (status = 500, description = "Root index unavailable", body = ErrorResponse)
    )
)]
pub async fn scan_anchors(
    State(state): State<AppState>,
    Path(scan_id): Path<Uuid>,
) -> ApiResult<Json<ScanAnchorsResponse>> {
    let records = state
        .verifier()
        .anchors_for_scan(&scan_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(ScanAnchorsResponse {
        scan_id,
        anchors: records.into_iter().map(AnchorEntry::from).collect(),
    }))
}

/// Reveal request opened by the authenticated requester
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RevealSubmitRequest {
    #[serde(default)]
    pub private_tx_id: String,
    /// Approval tokens from distinct approvers, each bound to `private_tx_id`
    #[serde(default)]
    pub approval_tokens: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RevealResponse {
    pub request_id: Uuid,
    pub ticket_id: Uuid,
    pub private_tx_id: String,
    pub requester_id: String,
    pub reason: String,
    /// `authorized` or `rejected`
    pub status: String,
    pub approvals: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

fn state_label(state: RevealState) -> &'static str {
    match state {
        RevealState::Authorized => "authorized",
        RevealState::Rejected => "rejected",
    }
}

impl From<RevealRecord> for RevealResponse {
    fn from(record: RevealRecord) -> Self {
        Self {
            request_id: record.request_id,
            ticket_id: record.ticket.ticket_id,
            private_tx_id: record.private_tx_id,
            requester_id: record.requester_id,
            reason: record.reason,
            status: state_label(record.status).to_string(),
            approvals: record.approvals.into_iter().collect(),
            created_at: record.created_at,
            rejection_reason: record.rejection_reason,
        }
    }
}

fn require_role(claims: &Claims, role: &str) -> ApiResult<()> {
    if claims.has_role(role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!("role '{}' required", role)))
    }
}

/// Requester of the record, or governance
fn require_party(claims: &Claims, record: &RevealRecord) -> ApiResult<()> {
    if claims.sub == record.requester_id || claims.has_role(ROLE_GOVERNANCE) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("not a party to this reveal request".to_string()))
    }
}

/// Open a reveal request
///
/// The requester is the authenticated subject. Approver ids are the subjects
/// of the submitted approval tokens.
#[utoipa::path(
    post,
    path = "/tx/reveal",
    request_body = RevealSubmitRequest,
    responses(
        (status = 200, description = "Reveal authorized", body = RevealResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Quorum not met or approval not valid for this transaction", body = ErrorResponse)
    ),
    security(("jwt" = []))
)]
pub async fn submit_reveal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<RevealSubmitRequest>, JsonRejection>,
) -> ApiResult<Json<RevealResponse>> {
    let Json(req) = payload?;
    require_role(&claims, ROLE_REQUESTER)?;
    if req.approval_tokens.len() > MAX_APPROVALS {
        return Err(ApiError::Validation(ValidationError::single(
            "approval_tokens",
            format!("at most {} approval tokens are accepted", MAX_APPROVALS),
        )));
    }

    let mut approvals = Vec::with_capacity(req.approval_tokens.len());
    for (i, token) in req.approval_tokens.iter().enumerate() {
        let approval = state.jwt_auth().decode(token).map_err(|e| match e {
            ApiError::Unauthorized(msg) => {
                ApiError::Unauthorized(format!("approval_tokens[{}]: {}", i, msg))
            }
            other => other,
        })?;
        if !approval.approves(&req.private_tx_id) {
            return Err(ApiError::Forbidden(format!(
                "approval_tokens[{}] does not approve this transaction",
                i
            )));
        }
        approvals.push(approval.sub);
    }

    let record = state
        .reveals()
        .submit(RevealRequest {
            private_tx_id: req.private_tx_id,
            requester_id: claims.sub,
            approvals,
            reason: req.reason,
        })
        .await?;
    Ok(Json(record.into()))
}

/// Current state of a reveal request
#[utoipa::path(
    get,
    path = "/tx/reveal/{request_id}",
    params(("request_id" = Uuid, Path, description = "Reveal request id")),
    responses(
        (status = 200, description = "Reveal request", body = RevealResponse),
        (status = 403, description = "Not the requester or governance", body = ErrorResponse),
        (status = 404, description = "Unknown request", body = ErrorResponse)
    ),
    security(("jwt" = []))
)]
pub async fn get_reveal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<Uuid>,
) -> ApiResult<Json<RevealResponse>> {
    let record = state.reveals().get(&request_id).await?;
    require_party(&claims, &record)?;
    Ok(Json(record.into()))
}

/// Reveal requests for one private transaction, oldest first
#[utoipa::path(
    get,
    path = "/tx/reveals/{private_tx_id}",
    params(("private_tx_id" = String, Path, description = "Private transaction id")),
    responses(
        (status = 200, description = "Stored requests", body = [RevealResponse]),
        (status = 403, description = "Governance role required", body = ErrorResponse)
    ),
    security(("jwt" = []))
)]
pub async fn reveals_for_transaction(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(private_tx_id): Path<String>,
) -> ApiResult<Json<Vec<RevealResponse>>> {
    require_role(&claims, ROLE_GOVERNANCE)?;
    let records = state.reveals().for_transaction(&private_tx_id).await;
    Ok(Json(records.into_iter().map(RevealResponse::from).collect()))
}

/// Governance rejection of a reveal request
#[utoipa::path(
    post,
    path = "/tx/reveal/{request_id}/reject",
    params(("request_id" = Uuid, Path, description = "Reveal request id")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Request rejected", body = RevealResponse),
        (status = 403, description = "Governance role required", body = ErrorResponse),
        (status = 404, description = "Unknown request", body = ErrorResponse),
        (status = 409, description = "Already rejected", body = ErrorResponse)
    ),
    security(("jwt" = []))
)]
pub async fn reject_reveal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<Uuid>,
    payload: Result<Json<RejectRequest>, JsonRejection>,
) -> ApiResult<Json<RevealResponse>> {
    let Json(req) = payload?;
    require_role(&claims, ROLE_GOVERNANCE)?;
    let record = state.reveals().reject(&request_id, &req.reason).await?;
    tracing::info!(request_id = %request_id, by = %claims.sub, "Reveal rejected by governance");
    Ok(Json(record.into()))
}

/// Sealed facet taken from a private anchor payload
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UnsealRequest {
    pub scan_id: Uuid,
    pub facet_type: String,
    pub nonce: String,
    pub ciphertext: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UnsealResponse {
    pub facet_type: String,
    #[schema(value_type = Object)]
    pub payload_preview: serde_json::Value,
}

/// Decrypt a sealed facet under an authorized reveal
///
/// Only the requester the ticket was issued to may unseal.
#[utoipa::path(
    post,
    path = "/tx/reveal/{request_id}/unseal",
    params(("request_id" = Uuid, Path, description = "Reveal request id")),
    request_body = UnsealRequest,
    responses(
        (status = 200, description = "Decrypted facet", body = UnsealResponse),
        (status = 400, description = "Sealed facet is corrupt", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Not the requester, or ticket does not authorize", body = ErrorResponse),
        (status = 404, description = "Unknown request", body = ErrorResponse)
    ),
    security(("jwt" = []))
)]
pub async fn unseal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<Uuid>,
    payload: Result<Json<UnsealRequest>, JsonRejection>,
) -> ApiResult<Json<UnsealResponse>> {
    let Json(req) = payload?;
    let reveals = state.reveals();
    let record = reveals.get(&request_id).await?;
    if claims.sub != record.ticket.requester_id {
        return Err(ApiError::Forbidden(
            "ticket was issued to another requester".to_string(),
        ));
    }
    let ticket = reveals
        .ticket(&record.ticket.ticket_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("ticket for request {}", request_id)))?;

    let sealed = SealedFacet {
        facet_type: req.facet_type,
        nonce: req.nonce,
        ciphertext: req.ciphertext,
    };
    let payload_preview =
        state
            .sealer()
            .open(&sealed, &req.scan_id, &record.private_tx_id, &ticket)?;
    tracing::info!(
        request_id = %request_id,
        tx_id = %record.private_tx_id,
        facet_type = %sealed.facet_type,
        "Sealed facet opened"
    );

    Ok(Json(UnsealResponse {
        facet_type: sealed.facet_type,
        payload_preview,
    }))
}

/// OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Twin Anchor API",
        description = "Dual-ledger scan anchoring with quorum-gated reveal"
    ),
    paths(
        health,
        health_detailed,
        anchor_scan,
        verify_root,
        verify_tx,
        scan_anchors,
        submit_reveal,
        get_reveal,
        reveals_for_transaction,
        reject_reveal,
        unseal,
    ),
    components(
        schemas(
            HealthResponse, ComponentHealth, ComponentStatus,
            FacetInput, AnchorScanRequest, AnchorScanResponse,
            VerifyRootRequest, VerifyRootResponse, TxVerifyResponse,
            AnchorEntry, ScanAnchorsResponse,
            RevealSubmitRequest, RejectRequest, RevealResponse,
            UnsealRequest, UnsealResponse,
            ErrorResponse, crate::error::ErrorBody,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Build the API router
///
/// Reveal routes require a bearer token.
pub fn api_router(state: AppState) -> Router {
    let reveal = Router::new()
        .route("/tx/reveal", post(submit_reveal))
        .route("/tx/reveal/{request_id}", get(get_reveal))
        .route("/tx/reveal/{request_id}/reject", post(reject_reveal))
        .route("/tx/reveal/{request_id}/unseal", post(unseal))
        .route("/tx/reveals/{private_tx_id}", get(reveals_for_transaction))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        // Documentation
        .route("/api-docs/openapi.json", get(openapi_json))
        // Health
        .route("/health", get(health))
        .route("/health/detailed", get(health_detailed))
        // Anchoring and verification
        .route("/tx/anchor-scan", post(anchor_scan))
        .route("/tx/verify-root", post(verify_root))
        .route("/tx/verify/{ledger}/{tx_id}", get(verify_tx))
        .route("/tx/anchors/{scan_id}", get(scan_anchors))
        // Controlled reveal
        .merge(reveal)
        .with_state(state)
}
