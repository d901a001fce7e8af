//! Axum request handlers for the local agent API.
//!
//! Bodies that fail to parse are answered with `400` and the usual
//! `{code, message}` error body rather than Axum's plain-text rejection.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use common::protocol::{
    DecryptRequest, DecryptResponse, EncryptRequest, EncryptResponse, ErrorResponse,
    HealthResponse, PassphraseStatusResponse, RotateRequest, RotateResponse,
    RotationStatusResponse, SetPassphraseRequest,
};
use serde_json::Value;
use tracing::info;

use super::error::ApiError;
use super::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// `GET /health`: liveness plus session state. Always `200`.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let passphrase_active = state.session.is_active().await;
    Json(HealthResponse {
        status: if passphrase_active { "ok" } else { "locked" }.into(),
        passphrase_active,
        rotation_running: state.session.is_rotating(),
    })
}

/// `GET /passphrase`
pub async fn passphrase_status(State(state): State<AppState>) -> Json<PassphraseStatusResponse> {
    Json(PassphraseStatusResponse {
        active: state.session.is_active().await,
    })
}

/// `PUT /passphrase`: activate (and persist) a passphrase.
pub async fn set_passphrase(
    State(state): State<AppState>,
    body: Result<Json<SetPassphraseRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(req) = body?;
    state.session.set_passphrase(&req.passphrase).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /passphrase`: forget the passphrase in memory and on disk.
pub async fn clear_passphrase(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.session.clear_passphrase().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /encrypt`: seal `value` under the active passphrase.
pub async fn encrypt(
    State(state): State<AppState>,
    body: Result<Json<EncryptRequest>, JsonRejection>,
) -> ApiResult<Json<EncryptResponse>> {
    let Json(req) = body?;
    let envelope = state.session.encrypt_payload(&req.value).await?;
    Ok(Json(EncryptResponse { envelope }))
}

/// `POST /decrypt`: open an envelope with the active passphrase.
///
/// Every cryptographic failure is reported as the same `422 decryption_failed`.
pub async fn decrypt(
    State(state): State<AppState>,
    body: Result<Json<DecryptRequest>, JsonRejection>,
) -> ApiResult<Json<DecryptResponse>> {
    let Json(req) = body?;
    let value: Value = state.session.decrypt_payload(&req.envelope).await?;
    Ok(Json(DecryptResponse { value }))
}

/// `POST /rotate`: re-encrypt every record of `ownerId` under the new passphrase.
///
/// Answers once the whole sweep has settled. Per-record failures are part of
/// the `200` body; only an invalid request or a concurrent rotation is an error.
pub async fn rotate(
    State(state): State<AppState>,
    body: Result<Json<RotateRequest>, JsonRejection>,
) -> ApiResult<Json<RotateResponse>> {
    let Json(req) = body?;
    info!(owner_id = %req.owner_id, "rotation requested");
    let report = state
        .rotation
        .rotate(&req.owner_id, &req.old_passphrase, &req.new_passphrase)
        .await?;
    Ok(Json(report.into()))
}

/// `GET /rotate/status`: progress of the running or most recent rotation.
pub async fn rotation_status(State(state): State<AppState>) -> Json<RotationStatusResponse> {
    let status = state.rotation.status().current();
    Json(RotationStatusResponse {
        state: status.state().into(),
        message: status.to_string(),
    })
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        routing::{get, post, put},
        Router,
    };
    use axum_test::TestServer;
    use common::{Envelope, RecordKind};
    use serde_json::json;

    use super::*;
    use crate::crypto;
    use crate::records::memory::InMemoryRecordStore;

    fn test_server(records: Arc<InMemoryRecordStore>) -> (TestServer, AppState) {
        let state = AppState::for_tests(records);
        let app = Router::new()
            .route("/health", get(health))
            .route(
                "/passphrase",
                put(set_passphrase).get(passphrase_status).delete(clear_passphrase),
            )
            .route("/encrypt", post(encrypt))
            .route("/decrypt", post(decrypt))
            .route("/rotate", post(rotate))
            .route("/rotate/status", get(rotation_status))
            .with_state(state.clone());
        (TestServer::new(app).unwrap(), state)
    }

    async fn unlocked(server: &TestServer, passphrase: &str) {
        server
            .put("/passphrase")
            .json(&json!({ "passphrase": passphrase }))
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn health_reports_locked_until_passphrase_set() {
        let (server, _) = test_server(Arc::new(InMemoryRecordStore::new()));

        let body: HealthResponse = server.get("/health").await.json();
        assert_eq!(body.status, "locked");
        assert!(!body.passphrase_active);

        unlocked(&server, "correct horse").await;
        let body: HealthResponse = server.get("/health").await.json();
        assert_eq!(body.status, "ok");
        assert!(body.passphrase_active);
        assert!(!body.rotation_running);
    }

    #[tokio::test]
    async fn encrypt_requires_active_passphrase() {
        let (server, _) = test_server(Arc::new(InMemoryRecordStore::new()));

        let resp = server.post("/encrypt").json(&json!({ "value": {"a": 1} })).await;
        resp.assert_status(StatusCode::CONFLICT);
        let err: ErrorResponse = resp.json();
        assert_eq!(err.code, "no_active_passphrase");
    }

    #[tokio::test]
    async fn encrypt_then_decrypt_round_trips() {
        let (server, _) = test_server(Arc::new(InMemoryRecordStore::new()));
        unlocked(&server, "correct horse").await;

        let value = json!({"client": "Acme", "rateCents": 12_500});
        let sealed: EncryptResponse = server
            .post("/encrypt")
            .json(&json!({ "value": value }))
            .await
            .json();
        assert_eq!(sealed.envelope.alg, "AES-GCM");
        assert_eq!(sealed.envelope.iterations, 120_000);

        let opened: DecryptResponse = server
            .post("/decrypt")
            .json(&json!({ "envelope": sealed.envelope }))
            .await
            .json();
        assert_eq!(opened.value, value);
    }

    #[tokio::test]
    async fn decrypt_with_wrong_passphrase_is_generic_422() {
        let (server, _) = test_server(Arc::new(InMemoryRecordStore::new()));
        unlocked(&server, "correct horse").await;
        let foreign = crypto::encrypt(&json!("secret"), "battery staple").unwrap();

        let resp = server.post("/decrypt").json(&json!({ "envelope": foreign })).await;
        resp.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let err: ErrorResponse = resp.json();
        assert_eq!(err.code, "decryption_failed");
        assert_eq!(err.message, "decryption failed");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (server, _) = test_server(Arc::new(InMemoryRecordStore::new()));

        let resp = server.post("/encrypt").text("not json").await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        let err: ErrorResponse = resp.json();
        assert_eq!(err.code, "bad_request");
    }

    #[tokio::test]
    async fn empty_passphrase_is_rejected() {
        let (server, _) = test_server(Arc::new(InMemoryRecordStore::new()));

        server
            .put("/passphrase")
            .json(&json!({ "passphrase": "" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        let status: PassphraseStatusResponse = server.get("/passphrase").await.json();
        assert!(!status.active);
    }

    #[tokio::test]
    async fn clear_passphrase_locks_the_session() {
        let (server, _) = test_server(Arc::new(InMemoryRecordStore::new()));
        unlocked(&server, "correct horse").await;

        server.delete("/passphrase").await.assert_status(StatusCode::NO_CONTENT);

        let status: PassphraseStatusResponse = server.get("/passphrase").await.json();
        assert!(!status.active);
        server
            .post("/encrypt")
            .json(&json!({ "value": 1 }))
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn rotate_reports_outcomes_and_switches_passphrase() {
        let records = Arc::new(InMemoryRecordStore::new());
        let env = crypto::encrypt(&json!({"amount": 42}), "old-pass").unwrap();
        records.insert_encrypted(RecordKind::Income, "i1", "u1", env);
        records.insert_plain(RecordKind::Todos, "t1", "u1", json!({"title": "file taxes"}));
        let (server, _) = test_server(records.clone());
        unlocked(&server, "old-pass").await;

        let resp = server
            .post("/rotate")
            .json(&json!({
                "ownerId": "u1",
                "oldPassphrase": "old-pass",
                "newPassphrase": "new-pass"
            }))
            .await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["status"], "completed");
        assert_eq!(body["outcomes"].as_array().unwrap().len(), 2);
        assert!(body["jobId"].is_string());

        // The session now opens records sealed under the new passphrase.
        let rotated: Envelope = records.envelope(RecordKind::Income, "i1");
        let opened: DecryptResponse = server
            .post("/decrypt")
            .json(&json!({ "envelope": rotated }))
            .await
            .json();
        assert_eq!(opened.value, json!({"amount": 42}));

        let status: RotationStatusResponse = server.get("/rotate/status").await.json();
        assert_eq!(status.state, "completed");
        assert_eq!(status.message, "rotation completed: 1 re-encrypted, 1 unencrypted skipped");
    }

    #[tokio::test]
    async fn rotate_rejects_identical_passphrases() {
        let (server, _) = test_server(Arc::new(InMemoryRecordStore::new()));

        let resp = server
            .post("/rotate")
            .json(&json!({"ownerId": "u1", "oldPassphrase": "same", "newPassphrase": "same"}))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        let err: ErrorResponse = resp.json();
        assert!(err.message.contains("must differ"));
    }

    #[tokio::test]
    async fn passphrase_change_blocked_during_rotation() {
        let (server, state) = test_server(Arc::new(InMemoryRecordStore::new()));
        let _guard = state.session.begin_rotation().await.unwrap();

        let resp = server.put("/passphrase").json(&json!({ "passphrase": "x" })).await;
        resp.assert_status(StatusCode::CONFLICT);
        let err: ErrorResponse = resp.json();
        assert_eq!(err.code, "rotation_in_progress");

        let health: HealthResponse = server.get("/health").await.json();
        assert!(health.rotation_running);
    }

    #[tokio::test]
    async fn status_is_idle_before_any_rotation() {
        let (server, _) = test_server(Arc::new(InMemoryRecordStore::new()));
        let status: RotationStatusResponse = server.get("/rotate/status").await.json();
        assert_eq!(status.state, "idle");
    }
}
