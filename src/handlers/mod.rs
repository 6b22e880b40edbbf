//! HTTP handlers and request/response DTOs.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{MoneyInfo, MoneyPatch, Party, TransactionStatus};
use crate::error::AppError;
use crate::services::{CreateRequest, StatusView};
use crate::AppState;

pub async fn health() -> &'static str {
    "OK"
}

/// Pull the bearer token out of the Authorization header. A bare token
/// without the `Bearer ` prefix is accepted as well.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    Some(value.strip_prefix("Bearer ").unwrap_or(value))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub auth_token: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let auth_token = state.service.login(&payload.email, &payload.password).await?;

    Ok(Json(LoginResponse { auth_token }))
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub idempotency_token: String,
    pub money_info: MoneyInfo,
    pub sender: Option<Party>,
    pub receiver: Party,
}

#[derive(Debug, Serialize)]
pub struct CreateTransactionResponse {
    pub transaction_id: Uuid,
}

pub async fn create_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let transaction = state
        .service
        .create(
            bearer_token(&headers),
            CreateRequest {
                idempotency_token: payload.idempotency_token,
                money_info: payload.money_info,
                sender: payload.sender,
                receiver: payload.receiver,
            },
        )
        .await?;

    Ok(Json(CreateTransactionResponse {
        transaction_id: transaction.id,
    }))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub transaction_status: Option<TransactionStatus>,
    pub pending: bool,
}

pub async fn retrieve_transaction_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.service.status(bearer_token(&headers), id).await?;

    let response = match view {
        StatusView::Pending => StatusResponse {
            transaction_status: None,
            pending: true,
        },
        StatusView::Available(status) => StatusResponse {
            transaction_status: Some(status),
            pending: false,
        },
    };

    Ok(Json(response))
}

pub async fn retrieve_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let transaction = state.service.retrieve(bearer_token(&headers), id).await?;

    Ok(Json(transaction))
}

pub async fn edit_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(patch): Json<MoneyPatch>,
) -> Result<impl IntoResponse, AppError> {
    let transaction = state
        .service
        .edit(bearer_token(&headers), id, patch)
        .await?;

    Ok(Json(transaction))
}

#[derive(Debug, Deserialize)]
pub struct AcceptTransactionRequest {
    pub sender: Party,
}

pub async fn accept_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<AcceptTransactionRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .service
        .accept(bearer_token(&headers), id, payload.sender)
        .await?;

    Ok(StatusCode::OK)
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelTransactionRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn cancel_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    payload: Option<Json<CancelTransactionRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let reason = payload.and_then(|Json(body)| body.reason);

    state
        .service
        .cancel(bearer_token(&headers), id, reason)
        .await?;

    Ok(StatusCode::OK)
}
