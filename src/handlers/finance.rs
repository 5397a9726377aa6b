// src/handlers/finance.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::get_rls_transaction,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{GestaoFinanceira, RequirePapel},
    },
    models::{
        finance::{
            AtualizarStatusPagarPayload, AtualizarStatusReceberPayload, CreateCategoriaPayload,
            CreateContaPagarPayload, CreateContaReceberPayload, FiltroContas, StatusContaPagar,
            StatusContaReceber, TipoConta,
        },
        recurrence::ResumoGeracaoResponse,
    },
};

// =============================================================================
//  1. CATEGORIAS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CategoriasQuery {
    pub tipo: Option<TipoConta>,
}

// GET /api/financeiro/categorias
pub async fn list_categorias(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(query): Query<CategoriasQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = get_rls_transaction(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let categorias = app_state.finance_service
        .list_categorias(&mut *tx, query.tipo)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tx.commit().await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(categorias)))
}

// POST /api/financeiro/categorias
pub async fn create_categoria(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _papel: RequirePapel<GestaoFinanceira>,
    Json(payload): Json<CreateCategoriaPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let mut tx = get_rls_transaction(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let categoria = app_state.finance_service
        .create_categoria(&mut *tx, &payload.nome, payload.tipo)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tx.commit().await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(categoria)))
}

// =============================================================================
//  2. CONTAS A PAGAR
// =============================================================================

// POST /api/financeiro/contas-pagar
pub async fn create_conta_pagar(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _papel: RequirePapel<GestaoFinanceira>,
    Json(payload): Json<CreateContaPagarPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let mut tx = get_rls_transaction(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let conta = app_state.finance_service
        .create_conta_pagar(&mut *tx, payload, user.0.id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tx.commit().await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(conta)))
}

// GET /api/financeiro/contas-pagar?status=&de=&ate=
pub async fn list_contas_pagar(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(filtro): Query<FiltroContas<StatusContaPagar>>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = get_rls_transaction(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let contas = app_state.finance_service
        .list_contas_pagar(&mut *tx, &filtro)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tx.commit().await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(contas)))
}

// GET /api/financeiro/contas-pagar/{id}
pub async fn get_conta_pagar(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = get_rls_transaction(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let conta = app_state.finance_service
        .get_conta_pagar(&mut *tx, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tx.commit().await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(conta)))
}

// PATCH /api/financeiro/contas-pagar/{id}/status
pub async fn update_status_conta_pagar(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _papel: RequirePapel<GestaoFinanceira>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AtualizarStatusPagarPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = get_rls_transaction(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let conta = app_state.finance_service
        .update_status_conta_pagar(&mut *tx, id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tx.commit().await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(conta)))
}

// DELETE /api/financeiro/contas-pagar/{id}
pub async fn delete_conta_pagar(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _papel: RequirePapel<GestaoFinanceira>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = get_rls_transaction(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    app_state.finance_service
        .delete_conta_pagar(&mut *tx, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tx.commit().await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  3. CONTAS A RECEBER
// =============================================================================

// POST /api/financeiro/contas-receber
pub async fn create_conta_receber(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _papel: RequirePapel<GestaoFinanceira>,
    Json(payload): Json<CreateContaReceberPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let mut tx = get_rls_transaction(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let conta = app_state.finance_service
        .create_conta_receber(&mut *tx, payload, user.0.id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tx.commit().await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(conta)))
}

// GET /api/financeiro/contas-receber?status=&de=&ate=
pub async fn list_contas_receber(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(filtro): Query<FiltroContas<StatusContaReceber>>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = get_rls_transaction(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let contas = app_state.finance_service
        .list_contas_receber(&mut *tx, &filtro)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tx.commit().await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(contas)))
}

// GET /api/financeiro/contas-receber/{id}
pub async fn get_conta_receber(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = get_rls_transaction(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let conta = app_state.finance_service
        .get_conta_receber(&mut *tx, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tx.commit().await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(conta)))
}

// PATCH /api/financeiro/contas-receber/{id}/status
pub async fn update_status_conta_receber(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _papel: RequirePapel<GestaoFinanceira>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AtualizarStatusReceberPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = get_rls_transaction(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let conta = app_state.finance_service
        .update_status_conta_receber(&mut *tx, id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tx.commit().await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(conta)))
}

// DELETE /api/financeiro/contas-receber/{id}
pub async fn delete_conta_receber(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _papel: RequirePapel<GestaoFinanceira>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = get_rls_transaction(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    app_state.finance_service
        .delete_conta_receber(&mut *tx, id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tx.commit().await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  4. ROTINAS (RECORRÊNCIA E VENCIMENTOS)
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct DataReferenciaQuery {
    /// Padrão: hoje
    pub data: Option<NaiveDate>,
}

// POST /api/financeiro/recorrencias/gerar
pub async fn gerar_recorrencias(
    State(app_state): State<AppState>,
    locale: Locale,
    _papel: RequirePapel<GestaoFinanceira>,
    Query(query): Query<DataReferenciaQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let hoje = query.data.unwrap_or_else(|| chrono::Utc::now().date_naive());

    let resumo = app_state.recurrence_service
        .executar(hoje)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(ResumoGeracaoResponse::from(resumo))))
}

// POST /api/financeiro/vencidas/marcar
pub async fn marcar_vencidas(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _papel: RequirePapel<GestaoFinanceira>,
    Query(query): Query<DataReferenciaQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let hoje = query.data.unwrap_or_else(|| chrono::Utc::now().date_naive());

    // Gera as sucessoras antes: recorrente vencida sem sucessora não é marcada
    app_state.recurrence_service
        .executar(hoje)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let mut tx = get_rls_transaction(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let resultado = app_state.finance_service
        .marcar_vencidas(&mut *tx, hoje)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tx.commit().await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(resultado)))
}
