//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::balance::BalanceValidation;
use crate::domain::{AccountMovement, MovementType, OperationContext};
use crate::error::{LedgerError, LedgerResult};
use crate::handlers::{AccountBalance, CreateMovementCommand, CreateMovementHandler, LedgerQueries};
use crate::jobs::{MonthlySnapshotReport, SnapshotGenerator};
use crate::lock::LockManager;
use crate::store::{Page, PageRequest, TransactionManager};

use super::middleware::BUSINESS_ID_HEADER;

// =========================================================================
// Application state
// =========================================================================

/// Handlers shared by all routes
pub struct AppState<T: TransactionManager, L: LockManager> {
    pub movements: CreateMovementHandler<T, L>,
    pub queries: LedgerQueries<T>,
    pub snapshots: SnapshotGenerator<T>,
}

impl<T: TransactionManager, L: LockManager> Clone for AppState<T, L> {
    fn clone(&self) -> Self {
        Self {
            movements: self.movements.clone(),
            queries: self.queries.clone(),
            snapshots: self.snapshots.clone(),
        }
    }
}

// =========================================================================
// Request types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct CreateMovementRequest {
    pub movement_type: MovementType,
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateWithdrawalRequest {
    pub amount: Decimal,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router<T: TransactionManager, L: LockManager>() -> Router<AppState<T, L>> {
    Router::new()
        .route(
            "/accounts/:account_id/movements",
            post(create_movement::<T, L>).get(list_movements::<T, L>),
        )
        .route("/accounts/:account_id/balance", get(get_balance::<T, L>))
        .route(
            "/accounts/:account_id/withdrawals/validate",
            post(validate_withdrawal::<T, L>),
        )
        .route("/movements/:movement_id", get(get_movement::<T, L>))
        .route("/admin/snapshots", post(create_snapshots::<T, L>))
}

/// Tenant of the request, from the X-Business-Id header
fn business_id(context: &OperationContext) -> LedgerResult<Uuid> {
    context.business_id.ok_or_else(|| {
        LedgerError::InvalidRequest(format!("Missing required header: {}", BUSINESS_ID_HEADER))
    })
}

// =========================================================================
// POST /accounts/:account_id/movements
// =========================================================================

async fn create_movement<T: TransactionManager, L: LockManager>(
    State(state): State<AppState<T, L>>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<Uuid>,
    Json(request): Json<CreateMovementRequest>,
) -> Result<(StatusCode, Json<AccountMovement>), LedgerError> {
    let business_id = business_id(&context)?;

    let command =
        CreateMovementCommand::new(account_id, business_id, request.movement_type, request.amount);
    let command = match request.description {
        Some(description) => command.with_description(description),
        None => command,
    };

    let movement = state.movements.execute(command).await?;

    Ok((StatusCode::CREATED, Json(movement)))
}

// =========================================================================
// GET /accounts/:account_id/movements
// =========================================================================

async fn list_movements<T: TransactionManager, L: LockManager>(
    State(state): State<AppState<T, L>>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<Uuid>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<AccountMovement>>, LedgerError> {
    let business_id = business_id(&context)?;

    let page = state
        .queries
        .list_movements(account_id, business_id, &page)
        .await?;

    Ok(Json(page))
}

// =========================================================================
// GET /accounts/:account_id/balance
// =========================================================================

async fn get_balance<T: TransactionManager, L: LockManager>(
    State(state): State<AppState<T, L>>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<AccountBalance>, LedgerError> {
    let business_id = business_id(&context)?;

    let balance = state.queries.current_balance(account_id, business_id).await?;

    Ok(Json(balance))
}

// =========================================================================
// POST /accounts/:account_id/withdrawals/validate
// =========================================================================

async fn validate_withdrawal<T: TransactionManager, L: LockManager>(
    State(state): State<AppState<T, L>>,
    Extension(context): Extension<OperationContext>,
    Path(account_id): Path<Uuid>,
    Json(request): Json<ValidateWithdrawalRequest>,
) -> Result<Json<BalanceValidation>, LedgerError> {
    let business_id = business_id(&context)?;

    let validation = state
        .queries
        .validate_balance(account_id, business_id, request.amount)
        .await?;

    Ok(Json(validation))
}

// =========================================================================
// GET /movements/:movement_id
// =========================================================================

async fn get_movement<T: TransactionManager, L: LockManager>(
    State(state): State<AppState<T, L>>,
    Extension(context): Extension<OperationContext>,
    Path(movement_id): Path<Uuid>,
) -> Result<Json<AccountMovement>, LedgerError> {
    let business_id = business_id(&context)?;

    let movement = state.queries.get_movement(movement_id, business_id).await?;

    Ok(Json(movement))
}

// =========================================================================
// POST /admin/snapshots
// =========================================================================

async fn create_snapshots<T: TransactionManager, L: LockManager>(
    State(state): State<AppState<T, L>>,
) -> Result<Json<MonthlySnapshotReport>, LedgerError> {
    let report = state
        .snapshots
        .create_monthly_snapshots()
        .await
        .map_err(|e| LedgerError::InternalServerError(e.to_string()))?;

    Ok(Json(report))
}
