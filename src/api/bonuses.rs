use aide::axum::routing::{get_with, post_with};
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::{Path, Query};
use axum::Json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::database::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::models;
use crate::request_state::RequestState;

use super::requests::{RequestStatusDto, RequestStatusFilterDto};

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/employee/:id/bonuses",
            post_with(create_bonus, create_bonus_docs),
        )
        .api_route(
            "/employee/:id/payouts",
            get_with(list_employee_payouts, list_employee_payouts_docs),
        )
        .api_route("/bonuses", get_with(list_bonuses, list_bonuses_docs))
        .api_route(
            "/bonus/:id/approve",
            post_with(approve_bonus, approve_bonus_docs),
        )
        .api_route(
            "/bonus/:id/reject",
            post_with(reject_bonus, reject_bonus_docs),
        )
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum BonusTypeDto {
    Eur,
    Points,
}
impl From<&models::BonusType> for BonusTypeDto {
    fn from(value: &models::BonusType) -> Self {
        match value {
            models::BonusType::Eur => BonusTypeDto::Eur,
            models::BonusType::Points => BonusTypeDto::Points,
        }
    }
}
impl From<BonusTypeDto> for models::BonusType {
    fn from(value: BonusTypeDto) -> Self {
        match value {
            BonusTypeDto::Eur => models::BonusType::Eur,
            BonusTypeDto::Points => models::BonusType::Points,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct BonusRequestDto {
    pub id: u64,
    pub employee_id: u64,
    pub proposed_by_id: u64,
    pub bonus_type: BonusTypeDto,
    /// Cents for EUR bonuses, points otherwise.
    pub value: i64,
    pub status: RequestStatusDto,
    pub created_at: String,
}

impl From<&models::BonusRequest> for BonusRequestDto {
    fn from(value: &models::BonusRequest) -> Self {
        Self {
            id: value.id.to_owned(),
            employee_id: value.employee_id.to_owned(),
            proposed_by_id: value.proposed_by_id.to_owned(),
            bonus_type: (&value.bonus_type).into(),
            value: value.value,
            status: (&value.status).into(),
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct BonusPayoutDto {
    pub id: u64,
    pub employee_id: u64,
    pub bonus_request_id: u64,
    pub amount_cents: i64,
    pub created_at: String,
}

impl From<&models::BonusPayout> for BonusPayoutDto {
    fn from(value: &models::BonusPayout) -> Self {
        Self {
            id: value.id.to_owned(),
            employee_id: value.employee_id.to_owned(),
            bonus_request_id: value.bonus_request_id.to_owned(),
            amount_cents: value.amount_cents,
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct CreateBonusDto {
    pub bonus_type: BonusTypeDto,
    pub value: i64,
}

async fn create_bonus(
    mut state: RequestState,
    Path(id): Path<u64>,
    form: Json<CreateBonusDto>,
) -> ServiceResult<Json<BonusRequestDto>> {
    let manager = state.session_require_manager()?;

    let form = form.0;

    if form.value <= 0 {
        return Err(ServiceError::BadRequest(
            "Bonus value must be positive.".to_string(),
        ));
    }
    if state.db.get_employee_by_id(id).await?.is_none() {
        return Err(ServiceError::NotFound);
    }

    let bonus = state
        .db
        .create_bonus_request(id, manager.id, form.bonus_type.into(), form.value)
        .await?;
    Ok(Json(BonusRequestDto::from(&bonus)))
}

fn create_bonus_docs(op: TransformOperation) -> TransformOperation {
    op.description("Propose a monthly bonus for an employee.")
        .tag("bonuses")
        .response::<200, Json<BonusRequestDto>>()
        .response_with::<400, (), _>(|res| {
            res.description("Bonus value must be positive and within the points range!")
        })
        .response_with::<404, (), _>(|res| res.description("The requested employee does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}

pub async fn list_bonuses(
    mut state: RequestState,
    Query(filter): Query<RequestStatusFilterDto>,
) -> ServiceResult<Json<Vec<BonusRequestDto>>> {
    state.session_require_manager()?;

    let bonuses = state
        .db
        .get_bonus_requests(filter.status.map(Into::into))
        .await?;
    Ok(Json(bonuses.iter().map(|b| b.into()).collect()))
}

fn list_bonuses_docs(op: TransformOperation) -> TransformOperation {
    op.description("List all bonus requests, optionally filtered by status.")
        .tag("bonuses")
        .response::<200, Json<Vec<BonusRequestDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}

pub async fn list_employee_payouts(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<Vec<BonusPayoutDto>>> {
    state.session_require_manager_or_self(id)?;

    let payouts = state.db.get_payouts_by_employee(id).await?;
    Ok(Json(payouts.iter().map(|p| p.into()).collect()))
}

fn list_employee_payouts_docs(op: TransformOperation) -> TransformOperation {
    op.description("List the bonus payouts of an employee.")
        .tag("bonuses")
        .response::<200, Json<Vec<BonusPayoutDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager", "self"])
}

async fn approve_bonus(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<BonusRequestDto>> {
    state.session_require_manager()?;

    let bonus = state.db.approve_bonus(id).await?;
    Ok(Json(BonusRequestDto::from(&bonus)))
}

fn approve_bonus_docs(op: TransformOperation) -> TransformOperation {
    op.description(
        "Approve a pending bonus. POINTS bonuses are written to the ledger, EUR bonuses become payouts.",
    )
    .tag("bonuses")
    .response::<200, Json<BonusRequestDto>>()
    .response_with::<404, (), _>(|res| res.description("The requested bonus does not exist!"))
    .response_with::<409, (), _>(|res| res.description("The bonus was already processed!"))
    .response_with::<401, (), _>(|res| res.description("Missing login!"))
    .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
    .security_requirement_scopes("SessionToken", ["manager"])
}

async fn reject_bonus(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<BonusRequestDto>> {
    state.session_require_manager()?;

    let bonus = state.db.reject_bonus(id).await?;
    Ok(Json(BonusRequestDto::from(&bonus)))
}

fn reject_bonus_docs(op: TransformOperation) -> TransformOperation {
    op.description("Reject a pending bonus.")
        .tag("bonuses")
        .response::<200, Json<BonusRequestDto>>()
        .response_with::<404, (), _>(|res| res.description("The requested bonus does not exist!"))
        .response_with::<409, (), _>(|res| res.description("The bonus was already processed!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}
