use aide::axum::routing::{get_with, post_with, put_with};
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::{Path, Query};
use axum::Json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::database::AppState;
use crate::error::ServiceResult;
use crate::models;
use crate::request_state::RequestState;

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/employee/:id/redemptions",
            get_with(list_employee_redemptions, list_employee_redemptions_docs)
                .post_with(create_redemption, create_redemption_docs),
        )
        .api_route(
            "/redemptions",
            get_with(list_redemptions, list_redemptions_docs),
        )
        .api_route(
            "/redemption/:id",
            put_with(update_redemption, update_redemption_docs),
        )
        .api_route(
            "/redemption/:id/cancel",
            post_with(cancel_redemption, cancel_redemption_docs),
        )
        .api_route(
            "/redemption/:id/approve",
            post_with(approve_redemption, approve_redemption_docs),
        )
        .api_route(
            "/redemption/:id/reject",
            post_with(reject_redemption, reject_redemption_docs),
        )
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum RedemptionStatusDto {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}
impl From<&models::RedemptionStatus> for RedemptionStatusDto {
    fn from(value: &models::RedemptionStatus) -> Self {
        match value {
            models::RedemptionStatus::Pending => RedemptionStatusDto::Pending,
            models::RedemptionStatus::Approved => RedemptionStatusDto::Approved,
            models::RedemptionStatus::Rejected => RedemptionStatusDto::Rejected,
            models::RedemptionStatus::Cancelled => RedemptionStatusDto::Cancelled,
        }
    }
}
impl From<RedemptionStatusDto> for models::RedemptionStatus {
    fn from(value: RedemptionStatusDto) -> Self {
        match value {
            RedemptionStatusDto::Pending => models::RedemptionStatus::Pending,
            RedemptionStatusDto::Approved => models::RedemptionStatus::Approved,
            RedemptionStatusDto::Rejected => models::RedemptionStatus::Rejected,
            RedemptionStatusDto::Cancelled => models::RedemptionStatus::Cancelled,
        }
    }
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct RedemptionStatusFilterDto {
    pub status: Option<RedemptionStatusDto>,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct RedemptionDto {
    pub id: u64,
    pub employee_id: u64,
    pub reward_id: u64,
    pub points_cost: i32,
    pub note: Option<String>,
    pub status: RedemptionStatusDto,
    /// Echo this value back on cancel/edit. A stale version is rejected.
    pub version: i32,
    pub delivered_code: Option<String>,
    pub created_at: String,
}

impl From<&models::Redemption> for RedemptionDto {
    fn from(value: &models::Redemption) -> Self {
        Self {
            id: value.id.to_owned(),
            employee_id: value.employee_id.to_owned(),
            reward_id: value.reward_id.to_owned(),
            points_cost: value.points_cost,
            note: value.note.to_owned(),
            status: (&value.status).into(),
            version: value.version,
            delivered_code: value.delivered_code.to_owned(),
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct CreateRedemptionDto {
    pub reward_id: u64,
    pub note: Option<String>,
}

async fn create_redemption(
    mut state: RequestState,
    Path(id): Path<u64>,
    form: Json<CreateRedemptionDto>,
) -> ServiceResult<Json<RedemptionDto>> {
    state.session_require_exact(id)?;

    let form = form.0;
    let redemption = state.db.create_redemption(id, form.reward_id, form.note).await?;
    Ok(Json(RedemptionDto::from(&redemption)))
}

fn create_redemption_docs(op: TransformOperation) -> TransformOperation {
    op.description("Request to spend points on a reward. Points are deducted on approval.")
        .tag("redemptions")
        .response::<200, Json<RedemptionDto>>()
        .response_with::<400, (), _>(|res| {
            res.description("The reward is unavailable or the points balance is insufficient!")
        })
        .response_with::<404, (), _>(|res| res.description("The requested reward does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["self"])
}

pub async fn list_employee_redemptions(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<Vec<RedemptionDto>>> {
    state.session_require_manager_or_self(id)?;

    let redemptions = state.db.get_redemptions_by_employee(id).await?;
    Ok(Json(redemptions.iter().map(|r| r.into()).collect()))
}

fn list_employee_redemptions_docs(op: TransformOperation) -> TransformOperation {
    op.description("List all redemptions of an employee.")
        .tag("redemptions")
        .response::<200, Json<Vec<RedemptionDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager", "self"])
}

pub async fn list_redemptions(
    mut state: RequestState,
    Query(filter): Query<RedemptionStatusFilterDto>,
) -> ServiceResult<Json<Vec<RedemptionDto>>> {
    state.session_require_manager()?;

    let redemptions = state.db.get_redemptions(filter.status.map(Into::into)).await?;
    Ok(Json(redemptions.iter().map(|r| r.into()).collect()))
}

fn list_redemptions_docs(op: TransformOperation) -> TransformOperation {
    op.description("List all redemptions, optionally filtered by status.")
        .tag("redemptions")
        .response::<200, Json<Vec<RedemptionDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct UpdateRedemptionDto {
    pub version: i32,
    pub note: Option<String>,
}

async fn update_redemption(
    mut state: RequestState,
    Path(id): Path<u64>,
    form: Json<UpdateRedemptionDto>,
) -> ServiceResult<Json<RedemptionDto>> {
    let employee = state.session_require_self()?;

    let form = form.0;
    let redemption = state
        .db
        .update_redemption_note(id, employee.id, form.version, form.note)
        .await?;
    Ok(Json(RedemptionDto::from(&redemption)))
}

fn update_redemption_docs(op: TransformOperation) -> TransformOperation {
    op.description("Edit a pending redemption. Fails when it was decided or modified in between.")
        .tag("redemptions")
        .response::<200, Json<RedemptionDto>>()
        .response_with::<404, (), _>(|res| {
            res.description("The requested redemption does not exist!")
        })
        .response_with::<409, (), _>(|res| res.description("The redemption was already processed!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .security_requirement_scopes("SessionToken", ["self"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct CancelRedemptionDto {
    pub version: i32,
}

async fn cancel_redemption(
    mut state: RequestState,
    Path(id): Path<u64>,
    form: Json<CancelRedemptionDto>,
) -> ServiceResult<Json<RedemptionDto>> {
    let employee = state.session_require_self()?;

    let redemption = state
        .db
        .cancel_redemption(id, employee.id, form.version)
        .await?;
    Ok(Json(RedemptionDto::from(&redemption)))
}

fn cancel_redemption_docs(op: TransformOperation) -> TransformOperation {
    op.description("Cancel a pending redemption. Fails when it was decided or modified in between.")
        .tag("redemptions")
        .response::<200, Json<RedemptionDto>>()
        .response_with::<404, (), _>(|res| {
            res.description("The requested redemption does not exist!")
        })
        .response_with::<409, (), _>(|res| res.description("The redemption was already processed!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .security_requirement_scopes("SessionToken", ["self"])
}

async fn approve_redemption(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<RedemptionDto>> {
    state.session_require_manager()?;

    let redemption = state.db.approve_redemption(id).await?;
    Ok(Json(RedemptionDto::from(&redemption)))
}

fn approve_redemption_docs(op: TransformOperation) -> TransformOperation {
    op.description(
        "Approve a pending redemption. Balance check, ledger entry and stock decrement are atomic.",
    )
    .tag("redemptions")
    .response::<200, Json<RedemptionDto>>()
    .response_with::<400, (), _>(|res| res.description("The points balance is insufficient!"))
    .response_with::<404, (), _>(|res| res.description("The requested redemption does not exist!"))
    .response_with::<409, (), _>(|res| res.description("The redemption was already processed!"))
    .response_with::<401, (), _>(|res| res.description("Missing login!"))
    .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
    .security_requirement_scopes("SessionToken", ["manager"])
}

async fn reject_redemption(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<RedemptionDto>> {
    state.session_require_manager()?;

    let redemption = state.db.reject_redemption(id).await?;
    Ok(Json(RedemptionDto::from(&redemption)))
}

fn reject_redemption_docs(op: TransformOperation) -> TransformOperation {
    op.description("Reject a pending redemption.")
        .tag("redemptions")
        .response::<200, Json<RedemptionDto>>()
        .response_with::<404, (), _>(|res| {
            res.description("The requested redemption does not exist!")
        })
        .response_with::<409, (), _>(|res| res.description("The redemption was already processed!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}
