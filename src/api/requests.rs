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

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/employee/:id/requests",
            get_with(list_employee_requests, list_employee_requests_docs)
                .post_with(create_request, create_request_docs),
        )
        .api_route("/requests", get_with(list_requests, list_requests_docs))
        .api_route(
            "/request/:id/approve",
            post_with(approve_request, approve_request_docs),
        )
        .api_route(
            "/request/:id/reject",
            post_with(reject_request, reject_request_docs),
        )
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum RequestStatusDto {
    Pending,
    Approved,
    Rejected,
}
impl From<&models::RequestStatus> for RequestStatusDto {
    fn from(value: &models::RequestStatus) -> Self {
        match value {
            models::RequestStatus::Pending => RequestStatusDto::Pending,
            models::RequestStatus::Approved => RequestStatusDto::Approved,
            models::RequestStatus::Rejected => RequestStatusDto::Rejected,
        }
    }
}
impl From<RequestStatusDto> for models::RequestStatus {
    fn from(value: RequestStatusDto) -> Self {
        match value {
            RequestStatusDto::Pending => models::RequestStatus::Pending,
            RequestStatusDto::Approved => models::RequestStatus::Approved,
            RequestStatusDto::Rejected => models::RequestStatus::Rejected,
        }
    }
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct RequestStatusFilterDto {
    pub status: Option<RequestStatusDto>,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct EmployeeRequestDto {
    pub id: u64,
    pub employee_id: u64,
    pub event_type_id: u64,
    pub description: Option<String>,
    pub amount_cents: Option<i64>,
    pub status: RequestStatusDto,
    pub created_at: String,
}

impl From<&models::EmployeeRequest> for EmployeeRequestDto {
    fn from(value: &models::EmployeeRequest) -> Self {
        Self {
            id: value.id.to_owned(),
            employee_id: value.employee_id.to_owned(),
            event_type_id: value.event_type_id.to_owned(),
            description: value.description.to_owned(),
            amount_cents: value.amount_cents,
            status: (&value.status).into(),
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct CreateRequestDto {
    pub event_type_id: u64,
    pub description: Option<String>,
    /// Sale amount in cents, carried into the revenue ledger on approval.
    pub amount_cents: Option<i64>,
}

async fn create_request(
    mut state: RequestState,
    Path(id): Path<u64>,
    form: Json<CreateRequestDto>,
) -> ServiceResult<Json<EmployeeRequestDto>> {
    state.session_require_manager_or_self(id)?;

    let form = form.0;

    let event_type = state
        .db
        .get_event_type_by_id(form.event_type_id)
        .await?
        .ok_or(ServiceError::NotFound)?;
    if !event_type.is_enabled {
        return Err(ServiceError::BadRequest(format!(
            "Event type '{}' is disabled.",
            event_type.name
        )));
    }

    let request = state
        .db
        .create_request(id, form.event_type_id, form.description, form.amount_cents)
        .await?;
    Ok(Json(EmployeeRequestDto::from(&request)))
}

fn create_request_docs(op: TransformOperation) -> TransformOperation {
    op.description("Propose an event for manager approval.")
        .tag("requests")
        .response::<200, Json<EmployeeRequestDto>>()
        .response_with::<400, (), _>(|res| {
            res.description("The event type is disabled or the amount is negative!")
        })
        .response_with::<404, (), _>(|res| {
            res.description("The requested employee or event type does not exist!")
        })
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager", "self"])
}

pub async fn list_employee_requests(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<Vec<EmployeeRequestDto>>> {
    state.session_require_manager_or_self(id)?;

    let requests = state.db.get_requests_by_employee(id).await?;
    Ok(Json(requests.iter().map(|r| r.into()).collect()))
}

fn list_employee_requests_docs(op: TransformOperation) -> TransformOperation {
    op.description("List all requests of an employee.")
        .tag("requests")
        .response::<200, Json<Vec<EmployeeRequestDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager", "self"])
}

pub async fn list_requests(
    mut state: RequestState,
    Query(filter): Query<RequestStatusFilterDto>,
) -> ServiceResult<Json<Vec<EmployeeRequestDto>>> {
    state.session_require_manager()?;

    let requests = state.db.get_requests(filter.status.map(Into::into)).await?;
    Ok(Json(requests.iter().map(|r| r.into()).collect()))
}

fn list_requests_docs(op: TransformOperation) -> TransformOperation {
    op.description("List all requests, optionally filtered by status.")
        .tag("requests")
        .response::<200, Json<Vec<EmployeeRequestDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct ApproveRequestDto {
    /// Replaces the submitted sale amount when set.
    pub amount_cents: Option<i64>,
}

async fn approve_request(
    mut state: RequestState,
    Path(id): Path<u64>,
    form: Json<ApproveRequestDto>,
) -> ServiceResult<Json<EmployeeRequestDto>> {
    state.session_require_manager()?;

    let request = state.db.approve_request(id, form.amount_cents).await?;
    Ok(Json(EmployeeRequestDto::from(&request)))
}

fn approve_request_docs(op: TransformOperation) -> TransformOperation {
    op.description(
        "Approve a pending request. Writes the ledger entry and the revenue entry in one transaction.",
    )
    .tag("requests")
    .response::<200, Json<EmployeeRequestDto>>()
    .response_with::<400, (), _>(|res| res.description("The amount override is negative!"))
    .response_with::<404, (), _>(|res| res.description("The requested request does not exist!"))
    .response_with::<409, (), _>(|res| res.description("The request was already processed!"))
    .response_with::<401, (), _>(|res| res.description("Missing login!"))
    .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
    .security_requirement_scopes("SessionToken", ["manager"])
}

async fn reject_request(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<EmployeeRequestDto>> {
    state.session_require_manager()?;

    let request = state.db.reject_request(id).await?;
    Ok(Json(EmployeeRequestDto::from(&request)))
}

fn reject_request_docs(op: TransformOperation) -> TransformOperation {
    op.description("Reject a pending request.")
        .tag("requests")
        .response::<200, Json<EmployeeRequestDto>>()
        .response_with::<404, (), _>(|res| res.description("The requested request does not exist!"))
        .response_with::<409, (), _>(|res| res.description("The request was already processed!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}
