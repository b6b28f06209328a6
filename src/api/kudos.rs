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
            "/kudos",
            get_with(list_kudos, list_kudos_docs).post_with(create_kudos, create_kudos_docs),
        )
        .api_route(
            "/employee/:id/kudos",
            get_with(list_employee_kudos, list_employee_kudos_docs),
        )
        .api_route(
            "/kudos/:id/approve",
            post_with(approve_kudos, approve_kudos_docs),
        )
        .api_route(
            "/kudos/:id/reject",
            post_with(reject_kudos, reject_kudos_docs),
        )
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct KudosDto {
    pub id: u64,
    pub from_employee_id: u64,
    pub to_employee_id: u64,
    pub message: String,
    pub status: RequestStatusDto,
    pub created_at: String,
}

impl From<&models::Kudos> for KudosDto {
    fn from(value: &models::Kudos) -> Self {
        Self {
            id: value.id.to_owned(),
            from_employee_id: value.from_employee_id.to_owned(),
            to_employee_id: value.to_employee_id.to_owned(),
            message: value.message.to_owned(),
            status: (&value.status).into(),
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct CreateKudosDto {
    pub to_employee_id: u64,
    pub message: String,
}

async fn create_kudos(
    mut state: RequestState,
    form: Json<CreateKudosDto>,
) -> ServiceResult<Json<KudosDto>> {
    let employee = state.session_require_self()?;

    let form = form.0;

    if form.to_employee_id == employee.id {
        return Err(ServiceError::BadRequest(
            "Kudos cannot be sent to yourself.".to_string(),
        ));
    }
    if state
        .db
        .get_employee_by_id(form.to_employee_id)
        .await?
        .is_none()
    {
        return Err(ServiceError::NotFound);
    }

    let kudos = state
        .db
        .create_kudos(employee.id, form.to_employee_id, form.message)
        .await?;
    Ok(Json(KudosDto::from(&kudos)))
}

fn create_kudos_docs(op: TransformOperation) -> TransformOperation {
    op.description("Send kudos to a colleague. Kudos await manager approval.")
        .tag("kudos")
        .response::<200, Json<KudosDto>>()
        .response_with::<400, (), _>(|res| res.description("Kudos cannot be sent to yourself!"))
        .response_with::<404, (), _>(|res| res.description("The requested employee does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .security_requirement_scopes("SessionToken", ["self"])
}

pub async fn list_kudos(
    mut state: RequestState,
    Query(filter): Query<RequestStatusFilterDto>,
) -> ServiceResult<Json<Vec<KudosDto>>> {
    state.session_require_manager()?;

    let kudos = state.db.get_kudos(filter.status.map(Into::into)).await?;
    Ok(Json(kudos.iter().map(|k| k.into()).collect()))
}

fn list_kudos_docs(op: TransformOperation) -> TransformOperation {
    op.description("List all kudos, optionally filtered by status.")
        .tag("kudos")
        .response::<200, Json<Vec<KudosDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}

pub async fn list_employee_kudos(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<Vec<KudosDto>>> {
    let employee = state.session_require_manager_or_self(id)?;

    // non-managers only see kudos that passed approval
    let approved_only = !employee.is_manager();
    let kudos = state.db.get_kudos_for_employee(id, approved_only).await?;
    Ok(Json(kudos.iter().map(|k| k.into()).collect()))
}

fn list_employee_kudos_docs(op: TransformOperation) -> TransformOperation {
    op.description("List the kudos an employee has received.")
        .tag("kudos")
        .response::<200, Json<Vec<KudosDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager", "self"])
}

async fn approve_kudos(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<KudosDto>> {
    state.session_require_manager()?;

    let kudos = state.db.decide_kudos(id, true).await?;
    Ok(Json(KudosDto::from(&kudos)))
}

fn approve_kudos_docs(op: TransformOperation) -> TransformOperation {
    op.description("Approve pending kudos.")
        .tag("kudos")
        .response::<200, Json<KudosDto>>()
        .response_with::<404, (), _>(|res| res.description("The requested kudos does not exist!"))
        .response_with::<409, (), _>(|res| res.description("The kudos was already processed!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}

async fn reject_kudos(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<KudosDto>> {
    state.session_require_manager()?;

    let kudos = state.db.decide_kudos(id, false).await?;
    Ok(Json(KudosDto::from(&kudos)))
}

fn reject_kudos_docs(op: TransformOperation) -> TransformOperation {
    op.description("Reject pending kudos.")
        .tag("kudos")
        .response::<200, Json<KudosDto>>()
        .response_with::<404, (), _>(|res| res.description("The requested kudos does not exist!"))
        .response_with::<409, (), _>(|res| res.description("The kudos was already processed!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}
