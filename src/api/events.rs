use aide::axum::routing::get_with;
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::Path;
use axum::Json;
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::database::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::models;
use crate::request_state::RequestState;

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/employee/:id/events",
            get_with(list_events, list_events_docs).post_with(submit_events, submit_events_docs),
        )
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct LedgerEntryDto {
    pub id: u64,
    pub employee_id: u64,
    pub event_type: String,
    pub points: i32,
    pub description: Option<String>,
    pub redemption_id: Option<u64>,
    pub timestamp: String,
}

impl From<&models::LedgerEntry> for LedgerEntryDto {
    fn from(value: &models::LedgerEntry) -> Self {
        Self {
            id: value.id.to_owned(),
            employee_id: value.employee_id.to_owned(),
            event_type: value.event_type.to_owned(),
            points: value.points,
            description: value.description.to_owned(),
            redemption_id: value.redemption_id.to_owned(),
            timestamp: value.timestamp.to_rfc3339(),
        }
    }
}

pub async fn list_events(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<Vec<LedgerEntryDto>>> {
    state.session_require_manager_or_self(id)?;

    let entries = state.db.get_ledger_by_employee(id).await?;
    Ok(Json(entries.iter().map(|e| e.into()).collect()))
}

fn list_events_docs(op: TransformOperation) -> TransformOperation {
    op.description("List the points ledger of an employee, newest first.")
        .tag("events")
        .response::<200, Json<Vec<LedgerEntryDto>>>()
        .response_with::<404, (), _>(|res| res.description("The requested employee does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager", "self"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct SubmitEventsDto {
    /// At least one enabled event type.
    pub event_type_ids: Vec<u64>,
    pub description: Option<String>,
    /// Sale amount in cents. A positive amount writes one revenue entry
    /// dated today.
    pub amount_cents: Option<i64>,
}

async fn submit_events(
    mut state: RequestState,
    Path(id): Path<u64>,
    form: Json<SubmitEventsDto>,
) -> ServiceResult<Json<Vec<LedgerEntryDto>>> {
    state.session_require_manager()?;

    let form = form.0;

    if form.event_type_ids.is_empty() {
        return Err(ServiceError::BadRequest(
            "Select at least one event.".to_string(),
        ));
    }

    let mut event_types = Vec::with_capacity(form.event_type_ids.len());
    for event_type_id in form.event_type_ids {
        let event_type = state
            .db
            .get_event_type_by_id(event_type_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        event_types.push(event_type);
    }

    let entries = state
        .db
        .submit_events(
            id,
            &event_types,
            form.description,
            form.amount_cents,
            Utc::now().date_naive(),
        )
        .await?;

    Ok(Json(entries.iter().map(|e| e.into()).collect()))
}

fn submit_events_docs(op: TransformOperation) -> TransformOperation {
    op.description("Record one or more events for an employee.")
        .tag("events")
        .response::<200, Json<Vec<LedgerEntryDto>>>()
        .response_with::<400, (), _>(|res| {
            res.description("No event selected, an event type is disabled or the amount is negative!")
        })
        .response_with::<404, (), _>(|res| {
            res.description("The requested employee or event type does not exist!")
        })
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}
