use aide::axum::routing::get_with;
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::Path;
use axum::http::StatusCode;
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
            "/event-type/:id",
            get_with(get_event_type, get_event_type_docs)
                .put_with(update_event_type, update_event_type_docs)
                .delete_with(delete_event_type, delete_event_type_docs),
        )
        .api_route(
            "/event-types",
            get_with(list_event_types, list_event_types_docs)
                .post_with(create_event_type, create_event_type_docs),
        )
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum PolarityDto {
    Positive,
    Negative,
}
impl From<&models::Polarity> for PolarityDto {
    fn from(value: &models::Polarity) -> Self {
        match value {
            models::Polarity::Positive => PolarityDto::Positive,
            models::Polarity::Negative => PolarityDto::Negative,
        }
    }
}
impl From<PolarityDto> for models::Polarity {
    fn from(value: PolarityDto) -> Self {
        match value {
            PolarityDto::Positive => models::Polarity::Positive,
            PolarityDto::Negative => models::Polarity::Negative,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct EventTypeDto {
    pub id: u64,
    pub name: String,
    pub points: i32,
    pub polarity: PolarityDto,
    /// Signed value a submission of this event type writes to the ledger.
    pub signed_points: i32,
    pub is_enabled: bool,
    pub sort_order: i32,
}

impl From<&models::EventType> for EventTypeDto {
    fn from(value: &models::EventType) -> Self {
        Self {
            id: value.id.to_owned(),
            name: value.name.to_owned(),
            points: value.points,
            polarity: (&value.polarity).into(),
            signed_points: value.signed_points(),
            is_enabled: value.is_enabled,
            sort_order: value.sort_order,
        }
    }
}

pub async fn list_event_types(mut state: RequestState) -> ServiceResult<Json<Vec<EventTypeDto>>> {
    state.session_require()?;

    let event_types = state.db.get_all_event_types().await?;
    Ok(Json(event_types.iter().map(|e| e.into()).collect()))
}

fn list_event_types_docs(op: TransformOperation) -> TransformOperation {
    op.description("List all event type definitions.")
        .tag("event_types")
        .response::<200, Json<Vec<EventTypeDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .security_requirement_scopes("SessionToken", ["self"])
}

pub async fn get_event_type(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<EventTypeDto>> {
    state.session_require()?;

    let event_type = state.db.get_event_type_by_id(id).await?;

    if let Some(event_type) = event_type {
        return Ok(Json(EventTypeDto::from(&event_type)));
    }

    Err(ServiceError::NotFound)
}

fn get_event_type_docs(op: TransformOperation) -> TransformOperation {
    op.description("Get an event type by id.")
        .tag("event_types")
        .response::<200, Json<EventTypeDto>>()
        .response_with::<404, (), _>(|res| {
            res.description("The requested event type does not exist!")
        })
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .security_requirement_scopes("SessionToken", ["self"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct SaveEventTypeDto {
    pub name: String,
    pub points: i32,
    pub polarity: PolarityDto,
    pub is_enabled: bool,
    pub sort_order: i32,
}

async fn create_event_type(
    mut state: RequestState,
    form: Json<SaveEventTypeDto>,
) -> ServiceResult<Json<EventTypeDto>> {
    state.session_require_manager()?;

    let form = form.0;

    let event_type = models::EventType {
        id: 0,
        name: form.name,
        points: form.points,
        polarity: form.polarity.into(),
        is_enabled: form.is_enabled,
        sort_order: form.sort_order,
    };

    let event_type = state.db.store_event_type(event_type).await?;
    Ok(Json(EventTypeDto::from(&event_type)))
}

fn create_event_type_docs(op: TransformOperation) -> TransformOperation {
    op.description("Create a new event type.")
        .tag("event_types")
        .response::<200, Json<EventTypeDto>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}

async fn update_event_type(
    mut state: RequestState,
    Path(id): Path<u64>,
    form: Json<SaveEventTypeDto>,
) -> ServiceResult<Json<EventTypeDto>> {
    state.session_require_manager()?;

    let form = form.0;
    let event_type = state.db.get_event_type_by_id(id).await?;

    if let Some(mut event_type) = event_type {
        event_type.name = form.name;
        event_type.points = form.points;
        event_type.polarity = form.polarity.into();
        event_type.is_enabled = form.is_enabled;
        event_type.sort_order = form.sort_order;

        let event_type = state.db.store_event_type(event_type).await?;
        return Ok(Json(EventTypeDto::from(&event_type)));
    }

    Err(ServiceError::NotFound)
}

fn update_event_type_docs(op: TransformOperation) -> TransformOperation {
    op.description("Update an existing event type.")
        .tag("event_types")
        .response::<200, Json<EventTypeDto>>()
        .response_with::<404, (), _>(|res| {
            res.description("The requested event type does not exist!")
        })
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}

async fn delete_event_type(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<StatusCode> {
    state.session_require_manager()?;

    state.db.delete_event_type(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn delete_event_type_docs(op: TransformOperation) -> TransformOperation {
    op.description("Delete an existing event type.")
        .tag("event_types")
        .response_with::<204, (), _>(|res| {
            res.description("The event type was successfully deleted!")
        })
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}
