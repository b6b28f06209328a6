use aide::axum::routing::{get_with, post_with};
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::Json;
use schemars::JsonSchema;
use serde::Serialize;

use crate::database::AppState;
use crate::error::ServiceResult;
use crate::models;
use crate::request_state::RequestState;

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/employee/:id/notifications",
            get_with(list_notifications, list_notifications_docs),
        )
        .api_route(
            "/notification/:id/read",
            post_with(mark_notification_read, mark_notification_read_docs),
        )
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct NotificationDto {
    pub id: u64,
    pub employee_id: u64,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

impl From<&models::Notification> for NotificationDto {
    fn from(value: &models::Notification) -> Self {
        Self {
            id: value.id.to_owned(),
            employee_id: value.employee_id.to_owned(),
            message: value.message.to_owned(),
            is_read: value.is_read,
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

pub async fn list_notifications(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<Vec<NotificationDto>>> {
    state.session_require_manager_or_self(id)?;

    let notifications = state.db.get_notifications_by_employee(id).await?;
    Ok(Json(notifications.iter().map(|n| n.into()).collect()))
}

fn list_notifications_docs(op: TransformOperation) -> TransformOperation {
    op.description("List the notifications of an employee, newest first.")
        .tag("notifications")
        .response::<200, Json<Vec<NotificationDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager", "self"])
}

async fn mark_notification_read(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<StatusCode> {
    let employee = state.session_require_self()?;

    state.db.mark_notification_read(id, employee.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn mark_notification_read_docs(op: TransformOperation) -> TransformOperation {
    op.description("Mark a notification as read.")
        .tag("notifications")
        .response_with::<204, (), _>(|res| res.description("The notification was marked as read!"))
        .response_with::<404, (), _>(|res| {
            res.description("The requested notification does not exist!")
        })
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .security_requirement_scopes("SessionToken", ["self"])
}
