use aide::axum::routing::{get_with, put_with};
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::database::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::models;
use crate::request_state::RequestState;

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/employee/:id/revenue/weekly",
            get_with(get_weekly_revenue, get_weekly_revenue_docs),
        )
        .api_route(
            "/employee/:id/revenue/monthly",
            get_with(get_monthly_revenue, get_monthly_revenue_docs),
        )
        .api_route(
            "/employee/:id/revenue-target",
            put_with(set_revenue_target, set_revenue_target_docs),
        )
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct RevenueEntryDto {
    pub id: u64,
    pub employee_id: u64,
    pub entry_date: String,
    pub amount_cents: i64,
    pub request_id: Option<u64>,
}

impl From<&models::RevenueEntry> for RevenueEntryDto {
    fn from(value: &models::RevenueEntry) -> Self {
        Self {
            id: value.id.to_owned(),
            employee_id: value.employee_id.to_owned(),
            entry_date: value.entry_date.to_string(),
            amount_cents: value.amount_cents,
            request_id: value.request_id.to_owned(),
        }
    }
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct WeeklyRevenueQueryDto {
    /// Any date of the requested week, `YYYY-MM-DD`. Defaults to today.
    pub date: Option<String>,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct WeeklyRevenueDto {
    pub employee_id: u64,
    pub week_start: String,
    pub total_cents: i64,
    pub entries: Vec<RevenueEntryDto>,
}

fn parse_date(value: &str) -> ServiceResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ServiceError::BadRequest(format!("Invalid date '{value}'.")))
}

pub async fn get_weekly_revenue(
    mut state: RequestState,
    Path(id): Path<u64>,
    Query(query): Query<WeeklyRevenueQueryDto>,
) -> ServiceResult<Json<WeeklyRevenueDto>> {
    state.session_require_manager_or_self(id)?;

    if state.db.get_employee_by_id(id).await?.is_none() {
        return Err(ServiceError::NotFound);
    }

    let date = match query.date {
        Some(value) => parse_date(&value)?,
        None => Utc::now().date_naive(),
    };
    let week_start = models::week_start(date);
    let week_end = week_start + Duration::days(6);

    let entries = state.db.get_revenue_entries(id, week_start, week_end).await?;
    let total_cents = entries.iter().map(|e| e.amount_cents).sum();

    Ok(Json(WeeklyRevenueDto {
        employee_id: id,
        week_start: week_start.to_string(),
        total_cents,
        entries: entries.iter().map(|e| e.into()).collect(),
    }))
}

fn get_weekly_revenue_docs(op: TransformOperation) -> TransformOperation {
    op.description("Revenue of the Monday-based week containing the given date.")
        .tag("revenue")
        .response::<200, Json<WeeklyRevenueDto>>()
        .response_with::<400, (), _>(|res| res.description("Invalid date!"))
        .response_with::<404, (), _>(|res| res.description("The requested employee does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager", "self"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct MonthlyRevenueQueryDto {
    /// Defaults to the current month.
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct MonthlyRevenueDto {
    pub employee_id: u64,
    pub month_start: String,
    pub total_cents: i64,
    pub target_cents: i64,
    pub progress_percentage: f64,
}

pub async fn get_monthly_revenue(
    mut state: RequestState,
    Path(id): Path<u64>,
    Query(query): Query<MonthlyRevenueQueryDto>,
) -> ServiceResult<Json<MonthlyRevenueDto>> {
    state.session_require_manager_or_self(id)?;

    let employee = state
        .db
        .get_employee_by_id(id)
        .await?
        .ok_or(ServiceError::NotFound)?;

    let today = Utc::now().date_naive();
    let year = query.year.unwrap_or_else(|| today.year());
    let month = query.month.unwrap_or_else(|| today.month());

    let month_start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ServiceError::BadRequest(format!("Invalid month '{year}-{month}'.")))?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| ServiceError::BadRequest(format!("Invalid month '{year}-{month}'.")))?;

    let total_cents = state
        .db
        .get_revenue_between(id, month_start, next_month - Duration::days(1))
        .await?;

    Ok(Json(MonthlyRevenueDto {
        employee_id: id,
        month_start: month_start.to_string(),
        total_cents,
        target_cents: employee.monthly_revenue_target,
        progress_percentage: models::percentage(total_cents, employee.monthly_revenue_target),
    }))
}

fn get_monthly_revenue_docs(op: TransformOperation) -> TransformOperation {
    op.description("Revenue of a month compared against the employee target.")
        .tag("revenue")
        .response::<200, Json<MonthlyRevenueDto>>()
        .response_with::<400, (), _>(|res| res.description("Invalid month!"))
        .response_with::<404, (), _>(|res| res.description("The requested employee does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager", "self"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct SetRevenueTargetDto {
    pub target_cents: i64,
}

async fn set_revenue_target(
    mut state: RequestState,
    Path(id): Path<u64>,
    form: Json<SetRevenueTargetDto>,
) -> ServiceResult<StatusCode> {
    state.session_require_manager()?;

    if form.target_cents < 0 {
        return Err(ServiceError::BadRequest(
            "Revenue target cannot be negative.".to_string(),
        ));
    }

    state.db.set_revenue_target(id, form.target_cents).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn set_revenue_target_docs(op: TransformOperation) -> TransformOperation {
    op.description("Set the monthly revenue target of an employee.")
        .tag("revenue")
        .response_with::<204, (), _>(|res| res.description("The target was updated!"))
        .response_with::<400, (), _>(|res| res.description("The target cannot be negative!"))
        .response_with::<404, (), _>(|res| res.description("The requested employee does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}
