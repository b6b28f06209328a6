use aide::axum::routing::{get_with, post_with, put_with};
use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::database::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::models;
use crate::request_state::RequestState;

use super::password_hash_create;

pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/employee/:id",
            get_with(get_employee, get_employee_docs)
                .put_with(update_employee, update_employee_docs)
                .delete_with(delete_employee, delete_employee_docs),
        )
        .api_route(
            "/employees",
            get_with(list_employees, list_employees_docs)
                .post_with(create_employee, create_employee_docs),
        )
        .api_route(
            "/employee/:id/password",
            put_with(set_employee_password, set_employee_password_docs),
        )
        .api_route(
            "/employee/:id/summary",
            get_with(get_employee_summary, get_employee_summary_docs),
        )
        .api_route(
            "/leaderboard",
            get_with(get_leaderboard, get_leaderboard_docs),
        )
        .with_state(app_state)
}

#[derive(Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum RoleDto {
    Employee,
    Manager,
    Admin,
}
impl From<&models::Role> for RoleDto {
    fn from(value: &models::Role) -> Self {
        match value {
            models::Role::Employee => RoleDto::Employee,
            models::Role::Manager => RoleDto::Manager,
            models::Role::Admin => RoleDto::Admin,
        }
    }
}
impl From<RoleDto> for models::Role {
    fn from(value: RoleDto) -> Self {
        match value {
            RoleDto::Employee => models::Role::Employee,
            RoleDto::Manager => models::Role::Manager,
            RoleDto::Admin => models::Role::Admin,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct EmployeeDto {
    pub id: u64,
    pub name: String,
    pub username: Option<String>,
    pub role: RoleDto,
    pub store_id: Option<u64>,
    pub is_active: bool,
    pub monthly_revenue_target: i64,
}

impl From<&models::Employee> for EmployeeDto {
    fn from(value: &models::Employee) -> Self {
        Self {
            id: value.id.to_owned(),
            name: value.name.to_owned(),
            username: value.username.to_owned(),
            role: (&value.role).into(),
            store_id: value.store_id.to_owned(),
            is_active: value.is_active,
            monthly_revenue_target: value.monthly_revenue_target,
        }
    }
}

pub async fn list_employees(mut state: RequestState) -> ServiceResult<Json<Vec<EmployeeDto>>> {
    state.session_require_manager()?;

    let employees = state.db.get_all_employees().await?;
    Ok(Json(employees.iter().map(|e| e.into()).collect()))
}

fn list_employees_docs(op: TransformOperation) -> TransformOperation {
    op.description("List all employees.")
        .tag("employees")
        .response::<200, Json<Vec<EmployeeDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}

pub async fn get_employee(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<EmployeeDto>> {
    state.session_require_manager_or_self(id)?;

    let employee = state.db.get_employee_by_id(id).await?;

    if let Some(employee) = employee {
        return Ok(Json(EmployeeDto::from(&employee)));
    }

    Err(ServiceError::NotFound)
}

fn get_employee_docs(op: TransformOperation) -> TransformOperation {
    op.description("Get an employee by id.")
        .tag("employees")
        .response::<200, Json<EmployeeDto>>()
        .response_with::<404, (), _>(|res| res.description("The requested employee does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager", "self"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct SaveEmployeeDto {
    pub name: String,
    pub username: Option<String>,
    pub role: RoleDto,
    pub store_id: Option<u64>,
    pub is_active: bool,
    pub monthly_revenue_target: i64,
}

async fn create_employee(
    mut state: RequestState,
    form: Json<SaveEmployeeDto>,
) -> ServiceResult<Json<EmployeeDto>> {
    state.session_require_manager()?;

    let form = form.0;

    let employee = models::Employee {
        id: 0,
        name: form.name,
        username: form.username,
        role: form.role.into(),
        store_id: form.store_id,
        is_active: form.is_active,
        monthly_revenue_target: form.monthly_revenue_target,
    };

    let employee = state.db.store_employee(employee).await?;
    Ok(Json(EmployeeDto::from(&employee)))
}

fn create_employee_docs(op: TransformOperation) -> TransformOperation {
    op.description("Create a new employee.")
        .tag("employees")
        .response::<200, Json<EmployeeDto>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}

async fn update_employee(
    mut state: RequestState,
    Path(id): Path<u64>,
    form: Json<SaveEmployeeDto>,
) -> ServiceResult<Json<EmployeeDto>> {
    state.session_require_manager()?;

    let form = form.0;
    let employee = state.db.get_employee_by_id(id).await?;

    if let Some(mut employee) = employee {
        employee.name = form.name;
        employee.username = form.username;
        employee.role = form.role.into();
        employee.store_id = form.store_id;
        employee.is_active = form.is_active;
        employee.monthly_revenue_target = form.monthly_revenue_target;

        let employee = state.db.store_employee(employee).await?;
        return Ok(Json(EmployeeDto::from(&employee)));
    }

    Err(ServiceError::NotFound)
}

fn update_employee_docs(op: TransformOperation) -> TransformOperation {
    op.description("Update an existing employee.")
        .tag("employees")
        .response::<200, Json<EmployeeDto>>()
        .response_with::<404, (), _>(|res| res.description("The requested employee does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}

async fn delete_employee(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<StatusCode> {
    state.session_require_manager()?;

    state.db.delete_employee(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn delete_employee_docs(op: TransformOperation) -> TransformOperation {
    op.description("Delete an existing employee.")
        .tag("employees")
        .response_with::<204, (), _>(|res| res.description("The employee was successfully deleted!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager"])
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
pub struct SetPasswordDto {
    pub password: String,
}

async fn set_employee_password(
    mut state: RequestState,
    Path(id): Path<u64>,
    form: Json<SetPasswordDto>,
) -> ServiceResult<StatusCode> {
    state.session_require_manager_or_self(id)?;

    if state.db.get_employee_by_id(id).await?.is_none() {
        return Err(ServiceError::NotFound);
    }

    let hash = password_hash_create(&form.password)?;
    state.db.set_password_hash(id, hash).await?;

    Ok(StatusCode::NO_CONTENT)
}

fn set_employee_password_docs(op: TransformOperation) -> TransformOperation {
    op.description("Set the login password of an employee.")
        .tag("employees")
        .response_with::<204, (), _>(|res| res.description("The password was updated!"))
        .response_with::<404, (), _>(|res| res.description("The requested employee does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager", "self"])
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct EmployeeSummaryDto {
    pub employee_id: u64,
    pub points_balance: i32,
    pub total_earned_points: i32,
    pub negative_event_count: i64,
    pub monthly_revenue_target: i64,
    pub monthly_revenue_actual: i64,
    pub progress_percentage: f64,
    pub sales_progress_percentage: f64,
    pub rank: Option<u64>,
}

impl From<&models::EmployeeSummary> for EmployeeSummaryDto {
    fn from(value: &models::EmployeeSummary) -> Self {
        Self {
            employee_id: value.employee_id,
            points_balance: value.points_balance,
            total_earned_points: value.total_earned_points,
            negative_event_count: value.negative_event_count,
            monthly_revenue_target: value.monthly_revenue_target,
            monthly_revenue_actual: value.monthly_revenue_actual,
            progress_percentage: value.progress_percentage(),
            sales_progress_percentage: value.sales_progress_percentage(),
            rank: value.rank,
        }
    }
}

pub async fn get_employee_summary(
    mut state: RequestState,
    Path(id): Path<u64>,
) -> ServiceResult<Json<EmployeeSummaryDto>> {
    state.session_require_manager_or_self(id)?;

    let summary = state
        .db
        .get_employee_summary(id, Utc::now().date_naive())
        .await?;
    Ok(Json(EmployeeSummaryDto::from(&summary)))
}

fn get_employee_summary_docs(op: TransformOperation) -> TransformOperation {
    op.description("Get the derived points balance and progress numbers of an employee.")
        .tag("employees")
        .response::<200, Json<EmployeeSummaryDto>>()
        .response_with::<404, (), _>(|res| res.description("The requested employee does not exist!"))
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .response_with::<403, (), _>(|res| res.description("Missing permissions!"))
        .security_requirement_scopes("SessionToken", ["manager", "self"])
}

#[derive(Debug, PartialEq, Serialize, JsonSchema)]
pub struct LeaderboardEntryDto {
    pub employee: EmployeeDto,
    pub points_balance: i32,
    pub rank: u64,
}

pub async fn get_leaderboard(
    mut state: RequestState,
) -> ServiceResult<Json<Vec<LeaderboardEntryDto>>> {
    state.session_require()?;

    let leaderboard = state.db.get_leaderboard().await?;

    let mut result = Vec::with_capacity(leaderboard.len());
    let mut rank = 0;
    let mut last_balance = None;
    for (index, (employee, balance)) in leaderboard.iter().enumerate() {
        // employees with equal balances share a rank
        if last_balance != Some(*balance) {
            rank = index as u64 + 1;
            last_balance = Some(*balance);
        }
        result.push(LeaderboardEntryDto {
            employee: employee.into(),
            points_balance: *balance,
            rank,
        });
    }

    Ok(Json(result))
}

fn get_leaderboard_docs(op: TransformOperation) -> TransformOperation {
    op.description("List all active employees ordered by their derived points balance.")
        .tag("employees")
        .response::<200, Json<Vec<LeaderboardEntryDto>>>()
        .response_with::<401, (), _>(|res| res.description("Missing login!"))
        .security_requirement_scopes("SessionToken", ["self"])
}
