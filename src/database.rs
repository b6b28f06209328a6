use base64::engine::general_purpose;
use base64::Engine;
use chrono::{DateTime, NaiveDate, Utc};
use futures::TryStreamExt;
use rand::RngCore;
use sqlx::migrate::Migrator;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, FromRow, PgPool, Postgres, Row};

use crate::error::{ServiceError, ServiceResult};
use crate::models;

mod migration;
#[cfg(test)]
mod tests;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

impl AppState {
    pub async fn connect(url: &str) -> AppState {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .expect("connect to database");

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: PgPool) -> AppState {
        let migrator = Migrator::new(migration::postgresql_migrations())
            .await
            .expect("load migrations");
        migrator.run(&pool).await.expect("run migrations");

        AppState { pool }
    }
}

pub struct DatabaseConnection {
    pub connection: PoolConnection<Postgres>,
}

fn to_service_error(error: sqlx::Error) -> ServiceError {
    error.into()
}

fn generate_token(len: usize) -> String {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    general_purpose::URL_SAFE_NO_PAD.encode(data)
}

fn role_to_str(role: models::Role) -> &'static str {
    match role {
        models::Role::Employee => "employee",
        models::Role::Manager => "manager",
        models::Role::Admin => "admin",
    }
}

fn role_from_str(value: &str) -> ServiceResult<models::Role> {
    match value {
        "employee" => Ok(models::Role::Employee),
        "manager" => Ok(models::Role::Manager),
        "admin" => Ok(models::Role::Admin),
        _ => Err(ServiceError::InternalServerError(format!(
            "Unknown role '{value}' in database."
        ))),
    }
}

fn polarity_to_str(polarity: models::Polarity) -> &'static str {
    match polarity {
        models::Polarity::Positive => "positive",
        models::Polarity::Negative => "negative",
    }
}

fn polarity_from_str(value: &str) -> ServiceResult<models::Polarity> {
    match value {
        "positive" => Ok(models::Polarity::Positive),
        "negative" => Ok(models::Polarity::Negative),
        _ => Err(ServiceError::InternalServerError(format!(
            "Unknown polarity '{value}' in database."
        ))),
    }
}

fn request_status_to_str(status: models::RequestStatus) -> &'static str {
    match status {
        models::RequestStatus::Pending => "pending",
        models::RequestStatus::Approved => "approved",
        models::RequestStatus::Rejected => "rejected",
    }
}

fn request_status_from_str(value: &str) -> ServiceResult<models::RequestStatus> {
    match value {
        "pending" => Ok(models::RequestStatus::Pending),
        "approved" => Ok(models::RequestStatus::Approved),
        "rejected" => Ok(models::RequestStatus::Rejected),
        _ => Err(ServiceError::InternalServerError(format!(
            "Unknown request status '{value}' in database."
        ))),
    }
}

fn redemption_status_to_str(status: models::RedemptionStatus) -> &'static str {
    match status {
        models::RedemptionStatus::Pending => "pending",
        models::RedemptionStatus::Approved => "approved",
        models::RedemptionStatus::Rejected => "rejected",
        models::RedemptionStatus::Cancelled => "cancelled",
    }
}

fn redemption_status_from_str(value: &str) -> ServiceResult<models::RedemptionStatus> {
    match value {
        "pending" => Ok(models::RedemptionStatus::Pending),
        "approved" => Ok(models::RedemptionStatus::Approved),
        "rejected" => Ok(models::RedemptionStatus::Rejected),
        "cancelled" => Ok(models::RedemptionStatus::Cancelled),
        _ => Err(ServiceError::InternalServerError(format!(
            "Unknown redemption status '{value}' in database."
        ))),
    }
}

fn bonus_type_to_str(bonus_type: models::BonusType) -> &'static str {
    match bonus_type {
        models::BonusType::Eur => "eur",
        models::BonusType::Points => "points",
    }
}

fn bonus_type_from_str(value: &str) -> ServiceResult<models::BonusType> {
    match value {
        "eur" => Ok(models::BonusType::Eur),
        "points" => Ok(models::BonusType::Points),
        _ => Err(ServiceError::InternalServerError(format!(
            "Unknown bonus type '{value}' in database."
        ))),
    }
}

#[derive(Debug, FromRow)]
struct EmployeeRow {
    id: i64,
    name: String,
    username: Option<String>,
    role: String,
    store_id: Option<i64>,
    is_active: bool,
    monthly_revenue_target: i64,
}

impl TryFrom<EmployeeRow> for models::Employee {
    type Error = ServiceError;

    fn try_from(row: EmployeeRow) -> ServiceResult<Self> {
        Ok(models::Employee {
            id: row.id as u64,
            name: row.name,
            username: row.username,
            role: role_from_str(&row.role)?,
            store_id: row.store_id.map(|id| id as u64),
            is_active: row.is_active,
            monthly_revenue_target: row.monthly_revenue_target,
        })
    }
}

#[derive(Debug, FromRow)]
struct EventTypeRow {
    id: i64,
    name: String,
    points: i32,
    polarity: String,
    is_enabled: bool,
    sort_order: i32,
}

impl TryFrom<EventTypeRow> for models::EventType {
    type Error = ServiceError;

    fn try_from(row: EventTypeRow) -> ServiceResult<Self> {
        Ok(models::EventType {
            id: row.id as u64,
            name: row.name,
            points: row.points,
            polarity: polarity_from_str(&row.polarity)?,
            is_enabled: row.is_enabled,
            sort_order: row.sort_order,
        })
    }
}

#[derive(Debug, FromRow)]
struct LedgerRow {
    id: i64,
    employee_id: i64,
    event_type: String,
    points: i32,
    description: Option<String>,
    redemption_id: Option<i64>,
    timestamp: DateTime<Utc>,
}

impl From<LedgerRow> for models::LedgerEntry {
    fn from(row: LedgerRow) -> Self {
        models::LedgerEntry {
            id: row.id as u64,
            employee_id: row.employee_id as u64,
            event_type: row.event_type,
            points: row.points,
            description: row.description,
            redemption_id: row.redemption_id.map(|id| id as u64),
            timestamp: row.timestamp,
        }
    }
}

#[derive(Debug, FromRow)]
struct RequestRow {
    id: i64,
    employee_id: i64,
    event_type_id: i64,
    description: Option<String>,
    amount_cents: Option<i64>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for models::EmployeeRequest {
    type Error = ServiceError;

    fn try_from(row: RequestRow) -> ServiceResult<Self> {
        Ok(models::EmployeeRequest {
            id: row.id as u64,
            employee_id: row.employee_id as u64,
            event_type_id: row.event_type_id as u64,
            description: row.description,
            amount_cents: row.amount_cents,
            status: request_status_from_str(&row.status)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RewardRow {
    id: i64,
    name: String,
    points_cost: i32,
    stock: i32,
    is_enabled: bool,
}

impl From<RewardRow> for models::Reward {
    fn from(row: RewardRow) -> Self {
        models::Reward {
            id: row.id as u64,
            name: row.name,
            points_cost: row.points_cost,
            stock: row.stock,
            is_enabled: row.is_enabled,
        }
    }
}

#[derive(Debug, FromRow)]
struct RedemptionRow {
    id: i64,
    employee_id: i64,
    reward_id: i64,
    points_cost: i32,
    note: Option<String>,
    status: String,
    version: i32,
    delivered_code: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<RedemptionRow> for models::Redemption {
    type Error = ServiceError;

    fn try_from(row: RedemptionRow) -> ServiceResult<Self> {
        Ok(models::Redemption {
            id: row.id as u64,
            employee_id: row.employee_id as u64,
            reward_id: row.reward_id as u64,
            points_cost: row.points_cost,
            note: row.note,
            status: redemption_status_from_str(&row.status)?,
            version: row.version,
            delivered_code: row.delivered_code,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RevenueRow {
    id: i64,
    employee_id: i64,
    entry_date: NaiveDate,
    amount_cents: i64,
    request_id: Option<i64>,
}

impl From<RevenueRow> for models::RevenueEntry {
    fn from(row: RevenueRow) -> Self {
        models::RevenueEntry {
            id: row.id as u64,
            employee_id: row.employee_id as u64,
            entry_date: row.entry_date,
            amount_cents: row.amount_cents,
            request_id: row.request_id.map(|id| id as u64),
        }
    }
}

#[derive(Debug, FromRow)]
struct KudosRow {
    id: i64,
    from_employee_id: i64,
    to_employee_id: i64,
    message: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<KudosRow> for models::Kudos {
    type Error = ServiceError;

    fn try_from(row: KudosRow) -> ServiceResult<Self> {
        Ok(models::Kudos {
            id: row.id as u64,
            from_employee_id: row.from_employee_id as u64,
            to_employee_id: row.to_employee_id as u64,
            message: row.message,
            status: request_status_from_str(&row.status)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct BonusRow {
    id: i64,
    employee_id: i64,
    proposed_by_id: i64,
    bonus_type: String,
    value: i64,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BonusRow> for models::BonusRequest {
    type Error = ServiceError;

    fn try_from(row: BonusRow) -> ServiceResult<Self> {
        Ok(models::BonusRequest {
            id: row.id as u64,
            employee_id: row.employee_id as u64,
            proposed_by_id: row.proposed_by_id as u64,
            bonus_type: bonus_type_from_str(&row.bonus_type)?,
            value: row.value,
            status: request_status_from_str(&row.status)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PayoutRow {
    id: i64,
    employee_id: i64,
    bonus_request_id: i64,
    amount_cents: i64,
    created_at: DateTime<Utc>,
}

impl From<PayoutRow> for models::BonusPayout {
    fn from(row: PayoutRow) -> Self {
        models::BonusPayout {
            id: row.id as u64,
            employee_id: row.employee_id as u64,
            bonus_request_id: row.bonus_request_id as u64,
            amount_cents: row.amount_cents,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct NotificationRow {
    id: i64,
    employee_id: i64,
    message: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for models::Notification {
    fn from(row: NotificationRow) -> Self {
        models::Notification {
            id: row.id as u64,
            employee_id: row.employee_id as u64,
            message: row.message,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

impl DatabaseConnection {
    // ---- sessions ----

    pub async fn create_session_token(
        &mut self,
        employee_id: u64,
        valid_until: DateTime<Utc>,
    ) -> ServiceResult<String> {
        let token = generate_token(32);

        sqlx::query("INSERT INTO sessions (token, employee_id, valid_until) VALUES ($1, $2, $3)")
            .bind(&token)
            .bind(employee_id as i64)
            .bind(valid_until)
            .execute(&mut *self.connection)
            .await
            .map_err(to_service_error)?;

        Ok(token)
    }

    pub async fn get_session_by_session_token(
        &mut self,
        token: String,
    ) -> ServiceResult<Option<models::Session>> {
        let row = sqlx::query(
            r#"SELECT s.valid_until, e.id, e.name, e.username, e.role, e.store_id, e.is_active, e.monthly_revenue_target
            FROM sessions s JOIN employees e ON e.id = s.employee_id
            WHERE s.token = $1"#,
        )
        .bind(&token)
        .fetch_optional(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let valid_until: DateTime<Utc> = row.try_get("valid_until").map_err(to_service_error)?;
        if valid_until < Utc::now() {
            self.delete_session_token(token).await?;
            return Ok(None);
        }

        let employee = models::Employee {
            id: row.try_get::<i64, _>("id").map_err(to_service_error)? as u64,
            name: row.try_get("name").map_err(to_service_error)?,
            username: row.try_get("username").map_err(to_service_error)?,
            role: role_from_str(row.try_get("role").map_err(to_service_error)?)?,
            store_id: row
                .try_get::<Option<i64>, _>("store_id")
                .map_err(to_service_error)?
                .map(|id| id as u64),
            is_active: row.try_get("is_active").map_err(to_service_error)?,
            monthly_revenue_target: row
                .try_get("monthly_revenue_target")
                .map_err(to_service_error)?,
        };

        Ok(Some(models::Session {
            employee,
            token,
            valid_until,
        }))
    }

    pub async fn delete_session_token(&mut self, token: String) -> ServiceResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(&token)
            .execute(&mut *self.connection)
            .await
            .map_err(to_service_error)?;

        Ok(())
    }

    // ---- employees ----

    pub async fn get_all_employees(&mut self) -> ServiceResult<Vec<models::Employee>> {
        let rows: Vec<EmployeeRow> =
            sqlx::query_as("SELECT * FROM employees ORDER BY id")
                .fetch(&mut *self.connection)
                .try_collect()
                .await
                .map_err(to_service_error)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn get_employee_by_id(&mut self, id: u64) -> ServiceResult<Option<models::Employee>> {
        let row: Option<EmployeeRow> = sqlx::query_as("SELECT * FROM employees WHERE id = $1")
            .bind(id as i64)
            .fetch_optional(&mut *self.connection)
            .await
            .map_err(to_service_error)?;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn get_employee_by_username(
        &mut self,
        username: &str,
    ) -> ServiceResult<Option<models::Employee>> {
        let row: Option<EmployeeRow> = sqlx::query_as("SELECT * FROM employees WHERE username = $1")
            .bind(username)
            .fetch_optional(&mut *self.connection)
            .await
            .map_err(to_service_error)?;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn store_employee(
        &mut self,
        employee: models::Employee,
    ) -> ServiceResult<models::Employee> {
        let row: EmployeeRow = if employee.id == 0 {
            sqlx::query_as(
                r#"INSERT INTO employees (name, username, role, store_id, is_active, monthly_revenue_target)
                VALUES ($1, $2, $3, $4, $5, $6) RETURNING *"#,
            )
            .bind(&employee.name)
            .bind(&employee.username)
            .bind(role_to_str(employee.role))
            .bind(employee.store_id.map(|id| id as i64))
            .bind(employee.is_active)
            .bind(employee.monthly_revenue_target)
            .fetch_one(&mut *self.connection)
            .await
            .map_err(to_service_error)?
        } else {
            sqlx::query_as(
                r#"UPDATE employees SET name = $2, username = $3, role = $4, store_id = $5,
                is_active = $6, monthly_revenue_target = $7 WHERE id = $1 RETURNING *"#,
            )
            .bind(employee.id as i64)
            .bind(&employee.name)
            .bind(&employee.username)
            .bind(role_to_str(employee.role))
            .bind(employee.store_id.map(|id| id as i64))
            .bind(employee.is_active)
            .bind(employee.monthly_revenue_target)
            .fetch_one(&mut *self.connection)
            .await
            .map_err(to_service_error)?
        };

        row.try_into()
    }

    pub async fn delete_employee(&mut self, id: u64) -> ServiceResult<()> {
        sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id as i64)
            .execute(&mut *self.connection)
            .await
            .map_err(to_service_error)?;

        Ok(())
    }

    pub async fn set_password_hash(
        &mut self,
        employee_id: u64,
        password_hash: Vec<u8>,
    ) -> ServiceResult<()> {
        sqlx::query(
            r#"INSERT INTO employee_credentials (employee_id, password_hash) VALUES ($1, $2)
            ON CONFLICT (employee_id) DO UPDATE SET password_hash = $2"#,
        )
        .bind(employee_id as i64)
        .bind(&password_hash)
        .execute(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        Ok(())
    }

    pub async fn get_password_hash(&mut self, employee_id: u64) -> ServiceResult<Option<Vec<u8>>> {
        let hash = sqlx::query_scalar(
            "SELECT password_hash FROM employee_credentials WHERE employee_id = $1",
        )
        .bind(employee_id as i64)
        .fetch_optional(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        Ok(hash)
    }

    pub async fn set_revenue_target(&mut self, employee_id: u64, cents: i64) -> ServiceResult<()> {
        let result = sqlx::query("UPDATE employees SET monthly_revenue_target = $2 WHERE id = $1")
            .bind(employee_id as i64)
            .bind(cents)
            .execute(&mut *self.connection)
            .await
            .map_err(to_service_error)?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound);
        }
        Ok(())
    }

    // ---- balances ----

    pub async fn get_points_balance(&mut self, employee_id: u64) -> ServiceResult<i32> {
        let balance: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(points), 0)::BIGINT FROM employee_events WHERE employee_id = $1",
        )
        .bind(employee_id as i64)
        .fetch_one(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        Ok(balance as i32)
    }

    /// Derived balance, earned total, monthly revenue and rank for one
    /// employee. Everything is computed from the ledgers, nothing is read
    /// from a stored counter.
    pub async fn get_employee_summary(
        &mut self,
        employee_id: u64,
        today: NaiveDate,
    ) -> ServiceResult<models::EmployeeSummary> {
        let employee = self
            .get_employee_by_id(employee_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        let month = models::month_start(today);

        let row = sqlx::query(
            r#"SELECT
                COALESCE(SUM(points), 0)::BIGINT AS balance,
                COALESCE(SUM(points) FILTER (WHERE points > 0), 0)::BIGINT AS earned,
                COUNT(*) FILTER (WHERE points < 0 AND redemption_id IS NULL AND timestamp >= $2) AS negative_events
            FROM employee_events WHERE employee_id = $1"#,
        )
        .bind(employee_id as i64)
        .bind(month)
        .fetch_one(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        let balance: i64 = row.try_get("balance").map_err(to_service_error)?;
        let earned: i64 = row.try_get("earned").map_err(to_service_error)?;
        let negative_events: i64 = row.try_get("negative_events").map_err(to_service_error)?;

        let revenue_actual = self
            .get_revenue_between(employee_id, month, today)
            .await?;

        let rank = if employee.is_active {
            let higher: i64 = sqlx::query_scalar(
                r#"SELECT COUNT(*) FROM (
                    SELECT e.id, COALESCE(SUM(ev.points), 0) AS balance
                    FROM employees e
                    LEFT JOIN employee_events ev ON ev.employee_id = e.id
                    WHERE e.is_active = TRUE
                    GROUP BY e.id
                ) ranking WHERE ranking.balance > $1"#,
            )
            .bind(balance)
            .fetch_one(&mut *self.connection)
            .await
            .map_err(to_service_error)?;

            Some(higher as u64 + 1)
        } else {
            None
        };

        Ok(models::EmployeeSummary {
            employee_id,
            points_balance: balance as i32,
            total_earned_points: earned as i32,
            negative_event_count: negative_events,
            monthly_revenue_target: employee.monthly_revenue_target,
            monthly_revenue_actual: revenue_actual,
            rank,
        })
    }

    /// Active employees with their derived balances, highest first.
    pub async fn get_leaderboard(&mut self) -> ServiceResult<Vec<(models::Employee, i32)>> {
        let rows = sqlx::query(
            r#"SELECT e.id, e.name, e.username, e.role, e.store_id, e.is_active,
                e.monthly_revenue_target, COALESCE(SUM(ev.points), 0)::BIGINT AS balance
            FROM employees e
            LEFT JOIN employee_events ev ON ev.employee_id = e.id
            WHERE e.is_active = TRUE
            GROUP BY e.id
            ORDER BY balance DESC, e.id"#,
        )
        .fetch_all(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let employee = models::Employee {
                id: row.try_get::<i64, _>("id").map_err(to_service_error)? as u64,
                name: row.try_get("name").map_err(to_service_error)?,
                username: row.try_get("username").map_err(to_service_error)?,
                role: role_from_str(row.try_get("role").map_err(to_service_error)?)?,
                store_id: row
                    .try_get::<Option<i64>, _>("store_id")
                    .map_err(to_service_error)?
                    .map(|id| id as u64),
                is_active: row.try_get("is_active").map_err(to_service_error)?,
                monthly_revenue_target: row
                    .try_get("monthly_revenue_target")
                    .map_err(to_service_error)?,
            };
            let balance: i64 = row.try_get("balance").map_err(to_service_error)?;
            result.push((employee, balance as i32));
        }

        Ok(result)
    }

    // ---- event types ----

    pub async fn get_all_event_types(&mut self) -> ServiceResult<Vec<models::EventType>> {
        let rows: Vec<EventTypeRow> =
            sqlx::query_as("SELECT * FROM events_settings ORDER BY sort_order, id")
                .fetch_all(&mut *self.connection)
                .await
                .map_err(to_service_error)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn get_event_type_by_id(
        &mut self,
        id: u64,
    ) -> ServiceResult<Option<models::EventType>> {
        let row: Option<EventTypeRow> = sqlx::query_as("SELECT * FROM events_settings WHERE id = $1")
            .bind(id as i64)
            .fetch_optional(&mut *self.connection)
            .await
            .map_err(to_service_error)?;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn store_event_type(
        &mut self,
        event_type: models::EventType,
    ) -> ServiceResult<models::EventType> {
        let row: EventTypeRow = if event_type.id == 0 {
            sqlx::query_as(
                r#"INSERT INTO events_settings (name, points, polarity, is_enabled, sort_order)
                VALUES ($1, $2, $3, $4, $5) RETURNING *"#,
            )
            .bind(&event_type.name)
            .bind(event_type.points)
            .bind(polarity_to_str(event_type.polarity))
            .bind(event_type.is_enabled)
            .bind(event_type.sort_order)
            .fetch_one(&mut *self.connection)
            .await
            .map_err(to_service_error)?
        } else {
            sqlx::query_as(
                r#"UPDATE events_settings SET name = $2, points = $3, polarity = $4,
                is_enabled = $5, sort_order = $6 WHERE id = $1 RETURNING *"#,
            )
            .bind(event_type.id as i64)
            .bind(&event_type.name)
            .bind(event_type.points)
            .bind(polarity_to_str(event_type.polarity))
            .bind(event_type.is_enabled)
            .bind(event_type.sort_order)
            .fetch_one(&mut *self.connection)
            .await
            .map_err(to_service_error)?
        };

        row.try_into()
    }

    pub async fn delete_event_type(&mut self, id: u64) -> ServiceResult<()> {
        sqlx::query("DELETE FROM events_settings WHERE id = $1")
            .bind(id as i64)
            .execute(&mut *self.connection)
            .await
            .map_err(to_service_error)?;

        Ok(())
    }

    // ---- ledger & event submission ----

    pub async fn get_ledger_by_employee(
        &mut self,
        employee_id: u64,
    ) -> ServiceResult<Vec<models::LedgerEntry>> {
        let rows: Vec<LedgerRow> = sqlx::query_as(
            "SELECT * FROM employee_events WHERE employee_id = $1 ORDER BY timestamp DESC, id DESC",
        )
        .bind(employee_id as i64)
        .fetch(&mut *self.connection)
        .try_collect()
        .await
        .map_err(to_service_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Record one or more events for an employee in a single transaction.
    ///
    /// Inserts one signed ledger row per event type. A positive sale amount
    /// additionally writes exactly one revenue entry dated `entry_date`;
    /// there is no second path into the revenue data.
    pub async fn submit_events(
        &mut self,
        employee_id: u64,
        event_types: &[models::EventType],
        description: Option<String>,
        amount_cents: Option<i64>,
        entry_date: NaiveDate,
    ) -> ServiceResult<Vec<models::LedgerEntry>> {
        for event_type in event_types {
            if !event_type.is_enabled {
                return Err(ServiceError::BadRequest(format!(
                    "Event type '{}' is disabled.",
                    event_type.name
                )));
            }
        }
        if let Some(amount) = amount_cents {
            if amount < 0 {
                return Err(ServiceError::BadRequest(
                    "Sale amount cannot be negative.".to_string(),
                ));
            }
        }

        let mut tx = self.connection.begin().await.map_err(to_service_error)?;

        // Serializes against concurrent balance checks for this employee.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(employee_id as i64)
            .execute(&mut *tx)
            .await
            .map_err(to_service_error)?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM employees WHERE id = $1")
            .bind(employee_id as i64)
            .fetch_optional(&mut *tx)
            .await
            .map_err(to_service_error)?;
        if exists.is_none() {
            return Err(ServiceError::NotFound);
        }

        let mut entries = Vec::with_capacity(event_types.len());
        for event_type in event_types {
            let row: LedgerRow = sqlx::query_as(
                r#"INSERT INTO employee_events (employee_id, event_type, points, description)
                VALUES ($1, $2, $3, $4) RETURNING *"#,
            )
            .bind(employee_id as i64)
            .bind(&event_type.name)
            .bind(event_type.signed_points())
            .bind(&description)
            .fetch_one(&mut *tx)
            .await
            .map_err(to_service_error)?;

            entries.push(row.into());
        }

        if let Some(amount) = amount_cents {
            if amount > 0 {
                sqlx::query(
                    "INSERT INTO revenue_entries (employee_id, entry_date, amount_cents) VALUES ($1, $2, $3)",
                )
                .bind(employee_id as i64)
                .bind(entry_date)
                .bind(amount)
                .execute(&mut *tx)
                .await
                .map_err(to_service_error)?;
            }
        }

        tx.commit().await.map_err(to_service_error)?;

        Ok(entries)
    }

    // ---- employee requests ----

    pub async fn create_request(
        &mut self,
        employee_id: u64,
        event_type_id: u64,
        description: Option<String>,
        amount_cents: Option<i64>,
    ) -> ServiceResult<models::EmployeeRequest> {
        if let Some(amount) = amount_cents {
            if amount < 0 {
                return Err(ServiceError::BadRequest(
                    "Sale amount cannot be negative.".to_string(),
                ));
            }
        }

        let row: RequestRow = sqlx::query_as(
            r#"INSERT INTO employee_requests (employee_id, event_type_id, description, amount_cents)
            VALUES ($1, $2, $3, $4) RETURNING *"#,
        )
        .bind(employee_id as i64)
        .bind(event_type_id as i64)
        .bind(&description)
        .bind(amount_cents)
        .fetch_one(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        row.try_into()
    }

    pub async fn get_requests(
        &mut self,
        status: Option<models::RequestStatus>,
    ) -> ServiceResult<Vec<models::EmployeeRequest>> {
        let rows: Vec<RequestRow> = match status {
            Some(status) => {
                sqlx::query_as(
                    "SELECT * FROM employee_requests WHERE status = $1 ORDER BY created_at DESC, id DESC",
                )
                .bind(request_status_to_str(status))
                .fetch_all(&mut *self.connection)
                .await
            }
            None => {
                sqlx::query_as("SELECT * FROM employee_requests ORDER BY created_at DESC, id DESC")
                    .fetch_all(&mut *self.connection)
                    .await
            }
        }
        .map_err(to_service_error)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn get_requests_by_employee(
        &mut self,
        employee_id: u64,
    ) -> ServiceResult<Vec<models::EmployeeRequest>> {
        let rows: Vec<RequestRow> = sqlx::query_as(
            "SELECT * FROM employee_requests WHERE employee_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(employee_id as i64)
        .fetch_all(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn get_request_by_id(
        &mut self,
        id: u64,
    ) -> ServiceResult<Option<models::EmployeeRequest>> {
        let row: Option<RequestRow> = sqlx::query_as("SELECT * FROM employee_requests WHERE id = $1")
            .bind(id as i64)
            .fetch_optional(&mut *self.connection)
            .await
            .map_err(to_service_error)?;

        row.map(TryInto::try_into).transpose()
    }

    /// Approve a pending request: status transition, ledger insert and
    /// revenue entry happen in one transaction, there are no partially
    /// applied approvals. A concurrent decision surfaces as a conflict.
    pub async fn approve_request(
        &mut self,
        id: u64,
        amount_override: Option<i64>,
    ) -> ServiceResult<models::EmployeeRequest> {
        let mut tx = self.connection.begin().await.map_err(to_service_error)?;

        let row: Option<RequestRow> =
            sqlx::query_as("SELECT * FROM employee_requests WHERE id = $1 FOR UPDATE")
                .bind(id as i64)
                .fetch_optional(&mut *tx)
                .await
                .map_err(to_service_error)?;
        let request: models::EmployeeRequest =
            row.ok_or(ServiceError::NotFound)?.try_into()?;

        if request.status != models::RequestStatus::Pending {
            return Err(ServiceError::Conflict(
                "Request was already processed.".to_string(),
            ));
        }

        let event_type_row: EventTypeRow =
            sqlx::query_as("SELECT * FROM events_settings WHERE id = $1")
                .bind(request.event_type_id as i64)
                .fetch_one(&mut *tx)
                .await
                .map_err(to_service_error)?;
        let event_type: models::EventType = event_type_row.try_into()?;

        let amount = amount_override.or(request.amount_cents);
        if let Some(amount) = amount {
            if amount < 0 {
                return Err(ServiceError::BadRequest(
                    "Sale amount cannot be negative.".to_string(),
                ));
            }
        }

        // Serializes against concurrent balance checks for this employee.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(request.employee_id as i64)
            .execute(&mut *tx)
            .await
            .map_err(to_service_error)?;

        let row: RequestRow = sqlx::query_as(
            "UPDATE employee_requests SET status = 'approved', amount_cents = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id as i64)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(to_service_error)?;

        sqlx::query(
            r#"INSERT INTO employee_events (employee_id, event_type, points, description)
            VALUES ($1, $2, $3, $4)"#,
        )
        .bind(request.employee_id as i64)
        .bind(&event_type.name)
        .bind(event_type.signed_points())
        .bind(&request.description)
        .execute(&mut *tx)
        .await
        .map_err(to_service_error)?;

        if let Some(amount) = amount {
            if amount > 0 {
                sqlx::query(
                    r#"INSERT INTO revenue_entries (employee_id, entry_date, amount_cents, request_id)
                    VALUES ($1, $2, $3, $4)"#,
                )
                .bind(request.employee_id as i64)
                .bind(request.created_at.date_naive())
                .bind(amount)
                .bind(id as i64)
                .execute(&mut *tx)
                .await
                .map_err(to_service_error)?;
            }
        }

        sqlx::query("INSERT INTO notifications (employee_id, message) VALUES ($1, $2)")
            .bind(request.employee_id as i64)
            .bind(format!("Your '{}' request was approved.", event_type.name))
            .execute(&mut *tx)
            .await
            .map_err(to_service_error)?;

        tx.commit().await.map_err(to_service_error)?;

        row.try_into()
    }

    pub async fn reject_request(&mut self, id: u64) -> ServiceResult<models::EmployeeRequest> {
        let mut tx = self.connection.begin().await.map_err(to_service_error)?;

        let row: Option<RequestRow> = sqlx::query_as(
            "UPDATE employee_requests SET status = 'rejected' WHERE id = $1 AND status = 'pending' RETURNING *",
        )
        .bind(id as i64)
        .fetch_optional(&mut *tx)
        .await
        .map_err(to_service_error)?;

        let row = match row {
            Some(row) => row,
            None => {
                let exists: Option<i64> =
                    sqlx::query_scalar("SELECT id FROM employee_requests WHERE id = $1")
                        .bind(id as i64)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(to_service_error)?;
                return match exists {
                    Some(_) => Err(ServiceError::Conflict(
                        "Request was already processed.".to_string(),
                    )),
                    None => Err(ServiceError::NotFound),
                };
            }
        };

        sqlx::query("INSERT INTO notifications (employee_id, message) VALUES ($1, $2)")
            .bind(row.employee_id)
            .bind("Your event request was rejected.")
            .execute(&mut *tx)
            .await
            .map_err(to_service_error)?;

        tx.commit().await.map_err(to_service_error)?;

        row.try_into()
    }

    // ---- rewards ----

    pub async fn get_all_rewards(&mut self) -> ServiceResult<Vec<models::Reward>> {
        let rows: Vec<RewardRow> = sqlx::query_as("SELECT * FROM rewards_catalog ORDER BY id")
            .fetch_all(&mut *self.connection)
            .await
            .map_err(to_service_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_reward_by_id(&mut self, id: u64) -> ServiceResult<Option<models::Reward>> {
        let row: Option<RewardRow> = sqlx::query_as("SELECT * FROM rewards_catalog WHERE id = $1")
            .bind(id as i64)
            .fetch_optional(&mut *self.connection)
            .await
            .map_err(to_service_error)?;

        Ok(row.map(Into::into))
    }

    pub async fn store_reward(&mut self, reward: models::Reward) -> ServiceResult<models::Reward> {
        let row: RewardRow = if reward.id == 0 {
            sqlx::query_as(
                r#"INSERT INTO rewards_catalog (name, points_cost, stock, is_enabled)
                VALUES ($1, $2, $3, $4) RETURNING *"#,
            )
            .bind(&reward.name)
            .bind(reward.points_cost)
            .bind(reward.stock)
            .bind(reward.is_enabled)
            .fetch_one(&mut *self.connection)
            .await
            .map_err(to_service_error)?
        } else {
            sqlx::query_as(
                r#"UPDATE rewards_catalog SET name = $2, points_cost = $3, stock = $4,
                is_enabled = $5 WHERE id = $1 RETURNING *"#,
            )
            .bind(reward.id as i64)
            .bind(&reward.name)
            .bind(reward.points_cost)
            .bind(reward.stock)
            .bind(reward.is_enabled)
            .fetch_one(&mut *self.connection)
            .await
            .map_err(to_service_error)?
        };

        Ok(row.into())
    }

    pub async fn delete_reward(&mut self, id: u64) -> ServiceResult<()> {
        sqlx::query("DELETE FROM rewards_catalog WHERE id = $1")
            .bind(id as i64)
            .execute(&mut *self.connection)
            .await
            .map_err(to_service_error)?;

        Ok(())
    }

    // ---- redemptions ----

    /// Create a pending redemption. The balance and stock checks run inside
    /// the transaction so a submission can never reference an unavailable
    /// reward, but points are only deducted on approval.
    pub async fn create_redemption(
        &mut self,
        employee_id: u64,
        reward_id: u64,
        note: Option<String>,
    ) -> ServiceResult<models::Redemption> {
        let mut tx = self.connection.begin().await.map_err(to_service_error)?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(employee_id as i64)
            .execute(&mut *tx)
            .await
            .map_err(to_service_error)?;

        let reward_row: Option<RewardRow> =
            sqlx::query_as("SELECT * FROM rewards_catalog WHERE id = $1")
                .bind(reward_id as i64)
                .fetch_optional(&mut *tx)
                .await
                .map_err(to_service_error)?;
        let reward: models::Reward = reward_row.ok_or(ServiceError::NotFound)?.into();

        if !reward.is_enabled {
            return Err(ServiceError::BadRequest(
                "This reward is not available.".to_string(),
            ));
        }
        if reward.stock <= 0 {
            return Err(ServiceError::BadRequest(
                "This reward is out of stock.".to_string(),
            ));
        }

        let balance: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(points), 0)::BIGINT FROM employee_events WHERE employee_id = $1",
        )
        .bind(employee_id as i64)
        .fetch_one(&mut *tx)
        .await
        .map_err(to_service_error)?;

        if balance < reward.points_cost as i64 {
            return Err(ServiceError::BadRequest(
                "Insufficient points balance.".to_string(),
            ));
        }

        let row: RedemptionRow = sqlx::query_as(
            r#"INSERT INTO reward_redemptions (employee_id, reward_id, points_cost, note)
            VALUES ($1, $2, $3, $4) RETURNING *"#,
        )
        .bind(employee_id as i64)
        .bind(reward_id as i64)
        .bind(reward.points_cost)
        .bind(&note)
        .fetch_one(&mut *tx)
        .await
        .map_err(to_service_error)?;

        tx.commit().await.map_err(to_service_error)?;

        row.try_into()
    }

    pub async fn get_redemptions(
        &mut self,
        status: Option<models::RedemptionStatus>,
    ) -> ServiceResult<Vec<models::Redemption>> {
        let rows: Vec<RedemptionRow> = match status {
            Some(status) => {
                sqlx::query_as(
                    "SELECT * FROM reward_redemptions WHERE status = $1 ORDER BY created_at DESC, id DESC",
                )
                .bind(redemption_status_to_str(status))
                .fetch_all(&mut *self.connection)
                .await
            }
            None => {
                sqlx::query_as("SELECT * FROM reward_redemptions ORDER BY created_at DESC, id DESC")
                    .fetch_all(&mut *self.connection)
                    .await
            }
        }
        .map_err(to_service_error)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn get_redemptions_by_employee(
        &mut self,
        employee_id: u64,
    ) -> ServiceResult<Vec<models::Redemption>> {
        let rows: Vec<RedemptionRow> = sqlx::query_as(
            "SELECT * FROM reward_redemptions WHERE employee_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(employee_id as i64)
        .fetch_all(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn get_redemption_by_id(
        &mut self,
        id: u64,
    ) -> ServiceResult<Option<models::Redemption>> {
        let row: Option<RedemptionRow> =
            sqlx::query_as("SELECT * FROM reward_redemptions WHERE id = $1")
                .bind(id as i64)
                .fetch_optional(&mut *self.connection)
                .await
                .map_err(to_service_error)?;

        row.map(TryInto::try_into).transpose()
    }

    /// Conditional update on `(status, version)`. Zero affected rows means
    /// the redemption was decided or modified since the caller read it.
    pub async fn update_redemption_note(
        &mut self,
        id: u64,
        employee_id: u64,
        version: i32,
        note: Option<String>,
    ) -> ServiceResult<models::Redemption> {
        let row: Option<RedemptionRow> = sqlx::query_as(
            r#"UPDATE reward_redemptions SET note = $4, version = version + 1
            WHERE id = $1 AND employee_id = $2 AND status = 'pending' AND version = $3
            RETURNING *"#,
        )
        .bind(id as i64)
        .bind(employee_id as i64)
        .bind(version)
        .bind(&note)
        .fetch_optional(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        match row {
            Some(row) => row.try_into(),
            None => self.redemption_conflict(id, employee_id).await,
        }
    }

    pub async fn cancel_redemption(
        &mut self,
        id: u64,
        employee_id: u64,
        version: i32,
    ) -> ServiceResult<models::Redemption> {
        let row: Option<RedemptionRow> = sqlx::query_as(
            r#"UPDATE reward_redemptions SET status = 'cancelled', version = version + 1
            WHERE id = $1 AND employee_id = $2 AND status = 'pending' AND version = $3
            RETURNING *"#,
        )
        .bind(id as i64)
        .bind(employee_id as i64)
        .bind(version)
        .fetch_optional(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        match row {
            Some(row) => row.try_into(),
            None => self.redemption_conflict(id, employee_id).await,
        }
    }

    async fn redemption_conflict(
        &mut self,
        id: u64,
        employee_id: u64,
    ) -> ServiceResult<models::Redemption> {
        let exists: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM reward_redemptions WHERE id = $1 AND employee_id = $2",
        )
        .bind(id as i64)
        .bind(employee_id as i64)
        .fetch_optional(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        match exists {
            Some(_) => Err(ServiceError::Conflict(
                "Redemption was already processed.".to_string(),
            )),
            None => Err(ServiceError::NotFound),
        }
    }

    /// Approve a pending redemption: balance check, stock decrement, ledger
    /// insert and status update form one transaction. Insufficient balance
    /// fails the whole approval and leaves the balance unchanged.
    pub async fn approve_redemption(&mut self, id: u64) -> ServiceResult<models::Redemption> {
        let mut tx = self.connection.begin().await.map_err(to_service_error)?;

        let row: Option<RedemptionRow> =
            sqlx::query_as("SELECT * FROM reward_redemptions WHERE id = $1 FOR UPDATE")
                .bind(id as i64)
                .fetch_optional(&mut *tx)
                .await
                .map_err(to_service_error)?;
        let redemption: models::Redemption = row.ok_or(ServiceError::NotFound)?.try_into()?;

        if redemption.status != models::RedemptionStatus::Pending {
            return Err(ServiceError::Conflict(
                "Redemption was already processed.".to_string(),
            ));
        }

        // Serializes against concurrent ledger writes for this employee.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(redemption.employee_id as i64)
            .execute(&mut *tx)
            .await
            .map_err(to_service_error)?;

        let balance: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(points), 0)::BIGINT FROM employee_events WHERE employee_id = $1",
        )
        .bind(redemption.employee_id as i64)
        .fetch_one(&mut *tx)
        .await
        .map_err(to_service_error)?;

        if balance < redemption.points_cost as i64 {
            return Err(ServiceError::BadRequest(
                "Insufficient points balance.".to_string(),
            ));
        }

        let stock_update = sqlx::query(
            "UPDATE rewards_catalog SET stock = stock - 1 WHERE id = $1 AND stock > 0",
        )
        .bind(redemption.reward_id as i64)
        .execute(&mut *tx)
        .await
        .map_err(to_service_error)?;
        if stock_update.rows_affected() == 0 {
            return Err(ServiceError::Conflict(
                "Reward is out of stock.".to_string(),
            ));
        }

        sqlx::query(
            r#"INSERT INTO employee_events (employee_id, event_type, points, description, redemption_id)
            VALUES ($1, 'Reward redemption', $2, $3, $4)"#,
        )
        .bind(redemption.employee_id as i64)
        .bind(-redemption.points_cost)
        .bind(&redemption.note)
        .bind(id as i64)
        .execute(&mut *tx)
        .await
        .map_err(to_service_error)?;

        let delivered_code = generate_token(9);
        let row: RedemptionRow = sqlx::query_as(
            r#"UPDATE reward_redemptions SET status = 'approved', version = version + 1,
            delivered_code = $2 WHERE id = $1 RETURNING *"#,
        )
        .bind(id as i64)
        .bind(&delivered_code)
        .fetch_one(&mut *tx)
        .await
        .map_err(to_service_error)?;

        sqlx::query("INSERT INTO notifications (employee_id, message) VALUES ($1, $2)")
            .bind(redemption.employee_id as i64)
            .bind("Your reward redemption was approved.")
            .execute(&mut *tx)
            .await
            .map_err(to_service_error)?;

        tx.commit().await.map_err(to_service_error)?;

        row.try_into()
    }

    pub async fn reject_redemption(&mut self, id: u64) -> ServiceResult<models::Redemption> {
        let mut tx = self.connection.begin().await.map_err(to_service_error)?;

        let row: Option<RedemptionRow> = sqlx::query_as(
            r#"UPDATE reward_redemptions SET status = 'rejected', version = version + 1
            WHERE id = $1 AND status = 'pending' RETURNING *"#,
        )
        .bind(id as i64)
        .fetch_optional(&mut *tx)
        .await
        .map_err(to_service_error)?;

        let row = match row {
            Some(row) => row,
            None => {
                let exists: Option<i64> =
                    sqlx::query_scalar("SELECT id FROM reward_redemptions WHERE id = $1")
                        .bind(id as i64)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(to_service_error)?;
                return match exists {
                    Some(_) => Err(ServiceError::Conflict(
                        "Redemption was already processed.".to_string(),
                    )),
                    None => Err(ServiceError::NotFound),
                };
            }
        };

        sqlx::query("INSERT INTO notifications (employee_id, message) VALUES ($1, $2)")
            .bind(row.employee_id)
            .bind("Your reward redemption was rejected.")
            .execute(&mut *tx)
            .await
            .map_err(to_service_error)?;

        tx.commit().await.map_err(to_service_error)?;

        row.try_into()
    }

    // ---- revenue ----

    pub async fn get_revenue_between(
        &mut self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ServiceResult<i64> {
        let sum: i64 = sqlx::query_scalar(
            r#"SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM revenue_entries
            WHERE employee_id = $1 AND entry_date >= $2 AND entry_date <= $3"#,
        )
        .bind(employee_id as i64)
        .bind(from)
        .bind(to)
        .fetch_one(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        Ok(sum)
    }

    pub async fn get_revenue_entries(
        &mut self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ServiceResult<Vec<models::RevenueEntry>> {
        let rows: Vec<RevenueRow> = sqlx::query_as(
            r#"SELECT * FROM revenue_entries
            WHERE employee_id = $1 AND entry_date >= $2 AND entry_date <= $3
            ORDER BY entry_date, id"#,
        )
        .bind(employee_id as i64)
        .bind(from)
        .bind(to)
        .fetch_all(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    // ---- kudos ----

    pub async fn create_kudos(
        &mut self,
        from_employee_id: u64,
        to_employee_id: u64,
        message: String,
    ) -> ServiceResult<models::Kudos> {
        let row: KudosRow = sqlx::query_as(
            r#"INSERT INTO employee_feedback (from_employee_id, to_employee_id, message)
            VALUES ($1, $2, $3) RETURNING *"#,
        )
        .bind(from_employee_id as i64)
        .bind(to_employee_id as i64)
        .bind(&message)
        .fetch_one(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        row.try_into()
    }

    pub async fn get_kudos(
        &mut self,
        status: Option<models::RequestStatus>,
    ) -> ServiceResult<Vec<models::Kudos>> {
        let rows: Vec<KudosRow> = match status {
            Some(status) => {
                sqlx::query_as(
                    "SELECT * FROM employee_feedback WHERE status = $1 ORDER BY created_at DESC, id DESC",
                )
                .bind(request_status_to_str(status))
                .fetch_all(&mut *self.connection)
                .await
            }
            None => {
                sqlx::query_as("SELECT * FROM employee_feedback ORDER BY created_at DESC, id DESC")
                    .fetch_all(&mut *self.connection)
                    .await
            }
        }
        .map_err(to_service_error)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn get_kudos_for_employee(
        &mut self,
        employee_id: u64,
        approved_only: bool,
    ) -> ServiceResult<Vec<models::Kudos>> {
        let rows: Vec<KudosRow> = if approved_only {
            sqlx::query_as(
                r#"SELECT * FROM employee_feedback
                WHERE to_employee_id = $1 AND status = 'approved'
                ORDER BY created_at DESC, id DESC"#,
            )
            .bind(employee_id as i64)
            .fetch_all(&mut *self.connection)
            .await
        } else {
            sqlx::query_as(
                "SELECT * FROM employee_feedback WHERE to_employee_id = $1 ORDER BY created_at DESC, id DESC",
            )
            .bind(employee_id as i64)
            .fetch_all(&mut *self.connection)
            .await
        }
        .map_err(to_service_error)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn decide_kudos(
        &mut self,
        id: u64,
        approve: bool,
    ) -> ServiceResult<models::Kudos> {
        let mut tx = self.connection.begin().await.map_err(to_service_error)?;

        let status = if approve { "approved" } else { "rejected" };
        let row: Option<KudosRow> = sqlx::query_as(
            "UPDATE employee_feedback SET status = $2 WHERE id = $1 AND status = 'pending' RETURNING *",
        )
        .bind(id as i64)
        .bind(status)
        .fetch_optional(&mut *tx)
        .await
        .map_err(to_service_error)?;

        let row = match row {
            Some(row) => row,
            None => {
                let exists: Option<i64> =
                    sqlx::query_scalar("SELECT id FROM employee_feedback WHERE id = $1")
                        .bind(id as i64)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(to_service_error)?;
                return match exists {
                    Some(_) => Err(ServiceError::Conflict(
                        "Kudos was already processed.".to_string(),
                    )),
                    None => Err(ServiceError::NotFound),
                };
            }
        };

        if approve {
            sqlx::query("INSERT INTO notifications (employee_id, message) VALUES ($1, $2)")
                .bind(row.to_employee_id)
                .bind("You received kudos from a colleague.")
                .execute(&mut *tx)
                .await
                .map_err(to_service_error)?;
        }

        tx.commit().await.map_err(to_service_error)?;

        row.try_into()
    }

    // ---- bonuses ----

    pub async fn create_bonus_request(
        &mut self,
        employee_id: u64,
        proposed_by_id: u64,
        bonus_type: models::BonusType,
        value: i64,
    ) -> ServiceResult<models::BonusRequest> {
        // The ledger stores points as INT, a larger value would be truncated
        // on approval.
        if bonus_type == models::BonusType::Points && i32::try_from(value).is_err() {
            return Err(ServiceError::BadRequest(
                "Bonus points value is out of range.".to_string(),
            ));
        }

        let row: BonusRow = sqlx::query_as(
            r#"INSERT INTO bonus_requests (employee_id, proposed_by_id, bonus_type, value)
            VALUES ($1, $2, $3, $4) RETURNING *"#,
        )
        .bind(employee_id as i64)
        .bind(proposed_by_id as i64)
        .bind(bonus_type_to_str(bonus_type))
        .bind(value)
        .fetch_one(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        row.try_into()
    }

    pub async fn get_bonus_requests(
        &mut self,
        status: Option<models::RequestStatus>,
    ) -> ServiceResult<Vec<models::BonusRequest>> {
        let rows: Vec<BonusRow> = match status {
            Some(status) => {
                sqlx::query_as(
                    "SELECT * FROM bonus_requests WHERE status = $1 ORDER BY created_at DESC, id DESC",
                )
                .bind(request_status_to_str(status))
                .fetch_all(&mut *self.connection)
                .await
            }
            None => {
                sqlx::query_as("SELECT * FROM bonus_requests ORDER BY created_at DESC, id DESC")
                    .fetch_all(&mut *self.connection)
                    .await
            }
        }
        .map_err(to_service_error)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn get_bonus_request_by_id(
        &mut self,
        id: u64,
    ) -> ServiceResult<Option<models::BonusRequest>> {
        let row: Option<BonusRow> = sqlx::query_as("SELECT * FROM bonus_requests WHERE id = $1")
            .bind(id as i64)
            .fetch_optional(&mut *self.connection)
            .await
            .map_err(to_service_error)?;

        row.map(TryInto::try_into).transpose()
    }

    /// Approve a bonus. POINTS bonuses append a ledger entry so the derived
    /// balance stays consistent, EUR bonuses produce a payout record.
    pub async fn approve_bonus(&mut self, id: u64) -> ServiceResult<models::BonusRequest> {
        let mut tx = self.connection.begin().await.map_err(to_service_error)?;

        let row: Option<BonusRow> =
            sqlx::query_as("SELECT * FROM bonus_requests WHERE id = $1 FOR UPDATE")
                .bind(id as i64)
                .fetch_optional(&mut *tx)
                .await
                .map_err(to_service_error)?;
        let bonus: models::BonusRequest = row.ok_or(ServiceError::NotFound)?.try_into()?;

        if bonus.status != models::RequestStatus::Pending {
            return Err(ServiceError::Conflict(
                "Bonus request was already processed.".to_string(),
            ));
        }

        let row: BonusRow = sqlx::query_as(
            "UPDATE bonus_requests SET status = 'approved' WHERE id = $1 RETURNING *",
        )
        .bind(id as i64)
        .fetch_one(&mut *tx)
        .await
        .map_err(to_service_error)?;

        match bonus.bonus_type {
            models::BonusType::Points => {
                let points = i32::try_from(bonus.value).map_err(|_| {
                    ServiceError::InternalServerError(
                        "Bonus points value does not fit the ledger.".to_string(),
                    )
                })?;
                sqlx::query(
                    r#"INSERT INTO employee_events (employee_id, event_type, points, description)
                    VALUES ($1, 'Bonus', $2, $3)"#,
                )
                .bind(bonus.employee_id as i64)
                .bind(points)
                .bind("Monthly bonus")
                .execute(&mut *tx)
                .await
                .map_err(to_service_error)?;
            }
            models::BonusType::Eur => {
                sqlx::query(
                    r#"INSERT INTO bonus_payouts (employee_id, bonus_request_id, amount_cents)
                    VALUES ($1, $2, $3)"#,
                )
                .bind(bonus.employee_id as i64)
                .bind(id as i64)
                .bind(bonus.value)
                .execute(&mut *tx)
                .await
                .map_err(to_service_error)?;
            }
        }

        sqlx::query("INSERT INTO notifications (employee_id, message) VALUES ($1, $2)")
            .bind(bonus.employee_id as i64)
            .bind("Your monthly bonus was approved.")
            .execute(&mut *tx)
            .await
            .map_err(to_service_error)?;

        tx.commit().await.map_err(to_service_error)?;

        row.try_into()
    }

    pub async fn reject_bonus(&mut self, id: u64) -> ServiceResult<models::BonusRequest> {
        let row: Option<BonusRow> = sqlx::query_as(
            "UPDATE bonus_requests SET status = 'rejected' WHERE id = $1 AND status = 'pending' RETURNING *",
        )
        .bind(id as i64)
        .fetch_optional(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        match row {
            Some(row) => row.try_into(),
            None => {
                let exists: Option<i64> =
                    sqlx::query_scalar("SELECT id FROM bonus_requests WHERE id = $1")
                        .bind(id as i64)
                        .fetch_optional(&mut *self.connection)
                        .await
                        .map_err(to_service_error)?;
                match exists {
                    Some(_) => Err(ServiceError::Conflict(
                        "Bonus request was already processed.".to_string(),
                    )),
                    None => Err(ServiceError::NotFound),
                }
            }
        }
    }

    pub async fn get_payouts_by_employee(
        &mut self,
        employee_id: u64,
    ) -> ServiceResult<Vec<models::BonusPayout>> {
        let rows: Vec<PayoutRow> = sqlx::query_as(
            "SELECT * FROM bonus_payouts WHERE employee_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(employee_id as i64)
        .fetch_all(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    // ---- notifications ----

    pub async fn get_notifications_by_employee(
        &mut self,
        employee_id: u64,
    ) -> ServiceResult<Vec<models::Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            "SELECT * FROM notifications WHERE employee_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(employee_id as i64)
        .fetch_all(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn mark_notification_read(
        &mut self,
        id: u64,
        employee_id: u64,
    ) -> ServiceResult<()> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND employee_id = $2",
        )
        .bind(id as i64)
        .bind(employee_id as i64)
        .execute(&mut *self.connection)
        .await
        .map_err(to_service_error)?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound);
        }
        Ok(())
    }

    // ---- stores ----

    pub async fn get_all_stores(&mut self) -> ServiceResult<Vec<models::Store>> {
        let rows = sqlx::query("SELECT id, name FROM stores ORDER BY id")
            .fetch_all(&mut *self.connection)
            .await
            .map_err(to_service_error)?;

        let mut stores = Vec::with_capacity(rows.len());
        for row in rows {
            stores.push(models::Store {
                id: row.try_get::<i64, _>("id").map_err(to_service_error)? as u64,
                name: row.try_get("name").map_err(to_service_error)?,
            });
        }

        Ok(stores)
    }

    pub async fn create_store(&mut self, name: String) -> ServiceResult<models::Store> {
        let row = sqlx::query("INSERT INTO stores (name) VALUES ($1) RETURNING id, name")
            .bind(&name)
            .fetch_one(&mut *self.connection)
            .await
            .map_err(to_service_error)?;

        Ok(models::Store {
            id: row.try_get::<i64, _>("id").map_err(to_service_error)? as u64,
            name: row.try_get("name").map_err(to_service_error)?,
        })
    }
}
