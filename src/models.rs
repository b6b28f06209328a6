use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// Points an employee is expected to collect per month. The progress
/// percentage in the employee summary is computed against this value.
pub const MONTHLY_TARGET_POINTS: i32 = 100;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Role {
    Employee,
    Manager,
    Admin,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Polarity {
    Positive,
    Negative,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedemptionStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BonusType {
    Eur,
    Points,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Employee {
    pub id: u64,
    pub name: String,
    pub username: Option<String>,
    pub role: Role,
    pub store_id: Option<u64>,
    pub is_active: bool,
    /// Monthly revenue target in cents. Actual revenue is always derived
    /// from the revenue entries, never stored on the employee row.
    pub monthly_revenue_target: i64,
}

impl Employee {
    pub fn is_manager(&self) -> bool {
        matches!(self.role, Role::Manager | Role::Admin)
    }
}

/// Named event template (`events_settings`). The stored `points` value is
/// an absolute amount, the signed ledger value is derived from the polarity
/// at submission time.
#[derive(Debug, PartialEq, Clone)]
pub struct EventType {
    pub id: u64,
    pub name: String,
    pub points: i32,
    pub polarity: Polarity,
    pub is_enabled: bool,
    pub sort_order: i32,
}

impl EventType {
    pub fn signed_points(&self) -> i32 {
        match self.polarity {
            Polarity::Positive => self.points.abs(),
            Polarity::Negative => -self.points.abs(),
        }
    }
}

/// One row of the append-only points ledger. The employee balance is the
/// sum of these rows; nothing ever updates or deletes them.
#[derive(Debug, PartialEq, Clone)]
pub struct LedgerEntry {
    pub id: u64,
    pub employee_id: u64,
    pub event_type: String,
    pub points: i32,
    pub description: Option<String>,
    pub redemption_id: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

/// An event proposed by an employee, awaiting a manager decision.
#[derive(Debug, PartialEq, Clone)]
pub struct EmployeeRequest {
    pub id: u64,
    pub employee_id: u64,
    pub event_type_id: u64,
    pub description: Option<String>,
    pub amount_cents: Option<i64>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Reward {
    pub id: u64,
    pub name: String,
    pub points_cost: i32,
    pub stock: i32,
    pub is_enabled: bool,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Redemption {
    pub id: u64,
    pub employee_id: u64,
    pub reward_id: u64,
    pub points_cost: i32,
    pub note: Option<String>,
    pub status: RedemptionStatus,
    /// Bumped on every mutation. Cancel/edit carry the version they read
    /// and fail when it no longer matches.
    pub version: i32,
    pub delivered_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One revenue ledger entry. Weekly and monthly figures are aggregates
/// over these rows.
#[derive(Debug, PartialEq, Clone)]
pub struct RevenueEntry {
    pub id: u64,
    pub employee_id: u64,
    pub entry_date: NaiveDate,
    pub amount_cents: i64,
    pub request_id: Option<u64>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Kudos {
    pub id: u64,
    pub from_employee_id: u64,
    pub to_employee_id: u64,
    pub message: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct BonusRequest {
    pub id: u64,
    pub employee_id: u64,
    pub proposed_by_id: u64,
    pub bonus_type: BonusType,
    /// Cents for EUR bonuses, points otherwise.
    pub value: i64,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct BonusPayout {
    pub id: u64,
    pub employee_id: u64,
    pub bonus_request_id: u64,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Notification {
    pub id: u64,
    pub employee_id: u64,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Store {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Session {
    pub employee: Employee,
    pub token: String,
    pub valid_until: DateTime<Utc>,
}

/// Derived balance and progress numbers for one employee.
#[derive(Debug, PartialEq, Clone)]
pub struct EmployeeSummary {
    pub employee_id: u64,
    pub points_balance: i32,
    pub total_earned_points: i32,
    pub negative_event_count: i64,
    pub monthly_revenue_target: i64,
    pub monthly_revenue_actual: i64,
    pub rank: Option<u64>,
}

impl EmployeeSummary {
    pub fn progress_percentage(&self) -> f64 {
        percentage(self.points_balance as i64, MONTHLY_TARGET_POINTS as i64)
    }

    pub fn sales_progress_percentage(&self) -> f64 {
        percentage(self.monthly_revenue_actual, self.monthly_revenue_target)
    }
}

/// `value / target * 100`, guarded against a zero target.
pub fn percentage(value: i64, target: i64) -> f64 {
    if target == 0 {
        return 0.0;
    }
    value as f64 / target as f64 * 100.0
}

/// Monday of the week containing `date`.
///
/// A Sunday belongs to the week that started six days earlier, it never
/// maps to the following Monday.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_start_is_monday_within_six_days() {
        let mut day = date(2023, 12, 18);
        for _ in 0..370 {
            let monday = week_start(day);
            assert_eq!(monday.weekday(), Weekday::Mon);
            assert!(monday <= day);
            assert!(day - monday <= Duration::days(6));
            day += Duration::days(1);
        }
    }

    #[test]
    fn week_start_sunday_stays_in_same_week() {
        // 2024-03-10 is a Sunday, its displayed week started on 2024-03-04.
        assert_eq!(week_start(date(2024, 3, 10)), date(2024, 3, 4));
        assert_eq!(week_start(date(2024, 3, 4)), date(2024, 3, 4));
        assert_eq!(week_start(date(2024, 3, 11)), date(2024, 3, 11));
    }

    #[test]
    fn week_start_crosses_month_and_year_boundaries() {
        assert_eq!(week_start(date(2024, 1, 1)), date(2024, 1, 1));
        assert_eq!(week_start(date(2023, 1, 1)), date(2022, 12, 26));
        assert_eq!(week_start(date(2024, 3, 1)), date(2024, 2, 26));
    }

    #[test]
    fn month_start_clamps_to_first_day() {
        assert_eq!(month_start(date(2024, 2, 29)), date(2024, 2, 1));
        assert_eq!(month_start(date(2024, 7, 1)), date(2024, 7, 1));
    }

    #[test]
    fn signed_points_follow_polarity() {
        let sale = EventType {
            id: 1,
            name: "Sale".to_string(),
            points: 10,
            polarity: Polarity::Positive,
            is_enabled: true,
            sort_order: 0,
        };
        let late = EventType {
            points: 5,
            polarity: Polarity::Negative,
            ..sale.clone()
        };
        assert_eq!(sale.signed_points(), 10);
        assert_eq!(late.signed_points(), -5);

        // A negative stored value must not flip the polarity.
        let odd = EventType {
            points: -5,
            polarity: Polarity::Negative,
            ..sale
        };
        assert_eq!(odd.signed_points(), -5);
    }

    #[test]
    fn percentage_guards_zero_target() {
        assert_eq!(percentage(5000, 0), 0.0);
        assert_eq!(percentage(5000, 10000), 50.0);
        assert_eq!(percentage(0, 10000), 0.0);
        assert_eq!(percentage(15000, 10000), 150.0);
    }

    #[test]
    fn summary_progress_uses_monthly_target_constant() {
        let summary = EmployeeSummary {
            employee_id: 1,
            points_balance: 40,
            total_earned_points: 60,
            negative_event_count: 2,
            monthly_revenue_target: 200_000,
            monthly_revenue_actual: 50_000,
            rank: Some(3),
        };
        assert_eq!(summary.progress_percentage(), 40.0);
        assert_eq!(summary.sales_progress_percentage(), 25.0);
    }
}
