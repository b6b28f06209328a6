use std::ops::Add;

use chrono::{Duration, NaiveDate, Utc};
use sqlx::PgPool;

use crate::error::ServiceError;
use crate::models::{self, BonusType, Polarity, RedemptionStatus, RequestStatus, Role};

use super::{AppState, DatabaseConnection};

async fn connect(pool: PgPool) -> DatabaseConnection {
    let _ = env_logger::builder().is_test(true).try_init();
    let app_state = AppState::from_pool(pool).await;
    DatabaseConnection {
        connection: app_state.pool.acquire().await.unwrap(),
    }
}

fn new_employee(name: &str, username: &str, role: Role) -> models::Employee {
    models::Employee {
        id: 0,
        name: name.to_string(),
        username: Some(username.to_string()),
        role,
        store_id: None,
        is_active: true,
        monthly_revenue_target: 0,
    }
}

fn new_event_type(name: &str, points: i32, polarity: Polarity) -> models::EventType {
    models::EventType {
        id: 0,
        name: name.to_string(),
        points,
        polarity,
        is_enabled: true,
        sort_order: 0,
    }
}

#[sqlx::test]
async fn test_employee_crud(pool: PgPool) {
    let mut db = connect(pool).await;

    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();
    assert!(john.id != 0);

    let jane = db
        .store_employee(new_employee("Jane Roe", "janeroe", Role::Manager))
        .await
        .unwrap();

    let all = db.get_all_employees().await.unwrap();
    assert_eq!(all, vec![john.clone(), jane.clone()]);

    let mut john_update = john.clone();
    john_update.name = "John M. Doe".to_string();
    john_update.monthly_revenue_target = 500_000;
    let john = db.store_employee(john_update.clone()).await.unwrap();
    assert_eq!(john, john_update);

    assert_eq!(db.get_employee_by_id(john.id).await.unwrap(), Some(john.clone()));
    assert_eq!(
        db.get_employee_by_username("janeroe").await.unwrap(),
        Some(jane.clone())
    );
    assert_eq!(db.get_employee_by_id(123_213).await.unwrap(), None);

    db.set_password_hash(john.id, vec![13u8; 32]).await.unwrap();
    assert_eq!(
        db.get_password_hash(john.id).await.unwrap(),
        Some(vec![13u8; 32])
    );
    db.set_password_hash(john.id, vec![7u8; 32]).await.unwrap();
    assert_eq!(
        db.get_password_hash(john.id).await.unwrap(),
        Some(vec![7u8; 32])
    );

    db.delete_employee(john.id).await.unwrap();
    assert_eq!(db.get_employee_by_id(john.id).await.unwrap(), None);
    assert_eq!(db.get_password_hash(john.id).await.unwrap(), None);
}

#[sqlx::test]
async fn test_revenue_target(pool: PgPool) {
    let mut db = connect(pool).await;

    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();

    db.set_revenue_target(john.id, 750_000).await.unwrap();
    let john = db.get_employee_by_id(john.id).await.unwrap().unwrap();
    assert_eq!(john.monthly_revenue_target, 750_000);

    let result = db.set_revenue_target(99_999, 750_000).await;
    assert!(matches!(result, Err(ServiceError::NotFound)));
}

#[sqlx::test]
async fn test_session_crud(pool: PgPool) {
    let mut db = connect(pool).await;

    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();

    let token = db
        .create_session_token(john.id, Utc::now().add(Duration::minutes(30)))
        .await
        .unwrap();
    let session = db
        .get_session_by_session_token(token.clone())
        .await
        .unwrap()
        .expect("there is a session for the token");
    assert_eq!(session.employee, john);
    assert_eq!(session.token, token);

    db.delete_session_token(token.clone()).await.unwrap();
    assert_eq!(db.get_session_by_session_token(token).await.unwrap(), None);

    // Expired sessions are not returned.
    let token = db
        .create_session_token(john.id, Utc::now() - Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(db.get_session_by_session_token(token).await.unwrap(), None);

    // Deleting an employee removes their sessions.
    let token = db
        .create_session_token(john.id, Utc::now().add(Duration::minutes(30)))
        .await
        .unwrap();
    db.delete_employee(john.id).await.unwrap();
    assert_eq!(db.get_session_by_session_token(token).await.unwrap(), None);
}

#[sqlx::test]
async fn test_ledger_and_balance(pool: PgPool) {
    let mut db = connect(pool).await;

    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();
    let sale = db
        .store_event_type(new_event_type("Sale", 10, Polarity::Positive))
        .await
        .unwrap();
    let late = db
        .store_event_type(new_event_type("Late arrival", 5, Polarity::Negative))
        .await
        .unwrap();

    assert_eq!(db.get_points_balance(john.id).await.unwrap(), 0);

    let today = Utc::now().date_naive();
    let entries = db
        .submit_events(
            john.id,
            &[sale.clone(), late.clone()],
            Some("Morning shift".to_string()),
            Some(12_500),
            today,
        )
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].points, 10);
    assert_eq!(entries[1].points, -5);

    assert_eq!(db.get_points_balance(john.id).await.unwrap(), 5);

    let ledger = db.get_ledger_by_employee(john.id).await.unwrap();
    assert_eq!(ledger.len(), 2);

    // The positive amount produced a revenue entry.
    assert_eq!(
        db.get_revenue_between(john.id, today, today).await.unwrap(),
        12_500
    );

    // Disabled event types are rejected and nothing is written.
    let mut disabled = sale.clone();
    disabled.is_enabled = false;
    let disabled = db.store_event_type(disabled).await.unwrap();
    let result = db
        .submit_events(john.id, &[disabled], None, None, today)
        .await;
    assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    assert_eq!(db.get_ledger_by_employee(john.id).await.unwrap().len(), 2);

    let result = db
        .submit_events(99_999, &[late], None, None, today)
        .await;
    assert!(matches!(result, Err(ServiceError::NotFound)));
}

#[sqlx::test]
async fn test_request_approval(pool: PgPool) {
    let mut db = connect(pool).await;

    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();
    let sale = db
        .store_event_type(new_event_type("Sale", 10, Polarity::Positive))
        .await
        .unwrap();

    let request = db
        .create_request(john.id, sale.id, Some("Sold a watch".to_string()), Some(9_900))
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::Pending);

    let pending = db.get_requests(Some(RequestStatus::Pending)).await.unwrap();
    assert_eq!(pending, vec![request.clone()]);

    // Approval writes the ledger row and the revenue entry.
    let approved = db.approve_request(request.id, Some(10_000)).await.unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.amount_cents, Some(10_000));

    assert_eq!(db.get_points_balance(john.id).await.unwrap(), 10);
    let day = approved.created_at.date_naive();
    assert_eq!(
        db.get_revenue_between(john.id, day, day).await.unwrap(),
        10_000
    );

    let notifications = db.get_notifications_by_employee(john.id).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert!(!notifications[0].is_read);

    // A second decision on the same request conflicts.
    let result = db.approve_request(request.id, None).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
    let result = db.reject_request(request.id).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
    assert_eq!(db.get_points_balance(john.id).await.unwrap(), 10);

    let result = db.approve_request(99_999, None).await;
    assert!(matches!(result, Err(ServiceError::NotFound)));
}

#[sqlx::test]
async fn test_request_rejection(pool: PgPool) {
    let mut db = connect(pool).await;

    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();
    let sale = db
        .store_event_type(new_event_type("Sale", 10, Polarity::Positive))
        .await
        .unwrap();

    let request = db.create_request(john.id, sale.id, None, None).await.unwrap();
    let rejected = db.reject_request(request.id).await.unwrap();
    assert_eq!(rejected.status, RequestStatus::Rejected);

    // Nothing reached the ledger.
    assert_eq!(db.get_points_balance(john.id).await.unwrap(), 0);
    assert!(db.get_ledger_by_employee(john.id).await.unwrap().is_empty());

    let result = db.approve_request(request.id, None).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
}

#[sqlx::test]
async fn test_redemption_balance_check(pool: PgPool) {
    let mut db = connect(pool).await;

    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();
    let sale = db
        .store_event_type(new_event_type("Sale", 40, Polarity::Positive))
        .await
        .unwrap();
    let reward = db
        .store_reward(models::Reward {
            id: 0,
            name: "Coffee mug".to_string(),
            points_cost: 50,
            stock: 5,
            is_enabled: true,
        })
        .await
        .unwrap();

    db.submit_events(john.id, &[sale], None, None, Utc::now().date_naive())
        .await
        .unwrap();
    assert_eq!(db.get_points_balance(john.id).await.unwrap(), 40);

    // 40 points cannot pay for a 50 point reward.
    let result = db.create_redemption(john.id, reward.id, None).await;
    assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    assert!(db
        .get_redemptions_by_employee(john.id)
        .await
        .unwrap()
        .is_empty());
}

#[sqlx::test]
async fn test_redemption_approval(pool: PgPool) {
    let mut db = connect(pool).await;

    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();
    let sale = db
        .store_event_type(new_event_type("Sale", 100, Polarity::Positive))
        .await
        .unwrap();
    let reward = db
        .store_reward(models::Reward {
            id: 0,
            name: "Coffee mug".to_string(),
            points_cost: 50,
            stock: 1,
            is_enabled: true,
        })
        .await
        .unwrap();

    db.submit_events(john.id, &[sale], None, None, Utc::now().date_naive())
        .await
        .unwrap();

    let redemption = db.create_redemption(john.id, reward.id, None).await.unwrap();
    assert_eq!(redemption.status, RedemptionStatus::Pending);
    assert_eq!(redemption.version, 0);

    // Points are only deducted on approval.
    assert_eq!(db.get_points_balance(john.id).await.unwrap(), 100);

    let approved = db.approve_redemption(redemption.id).await.unwrap();
    assert_eq!(approved.status, RedemptionStatus::Approved);
    assert!(approved.delivered_code.is_some());

    assert_eq!(db.get_points_balance(john.id).await.unwrap(), 50);
    let ledger = db.get_ledger_by_employee(john.id).await.unwrap();
    assert_eq!(ledger[0].points, -50);
    assert_eq!(ledger[0].redemption_id, Some(redemption.id));

    let reward = db.get_reward_by_id(reward.id).await.unwrap().unwrap();
    assert_eq!(reward.stock, 0);

    let result = db.approve_redemption(redemption.id).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
    assert_eq!(db.get_points_balance(john.id).await.unwrap(), 50);
}

#[sqlx::test]
async fn test_redemption_out_of_stock(pool: PgPool) {
    let mut db = connect(pool).await;

    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();
    let jane = db
        .store_employee(new_employee("Jane Roe", "janeroe", Role::Employee))
        .await
        .unwrap();
    let sale = db
        .store_event_type(new_event_type("Sale", 100, Polarity::Positive))
        .await
        .unwrap();
    let reward = db
        .store_reward(models::Reward {
            id: 0,
            name: "Coffee mug".to_string(),
            points_cost: 50,
            stock: 1,
            is_enabled: true,
        })
        .await
        .unwrap();

    let today = Utc::now().date_naive();
    db.submit_events(john.id, &[sale.clone()], None, None, today)
        .await
        .unwrap();
    db.submit_events(jane.id, &[sale], None, None, today)
        .await
        .unwrap();

    let first = db.create_redemption(john.id, reward.id, None).await.unwrap();
    let second = db.create_redemption(jane.id, reward.id, None).await.unwrap();

    db.approve_redemption(first.id).await.unwrap();
    let result = db.approve_redemption(second.id).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));

    // The losing redemption stays pending, nothing was deducted.
    let second = db.get_redemption_by_id(second.id).await.unwrap().unwrap();
    assert_eq!(second.status, RedemptionStatus::Pending);
    assert_eq!(db.get_points_balance(jane.id).await.unwrap(), 100);
}

#[sqlx::test]
async fn test_redemption_versioning(pool: PgPool) {
    let mut db = connect(pool).await;

    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();
    let sale = db
        .store_event_type(new_event_type("Sale", 100, Polarity::Positive))
        .await
        .unwrap();
    let reward = db
        .store_reward(models::Reward {
            id: 0,
            name: "Coffee mug".to_string(),
            points_cost: 50,
            stock: 5,
            is_enabled: true,
        })
        .await
        .unwrap();

    db.submit_events(john.id, &[sale], None, None, Utc::now().date_naive())
        .await
        .unwrap();

    let redemption = db.create_redemption(john.id, reward.id, None).await.unwrap();

    let updated = db
        .update_redemption_note(redemption.id, john.id, 0, Some("Blue one please".to_string()))
        .await
        .unwrap();
    assert_eq!(updated.version, 1);
    assert_eq!(updated.note, Some("Blue one please".to_string()));

    // A stale version is rejected.
    let result = db.cancel_redemption(redemption.id, john.id, 0).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));

    let cancelled = db.cancel_redemption(redemption.id, john.id, 1).await.unwrap();
    assert_eq!(cancelled.status, RedemptionStatus::Cancelled);

    // Cancelled redemptions cannot be approved.
    let result = db.approve_redemption(redemption.id).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
    assert_eq!(db.get_points_balance(john.id).await.unwrap(), 100);
}

#[sqlx::test]
async fn test_revenue_aggregation(pool: PgPool) {
    let mut db = connect(pool).await;

    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();
    let sale = db
        .store_event_type(new_event_type("Sale", 10, Polarity::Positive))
        .await
        .unwrap();

    // Mon 2026-08-17 .. Sun 2026-08-23, plus one entry the Monday after.
    let monday = NaiveDate::from_ymd_opt(2026, 8, 17).unwrap();
    let sunday = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
    let next_monday = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();

    db.submit_events(john.id, &[sale.clone()], None, Some(10_000), monday)
        .await
        .unwrap();
    db.submit_events(john.id, &[sale.clone()], None, Some(5_000), sunday)
        .await
        .unwrap();
    db.submit_events(john.id, &[sale], None, Some(2_500), next_monday)
        .await
        .unwrap();

    assert_eq!(
        db.get_revenue_between(john.id, monday, sunday).await.unwrap(),
        15_000
    );
    assert_eq!(
        db.get_revenue_between(john.id, next_monday, next_monday)
            .await
            .unwrap(),
        2_500
    );

    let entries = db.get_revenue_entries(john.id, monday, sunday).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries.iter().map(|e| e.amount_cents).sum::<i64>(), 15_000);
}

#[sqlx::test]
async fn test_employee_summary(pool: PgPool) {
    let mut db = connect(pool).await;

    let mut john = new_employee("John Doe", "johndoe", Role::Employee);
    john.monthly_revenue_target = 100_000;
    let john = db.store_employee(john).await.unwrap();
    let jane = db
        .store_employee(new_employee("Jane Roe", "janeroe", Role::Employee))
        .await
        .unwrap();

    let sale = db
        .store_event_type(new_event_type("Sale", 30, Polarity::Positive))
        .await
        .unwrap();
    let late = db
        .store_event_type(new_event_type("Late arrival", 5, Polarity::Negative))
        .await
        .unwrap();

    let today = Utc::now().date_naive();
    db.submit_events(john.id, &[sale.clone(), late], None, Some(40_000), today)
        .await
        .unwrap();
    db.submit_events(jane.id, &[sale.clone(), sale], None, None, today)
        .await
        .unwrap();

    let summary = db.get_employee_summary(john.id, today).await.unwrap();
    assert_eq!(summary.points_balance, 25);
    assert_eq!(summary.total_earned_points, 30);
    assert_eq!(summary.negative_event_count, 1);
    assert_eq!(summary.monthly_revenue_actual, 40_000);
    assert_eq!(summary.monthly_revenue_target, 100_000);
    // Jane holds 60 points, John is second.
    assert_eq!(summary.rank, Some(2));

    let leaderboard = db.get_leaderboard().await.unwrap();
    assert_eq!(leaderboard.len(), 2);
    assert_eq!(leaderboard[0], (jane, 60));
    assert_eq!(leaderboard[1].1, 25);
}

#[sqlx::test]
async fn test_kudos_flow(pool: PgPool) {
    let mut db = connect(pool).await;

    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();
    let jane = db
        .store_employee(new_employee("Jane Roe", "janeroe", Role::Employee))
        .await
        .unwrap();

    let kudos = db
        .create_kudos(john.id, jane.id, "Great teamwork!".to_string())
        .await
        .unwrap();
    assert_eq!(kudos.status, RequestStatus::Pending);

    // Pending kudos are hidden from the receiving employee.
    assert!(db
        .get_kudos_for_employee(jane.id, true)
        .await
        .unwrap()
        .is_empty());

    let approved = db.decide_kudos(kudos.id, true).await.unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(
        db.get_kudos_for_employee(jane.id, true).await.unwrap(),
        vec![approved]
    );

    let result = db.decide_kudos(kudos.id, false).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));

    let result = db.decide_kudos(99_999, true).await;
    assert!(matches!(result, Err(ServiceError::NotFound)));
}

#[sqlx::test]
async fn test_bonus_flow(pool: PgPool) {
    let mut db = connect(pool).await;

    let manager = db
        .store_employee(new_employee("Jane Roe", "janeroe", Role::Manager))
        .await
        .unwrap();
    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();

    // A points bonus lands in the ledger on approval.
    let bonus = db
        .create_bonus_request(john.id, manager.id, BonusType::Points, 25)
        .await
        .unwrap();
    assert_eq!(bonus.status, RequestStatus::Pending);

    let approved = db.approve_bonus(bonus.id).await.unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(db.get_points_balance(john.id).await.unwrap(), 25);
    assert!(db.get_payouts_by_employee(john.id).await.unwrap().is_empty());

    let result = db.approve_bonus(bonus.id).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
    assert_eq!(db.get_points_balance(john.id).await.unwrap(), 25);

    // A EUR bonus becomes a payout and never touches the ledger.
    let bonus = db
        .create_bonus_request(john.id, manager.id, BonusType::Eur, 15_000)
        .await
        .unwrap();
    db.approve_bonus(bonus.id).await.unwrap();

    let payouts = db.get_payouts_by_employee(john.id).await.unwrap();
    assert_eq!(payouts.len(), 1);
    assert_eq!(payouts[0].amount_cents, 15_000);
    assert_eq!(payouts[0].bonus_request_id, bonus.id);
    assert_eq!(db.get_points_balance(john.id).await.unwrap(), 25);

    // Rejection is terminal as well.
    let bonus = db
        .create_bonus_request(john.id, manager.id, BonusType::Points, 10)
        .await
        .unwrap();
    let rejected = db.reject_bonus(bonus.id).await.unwrap();
    assert_eq!(rejected.status, RequestStatus::Rejected);
    let result = db.approve_bonus(bonus.id).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
}

#[sqlx::test]
async fn test_bonus_value_bounds(pool: PgPool) {
    let mut db = connect(pool).await;

    let manager = db
        .store_employee(new_employee("Jane Roe", "janeroe", Role::Manager))
        .await
        .unwrap();
    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();

    // Points bonuses beyond the ledger's INT range are rejected up front,
    // approval must never truncate them into a different value.
    let result = db
        .create_bonus_request(john.id, manager.id, BonusType::Points, 6_442_450_944)
        .await;
    assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    let result = db
        .create_bonus_request(
            john.id,
            manager.id,
            BonusType::Points,
            i64::from(i32::MAX) + 1,
        )
        .await;
    assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    assert!(db.get_bonus_requests(None).await.unwrap().is_empty());
    assert_eq!(db.get_points_balance(john.id).await.unwrap(), 0);

    // The largest representable points value still goes through.
    let bonus = db
        .create_bonus_request(john.id, manager.id, BonusType::Points, i64::from(i32::MAX))
        .await
        .unwrap();
    db.approve_bonus(bonus.id).await.unwrap();
    assert_eq!(db.get_points_balance(john.id).await.unwrap(), i32::MAX);

    // EUR bonuses are cents and may exceed the points range.
    let bonus = db
        .create_bonus_request(john.id, manager.id, BonusType::Eur, 6_442_450_944)
        .await
        .unwrap();
    db.approve_bonus(bonus.id).await.unwrap();
    let payouts = db.get_payouts_by_employee(john.id).await.unwrap();
    assert_eq!(payouts[0].amount_cents, 6_442_450_944);
}

#[sqlx::test]
async fn test_negative_sale_amounts(pool: PgPool) {
    let mut db = connect(pool).await;

    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();
    let sale = db
        .store_event_type(new_event_type("Sale", 10, Polarity::Positive))
        .await
        .unwrap();
    let today = Utc::now().date_naive();

    let result = db
        .submit_events(john.id, &[sale.clone()], None, Some(-100), today)
        .await;
    assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    assert!(db.get_ledger_by_employee(john.id).await.unwrap().is_empty());

    let result = db.create_request(john.id, sale.id, None, Some(-100)).await;
    assert!(matches!(result, Err(ServiceError::BadRequest(_))));

    // A negative override cannot sneak past an otherwise valid request.
    let request = db
        .create_request(john.id, sale.id, None, Some(5_000))
        .await
        .unwrap();
    let result = db.approve_request(request.id, Some(-100)).await;
    assert!(matches!(result, Err(ServiceError::BadRequest(_))));

    let pending = db.get_requests(Some(RequestStatus::Pending)).await.unwrap();
    assert_eq!(pending, vec![request.clone()]);

    let approved = db.approve_request(request.id, None).await.unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(
        db.get_revenue_between(john.id, today, today).await.unwrap(),
        5_000
    );
}

#[sqlx::test]
async fn test_reward_delete_conflict(pool: PgPool) {
    let mut db = connect(pool).await;

    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();
    let sale = db
        .store_event_type(new_event_type("Sale", 100, Polarity::Positive))
        .await
        .unwrap();
    let mug = db
        .store_reward(models::Reward {
            id: 0,
            name: "Coffee mug".to_string(),
            points_cost: 50,
            stock: 5,
            is_enabled: true,
        })
        .await
        .unwrap();
    let sticker = db
        .store_reward(models::Reward {
            id: 0,
            name: "Sticker".to_string(),
            points_cost: 5,
            stock: 5,
            is_enabled: true,
        })
        .await
        .unwrap();

    db.submit_events(john.id, &[sale], None, None, Utc::now().date_naive())
        .await
        .unwrap();
    db.create_redemption(john.id, mug.id, None).await.unwrap();

    // A reward with redemptions cannot be deleted.
    let result = db.delete_reward(mug.id).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
    assert!(db.get_reward_by_id(mug.id).await.unwrap().is_some());

    db.delete_reward(sticker.id).await.unwrap();
    assert_eq!(db.get_reward_by_id(sticker.id).await.unwrap(), None);
}

#[sqlx::test]
async fn test_concurrent_redemption_approvals(pool: PgPool) {
    let mut db = connect(pool.clone()).await;

    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();
    let sale = db
        .store_event_type(new_event_type("Sale", 50, Polarity::Positive))
        .await
        .unwrap();
    let reward = db
        .store_reward(models::Reward {
            id: 0,
            name: "Coffee mug".to_string(),
            points_cost: 30,
            stock: 5,
            is_enabled: true,
        })
        .await
        .unwrap();

    db.submit_events(john.id, &[sale], None, None, Utc::now().date_naive())
        .await
        .unwrap();

    // Balance 50, two redemptions at 30 points. Only one can ever clear.
    let first = db.create_redemption(john.id, reward.id, None).await.unwrap();
    let second = db.create_redemption(john.id, reward.id, None).await.unwrap();

    let mut other = connect(pool).await;
    let (a, b) = tokio::join!(
        db.approve_redemption(first.id),
        other.approve_redemption(second.id)
    );
    assert!(a.is_ok() != b.is_ok());
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(ServiceError::BadRequest(_))));

    assert_eq!(db.get_points_balance(john.id).await.unwrap(), 20);
    let reward = db.get_reward_by_id(reward.id).await.unwrap().unwrap();
    assert_eq!(reward.stock, 4);
}

#[sqlx::test]
async fn test_ledger_writes_serialize_per_employee(pool: PgPool) {
    let mut db = connect(pool.clone()).await;

    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();
    let sale = db
        .store_event_type(new_event_type("Sale", 10, Polarity::Positive))
        .await
        .unwrap();
    let request = db
        .create_request(john.id, sale.id, None, None)
        .await
        .unwrap();
    let today = Utc::now().date_naive();

    // Hold the per-employee lock in a separate transaction. Ledger writes
    // for this employee must queue behind it.
    let mut blocker = pool.begin().await.unwrap();
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(john.id as i64)
        .execute(&mut *blocker)
        .await
        .unwrap();

    let pause = std::time::Duration::from_millis(250);
    let submit_events = [sale.clone()];
    let submit = db.submit_events(john.id, &submit_events, None, None, today);
    assert!(tokio::time::timeout(pause, submit).await.is_err());

    let mut other = connect(pool.clone()).await;
    let approve = other.approve_request(request.id, None);
    assert!(tokio::time::timeout(pause, approve).await.is_err());

    // Returning the connections rolls their stalled transactions back once
    // the blocker releases the lock.
    drop(db);
    drop(other);
    blocker.rollback().await.unwrap();

    // With the lock released both operations go through.
    let mut db = connect(pool).await;
    db.submit_events(john.id, &[sale], None, None, today)
        .await
        .unwrap();
    db.approve_request(request.id, None).await.unwrap();
    assert_eq!(db.get_points_balance(john.id).await.unwrap(), 20);
}

#[sqlx::test]
async fn test_notifications(pool: PgPool) {
    let mut db = connect(pool).await;

    let john = db
        .store_employee(new_employee("John Doe", "johndoe", Role::Employee))
        .await
        .unwrap();
    let jane = db
        .store_employee(new_employee("Jane Roe", "janeroe", Role::Employee))
        .await
        .unwrap();
    let sale = db
        .store_event_type(new_event_type("Sale", 10, Polarity::Positive))
        .await
        .unwrap();

    let request = db.create_request(john.id, sale.id, None, None).await.unwrap();
    db.approve_request(request.id, None).await.unwrap();

    let notifications = db.get_notifications_by_employee(john.id).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert!(!notifications[0].is_read);

    // Employees can only mark their own notifications.
    let result = db.mark_notification_read(notifications[0].id, jane.id).await;
    assert!(matches!(result, Err(ServiceError::NotFound)));

    db.mark_notification_read(notifications[0].id, john.id)
        .await
        .unwrap();
    let notifications = db.get_notifications_by_employee(john.id).await.unwrap();
    assert!(notifications[0].is_read);
}

#[sqlx::test]
async fn test_store_crud(pool: PgPool) {
    let mut db = connect(pool).await;

    let store = db.create_store("Downtown".to_string()).await.unwrap();
    assert!(store.id != 0);

    let mut employee = new_employee("John Doe", "johndoe", Role::Employee);
    employee.store_id = Some(store.id);
    let employee = db.store_employee(employee).await.unwrap();
    assert_eq!(employee.store_id, Some(store.id));

    assert_eq!(db.get_all_stores().await.unwrap(), vec![store]);
}
