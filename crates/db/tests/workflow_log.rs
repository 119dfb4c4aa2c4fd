//! Integration tests for the workflow log and case repositories.
//!
//! Exercises against a real database:
//! - New cases start with a single UNASSIGNED latest entry
//! - `append` flips the latest flag and keeps timestamps ordered
//! - Stale appends are refused without writing
//! - Conditional content writes refuse stale versions
//! - Filtered listing through the compiled expression tree
//! - Access view aggregates role and products
//! - A writer waiting on a case lock reads what the holder committed

#![cfg(feature = "pg-tests")]

use assert_matches::assert_matches;
use chrono::{DateTime, Utc};
use medreview_core::query::{CaseFilter, Page, SortExpr};
use medreview_core::roles::{PRODUCT_ABSTRACTION, ROLE_ABSTRACTOR};
use medreview_core::status::{CaseType, StepStatus};
use medreview_core::workflow::NewEntry;
use medreview_db::models::case::CreateCase;
use medreview_db::models::record::CreateRecord;
use medreview_db::models::user::CreateUser;
use medreview_db::models::workflow_entry::AppendOutcome;
use medreview_db::repositories::{CaseRepo, RecordRepo, UserRepo, WorkflowRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn new_user(pool: &PgPool, name: &str) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            role: ROLE_ABSTRACTOR.to_string(),
            products: vec![PRODUCT_ABSTRACTION.to_string()],
            credential_id: None,
        },
    )
    .await
    .unwrap()
    .id
}

/// Returns (record_id, seat one case id, seat two case id).
async fn new_abstraction_record(pool: &PgPool, reference: &str) -> (i64, i64, i64) {
    let record = RecordRepo::create(
        pool,
        &CreateRecord {
            external_ref: reference.to_string(),
            supporting_file_count: None,
        },
    )
    .await
    .unwrap();
    let mut ids = Vec::new();
    for seat in [1, 2] {
        let case = CaseRepo::create(
            pool,
            &CreateCase {
                record_id: record.id,
                case_type_id: CaseType::Abstraction.id(),
                seat: Some(seat),
                due_date: None,
            },
        )
        .await
        .unwrap();
        ids.push(case.id);
    }
    (record.id, ids[0], ids[1])
}

async fn append(pool: &PgPool, entry: NewEntry) -> AppendOutcome {
    let mut tx = pool.begin().await.unwrap();
    let outcome = WorkflowRepo::append(&mut tx, &entry).await.unwrap();
    tx.commit().await.unwrap();
    outcome
}

/// True when exactly one entry is latest and it carries the maximum timestamp.
fn latest_invariant_holds(entries: &[(bool, DateTime<Utc>)]) -> bool {
    let latest: Vec<&DateTime<Utc>> = entries.iter().filter(|(l, _)| *l).map(|(_, t)| t).collect();
    match latest.as_slice() {
        [only] => entries.iter().all(|(_, t)| t <= *only),
        _ => false,
    }
}

fn entry(case_id: i64, status: StepStatus, to: Option<i64>, by: i64, expected: i64) -> NewEntry {
    NewEntry {
        case_id,
        step_status: status,
        recipient_user_id: to,
        sending_user_id: by,
        note: format!("-> {status}"),
        reopen_reason: None,
        expected_latest_id: expected,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_new_case_starts_unassigned(pool: PgPool) {
    let (_record, case_id, _) = new_abstraction_record(&pool, "R-new").await;

    let view = CaseRepo::find_view(&pool, case_id).await.unwrap().unwrap();
    assert_eq!(view.status().unwrap(), StepStatus::Unassigned);
    assert_eq!(view.status_name, "UNASSIGNED");
    assert_eq!(view.assignee_id, None);

    let history = WorkflowRepo::list_by_case(&pool, case_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].is_latest);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_single_latest_after_many_transitions(pool: PgPool) {
    let manager = new_user(&pool, "mgr").await;
    let alice = new_user(&pool, "alice").await;
    let bob = new_user(&pool, "bob").await;
    let (_record, case_id, _) = new_abstraction_record(&pool, "R-many").await;

    let steps = [
        (StepStatus::NotStarted, Some(alice)),
        (StepStatus::InProgress, Some(alice)),
        (StepStatus::NotStarted, Some(bob)),
        (StepStatus::InProgress, Some(bob)),
        (StepStatus::Completed, Some(bob)),
        (StepStatus::InProgress, Some(bob)),
    ];
    for (status, to) in steps {
        let latest = WorkflowRepo::find_latest(&pool, case_id).await.unwrap().unwrap();
        let outcome = append(&pool, entry(case_id, status, to, manager, latest.id)).await;
        assert_matches!(outcome, AppendOutcome::Appended(e) if e.is_latest);
    }

    let history = WorkflowRepo::list_by_case(&pool, case_id).await.unwrap();
    assert_eq!(history.len(), steps.len() + 1);
    let flags: Vec<(bool, DateTime<Utc>)> =
        history.iter().map(|e| (e.is_latest, e.entry_at)).collect();
    assert!(latest_invariant_holds(&flags));
    assert!(history[0].is_latest, "newest-first ordering puts latest on top");

    let view = CaseRepo::find_view(&pool, case_id).await.unwrap().unwrap();
    assert_eq!(view.status().unwrap(), StepStatus::InProgress);
    assert_eq!(view.assignee_id, Some(bob));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stale_append_writes_nothing(pool: PgPool) {
    let manager = new_user(&pool, "mgr").await;
    let alice = new_user(&pool, "alice").await;
    let (_record, case_id, _) = new_abstraction_record(&pool, "R-stale").await;

    let original = WorkflowRepo::find_latest(&pool, case_id).await.unwrap().unwrap();
    let first = append(&pool, entry(case_id, StepStatus::NotStarted, Some(alice), manager, original.id)).await;
    let first_id = match first {
        AppendOutcome::Appended(e) => e.id,
        other => panic!("expected append, got {other:?}"),
    };

    // Second writer based on the original latest entry.
    let second = append(&pool, entry(case_id, StepStatus::NotStarted, Some(manager), manager, original.id)).await;
    assert_matches!(second, AppendOutcome::Stale { actual_latest_id: Some(id) } if id == first_id);

    let history = WorkflowRepo::list_by_case(&pool, case_id).await.unwrap();
    assert_eq!(history.len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_conditional_content_write(pool: PgPool) {
    let (_record, case_id, _) = new_abstraction_record(&pool, "R-content").await;
    let before = CaseRepo::find_by_id(&pool, case_id).await.unwrap().unwrap();

    let mut tx = pool.begin().await.unwrap();
    let bumped = CaseRepo::touch_content(&mut tx, case_id, before.content_updated_at)
        .await
        .unwrap()
        .expect("current version should be accepted");
    tx.commit().await.unwrap();
    assert!(bumped > before.content_updated_at);

    // The old version is now stale.
    let mut tx = pool.begin().await.unwrap();
    let stale = CaseRepo::touch_content(&mut tx, case_id, before.content_updated_at)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(stale, None);

    let after = CaseRepo::find_by_id(&pool, case_id).await.unwrap().unwrap();
    assert_eq!(after.content_updated_at, bumped);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_filtered_listing(pool: PgPool) {
    let manager = new_user(&pool, "mgr").await;
    let alice = new_user(&pool, "alice").await;
    let (record, seat_one, _seat_two) = new_abstraction_record(&pool, "R-list").await;
    let _ = new_abstraction_record(&pool, "R-other").await;

    let latest = WorkflowRepo::find_latest(&pool, seat_one).await.unwrap().unwrap();
    append(&pool, entry(seat_one, StepStatus::NotStarted, Some(alice), manager, latest.id)).await;

    let by_assignee = CaseFilter {
        assignee_id: Some(alice),
        ..Default::default()
    };
    let rows = CaseRepo::list_views(&pool, &by_assignee.to_expr(), SortExpr::default(), Page::new(None, None))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, seat_one);

    let by_record = CaseFilter {
        record_id: Some(record),
        status: Some(StepStatus::Unassigned),
        ..Default::default()
    };
    assert_eq!(CaseRepo::count(&pool, &by_record.to_expr()).await.unwrap(), 1);

    let everything = CaseFilter {
        case_type: Some(CaseType::Abstraction),
        ..Default::default()
    };
    let page = CaseRepo::list_views(&pool, &everything.to_expr(), SortExpr::default(), Page::new(Some(3), Some(0)))
        .await
        .unwrap();
    assert_eq!(page.len(), 3);
    assert_eq!(CaseRepo::count(&pool, &everything.to_expr()).await.unwrap(), 4);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_access_view_aggregates_products(pool: PgPool) {
    let alice = new_user(&pool, "alice").await;
    let access = UserRepo::find_access(&pool, alice).await.unwrap().unwrap();
    let ctx = access.to_authorization_context();
    assert_eq!(ctx.role, ROLE_ABSTRACTOR);
    assert_eq!(ctx.products, vec![PRODUCT_ABSTRACTION.to_string()]);
    assert!(ctx.is_entitled_to(CaseType::Abstraction));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_seat_rejected(pool: PgPool) {
    let (record, _, _) = new_abstraction_record(&pool, "R-seat").await;
    let err = CaseRepo::create(
        &pool,
        &CreateCase {
            record_id: record,
            case_type_id: CaseType::Abstraction.id(),
            seat: Some(1),
            due_date: None,
        },
    )
    .await
    .unwrap_err();
    let db_err = err.as_database_error().expect("database error");
    assert_eq!(db_err.constraint(), Some("uq_cases_record_seat"));
}

// ---------------------------------------------------------------------------
// Concurrent writers
// ---------------------------------------------------------------------------

/// Time a second transaction gets to reach the lock before the first commits.
const LOCK_WAIT: std::time::Duration = std::time::Duration::from_millis(300);

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_waiting_record_lock_sees_committed_seats(pool: PgPool) {
    let manager = new_user(&pool, "mgr").await;
    let alice = new_user(&pool, "alice").await;
    let (record, seat_one, seat_two) = new_abstraction_record(&pool, "R-race").await;
    let abstraction = CaseType::Abstraction.id();

    let mut first = pool.begin().await.unwrap();
    let locked = CaseRepo::lock_record_rows(&mut first, record, abstraction).await.unwrap();
    assert_eq!(locked, vec![seat_one, seat_two]);
    let latest = WorkflowRepo::find_latest(&pool, seat_one).await.unwrap().unwrap();
    let outcome = WorkflowRepo::append(
        &mut first,
        &entry(seat_one, StepStatus::NotStarted, Some(alice), manager, latest.id),
    )
    .await
    .unwrap();
    assert_matches!(outcome, AppendOutcome::Appended(_));

    let second = tokio::spawn({
        let pool = pool.clone();
        async move {
            let mut tx = pool.begin().await.unwrap();
            let ids = CaseRepo::lock_record_rows(&mut tx, record, abstraction).await.unwrap();
            let views = CaseRepo::list_views_tx(&mut tx, &ids).await.unwrap();
            tx.commit().await.unwrap();
            views
        }
    });

    tokio::time::sleep(LOCK_WAIT).await;
    assert!(!second.is_finished(), "second locker should wait on the first");
    first.commit().await.unwrap();

    let views = second.await.unwrap();
    let seats: Vec<(i64, Option<i64>)> = views.iter().map(|v| (v.id, v.assignee_id)).collect();
    assert_eq!(seats, vec![(seat_one, Some(alice)), (seat_two, None)]);
    assert_eq!(views[0].status().unwrap(), StepStatus::NotStarted);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_waiting_case_lock_reads_new_latest(pool: PgPool) {
    let manager = new_user(&pool, "mgr").await;
    let alice = new_user(&pool, "alice").await;
    let (_record, case_id, _) = new_abstraction_record(&pool, "R-race-one").await;

    let mut first = pool.begin().await.unwrap();
    assert_eq!(CaseRepo::lock_row(&mut first, case_id).await.unwrap(), Some(case_id));
    let original = WorkflowRepo::find_latest(&pool, case_id).await.unwrap().unwrap();
    let appended = match WorkflowRepo::append(
        &mut first,
        &entry(case_id, StepStatus::NotStarted, Some(alice), manager, original.id),
    )
    .await
    .unwrap()
    {
        AppendOutcome::Appended(e) => e,
        other => panic!("expected append, got {other:?}"),
    };

    let second = tokio::spawn({
        let pool = pool.clone();
        async move {
            let mut tx = pool.begin().await.unwrap();
            let locked = CaseRepo::lock_row(&mut tx, case_id).await.unwrap();
            let views = CaseRepo::list_views_tx(&mut tx, &[case_id]).await.unwrap();
            // A writer still holding the old basis is refused.
            let stale = WorkflowRepo::append(
                &mut tx,
                &entry(case_id, StepStatus::NotStarted, Some(manager), manager, original.id),
            )
            .await
            .unwrap();
            tx.rollback().await.unwrap();
            (locked, views, stale)
        }
    });

    tokio::time::sleep(LOCK_WAIT).await;
    assert!(!second.is_finished(), "second locker should wait on the first");
    first.commit().await.unwrap();

    let (locked, views, stale) = second.await.unwrap();
    assert_eq!(locked, Some(case_id));
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].latest_entry_id, appended.id);
    assert_matches!(stale, AppendOutcome::Stale { actual_latest_id: Some(id) } if id == appended.id);
}
