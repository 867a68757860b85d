//! Integration tests for `PgTicketRepository` and `PgAssigneeRepository`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use invigil_core::actor::AssigneeRole;
use invigil_core::repository::{
    Assignee, AssigneeRepository, AssignmentChange, AssignmentLogEntry, TicketRepository,
    UserDirectory, WriteGuard,
};
use invigil_core::ticket::{PageRequest, Severity, TicketFilter, TicketStatus};
use invigil_store::{PgAssigneeRepository, PgTicketRepository, PgUserDirectory};
use invigil_test_support::ticket_record;
use sqlx::PgPool;
use uuid::Uuid;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
}

fn binding(ticket_id: Uuid, user_id: &str, role: AssigneeRole) -> Assignee {
    Assignee {
        ticket_id,
        user_id: user_id.to_owned(),
        role,
        assigned_at: t0(),
    }
}

// --- numbering ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_ticket_numbers_are_sequential_and_padded(pool: PgPool) {
    let repo = PgTicketRepository::new(pool);

    let first = repo.next_ticket_number().await.unwrap();
    let second = repo.next_ticket_number().await.unwrap();

    assert_eq!(first, "TKT-000001");
    assert_eq!(second, "TKT-000002");
}

// --- insert + get round-trip ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_insert_and_get_round_trip(pool: PgPool) {
    // Arrange
    let repo = PgTicketRepository::new(pool);
    let mut ticket =
        ticket_record("TKT-000001", TicketStatus::UserDependency, Severity::Sev1, t0());
    ticket.exam_date = Some(t0().date_naive());
    ticket.resource_id = Some("room-12".to_owned());

    // Act
    repo.insert(&ticket).await.unwrap();
    let loaded = repo.get(ticket.id).await.unwrap();

    // Assert
    assert_eq!(loaded, Some(ticket));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_unknown_ticket_is_none(pool: PgPool) {
    let repo = PgTicketRepository::new(pool);

    assert_eq!(repo.get(Uuid::new_v4()).await.unwrap(), None);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_resolved_without_resolved_at_is_rejected_by_the_schema(pool: PgPool) {
    let repo = PgTicketRepository::new(pool);
    let mut ticket = ticket_record("TKT-000001", TicketStatus::Resolved, Severity::Sev2, t0());
    ticket.resolved_at = None;

    let result = repo.insert(&ticket).await;

    assert!(result.is_err());
}

// --- guarded updates ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_expect_status_guard_skips_changed_rows(pool: PgPool) {
    // Arrange
    let repo = PgTicketRepository::new(pool);
    let ticket = ticket_record("TKT-000001", TicketStatus::UserDependency, Severity::Sev3, t0());
    repo.insert(&ticket).await.unwrap();
    let mut resolved = ticket.clone();
    resolved.status = TicketStatus::Resolved;
    resolved.resolved_at = Some(t0() + Duration::days(8));

    // Act
    let first = repo
        .update(&resolved, WriteGuard::ExpectStatus(TicketStatus::UserDependency))
        .await
        .unwrap();
    let second = repo
        .update(&resolved, WriteGuard::ExpectStatus(TicketStatus::UserDependency))
        .await
        .unwrap();

    // Assert
    assert!(first);
    assert!(!second);
    assert_eq!(repo.get(ticket.id).await.unwrap().unwrap().status, TicketStatus::Resolved);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_of_missing_row_reports_false(pool: PgPool) {
    let repo = PgTicketRepository::new(pool);
    let ticket = ticket_record("TKT-000001", TicketStatus::Open, Severity::Sev3, t0());

    let written = repo.update(&ticket, WriteGuard::LastWriteWins).await.unwrap();

    assert!(!written);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_stale_update_cannot_revive_soft_deleted_row(pool: PgPool) {
    // Arrange
    let repo = PgTicketRepository::new(pool);
    let ticket = ticket_record("TKT-000001", TicketStatus::Open, Severity::Sev2, t0());
    repo.insert(&ticket).await.unwrap();
    let mut deleted = ticket.clone();
    deleted.is_deleted = true;
    assert!(repo.update(&deleted, WriteGuard::LastWriteWins).await.unwrap());
    let mut stale = ticket;
    stale.status = TicketStatus::InProgress;

    // Act
    let written = repo.update(&stale, WriteGuard::LastWriteWins).await.unwrap();

    // Assert
    assert!(!written);
    let stored = repo.get(stale.id).await.unwrap().unwrap();
    assert!(stored.is_deleted);
    assert_eq!(stored.status, TicketStatus::Open);
}

// --- listing ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_list_filters_sorts_and_pages(pool: PgPool) {
    // Arrange
    let repo = PgTicketRepository::new(pool);
    for n in 1..=5 {
        let ticket = ticket_record(
            &format!("TKT-00000{n}"),
            TicketStatus::Open,
            Severity::Sev2,
            t0() + Duration::hours(n),
        );
        repo.insert(&ticket).await.unwrap();
    }
    let mut elsewhere = ticket_record("TKT-000009", TicketStatus::Open, Severity::Sev2, t0());
    elsewhere.city = "Nagpur".to_owned();
    repo.insert(&elsewhere).await.unwrap();
    let filter = TicketFilter {
        cities: vec!["PUNE".to_owned()],
        ..TicketFilter::default()
    };

    // Act
    let page = repo
        .list(&filter, PageRequest { page: 2, page_size: 2 })
        .await
        .unwrap();

    // Assert
    assert_eq!(page.total, 5);
    let numbers: Vec<&str> = page.items.iter().map(|t| t.ticket_number.as_str()).collect();
    assert_eq!(numbers, vec!["TKT-000003", "TKT-000002"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_search_matches_any_comma_separated_term(pool: PgPool) {
    // Arrange
    let repo = PgTicketRepository::new(pool);
    let mut projector = ticket_record("TKT-000001", TicketStatus::Open, Severity::Sev2, t0());
    projector.description = "Projector flickering".to_owned();
    let mut power = ticket_record("TKT-000002", TicketStatus::Open, Severity::Sev2, t0());
    power.description = "Power cut in lab".to_owned();
    power.category = "Infrastructure".to_owned();
    let mut other = ticket_record("TKT-000103", TicketStatus::Open, Severity::Sev2, t0());
    other.description = "Seating plan missing".to_owned();
    other.category = "Logistics".to_owned();
    for ticket in [&projector, &power, &other] {
        repo.insert(ticket).await.unwrap();
    }
    let filter = TicketFilter {
        search: Some(" projector , POWER CUT".to_owned()),
        ..TicketFilter::default()
    };

    // Act
    let rows = repo.list_all(&filter).await.unwrap();

    // Assert
    let mut ids: Vec<Uuid> = rows.iter().map(|t| t.id).collect();
    ids.sort();
    let mut expected = vec![projector.id, power.id];
    expected.sort();
    assert_eq!(ids, expected);

    let by_number = TicketFilter {
        search: Some("0010".to_owned()),
        ..TicketFilter::default()
    };
    let rows = repo.list_all(&by_number).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, other.id);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_soft_deleted_rows_are_hidden_unless_requested(pool: PgPool) {
    let repo = PgTicketRepository::new(pool);
    let mut deleted = ticket_record("TKT-000001", TicketStatus::Open, Severity::Sev2, t0());
    deleted.is_deleted = true;
    repo.insert(&deleted).await.unwrap();

    let hidden = repo.list_all(&TicketFilter::default()).await.unwrap();
    let shown = repo
        .list_all(&TicketFilter {
            include_deleted: true,
            ..TicketFilter::default()
        })
        .await
        .unwrap();

    assert!(hidden.is_empty());
    assert_eq!(shown.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_resolver_filter_reads_live_assignees(pool: PgPool) {
    // Arrange
    let tickets = PgTicketRepository::new(pool.clone());
    let assignees = PgAssigneeRepository::new(pool);
    let mine = ticket_record("TKT-000001", TicketStatus::Open, Severity::Sev2, t0());
    let theirs = ticket_record("TKT-000002", TicketStatus::Open, Severity::Sev2, t0());
    tickets.insert(&mine).await.unwrap();
    tickets.insert(&theirs).await.unwrap();
    assignees.add(&binding(mine.id, "res-7", AssigneeRole::Resolver)).await.unwrap();
    assignees.add(&binding(theirs.id, "res-7", AssigneeRole::Approver)).await.unwrap();
    let filter = TicketFilter {
        resolver_ids: vec!["res-7".to_owned()],
        ..TicketFilter::default()
    };

    // Act
    let rows = tickets.list_all(&filter).await.unwrap();

    // Assert
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, mine.id);
}

// --- assignees ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_assignee_add_is_idempotent_and_remove_reports_presence(pool: PgPool) {
    // Arrange
    let tickets = PgTicketRepository::new(pool.clone());
    let assignees = PgAssigneeRepository::new(pool);
    let ticket = ticket_record("TKT-000001", TicketStatus::Open, Severity::Sev2, t0());
    tickets.insert(&ticket).await.unwrap();
    let resolver = binding(ticket.id, "res-7", AssigneeRole::Resolver);

    // Act
    let first = assignees.add(&resolver).await.unwrap();
    let second = assignees.add(&resolver).await.unwrap();
    let as_approver = assignees
        .add(&binding(ticket.id, "res-7", AssigneeRole::Approver))
        .await
        .unwrap();

    // Assert
    assert!(first);
    assert!(!second);
    assert!(as_approver);
    assert_eq!(assignees.list_for_ticket(ticket.id).await.unwrap().len(), 2);
    assert!(assignees.remove(ticket.id, "res-7", AssigneeRole::Resolver).await.unwrap());
    assert!(!assignees.remove(ticket.id, "res-7", AssigneeRole::Resolver).await.unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_assignment_log_is_append_only_history(pool: PgPool) {
    // Arrange
    let tickets = PgTicketRepository::new(pool.clone());
    let assignees = PgAssigneeRepository::new(pool);
    let ticket = ticket_record("TKT-000001", TicketStatus::Open, Severity::Sev2, t0());
    tickets.insert(&ticket).await.unwrap();
    let changes = [AssignmentChange::Assigned, AssignmentChange::Unassigned];
    let entries: Vec<AssignmentLogEntry> = changes
        .into_iter()
        .enumerate()
        .map(|(i, change)| AssignmentLogEntry {
            id: Uuid::new_v4(),
            ticket_id: ticket.id,
            user_id: "res-7".to_owned(),
            role: AssigneeRole::Resolver,
            change,
            performed_by: "admin-1".to_owned(),
            performed_at: t0() + Duration::minutes(i64::try_from(i).unwrap()),
        })
        .collect();

    // Act
    for entry in &entries {
        assignees.record(entry).await.unwrap();
    }

    // Assert
    assert_eq!(assignees.history(ticket.id).await.unwrap(), entries);
    assert!(assignees.list_for_ticket(ticket.id).await.unwrap().is_empty());
}

// --- users ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_find_user(pool: PgPool) {
    sqlx::query(
        "INSERT INTO users (id, display_name, city, is_active) \
         VALUES ('res-7', 'Asha K', 'Pune', TRUE)",
    )
    .execute(&pool)
    .await
    .unwrap();
    let users = PgUserDirectory::new(pool);

    let found = users.find_user("res-7").await.unwrap().unwrap();
    let missing = users.find_user("nobody").await.unwrap();

    assert_eq!(found.display_name, "Asha K");
    assert_eq!(found.city.as_deref(), Some("Pune"));
    assert!(missing.is_none());
}
