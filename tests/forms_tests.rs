// =============================================================================
// Form validation and modal submit flows
// =============================================================================

use admin_dashboard::forms::{
    ModalForm, ProjectFieldValue, ProjectForm, TagEditor, UserFieldValue, UserForm,
};
use admin_dashboard::model::{Project, ProjectId, ProjectPriority, ProjectStatus, UserId};
use admin_dashboard::query::{QueryClient, QueryOptions};
use admin_dashboard::service::{LatencyProfile, MockDataService, StatsMode};
use admin_dashboard::stores::{ModalStore, SubmitOutcome};
use assert_matches::assert_matches;
use chrono::NaiveDate;
use indexmap::IndexSet;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn client(latency: LatencyProfile) -> QueryClient {
    QueryClient::new(
        Arc::new(MockDataService::new(latency, StatsMode::Live)),
        QueryOptions::default(),
    )
}

fn project_form(start: &str, end: &str, budget: f64) -> ProjectForm {
    let mut form = ProjectForm::blank();
    form.set(ProjectFieldValue::Name("Data platform".to_string()));
    form.set(ProjectFieldValue::Description("Warehouse rebuild".to_string()));
    form.set(ProjectFieldValue::StartDate(start.to_string()));
    form.set(ProjectFieldValue::EndDate(end.to_string()));
    form.set(ProjectFieldValue::Budget(budget));
    form
}

fn user_form(email: &str) -> UserForm {
    let mut form = UserForm::blank();
    form.set(UserFieldValue::Name("Ada Lovelace".to_string()));
    form.set(UserFieldValue::Email(email.to_string()));
    form.set(UserFieldValue::Department("Research".to_string()));
    form
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_same_start_and_end_date_is_an_ordering_error() {
    let mut form = project_form("2024-01-01", "2024-01-01", 1000.0);
    assert!(form.prepare(today()).is_none());
    assert_eq!(
        form.error_messages()["endDate"],
        "End date must be after start date"
    );
}

#[test]
fn test_budget_must_be_positive() {
    let mut form = project_form("2024-01-01", "2024-02-01", 0.0);
    assert!(form.prepare(today()).is_none());
    assert_eq!(
        form.error_messages()["budget"],
        "Budget must be greater than 0"
    );

    let mut form = project_form("2024-01-01", "2024-02-01", 1000.0);
    assert!(form.prepare(today()).is_some());
    assert!(form.error_messages().is_empty());
}

#[test]
fn test_email_pattern() {
    let mut form = user_form("not-an-email");
    assert!(form.prepare(today()).is_none());
    assert_eq!(
        form.error_messages()["email"],
        "Please enter a valid email address"
    );

    let mut form = user_form("a@b.co");
    assert!(form.prepare(today()).is_some());
}

#[test]
fn test_editing_a_field_clears_only_its_error() {
    let mut form = ProjectForm::blank();
    assert!(form.prepare(today()).is_none());
    let before = form.error_messages();
    assert!(before.contains_key("name"));
    assert!(before.contains_key("budget"));

    form.set(ProjectFieldValue::Name("Renamed".to_string()));
    let after = form.error_messages();
    assert!(!after.contains_key("name"));
    assert!(after.contains_key("budget"));
}

// =============================================================================
// Tag editor
// =============================================================================

#[test]
fn test_tag_editor_trims_and_clears_input() {
    let mut editor = TagEditor::default();
    editor.set_input("  api ");
    assert!(editor.add());
    assert_eq!(editor.tags.iter().collect::<Vec<_>>(), ["api"]);
    assert!(editor.input.is_empty());

    editor.set_input("   ");
    assert!(!editor.add());

    editor.set_input("api");
    assert!(!editor.add(), "duplicates are ignored");
    assert_eq!(editor.input, "api", "input is kept when nothing was added");

    assert!(!editor.key("Tab"));
    assert!(editor.remove("api"));
    assert!(!editor.remove("api"));
}

proptest! {
    #[test]
    fn prop_adding_a_tag_twice_equals_adding_it_once(
        existing in proptest::collection::vec("[a-z]{1,6}", 0..5),
        tag in "[ a-z]{0,8}",
    ) {
        let mut once = TagEditor::with_tags(existing.iter().cloned().collect());
        once.set_input(tag.clone());
        once.add();

        let mut twice = once.clone();
        twice.set_input(tag.clone());
        twice.add();

        prop_assert_eq!(&once.tags, &twice.tags);
        let trimmed = tag.trim();
        if !trimmed.is_empty() {
            prop_assert!(once.tags.contains(trimmed));
        }
    }
}

// =============================================================================
// Modal submit
// =============================================================================

#[tokio::test]
async fn test_create_defaults_for_new_project() {
    let client = client(LatencyProfile::none());
    let modal: ModalStore<ProjectForm> = ModalStore::default();
    modal.open_create();
    modal.edit(|form| {
        *form = project_form("2024-01-01", "2024-03-01", 5000.0);
        form.tags.set_input("infra");
        form.tags.add()
    });

    let outcome = modal.submit(&client).await;
    let SubmitOutcome::Saved { record } = outcome else {
        panic!("expected saved project, got {outcome:?}");
    };
    assert_eq!(record.progress, 0);
    assert!(record.team_members.is_empty());
    assert!(record.tags.contains("infra"));
    assert!(!modal.is_open());
}

#[tokio::test]
async fn test_create_defaults_for_new_user() {
    let client = client(LatencyProfile::none());
    let modal: ModalStore<UserForm> = ModalStore::default();
    modal.open_create();
    modal.edit(|form| {
        *form = user_form("ada@example.com");
        true
    });

    let SubmitOutcome::Saved { record } = modal.submit(&client).await else {
        panic!("expected saved user");
    };
    assert_eq!(record.projects_count, 0);
    assert!(record.avatar.is_some());
    assert_eq!(record.join_date, chrono::Local::now().date_naive());
}

#[tokio::test]
async fn test_edit_keeps_progress_and_team() {
    let client = client(LatencyProfile::none());
    let existing = client.projects().await.unwrap()[0].clone();

    let modal: ModalStore<ProjectForm> = ModalStore::default();
    modal.open_edit(&existing);
    modal.edit(|form| {
        form.set(ProjectFieldValue::Priority(ProjectPriority::Urgent));
        true
    });

    let SubmitOutcome::Saved { record } = modal.submit(&client).await else {
        panic!("expected saved project");
    };
    assert_eq!(record.id, existing.id);
    assert_eq!(record.priority, ProjectPriority::Urgent);
    assert_eq!(record.progress, existing.progress);
    assert_eq!(record.team_members, existing.team_members);
}

#[tokio::test]
async fn test_invalid_submit_keeps_modal_open() {
    let client = client(LatencyProfile::none());
    let modal: ModalStore<UserForm> = ModalStore::default();
    modal.open_create();

    let outcome = modal.submit(&client).await;
    assert_matches!(outcome, SubmitOutcome::Invalid { ref errors } if errors.len() == 3);
    assert!(modal.is_open());
}

#[tokio::test]
async fn test_service_failure_keeps_modal_open_and_clears_pending() {
    let client = client(LatencyProfile::none());
    let ghost = Project {
        id: ProjectId::new("ghost"),
        name: "Ghost".to_string(),
        description: "Not in the service".to_string(),
        status: ProjectStatus::Planning,
        priority: ProjectPriority::Low,
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        progress: 0,
        team_members: IndexSet::from([UserId::new("1")]),
        budget: 10.0,
        tags: IndexSet::new(),
    };
    let modal: ModalStore<ProjectForm> = ModalStore::default();
    modal.open_edit(&ghost);

    let outcome = modal.submit(&client).await;
    assert_matches!(outcome, SubmitOutcome::Failed { .. });
    let state = modal.snapshot();
    assert!(state.is_open);
    assert!(!state.form.pending);
    assert_eq!(state.form.values.name, "Ghost");
}

#[tokio::test(start_paused = true)]
async fn test_second_submit_while_pending_is_rejected() {
    let client = client(LatencyProfile::default());
    let modal: ModalStore<UserForm> = ModalStore::default();
    modal.open_create();
    modal.edit(|form| {
        *form = user_form("ada@example.com");
        true
    });

    let (first, second) = tokio::join!(modal.submit(&client), modal.submit(&client));
    assert_matches!(first, SubmitOutcome::Saved { .. });
    assert_matches!(second, SubmitOutcome::AlreadyPending);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_submit_releases_pending_state() {
    let client = client(LatencyProfile::default());
    let modal: ModalStore<UserForm> = ModalStore::default();
    modal.open_create();
    modal.edit(|form| {
        *form = user_form("ada@example.com");
        true
    });

    let cancelled = tokio::time::timeout(Duration::from_millis(100), modal.submit(&client)).await;
    assert!(cancelled.is_err(), "save outlives the timeout");

    assert!(!modal.snapshot().form.pending);
    assert!(modal.is_open());
    assert_eq!(client.pending_mutations(), 0);
    assert!(modal.edit(|form| {
        form.set(UserFieldValue::Department("Platform".to_string()));
        true
    }));

    let retried = modal.submit(&client).await;
    assert_matches!(retried, SubmitOutcome::Saved { ref record } if record.department == "Platform");
}

#[tokio::test]
async fn test_submit_on_closed_modal() {
    let client = client(LatencyProfile::none());
    let modal: ModalStore<UserForm> = ModalStore::default();
    assert_matches!(modal.submit(&client).await, SubmitOutcome::Closed);
}

#[tokio::test]
async fn test_reopen_reinitializes_form() {
    let modal: ModalStore<ProjectForm> = ModalStore::default();
    modal.open_create();
    modal.edit(|form| {
        form.set(ProjectFieldValue::Name("Draft".to_string()));
        true
    });
    modal.close();
    assert!(!modal.edit(|_| true), "edits are ignored while closed");

    modal.open_create();
    assert!(modal.snapshot().form.values.name.is_empty());
}
