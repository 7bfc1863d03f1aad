// =============================================================================
// List filtering properties
// =============================================================================
// The search, status and priority predicates are AND-combined; applying them
// in any order yields the same rows as `filter_projects`.

use admin_dashboard::model::{
    Project, ProjectId, ProjectPriority, ProjectStatus, User, UserId, UserRole, UserStatus,
};
use admin_dashboard::stores::Filter;
use admin_dashboard::views::{
    filter_projects, filter_users, project_matches_search, user_matches_search,
};
use chrono::NaiveDate;
use indexmap::IndexSet;
use proptest::prelude::*;
use proptest::sample::select;
use strum::IntoEnumIterator;

fn statuses() -> Vec<ProjectStatus> {
    ProjectStatus::iter().collect()
}

fn priorities() -> Vec<ProjectPriority> {
    ProjectPriority::iter().collect()
}

fn filter_of<T: Clone + std::fmt::Debug + 'static>(
    values: Vec<T>,
) -> impl Strategy<Value = Filter<T>> {
    prop_oneof![Just(Filter::All), select(values).prop_map(Filter::Only)]
}

fn arb_project() -> impl Strategy<Value = Project> {
    (
        "[A-Za-z ]{0,10}",
        "[A-Za-z ]{0,16}",
        select(statuses()),
        select(priorities()),
        0u32..1000,
    )
        .prop_map(|(name, description, status, priority, id)| Project {
            id: ProjectId::new(id.to_string()),
            name,
            description,
            status,
            priority,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            progress: 0,
            team_members: IndexSet::new(),
            budget: 100.0,
            tags: IndexSet::new(),
        })
}

fn arb_user() -> impl Strategy<Value = User> {
    (
        "[A-Za-z ]{0,10}",
        "[a-z]{1,5}@[a-z]{1,5}\\.com",
        select(UserRole::iter().collect::<Vec<_>>()),
        0u32..1000,
    )
        .prop_map(|(name, email, role, id)| User {
            id: UserId::new(id.to_string()),
            name,
            email,
            avatar: None,
            role,
            department: "Engineering".to_string(),
            join_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            status: UserStatus::Active,
            projects_count: 0,
        })
}

type ProjectPredicate<'a> = Box<dyn Fn(&Project) -> bool + 'a>;

proptest! {
    #[test]
    fn prop_project_filters_are_order_independent(
        projects in proptest::collection::vec(arb_project(), 0..20),
        query in "[A-Za-z]{0,3}",
        status in filter_of(statuses()),
        priority in filter_of(priorities()),
        order in Just(vec![0usize, 1, 2]).prop_shuffle(),
    ) {
        let expected = filter_projects(&projects, &query, &status, &priority);

        let predicates: [ProjectPredicate<'_>; 3] = [
            Box::new(|p: &Project| project_matches_search(p, &query)),
            Box::new(|p: &Project| status.matches(&p.status)),
            Box::new(|p: &Project| priority.matches(&p.priority)),
        ];
        let mut rows = projects.clone();
        for index in order {
            rows.retain(|p| predicates[index](p));
        }

        prop_assert_eq!(rows, expected);
    }

    #[test]
    fn prop_user_filters_are_order_independent(
        users in proptest::collection::vec(arb_user(), 0..20),
        query in "[A-Za-z@.]{0,3}",
        role in filter_of(UserRole::iter().collect::<Vec<_>>()),
        role_first in any::<bool>(),
    ) {
        let expected = filter_users(&users, &query, &role);

        let mut rows = users.clone();
        if role_first {
            rows.retain(|u| role.matches(&u.role));
            rows.retain(|u| user_matches_search(u, &query));
        } else {
            rows.retain(|u| user_matches_search(u, &query));
            rows.retain(|u| role.matches(&u.role));
        }

        prop_assert_eq!(rows, expected);
    }

    #[test]
    fn prop_search_ignores_case(
        project in arb_project(),
        query in "[A-Za-z]{1,3}",
    ) {
        prop_assert_eq!(
            project_matches_search(&project, &query.to_uppercase()),
            project_matches_search(&project, &query.to_lowercase())
        );
    }
}

#[test]
fn test_blank_query_and_all_filters_keep_everything() {
    let projects: Vec<Project> = (0..3)
        .map(|i| Project {
            id: ProjectId::new(i.to_string()),
            name: format!("Project {i}"),
            description: String::new(),
            status: ProjectStatus::Planning,
            priority: ProjectPriority::Low,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            progress: 0,
            team_members: IndexSet::new(),
            budget: 1.0,
            tags: IndexSet::new(),
        })
        .collect();
    assert_eq!(filter_projects(&projects, "", &Filter::All, &Filter::All), projects);
}
