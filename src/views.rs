//! Page view models.
//!
//! Every page is derived from two inputs only: the query cache and the UI
//! stores. [`render`] reads both without waiting and reports loading or
//! failed sections as such; [`load`] first awaits the queries the route needs.

use crate::error::DashboardError;
use crate::forms::{ProjectForm, UserForm};
use crate::model::{
    DashboardStats, Project, ProjectPriority, ProjectStatus, ResourceKind, User, UserRole,
    UserStatus,
};
use crate::query::{QueryClient, QueryKey, QueryOutput, QueryStatus};
use crate::router::{NavItem, Route, navigation};
use crate::stores::{Filter, ModalState, ProjectListState, UiContext, UserListState};
use axum::http::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Rows shown in each "recent" list of the home page.
pub const RECENT_LIMIT: usize = 5;

/// Tags shown on a project card before collapsing into "+N".
pub const CARD_TAG_LIMIT: usize = 3;

const NO_MATCHES_HINT: &str = "Try adjusting your search or filter criteria.";

// ----- filtering ------------------------------------------------------------

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Case-insensitive substring match on name or email. A blank query matches everything.
pub fn user_matches_search(user: &User, query: &str) -> bool {
    let query = query.to_lowercase();
    contains_ignore_case(&user.name, &query) || contains_ignore_case(&user.email, &query)
}

/// Case-insensitive substring match on name or description.
pub fn project_matches_search(project: &Project, query: &str) -> bool {
    let query = query.to_lowercase();
    contains_ignore_case(&project.name, &query)
        || contains_ignore_case(&project.description, &query)
}

pub fn filter_users(users: &[User], query: &str, role: &Filter<UserRole>) -> Vec<User> {
    users
        .iter()
        .filter(|user| user_matches_search(user, query))
        .filter(|user| role.matches(&user.role))
        .cloned()
        .collect()
}

pub fn filter_projects(
    projects: &[Project],
    query: &str,
    status: &Filter<ProjectStatus>,
    priority: &Filter<ProjectPriority>,
) -> Vec<Project> {
    projects
        .iter()
        .filter(|project| project_matches_search(project, query))
        .filter(|project| status.matches(&project.status))
        .filter(|project| priority.matches(&project.priority))
        .cloned()
        .collect()
}

/// `$1,250,000` style amounts; cents are kept only when present.
pub fn format_currency(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let cents = (amount.abs() * 100.0).round() as u64;
    let (whole, fraction) = (cents / 100, cents % 100);

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        0 => format!("{sign}${grouped}"),
        f if f % 10 == 0 => format!("{sign}${grouped}.{}", f / 10),
        f => format!("{sign}${grouped}.{f:02}"),
    }
}

// ----- sections -------------------------------------------------------------

/// One query-backed region of a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum Section<T> {
    Loading,
    /// `refreshing` is set while a stale value is shown during a refetch.
    Ready { data: T, refreshing: bool },
    /// The fetch failed; the `retry` action refetches `resource`.
    Error { message: String, resource: ResourceKind },
}

impl<T> Section<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            Section::Ready { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Section::Loading)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Section::Error { .. })
    }
}

pub fn load_error_message(resource: ResourceKind) -> &'static str {
    match resource {
        ResourceKind::Users => "Error loading users",
        ResourceKind::Projects => "Error loading projects",
        ResourceKind::DashboardStats => "Error loading statistics",
    }
}

fn section<T: QueryOutput, V>(
    client: &QueryClient,
    key: &QueryKey,
    build: impl FnOnce(T) -> V,
) -> Section<V> {
    match client.read_as::<T>(key) {
        QueryStatus::Ready(value) => Section::Ready {
            data: build(value),
            refreshing: false,
        },
        QueryStatus::Loading {
            previous: Some(value),
        } => Section::Ready {
            data: build(value),
            refreshing: true,
        },
        QueryStatus::Loading { previous: None } | QueryStatus::Disabled => Section::Loading,
        QueryStatus::Failed(error) => {
            debug!(%key, error = %error, "rendering failed section");
            Section::Error {
                message: load_error_message(key.kind()).to_string(),
                resource: key.kind(),
            }
        }
    }
}

/// Shown in place of an empty list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyState {
    pub title: &'static str,
    pub hint: &'static str,
}

// ----- home -----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatCard {
    pub title: &'static str,
    pub value: String,
    pub change: &'static str,
}

pub fn stat_cards(stats: &DashboardStats) -> Vec<StatCard> {
    vec![
        StatCard {
            title: "Total Users",
            value: stats.total_users.to_string(),
            change: "+12% this month",
        },
        StatCard {
            title: "Active Projects",
            value: stats.in_progress_projects.to_string(),
            change: "+8% this month",
        },
        StatCard {
            title: "Completed Projects",
            value: stats.completed_projects.to_string(),
            change: "+23% this month",
        },
        StatCard {
            title: "Total Revenue",
            value: format_currency(stats.total_revenue),
            change: "+15% this month",
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub status: UserStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentProject {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub progress: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomePage {
    pub stats: Section<Vec<StatCard>>,
    pub recent_users: Section<Vec<RecentUser>>,
    pub recent_projects: Section<Vec<RecentProject>>,
}

fn home_page(client: &QueryClient) -> HomePage {
    HomePage {
        stats: section(client, &QueryKey::DashboardStats, |stats: DashboardStats| {
            stat_cards(&stats)
        }),
        recent_users: section(client, &QueryKey::Users, |users: Arc<Vec<User>>| {
            users
                .iter()
                .take(RECENT_LIMIT)
                .map(|user| RecentUser {
                    id: user.id.to_string(),
                    name: user.name.clone(),
                    email: user.email.clone(),
                    avatar: user.avatar.clone(),
                    status: user.status,
                })
                .collect()
        }),
        recent_projects: section(client, &QueryKey::Projects, |projects: Arc<Vec<Project>>| {
            projects
                .iter()
                .take(RECENT_LIMIT)
                .map(|project| RecentProject {
                    id: project.id.to_string(),
                    name: project.name.clone(),
                    description: project.description.clone(),
                    status: project.status,
                    progress: project.progress,
                })
                .collect()
        }),
    }
}

// ----- users ----------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub total: usize,
    pub active: usize,
    pub admins: usize,
    pub developers: usize,
}

impl UserSummary {
    pub fn of(users: &[User]) -> Self {
        Self {
            total: users.len(),
            active: users
                .iter()
                .filter(|user| user.status == UserStatus::Active)
                .count(),
            admins: users.iter().filter(|user| user.role == UserRole::Admin).count(),
            developers: users
                .iter()
                .filter(|user| user.role == UserRole::Developer)
                .count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserListing {
    /// Counts over the whole collection, not the filtered rows.
    pub summary: UserSummary,
    pub users: Vec<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty: Option<EmptyState>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsersPage {
    pub listing: Section<UserListing>,
    pub filters: UserListState,
    pub modal: ModalState<UserForm>,
}

fn users_page(client: &QueryClient, ui: &UiContext) -> UsersPage {
    let filters = ui.users.snapshot();
    let listing = section(client, &QueryKey::Users, |users: Arc<Vec<User>>| {
        let rows = filter_users(&users, &filters.search_query, &filters.role_filter);
        UserListing {
            summary: UserSummary::of(&users),
            empty: rows.is_empty().then_some(EmptyState {
                title: "No users found",
                hint: NO_MATCHES_HINT,
            }),
            users: rows,
        }
    });
    UsersPage {
        listing,
        filters,
        modal: ui.user_modal.snapshot(),
    }
}

// ----- projects -------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub total: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub total_budget: String,
}

impl ProjectSummary {
    pub fn of(projects: &[Project]) -> Self {
        Self {
            total: projects.len(),
            in_progress: projects
                .iter()
                .filter(|project| project.status == ProjectStatus::InProgress)
                .count(),
            completed: projects
                .iter()
                .filter(|project| project.status == ProjectStatus::Completed)
                .count(),
            total_budget: format_currency(projects.iter().map(|project| project.budget).sum()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCard {
    pub project: Project,
    pub budget_display: String,
    pub team_size: usize,
    pub visible_tags: Vec<String>,
    /// Tags collapsed into the "+N" badge
    pub hidden_tag_count: usize,
}

impl ProjectCard {
    pub fn new(project: Project) -> Self {
        let visible_tags: Vec<String> =
            project.tags.iter().take(CARD_TAG_LIMIT).cloned().collect();
        Self {
            budget_display: format_currency(project.budget),
            team_size: project.team_members.len(),
            hidden_tag_count: project.tags.len() - visible_tags.len(),
            visible_tags,
            project,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectListing {
    pub summary: ProjectSummary,
    pub projects: Vec<ProjectCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty: Option<EmptyState>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectsPage {
    pub listing: Section<ProjectListing>,
    pub filters: ProjectListState,
    pub modal: ModalState<ProjectForm>,
}

fn projects_page(client: &QueryClient, ui: &UiContext) -> ProjectsPage {
    let filters = ui.projects.snapshot();
    let listing = section(client, &QueryKey::Projects, |projects: Arc<Vec<Project>>| {
        let rows = filter_projects(
            &projects,
            &filters.search_query,
            &filters.status_filter,
            &filters.priority_filter,
        );
        ProjectListing {
            summary: ProjectSummary::of(&projects),
            empty: rows.is_empty().then_some(EmptyState {
                title: "No projects found",
                hint: NO_MATCHES_HINT,
            }),
            projects: rows.into_iter().map(ProjectCard::new).collect(),
        }
    });
    ProjectsPage {
        listing,
        filters,
        modal: ui.project_modal.snapshot(),
    }
}

// ----- placeholder & error --------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderPage {
    pub title: &'static str,
    pub message: String,
}

impl PlaceholderPage {
    pub fn new(route: Route) -> Self {
        Self {
            title: route.title(),
            message: format!("{} page coming soon...", route.title()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPage {
    pub title: &'static str,
    pub message: &'static str,
    pub status: u16,
}

impl ErrorPage {
    pub fn invalid_page() -> Self {
        Self {
            title: "Oops...",
            message: "Sorry, invalid page",
            status: StatusCode::NOT_FOUND.as_u16(),
        }
    }

    pub fn unexpected() -> Self {
        Self {
            title: "Oops...",
            message: "Sorry, an unexpected error occurred",
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        }
    }

    pub fn for_error(error: &DashboardError) -> Self {
        match error {
            DashboardError::Route(_) => Self::invalid_page(),
            _ => Self::unexpected(),
        }
    }
}

// ----- pages ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "page", rename_all = "kebab-case")]
pub enum Page {
    Home(HomePage),
    Users(UsersPage),
    Projects(ProjectsPage),
    Placeholder(PlaceholderPage),
    Error(ErrorPage),
}

impl Page {
    pub fn status(&self) -> StatusCode {
        match self {
            Page::Error(error) => {
                StatusCode::from_u16(error.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            _ => StatusCode::OK,
        }
    }
}

/// Builds the page for `route` from whatever the cache holds now.
///
/// Missing or stale queries start a background fetch and show as loading.
pub fn render(route: Route, client: &QueryClient, ui: &UiContext) -> Page {
    match route {
        Route::Home => Page::Home(home_page(client)),
        Route::Users => Page::Users(users_page(client, ui)),
        Route::Projects => Page::Projects(projects_page(client, ui)),
        Route::Analytics | Route::Settings => Page::Placeholder(PlaceholderPage::new(route)),
    }
}

/// Queries a route reads.
pub fn route_queries(route: Route) -> Vec<QueryKey> {
    match route {
        Route::Home => vec![QueryKey::DashboardStats, QueryKey::Users, QueryKey::Projects],
        Route::Users => vec![QueryKey::Users],
        Route::Projects => vec![QueryKey::Projects],
        Route::Analytics | Route::Settings => Vec::new(),
    }
}

/// Awaits every query of `route`, then renders. Fetch failures are not
/// returned; they surface as error sections.
pub async fn load(route: Route, client: &QueryClient, ui: &UiContext) -> Page {
    let keys = route_queries(route);
    let results = futures::future::join_all(keys.iter().map(|key| client.fetch(key))).await;
    for (key, result) in keys.iter().zip(results) {
        if let Err(error) = result {
            debug!(%key, error = %error, "page query failed");
        }
    }
    render(route, client, ui)
}

/// The layout around every page: navigation, sidebar flag and content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shell {
    pub route: Option<Route>,
    pub navigation: Vec<NavItem>,
    pub sidebar_open: bool,
    pub page: Page,
}

impl Shell {
    pub fn new(route: Option<Route>, ui: &UiContext, page: Page) -> Self {
        Self {
            route,
            navigation: navigation(route),
            sidebar_open: ui.sidebar.is_open(),
            page,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.page.status()
    }
}
