//! User interactions.
//!
//! A [`UiAction`] is one click or keystroke. [`dispatch`] applies it to the
//! stores (or submits a form through the query client) and returns the page
//! the action belongs to, rendered after the change.

use crate::error::{DashboardError, DashboardResult};
use crate::forms::{ProjectFieldValue, UserFieldValue};
use crate::model::{
    Project, ProjectId, ProjectPriority, ProjectStatus, ResourceKind, User, UserId, UserRole,
};
use crate::query::{QueryClient, QueryKey};
use crate::router::Route;
use crate::state::AppState;
use crate::stores::{Filter, SubmitOutcome};
use crate::views::{self, Shell};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "type", rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum UiAction {
    OpenSidebar,
    CloseSidebar,
    ToggleSidebar,
    /// Following a nav link also closes the sidebar.
    Navigate { to: Route },

    SetUserSearch { query: String },
    SetRoleFilter { filter: Filter<UserRole> },
    SelectUser { id: Option<UserId> },
    OpenCreateUser,
    OpenEditUser { id: UserId },
    CloseUserModal,
    EditUser { change: UserFieldValue },
    SubmitUser,

    SetProjectSearch { query: String },
    SetStatusFilter { filter: Filter<ProjectStatus> },
    SetPriorityFilter { filter: Filter<ProjectPriority> },
    SelectProject { id: Option<ProjectId> },
    OpenCreateProject,
    OpenEditProject { id: ProjectId },
    CloseProjectModal,
    EditProject { change: ProjectFieldValue },
    SetTagInput { input: String },
    AddTag,
    RemoveTag { tag: String },
    /// A key pressed inside the tag input.
    TagKey { key: String },
    SubmitProject,

    /// Drops the cached (possibly failed) data of `resource` and fetches it again.
    Retry { resource: ResourceKind },
}

impl UiAction {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// The page an action belongs to, if it is tied to one.
    pub fn route(&self) -> Option<Route> {
        use UiAction::*;
        match self {
            OpenSidebar | CloseSidebar | ToggleSidebar => None,
            Navigate { to } => Some(*to),
            SetUserSearch { .. } | SetRoleFilter { .. } | SelectUser { .. } | OpenCreateUser
            | OpenEditUser { .. } | CloseUserModal | EditUser { .. } | SubmitUser => {
                Some(Route::Users)
            }
            SetProjectSearch { .. }
            | SetStatusFilter { .. }
            | SetPriorityFilter { .. }
            | SelectProject { .. }
            | OpenCreateProject
            | OpenEditProject { .. }
            | CloseProjectModal
            | EditProject { .. }
            | SetTagInput { .. }
            | AddTag
            | RemoveTag { .. }
            | TagKey { .. }
            | SubmitProject => Some(Route::Projects),
            Retry { resource } => Some(match resource {
                ResourceKind::Users => Route::Users,
                ResourceKind::Projects => Route::Projects,
                ResourceKind::DashboardStats => Route::Home,
            }),
        }
    }
}

/// Body of `POST /actions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Page the action was triggered from; used when the action has no page of its own.
    #[serde(default)]
    pub from: Option<Route>,
    pub action: UiAction,
}

impl ActionRequest {
    pub fn new(action: UiAction) -> Self {
        Self { from: None, action }
    }

    pub fn target(&self) -> Route {
        self.action.route().or(self.from).unwrap_or(Route::Home)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "kebab-case")]
pub enum ActionOutcome {
    Applied,
    /// Nothing changed, e.g. a duplicate tag or an edit while saving.
    Ignored,
    UserSubmit(SubmitOutcome<User>),
    ProjectSubmit(SubmitOutcome<Project>),
}

impl From<bool> for ActionOutcome {
    fn from(changed: bool) -> Self {
        if changed {
            ActionOutcome::Applied
        } else {
            ActionOutcome::Ignored
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse {
    pub outcome: ActionOutcome,
    pub shell: Shell,
}

async fn find_user(client: &QueryClient, id: &UserId) -> DashboardResult<User> {
    client
        .user(id)
        .await?
        .ok_or_else(|| DashboardError::not_found(ResourceKind::Users, id))
}

async fn find_project(client: &QueryClient, id: &ProjectId) -> DashboardResult<Project> {
    client
        .project(id)
        .await?
        .ok_or_else(|| DashboardError::not_found(ResourceKind::Projects, id))
}

/// Applies one action and renders its page.
///
/// Errors are only returned for lookups that fail (editing or selecting an
/// unknown id); submit failures are reported in the outcome.
pub async fn dispatch(state: &AppState, request: ActionRequest) -> DashboardResult<ActionResponse> {
    let route = request.target();
    debug!(action = request.action.name(), %route, "dispatching ui action");
    let outcome = apply(state, request.action).await?;
    let page = views::load(route, state.query(), state.ui()).await;
    Ok(ActionResponse {
        outcome,
        shell: Shell::new(Some(route), state.ui(), page),
    })
}

async fn apply(state: &AppState, action: UiAction) -> DashboardResult<ActionOutcome> {
    let client = state.query();
    let ui = state.ui();
    let outcome = match action {
        UiAction::OpenSidebar => {
            ui.sidebar.open();
            ActionOutcome::Applied
        }
        UiAction::CloseSidebar => {
            ui.sidebar.close();
            ActionOutcome::Applied
        }
        UiAction::ToggleSidebar => {
            ui.sidebar.toggle();
            ActionOutcome::Applied
        }
        UiAction::Navigate { .. } => {
            ui.sidebar.close();
            ActionOutcome::Applied
        }

        UiAction::SetUserSearch { query } => {
            ui.users.set_search_query(query);
            ActionOutcome::Applied
        }
        UiAction::SetRoleFilter { filter } => {
            ui.users.set_role_filter(filter);
            ActionOutcome::Applied
        }
        UiAction::SelectUser { id } => {
            let user = match id {
                Some(id) => Some(find_user(client, &id).await?),
                None => None,
            };
            ui.users.set_selected_user(user);
            ActionOutcome::Applied
        }
        UiAction::OpenCreateUser => {
            ui.user_modal.open_create();
            ActionOutcome::Applied
        }
        UiAction::OpenEditUser { id } => {
            let user = find_user(client, &id).await?;
            ui.user_modal.open_edit(&user);
            ActionOutcome::Applied
        }
        UiAction::CloseUserModal => {
            ui.user_modal.close();
            ActionOutcome::Applied
        }
        UiAction::EditUser { change } => ui
            .user_modal
            .edit(|form| {
                form.set(change);
                true
            })
            .into(),
        UiAction::SubmitUser => {
            let outcome = ui.user_modal.submit(client).await;
            if let SubmitOutcome::Saved { record } = &outcome {
                info!(user_id = %record.id, "user saved");
            }
            ActionOutcome::UserSubmit(outcome)
        }

        UiAction::SetProjectSearch { query } => {
            ui.projects.set_search_query(query);
            ActionOutcome::Applied
        }
        UiAction::SetStatusFilter { filter } => {
            ui.projects.set_status_filter(filter);
            ActionOutcome::Applied
        }
        UiAction::SetPriorityFilter { filter } => {
            ui.projects.set_priority_filter(filter);
            ActionOutcome::Applied
        }
        UiAction::SelectProject { id } => {
            let project = match id {
                Some(id) => Some(find_project(client, &id).await?),
                None => None,
            };
            ui.projects.set_selected_project(project);
            ActionOutcome::Applied
        }
        UiAction::OpenCreateProject => {
            ui.project_modal.open_create();
            ActionOutcome::Applied
        }
        UiAction::OpenEditProject { id } => {
            let project = find_project(client, &id).await?;
            ui.project_modal.open_edit(&project);
            ActionOutcome::Applied
        }
        UiAction::CloseProjectModal => {
            ui.project_modal.close();
            ActionOutcome::Applied
        }
        UiAction::EditProject { change } => ui
            .project_modal
            .edit(|form| {
                form.set(change);
                true
            })
            .into(),
        UiAction::SetTagInput { input } => ui
            .project_modal
            .edit(|form| {
                form.tags.set_input(input);
                true
            })
            .into(),
        UiAction::AddTag => ui.project_modal.edit(|form| form.tags.add()).into(),
        UiAction::RemoveTag { tag } => ui.project_modal.edit(|form| form.tags.remove(&tag)).into(),
        UiAction::TagKey { key } => ui.project_modal.edit(|form| form.tags.key(&key)).into(),
        UiAction::SubmitProject => {
            let outcome = ui.project_modal.submit(client).await;
            if let SubmitOutcome::Saved { record } = &outcome {
                info!(project_id = %record.id, "project saved");
            }
            ActionOutcome::ProjectSubmit(outcome)
        }

        UiAction::Retry { resource } => {
            client.invalidate(resource);
            let key = match resource {
                ResourceKind::Users => QueryKey::Users,
                ResourceKind::Projects => QueryKey::Projects,
                ResourceKind::DashboardStats => QueryKey::DashboardStats,
            };
            // The page render below surfaces a repeated failure.
            if let Err(error) = client.fetch(&key).await {
                debug!(%key, error = %error, "retry failed");
            }
            ActionOutcome::Applied
        }
    };
    Ok(outcome)
}
