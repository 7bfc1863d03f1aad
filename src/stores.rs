//! Observable UI state.
//!
//! Each store wraps a `watch` channel: setters replace state synchronously and
//! every subscriber sees the new snapshot. [`UiContext`] bundles one instance
//! of each store for an application.

use crate::forms::{ModalForm, ProjectForm, UserForm};
use crate::model::{Project, ProjectPriority, ProjectStatus, User, UserRole};
use crate::query::QueryClient;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::str::FromStr;
use tokio::sync::watch;
use tracing::{error, info};

/// Shared plumbing of every store.
#[derive(Debug)]
pub struct Store<S> {
    tx: watch::Sender<S>,
}

impl<S: Clone> Store<S> {
    pub fn new(initial: S) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn snapshot(&self) -> S {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }

    pub fn update(&self, f: impl FnOnce(&mut S)) {
        self.tx.send_modify(f);
    }

    /// Applies `f` and notifies only when it reports a change.
    pub fn update_if(&self, f: impl FnOnce(&mut S) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }
}

impl<S: Clone + Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

/// A select-box filter: everything, or one exact value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Filter<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Filter::All => true,
            Filter::Only(expected) => expected == value,
        }
    }
}

impl<T: AsRef<str>> Serialize for Filter<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Filter::All => serializer.serialize_str("all"),
            Filter::Only(value) => serializer.serialize_str(value.as_ref()),
        }
    }
}

impl<'de, T: FromStr> Deserialize<'de> for Filter<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == "all" {
            return Ok(Filter::All);
        }
        T::from_str(&raw)
            .map(Filter::Only)
            .map_err(|_| de::Error::custom(format!("unknown filter value '{raw}'")))
    }
}

// ----- sidebar --------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarState {
    pub is_open: bool,
}

#[derive(Debug, Default)]
pub struct SidebarStore(Store<SidebarState>);

impl SidebarStore {
    pub fn is_open(&self) -> bool {
        self.0.snapshot().is_open
    }

    pub fn open(&self) {
        self.0.update(|state| state.is_open = true);
    }

    pub fn close(&self) {
        self.0.update(|state| state.is_open = false);
    }

    pub fn toggle(&self) {
        self.0.update(|state| state.is_open = !state.is_open);
    }

    pub fn subscribe(&self) -> watch::Receiver<SidebarState> {
        self.0.subscribe()
    }
}

// ----- list pages -----------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListState {
    pub search_query: String,
    pub role_filter: Filter<UserRole>,
    pub selected_user: Option<User>,
}

#[derive(Debug, Default)]
pub struct UserListStore(Store<UserListState>);

impl UserListStore {
    pub fn snapshot(&self) -> UserListState {
        self.0.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<UserListState> {
        self.0.subscribe()
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.0.update(|state| state.search_query = query);
    }

    pub fn set_role_filter(&self, filter: Filter<UserRole>) {
        self.0.update(|state| state.role_filter = filter);
    }

    pub fn set_selected_user(&self, user: Option<User>) {
        self.0.update(|state| state.selected_user = user);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListState {
    pub search_query: String,
    pub status_filter: Filter<ProjectStatus>,
    pub priority_filter: Filter<ProjectPriority>,
    pub selected_project: Option<Project>,
}

#[derive(Debug, Default)]
pub struct ProjectListStore(Store<ProjectListState>);

impl ProjectListStore {
    pub fn snapshot(&self) -> ProjectListState {
        self.0.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProjectListState> {
        self.0.subscribe()
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.0.update(|state| state.search_query = query);
    }

    pub fn set_status_filter(&self, filter: Filter<ProjectStatus>) {
        self.0.update(|state| state.status_filter = filter);
    }

    pub fn set_priority_filter(&self, filter: Filter<ProjectPriority>) {
        self.0.update(|state| state.priority_filter = filter);
    }

    pub fn set_selected_project(&self, project: Option<Project>) {
        self.0.update(|state| state.selected_project = project);
    }
}

// ----- modals ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalState<F> {
    pub is_open: bool,
    pub form: F,
}

/// Result of submitting a modal form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum SubmitOutcome<E> {
    /// Saved; the modal is closed.
    Saved { record: E },
    /// Validation failed; nothing was sent.
    Invalid { errors: BTreeMap<String, String> },
    /// A previous submit of this form is still running.
    AlreadyPending,
    /// The modal is not open.
    Closed,
    /// The service rejected the write; the modal stays open.
    Failed { message: String },
}

/// Open flag plus the form working copy for one entity's modal.
pub struct ModalStore<F: ModalForm>(Store<ModalState<F>>);

impl<F: ModalForm> Default for ModalStore<F> {
    fn default() -> Self {
        Self(Store::new(ModalState {
            is_open: false,
            form: F::blank(),
        }))
    }
}

impl<F: ModalForm> ModalStore<F> {
    pub fn snapshot(&self) -> ModalState<F> {
        self.0.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ModalState<F>> {
        self.0.subscribe()
    }

    pub fn is_open(&self) -> bool {
        self.0.snapshot().is_open
    }

    /// Opens with a fresh blank form.
    pub fn open_create(&self) {
        self.0.update(|state| {
            state.is_open = true;
            state.form = F::blank();
        });
    }

    /// Opens with a form initialised from `entity`.
    pub fn open_edit(&self, entity: &F::Entity) {
        let form = F::for_entity(entity);
        self.0.update(|state| {
            state.is_open = true;
            state.form = form;
        });
    }

    pub fn close(&self) {
        self.0.update(|state| state.is_open = false);
    }

    /// Edits the working copy. Ignored while closed or while a submit is pending.
    pub fn edit(&self, f: impl FnOnce(&mut F) -> bool) -> bool {
        self.0.update_if(|state| {
            if !state.is_open || state.form.is_pending() {
                return false;
            }
            f(&mut state.form)
        })
    }

    /// Validates and saves through `client`.
    ///
    /// Success closes the modal. A service failure is logged and leaves the
    /// modal open with the form intact.
    pub async fn submit(&self, client: &QueryClient) -> SubmitOutcome<F::Entity> {
        let today = chrono::Local::now().date_naive();
        let mut outcome = None;
        let mut submission = None;
        self.0.update(|state| {
            if !state.is_open {
                outcome = Some(SubmitOutcome::Closed);
            } else if state.form.is_pending() {
                outcome = Some(SubmitOutcome::AlreadyPending);
            } else {
                match state.form.prepare(today) {
                    Some(prepared) => {
                        state.form.set_pending(true);
                        submission = Some(prepared);
                    }
                    None => {
                        outcome = Some(SubmitOutcome::Invalid {
                            errors: state.form.error_messages(),
                        });
                    }
                }
            }
        });

        let Some(submission) = submission else {
            return outcome.unwrap_or(SubmitOutcome::Closed);
        };

        let _pending = PendingGuard(&self.0);
        match F::save(client, submission).await {
            Ok(record) => {
                self.0.update(|state| {
                    state.form.set_pending(false);
                    state.is_open = false;
                });
                info!("form saved");
                SubmitOutcome::Saved { record }
            }
            Err(err) => {
                error!(error = %err, "error saving form");
                SubmitOutcome::Failed {
                    message: err.to_string(),
                }
            }
        }
    }
}

/// Clears the pending flag when a submit ends, including when its future is
/// dropped mid-save.
struct PendingGuard<'a, F: ModalForm>(&'a Store<ModalState<F>>);

impl<F: ModalForm> Drop for PendingGuard<'_, F> {
    fn drop(&mut self) {
        self.0.update_if(|state| {
            if !state.form.is_pending() {
                return false;
            }
            state.form.set_pending(false);
            true
        });
    }
}

/// All UI stores of one application instance.
#[derive(Default)]
pub struct UiContext {
    pub sidebar: SidebarStore,
    pub users: UserListStore,
    pub projects: ProjectListStore,
    pub user_modal: ModalStore<UserForm>,
    pub project_modal: ModalStore<ProjectForm>,
}

impl UiContext {
    pub fn new() -> Self {
        Self::default()
    }
}
