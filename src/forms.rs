//! Create/edit forms for users and projects.
//!
//! A form is a working copy of the entity being edited plus its field errors
//! and a pending flag. [`ModalForm`] is the seam the modal store uses to open,
//! validate and save any of them.

use crate::error::DashboardResult;
use crate::model::{
    NewProject, NewUser, Project, ProjectPatch, ProjectPriority, ProjectStatus, User, UserPatch,
    UserRole, UserStatus,
};
use crate::query::QueryClient;
use crate::service::seed::DEFAULT_AVATAR;
use crate::validation::{
    FieldErrors, validate_date, validate_date_order, validate_email, validate_positive,
    validate_required,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Whether the form creates a new record or edits the one it carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormMode<E> {
    Create,
    Edit(E),
}

impl<E> FormMode<E> {
    pub fn is_create(&self) -> bool {
        matches!(self, FormMode::Create)
    }

    pub fn target(&self) -> Option<&E> {
        match self {
            FormMode::Create => None,
            FormMode::Edit(entity) => Some(entity),
        }
    }
}

/// Behaviour the modal store needs from a form.
#[async_trait]
pub trait ModalForm: Clone + Send + Sync + 'static {
    type Entity: Clone + Send + Sync + 'static;
    type Submission: Send + 'static;

    fn blank() -> Self;
    fn for_entity(entity: &Self::Entity) -> Self;

    fn is_pending(&self) -> bool;
    fn set_pending(&mut self, pending: bool);

    /// Runs validation, recording field errors. `None` blocks the submit.
    fn prepare(&mut self, today: NaiveDate) -> Option<Self::Submission>;

    /// Current field errors as display messages keyed by wire field name.
    fn error_messages(&self) -> std::collections::BTreeMap<String, String>;

    async fn save(client: &QueryClient, submission: Self::Submission)
    -> DashboardResult<Self::Entity>;
}

// ----- users ----------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, AsRefStr, Display,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum UserField {
    Name,
    Email,
    Role,
    Department,
    Status,
}

/// One edit of a user form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum UserFieldValue {
    Name(String),
    Email(String),
    Role(UserRole),
    Department(String),
    Status(UserStatus),
}

impl UserFieldValue {
    pub fn field(&self) -> UserField {
        match self {
            UserFieldValue::Name(_) => UserField::Name,
            UserFieldValue::Email(_) => UserField::Email,
            UserFieldValue::Role(_) => UserField::Role,
            UserFieldValue::Department(_) => UserField::Department,
            UserFieldValue::Status(_) => UserField::Status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFormValues {
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub department: String,
    pub status: UserStatus,
}

impl Default for UserFormValues {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            role: UserRole::Developer,
            department: String::new(),
            status: UserStatus::Active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserForm {
    pub mode: FormMode<User>,
    pub values: UserFormValues,
    pub errors: FieldErrors<UserField>,
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserSubmission {
    Create(NewUser),
    Update(User, UserPatch),
}

impl UserForm {
    /// Replaces one field and clears that field's error.
    pub fn set(&mut self, value: UserFieldValue) {
        self.errors.clear(value.field());
        match value {
            UserFieldValue::Name(name) => self.values.name = name,
            UserFieldValue::Email(email) => self.values.email = email,
            UserFieldValue::Role(role) => self.values.role = role,
            UserFieldValue::Department(department) => self.values.department = department,
            UserFieldValue::Status(status) => self.values.status = status,
        }
    }

    /// Replaces the recorded errors with the current validation result.
    pub fn validate(&mut self) -> bool {
        let mut errors = FieldErrors::new();
        let values = &self.values;
        errors.check(UserField::Name, validate_required("Name", &values.name));
        errors.check(UserField::Email, validate_email("Email", &values.email));
        errors.check(
            UserField::Department,
            validate_required("Department", &values.department),
        );
        self.errors = errors;
        self.errors.is_empty()
    }

    pub fn submission(&mut self, today: NaiveDate) -> Option<UserSubmission> {
        if !self.validate() {
            return None;
        }
        let values = self.values.clone();
        Some(match &self.mode {
            FormMode::Create => UserSubmission::Create(NewUser {
                name: values.name,
                email: values.email,
                avatar: Some(DEFAULT_AVATAR.to_string()),
                role: values.role,
                department: values.department,
                join_date: today,
                status: values.status,
                projects_count: 0,
            }),
            FormMode::Edit(user) => UserSubmission::Update(
                user.clone(),
                UserPatch {
                    name: Some(values.name),
                    email: Some(values.email),
                    role: Some(values.role),
                    department: Some(values.department),
                    status: Some(values.status),
                    ..UserPatch::default()
                },
            ),
        })
    }
}

#[async_trait]
impl ModalForm for UserForm {
    type Entity = User;
    type Submission = UserSubmission;

    fn blank() -> Self {
        Self {
            mode: FormMode::Create,
            values: UserFormValues::default(),
            errors: FieldErrors::new(),
            pending: false,
        }
    }

    fn for_entity(user: &User) -> Self {
        Self {
            mode: FormMode::Edit(user.clone()),
            values: UserFormValues {
                name: user.name.clone(),
                email: user.email.clone(),
                role: user.role,
                department: user.department.clone(),
                status: user.status,
            },
            errors: FieldErrors::new(),
            pending: false,
        }
    }

    fn is_pending(&self) -> bool {
        self.pending
    }

    fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }

    fn prepare(&mut self, today: NaiveDate) -> Option<UserSubmission> {
        self.submission(today)
    }

    fn error_messages(&self) -> std::collections::BTreeMap<String, String> {
        self.errors.messages()
    }

    async fn save(client: &QueryClient, submission: UserSubmission) -> DashboardResult<User> {
        match submission {
            UserSubmission::Create(user) => client.create_user(user).await,
            UserSubmission::Update(user, patch) => client.update_user(&user.id, patch).await,
        }
    }
}

// ----- projects -------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, AsRefStr, Display,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ProjectField {
    Name,
    Description,
    Status,
    Priority,
    StartDate,
    EndDate,
    Budget,
    Tags,
}

/// One edit of a project form field. Dates stay raw text until submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum ProjectFieldValue {
    Name(String),
    Description(String),
    Status(ProjectStatus),
    Priority(ProjectPriority),
    StartDate(String),
    EndDate(String),
    Budget(f64),
}

impl ProjectFieldValue {
    pub fn field(&self) -> ProjectField {
        match self {
            ProjectFieldValue::Name(_) => ProjectField::Name,
            ProjectFieldValue::Description(_) => ProjectField::Description,
            ProjectFieldValue::Status(_) => ProjectField::Status,
            ProjectFieldValue::Priority(_) => ProjectField::Priority,
            ProjectFieldValue::StartDate(_) => ProjectField::StartDate,
            ProjectFieldValue::EndDate(_) => ProjectField::EndDate,
            ProjectFieldValue::Budget(_) => ProjectField::Budget,
        }
    }
}

/// Pending tag text plus the ordered, de-duplicated tag set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagEditor {
    pub input: String,
    pub tags: IndexSet<String>,
}

impl TagEditor {
    pub fn with_tags(tags: IndexSet<String>) -> Self {
        Self {
            input: String::new(),
            tags,
        }
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// Adds the trimmed input and clears it. Blank or duplicate input changes nothing.
    pub fn add(&mut self) -> bool {
        let tag = self.input.trim();
        if tag.is_empty() || self.tags.contains(tag) {
            return false;
        }
        self.tags.insert(tag.to_string());
        self.input.clear();
        true
    }

    /// Removes by exact match, keeping the order of the rest.
    pub fn remove(&mut self, tag: &str) -> bool {
        self.tags.shift_remove(tag)
    }

    /// Enter in the tag input adds a tag; it never submits the form.
    pub fn key(&mut self, key: &str) -> bool {
        key == "Enter" && self.add()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFormValues {
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub priority: ProjectPriority,
    pub start_date: String,
    pub end_date: String,
    pub budget: f64,
}

impl Default for ProjectFormValues {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            status: ProjectStatus::Planning,
            priority: ProjectPriority::Medium,
            start_date: String::new(),
            end_date: String::new(),
            budget: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectForm {
    pub mode: FormMode<Project>,
    pub values: ProjectFormValues,
    pub tags: TagEditor,
    pub errors: FieldErrors<ProjectField>,
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectSubmission {
    Create(NewProject),
    Update(Project, ProjectPatch),
}

impl ProjectForm {
    pub fn set(&mut self, value: ProjectFieldValue) {
        self.errors.clear(value.field());
        let values = &mut self.values;
        match value {
            ProjectFieldValue::Name(name) => values.name = name,
            ProjectFieldValue::Description(description) => values.description = description,
            ProjectFieldValue::Status(status) => values.status = status,
            ProjectFieldValue::Priority(priority) => values.priority = priority,
            ProjectFieldValue::StartDate(date) => values.start_date = date,
            ProjectFieldValue::EndDate(date) => values.end_date = date,
            ProjectFieldValue::Budget(budget) => {
                values.budget = if budget.is_finite() { budget } else { 0.0 }
            }
        }
    }

    pub fn validate(&mut self) -> bool {
        self.checked_dates();
        self.errors.is_empty()
    }

    /// Validates every field; returns both dates when they parsed and are ordered.
    fn checked_dates(&mut self) -> Option<(NaiveDate, NaiveDate)> {
        let mut errors = FieldErrors::new();
        let values = &self.values;

        errors.check(
            ProjectField::Name,
            validate_required("Project name", &values.name),
        );
        errors.check(
            ProjectField::Description,
            validate_required("Description", &values.description),
        );
        let start = errors.check(
            ProjectField::StartDate,
            validate_date("Start date", &values.start_date),
        );
        let end = errors.check(
            ProjectField::EndDate,
            validate_date("End date", &values.end_date),
        );
        let ordered = match (start, end) {
            (Some(start), Some(end)) => errors
                .check(
                    ProjectField::EndDate,
                    validate_date_order("start date", start, "End date", end),
                )
                .map(|()| (start, end)),
            _ => None,
        };
        errors.check(
            ProjectField::Budget,
            validate_positive("Budget", values.budget),
        );

        self.errors = errors;
        ordered
    }

    pub fn submission(&mut self) -> Option<ProjectSubmission> {
        let dates = self.checked_dates();
        let (start_date, end_date) = dates.filter(|_| self.errors.is_empty())?;
        let values = self.values.clone();
        let tags = self.tags.tags.clone();

        Some(match &self.mode {
            FormMode::Create => ProjectSubmission::Create(NewProject {
                name: values.name,
                description: values.description,
                status: values.status,
                priority: values.priority,
                start_date,
                end_date,
                progress: 0,
                team_members: IndexSet::new(),
                budget: values.budget,
                tags,
            }),
            // Progress and team members are not editable here and are kept as they were.
            FormMode::Edit(project) => ProjectSubmission::Update(
                project.clone(),
                ProjectPatch {
                    name: Some(values.name),
                    description: Some(values.description),
                    status: Some(values.status),
                    priority: Some(values.priority),
                    start_date: Some(start_date),
                    end_date: Some(end_date),
                    progress: Some(project.progress),
                    team_members: Some(project.team_members.clone()),
                    budget: Some(values.budget),
                    tags: Some(tags),
                },
            ),
        })
    }
}

#[async_trait]
impl ModalForm for ProjectForm {
    type Entity = Project;
    type Submission = ProjectSubmission;

    fn blank() -> Self {
        Self {
            mode: FormMode::Create,
            values: ProjectFormValues::default(),
            tags: TagEditor::default(),
            errors: FieldErrors::new(),
            pending: false,
        }
    }

    fn for_entity(project: &Project) -> Self {
        Self {
            mode: FormMode::Edit(project.clone()),
            values: ProjectFormValues {
                name: project.name.clone(),
                description: project.description.clone(),
                status: project.status,
                priority: project.priority,
                start_date: project.start_date.format("%Y-%m-%d").to_string(),
                end_date: project.end_date.format("%Y-%m-%d").to_string(),
                budget: project.budget,
            },
            tags: TagEditor::with_tags(project.tags.clone()),
            errors: FieldErrors::new(),
            pending: false,
        }
    }

    fn is_pending(&self) -> bool {
        self.pending
    }

    fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }

    fn prepare(&mut self, _today: NaiveDate) -> Option<ProjectSubmission> {
        self.submission()
    }

    fn error_messages(&self) -> std::collections::BTreeMap<String, String> {
        self.errors.messages()
    }

    async fn save(client: &QueryClient, submission: ProjectSubmission) -> DashboardResult<Project> {
        match submission {
            ProjectSubmission::Create(project) => client.create_project(project).await,
            ProjectSubmission::Update(project, patch) => {
                client.update_project(&project.id, patch).await
            }
        }
    }
}

/// Either entity form, for code that handles both modals uniformly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "entity", rename_all = "lowercase")]
pub enum EntityForm {
    User(UserForm),
    Project(ProjectForm),
}

impl EntityForm {
    pub fn is_pending(&self) -> bool {
        match self {
            EntityForm::User(form) => form.is_pending(),
            EntityForm::Project(form) => form.is_pending(),
        }
    }

    pub fn error_messages(&self) -> std::collections::BTreeMap<String, String> {
        match self {
            EntityForm::User(form) => form.error_messages(),
            EntityForm::Project(form) => form.error_messages(),
        }
    }
}
