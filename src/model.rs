use chrono::NaiveDate;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Blank ids disable single-item queries.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

entity_id!(
    /// Identifier of a [`User`].
    UserId
);
entity_id!(
    /// Identifier of a [`Project`].
    ProjectId
);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum UserRole {
    Admin,
    Manager,
    Developer,
    Designer,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum UserStatus {
    Active,
    Inactive,
    Pending,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ProjectStatus {
    Planning,
    InProgress,
    Review,
    Completed,
    OnHold,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ProjectPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub role: UserRole,
    pub department: String,
    pub join_date: NaiveDate,
    pub status: UserStatus,
    pub projects_count: u32,
}

/// A user as submitted for creation; the service assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub role: UserRole,
    pub department: String,
    pub join_date: NaiveDate,
    pub status: UserStatus,
    pub projects_count: u32,
}

impl NewUser {
    pub fn with_id(self, id: UserId) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            avatar: self.avatar,
            role: self.role,
            department: self.department,
            join_date: self.join_date,
            status: self.status,
            projects_count: self.projects_count,
        }
    }
}

/// Partial update of a [`User`]. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects_count: Option<u32>,
}

impl User {
    /// Overwrites exactly the fields present in `patch`.
    pub fn apply(&mut self, patch: UserPatch) {
        let UserPatch {
            name,
            email,
            avatar,
            role,
            department,
            join_date,
            status,
            projects_count,
        } = patch;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(email) = email {
            self.email = email;
        }
        if avatar.is_some() {
            self.avatar = avatar;
        }
        if let Some(role) = role {
            self.role = role;
        }
        if let Some(department) = department {
            self.department = department;
        }
        if let Some(join_date) = join_date {
            self.join_date = join_date;
        }
        if let Some(status) = status {
            self.status = status;
        }
        if let Some(projects_count) = projects_count {
            self.projects_count = projects_count;
        }
    }

    pub fn merged(&self, patch: UserPatch) -> Self {
        let mut merged = self.clone();
        merged.apply(patch);
        merged
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub priority: ProjectPriority,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub progress: u8,
    pub team_members: IndexSet<UserId>,
    pub budget: f64,
    pub tags: IndexSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub priority: ProjectPriority,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub progress: u8,
    #[serde(default)]
    pub team_members: IndexSet<UserId>,
    pub budget: f64,
    #[serde(default)]
    pub tags: IndexSet<String>,
}

impl NewProject {
    pub fn with_id(self, id: ProjectId) -> Project {
        Project {
            id,
            name: self.name,
            description: self.description,
            status: self.status,
            priority: self.priority,
            start_date: self.start_date,
            end_date: self.end_date,
            progress: self.progress.min(100),
            team_members: self.team_members,
            budget: self.budget,
            tags: self.tags,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<ProjectPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_members: Option<IndexSet<UserId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<IndexSet<String>>,
}

impl ProjectPatch {
    pub fn status(status: ProjectStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

impl Project {
    /// Overwrites exactly the fields present in `patch`.
    pub fn apply(&mut self, patch: ProjectPatch) {
        let ProjectPatch {
            name,
            description,
            status,
            priority,
            start_date,
            end_date,
            progress,
            team_members,
            budget,
            tags,
        } = patch;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(status) = status {
            self.status = status;
        }
        if let Some(priority) = priority {
            self.priority = priority;
        }
        if let Some(start_date) = start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = end_date {
            self.end_date = end_date;
        }
        if let Some(progress) = progress {
            self.progress = progress.min(100);
        }
        if let Some(team_members) = team_members {
            self.team_members = team_members;
        }
        if let Some(budget) = budget {
            self.budget = budget;
        }
        if let Some(tags) = tags {
            self.tags = tags;
        }
    }

    pub fn merged(&self, patch: ProjectPatch) -> Self {
        let mut merged = self.clone();
        merged.apply(patch);
        merged
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u32,
    pub active_users: u32,
    pub total_projects: u32,
    pub completed_projects: u32,
    pub in_progress_projects: u32,
    pub total_revenue: f64,
}

impl DashboardStats {
    /// The fixed figures shown by the demo dashboard.
    pub fn snapshot() -> Self {
        Self {
            total_users: 24,
            active_users: 18,
            total_projects: 12,
            completed_projects: 8,
            in_progress_projects: 4,
            total_revenue: 1_250_000.0,
        }
    }

    /// Aggregates over the given collections. Revenue is the summed project budget.
    pub fn aggregate(users: &[User], projects: &[Project]) -> Self {
        let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
        Self {
            total_users: count(users.len()),
            active_users: count(
                users
                    .iter()
                    .filter(|user| user.status == UserStatus::Active)
                    .count(),
            ),
            total_projects: count(projects.len()),
            completed_projects: count(
                projects
                    .iter()
                    .filter(|project| project.status == ProjectStatus::Completed)
                    .count(),
            ),
            in_progress_projects: count(
                projects
                    .iter()
                    .filter(|project| project.status == ProjectStatus::InProgress)
                    .count(),
            ),
            total_revenue: projects.iter().map(|project| project.budget).sum(),
        }
    }
}

/// The entity type a query or mutation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ResourceKind {
    Users,
    Projects,
    DashboardStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::from_str(value).unwrap()
    }

    fn sample_user() -> User {
        User {
            id: UserId::new("7"),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            avatar: None,
            role: UserRole::Developer,
            department: "Engineering".to_string(),
            join_date: date("2024-02-01"),
            status: UserStatus::Pending,
            projects_count: 2,
        }
    }

    #[test]
    fn user_patch_overwrites_only_present_fields() {
        let user = sample_user();
        let patch = UserPatch {
            status: Some(UserStatus::Active),
            department: Some("Design".to_string()),
            ..UserPatch::default()
        };

        let merged = user.merged(patch);

        assert_eq!(merged.status, UserStatus::Active);
        assert_eq!(merged.department, "Design");
        assert_eq!(merged.name, user.name);
        assert_eq!(merged.email, user.email);
        assert_eq!(merged.projects_count, user.projects_count);
    }

    #[test]
    fn empty_patch_is_identity() {
        let user = sample_user();
        assert_eq!(user.merged(UserPatch::default()), user);
    }

    #[test]
    fn enums_use_kebab_case_on_the_wire() {
        assert_eq!(ProjectStatus::InProgress.to_string(), "in-progress");
        assert_eq!(
            ProjectStatus::from_str("on-hold").unwrap(),
            ProjectStatus::OnHold
        );
        assert_eq!(
            serde_json::to_value(ProjectPriority::Urgent).unwrap(),
            serde_json::json!("urgent")
        );
    }

    #[test]
    fn user_serializes_camel_case_fields() {
        let value = serde_json::to_value(sample_user()).unwrap();
        assert_eq!(value["joinDate"], "2024-02-01");
        assert_eq!(value["projectsCount"], 2);
        assert!(value.get("avatar").is_none());
    }

    #[test]
    fn project_patch_clamps_progress() {
        let mut project = NewProject {
            name: "Site".to_string(),
            description: "Rebuild".to_string(),
            status: ProjectStatus::Planning,
            priority: ProjectPriority::Low,
            start_date: date("2024-01-01"),
            end_date: date("2024-02-01"),
            progress: 0,
            team_members: IndexSet::new(),
            budget: 10.0,
            tags: IndexSet::new(),
        }
        .with_id(ProjectId::new("p"));

        project.apply(ProjectPatch {
            progress: Some(150),
            ..ProjectPatch::default()
        });
        assert_eq!(project.progress, 100);
    }

    #[test]
    fn aggregate_counts_statuses_and_sums_budgets() {
        let users = vec![sample_user(), {
            let mut active = sample_user();
            active.status = UserStatus::Active;
            active
        }];
        let base = NewProject {
            name: "A".to_string(),
            description: "a".to_string(),
            status: ProjectStatus::Completed,
            priority: ProjectPriority::High,
            start_date: date("2024-01-01"),
            end_date: date("2024-03-01"),
            progress: 100,
            team_members: IndexSet::new(),
            budget: 100.0,
            tags: IndexSet::new(),
        };
        let mut running = base.clone();
        running.status = ProjectStatus::InProgress;
        running.budget = 50.0;
        let projects = vec![
            base.with_id(ProjectId::new("1")),
            running.with_id(ProjectId::new("2")),
        ];

        let stats = DashboardStats::aggregate(&users, &projects);

        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.active_users, 1);
        assert_eq!(stats.total_projects, 2);
        assert_eq!(stats.completed_projects, 1);
        assert_eq!(stats.in_progress_projects, 1);
        assert_eq!(stats.total_revenue, 150.0);
    }
}
