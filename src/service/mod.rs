//! In-memory mock of the dashboard's data backend.
//!
//! [`MockDataService`] owns the canonical user and project collections and
//! answers every call after an artificial delay. Creates and updates are
//! written back so later lists reflect them.

pub mod seed;

use crate::error::{DashboardError, DashboardResult};
use crate::model::{
    DashboardStats, NewProject, NewUser, Project, ProjectId, ProjectPatch, ResourceKind, User,
    UserId, UserPatch,
};
use async_trait::async_trait;
use clap::ValueEnum;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::debug;

/// The in-process contract the query layer talks to.
#[async_trait]
pub trait DataService: Send + Sync + 'static {
    async fn list_users(&self) -> DashboardResult<Vec<User>>;
    async fn get_user(&self, id: &UserId) -> DashboardResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> DashboardResult<User>;
    async fn update_user(&self, id: &UserId, patch: UserPatch) -> DashboardResult<User>;

    async fn list_projects(&self) -> DashboardResult<Vec<Project>>;
    async fn get_project(&self, id: &ProjectId) -> DashboardResult<Option<Project>>;
    async fn create_project(&self, project: NewProject) -> DashboardResult<Project>;
    async fn update_project(&self, id: &ProjectId, patch: ProjectPatch)
    -> DashboardResult<Project>;

    async fn dashboard_stats(&self) -> DashboardResult<DashboardStats>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsMode {
    /// Aggregate over the current collections on every call.
    #[default]
    Live,
    /// Always answer with [`DashboardStats::snapshot`].
    Snapshot,
}

impl std::fmt::Display for StatsMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsMode::Live => write!(f, "live"),
            StatsMode::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// Simulated round-trip times of one entity's operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpLatency {
    pub list: Duration,
    pub get: Duration,
    pub create: Duration,
    pub update: Duration,
}

impl OpLatency {
    const fn from_millis(list: u64, get: u64, create: u64, update: u64) -> Self {
        Self {
            list: Duration::from_millis(list),
            get: Duration::from_millis(get),
            create: Duration::from_millis(create),
            update: Duration::from_millis(update),
        }
    }

    fn scaled(self, factor: f64) -> Self {
        let scale = |d: Duration| scale_delay(d, factor);
        Self {
            list: scale(self.list),
            get: scale(self.get),
            create: scale(self.create),
            update: scale(self.update),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyProfile {
    pub users: OpLatency,
    pub projects: OpLatency,
    pub stats: Duration,
}

impl Default for LatencyProfile {
    fn default() -> Self {
        Self {
            users: OpLatency::from_millis(800, 500, 1000, 800),
            projects: OpLatency::from_millis(600, 400, 1200, 900),
            stats: Duration::from_millis(400),
        }
    }
}

impl LatencyProfile {
    pub fn none() -> Self {
        Self::default().scaled(0.0)
    }

    /// Multiplies every delay; negative or non-finite factors disable delays.
    pub fn scaled(self, factor: f64) -> Self {
        let factor = if factor.is_finite() { factor.max(0.0) } else { 0.0 };
        Self {
            users: self.users.scaled(factor),
            projects: self.projects.scaled(factor),
            stats: scale_delay(self.stats, factor),
        }
    }
}

/// Saturates at `Duration::MAX` instead of overflowing.
fn scale_delay(delay: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

async fn simulate_latency(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

pub struct MockDataService {
    users: RwLock<Vec<User>>,
    projects: RwLock<Vec<Project>>,
    latency: LatencyProfile,
    stats_mode: StatsMode,
    last_id: AtomicI64,
}

impl MockDataService {
    /// Seeded with the demo users and projects.
    pub fn new(latency: LatencyProfile, stats_mode: StatsMode) -> Self {
        Self::with_data(seed::users(), seed::projects(), latency, stats_mode)
    }

    pub fn with_data(
        users: Vec<User>,
        projects: Vec<Project>,
        latency: LatencyProfile,
        stats_mode: StatsMode,
    ) -> Self {
        Self {
            users: RwLock::new(users),
            projects: RwLock::new(projects),
            latency,
            stats_mode,
            last_id: AtomicI64::new(0),
        }
    }

    /// Millisecond timestamp, bumped when two ids land in the same millisecond.
    fn next_id(&self) -> String {
        let now = chrono::Utc::now().timestamp_millis();
        let mut last = self.last_id.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self.last_id.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate.to_string(),
                Err(actual) => last = actual,
            }
        }
    }

    pub fn user_count(&self) -> usize {
        self.users.read().len()
    }

    pub fn project_count(&self) -> usize {
        self.projects.read().len()
    }
}

impl Default for MockDataService {
    fn default() -> Self {
        Self::new(LatencyProfile::default(), StatsMode::default())
    }
}

#[async_trait]
impl DataService for MockDataService {
    async fn list_users(&self) -> DashboardResult<Vec<User>> {
        simulate_latency(self.latency.users.list).await;
        let users = self.users.read().clone();
        debug!(count = users.len(), "listed users");
        Ok(users)
    }

    async fn get_user(&self, id: &UserId) -> DashboardResult<Option<User>> {
        simulate_latency(self.latency.users.get).await;
        let user = self.users.read().iter().find(|user| &user.id == id).cloned();
        debug!(user_id = %id, found = user.is_some(), "fetched user");
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> DashboardResult<User> {
        simulate_latency(self.latency.users.create).await;
        let user = user.with_id(UserId::new(self.next_id()));
        self.users.write().push(user.clone());
        debug!(user_id = %user.id, "created user");
        Ok(user)
    }

    async fn update_user(&self, id: &UserId, patch: UserPatch) -> DashboardResult<User> {
        simulate_latency(self.latency.users.update).await;
        // Merge under the write lock so overlapping edits of one id serialize.
        let mut users = self.users.write();
        let user = users
            .iter_mut()
            .find(|user| &user.id == id)
            .ok_or_else(|| DashboardError::not_found(ResourceKind::Users, id))?;
        user.apply(patch);
        debug!(user_id = %id, "updated user");
        Ok(user.clone())
    }

    async fn list_projects(&self) -> DashboardResult<Vec<Project>> {
        simulate_latency(self.latency.projects.list).await;
        let projects = self.projects.read().clone();
        debug!(count = projects.len(), "listed projects");
        Ok(projects)
    }

    async fn get_project(&self, id: &ProjectId) -> DashboardResult<Option<Project>> {
        simulate_latency(self.latency.projects.get).await;
        let project = self
            .projects
            .read()
            .iter()
            .find(|project| &project.id == id)
            .cloned();
        debug!(project_id = %id, found = project.is_some(), "fetched project");
        Ok(project)
    }

    async fn create_project(&self, project: NewProject) -> DashboardResult<Project> {
        simulate_latency(self.latency.projects.create).await;
        let project = project.with_id(ProjectId::new(self.next_id()));
        self.projects.write().push(project.clone());
        debug!(project_id = %project.id, "created project");
        Ok(project)
    }

    async fn update_project(
        &self,
        id: &ProjectId,
        patch: ProjectPatch,
    ) -> DashboardResult<Project> {
        simulate_latency(self.latency.projects.update).await;
        let mut projects = self.projects.write();
        let project = projects
            .iter_mut()
            .find(|project| &project.id == id)
            .ok_or_else(|| DashboardError::not_found(ResourceKind::Projects, id))?;
        project.apply(patch);
        debug!(project_id = %id, "updated project");
        Ok(project.clone())
    }

    async fn dashboard_stats(&self) -> DashboardResult<DashboardStats> {
        simulate_latency(self.latency.stats).await;
        let stats = match self.stats_mode {
            StatsMode::Snapshot => DashboardStats::snapshot(),
            StatsMode::Live => {
                let users = self.users.read();
                let projects = self.projects.read();
                DashboardStats::aggregate(&users, &projects)
            }
        };
        Ok(stats)
    }
}
