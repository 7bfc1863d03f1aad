//! Caching read/write layer over a [`DataService`].
//!
//! Reads are keyed by [`QueryKey`]. A cached value is served while it is
//! younger than its staleness window; otherwise exactly one fetch is started
//! per key and every concurrent reader joins it. Successful mutations
//! invalidate all entries of the mutated kind, detaching any fetch already in
//! flight for them so its (pre-mutation) result is discarded.

use crate::error::{DashboardError, DashboardResult};
use crate::model::{
    DashboardStats, NewProject, NewUser, Project, ProjectId, ProjectPatch, ResourceKind, User,
    UserId, UserPatch,
};
use crate::service::DataService;
use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_LIST_STALE_AFTER: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_STATS_STALE_AFTER: Duration = Duration::from_secs(2 * 60);
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Explicit cache key: resource kind plus the id for single-item lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "resource", content = "id", rename_all = "kebab-case")]
pub enum QueryKey {
    Users,
    User(UserId),
    Projects,
    Project(ProjectId),
    DashboardStats,
}

impl QueryKey {
    pub fn kind(&self) -> ResourceKind {
        match self {
            QueryKey::Users | QueryKey::User(_) => ResourceKind::Users,
            QueryKey::Projects | QueryKey::Project(_) => ResourceKind::Projects,
            QueryKey::DashboardStats => ResourceKind::DashboardStats,
        }
    }

    /// Single-item lookups only run once an id is present.
    pub fn is_enabled(&self) -> bool {
        match self {
            QueryKey::User(id) => !id.is_blank(),
            QueryKey::Project(id) => !id.is_blank(),
            _ => true,
        }
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKey::Users => write!(f, "users"),
            QueryKey::User(id) => write!(f, "user/{id}"),
            QueryKey::Projects => write!(f, "projects"),
            QueryKey::Project(id) => write!(f, "project/{id}"),
            QueryKey::DashboardStats => write!(f, "dashboard-stats"),
        }
    }
}

/// Payload of a cache entry.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Users(Arc<Vec<User>>),
    User(Option<User>),
    Projects(Arc<Vec<Project>>),
    Project(Option<Project>),
    DashboardStats(DashboardStats),
}

/// Typed view of a [`QueryData`] variant.
pub trait QueryOutput: Sized + Clone {
    fn from_data(data: QueryData) -> Option<Self>;
}

impl QueryOutput for Arc<Vec<User>> {
    fn from_data(data: QueryData) -> Option<Self> {
        match data {
            QueryData::Users(users) => Some(users),
            _ => None,
        }
    }
}

impl QueryOutput for Option<User> {
    fn from_data(data: QueryData) -> Option<Self> {
        match data {
            QueryData::User(user) => Some(user),
            _ => None,
        }
    }
}

impl QueryOutput for Arc<Vec<Project>> {
    fn from_data(data: QueryData) -> Option<Self> {
        match data {
            QueryData::Projects(projects) => Some(projects),
            _ => None,
        }
    }
}

impl QueryOutput for Option<Project> {
    fn from_data(data: QueryData) -> Option<Self> {
        match data {
            QueryData::Project(project) => Some(project),
            _ => None,
        }
    }
}

impl QueryOutput for DashboardStats {
    fn from_data(data: QueryData) -> Option<Self> {
        match data {
            QueryData::DashboardStats(stats) => Some(stats),
            _ => None,
        }
    }
}

impl QueryOutput for QueryData {
    fn from_data(data: QueryData) -> Option<Self> {
        Some(data)
    }
}

/// What a non-blocking read observes.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryStatus<T> {
    /// The key is not runnable yet (blank id).
    Disabled,
    /// A fetch is running; `previous` is the last value if one was cached.
    Loading { previous: Option<T> },
    Ready(T),
    /// The last fetch failed. Nothing retries until the key is invalidated or refetched.
    Failed(DashboardError),
}

impl<T> QueryStatus<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryStatus::Loading { .. })
    }

    pub fn ready(self) -> Option<T> {
        match self {
            QueryStatus::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// The freshest value available, including a stale one shown while loading.
    pub fn latest(&self) -> Option<&T> {
        match self {
            QueryStatus::Ready(value) => Some(value),
            QueryStatus::Loading { previous } => previous.as_ref(),
            _ => None,
        }
    }

    fn try_map<U>(self, f: impl Fn(T) -> Option<U>, key: &QueryKey) -> QueryStatus<U> {
        let mismatch = || DashboardError::Internal(format!("unexpected payload for {key}"));
        match self {
            QueryStatus::Disabled => QueryStatus::Disabled,
            QueryStatus::Loading { previous } => QueryStatus::Loading {
                previous: previous.and_then(&f),
            },
            QueryStatus::Ready(value) => match f(value) {
                Some(value) => QueryStatus::Ready(value),
                None => QueryStatus::Failed(mismatch()),
            },
            QueryStatus::Failed(error) => QueryStatus::Failed(error),
        }
    }
}

/// Freshness window per kind of query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    pub lists: Duration,
    pub stats: Duration,
    /// Zero: single items are refetched on every read.
    pub items: Duration,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            lists: DEFAULT_LIST_STALE_AFTER,
            stats: DEFAULT_STATS_STALE_AFTER,
            items: Duration::ZERO,
        }
    }
}

impl StalenessPolicy {
    pub fn window(&self, key: &QueryKey) -> Duration {
        match key {
            QueryKey::Users | QueryKey::Projects => self.lists,
            QueryKey::DashboardStats => self.stats,
            QueryKey::User(_) | QueryKey::Project(_) => self.items,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    pub staleness: StalenessPolicy,
    pub capacity: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            staleness: StalenessPolicy::default(),
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

type SharedFetch = Shared<BoxFuture<'static, DashboardResult<QueryData>>>;

struct InFlight {
    ticket: u64,
    future: SharedFetch,
}

#[derive(Default)]
struct CacheSlot {
    value: Option<(QueryData, Instant)>,
    invalidated: bool,
    last_error: Option<DashboardError>,
}

impl CacheSlot {
    fn fresh(&self, window: Duration, now: Instant) -> Option<&QueryData> {
        let (data, fetched_at) = self.value.as_ref()?;
        if self.invalidated || now.saturating_duration_since(*fetched_at) >= window {
            None
        } else {
            Some(data)
        }
    }
}

struct CacheState {
    slots: LruCache<QueryKey, CacheSlot>,
    in_flight: std::collections::HashMap<QueryKey, InFlight>,
}

struct ClientInner {
    service: Arc<dyn DataService>,
    staleness: StalenessPolicy,
    state: Mutex<CacheState>,
    next_ticket: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    discarded: AtomicU64,
    pending_mutations: AtomicUsize,
    changes: watch::Sender<u64>,
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Service calls started by the cache
    pub fetches: u64,
    /// Results of detached fetches that were dropped
    pub discarded: u64,
    pub in_flight: usize,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cloneable handle to one application's query cache.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<ClientInner>,
}

impl QueryClient {
    pub fn new(service: Arc<dyn DataService>, options: QueryOptions) -> Self {
        let capacity = NonZeroUsize::new(options.capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(ClientInner {
                service,
                staleness: options.staleness,
                state: Mutex::new(CacheState {
                    slots: LruCache::new(capacity),
                    in_flight: std::collections::HashMap::new(),
                }),
                next_ticket: AtomicU64::new(1),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                fetches: AtomicU64::new(0),
                discarded: AtomicU64::new(0),
                pending_mutations: AtomicUsize::new(0),
                changes,
            }),
        }
    }

    pub fn service(&self) -> &Arc<dyn DataService> {
        &self.inner.service
    }

    pub fn staleness(&self) -> StalenessPolicy {
        self.inner.staleness
    }

    /// Ticks on every cache write or invalidation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Non-blocking read. Starts a background fetch when the entry is missing
    /// or stale; must be called from within a Tokio runtime.
    pub fn read(&self, key: &QueryKey) -> QueryStatus<QueryData> {
        if !key.is_enabled() {
            return QueryStatus::Disabled;
        }
        let window = self.inner.staleness.window(key);
        let mut state = self.inner.state.lock();
        let now = Instant::now();

        if let Some(slot) = state.slots.get(key) {
            if let Some(data) = slot.fresh(window, now) {
                let data = data.clone();
                self.inner.record_hit(key);
                return QueryStatus::Ready(data);
            }
            if let Some(error) = slot.last_error.clone() {
                return QueryStatus::Failed(error);
            }
        }

        let previous = state
            .slots
            .peek(key)
            .and_then(|slot| slot.value.as_ref().map(|(data, _)| data.clone()));
        if !state.in_flight.contains_key(key) {
            self.inner.record_miss(key);
            self.start_fetch(&mut state, key.clone());
        }
        QueryStatus::Loading { previous }
    }

    /// Resolves with fresh data, joining a fetch already in flight for `key`.
    /// Unlike [`read`](Self::read) this also retries a key whose last fetch failed.
    pub async fn fetch(&self, key: &QueryKey) -> DashboardResult<QueryData> {
        if !key.is_enabled() {
            return Ok(empty_item(key));
        }
        let window = self.inner.staleness.window(key);
        let pending = {
            let mut state = self.inner.state.lock();
            let fresh = state
                .slots
                .get(key)
                .and_then(|slot| slot.fresh(window, Instant::now()).cloned());
            if let Some(data) = fresh {
                self.inner.record_hit(key);
                return Ok(data);
            }
            match state.in_flight.get(key) {
                Some(in_flight) => in_flight.future.clone(),
                None => {
                    self.inner.record_miss(key);
                    self.start_fetch(&mut state, key.clone())
                }
            }
        };
        pending.await
    }

    /// Cached value regardless of staleness.
    pub fn cached(&self, key: &QueryKey) -> Option<QueryData> {
        self.inner
            .state
            .lock()
            .slots
            .peek(key)
            .and_then(|slot| slot.value.as_ref().map(|(data, _)| data.clone()))
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.inner.state.lock().in_flight.contains_key(key)
    }

    fn start_fetch(&self, state: &mut CacheState, key: QueryKey) -> SharedFetch {
        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
        self.inner.fetches.fetch_add(1, Ordering::Relaxed);
        crate::metrics::METRICS.record_fetch(key.kind());
        debug!(key = %key, ticket, "starting fetch");

        let inner = Arc::clone(&self.inner);
        let fetch_key = key.clone();
        let future = async move {
            let result = inner.load(&fetch_key).await;
            inner.complete(&fetch_key, ticket, &result);
            result
        }
        .boxed()
        .shared();

        state.in_flight.insert(
            key,
            InFlight {
                ticket,
                future: future.clone(),
            },
        );
        // Fetches are not cancellable: they complete even if every caller goes away.
        tokio::spawn(future.clone());
        future
    }

    /// Marks every entry of `kind` stale, clears its recorded failure and
    /// detaches any fetch in flight for it.
    pub fn invalidate(&self, kind: ResourceKind) {
        let mut invalidated = 0usize;
        {
            let mut state = self.inner.state.lock();
            for (key, slot) in state.slots.iter_mut() {
                if key.kind() == kind {
                    slot.invalidated = true;
                    slot.last_error = None;
                    invalidated += 1;
                }
            }
            state.in_flight.retain(|key, _| key.kind() != kind);
        }
        debug!(kind = %kind, entries = invalidated, "invalidated queries");
        self.inner.notify();
    }

    pub fn invalidate_all(&self) {
        {
            let mut state = self.inner.state.lock();
            for (_, slot) in state.slots.iter_mut() {
                slot.invalidated = true;
                slot.last_error = None;
            }
            state.in_flight.clear();
        }
        self.inner.notify();
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            fetches: self.inner.fetches.load(Ordering::Relaxed),
            discarded: self.inner.discarded.load(Ordering::Relaxed),
            in_flight: state.in_flight.len(),
            size: state.slots.len(),
            capacity: state.slots.cap().get(),
        }
    }

    pub fn pending_mutations(&self) -> usize {
        self.inner.pending_mutations.load(Ordering::Relaxed)
    }

    // ----- typed reads ------------------------------------------------------

    pub fn read_as<T: QueryOutput>(&self, key: &QueryKey) -> QueryStatus<T> {
        self.read(key).try_map(T::from_data, key)
    }

    pub async fn fetch_as<T: QueryOutput>(&self, key: &QueryKey) -> DashboardResult<T> {
        let data = self.fetch(key).await?;
        T::from_data(data)
            .ok_or_else(|| DashboardError::Internal(format!("unexpected payload for {key}")))
    }

    pub async fn users(&self) -> DashboardResult<Arc<Vec<User>>> {
        self.fetch_as(&QueryKey::Users).await
    }

    pub async fn user(&self, id: &UserId) -> DashboardResult<Option<User>> {
        self.fetch_as(&QueryKey::User(id.clone())).await
    }

    pub async fn projects(&self) -> DashboardResult<Arc<Vec<Project>>> {
        self.fetch_as(&QueryKey::Projects).await
    }

    pub async fn project(&self, id: &ProjectId) -> DashboardResult<Option<Project>> {
        self.fetch_as(&QueryKey::Project(id.clone())).await
    }

    pub async fn dashboard_stats(&self) -> DashboardResult<DashboardStats> {
        self.fetch_as(&QueryKey::DashboardStats).await
    }

    // ----- mutations --------------------------------------------------------

    pub async fn create_user(&self, user: NewUser) -> DashboardResult<User> {
        let service = Arc::clone(&self.inner.service);
        self.mutate(ResourceKind::Users, "create_user", async move {
            service.create_user(user).await
        })
        .await
    }

    pub async fn update_user(&self, id: &UserId, patch: UserPatch) -> DashboardResult<User> {
        let service = Arc::clone(&self.inner.service);
        let id = id.clone();
        self.mutate(ResourceKind::Users, "update_user", async move {
            service.update_user(&id, patch).await
        })
        .await
    }

    pub async fn create_project(&self, project: NewProject) -> DashboardResult<Project> {
        let service = Arc::clone(&self.inner.service);
        self.mutate(ResourceKind::Projects, "create_project", async move {
            service.create_project(project).await
        })
        .await
    }

    pub async fn update_project(
        &self,
        id: &ProjectId,
        patch: ProjectPatch,
    ) -> DashboardResult<Project> {
        let service = Arc::clone(&self.inner.service);
        let id = id.clone();
        self.mutate(ResourceKind::Projects, "update_project", async move {
            service.update_project(&id, patch).await
        })
        .await
    }

    /// Runs a service write; on success invalidates `kind` and the derived
    /// stats, on failure leaves the cache untouched.
    async fn mutate<T>(
        &self,
        kind: ResourceKind,
        operation: &'static str,
        call: impl Future<Output = DashboardResult<T>>,
    ) -> DashboardResult<T> {
        let result = {
            let _pending = MutationGuard::enter(&self.inner.pending_mutations);
            call.await
        };
        crate::metrics::METRICS.record_mutation(operation, result.is_ok());

        match result {
            Ok(value) => {
                info!(operation, kind = %kind, "mutation succeeded");
                self.invalidate(kind);
                self.invalidate(ResourceKind::DashboardStats);
                Ok(value)
            }
            Err(error) => {
                warn!(operation, kind = %kind, error = %error, "mutation failed");
                error.track(operation);
                Err(error)
            }
        }
    }
}

/// Counts one in-flight mutation for as long as it lives.
struct MutationGuard<'a>(&'a AtomicUsize);

impl<'a> MutationGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

fn empty_item(key: &QueryKey) -> QueryData {
    match key {
        QueryKey::Project(_) => QueryData::Project(None),
        _ => QueryData::User(None),
    }
}

impl ClientInner {
    async fn load(&self, key: &QueryKey) -> DashboardResult<QueryData> {
        let service = &self.service;
        match key {
            QueryKey::Users => service
                .list_users()
                .await
                .map(|users| QueryData::Users(Arc::new(users))),
            QueryKey::User(id) => service.get_user(id).await.map(QueryData::User),
            QueryKey::Projects => service
                .list_projects()
                .await
                .map(|projects| QueryData::Projects(Arc::new(projects))),
            QueryKey::Project(id) => service.get_project(id).await.map(QueryData::Project),
            QueryKey::DashboardStats => {
                service.dashboard_stats().await.map(QueryData::DashboardStats)
            }
        }
    }

    /// Applies a finished fetch unless it was detached by an invalidation.
    fn complete(&self, key: &QueryKey, ticket: u64, result: &DashboardResult<QueryData>) {
        {
            let mut state = self.state.lock();
            let tracked = state
                .in_flight
                .get(key)
                .is_some_and(|in_flight| in_flight.ticket == ticket);
            if !tracked {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, ticket, "discarding result of detached fetch");
                return;
            }
            state.in_flight.remove(key);

            match result {
                Ok(data) => {
                    state.slots.put(
                        key.clone(),
                        CacheSlot {
                            value: Some((data.clone(), Instant::now())),
                            invalidated: false,
                            last_error: None,
                        },
                    );
                    crate::metrics::METRICS.update_cache_entries(state.slots.len());
                    debug!(key = %key, ticket, "fetch stored");
                }
                Err(error) => {
                    warn!(key = %key, ticket, error = %error, "fetch failed");
                    error.track("fetch");
                    if let Some(slot) = state.slots.get_mut(key) {
                        slot.last_error = Some(error.clone());
                    } else {
                        state.slots.put(
                            key.clone(),
                            CacheSlot {
                                last_error: Some(error.clone()),
                                ..CacheSlot::default()
                            },
                        );
                    }
                }
            }
        }
        self.notify();
    }

    fn record_hit(&self, key: &QueryKey) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        crate::metrics::METRICS.record_cache_hit();
        debug!(key = %key, "cache hit");
    }

    fn record_miss(&self, key: &QueryKey) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        crate::metrics::METRICS.record_cache_miss();
        debug!(key = %key, "cache miss");
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_resource_kinds() {
        assert_eq!(QueryKey::User(UserId::from("1")).kind(), ResourceKind::Users);
        assert_eq!(QueryKey::Projects.kind(), ResourceKind::Projects);
        assert_eq!(QueryKey::DashboardStats.kind(), ResourceKind::DashboardStats);
    }

    #[test]
    fn blank_ids_disable_item_queries() {
        assert!(!QueryKey::User(UserId::from("")).is_enabled());
        assert!(!QueryKey::Project(ProjectId::from("  ")).is_enabled());
        assert!(QueryKey::Project(ProjectId::from("3")).is_enabled());
        assert!(QueryKey::Users.is_enabled());
    }

    #[test]
    fn default_windows() {
        let policy = StalenessPolicy::default();
        assert_eq!(policy.window(&QueryKey::Users), Duration::from_secs(300));
        assert_eq!(policy.window(&QueryKey::DashboardStats), Duration::from_secs(120));
        assert_eq!(policy.window(&QueryKey::User(UserId::from("1"))), Duration::ZERO);
    }

    #[test]
    fn zero_window_is_never_fresh() {
        let now = Instant::now();
        let slot = CacheSlot {
            value: Some((QueryData::User(None), now)),
            ..CacheSlot::default()
        };
        assert!(slot.fresh(Duration::ZERO, now).is_none());
        assert!(slot.fresh(Duration::from_secs(1), now).is_some());
    }

    #[test]
    fn invalidated_slot_is_not_fresh() {
        let now = Instant::now();
        let slot = CacheSlot {
            value: Some((QueryData::User(None), now)),
            invalidated: true,
            last_error: None,
        };
        assert!(slot.fresh(Duration::from_secs(60), now).is_none());
    }

    #[test]
    fn key_display() {
        assert_eq!(QueryKey::Project(ProjectId::from("9")).to_string(), "project/9");
        assert_eq!(QueryKey::DashboardStats.to_string(), "dashboard-stats");
    }
}
