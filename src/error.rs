//! Error handling for the dashboard
//!
//! This module provides:
//! - Dashboard error codes with categories and HTTP statuses
//! - The `DashboardError` type shared by the service, query layer and views
//! - Error telemetry counters

use crate::model::ResourceKind;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

// =============================================================================
// ERROR CODES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Form input failed client-side validation
    ValidationError,
    /// Update targeted an id missing from the backing collection
    NotFound,
    /// The data service failed to answer a fetch or mutation
    ServiceFailure,
    /// No route matches the requested path
    RouteNotFound,
    /// Anything else
    InternalError,
}

impl ErrorCode {
    /// Nothing is retried automatically; the user reloads or resubmits.
    pub fn is_retryable(&self) -> bool {
        false
    }

    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::NotFound | ErrorCode::RouteNotFound => "resource_not_found",
            ErrorCode::ServiceFailure => "service_error",
            ErrorCode::InternalError => "server_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::NotFound | ErrorCode::RouteNotFound => StatusCode::NOT_FOUND,
            ErrorCode::ServiceFailure => StatusCode::BAD_GATEWAY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// =============================================================================
// DASHBOARD ERROR
// =============================================================================

/// Errors are cloneable so a single failed fetch can be handed to every
/// reader waiting on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DashboardError {
    #[error("validation failed: {}", summarize(.0))]
    Validation(BTreeMap<String, String>),

    #[error("{kind} record {id} not found")]
    NotFound { kind: ResourceKind, id: String },

    #[error("service call failed: {0}")]
    Service(String),

    #[error("no route matches {0}")]
    Route(String),

    #[error("internal error: {0}")]
    Internal(String),
}

fn summarize(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl DashboardError {
    pub fn not_found(kind: ResourceKind, id: impl fmt::Display) -> Self {
        DashboardError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            DashboardError::Validation(_) => ErrorCode::ValidationError,
            DashboardError::NotFound { .. } => ErrorCode::NotFound,
            DashboardError::Service(_) => ErrorCode::ServiceFailure,
            DashboardError::Route(_) => ErrorCode::RouteNotFound,
            DashboardError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Count this error in [`ERROR_METRICS`] under the given operation.
    pub fn track(&self, operation: &str) {
        ERROR_METRICS.record_error(&self.code(), Some(operation));
    }
}

impl From<anyhow::Error> for DashboardError {
    fn from(error: anyhow::Error) -> Self {
        DashboardError::Internal(format!("{error:#}"))
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: ErrorCode,
    category: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, String>>,
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let code = self.code();
        let fields = match &self {
            DashboardError::Validation(fields) => Some(fields.clone()),
            _ => None,
        };
        let body = ErrorBody {
            code,
            category: code.category(),
            message: self.to_string(),
            fields,
        };
        (code.status_code(), Json(body)).into_response()
    }
}

// =============================================================================
// ERROR TELEMETRY
// =============================================================================

#[derive(Debug)]
pub struct ErrorMetrics {
    error_counts: RwLock<HashMap<ErrorCode, AtomicU64>>,
    operation_errors: RwLock<HashMap<String, AtomicU64>>,
}

impl ErrorMetrics {
    pub fn new() -> Self {
        Self {
            error_counts: RwLock::new(HashMap::new()),
            operation_errors: RwLock::new(HashMap::new()),
        }
    }

    pub fn record_error(&self, code: &ErrorCode, operation: Option<&str>) {
        {
            let map = self.error_counts.read();
            if let Some(counter) = map.get(code) {
                counter.fetch_add(1, Ordering::Relaxed);
            } else {
                drop(map);
                let mut map = self.error_counts.write();
                map.entry(*code)
                    .or_insert_with(|| AtomicU64::new(0))
                    .fetch_add(1, Ordering::Relaxed);
            }
        }

        if let Some(name) = operation {
            let map = self.operation_errors.read();
            if let Some(counter) = map.get(name) {
                counter.fetch_add(1, Ordering::Relaxed);
            } else {
                drop(map);
                let mut map = self.operation_errors.write();
                map.entry(name.to_string())
                    .or_insert_with(|| AtomicU64::new(0))
                    .fetch_add(1, Ordering::Relaxed);
            }
        }

        tracing::debug!(
            error_code = %code,
            operation = operation,
            category = code.category(),
            "error recorded"
        );
    }

    pub fn get_error_count(&self, code: &ErrorCode) -> u64 {
        self.error_counts
            .read()
            .get(code)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn get_operation_error_count(&self, operation: &str) -> u64 {
        self.operation_errors
            .read()
            .get(operation)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

impl Default for ErrorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Global error metrics instance
pub static ERROR_METRICS: once_cell::sync::Lazy<ErrorMetrics> =
    once_cell::sync::Lazy::new(ErrorMetrics::new);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(ErrorCode::ValidationError.category(), "validation_error");
        assert_eq!(ErrorCode::NotFound.category(), "resource_not_found");
        assert_eq!(ErrorCode::RouteNotFound.category(), "resource_not_found");
        assert_eq!(ErrorCode::InternalError.category(), "server_error");
    }

    #[test]
    fn test_nothing_is_retryable() {
        assert!(!ErrorCode::ServiceFailure.is_retryable());
        assert!(!ErrorCode::NotFound.is_retryable());
    }

    #[test]
    fn test_error_metrics() {
        let metrics = ErrorMetrics::new();

        metrics.record_error(&ErrorCode::NotFound, Some("update_user"));
        metrics.record_error(&ErrorCode::NotFound, Some("update_project"));
        metrics.record_error(&ErrorCode::ValidationError, Some("update_user"));

        assert_eq!(metrics.get_error_count(&ErrorCode::NotFound), 2);
        assert_eq!(metrics.get_error_count(&ErrorCode::ServiceFailure), 0);
        assert_eq!(metrics.get_operation_error_count("update_user"), 2);
    }

    #[test]
    fn test_not_found_display() {
        let error = DashboardError::not_found(ResourceKind::Projects, "42");
        assert_eq!(error.to_string(), "projects record 42 not found");
        assert_eq!(error.code().status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_display_lists_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("budget".to_string(), "Budget must be greater than 0".to_string());
        let error = DashboardError::Validation(fields);
        assert!(error.to_string().contains("budget: Budget must be greater than 0"));
    }
}
