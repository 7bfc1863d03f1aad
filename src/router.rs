use crate::error::{DashboardError, DashboardResult};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    Home,
    Users,
    Projects,
    Analytics,
    Settings,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Users => "/users",
            Route::Projects => "/projects",
            Route::Analytics => "/analytics",
            Route::Settings => "/settings",
        }
    }

    /// Navigation label
    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Users => "Users",
            Route::Projects => "Projects",
            Route::Analytics => "Analytics",
            Route::Settings => "Settings",
        }
    }

    /// Exact path match; a single trailing slash is tolerated.
    pub fn resolve(path: &str) -> DashboardResult<Route> {
        let normalized = match path.strip_suffix('/') {
            Some("") | None => path,
            Some(trimmed) => trimmed,
        };
        Route::iter()
            .find(|route| route.path() == normalized)
            .ok_or_else(|| DashboardError::Route(path.to_string()))
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub name: &'static str,
    pub href: &'static str,
    pub active: bool,
}

/// Sidebar entries in display order, marking `current` as active.
pub fn navigation(current: Option<Route>) -> Vec<NavItem> {
    Route::iter()
        .map(|route| NavItem {
            name: route.title(),
            href: route.path(),
            active: Some(route) == current,
        })
        .collect()
}
