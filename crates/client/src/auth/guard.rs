//! Route guard for protected areas

use super::context::{AuthContext, AuthStatus};

/// Login entry point
pub const LOGIN_PATH: &str = "/login";
/// Registration page
pub const REGISTER_PATH: &str = "/register";
/// Default landing page after login
pub const DASHBOARD_PATH: &str = "/dashboard";
/// User management, superusers only
pub const USERS_PATH: &str = "/users";

/// A navigable area and what it takes to see it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub requires_auth: bool,
    pub requires_superuser: bool,
}

impl Route {
    pub const LOGIN: Self = Self::public(LOGIN_PATH);
    pub const REGISTER: Self = Self::public(REGISTER_PATH);
    pub const DASHBOARD: Self = Self::protected(DASHBOARD_PATH);
    pub const USERS: Self = Self::admin(USERS_PATH);

    pub const fn public(path: &'static str) -> Self {
        Self {
            path,
            requires_auth: false,
            requires_superuser: false,
        }
    }

    pub const fn protected(path: &'static str) -> Self {
        Self {
            path,
            requires_auth: true,
            requires_superuser: false,
        }
    }

    pub const fn admin(path: &'static str) -> Self {
        Self {
            path,
            requires_auth: true,
            requires_superuser: true,
        }
    }
}

/// What to do with a navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still resolving; show a neutral loading state
    Loading,
    /// Go somewhere else instead
    Redirect(&'static str),
    /// Show the route's content
    Render,
}

/// Evaluates routes against the current session
#[derive(Clone)]
pub struct SessionGuard {
    auth: AuthContext,
}

impl SessionGuard {
    pub fn new(auth: AuthContext) -> Self {
        Self { auth }
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    /// Decide what a navigation to `route` shows right now
    pub fn check(&self, route: &Route) -> GuardDecision {
        let is_superuser = self.auth.store().session().is_superuser();
        decide(self.auth.status(), is_superuser, route)
    }
}

/// Access policy, independent of where the status comes from
pub fn decide(status: AuthStatus, is_superuser: bool, route: &Route) -> GuardDecision {
    if !route.requires_auth {
        return GuardDecision::Render;
    }
    match status {
        AuthStatus::Initializing => GuardDecision::Loading,
        AuthStatus::Unauthenticated => GuardDecision::Redirect(LOGIN_PATH),
        AuthStatus::Authenticated if route.requires_superuser && !is_superuser => {
            GuardDecision::Redirect(DASHBOARD_PATH)
        }
        AuthStatus::Authenticated => GuardDecision::Render,
    }
}
