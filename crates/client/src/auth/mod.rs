//! Authentication module

pub mod context;
pub mod guard;

// Re-export commonly used items
pub use context::{AuthContext, AuthStatus};
pub use guard::{GuardDecision, Route, SessionGuard};
