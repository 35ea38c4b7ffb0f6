//! Portal core types and utilities

pub mod types;
pub mod validation;

pub use types::{
    CreateUserRequest, LoginRequest, RefreshRequest, RegisterRequest, Session, TokenPair,
    UpdateUserRequest, UserProfile,
};
pub use validation::{Validate, ValidationError};
