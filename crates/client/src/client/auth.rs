//! Authentication API client methods

use super::{ApiClient, ApiRequest};
use crate::error::ClientError;
use portal_core::{LoginRequest, RegisterRequest, TokenPair, UserProfile};

impl ApiClient {
    /// Exchange credentials for a token pair
    pub async fn login(&self, request: &LoginRequest) -> Result<TokenPair, ClientError> {
        let req = ApiRequest::post("/auth/login").json(request)?;
        self.execute(&req).await
    }

    /// Create an account and receive a token pair for it
    pub async fn register(&self, request: &RegisterRequest) -> Result<TokenPair, ClientError> {
        let req = ApiRequest::post("/auth/register").json(request)?;
        self.execute(&req).await
    }

    /// Get the profile of the logged-in user
    pub async fn current_user(&self) -> Result<UserProfile, ClientError> {
        self.execute(&ApiRequest::get("/users/me")).await
    }
}
