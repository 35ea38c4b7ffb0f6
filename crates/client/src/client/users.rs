//! User management client methods (superuser only on the backend)

use super::{ApiClient, ApiRequest};
use crate::error::ClientError;
use portal_core::{CreateUserRequest, UpdateUserRequest, UserProfile};

impl ApiClient {
    /// List all users
    pub async fn list_users(&self) -> Result<Vec<UserProfile>, ClientError> {
        self.execute(&ApiRequest::get("/users/")).await
    }

    /// Create a user
    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<UserProfile, ClientError> {
        let req = ApiRequest::post("/users/").json(request)?;
        self.execute(&req).await
    }

    /// Apply a partial update to a user
    pub async fn update_user(
        &self,
        id: &str,
        request: &UpdateUserRequest,
    ) -> Result<UserProfile, ClientError> {
        let req = ApiRequest::patch(format!("/users/{id}")).json(request)?;
        self.execute(&req).await
    }

    /// Delete a user
    pub async fn delete_user(&self, id: &str) -> Result<(), ClientError> {
        self.execute_empty(&ApiRequest::delete(format!("/users/{id}")))
            .await
    }
}
