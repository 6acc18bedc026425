//! User management endpoints

use async_trait::async_trait;
use chatline_core::{ProfileGateway, ProfileUpdate};
use chatline_domain::{endpoints, ApiEnvelope, AvatarUpload, ChatlineError, UserQuery};
use serde_json::{json, Value};
use tracing::instrument;

use super::client::ApiClient;
use super::errors::ApiError;
use crate::http::{MultipartForm, ResponseBody};

/// Multipart field carrying the avatar image.
const AVATAR_FIELD: &str = "avatar";

/// Accepted in place of `success` by the update endpoint.
const USER_UPDATED_MESSAGE: &str = "User updated successfully";

/// Client for `/api/users/*`. Every call is authenticated.
#[derive(Debug, Clone)]
pub struct UserApi {
    client: ApiClient,
}

fn envelope(body: ResponseBody) -> Result<ApiEnvelope, ApiError> {
    body.into_envelope()
}

impl UserApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// `POST /api/users`
    pub async fn create_user(&self, user: &Value) -> Result<ApiEnvelope, ApiError> {
        envelope(self.client.post_json(endpoints::users::BASE, user).await?)
    }

    /// `GET /api/users`: the authenticated user.
    #[instrument(skip(self))]
    pub async fn get_current_user(&self) -> Result<ApiEnvelope, ApiError> {
        envelope(self.client.get(endpoints::users::BASE).await?)
    }

    /// `GET /api/users/all`, with `query` as the query string.
    #[instrument(skip(self))]
    pub async fn get_all_users(&self, query: &UserQuery) -> Result<ApiEnvelope, ApiError> {
        let endpoint = if query.is_empty() {
            endpoints::users::ALL.to_string()
        } else {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query.params.iter())
                .finish();
            format!("{}?{encoded}", endpoints::users::ALL)
        };
        envelope(self.client.get(&endpoint).await?)
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_id(&self, user_id: &str) -> Result<ApiEnvelope, ApiError> {
        envelope(self.client.get(&endpoints::users::by_id(user_id)).await?)
    }

    /// `PUT /api/users/{id}`
    #[instrument(skip(self, changes))]
    pub async fn update_user(&self, user_id: &str, changes: &Value) -> Result<ApiEnvelope, ApiError> {
        envelope(self.client.put_json(&endpoints::users::by_id(user_id), changes).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: &str) -> Result<ApiEnvelope, ApiError> {
        envelope(self.client.delete(&endpoints::users::by_id(user_id)).await?)
    }

    /// Uploads the image as the multipart field `avatar`.
    #[instrument(skip(self, avatar), fields(file_name = %avatar.file_name, size = avatar.bytes.len()))]
    pub async fn update_avatar(
        &self,
        user_id: &str,
        avatar: AvatarUpload,
    ) -> Result<ApiEnvelope, ApiError> {
        let form = MultipartForm::new().file(
            AVATAR_FIELD,
            avatar.file_name,
            avatar.mime_type,
            avatar.bytes,
        );
        envelope(self.client.post(&endpoints::users::avatar(user_id), form).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_avatar(&self, user_id: &str) -> Result<ApiEnvelope, ApiError> {
        envelope(self.client.delete(&endpoints::users::avatar(user_id)).await?)
    }

    #[instrument(skip(self))]
    pub async fn get_login_history(&self, user_id: &str) -> Result<ApiEnvelope, ApiError> {
        envelope(self.client.get(&endpoints::users::login_history(user_id)).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_login_history_entry(
        &self,
        user_id: &str,
        entry_id: &str,
    ) -> Result<ApiEnvelope, ApiError> {
        let endpoint = endpoints::users::login_history_entry(user_id, entry_id);
        envelope(self.client.delete(&endpoint).await?)
    }

    /// `PATCH /api/users/status/{id}` with `{ "status": ... }`.
    #[instrument(skip(self))]
    pub async fn update_user_status(&self, user_id: &str, status: &str) -> Result<ApiEnvelope, ApiError> {
        let body = json!({ "status": status });
        envelope(self.client.patch_json(&endpoints::users::status(user_id), &body).await?)
    }

    /// `PATCH /api/users/{id}/settings` with `{ "settings": ... }`.
    #[instrument(skip(self, settings))]
    pub async fn update_user_settings(
        &self,
        user_id: &str,
        settings: &Value,
    ) -> Result<ApiEnvelope, ApiError> {
        let body = json!({ "settings": settings });
        envelope(self.client.patch_json(&endpoints::users::settings(user_id), &body).await?)
    }
}

fn rejected(envelope: &ApiEnvelope, fallback: &str) -> ChatlineError {
    ChatlineError::Validation(envelope.message_or(fallback))
}

#[async_trait]
impl ProfileGateway for UserApi {
    async fn update_user(&self, user_id: &str, changes: &Value) -> chatline_domain::Result<ProfileUpdate> {
        let response = Self::update_user(self, user_id, changes).await?;
        if !response.success && response.message.as_deref() != Some(USER_UPDATED_MESSAGE) {
            return Err(rejected(&response, "Failed to update user"));
        }
        let changes = response
            .field("userData")
            .or_else(|| response.field("user"))
            .cloned()
            .unwrap_or(Value::Null);
        Ok(ProfileUpdate { message: response.message, changes })
    }

    async fn update_settings(
        &self,
        user_id: &str,
        settings: &Value,
    ) -> chatline_domain::Result<ProfileUpdate> {
        let response = self.update_user_settings(user_id, settings).await?;
        if !response.success {
            return Err(rejected(&response, "Failed to update settings"));
        }
        let settings = response.field("settings").cloned().unwrap_or_else(|| settings.clone());
        Ok(ProfileUpdate { message: response.message, changes: json!({ "settings": settings }) })
    }

    async fn update_avatar(
        &self,
        user_id: &str,
        avatar: AvatarUpload,
    ) -> chatline_domain::Result<ProfileUpdate> {
        let response = Self::update_avatar(self, user_id, avatar).await?;
        if !response.success {
            return Err(rejected(&response, "Failed to update avatar"));
        }
        let avatar_url = response.field("avatarUrl").cloned().unwrap_or(Value::Null);
        Ok(ProfileUpdate { message: response.message, changes: json!({ "avatarUrl": avatar_url }) })
    }

    async fn delete_avatar(&self, user_id: &str) -> chatline_domain::Result<ProfileUpdate> {
        let response = Self::delete_avatar(self, user_id).await?;
        if !response.success {
            return Err(rejected(&response, "Failed to delete avatar"));
        }
        Ok(ProfileUpdate { message: response.message, changes: json!({ "avatarUrl": null }) })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chatline_common::auth::TokenStore;
    use chatline_common::testing::MemoryStore;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;

    fn user_api(server: &MockServer) -> UserApi {
        let tokens = Arc::new(TokenStore::new(Arc::new(MemoryStore::new())));
        tokens.store_session("access-1", None);
        let client = ApiClient::builder().base_url(server.uri()).tokens(tokens).build().unwrap();
        UserApi::new(client)
    }

    fn ok(body: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(body)
    }

    #[tokio::test]
    async fn all_users_encodes_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users/all"))
            .and(query_param("search", "ada lovelace"))
            .and(query_param("page", "2"))
            .respond_with(ok(json!({ "success": true, "data": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let query = UserQuery::new().param("search", "ada lovelace").param("page", 2);
        let response = user_api(&server).get_all_users(&query).await.unwrap();

        assert!(response.success);
        assert_eq!(response.data, Some(json!([])));
    }

    #[tokio::test]
    async fn status_and_settings_use_patch_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/users/status/7"))
            .and(body_json(json!({ "status": "away" })))
            .respond_with(ok(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/users/7/settings"))
            .and(body_json(json!({ "settings": { "theme": "dark" } })))
            .respond_with(ok(json!({ "success": true, "settings": { "theme": "dark" } })))
            .expect(1)
            .mount(&server)
            .await;

        let api = user_api(&server);
        assert!(api.update_user_status("7", "away").await.unwrap().success);
        let update = ProfileGateway::update_settings(&api, "7", &json!({ "theme": "dark" })).await.unwrap();

        assert_eq!(update.changes, json!({ "settings": { "theme": "dark" } }));
    }

    #[tokio::test]
    async fn update_user_accepts_success_message_without_flag() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/users/7"))
            .respond_with(ok(json!({
                "message": "User updated successfully",
                "userData": { "firstName": "Ada" }
            })))
            .mount(&server)
            .await;

        let update =
            ProfileGateway::update_user(&user_api(&server), "7", &json!({ "firstName": "Ada" }))
                .await
                .unwrap();

        assert_eq!(update.changes, json!({ "firstName": "Ada" }));
        assert_eq!(update.message.as_deref(), Some("User updated successfully"));
    }

    #[tokio::test]
    async fn rejected_update_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ok(json!({ "success": false, "message": "Nothing to update" })))
            .mount(&server)
            .await;

        let err = ProfileGateway::update_user(&user_api(&server), "7", &json!({})).await.unwrap_err();
        assert_eq!(err, ChatlineError::Validation("Nothing to update".into()));
    }

    #[tokio::test]
    async fn avatar_upload_is_multipart_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/7/avatar"))
            .respond_with(|request: &Request| {
                let body = String::from_utf8_lossy(&request.body);
                if body.contains("name=\"avatar\"") && body.contains("filename=\"me.png\"") {
                    ok(json!({ "success": true, "avatarUrl": "/uploads/me.png" }))
                } else {
                    ResponseTemplate::new(400)
                }
            })
            .mount(&server)
            .await;

        let avatar = AvatarUpload {
            file_name: "me.png".into(),
            mime_type: "image/png".into(),
            bytes: vec![137, 80, 78, 71],
        };
        let update = ProfileGateway::update_avatar(&user_api(&server), "7", avatar).await.unwrap();

        assert_eq!(update.changes, json!({ "avatarUrl": "/uploads/me.png" }));
    }

    #[tokio::test]
    async fn delete_avatar_clears_url() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/users/7/avatar"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let update = ProfileGateway::delete_avatar(&user_api(&server), "7").await.unwrap();
        assert_eq!(update.changes, json!({ "avatarUrl": null }));
    }

    #[tokio::test]
    async fn login_history_paths() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users/7/login-history"))
            .respond_with(ok(json!({ "success": true, "data": [{ "id": "e1" }] })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/users/7/login-history/e1"))
            .respond_with(ok(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let api = user_api(&server);
        let history = api.get_login_history("7").await.unwrap();
        assert_eq!(history.data.unwrap()[0]["id"], "e1");
        assert!(api.delete_login_history_entry("7", "e1").await.unwrap().success);
    }
}
