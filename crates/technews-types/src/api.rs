use serde::{Deserialize, Deserializer, Serialize};

use crate::models::User;

// Request fields are optional so a missing value reaches the store's
// required-field validator instead of failing JSON extraction.

// -- Users --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Outer `None`: field omitted. `Some(None)`: field sent as `null`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub username: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub password: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub message: String,
}

// -- Posts --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub post_url: Option<String>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpvoteRequest {
    pub user_id: i64,
    pub post_id: i64,
}

// -- Comments --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub comment_text: Option<String>,
    pub user_id: Option<i64>,
    pub post_id: Option<i64>,
}

/// Only called for keys present in the body, so `null` maps to `Some(None)`
/// while `#[serde(default)]` covers the absent case.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -- Errors --

/// Body of every 404 and 400 response.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Serialized store failure, returned with a 500 status.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreErrorBody {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}
