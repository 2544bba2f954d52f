use serde::{Deserialize, Serialize};

use crate::media::PendingFile;
use crate::users::PublicUser;

/// Multipart fields of a registration request.
#[derive(Debug, Default)]
pub struct RegisterForm {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<PendingFile>,
    pub cover_image: Option<PendingFile>,
}

/// Request body for login. Either identifier may be used.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub password: String,
}

/// Request body for token refresh, when the cookie is not available.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}
