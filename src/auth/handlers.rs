use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::{
    cookies,
    dto::{LoginRequest, LoginResponse, RefreshRequest, RegisterForm},
    extractors::AuthUser,
    jwt::JwtKeys,
    password::hash_password,
    tokens::{issue_tokens, TokenPair},
};
use crate::{
    error::{AppError, Result},
    media::PendingFile,
    response::ApiResponse,
    state::AppState,
    users::{NewUser, PublicUser},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users/register",
            post(register).layer(DefaultBodyLimit::max(20 * 1024 * 1024)), // 20MB
        )
        .route("/users/login", post(login))
        .route("/users/logout", post(logout))
        .route("/users/refresh-token", post(refresh))
        .route("/users/current-user", get(current_user))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

/// Trimmed value, or `None` when missing or blank.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn read_register_form(mut mp: Multipart) -> Result<RegisterForm> {
    let mut form = RegisterForm::default();
    while let Some(field) = mp.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "avatar" | "coverImage" => {
                let file = PendingFile {
                    file_name: field.file_name().map(str::to_string),
                    content_type: field.content_type().map(str::to_string),
                    body: field.bytes().await?,
                };
                // An empty part means the client left the file input blank
                if file.body.is_empty() {
                    continue;
                }
                // Only the first file of each field counts
                let slot = if name == "avatar" {
                    &mut form.avatar
                } else {
                    &mut form.cover_image
                };
                slot.get_or_insert(file);
            }
            "fullName" => form.full_name = Some(field.text().await?),
            "email" => form.email = Some(field.text().await?),
            "username" => form.username = Some(field.text().await?),
            "password" => form.password = Some(field.text().await?),
            _ => {}
        }
    }
    Ok(form)
}

#[instrument(skip(state, multipart))]
pub async fn register(
    State(state): State<AppState>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> Result<ApiResponse<PublicUser>> {
    let form = read_register_form(multipart).await?;

    let (Some(full_name), Some(email), Some(username), Some(password)) = (
        non_blank(form.full_name),
        non_blank(form.email),
        non_blank(form.username),
        form.password.filter(|p| !p.trim().is_empty()),
    ) else {
        warn!("registration with missing fields");
        return Err(AppError::BadRequest("All fields are compulsory".into()));
    };
    let email = email.to_lowercase();
    let username = username.to_lowercase();

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }

    if state
        .users
        .find_by_username_or_email(Some(username.as_str()), Some(email.as_str()))
        .await?
        .is_some()
    {
        warn!(%username, %email, "user already exists");
        return Err(AppError::Conflict(
            "User with email or username already exists".into(),
        ));
    }

    let Some(avatar_file) = form.avatar else {
        warn!("registration without avatar");
        return Err(AppError::BadRequest("Avatar file is required".into()));
    };

    let avatar_path = state.media.stage(&avatar_file).await?;
    let avatar = state.media.upload(&avatar_path).await.map_err(|e| {
        warn!(error = %e, "avatar upload failed");
        AppError::BadRequest("Avatar file is required".into())
    })?;

    let cover_image = match form.cover_image {
        Some(file) => {
            let path = state.media.stage(&file).await?;
            match state.media.upload(&path).await {
                Ok(media) => Some(media.url),
                Err(e) => {
                    warn!(error = %e, "cover image upload failed; continuing without it");
                    None
                }
            }
        }
        None => None,
    };

    let password_hash = hash_password(&password)?;

    let user = state
        .users
        .create(NewUser {
            full_name,
            email,
            username,
            password_hash,
            avatar: avatar.url,
            cover_image,
        })
        .await?;

    let created = state
        .users
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| {
            AppError::Internal("Internal Server Error while registering user".into())
        })?;

    info!(user_id = %created.id, username = %created.username, "user registered");
    Ok(ApiResponse::new(
        StatusCode::CREATED,
        PublicUser::from(created),
        "User registered successfully",
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>)> {
    let email = non_blank(payload.email).map(|e| e.to_lowercase());
    let username = non_blank(payload.username).map(|u| u.to_lowercase());

    if email.is_none() && username.is_none() {
        return Err(AppError::BadRequest("username or email is required".into()));
    }

    let user = state
        .users
        .find_by_username_or_email(username.as_deref(), email.as_deref())
        .await?
        .ok_or_else(|| {
            warn!(?username, ?email, "login for unknown user");
            AppError::NotFound("User doesn't exist".into())
        })?;

    if !user.is_password_correct(&payload.password)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(AppError::Unauthorized("Password Incorrect".into()));
    }

    let tokens = issue_tokens(&state, user.id).await?;
    let jar = cookies::with_tokens(jar, &tokens, state.config.cookie_secure);

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok((
        jar,
        ApiResponse::ok(
            LoginResponse {
                user: PublicUser::from(user),
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

#[instrument(skip(state, jar, user))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    AuthUser(user): AuthUser,
) -> Result<(CookieJar, ApiResponse<Value>)> {
    state.users.set_refresh_token(user.id, None).await?;
    let jar = cookies::without_tokens(jar, state.config.cookie_secure);

    info!(user_id = %user.id, "user logged out");
    Ok((jar, ApiResponse::ok(json!({}), "User logged out")))
}

#[instrument(skip(state, jar, body))]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<(CookieJar, ApiResponse<TokenPair>)> {
    let incoming = cookies::read(&jar, cookies::REFRESH_TOKEN_COOKIE)
        .or_else(|| body.and_then(|Json(b)| non_blank(b.refresh_token)))
        .ok_or_else(|| AppError::Unauthorized("Unauthorized request".into()))?;

    let claims = JwtKeys::from_ref(&state)
        .verify_refresh(&incoming)
        .map_err(|e| {
            warn!(error = %e, "invalid refresh token");
            AppError::Unauthorized("Invalid refresh token".into())
        })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".into()))?;

    if user.refresh_token.as_deref() != Some(incoming.as_str()) {
        warn!(user_id = %user.id, "refresh token reuse or stale token");
        return Err(AppError::Unauthorized(
            "Refresh token is expired or used".into(),
        ));
    }

    let tokens = issue_tokens(&state, user.id).await?;
    let jar = cookies::with_tokens(jar, &tokens, state.config.cookie_secure);

    info!(user_id = %user.id, "access token refreshed");
    Ok((jar, ApiResponse::ok(tokens, "Access token refreshed")))
}

#[instrument(skip(user))]
pub async fn current_user(AuthUser(user): AuthUser) -> ApiResponse<PublicUser> {
    ApiResponse::ok(PublicUser::from(user), "Current user fetched successfully")
}
