use anyhow::Context;
use axum::extract::FromRef;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::{error::AppError, state::AppState};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Loads the user, mints both tokens and stores the refresh token on the user.
pub async fn issue_tokens(state: &AppState, user_id: Uuid) -> Result<TokenPair, AppError> {
    let keys = JwtKeys::from_ref(state);

    let issued = async {
        let user = state
            .users
            .find_by_id(user_id)
            .await?
            .context("user not found")?;
        let access_token = user.generate_access_token(&keys)?;
        let refresh_token = user.generate_refresh_token(&keys)?;
        state
            .users
            .set_refresh_token(user.id, Some(&refresh_token))
            .await?;
        anyhow::Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
    .await;

    match issued {
        Ok(tokens) => {
            info!(%user_id, "tokens issued");
            Ok(tokens)
        }
        Err(e) => {
            error!(error = %e, %user_id, "token issuance failed");
            Err(AppError::Internal(
                "Something went wrong while generating refresh and access token".into(),
            ))
        }
    }
}
