use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require authentication. Ownership
/// checks (may this user edit this comment?) happen in the handler body.
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
}

impl AuthUser {
    /// Returns `Ok(())` if the acting user owns the resource,
    /// `Err(PermissionDenied)` otherwise.
    pub fn require_owner(&self, owner_id: i32) -> Result<(), AppError> {
        if self.user_id == owner_id {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(auth_header) = parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
    else {
        return Ok(None);
    };

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::TokenInvalid)?;

    Ok(Some(token))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AppError::TokenMissing)?;

        let claims = jwt::verify(token, &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;

        Ok(AuthUser {
            user_id: claims.uid,
            username: claims.sub,
        })
    }
}

/// Like [`AuthUser`], but for endpoints that are public and only
/// personalize their response when a token is present (e.g. the `liked`
/// flag on story detail). A missing header yields `None`; a malformed
/// or expired token is still rejected.
pub struct OptionalAuthUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts)? else {
            return Ok(OptionalAuthUser(None));
        };

        let claims = jwt::verify(token, &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;

        Ok(OptionalAuthUser(Some(AuthUser {
            user_id: claims.uid,
            username: claims.sub,
        })))
    }
}
