//! Connection authentication
//!
//! A bearer JWT identifies the user; the display name comes from the user
//! repository. Any failure to establish an identity leaves the connection
//! anonymous, except storage outages, which surface as errors.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use roomcast_common::JwtService;
use roomcast_core::Identity;
use roomcast_service::{ServiceContext, ServiceError};

use super::error::HandlerResult;

/// Resolves the identity behind a connection attempt
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// `Ok(None)` means anonymous
    async fn authenticate(&self, token: Option<&str>) -> HandlerResult<Option<Identity>>;
}

/// Extract a bearer token from the `Authorization` header
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// JWT-backed authenticator
pub struct JwtAuthenticator {
    jwt: Arc<JwtService>,
    ctx: Arc<ServiceContext>,
}

impl JwtAuthenticator {
    pub fn new(jwt: Arc<JwtService>, ctx: Arc<ServiceContext>) -> Self {
        Self { jwt, ctx }
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, token: Option<&str>) -> HandlerResult<Option<Identity>> {
        let Some(token) = token else {
            return Ok(None);
        };

        let user_id = match self.jwt.verify(token) {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(error = %e, "Token rejected");
                return Ok(None);
            }
        };

        match self.ctx.user_repo().find_by_id(user_id).await {
            Ok(Some(user)) => Ok(Some(Identity::from(user))),
            Ok(None) => {
                tracing::debug!(user_id = %user_id, "Token for unknown user");
                Ok(None)
            }
            Err(e) if e.is_unavailable() => Err(ServiceError::Domain(e).into()),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "User lookup failed");
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthenticator").finish_non_exhaustive()
    }
}
