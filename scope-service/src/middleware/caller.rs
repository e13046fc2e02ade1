use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;

use crate::models::Role;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Authenticated caller identity.
///
/// Authentication happens upstream: a trusted gateway sets `X-User-ID` and,
/// optionally, `X-User-Role` (a role code or name). Without a role selector
/// the role stored in the directory is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub role: Option<Role>,
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Missing X-User-ID header")))?
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Invalid X-User-ID header")))?;

        let role = match parts.headers.get(USER_ROLE_HEADER) {
            None => None,
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Invalid X-User-Role header")))?;
                Some(
                    raw.parse::<Role>()
                        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?,
                )
            }
        };

        tracing::Span::current().record("user_id", user_id);

        Ok(Caller { user_id, role })
    }
}
