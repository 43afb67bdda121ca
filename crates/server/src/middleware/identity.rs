//! User identity extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use marigold_core::UserId;

use crate::error::AppError;

/// Header carrying the authenticated user's id, set by the auth gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor for the authenticated user's id.
///
/// Rejects with 401 when the header is missing or not a valid UUID.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub UserId);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("missing user identity".to_string()))?;

        let raw = header
            .to_str()
            .map_err(|_| AppError::Unauthorized("malformed user identity".to_string()))?;

        let user_id = raw
            .parse::<UserId>()
            .map_err(|_| AppError::Unauthorized("malformed user identity".to_string()))?;

        Ok(Self(user_id))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<AuthenticatedUser, AppError> {
        let (mut parts, ()) = request.into_parts();
        AuthenticatedUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn extracts_a_valid_user_id() {
        let user_id = UserId::generate();
        let request = Request::builder()
            .header(USER_ID_HEADER, user_id.to_string())
            .body(())
            .expect("request");

        let AuthenticatedUser(extracted) = extract(request).await.expect("extracts");
        assert_eq!(extracted, user_id);
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let request = Request::builder().body(()).expect("request");
        assert!(matches!(
            extract(request).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn malformed_header_is_unauthorized() {
        let request = Request::builder()
            .header(USER_ID_HEADER, "not-a-uuid")
            .body(())
            .expect("request");
        assert!(matches!(
            extract(request).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
