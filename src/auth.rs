//! # Authentication
//!
//! Bearer token middleware for the protected API. A valid token resolves to
//! an active employee whose role is turned into an [`Actor`] and stored in
//! the request extensions, where handlers pick it up through [`CurrentActor`].

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::error::{ApiError, unauthorized};
use crate::policy::Actor;
use crate::repositories::EmployeeRepository;
use crate::server::AppState;

/// The authenticated caller of a protected route.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

/// Authentication middleware resolving the bearer token to an [`Actor`]
pub async fn require_actor(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())?;
    let employee_id = state.tokens.verify(token).map_err(|error| {
        tracing::debug!(%error, "Rejected bearer token");
        unauthorized(Some("Invalid or expired token"))
    })?;

    let employee = EmployeeRepository::new(&state.db)
        .find_by_id(employee_id)
        .await?
        .ok_or_else(|| unauthorized(Some("Invalid or expired token")))?;
    if !employee.is_active {
        return Err(unauthorized(Some("Account is disabled")));
    }

    let actor = Actor::try_from(&employee).map_err(|error| {
        tracing::error!(employee_id, %error, "Stored employee violates role invariant");
        unauthorized(Some("Account is misconfigured"))
    })?;
    tracing::debug!(actor_id = actor.id, role = %actor.role.kind(), "Authenticated request");

    request.extensions_mut().insert(CurrentActor(actor));
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))?
        .to_str()
        .map_err(|_| unauthorized(Some("Invalid Authorization header")))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
}

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentActor>()
            .cloned()
            .ok_or_else(|| unauthorized(Some("Authentication required")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_unauthorized() {
        let err = bearer_token(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(&*err.message, "Missing Authorization header");
    }

    #[test]
    fn basic_scheme_is_rejected() {
        assert!(bearer_token(&headers("Basic dGVzdDoxMjM=")).is_err());
        assert!(bearer_token(&headers("Bearer ")).is_err());
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
    }
}
