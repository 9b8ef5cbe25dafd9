use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::domain::{Principal, Role, UserId};

/// Set by the identity gateway after it has verified the caller.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PrincipalRejection {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("{0} header is not a valid user id")]
    InvalidUserId(&'static str),
    #[error("{0} header is not a known role")]
    InvalidRole(&'static str),
}

impl IntoResponse for PrincipalRejection {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

fn header<'a>(parts: &'a Parts, name: &'static str) -> Result<&'a str, PrincipalRejection> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or(PrincipalRejection::MissingHeader(name))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = PrincipalRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, USER_ID_HEADER)?
            .trim()
            .parse::<u64>()
            .map(UserId)
            .map_err(|_| PrincipalRejection::InvalidUserId(USER_ID_HEADER))?;
        let role = Role::parse(header(parts, USER_ROLE_HEADER)?)
            .ok_or(PrincipalRejection::InvalidRole(USER_ROLE_HEADER))?;

        Ok(Principal { id, role })
    }
}
