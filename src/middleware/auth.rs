//! The single authorization gate.
//!
//! Each route group is layered with the `Role` it requires. The gate resolves
//! the bearer token (if any) to a `RequestContext` and compares roles before
//! the handler runs.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::models::Role;

/// Who is calling. Inserted as a request extension by [`require_role`].
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub role: Role,
    /// Email bound to the API key; `None` for anonymous callers.
    pub email: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self {
            role: Role::None,
            email: None,
        }
    }

    /// The caller's email, for routes that act on "my" records.
    pub fn require_email(&self) -> Result<&str> {
        self.email
            .as_deref()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))
    }
}

/// API key from `Authorization: Bearer <key>`. The scheme is case-insensitive.
fn api_key_from_headers(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, key) = value.split_once(' ')?;
    let key = key.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !key.is_empty()).then_some(key)
}

/// Resolve the caller and check it holds `required`.
pub fn authorize(state: &AppState, headers: &HeaderMap, required: Role) -> Result<RequestContext> {
    let ctx = match api_key_from_headers(headers) {
        Some(token) => {
            let conn = state.db.get()?;
            let key = queries::get_api_key_by_key(&conn, token)?
                .ok_or_else(|| AppError::Unauthorized("Invalid API key".into()))?;
            RequestContext {
                role: key.role,
                email: Some(key.email),
            }
        }
        None => RequestContext::anonymous(),
    };

    if ctx.role.satisfies(required) {
        return Ok(ctx);
    }

    if ctx.role == Role::None {
        Err(AppError::Unauthorized("Authentication required".into()))
    } else {
        Err(AppError::Forbidden("Insufficient permissions".into()))
    }
}

/// Middleware form of [`authorize`]; layer with
/// `from_fn_with_state((state, Role::Admin), require_role)`.
pub async fn require_role(
    State((state, required)): State<(AppState, Role)>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let ctx = authorize(&state, request.headers(), required)?;
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}
