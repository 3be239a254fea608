//! Guard predicates evaluated before a handler body.
//!
//! A guard is a pure function of the request headers and a context. Guards
//! are composed as an ordered slice; the first denial wins.

use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderName};

use crate::error::IngressError;

/// Inputs a guard may consult besides the request.
#[derive(Debug, Clone, Copy)]
pub struct GuardContext<'a> {
    /// Secret identifying the privileged caller.
    pub api_key: &'a str,
    /// Token headers that may carry the secret.
    pub token_headers: &'a [HeaderName],
}

pub type Guard = fn(&HeaderMap, &GuardContext<'_>) -> Result<(), IngressError>;

/// Guards for endpoints reserved to the privileged caller.
pub const PRIVILEGED: &[Guard] = &[require_privileged_caller];

/// Evaluate `guards` in order, stopping at the first denial.
pub fn enforce(
    guards: &[Guard],
    headers: &HeaderMap,
    ctx: &GuardContext<'_>,
) -> Result<(), IngressError> {
    for guard in guards {
        guard(headers, ctx)?;
    }
    Ok(())
}

/// Allow only callers presenting the API key as a bearer token or token header.
pub fn require_privileged_caller(
    headers: &HeaderMap,
    ctx: &GuardContext<'_>,
) -> Result<(), IngressError> {
    if ctx.api_key.is_empty() {
        return Err(IngressError::NotPrivileged);
    }

    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == ctx.api_key);

    let token_header = ctx.token_headers.iter().any(|name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|token| token == ctx.api_key)
    });

    if bearer || token_header {
        Ok(())
    } else {
        tracing::warn!("Rejected request from non-privileged caller");
        Err(IngressError::NotPrivileged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn ctx(names: &[HeaderName]) -> GuardContext<'_> {
        GuardContext {
            api_key: "secret",
            token_headers: names,
        }
    }

    #[test]
    fn accepts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        assert!(enforce(PRIVILEGED, &headers, &ctx(&[])).is_ok());
    }

    #[test]
    fn accepts_token_header() {
        let names = [HeaderName::from_static("x-supervisor-token")];
        let mut headers = HeaderMap::new();
        headers.insert("X-Supervisor-Token", HeaderValue::from_static("secret"));
        assert!(enforce(PRIVILEGED, &headers, &ctx(&names)).is_ok());
    }

    #[test]
    fn rejects_wrong_or_missing_secret() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            enforce(PRIVILEGED, &headers, &ctx(&[])),
            Err(IngressError::NotPrivileged)
        ));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer other"));
        assert!(enforce(PRIVILEGED, &headers, &ctx(&[])).is_err());
    }

    #[test]
    fn first_denial_short_circuits() {
        fn deny(_: &HeaderMap, _: &GuardContext<'_>) -> Result<(), IngressError> {
            Err(IngressError::Unauthorized)
        }
        fn unreachable_guard(_: &HeaderMap, _: &GuardContext<'_>) -> Result<(), IngressError> {
            panic!("guard after a denial must not run");
        }
        let guards: &[Guard] = &[deny, unreachable_guard];
        assert!(matches!(
            enforce(guards, &HeaderMap::new(), &ctx(&[])),
            Err(IngressError::Unauthorized)
        ));
    }
}
