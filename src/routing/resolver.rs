//! Route resolution.
//!
//! # Responsibilities
//! - Resolve an ingress token to a Backend snapshot
//! - Fail with UnknownToken before any backend contact
//!
//! # Design Decisions
//! - Stateless: no cache, no retry, no liveness check

use std::sync::Arc;

use crate::error::IngressError;
use crate::routing::{Backend, BackendRegistry};

/// Maps routing tokens to backend targets.
#[derive(Clone)]
pub struct RouteResolver {
    registry: Arc<dyn BackendRegistry>,
}

impl RouteResolver {
    pub fn new(registry: Arc<dyn BackendRegistry>) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, token: &str) -> Result<Backend, IngressError> {
        match self.registry.lookup(token) {
            Some(backend) => Ok(backend),
            None => {
                tracing::warn!(token = %token, "Ingress for token not available");
                Err(IngressError::UnknownToken(token.to_string()))
            }
        }
    }

    pub fn registry(&self) -> &Arc<dyn BackendRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Panel;

    struct Fixed;

    impl BackendRegistry for Fixed {
        fn lookup(&self, token: &str) -> Option<Backend> {
            (token == "known").then(|| Backend {
                slug: "addon".into(),
                address: "127.0.0.1".into(),
                port: 1,
                stream: false,
            })
        }

        fn panels(&self) -> Vec<(String, Panel)> {
            Vec::new()
        }
    }

    #[test]
    fn resolves_known_token() {
        let resolver = RouteResolver::new(Arc::new(Fixed));
        assert_eq!(resolver.resolve("known").unwrap().slug, "addon");
    }

    #[test]
    fn unknown_token_is_service_unavailable() {
        let resolver = RouteResolver::new(Arc::new(Fixed));
        let err = resolver.resolve("nope").unwrap_err();
        assert!(matches!(err, IngressError::UnknownToken(ref t) if t == "nope"));
    }
}
