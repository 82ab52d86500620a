//! Session gate - per-request auth check and routing metadata.
//!
//! Every request that survives the [`RouteMatcher`] goes through:
//! 1. Derive the [`RequestContext`] from forwarded headers
//! 2. If auth is configured, look up the current user; an anonymous
//!    request for `/` is redirected to the login route and nothing else
//!    happens
//! 3. Otherwise hand the request to the [`SessionRefresher`] (or straight
//!    to the inner service when auth is disabled)
//! 4. Stamp `x-url`, `x-host`, `x-protocol` and `x-base-url` on the response

mod auth;
mod context;
mod matcher;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::GateError;

pub use auth::{AuthClient, AuthUser};
pub use context::RequestContext;
pub use matcher::RouteMatcher;

/// Renews and propagates session cookies for a request that passed the gate.
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    async fn refresh(&self, request: Request, next: Next) -> Response;
}

/// Refresher that forwards the request unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

#[async_trait]
impl SessionRefresher for PassThrough {
    async fn refresh(&self, request: Request, next: Next) -> Response {
        next.run(request).await
    }
}

/// The session gate. Shared across requests behind an `Arc`.
pub struct SessionGate {
    auth: Option<AuthClient>,
    refresher: Arc<dyn SessionRefresher>,
    matcher: RouteMatcher,
    login_path: String,
}

impl SessionGate {
    /// Build a gate from configuration. Auth is disabled when not configured.
    pub fn new(config: &Config) -> Result<Self, GateError> {
        let auth = config.auth.as_ref().map(AuthClient::new).transpose()?;
        Ok(Self {
            auth,
            refresher: Arc::new(PassThrough),
            matcher: RouteMatcher::new(),
            login_path: config.login_path.clone(),
        })
    }

    /// Replace the session-refresh collaborator.
    #[must_use]
    pub fn with_refresher(mut self, refresher: Arc<dyn SessionRefresher>) -> Self {
        self.refresher = refresher;
        self
    }

    pub const fn auth_enabled(&self) -> bool {
        self.auth.is_some()
    }

    /// Run one request through the gate.
    pub async fn handle(&self, request: Request, next: Next) -> Response {
        if !self.matcher.matches(request.uri().path()) {
            return next.run(request).await;
        }

        let ctx = RequestContext::from_request_parts(request.headers(), request.uri());
        debug!(url = %ctx.url, host = %ctx.host, "gated request");

        let mut response = match &self.auth {
            Some(auth) => {
                let user = lookup_user(auth).await;
                if user.is_none() && request.uri().path() == "/" {
                    debug!(url = %ctx.url, "no session, redirecting to {}", self.login_path);
                    return Redirect::temporary(&self.login_path).into_response();
                }
                self.refresher.refresh(request, next).await
            }
            None => next.run(request).await,
        };

        stamp_routing_headers(response.headers_mut(), &ctx);
        response
    }
}

/// Axum middleware entry point, for use with `middleware::from_fn_with_state`.
pub async fn session_gate(
    State(gate): State<Arc<SessionGate>>,
    request: Request,
    next: Next,
) -> Response {
    gate.handle(request, next).await
}

/// A failed lookup counts as no session.
async fn lookup_user(auth: &AuthClient) -> Option<AuthUser> {
    match auth.current_user().await {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "auth lookup failed, treating request as anonymous");
            None
        }
    }
}

fn stamp_routing_headers(headers: &mut HeaderMap, ctx: &RequestContext) {
    for (name, value) in ctx.headers() {
        match HeaderValue::from_str(value) {
            Ok(v) => {
                headers.insert(name, v);
            }
            Err(_) => warn!(header = %name, "routing header value is not a valid header"),
        }
    }
}
