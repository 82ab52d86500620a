//! Current-user resolution for the history reconciler.

use async_trait::async_trait;
use tracing::warn;

use crate::gate::AuthClient;
use crate::models::UserId;

/// Resolves who the current user is. Called on every load, never cached.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn current_user_id(&self) -> UserId;
}

/// Always resolves to the same identity.
#[derive(Debug, Clone)]
pub struct FixedIdentity(pub UserId);

#[async_trait]
impl IdentityResolver for FixedIdentity {
    async fn current_user_id(&self) -> UserId {
        self.0.clone()
    }
}

/// Asks the auth service. Anything short of a user with an id is anonymous.
#[derive(Debug, Clone)]
pub struct AuthServiceIdentity {
    client: AuthClient,
}

impl AuthServiceIdentity {
    pub const fn new(client: AuthClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityResolver for AuthServiceIdentity {
    async fn current_user_id(&self) -> UserId {
        match self.client.current_user().await {
            Ok(Some(user)) => user
                .id()
                .map_or(UserId::Anonymous, |id| UserId::Authenticated(id.to_string())),
            Ok(None) => UserId::Anonymous,
            Err(e) => {
                warn!(error = %e, "could not resolve current user");
                UserId::Anonymous
            }
        }
    }
}
