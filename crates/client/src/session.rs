use std::sync::{Arc, RwLock};

use dashkit_auth::Principal;

use crate::{AuthTokens, QueryCache, TokenStore};

/// Signed-in state shared by every screen: tokens, the current principal and
/// the query cache. Logging out clears all three.
#[derive(Debug, Clone, Default)]
pub struct Session {
    tokens: TokenStore,
    principal: Arc<RwLock<Option<Principal>>>,
    cache: QueryCache,
}

impl Session {
    pub fn new(tokens: TokenStore, cache: QueryCache) -> Self {
        Self {
            tokens,
            principal: Arc::default(),
            cache,
        }
    }

    pub fn login(&self, tokens: AuthTokens, principal: Principal) {
        self.tokens.set(tokens);
        *self.principal.write().unwrap_or_else(|e| e.into_inner()) = Some(principal);
        tracing::info!("session started");
    }

    pub fn logout(&self) {
        self.tokens.clear();
        *self.principal.write().unwrap_or_else(|e| e.into_inner()) = None;
        self.cache.clear();
        tracing::info!("session ended");
    }

    pub fn principal(&self) -> Option<Principal> {
        self.principal.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.access_token().is_some()
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }
}
