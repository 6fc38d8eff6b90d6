use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};

use crate::account::{Account, AccountUuid, TokenCipher};
use crate::errors::ApiError;

pub const USER_AGENT_VALUE: &str = "gitnotify/0.1.0 (https://github.com/tacogips/gitnotify)";

/// The two API surfaces a host exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiKind {
    Rest,
    GraphQL,
}

/// Authenticated HTTP clients keyed by account and API surface.
///
/// A client is built lazily on first use with the token decrypted through
/// the configured [`TokenCipher`]. Entries must be invalidated when an
/// account is added, replaced or removed so a stale token is never reused.
pub struct ClientCache {
    cipher: Arc<dyn TokenCipher>,
    clients: RwLock<HashMap<(AccountUuid, ApiKind), Client>>,
}

impl ClientCache {
    pub fn new(cipher: Arc<dyn TokenCipher>) -> Self {
        Self {
            cipher,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached client for `account`, building one if needed.
    pub fn client_for(&self, account: &Account, kind: ApiKind) -> Result<Client, ApiError> {
        let key = (account.uuid(), kind);

        if let Some(client) = self
            .clients
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key)
        {
            return Ok(client.clone());
        }

        let client = self.build_client(account, kind)?;
        tracing::debug!(
            "Created {:?} client for account {}",
            kind,
            account.display_name()
        );

        let mut clients = self
            .clients
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(clients.entry(key).or_insert(client).clone())
    }

    /// Drop every client built for `account`, including the ones cached
    /// under its identity from before the user was resolved.
    pub fn invalidate(&self, account: &Account) {
        let unresolved = Account {
            user: None,
            ..account.clone()
        };
        self.invalidate_uuids(&[account.uuid(), unresolved.uuid()]);
    }

    pub fn invalidate_uuids(&self, uuids: &[AccountUuid]) {
        let mut clients = self
            .clients
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        clients.retain(|(key, _), _| !uuids.contains(key));
    }

    pub fn clear(&self) {
        self.clients
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.clients
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn build_client(&self, account: &Account, kind: ApiKind) -> Result<Client, ApiError> {
        // An undecryptable token is reported like a rejected one.
        let token = self
            .cipher
            .decrypt(&account.token)
            .map_err(|e| ApiError::http(401, e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(match kind {
                ApiKind::Rest => "application/vnd.github+json",
                ApiKind::GraphQL => "application/json",
            }),
        );
        let mut auth_value = HeaderValue::from_str(&format!("token {}", token))
            .map_err(|e| ApiError::http(401, format!("Invalid auth header: {}", e)))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::network(format!("Failed to build HTTP client: {}", e)))
    }
}

impl std::fmt::Debug for ClientCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCache")
            .field("clients", &self.len())
            .finish()
    }
}
