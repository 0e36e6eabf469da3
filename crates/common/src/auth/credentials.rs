//! Typed session credential helpers over any [`SecureCredentialStore`]
//!
//! Every store gets these methods through a blanket impl, so the auth
//! controller never spells out key names itself.

use async_trait::async_trait;
use starlight_domain::constants::keys;
use starlight_domain::{ApplicationCredentials, FetchError, InstanceDomain, Token};
use tracing::{debug, warn};

use super::traits::SecureCredentialStore;
use crate::security::KeychainError;

/// Session-level operations layered on a raw key-value store.
#[async_trait]
pub trait CredentialStoreExt: SecureCredentialStore {
    /// Stored instance domain, if any. A malformed stored value is treated
    /// as absent.
    async fn load_instance(&self) -> Result<Option<InstanceDomain>, KeychainError> {
        let Some(raw) = self.get(keys::INSTANCE_DOMAIN).await? else {
            return Ok(None);
        };
        match InstanceDomain::parse(&raw) {
            Ok(domain) => Ok(Some(domain)),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed stored instance domain");
                Ok(None)
            }
        }
    }

    async fn store_instance(&self, domain: &InstanceDomain) -> Result<(), KeychainError> {
        self.set(keys::INSTANCE_DOMAIN, domain.as_str()).await
    }

    /// Stored client id/secret; `None` unless both halves are present.
    async fn load_application(&self) -> Result<Option<ApplicationCredentials>, KeychainError> {
        let client_id = self.get(keys::CLIENT_ID).await?;
        let client_secret = self.get(keys::CLIENT_SECRET).await?;
        Ok(match (client_id, client_secret) {
            (Some(client_id), Some(client_secret)) => {
                Some(ApplicationCredentials { client_id, client_secret })
            }
            _ => None,
        })
    }

    /// Overwrites any previously registered application.
    async fn store_application(
        &self,
        credentials: &ApplicationCredentials,
    ) -> Result<(), KeychainError> {
        self.set(keys::CLIENT_ID, &credentials.client_id).await?;
        self.set(keys::CLIENT_SECRET, &credentials.client_secret).await
    }

    async fn load_token(&self) -> Result<Option<Token>, KeychainError> {
        let Some(access_token) = self.get(keys::ACCESS_TOKEN).await? else {
            return Ok(None);
        };
        if access_token.is_empty() {
            return Ok(None);
        }
        let scope = self.get(keys::TOKEN_SCOPE).await?;
        let refresh_token = self.get(keys::REFRESH_TOKEN).await?;
        Ok(Some(Token { access_token, scope, refresh_token }))
    }

    /// Persists the token, removing optional fields the new token lacks so a
    /// stale refresh token never outlives its access token.
    async fn store_token(&self, token: &Token) -> Result<(), KeychainError> {
        self.set(keys::ACCESS_TOKEN, &token.access_token).await?;
        match &token.scope {
            Some(scope) => self.set(keys::TOKEN_SCOPE, scope).await?,
            None => self.delete(keys::TOKEN_SCOPE).await?,
        }
        match &token.refresh_token {
            Some(refresh) => self.set(keys::REFRESH_TOKEN, refresh).await,
            None => self.delete(keys::REFRESH_TOKEN).await,
        }
    }

    /// Drop the token but keep the instance and registered application.
    async fn clear_token(&self) -> Result<(), KeychainError> {
        self.delete(keys::ACCESS_TOKEN).await?;
        self.delete(keys::TOKEN_SCOPE).await?;
        self.delete(keys::REFRESH_TOKEN).await
    }

    /// Delete every session key. All deletions are attempted; the first
    /// failure is reported.
    async fn clear_session(&self) -> Result<(), FetchError> {
        let mut first_error = None;
        for key in keys::SESSION_KEYS {
            if let Err(e) = self.delete(key).await {
                warn!(key = %key, error = %e, "Failed to delete session credential");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        debug!("Session credentials cleared");
        first_error.map_or(Ok(()), |e| Err(e.into()))
    }
}

impl<T: SecureCredentialStore + ?Sized> CredentialStoreExt for T {}
