//! Access credential storage
//!
//! The secret store holds the user's access credential, which authenticates
//! calls to the token service. Persistence is the platform's business; this
//! crate only reads the credential and treats absence as "not logged in".

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::ClientResult;

/// Environment variable read by [`EnvSecretStore::new`]
pub const ACCESS_TOKEN_ENV: &str = "VOCO_ACCESS_TOKEN";

/// Key-value store for the access credential
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Current access credential, `None` when the user is not logged in
    async fn access_credential(&self) -> ClientResult<Option<String>>;

    /// Replace the stored access credential
    async fn store_access_credential(&self, credential: String) -> ClientResult<()>;

    /// Forget all stored credentials
    async fn clear(&self) -> ClientResult<()>;
}

/// In-process secret store
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    access: RwLock<Option<String>>,
}

impl MemorySecretStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a credential
    pub fn with_credential(credential: impl Into<String>) -> Self {
        Self {
            access: RwLock::new(Some(credential.into())),
        }
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn access_credential(&self) -> ClientResult<Option<String>> {
        Ok(self
            .access
            .read()
            .clone()
            .filter(|credential| !credential.trim().is_empty()))
    }

    async fn store_access_credential(&self, credential: String) -> ClientResult<()> {
        *self.access.write() = Some(credential);
        Ok(())
    }

    async fn clear(&self) -> ClientResult<()> {
        *self.access.write() = None;
        Ok(())
    }
}

/// Read-mostly store backed by an environment variable.
///
/// Writes are kept in memory and shadow the environment for the lifetime of
/// the store.
#[derive(Debug)]
pub struct EnvSecretStore {
    var: String,
    overridden: RwLock<Option<Option<String>>>,
}

impl EnvSecretStore {
    /// Store reading [`ACCESS_TOKEN_ENV`]
    pub fn new() -> Self {
        Self::from_var(ACCESS_TOKEN_ENV)
    }

    /// Store reading a custom variable
    pub fn from_var(var: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            overridden: RwLock::new(None),
        }
    }
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn access_credential(&self) -> ClientResult<Option<String>> {
        let credential = match self.overridden.read().clone() {
            Some(value) => value,
            None => std::env::var(&self.var).ok(),
        };
        Ok(credential.filter(|c| !c.trim().is_empty()))
    }

    async fn store_access_credential(&self, credential: String) -> ClientResult<()> {
        *self.overridden.write() = Some(Some(credential));
        Ok(())
    }

    async fn clear(&self) -> ClientResult<()> {
        *self.overridden.write() = Some(None);
        Ok(())
    }
}
