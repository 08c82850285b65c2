//! Builder for [`SessionManager`]
//!
//! The builder wires the manager's collaborators. Only the transport factory
//! is mandatory; everything else has a default:
//!
//! | Collaborator        | Default                                   |
//! |---------------------|-------------------------------------------|
//! | [`ClientConfig`]    | [`ClientConfig::default`]                 |
//! | [`TokenService`]    | [`HttpTokenService`] from `config.token`  |
//! | [`SecretStore`]     | [`EnvSecretStore`] (`VOCO_ACCESS_TOKEN`)  |
//! | [`AudioSession`]    | [`NoopAudioSession`]                      |
//!
//! # Examples
//!
//! ```rust
//! use voco_client_core::{ClientConfig, SessionManagerBuilder};
//!
//! // A transport factory is required.
//! let err = SessionManagerBuilder::new()
//!     .config(ClientConfig::new().with_agent_marker("assistant"))
//!     .build()
//!     .unwrap_err();
//! assert_eq!(err.category(), "invalid_configuration");
//! ```

use std::sync::Arc;

use tracing::debug;

use super::manager::SessionManager;
use crate::audio::{AudioSession, AudioSessionGuard, NoopAudioSession};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::secret::{EnvSecretStore, SecretStore};
use crate::token::{HttpTokenService, TokenService};
use crate::transport::TransportFactory;

/// Fluent builder for [`SessionManager`]
#[derive(Default)]
pub struct SessionManagerBuilder {
    config: ClientConfig,
    token_service: Option<Arc<dyn TokenService>>,
    secret_store: Option<Arc<dyn SecretStore>>,
    transport_factory: Option<Arc<dyn TransportFactory>>,
    audio_session: Option<Arc<dyn AudioSession>>,
}

impl SessionManagerBuilder {
    /// Create a builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom token service
    pub fn token_service(mut self, service: Arc<dyn TokenService>) -> Self {
        self.token_service = Some(service);
        self
    }

    /// Use a custom credential store
    pub fn secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.secret_store = Some(store);
        self
    }

    /// Set the factory that creates one transport per connect
    pub fn transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.transport_factory = Some(factory);
        self
    }

    /// Use a platform audio session
    pub fn audio_session(mut self, session: Arc<dyn AudioSession>) -> Self {
        self.audio_session = Some(session);
        self
    }

    /// Validate the configuration, start the audio session and build the manager
    pub fn build(self) -> ClientResult<SessionManager> {
        self.config.validate()?;

        let transports = self
            .transport_factory
            .ok_or_else(|| ClientError::config("a transport factory is required"))?;

        let token_service = match self.token_service {
            Some(service) => service,
            None => Arc::new(HttpTokenService::new(&self.config.token)?),
        };
        let secrets = self
            .secret_store
            .unwrap_or_else(|| Arc::new(EnvSecretStore::new()));
        let audio = self
            .audio_session
            .unwrap_or_else(|| Arc::new(NoopAudioSession));
        let audio = AudioSessionGuard::acquire(audio)?;

        debug!(server_url = %self.config.server_url, "building session manager");
        Ok(SessionManager::from_parts(
            self.config,
            token_service,
            secrets,
            transports,
            audio,
        ))
    }
}

impl std::fmt::Debug for SessionManagerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManagerBuilder")
            .field("config", &self.config)
            .field("token_service", &self.token_service.is_some())
            .field("secret_store", &self.secret_store.is_some())
            .field("transport_factory", &self.transport_factory.is_some())
            .field("audio_session", &self.audio_session.is_some())
            .finish()
    }
}
