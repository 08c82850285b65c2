//! In-memory collaborators for driving a `SessionManager` in tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{watch, Notify};

use voco_client_core::{
    ClientConfig, ClientError, ClientResult, MemorySecretStore, RemoteParticipant, SessionManager,
    SessionManagerBuilder, SessionSnapshot, TokenResponse, TokenService, Transport,
    TransportEvent, TransportEventSender, TransportFactory,
};

/// Upper bound for anything a test waits on
pub const WAIT: Duration = Duration::from_secs(2);

/// Route library logs to the test output; `RUST_LOG` selects what is shown
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Token service returning a canned response
pub struct MockTokenService {
    response: Mutex<ClientResult<TokenResponse>>,
    pub requests: Mutex<Vec<(String, u64)>>,
}

impl MockTokenService {
    pub fn granting(room: &str) -> Arc<Self> {
        Self::responding(Ok(TokenResponse::success("jwt-token", room)))
    }

    pub fn responding(response: ClientResult<TokenResponse>) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(response),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl TokenService for MockTokenService {
    async fn request_session(&self, credential: &str, scenario_id: u64) -> ClientResult<TokenResponse> {
        self.requests.lock().push((credential.to_string(), scenario_id));
        self.response.lock().clone()
    }
}

/// Knobs shared by every transport a factory creates
#[derive(Default)]
pub struct TransportBehavior {
    pub remote: Mutex<Vec<RemoteParticipant>>,
    pub local_identity: Mutex<Option<String>>,
    pub connect_error: Mutex<Option<ClientError>>,
    pub disconnect_error: Mutex<Option<ClientError>>,
    pub fail_microphone: AtomicBool,
    pub fail_publish: AtomicBool,
    /// When set, `connect` parks until the gate is notified
    pub connect_gate: Mutex<Option<Arc<Notify>>>,
    pub connect_entered: Notify,
}

/// Transport that records every call
pub struct MockTransport {
    events: TransportEventSender,
    behavior: Arc<TransportBehavior>,
    pub connects: Mutex<Vec<(String, String)>>,
    pub disconnects: AtomicUsize,
    pub microphone_calls: Mutex<Vec<bool>>,
    pub published: Mutex<Vec<(Vec<u8>, bool)>>,
}

impl MockTransport {
    /// Deliver an event as the SDK would
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, url: &str, token: &str) -> ClientResult<()> {
        self.connects.lock().push((url.to_string(), token.to_string()));
        self.behavior.connect_entered.notify_one();

        let gate = self.behavior.connect_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match self.behavior.connect_error.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn disconnect(&self) -> ClientResult<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        match self.behavior.disconnect_error.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn set_microphone_enabled(&self, enabled: bool) -> ClientResult<()> {
        self.microphone_calls.lock().push(enabled);
        if self.behavior.fail_microphone.load(Ordering::SeqCst) {
            return Err(ClientError::transport("set_microphone_enabled", "device busy"));
        }
        Ok(())
    }

    async fn publish_data(&self, payload: Vec<u8>, reliable: bool) -> ClientResult<()> {
        if self.behavior.fail_publish.load(Ordering::SeqCst) {
            return Err(ClientError::transport("publish_data", "data channel closed"));
        }
        self.published.lock().push((payload, reliable));
        Ok(())
    }

    fn remote_participants(&self) -> Vec<RemoteParticipant> {
        self.behavior.remote.lock().clone()
    }

    fn local_identity(&self) -> Option<String> {
        self.behavior.local_identity.lock().clone()
    }
}

/// Factory keeping a handle to every transport it created
#[derive(Default)]
pub struct MockTransportFactory {
    pub behavior: Arc<TransportBehavior>,
    created: Mutex<Vec<Arc<MockTransport>>>,
}

impl MockTransportFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_remote(identities: &[&str]) -> Arc<Self> {
        let factory = Self::default();
        *factory.behavior.remote.lock() =
            identities.iter().map(|i| RemoteParticipant::new(*i)).collect();
        *factory.behavior.local_identity.lock() = Some("user-1".to_string());
        Arc::new(factory)
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }

    /// Most recently created transport
    pub fn last(&self) -> Arc<MockTransport> {
        self.created
            .lock()
            .last()
            .cloned()
            .expect("no transport was created")
    }
}

impl TransportFactory for MockTransportFactory {
    fn create(&self, events: TransportEventSender) -> Arc<dyn Transport> {
        let transport = Arc::new(MockTransport {
            events,
            behavior: self.behavior.clone(),
            connects: Mutex::new(Vec::new()),
            disconnects: AtomicUsize::new(0),
            microphone_calls: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
        });
        self.created.lock().push(transport.clone());
        transport
    }
}

/// Everything a test needs to drive and inspect one manager
pub struct Harness {
    pub manager: SessionManager,
    pub tokens: Arc<MockTokenService>,
    pub secrets: Arc<MemorySecretStore>,
    pub transports: Arc<MockTransportFactory>,
}

impl Harness {
    pub fn new(tokens: Arc<MockTokenService>, transports: Arc<MockTransportFactory>) -> Self {
        Self::with_secrets(
            Arc::new(MemorySecretStore::with_credential("access-123")),
            tokens,
            transports,
        )
    }

    pub fn with_secrets(
        secrets: Arc<MemorySecretStore>,
        tokens: Arc<MockTokenService>,
        transports: Arc<MockTransportFactory>,
    ) -> Self {
        init_tracing();
        let manager = SessionManagerBuilder::new()
            .config(ClientConfig::new().with_server_url("wss://rtc.test"))
            .token_service(tokens.clone())
            .secret_store(secrets.clone())
            .transport_factory(transports.clone())
            .build()
            .expect("manager builds");

        Self {
            manager,
            tokens,
            secrets,
            transports,
        }
    }

    /// Harness that connects to `room` with the given remote participants
    pub fn connected_to(room: &str, remote: &[&str]) -> Self {
        Self::new(
            MockTokenService::granting(room),
            MockTransportFactory::with_remote(remote),
        )
    }
}

/// Wait until the snapshot satisfies `predicate`
pub async fn wait_for_snapshot(
    rx: &mut watch::Receiver<SessionSnapshot>,
    predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for snapshot")
        .expect("snapshot channel closed")
        .clone()
}
