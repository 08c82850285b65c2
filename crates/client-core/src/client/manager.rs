//! Session manager
//!
//! [`SessionManager`] owns the lifecycle of one real-time conversation:
//! credential lookup, token acquisition, transport setup, event reconciliation
//! and teardown.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │          UI layer            │  snapshot() / watch() / subscribe()
//! └──────────────┬───────────────┘
//!                │ connect / disconnect / toggle_microphone / send_message
//! ┌──────────────▼───────────────┐
//! │        SessionManager        │
//! │  SessionState (single owner) │◄──── event pump (one per session)
//! └──────┬─────────┬─────────┬───┘                 ▲
//!        │         │         │                     │ TransportEvent
//!  SecretStore TokenService TransportFactory ──► Transport
//! ```
//!
//! State lives in one [`SessionState`] behind a mutex that is never held
//! across an `.await`. Each connect attempt gets a generation number; events
//! from an older transport are dropped by the pump.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::audio::AudioSessionGuard;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::events::ClientEvent;
use crate::secret::SecretStore;
use crate::session::{encode_chat_message, ConversationMessage, SessionSnapshot, SessionState};
use crate::token::{SessionGrant, TokenService};
use crate::transport::{
    ConnectionState, RemoteParticipant, Transport, TransportEvent, TransportEventReceiver,
    TransportFactory,
};

/// Live transport plus the task draining its events
struct ActiveSession {
    generation: u64,
    room_name: String,
    transport: Arc<dyn Transport>,
    pump: JoinHandle<()>,
}

#[derive(Default)]
struct SessionSlot {
    active: Option<ActiveSession>,
    cancel_requested: bool,
}

struct Inner {
    config: ClientConfig,
    token_service: Arc<dyn TokenService>,
    secrets: Arc<dyn SecretStore>,
    transports: Arc<dyn TransportFactory>,
    // Lock order: slot, then state.
    slot: Mutex<SessionSlot>,
    state: Mutex<SessionState>,
    generation: AtomicU64,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    event_tx: broadcast::Sender<ClientEvent>,
}

/// How a connect attempt ended once the transport was up
enum Commit {
    Done,
    Cancelled,
    Lost,
}

impl Inner {
    fn publish(&self, state: &SessionState, events: Vec<ClientEvent>) {
        if events.is_empty() {
            return;
        }
        self.snapshot_tx.send_replace(state.snapshot());
        for event in events {
            // No subscribers is fine.
            let _ = self.event_tx.send(event);
        }
    }

    fn notify(&self, error: &ClientError) {
        if error.is_user_visible() {
            let _ = self.event_tx.send(ClientEvent::Error {
                error: error.clone(),
            });
        }
    }

    /// Apply an event if it belongs to the current session generation and
    /// report whether the pump should keep running.
    ///
    /// A `Disconnected` event also retires the generation and frees the
    /// session slot before the new snapshot is published, so an observer of
    /// the disconnected state can connect again right away.
    fn apply_transport_event(&self, generation: u64, event: TransportEvent) -> bool {
        let is_disconnect = matches!(event, TransportEvent::Disconnected { .. });
        let mut slot = self.slot.lock();
        let mut state = self.state.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            trace!(generation, event = event.name(), "dropping event from stale transport");
            return false;
        }
        let events = state.apply(event);

        if is_disconnect {
            self.generation.fetch_add(1, Ordering::SeqCst);
            if slot.active.as_ref().map(|a| a.generation) == Some(generation) {
                if let Some(active) = slot.active.take() {
                    info!(room = %active.room_name, "session released after transport disconnect");
                }
            }
        }

        self.publish(&state, events);
        !is_disconnect
    }

    /// Stop accepting events from `generation` and stop its pump
    fn abandon(&self, generation: u64, pump: Option<JoinHandle<()>>) {
        {
            let _state = self.state.lock();
            if self.generation.load(Ordering::SeqCst) == generation {
                self.generation.fetch_add(1, Ordering::SeqCst);
            }
        }
        if let Some(pump) = pump {
            pump.abort();
        }
    }
}

async fn run_event_pump(inner: Weak<Inner>, generation: u64, mut events: TransportEventReceiver) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if !inner.apply_transport_event(generation, event) {
            break;
        }
    }
    debug!(generation, "transport event pump stopped");
}

async fn teardown(transport: &Arc<dyn Transport>, why: &str) {
    if let Err(e) = transport.disconnect().await {
        warn!(error = %e, why, "transport teardown failed");
    }
}

/// An in-flight connect.
///
/// Until [`ConnectAttempt::settle`] is called, dropping the attempt (its
/// `connect` future was cancelled or it failed) clears the connecting flag,
/// retires the attempt's generation and tears down every transport it owns.
struct ConnectAttempt {
    inner: Arc<Inner>,
    generation: Option<u64>,
    pump: Option<JoinHandle<()>>,
    transport: Option<Arc<dyn Transport>>,
    stale: Option<Arc<dyn Transport>>,
    settled: bool,
}

impl ConnectAttempt {
    fn new(inner: Arc<Inner>, stale: Option<Arc<dyn Transport>>) -> Self {
        Self {
            inner,
            generation: None,
            pump: None,
            transport: None,
            stale,
            settled: false,
        }
    }

    /// The attempt became the active session; nothing is left to undo
    fn settle(&mut self) {
        self.settled = true;
        self.transport = None;
    }

    /// Stop the attempt's events and return the session to `Disconnected`
    fn release(&mut self) {
        if self.settled {
            return;
        }
        self.settled = true;
        if let Some(generation) = self.generation {
            self.inner.abandon(generation, self.pump.take());
        }
        let mut slot = self.inner.slot.lock();
        slot.cancel_requested = false;
        let mut state = self.inner.state.lock();
        let events = state.fail_connect();
        self.inner.publish(&state, events);
    }

    /// Disconnect the session this attempt replaces
    async fn retire_stale(&mut self) {
        if let Some(stale) = self.stale.clone() {
            teardown(&stale, "replacing dead session").await;
            self.stale = None;
        }
    }

    /// Roll back a failed attempt, waiting for transport teardown
    async fn roll_back(mut self, why: &str) {
        self.release();
        self.retire_stale().await;
        if let Some(transport) = self.transport.clone() {
            teardown(&transport, why).await;
            self.transport = None;
        }
    }
}

impl Drop for ConnectAttempt {
    fn drop(&mut self) {
        self.release();
        let leftovers: Vec<_> = self.stale.take().into_iter().chain(self.transport.take()).collect();
        if leftovers.is_empty() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(transports = leftovers.len(), "connect abandoned; tearing down");
                handle.spawn(async move {
                    for transport in &leftovers {
                        teardown(transport, "connect abandoned").await;
                    }
                });
            }
            Err(_) => {
                warn!("connect abandoned outside a runtime; transport not disconnected");
            }
        }
    }
}

/// Orchestrates one real-time conversation session.
///
/// The session is reusable: after reaching `Disconnected` a new `connect`
/// may begin. Dropping the manager disconnects any live transport and
/// releases the audio session.
pub struct SessionManager {
    inner: Arc<Inner>,
    _audio: AudioSessionGuard,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("server_url", &self.inner.config.server_url)
            .field("connection_state", &self.connection_state())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub(crate) fn from_parts(
        config: ClientConfig,
        token_service: Arc<dyn TokenService>,
        secrets: Arc<dyn SecretStore>,
        transports: Arc<dyn TransportFactory>,
        audio: AudioSessionGuard,
    ) -> Self {
        let state = SessionState::new(config.agent_marker.clone());
        let (snapshot_tx, _) = watch::channel(state.snapshot());
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);

        Self {
            inner: Arc::new(Inner {
                config,
                token_service,
                secrets,
                transports,
                slot: Mutex::new(SessionSlot::default()),
                state: Mutex::new(state),
                generation: AtomicU64::new(0),
                snapshot_tx,
                event_tx,
            }),
            _audio: audio,
        }
    }

    // ── actions ──────────────────────────────────────────────────────

    /// Start a session for `scenario_id`.
    ///
    /// Any failure rolls the session back to `Disconnected`, is broadcast as
    /// [`ClientEvent::Error`] and is returned. Calling `connect` while a
    /// connect is in flight or a session is connecting, connected or
    /// reconnecting fails with [`ClientError::SessionBusy`] and leaves the
    /// current session alone. A session whose transport already reported
    /// `Failed` or `Disconnected` is torn down and replaced.
    ///
    /// Dropping the returned future before it completes rolls the attempt
    /// back as if it had failed.
    #[instrument(skip(self))]
    pub async fn connect(&self, scenario_id: u64) -> ClientResult<()> {
        let stale = {
            let mut slot = self.inner.slot.lock();
            let mut state = self.inner.state.lock();
            let live = matches!(
                state.connection_state(),
                ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Reconnecting
            );
            if state.is_connecting() || live {
                let busy = ClientError::SessionBusy {
                    state: if state.is_connecting() {
                        "connecting".to_string()
                    } else {
                        state.connection_state().to_string()
                    },
                };
                drop(state);
                drop(slot);
                warn!("connect rejected: session busy");
                self.inner.notify(&busy);
                return Err(busy);
            }

            slot.cancel_requested = false;
            let mut events = Vec::new();
            let stale = slot.active.take().map(|active| {
                if self.inner.generation.load(Ordering::SeqCst) == active.generation {
                    self.inner.generation.fetch_add(1, Ordering::SeqCst);
                }
                active.pump.abort();
                info!(
                    room = %active.room_name,
                    state = %state.connection_state(),
                    "discarding dead session before reconnect"
                );
                events.extend(state.fail_connect());
                active.transport
            });
            events.extend(state.begin_connect());
            self.inner.publish(&state, events);
            stale
        };

        let mut attempt = ConnectAttempt::new(self.inner.clone(), stale);
        attempt.retire_stale().await;

        match self.establish(scenario_id, &mut attempt).await {
            Ok(room) => {
                info!(room = %room, "connect completed");
                Ok(())
            }
            Err(e) => {
                attempt.roll_back("connect failed").await;
                if e == ClientError::ConnectAborted {
                    info!("connect aborted by disconnect");
                } else {
                    error!(error = %e, category = e.category(), "connect failed");
                    self.inner.notify(&e);
                }
                Err(e)
            }
        }
    }

    async fn establish(&self, scenario_id: u64, attempt: &mut ConnectAttempt) -> ClientResult<String> {
        let credential = self
            .inner
            .secrets
            .access_credential()
            .await?
            .ok_or(ClientError::AuthenticationRequired)?;

        let grant = self.request_grant(&credential, scenario_id).await?;
        debug!(room = %grant.room_name, "session grant received");

        // Handlers are live before the transport starts connecting.
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let transport = self.inner.transports.create(event_tx);
        attempt.generation = Some(generation);
        attempt.transport = Some(transport.clone());
        attempt.pump = Some(tokio::spawn(run_event_pump(
            Arc::downgrade(&self.inner),
            generation,
            event_rx,
        )));

        transport
            .connect(&self.inner.config.server_url, &grant.token)
            .await
            .map_err(|e| match e {
                ClientError::TransportConnectFailed { .. } => e,
                other => ClientError::connect_failed(other.to_string()),
            })?;

        let microphone_on = match transport.set_microphone_enabled(true).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to enable microphone after connect");
                false
            }
        };
        let remote = transport.remote_participants();
        let local_identity = transport.local_identity();

        match self.commit(attempt, generation, &grant, &transport, microphone_on, &remote, local_identity) {
            Commit::Done => Ok(grant.room_name),
            Commit::Cancelled => Err(ClientError::ConnectAborted),
            Commit::Lost => Err(ClientError::connect_failed("transport disconnected during setup")),
        }
    }

    async fn request_grant(&self, credential: &str, scenario_id: u64) -> ClientResult<SessionGrant> {
        let response = self
            .inner
            .token_service
            .request_session(credential, scenario_id)
            .await
            .map_err(|e| match e {
                ClientError::SessionSetupFailed { .. } | ClientError::AuthenticationRequired => e,
                other => ClientError::setup_failed(other.to_string()),
            })?;
        response.into_grant()
    }

    #[allow(clippy::too_many_arguments)]
    fn commit(
        &self,
        attempt: &mut ConnectAttempt,
        generation: u64,
        grant: &SessionGrant,
        transport: &Arc<dyn Transport>,
        microphone_on: bool,
        remote: &[RemoteParticipant],
        local_identity: Option<String>,
    ) -> Commit {
        let mut slot = self.inner.slot.lock();
        if slot.cancel_requested {
            return Commit::Cancelled;
        }
        let mut state = self.inner.state.lock();
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            return Commit::Lost;
        }
        let Some(pump) = attempt.pump.take() else {
            return Commit::Lost;
        };
        attempt.settle();

        let mut events = state.complete_connect(&grant.room_name, local_identity, remote);
        if !microphone_on {
            events.extend(state.set_microphone_enabled(false));
        }
        self.inner.publish(&state, events);

        slot.active = Some(ActiveSession {
            generation,
            room_name: grant.room_name.clone(),
            transport: transport.clone(),
            pump,
        });
        Commit::Done
    }

    /// End the session.
    ///
    /// State is cleared before the transport is torn down, so it is cleared
    /// even if teardown fails or this future is dropped; a teardown error is
    /// still returned. While a connect is in flight, the request is remembered
    /// and the transport is torn down as soon as that connect lands. After the
    /// transport itself reported a disconnect, this clears the retained log.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) -> ClientResult<()> {
        let active = {
            let mut slot = self.inner.slot.lock();
            let mut state = self.inner.state.lock();
            match slot.active.take() {
                Some(active) => {
                    if self.inner.generation.load(Ordering::SeqCst) == active.generation {
                        self.inner.generation.fetch_add(1, Ordering::SeqCst);
                    }
                    let events = state.reset();
                    self.inner.publish(&state, events);
                    active
                }
                None => {
                    if state.is_connecting() {
                        debug!("disconnect requested during connect; cancelling");
                        slot.cancel_requested = true;
                    } else if state.connection_state() != ConnectionState::Disconnected
                        || !state.messages().is_empty()
                    {
                        // The transport already went away; clear what it left behind.
                        let events = state.reset();
                        self.inner.publish(&state, events);
                    }
                    return Ok(());
                }
            }
        };

        self.inner.abandon(active.generation, Some(active.pump));
        let result = active.transport.disconnect().await;
        info!(room = %active.room_name, "session disconnected");

        result.map_err(|e| match e {
            ClientError::TransportError { .. } => e,
            other => ClientError::transport("disconnect", other.to_string()),
        })
    }

    /// Flip the microphone and return the new state.
    ///
    /// The new state is committed only after the transport accepts it. Without
    /// a live session this is a no-op returning the current state.
    pub async fn toggle_microphone(&self) -> ClientResult<bool> {
        let Some(transport) = self.active_transport() else {
            return Ok(self.microphone_enabled());
        };
        let target = !self.microphone_enabled();

        transport
            .set_microphone_enabled(target)
            .await
            .map_err(|e| match e {
                ClientError::TransportError { .. } => e,
                other => ClientError::transport("set_microphone_enabled", other.to_string()),
            })?;

        let mut state = self.inner.state.lock();
        let events = state.set_microphone_enabled(target);
        self.inner.publish(&state, events);
        debug!(enabled = target, "microphone toggled");
        Ok(target)
    }

    /// Send chat text to the room and append it to the log as a local message.
    ///
    /// Blank text, or no live session, is a no-op. The local entry is added
    /// only after the transport accepted the payload.
    pub async fn send_message(&self, text: &str) -> ClientResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let Some(transport) = self.active_transport() else {
            debug!("send_message without a session; ignoring");
            return Ok(());
        };

        let payload = encode_chat_message(text)?;
        transport
            .publish_data(payload, true)
            .await
            .map_err(|e| match e {
                ClientError::TransportError { .. } => e,
                other => ClientError::transport("publish_data", other.to_string()),
            })?;

        let mut state = self.inner.state.lock();
        let events = state.push_local_chat(text);
        self.inner.publish(&state, events);
        Ok(())
    }

    /// Disconnect and drop the manager
    pub async fn shutdown(self) -> ClientResult<()> {
        self.disconnect().await
    }

    fn active_transport(&self) -> Option<Arc<dyn Transport>> {
        self.inner
            .slot
            .lock()
            .active
            .as_ref()
            .map(|a| a.transport.clone())
    }

    // ── observation ──────────────────────────────────────────────────

    /// Current state of the session
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.lock().snapshot()
    }

    /// Receiver that always holds the latest snapshot
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Stream of change events
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state.lock().connection_state()
    }

    pub fn is_connecting(&self) -> bool {
        self.inner.state.lock().is_connecting()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().is_connected()
    }

    pub fn agent_identity(&self) -> Option<String> {
        self.inner.state.lock().agent_identity().map(str::to_string)
    }

    pub fn is_agent_connected(&self) -> bool {
        self.inner.state.lock().agent_identity().is_some()
    }

    pub fn microphone_enabled(&self) -> bool {
        self.inner.state.lock().microphone_enabled()
    }

    pub fn participants(&self) -> Vec<String> {
        self.inner.state.lock().participants().to_vec()
    }

    pub fn messages(&self) -> Vec<ConversationMessage> {
        self.inner.state.lock().messages().entries().to_vec()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        let Some(active) = self.inner.slot.lock().active.take() else {
            return;
        };
        self.inner.abandon(active.generation, Some(active.pump));

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                info!(room = %active.room_name, "manager dropped with a live session; disconnecting");
                let transport = active.transport;
                handle.spawn(async move {
                    teardown(&transport, "manager dropped").await;
                });
            }
            Err(_) => {
                warn!(room = %active.room_name, "manager dropped outside a runtime; transport not disconnected");
            }
        }
    }
}
