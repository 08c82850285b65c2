//! Device-wide audio session
//!
//! Mobile platforms require an app-level audio session (category, routing,
//! ducking) to be active before any track is published. Its lifetime is tied
//! to the session manager, not to a connection: it is started when the
//! manager is built and stopped when the manager is dropped.
//!
//! ```text
//! SessionManagerBuilder::build() ──► AudioSessionGuard::acquire() ──► start()
//!            │
//!   connect / disconnect cycles (audio session untouched)
//!            │
//! drop(SessionManager) ─────────────► drop(AudioSessionGuard) ──────► stop()
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ClientResult;

/// Platform audio session
pub trait AudioSession: Send + Sync {
    /// Activate the audio session
    fn start(&self) -> ClientResult<()>;

    /// Deactivate the audio session
    fn stop(&self) -> ClientResult<()>;
}

/// Audio session for platforms that need none
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAudioSession;

impl AudioSession for NoopAudioSession {
    fn start(&self) -> ClientResult<()> {
        Ok(())
    }

    fn stop(&self) -> ClientResult<()> {
        Ok(())
    }
}

/// Scoped activation of an [`AudioSession`]; stops it on drop
pub struct AudioSessionGuard {
    session: Arc<dyn AudioSession>,
}

impl AudioSessionGuard {
    /// Start `session` and hold it active until the guard is dropped
    pub fn acquire(session: Arc<dyn AudioSession>) -> ClientResult<Self> {
        session.start()?;
        debug!("audio session started");
        Ok(Self { session })
    }
}

impl std::fmt::Debug for AudioSessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSessionGuard").finish_non_exhaustive()
    }
}

impl Drop for AudioSessionGuard {
    fn drop(&mut self) {
        match self.session.stop() {
            Ok(()) => debug!("audio session stopped"),
            Err(e) => warn!(error = %e, "failed to stop audio session"),
        }
    }
}
