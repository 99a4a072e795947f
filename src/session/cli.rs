//! Interactive `sqlcmd` sessions.
//!
//! Opening a session asks the administration service to launch a terminal
//! against a database, then polls its readiness endpoint in a background task.
//! Session state lives in a `watch` channel per container so views can follow
//! transitions without holding a reference to the manager.

use super::{PollConfig, PollOutcome, SessionError, SessionPoller};
use crate::admin::AdminService;
use crate::model::{ConnectionInfo, SqlContainer};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Interactive session state of one container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Closed,
    Opening,
    Ready,
    /// Readiness never confirmed within the polling budget
    Unavailable,
}

impl SessionState {
    /// Opening or Ready: a new open would be rejected.
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Opening | SessionState::Ready)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Closed => write!(f, "closed"),
            SessionState::Opening => write!(f, "opening"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Snapshot of a container's current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub container_id: String,
    pub database: String,
    pub state: SessionState,
    pub opened_at: DateTime<Utc>,
}

struct ActiveSession {
    connection: ConnectionInfo,
    cancel: CancellationToken,
    generation: u64,
    opened_at: DateTime<Utc>,
}

struct SessionSlot {
    state: Arc<watch::Sender<SessionState>>,
    active: Option<ActiveSession>,
    generation: u64,
}

impl SessionSlot {
    fn new() -> Self {
        Self {
            state: Arc::new(watch::Sender::new(SessionState::Closed)),
            active: None,
            generation: 0,
        }
    }

    fn current(&self) -> SessionState {
        *self.state.borrow()
    }
}

/// Opens and closes interactive sessions, one per container.
pub struct CliSessionManager {
    admin: Arc<dyn AdminService>,
    poller: SessionPoller,
    sessions: Arc<DashMap<String, SessionSlot>>,
}

impl CliSessionManager {
    pub fn new(admin: Arc<dyn AdminService>, poll: PollConfig) -> Self {
        Self {
            admin,
            poller: SessionPoller::new(poll),
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Start a session on `database` and begin polling for readiness.
    ///
    /// Returns once the administration service accepted the request; the state
    /// moves on to `Ready` or `Unavailable` in the background.
    ///
    /// # Errors
    ///
    /// - [`SessionError::AlreadyOpen`] while the container's session is opening or ready
    /// - [`SessionError::StartFailed`] if the service rejected the request; the state returns to `Closed`
    pub async fn open(&self, container: &SqlContainer, database: &str) -> Result<(), SessionError> {
        let id = container.id.clone();
        let connection = container.connection_info(database);

        let (state, cancel, generation) = {
            let mut slot = self.sessions.entry(id.clone()).or_insert_with(SessionSlot::new);
            if slot.current().is_active() {
                return Err(SessionError::AlreadyOpen(id));
            }
            if let Some(previous) = slot.active.take() {
                previous.cancel.cancel();
            }

            slot.generation += 1;
            let cancel = CancellationToken::new();
            let generation = slot.generation;
            slot.active = Some(ActiveSession {
                connection: connection.clone(),
                cancel: cancel.clone(),
                generation,
                opened_at: Utc::now(),
            });
            slot.state.send_replace(SessionState::Opening);
            (slot.state.clone(), cancel, generation)
        };

        info!("Opening session for container {} on database {}", id, database);

        if let Err(e) = self.admin.start_connection(&connection).await {
            warn!("Failed to start session for container {}: {}", id, e);
            if let Some(mut slot) = self.sessions.get_mut(&id)
                && slot.active.as_ref().is_some_and(|a| a.generation == generation)
            {
                slot.active = None;
                slot.state.send_replace(SessionState::Closed);
            }
            return Err(SessionError::StartFailed(e));
        }

        if cancel.is_cancelled() {
            debug!("Session for container {} closed while starting", id);
            return Ok(());
        }

        let admin = self.admin.clone();
        let handle = self.poller.spawn_linked(
            move || {
                let admin = admin.clone();
                async move { admin.ready().await.map(|ready| ready.then_some(())) }
            },
            &cancel,
        );

        tokio::spawn(async move {
            let next = match handle.outcome().await {
                PollOutcome::Ready(()) => SessionState::Ready,
                PollOutcome::TimedOut => SessionState::Unavailable,
                PollOutcome::Cancelled => return,
            };

            let applied = state.send_if_modified(|current| {
                if cancel.is_cancelled() || *current != SessionState::Opening {
                    return false;
                }
                *current = next;
                true
            });
            if applied {
                info!("Session for container {} is {}", id, next);
            }
        });

        Ok(())
    }

    /// Stop the container's session from any state, cancelling a pending poll.
    ///
    /// A container without a session is a no-op.
    pub async fn close(&self, container_id: &str) -> Result<(), SessionError> {
        let active = match self.sessions.get_mut(container_id) {
            Some(mut slot) => {
                let active = slot.active.take();
                if let Some(active) = &active {
                    active.cancel.cancel();
                }
                slot.state.send_replace(SessionState::Closed);
                active
            }
            None => None,
        };

        let Some(active) = active else {
            debug!("No session to close for container {}", container_id);
            return Ok(());
        };

        info!("Closing session for container {}", container_id);
        self.admin
            .stop_connection(&active.connection.without_database())
            .await
            .map_err(SessionError::StopFailed)
    }

    /// Close every session that was opened, logging failures.
    pub async fn close_all(&self) {
        let ids: Vec<String> = self
            .sessions
            .iter()
            .filter(|slot| slot.active.is_some())
            .map(|slot| slot.key().clone())
            .collect();

        for id in ids {
            if let Err(e) = self.close(&id).await {
                warn!("Failed to close session for container {}: {}", id, e);
            }
        }
    }

    pub fn state(&self, container_id: &str) -> SessionState {
        self.sessions
            .get(container_id)
            .map(|slot| slot.current())
            .unwrap_or_default()
    }

    pub fn session(&self, container_id: &str) -> Option<SessionInfo> {
        let slot = self.sessions.get(container_id)?;
        let active = slot.active.as_ref()?;
        Some(SessionInfo {
            container_id: container_id.to_string(),
            database: active.connection.database_name.clone().unwrap_or_default(),
            state: slot.current(),
            opened_at: active.opened_at,
        })
    }

    /// Follow the container's state transitions.
    pub fn subscribe(&self, container_id: &str) -> watch::Receiver<SessionState> {
        self.sessions
            .entry(container_id.to_string())
            .or_insert_with(SessionSlot::new)
            .state
            .subscribe()
    }

    /// Wait until the container's session is no longer `Opening`.
    pub async fn wait_settled(&self, container_id: &str) -> SessionState {
        let mut receiver = self.subscribe(container_id);
        match receiver.wait_for(|state| *state != SessionState::Opening).await {
            Ok(state) => *state,
            Err(_) => SessionState::Closed,
        }
    }

    /// Forget the slot of a container that no longer exists.
    pub fn forget(&self, container_id: &str) {
        if let Some((_, slot)) = self.sessions.remove(container_id)
            && let Some(active) = slot.active
        {
            active.cancel.cancel();
        }
    }
}
