use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::{ApiClient, ApiError};
use crate::constants;

/// Identity of one browser chat session. One WebSocket connection mints one.
pub type SessionId = Uuid;

/// The persona created on the remote service for each session.
#[derive(Debug, Clone)]
pub struct Persona {
    pub name: String,
    pub instructions: String,
    pub model: String,
}

impl Persona {
    pub fn healthcare(model: impl Into<String>) -> Self {
        Self {
            name: constants::ASSISTANT_NAME.to_string(),
            instructions: constants::ASSISTANT_INSTRUCTIONS.to_string(),
            model: model.into(),
        }
    }
}

/// The pair of remote handles a session needs to run turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandles {
    pub assistant_id: String,
    pub thread_id: String,
}

/// Creates and caches remote assistant/thread handles, keyed by session
/// identity so concurrent sessions never share a conversation.
#[derive(Debug, Clone)]
pub struct SessionManager {
    api: ApiClient,
    persona: Persona,
    sessions: Arc<Mutex<HashMap<SessionId, SessionHandles>>>,
}

impl SessionManager {
    pub fn new(api: ApiClient, persona: Persona) -> Self {
        Self {
            api,
            persona,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Return the session's remote handles, creating the assistant and thread
    /// on first use. Creation failures are returned and nothing is cached, so
    /// the next call retries from scratch.
    ///
    /// The cache lock is held across the remote calls on purpose: it keeps a
    /// session from ever creating its handles twice.
    pub async fn get_or_create(&self, session: SessionId) -> Result<SessionHandles, ApiError> {
        let mut sessions = self.sessions.lock().await;
        if let Some(handles) = sessions.get(&session) {
            debug!(%session, "reusing cached session handles");
            return Ok(handles.clone());
        }

        let assistant = self
            .api
            .create_assistant(
                &self.persona.name,
                &self.persona.instructions,
                &self.persona.model,
            )
            .await?;
        let thread = self.api.create_thread().await?;

        let handles = SessionHandles {
            assistant_id: assistant.id,
            thread_id: thread.id,
        };
        info!(
            %session,
            assistant_id = %handles.assistant_id,
            thread_id = %handles.thread_id,
            "session bootstrapped"
        );
        sessions.insert(session, handles.clone());
        Ok(handles)
    }

    /// Drop the cached handles for a finished session. The remote records are
    /// left to the service's own retention; only the local cache entry goes.
    pub async fn end_session(&self, session: SessionId) {
        let removed = self.sessions.lock().await.remove(&session);
        if removed.is_some() {
            debug!(%session, "session ended");
        }
    }
}
