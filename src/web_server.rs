use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    serve, Router,
};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::config::PollPolicy;
use crate::constants;
use crate::session::{SessionId, SessionManager};
use crate::turn::{latest_assistant_text, run_turn, TurnError};
use crate::{ChatRole, Transcript};

/// What a chat client sends over the WebSocket: one user submission.
#[derive(Debug, Deserialize)]
struct UserInput {
    text: String,
}

/// What the server sends back over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Message { role: ChatRole, content: String },
    Error { message: String },
}

// Shared application state
#[derive(Clone)]
pub struct AppState {
    templates: Arc<AutoReloader>,
    api: ApiClient,
    sessions: SessionManager,
    poll: PollPolicy,
}

impl AppState {
    pub fn new(api: ApiClient, sessions: SessionManager, poll: PollPolicy) -> Result<Self> {
        let templates = create_minijinja_env().context("Failed to initialize template engine")?;
        Ok(Self {
            templates: Arc::new(templates),
            api,
            sessions,
            poll,
        })
    }
}

// Minijinja Environment setup
fn create_minijinja_env() -> Result<AutoReloader> {
    // Use AutoReloader for development convenience
    let reloader = AutoReloader::new(|notifier| {
        let loader = path_loader("templates");
        let mut env = Environment::new();
        env.set_loader(loader);
        // Watch the templates directory for changes
        notifier.watch_path("templates", true);
        Ok(env)
    });
    Ok(reloader)
}

async fn index_handler(
    State(state): State<AppState>,
) -> Result<axum::response::Html<String>, axum::response::Html<String>> {
    // Acquire env, get template, and render within the same block
    state
        .templates
        .acquire_env()
        .and_then(|env| {
            env.get_template("index.html").and_then(|tmpl| {
                let context = minijinja::context! {
                    title => constants::PAGE_TITLE,
                    subheader => constants::PAGE_SUBHEADER,
                    placeholder => constants::INPUT_PLACEHOLDER,
                };
                tmpl.render(context)
            })
        })
        .map(axum::response::Html)
        .map_err(|e| {
            error!("Failed to get or render template: {}", e);
            axum::response::Html(format!("Internal Server Error: {}", e))
        })
}

// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    info!("WebSocket connection upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Run one conversational turn for the session and return the reply text.
async fn chat_turn(
    state: &AppState,
    session: SessionId,
    text: &str,
) -> Result<String, TurnError> {
    let handles = state.sessions.get_or_create(session).await?;
    let messages = run_turn(
        &state.api,
        &state.poll,
        &handles.assistant_id,
        &handles.thread_id,
        text,
    )
    .await?;
    latest_assistant_text(&messages).ok_or(TurnError::MissingReply)
}

async fn send_event(socket: &mut WebSocket, event: &ChatEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json_msg) => socket.send(Message::Text(json_msg)).await.is_ok(),
        Err(e) => {
            error!("Failed to serialize chat event: {}", e);
            false
        }
    }
}

// Handle one WebSocket connection: one socket is one chat session. Inputs are
// read off the socket one at a time, so turns never overlap within a session.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let session: SessionId = Uuid::new_v4();
    let mut transcript = Transcript::new();
    info!(%session, "new chat session");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let input: UserInput = match serde_json::from_str(&text) {
                    Ok(input) => input,
                    Err(e) => {
                        warn!(%session, "ignoring malformed client frame: {}", e);
                        continue;
                    }
                };

                match chat_turn(&state, session, &input.text).await {
                    Ok(reply) => {
                        // Mirror the thread order: user entry, then assistant.
                        transcript.push_user(input.text.clone());
                        transcript.push_assistant(reply.clone());

                        let user_event = ChatEvent::Message {
                            role: ChatRole::User,
                            content: input.text,
                        };
                        let assistant_event = ChatEvent::Message {
                            role: ChatRole::Assistant,
                            content: reply,
                        };
                        if !send_event(&mut socket, &user_event).await
                            || !send_event(&mut socket, &assistant_event).await
                        {
                            warn!(%session, "client went away mid-turn");
                            break;
                        }
                    }
                    Err(e) => {
                        error!(%session, "turn failed: {}", e);
                        let event = ChatEvent::Error {
                            message: e.to_string(),
                        };
                        if !send_event(&mut socket, &event).await {
                            break;
                        }
                    }
                }
            }
            Message::Binary(_) => {
                warn!(%session, "received unexpected binary message from client");
            }
            // Axum answers Pings automatically
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => {
                info!(%session, "client requested WebSocket close");
                break;
            }
        }
    }

    state.sessions.end_session(session).await;
    info!(%session, turns = transcript.len() / 2, "chat session closed");
}

/// Build the application router. Split out from [`start_web_server`] so tests
/// can drive the handlers without binding a port.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/ws", get(ws_handler))
        // Static assets live under /static so they don't shadow other routes.
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
        .layer(TraceLayer::new_for_http()) // Add request logging
}

pub async fn start_web_server(port: u16, state: AppState) -> Result<()> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
