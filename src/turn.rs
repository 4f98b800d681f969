use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, ContentBlock, MessageList, Role, Run, RunStatus};
use crate::config::PollPolicy;

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("cannot run a turn on empty input")]
    EmptyInput,
    #[error("assistant run {run_id} ended as {status:?}: {reason}")]
    RunFailed {
        run_id: String,
        status: RunStatus,
        reason: String,
    },
    #[error("assistant run {run_id} did not finish within {elapsed:?}")]
    Timeout { run_id: String, elapsed: Duration },
    #[error("run completed but the thread holds no assistant reply")]
    MissingReply,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Execute one conversational turn: append the user text to the thread, start
/// a run, wait for it to finish, and return the refreshed message list.
///
/// The wait is bounded by `policy`: the run status is checked at least once,
/// then re-checked with exponentially growing delays until it reaches a
/// terminal status or the deadline elapses. Terminal statuses other than
/// `completed` are reported as [`TurnError::RunFailed`].
pub async fn run_turn(
    api: &ApiClient,
    policy: &PollPolicy,
    assistant_id: &str,
    thread_id: &str,
    text: &str,
) -> Result<MessageList, TurnError> {
    if text.trim().is_empty() {
        return Err(TurnError::EmptyInput);
    }

    api.create_message(thread_id, text).await?;
    let run = api.create_run(thread_id, assistant_id).await?;
    info!(run_id = %run.id, %thread_id, "run started");

    wait_for_run(api, policy, thread_id, &run.id).await?;

    let messages = api.list_messages(thread_id).await?;
    Ok(messages)
}

/// Poll the run until it reaches a terminal status or the deadline elapses.
async fn wait_for_run(
    api: &ApiClient,
    policy: &PollPolicy,
    thread_id: &str,
    run_id: &str,
) -> Result<(), TurnError> {
    let started = Instant::now();
    let mut interval = policy.initial_interval;

    loop {
        let run = api.retrieve_run(thread_id, run_id).await?;
        if run.status.is_terminal() {
            return if run.status.is_success() {
                debug!(%run_id, elapsed = ?started.elapsed(), "run completed");
                Ok(())
            } else {
                warn!(%run_id, status = ?run.status, "run ended without completing");
                Err(TurnError::RunFailed {
                    run_id: run_id.to_string(),
                    status: run.status,
                    reason: failure_reason(&run),
                })
            };
        }

        let elapsed = started.elapsed();
        if elapsed >= policy.deadline {
            warn!(%run_id, ?elapsed, "giving up on run");
            return Err(TurnError::Timeout {
                run_id: run_id.to_string(),
                elapsed,
            });
        }

        tokio::time::sleep(interval).await;
        interval = next_interval(interval, policy.max_interval);
    }
}

fn failure_reason(run: &Run) -> String {
    match &run.last_error {
        Some(err) => match &err.code {
            Some(code) => format!("{code}: {}", err.message),
            None => err.message.clone(),
        },
        None => "no error detail provided".to_string(),
    }
}

fn next_interval(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

/// Extract the reply shown in the chat: the first text block of the newest
/// assistant message. The service lists messages newest first.
pub fn latest_assistant_text(messages: &MessageList) -> Option<String> {
    messages
        .data
        .iter()
        .find(|message| message.role == Role::Assistant)
        .and_then(|message| {
            message.content.iter().find_map(|block| match block {
                ContentBlock::Text { text } => Some(text.value.clone()),
                ContentBlock::Other => None,
            })
        })
}
