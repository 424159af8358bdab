//! Deadline and failure isolation for one handler chain.
//!
//! # Responsibilities
//! - Run the chain on a blocking worker, off the connection task
//! - Race completion, the deadline and handler panics
//! - Seal the response exactly once with the winning outcome
//!
//! # Design Decisions
//! - Cancellation is cooperative: on timeout the flag is raised and the
//!   worker is abandoned, never interrupted. Its remaining work is leaked
//!   until the handler returns on its own
//! - When the deadline and a finished worker are ready together, the
//!   deadline wins
//! - Panic payloads are logged with the request ID and never sent to the
//!   client

use std::future::Future;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::Response;
use tokio::task::JoinError;

use crate::pipeline::context::{CancelFlag, Context};

/// Body written when the deadline elapses first.
pub const TIMEOUT_BODY: &str = "timeout";

/// Body written when a handler panics.
pub const PANIC_BODY: &str = "panic";

/// Which signal won the race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    TimedOut,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::TimedOut => "timeout",
            Outcome::Failed => "panic",
        }
    }
}

/// Raises the timeout flag if the supervising future is dropped early,
/// e.g. when the client disconnects.
struct CancelOnDrop {
    flag: CancelFlag,
    armed: bool,
}

impl CancelOnDrop {
    fn new(flag: CancelFlag) -> Self {
        Self { flag, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.flag.set(true);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Supervisor {
    deadline: Duration,
}

impl Supervisor {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run `ctx.next()` under the deadline and return the single response.
    pub async fn run(&self, mut ctx: Context) -> (Outcome, Response) {
        let writer = ctx.response().clone();
        let flag = ctx.cancel_flag();
        let request_id = ctx.request_id().to_string();
        let mut guard = CancelOnDrop::new(flag.clone());

        let mut task = tokio::task::spawn_blocking(move || ctx.next());

        let outcome = match race(self.deadline, &mut task).await {
            None => Outcome::TimedOut,
            Some(Ok(())) => Outcome::Completed,
            Some(Err(err)) => {
                tracing::error!(
                    request_id = %request_id,
                    error = %panic_message(err),
                    "Handler chain failed"
                );
                Outcome::Failed
            }
        };
        guard.disarm();

        let response = match outcome {
            Outcome::Completed => writer.finish(),
            Outcome::TimedOut => {
                flag.set(true);
                tracing::warn!(
                    request_id = %request_id,
                    deadline_ms = self.deadline.as_millis() as u64,
                    "Request deadline elapsed, abandoning handler chain"
                );
                writer.fallback(StatusCode::GATEWAY_TIMEOUT, TIMEOUT_BODY)
            }
            Outcome::Failed => writer.fallback(StatusCode::INTERNAL_SERVER_ERROR, PANIC_BODY),
        };

        // Only this function seals the writer.
        let response = response.unwrap_or_else(|| {
            tracing::error!(request_id = %request_id, "Response sealed twice");
            Response::default()
        });
        (outcome, response)
    }
}

/// Wait for `task` or the deadline. `None` means the deadline fired first,
/// including when both are ready on the same poll.
async fn race<F>(deadline: Duration, task: F) -> Option<Result<(), JoinError>>
where
    F: Future<Output = Result<(), JoinError>>,
{
    tokio::select! {
        biased;
        _ = tokio::time::sleep(deadline) => None,
        joined = task => Some(joined),
    }
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string()),
        Err(err) => err.to_string(),
    }
}
