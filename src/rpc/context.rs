//! Per-call deadline.
//!
//! A client sets a call timeout through `Request::set_timeout`, which tonic
//! sends as the `grpc-timeout` header. Handlers turn it back into a
//! deadline and check it between messages.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tonic::Status;
use tonic::metadata::MetadataMap;

const GRPC_TIMEOUT: &str = "grpc-timeout";

/// What a handler knows about the time left for its call.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
}

impl CallContext {
    /// A call without a deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the deadline from the request's `grpc-timeout` entry, if any.
    pub fn from_metadata(metadata: &MetadataMap) -> Self {
        let deadline = metadata
            .get(GRPC_TIMEOUT)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_grpc_timeout)
            .map(|timeout| Instant::now() + timeout);
        Self { deadline }
    }

    /// Sets the deadline to `timeout` from now.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `Err(DeadlineExceeded)` once the deadline has passed.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn check(&self) -> Result<(), Status> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(deadline_exceeded()),
            _ => Ok(()),
        }
    }

    /// Awaits `future`, giving up when the deadline passes first.
    ///
    /// # Errors
    ///
    /// `DeadlineExceeded` if the deadline wins.
    pub async fn within<F: Future>(&self, future: F) -> Result<F::Output, Status> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, future)
                .await
                .map_err(|_| deadline_exceeded()),
            None => Ok(future.await),
        }
    }
}

fn deadline_exceeded() -> Status {
    Status::deadline_exceeded("deadline is exceeded")
}

/// Parses `grpc-timeout`: up to 8 digits followed by one of `H M S m u n`.
fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if !value.is_ascii() || value.len() < 2 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;
    let timeout = match unit {
        "H" => Duration::from_secs(amount * 3600),
        "M" => Duration::from_secs(amount * 60),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(timeout)
}
