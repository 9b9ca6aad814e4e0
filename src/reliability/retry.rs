//! Backoff for dialing a server that may not be listening yet.
//!
//! `pcbook client` is often started next to `pcbook serve`. The first dial
//! can land before the listener is bound, so [`rpc::connect`] retries
//! refused and reset connections with jittered exponential backoff
//! (via `backon`). Permanent failures such as a bad address or a denied
//! socket are returned at once.
//!
//! [`rpc::connect`]: crate::rpc::connect

use backon::{ExponentialBuilder, Retryable};
use std::error::Error;
use std::future::Future;
use std::io;
use std::time::Duration;
use tracing::{debug, warn};

/// How persistently to dial.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Dials after the first failed one.
    pub max_retries: u32,
    /// Wait before the second dial.
    pub initial_delay: Duration,
    /// Cap on the wait between dials.
    pub max_delay: Duration,
    /// Growth of the wait per failed dial.
    pub factor: f32,
}

impl RetryConfig {
    /// Dial once and report the first failure.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::network()
        }
    }

    /// Three redials starting at 100 ms, waits capped at 5 s.
    #[must_use]
    pub fn network() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            factor: 2.0,
        }
    }

    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries as usize)
            .with_factor(self.factor)
            .with_jitter()
    }
}

/// Runs `dial` until it succeeds, `is_retryable` rejects its error, or the
/// retries run out. Returns the last error in the latter two cases.
pub async fn retry_async<F, Fut, T, E, R>(
    config: RetryConfig,
    dial: F,
    is_retryable: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let max_retries = config.max_retries;
    let mut failed = 0u32;

    dial.retry(config.backoff())
        .when(move |e| is_retryable(e))
        .notify(|err: &E, wait: Duration| {
            failed += 1;
            warn!(
                failed,
                max_retries,
                wait_ms = wait.as_millis() as u64,
                error = %err,
                "Dial failed, retrying"
            );
        })
        .await
}

/// Whether a failed dial is worth repeating.
///
/// The error's source chain is searched for the underlying I/O error and
/// that error decides. A chain without one (a TLS or HTTP/2 handshake
/// failure on a half-started server) counts as transient.
pub fn is_transient_connect_error(error: &(dyn Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            return is_transient_io_error(io_err);
        }
        current = err.source();
    }
    true
}

/// Refused, reset and aborted connections and timeouts are transient.
pub fn is_transient_io_error(error: &io::Error) -> bool {
    let transient = matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::TimedOut
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    );
    if transient {
        debug!(kind = ?error.kind(), "Transient dial error");
    }
    transient
}
