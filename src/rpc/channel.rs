//! Dialing a pcbook server.

use std::time::Duration;

use tonic::transport::{Channel, Endpoint, Error};
use tracing::{debug, info};

use crate::reliability::retry::{RetryConfig, is_transient_connect_error, retry_async};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens an HTTP/2 channel to `address` (`host:port` or a full URI),
/// retrying refused or reset connections per `retry`.
///
/// The returned channel is shared by every client built on it.
///
/// # Errors
///
/// Returns the transport error of the last attempt.
pub async fn connect(address: &str, retry: RetryConfig) -> Result<Channel, Error> {
    let uri = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };
    let endpoint = Endpoint::from_shared(uri)?.connect_timeout(CONNECT_TIMEOUT);

    debug!(%address, max_retries = retry.max_retries, "Connecting");
    let channel = retry_async(retry, || endpoint.connect(), |err: &Error| {
        is_transient_connect_error(err)
    })
    .await?;
    info!(%address, "Connected");
    Ok(channel)
}
