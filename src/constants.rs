//! Shared constants for the pcbook server and client.

use std::time::Duration;

/// Default TCP port for `pcbook serve`.
pub const DEFAULT_PORT: u16 = 8080;

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Development signing secret. `ServerConfig::validate` warns when it is used.
pub const DEFAULT_SECRET_KEY: &str = "secret";

/// Lifetime of server-issued access tokens.
pub const TOKEN_DURATION_SECS: u64 = 15 * 60;

/// Longest token lifetime `ServerConfig::validate` accepts.
pub const MAX_TOKEN_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Upper bound on the total size of one uploaded image (1 MiB).
pub const MAX_IMAGE_SIZE: usize = 1 << 20;

/// Size of the chunks `LaptopClient::upload_image` sends.
pub const IMAGE_CHUNK_SIZE: usize = 1024;

/// Directory where `DiskImageStore` writes uploaded images.
pub const DEFAULT_IMAGE_DIR: &str = "tmp";

/// Metadata key carrying the access token.
pub const AUTHORIZATION_KEY: &str = "authorization";

/// How often the client refreshes its access token.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Wait before retrying a failed token refresh.
pub const DEFAULT_REFRESH_BACKOFF: Duration = Duration::from_secs(10);

/// Default timeout for unary client calls (login, create).
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Buffer size of the channels feeding streamed responses and requests.
pub const CALL_BUFFER_SIZE: usize = 16;

/// Server address the client connects to by default.
pub const DEFAULT_CLIENT_ADDRESS: &str = "127.0.0.1:8080";

/// Dials retried by `rpc::connect` after the first failure.
pub const DEFAULT_CONNECT_RETRIES: u32 = 3;
