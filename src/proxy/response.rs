//! Fixed responses written to the client when a session cannot be proxied.
//!
//! These are sent verbatim whatever protocol label the backend carries;
//! clients of non-HTTP backends see the same bytes.

pub const NO_BACKENDS: &[u8] =
    b"HTTP/1.1 503 Service Unavailable\r\n\r\nNo backend servers available.";

pub const NO_SELECTION: &[u8] =
    b"HTTP/1.1 503 Service Unavailable\r\n\r\nNo available backend servers.";

pub const BACKEND_REFUSED: &[u8] =
    b"HTTP/1.1 503 Service Unavailable\r\n\r\nBackend server refused connection.\r\n";

pub const GATEWAY_TIMEOUT: &[u8] =
    b"HTTP/1.1 504 Gateway Timeout\r\n\r\nBackend server connection timed out.\r\n";

pub const INTERNAL_ERROR: &[u8] =
    b"HTTP/1.1 500 Internal Server Error\r\n\r\nLoad balancer internal error.\r\n";
