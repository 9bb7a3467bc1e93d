//! Bridge Handshake
//!
//! Acquiring the device bridge may hang forever when the host app is not
//! running. [`with_timeout`] races any future against a deadline so the
//! caller can fall back to host-only mode.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Default time allowed for acquiring the bridge
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(2500);

/// The raced future did not finish in time
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{label} timed out after {}ms", .after.as_millis())]
pub struct HandshakeTimeout {
    /// What was being waited for
    pub label: String,
    /// The deadline that expired
    pub after: Duration,
}

/// Resolve `future`, or fail with [`HandshakeTimeout`] once `deadline` passes
///
/// The losing future is dropped.
///
/// # Errors
///
/// [`HandshakeTimeout`] when the deadline expires first.
pub async fn with_timeout<F, T>(
    future: F,
    deadline: Duration,
    label: impl Into<String>,
) -> Result<T, HandshakeTimeout>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(deadline, future)
        .await
        .map_err(|_| HandshakeTimeout {
            label: label.into(),
            after: deadline,
        })
}
