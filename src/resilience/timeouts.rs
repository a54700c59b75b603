//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap client reads, origin connects and origin reads with a deadline
//! - Leave the operation unbounded when no deadline is configured
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - A timeout ends only the connection it happened on

use std::future::Future;
use std::time::Duration;

use crate::error::ProxyError;

/// Run `fut`, failing with [`ProxyError::Timeout`] if `secs` is set and
/// elapses first. `what` names the operation in the error.
pub async fn with_timeout<F, T>(what: &'static str, secs: Option<u64>, fut: F) -> Result<T, ProxyError>
where
    F: Future<Output = Result<T, ProxyError>>,
{
    match secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), fut)
            .await
            .map_err(|_| ProxyError::Timeout(what, secs))?,
        None => fut.await,
    }
}
