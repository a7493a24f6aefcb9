//! Blockchain data-source abstraction layer.
//!
//! Defines the [`BlockchainSource`] trait and provides an Esplora HTTP
//! implementation ([`EsploraClient`]) plus a test mock (`mock::MockSource`).

mod esplora;
#[cfg(test)]
pub mod mock;

pub use esplora::EsploraClient;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CoreError, DataSourceError};
use crate::types::{AddressSnapshot, TransactionInput};

/// The two reads the assessment engine needs from a block explorer.
///
/// Implementations report every failure (transport, status, decoding, rate
/// limiting) as an error; the orchestrator decides how to degrade.
#[async_trait]
pub trait BlockchainSource: Send + Sync {
    /// Aggregate confirmed statistics for `address`.
    async fn fetch_address_snapshot(&self, address: &str) -> Result<AddressSnapshot, CoreError>;

    /// Inputs spending from `address` across its `limit` most recent
    /// transactions, newest transaction first.
    async fn fetch_recent_inputs(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<TransactionInput>, CoreError>;
}

/// Bound a data-source call by `limit`. Expiry is reported as
/// `DataSourceError::Timeout` so it follows the same degraded paths as any
/// other fetch failure.
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    fetch: impl Future<Output = Result<T, CoreError>>,
) -> Result<T, CoreError> {
    tokio::time::timeout(limit, fetch)
        .await
        .map_err(|_| DataSourceError::Timeout(limit))?
}
