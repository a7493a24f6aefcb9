use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CoreError, DataSourceError};
use crate::types::{AddressSnapshot, TransactionInput};

use super::BlockchainSource;

/// A mock blockchain source for testing. Returns canned snapshots and
/// inputs populated via the builder pattern; unknown addresses fail like an
/// unreachable explorer.
pub struct MockSource {
    snapshots: HashMap<String, AddressSnapshot>,
    inputs: HashMap<String, Vec<TransactionInput>>,
    failing_inputs: HashSet<String>,
    delay: Option<Duration>,
    snapshot_calls: AtomicUsize,
}

impl MockSource {
    pub fn builder() -> MockSourceBuilder {
        MockSourceBuilder {
            snapshots: HashMap::new(),
            inputs: HashMap::new(),
            failing_inputs: HashSet::new(),
            delay: None,
        }
    }

    pub fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    async fn maybe_delay(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

pub struct MockSourceBuilder {
    snapshots: HashMap<String, AddressSnapshot>,
    inputs: HashMap<String, Vec<TransactionInput>>,
    failing_inputs: HashSet<String>,
    delay: Option<Duration>,
}

impl MockSourceBuilder {
    pub fn with_snapshot(mut self, address: &str, snapshot: AddressSnapshot) -> Self {
        self.snapshots.insert(address.to_owned(), snapshot);
        self
    }

    pub fn with_inputs(mut self, address: &str, inputs: Vec<TransactionInput>) -> Self {
        self.inputs.insert(address.to_owned(), inputs);
        self
    }

    /// Make `fetch_recent_inputs` fail for `address` even if a snapshot exists.
    pub fn with_failing_inputs(mut self, address: &str) -> Self {
        self.failing_inputs.insert(address.to_owned());
        self
    }

    /// Delay every response, for exercising timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn build(self) -> MockSource {
        MockSource {
            snapshots: self.snapshots,
            inputs: self.inputs,
            failing_inputs: self.failing_inputs,
            delay: self.delay,
            snapshot_calls: AtomicUsize::new(0),
        }
    }
}

fn unreachable_error(address: &str) -> CoreError {
    DataSourceError::Status {
        status: 503,
        message: format!("mock has no data for {address}"),
    }
    .into()
}

/// Keep inputs belonging to the first `limit` distinct transactions.
fn within_tx_limit(inputs: &[TransactionInput], limit: usize) -> Vec<TransactionInput> {
    let mut seen = HashSet::new();
    inputs
        .iter()
        .filter(|input| {
            if seen.contains(&input.txid) {
                return true;
            }
            if seen.len() < limit {
                seen.insert(input.txid);
                return true;
            }
            false
        })
        .cloned()
        .collect()
}

#[async_trait]
impl BlockchainSource for MockSource {
    async fn fetch_address_snapshot(&self, address: &str) -> Result<AddressSnapshot, CoreError> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_delay().await;
        self.snapshots
            .get(address)
            .copied()
            .ok_or_else(|| unreachable_error(address))
    }

    async fn fetch_recent_inputs(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<TransactionInput>, CoreError> {
        self.maybe_delay().await;
        if self.failing_inputs.contains(address) {
            return Err(unreachable_error(address));
        }
        // Addresses with a snapshot but no registered inputs have simply
        // never spent anything.
        match self.inputs.get(address) {
            Some(inputs) => Ok(within_tx_limit(inputs, limit)),
            None if self.snapshots.contains_key(address) => Ok(Vec::new()),
            None => Err(unreachable_error(address)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    #[tokio::test]
    async fn unknown_address_is_unreachable() {
        let source = MockSource::builder().build();
        let err = source
            .fetch_address_snapshot("1Nobody")
            .await
            .expect_err("must fail");
        assert!(err.is_data_unavailable());
        assert_eq!(source.snapshot_calls(), 1);
    }

    #[tokio::test]
    async fn failing_inputs_override_snapshot() {
        let source = MockSource::builder()
            .with_snapshot("1Flaky", snapshot(4, 100, 0))
            .with_failing_inputs("1Flaky")
            .build();
        assert!(source.fetch_address_snapshot("1Flaky").await.is_ok());
        assert!(source.fetch_recent_inputs("1Flaky", 10).await.is_err());
    }

    #[tokio::test]
    async fn recent_inputs_respect_transaction_limit() {
        let source = MockSource::builder()
            .with_snapshot("1Busy", snapshot(3, 100, 0))
            .with_inputs(
                "1Busy",
                vec![
                    input_with_r(txid_from_byte(1), &r_value(1)),
                    input_with_r(txid_from_byte(1), &r_value(2)),
                    input_with_r(txid_from_byte(2), &r_value(3)),
                    input_with_r(txid_from_byte(3), &r_value(4)),
                ],
            )
            .build();

        let inputs = source.fetch_recent_inputs("1Busy", 2).await.expect("inputs");
        assert_eq!(inputs.len(), 3);
        assert!(inputs.iter().all(|i| i.txid != txid_from_byte(3)));
    }
}
