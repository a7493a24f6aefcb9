use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use bitcoin::Txid;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use tracing::{debug, trace};

use crate::error::{CoreError, DataSourceError};
use crate::types::{AddressSnapshot, TransactionInput};

use super::super::BlockchainSource;
use super::connection::parse_base_url;
use super::parsing::{inputs_spending_from, parse_address_snapshot, parse_tx_list, TxResponse};

/// Confirmed transactions returned per `/address/{addr}/txs[/chain]` page.
const PAGE_SIZE: usize = 25;

/// Longest slice of an error body kept in `DataSourceError::Status`.
const MAX_ERROR_BODY: usize = 200;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Esplora REST client (blockstream.info, mempool.space or a self-hosted
/// electrs instance).
pub struct EsploraClient {
    client: reqwest::Client,
    base_url: String,
    limiter: Option<DirectRateLimiter>,
}

impl EsploraClient {
    /// Create a client for the Esplora API rooted at `base_url`, e.g.
    /// `https://blockstream.info/api`.
    ///
    /// `request_timeout` bounds each HTTP request. If `requests_per_second`
    /// is set, outbound requests are rate-limited to stay polite with public
    /// explorers.
    pub fn new(
        base_url: &str,
        requests_per_second: Option<u32>,
        request_timeout: Duration,
    ) -> Result<Self, CoreError> {
        let base_url = parse_base_url(base_url)?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(request_timeout)
            .user_agent(concat!("riskbtc/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CoreError::InvalidConfig(format!("build HTTP client: {e}")))?;

        let limiter = match requests_per_second {
            None => None,
            Some(limit) => {
                let limit = NonZeroU32::new(limit).ok_or_else(|| {
                    CoreError::InvalidConfig("requests_per_second must be at least 1".to_owned())
                })?;
                Some(RateLimiter::direct(Quota::per_second(limit)))
            }
        };

        Ok(Self {
            client,
            base_url,
            limiter,
        })
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    async fn get_text(&self, path: &str) -> Result<String, CoreError> {
        self.wait_for_rate_limit().await;
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "esplora request");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(DataSourceError::Transport)?;
        let status = response.status();
        let body = response.text().await.map_err(DataSourceError::Transport)?;
        debug!(%url, %status, body_len = body.len(), "esplora response");
        trace!(%url, body = %body, "esplora response body");

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DataSourceError::RateLimited.into());
        }
        if !status.is_success() {
            let message: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
            return Err(DataSourceError::Status {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        Ok(body)
    }

    async fn fetch_tx_page(
        &self,
        address: &str,
        after: Option<Txid>,
    ) -> Result<Vec<TxResponse>, CoreError> {
        let path = match after {
            None => format!("/address/{address}/txs"),
            Some(txid) => format!("/address/{address}/txs/chain/{txid}"),
        };
        let body = self.get_text(&path).await?;
        parse_tx_list(&body)
    }
}

#[async_trait]
impl BlockchainSource for EsploraClient {
    async fn fetch_address_snapshot(&self, address: &str) -> Result<AddressSnapshot, CoreError> {
        let body = self.get_text(&format!("/address/{address}")).await?;
        parse_address_snapshot(&body)
    }

    async fn fetch_recent_inputs(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<TransactionInput>, CoreError> {
        let mut txs: Vec<TxResponse> = Vec::with_capacity(limit);
        let mut after = None;

        while txs.len() < limit {
            let page = self.fetch_tx_page(address, after).await?;
            let exhausted = page.len() < PAGE_SIZE;
            after = page.last().map(TxResponse::txid);
            txs.extend(page);
            if exhausted || after.is_none() {
                break;
            }
        }
        txs.truncate(limit);

        let inputs = inputs_spending_from(&txs, address)?;
        debug!(
            %address,
            transactions = txs.len(),
            inputs = inputs.len(),
            "fetched recent inputs"
        );
        Ok(inputs)
    }
}
