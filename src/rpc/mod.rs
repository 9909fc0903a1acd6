//! Chain: a single capability over the RPC/WebSocket provider set.
//!
//! Wraps a primary [`KeyPool`] and an optional fallback pool of base URLs.
//! Every method tries primary first; on failure with a non-empty fallback
//! pool, the fallback is tried once. Exponential backoff (base 1s, `2^attempt`)
//! runs for up to `max_retries` attempts against the primary pool; a 429 or a
//! "rate limit" error message rotates the pool instead of just waiting.

mod capability;
mod retry;

pub use capability::{
    Chain, ParsedTransaction, SendOptions, TokenAccount, TokenSupply,
};
pub use retry::RetryOutcome;

use crate::config::{CredentialsConfig, ProviderConfig};
use crate::errors::ScreenerBotError;
use crate::key_pool::KeyPool;
use solana_client::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use std::time::Duration;

/// Concrete `Chain` backed by `solana_client::RpcClient`s built from a rotating
/// [`KeyPool`] of base URLs, plus an HTTP client and key pool for the
/// enhanced bulk-parse endpoint.
pub struct SolanaChain {
    primary: KeyPool,
    fallback: KeyPool,
    parse_keys: KeyPool,
    parse_base_url: String,
    http: reqwest::Client,
    rpc_timeout: Duration,
    account_timeout: Duration,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl SolanaChain {
    pub fn new(cfg: &ProviderConfig, creds: &CredentialsConfig) -> Self {
        Self {
            primary: KeyPool::new(cfg.rpc_urls.clone()),
            fallback: KeyPool::new(cfg.rpc_fallback_urls.clone()),
            parse_keys: KeyPool::new(creds.parse_keys.clone()),
            parse_base_url: cfg.parse_base_url.clone(),
            http: reqwest::Client::new(),
            rpc_timeout: Duration::from_secs(cfg.rpc_timeout_secs),
            account_timeout: Duration::from_secs(cfg.account_read_timeout_secs),
            max_retries: cfg.max_retries,
            backoff_base_secs: cfg.retry_backoff_base_secs,
        }
    }

    fn client_for(&self, url: &str, timeout: Duration) -> RpcClient {
        RpcClient::new_with_timeout_and_commitment(
            url.to_string(),
            timeout,
            CommitmentConfig::confirmed(),
        )
    }

    /// Run `op` against the primary pool with backoff/rotation, falling back
    /// to the fallback pool once if the primary is exhausted.
    async fn call<T, F>(&self, timeout: Duration, op: F) -> Result<T, ScreenerBotError>
    where
        T: Send + 'static,
        F: Fn(&RpcClient) -> Result<T, solana_client::client_error::ClientError> + Send + Sync + Clone + 'static,
    {
        if let Some(result) =
            retry::run_with_pool(&self.primary, timeout, self.max_retries, self.backoff_base_secs, op.clone(), |url| {
                self.client_for(url, timeout)
            })
            .await
        {
            return result;
        }

        if !self.fallback.is_empty() {
            if let Some(url) = self.fallback.current() {
                let client = self.client_for(url, timeout);
                return retry::single_attempt(&client, op).await;
            }
        }

        Err(ScreenerBotError::transient("chain", "no RPC providers configured"))
    }

    pub(crate) fn rpc_timeout(&self) -> Duration {
        self.rpc_timeout
    }

    pub(crate) fn account_timeout(&self) -> Duration {
        self.account_timeout
    }

    pub(crate) fn primary_pool(&self) -> &KeyPool {
        &self.primary
    }

    pub(crate) fn parse_keys(&self) -> &KeyPool {
        &self.parse_keys
    }

    pub(crate) fn parse_base_url(&self) -> &str {
        &self.parse_base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }
}
