use crate::errors::ScreenerBotError;
use crate::key_pool::KeyPool;
use crate::logger::{self, LogTag};
use solana_client::client_error::ClientError;
use solana_client::rpc_client::RpcClient;
use std::time::Duration;
use tokio::time::timeout;

pub enum RetryOutcome<T> {
    Success(T),
    Exhausted,
}

fn looks_rate_limited(err: &ClientError) -> bool {
    let s = err.to_string();
    s.contains("429") || s.to_lowercase().contains("rate limit") || s.to_lowercase().contains("too many requests")
}

/// Run `op` against the pool identified by `build_client`, retrying up to
/// `max_retries` times with exponential backoff. A rate-limit error rotates
/// the pool via `mark_failed()` and retries immediately instead of sleeping.
/// Returns `None` if the pool is empty (caller should fall back).
pub async fn run_with_pool<T, F, B>(
    pool: &KeyPool,
    call_timeout: Duration,
    max_retries: u32,
    backoff_base_secs: u64,
    op: F,
    build_client: B,
) -> Option<Result<T, ScreenerBotError>>
where
    T: Send + 'static,
    F: Fn(&RpcClient) -> Result<T, ClientError> + Send + Sync + Clone + 'static,
    B: Fn(&str) -> RpcClient,
{
    if pool.is_empty() {
        return None;
    }

    let mut last_err = String::new();

    for attempt in 0..max_retries {
        let url = pool.current()?.to_string();
        let client = build_client(&url);
        let op = op.clone();

        let result = timeout(
            call_timeout,
            tokio::task::spawn_blocking(move || op(&client)),
        )
        .await;

        match result {
            Ok(Ok(Ok(value))) => return Some(Ok(value)),
            Ok(Ok(Err(e))) => {
                last_err = e.to_string();
                if looks_rate_limited(&e) {
                    logger::warning(LogTag::Chain, &format!("rate limited on {}, rotating pool", url));
                    pool.mark_failed();
                    continue;
                }
                logger::warning(LogTag::Chain, &format!("rpc call failed on {}: {}", url, e));
            }
            Ok(Err(join_err)) => {
                last_err = format!("task panicked: {}", join_err);
            }
            Err(_) => {
                last_err = format!("timed out after {:?}", call_timeout);
            }
        }

        if attempt + 1 < max_retries {
            let backoff = Duration::from_secs(backoff_base_secs.saturating_mul(1 << attempt));
            tokio::time::sleep(backoff).await;
        }
    }

    Some(Err(ScreenerBotError::transient("chain", last_err)))
}

/// A single attempt against a pre-built client, used for the one-shot fallback.
pub async fn single_attempt<T, F>(
    client: &RpcClient,
    op: F,
) -> Result<T, ScreenerBotError>
where
    T: Send + 'static,
    F: Fn(&RpcClient) -> Result<T, ClientError> + Send + Sync + 'static,
{
    match op(client) {
        Ok(value) => Ok(value),
        Err(e) => Err(ScreenerBotError::transient("chain-fallback", e.to_string())),
    }
}
