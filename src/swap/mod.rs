//! Swap execution (§4.9): quote -> build -> sign -> broadcast -> confirm,
//! with slippage escalation and key-pool rotation on 429. This is the only
//! module that talks to the swap aggregator's HTTP API; everything below the
//! signed transaction goes through [`Chain`].

use crate::config::SlippageConfig;
use crate::errors::ScreenerBotError;
use crate::key_pool::KeyPool;
use crate::logger::{self, LogTag};
use crate::rpc::{Chain, SendOptions};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::signature::Keypair;
use solana_sdk::transaction::VersionedTransaction;
use std::sync::Arc;
use std::time::Duration;

const QUOTE_SWAP_BACKOFF_SECS: [u64; 3] = [5, 8, 11];
const SOL_DECIMALS: u32 = 9;

/// UI amount -> raw base units (§4.9 step 1). Sells floor so the request
/// never exceeds the wallet's actual balance; buys truncate since the spent
/// amount is exact by construction (a tier's configured SOL amount).
fn raw_amount_for(amount_ui: f64, decimals: u32, side: Side) -> u64 {
    let raw = amount_ui * 10f64.powi(decimals as i32);
    match side {
        Side::Sell => raw.floor() as u64,
        Side::Buy => raw as u64,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone)]
pub struct SwapOutcome {
    pub signature: String,
    /// Buys: raw token amount received. Sells: SOL received.
    pub out_amount: f64,
}

/// The full, unmodified quote body: the swap endpoint expects it echoed back
/// verbatim as `quoteResponse`, so this keeps every field the aggregator sent
/// instead of re-deriving a narrower struct.
#[derive(Debug, Clone)]
struct QuoteResponse {
    out_amount: String,
    body: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct SwapResponse {
    #[serde(rename = "swapTransaction")]
    swap_transaction: String,
}

/// Executes quote/build/sign/send/confirm against the configured aggregator
/// and RPC surface. One instance is shared by every Trader mission.
pub struct SwapExecutor {
    chain: Arc<dyn Chain>,
    http: reqwest::Client,
    swap_base_url: String,
    aggregator_keys: KeyPool,
    slippage: SlippageConfig,
    tx_verify_max_wait_secs: u64,
    tx_verify_retry_max_wait_secs: u64,
    tx_verify_reconciliation_delay_secs: u64,
    tx_verify_reconciliation_retries: u32,
}

impl SwapExecutor {
    pub fn new(
        chain: Arc<dyn Chain>,
        swap_base_url: impl Into<String>,
        aggregator_keys: Vec<String>,
        slippage: SlippageConfig,
        tx_verify_max_wait_secs: u64,
        tx_verify_retry_max_wait_secs: u64,
        tx_verify_reconciliation_delay_secs: u64,
        tx_verify_reconciliation_retries: u32,
    ) -> Self {
        Self {
            chain,
            http: reqwest::Client::new(),
            swap_base_url: swap_base_url.into(),
            aggregator_keys: KeyPool::new(aggregator_keys),
            slippage,
            tx_verify_max_wait_secs,
            tx_verify_retry_max_wait_secs,
            tx_verify_reconciliation_delay_secs,
            tx_verify_reconciliation_retries,
        }
    }

    /// `amount_ui` is whole-unit (SOL or UI token amount); `decimals` is the
    /// input mint's decimals. Sells floor the raw amount so the request never
    /// overspends the wallet's actual balance.
    pub async fn swap(
        &self,
        signer: &Keypair,
        input_mint: &str,
        output_mint: &str,
        amount_ui: f64,
        slippage_bps: u32,
        side: Side,
        decimals: u32,
    ) -> Result<SwapOutcome, ScreenerBotError> {
        let raw_amount = raw_amount_for(amount_ui, decimals, side);

        let quote = self.get_quote(input_mint, output_mint, raw_amount, slippage_bps).await?;
        let swap_tx_b64 = self.get_swap_transaction(signer, &quote).await?;

        let tx_bytes = general_purpose::STANDARD
            .decode(&swap_tx_b64)
            .map_err(|e| ScreenerBotError::transient("swap", format!("bad base64 swap tx: {}", e)))?;
        let unsigned: VersionedTransaction = bincode::deserialize(&tx_bytes)
            .map_err(|e| ScreenerBotError::transient("swap", format!("bad swap tx encoding: {}", e)))?;
        let signed = self.chain.sign_versioned(unsigned, signer).await?;

        let signature = self
            .chain
            .send(&signed, SendOptions { skip_preflight: true })
            .await?;

        let out_amount_raw: f64 = quote.out_amount.parse().unwrap_or(0.0);
        let out_amount = match side {
            // §4.9: "for buys, out_amount is the raw token amount from the quote"
            Side::Buy => out_amount_raw,
            Side::Sell => out_amount_raw / 10f64.powi(SOL_DECIMALS as i32),
        };

        let owner = {
            use solana_sdk::signer::Signer;
            signer.pubkey().to_string()
        };
        let expected_output_ui = if side == Side::Buy {
            let output_decimals = self.chain.token_supply(output_mint).await.map(|s| s.decimals).unwrap_or(decimals as u8);
            out_amount_raw / 10f64.powi(output_decimals as i32)
        } else {
            0.0
        };
        self.confirm_with_reconciliation(&signature, side, &owner, output_mint, expected_output_ui)
            .await?;

        Ok(SwapOutcome { signature, out_amount })
    }

    /// Sell-with-retry wrapper (§4.9 step 6): iterate the slippage schedule,
    /// re-querying and clamping the chain balance before each attempt. Stops
    /// early if the on-chain balance has hit zero.
    pub async fn sell_with_retry(
        &self,
        signer: &Keypair,
        owner: &str,
        input_mint: &str,
        output_mint: &str,
        amount_ui: f64,
        decimals: u32,
    ) -> Result<SwapOutcome, ScreenerBotError> {
        let mut remaining = amount_ui;
        let mut last_err = None;

        for bps in self.slippage.schedule_bps.clone() {
            let chain_balance = self.chain.token_balance(owner, input_mint).await.unwrap_or(remaining);
            if chain_balance <= 0.0 {
                logger::warning(LogTag::Swap, "sell aborted: on-chain balance is zero");
                return Err(last_err.unwrap_or_else(|| {
                    ScreenerBotError::chain_execution("none", "on-chain balance exhausted before any sell attempt")
                }));
            }
            remaining = remaining.min(chain_balance);

            match self.swap(signer, input_mint, output_mint, remaining, bps, Side::Sell, decimals).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    logger::warning(LogTag::Swap, &format!("sell attempt at {}bps failed: {}", bps, e));
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ScreenerBotError::chain_execution("none", "slippage schedule exhausted")))
    }

    /// Quote-implied sell price in SOL per token, without executing anything
    /// (§4.8 PNL_CHECK: Jupiter-quote cross-validation of an outsized gain).
    pub async fn implied_price_sol(&self, mint: &str, amount_ui: f64, decimals: u32) -> Result<f64, ScreenerBotError> {
        let wsol = "So11111111111111111111111111111111111111112";
        let default_bps = self.slippage.schedule_bps.first().copied().unwrap_or(200);
        let raw_amount = raw_amount_for(amount_ui, decimals, Side::Sell);
        if raw_amount == 0 {
            return Ok(0.0);
        }
        let quote = self.get_quote(mint, wsol, raw_amount, default_bps).await?;
        let out_sol: f64 = quote.out_amount.parse().unwrap_or(0.0) / 10f64.powi(SOL_DECIMALS as i32);
        Ok(out_sol / amount_ui)
    }

    async fn get_quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        raw_amount: u64,
        slippage_bps: u32,
    ) -> Result<QuoteResponse, ScreenerBotError> {
        let url = format!("{}/v6/quote", self.swap_base_url);
        let attempts = std::cmp::max(3, self.aggregator_keys.len().max(1));

        for attempt in 0..attempts {
            let mut req = self.http.get(&url).query(&[
                ("inputMint", input_mint),
                ("outputMint", output_mint),
                ("amount", &raw_amount.to_string()),
                ("slippageBps", &slippage_bps.to_string()),
                ("onlyDirectRoutes", "false"),
                ("asLegacyTransaction", "false"),
            ]);
            if let Some(key) = self.aggregator_keys.current() {
                req = req.header("x-api-key", key);
            }

            let response = req.send().await?;
            if response.status().as_u16() == 429 {
                self.aggregator_keys.mark_failed();
                self.backoff(attempt).await;
                continue;
            }
            if !response.status().is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ScreenerBotError::transient("swap", format!("quote request failed: {}", body)));
            }
            let body: Value = response.json().await?;
            let out_amount = body
                .get("outAmount")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ScreenerBotError::transient("swap", "quote response missing outAmount"))?
                .to_string();
            return Ok(QuoteResponse { out_amount, body });
        }

        Err(ScreenerBotError::rate_limited("swap_quote"))
    }

    async fn get_swap_transaction(&self, signer: &Keypair, quote: &QuoteResponse) -> Result<String, ScreenerBotError> {
        use solana_sdk::signer::Signer;

        let url = format!("{}/v6/swap", self.swap_base_url);
        let attempts = std::cmp::max(3, self.aggregator_keys.len().max(1));
        let body = json!({
            "userPublicKey": signer.pubkey().to_string(),
            "quoteResponse": quote.body,
            "wrapAndUnwrapSol": true,
            "computeUnitPriceMicroLamports": "auto",
        });

        for attempt in 0..attempts {
            let mut req = self.http.post(&url).json(&body);
            if let Some(key) = self.aggregator_keys.current() {
                req = req.header("x-api-key", key);
            }

            let response = req.send().await?;
            if response.status().as_u16() == 429 {
                self.aggregator_keys.mark_failed();
                self.backoff(attempt).await;
                continue;
            }
            if !response.status().is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(ScreenerBotError::transient("swap", format!("swap build failed: {}", text)));
            }
            let swap: SwapResponse = response.json().await?;
            return Ok(swap.swap_transaction);
        }

        Err(ScreenerBotError::rate_limited("swap_build"))
    }

    async fn backoff(&self, attempt: usize) {
        let secs = QUOTE_SWAP_BACKOFF_SECS[attempt.min(QUOTE_SWAP_BACKOFF_SECS.len() - 1)];
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    /// §4.9 step 5: poll confirm for `tx_verify_max_wait_secs`; on timeout
    /// retry confirm (the underlying `Chain` rotates RPC endpoints on its own
    /// failures) for `tx_verify_retry_max_wait_secs`; on a BUY that is still
    /// unconfirmed, fall back to on-chain balance reconciliation.
    async fn confirm_with_reconciliation(
        &self,
        signature: &str,
        side: Side,
        owner: &str,
        output_mint: &str,
        expected_ui: f64,
    ) -> Result<(), ScreenerBotError> {
        if self.poll_confirm(signature, self.tx_verify_max_wait_secs).await? {
            return Ok(());
        }
        if self.poll_confirm(signature, self.tx_verify_retry_max_wait_secs).await? {
            return Ok(());
        }

        if side != Side::Buy {
            return Err(ScreenerBotError::confirmation_ambiguous(signature));
        }

        for _ in 0..self.tx_verify_reconciliation_retries {
            tokio::time::sleep(Duration::from_secs(self.tx_verify_reconciliation_delay_secs)).await;
            let chain_ui = self.chain.token_balance(owner, output_mint).await.unwrap_or(0.0);
            if expected_ui <= 0.0 || chain_ui >= 0.99 * expected_ui {
                logger::info(LogTag::Swap, &format!("reconciliation confirmed buy {} via balance check", signature));
                return Ok(());
            }
        }

        logger::error(LogTag::Swap, &format!("confirmation failed for {} after reconciliation", signature));
        Err(ScreenerBotError::confirmation_ambiguous(signature))
    }

    async fn poll_confirm(&self, signature: &str, max_wait_secs: u64) -> Result<bool, ScreenerBotError> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(max_wait_secs);
        loop {
            if self.chain.confirm(signature).await? {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sell_floors_raw_amount_to_never_overspend() {
        // 1.23456789 tokens at 6 decimals should floor, not round, to 1_234_567.
        assert_eq!(raw_amount_for(1.234_567_89, 6, Side::Sell), 1_234_567);
    }

    #[test]
    fn buy_converts_sol_to_lamports() {
        assert_eq!(raw_amount_for(0.04, SOL_DECIMALS, Side::Buy), 40_000_000);
    }

    #[test]
    fn zero_decimals_round_trips_whole_units() {
        assert_eq!(raw_amount_for(5.0, 0, Side::Buy), 5);
    }
}
