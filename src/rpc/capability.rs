use super::SolanaChain;
use crate::errors::ScreenerBotError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_client::rpc_client::RpcClient;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::VersionedTransaction;
use std::str::FromStr;
use std::time::Duration;

/// A native SOL transfer leg of an enhanced/parsed transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeTransfer {
    pub from: String,
    pub to: String,
    pub amount_sol: f64,
}

/// A token amount, accepting either a bare number or `{amount, decimals}` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenAmount {
    pub amount: f64,
    pub decimals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenTransfer {
    pub from: String,
    pub to: String,
    pub mint: String,
    pub token_amount: TokenAmount,
}

/// The enhanced transaction shape the parse provider returns: native transfers
/// and token transfers pre-extracted, instead of raw instruction data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub signature: String,
    pub timestamp: i64,
    pub native_transfers: Vec<NativeTransfer>,
    pub token_transfers: Vec<TokenTransfer>,
    pub description: String,
    pub tx_type: String,
    pub fee_payer: String,
    pub err: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct TokenAccount {
    pub pubkey: String,
    pub mint: String,
    pub owner: String,
    pub amount_ui: f64,
    pub decimals: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct TokenSupply {
    pub amount_ui: f64,
    pub decimals: u8,
}

#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub skip_preflight: bool,
}

/// Chain: the RPC/WebSocket capability over the provider set. The Non-goals
/// list in the purpose section names this surface explicitly; everything
/// downstream of a transaction (signing, sending, confirming, reading
/// balances) goes through it instead of touching an `RpcClient` directly.
#[async_trait]
pub trait Chain: Send + Sync {
    async fn sign_versioned(
        &self,
        tx: VersionedTransaction,
        signer: &Keypair,
    ) -> Result<VersionedTransaction, ScreenerBotError>;

    async fn send(&self, tx: &VersionedTransaction, opts: SendOptions) -> Result<String, ScreenerBotError>;

    async fn confirm(&self, signature: &str) -> Result<bool, ScreenerBotError>;

    async fn token_balance(&self, owner: &str, mint: &str) -> Result<f64, ScreenerBotError>;

    async fn token_supply(&self, mint: &str) -> Result<TokenSupply, ScreenerBotError>;

    async fn signatures_for_address(
        &self,
        address: &str,
        before: Option<String>,
        limit: usize,
    ) -> Result<Vec<(String, Option<i64>)>, ScreenerBotError>;

    async fn get_transaction(&self, signature: &str) -> Result<ParsedTransaction, ScreenerBotError>;

    async fn parsed_transactions_bulk(
        &self,
        signatures: &[String],
    ) -> Result<Vec<ParsedTransaction>, ScreenerBotError>;

    async fn token_accounts_by_owner(&self, owner: &str) -> Result<Vec<TokenAccount>, ScreenerBotError>;
}

#[async_trait]
impl Chain for SolanaChain {
    async fn sign_versioned(
        &self,
        mut tx: VersionedTransaction,
        signer: &Keypair,
    ) -> Result<VersionedTransaction, ScreenerBotError> {
        let blockhash = self
            .call(self.rpc_timeout(), |client: &RpcClient| client.get_latest_blockhash())
            .await?;

        match &mut tx.message {
            solana_sdk::message::VersionedMessage::Legacy(m) => m.recent_blockhash = blockhash,
            solana_sdk::message::VersionedMessage::V0(m) => m.recent_blockhash = blockhash,
        }

        let message_data = tx.message.serialize();
        let signature = signer.sign_message(&message_data);
        tx.signatures = vec![signature];
        Ok(tx)
    }

    async fn send(&self, tx: &VersionedTransaction, opts: SendOptions) -> Result<String, ScreenerBotError> {
        let tx = tx.clone();
        let signature = self
            .call(self.rpc_timeout(), move |client: &RpcClient| {
                let cfg = solana_client::rpc_config::RpcSendTransactionConfig {
                    skip_preflight: opts.skip_preflight,
                    ..Default::default()
                };
                client.send_transaction_with_config(&tx, cfg)
            })
            .await?;
        Ok(signature.to_string())
    }

    async fn confirm(&self, signature: &str) -> Result<bool, ScreenerBotError> {
        let sig = solana_sdk::signature::Signature::from_str(signature)
            .map_err(|e| ScreenerBotError::transient("chain", format!("bad signature: {}", e)))?;
        let statuses = self
            .call(self.account_timeout(), move |client: &RpcClient| {
                client.get_signature_statuses(&[sig])
            })
            .await?;
        Ok(statuses
            .value
            .into_iter()
            .next()
            .flatten()
            .map(|s| s.err.is_none())
            .unwrap_or(false))
    }

    async fn token_balance(&self, owner: &str, mint: &str) -> Result<f64, ScreenerBotError> {
        let owner_pk = Pubkey::from_str(owner)
            .map_err(|e| ScreenerBotError::transient("chain", format!("bad owner pubkey: {}", e)))?;
        let mint_pk = Pubkey::from_str(mint)
            .map_err(|e| ScreenerBotError::transient("chain", format!("bad mint pubkey: {}", e)))?;
        let accounts = self
            .call(self.account_timeout(), move |client: &RpcClient| {
                client.get_token_accounts_by_owner(&owner_pk, TokenAccountsFilter::Mint(mint_pk))
            })
            .await?;

        let mut total = 0.0;
        for keyed in accounts {
            if let solana_account_decoder::UiAccountData::Json(parsed) = keyed.account.data {
                if let Some(info) = parsed.parsed.get("info") {
                    if let Some(ui) = info.get("tokenAmount").and_then(|t| t.get("uiAmount")) {
                        total += ui.as_f64().unwrap_or(0.0);
                    }
                }
            }
        }
        Ok(total)
    }

    async fn token_supply(&self, mint: &str) -> Result<TokenSupply, ScreenerBotError> {
        let mint_pk = Pubkey::from_str(mint)
            .map_err(|e| ScreenerBotError::transient("chain", format!("bad mint pubkey: {}", e)))?;
        let supply = self
            .call(self.account_timeout(), move |client: &RpcClient| client.get_token_supply(&mint_pk))
            .await?;
        Ok(TokenSupply {
            amount_ui: supply.ui_amount.unwrap_or(0.0),
            decimals: supply.decimals,
        })
    }

    async fn signatures_for_address(
        &self,
        address: &str,
        before: Option<String>,
        limit: usize,
    ) -> Result<Vec<(String, Option<i64>)>, ScreenerBotError> {
        let address_pk = Pubkey::from_str(address)
            .map_err(|e| ScreenerBotError::transient("chain", format!("bad address: {}", e)))?;
        let before_sig = before
            .map(|s| solana_sdk::signature::Signature::from_str(&s))
            .transpose()
            .map_err(|e| ScreenerBotError::transient("chain", format!("bad before signature: {}", e)))?;

        let infos = self
            .call(self.rpc_timeout(), move |client: &RpcClient| {
                client.get_signatures_for_address_with_config(
                    &address_pk,
                    solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config {
                        before: before_sig,
                        limit: Some(limit),
                        ..Default::default()
                    },
                )
            })
            .await?;

        Ok(infos
            .into_iter()
            .map(|info| (info.signature, info.block_time))
            .collect())
    }

    async fn get_transaction(&self, signature: &str) -> Result<ParsedTransaction, ScreenerBotError> {
        let results = self.parsed_transactions_bulk(&[signature.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| ScreenerBotError::transient("chain", "transaction not found"))
    }

    async fn parsed_transactions_bulk(
        &self,
        signatures: &[String],
    ) -> Result<Vec<ParsedTransaction>, ScreenerBotError> {
        if signatures.is_empty() {
            return Ok(Vec::new());
        }
        if self.parse_keys().is_empty() {
            return Err(ScreenerBotError::Chain(crate::errors::ChainError::InvalidResponse {
                message: "no parse-provider keys configured".to_string(),
            }));
        }

        #[derive(Serialize)]
        struct BulkRequest<'a> {
            transactions: &'a [String],
        }

        let body = BulkRequest { transactions: signatures };
        let mut last_err = String::new();

        for _ in 0..3 {
            let key = self.parse_keys().current().unwrap_or_default().to_string();
            let url = format!("{}?api-key={}", self.parse_base_url(), key);

            let response = self.http().post(&url).json(&body).send().await;
            match response {
                Ok(resp) if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    self.parse_keys().mark_failed();
                    continue;
                }
                Ok(resp) if resp.status().is_success() => {
                    let parsed: Vec<ParsedTransaction> = resp.json().await.map_err(ScreenerBotError::from)?;
                    return Ok(parsed);
                }
                Ok(resp) => {
                    last_err = format!("parse provider returned {}", resp.status());
                }
                Err(e) => {
                    last_err = e.to_string();
                }
            }
        }

        Err(ScreenerBotError::transient("chain-parse", last_err))
    }

    async fn token_accounts_by_owner(&self, owner: &str) -> Result<Vec<TokenAccount>, ScreenerBotError> {
        let owner_pk = Pubkey::from_str(owner)
            .map_err(|e| ScreenerBotError::transient("chain", format!("bad owner pubkey: {}", e)))?;
        let accounts = self
            .call(self.account_timeout(), move |client: &RpcClient| {
                client.get_token_accounts_by_owner(
                    &owner_pk,
                    TokenAccountsFilter::ProgramId(spl_token::id()),
                )
            })
            .await?;

        let mut out = Vec::with_capacity(accounts.len());
        for keyed in accounts {
            if let solana_account_decoder::UiAccountData::Json(parsed) = keyed.account.data {
                let info = parsed.parsed.get("info").cloned().unwrap_or_default();
                let mint = info.get("mint").and_then(|m| m.as_str()).unwrap_or_default().to_string();
                let token_amount = info.get("tokenAmount");
                let amount_ui = token_amount
                    .and_then(|t| t.get("uiAmount"))
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.0);
                let decimals = token_amount
                    .and_then(|t| t.get("decimals"))
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as u8;
                out.push(TokenAccount {
                    pubkey: keyed.pubkey,
                    mint,
                    owner: owner.to_string(),
                    amount_ui,
                    decimals,
                });
            }
        }
        Ok(out)
    }
}

#[allow(dead_code)]
fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

#[allow(dead_code)]
fn default_commitment() -> CommitmentConfig {
    CommitmentConfig::confirmed()
}
