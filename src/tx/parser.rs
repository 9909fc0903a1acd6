//! TxParser: reduce a parsed transaction to `(sol_change, token_changes, timestamp)`
//! for a single target wallet.

use crate::rpc::ParsedTransaction;
use std::collections::HashMap;

const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";
const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
const USDT_MINT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";

fn is_ignored_mint(mint: &str) -> bool {
    matches!(mint, WSOL_MINT | USDC_MINT | USDT_MINT)
}

/// The result of reducing one transaction to a single wallet's perspective.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletTxEffect {
    pub sol_change: f64,
    pub token_changes: HashMap<String, f64>,
    pub timestamp: i64,
}

/// Sum native SOL transfers where `wallet` is sender (negative) or receiver (positive).
fn native_sol_change(tx: &ParsedTransaction, wallet: &str) -> f64 {
    tx.native_transfers
        .iter()
        .map(|t| {
            if t.from == wallet {
                -t.amount_sol
            } else if t.to == wallet {
                t.amount_sol
            } else {
                0.0
            }
        })
        .sum()
}

/// Sum token transfers on `mint` where `wallet` is sender/receiver, in UI units.
fn token_mint_change(tx: &ParsedTransaction, wallet: &str, mint: &str) -> f64 {
    tx.token_transfers
        .iter()
        .filter(|t| t.mint == mint)
        .map(|t| {
            let amount = t.token_amount.amount;
            if t.from == wallet {
                -amount
            } else if t.to == wallet {
                amount
            } else {
                0.0
            }
        })
        .sum()
}

/// Combine native SOL and wrapped-SOL legs of the same swap, plus an optional
/// USDC leg converted at `usdc_per_sol`.
fn combine_sol_change(native: f64, wsol: f64, usdc: f64, usdc_per_sol: Option<f64>) -> f64 {
    let native_nonzero = native.abs() > f64::EPSILON;
    let wsol_nonzero = wsol.abs() > f64::EPSILON;

    let base = if native_nonzero && !wsol_nonzero {
        native
    } else if wsol_nonzero && !native_nonzero {
        wsol
    } else if native_nonzero && wsol_nonzero {
        if native.signum() == wsol.signum() {
            if native.abs() >= wsol.abs() {
                native
            } else {
                wsol
            }
        } else {
            native + wsol
        }
    } else {
        0.0
    };

    let usdc_sol_equivalent = match usdc_per_sol {
        Some(rate) if rate.abs() > f64::EPSILON && usdc.abs() > f64::EPSILON => usdc / rate,
        _ => 0.0,
    };

    base + usdc_sol_equivalent
}

/// Reduce `tx` to `wallet`'s (sol_change, token_changes, timestamp).
/// `usdc_per_sol` is the current USDC/SOL conversion rate, if known.
pub fn parse_wallet_effect(
    tx: &ParsedTransaction,
    wallet: &str,
    usdc_per_sol: Option<f64>,
) -> WalletTxEffect {
    let native = native_sol_change(tx, wallet);
    let wsol = token_mint_change(tx, wallet, WSOL_MINT);
    let usdc = token_mint_change(tx, wallet, USDC_MINT);
    let sol_change = combine_sol_change(native, wsol, usdc, usdc_per_sol);

    let mut token_changes: HashMap<String, f64> = HashMap::new();
    for transfer in &tx.token_transfers {
        if is_ignored_mint(&transfer.mint) {
            continue;
        }
        let delta = if transfer.from == wallet {
            -transfer.token_amount.amount
        } else if transfer.to == wallet {
            transfer.token_amount.amount
        } else {
            continue;
        };
        *token_changes.entry(transfer.mint.clone()).or_insert(0.0) += delta;
    }

    WalletTxEffect {
        sol_change,
        token_changes,
        timestamp: tx.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{NativeTransfer, TokenAmount, TokenTransfer};

    fn tx_with(native: Vec<NativeTransfer>, tokens: Vec<TokenTransfer>, ts: i64) -> ParsedTransaction {
        ParsedTransaction {
            signature: "sig".into(),
            timestamp: ts,
            native_transfers: native,
            token_transfers: tokens,
            description: String::new(),
            tx_type: String::new(),
            fee_payer: "wallet".into(),
            err: None,
        }
    }

    fn token(from: &str, to: &str, mint: &str, amount: f64) -> TokenTransfer {
        TokenTransfer {
            from: from.into(),
            to: to.into(),
            mint: mint.into(),
            token_amount: TokenAmount { amount, decimals: 6 },
        }
    }

    #[test]
    fn native_only_buy_is_negative_sol_change() {
        let tx = tx_with(
            vec![NativeTransfer { from: "wallet".into(), to: "pool".into(), amount_sol: 1.0 }],
            vec![token("pool", "wallet", "MINT1", 1000.0)],
            100,
        );
        let effect = parse_wallet_effect(&tx, "wallet", None);
        assert_eq!(effect.sol_change, -1.0);
        assert_eq!(effect.token_changes.get("MINT1"), Some(&1000.0));
    }

    #[test]
    fn wsol_only_leg_used_when_native_is_zero() {
        let tx = tx_with(
            vec![],
            vec![
                token("wallet", "pool", WSOL_MINT, 0.5),
                token("pool", "wallet", "MINT1", 500.0),
            ],
            100,
        );
        let effect = parse_wallet_effect(&tx, "wallet", None);
        assert_eq!(effect.sol_change, -0.5);
    }

    #[test]
    fn same_sign_native_and_wsol_takes_larger_magnitude() {
        let tx = tx_with(
            vec![NativeTransfer { from: "wallet".into(), to: "pool".into(), amount_sol: 0.2 }],
            vec![token("wallet", "pool", WSOL_MINT, 1.0)],
            100,
        );
        let effect = parse_wallet_effect(&tx, "wallet", None);
        assert_eq!(effect.sol_change, -1.0);
    }

    #[test]
    fn opposite_sign_native_and_wsol_are_summed() {
        let tx = tx_with(
            vec![NativeTransfer { from: "pool".into(), to: "wallet".into(), amount_sol: 0.1 }],
            vec![token("wallet", "pool", WSOL_MINT, 0.3)],
            100,
        );
        let effect = parse_wallet_effect(&tx, "wallet", None);
        assert_eq!(effect.sol_change, -0.2);
    }

    #[test]
    fn usdc_leg_added_only_when_rate_known() {
        let tx = tx_with(
            vec![],
            vec![token("wallet", "pool", USDC_MINT, 150.0)],
            100,
        );
        let no_rate = parse_wallet_effect(&tx, "wallet", None);
        assert_eq!(no_rate.sol_change, 0.0);

        let with_rate = parse_wallet_effect(&tx, "wallet", Some(150.0));
        assert_eq!(with_rate.sol_change, -1.0);
    }

    #[test]
    fn ignored_mints_excluded_from_token_changes() {
        let tx = tx_with(
            vec![],
            vec![token("wallet", "pool", USDT_MINT, 10.0), token("pool", "wallet", "MINT9", 5.0)],
            100,
        );
        let effect = parse_wallet_effect(&tx, "wallet", None);
        assert!(!effect.token_changes.contains_key(USDT_MINT));
        assert_eq!(effect.token_changes.get("MINT9"), Some(&5.0));
    }
}
