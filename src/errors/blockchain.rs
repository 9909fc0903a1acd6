/// Solana transaction error classification.
///
/// Chain-level failures are tagged `Permanent` / `Temporary` / `Uncertain` so
/// retry logic (Swap's sell-with-retry, Trader's confirmation reconciliation)
/// can dispatch on a typed classification instead of matching error strings.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of blockchain error handling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureType {
    /// Cleanup immediately: slippage exceeded, insufficient funds, frozen account.
    Permanent,
    /// Retry later: network congestion, blockhash expired, account borrow conflicts.
    Temporary,
    /// Wait for the standard confirmation timeout before deciding.
    Uncertain,
}

/// A structured view of a transaction's `meta.err` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolanaTransactionError {
    pub error_type: FailureType,
    pub instruction_index: Option<u8>,
    pub error_code: Option<u32>,
    pub error_name: String,
    pub description: String,
    pub raw_error: Value,
}

/// Classify a transaction-level error string (e.g. `"BlockhashNotFound"`).
fn classify_transaction_level(error_string: &str) -> (FailureType, String) {
    match error_string {
        "BlockhashNotFound" => (
            FailureType::Temporary,
            "Transaction blockhash has expired".to_string(),
        ),
        "AlreadyProcessed" => (
            FailureType::Permanent,
            "Transaction has already been processed".to_string(),
        ),
        "AccountInUse" => (
            FailureType::Temporary,
            "Account is being used by another transaction".to_string(),
        ),
        "InsufficientFundsForFee" => (
            FailureType::Permanent,
            "Insufficient SOL to pay transaction fee".to_string(),
        ),
        "SignatureFailure" => (
            FailureType::Permanent,
            "Transaction signature verification failed".to_string(),
        ),
        "WouldExceedMaxBlockCostLimit" => (
            FailureType::Temporary,
            "Transaction would exceed block cost limit".to_string(),
        ),
        other => (
            FailureType::Uncertain,
            format!("Unknown transaction error: {}", other),
        ),
    }
}

/// Classify a custom on-chain program error code (e.g. from a DEX program).
fn classify_custom_error(code: u32) -> (FailureType, String, String) {
    match code {
        6001 => (
            FailureType::Permanent,
            "SlippageExceeded".to_string(),
            "Price slippage tolerance exceeded".to_string(),
        ),
        6002 => (
            FailureType::Permanent,
            "InsufficientLiquidity".to_string(),
            "Insufficient liquidity in pool".to_string(),
        ),
        6006 => (
            FailureType::Temporary,
            "PoolSuspended".to_string(),
            "Trading pool is temporarily suspended".to_string(),
        ),
        0 => (
            FailureType::Permanent,
            "TokenInsufficientFunds".to_string(),
            "Insufficient token balance".to_string(),
        ),
        17 => (
            FailureType::Permanent,
            "TokenAccountFrozen".to_string(),
            "Token account is frozen".to_string(),
        ),
        _ => (
            FailureType::Uncertain,
            format!("CustomError{}", code),
            format!("Custom program error code: {}", code),
        ),
    }
}

/// Parse `meta.err` from a confirmed/finalized transaction status.
pub fn parse_structured_solana_error(error_value: &Value) -> SolanaTransactionError {
    match error_value {
        Value::Object(obj) if obj.contains_key("InstructionError") => {
            if let Some(array) = obj["InstructionError"].as_array() {
                if array.len() >= 2 {
                    let instruction_index = array[0].as_u64().unwrap_or(0) as u8;
                    if let Some(code) = array[1].get("Custom").and_then(|v| v.as_u64()) {
                        let (error_type, error_name, description) =
                            classify_custom_error(code as u32);
                        return SolanaTransactionError {
                            error_type,
                            instruction_index: Some(instruction_index),
                            error_code: Some(code as u32),
                            error_name,
                            description,
                            raw_error: error_value.clone(),
                        };
                    }
                }
            }
            SolanaTransactionError {
                error_type: FailureType::Uncertain,
                instruction_index: None,
                error_code: None,
                error_name: "InstructionError".to_string(),
                description: "Unparsed instruction error".to_string(),
                raw_error: error_value.clone(),
            }
        }
        Value::String(s) => {
            let (error_type, description) = classify_transaction_level(s);
            SolanaTransactionError {
                error_type,
                instruction_index: None,
                error_code: None,
                error_name: s.clone(),
                description,
                raw_error: error_value.clone(),
            }
        }
        _ => SolanaTransactionError {
            error_type: FailureType::Uncertain,
            instruction_index: None,
            error_code: None,
            error_name: "UnknownError".to_string(),
            description: format!("Unknown error structure: {}", error_value),
            raw_error: error_value.clone(),
        },
    }
}

pub fn is_permanent_failure(error: &SolanaTransactionError) -> bool {
    error.error_type == FailureType::Permanent
}

pub fn is_temporary_failure(error: &SolanaTransactionError) -> bool {
    error.error_type == FailureType::Temporary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slippage_custom_error_is_permanent() {
        let err = json!({"InstructionError": [1, {"Custom": 6001}]});
        let parsed = parse_structured_solana_error(&err);
        assert!(is_permanent_failure(&parsed));
        assert_eq!(parsed.error_name, "SlippageExceeded");
    }

    #[test]
    fn blockhash_not_found_is_temporary() {
        let err = json!("BlockhashNotFound");
        let parsed = parse_structured_solana_error(&err);
        assert!(is_temporary_failure(&parsed));
    }
}
