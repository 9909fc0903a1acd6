/// Crate-wide error taxonomy for the copy-trading core.
///
/// `ScreenerBotError` is an enum-of-enums: each domain (chain, swap, discovery,
/// trader, config, rate limiting) gets its own sub-error type with a `Display`
/// impl, and the top-level enum just dispatches. Builder methods on
/// `ScreenerBotError` match the taxonomy in the error handling design: callers
/// reach for `ScreenerBotError::transient(..)` etc. instead of constructing
/// variants by hand.
pub mod blockchain;
pub mod metrics;

pub use blockchain::{
    is_permanent_failure, is_temporary_failure, parse_structured_solana_error, FailureType,
    SolanaTransactionError,
};

#[derive(Debug, Clone)]
pub enum ScreenerBotError {
    Chain(ChainError),
    Swap(SwapError),
    Discovery(DiscoveryError),
    Trader(TraderError),
    Config(ConfigError),
    RateLimit(RateLimitError),
}

impl std::fmt::Display for ScreenerBotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScreenerBotError::Chain(e) => write!(f, "chain error: {}", e),
            ScreenerBotError::Swap(e) => write!(f, "swap error: {}", e),
            ScreenerBotError::Discovery(e) => write!(f, "discovery error: {}", e),
            ScreenerBotError::Trader(e) => write!(f, "trader error: {}", e),
            ScreenerBotError::Config(e) => write!(f, "config error: {}", e),
            ScreenerBotError::RateLimit(e) => write!(f, "rate limit error: {}", e),
        }
    }
}

impl std::error::Error for ScreenerBotError {}

impl ScreenerBotError {
    /// Transient network failure: timeout, connection reset. Caller retries
    /// with backoff; after retries exhausted this is surfaced as "upstream
    /// unavailable", never fatal.
    pub fn transient(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        metrics::record("transient");
        ScreenerBotError::Chain(ChainError::Transient {
            endpoint: endpoint.into(),
            message: message.into(),
        })
    }

    /// HTTP 429 or RPC rate-limit message. Caller rotates key pool and retries.
    pub fn rate_limited(provider: impl Into<String>) -> Self {
        metrics::record("rate_limited");
        ScreenerBotError::RateLimit(RateLimitError::Exhausted {
            provider: provider.into(),
        })
    }

    /// Transaction confirmed with a non-null `err`, or a slippage rejection.
    pub fn chain_execution(signature: impl Into<String>, reason: impl Into<String>) -> Self {
        metrics::record("chain_execution");
        ScreenerBotError::Swap(SwapError::ChainExecution {
            signature: signature.into(),
            reason: reason.into(),
        })
    }

    /// No confirmation status within the window; reconciliation path applies.
    pub fn confirmation_ambiguous(signature: impl Into<String>) -> Self {
        metrics::record("confirmation_ambiguous");
        ScreenerBotError::Swap(SwapError::ConfirmationAmbiguous {
            signature: signature.into(),
        })
    }

    /// Internal bookkeeping (token count, share total) disagrees with chain
    /// state. Caller scales the internal book down to match and logs a warning.
    pub fn data_inconsistency(message: impl Into<String>) -> Self {
        metrics::record("data_inconsistency");
        ScreenerBotError::Trader(TraderError::DataInconsistency {
            message: message.into(),
        })
    }

    /// A risk-gate deny rule tripped. Silent at the trigger site, logged by the caller.
    pub fn safety_deny(mint: impl Into<String>, reason: impl Into<String>) -> Self {
        metrics::record("safety_deny");
        ScreenerBotError::Trader(TraderError::SafetyDeny {
            mint: mint.into(),
            reason: reason.into(),
        })
    }

    /// All keys in a pool exhausted within the retry budget. CRITICAL severity.
    pub fn credit_exhausted(provider: impl Into<String>) -> Self {
        metrics::record("credit_exhausted");
        ScreenerBotError::Trader(TraderError::CreditExhausted {
            provider: provider.into(),
        })
    }
}

#[derive(Debug, Clone)]
pub enum ChainError {
    Transient { endpoint: String, message: String },
    Timeout { method: String, timeout_ms: u64 },
    InvalidResponse { message: String },
}

impl std::fmt::Display for ChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainError::Transient { endpoint, message } => {
                write!(f, "transient failure on {}: {}", endpoint, message)
            }
            ChainError::Timeout { method, timeout_ms } => {
                write!(f, "{} timed out after {}ms", method, timeout_ms)
            }
            ChainError::InvalidResponse { message } => write!(f, "invalid response: {}", message),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SwapError {
    ChainExecution { signature: String, reason: String },
    ConfirmationAmbiguous { signature: String },
    SlippageExceeded { attempted_bps: u32 },
}

impl std::fmt::Display for SwapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapError::ChainExecution { signature, reason } => {
                write!(f, "transaction {} failed on chain: {}", signature, reason)
            }
            SwapError::ConfirmationAmbiguous { signature } => {
                write!(f, "transaction {} confirmation ambiguous", signature)
            }
            SwapError::SlippageExceeded { attempted_bps } => {
                write!(f, "slippage tolerance exceeded at {}bps", attempted_bps)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum DiscoveryError {
    SourceUnavailable { source: String },
    AuditFailed { mint: String, reason: String },
}

impl std::fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryError::SourceUnavailable { source } => {
                write!(f, "hot-token source unavailable: {}", source)
            }
            DiscoveryError::AuditFailed { mint, reason } => {
                write!(f, "audit failed for {}: {}", mint, reason)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum TraderError {
    SafetyDeny { mint: String, reason: String },
    CreditExhausted { provider: String },
    DataInconsistency { message: String },
    StatePersistence { message: String },
}

impl std::fmt::Display for TraderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraderError::SafetyDeny { mint, reason } => {
                write!(f, "risk gate denied {}: {}", mint, reason)
            }
            TraderError::CreditExhausted { provider } => {
                write!(f, "credit exhausted on provider {}", provider)
            }
            TraderError::DataInconsistency { message } => {
                write!(f, "position bookkeeping inconsistent: {}", message)
            }
            TraderError::StatePersistence { message } => {
                write!(f, "failed to persist trader state: {}", message)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConfigError {
    Missing { field: String },
    Invalid { field: String, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing { field } => write!(f, "missing config field: {}", field),
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid config field {}: {}", field, reason)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum RateLimitError {
    Exhausted { provider: String },
    Http429 { provider: String },
}

impl std::fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateLimitError::Exhausted { provider } => {
                write!(f, "all keys exhausted for {}", provider)
            }
            RateLimitError::Http429 { provider } => write!(f, "429 from {}", provider),
        }
    }
}

impl From<reqwest::Error> for ScreenerBotError {
    fn from(e: reqwest::Error) -> Self {
        ScreenerBotError::transient(
            e.url().map(|u| u.to_string()).unwrap_or_default(),
            e.to_string(),
        )
    }
}

impl From<serde_json::Error> for ScreenerBotError {
    fn from(e: serde_json::Error) -> Self {
        ScreenerBotError::Chain(ChainError::InvalidResponse {
            message: e.to_string(),
        })
    }
}

impl From<std::io::Error> for ScreenerBotError {
    fn from(e: std::io::Error) -> Self {
        ScreenerBotError::Trader(TraderError::StatePersistence {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_classify_into_expected_domains() {
        assert!(matches!(
            ScreenerBotError::transient("rpc.example", "timeout"),
            ScreenerBotError::Chain(ChainError::Transient { .. })
        ));
        assert!(matches!(
            ScreenerBotError::credit_exhausted("helius"),
            ScreenerBotError::Trader(TraderError::CreditExhausted { .. })
        ));
        assert!(matches!(
            ScreenerBotError::safety_deny("mint123", "honeypot"),
            ScreenerBotError::Trader(TraderError::SafetyDeny { .. })
        ));
    }
}
