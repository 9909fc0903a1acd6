//! Structured log tags, one per subsystem.

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    KeyPool,
    Chain,
    PriceOracle,
    TxParser,
    Discovery,
    Monitor,
    Agent,
    Trader,
    Swap,
    RiskGate,
    HunterStore,
    Config,
    Supervisor,
    Other(String),
}

impl LogTag {
    /// Key used for `--debug-<module>` / `--verbose-<module>` CLI flag matching.
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::KeyPool => "key_pool",
            LogTag::Chain => "chain",
            LogTag::PriceOracle => "price_oracle",
            LogTag::TxParser => "tx_parser",
            LogTag::Discovery => "discovery",
            LogTag::Monitor => "monitor",
            LogTag::Agent => "agent",
            LogTag::Trader => "trader",
            LogTag::Swap => "swap",
            LogTag::RiskGate => "risk_gate",
            LogTag::HunterStore => "hunter_store",
            LogTag::Config => "config",
            LogTag::Supervisor => "supervisor",
            LogTag::Other(s) => return s.clone(),
        }
        .to_string()
    }

    /// Upper-case label used in both console and file output.
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::KeyPool => "KEYPOOL",
            LogTag::Chain => "CHAIN",
            LogTag::PriceOracle => "PRICE",
            LogTag::TxParser => "TXPARSER",
            LogTag::Discovery => "DISCOVER",
            LogTag::Monitor => "MONITOR",
            LogTag::Agent => "AGENT",
            LogTag::Trader => "TRADER",
            LogTag::Swap => "SWAP",
            LogTag::RiskGate => "RISKGATE",
            LogTag::HunterStore => "HUNTERS",
            LogTag::Config => "CONFIG",
            LogTag::Supervisor => "SUPERVISOR",
            LogTag::Other(s) => return s.to_uppercase(),
        }
        .to_string()
    }

    /// Console color family for this tag, used by `format.rs`.
    pub fn color(&self) -> &'static str {
        match self {
            LogTag::KeyPool => "bright_yellow",
            LogTag::Chain => "bright_cyan",
            LogTag::PriceOracle => "bright_green",
            LogTag::TxParser => "bright_blue",
            LogTag::Discovery => "bright_white",
            LogTag::Monitor => "bright_cyan",
            LogTag::Agent => "bright_magenta",
            LogTag::Trader => "bright_green",
            LogTag::Swap => "bright_magenta",
            LogTag::RiskGate => "bright_red",
            LogTag::HunterStore => "bright_yellow",
            LogTag::Config => "white",
            LogTag::Supervisor => "bright_white",
            LogTag::Other(_) => "white",
        }
    }
}
