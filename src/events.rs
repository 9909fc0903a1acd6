//! Typed message channels replacing the callback-registration pattern for
//! closure/credit-exhaustion notifications (§9 Design Notes: "Callback
//! registration for closure/credit-exhaustion -> typed message channel or
//! trait object `PositionEvents`... avoids hidden control flow"). Also
//! carries the Monitor -> Agent -> Trader signal chain, broken into explicit
//! channels per the same note ("Cyclic reference... -> break the cycle via
//! event channels; each actor holds only outbound senders, and a supervisor
//! owns all receivers").

use crate::positions::TradeRecord;
use tokio::sync::mpsc;

/// Emitted once per Position close (§3: "must emit a closure event exactly
/// once").
#[derive(Debug, Clone)]
pub struct PositionClosed {
    pub mint: String,
    pub entry_time: i64,
    pub trade_records: Vec<TradeRecord>,
    pub total_pnl_sol: f64,
}

/// Resonance signal from Monitor to Trader (§4.6.1).
#[derive(Debug, Clone)]
pub struct ResonanceSignal {
    pub mint: String,
    pub lead_hunter: String,
    pub score: f64,
    pub ts: i64,
}

/// Per-mission signals from Agent to Trader (§4.7).
#[derive(Debug, Clone)]
pub enum AgentSignal {
    HunterBuy { mint: String, hunter: String, delta_ui: f64, new_balance_ui: f64 },
    HunterSell { mint: String, hunter: String, ratio: f64, remaining_ui: f64, note: String },
}

/// Raw per-hunter per-mint balance delta forwarded from Monitor to Agent.
/// Monitor observes only the delta from the parsed transaction; Agent keeps
/// the running balance itself (§4.7).
#[derive(Debug, Clone)]
pub struct HunterMintDelta {
    pub mint: String,
    pub hunter: String,
    pub delta_ui: f64,
    pub ts: i64,
}

/// Fired at most once per process lifetime (§7): bulk parsed-tx fetch
/// exhausted every key and retry budget with a 429.
#[derive(Debug, Clone, Copy)]
pub struct CreditExhausted;

/// Fired when Maintenance/zombie-sweep evicts a hunter; the Trader force-
/// closes any position it leads.
#[derive(Debug, Clone)]
pub struct HunterEvicted {
    pub wallet: String,
}

/// The supervisor's bundle of receivers plus every actor's bundle of
/// senders, constructed once at startup and handed out explicitly (no
/// global singletons, per §9).
pub struct EventChannels {
    pub resonance_tx: mpsc::Sender<ResonanceSignal>,
    pub resonance_rx: mpsc::Receiver<ResonanceSignal>,
    pub hunter_delta_tx: mpsc::Sender<HunterMintDelta>,
    pub hunter_delta_rx: mpsc::Receiver<HunterMintDelta>,
    pub agent_signal_tx: mpsc::Sender<AgentSignal>,
    pub agent_signal_rx: mpsc::Receiver<AgentSignal>,
    pub credit_exhausted_tx: mpsc::Sender<CreditExhausted>,
    pub credit_exhausted_rx: mpsc::Receiver<CreditExhausted>,
    pub hunter_evicted_tx: mpsc::Sender<HunterEvicted>,
    pub hunter_evicted_rx: mpsc::Receiver<HunterEvicted>,
    pub position_closed_tx: mpsc::Sender<PositionClosed>,
    pub position_closed_rx: mpsc::Receiver<PositionClosed>,
}

const CHANNEL_CAPACITY: usize = 1024;

impl EventChannels {
    pub fn new() -> Self {
        let (resonance_tx, resonance_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (hunter_delta_tx, hunter_delta_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (agent_signal_tx, agent_signal_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (credit_exhausted_tx, credit_exhausted_rx) = mpsc::channel(8);
        let (hunter_evicted_tx, hunter_evicted_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (position_closed_tx, position_closed_rx) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            resonance_tx,
            resonance_rx,
            hunter_delta_tx,
            hunter_delta_rx,
            agent_signal_tx,
            agent_signal_rx,
            credit_exhausted_tx,
            credit_exhausted_rx,
            hunter_evicted_tx,
            hunter_evicted_rx,
            position_closed_tx,
            position_closed_rx,
        }
    }
}

impl Default for EventChannels {
    fn default() -> Self {
        Self::new()
    }
}
