//! TradingHistory: append-only JSON-lines log of closed positions, consumed
//! by an external report collaborator (§6, §[FULL] 15) — no report
//! generation or delivery happens in this crate.

use crate::events::PositionClosed;
use crate::logger::{self, LogTag};
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Serialize)]
struct TradingHistoryRecord<'a> {
    mint: &'a str,
    entry_time: i64,
    closed_at: i64,
    trade_count: usize,
    total_pnl_sol: f64,
}

pub struct TradingHistory {
    path: PathBuf,
}

impl TradingHistory {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub async fn append(&self, closed: &PositionClosed, now: i64) {
        let record = TradingHistoryRecord {
            mint: &closed.mint,
            entry_time: closed.entry_time,
            closed_at: now,
            trade_count: closed.trade_records.len(),
            total_pnl_sol: closed.total_pnl_sol,
        };

        let line = match serde_json::to_string(&record) {
            Ok(s) => s,
            Err(e) => {
                logger::error(LogTag::Trader, &format!("failed to serialize trading history record: {}", e));
                return;
            }
        };

        if let Some(parent) = self.path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                logger::error(LogTag::Trader, &format!("failed to create trading history dir: {}", e));
                return;
            }
        }

        let file = tokio::fs::OpenOptions::new().create(true).append(true).open(&self.path).await;
        match file {
            Ok(mut f) => {
                if let Err(e) = f.write_all(format!("{}\n", line).as_bytes()).await {
                    logger::error(LogTag::Trader, &format!("failed to append trading history: {}", e));
                }
            }
            Err(e) => logger::error(LogTag::Trader, &format!("failed to open trading history file: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positions::{TradeRecord, TradeType};
    use tempfile::tempdir;

    #[tokio::test]
    async fn append_writes_one_jsonl_line_per_closure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trading_history.jsonl");
        let history = TradingHistory::new(path.clone());

        let closed = PositionClosed {
            mint: "mint1".to_string(),
            entry_time: 1_000,
            trade_records: vec![TradeRecord {
                ts: 1_000,
                trade_type: TradeType::Buy,
                sol_spent: 0.04,
                sol_received: 0.0,
                token_amount: 20.0,
                note: "entry".to_string(),
                pnl_sol: None,
            }],
            total_pnl_sol: 0.02,
        };
        history.append(&closed, 2_000).await;
        history.append(&closed, 3_000).await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
