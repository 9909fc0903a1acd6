//! `transactionSubscribe` payload construction and the WS read loop
//! (§4.6 step 1). The payload shape follows the same
//! jsonrpc/method/params-array convention the rest of the provider uses for
//! `accountSubscribe`/`logsSubscribe`.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Sleep;
use tokio_tungstenite::tungstenite::Message;

fn build_transaction_subscribe_payload(accounts: &[String]) -> String {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "transactionSubscribe",
        "params": [
            {
                "accountInclude": accounts,
                "failed": false,
            },
            {
                "commitment": "confirmed",
                "encoding": "jsonParsed",
                "transactionDetails": "signatures",
                "maxSupportedTransactionVersion": 0,
            }
        ]
    })
    .to_string()
}

fn extract_signature(notification: &Value) -> Option<String> {
    notification
        .get("params")?
        .get("result")?
        .get("signature")
        .or_else(|| notification.get("params").and_then(|p| p.get("result")).and_then(|r| r.get("transaction")).and_then(|t| t.get("signature")))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Connects to the first reachable URL in `ws_urls`, subscribes with
/// `accounts`, and forwards every signature it sees until `deadline` fires
/// or the socket errors. Returns `Err` on connect/read failure so the
/// caller can back off and retry.
pub async fn stream_signatures(
    ws_urls: &[String],
    accounts: &[String],
    sig_tx: mpsc::Sender<String>,
    deadline: &mut std::pin::Pin<&mut Sleep>,
) -> Result<(), String> {
    let url = ws_urls.first().ok_or_else(|| "no ws_urls configured".to_string())?;

    let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str()).await.map_err(|e| e.to_string())?;

    let payload = build_transaction_subscribe_payload(accounts);
    socket.send(Message::Text(payload)).await.map_err(|e| e.to_string())?;

    loop {
        tokio::select! {
            _ = &mut *deadline => return Ok(()),
            msg = socket.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(value) = serde_json::from_str::<Value>(&text) {
                            if let Some(sig) = extract_signature(&value) {
                                if sig_tx.send(sig).await.is_err() {
                                    return Ok(());
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Err("websocket closed".to_string());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_includes_account_list_and_filters() {
        let payload = build_transaction_subscribe_payload(&["wallet1".to_string(), "wallet2".to_string()]);
        let value: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["method"], "transactionSubscribe");
        assert_eq!(value["params"][0]["accountInclude"][0], "wallet1");
        assert_eq!(value["params"][0]["failed"], false);
        assert_eq!(value["params"][1]["transactionDetails"], "signatures");
    }

    #[test]
    fn extracts_signature_from_notification_shape() {
        let notification: Value = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "transactionNotification",
            "params": { "result": { "signature": "sig123" } }
        });
        assert_eq!(extract_signature(&notification), Some("sig123".to_string()));
    }

    #[test]
    fn non_notification_messages_yield_no_signature() {
        let subscribe_ack: Value = serde_json::json!({ "jsonrpc": "2.0", "result": 1, "id": 1 });
        assert_eq!(extract_signature(&subscribe_ack), None);
    }
}
