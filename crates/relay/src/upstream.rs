use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use zeromq::{Socket, SocketRecv, SubSocket, ZmqMessage, ZmqResult};

use crate::state::{validate_frame, AppState};

/// Follow a ZMQ PUB feed and relay every valid message unchanged.
/// The subscription is rebuilt with capped backoff when it drops.
pub async fn run_upstream(state: AppState, endpoint: String) {
    let mut backoff_secs = 1u64;
    loop {
        match subscribe(&endpoint).await {
            Ok(mut socket) => {
                info!(%endpoint, "subscribed to upstream telemetry");
                backoff_secs = 1;
                forward(&state, &mut socket).await;
                warn!(%endpoint, "upstream telemetry feed ended");
            }
            Err(e) => {
                error!(%endpoint, error = %e, "upstream subscribe failed");
            }
        }
        sleep(Duration::from_secs(backoff_secs)).await;
        backoff_secs = (backoff_secs * 2).min(30);
    }
}

async fn subscribe(endpoint: &str) -> ZmqResult<SubSocket> {
    let mut socket = SubSocket::new();
    socket.connect(endpoint).await?;
    socket.subscribe("").await?;
    Ok(socket)
}

async fn forward(state: &AppState, socket: &mut SubSocket) {
    loop {
        match socket.recv().await {
            Ok(msg) => {
                relay_message(state, &msg);
            }
            Err(e) => {
                warn!(error = %e, "upstream receive failed");
                return;
            }
        }
    }
}

/// Publish the first frame of `msg` if it holds a usable sample.
pub fn relay_message(state: &AppState, msg: &ZmqMessage) -> Option<usize> {
    let Some(bytes) = msg.get(0) else {
        debug!("empty upstream message");
        return None;
    };
    let text = match std::str::from_utf8(bytes) {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "upstream message is not UTF-8");
            return None;
        }
    };
    match validate_frame(text) {
        Ok((_, frame)) => Some(state.publish_frame(frame)),
        Err(e) => {
            warn!(error = %e, "dropping upstream message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::tests::{serve, wait_for_clients};
    use futures_util::StreamExt;
    use tokio::time::{timeout, Instant};
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;
    use zeromq::{PubSocket, SocketSend};

    #[test]
    fn relays_valid_messages_untouched() {
        let state = AppState::new(4);
        let mut rx = state.subscribe();

        let msg = ZmqMessage::from(r#"{"x":2,"y":1,"z":30,"heading":90}"#);
        assert_eq!(relay_message(&state, &msg), Some(1));
        let frame: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame, serde_json::json!({"x": 2, "y": 1, "z": 30, "heading": 90}));
    }

    #[test]
    fn invalid_messages_are_dropped() {
        let state = AppState::new(4);
        let mut rx = state.subscribe();

        assert_eq!(relay_message(&state, &ZmqMessage::from(r#"{"x":2,"y":1}"#)), None);
        assert_eq!(relay_message(&state, &ZmqMessage::from("not json")), None);
        assert!(rx.try_recv().is_err());
        assert_eq!(state.metrics.samples_total.get(), 0);
    }

    #[tokio::test]
    async fn upstream_feed_reaches_websocket_clients() {
        let state = AppState::new(16);
        let addr = serve(state.clone()).await;

        let mut publisher = PubSocket::new();
        let bound = publisher.bind("tcp://127.0.0.1:0").await.unwrap();
        tokio::spawn(run_upstream(state.clone(), bound.to_string()));

        let (mut ws, _) = connect_async(format!("ws://{}/", addr)).await.unwrap();
        wait_for_clients(&state, 1).await;

        // PUB drops messages until the subscription has propagated, so keep sending.
        let sent = r#"{"x":4,"y":3,"z":12.5,"battery":71}"#;
        let deadline = Instant::now() + Duration::from_secs(10);
        let received = loop {
            assert!(Instant::now() < deadline, "no upstream frame reached the client");
            publisher.send(ZmqMessage::from(sent)).await.unwrap();
            if let Ok(Some(Ok(Message::Text(text)))) =
                timeout(Duration::from_millis(100), ws.next()).await
            {
                break text;
            }
        };

        let got: serde_json::Value = serde_json::from_str(&received).unwrap();
        let want: serde_json::Value = serde_json::from_str(sent).unwrap();
        assert_eq!(got, want);
    }
}
