use dronewatch_core::{default_stream_url, Position, TelemetrySample};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{timeout, Duration};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

// Exit codes: 1 bad url, 2 receive error, 3 closed, 4 timeout,
// 5 undecodable frame, 6 connect failed

#[tokio::main]
async fn main() {
    let raw = std::env::args().nth(1).unwrap_or_else(default_stream_url);
    let url = match Url::parse(&raw) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("Invalid URL {}: {}", raw, e);
            std::process::exit(1);
        }
    };
    eprintln!("Connecting to {}", url);
    let (mut ws, _) = match connect_async(url.as_str()).await {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("WS connect failed: {}", e);
            std::process::exit(6);
        }
    };

    // Wait up to 5s for one text frame, skipping anything else
    let outcome = timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(t))) => return Ok(t),
                Some(Ok(Message::Close(_))) | None => return Err(3),
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    eprintln!("WS receive error: {}", e);
                    return Err(2);
                }
            }
        }
    })
    .await;

    let code = match outcome {
        Ok(Ok(text)) => match TelemetrySample::decode(&text) {
            Ok(sample) => {
                let pos = Position::from_sample(&sample);
                println!("sample: x={} y={} z={}", sample.x, sample.y, sample.z);
                println!("marker: ({}, {}) px, altitude {}", pos.x_px, pos.y_px, pos.z);
                0
            }
            Err(e) => {
                eprintln!("Undecodable telemetry frame {:?}: {}", text, e);
                5
            }
        },
        Ok(Err(3)) => {
            eprintln!("WS closed by server");
            3
        }
        Ok(Err(code)) => code,
        Err(_) => {
            eprintln!("Timeout waiting for WS telemetry");
            4
        }
    };

    let _ = ws.send(Message::Close(None)).await;
    std::process::exit(code);
}
