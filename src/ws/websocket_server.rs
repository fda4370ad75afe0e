use crate::app::{Command, Reply, Request, RequestSender, TimerSnapshot};
use crate::blocking::bridge::WatchSink;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

type WsSender = SplitSink<WebSocketStream<TcpStream>, Message>;

/// What every connection needs: a way to reach the timer task and the two
/// feeds it publishes. Each connection subscribes to the payload feed on its
/// own, so the sink sees no receivers while no extension is connected.
#[derive(Debug, Clone)]
pub struct ServerChannels {
    pub requests: RequestSender,
    pub payloads: WatchSink,
    pub states: watch::Receiver<TimerSnapshot>,
}

pub async fn start_websocket_server(
    addr: SocketAddr,
    channels: ServerChannels,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(&addr).await?;
    info!("WebSocket server listening on: {}", addr);
    serve(listener, channels).await;
    Ok(())
}

pub async fn serve(listener: TcpListener, channels: ServerChannels) {
    while let Ok((stream, peer_addr)) = listener.accept().await {
        info!("New WebSocket connection from: {}", peer_addr);
        tokio::spawn(handle_connection(stream, peer_addr, channels.clone()));
    }
}

async fn send_json(ws_sender: &mut WsSender, reply: &Reply) -> bool {
    let json = match serde_json::to_string(reply) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to encode reply: {}", e);
            return true;
        }
    };
    match ws_sender.send(Message::Text(json)).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to send WebSocket message: {}", e);
            false
        }
    }
}

async fn dispatch(requests: &RequestSender, text: &str) -> Reply {
    let command = match serde_json::from_str::<Command>(text) {
        Ok(command) => command,
        Err(e) => {
            warn!("Failed to parse message: {}", e);
            return Reply::error("badRequest", format!("Parse error: {}", e));
        }
    };
    let (reply_tx, reply_rx) = oneshot::channel();
    if requests
        .send(Request {
            command,
            reply: reply_tx,
        })
        .is_err()
    {
        return Reply::error("unavailable", "timer is shutting down");
    }
    reply_rx
        .await
        .unwrap_or_else(|_| Reply::error("unavailable", "timer is shutting down"))
}

async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, channels: ServerChannels) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed with {}: {}", peer_addr, e);
            return;
        }
    };

    debug!("WebSocket handshake completed with {}", peer_addr);

    let ServerChannels {
        requests,
        payloads,
        mut states,
    } = channels;
    let mut payloads = payloads.subscribe();
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // New clients get the current picture before anything else.
    let payload = payloads.borrow_and_update().clone();
    let state = states.borrow_and_update().clone();
    if !send_json(&mut ws_sender, &Reply::SyncBlockingState(payload)).await
        || !send_json(&mut ws_sender, &Reply::State { state }).await
    {
        return;
    }

    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                let Some(msg) = msg else {
                    break;
                };
                match msg {
                    Ok(Message::Text(text)) => {
                        debug!("[WebSocket] Received from {}: {}", peer_addr, text);
                        let reply = dispatch(&requests, &text).await;
                        if !send_json(&mut ws_sender, &reply).await {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("WebSocket connection closed by {}", peer_addr);
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        if let Err(e) = ws_sender.send(Message::Pong(data)).await {
                            warn!("Failed to send pong: {}", e);
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("WebSocket error from {}: {}", peer_addr, e);
                        break;
                    }
                }
            }
            changed = payloads.changed() => {
                if changed.is_err() {
                    break;
                }
                let payload = payloads.borrow_and_update().clone();
                if !send_json(&mut ws_sender, &Reply::SyncBlockingState(payload)).await {
                    break;
                }
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                if !send_json(&mut ws_sender, &Reply::State { state }).await {
                    break;
                }
            }
        }
    }

    info!("WebSocket connection with {} terminated", peer_addr);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::create_request_channel;
    use crate::blocking::bridge::{BlockingSyncPayload, EnforcementSink};
    use serde_json::Value;
    use tokio_tungstenite::connect_async;

    type WsResult = Result<Message, tokio_tungstenite::tungstenite::Error>;

    async fn next_json<S>(ws: &mut S) -> Value
    where
        S: futures_util::Stream<Item = WsResult> + Unpin,
    {
        loop {
            match ws.next().await.expect("stream open").expect("message") {
                Message::Text(text) => return serde_json::from_str(&text).expect("json"),
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn client_gets_initial_state_and_command_replies() {
        let (requests, mut request_rx) = create_request_channel();
        let mut payloads = WatchSink::new();
        payloads
            .sync(&BlockingSyncPayload {
                is_blocking: false,
                sites: vec!["a.com".to_string()],
            })
            .unwrap_err();
        let payload_feed = payloads.clone();
        let (_state_tx, states) = watch::channel(TimerSnapshot::default());

        // Stand-in timer task: answers every request with an error echo.
        tokio::spawn(async move {
            while let Some(request) = request_rx.recv().await {
                let _ = request
                    .reply
                    .send(Reply::error("echo", format!("{:?}", request.command)));
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(
            listener,
            ServerChannels {
                requests,
                payloads,
                states,
            },
        ));

        let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();
        let first = next_json(&mut ws).await;
        assert_eq!(first["type"], "SYNC_BLOCKING_STATE");
        assert_eq!(first["isBlocking"], false);
        assert_eq!(first["sites"][0], "a.com");
        let second = next_json(&mut ws).await;
        assert_eq!(second["type"], "STATE");
        assert_eq!(second["state"]["mode"], "work");

        ws.send(Message::Text(r#"{"type":"START"}"#.to_string()))
            .await
            .unwrap();
        let reply = next_json(&mut ws).await;
        assert_eq!(reply["kind"], "echo");
        assert_eq!(reply["message"], "Start");

        ws.send(Message::Text("{nope".to_string())).await.unwrap();
        let reply = next_json(&mut ws).await;
        assert_eq!(reply["type"], "ERROR");
        assert_eq!(reply["kind"], "badRequest");

        let mut payload_feed = payload_feed;
        assert_eq!(payload_feed.receiver_count(), 1);
        payload_feed
            .sync(&BlockingSyncPayload {
                is_blocking: true,
                sites: vec!["a.com".to_string()],
            })
            .unwrap();
        let pushed = next_json(&mut ws).await;
        assert_eq!(pushed["type"], "SYNC_BLOCKING_STATE");
        assert_eq!(pushed["isBlocking"], true);
    }
}
