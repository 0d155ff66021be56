//! Per-connection handler: hello, register, then relay chat.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::ServerState;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsStream = SplitStream<WebSocketStream<TcpStream>>;

/// Handle a single WebSocket connection.
pub async fn handle_connection(
    ws: WebSocketStream<TcpStream>,
    addr: SocketAddr,
    state: Arc<ServerState>,
) {
    let (mut sink, mut stream) = ws.split();

    // 1. Read the hello message to learn the player's name.
    let Some(name) = read_hello(&mut stream, addr, &state).await else {
        return;
    };

    // 2. Create our outbound queue and take a slot.
    let (tx, mut rx) = mpsc::channel::<String>(state.client_queue);
    let participant = match state.registry.register(&name, tx) {
        Ok(participant) => participant,
        Err(e) => {
            tracing::info!(peer = %addr, name = %name, "Rejecting client: {e}");
            let _ = send_message(
                &mut sink,
                &ServerMessage::Error {
                    message: e.to_string(),
                },
            )
            .await;
            return;
        }
    };

    tracing::info!(
        peer = %addr,
        participant = %participant.id,
        name = %participant.name,
        "Client registered"
    );

    // 3. Send welcome.
    if send_message(
        &mut sink,
        &ServerMessage::Welcome {
            session_id: participant.id.as_u8(),
        },
    )
    .await
    .is_err()
    {
        state.registry.unregister(&participant);
        return;
    }

    // 4. Relay loop.
    loop {
        tokio::select! {
            // Queued frames for this client -> its WebSocket
            Some(msg) = rx.recv() => {
                if sink.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }

            // Frames from this client
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Chat { message }) => {
                                state.on_chat(&participant, &message);
                            }
                            Ok(ClientMessage::Hello { .. }) => {
                                tracing::debug!(
                                    participant = %participant.id,
                                    "Ignoring repeated hello"
                                );
                            }
                            Err(e) => {
                                tracing::warn!(peer = %addr, error = %e, "Malformed client frame");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // 5. Cleanup. The registry announces the disconnect once the slot is free.
    tracing::info!(
        peer = %addr,
        participant = %participant.id,
        name = %participant.name,
        "Client disconnected"
    );
    state.registry.unregister(&participant);
}

/// Read and parse the first frame as a hello.
async fn read_hello(
    stream: &mut WsStream,
    addr: SocketAddr,
    state: &ServerState,
) -> Option<String> {
    let frame = tokio::time::timeout(state.hello_timeout, stream.next()).await;

    match frame {
        Ok(Some(Ok(Message::Text(text)))) => match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Hello { name }) => {
                let name = name.trim();
                if name.is_empty() {
                    tracing::warn!(peer = %addr, "Hello with empty name");
                    None
                } else {
                    Some(name.to_string())
                }
            }
            Ok(other) => {
                tracing::warn!(peer = %addr, frame = ?other, "Expected hello");
                None
            }
            Err(e) => {
                tracing::warn!(peer = %addr, error = %e, "Invalid hello message");
                None
            }
        },
        Ok(Some(Ok(_))) => {
            tracing::warn!(peer = %addr, "Expected text hello, got binary");
            None
        }
        Ok(Some(Err(e))) => {
            tracing::warn!(peer = %addr, error = %e, "WS error during hello");
            None
        }
        Ok(None) => {
            tracing::debug!(peer = %addr, "Connection closed before hello");
            None
        }
        Err(_) => {
            tracing::warn!(
                peer = %addr,
                timeout_secs = state.hello_timeout.as_secs(),
                "Hello timeout"
            );
            None
        }
    }
}

/// Send a ServerMessage as a JSON text frame.
async fn send_message(
    sink: &mut WsSink,
    message: &ServerMessage,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    sink.send(Message::Text(message.to_json().into())).await
}
