use std::time::Duration;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use log::{info, warn, error};
use uuid::Uuid;

use crate::hub::{BroadcastHub, PriceUpdate};

pub const PRICE_UPDATE_EVENT: &str = "priceUpdate";
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Serialize)]
struct OutboundEvent<'a> {
    event: &'static str,
    data: &'a PriceUpdate,
}

/// Accepts WebSocket connections for the life of the process. A failed
/// accept (e.g. out of file descriptors) is logged and retried.
pub async fn run_websocket_server(listener: TcpListener, hub: BroadcastHub) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = WebSocketHandler::new(hub.clone(), addr.to_string());
                tokio::spawn(handler.handle_connection(stream));
            }
            Err(e) => {
                warn!("WebSocket accept failed: {}", e);
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
            }
        }
    }
}

/// Bridges one WebSocket connection to the broadcast hub.
pub struct WebSocketHandler {
    hub: BroadcastHub,
    peer_addr: String,
}

impl WebSocketHandler {
    pub fn new(hub: BroadcastHub, peer_addr: String) -> Self {
        Self {
            hub,
            peer_addr,
        }
    }

    pub async fn handle_connection(self, stream: TcpStream) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                error!("WebSocket handshake failed for {}: {:?}", self.peer_addr, e);
                return;
            }
        };

        self.handle_websocket_connection(ws_stream).await;
    }

    /// Runs until either side of the socket closes, then deregisters the
    /// subscriber before returning.
    pub async fn handle_websocket_connection<S>(&self, ws_stream: WebSocketStream<S>)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let subscriber_id = Uuid::new_v4().to_string();
        let updates = match self.hub.connect(subscriber_id.clone()) {
            Ok(rx) => rx,
            Err(e) => {
                error!("Failed to register subscriber for {}: {}", self.peer_addr, e);
                return;
            }
        };

        info!("WebSocket subscriber {} connected from {}", subscriber_id, self.peer_addr);

        let (write, read) = ws_stream.split();
        let (close_tx, close_rx) = mpsc::channel::<()>(1);

        let mut write_task = Self::spawn_write_task(write, updates, close_rx);
        let mut read_task = Self::spawn_read_task(read, close_tx, subscriber_id.clone());

        tokio::select! {
            _ = &mut write_task => {
                info!("Write task completed for subscriber {}", subscriber_id);
            }
            _ = &mut read_task => {
                info!("Read task completed for subscriber {}", subscriber_id);
            }
        }

        write_task.abort();
        read_task.abort();
        self.hub.disconnect(&subscriber_id);

        info!("WebSocket subscriber {} closed from {}", subscriber_id, self.peer_addr);
    }

    fn spawn_write_task<S>(
        mut write: SplitSink<WebSocketStream<S>, Message>,
        mut updates: mpsc::Receiver<PriceUpdate>,
        mut close_rx: mpsc::Receiver<()>,
    ) -> tokio::task::JoinHandle<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = updates.recv() => {
                        let Some(update) = update else {
                            info!("Hub closed the update queue");
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        };

                        let event = OutboundEvent { event: PRICE_UPDATE_EVENT, data: &update };
                        let json = match serde_json::to_string(&event) {
                            Ok(json) => json,
                            Err(e) => {
                                error!("Failed to serialize price update: {}", e);
                                continue;
                            }
                        };

                        if let Err(e) = write.send(Message::Text(json)).await {
                            warn!("Error sending price update: {:?}", e);
                            break;
                        }
                    }
                    _ = close_rx.recv() => {
                        info!("Received close signal from read task");
                        break;
                    }
                }
            }
        })
    }

    fn spawn_read_task<S>(
        mut read: SplitStream<WebSocketStream<S>>,
        close_tx: mpsc::Sender<()>,
        subscriber_id: String,
    ) -> tokio::task::JoinHandle<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            while let Some(msg_result) = read.next().await {
                match msg_result {
                    Ok(Message::Close(close_frame)) => {
                        info!("Received close frame from subscriber {}: {:?}", subscriber_id, close_frame);
                        break;
                    }
                    Ok(_) => {
                        // push-only channel
                    }
                    Err(e) => {
                        warn!("Error reading from subscriber {}: {:?}", subscriber_id, e);
                        break;
                    }
                }
            }

            let _ = close_tx.send(()).await;
        })
    }
}
