use crate::{Sender, TransportError};
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tokio::sync::broadcast;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

type Clients = Arc<Mutex<HashSet<String>>>;

/// Broadcasts frames to every connected WebSocket viewer.
pub struct WebSocketSender {
    host: String,
    port: u16,
    tx: Option<broadcast::Sender<String>>,
    runtime: Option<Runtime>,
    clients: Clients,
}

fn lock(clients: &Clients) -> MutexGuard<'_, HashSet<String>> {
    // A panicked connection task leaves the set itself intact
    clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl WebSocketSender {
    pub fn new(host: &str, port: u16) -> Self {
        WebSocketSender {
            host: host.to_string(),
            port,
            tx: None,
            runtime: None,
            clients: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Starts the server on a background runtime.
    pub fn start(&mut self) -> Result<(), TransportError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| TransportError::WebSocket(e.to_string()))?;

        let addr = format!("{}:{}", self.host, self.port);
        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| TransportError::WebSocket(format!("Invalid address {}: {}", addr, e)))?;

        // Bind up front so a busy port is reported to the caller
        let listener = runtime
            .block_on(TcpListener::bind(socket_addr))
            .map_err(|e| TransportError::WebSocket(format!("Failed to bind {}: {}", socket_addr, e)))?;
        info!("WebSocket server listening on ws://{}", socket_addr);

        let (tx, _) = broadcast::channel::<String>(16);
        self.tx = Some(tx.clone());
        let clients = self.clients.clone();

        runtime.spawn(async move {
            while let Ok((stream, addr)) = listener.accept().await {
                let peer = addr.to_string();
                if !lock(&clients).insert(peer.clone()) {
                    continue;
                }
                info!("Viewer connected: {} ({} total)", peer, lock(&clients).len());
                tokio::spawn(handle_connection(stream, tx.subscribe(), peer, clients.clone()));
            }
        });

        self.runtime = Some(runtime);
        Ok(())
    }

    pub fn client_count(&self) -> usize {
        lock(&self.clients).len()
    }
}

impl Sender for WebSocketSender {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| TransportError::WebSocket("WebSocket server not started".to_string()))?;
        if self.client_count() == 0 {
            return Ok(());
        }

        let text = std::str::from_utf8(data)
            .map_err(|e| TransportError::WebSocket(format!("Invalid UTF-8: {}", e)))?;
        // Err only means every receiver has gone away since the count was taken
        if tx.send(text.to_string()).is_err() {
            debug!("No viewers left to receive frame");
        }
        Ok(())
    }
}

async fn handle_connection(
    raw_stream: TcpStream,
    mut rx: broadcast::Receiver<String>,
    peer: String,
    clients: Clients,
) {
    let ws_stream = match accept_async(raw_stream).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", peer, e);
            remove_client(&peer, &clients);
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Viewers never send anything meaningful; reading only detects disconnects
    let receive_peer = peer.clone();
    let receive_clients = clients.clone();
    let receive_task = tokio::spawn(async move {
        while let Some(message) = ws_receiver.next().await {
            if let Err(e) = message {
                if !is_disconnect_error(&e) {
                    warn!("WebSocket receive error from {}: {}", receive_peer, e);
                }
                break;
            }
        }
        remove_client(&receive_peer, &receive_clients);
    });

    loop {
        match rx.recv().await {
            Ok(frame) => {
                if !lock(&clients).contains(&peer) {
                    break;
                }
                if let Err(e) = ws_sender.send(Message::Text(frame)).await {
                    if !is_disconnect_error(&e) {
                        error!("WebSocket send error to {}: {}", peer, e);
                    }
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Viewer {} skipped {} frames", peer, skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    remove_client(&peer, &clients);
    let _ = receive_task.await;
}

fn is_disconnect_error(e: &WsError) -> bool {
    match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed | WsError::Protocol(_) => true,
        WsError::Io(io_err) => matches!(
            io_err.kind(),
            std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
        ),
        _ => false,
    }
}

fn remove_client(peer: &str, clients: &Clients) {
    let mut clients = lock(clients);
    if clients.remove(peer) {
        info!("Viewer disconnected: {} ({} total)", peer, clients.len());
    }
}
