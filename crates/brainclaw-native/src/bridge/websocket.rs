//! WebSocket transport to the relay server
//!
//! A background task owns the socket and reconnects on its own at a fixed
//! interval. The scheduler side talks to it through two channels: outbound
//! text frames, and connection/text events drained by [`Transport::poll`].

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use brainclaw_embedded::{Endpoint, Transport, TransportEvent};

use crate::config::{ws_url, WsConfig};
use crate::error::NativeError;

const EVENT_BUFFER: usize = 32;

#[derive(Debug)]
enum SocketEvent {
    Connected,
    Disconnected,
    Text(String),
}

/// [`Transport`] over a reconnecting WebSocket client.
pub struct WsTransport {
    runtime: Handle,
    reconnect_interval: Duration,
    send_buffer: usize,
    outbound: Option<mpsc::Sender<String>>,
    events: Option<mpsc::Receiver<SocketEvent>>,
    task: Option<JoinHandle<()>>,
    connected: bool,
}

impl WsTransport {
    /// Create an unconnected transport that will run its socket task on `runtime`.
    pub fn new(runtime: Handle, config: &WsConfig) -> Self {
        Self {
            runtime,
            reconnect_interval: config.reconnect_interval,
            send_buffer: config.send_buffer.max(1),
            outbound: None,
            events: None,
            task: None,
            connected: false,
        }
    }

    fn stop_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.outbound = None;
        self.events = None;
        self.connected = false;
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.stop_task();
    }
}

impl Transport for WsTransport {
    type Error = NativeError;

    fn connect(&mut self, endpoint: &Endpoint<'_>) {
        self.stop_task();

        let url = ws_url(endpoint);
        let (outbound_tx, outbound_rx) = mpsc::channel(self.send_buffer);
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);

        self.task = Some(self.runtime.spawn(run_socket(
            url,
            self.reconnect_interval,
            events_tx,
            outbound_rx,
        )));
        self.outbound = Some(outbound_tx);
        self.events = Some(events_rx);
    }

    fn send(&mut self, text: &str) -> Result<(), NativeError> {
        if !self.connected {
            return Err(NativeError::NotConnected);
        }
        let outbound = self.outbound.as_ref().ok_or(NativeError::NotConnected)?;
        outbound.try_send(text.to_owned()).map_err(|e| match e {
            TrySendError::Full(_) => NativeError::Backpressure,
            TrySendError::Closed(_) => NativeError::ChannelClosed,
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn poll(&mut self, on_event: &mut dyn FnMut(TransportEvent<'_>)) {
        let Some(events) = self.events.as_mut() else {
            return;
        };

        loop {
            match events.try_recv() {
                Ok(SocketEvent::Connected) => {
                    self.connected = true;
                    on_event(TransportEvent::Connected);
                }
                Ok(SocketEvent::Disconnected) => {
                    self.connected = false;
                    on_event(TransportEvent::Disconnected);
                }
                Ok(SocketEvent::Text(text)) => on_event(TransportEvent::Text(&text)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::error!("WebSocket task exited");
                    if self.connected {
                        self.connected = false;
                        on_event(TransportEvent::Disconnected);
                    }
                    self.events = None;
                    break;
                }
            }
        }
    }
}

/// Connect, pump frames both ways, and reconnect after every loss.
async fn run_socket(
    url: String,
    reconnect_interval: Duration,
    events: mpsc::Sender<SocketEvent>,
    mut outbound: mpsc::Receiver<String>,
) {
    loop {
        tracing::info!("Connecting to WebSocket: {}", url);

        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                tracing::info!("WebSocket connected");
                if events.send(SocketEvent::Connected).await.is_err() {
                    return;
                }

                let (mut write, mut read) = stream.split();
                loop {
                    tokio::select! {
                        incoming = read.next() => match incoming {
                            Some(Ok(Message::Text(text))) => {
                                if events.send(SocketEvent::Text(text.as_str().to_owned())).await.is_err() {
                                    return;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::info!("WebSocket closed by server");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                tracing::warn!("WebSocket error: {}", e);
                                break;
                            }
                        },
                        pending = outbound.recv() => match pending {
                            Some(text) => {
                                if let Err(e) = write.send(Message::text(text)).await {
                                    tracing::warn!("WebSocket send failed: {}", e);
                                    break;
                                }
                            }
                            // Transport dropped
                            None => {
                                let _ = write.close().await;
                                return;
                            }
                        },
                    }
                }

                if events.send(SocketEvent::Disconnected).await.is_err() {
                    return;
                }
            }
            Err(e) => tracing::warn!("WebSocket connection failed: {}", e),
        }

        // Frames queued for the old connection are stale
        while outbound.try_recv().is_ok() {}

        tracing::info!("WebSocket reconnecting in {} ms", reconnect_interval.as_millis());
        tokio::time::sleep(reconnect_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn wait_for(
        transport: &mut WsTransport,
        want: fn(&TransportEvent<'_>) -> bool,
    ) -> bool {
        for _ in 0..500 {
            let mut seen = false;
            transport.poll(&mut |event| seen |= want(&event));
            if seen {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_send_before_connect_fails() {
        let mut transport = WsTransport::new(Handle::current(), &WsConfig::default());
        assert!(matches!(transport.send("x"), Err(NativeError::NotConnected)));
        assert!(!transport.is_connected());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_connect_send_and_server_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let first = ws.next().await.unwrap().unwrap();
            ws.close(None).await.unwrap();
            first
        });

        let config = WsConfig { port, reconnect_interval: Duration::from_secs(60), ..WsConfig::default() };
        let mut transport = WsTransport::new(Handle::current(), &config);
        transport.connect(&config.endpoint());

        assert!(wait_for(&mut transport, |e| *e == TransportEvent::Connected).await);
        assert!(transport.is_connected());

        let message = r#"{"type":"telemetry","battery":50,"temp":20.0}"#;
        transport.send(message).unwrap();

        let received = server.await.unwrap();
        assert_eq!(received.into_text().unwrap().as_str(), message);

        assert!(wait_for(&mut transport, |e| *e == TransportEvent::Disconnected).await);
        assert!(!transport.is_connected());
        assert!(matches!(transport.send(message), Err(NativeError::NotConnected)));
    }
}
