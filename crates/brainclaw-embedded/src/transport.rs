//! Streaming transport abstraction

use core::fmt;

/// Where the transport connects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Endpoint<'a> {
    /// Host name or address
    pub host: &'a str,
    /// TCP port
    pub port: u16,
    /// Request path, including any query
    pub path: &'a str,
}

/// Event reported by [`Transport::poll`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportEvent<'a> {
    /// Connection established
    Connected,
    /// Connection lost
    Disconnected,
    /// Text frame received from the consumer
    Text(&'a str),
}

/// Message transport to the remote consumer.
///
/// Implementations reconnect on their own; the bridge only observes the
/// events surfaced by [`poll`](Transport::poll).
pub trait Transport {
    /// Send error
    type Error: fmt::Display;

    /// Start connecting. Returns immediately.
    fn connect(&mut self, endpoint: &Endpoint<'_>);

    /// Send one text frame. Only valid while connected.
    fn send(&mut self, text: &str) -> Result<(), Self::Error>;

    /// Current connection state as seen by the transport
    fn is_connected(&self) -> bool;

    /// Service the transport and report what happened since the last call.
    fn poll(&mut self, on_event: &mut dyn FnMut(TransportEvent<'_>));
}
