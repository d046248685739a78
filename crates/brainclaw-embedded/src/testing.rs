//! In-memory radio, transport and clock for unit tests

use core::cell::Cell;
use core::fmt;
use std::collections::VecDeque;

use brainclaw_core::{DataChannel, LinkState};

use crate::clock::Clock;
use crate::radio::{Advertisement, ConnectionParams, RadioLink, ScanResults};
use crate::transport::{Endpoint, Transport, TransportEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeError(pub &'static str);

impl fmt::Display for FakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

// ============================================================================
// Clock
// ============================================================================

#[derive(Default)]
pub struct FakeClock {
    now: Cell<u64>,
}

impl FakeClock {
    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

// ============================================================================
// Radio
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCall {
    Scan,
    Connect(u32),
    Subscribe(u32, DataChannel),
    Unsubscribe(u32, DataChannel),
    Write(u32, Vec<u8>),
    Disconnect(u32),
}

#[derive(Default)]
pub struct FakeRadio {
    pub advertisements: Vec<Advertisement>,
    pub fail_connect: bool,
    pub fail_subscribe: bool,
    pub fail_writes: bool,
    /// Report a radio loss from inside the next `connect`
    pub drop_during_connect: Option<&'static LinkState>,
    pub calls: Vec<RadioCall>,
    next_handle: u32,
}

impl FakeRadio {
    /// Radio that always finds one Muse headset.
    pub fn with_muse() -> Self {
        let advertisement = Advertisement {
            token: 7,
            name: Some(heapless::String::try_from("Muse-1A2B").unwrap()),
            services: heapless::Vec::new(),
            rssi: Some(-58),
        };
        Self { advertisements: vec![advertisement], ..Self::default() }
    }

    /// Control frames written so far, oldest first.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                RadioCall::Write(_, frame) => Some(frame.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&RadioCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl RadioLink for FakeRadio {
    type Handle = u32;
    type Error = FakeError;

    fn scan(&mut self, _duration_ms: u64) -> Result<ScanResults, FakeError> {
        self.calls.push(RadioCall::Scan);
        let mut results = ScanResults::new();
        for adv in &self.advertisements {
            results.push(adv.clone()).map_err(|_| FakeError("too many advertisements"))?;
        }
        Ok(results)
    }

    fn connect(&mut self, target: &Advertisement, _params: &ConnectionParams) -> Result<u32, FakeError> {
        self.calls.push(RadioCall::Connect(target.token));
        if self.fail_connect {
            return Err(FakeError("connect refused"));
        }
        self.next_handle += 1;
        if let Some(link) = self.drop_during_connect.take() {
            link.on_radio_disconnected();
        }
        Ok(self.next_handle)
    }

    fn subscribe(&mut self, handle: &u32, channel: DataChannel) -> Result<(), FakeError> {
        self.calls.push(RadioCall::Subscribe(*handle, channel));
        if self.fail_subscribe {
            return Err(FakeError("subscribe failed"));
        }
        Ok(())
    }

    fn unsubscribe(&mut self, handle: &u32, channel: DataChannel) -> Result<(), FakeError> {
        self.calls.push(RadioCall::Unsubscribe(*handle, channel));
        Ok(())
    }

    fn write_control(&mut self, handle: &u32, frame: &[u8]) -> Result<(), FakeError> {
        self.calls.push(RadioCall::Write(*handle, frame.to_vec()));
        if self.fail_writes {
            return Err(FakeError("write failed"));
        }
        Ok(())
    }

    fn disconnect(&mut self, handle: u32) {
        self.calls.push(RadioCall::Disconnect(handle));
    }
}

// ============================================================================
// Transport
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeEvent {
    Connected,
    Disconnected,
    Text(String),
}

#[derive(Default)]
pub struct FakeTransport {
    pub endpoint: Option<String>,
    pub pending: VecDeque<FakeEvent>,
    pub sent: Vec<String>,
    pub fail_send: bool,
    connected: bool,
}

impl FakeTransport {
    pub fn push_event(&mut self, event: FakeEvent) {
        self.pending.push_back(event);
    }

    /// Lose the connection without emitting an event.
    pub fn drop_silently(&mut self) {
        self.connected = false;
    }
}

impl Transport for FakeTransport {
    type Error = FakeError;

    fn connect(&mut self, endpoint: &Endpoint<'_>) {
        self.endpoint = Some(format!("{}:{}{}", endpoint.host, endpoint.port, endpoint.path));
    }

    fn send(&mut self, text: &str) -> Result<(), FakeError> {
        if self.fail_send || !self.connected {
            return Err(FakeError("send failed"));
        }
        self.sent.push(text.to_string());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn poll(&mut self, on_event: &mut dyn FnMut(TransportEvent<'_>)) {
        while let Some(event) = self.pending.pop_front() {
            match event {
                FakeEvent::Connected => {
                    self.connected = true;
                    on_event(TransportEvent::Connected);
                }
                FakeEvent::Disconnected => {
                    self.connected = false;
                    on_event(TransportEvent::Disconnected);
                }
                FakeEvent::Text(text) => on_event(TransportEvent::Text(&text)),
            }
        }
    }
}
